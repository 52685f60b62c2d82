//! Child name and age validation applied before every reservation.

use thiserror::Error;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MIN_CHILD_AGE: i32 = 1;
pub const MAX_CHILD_AGE: i32 = 18;

/// Words rejected regardless of configuration.
const BUILTIN_DENYLIST: &[&str] = &[
    "бля", "блядь", "блять", "говно", "дерьмо", "ебать", "жопа", "залупа", "манда", "мудак",
    "мудила", "пидор", "пидр", "пизда", "сука", "сучка", "хер", "хуй", "хуйня", "шлюха",
    "bitch", "cunt", "dick", "fuck", "shit", "whore",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("⚠️ Имя слишком короткое! Пожалуйста, введите имя длиной не менее 2 символов.")]
    TooShort,
    #[error("⚠️ Имя слишком длинное! Максимальная длина - 50 символов.")]
    TooLong,
    #[error("⚠️ Имя содержит недопустимые символы! Используйте только буквы, пробелы и дефисы.")]
    InvalidCharacters,
    #[error("⚠️ Имя должно содержать только одно слово.")]
    MultipleWords,
    #[error("⚠️ Это имя содержит недопустимые выражения. Пожалуйста, введите другое имя.")]
    Inappropriate,
}

impl NameError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooShort => "NAME_TOO_SHORT",
            Self::TooLong => "NAME_TOO_LONG",
            Self::InvalidCharacters => "NAME_INVALID_CHARACTERS",
            Self::MultipleWords => "NAME_MULTIPLE_WORDS",
            Self::Inappropriate => "NAME_INAPPROPRIATE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("⚠️ Пожалуйста, введите корректный возраст от 1 до 18 лет.")]
pub struct AgeError;

/// Name checks with the built-in denylist plus configured extras.
#[derive(Debug, Clone, Default)]
pub struct NameValidator {
    extra_denylist: Vec<String>,
}

impl NameValidator {
    pub fn new<I, S>(extra_denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra_denylist: extra_denylist
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Validate a raw name, returning the trimmed form on success.
    pub fn validate<'a>(&self, raw: &'a str) -> Result<&'a str, NameError> {
        let name = raw.trim();
        let length = name.chars().count();

        if length < MIN_NAME_LENGTH {
            return Err(NameError::TooShort);
        }
        if length > MAX_NAME_LENGTH {
            return Err(NameError::TooLong);
        }
        if !name.chars().all(is_allowed_char) {
            return Err(NameError::InvalidCharacters);
        }
        if name.split_whitespace().count() > 1 {
            return Err(NameError::MultipleWords);
        }
        if self.is_inappropriate(name) {
            return Err(NameError::Inappropriate);
        }

        Ok(name)
    }

    fn is_inappropriate(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        std::iter::once(lowered.as_str())
            .chain(lowered.split('-'))
            .filter(|part| !part.is_empty())
            .any(|part| {
                BUILTIN_DENYLIST.contains(&part) || self.extra_denylist.iter().any(|w| w == part)
            })
    }
}

fn is_allowed_char(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c) || c.is_ascii_alphabetic() || c.is_whitespace() || c == '-'
}

/// Validate with the built-in denylist only.
pub fn validate_child_name(raw: &str) -> Result<&str, NameError> {
    NameValidator::default().validate(raw)
}

/// The deduplication key for a child name.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_child_age(raw: &str) -> Result<i32, AgeError> {
    let age: i32 = raw.trim().parse().map_err(|_| AgeError)?;
    if (MIN_CHILD_AGE..=MAX_CHILD_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(AgeError)
    }
}

/// Russian plural for "years" after a number.
pub fn years_word(age: i32) -> &'static str {
    let last_digit = age % 10;
    let last_two = age % 100;

    if (11..=14).contains(&last_two) {
        "лет"
    } else if last_digit == 1 {
        "год"
    } else if (2..=4).contains(&last_digit) {
        "года"
    } else {
        "лет"
    }
}
