//! The ordering dialogue as a pure state machine.
//!
//! [`advance`] never touches storage or the network: it returns the next
//! session, the replies to show and at most one [`Effect`] for the caller
//! to carry out.

use common::delivery::{Notice, NoticeAction};
use common::validation::{NameValidator, validate_child_age, years_word};
use serde::{Deserialize, Serialize};

pub const CONFIRM_ACTION: &str = "confirm_yes";
pub const REJECT_ACTION: &str = "confirm_no";

const WELCOME: &str = "Добро пожаловать в бота \"Новогоднее поздравление\"! 🎄\n\n\
                       Пожалуйста, поделитесь своим номером телефона, нажав на кнопку ниже:";
const WELCOME_BACK: &str = "С возвращением! Рады видеть вас снова! 🎄";
const PHONE_RECEIVED: &str = "✅ Спасибо! Номер телефона получен.";
const PHONE_INVALID: &str = "⚠️ Некорректный номер телефона. Пожалуйста, используйте кнопку \
                             \"Поделиться номером телефона\".";
const NAME_PROMPT: &str = "✨ Введите имя ребенка, для которого создается видеопоздравление:\n\n\
                           💡 <i>Если в имени есть буква «ё», используйте именно её — так \
                           озвучка будет качественнее!</i>";
const AGE_PROMPT: &str = "🎂 Сколько лет ребенку?\n\nВведите возраст (от 1 до 18 лет):";
const NAME_AGAIN: &str = "Хорошо, введите имя ребенка заново:";
const CANCELLED: &str = "❌ Диалог отменён. Введите /start для повтора.";
const IDLE_HINT: &str = "Введите /start, чтобы заказать видеопоздравление.";
const WAIT_CURRENT: &str = "⏳ Пожалуйста, дождитесь завершения текущего заказа.";
const ORDER_ANOTHER: &str = "Замечательно! 🎁 Создадим еще одно новогоднее поздравление!";

/// Where a user is in the ordering dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    AwaitingPhone,
    AwaitingName,
    AwaitingAge {
        child_name: String,
    },
    AwaitingConfirmation {
        child_name: String,
        child_age: i32,
    },
}

impl FlowState {
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// One user action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowInput {
    Start,
    Contact {
        phone_number: String,
        #[serde(default)]
        first_name: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },
    Text {
        text: String,
    },
    Confirm,
    Reject,
    Cancel,
    OrderAnother,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub state: FlowState,
    /// "Order another" was pressed; the next start skips the welcome back.
    pub reordering: bool,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SavePhone {
        phone_number: String,
        first_name: Option<String>,
        username: Option<String>,
    },
    PlaceOrder {
        child_name: String,
        child_age: i32,
    },
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NoticeAction>,
    /// Show the "share phone number" keyboard.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub request_contact: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
            request_contact: false,
        }
    }

    pub fn from_notice(notice: &Notice) -> Self {
        Self::with_actions(notice.text(), notice.action().into_iter().collect())
    }

    fn with_actions(text: impl Into<String>, actions: Vec<NoticeAction>) -> Self {
        Self {
            actions,
            ..Self::text(text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub replies: Vec<Reply>,
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(state: FlowState, reordering: bool, replies: Vec<Reply>) -> Self {
        Self {
            session: Session { state, reordering },
            replies,
            effect: None,
        }
    }

    fn stay(session: &Session, replies: Vec<Reply>) -> Self {
        Self {
            session: session.clone(),
            replies,
            effect: None,
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

fn ask_phone() -> Reply {
    Reply {
        request_contact: true,
        ..Reply::text(WELCOME)
    }
}

fn confirmation(child_name: &str, child_age: i32) -> Reply {
    Reply::with_actions(
        format!(
            "Вы указали:\n<b>Имя:</b> {child_name}\n<b>Возраст:</b> {child_age} {}\n\nВсё верно?",
            years_word(child_age)
        ),
        vec![
            NoticeAction {
                label: "✅ Да, всё верно".into(),
                callback_data: CONFIRM_ACTION.into(),
            },
            NoticeAction {
                label: "❌ Нет, ввести заново".into(),
                callback_data: REJECT_ACTION.into(),
            },
        ],
    )
}

/// Commands typed as text are treated like their button counterparts.
fn as_command(input: FlowInput) -> FlowInput {
    match input {
        FlowInput::Text { text } => match text.trim() {
            "/start" => FlowInput::Start,
            "/cancel" => FlowInput::Cancel,
            _ => FlowInput::Text { text },
        },
        other => other,
    }
}

fn start(has_phone: bool, reordering: bool) -> Transition {
    if !has_phone {
        return Transition::to(FlowState::AwaitingPhone, reordering, vec![ask_phone()]);
    }

    let mut replies = Vec::with_capacity(2);
    if !reordering {
        replies.push(Reply::text(WELCOME_BACK));
    }
    replies.push(Reply::text(NAME_PROMPT));
    Transition::to(FlowState::AwaitingName, false, replies)
}

pub fn advance(
    session: &Session,
    has_phone: bool,
    input: FlowInput,
    validator: &NameValidator,
) -> Transition {
    match (&session.state, as_command(input)) {
        (_, FlowInput::Start) => start(has_phone, session.reordering),

        (_, FlowInput::Cancel) => {
            Transition::to(FlowState::Idle, false, vec![Reply::text(CANCELLED)])
        }

        (state, FlowInput::OrderAnother) if state.is_in_progress() => {
            Transition::stay(session, vec![Reply::text(WAIT_CURRENT)])
        }
        (_, FlowInput::OrderAnother) => {
            if !has_phone {
                return start(false, true);
            }
            Transition::to(
                FlowState::AwaitingName,
                true,
                vec![Reply::text(format!("{ORDER_ANOTHER}\n\n{NAME_PROMPT}"))],
            )
        }

        (
            FlowState::AwaitingPhone,
            FlowInput::Contact {
                phone_number,
                first_name,
                username,
            },
        ) => {
            let phone_number = phone_number.trim().to_string();
            if !is_plausible_phone(&phone_number) {
                return Transition::stay(session, vec![Reply::text(PHONE_INVALID)]);
            }
            Transition::to(
                FlowState::AwaitingName,
                false,
                vec![Reply::text(PHONE_RECEIVED), Reply::text(NAME_PROMPT)],
            )
            .with_effect(Effect::SavePhone {
                phone_number,
                first_name,
                username,
            })
        }
        (FlowState::AwaitingPhone, FlowInput::Text { .. }) => {
            Transition::stay(session, vec![Reply::text(PHONE_INVALID), ask_phone()])
        }

        (FlowState::AwaitingName, FlowInput::Text { text }) => match validator.validate(&text) {
            Ok(child_name) => Transition::to(
                FlowState::AwaitingAge {
                    child_name: child_name.to_string(),
                },
                session.reordering,
                vec![Reply::text(AGE_PROMPT)],
            ),
            Err(e) => Transition::stay(session, vec![Reply::text(e.to_string())]),
        },

        (FlowState::AwaitingAge { child_name }, FlowInput::Text { text }) => {
            match validate_child_age(&text) {
                Ok(child_age) => Transition::to(
                    FlowState::AwaitingConfirmation {
                        child_name: child_name.clone(),
                        child_age,
                    },
                    session.reordering,
                    vec![confirmation(child_name, child_age)],
                ),
                Err(e) => Transition::stay(session, vec![Reply::text(e.to_string())]),
            }
        }

        (
            FlowState::AwaitingConfirmation {
                child_name,
                child_age,
            },
            FlowInput::Confirm,
        ) => Transition::to(FlowState::Idle, false, Vec::new()).with_effect(Effect::PlaceOrder {
            child_name: child_name.clone(),
            child_age: *child_age,
        }),
        (FlowState::AwaitingConfirmation { .. }, FlowInput::Reject) => Transition::to(
            FlowState::AwaitingName,
            session.reordering,
            vec![Reply::text(NAME_AGAIN)],
        ),
        (
            FlowState::AwaitingConfirmation {
                child_name,
                child_age,
            },
            FlowInput::Text { .. },
        ) => Transition::stay(session, vec![confirmation(child_name, *child_age)]),

        (FlowState::Idle, FlowInput::Text { .. }) => {
            Transition::stay(session, vec![Reply::text(IDLE_HINT)])
        }

        // Stale buttons and contacts outside the phone step.
        _ => Transition::stay(session, Vec::new()),
    }
}

fn is_plausible_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (5..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
