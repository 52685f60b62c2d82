use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::MediaError;

/// An `H:MM:SS:FF` position on an edit timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
}

impl Timecode {
    /// Absolute frame count at `frame_rate`.
    pub fn total_frames(&self, frame_rate: u32) -> u64 {
        let seconds = u64::from(self.hours) * 3600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds);
        seconds * u64::from(frame_rate) + u64::from(self.frames)
    }

    /// Time from `origin` to `self`. Fails if `self` precedes `origin` or a
    /// frame field does not fit `frame_rate`.
    pub fn offset_from(&self, origin: &Timecode, frame_rate: u32) -> Result<Duration, MediaError> {
        if frame_rate == 0 {
            return Err(MediaError::Timecode("frame rate must be positive".into()));
        }
        for tc in [self, origin] {
            if tc.frames >= frame_rate {
                return Err(MediaError::Timecode(format!(
                    "{tc} has frame {} at {frame_rate} fps",
                    tc.frames
                )));
            }
        }

        let (at, start) = (self.total_frames(frame_rate), origin.total_frames(frame_rate));
        let frames = at.checked_sub(start).ok_or_else(|| {
            MediaError::Timecode(format!("{self} is before timeline origin {origin}"))
        })?;

        Ok(Duration::from_millis(frames * 1000 / u64::from(frame_rate)))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

impl FromStr for Timecode {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MediaError::Timecode(format!("expected H:MM:SS:FF, got '{s}'"));

        let parts: Vec<u32> = s
            .trim()
            .split(':')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;
        let &[hours, minutes, seconds, frames] = parts.as_slice() else {
            return Err(invalid());
        };
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
            frames,
        })
    }
}
