//! Evaluation settings
//!
//! Everything a formula could otherwise read from ambient state (locale date
//! formats, the wall clock) is passed in explicitly through [`EvaluationSettings`].

use chrono::{Local, NaiveDateTime};
use std::sync::OnceLock;

/// Default `TODAY()` format, the en-US short date (`10/17/2026`)
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Default `NOW()` format, the en-US short date-time (`10/17/2026, 3:04:05 PM`)
pub const DEFAULT_DATETIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

static DEFAULT_SETTINGS: OnceLock<EvaluationSettings> = OnceLock::new();

/// Source of the current time for volatile functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Local wall-clock time
    #[default]
    System,
    /// A pinned instant, for tests and reproducible runs
    Fixed(NaiveDateTime),
}

impl Clock {
    /// Current local date and time according to this clock
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(at) => *at,
        }
    }
}

/// Settings consulted while evaluating formulas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationSettings {
    /// `strftime` pattern used by `TODAY()`
    pub date_format: String,
    /// `strftime` pattern used by `NOW()`
    pub datetime_format: String,
    /// Where `TODAY()` and `NOW()` read the time from
    pub clock: Clock,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            clock: Clock::System,
        }
    }
}

impl EvaluationSettings {
    /// Shared default settings
    pub fn shared_default() -> &'static EvaluationSettings {
        DEFAULT_SETTINGS.get_or_init(EvaluationSettings::default)
    }

    /// Pin the clock to a fixed instant
    pub fn with_fixed_clock(mut self, at: NaiveDateTime) -> Self {
        self.clock = Clock::Fixed(at);
        self
    }

    /// Override the `TODAY()` format
    pub fn with_date_format<S: Into<String>>(mut self, format: S) -> Self {
        self.date_format = format.into();
        self
    }

    /// Override the `NOW()` format
    pub fn with_datetime_format<S: Into<String>>(mut self, format: S) -> Self {
        self.datetime_format = format.into();
        self
    }
}
