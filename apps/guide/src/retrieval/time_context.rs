//! Time-of-day context. The clock is injected so ranking is reproducible.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;

/// Source of "now" for ranking and prompt time context.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in the server's local timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stopped at one instant.
#[cfg(test)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl FixedClock {
    pub fn at(hour: u32, minute: u32) -> Self {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 4, 14)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid fixed clock time");
        Self(at)
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimePeriod {
    /// 06–12 morning, 12–17 afternoon, 17–22 evening, otherwise night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=16 => TimePeriod::Afternoon,
            17..=21 => TimePeriod::Evening,
            _ => TimePeriod::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Morning => "morning",
            TimePeriod::Afternoon => "afternoon",
            TimePeriod::Evening => "evening",
            TimePeriod::Night => "night",
        }
    }

    /// Query vocabulary that implies this period.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            TimePeriod::Morning => &["breakfast", "early", "dawn", "6am", "7am", "8am", "9am"],
            TimePeriod::Afternoon => &["lunch", "noon", "midday", "12pm", "1pm", "2pm", "3pm"],
            TimePeriod::Evening => &["dinner", "sunset", "dusk", "6pm", "7pm", "8pm", "9pm"],
            TimePeriod::Night => &["late", "night", "after", "10pm", "11pm", "midnight"],
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            TimePeriod::Morning => {
                "It's morning now, so breakfast places and early activities are most relevant."
            }
            TimePeriod::Afternoon => {
                "It's afternoon now, so lunch options and midday activities are most suitable."
            }
            TimePeriod::Evening => {
                "It's evening now, so dinner places and evening activities are ideal."
            }
            TimePeriod::Night => {
                "It's late night now, so options may be limited. Most places close early."
            }
        }
    }
}

/// Query words that ask about opening hours or timing in general.
pub const TIMING_KEYWORDS: &[&str] = &["when", "time", "hours", "open", "close", "schedule"];

/// A resolved "now" plus its period, captured once per query.
#[derive(Debug, Clone, Copy)]
pub struct TimeContext {
    pub at: NaiveDateTime,
    pub period: TimePeriod,
}

impl TimeContext {
    pub fn from_clock(clock: &dyn Clock) -> Self {
        let at = clock.now();
        Self {
            at,
            period: TimePeriod::from_hour(at.hour()),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Current time: {} ({}). {}",
            self.at.format("%I:%M %p"),
            self.period.as_str(),
            self.period.guidance()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_boundaries() {
        assert_eq!(TimePeriod::from_hour(5), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(6), TimePeriod::Morning);
        assert_eq!(TimePeriod::from_hour(11), TimePeriod::Morning);
        assert_eq!(TimePeriod::from_hour(12), TimePeriod::Afternoon);
        assert_eq!(TimePeriod::from_hour(17), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(21), TimePeriod::Evening);
        assert_eq!(TimePeriod::from_hour(22), TimePeriod::Night);
        assert_eq!(TimePeriod::from_hour(0), TimePeriod::Night);
    }

    #[test]
    fn test_time_context_from_fixed_clock() {
        let ctx = TimeContext::from_clock(&FixedClock::at(7, 30));
        assert_eq!(ctx.period, TimePeriod::Morning);
        let text = ctx.describe();
        assert!(text.starts_with("Current time: 07:30 AM (morning)."), "got {text}");
        assert!(text.contains("breakfast"));
    }

    #[test]
    fn test_late_night_description() {
        let ctx = TimeContext::from_clock(&FixedClock::at(23, 5));
        assert_eq!(ctx.period, TimePeriod::Night);
        assert!(ctx.describe().contains("11:05 PM (night)"));
    }
}
