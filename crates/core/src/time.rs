use chrono::{DateTime, Utc};

/// Source of wall-clock timestamps for attempts and session start times.
///
/// Countdowns never read the clock; they advance only through explicit ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn default_clock() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

/// `HH:MM:SS` for countdowns; hours are not capped at 24.
#[must_use]
pub fn format_hms(total_secs: u64) -> String {
    let (hours, rest) = (total_secs / 3600, total_secs % 3600);
    format!("{hours:02}:{:02}:{:02}", rest / 60, rest % 60)
}

/// 2023-11-14T22:13:20Z, for deterministic tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_does_not_move() {
        let clock = Clock::fixed(fixed_now());
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().timestamp(), 1_700_000_000);
        assert_eq!(Clock::default(), Clock::default_clock());
    }

    #[test]
    fn hms_formatting_pads_fields() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(10_800), "03:00:00");
        assert_eq!(format_hms(3_723), "01:02:03");
        assert_eq!(format_hms(90_000), "25:00:00");
    }
}
