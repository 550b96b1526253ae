//! Background sync cadence.
//!
//! The engine only answers the scheduling math (when the next full run
//! is due) and the host process owns the actual timer, so embedding in
//! a request-driven runtime with no resident scheduler thread stays
//! possible.

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// How often the batch runner sweeps all linked identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCadence {
    /// No background runs; only events and manual actions sync.
    Disabled,
    /// Every N minutes.
    EveryMinutes(u32),
    /// At the top of every hour.
    Hourly,
    /// Once a day at the given UTC hour.
    Daily {
        /// Hour of day (0-23 UTC).
        hour: u8,
    },
}

impl Default for SyncCadence {
    fn default() -> Self {
        // Overnight full sweep keeps drift bounded without competing
        // with daytime interactive traffic for quota.
        Self::Daily { hour: 2 }
    }
}

impl std::fmt::Display for SyncCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::EveryMinutes(minutes) => write!(f, "every_{minutes}m"),
            Self::Hourly => write!(f, "hourly"),
            Self::Daily { hour } => write!(f, "daily@{hour:02}"),
        }
    }
}

impl std::str::FromStr for SyncCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "disabled" => Ok(Self::Disabled),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily { hour: 2 }),
            _ => {
                if let Some(hour) = s.strip_prefix("daily@") {
                    let hour: u8 = hour
                        .parse()
                        .map_err(|_| format!("Invalid cadence hour: {s}"))?;
                    if hour > 23 {
                        return Err(format!("Cadence hour out of range: {s}"));
                    }
                    return Ok(Self::Daily { hour });
                }
                if let Some(minutes) = s.strip_prefix("every_").and_then(|r| r.strip_suffix('m')) {
                    let minutes: u32 = minutes
                        .parse()
                        .map_err(|_| format!("Invalid cadence interval: {s}"))?;
                    if minutes == 0 {
                        return Err(format!("Cadence interval must be > 0: {s}"));
                    }
                    return Ok(Self::EveryMinutes(minutes));
                }
                Err(format!("Invalid sync cadence: {s}"))
            }
        }
    }
}

impl SyncCadence {
    /// The next run time after `from`, or `None` when disabled.
    #[must_use]
    pub fn next_run(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Disabled => None,
            Self::EveryMinutes(minutes) => Some(from + Duration::minutes(i64::from(*minutes))),
            Self::Hourly => {
                let next = from + Duration::hours(1);
                Some(
                    next.date_naive()
                        .and_time(NaiveTime::from_hms_opt(next.hour(), 0, 0)?)
                        .and_utc(),
                )
            }
            Self::Daily { hour } => {
                let target_time = NaiveTime::from_hms_opt(u32::from(*hour), 0, 0)?;
                let today_target = from.date_naive().and_time(target_time).and_utc();
                if from < today_target {
                    Some(today_target)
                } else {
                    let tomorrow = from.date_naive() + Duration::days(1);
                    Some(tomorrow.and_time(target_time).and_utc())
                }
            }
        }
    }

    /// Whether a scheduled run is due, within a tolerance window around
    /// the planned time.
    #[must_use]
    pub fn is_due(
        &self,
        next_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        tolerance: Duration,
    ) -> bool {
        if matches!(self, Self::Disabled) {
            return false;
        }
        match next_run {
            Some(next) => now >= next - tolerance && now <= next + tolerance,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_display_and_parse_roundtrip() {
        for cadence in [
            SyncCadence::Disabled,
            SyncCadence::EveryMinutes(15),
            SyncCadence::Hourly,
            SyncCadence::Daily { hour: 4 },
        ] {
            let parsed: SyncCadence = cadence.to_string().parse().unwrap();
            assert_eq!(parsed, cadence);
        }
    }

    #[test]
    fn test_parse_rejects_nonsense() {
        assert!("sometimes".parse::<SyncCadence>().is_err());
        assert!("every_0m".parse::<SyncCadence>().is_err());
        assert!("daily@25".parse::<SyncCadence>().is_err());
    }

    #[test]
    fn test_parse_bare_daily_defaults_to_two() {
        assert_eq!(
            "daily".parse::<SyncCadence>().unwrap(),
            SyncCadence::Daily { hour: 2 }
        );
    }

    #[test]
    fn test_disabled_never_runs() {
        let now = Utc::now();
        assert_eq!(SyncCadence::Disabled.next_run(now), None);
        assert!(!SyncCadence::Disabled.is_due(Some(now), now, Duration::minutes(5)));
    }

    #[test]
    fn test_every_minutes_adds_interval() {
        let now = Utc.with_ymd_and_hms(2026, 1, 25, 10, 30, 0).unwrap();
        let next = SyncCadence::EveryMinutes(15).next_run(now).unwrap();
        assert_eq!(next, now + Duration::minutes(15));
    }

    #[test]
    fn test_hourly_lands_on_the_hour() {
        let now = Utc.with_ymd_and_hms(2026, 1, 25, 10, 30, 0).unwrap();
        let next = SyncCadence::Hourly.next_run(now).unwrap();
        assert_eq!(next.hour(), 11);
        assert_eq!(next.minute(), 0);
    }

    #[test]
    fn test_daily_before_and_after_target() {
        let cadence = SyncCadence::Daily { hour: 2 };

        // Before target time: runs today.
        let now = Utc.with_ymd_and_hms(2026, 1, 25, 1, 0, 0).unwrap();
        let next = cadence.next_run(now).unwrap();
        assert_eq!((next.day(), next.hour()), (25, 2));

        // After target time: runs tomorrow.
        let now = Utc.with_ymd_and_hms(2026, 1, 25, 10, 0, 0).unwrap();
        let next = cadence.next_run(now).unwrap();
        assert_eq!((next.day(), next.hour()), (26, 2));
    }

    #[test]
    fn test_is_due_respects_tolerance() {
        let cadence = SyncCadence::Daily { hour: 2 };
        let next = Utc.with_ymd_and_hms(2026, 1, 25, 2, 0, 0).unwrap();
        let tolerance = Duration::minutes(5);

        assert!(cadence.is_due(Some(next), next, tolerance));
        assert!(cadence.is_due(Some(next), next - Duration::minutes(3), tolerance));
        assert!(!cadence.is_due(Some(next), next - Duration::minutes(10), tolerance));
        assert!(!cadence.is_due(None, next, tolerance));
    }
}
