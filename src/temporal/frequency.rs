use chrono::{Duration, Months, NaiveDateTime};
use std::fmt;

use crate::error::{Error, Result};

/// Spacing between consecutive periods of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Every second
    Secondly,
    /// Every minute
    Minutely,
    /// Every hour
    Hourly,
    /// Every day
    Daily,
    /// Every week
    Weekly,
    /// Every calendar month
    Monthly,
    /// Every three calendar months
    Quarterly,
    /// Every calendar year
    Yearly,
    /// Fixed custom spacing
    Custom(Duration),
}

impl Frequency {
    /// Parse a frequency string ("D", "hour", "3H", "2W", ...)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "S" | "SEC" | "SECOND" | "SECONDS" => Some(Frequency::Secondly),
            "T" | "MIN" | "MINUTE" | "MINUTES" => Some(Frequency::Minutely),
            "H" | "HOUR" | "HOURS" | "HOURLY" => Some(Frequency::Hourly),
            "D" | "DAY" | "DAYS" | "DAILY" => Some(Frequency::Daily),
            "W" | "WEEK" | "WEEKS" | "WEEKLY" => Some(Frequency::Weekly),
            "M" | "MS" | "MONTH" | "MONTHS" | "MONTHLY" => Some(Frequency::Monthly),
            "Q" | "QS" | "QUARTER" | "QUARTERS" | "QUARTERLY" => Some(Frequency::Quarterly),
            "Y" | "YS" | "YEAR" | "YEARS" | "A" | "ANNUAL" | "ANNUALLY" | "YEARLY" => {
                Some(Frequency::Yearly)
            }
            _ => parse_custom_frequency(s.trim()),
        }
    }

    /// Approximate length of one period in seconds
    ///
    /// Months and years use 30 and 365 days.
    pub fn to_seconds(&self) -> i64 {
        match self {
            Frequency::Secondly => 1,
            Frequency::Minutely => 60,
            Frequency::Hourly => 3600,
            Frequency::Daily => 86400,
            Frequency::Weekly => 604800,
            Frequency::Monthly => 2592000,
            Frequency::Quarterly => 7776000,
            Frequency::Yearly => 31536000,
            Frequency::Custom(duration) => duration.num_seconds(),
        }
    }

    /// Timestamp `periods` steps after `start`
    ///
    /// Calendar frequencies step by calendar months so month ends stay aligned.
    pub fn advance(&self, start: NaiveDateTime, periods: u32) -> Result<NaiveDateTime> {
        let stepped = match self {
            Frequency::Monthly => start.checked_add_months(Months::new(periods)),
            Frequency::Quarterly => start.checked_add_months(Months::new(periods.saturating_mul(3))),
            Frequency::Yearly => start.checked_add_months(Months::new(periods.saturating_mul(12))),
            fixed => Duration::try_seconds(fixed.to_seconds() * periods as i64)
                .and_then(|step| start.checked_add_signed(step)),
        };
        stepped.ok_or_else(|| {
            Error::InvalidValue(format!(
                "{} periods of {} after {} is out of the representable date range",
                periods, self, start
            ))
        })
    }

    /// Infer the spacing of a series from the median gap between timestamps
    ///
    /// Gaps close to a calendar month/quarter/year map to the calendar frequency.
    pub fn infer(timestamps: &[NaiveDateTime]) -> Option<Self> {
        let mut gaps: Vec<i64> = timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds())
            .filter(|gap| *gap > 0)
            .collect();
        if gaps.is_empty() {
            return None;
        }
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];
        let day = 86400;

        let frequency = match median {
            1 => Frequency::Secondly,
            60 => Frequency::Minutely,
            3600 => Frequency::Hourly,
            86400 => Frequency::Daily,
            604800 => Frequency::Weekly,
            g if (28 * day..=31 * day).contains(&g) => Frequency::Monthly,
            g if (89 * day..=92 * day).contains(&g) => Frequency::Quarterly,
            g if (365 * day..=366 * day).contains(&g) => Frequency::Yearly,
            g => Frequency::Custom(Duration::seconds(g)),
        };
        Some(frequency)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Secondly => write!(f, "S"),
            Frequency::Minutely => write!(f, "T"),
            Frequency::Hourly => write!(f, "H"),
            Frequency::Daily => write!(f, "D"),
            Frequency::Weekly => write!(f, "W"),
            Frequency::Monthly => write!(f, "M"),
            Frequency::Quarterly => write!(f, "Q"),
            Frequency::Yearly => write!(f, "Y"),
            Frequency::Custom(duration) => write!(f, "{}s", duration.num_seconds()),
        }
    }
}

/// Parse strings like "3D" or "2H"
fn parse_custom_frequency(s: &str) -> Option<Frequency> {
    let split = s.find(|c: char| !c.is_ascii_digit())?;
    if split == 0 {
        return None;
    }
    let (num_chars, unit_chars) = s.split_at(split);
    let num: i64 = num_chars.parse().ok()?;
    if num <= 0 {
        return None;
    }

    // Out-of-range spans are rejected rather than overflowing
    let duration = match unit_chars.to_uppercase().as_str() {
        "S" | "SEC" | "SECOND" | "SECONDS" => Duration::try_seconds(num),
        "T" | "MIN" | "MINUTE" | "MINUTES" => Duration::try_minutes(num),
        "H" | "HOUR" | "HOURS" => Duration::try_hours(num),
        "D" | "DAY" | "DAYS" => Duration::try_days(num),
        "W" | "WEEK" | "WEEKS" => Duration::try_weeks(num),
        _ => None,
    }?;
    Some(Frequency::Custom(duration))
}
