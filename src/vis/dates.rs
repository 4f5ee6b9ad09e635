//! Adaptive date ticks
//!
//! [`AutoDateLocator`] chooses a calendar unit and a step so that a time span
//! gets a readable number of ticks, and [`AutoDateFormatter`] picks a label
//! format to match the unit. Ticks fall on unit boundaries (1 January, the 1st
//! of a month, midnight, ...) but start at the first boundary inside the span
//! instead of snapping to multiples of the step.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Calendar unit of a tick step, largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateUnit {
    const ALL: [DateUnit; 6] = [
        DateUnit::Year,
        DateUnit::Month,
        DateUnit::Day,
        DateUnit::Hour,
        DateUnit::Minute,
        DateUnit::Second,
    ];

    /// Candidate steps, smallest first
    fn intervals(&self) -> &'static [u32] {
        match self {
            DateUnit::Year => &[1, 2, 4, 5, 10, 20, 40, 50, 100, 200, 400, 500, 1000],
            DateUnit::Month => &[1, 2, 3, 4, 6],
            DateUnit::Day => &[1, 2, 3, 7, 14],
            DateUnit::Hour => &[1, 2, 3, 4, 6, 12],
            DateUnit::Minute => &[1, 5, 10, 15, 30],
            DateUnit::Second => &[1, 5, 10, 15, 30],
        }
    }

    /// Most ticks a step of this unit may produce
    fn max_ticks(&self) -> i64 {
        match self {
            DateUnit::Month | DateUnit::Hour => 12,
            _ => 11,
        }
    }

    /// Whole units between two timestamps
    fn count(&self, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
        let delta = end - start;
        match self {
            DateUnit::Year => months_between(start, end) / 12,
            DateUnit::Month => months_between(start, end),
            DateUnit::Day => delta.num_days(),
            DateUnit::Hour => delta.num_hours(),
            DateUnit::Minute => delta.num_minutes(),
            DateUnit::Second => delta.num_seconds(),
        }
    }

    /// Start of the unit containing `ts`
    fn floor(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        let (y, m) = (date.year(), date.month());
        match self {
            DateUnit::Year => first_of(y, 1),
            DateUnit::Month => first_of(y, m),
            DateUnit::Day => date.and_time(NaiveTime::MIN),
            DateUnit::Hour => date.and_time(NaiveTime::MIN) + Duration::hours(ts.hour() as i64),
            DateUnit::Minute => {
                date.and_time(NaiveTime::MIN)
                    + Duration::minutes((ts.hour() * 60 + ts.minute()) as i64)
            }
            DateUnit::Second => {
                date.and_time(NaiveTime::MIN) + Duration::seconds(ts.num_seconds_from_midnight() as i64)
            }
        }
    }

    fn step(&self, ts: NaiveDateTime, n: u32) -> Option<NaiveDateTime> {
        match self {
            DateUnit::Year => ts.checked_add_months(Months::new(n.checked_mul(12)?)),
            DateUnit::Month => ts.checked_add_months(Months::new(n)),
            DateUnit::Day => ts.checked_add_signed(Duration::days(n as i64)),
            DateUnit::Hour => ts.checked_add_signed(Duration::hours(n as i64)),
            DateUnit::Minute => ts.checked_add_signed(Duration::minutes(n as i64)),
            DateUnit::Second => ts.checked_add_signed(Duration::seconds(n as i64)),
        }
    }
}

fn first_of(year: i32, month: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

fn months_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let mut months = (end.year() - start.year()) as i64 * 12 + end.month() as i64 - start.month() as i64;
    // An incomplete last month does not count
    if months > 0 && (end.day(), end.time()) < (start.day(), start.time()) {
        months -= 1;
    }
    months
}

/// Tick unit and step chosen for a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStep {
    pub unit: DateUnit,
    pub interval: u32,
}

/// Picks date ticks whose density follows the visible span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoDateLocator {
    /// Fewest ticks a unit must produce to be chosen
    pub min_ticks: i64,
}

impl Default for AutoDateLocator {
    fn default() -> Self {
        AutoDateLocator { min_ticks: 5 }
    }
}

impl AutoDateLocator {
    /// Largest unit with at least `min_ticks` whole units in the span, with the
    /// smallest step that keeps the tick count under that unit's maximum
    pub fn step_for(&self, start: NaiveDateTime, end: NaiveDateTime) -> TickStep {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        for unit in DateUnit::ALL {
            let count = unit.count(start, end);
            if count < self.min_ticks {
                continue;
            }
            let intervals = unit.intervals();
            let interval = intervals
                .iter()
                .copied()
                .find(|i| count <= *i as i64 * (unit.max_ticks() - 1))
                .unwrap_or(intervals[intervals.len() - 1]);
            return TickStep { unit, interval };
        }
        TickStep {
            unit: DateUnit::Second,
            interval: 1,
        }
    }

    /// Tick positions inside `[start, end]`
    pub fn ticks(&self, start: NaiveDateTime, end: NaiveDateTime) -> (TickStep, Vec<NaiveDateTime>) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let step = self.step_for(start, end);

        let mut tick = step.unit.floor(start);
        if tick < start {
            tick = match step.unit.step(tick, 1) {
                Some(next) => next,
                None => return (step, Vec::new()),
            };
        }
        let mut ticks = Vec::new();
        let mut n = 0;
        while let Some(ts) = step.unit.step(tick, n * step.interval) {
            if ts > end {
                break;
            }
            ticks.push(ts);
            n += 1;
        }
        (step, ticks)
    }
}

/// Label format that matches the tick unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoDateFormatter;

impl AutoDateFormatter {
    pub fn pattern(&self, unit: DateUnit) -> &'static str {
        match unit {
            DateUnit::Year => "%Y",
            DateUnit::Month => "%Y-%m",
            DateUnit::Day => "%Y-%m-%d",
            DateUnit::Hour => "%m-%d %H:%M",
            DateUnit::Minute => "%H:%M",
            DateUnit::Second => "%H:%M:%S",
        }
    }

    pub fn format(&self, unit: DateUnit, ts: &NaiveDateTime) -> String {
        ts.format(self.pattern(unit)).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn decade_span_uses_years() {
        let locator = AutoDateLocator::default();
        let (step, ticks) = locator.ticks(at(2010, 3, 15), at(2020, 6, 1));
        assert_eq!(step.unit, DateUnit::Year);
        assert_eq!(step.interval, 1);
        assert_eq!(ticks.first(), Some(&at(2011, 1, 1)));
        assert_eq!(ticks.last(), Some(&at(2020, 1, 1)));
    }

    #[test]
    fn hundred_days_tick_daily_eight_months_monthly() {
        let locator = AutoDateLocator::default();
        let (step, ticks) = locator.ticks(at(2020, 1, 1), at(2020, 4, 10));
        assert_eq!(step.unit, DateUnit::Day);
        assert!(ticks.len() <= 11);

        let (step, _) = locator.ticks(at(2020, 1, 1), at(2020, 9, 10));
        assert_eq!(step.unit, DateUnit::Month);
    }

    #[test]
    fn long_span_widens_the_step() {
        let locator = AutoDateLocator::default();
        let (step, ticks) = locator.ticks(at(1990, 1, 1), at(2020, 1, 1));
        assert_eq!(step.unit, DateUnit::Year);
        assert_eq!(step.interval, 4);
        assert!(ticks.len() <= 11);
        // starts at the first boundary, not at a multiple of the step
        assert_eq!(ticks[0], at(1990, 1, 1));
        assert_eq!(ticks[1], at(1994, 1, 1));
    }

    #[test]
    fn formatter_follows_unit() {
        let f = AutoDateFormatter;
        let ts = at(2021, 7, 4);
        assert_eq!(f.format(DateUnit::Year, &ts), "2021");
        assert_eq!(f.format(DateUnit::Month, &ts), "2021-07");
        assert_eq!(f.format(DateUnit::Day, &ts), "2021-07-04");
    }
}
