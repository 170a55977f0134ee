// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::macros::format_description;
use time::{Date, Duration, Weekday};

pub const DEFAULT_PROJECTION_OFFSET: i64 = 100;
const SECONDS_PER_DAY: i64 = 86_400;

pub fn parse_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), &format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_date(value: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        value.year(),
        u8::from(value.month()),
        value.day()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationSummary {
    pub total_days: i64,
    pub work_days: i64,
    pub rest_days: i64,
    pub breakdown: String,
}

/// Counts the days between two dates. Work days are Monday through Friday
/// in `[start, end]`, or `[start, end)` when the end date is excluded.
pub fn duration_days(start: Date, end: Date, include_end: bool) -> DurationSummary {
    let span = (end - start).whole_days() + i64::from(include_end);
    let total_days = span.max(0);

    let stop = if include_end {
        end.next_day().unwrap_or(end)
    } else {
        end
    };
    let mut work_days = 0;
    let mut cursor = start;
    while cursor < stop {
        if !matches!(cursor.weekday(), Weekday::Saturday | Weekday::Sunday) {
            work_days += 1;
        }
        match cursor.next_day() {
            Some(next) => cursor = next,
            None => break,
        }
    }

    DurationSummary {
        total_days,
        work_days,
        rest_days: (total_days - work_days).max(0),
        breakdown: breakdown(total_days),
    }
}

fn breakdown(total: i64) -> String {
    let years = total as f64 / 365.0;
    format!(
        "= {}周 {}天 = {}个月 {}天 = {:.2}年",
        total / 7,
        total % 7,
        total / 30,
        total % 30,
        years
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Forward => "之后",
            Self::Backward => "之前",
        }
    }

    pub const fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Moves `start` by whole days. Offsets past the representable calendar
/// give `None`.
pub fn project_date(start: Date, offset_days: i64, direction: Direction) -> Option<Date> {
    let offset = match direction {
        Direction::Forward => Some(offset_days),
        Direction::Backward => offset_days.checked_neg(),
    }?;
    let seconds = offset.checked_mul(SECONDS_PER_DAY)?;
    start.checked_add(Duration::seconds(seconds))
}

pub fn format_zh_date(value: Date) -> String {
    format!(
        "{}年{}月{}日 {}",
        value.year(),
        u8::from(value.month()),
        value.day(),
        weekday_label(value.weekday())
    )
}

pub const fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Monday => "星期一",
        Weekday::Tuesday => "星期二",
        Weekday::Wednesday => "星期三",
        Weekday::Thursday => "星期四",
        Weekday::Friday => "星期五",
        Weekday::Saturday => "星期六",
        Weekday::Sunday => "星期日",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Direction, duration_days, format_date, format_zh_date, parse_date, project_date,
    };
    use time::{Date, Month};

    fn day(year: i32, month: Month, day: u8) -> Date {
        Date::from_calendar_date(year, month, day).expect("valid date")
    }

    #[test]
    fn first_ten_days_of_2024_inclusive() {
        let summary = duration_days(
            day(2024, Month::January, 1),
            day(2024, Month::January, 10),
            true,
        );
        assert_eq!(summary.total_days, 10);
        assert_eq!(summary.work_days, 8);
        assert_eq!(summary.rest_days, 2);
        assert_eq!(summary.breakdown, "= 1周 3天 = 0个月 10天 = 0.03年");
    }

    #[test]
    fn including_end_adds_exactly_one_day() {
        let pairs = [
            (day(2024, Month::January, 1), day(2024, Month::January, 1)),
            (day(2024, Month::February, 27), day(2024, Month::March, 2)),
            (day(2023, Month::December, 30), day(2025, Month::January, 4)),
        ];
        for (start, end) in pairs {
            let inclusive = duration_days(start, end, true);
            let exclusive = duration_days(start, end, false);
            assert_eq!(inclusive.total_days, exclusive.total_days + 1);
        }
    }

    #[test]
    fn reversed_range_clamps_to_zero() {
        let summary = duration_days(
            day(2024, Month::March, 10),
            day(2024, Month::March, 1),
            false,
        );
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.work_days, 0);
        assert_eq!(summary.rest_days, 0);
        assert_eq!(summary.breakdown, "= 0周 0天 = 0个月 0天 = 0.00年");
    }

    #[test]
    fn weekend_only_range_has_no_work_days() {
        // 2024-01-06 is a Saturday.
        let summary = duration_days(
            day(2024, Month::January, 6),
            day(2024, Month::January, 7),
            true,
        );
        assert_eq!(summary.total_days, 2);
        assert_eq!(summary.work_days, 0);
        assert_eq!(summary.rest_days, 2);
    }

    #[test]
    fn full_year_breakdown() {
        let summary = duration_days(
            day(2023, Month::January, 1),
            day(2024, Month::January, 1),
            false,
        );
        assert_eq!(summary.total_days, 365);
        assert_eq!(summary.breakdown, "= 52周 1天 = 12个月 5天 = 1.00年");
    }

    #[test]
    fn parse_rejects_garbage_and_round_trips_iso() {
        assert!(parse_date("").is_none());
        assert!(parse_date("2024-13-01").is_none());
        assert!(parse_date("not a date").is_none());
        let parsed = parse_date(" 2024-02-29 ").expect("leap day parses");
        assert_eq!(format_date(parsed), "2024-02-29");
    }

    #[test]
    fn projection_moves_both_ways_and_formats_in_chinese() {
        let start = day(2024, Month::January, 1);
        let forward = project_date(start, 100, Direction::Forward).expect("in range");
        assert_eq!(format_zh_date(forward), "2024年4月10日 星期三");
        let backward = project_date(start, 1, Direction::Backward).expect("in range");
        assert_eq!(format_zh_date(backward), "2023年12月31日 星期日");
        assert_eq!(Direction::Forward.flip(), Direction::Backward);
    }

    #[test]
    fn projection_past_the_calendar_is_none() {
        let start = day(2024, Month::January, 1);
        assert_eq!(
            project_date(start, 999_999_999_999_999, Direction::Forward),
            None
        );
        assert_eq!(project_date(start, i64::MAX, Direction::Forward), None);
        assert_eq!(project_date(start, i64::MIN, Direction::Backward), None);
        assert_eq!(project_date(start, i64::MIN, Direction::Forward), None);
        assert_eq!(project_date(start, 10_000_000, Direction::Backward), None);
    }
}
