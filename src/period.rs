use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use crate::calendar::ReportingCalendar;
use crate::error::EngineError;

/// Reporting window selector as the UI sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    OneDay,
    OneWeek,
    Months(u32),
    All,
}

impl Period {
    pub fn token(&self) -> String {
        match self {
            Self::OneDay => "1_day".to_string(),
            Self::OneWeek => "1_week".to_string(),
            Self::Months(1) => "1_month".to_string(),
            Self::Months(n) => format!("{n}_months"),
            Self::All => "all".to_string(),
        }
    }
}

impl FromStr for Period {
    type Err = EngineError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "1_day" => Ok(Self::OneDay),
            "1_week" => Ok(Self::OneWeek),
            "1_month" => Ok(Self::Months(1)),
            "2_months" => Ok(Self::Months(2)),
            "3_months" => Ok(Self::Months(3)),
            "6_months" => Ok(Self::Months(6)),
            "10_months" => Ok(Self::Months(10)),
            "all" => Ok(Self::All),
            other => Err(EngineError::InvalidPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Earliest date that still counts, or `None` for no lower bound.
///
/// Month steps are calendar months; a day missing from the target month
/// clamps to its last day (Mar 31 minus one month is Feb 29 in a leap year).
pub fn resolve_period_cutoff(
    period: Period,
    now: DateTime<Utc>,
    calendar: &ReportingCalendar,
) -> Option<NaiveDate> {
    let today = calendar.date_of(now);
    match period {
        Period::OneDay => today.checked_sub_days(Days::new(1)),
        Period::OneWeek => today.checked_sub_days(Days::new(7)),
        Period::Months(n) => today.checked_sub_months(Months::new(n)),
        Period::All => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_offset;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc_calendar() -> ReportingCalendar {
        ReportingCalendar::new(parse_offset("Z").unwrap())
    }

    #[test]
    fn every_token_resolves() {
        let now = Utc.with_ymd_and_hms(2024, 8, 15, 12, 0, 0).unwrap();
        let calendar = utc_calendar();
        let cases = [
            ("1_day", Some(date(2024, 8, 14))),
            ("1_week", Some(date(2024, 8, 8))),
            ("1_month", Some(date(2024, 7, 15))),
            ("2_months", Some(date(2024, 6, 15))),
            ("3_months", Some(date(2024, 5, 15))),
            ("6_months", Some(date(2024, 2, 15))),
            ("10_months", Some(date(2023, 10, 15))),
            ("all", None),
        ];
        for (token, expected) in cases {
            let period: Period = token.parse().unwrap();
            assert_eq!(period.token(), token);
            assert_eq!(resolve_period_cutoff(period, now, &calendar), expected, "{token}");
        }
    }

    #[test]
    fn month_subtraction_is_calendar_based() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap();
        let cutoff = resolve_period_cutoff(Period::Months(1), now, &utc_calendar());
        assert_eq!(cutoff, Some(date(2024, 2, 29)));
    }

    #[test]
    fn now_is_truncated_in_reporting_zone() {
        // 22:00 UTC on the 9th is already the 10th at +05:00
        let now = Utc.with_ymd_and_hms(2024, 5, 9, 22, 0, 0).unwrap();
        let calendar = ReportingCalendar::new(parse_offset("+05:00").unwrap());
        assert_eq!(
            resolve_period_cutoff(Period::OneDay, now, &calendar),
            Some(date(2024, 5, 9))
        );
    }

    #[test]
    fn unknown_tokens_fail_loudly() {
        for token in ["", "ALL", "2_weeks", "12_months", "1_year"] {
            assert_eq!(
                token.parse::<Period>(),
                Err(EngineError::InvalidPeriod(token.to_string()))
            );
        }
    }
}
