use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::calendar::ReportingCalendar;
use crate::enrollment::EnrollmentWindow;
use crate::models::{AttendanceRecord, MeritRecord};

pub trait DatedRecord {
    fn student_id(&self) -> Uuid;
    fn raw_date(&self) -> &str;
}

impl DatedRecord for AttendanceRecord {
    fn student_id(&self) -> Uuid {
        self.student_id
    }

    fn raw_date(&self) -> &str {
        &self.date
    }
}

impl DatedRecord for MeritRecord {
    fn student_id(&self) -> Uuid {
        self.student_id
    }

    fn raw_date(&self) -> &str {
        &self.date
    }
}

/// A record that passed the filter, with its parsed date.
#[derive(Debug)]
pub struct Dated<'a, T> {
    pub date: NaiveDate,
    pub record: &'a T,
}

impl<T> Clone for Dated<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Dated<'_, T> {}

/// Period cutoff AND enrollment window, applied the same way to every
/// record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub cutoff: Option<NaiveDate>,
    pub window: EnrollmentWindow,
}

impl EventFilter {
    pub fn new(cutoff: Option<NaiveDate>, window: EnrollmentWindow) -> Self {
        Self { cutoff, window }
    }

    pub fn admits(&self, date: NaiveDate) -> bool {
        self.cutoff.map_or(true, |cutoff| date >= cutoff) && self.window.contains(date)
    }

    /// Keeps admitted records in input order. Unparseable dates are logged
    /// and dropped.
    pub fn apply<'a, T, I>(&self, records: I, calendar: &ReportingCalendar) -> Vec<Dated<'a, T>>
    where
        T: DatedRecord + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        records
            .into_iter()
            .filter_map(|record| match calendar.parse_date(record.raw_date()) {
                Ok(date) => Some(Dated { date, record }),
                Err(err) => {
                    warn!(student_id = %record.student_id(), error = %err, "skipping record");
                    None
                }
            })
            .filter(|dated| self.admits(dated.date))
            .collect()
    }
}
