use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Serialize, Serializer};

use crate::CatalogError;

/// Seconds granularity, the only form datestamps are ever written in.
pub const DATESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DAY_FORMAT: &str = "%Y-%m-%d";
const DAY_LEN: usize = "YYYY-MM-DD".len();
const SECONDS_LEN: usize = "YYYY-MM-DDThh:mm:ssZ".len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Day,
    Second,
}

/// UTC timestamp truncated to whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Datestamp(DateTime<Utc>);

impl Datestamp {
    pub fn from_utc(at: DateTime<Utc>) -> Self {
        Self(at.with_nanosecond(0).unwrap_or(at))
    }

    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parses either granularity; a day is taken at midnight.
    pub fn parse_with_granularity(raw: &str) -> Option<(Self, Granularity)> {
        match raw.len() {
            SECONDS_LEN => NaiveDateTime::parse_from_str(raw, DATESTAMP_FORMAT)
                .ok()
                .map(|naive| (Self(naive.and_utc()), Granularity::Second)),
            DAY_LEN => NaiveDate::parse_from_str(raw, DAY_FORMAT)
                .ok()
                .map(|day| (Self(day.and_time(NaiveTime::MIN).and_utc()), Granularity::Day)),
            _ => None,
        }
    }

    /// Accepts only the seconds form, so that parsing is the exact inverse of `Display`.
    pub fn parse_canonical(raw: &str) -> Option<Self> {
        match Self::parse_with_granularity(raw) {
            Some((stamp, Granularity::Second)) => Some(stamp),
            _ => None,
        }
    }

    fn end_of_day(self) -> Self {
        let day = self.0.date_naive();
        let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Self(day.and_time(last).and_utc())
    }
}

impl fmt::Display for Datestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATESTAMP_FORMAT))
    }
}

impl FromStr for Datestamp {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse_with_granularity(raw)
            .map(|(stamp, _)| stamp)
            .ok_or_else(|| CatalogError::BadArgument(format!("malformed datestamp '{raw}'")))
    }
}

impl Serialize for Datestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive `from`/`until` bounds of a selective harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub from: Option<Datestamp>,
    pub until: Option<Datestamp>,
}

impl DateWindow {
    /// Parses request arguments.
    ///
    /// Both bounds must share a granularity, a day-granularity `until` covers the
    /// whole day, and `from` may not be later than `until`.
    pub fn parse(from: Option<&str>, until: Option<&str>) -> Result<Self, CatalogError> {
        let from = from.map(parse_bound).transpose()?;
        let until = until.map(parse_bound).transpose()?;

        if let (Some((_, from_gran)), Some((_, until_gran))) = (from, until) {
            if from_gran != until_gran {
                return Err(CatalogError::BadArgument(
                    "from and until use different granularities".into(),
                ));
            }
        }

        let window = Self {
            from: from.map(|(stamp, _)| stamp),
            until: until.map(|(stamp, gran)| match gran {
                Granularity::Day => stamp.end_of_day(),
                Granularity::Second => stamp,
            }),
        };
        window.check_order()?;
        Ok(window)
    }

    pub fn new(from: Option<Datestamp>, until: Option<Datestamp>) -> Result<Self, CatalogError> {
        let window = Self { from, until };
        window.check_order()?;
        Ok(window)
    }

    pub fn contains(&self, stamp: Datestamp) -> bool {
        self.from.map_or(true, |from| stamp >= from) && self.until.map_or(true, |until| stamp <= until)
    }

    fn check_order(&self) -> Result<(), CatalogError> {
        match (self.from, self.until) {
            (Some(from), Some(until)) if from > until => Err(CatalogError::BadArgument(format!(
                "from {from} is later than until {until}"
            ))),
            _ => Ok(()),
        }
    }
}

fn parse_bound(raw: &str) -> Result<(Datestamp, Granularity), CatalogError> {
    Datestamp::parse_with_granularity(raw)
        .ok_or_else(|| CatalogError::BadArgument(format!("malformed datestamp '{raw}'")))
}
