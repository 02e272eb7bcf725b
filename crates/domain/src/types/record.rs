//! Source event (`Record`) types — §3 Data Model.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One publisher's type of listing. Ads are rare but participate in
/// blocking and scoring like any other source type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Article,
    Listing,
    Ad,
}

/// An inclusive date range with optional start/end clock times.
///
/// `end_date`, when present, denotes a multi-day event spanning
/// `[date, end_date]` inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateRange {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    /// Expand this range into the set of calendar days it covers
    /// (inclusive of both endpoints).
    #[must_use]
    pub fn expand_days(&self) -> Vec<NaiveDate> {
        let end = self.end_date.unwrap_or(self.date);
        if end < self.date {
            return vec![self.date];
        }
        let mut days = Vec::new();
        let mut cur = self.date;
        loop {
            days.push(cur);
            if cur >= end {
                break;
            }
            cur = match cur.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        days
    }
}

/// Geocoded location, present only when the source supplied coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: f64,
}

/// One source event as ingested from a publisher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: String,
    pub source_code: String,
    pub source_type: SourceType,

    pub title: String,
    pub title_normalized: String,

    pub short_description: Option<String>,
    pub description: Option<String>,
    pub highlights: Vec<String>,

    pub location_name: Option<String>,
    pub location_city: Option<String>,
    pub location_city_normalized: Option<String>,
    pub location_district: Option<String>,
    pub location_street: Option<String>,
    pub location_zipcode: Option<String>,
    pub geo: Option<GeoPoint>,

    pub categories: BTreeSet<String>,

    pub is_family_event: Option<bool>,
    pub is_child_focused: Option<bool>,
    pub admission_free: Option<bool>,

    pub dates: Vec<DateRange>,

    pub blocking_keys: BTreeSet<String>,
}

impl Record {
    /// Calendar days covered by this record's dates, deduplicated.
    #[must_use]
    pub fn expanded_days(&self) -> BTreeSet<NaiveDate> {
        self.dates.iter().flat_map(DateRange::expand_days).collect()
    }

    /// First date/time of the first date range, if any — used by the
    /// date scorer's time-proximity factor.
    #[must_use]
    pub fn first_start(&self) -> Option<(NaiveDate, Option<NaiveTime>)> {
        self.dates.first().map(|d| (d.date, d.start_time))
    }
}
