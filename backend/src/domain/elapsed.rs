//! Elapsed time between stored events and a reference instant.
//!
//! Stored dates and times are wall-clock text with no zone attached, so all
//! arithmetic happens on naive date-times. The caller supplies "now".

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use shared::{columns, Category, ElapsedTime, TimeSinceLast, Unavailable, DATE_FORMAT, TIME_FORMAT};

use crate::storage::Row;

/// Seconds-precision variant accepted from spreadsheets that reformat times
const TIME_FORMAT_WITH_SECONDS: &str = "%H:%M:%S";

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, TIME_FORMAT_WITH_SECONDS))
        .ok()
}

/// Time from `from` to `to`, floored at zero
pub fn elapsed_between(from: NaiveDateTime, to: NaiveDateTime) -> ElapsedTime {
    ElapsedTime::from_seconds((to - from).num_seconds())
}

/// Length of a period given by clock times on one date.
///
/// With `wraps` set, an end earlier than the start is taken to be on the
/// next day. Otherwise the plain difference is floored at zero.
pub fn span_length(start: NaiveTime, end: NaiveTime, wraps: bool) -> ElapsedTime {
    let mut length = end - start;
    if wraps && length < Duration::zero() {
        length = length + Duration::days(1);
    }
    ElapsedTime::from_seconds(length.num_seconds())
}

/// Time since the event recorded in `row`, relative to `reference`
pub fn time_since_row(
    category: Category,
    row: &Row,
    reference: NaiveDateTime,
    collapse_after_day: bool,
) -> TimeSinceLast {
    let date = row.get(columns::DATE).and_then(parse_date);
    let time = row.get(category.event_time_column()).and_then(parse_time);

    let (Some(date), Some(time)) = (date, time) else {
        return TimeSinceLast::Unavailable(Unavailable::ParseError);
    };

    let elapsed = elapsed_between(date.and_time(time), reference);
    if collapse_after_day && elapsed.exceeds_day() {
        TimeSinceLast::MoreThanADay(elapsed)
    } else {
        TimeSinceLast::Elapsed(elapsed)
    }
}
