//! Date, time and timestamp converters.
//!
//! TIME and TIMESTAMP tags carry microsecond precision: sub-microsecond
//! digits are truncated on bind. Naive timestamps are read and written as UTC
//! when they meet a zoned tag.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc};

use super::{Converter, unsupported_value, unsupported_wire};
use crate::error::{BindError, BindResult};
use crate::value::{AppType, Value};
use crate::wire::{WireType, WireValue};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Drop sub-microsecond digits.
fn truncate_micros<T: Timelike + Copy>(t: T) -> T {
    let nanos = t.nanosecond();
    t.with_nanosecond(nanos - nanos % 1_000).unwrap_or(t)
}

fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
}

/// Accepts `2024-12-25 17:30:00[.ffffff]` and the `T`-separated form.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(&s.trim().replacen('T', " ", 1), TIMESTAMP_FORMAT)
}

/// RFC 3339, or the space-separated form with a `+HH[:MM]` offset.
fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| {
            DateTime::parse_from_str(&s.replacen('T', " ", 1), "%Y-%m-%d %H:%M:%S%.f%#z")
        })
        .map(|dt| dt.with_timezone(&Utc))
}

fn midnight_only(
    app: &AppType,
    wire_type: WireType,
    ts: NaiveDateTime,
) -> BindResult<NaiveDate> {
    if ts.time() != NaiveTime::MIN {
        return Err(BindError::conversion(
            app,
            wire_type,
            ts.format(TIMESTAMP_FORMAT),
            "time of day would be truncated",
        ));
    }
    Ok(ts.date())
}

fn parse_failure(app: &AppType, wire_type: WireType, s: &str, e: chrono::ParseError) -> BindError {
    BindError::conversion(app, wire_type, format!("'{}'", s), e.to_string())
}

// ==================== Date ====================

/// `date` converter. Reading a timestamp with a non-midnight time fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn name(&self) -> &str {
        "date"
    }

    fn app_type(&self) -> AppType {
        AppType::DATE
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Date,
            WireType::Timestamp,
            WireType::Varchar,
            WireType::Char,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Date(d) = value else {
            return Err(unsupported_value(&AppType::DATE, wire_type, value));
        };
        match wire_type {
            WireType::Date => Ok(WireValue::Date(*d)),
            WireType::Timestamp => Ok(WireValue::Timestamp(d.and_time(NaiveTime::MIN))),
            _ => Ok(WireValue::Text(d.format(DATE_FORMAT).to_string())),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Date);
        match value {
            WireValue::Date(d) => Ok(Value::Date(d)),
            WireValue::Timestamp(ts) => midnight_only(&AppType::DATE, wire_type, ts).map(Value::Date),
            WireValue::TimestampTz(dt) => {
                midnight_only(&AppType::DATE, wire_type, dt.naive_utc()).map(Value::Date)
            }
            WireValue::Text(s) => parse_date(&s)
                .map(Value::Date)
                .map_err(|e| parse_failure(&AppType::DATE, wire_type, &s, e)),
            other => Err(unsupported_wire(&AppType::DATE, observed, &other)),
        }
    }
}

// ==================== Time ====================

/// `time` converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeConverter;

impl Converter for TimeConverter {
    fn name(&self) -> &str {
        "time"
    }

    fn app_type(&self) -> AppType {
        AppType::TIME
    }

    fn wire_types(&self) -> &[WireType] {
        &[WireType::Time, WireType::Varchar, WireType::Char]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Time(t) = value else {
            return Err(unsupported_value(&AppType::TIME, wire_type, value));
        };
        let t = truncate_micros(*t);
        match wire_type {
            WireType::Time => Ok(WireValue::Time(t)),
            _ => Ok(WireValue::Text(t.format(TIME_FORMAT).to_string())),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Time);
        match value {
            WireValue::Time(t) => Ok(Value::Time(t)),
            WireValue::Text(s) => parse_time(&s)
                .map(Value::Time)
                .map_err(|e| parse_failure(&AppType::TIME, wire_type, &s, e)),
            other => Err(unsupported_wire(&AppType::TIME, observed, &other)),
        }
    }
}

// ==================== Timestamp ====================

/// `timestamp` converter for naive date-times.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampConverter;

impl Converter for TimestampConverter {
    fn name(&self) -> &str {
        "timestamp"
    }

    fn app_type(&self) -> AppType {
        AppType::TIMESTAMP
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::Timestamp,
            WireType::TimestampWithTimezone,
            WireType::Date,
            WireType::Varchar,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::Timestamp(ts) = value else {
            return Err(unsupported_value(&AppType::TIMESTAMP, wire_type, value));
        };
        let ts = truncate_micros(*ts);
        match wire_type {
            WireType::Timestamp => Ok(WireValue::Timestamp(ts)),
            WireType::TimestampWithTimezone => Ok(WireValue::TimestampTz(Utc.from_utc_datetime(&ts))),
            WireType::Date => midnight_only(&AppType::TIMESTAMP, wire_type, ts).map(WireValue::Date),
            _ => Ok(WireValue::Text(ts.format(TIMESTAMP_FORMAT).to_string())),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::Timestamp);
        match value {
            WireValue::Timestamp(ts) => Ok(Value::Timestamp(ts)),
            WireValue::TimestampTz(dt) => Ok(Value::Timestamp(dt.naive_utc())),
            WireValue::Date(d) => Ok(Value::Timestamp(d.and_time(NaiveTime::MIN))),
            WireValue::Text(s) => parse_timestamp(&s)
                .map(Value::Timestamp)
                .map_err(|e| parse_failure(&AppType::TIMESTAMP, wire_type, &s, e)),
            other => Err(unsupported_wire(&AppType::TIMESTAMP, observed, &other)),
        }
    }
}

/// `timestamptz` converter for UTC instants.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampTzConverter;

impl Converter for TimestampTzConverter {
    fn name(&self) -> &str {
        "timestamptz"
    }

    fn app_type(&self) -> AppType {
        AppType::TIMESTAMPTZ
    }

    fn wire_types(&self) -> &[WireType] {
        &[
            WireType::TimestampWithTimezone,
            WireType::Timestamp,
            WireType::Varchar,
        ]
    }

    fn to_wire(&self, value: &Value, wire_type: WireType) -> BindResult<WireValue> {
        let Value::TimestampTz(dt) = value else {
            return Err(unsupported_value(&AppType::TIMESTAMPTZ, wire_type, value));
        };
        let dt = truncate_micros(*dt);
        match wire_type {
            WireType::TimestampWithTimezone => Ok(WireValue::TimestampTz(dt)),
            WireType::Timestamp => Ok(WireValue::Timestamp(dt.naive_utc())),
            _ => Ok(WireValue::Text(dt.to_rfc3339_opts(SecondsFormat::Micros, true))),
        }
    }

    fn from_wire(&self, value: WireValue, observed: Option<WireType>) -> BindResult<Value> {
        let wire_type = observed.unwrap_or(WireType::TimestampWithTimezone);
        match value {
            WireValue::TimestampTz(dt) => Ok(Value::TimestampTz(dt)),
            WireValue::Timestamp(ts) => Ok(Value::TimestampTz(Utc.from_utc_datetime(&ts))),
            WireValue::Text(s) => parse_timestamptz(&s)
                .map(Value::TimestampTz)
                .map_err(|e| parse_failure(&AppType::TIMESTAMPTZ, wire_type, &s, e)),
            other => Err(unsupported_wire(&AppType::TIMESTAMPTZ, observed, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_timestamp_truncates_to_micros() {
        let with_nanos = ts("2024-12-25 17:30:00.123456789");
        let wire = TimestampConverter
            .to_wire(&Value::Timestamp(with_nanos), WireType::Timestamp)
            .unwrap();
        assert_eq!(wire, WireValue::Timestamp(ts("2024-12-25 17:30:00.123456")));
    }

    #[test]
    fn test_timestamp_text_forms() {
        assert_eq!(
            TimestampConverter
                .from_wire(WireValue::Text("2024-12-25T17:30:00".into()), None)
                .unwrap(),
            Value::Timestamp(ts("2024-12-25 17:30:00"))
        );
        assert!(TimestampConverter
            .from_wire(WireValue::Text("yesterday".into()), None)
            .is_err());
    }

    #[test]
    fn test_date_refuses_to_drop_time() {
        let err = DateConverter
            .from_wire(WireValue::Timestamp(ts("2024-01-01 08:00:00")), Some(WireType::Timestamp))
            .unwrap_err();
        assert!(err.is_conversion());
        assert_eq!(
            DateConverter
                .from_wire(WireValue::Timestamp(ts("2024-01-01 00:00:00")), None)
                .unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_timestamp_as_date_needs_midnight() {
        assert!(TimestampConverter
            .to_wire(&Value::Timestamp(ts("2024-01-01 08:00:00")), WireType::Date)
            .is_err());
    }

    #[test]
    fn test_timestamptz_text_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(
            TimestampTzConverter
                .from_wire(WireValue::Text("2024-06-01T12:00:00+02:00".into()), None)
                .unwrap(),
            Value::TimestampTz(expected)
        );
        assert_eq!(
            TimestampTzConverter
                .from_wire(WireValue::Text("2024-06-01 10:00:00+00".into()), None)
                .unwrap(),
            Value::TimestampTz(expected)
        );
    }

    #[test]
    fn test_time_text() {
        assert_eq!(
            TimeConverter.from_wire(WireValue::Text("07:05:09".into()), None).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(7, 5, 9).unwrap())
        );
    }
}
