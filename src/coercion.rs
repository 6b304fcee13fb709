//! Raw value coercion for numeric dimensions
//!
//! Converters return `Ok(None)` when a value is null or cannot be parsed and
//! failures are not being reported. Callers decide what a missing value
//! becomes; numeric indexers replace it with the zero sentinel through
//! [`null_to_zero`].

use crate::value::RawValue;
use crate::{Error, Result};

use std::str::FromStr;

pub const ZERO_FLOAT: f32 = 0.0;
pub const ZERO_DOUBLE: f64 = 0.0;
pub const ZERO_LONG: i64 = 0;

/// Replace a missing numeric value with its zero sentinel.
///
/// Every comparison, equality and hash on numeric encoded values goes through
/// here, so nullable numeric semantics only need to change this function.
pub fn null_to_zero<T: Default>(value: Option<T>) -> T {
    value.unwrap_or_default()
}

fn parse_failure<T>(value: &RawValue, target: &str, report: bool) -> Result<Option<T>> {
    if report {
        Err(Error::ParseFailure(format!(
            "could not convert value [{}] of type {} to {}",
            value,
            value.type_name(),
            target
        )))
    } else {
        Ok(None)
    }
}

/// Strings parse straight into `T` so that each input is rounded once.
fn convert<T: FromStr>(
    value: &RawValue,
    target: &str,
    report: bool,
    from_long: impl FnOnce(i64) -> T,
    from_double: impl FnOnce(f64) -> T,
) -> Result<Option<T>> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Long(v) => Ok(Some(from_long(*v))),
        RawValue::Double(v) => Ok(Some(from_double(*v))),
        RawValue::String(s) => match s.trim().parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => parse_failure(value, target, report),
        },
        RawValue::Bool(_) | RawValue::List(_) => parse_failure(value, target, report),
    }
}

fn to_f64(value: &RawValue, target: &str, report: bool) -> Result<Option<f64>> {
    convert(value, target, report, |v| v as f64, |v| v)
}

/// Convert a raw value to `f32`
pub fn convert_to_float(value: &RawValue, report_parse_failures: bool) -> Result<Option<f32>> {
    convert(value, "float", report_parse_failures, |v| v as f32, |v| v as f32)
}

/// Convert a raw value to `f64`
pub fn convert_to_double(value: &RawValue, report_parse_failures: bool) -> Result<Option<f64>> {
    to_f64(value, "double", report_parse_failures)
}

/// Convert a raw value to `i64`.
///
/// Integer strings parse exactly; decimal strings and doubles truncate toward
/// zero, saturating at the `i64` bounds.
pub fn convert_to_long(value: &RawValue, report_parse_failures: bool) -> Result<Option<i64>> {
    match value {
        RawValue::Long(v) => Ok(Some(*v)),
        RawValue::String(s) => match s.trim().parse::<i64>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => Ok(to_f64(value, "long", report_parse_failures)?.map(|v| v as i64)),
        },
        other => Ok(to_f64(other, "long", report_parse_failures)?.map(|v| v as i64)),
    }
}

/// Render a raw scalar as a dictionary string. Null and empty strings are null.
pub fn convert_to_string(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        RawValue::String(s) if s.is_empty() => None,
        RawValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_to_zero() {
        assert_eq!(null_to_zero::<f32>(None), ZERO_FLOAT);
        assert_eq!(null_to_zero(Some(1.5f64)), 1.5);
        assert_eq!(null_to_zero::<i64>(None), ZERO_LONG);
    }

    #[test]
    fn test_convert_float() {
        assert_eq!(convert_to_float(&RawValue::from("3.5"), false).unwrap(), Some(3.5));
        assert_eq!(convert_to_float(&RawValue::from(" 1e2 "), false).unwrap(), Some(100.0));
        assert_eq!(convert_to_float(&RawValue::Long(4), false).unwrap(), Some(4.0));
        assert_eq!(convert_to_float(&RawValue::Null, true).unwrap(), None);
    }

    #[test]
    fn test_float_strings_round_once() {
        // just above the midpoint of 1.0 and the next f32
        let raw = RawValue::from("1.0000000596046447753906251");
        let parsed = convert_to_float(&raw, true).unwrap().unwrap();
        assert_eq!(parsed.to_bits(), 0x3f80_0001);
        assert_eq!(Some(parsed), "1.0000000596046447753906251".parse::<f32>().ok());

        // through f64 the same string lands on the midpoint and ties to even
        let via_double = convert_to_double(&raw, true).unwrap().unwrap() as f32;
        assert_eq!(via_double.to_bits(), 0x3f80_0000);
    }

    #[test]
    fn test_unparseable_respects_reporting_flag() {
        let raw = RawValue::from("abc");
        assert_eq!(convert_to_float(&raw, false).unwrap(), None);

        let err = convert_to_float(&raw, true).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
        assert!(format!("{err}").contains("abc"));

        assert_eq!(convert_to_double(&RawValue::Bool(true), false).unwrap(), None);
        assert!(convert_to_double(&RawValue::Bool(true), true).is_err());
    }

    #[test]
    fn test_convert_long() {
        assert_eq!(convert_to_long(&RawValue::from("42"), false).unwrap(), Some(42));
        assert_eq!(convert_to_long(&RawValue::from("42.9"), false).unwrap(), Some(42));
        assert_eq!(convert_to_long(&RawValue::Double(-3.7), false).unwrap(), Some(-3));
        assert_eq!(
            convert_to_long(&RawValue::from("9223372036854775807"), false).unwrap(),
            Some(i64::MAX)
        );
        assert_eq!(convert_to_long(&RawValue::from("x"), false).unwrap(), None);
    }

    #[test]
    fn test_convert_string() {
        assert_eq!(convert_to_string(&RawValue::Null), None);
        assert_eq!(convert_to_string(&RawValue::from("")), None);
        assert_eq!(convert_to_string(&RawValue::Long(5)).as_deref(), Some("5"));
        assert_eq!(convert_to_string(&RawValue::Bool(false)).as_deref(), Some("false"));
    }
}
