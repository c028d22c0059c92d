use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float64Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
};
use chrono::{DateTime, SecondsFormat, Utc};

pub const NULL: &str = "NULL";

/// Returns true when [`format_value`] has a rendering for `data_type`.
pub fn is_supported(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int32
            | DataType::Int64
            | DataType::Float64
            | DataType::Utf8
            | DataType::Timestamp(TimeUnit::Microsecond, _)
    )
}

/// Renders the value at `row` of `column` as display text.
///
/// Nulls render as `NULL` whatever the column type. Columns of a type
/// outside the supported set render a placeholder naming that type.
pub fn format_value(column: &dyn Array, row: usize) -> String {
    debug_assert!(row < column.len(), "row {} out of bounds", row);

    if column.is_null(row) {
        return NULL.to_owned();
    }

    match column.data_type() {
        DataType::Int32 => column.as_primitive::<Int32Type>().value(row).to_string(),
        DataType::Int64 => column.as_primitive::<Int64Type>().value(row).to_string(),
        DataType::Float64 => format!("{:.2}", column.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => column.as_string::<i32>().value(row).to_owned(),
        // only microsecond timestamps are modeled; seconds, millis and nanos
        // fall through to the placeholder instead of being read as micros
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            format_timestamp(column.as_primitive::<TimestampMicrosecondType>().value(row))
        }
        other => unsupported(other),
    }
}

fn format_timestamp(micros: i64) -> String {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    match DateTime::<Utc>::from_timestamp(secs, nanos) {
        Some(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => format!("Invalid timestamp: {}", micros),
    }
}

fn unsupported(data_type: &DataType) -> String {
    format!("Unsupported type: {}", data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray,
        TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    };
    use std::sync::Arc;

    #[test]
    fn test_null_renders_as_null_for_every_type() {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int32Array::from(vec![None, Some(1)])),
            Arc::new(Int64Array::from(vec![None, Some(1)])),
            Arc::new(Float64Array::from(vec![None, Some(1.0)])),
            Arc::new(StringArray::from(vec![None, Some("a")])),
            Arc::new(TimestampMicrosecondArray::from(vec![None, Some(0)])),
            Arc::new(BooleanArray::from(vec![None, Some(true)])),
        ];
        for column in &columns {
            assert_eq!(format_value(column.as_ref(), 0), "NULL", "{}", column.data_type());
        }
    }

    #[test]
    fn test_integers() {
        let a = Int32Array::from(vec![-42, 1_000_000]);
        assert_eq!(format_value(&a, 0), "-42");
        assert_eq!(format_value(&a, 1), "1000000");

        let b = Int64Array::from(vec![i64::MAX]);
        assert_eq!(format_value(&b, 0), "9223372036854775807");
    }

    #[test]
    fn test_float_two_decimals() {
        let a = Float64Array::from(vec![12.5, 3.14159, 7.0, -1.005e3]);
        assert_eq!(format_value(&a, 0), "12.50");
        assert_eq!(format_value(&a, 1), "3.14");
        assert_eq!(format_value(&a, 2), "7.00");
        assert_eq!(format_value(&a, 3), "-1005.00");
    }

    #[test]
    fn test_text_is_raw() {
        let a = StringArray::from(vec!["tab\there", "ünïcode", ""]);
        assert_eq!(format_value(&a, 0), "tab\there");
        assert_eq!(format_value(&a, 1), "ünïcode");
        assert_eq!(format_value(&a, 2), "");
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let micros = 1_420_167_845_000_000;
        let a = TimestampMicrosecondArray::from(vec![micros, micros + 999_999]);
        assert_eq!(format_value(&a, 0), "2015-01-02T03:04:05Z");
        assert_eq!(format_value(&a, 1), "2015-01-02T03:04:05Z");

        let utc = TimestampMicrosecondArray::from(vec![0]).with_timezone("Etc/UTC");
        assert_eq!(format_value(&utc, 0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_timestamp_out_of_range() {
        let a = TimestampMicrosecondArray::from(vec![i64::MAX]);
        assert_eq!(format_value(&a, 0), format!("Invalid timestamp: {}", i64::MAX));
    }

    #[test]
    fn test_unsupported_types() {
        let a = BooleanArray::from(vec![true]);
        assert_eq!(format_value(&a, 0), "Unsupported type: Boolean");
        assert!(!is_supported(a.data_type()));

        let millis = TimestampMillisecondArray::from(vec![0]);
        assert!(format_value(&millis, 0).starts_with("Unsupported type: Timestamp"));

        let nanos = TimestampNanosecondArray::from(vec![1_420_167_845_000_000_000]);
        assert!(format_value(&nanos, 0).starts_with("Unsupported type: Timestamp(Nanosecond"));
    }

    #[test]
    fn test_deterministic() {
        let a = Float64Array::from(vec![Some(2.345), None]);
        for row in 0..a.len() {
            assert_eq!(format_value(&a, row), format_value(&a, row));
        }
    }
}
