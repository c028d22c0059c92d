use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::format::format_value;

pub const DELIMITER: &str = "\t";
pub const SEPARATOR: &str = "--------";

/// Renders `batch` as a tab separated table.
///
/// The output is a header line of column names, a dashed separator line,
/// one line per row and a trailing blank line.
pub fn render_batch(batch: &RecordBatch) -> String {
    let schema = batch.schema();
    let fields = schema.fields();

    let mut out = String::new();
    out.push_str(&fields.iter().map(|f| f.name()).join(DELIMITER));
    out.push('\n');
    out.push_str(&fields.iter().map(|_| SEPARATOR).join(DELIMITER));
    out.push('\n');

    for row in 0..batch.num_rows() {
        let line = batch
            .columns()
            .iter()
            .map(|col| format_value(col.as_ref(), row))
            .join(DELIMITER);
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn trips() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("fare", DataType::Float64, true),
            Field::new("pickup", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
                Arc::new(Float64Array::from(vec![Some(12.5), None])),
                Arc::new(StringArray::from(vec!["A", "B"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_render_trips() {
        let text = render_batch(&trips());
        assert_eq!(
            text,
            "id\tfare\tpickup\n--------\t--------\t--------\n1\t12.50\tA\n2\tNULL\tB\n\n"
        );
    }

    #[test]
    fn test_line_and_field_counts() {
        let batch = trips();
        let text = render_batch(&batch);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), batch.num_rows() + 3);
        assert_eq!(lines.last(), Some(&""));
        for line in &lines[..lines.len() - 1] {
            assert_eq!(line.split(DELIMITER).count(), batch.num_columns());
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let batch = trips();
        assert_eq!(render_batch(&batch), render_batch(&batch));
    }

    #[test]
    fn test_empty_batch() {
        let batch = RecordBatch::new_empty(trips().schema());
        assert_eq!(
            render_batch(&batch),
            "id\tfare\tpickup\n--------\t--------\t--------\n\n"
        );
    }

    #[test]
    fn test_unsupported_column_degrades_only_its_cells() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("paid", DataType::Boolean, true),
            Field::new("zone", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![7])) as ArrayRef,
                Arc::new(BooleanArray::from(vec![true])),
                Arc::new(StringArray::from(vec!["Queens"])),
            ],
        )
        .unwrap();

        let text = render_batch(&batch);
        let row = text.lines().nth(2).unwrap();
        assert_eq!(row, "7\tUnsupported type: Boolean\tQueens");
    }
}
