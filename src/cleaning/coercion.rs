//! Numeric coercion of raw cells
//!
//! Every configured channel is read whether or not the worksheet really carries
//! it, so coercion never fails: anything that is not a finite number becomes 0.0.
//! This conflates "no data" with "measured zero"; callers that need the
//! distinction must check channel presence on the table first.

use crate::types::CellValue;

/// Convert one cell to a finite number, 0.0 when it is not numeric
pub fn coerce_cell(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(v) => finite_or_zero(*v),
        CellValue::Text(s) => s.trim().parse::<f64>().map_or(0.0, finite_or_zero),
        CellValue::Empty => 0.0,
    }
}

/// Convert a column to a same-length numeric series
pub fn coerce_column<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Vec<f64> {
    cells.into_iter().map(coerce_cell).collect()
}

/// Map NaN and ±inf to 0.0 so every reported number serializes
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(coerce_cell(&CellValue::Number(229.7)), 229.7);
        assert_eq!(coerce_cell(&CellValue::Number(-1.5)), -1.5);
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        assert_eq!(coerce_cell(&CellValue::Text(" 4.25 ".to_string())), 4.25);
        assert_eq!(coerce_cell(&CellValue::Text("1e3".to_string())), 1000.0);
    }

    #[test]
    fn test_non_numeric_becomes_zero() {
        assert_eq!(coerce_cell(&CellValue::Text("---".to_string())), 0.0);
        assert_eq!(coerce_cell(&CellValue::Text(String::new())), 0.0);
        assert_eq!(coerce_cell(&CellValue::Empty), 0.0);
    }

    #[test]
    fn test_non_finite_becomes_zero() {
        assert_eq!(coerce_cell(&CellValue::Number(f64::NAN)), 0.0);
        assert_eq!(coerce_cell(&CellValue::Number(f64::INFINITY)), 0.0);
        assert_eq!(coerce_cell(&CellValue::Text("inf".to_string())), 0.0);
        assert_eq!(coerce_cell(&CellValue::Text("NaN".to_string())), 0.0);
    }

    #[test]
    fn test_column_keeps_length() {
        let cells = vec![
            CellValue::Number(1.0),
            CellValue::Empty,
            CellValue::Text("x".to_string()),
            CellValue::Text("2".to_string()),
        ];
        assert_eq!(coerce_column(&cells), vec![1.0, 0.0, 0.0, 2.0]);
    }
}
