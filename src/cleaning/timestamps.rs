//! Trend timestamp normalization
//!
//! Loggers export the trend sheet with a `Date` column in the Thai solar
//! calendar (`dd/mm/yyyy`, year offset +543) and a separate `Time` column.
//! Normalization:
//! 1. Convert the year back to Gregorian (malformed dates pass through untouched)
//! 2. Parse `date time` as `%d/%m/%Y %H:%M:%S`; rows that fail are dropped
//! 3. Keep the first row of every instant
//! 4. Coerce every other column to numbers for the surviving rows

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::coercion;
use crate::types::{RawTable, TimeSeriesTable};

/// Trend column carrying the calendar date
pub const DATE_COLUMN: &str = "Date";
/// Trend column carrying the time of day
pub const TIME_COLUMN: &str = "Time";
/// Combined timestamp format after year conversion
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
/// Thai solar calendar year minus Gregorian year
pub const DEFAULT_CALENDAR_YEAR_OFFSET: i32 = 543;

/// Row accounting for one normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub total_rows: usize,
    pub unparseable_rows: usize,
    pub duplicate_rows: usize,
}

impl NormalizeStats {
    pub fn retained_rows(&self) -> usize {
        self.total_rows - self.unparseable_rows - self.duplicate_rows
    }
}

/// Convert `d/m/yyyy` with a calendar year offset to zero-padded Gregorian `dd/mm/yyyy`.
///
/// Anything that does not split into exactly three integer fields is returned
/// unchanged; it fails timestamp parsing afterwards and the row is dropped there.
pub fn convert_calendar_year(date: &str, year_offset: i32) -> String {
    let parts: Vec<&str> = date.trim().split('/').collect();
    let [day, month, year] = parts.as_slice() else {
        return date.to_string();
    };
    match (
        day.trim().parse::<u32>(),
        month.trim().parse::<u32>(),
        year.trim().parse::<i32>(),
    ) {
        (Ok(day), Ok(month), Ok(year)) => {
            format!("{:02}/{:02}/{}", day, month, year - year_offset)
        }
        _ => date.to_string(),
    }
}

/// Parse a Gregorian date string and a time string into one instant
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&combined, TIMESTAMP_FORMAT).ok()
}

/// Build the cleaned trend table from the raw trend sheet.
///
/// Never fails: a sheet without `Date`/`Time` simply yields an empty table.
pub fn normalize_trend(raw: &RawTable, year_offset: i32) -> (TimeSeriesTable, NormalizeStats) {
    let mut stats = NormalizeStats {
        total_rows: raw.len(),
        ..Default::default()
    };

    let (Some(date_idx), Some(time_idx)) =
        (raw.column_index(DATE_COLUMN), raw.column_index(TIME_COLUMN))
    else {
        warn!(
            rows = raw.len(),
            "Trend sheet has no Date/Time columns, every row dropped"
        );
        stats.unparseable_rows = raw.len();
        return (TimeSeriesTable::default(), stats);
    };

    // (timestamp, source row) for rows that parse
    let mut kept: Vec<(NaiveDateTime, usize)> = Vec::with_capacity(raw.len());
    let mut seen: HashSet<NaiveDateTime> = HashSet::with_capacity(raw.len());

    for row in 0..raw.len() {
        let date = raw.cell(row, date_idx).as_text();
        let time = raw.cell(row, time_idx).as_text();
        let parsed = match (date, time) {
            (Some(date), Some(time)) => {
                parse_timestamp(&convert_calendar_year(&date, year_offset), &time)
            }
            _ => None,
        };

        let Some(ts) = parsed else {
            stats.unparseable_rows += 1;
            continue;
        };
        if !seen.insert(ts) {
            stats.duplicate_rows += 1;
            continue;
        }
        kept.push((ts, row));
    }

    // Source order is normally chronological; a stable sort keeps it that way otherwise
    kept.sort_by_key(|(ts, _)| *ts);

    let mut channels = BTreeMap::new();
    for (idx, name) in raw.columns.iter().enumerate() {
        if idx == date_idx || idx == time_idx {
            continue;
        }
        let name = name.trim().to_string();
        if channels.contains_key(&name) {
            continue;
        }
        let series = coercion::coerce_column(kept.iter().map(|(_, row)| raw.cell(*row, idx)));
        channels.insert(name, series);
    }

    if stats.unparseable_rows > 0 {
        warn!(
            dropped = stats.unparseable_rows,
            total = stats.total_rows,
            "Dropped trend rows with unparseable timestamps"
        );
    }
    debug!(
        retained = stats.retained_rows(),
        duplicates = stats.duplicate_rows,
        channels = channels.len(),
        "Trend table normalized"
    );

    let timestamps = kept.into_iter().map(|(ts, _)| ts).collect();
    (TimeSeriesTable::from_parts(timestamps, channels), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use chrono::NaiveDate;

    fn trend(rows: Vec<(&str, &str, f64)>) -> RawTable {
        RawTable::new(
            vec!["Date".to_string(), "Time".to_string(), "U1 RMS".to_string()],
            rows.into_iter()
                .map(|(d, t, v)| vec![d.into(), t.into(), v.into()])
                .collect(),
        )
    }

    #[test]
    fn test_calendar_year_conversion() {
        assert_eq!(convert_calendar_year("15/03/2567", 543), "15/03/2024");
        assert_eq!(convert_calendar_year("1/2/2566", 543), "01/02/2023");
        assert_eq!(convert_calendar_year("1/2/2023", 0), "01/02/2023");
    }

    #[test]
    fn test_malformed_dates_pass_through() {
        assert_eq!(convert_calendar_year("2567-03-15", 543), "2567-03-15");
        assert_eq!(convert_calendar_year("15/03", 543), "15/03");
        assert_eq!(convert_calendar_year("aa/03/2567", 543), "aa/03/2567");
        assert_eq!(convert_calendar_year("1/2/3/4", 543), "1/2/3/4");
        assert_eq!(convert_calendar_year("nan", 543), "nan");
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("15/03/2024", "10:20:30").unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 20, 30)
            .unwrap();
        assert_eq!(ts, expected);
        assert!(parse_timestamp("2567-03-15", "10:20:30").is_none());
        assert!(parse_timestamp("15/03/2024", "25:00:00").is_none());
    }

    #[test]
    fn test_unparseable_rows_are_dropped() {
        let raw = trend(vec![
            ("15/03/2567", "10:00:00", 230.0),
            ("garbage", "10:00:03", 231.0),
            ("15/03/2567", "not a time", 232.0),
            ("15/03/2567", "10:00:06", 233.0),
        ]);
        let (table, stats) = normalize_trend(&raw, 543);
        assert_eq!(stats.unparseable_rows, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.channel("U1 RMS"), Some(&[230.0, 233.0][..]));
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let raw = trend(vec![
            ("15/03/2567", "10:00:00", 230.0),
            ("15/03/2567", "10:00:00", 999.0),
            ("15/03/2567", "10:00:03", 231.0),
        ]);
        let (table, stats) = normalize_trend(&raw, 543);
        assert_eq!(stats.duplicate_rows, 1);
        assert_eq!(stats.retained_rows(), 2);
        assert_eq!(table.channel("U1 RMS"), Some(&[230.0, 231.0][..]));
    }

    #[test]
    fn test_timestamps_are_non_decreasing_and_unique() {
        let raw = trend(vec![
            ("15/03/2567", "10:00:06", 3.0),
            ("15/03/2567", "10:00:00", 1.0),
            ("15/03/2567", "10:00:03", 2.0),
        ]);
        let (table, _) = normalize_trend(&raw, 543);
        let ts = table.timestamps();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(table.channel("U1 RMS"), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_missing_date_column_yields_empty_table() {
        let raw = RawTable::new(
            vec!["Time".to_string(), "U1 RMS".to_string()],
            vec![vec!["10:00:00".into(), CellValue::Number(230.0)]],
        );
        let (table, stats) = normalize_trend(&raw, 543);
        assert!(table.is_empty());
        assert_eq!(stats.unparseable_rows, 1);
    }

    #[test]
    fn test_non_numeric_channel_cells_become_zero() {
        let raw = RawTable::new(
            vec!["Date".to_string(), "Time".to_string(), "A1 THD".to_string()],
            vec![
                vec!["15/03/2567".into(), "10:00:00".into(), "n/a".into()],
                vec!["15/03/2567".into(), "10:00:03".into(), CellValue::Empty],
                vec!["15/03/2567".into(), "10:00:06".into(), "3.5".into()],
            ],
        );
        let (table, _) = normalize_trend(&raw, 543);
        assert_eq!(table.channel("A1 THD"), Some(&[0.0, 0.0, 3.5][..]));
    }
}
