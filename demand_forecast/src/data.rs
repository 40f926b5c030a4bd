//! Demand time series loading and daily aggregation

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

/// Name of the required timestamp column.
pub const TIME_COLUMN: &str = "slot_start_time";
/// Name of the required demand column.
pub const DEMAND_COLUMN: &str = "demand";

/// Raw demand records parsed from a CSV dataset.
///
/// The full DataFrame is retained so columns beyond the required two pass
/// through untouched; the validated timestamp/demand pairs are extracted once
/// at load time.
#[derive(Debug, Clone)]
pub struct DemandRecords {
    /// Data frame containing all parsed columns
    df: DataFrame,
    /// Parsed `slot_start_time` values, in input order
    timestamps: Vec<NaiveDateTime>,
    /// Parsed `demand` values, in input order
    demand: Vec<f64>,
}

/// Data loader for demand records
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load demand records from a CSV file
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<DemandRecords> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Load demand records from in-memory CSV bytes (e.g. an uploaded file)
    pub fn from_csv_bytes(bytes: Vec<u8>) -> Result<DemandRecords> {
        let df = CsvReader::new(Cursor::new(bytes))
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df)
    }

    /// Validate an existing DataFrame and extract the required columns
    pub fn from_dataframe(df: DataFrame) -> Result<DemandRecords> {
        let timestamps = Self::extract_timestamps(&df)?;
        let demand = Self::extract_demand(&df)?;

        Ok(DemandRecords {
            df,
            timestamps,
            demand,
        })
    }

    /// Extract the timestamp column, accepting strings or temporal dtypes
    fn extract_timestamps(df: &DataFrame) -> Result<Vec<NaiveDateTime>> {
        let col = df.column(TIME_COLUMN).map_err(|_| {
            ForecastError::DataError(format!("missing required column `{TIME_COLUMN}`"))
        })?;

        match col.dtype() {
            DataType::Utf8 => col
                .utf8()?
                .into_iter()
                .map(|value| {
                    let raw = value.ok_or_else(|| null_cell_error(TIME_COLUMN))?;
                    parse_timestamp(raw)
                })
                .collect(),
            DataType::Datetime(unit, _) => {
                let per_second: i64 = match unit {
                    TimeUnit::Nanoseconds => 1_000_000_000,
                    TimeUnit::Microseconds => 1_000_000,
                    TimeUnit::Milliseconds => 1_000,
                };
                let nanos_per_tick = 1_000_000_000 / per_second;
                col.datetime()?
                    .into_iter()
                    .map(|value| {
                        let ticks = value.ok_or_else(|| null_cell_error(TIME_COLUMN))?;
                        let secs = ticks.div_euclid(per_second);
                        let nanos = (ticks.rem_euclid(per_second) * nanos_per_tick) as u32;
                        NaiveDateTime::from_timestamp_opt(secs, nanos).ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "timestamp out of range in column `{TIME_COLUMN}`"
                            ))
                        })
                    })
                    .collect()
            }
            DataType::Date => col
                .date()?
                .into_iter()
                .map(|value| {
                    let days = value.ok_or_else(|| null_cell_error(TIME_COLUMN))?;
                    epoch_date()
                        .checked_add_signed(Duration::days(i64::from(days)))
                        .map(|date| date.and_time(NaiveTime::MIN))
                        .ok_or_else(|| {
                            ForecastError::DataError(format!(
                                "date out of range in column `{TIME_COLUMN}`"
                            ))
                        })
                })
                .collect(),
            other => Err(ForecastError::DataError(format!(
                "column `{TIME_COLUMN}` has unsupported type {other}"
            ))),
        }
    }

    /// Extract the demand column, widening any numeric dtype to f64
    fn extract_demand(df: &DataFrame) -> Result<Vec<f64>> {
        let col = df.column(DEMAND_COLUMN).map_err(|_| {
            ForecastError::DataError(format!("missing required column `{DEMAND_COLUMN}`"))
        })?;

        let values: Vec<Option<f64>> = match col.dtype() {
            DataType::Float64 => col.f64()?.into_iter().collect(),
            DataType::Float32 => col.f32()?.into_iter().map(|v| v.map(f64::from)).collect(),
            DataType::Int64 => col.i64()?.into_iter().map(|v| v.map(|x| x as f64)).collect(),
            DataType::Int32 => col.i32()?.into_iter().map(|v| v.map(f64::from)).collect(),
            other => {
                return Err(ForecastError::DataError(format!(
                    "column `{DEMAND_COLUMN}` must be numeric, got {other}"
                )))
            }
        };

        values
            .into_iter()
            .map(|v| v.ok_or_else(|| null_cell_error(DEMAND_COLUMN)))
            .collect()
    }
}

impl DemandRecords {
    /// Number of raw records
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the dataset contains no records
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The full DataFrame, including passthrough columns
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Parsed record timestamps, in input order
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Parsed demand values, in input order
    pub fn demand(&self) -> &[f64] {
        &self.demand
    }
}

/// Daily demand totals, one entry per calendar day with at least one record.
///
/// Dates are strictly increasing. Days without records are absent from the
/// series rather than zero-filled.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    totals: Vec<f64>,
}

impl DailySeries {
    /// Create a daily series directly from parallel date/total vectors
    pub fn new(dates: Vec<NaiveDate>, totals: Vec<f64>) -> Result<Self> {
        if dates.len() != totals.len() {
            return Err(ForecastError::ValidationError(format!(
                "Dates length ({}) doesn't match totals length ({})",
                dates.len(),
                totals.len()
            )));
        }
        if dates.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ForecastError::ValidationError(
                "Dates must be strictly increasing".to_string(),
            ));
        }

        Ok(Self { dates, totals })
    }

    /// Aggregate raw records into per-day totals
    pub fn from_records(records: &DemandRecords) -> Self {
        let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (timestamp, value) in records.timestamps().iter().zip(records.demand()) {
            *buckets.entry(timestamp.date()).or_insert(0.0) += value;
        }

        let (dates, totals) = buckets.into_iter().unzip();
        Self { dates, totals }
    }

    /// Number of days in the series
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series contains no days
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The calendar dates, in ascending order
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The per-day demand totals, aligned with `dates`
    pub fn totals(&self) -> &[f64] {
        &self.totals
    }

    /// The final date in the series, if any
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Split into a chronological training prefix and holdout suffix.
    ///
    /// The training set holds `floor(train_fraction * len)` entries. An
    /// out-of-range fraction yields the full series and an empty holdout.
    pub fn train_split(&self, train_fraction: f64) -> (DailySeries, DailySeries) {
        if self.is_empty() || train_fraction <= 0.0 || train_fraction >= 1.0 {
            return (self.clone(), DailySeries::default());
        }

        let train_size = (self.len() as f64 * train_fraction).floor() as usize;
        let train = DailySeries {
            dates: self.dates[..train_size].to_vec(),
            totals: self.totals[..train_size].to_vec(),
        };
        let holdout = DailySeries {
            dates: self.dates[train_size..].to_vec(),
            totals: self.totals[train_size..].to_vec(),
        };

        (train, holdout)
    }
}

fn null_cell_error(column: &str) -> ForecastError {
    ForecastError::DataError(format!("column `{column}` contains null values"))
}

fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Parse a timestamp string in any of the accepted formats.
///
/// Accepts RFC 3339, space- or `T`-separated date-times with optional seconds
/// and fractional seconds, `%m/%d/%Y` date-times, and bare dates (midnight).
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.naive_utc());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(parsed.and_time(NaiveTime::MIN));
        }
    }

    Err(ForecastError::DataError(format!(
        "unparseable timestamp {trimmed:?} in column `{TIME_COLUMN}`"
    )))
}
