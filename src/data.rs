//! Data loading and persistence
//!
//! Reads two-column (date, value) tables into [`TimeSeries`] and writes
//! series back out as CSV. Written series use full float precision, so
//! loading an artifact reproduces the in-memory series exactly.

use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::{PipelineError, Result};
use crate::TimeSeries;

// =============================================================================
// Constants
// =============================================================================

/// Accepted date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Cells treated as a missing observation
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "."];

/// Date layout used for every written artifact
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Parsing
// =============================================================================

/// Parse a date cell (YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, MM/DD/YYYY or YYYYMMDD)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parse a value cell; missing markers become `Some(NaN)`, garbage is `None`
pub fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim();
    if MISSING_MARKERS.contains(&s) {
        return Some(f64::NAN);
    }
    s.parse::<f64>().ok()
}

fn resolve_column(
    name: &str,
    column: &str,
    headers: Option<&csv::StringRecord>,
) -> Result<usize> {
    match headers {
        Some(headers) => headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| {
                PipelineError::malformed(name, format!("missing required column '{}'", column))
            }),
        None => column.parse::<usize>().map_err(|_| {
            PipelineError::malformed(
                name,
                format!(
                    "column '{}' must be a zero-based index for a file without header",
                    column
                ),
            )
        }),
    }
}

// =============================================================================
// CSV Loading
// =============================================================================

/// Load a named date/value series from a CSV file
///
/// The result is sorted by date. Duplicate dates, unparsable dates and
/// unparsable values are `MalformedInput`. An empty file yields an empty
/// series.
pub fn load_series(
    name: &str,
    path: impl AsRef<Path>,
    source: &SourceConfig,
) -> Result<TimeSeries> {
    let path = path.as_ref();
    if !source.divisor.is_finite() || source.divisor <= 0.0 {
        return Err(PipelineError::Config(format!(
            "divisor of source '{}' must be finite and positive, got {}",
            name, source.divisor
        )));
    }
    let csv_err = |source: csv::Error| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(source.header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = if source.header {
        Some(reader.headers().map_err(csv_err)?.clone())
    } else {
        None
    };
    let date_idx = resolve_column(name, &source.date_column, headers.as_ref())?;
    let value_idx = resolve_column(name, &source.value_column, headers.as_ref())?;

    let mut points = Vec::new();
    let mut missing = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        // +1 for 1-indexed rows, +1 more when a header row precedes the data
        let line = row_idx + 1 + usize::from(source.header);

        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let date_cell = record.get(date_idx).ok_or_else(|| {
            PipelineError::malformed(name, format!("row {}: missing date column", line))
        })?;
        let date = parse_date(date_cell).ok_or_else(|| {
            PipelineError::malformed(name, format!("row {}: unparsable date '{}'", line, date_cell))
        })?;

        let value_cell = record.get(value_idx).ok_or_else(|| {
            PipelineError::malformed(name, format!("row {}: missing value column", line))
        })?;
        let value = parse_value(value_cell).ok_or_else(|| {
            PipelineError::malformed(
                name,
                format!("row {}: unparsable value '{}'", line, value_cell),
            )
        })?;

        if value.is_nan() {
            missing += 1;
            if source.drop_missing {
                continue;
            }
        }

        points.push((date, value / source.divisor));
    }

    if missing > 0 {
        if source.drop_missing {
            warn!("Dropped {} rows with missing values from {}", missing, name);
        } else {
            debug!("{} missing values kept as NaN in {}", missing, name);
        }
    }

    let series = TimeSeries::from_unsorted(name, points)?;
    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => info!(
            "Loaded {} observations for {} ({} to {})",
            series.len(),
            name,
            first,
            last
        ),
        _ => warn!("Loaded empty series for {} from {}", name, path.display()),
    }

    Ok(series)
}

/// Load a series previously written by [`write_series_csv`]
pub fn load_artifact(path: impl AsRef<Path>, value_column: &str) -> Result<TimeSeries> {
    let source = SourceConfig::named("", "date", value_column);
    load_series(value_column, path, &source)
}

// =============================================================================
// CSV Writing
// =============================================================================

/// Format a value for output; NaN is written as an empty cell
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Open a CSV writer, creating the parent directory when needed
pub fn create_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    csv::Writer::from_path(path).map_err(|source| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Write rows to a CSV file with a header
pub fn write_rows<I, R>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let csv_err = |source: csv::Error| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = create_writer(path)?;
    writer.write_record(header).map_err(csv_err)?;
    let mut count = 0usize;
    for row in rows {
        writer.write_record(row).map_err(csv_err)?;
        count += 1;
    }
    writer.flush().map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Saved {} rows to {}", count, path.display());
    Ok(())
}

/// Write a series as `date,<value_column>`
pub fn write_series_csv(path: impl AsRef<Path>, series: &TimeSeries, value_column: &str) -> Result<()> {
    let rows = series.iter().map(|(date, value)| {
        [
            date.format(OUTPUT_DATE_FORMAT).to_string(),
            format_value(value),
        ]
    });
    write_rows(path.as_ref(), &["date", value_column], rows)
}

// =============================================================================
// Tests
// =============================================================================
