//! Report assembly and serialization
//!
//! [`build_report`] aligns the input series on a common window, computes
//! [`SeriesStatistics`] per series and derives the plotting artifacts.
//! Display formatting is applied only when a table is written or rendered.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::config::OutputConfig;
use crate::data::{format_value, write_rows, OUTPUT_DATE_FORMAT};
use crate::error::{PipelineError, Result};
use crate::monthly::MonthlyReturns;
use crate::stats::{
    compute_statistics, rolling_std, tail_observations, Exposure, SeriesStatistics, StatsSettings,
    Tail,
};
use crate::TimeSeries;

/// Format a fraction as a percentage with two decimals, e.g. `12.34%`
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Format a plain ratio with two decimals
pub fn format_ratio(value: f64) -> String {
    format!("{:.2}", value)
}

fn quantile_label(q: f64) -> String {
    let pct = (q * 100.0 * 1e6).round() / 1e6;
    format!("{}%", pct)
}

/// Summary statistics keyed by series label
#[derive(Debug, Clone)]
pub struct ReportTable {
    rows: Vec<(String, SeriesStatistics)>,
    shortfall_quantile: f64,
    exceedance_quantile: f64,
}

impl ReportTable {
    pub fn new(settings: &StatsSettings) -> Self {
        Self {
            rows: Vec::new(),
            shortfall_quantile: settings.shortfall_quantile,
            exceedance_quantile: settings.exceedance_quantile,
        }
    }

    pub fn push(&mut self, label: impl Into<String>, stats: SeriesStatistics) {
        self.rows.push((label.into(), stats));
    }

    pub fn rows(&self) -> &[(String, SeriesStatistics)] {
        &self.rows
    }

    pub fn get(&self, label: &str) -> Option<&SeriesStatistics> {
        self.rows.iter().find(|(l, _)| l == label).map(|(_, s)| s)
    }

    /// Column headers in output order
    pub fn columns(&self) -> Vec<String> {
        vec![
            "Mean".to_string(),
            "Std".to_string(),
            "Total Returns".to_string(),
            "Sharpe Ratio".to_string(),
            "Turnover".to_string(),
            "Mean Notional".to_string(),
            "Vol of Vol".to_string(),
            format!("Mean Shortfall {}", quantile_label(self.shortfall_quantile)),
            format!("Mean Exceedance {}", quantile_label(self.exceedance_quantile)),
        ]
    }

    /// Display strings for one row, in [`ReportTable::columns`] order
    pub fn format_row(stats: &SeriesStatistics) -> Vec<String> {
        vec![
            format_percent(stats.mean),
            format_percent(stats.std),
            format_percent(stats.total_return),
            format_ratio(stats.sharpe_ratio),
            format_ratio(stats.turnover),
            format_ratio(stats.mean_notional),
            format_percent(stats.vol_of_vol),
            format_percent(stats.mean_shortfall),
            format_percent(stats.mean_exceedance),
        ]
    }

    /// Formatted rows, one per series, label first
    pub fn formatted(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|(label, stats)| {
                let mut row = vec![label.clone()];
                row.extend(Self::format_row(stats));
                row
            })
            .collect()
    }

    /// Write the table with one row per series
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let columns = self.columns();
        let mut header: Vec<&str> = vec![""];
        header.extend(columns.iter().map(String::as_str));
        write_rows(path, &header, self.formatted())
    }

    /// Console rendering
    pub fn render(&self) -> String {
        let columns = self.columns();
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", "=".repeat(60)));
        output.push_str("VOLATILITY TARGET RESULTS\n");
        output.push_str(&format!("{}\n", "=".repeat(60)));

        output.push_str(&format!("{:<22}", ""));
        for (label, _) in &self.rows {
            output.push_str(&format!("{:>18}", label));
        }
        output.push('\n');
        output.push_str(&format!("{}\n", "-".repeat(60)));

        let formatted: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|(_, stats)| Self::format_row(stats))
            .collect();
        for (i, column) in columns.iter().enumerate() {
            output.push_str(&format!("{:<22}", column));
            for row in &formatted {
                output.push_str(&format!("{:>18}", row[i]));
            }
            output.push('\n');
        }
        output.push_str(&format!("{}\n", "=".repeat(60)));
        output
    }
}

/// One series entering the report
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub label: String,
    pub returns: &'a TimeSeries,
    pub exposure: Exposure<'a>,
}

/// Statistics table plus the time-series artifacts
#[derive(Debug, Clone)]
pub struct Report {
    pub table: ReportTable,
    /// Aligned, windowed returns the statistics were computed on
    pub returns: Vec<TimeSeries>,
    pub monthly: Vec<MonthlyReturns>,
    pub pnl: Vec<TimeSeries>,
    pub rolling_vol: Vec<TimeSeries>,
    pub shortfall: Vec<TimeSeries>,
    rolling_window: usize,
}

/// Build the report over `[start, end]`
///
/// The input series are inner-joined on date inside the window; dynamic
/// weights are restricted to the same dates.
pub fn build_report(
    inputs: &[ReportInput<'_>],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    settings: &StatsSettings,
) -> Result<Report> {
    if inputs.is_empty() {
        return Err(PipelineError::malformed("report", "no series to report on"));
    }

    let windowed: Vec<TimeSeries> = inputs
        .iter()
        .map(|input| input.returns.between(start, end).renamed(input.label.clone()))
        .collect();
    let refs: Vec<&TimeSeries> = windowed.iter().collect();
    let aligned = TimeSeries::intersect(&refs);

    if let (Some(first), Some(last)) = (
        aligned.first().and_then(TimeSeries::first_date),
        aligned.first().and_then(TimeSeries::last_date),
    ) {
        info!(
            "Reporting on {} common observations from {} to {}",
            aligned[0].len(),
            first,
            last
        );
    }

    let mut table = ReportTable::new(settings);
    for (input, returns) in inputs.iter().zip(&aligned) {
        let stats = match input.exposure {
            Exposure::Static(k) => compute_statistics(returns, Exposure::Static(k), settings)?,
            Exposure::Dynamic(weights) => {
                let weights = weights.restrict_to(returns);
                compute_statistics(returns, Exposure::Dynamic(&weights), settings)?
            }
        };
        table.push(input.label.clone(), stats);
    }

    let monthly: Vec<MonthlyReturns> = aligned.iter().map(MonthlyReturns::from_returns).collect();
    let pnl = monthly.iter().map(MonthlyReturns::cumulative_pnl).collect();
    let rolling_vol = aligned
        .iter()
        .map(|r| rolling_std(r, settings.rolling_window))
        .collect();
    let shortfall = aligned
        .iter()
        .map(|r| tail_observations(r, settings.shortfall_quantile, Tail::Lower))
        .collect();

    Ok(Report {
        table,
        returns: aligned,
        monthly,
        pnl,
        rolling_vol,
        shortfall,
        rolling_window: settings.rolling_window,
    })
}

impl Report {
    /// Write the results table and the three plotting artifacts
    pub fn write(&self, output: &OutputConfig) -> Result<()> {
        self.table
            .write_csv(&output.path(&output.results_table_file))?;
        write_long_form(&output.path(&output.pnl_file), &self.pnl, "PnL")?;
        write_long_form(
            &output.path(&output.rolling_vol_file),
            &self.rolling_vol,
            &format!("{} Day Vol", self.rolling_window),
        )?;
        write_wide(&output.path(&output.shortfall_file), &self.shortfall)?;
        Ok(())
    }
}

/// Write `date,variable,<value_column>` rows, dates ascending, series in input order
pub fn write_long_form(path: &Path, series: &[TimeSeries], value_column: &str) -> Result<()> {
    let mut by_date: BTreeMap<NaiveDate, Vec<(&str, f64)>> = BTreeMap::new();
    for s in series {
        for (date, value) in s.iter() {
            by_date.entry(date).or_default().push((s.name(), value));
        }
    }
    let rows = by_date.into_iter().flat_map(|(date, entries)| {
        let date = date.format(OUTPUT_DATE_FORMAT).to_string();
        entries.into_iter().map(move |(name, value)| {
            [date.clone(), name.to_string(), format_value(value)]
        })
    });
    write_rows(path, &["date", "variable", value_column], rows)
}

/// Write one column per series over the union of dates, blank where absent
pub fn write_wide(path: &Path, series: &[TimeSeries]) -> Result<()> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for (i, s) in series.iter().enumerate() {
        for (date, value) in s.iter() {
            by_date.entry(date).or_insert_with(|| vec![None; series.len()])[i] = Some(value);
        }
    }
    let mut header = vec!["date"];
    header.extend(series.iter().map(TimeSeries::name));
    let rows = by_date.into_iter().map(|(date, values)| {
        let mut row = vec![date.format(OUTPUT_DATE_FORMAT).to_string()];
        row.extend(values.into_iter().map(|v| v.map(format_value).unwrap_or_default()));
        row
    });
    write_rows(path, &header, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stats() -> SeriesStatistics {
        SeriesStatistics {
            mean: 0.08123,
            std: 0.2,
            sharpe_ratio: 0.4062,
            total_return: 1.5,
            turnover: 0.0,
            mean_notional: 0.987,
            vol_of_vol: 0.0712,
            mean_shortfall: -0.0456,
            mean_exceedance: 0.0412,
        }
    }

    fn series(name: &str, start_day: i64, values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(start_day);
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new(name, dates, values.to_vec()).unwrap()
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_percent(0.08123), "8.12%");
        assert_eq!(format_percent(-0.0456), "-4.56%");
        assert_eq!(format_ratio(0.4062), "0.41");
        assert_eq!(format_ratio(0.0), "0.00");
    }

    #[test]
    fn test_columns_and_row() {
        let table = ReportTable::new(&StatsSettings::default());
        let columns = table.columns();
        assert_eq!(columns.len(), 9);
        assert_eq!(columns[7], "Mean Shortfall 1%");
        assert_eq!(columns[8], "Mean Exceedance 99%");

        let row = ReportTable::format_row(&stats());
        assert_eq!(
            row,
            vec!["8.12%", "20.00%", "150.00%", "0.41", "0.00", "0.99", "7.12%", "-4.56%", "4.12%"]
        );
    }

    #[test]
    fn test_render_contains_labels() {
        let mut table = ReportTable::new(&StatsSettings::default());
        table.push("SPX", stats());
        table.push("SPX 20% Target", stats());
        let text = table.render();
        assert!(text.contains("SPX 20% Target"));
        assert!(text.contains("Sharpe Ratio"));
        assert!(table.get("SPX").is_some());
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn test_build_report_aligns_and_windows() {
        let n = 120;
        let a_values: Vec<f64> = (0..n).map(|i| 0.01 * ((i as f64) * 0.9).sin()).collect();
        let b_values: Vec<f64> = (0..n).map(|i| 0.012 * ((i as f64) * 0.5).cos()).collect();
        let a = series("a", 0, &a_values);
        let b = series("b", 5, &b_values);
        let weights = series("w", 0, &vec![1.0; n + 10]);

        let inputs = [
            ReportInput {
                label: "A".to_string(),
                returns: &a,
                exposure: Exposure::Static(0.9),
            },
            ReportInput {
                label: "B".to_string(),
                returns: &b,
                exposure: Exposure::Dynamic(&weights),
            },
        ];
        let start = NaiveDate::from_ymd_opt(2020, 1, 11);
        let report = build_report(&inputs, start, None, &StatsSettings::default()).unwrap();

        // a covers days 0..120, b covers 5..125, window from day 10
        assert_eq!(report.returns[0].len(), 110);
        assert_eq!(report.returns[0].dates(), report.returns[1].dates());
        assert_eq!(report.returns[0].name(), "A");
        assert_eq!(report.table.get("B").unwrap().turnover, 0.0);
        assert_eq!(report.table.get("A").unwrap().mean_notional, 0.9);
        assert_eq!(report.rolling_vol[0].len(), 110 - 29);
        assert!(!report.shortfall[1].is_empty());
    }

    #[test]
    fn test_build_report_rejects_tiny_window() {
        let a = series("a", 0, &[0.01, -0.01, 0.02]);
        let inputs = [ReportInput {
            label: "A".to_string(),
            returns: &a,
            exposure: Exposure::Static(1.0),
        }];
        let err = build_report(&inputs, None, None, &StatsSettings::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }
}
