//! Calendar-month aggregation of returns and matrix rendering
//!
//! Daily returns are converted to log returns and summed per calendar month.
//! Months between the first and last observation that have no data count as
//! a zero log return, so the month grid has no holes.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::TimeSeries;

/// Year-Month key for organizing data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// Last calendar day of the month
    pub fn month_end(self) -> Option<NaiveDate> {
        let next = self.next();
        NaiveDate::from_ymd_opt(next.year, next.month, 1).and_then(|d| d.pred_opt())
    }
}

/// Monthly log-return sums of one series
#[derive(Debug, Clone)]
pub struct MonthlyReturns {
    name: String,
    sums: BTreeMap<YearMonth, f64>,
}

impl MonthlyReturns {
    /// Aggregate simple returns into monthly log-return sums
    pub fn from_returns(returns: &TimeSeries) -> Self {
        let mut sums = BTreeMap::new();

        for (date, r) in returns.iter() {
            *sums.entry(YearMonth::from_date(date)).or_insert(0.0) += r.ln_1p();
        }

        // Fill months without observations between the first and last month
        let bounds = sums.keys().next().copied().zip(sums.keys().next_back().copied());
        if let Some((first, last)) = bounds {
            let mut ym = first;
            while ym < last {
                sums.entry(ym).or_insert(0.0);
                ym = ym.next();
            }
        }

        Self {
            name: returns.name().to_string(),
            sums,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Log-return sum for a month
    pub fn get(&self, year: i32, month: u32) -> Option<f64> {
        self.sums.get(&YearMonth::new(year, month)).copied()
    }

    /// Compounded simple return for a month
    pub fn compounded(&self, year: i32, month: u32) -> Option<f64> {
        self.get(year, month).map(f64::exp_m1)
    }

    /// Average monthly log return times 12, `None` without any month
    pub fn annualized_mean(&self) -> Option<f64> {
        if self.sums.is_empty() {
            return None;
        }
        let total: f64 = self.sums.values().sum();
        Some(total / self.sums.len() as f64 * 12.0)
    }

    /// Growth of one unit: `exp` of the running monthly log sum, dated at month end
    pub fn cumulative_pnl(&self) -> TimeSeries {
        let mut running = 0.0;
        let points: Vec<(NaiveDate, f64)> = self
            .sums
            .iter()
            .filter_map(|(ym, sum)| {
                running += sum;
                ym.month_end().map(|date| (date, running.exp()))
            })
            .collect();
        let (dates, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        TimeSeries::new(self.name.clone(), dates, values)
            .unwrap_or_else(|_| TimeSeries::empty(self.name.clone()))
    }

    /// Get unique years in the data
    fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.sums.keys().map(|ym| ym.year).collect();
        years.dedup();
        years
    }

    /// Compounded return for a calendar year from its monthly sums
    fn yearly_total(&self, year: i32) -> f64 {
        self.sums
            .iter()
            .filter(|(ym, _)| ym.year == year)
            .map(|(_, sum)| sum)
            .sum::<f64>()
            .exp_m1()
    }

    /// Render a year x month matrix of compounded returns in percent
    pub fn render(&self) -> String {
        if self.sums.is_empty() {
            return format!("No returns to display for {}.", self.name);
        }

        let mut output = String::new();

        output.push_str(&format!("\n{}\n", "=".repeat(120)));
        output.push_str(&format!("MONTHLY RETURNS (%) - {}\n", self.name));
        output.push_str(&format!("{}\n", "=".repeat(120)));

        output.push_str(&format!(
            "{:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>6} │ {:>8}\n",
            "Year", "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Total"
        ));
        output.push_str(&format!("{}\n", "-".repeat(120)));

        for year in self.years() {
            output.push_str(&format!("{:>6} │", year));
            for month in 1..=12 {
                let cell = match self.compounded(year, month) {
                    Some(r) => format!("{:>6.2}", r * 100.0),
                    None => "      ".to_string(),
                };
                output.push_str(&format!(" {} │", cell));
            }
            output.push_str(&format!(" {:>8.2}\n", self.yearly_total(year) * 100.0));
        }

        output.push_str(&format!("{}\n", "=".repeat(120)));

        let positive = self.sums.values().filter(|s| **s > 0.0).count();
        output.push_str(&format!(
            "Positive months: {} / {} ({:.1}%)\n",
            positive,
            self.sums.len(),
            positive as f64 / self.sums.len() as f64 * 100.0
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn returns(points: &[(NaiveDate, f64)]) -> TimeSeries {
        TimeSeries::from_unsorted("spx", points.to_vec()).unwrap()
    }

    #[test]
    fn test_month_end() {
        assert_eq!(YearMonth::new(2024, 2).month_end(), Some(d(2024, 2, 29)));
        assert_eq!(YearMonth::new(2023, 12).month_end(), Some(d(2023, 12, 31)));
    }

    #[test]
    fn test_monthly_log_sums() {
        let r = returns(&[
            (d(2024, 1, 2), 0.01),
            (d(2024, 1, 3), -0.02),
            (d(2024, 2, 1), 0.03),
        ]);
        let monthly = MonthlyReturns::from_returns(&r);
        assert_eq!(monthly.len(), 2);
        assert_abs_diff_eq!(
            monthly.get(2024, 1).unwrap(),
            0.01f64.ln_1p() + (-0.02f64).ln_1p(),
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(monthly.compounded(2024, 2).unwrap(), 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_gap_months_count_as_zero() {
        let r = returns(&[(d(2023, 11, 30), 0.02), (d(2024, 2, 1), 0.04)]);
        let monthly = MonthlyReturns::from_returns(&r);
        assert_eq!(monthly.len(), 4);
        assert_eq!(monthly.get(2023, 12), Some(0.0));
        assert_eq!(monthly.get(2024, 1), Some(0.0));

        let expected = (0.02f64.ln_1p() + 0.04f64.ln_1p()) / 4.0 * 12.0;
        assert_abs_diff_eq!(monthly.annualized_mean().unwrap(), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_cumulative_pnl_compounds() {
        let r = returns(&[
            (d(2024, 1, 2), 0.10),
            (d(2024, 2, 1), -0.05),
            (d(2024, 3, 1), 0.02),
        ]);
        let pnl = MonthlyReturns::from_returns(&r).cumulative_pnl();
        assert_eq!(pnl.dates(), &[d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31)]);
        assert_abs_diff_eq!(pnl.values()[2], 1.10 * 0.95 * 1.02, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_returns() {
        let monthly = MonthlyReturns::from_returns(&TimeSeries::empty("spx"));
        assert!(monthly.is_empty());
        assert!(monthly.annualized_mean().is_none());
        assert!(monthly.cumulative_pnl().is_empty());
        assert!(monthly.years().is_empty());
    }

    #[test]
    fn test_render_lists_years() {
        let r = returns(&[(d(2023, 12, 29), 0.01), (d(2024, 1, 2), 0.02)]);
        let text = MonthlyReturns::from_returns(&r).render();
        assert!(text.contains("MONTHLY RETURNS (%) - spx"));
        assert!(text.contains("2023"));
        assert!(text.contains("2024"));
        assert!(text.contains("Positive months: 2 / 2"));
    }
}
