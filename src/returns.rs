//! Excess-of-risk-free returns
//!
//! The benchmark return is the index's simple return minus the percentage
//! change of the rate series. Note that the rate's rate-of-change is
//! subtracted, not its level.

use tracing::{debug, info};

use crate::TimeSeries;

/// Excess return of `price` over `rate`, named `name`
///
/// Both inputs are converted to period-over-period percentage changes along
/// their own index, joined on date, and any date undefined on either side is
/// dropped.
pub fn excess_returns(name: &str, price: &TimeSeries, rate: &TimeSeries) -> TimeSeries {
    let price_returns = price.pct_change();
    let rate_changes = rate.pct_change();

    let joined = price_returns.sub(&rate_changes);
    let excess = joined.drop_missing().renamed(name);

    let unmatched = price_returns.len() - joined.len();
    if unmatched > 0 {
        debug!(
            "{}: {} price returns without a matching {} observation dropped",
            name,
            unmatched,
            rate.name()
        );
    }
    let undefined = joined.len() - excess.len();
    if undefined > 0 {
        debug!("{}: {} undefined excess returns dropped", name, undefined);
    }

    info!(
        "Computed {} excess returns for {} over {}",
        excess.len(),
        price.name(),
        rate.name()
    );
    excess
}
