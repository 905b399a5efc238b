//! Two-slope supply-rate curve shared by the strategy's APR projection and
//! the pool it replicates.

use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::unwrap::UnwrapOptimized;

use crate::{RateConfig, ReserveData, SCALAR_7};

/// Reserve utilization for the given liquidity and outstanding debt,
/// as a SCALAR_7 fixed-point fraction.
pub fn utilization(available_liquidity: i128, total_debt: i128) -> i128 {
    if total_debt <= 0 {
        return 0;
    }
    let total = available_liquidity + total_debt;
    total_debt
        .fixed_div_floor(total, SCALAR_7)
        .unwrap_optimized()
}

/// Borrow rate at `util`: linear up to the optimal utilization kink, then a
/// steeper second slope over the excess.
pub fn borrow_rate(config: &RateConfig, util: i128) -> i128 {
    if util <= config.optimal_utilization {
        let slope = config
            .slope_one
            .fixed_mul_floor(util, config.optimal_utilization)
            .unwrap_optimized();
        config.base_rate + slope
    } else {
        let excess = util - config.optimal_utilization;
        let slope = config
            .slope_two
            .fixed_mul_floor(excess, SCALAR_7 - config.optimal_utilization)
            .unwrap_optimized();
        config.base_rate + config.slope_one + slope
    }
}

/// Supply rate at `util`: the borrow rate earned by the supplied fraction,
/// less the protocol's reserve factor.
pub fn supply_rate(config: &RateConfig, util: i128) -> i128 {
    let gross = borrow_rate(config, util)
        .fixed_mul_floor(util, SCALAR_7)
        .unwrap_optimized();
    gross
        .fixed_mul_floor(SCALAR_7 - config.reserve_factor, SCALAR_7)
        .unwrap_optimized()
}

/// Projected supply rate after `delta` assets are added to (or, negative,
/// removed from) the reserve's liquidity. Non-increasing in `delta`.
pub fn supply_rate_after_change(data: &ReserveData, config: &RateConfig, delta: i128) -> i128 {
    let liquidity = (data.available_liquidity + delta).max(0);
    supply_rate(config, utilization(liquidity, data.total_debt))
}
