#![cfg(test)]

use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::unwrap::UnwrapOptimized;
use soroban_sdk::{contract, contractimpl, contracttype, token, Address, Env};

use crate::{rate, RateConfig, ReserveData, SCALAR_12, SCALAR_7, SECONDS_PER_YEAR};

// Storage keys for MockLendingPool
#[contracttype]
#[derive(Clone)]
pub enum MockPoolDataKey {
    Asset,
    Config,
    TotalDebt,
    LiquidityIndex,
    LiquidityRate,
    BorrowRate,
    LastUpdate,
    Scaled(Address),
}

// Single-reserve lending pool with index-based accrual. Interest only
// accrues on the pool's own transactions; `accrue` is the forcing call.
#[contract]
pub struct MockLendingPool;

#[contractimpl]
impl MockLendingPool {
    pub fn initialize(env: Env, asset: Address, config: RateConfig) {
        if config.optimal_utilization <= 0 || config.optimal_utilization >= SCALAR_7 {
            panic!("invalid rate config");
        }
        env.storage().instance().set(&MockPoolDataKey::Asset, &asset);
        env.storage()
            .instance()
            .set(&MockPoolDataKey::Config, &config);
        env.storage()
            .instance()
            .set(&MockPoolDataKey::LiquidityIndex, &SCALAR_12);
        env.storage()
            .instance()
            .set(&MockPoolDataKey::LastUpdate, &env.ledger().timestamp());
    }

    pub fn supply(env: Env, from: Address, amount: i128) {
        from.require_auth();
        Self::accrue(env.clone());

        let asset = Self::asset(&env);
        let pool = env.current_contract_address();
        token::TokenClient::new(&env, &asset).transfer_from(&pool, &from, &pool, &amount);

        let scaled = amount
            .fixed_div_floor(Self::index(&env), SCALAR_12)
            .unwrap_optimized();
        let key = MockPoolDataKey::Scaled(from);
        let current: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        env.storage().persistent().set(&key, &(current + scaled));

        Self::update_rates(&env);
    }

    /// Withdraw up to `amount` of `from`'s position to `to`. The payout is
    /// capped by the position and by the pool's actual token balance.
    pub fn withdraw(env: Env, from: Address, to: Address, amount: i128) -> i128 {
        from.require_auth();
        Self::accrue(env.clone());

        let asset = Self::asset(&env);
        let pool = env.current_contract_address();
        let token_client = token::TokenClient::new(&env, &asset);

        let position = Self::balance_of_underlying(env.clone(), from.clone());
        let liquidity = token_client.balance(&pool);
        let paid = amount.min(position).min(liquidity);
        if paid <= 0 {
            return 0;
        }

        let scaled_burn = paid
            .fixed_div_ceil(Self::index(&env), SCALAR_12)
            .unwrap_optimized();
        let key = MockPoolDataKey::Scaled(from);
        let current: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        let remaining = (current - scaled_burn).max(0);
        env.storage().persistent().set(&key, &remaining);

        token_client.transfer(&pool, &to, &paid);
        Self::update_rates(&env);
        paid
    }

    /// The account's position at the last recorded index. Pending interest
    /// is not reflected until a pool transaction accrues it.
    pub fn balance_of_underlying(env: Env, account: Address) -> i128 {
        let scaled: i128 = env
            .storage()
            .persistent()
            .get(&MockPoolDataKey::Scaled(account))
            .unwrap_or(0);
        scaled
            .fixed_mul_floor(Self::index(&env), SCALAR_12)
            .unwrap_optimized()
    }

    pub fn available_liquidity(env: Env) -> i128 {
        token::TokenClient::new(&env, &Self::asset(&env)).balance(&env.current_contract_address())
    }

    pub fn reserve_data(env: Env) -> ReserveData {
        ReserveData {
            available_liquidity: Self::available_liquidity(env.clone()),
            total_debt: Self::total_debt(&env),
            liquidity_rate: env
                .storage()
                .instance()
                .get(&MockPoolDataKey::LiquidityRate)
                .unwrap_or(0),
            borrow_rate: env
                .storage()
                .instance()
                .get(&MockPoolDataKey::BorrowRate)
                .unwrap_or(0),
            liquidity_index: Self::index(&env),
            last_update: env
                .storage()
                .instance()
                .get(&MockPoolDataKey::LastUpdate)
                .unwrap_or(0),
        }
    }

    pub fn rate_config(env: Env) -> RateConfig {
        env.storage()
            .instance()
            .get(&MockPoolDataKey::Config)
            .expect("pool not initialized")
    }

    /// Test hook: set the reserve's outstanding borrowed amount to steer
    /// utilization.
    pub fn set_total_debt(env: Env, amount: i128) {
        Self::accrue(env.clone());
        env.storage()
            .instance()
            .set(&MockPoolDataKey::TotalDebt, &amount);
        Self::update_rates(&env);
    }

    /// Forcing transaction: accrue interest since the last pool transaction
    /// by growing the liquidity index linearly at the current supply rate.
    pub fn accrue(env: Env) {
        let now = env.ledger().timestamp();
        let last: u64 = env
            .storage()
            .instance()
            .get(&MockPoolDataKey::LastUpdate)
            .unwrap_or(now);
        let rate: i128 = env
            .storage()
            .instance()
            .get(&MockPoolDataKey::LiquidityRate)
            .unwrap_or(0);

        if now > last && rate > 0 {
            let elapsed = (now - last) as i128;
            let growth = rate * elapsed / SECONDS_PER_YEAR;
            let new_index = Self::index(&env)
                .fixed_mul_floor(SCALAR_7 + growth, SCALAR_7)
                .unwrap_optimized();
            env.storage()
                .instance()
                .set(&MockPoolDataKey::LiquidityIndex, &new_index);
        }
        env.storage()
            .instance()
            .set(&MockPoolDataKey::LastUpdate, &now);
        Self::update_rates(&env);
    }

    fn asset(env: &Env) -> Address {
        env.storage()
            .instance()
            .get(&MockPoolDataKey::Asset)
            .expect("pool not initialized")
    }

    fn index(env: &Env) -> i128 {
        env.storage()
            .instance()
            .get(&MockPoolDataKey::LiquidityIndex)
            .unwrap_or(SCALAR_12)
    }

    fn total_debt(env: &Env) -> i128 {
        env.storage()
            .instance()
            .get(&MockPoolDataKey::TotalDebt)
            .unwrap_or(0)
    }

    fn update_rates(env: &Env) {
        let config: RateConfig = env
            .storage()
            .instance()
            .get(&MockPoolDataKey::Config)
            .expect("pool not initialized");
        let util = rate::utilization(Self::available_liquidity(env.clone()), Self::total_debt(env));
        let borrow = rate::borrow_rate(&config, util);
        let supply = rate::supply_rate(&config, util);
        env.storage()
            .instance()
            .set(&MockPoolDataKey::BorrowRate, &borrow);
        env.storage()
            .instance()
            .set(&MockPoolDataKey::LiquidityRate, &supply);
    }
}
