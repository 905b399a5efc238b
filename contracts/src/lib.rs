#![no_std]

use soroban_sdk::{contractclient, contracttype, Address, Env};

pub mod rate;
pub mod strategy;
pub mod vault;

#[cfg(test)]
mod mocks;



pub use strategy::{StrategyContract, StrategyContractClient};
pub use vault::{VaultContract, VaultContractClient};

/// Fixed-point scalar for rates and utilization (1_0000000 = 100%).
pub const SCALAR_7: i128 = 1_0000000;

/// Fixed-point scalar for the pool's liquidity index.
pub const SCALAR_12: i128 = 1_000_000_000_000;

pub const SECONDS_PER_YEAR: i128 = 31_536_000;

// Lending pool types - the slice of reserve state the strategy needs to
// replicate the pool's supply-rate calculation
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReserveData {
    pub available_liquidity: i128,
    pub total_debt: i128,
    pub liquidity_rate: i128,
    pub borrow_rate: i128,
    pub liquidity_index: i128,
    pub last_update: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateConfig {
    pub base_rate: i128,
    pub slope_one: i128,
    pub slope_two: i128,
    pub optimal_utilization: i128,
    pub reserve_factor: i128,
}

// Lending pool contract client interface
#[contractclient(name = "LendingPoolClient")]
pub trait LendingPoolInterface {
    fn supply(env: Env, from: Address, amount: i128);
    fn withdraw(env: Env, from: Address, to: Address, amount: i128) -> i128;
    fn balance_of_underlying(env: Env, account: Address) -> i128;
    fn available_liquidity(env: Env) -> i128;
    fn reserve_data(env: Env) -> ReserveData;
    fn rate_config(env: Env) -> RateConfig;
}

// Strategy contract client interface used by the vault for debt movements
#[contractclient(name = "StrategyClient")]
pub trait StrategyInterface {
    fn asset(env: Env) -> Address;
    fn vault(env: Env) -> Address;
    fn balance_of(env: Env, owner: Address) -> i128;
    fn max_withdraw(env: Env, owner: Address) -> i128;
    fn deposit(env: Env, assets: i128, receiver: Address, operator: Address) -> i128;
    fn withdraw(
        env: Env,
        assets: i128,
        receiver: Address,
        owner: Address,
        operator: Address,
    ) -> i128;
}
