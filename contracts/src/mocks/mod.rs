#![cfg(test)]

pub mod lending_pool;

pub use lending_pool::{MockLendingPool, MockLendingPoolClient};
