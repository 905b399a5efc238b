use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::unwrap::UnwrapOptimized;
use soroban_sdk::{
    contract, contractevent, contractimpl, contracttype, token, Address, Env, String,
};

use crate::{rate, LendingPoolClient};

#[contract]
pub struct StrategyContract;

// Event definitions
#[contractevent]
pub struct InitializedEvent {
    pub asset: Address,
    pub vault: Address,
    pub pool: Address,
}

#[contractevent]
pub struct DepositEvent {
    pub operator: Address,
    pub receiver: Address,
    pub assets: i128,
    pub shares: i128,
}

#[contractevent]
pub struct WithdrawEvent {
    pub operator: Address,
    pub receiver: Address,
    pub owner: Address,
    pub assets: i128,
    pub shares: i128,
}

#[contractevent]
pub struct InvestEvent {
    pub assets: i128,
}

#[contractevent]
pub struct FreeFundsEvent {
    pub requested: i128,
    pub freed: i128,
}

// Storage keys
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Initialized,
    Asset,
    Vault,
    Pool,
    Name,
    TotalShares,
    Shares(Address),
}

#[contractimpl]
impl StrategyContract {
    /// Initialize the strategy
    ///
    /// This function can only be called once. Subsequent calls will panic.
    ///
    /// ### Arguments
    /// * `asset` - The underlying asset address
    /// * `vault` - The owning vault, the only party allowed to move funds
    /// * `pool` - The lending pool the strategy supplies into
    /// * `name` - Display name for the strategy
    pub fn initialize(e: &Env, asset: Address, vault: Address, pool: Address, name: String) {
        if e.storage().instance().has(&DataKey::Initialized) {
            panic!("Contract is already initialized");
        }

        e.storage().instance().set(&DataKey::Asset, &asset);
        e.storage().instance().set(&DataKey::Vault, &vault);
        e.storage().instance().set(&DataKey::Pool, &pool);
        e.storage().instance().set(&DataKey::Name, &name);
        e.storage().instance().set(&DataKey::Initialized, &true);

        InitializedEvent { asset, vault, pool }.publish(e);
    }

    pub fn name(e: &Env) -> String {
        e.storage()
            .instance()
            .get(&DataKey::Name)
            .expect("not initialized")
    }

    pub fn asset(e: &Env) -> Address {
        e.storage()
            .instance()
            .get(&DataKey::Asset)
            .expect("not initialized")
    }

    pub fn vault(e: &Env) -> Address {
        e.storage()
            .instance()
            .get(&DataKey::Vault)
            .expect("not initialized")
    }

    pub fn pool(e: &Env) -> Address {
        e.storage()
            .instance()
            .get(&DataKey::Pool)
            .expect("not initialized")
    }

    /// Asset balance sitting idle in the strategy itself.
    pub fn total_idle(e: &Env) -> i128 {
        let asset = Self::asset(e);
        token::TokenClient::new(e, &asset).balance(&e.current_contract_address())
    }

    /// Total assets under management: the idle balance plus the pool
    /// position at the pool's last recorded index.
    pub fn total_assets(e: &Env) -> i128 {
        let pool = LendingPoolClient::new(e, &Self::pool(e));
        Self::total_idle(e) + pool.balance_of_underlying(&e.current_contract_address())
    }

    pub fn total_supply(e: &Env) -> i128 {
        e.storage()
            .instance()
            .get(&DataKey::TotalShares)
            .unwrap_or(0)
    }

    pub fn balance_of(e: &Env, owner: Address) -> i128 {
        e.storage()
            .persistent()
            .get(&DataKey::Shares(owner))
            .unwrap_or(0)
    }

    pub fn convert_to_assets(e: &Env, shares: i128) -> i128 {
        let supply = Self::total_supply(e);
        if supply == 0 {
            return shares;
        }
        shares
            .fixed_mul_floor(Self::total_assets(e), supply)
            .unwrap_optimized()
    }

    pub fn convert_to_shares(e: &Env, assets: i128) -> i128 {
        let supply = Self::total_supply(e);
        let total = Self::total_assets(e);
        if supply == 0 || total == 0 {
            return assets;
        }
        assets.fixed_mul_floor(supply, total).unwrap_optimized()
    }

    pub fn max_deposit(_e: &Env, _receiver: Address) -> i128 {
        i128::MAX
    }

    /// Assets the owner can withdraw right now: their claim, bounded by what
    /// the strategy can actually gather (idle balance plus pool liquidity).
    pub fn max_withdraw(e: &Env, owner: Address) -> i128 {
        let claim = Self::convert_to_assets(e, Self::balance_of(e, owner));
        let pool = LendingPoolClient::new(e, &Self::pool(e));
        let reachable = Self::total_idle(e) + pool.available_liquidity();
        claim.min(reachable)
    }

    /// Take asset debt from the owning vault and supply it to the pool.
    ///
    /// The vault must have approved the strategy for `assets` beforehand.
    pub fn deposit(e: &Env, assets: i128, receiver: Address, operator: Address) -> i128 {
        operator.require_auth();

        let vault = Self::vault(e);
        if operator != vault || receiver != vault {
            panic!("not owner");
        }

        let shares = Self::convert_to_shares(e, assets);
        let asset = Self::asset(e);
        let strategy = e.current_contract_address();

        let token_client = token::TokenClient::new(e, &asset);
        token_client.transfer_from(&strategy, &vault, &strategy, &assets);

        // Reinvested directly, nothing stays idle
        Self::supply_pool(e, &asset, assets);

        Self::mint(e, &receiver, shares);

        DepositEvent {
            operator,
            receiver,
            assets,
            shares,
        }
        .publish(e);

        shares
    }

    /// Return assets to the vault, divesting from the pool when the idle
    /// balance does not cover the request.
    pub fn withdraw(
        e: &Env,
        assets: i128,
        receiver: Address,
        owner: Address,
        operator: Address,
    ) -> i128 {
        operator.require_auth();

        let vault = Self::vault(e);
        if operator != vault || owner != vault {
            panic!("not owner");
        }
        if assets > Self::max_withdraw(e, owner.clone()) {
            panic!("withdraw more than max");
        }

        let shares = Self::shares_for_withdraw(e, assets);
        let asset = Self::asset(e);
        let strategy = e.current_contract_address();

        let idle = Self::total_idle(e);
        if assets > idle {
            let pool = LendingPoolClient::new(e, &Self::pool(e));
            pool.withdraw(&strategy, &strategy, &(assets - idle));
        }

        token::TokenClient::new(e, &asset).transfer(&strategy, &receiver, &assets);
        Self::burn(e, &owner, shares);

        WithdrawEvent {
            operator,
            receiver,
            owner,
            assets,
            shares,
        }
        .publish(e);

        shares
    }

    /// Supply the entire idle balance to the pool.
    pub fn invest(e: &Env) -> i128 {
        let idle = Self::total_idle(e);
        if idle <= 0 {
            panic!("no funds to invest");
        }

        let asset = Self::asset(e);
        Self::supply_pool(e, &asset, idle);

        InvestEvent { assets: idle }.publish(e);

        idle
    }

    /// Divest up to `amount` from the pool into the idle balance without
    /// touching shares. Returns the amount actually freed, capped by the
    /// position and by pool liquidity.
    pub fn free_funds(e: &Env, amount: i128, operator: Address) -> i128 {
        operator.require_auth();

        if operator != Self::vault(e) {
            panic!("not vault");
        }

        let strategy = e.current_contract_address();
        let pool = LendingPoolClient::new(e, &Self::pool(e));
        let freed = pool.withdraw(&strategy, &strategy, &amount);

        FreeFundsEvent {
            requested: amount,
            freed,
        }
        .publish(e);

        freed
    }

    /// Projected supply APR after hypothetically adding `delta` assets to
    /// (or, negative, removing them from) the pool. Informational only.
    pub fn apr_after_debt_change(e: &Env, delta: i128) -> i128 {
        let pool = LendingPoolClient::new(e, &Self::pool(e));
        let data = pool.reserve_data();
        let config = pool.rate_config();
        rate::supply_rate_after_change(&data, &config, delta)
    }

    fn supply_pool(e: &Env, asset: &Address, amount: i128) {
        let strategy = e.current_contract_address();
        let pool = Self::pool(e);
        let expiry = e.ledger().sequence() + 200;
        token::TokenClient::new(e, asset).approve(&strategy, &pool, &amount, &expiry);
        LendingPoolClient::new(e, &pool).supply(&strategy, &amount);
    }

    // Withdraw-side conversion rounds up so a withdrawal never burns fewer
    // shares than the assets it removes are worth.
    fn shares_for_withdraw(e: &Env, assets: i128) -> i128 {
        let supply = Self::total_supply(e);
        let total = Self::total_assets(e);
        if supply == 0 || total == 0 {
            return assets;
        }
        assets.fixed_mul_ceil(supply, total).unwrap_optimized()
    }

    fn mint(e: &Env, receiver: &Address, shares: i128) {
        let balance = Self::balance_of(e, receiver.clone());
        e.storage()
            .persistent()
            .set(&DataKey::Shares(receiver.clone()), &(balance + shares));
        let supply = Self::total_supply(e);
        e.storage()
            .instance()
            .set(&DataKey::TotalShares, &(supply + shares));
    }

    fn burn(e: &Env, owner: &Address, shares: i128) {
        let balance = Self::balance_of(e, owner.clone());
        if shares > balance {
            panic!("insufficient shares");
        }
        e.storage()
            .persistent()
            .set(&DataKey::Shares(owner.clone()), &(balance - shares));
        let supply = Self::total_supply(e);
        e.storage()
            .instance()
            .set(&DataKey::TotalShares, &(supply - shares));
    }
}
