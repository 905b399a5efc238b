use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::unwrap::UnwrapOptimized;
use soroban_sdk::{
    contract, contractevent, contractimpl, contracttype, token, Address, Env, String, Vec,
};

use crate::StrategyClient;

// Role bits for permissioned vault operations
pub const ROLE_STRATEGY_MANAGER: u32 = 1;
pub const ROLE_DEBT_MANAGER: u32 = 2;
pub const ROLE_ACCOUNTING_MANAGER: u32 = 4;

#[contract]
pub struct VaultContract;

// Event definitions
#[contractevent]
pub struct VaultInitializedEvent {
    pub asset: Address,
    pub governance: Address,
    pub deposit_limit: i128,
}

#[contractevent]
pub struct VaultDepositEvent {
    pub operator: Address,
    pub receiver: Address,
    pub assets: i128,
    pub shares: i128,
}

#[contractevent]
pub struct VaultWithdrawEvent {
    pub operator: Address,
    pub receiver: Address,
    pub owner: Address,
    pub assets: i128,
    pub shares: i128,
}

#[contractevent]
pub struct StrategyAddedEvent {
    pub strategy: Address,
}

#[contractevent]
pub struct MaxDebtUpdatedEvent {
    pub strategy: Address,
    pub max_debt: i128,
}

#[contractevent]
pub struct DebtUpdatedEvent {
    pub strategy: Address,
    pub old_debt: i128,
    pub new_debt: i128,
}

#[contractevent]
pub struct RoleSetEvent {
    pub account: Address,
    pub roles: u32,
}

#[contractevent]
pub struct DepositLimitUpdatedEvent {
    pub deposit_limit: i128,
}

// Storage keys
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VaultDataKey {
    Initialized,
    Asset,
    Name,
    Symbol,
    Governance,
    DepositLimit,
    TotalDebt,
    TotalShares,
    Shares(Address),
    Roles(Address),
    Active(Address),
    Debt(Address),
    MaxDebt(Address),
}

#[contractimpl]
impl VaultContract {
    /// Initialize the vault
    ///
    /// This function can only be called once. Subsequent calls will panic.
    ///
    /// ### Arguments
    /// * `asset` - The underlying asset address
    /// * `name` - Share token name
    /// * `symbol` - Share token symbol
    /// * `governance` - Address allowed to assign roles and set limits
    /// * `deposit_limit` - Global cap on assets entering via `deposit`
    pub fn initialize(
        e: &Env,
        asset: Address,
        name: String,
        symbol: String,
        governance: Address,
        deposit_limit: i128,
    ) {
        if e.storage().instance().has(&VaultDataKey::Initialized) {
            panic!("Contract is already initialized");
        }

        e.storage().instance().set(&VaultDataKey::Asset, &asset);
        e.storage().instance().set(&VaultDataKey::Name, &name);
        e.storage().instance().set(&VaultDataKey::Symbol, &symbol);
        e.storage()
            .instance()
            .set(&VaultDataKey::Governance, &governance);
        e.storage()
            .instance()
            .set(&VaultDataKey::DepositLimit, &deposit_limit);
        e.storage().instance().set(&VaultDataKey::Initialized, &true);

        VaultInitializedEvent {
            asset,
            governance,
            deposit_limit,
        }
        .publish(e);
    }

    pub fn asset(e: &Env) -> Address {
        e.storage()
            .instance()
            .get(&VaultDataKey::Asset)
            .expect("not initialized")
    }

    pub fn name(e: &Env) -> String {
        e.storage()
            .instance()
            .get(&VaultDataKey::Name)
            .expect("not initialized")
    }

    pub fn symbol(e: &Env) -> String {
        e.storage()
            .instance()
            .get(&VaultDataKey::Symbol)
            .expect("not initialized")
    }

    pub fn governance(e: &Env) -> Address {
        e.storage()
            .instance()
            .get(&VaultDataKey::Governance)
            .expect("not initialized")
    }

    pub fn deposit_limit(e: &Env) -> i128 {
        e.storage()
            .instance()
            .get(&VaultDataKey::DepositLimit)
            .unwrap_or(0)
    }

    pub fn set_deposit_limit(e: &Env, deposit_limit: i128) {
        Self::governance(e).require_auth();
        e.storage()
            .instance()
            .set(&VaultDataKey::DepositLimit, &deposit_limit);

        DepositLimitUpdatedEvent { deposit_limit }.publish(e);
    }

    pub fn set_role(e: &Env, account: Address, roles: u32) {
        Self::governance(e).require_auth();
        e.storage()
            .persistent()
            .set(&VaultDataKey::Roles(account.clone()), &roles);

        RoleSetEvent { account, roles }.publish(e);
    }

    pub fn roles(e: &Env, account: Address) -> u32 {
        e.storage()
            .persistent()
            .get(&VaultDataKey::Roles(account))
            .unwrap_or(0)
    }

    /// Register a strategy so it can be allocated debt.
    pub fn add_strategy(e: &Env, strategy: Address, operator: Address) {
        Self::require_role(e, &operator, ROLE_STRATEGY_MANAGER);

        if Self::strategy_active(e, strategy.clone()) {
            panic!("strategy already active");
        }
        let client = StrategyClient::new(e, &strategy);
        if client.asset() != Self::asset(e) {
            panic!("invalid asset");
        }

        e.storage()
            .persistent()
            .set(&VaultDataKey::Active(strategy.clone()), &true);
        e.storage()
            .persistent()
            .set(&VaultDataKey::Debt(strategy.clone()), &0i128);
        e.storage()
            .persistent()
            .set(&VaultDataKey::MaxDebt(strategy.clone()), &0i128);

        StrategyAddedEvent { strategy }.publish(e);
    }

    pub fn strategy_active(e: &Env, strategy: Address) -> bool {
        e.storage()
            .persistent()
            .get(&VaultDataKey::Active(strategy))
            .unwrap_or(false)
    }

    pub fn debt(e: &Env, strategy: Address) -> i128 {
        e.storage()
            .persistent()
            .get(&VaultDataKey::Debt(strategy))
            .unwrap_or(0)
    }

    pub fn max_debt_for_strategy(e: &Env, strategy: Address) -> i128 {
        e.storage()
            .persistent()
            .get(&VaultDataKey::MaxDebt(strategy))
            .unwrap_or(0)
    }

    pub fn total_debt(e: &Env) -> i128 {
        e.storage()
            .instance()
            .get(&VaultDataKey::TotalDebt)
            .unwrap_or(0)
    }

    /// Asset balance held by the vault itself.
    pub fn total_idle(e: &Env) -> i128 {
        let asset = Self::asset(e);
        token::TokenClient::new(e, &asset).balance(&e.current_contract_address())
    }

    /// Idle balance plus debt allocated to strategies, at face value.
    pub fn total_assets(e: &Env) -> i128 {
        Self::total_idle(e) + Self::total_debt(e)
    }

    pub fn total_supply(e: &Env) -> i128 {
        e.storage()
            .instance()
            .get(&VaultDataKey::TotalShares)
            .unwrap_or(0)
    }

    pub fn balance_of(e: &Env, owner: Address) -> i128 {
        e.storage()
            .persistent()
            .get(&VaultDataKey::Shares(owner))
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

    /// Deposit assets into the vault and mint shares to `receiver`.
    pub fn deposit(e: &Env, assets: i128, receiver: Address, from: Address, operator: Address) -> i128 {
        operator.require_auth();

        if Self::total_assets(e) + assets > Self::deposit_limit(e) {
            panic!("exceed deposit limit");
        }

        let shares = Self::convert_to_shares(e, assets);
        let vault = e.current_contract_address();
        token::TokenClient::new(e, &Self::asset(e)).transfer_from(&vault, &from, &vault, &assets);
        Self::mint(e, &receiver, shares);

        VaultDepositEvent {
            operator,
            receiver,
            assets,
            shares,
        }
        .publish(e);

        shares
    }

    /// Withdraw assets to `receiver`, burning `owner`'s shares. The idle
    /// balance is used first; any shortfall is pulled from `strategies` in
    /// order, each pull bounded by that strategy's `max_withdraw`.
    pub fn withdraw(
        e: &Env,
        assets: i128,
        receiver: Address,
        owner: Address,
        strategies: Vec<Address>,
        operator: Address,
    ) -> i128 {
        operator.require_auth();

        let vault = e.current_contract_address();
        let shares = Self::shares_for_withdraw(e, assets);

        let mut shortfall = assets - Self::total_idle(e);
        for strategy in strategies.iter() {
            if shortfall <= 0 {
                break;
            }
            if !Self::strategy_active(e, strategy.clone()) {
                panic!("strategy not active");
            }
            let client = StrategyClient::new(e, &strategy);
            let pull = shortfall.min(client.max_withdraw(&vault));
            if pull > 0 {
                client.withdraw(&pull, &vault, &vault, &vault);
                let remaining = (Self::debt(e, strategy.clone()) - pull).max(0);
                Self::set_debt(e, &strategy, remaining);
                shortfall -= pull;
            }
        }
        if shortfall > 0 {
            panic!("insufficient assets");
        }

        token::TokenClient::new(e, &Self::asset(e)).transfer(&vault, &receiver, &assets);
        Self::burn(e, &owner, shares);

        VaultWithdrawEvent {
            operator,
            receiver,
            owner,
            assets,
            shares,
        }
        .publish(e);

        shares
    }

    /// Set the debt ceiling for a strategy.
    pub fn update_max_debt_for_strategy(
        e: &Env,
        strategy: Address,
        new_max_debt: i128,
        operator: Address,
    ) {
        Self::require_role(e, &operator, ROLE_DEBT_MANAGER);

        if !Self::strategy_active(e, strategy.clone()) {
            panic!("strategy not active");
        }
        e.storage()
            .persistent()
            .set(&VaultDataKey::MaxDebt(strategy.clone()), &new_max_debt);

        MaxDebtUpdatedEvent {
            strategy,
            max_debt: new_max_debt,
        }
        .publish(e);
    }

    /// Move the strategy's debt toward `target`, capped by its max debt, by
    /// the vault's idle balance on the way up and by the strategy's
    /// `max_withdraw` on the way down. Partial fulfillment is not an error.
    pub fn update_debt(e: &Env, strategy: Address, target: i128, operator: Address) -> i128 {
        Self::require_role(e, &operator, ROLE_DEBT_MANAGER);

        if !Self::strategy_active(e, strategy.clone()) {
            panic!("strategy not active");
        }

        let vault = e.current_contract_address();
        let client = StrategyClient::new(e, &strategy);
        let current = Self::debt(e, strategy.clone());
        let target = target.min(Self::max_debt_for_strategy(e, strategy.clone()));

        let new_debt = if target > current {
            let increase = (target - current).min(Self::total_idle(e));
            if increase > 0 {
                let expiry = e.ledger().sequence() + 200;
                token::TokenClient::new(e, &Self::asset(e))
                    .approve(&vault, &strategy, &increase, &expiry);
                client.deposit(&increase, &vault, &vault);
            }
            current + increase
        } else {
            let decrease = (current - target).min(client.max_withdraw(&vault));
            if decrease > 0 {
                client.withdraw(&decrease, &vault, &vault, &vault);
            }
            current - decrease
        };

        Self::set_debt(e, &strategy, new_debt);

        DebtUpdatedEvent {
            strategy,
            old_debt: current,
            new_debt,
        }
        .publish(e);

        new_debt
    }

    fn require_role(e: &Env, operator: &Address, role: u32) {
        operator.require_auth();
        if Self::roles(e, operator.clone()) & role == 0 {
            panic!("not authorized");
        }
    }

    fn set_debt(e: &Env, strategy: &Address, new_debt: i128) {
        let old = Self::debt(e, strategy.clone());
        e.storage()
            .persistent()
            .set(&VaultDataKey::Debt(strategy.clone()), &new_debt);
        let total = Self::total_debt(e) - old + new_debt;
        e.storage().instance().set(&VaultDataKey::TotalDebt, &total);
    }

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
            .set(&VaultDataKey::Shares(receiver.clone()), &(balance + shares));
        let supply = Self::total_supply(e);
        e.storage()
            .instance()
            .set(&VaultDataKey::TotalShares, &(supply + shares));
    }

    fn burn(e: &Env, owner: &Address, shares: i128) {
        let balance = Self::balance_of(e, owner.clone());
        if shares > balance {
            panic!("insufficient shares");
        }
        e.storage()
            .persistent()
            .set(&VaultDataKey::Shares(owner.clone()), &(balance - shares));
        let supply = Self::total_supply(e);
        e.storage()
            .instance()
            .set(&VaultDataKey::TotalShares, &(supply - shares));
    }
}
