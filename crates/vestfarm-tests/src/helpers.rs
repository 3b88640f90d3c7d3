//! Shared test helpers for scenario and adversarial tests.

use vestfarm_core::clock::ManualClock;
use vestfarm_core::constants::{COIN, SECONDS_PER_DAY};
use vestfarm_core::custody::MemoryCustody;
use vestfarm_core::error::FarmError;
use vestfarm_core::traits::{AssetCustody, Clock};
use vestfarm_core::types::{AccountId, Amount, AssetClass, Timestamp};
use vestfarm_engine::{Claim, Exit, Farm, FarmFactory, FarmParams};

/// Factory construction time.
pub const START: Timestamp = 1_700_000_000;
/// Genesis is one hour after construction.
pub const GENESIS: Timestamp = START + 3_600;
/// Seven days; does not divide the default reward, so the rate truncates.
pub const REWARD_DURATION: u64 = 7 * SECONDS_PER_DAY;
pub const VESTING_PERIOD: u64 = 90 * SECONDS_PER_DAY;
pub const SPLITS: u32 = 4;
/// Default reward budget per farm.
pub const REWARD: Amount = 100 * COIN;
/// Reward actually streamed after rate truncation.
pub const ACTUAL_REWARD: Amount = REWARD / REWARD_DURATION * REWARD_DURATION;
/// Stake minted to each named user.
pub const USER_FUNDS: Amount = 1_000 * COIN;

pub fn owner() -> AccountId {
    AccountId::user("owner")
}

pub fn user(name: &str) -> AccountId {
    AccountId::user(name)
}

pub fn reward_asset() -> AssetClass {
    AssetClass::new("REWARD")
}

/// Staked asset number `n`.
pub fn lp(n: u8) -> AssetClass {
    AssetClass::new(format!("LP-{n}"))
}

pub fn params(asset: AssetClass, reward_amount: Amount) -> FarmParams {
    FarmParams {
        staked_asset: asset,
        reward_amount,
        reward_duration: REWARD_DURATION,
        vesting_period: VESTING_PERIOD,
        splits: SPLITS,
    }
}

/// A factory, its custody and a manual clock, wired together.
pub struct Harness {
    pub factory: FarmFactory,
    pub custody: MemoryCustody,
    pub clock: ManualClock,
}

impl Harness {
    /// Factory with no farms. The owner holds a billion reward coins and
    /// each of `users` holds [`USER_FUNDS`] of every `LP-n` for n in 0..4.
    pub fn new(users: &[&str]) -> Self {
        let mut custody = MemoryCustody::new();
        custody
            .mint(&reward_asset(), &owner(), 1_000_000_000 * COIN)
            .unwrap();
        for name in users {
            for n in 0..4 {
                custody.mint(&lp(n), &user(name), USER_FUNDS).unwrap();
            }
        }
        Self {
            factory: FarmFactory::new(owner(), reward_asset(), GENESIS),
            custody,
            clock: ManualClock::new(START),
        }
    }

    /// One farm on `LP-0` with [`REWARD`], fully funded but not yet
    /// distributed.
    pub fn single_farm(users: &[&str]) -> Self {
        let mut h = Self::new(users);
        h.factory.register_farm(&owner(), params(lp(0), REWARD)).unwrap();
        h.fund(REWARD);
        h
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn set_time(&self, t: Timestamp) {
        self.clock.set(t);
    }

    /// Owner moves `amount` of reward into the factory pool.
    pub fn fund(&mut self, amount: Amount) {
        self.factory
            .fund(&mut self.custody, &owner(), amount)
            .unwrap();
    }

    /// Jump to genesis and distribute. Returns the reward period end of
    /// `LP-0` if it was funded.
    pub fn start(&mut self) -> Timestamp {
        self.set_time(GENESIS);
        self.factory
            .distribute_all(&mut self.custody, GENESIS)
            .unwrap();
        self.period_end(&lp(0))
    }

    pub fn period_end(&self, asset: &AssetClass) -> Timestamp {
        self.farm(asset)
            .ledger()
            .period()
            .map(|p| p.end)
            .unwrap_or_default()
    }

    pub fn split_window(&self) -> u64 {
        self.farm(&lp(0)).schedule().split_window()
    }

    pub fn farm(&self, asset: &AssetClass) -> &Farm {
        self.factory.farm(asset).unwrap()
    }

    pub fn stake(&mut self, asset: &AssetClass, who: &str, amount: Amount) -> Result<(), FarmError> {
        let now = self.now();
        self.factory
            .farm_mut(asset)?
            .stake(&mut self.custody, &user(who), amount, now)
    }

    pub fn withdraw(&mut self, asset: &AssetClass, who: &str, amount: Amount) -> Result<(), FarmError> {
        let now = self.now();
        self.factory
            .farm_mut(asset)?
            .withdraw(&mut self.custody, &user(who), amount, now)
    }

    pub fn claim(&mut self, asset: &AssetClass, who: &str) -> Result<Claim, FarmError> {
        let now = self.now();
        self.factory
            .farm_mut(asset)?
            .get_reward(&mut self.custody, &user(who), now)
    }

    pub fn exit(&mut self, asset: &AssetClass, who: &str) -> Result<Exit, FarmError> {
        let now = self.now();
        self.factory
            .farm_mut(asset)?
            .exit(&mut self.custody, &user(who), now)
    }

    pub fn set_vesting(&mut self, asset: &AssetClass, who: &str, opt_in: bool) -> Result<(), FarmError> {
        self.factory
            .farm_mut(asset)?
            .set_vesting_config(&user(who), opt_in)
    }

    pub fn available(&self, asset: &AssetClass, who: &str) -> Amount {
        self.farm(asset)
            .available_reward(&user(who), self.now())
            .unwrap()
    }

    /// Reward asset held by `who`.
    pub fn reward_balance(&self, who: &str) -> Amount {
        self.custody.balance_of(&reward_asset(), &user(who))
    }

    pub fn burned(&self) -> Amount {
        self.custody.balance_of(&reward_asset(), &AccountId::Burn)
    }

    /// Reward asset across every account; constant once minted.
    pub fn reward_supply(&self) -> u128 {
        self.custody.total_supply(&reward_asset())
    }
}

/// `|a - b| <= b / 10_000`.
pub fn within_bps(a: Amount, b: Amount) -> bool {
    a.abs_diff(b) <= b / 10_000
}
