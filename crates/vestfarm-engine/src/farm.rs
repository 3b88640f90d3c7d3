//! A staking farm: one reward ledger and one vesting schedule bound to a
//! staked asset.
//!
//! Every mutating operation works on copies of the ledger and the acting
//! position, submits all asset movements to custody as one batch, and only
//! then commits the copies. A failed call leaves the farm and custody exactly
//! as they were.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};
use vestfarm_core::error::FarmError;
use vestfarm_core::events::FarmEvent;
use vestfarm_core::traits::AssetCustody;
use vestfarm_core::types::{AccountId, Amount, AssetClass, Timestamp, Transfer};

use crate::ledger::{RewardAdded, RewardLedger};
use crate::position::StakerPosition;
use crate::vesting::{Release, VestingProgress, VestingSchedule};

/// Parameters of a new farm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmConfig {
    pub staked_asset: AssetClass,
    pub reward_asset: AssetClass,
    /// The only account allowed to start reward periods.
    pub distributor: AccountId,
    pub reward_duration: u64,
    pub vesting_period: u64,
    pub splits: u32,
}

/// Result of [`Farm::get_reward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Claim {
    pub paid: Amount,
    pub forfeited: Amount,
    pub claimed_splits: u32,
}

/// Result of [`Farm::exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exit {
    pub withdrawn: Amount,
    pub claim: Claim,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Farm {
    staked_asset: AssetClass,
    reward_asset: AssetClass,
    distributor: AccountId,
    ledger: RewardLedger,
    schedule: VestingSchedule,
    positions: BTreeMap<AccountId, StakerPosition>,
    #[serde(skip)]
    events: Vec<FarmEvent>,
}

impl Farm {
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `reward_duration` or `splits` is zero
    pub fn new(config: FarmConfig) -> Result<Self, FarmError> {
        Ok(Self {
            ledger: RewardLedger::new(config.reward_duration)?,
            schedule: VestingSchedule::new(config.vesting_period, config.splits)?,
            staked_asset: config.staked_asset,
            reward_asset: config.reward_asset,
            distributor: config.distributor,
            positions: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    pub fn staked_asset(&self) -> &AssetClass {
        &self.staked_asset
    }

    pub fn reward_asset(&self) -> &AssetClass {
        &self.reward_asset
    }

    pub fn distributor(&self) -> &AccountId {
        &self.distributor
    }

    /// Custody account holding this farm's stake and reward balances.
    pub fn account(&self) -> AccountId {
        AccountId::Farm(self.staked_asset.clone())
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn schedule(&self) -> &VestingSchedule {
        &self.schedule
    }

    pub fn position(&self, staker: &AccountId) -> Option<&StakerPosition> {
        self.positions.get(staker)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&AccountId, &StakerPosition)> {
        self.positions.iter()
    }

    pub fn balance_of(&self, staker: &AccountId) -> Amount {
        self.positions.get(staker).map_or(0, |p| p.balance)
    }

    pub fn total_staked(&self) -> Amount {
        self.ledger.total_staked()
    }

    /// Vesting windows already paid out to `staker`.
    pub fn claimed_splits(&self, staker: &AccountId) -> u32 {
        self.positions.get(staker).map_or(0, |p| p.claimed_splits)
    }

    pub fn vesting_progress(&self, staker: &AccountId) -> VestingProgress {
        self.schedule.progress(self.claimed_splits(staker))
    }

    pub fn reward_for_duration(&self) -> Amount {
        self.ledger.reward_for_duration()
    }

    pub fn last_time_reward_applicable(&self, now: Timestamp) -> Timestamp {
        self.ledger.last_time_reward_applicable(now)
    }

    pub fn reward_per_token(&self, now: Timestamp) -> Result<u128, FarmError> {
        self.ledger.reward_per_token(now)
    }

    /// Total reward `staker` has earned by `now`, including claimed reward.
    pub fn earned(&self, staker: &AccountId, now: Timestamp) -> Result<Amount, FarmError> {
        self.ledger.earned(&self.position_or_default(staker), now)
    }

    /// What [`get_reward`](Self::get_reward) would pay at `now`. Read-only.
    pub fn available_reward(&self, staker: &AccountId, now: Timestamp) -> Result<Amount, FarmError> {
        Ok(self.preview_release(staker, now)?.payout)
    }

    /// Full release preview at `now`, including any penalty burn.
    pub fn preview_release(&self, staker: &AccountId, now: Timestamp) -> Result<Release, FarmError> {
        let position = self.position_or_default(staker);
        let entitlement = self.ledger.earned(&position, now)?;
        Ok(self
            .schedule
            .release(&position, entitlement, self.period_end(), now))
    }

    /// Take all buffered events.
    pub fn drain_events(&mut self) -> Vec<FarmEvent> {
        std::mem::take(&mut self.events)
    }

    /// Deposit `amount` of the staked asset from `staker`.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `amount` is zero
    /// - [`FarmError::Unauthorized`] if `staker` is not a user account
    /// - [`FarmError::InsufficientBalance`] if custody cannot debit `staker`
    pub fn stake(
        &mut self,
        custody: &mut impl AssetCustody,
        staker: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), FarmError> {
        ensure_user(staker)?;
        let mut ledger = self.ledger.clone();
        let mut position = self.position_or_default(staker);
        ledger.checkpoint(&mut position, now)?;
        ledger.deposit(&mut position, amount)?;

        custody.transfer(&Transfer::new(&self.staked_asset, staker, &self.account(), amount))?;

        self.commit(staker, ledger, position);
        debug!(farm = %self.staked_asset, %staker, amount, total = self.total_staked(), "farm: staked");
        self.events.push(FarmEvent::Staked {
            farm: self.staked_asset.clone(),
            staker: staker.clone(),
            amount,
        });
        Ok(())
    }

    /// Return `amount` of the staked asset to `staker`.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `amount` is zero
    /// - [`FarmError::InsufficientBalance`] if `amount` exceeds the staked balance
    pub fn withdraw(
        &mut self,
        custody: &mut impl AssetCustody,
        staker: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), FarmError> {
        let mut ledger = self.ledger.clone();
        let mut position = self.position_or_default(staker);
        ledger.checkpoint(&mut position, now)?;
        ledger.release(&mut position, amount)?;

        custody.transfer(&Transfer::new(&self.staked_asset, &self.account(), staker, amount))?;

        self.commit(staker, ledger, position);
        debug!(farm = %self.staked_asset, %staker, amount, total = self.total_staked(), "farm: withdrawn");
        self.events.push(FarmEvent::Withdrawn {
            farm: self.staked_asset.clone(),
            staker: staker.clone(),
            amount,
        });
        Ok(())
    }

    /// Pay out whatever the vesting schedule has unlocked for `staker`.
    ///
    /// Claiming nothing is not an error: the returned [`Claim`] is zero and
    /// no reward moves.
    ///
    /// # Errors
    ///
    /// - [`FarmError::Unauthorized`] if `staker` is not a user account
    pub fn get_reward(
        &mut self,
        custody: &mut impl AssetCustody,
        staker: &AccountId,
        now: Timestamp,
    ) -> Result<Claim, FarmError> {
        ensure_user(staker)?;
        let mut ledger = self.ledger.clone();
        let mut position = self.position_or_default(staker);
        ledger.checkpoint(&mut position, now)?;
        let release = self.schedule.release(
            &position,
            position.accrued_reward,
            ledger.period().map(|p| p.end),
            now,
        );

        custody.transfer_batch(&self.release_transfers(staker, &release))?;

        let claim = settle(&mut position, &release);
        self.commit(staker, ledger, position);
        self.record_claim(staker, &claim);
        Ok(claim)
    }

    /// Withdraw the whole balance and claim, as one operation.
    ///
    /// # Errors
    ///
    /// - [`FarmError::Unauthorized`] if `staker` is not a user account
    /// - [`FarmError::InvalidAmount`] if `staker` has nothing staked
    pub fn exit(
        &mut self,
        custody: &mut impl AssetCustody,
        staker: &AccountId,
        now: Timestamp,
    ) -> Result<Exit, FarmError> {
        ensure_user(staker)?;
        let mut ledger = self.ledger.clone();
        let mut position = self.position_or_default(staker);
        ledger.checkpoint(&mut position, now)?;
        let withdrawn = position.balance;
        ledger.release(&mut position, withdrawn)?;
        let release = self.schedule.release(
            &position,
            position.accrued_reward,
            ledger.period().map(|p| p.end),
            now,
        );

        let mut transfers = vec![Transfer::new(&self.staked_asset, &self.account(), staker, withdrawn)];
        transfers.extend(self.release_transfers(staker, &release));
        custody.transfer_batch(&transfers)?;

        let claim = settle(&mut position, &release);
        self.commit(staker, ledger, position);
        debug!(farm = %self.staked_asset, %staker, withdrawn, paid = claim.paid, "farm: exited");
        self.events.push(FarmEvent::Withdrawn {
            farm: self.staked_asset.clone(),
            staker: staker.clone(),
            amount: withdrawn,
        });
        self.record_claim(staker, &claim);
        Ok(Exit { withdrawn, claim })
    }

    /// Opt in to (`true`) or out of (`false`) the gradual vesting schedule.
    ///
    /// An election may be recorded before the first stake. Re-stating the
    /// default election for an unknown staker records nothing.
    ///
    /// # Errors
    ///
    /// - [`FarmError::Unauthorized`] if `staker` is not a user account
    /// - [`FarmError::VestingLocked`] after the staker's first settlement
    pub fn set_vesting_config(&mut self, staker: &AccountId, opt_in: bool) -> Result<(), FarmError> {
        ensure_user(staker)?;
        let mut position = self.position_or_default(staker);
        position.election.set(opt_in)?;
        if self.positions.contains_key(staker) || position != StakerPosition::default() {
            self.positions.insert(staker.clone(), position);
        }
        debug!(farm = %self.staked_asset, %staker, opt_in, "farm: vesting configured");
        self.events.push(FarmEvent::VestingConfigured {
            farm: self.staked_asset.clone(),
            staker: staker.clone(),
            opt_in,
        });
        Ok(())
    }

    /// Start a reward period of `amount`. The reward units must already be
    /// in this farm's custody account.
    ///
    /// # Errors
    ///
    /// - [`FarmError::Unauthorized`] if `caller` is not the distributor
    /// - [`FarmError::RateTooLow`] if the budget yields a zero rate
    pub fn notify_reward(
        &mut self,
        caller: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<RewardAdded, FarmError> {
        if *caller != self.distributor {
            return Err(FarmError::Unauthorized(caller.clone()));
        }
        let added = self.ledger.notify(amount, now)?;
        info!(
            farm = %self.staked_asset,
            budget = added.budget,
            rate = added.rate,
            start = added.period.start,
            end = added.period.end,
            "farm: reward period started"
        );
        self.events.push(FarmEvent::RewardAdded {
            farm: self.staked_asset.clone(),
            budget: added.budget,
            rate: added.rate,
            period_start: added.period.start,
            period_end: added.period.end,
        });
        Ok(added)
    }

    fn period_end(&self) -> Option<Timestamp> {
        self.ledger.period().map(|p| p.end)
    }

    fn position_or_default(&self, staker: &AccountId) -> StakerPosition {
        self.positions.get(staker).cloned().unwrap_or_default()
    }

    /// Swap in the staged ledger and position. A staker without a position
    /// only gets one once it holds a stake or unsettled reward.
    fn commit(&mut self, staker: &AccountId, ledger: RewardLedger, position: StakerPosition) {
        self.ledger = ledger;
        if let Some(slot) = self.positions.get_mut(staker) {
            *slot = position;
        } else if position.balance > 0 || !position.is_closed() {
            self.positions.insert(staker.clone(), position);
        }
    }

    fn release_transfers(&self, staker: &AccountId, release: &Release) -> Vec<Transfer> {
        let account = self.account();
        let mut transfers = Vec::with_capacity(2);
        if release.payout > 0 {
            transfers.push(Transfer::new(&self.reward_asset, &account, staker, release.payout));
        }
        if release.forfeited > 0 {
            transfers.push(Transfer::new(&self.reward_asset, &account, &AccountId::Burn, release.forfeited));
        }
        transfers
    }

    fn record_claim(&mut self, staker: &AccountId, claim: &Claim) {
        if claim.paid > 0 {
            debug!(farm = %self.staked_asset, %staker, paid = claim.paid, splits = claim.claimed_splits, "farm: reward paid");
            self.events.push(FarmEvent::RewardPaid {
                farm: self.staked_asset.clone(),
                staker: staker.clone(),
                amount: claim.paid,
                claimed_splits: claim.claimed_splits,
            });
        }
        if claim.forfeited > 0 {
            warn!(farm = %self.staked_asset, %staker, forfeited = claim.forfeited, "farm: deferred opt-out claim, reward burned");
            self.events.push(FarmEvent::RewardForfeited {
                farm: self.staked_asset.clone(),
                staker: staker.clone(),
                amount: claim.forfeited,
            });
        }
    }
}

fn ensure_user(account: &AccountId) -> Result<(), FarmError> {
    if account.is_user() {
        Ok(())
    } else {
        Err(FarmError::Unauthorized(account.clone()))
    }
}

/// Apply `release` to `position`. Locks the vesting election on any
/// settlement.
fn settle(position: &mut StakerPosition, release: &Release) -> Claim {
    if release.is_empty() {
        return Claim {
            claimed_splits: position.claimed_splits,
            ..Claim::default()
        };
    }
    position.total_claimed += release.payout;
    position.forfeited += release.forfeited;
    position.claimed_splits = release.windows_elapsed;
    position.election.lock();
    Claim {
        paid: release.payout,
        forfeited: release.forfeited,
        claimed_splits: position.claimed_splits,
    }
}
