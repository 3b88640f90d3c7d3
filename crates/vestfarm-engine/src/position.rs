//! Per-staker state held by a farm.

use serde::Serialize;
use vestfarm_core::error::FarmError;
use vestfarm_core::types::Amount;

/// A staker's vesting election.
///
/// A one-way latch: the election can be changed while `Open`, and becomes
/// `Locked` at the first settlement (payout or forfeiture). There is no
/// transition back to `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VestingElection {
    Open { opt_in: bool },
    Locked { opt_in: bool },
}

impl Default for VestingElection {
    fn default() -> Self {
        Self::Open { opt_in: true }
    }
}

impl VestingElection {
    pub fn opt_in(&self) -> bool {
        match *self {
            Self::Open { opt_in } | Self::Locked { opt_in } => opt_in,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// Change the election.
    ///
    /// # Errors
    ///
    /// - [`FarmError::VestingLocked`] once the latch has closed
    pub fn set(&mut self, opt_in: bool) -> Result<(), FarmError> {
        match self {
            Self::Open { .. } => {
                *self = Self::Open { opt_in };
                Ok(())
            }
            Self::Locked { .. } => Err(FarmError::VestingLocked),
        }
    }

    pub fn lock(&mut self) {
        *self = Self::Locked {
            opt_in: self.opt_in(),
        };
    }
}

/// Staked balance, accrual snapshot and vesting progress of one staker.
///
/// # Invariants
///
/// * `claimed_splits <= splits` of the owning farm's schedule
/// * `total_claimed + forfeited <= accrued_reward`
/// * once `total_claimed > 0` the election is locked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StakerPosition {
    /// Currently staked units.
    pub balance: Amount,
    /// Accumulator value at the last checkpoint.
    pub reward_per_token_paid: u128,
    /// Total reward earned up to the last checkpoint, claimed or not.
    pub accrued_reward: Amount,
    pub election: VestingElection,
    /// Number of vesting windows already paid out.
    pub claimed_splits: u32,
    pub total_claimed: Amount,
    /// Reward burned by the opt-out penalty.
    pub forfeited: Amount,
}

impl StakerPosition {
    pub fn vesting_opt_in(&self) -> bool {
        self.election.opt_in()
    }

    /// Entitlement already settled, whether paid or burned.
    pub fn settled(&self) -> Amount {
        self.total_claimed.saturating_add(self.forfeited)
    }

    /// Nothing staked and nothing left to release as of the last checkpoint.
    pub fn is_closed(&self) -> bool {
        self.balance == 0 && self.settled() >= self.accrued_reward
    }
}
