//! Split vesting of accrued reward.
//!
//! Nothing is claimable while the reward period runs. From the period end
//! the entitlement unlocks in `splits` equal steps, one per `split_window`:
//!
//! ```text
//! windows  = 0                                              if now < end
//!          = min(splits, 1 + (now - end) / split_window)    otherwise
//! unlocked = entitlement * windows / splits
//! payout   = unlocked - settled
//! ```
//!
//! The first window opens exactly at the period end. A staker who opted out
//! of the schedule and makes the first claim at or after
//! `end + vesting_period` receives only half of the entitlement; the other
//! half is burned. Opted-in stakers always receive the full unlocked amount.

use serde::Serialize;
use vestfarm_core::constants::{BPS_PRECISION, OPT_OUT_PENALTY_BPS};
use vestfarm_core::error::FarmError;
use vestfarm_core::types::{Amount, Timestamp};

use crate::position::StakerPosition;

/// Vesting progress of one staker, derived from `claimed_splits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VestingProgress {
    /// No window paid out yet.
    Unlocked,
    /// Some but not all windows paid out.
    PartiallyVested(u32),
    FullyVested,
}

/// What a claim at a given instant would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Release {
    /// Units transferred to the staker.
    pub payout: Amount,
    /// Units burned by the opt-out penalty.
    pub forfeited: Amount,
    pub windows_elapsed: u32,
    pub penalized: bool,
}

impl Release {
    pub fn is_empty(&self) -> bool {
        self.payout == 0 && self.forfeited == 0
    }
}

/// Vesting parameters shared by every staker of a farm.
///
/// `split_window * splits <= vesting_period`; the truncated tail is never
/// waited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VestingSchedule {
    vesting_period: u64,
    splits: u32,
    split_window: u64,
}

impl VestingSchedule {
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `splits` is zero
    pub fn new(vesting_period: u64, splits: u32) -> Result<Self, FarmError> {
        if splits == 0 {
            return Err(FarmError::InvalidAmount("vesting splits must be positive"));
        }
        Ok(Self {
            vesting_period,
            splits,
            split_window: vesting_period / splits as u64,
        })
    }

    pub fn vesting_period(&self) -> u64 {
        self.vesting_period
    }

    pub fn splits(&self) -> u32 {
        self.splits
    }

    pub fn split_window(&self) -> u64 {
        self.split_window
    }

    /// Instant from which an opted-out first claim is penalized.
    pub fn fully_vested_at(&self, period_end: Timestamp) -> Timestamp {
        period_end.saturating_add(self.vesting_period)
    }

    /// Number of windows open at `now`. Zero before the farm is funded.
    pub fn windows_elapsed(&self, period_end: Option<Timestamp>, now: Timestamp) -> u32 {
        let Some(end) = period_end else {
            return 0;
        };
        if now < end {
            return 0;
        }
        if self.split_window == 0 {
            return self.splits;
        }
        let opened = ((now - end) / self.split_window).saturating_add(1);
        opened.min(self.splits as u64) as u32
    }

    /// `entitlement * windows / splits`, capped at the entitlement.
    pub fn unlocked(&self, entitlement: Amount, windows: u32) -> Amount {
        let windows = windows.min(self.splits);
        ((entitlement as u128 * windows as u128) / self.splits as u128) as Amount
    }

    /// Opening time of each window, paired with its 1-based index.
    pub fn unlock_times(&self, period_end: Timestamp) -> Vec<(Timestamp, u32)> {
        (0..self.splits)
            .map(|i| {
                let at = period_end.saturating_add(self.split_window.saturating_mul(i as u64));
                (at, i + 1)
            })
            .collect()
    }

    pub fn progress(&self, claimed_splits: u32) -> VestingProgress {
        match claimed_splits {
            0 => VestingProgress::Unlocked,
            n if n >= self.splits => VestingProgress::FullyVested,
            n => VestingProgress::PartiallyVested(n),
        }
    }

    /// What claiming at `now` would release for `position`, given its total
    /// `entitlement` (accrued reward as of `now`). Pure.
    pub fn release(
        &self,
        position: &StakerPosition,
        entitlement: Amount,
        period_end: Option<Timestamp>,
        now: Timestamp,
    ) -> Release {
        let windows = self.windows_elapsed(period_end, now);
        if windows == 0 {
            return Release::default();
        }
        let settled = position.settled();

        let deferred_past_vesting = period_end.is_some_and(|end| now >= self.fully_vested_at(end));
        if !position.vesting_opt_in() && settled == 0 && deferred_past_vesting {
            let payout = ((entitlement as u128 * (BPS_PRECISION - OPT_OUT_PENALTY_BPS) as u128)
                / BPS_PRECISION as u128) as Amount;
            return Release {
                payout,
                forfeited: entitlement - payout,
                windows_elapsed: self.splits,
                penalized: true,
            };
        }

        Release {
            payout: self.unlocked(entitlement, windows).saturating_sub(settled),
            forfeited: 0,
            windows_elapsed: windows,
            penalized: false,
        }
    }
}
