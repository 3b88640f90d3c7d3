//! Stake-weighted reward accrual.
//!
//! A reward period streams `reward_rate` units per second to all stakers.
//! Instead of touching every position each second, the ledger keeps a global
//! accumulator of reward earned per staked unit:
//!
//! ```text
//! reward_per_token += elapsed * reward_rate * REWARD_PRECISION / total_staked
//! earned(staker)    = accrued + balance * (reward_per_token - paid) / REWARD_PRECISION
//! ```
//!
//! Every state-changing call first [`checkpoint`](RewardLedger::checkpoint)s
//! the accumulator and the acting staker, so balance changes only affect
//! accrual from that moment on. Time with nothing staked accrues to nobody.

use serde::Serialize;
use vestfarm_core::constants::REWARD_PRECISION;
use vestfarm_core::error::FarmError;
use vestfarm_core::types::{Amount, Timestamp};

use crate::position::StakerPosition;

/// Start and end of the active (or most recent) reward period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardPeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Outcome of funding a reward period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardAdded {
    /// New amount plus the unstreamed remainder of a still-active period.
    pub budget: Amount,
    pub rate: Amount,
    pub period: RewardPeriod,
}

/// Accrual bookkeeping for one farm.
///
/// # Invariants
///
/// * `period.end == period.start + duration`
/// * `reward_rate * duration <= reward_budget`; the truncated remainder is
///   never streamed
/// * `reward_per_token_stored` never decreases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardLedger {
    duration: u64,
    reward_budget: Amount,
    reward_rate: Amount,
    period: Option<RewardPeriod>,
    last_update_time: Timestamp,
    reward_per_token_stored: u128,
    total_staked: Amount,
}

impl RewardLedger {
    /// Create an unfunded ledger whose reward periods last `duration` seconds.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `duration` is zero
    pub fn new(duration: u64) -> Result<Self, FarmError> {
        if duration == 0 {
            return Err(FarmError::InvalidAmount("reward duration must be positive"));
        }
        Ok(Self {
            duration,
            reward_budget: 0,
            reward_rate: 0,
            period: None,
            last_update_time: 0,
            reward_per_token_stored: 0,
            total_staked: 0,
        })
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn reward_budget(&self) -> Amount {
        self.reward_budget
    }

    pub fn reward_rate(&self) -> Amount {
        self.reward_rate
    }

    pub fn period(&self) -> Option<RewardPeriod> {
        self.period
    }

    pub fn last_update_time(&self) -> Timestamp {
        self.last_update_time
    }

    pub fn reward_per_token_stored(&self) -> u128 {
        self.reward_per_token_stored
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    /// Reward streamed over one full period at the current rate.
    pub fn reward_for_duration(&self) -> Amount {
        self.reward_rate.saturating_mul(self.duration)
    }

    /// `min(now, period end)`, or the last update time when never funded.
    pub fn last_time_reward_applicable(&self, now: Timestamp) -> Timestamp {
        match self.period {
            Some(period) => now.min(period.end),
            None => self.last_update_time,
        }
    }

    /// Accumulator value as of `now`, without storing it.
    pub fn reward_per_token(&self, now: Timestamp) -> Result<u128, FarmError> {
        if self.total_staked == 0 || self.period.is_none() {
            return Ok(self.reward_per_token_stored);
        }
        let elapsed = self
            .last_time_reward_applicable(now)
            .saturating_sub(self.last_update_time);
        if elapsed == 0 {
            return Ok(self.reward_per_token_stored);
        }
        let increment = (elapsed as u128)
            .checked_mul(self.reward_rate as u128)
            .and_then(|v| v.checked_mul(REWARD_PRECISION))
            .ok_or(FarmError::ArithmeticOverflow)?
            / self.total_staked as u128;
        self.reward_per_token_stored
            .checked_add(increment)
            .ok_or(FarmError::ArithmeticOverflow)
    }

    /// Total reward `position` has earned as of `now`, claimed or not.
    pub fn earned(&self, position: &StakerPosition, now: Timestamp) -> Result<Amount, FarmError> {
        accrue(position, self.reward_per_token(now)?)
    }

    /// Fold elapsed time into the accumulator.
    pub fn update(&mut self, now: Timestamp) -> Result<(), FarmError> {
        self.reward_per_token_stored = self.reward_per_token(now)?;
        if self.period.is_some() {
            self.last_update_time = self
                .last_update_time
                .max(self.last_time_reward_applicable(now));
        }
        Ok(())
    }

    /// Move `position`'s accrual up to the stored accumulator.
    pub fn settle(&self, position: &mut StakerPosition) -> Result<(), FarmError> {
        position.accrued_reward = accrue(position, self.reward_per_token_stored)?;
        position.reward_per_token_paid = self.reward_per_token_stored;
        Ok(())
    }

    /// [`update`](Self::update) then [`settle`](Self::settle). Run before any
    /// change to `position`.
    pub fn checkpoint(
        &mut self,
        position: &mut StakerPosition,
        now: Timestamp,
    ) -> Result<(), FarmError> {
        self.update(now)?;
        self.settle(position)
    }

    /// Add `amount` to a checkpointed position.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `amount` is zero
    /// - [`FarmError::ArithmeticOverflow`] if a balance would exceed `u64::MAX`
    pub fn deposit(&mut self, position: &mut StakerPosition, amount: Amount) -> Result<(), FarmError> {
        if amount == 0 {
            return Err(FarmError::InvalidAmount("stake amount must be positive"));
        }
        let balance = position
            .balance
            .checked_add(amount)
            .ok_or(FarmError::ArithmeticOverflow)?;
        let total = self
            .total_staked
            .checked_add(amount)
            .ok_or(FarmError::ArithmeticOverflow)?;
        position.balance = balance;
        self.total_staked = total;
        Ok(())
    }

    /// Remove `amount` from a checkpointed position.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `amount` is zero
    /// - [`FarmError::InsufficientBalance`] if `amount` exceeds the balance
    pub fn release(&mut self, position: &mut StakerPosition, amount: Amount) -> Result<(), FarmError> {
        if amount == 0 {
            return Err(FarmError::InvalidAmount("withdraw amount must be positive"));
        }
        if amount > position.balance {
            return Err(FarmError::InsufficientBalance {
                have: position.balance,
                need: amount,
            });
        }
        position.balance -= amount;
        self.total_staked -= amount;
        Ok(())
    }

    /// Start a reward period of `amount` at `now`.
    ///
    /// Accrual at the old rate is flushed first. If a period is still running,
    /// its unstreamed remainder is added to the new budget. The ledger is left
    /// untouched on error.
    ///
    /// # Errors
    ///
    /// - [`FarmError::InvalidAmount`] if `amount` is zero
    /// - [`FarmError::RateTooLow`] if the budget is smaller than the duration
    /// - [`FarmError::ArithmeticOverflow`] on overflow
    pub fn notify(&mut self, amount: Amount, now: Timestamp) -> Result<RewardAdded, FarmError> {
        if amount == 0 {
            return Err(FarmError::InvalidAmount("reward amount must be positive"));
        }
        let mut next = self.clone();
        next.update(now)?;

        let remainder = match self.period {
            Some(period) if now < period.end => (period.end - now)
                .checked_mul(self.reward_rate)
                .ok_or(FarmError::ArithmeticOverflow)?,
            _ => 0,
        };
        let budget = amount
            .checked_add(remainder)
            .ok_or(FarmError::ArithmeticOverflow)?;
        let rate = budget / self.duration;
        if rate == 0 {
            return Err(FarmError::RateTooLow {
                budget,
                duration: self.duration,
            });
        }
        let end = now
            .checked_add(self.duration)
            .ok_or(FarmError::ArithmeticOverflow)?;
        let period = RewardPeriod { start: now, end };

        next.reward_budget = budget;
        next.reward_rate = rate;
        next.period = Some(period);
        next.last_update_time = now;
        *self = next;

        Ok(RewardAdded {
            budget,
            rate,
            period,
        })
    }
}

/// `accrued + balance * (reward_per_token - paid) / REWARD_PRECISION`.
fn accrue(position: &StakerPosition, reward_per_token: u128) -> Result<Amount, FarmError> {
    let delta = reward_per_token.saturating_sub(position.reward_per_token_paid);
    let fresh = (position.balance as u128)
        .checked_mul(delta)
        .ok_or(FarmError::ArithmeticOverflow)?
        / REWARD_PRECISION;
    let total = (position.accrued_reward as u128)
        .checked_add(fresh)
        .ok_or(FarmError::ArithmeticOverflow)?;
    Amount::try_from(total).map_err(|_| FarmError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vestfarm_core::constants::COIN;

    const DURATION: u64 = 1_000;

    fn funded(amount: Amount, at: Timestamp) -> RewardLedger {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        ledger.notify(amount, at).unwrap();
        ledger
    }

    fn staked(ledger: &mut RewardLedger, amount: Amount, now: Timestamp) -> StakerPosition {
        let mut p = StakerPosition::default();
        ledger.checkpoint(&mut p, now).unwrap();
        ledger.deposit(&mut p, amount).unwrap();
        p
    }

    // --- construction / notify ---

    #[test]
    fn zero_duration_rejected() {
        assert!(matches!(RewardLedger::new(0), Err(FarmError::InvalidAmount(_))));
    }

    #[test]
    fn notify_sets_rate_and_period() {
        let ledger = funded(100 * COIN, 50);
        assert_eq!(ledger.reward_rate(), 100 * COIN / DURATION);
        assert_eq!(
            ledger.period(),
            Some(RewardPeriod {
                start: 50,
                end: 50 + DURATION
            })
        );
        assert_eq!(ledger.last_update_time(), 50);
        assert_eq!(ledger.reward_for_duration(), 100 * COIN);
    }

    #[test]
    fn notify_truncates_rate() {
        let ledger = funded(2_500, 0);
        assert_eq!(ledger.reward_rate(), 2);
        assert_eq!(ledger.reward_budget(), 2_500);
        assert_eq!(ledger.reward_for_duration(), 2_000);
    }

    #[test]
    fn notify_rejects_budget_below_duration() {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        let before = ledger.clone();
        assert_eq!(
            ledger.notify(DURATION - 1, 0),
            Err(FarmError::RateTooLow {
                budget: DURATION - 1,
                duration: DURATION
            })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn notify_rejects_zero() {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        assert!(matches!(ledger.notify(0, 0), Err(FarmError::InvalidAmount(_))));
    }

    #[test]
    fn notify_mid_period_folds_remainder() {
        let mut ledger = funded(10_000, 0);
        // Half the period left: 5 * 1000 unstreamed.
        let added = ledger.notify(3_000, 500).unwrap();
        assert_eq!(added.budget, 8_000);
        assert_eq!(added.rate, 8);
        assert_eq!(added.period, RewardPeriod { start: 500, end: 1_500 });
    }

    #[test]
    fn notify_after_period_ignores_old_rate() {
        let mut ledger = funded(10_000, 0);
        let added = ledger.notify(3_000, 2_000).unwrap();
        assert_eq!(added.budget, 3_000);
    }

    #[test]
    fn notify_flushes_accrual_at_old_rate() {
        let mut ledger = funded(10_000, 0);
        let mut p = staked(&mut ledger, 10, 0);
        ledger.notify(10_000, 500).unwrap();
        ledger.checkpoint(&mut p, 500).unwrap();
        assert_eq!(p.accrued_reward, 5_000);
    }

    // --- accrual ---

    #[test]
    fn nothing_accrues_without_period() {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        let mut p = staked(&mut ledger, 10 * COIN, 0);
        ledger.checkpoint(&mut p, 5_000).unwrap();
        assert_eq!(p.accrued_reward, 0);
        assert_eq!(ledger.reward_per_token(10_000).unwrap(), 0);
    }

    #[test]
    fn single_staker_earns_whole_stream() {
        let mut ledger = funded(100 * COIN, 0);
        let p = staked(&mut ledger, 2 * COIN, 0);
        assert_eq!(ledger.earned(&p, DURATION).unwrap(), 100 * COIN);
        // Accrual stops at the period end.
        assert_eq!(ledger.earned(&p, DURATION * 10).unwrap(), 100 * COIN);
    }

    #[test]
    fn time_with_empty_pool_accrues_to_nobody() {
        let mut ledger = funded(100 * COIN, 0);
        let p = staked(&mut ledger, COIN, DURATION / 2);
        assert_eq!(ledger.earned(&p, DURATION).unwrap(), 50 * COIN);
    }

    #[test]
    fn two_stakers_split_by_balance() {
        let mut ledger = funded(90 * COIN, 0);
        let a = staked(&mut ledger, COIN, 0);
        let b = staked(&mut ledger, 2 * COIN, 0);
        assert_eq!(ledger.earned(&a, DURATION).unwrap(), 30 * COIN);
        assert_eq!(ledger.earned(&b, DURATION).unwrap(), 60 * COIN);
    }

    #[test]
    fn update_is_idempotent_at_same_time() {
        let mut ledger = funded(100 * COIN, 0);
        let _p = staked(&mut ledger, COIN, 0);
        ledger.update(300).unwrap();
        let once = ledger.clone();
        ledger.update(300).unwrap();
        assert_eq!(ledger, once);
    }

    #[test]
    fn last_time_applicable_caps_at_end() {
        let ledger = funded(100 * COIN, 10);
        assert_eq!(ledger.last_time_reward_applicable(5), 5);
        assert_eq!(ledger.last_time_reward_applicable(10_000), 10 + DURATION);
    }

    // --- deposit / release ---

    #[test]
    fn release_more_than_balance_fails() {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        let mut p = staked(&mut ledger, 5, 0);
        assert_eq!(
            ledger.release(&mut p, 6),
            Err(FarmError::InsufficientBalance { have: 5, need: 6 })
        );
        assert_eq!(p.balance, 5);
        assert_eq!(ledger.total_staked(), 5);
    }

    #[test]
    fn zero_deposit_and_release_rejected() {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        let mut p = StakerPosition::default();
        assert!(matches!(ledger.deposit(&mut p, 0), Err(FarmError::InvalidAmount(_))));
        assert!(matches!(ledger.release(&mut p, 0), Err(FarmError::InvalidAmount(_))));
    }

    #[test]
    fn deposit_overflow_leaves_state() {
        let mut ledger = RewardLedger::new(DURATION).unwrap();
        let mut p = staked(&mut ledger, u64::MAX, 0);
        let mut other = StakerPosition::default();
        assert_eq!(ledger.deposit(&mut other, 1), Err(FarmError::ArithmeticOverflow));
        assert_eq!(other.balance, 0);
        assert_eq!(ledger.deposit(&mut p, 1), Err(FarmError::ArithmeticOverflow));
        assert_eq!(p.balance, u64::MAX);
    }

    // --- properties ---

    proptest! {
        #[test]
        fn stake_and_withdraw_without_reward_accrue_nothing(
            ops in prop::collection::vec((any::<bool>(), 1u64..1_000_000, 0u64..10_000), 1..40)
        ) {
            let mut ledger = RewardLedger::new(DURATION).unwrap();
            let mut p = StakerPosition::default();
            let mut now = 0;
            for (is_stake, amount, dt) in ops {
                now += dt;
                ledger.checkpoint(&mut p, now).unwrap();
                if is_stake {
                    ledger.deposit(&mut p, amount).unwrap();
                } else if p.balance > 0 {
                    let amt = amount.min(p.balance);
                    ledger.release(&mut p, amt).unwrap();
                }
                prop_assert_eq!(p.accrued_reward, 0);
            }
        }

        #[test]
        fn interval_accrual_matches_stream(
            balances in prop::collection::vec(1u64..1_000_000_000_000, 1..6),
            budget in DURATION..1_000_000 * COIN,
            elapsed in 1u64..=DURATION,
        ) {
            let mut ledger = funded(budget, 0);
            let mut positions: Vec<StakerPosition> =
                balances.iter().map(|b| staked(&mut ledger, *b, 0)).collect();
            let mut total = 0u64;
            for p in positions.iter_mut() {
                ledger.checkpoint(p, elapsed).unwrap();
                total += p.accrued_reward;
            }
            let expected = elapsed * ledger.reward_rate();
            prop_assert!(total <= expected);
            prop_assert!(expected - total <= positions.len() as u64);
        }

        #[test]
        fn reward_per_token_is_monotone(t1 in 0u64..3_000, dt in 0u64..3_000) {
            let mut ledger = funded(1_000 * COIN, 100);
            let _p = staked(&mut ledger, 7 * COIN, 100);
            let a = ledger.reward_per_token(t1).unwrap();
            let b = ledger.reward_per_token(t1 + dt).unwrap();
            prop_assert!(b >= a);
        }
    }
}
