//! In-memory [`AssetCustody`] implementation.
//!
//! Suitable for tests and the CLI simulator; no persistence.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::CustodyError;
use crate::traits::AssetCustody;
use crate::types::{AccountId, Amount, AssetClass, Transfer};

/// Balances keyed by `(asset, account)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCustody {
    balances: BTreeMap<(AssetClass, AccountId), Amount>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` out of thin air. Setup helper, not an engine path.
    pub fn mint(
        &mut self,
        asset: &AssetClass,
        account: &AccountId,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let entry = self
            .balances
            .entry((asset.clone(), account.clone()))
            .or_default();
        *entry = entry.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    /// Sum of all balances held in `asset`.
    pub fn total_supply(&self, asset: &AssetClass) -> u128 {
        self.balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .map(|(_, v)| *v as u128)
            .sum()
    }

    /// Every non-zero balance, ordered by asset then account.
    pub fn balances(&self) -> impl Iterator<Item = (&AssetClass, &AccountId, Amount)> {
        self.balances
            .iter()
            .filter(|(_, v)| **v > 0)
            .map(|((asset, account), v)| (asset, account, *v))
    }

    fn apply(
        balances: &mut BTreeMap<(AssetClass, AccountId), Amount>,
        t: &Transfer,
    ) -> Result<(), CustodyError> {
        let from_key = (t.asset.clone(), t.from.clone());
        let have = balances.get(&from_key).copied().unwrap_or(0);
        if have < t.amount {
            return Err(CustodyError::InsufficientFunds {
                account: t.from.clone(),
                asset: t.asset.clone(),
                have,
                need: t.amount,
            });
        }
        balances.insert(from_key, have - t.amount);
        let to = balances.entry((t.asset.clone(), t.to.clone())).or_default();
        *to = to.checked_add(t.amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }
}

impl AssetCustody for MemoryCustody {
    fn balance_of(&self, asset: &AssetClass, account: &AccountId) -> Amount {
        self.balances
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), CustodyError> {
        // Stage on a copy so a failure midway leaves balances untouched.
        let mut staged = self.balances.clone();
        for t in transfers {
            Self::apply(&mut staged, t)?;
            trace!(asset = %t.asset, from = %t.from, to = %t.to, amount = t.amount, "custody: transfer staged");
        }
        self.balances = staged;
        Ok(())
    }
}
