//! Farm factory: registers one farm per staked asset and funds them all in a
//! single batch once genesis has passed.
//!
//! The factory owns an arena of farms in registration order plus, per staked
//! asset, the reward amount still waiting to be distributed. Funding is
//! all-or-nothing: every pending farm is funded, or none is.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};
use vestfarm_core::error::FarmError;
use vestfarm_core::events::FarmEvent;
use vestfarm_core::traits::AssetCustody;
use vestfarm_core::types::{AccountId, Amount, AssetClass, Timestamp, Transfer};

use crate::farm::{Farm, FarmConfig};
use crate::ledger::RewardAdded;

/// Arguments to [`FarmFactory::register_farm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmParams {
    pub staked_asset: AssetClass,
    pub reward_amount: Amount,
    pub reward_duration: u64,
    pub vesting_period: u64,
    pub splits: u32,
}

/// Registration record of one farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmInfo {
    /// Position of the farm in the arena (registration order).
    pub index: usize,
    /// Reward still to be distributed; zero once funded.
    pub reward_amount: Amount,
    pub reward_duration: u64,
    pub vesting_period: u64,
    pub splits: u32,
}

/// One farm funded by a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Funding {
    pub farm: AssetClass,
    pub amount: Amount,
    pub reward: RewardAdded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmFactory {
    owner: AccountId,
    reward_asset: AssetClass,
    genesis_time: Timestamp,
    farms: Vec<Farm>,
    infos: BTreeMap<AssetClass, FarmInfo>,
    #[serde(skip)]
    events: Vec<FarmEvent>,
}

impl FarmFactory {
    pub fn new(owner: AccountId, reward_asset: AssetClass, genesis_time: Timestamp) -> Self {
        Self {
            owner,
            reward_asset,
            genesis_time,
            farms: Vec::new(),
            infos: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn reward_asset(&self) -> &AssetClass {
        &self.reward_asset
    }

    pub fn genesis_time(&self) -> Timestamp {
        self.genesis_time
    }

    /// Staked assets in registration order.
    pub fn staking_assets(&self) -> impl Iterator<Item = &AssetClass> {
        self.farms.iter().map(Farm::staked_asset)
    }

    pub fn farms(&self) -> impl Iterator<Item = &Farm> {
        self.farms.iter()
    }

    pub fn farm_info(&self, asset: &AssetClass) -> Option<&FarmInfo> {
        self.infos.get(asset)
    }

    pub fn farm(&self, asset: &AssetClass) -> Result<&Farm, FarmError> {
        let info = self
            .infos
            .get(asset)
            .ok_or_else(|| FarmError::UnknownFarm(asset.clone()))?;
        Ok(&self.farms[info.index])
    }

    pub fn farm_mut(&mut self, asset: &AssetClass) -> Result<&mut Farm, FarmError> {
        let info = self
            .infos
            .get(asset)
            .ok_or_else(|| FarmError::UnknownFarm(asset.clone()))?;
        Ok(&mut self.farms[info.index])
    }

    /// Sum of all undistributed reward amounts.
    pub fn pending_total(&self) -> Result<Amount, FarmError> {
        self.infos.values().try_fold(0u64, |acc, info| {
            acc.checked_add(info.reward_amount)
                .ok_or(FarmError::ArithmeticOverflow)
        })
    }

    /// Take all buffered factory and farm events.
    pub fn drain_events(&mut self) -> Vec<FarmEvent> {
        let mut events = std::mem::take(&mut self.events);
        for farm in &mut self.farms {
            events.extend(farm.drain_events());
        }
        events
    }

    /// Create a farm for `params.staked_asset` with this factory as its
    /// distributor. Returns the farm's arena index.
    ///
    /// # Errors
    ///
    /// - [`FarmError::Unauthorized`] if `caller` is not the owner
    /// - [`FarmError::AlreadyRegistered`] if the asset already has a farm
    /// - [`FarmError::InvalidAmount`] if the duration or splits are zero
    pub fn register_farm(&mut self, caller: &AccountId, params: FarmParams) -> Result<usize, FarmError> {
        if *caller != self.owner {
            return Err(FarmError::Unauthorized(caller.clone()));
        }
        if self.infos.contains_key(&params.staked_asset) {
            return Err(FarmError::AlreadyRegistered(params.staked_asset));
        }
        let farm = Farm::new(FarmConfig {
            staked_asset: params.staked_asset.clone(),
            reward_asset: self.reward_asset.clone(),
            distributor: AccountId::Factory,
            reward_duration: params.reward_duration,
            vesting_period: params.vesting_period,
            splits: params.splits,
        })?;

        let index = self.farms.len();
        self.farms.push(farm);
        self.infos.insert(
            params.staked_asset.clone(),
            FarmInfo {
                index,
                reward_amount: params.reward_amount,
                reward_duration: params.reward_duration,
                vesting_period: params.vesting_period,
                splits: params.splits,
            },
        );
        info!(
            farm = %params.staked_asset,
            index,
            reward_amount = params.reward_amount,
            "factory: farm registered"
        );
        self.events.push(FarmEvent::FarmRegistered {
            farm: params.staked_asset,
            reward_amount: params.reward_amount,
            reward_duration: params.reward_duration,
            vesting_period: params.vesting_period,
            splits: params.splits,
        });
        Ok(index)
    }

    /// Move `amount` of the reward asset from `from` into the factory pool.
    pub fn fund(
        &mut self,
        custody: &mut impl AssetCustody,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), FarmError> {
        if amount == 0 {
            return Err(FarmError::InvalidAmount("funding amount must be positive"));
        }
        custody.transfer(&Transfer::new(&self.reward_asset, from, &AccountId::Factory, amount))?;
        info!(%from, amount, "factory: pool funded");
        Ok(())
    }

    /// Fund every farm with a pending reward amount and start its reward
    /// period. Permissionless. A repeat call finds nothing pending and does
    /// nothing.
    ///
    /// # Errors
    ///
    /// - [`FarmError::NoFarmsRegistered`] before the first registration
    /// - [`FarmError::TooEarly`] if `now` is before genesis
    /// - [`FarmError::InsufficientFunding`] if the pool cannot cover every
    ///   pending amount
    pub fn distribute_all(
        &mut self,
        custody: &mut impl AssetCustody,
        now: Timestamp,
    ) -> Result<Vec<Funding>, FarmError> {
        if self.farms.is_empty() {
            return Err(FarmError::NoFarmsRegistered);
        }
        self.check_genesis(now)?;
        let pending: Vec<AssetClass> = self
            .staking_assets()
            .filter(|asset| self.infos[*asset].reward_amount > 0)
            .cloned()
            .collect();
        self.fund_farms(custody, &pending, now)
    }

    /// Fund a single farm. Same rules as [`distribute_all`](Self::distribute_all).
    ///
    /// # Errors
    ///
    /// - [`FarmError::UnknownFarm`] if `asset` has no farm
    pub fn distribute(
        &mut self,
        custody: &mut impl AssetCustody,
        asset: &AssetClass,
        now: Timestamp,
    ) -> Result<Vec<Funding>, FarmError> {
        if self.farms.is_empty() {
            return Err(FarmError::NoFarmsRegistered);
        }
        let info = self
            .infos
            .get(asset)
            .ok_or_else(|| FarmError::UnknownFarm(asset.clone()))?;
        self.check_genesis(now)?;
        let pending = if info.reward_amount > 0 {
            vec![asset.clone()]
        } else {
            Vec::new()
        };
        self.fund_farms(custody, &pending, now)
    }

    fn check_genesis(&self, now: Timestamp) -> Result<(), FarmError> {
        if now < self.genesis_time {
            return Err(FarmError::TooEarly {
                now,
                genesis: self.genesis_time,
            });
        }
        Ok(())
    }

    fn fund_farms(
        &mut self,
        custody: &mut impl AssetCustody,
        assets: &[AssetClass],
        now: Timestamp,
    ) -> Result<Vec<Funding>, FarmError> {
        if assets.is_empty() {
            debug!("factory: nothing pending");
            return Ok(Vec::new());
        }

        let mut need: Amount = 0;
        for asset in assets {
            need = need
                .checked_add(self.infos[asset].reward_amount)
                .ok_or(FarmError::ArithmeticOverflow)?;
        }
        let have = custody.balance_of(&self.reward_asset, &AccountId::Factory);
        if have < need {
            return Err(FarmError::InsufficientFunding { have, need });
        }

        // Start every reward period on a copy first; any failure aborts the
        // whole batch before custody is touched.
        let mut staged = Vec::with_capacity(assets.len());
        let mut transfers = Vec::with_capacity(assets.len());
        for asset in assets {
            let info = &self.infos[asset];
            let mut farm = self.farms[info.index].clone();
            let reward = farm.notify_reward(&AccountId::Factory, info.reward_amount, now)?;
            transfers.push(Transfer::new(
                &self.reward_asset,
                &AccountId::Factory,
                &farm.account(),
                info.reward_amount,
            ));
            staged.push((info.index, info.reward_amount, farm, reward));
        }
        custody.transfer_batch(&transfers)?;

        let mut funded = Vec::with_capacity(staged.len());
        for (index, amount, mut farm, reward) in staged {
            let asset = farm.staked_asset().clone();
            if let Some(info) = self.infos.get_mut(&asset) {
                info.reward_amount = 0;
            }
            self.events.extend(farm.drain_events());
            self.events.push(FarmEvent::FarmFunded {
                farm: asset.clone(),
                amount,
            });
            self.farms[index] = farm;
            info!(farm = %asset, amount, rate = reward.rate, end = reward.period.end, "factory: farm funded");
            funded.push(Funding {
                farm: asset,
                amount,
                reward,
            });
        }
        Ok(funded)
    }
}
