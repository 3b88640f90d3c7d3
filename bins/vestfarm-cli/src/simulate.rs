//! Deterministic scenario runner: deploys a factory from config and replays
//! timed steps against in-memory custody and a manual clock.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};
use vestfarm_core::clock::ManualClock;
use vestfarm_core::custody::MemoryCustody;
use vestfarm_core::error::FarmError;
use vestfarm_core::events::FarmEvent;
use vestfarm_core::traits::Clock;
use vestfarm_core::types::{AccountId, Amount, AssetClass, Timestamp};
use vestfarm_engine::FarmFactory;

use crate::config::{Action, DeploymentConfig, Step};

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub factory: FarmFactory,
    pub balances: Vec<BalanceRow>,
    pub events: Vec<FarmEvent>,
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub at: Timestamp,
    #[serde(flatten)]
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalanceRow {
    pub asset: AssetClass,
    pub account: AccountId,
    pub amount: Amount,
}

/// Factory with every available farm registered, plus custody seeded from
/// `balances` and the configured funding already in the pool.
pub fn deploy(cfg: &DeploymentConfig) -> Result<(FarmFactory, MemoryCustody)> {
    let mut custody = MemoryCustody::new();
    for b in &cfg.balances {
        custody
            .mint(&b.asset, &b.account, b.amount)
            .with_context(|| format!("seeding {} {} for {}", b.amount, b.asset, b.account))?;
    }

    let f = &cfg.factory;
    let mut factory = FarmFactory::new(f.owner.clone(), f.reward_asset.clone(), f.genesis_time);
    for farm in cfg.available_farms() {
        factory
            .register_farm(&f.owner, farm.params())
            .with_context(|| format!("registering farm {}", farm.staking_asset))?;
    }
    if f.funding > 0 {
        factory
            .fund(&mut custody, &f.owner, f.funding)
            .context("funding factory pool")?;
    }
    Ok((factory, custody))
}

/// Run every step in order. A failing step is recorded and the run goes on.
pub fn run(cfg: &DeploymentConfig) -> Result<Report> {
    let (mut factory, mut custody) = deploy(cfg)?;
    let clock = ManualClock::new(cfg.steps.first().map_or(0, |s| s.at));
    let mut events = factory.drain_events();
    let mut steps = Vec::with_capacity(cfg.steps.len());

    for step in &cfg.steps {
        clock.set(step.at);
        let now = clock.now();
        let error = match apply(&mut factory, &mut custody, step, now) {
            Ok(()) => None,
            Err(e) => {
                warn!(at = now, action = ?step.action, error = %e, "simulate: step rejected");
                Some(e.to_string())
            }
        };
        events.extend(factory.drain_events());
        steps.push(StepOutcome {
            at: now,
            action: step.action.clone(),
            error,
        });
    }

    let failed = steps.iter().filter(|s| s.error.is_some()).count();
    info!(steps = steps.len(), failed, "simulate: done");

    let balances = custody
        .balances()
        .map(|(asset, account, amount)| BalanceRow {
            asset: asset.clone(),
            account: account.clone(),
            amount,
        })
        .collect();
    Ok(Report {
        steps,
        factory,
        balances,
        events,
    })
}

fn apply(
    factory: &mut FarmFactory,
    custody: &mut MemoryCustody,
    step: &Step,
    now: Timestamp,
) -> Result<(), FarmError> {
    match &step.action {
        Action::Stake {
            account,
            asset,
            amount,
        } => factory.farm_mut(asset)?.stake(custody, account, *amount, now),
        Action::Withdraw {
            account,
            asset,
            amount,
        } => factory
            .farm_mut(asset)?
            .withdraw(custody, account, *amount, now),
        Action::GetReward { account, asset } => factory
            .farm_mut(asset)?
            .get_reward(custody, account, now)
            .map(|_| ()),
        Action::Exit { account, asset } => factory
            .farm_mut(asset)?
            .exit(custody, account, now)
            .map(|_| ()),
        Action::SetVestingConfig {
            account,
            asset,
            opt_in,
        } => factory.farm_mut(asset)?.set_vesting_config(account, *opt_in),
        Action::DistributeAll => factory.distribute_all(custody, now).map(|_| ()),
        Action::Distribute { asset } => factory.distribute(custody, asset, now).map(|_| ()),
        Action::Fund { from, amount } => factory.fund(custody, from, *amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BalanceEntry, FactoryConfig, FarmEntry};
    use vestfarm_core::traits::AssetCustody;

    fn scenario(steps: Vec<Step>) -> DeploymentConfig {
        DeploymentConfig {
            factory: FactoryConfig {
                owner: AccountId::user("operator"),
                reward_asset: AssetClass::new("REWARD"),
                genesis_time: 100,
                funding: 4_000,
            },
            farms: vec![FarmEntry {
                staking_asset: AssetClass::new("LP-A"),
                reward_amount: 4_000,
                reward_duration: 100,
                vesting_period: 40,
                splits: 4,
                available: true,
            }],
            balances: vec![
                BalanceEntry {
                    account: AccountId::user("operator"),
                    asset: AssetClass::new("REWARD"),
                    amount: 4_000,
                },
                BalanceEntry {
                    account: AccountId::user("alice"),
                    asset: AssetClass::new("LP-A"),
                    amount: 10,
                },
            ],
            steps,
        }
    }

    fn step(at: Timestamp, action: Action) -> Step {
        Step { at, action }
    }

    fn alice() -> AccountId {
        AccountId::user("alice")
    }

    fn lp() -> AssetClass {
        AssetClass::new("LP-A")
    }

    #[test]
    fn deploy_registers_and_funds() {
        let (factory, custody) = deploy(&scenario(vec![])).unwrap();
        assert_eq!(factory.staking_assets().count(), 1);
        assert_eq!(
            custody.balance_of(&AssetClass::new("REWARD"), &AccountId::Factory),
            4_000
        );
    }

    #[test]
    fn deploy_fails_when_owner_cannot_fund() {
        let mut cfg = scenario(vec![]);
        cfg.factory.funding = 5_000;
        assert!(deploy(&cfg).is_err());
    }

    #[test]
    fn full_lifecycle_pays_out() {
        let cfg = scenario(vec![
            step(90, Action::Stake { account: alice(), asset: lp(), amount: 10 }),
            step(100, Action::DistributeAll),
            step(
                200,
                Action::Exit { account: alice(), asset: lp() },
            ),
            step(
                240,
                Action::GetReward { account: alice(), asset: lp() },
            ),
        ]);
        let report = run(&cfg).unwrap();

        assert!(report.steps.iter().all(|s| s.error.is_none()));
        let paid = report
            .balances
            .iter()
            .find(|b| b.account == alice() && b.asset == AssetClass::new("REWARD"))
            .map(|b| b.amount);
        assert_eq!(paid, Some(4_000));
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, FarmEvent::FarmFunded { amount: 4_000, .. })));
    }

    #[test]
    fn rejected_steps_are_recorded_and_run_continues() {
        let cfg = scenario(vec![
            step(50, Action::DistributeAll),
            step(60, Action::Stake { account: alice(), asset: lp(), amount: 11 }),
            step(100, Action::DistributeAll),
        ]);
        let report = run(&cfg).unwrap();

        assert!(report.steps[0].error.as_deref().unwrap().contains("genesis"));
        assert!(report.steps[1].error.is_some());
        assert!(report.steps[2].error.is_none());
    }

    #[test]
    fn report_serializes() {
        let cfg = scenario(vec![step(100, Action::DistributeAll)]);
        let report = run(&cfg).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["action"], "distribute_all");
        assert_eq!(json["events"][0]["event"], "farm_registered");
    }
}
