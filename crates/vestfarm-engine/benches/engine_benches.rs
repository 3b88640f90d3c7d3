//! Criterion benchmarks for vestfarm-engine hot paths.
//!
//! Covers: accumulator evaluation, vesting release, and a full stake/claim
//! round trip against in-memory custody.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vestfarm_core::constants::COIN;
use vestfarm_core::custody::MemoryCustody;
use vestfarm_core::types::{AccountId, AssetClass};
use vestfarm_engine::{Farm, FarmConfig, RewardLedger, StakerPosition, VestingSchedule};

const DURATION: u64 = 30 * 86_400;

fn funded_ledger() -> (RewardLedger, StakerPosition) {
    let mut ledger = RewardLedger::new(DURATION).unwrap();
    let mut position = StakerPosition::default();
    ledger.deposit(&mut position, 1_000 * COIN).unwrap();
    ledger.notify(1_000_000 * COIN, 0).unwrap();
    (ledger, position)
}

fn bench_reward_per_token(c: &mut Criterion) {
    let (ledger, _) = funded_ledger();

    c.bench_function("reward_per_token", |b| {
        b.iter(|| ledger.reward_per_token(black_box(DURATION / 2)))
    });
}

fn bench_earned(c: &mut Criterion) {
    let (ledger, position) = funded_ledger();

    c.bench_function("earned", |b| {
        b.iter(|| ledger.earned(black_box(&position), black_box(DURATION / 2)))
    });
}

fn bench_release(c: &mut Criterion) {
    let schedule = VestingSchedule::new(90 * 86_400, 4).unwrap();
    let position = StakerPosition::default();

    c.bench_function("vesting_release", |b| {
        b.iter(|| {
            schedule.release(
                black_box(&position),
                black_box(1_000 * COIN),
                Some(DURATION),
                black_box(DURATION + 40 * 86_400),
            )
        })
    });
}

fn bench_stake_and_claim(c: &mut Criterion) {
    let lp = AssetClass::new("LP");
    let reward = AssetClass::new("REWARD");
    let alice = AccountId::user("alice");
    let mut farm = Farm::new(FarmConfig {
        staked_asset: lp.clone(),
        reward_asset: reward.clone(),
        distributor: AccountId::Factory,
        reward_duration: DURATION,
        vesting_period: 90 * 86_400,
        splits: 4,
    })
    .unwrap();
    let mut custody = MemoryCustody::new();
    custody.mint(&lp, &alice, u64::MAX / 2).unwrap();
    custody.mint(&reward, &farm.account(), 1_000_000 * COIN).unwrap();
    farm.notify_reward(&AccountId::Factory, 1_000_000 * COIN, 0).unwrap();

    c.bench_function("stake_then_claim", |b| {
        b.iter(|| {
            farm.stake(&mut custody, &alice, black_box(COIN), DURATION / 2).unwrap();
            farm.get_reward(&mut custody, &alice, DURATION / 2).unwrap();
            farm.drain_events();
        })
    });
}

criterion_group!(
    benches,
    bench_reward_per_token,
    bench_earned,
    bench_release,
    bench_stake_and_claim,
);
criterion_main!(benches);
