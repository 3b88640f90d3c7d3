//! vestfarm-cli: operator tooling for Vestfarm deployments.
//!
//! Plans a factory deployment from a config file, replays timed scenarios
//! against in-memory custody, and previews a staker's vesting schedule.

mod config;
mod simulate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use vestfarm_core::clock::SystemClock;
use vestfarm_core::traits::Clock;
use vestfarm_core::types::{AccountId, Amount, AssetClass, Timestamp};
use vestfarm_engine::{FarmFactory, FarmInfo, StakerPosition, VestingSchedule};

use crate::config::DeploymentConfig;

/// Vestfarm operator CLI.
#[derive(Parser, Debug)]
#[command(name = "vestfarm-cli", version, about = "Staking reward farms with split vesting")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register every available farm and print the resulting farm infos.
    Plan(ConfigArgs),
    /// Replay the configured steps and print a JSON report.
    Simulate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Pretty-print the report.
        #[arg(long)]
        pretty: bool,
    },
    /// Print the unlock table for one staker.
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Deployment file (default: $CONFIG_DIR/vestfarm/deployment.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<DeploymentConfig> {
        let path = self.config.clone().unwrap_or_else(DeploymentConfig::default_path);
        info!(path = %path.display(), "loading deployment config");
        DeploymentConfig::load(&path)
    }
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Total reward earned by the staker, in base units.
    #[arg(long)]
    earned: Amount,

    /// End of the reward period.
    #[arg(long)]
    period_end: Timestamp,

    #[arg(long, default_value_t = vestfarm_core::constants::DEFAULT_VESTING_PERIOD)]
    vesting_period: u64,

    #[arg(long, default_value_t = vestfarm_core::constants::DEFAULT_SPLITS)]
    splits: u32,

    /// Staker opted out of the gradual schedule.
    #[arg(long)]
    opt_out: bool,

    /// Evaluate claimable reward at this time (default: now).
    #[arg(long)]
    now: Option<Timestamp>,
}

#[derive(Serialize)]
struct Plan<'a> {
    farms: Vec<PlannedFarm<'a>>,
    pending_total: Amount,
}

#[derive(Serialize)]
struct PlannedFarm<'a> {
    staking_asset: &'a AssetClass,
    account: AccountId,
    #[serde(flatten)]
    info: &'a FarmInfo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Plan(args) => plan(&args),
        Commands::Simulate { config, pretty } => simulate(&config, pretty),
        Commands::Schedule(args) => schedule(&args, &SystemClock),
    }
}

fn plan(args: &ConfigArgs) -> Result<()> {
    let cfg = args.load()?;
    let (factory, _) = simulate::deploy(&cfg)?;

    let skipped = cfg.farms.len() - cfg.available_farms().count();
    if skipped > 0 {
        info!(skipped, "unavailable farms left out");
    }
    let plan = build_plan(&factory)?;
    info!(farms = plan.farms.len(), pending_total = plan.pending_total, "plan: farms registered");
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn build_plan(factory: &FarmFactory) -> Result<Plan<'_>> {
    let farms = factory
        .farms()
        .filter_map(|farm| {
            let asset = farm.staked_asset();
            factory.farm_info(asset).map(|info| PlannedFarm {
                staking_asset: asset,
                account: farm.account(),
                info,
            })
        })
        .collect();
    Ok(Plan {
        farms,
        pending_total: factory.pending_total()?,
    })
}

fn simulate(args: &ConfigArgs, pretty: bool) -> Result<()> {
    let cfg = args.load()?;
    let report = simulate::run(&cfg)?;
    let out = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to encode report")?;
    println!("{out}");
    Ok(())
}

fn schedule(args: &ScheduleArgs, clock: &impl Clock) -> Result<()> {
    let schedule = VestingSchedule::new(args.vesting_period, args.splits)?;
    let mut position = StakerPosition::default();
    position.election.set(!args.opt_out)?;
    let now = args.now.unwrap_or_else(|| clock.now());

    println!("{:>12}  {:>6}  {:>20}  {:>8}", "time", "split", "unlocked", "reached");
    for (at, split) in schedule.unlock_times(args.period_end) {
        println!(
            "{:>12}  {:>6}  {:>20}  {:>8}",
            at,
            split,
            schedule.unlocked(args.earned, split),
            if at <= now { "yes" } else { "no" }
        );
    }

    let claimable = schedule.release(&position, args.earned, Some(args.period_end), now);
    println!("\nA first claim at {now} pays {} and burns {}.", claimable.payout, claimable.forfeited);

    let deferred_at = schedule.fully_vested_at(args.period_end);
    let release = schedule.release(&position, args.earned, Some(args.period_end), deferred_at);
    if release.penalized {
        println!(
            "\nFirst claim at or after {deferred_at} pays {} and burns {}.",
            release.payout, release.forfeited
        );
    }
    Ok(())
}

/// Initialize tracing with the given level and output format.
///
/// Logs go to stderr so report output on stdout stays machine-readable.
/// `RUST_LOG` takes precedence over `level_str`.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn schedule_args_parse_with_defaults() {
        let cli = Cli::try_parse_from([
            "vestfarm-cli",
            "schedule",
            "--earned",
            "1000",
            "--period-end",
            "50",
            "--opt-out",
        ])
        .unwrap();
        let Commands::Schedule(args) = cli.command else {
            panic!("expected schedule");
        };
        assert_eq!(args.earned, 1000);
        assert_eq!(args.splits, vestfarm_core::constants::DEFAULT_SPLITS);
        assert!(args.opt_out);
        assert_eq!(args.now, None);
    }

    #[test]
    fn schedule_reads_the_clock_when_now_is_omitted() {
        let args = ScheduleArgs {
            earned: 1_000,
            period_end: 50,
            vesting_period: 40,
            splits: 4,
            opt_out: false,
            now: None,
        };
        schedule(&args, &vestfarm_core::clock::ManualClock::new(70)).unwrap();
        assert!(schedule(&ScheduleArgs { splits: 0, ..args }, &SystemClock).is_err());
    }

    #[test]
    fn plan_is_a_single_json_document() {
        let mut factory = FarmFactory::new(AccountId::user("operator"), AssetClass::new("REWARD"), 100);
        for (asset, reward) in [("LP-A", 300), ("LP-B", 700)] {
            factory
                .register_farm(
                    &AccountId::user("operator"),
                    vestfarm_engine::FarmParams {
                        staked_asset: AssetClass::new(asset),
                        reward_amount: reward,
                        reward_duration: 100,
                        vesting_period: 40,
                        splits: 4,
                    },
                )
                .unwrap();
        }
        let out = serde_json::to_string_pretty(&build_plan(&factory).unwrap()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["pending_total"], 1_000);
        assert_eq!(json["farms"][0]["staking_asset"], "LP-A");
        assert_eq!(json["farms"][0]["account"], "farm:LP-A");
        assert_eq!(json["farms"][1]["reward_amount"], 700);
    }

    #[test]
    fn simulate_accepts_config_and_pretty() {
        let cli = Cli::try_parse_from(["vestfarm-cli", "--log-level", "debug", "simulate", "-c", "x.toml", "--pretty"])
            .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Commands::Simulate { config, pretty } = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(config.config, Some(PathBuf::from("x.toml")));
        assert!(pretty);
    }
}
