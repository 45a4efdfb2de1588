// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AssetFT Host Node
//!
//! Entry point for the `assetft-node` binary. Parses CLI arguments, resolves
//! the config, initializes logging and runs the engine over a sled store.
//!
//! The binary supports five subcommands:
//!
//! - `init`             — create the data directory, store and config file
//! - `apply`            — run a scripted scenario, then the invariant scan
//! - `check-invariants` — run the invariant scan alone
//! - `query`            — read-only queries, printed as JSON
//! - `version`          — print build version information

mod cli;
mod config;
mod logging;
mod scenario;

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use assetft_contracts::{AssetExtension, InProcessRuntime};
use assetft_protocol::config::ENGINE_VERSION;
use assetft_protocol::keeper::invariants::InvariantReport;
use assetft_protocol::storage::SledStore;
use assetft_protocol::{Address, Host};

use cli::{AssetFtNodeCli, Commands, QueryCommand};
use config::NodeConfig;
use scenario::{Scenario, ScenarioReport};

/// Meta key recording which engine version created the store.
const ENGINE_VERSION_META: &str = "engine_version";

fn main() -> Result<()> {
    let cli = AssetFtNodeCli::parse();
    let config = NodeConfig::resolve(&cli)?;
    logging::init_logging(&config.log.level, config.log.format);

    match cli.command {
        Commands::Init(args) => init_node(&config, args.force),
        Commands::Apply(args) => apply_scenario(&config, &args),
        Commands::CheckInvariants => check_invariants(&config),
        Commands::Query(args) => run_query(&config, args.query),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Extension codes the node can instantiate. The reference extension is
/// always code 1.
fn build_runtime() -> Arc<InProcessRuntime> {
    let runtime = InProcessRuntime::new();
    let code_id = runtime.store_code(Arc::new(AssetExtension));
    tracing::debug!(code_id, "reference extension registered");
    Arc::new(runtime)
}

/// Opens an initialized store and wraps it in a host.
fn open_host(config: &NodeConfig) -> Result<Host<SledStore>> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!(
            "no store at {}; run `assetft-node init` first",
            db_path.display()
        );
    }
    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;

    match store.get_meta(ENGINE_VERSION_META)? {
        Some(version) => tracing::info!(
            path = %db_path.display(),
            created_by = %String::from_utf8_lossy(&version),
            "store opened"
        ),
        None => bail!(
            "{} is not an initialized store; run `assetft-node init` first",
            db_path.display()
        ),
    }

    Ok(Host::with_kv_ledger(
        store,
        build_runtime(),
        config.params.clone(),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

/// Creates the data directory, writes the config and stamps the store.
fn init_node(config: &NodeConfig, force: bool) -> Result<()> {
    let data_dir = &config.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = config.config_path();
    if config_path.exists() && !force {
        tracing::info!(path = %config_path.display(), "keeping existing config file");
    } else {
        fs::write(&config_path, config.to_toml()?)
            .with_context(|| format!("failed to write config to {}", config_path.display()))?;
        tracing::info!(path = %config_path.display(), "config file written");
    }

    let db_path = config.db_path();
    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to create store at {}", db_path.display()))?;
    store.set_meta(ENGINE_VERSION_META, ENGINE_VERSION.as_bytes())?;
    store.flush()?;

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", config_path.display());
    println!("  Store          : {}", db_path.display());
    Ok(())
}

fn apply_scenario(config: &NodeConfig, args: &cli::ApplyArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let mut host = open_host(config)?;

    tracing::info!(
        name = %scenario.name,
        steps = scenario.steps.len(),
        "applying scenario"
    );
    let report = scenario.apply(&mut host, args.keep_going);
    let invariants = host.query(|ctx, keeper| keeper.check_invariants(ctx))?;
    host.store().flush()?;

    #[derive(Serialize)]
    struct ApplyOutput<'a> {
        scenario: &'a ScenarioReport,
        invariants: &'a InvariantReport,
    }
    print_json(&ApplyOutput {
        scenario: &report,
        invariants: &invariants,
    })?;

    let mismatches = report.mismatches();
    if mismatches > 0 {
        bail!("{mismatches} step(s) did not match their expected outcome");
    }
    if !invariants.is_ok() {
        bail!("{} invariant(s) broken", invariants.broken.len());
    }
    Ok(())
}

fn check_invariants(config: &NodeConfig) -> Result<()> {
    let mut host = open_host(config)?;
    let report = host.query(|ctx, keeper| keeper.check_invariants(ctx))?;
    print_json(&report)?;
    if !report.is_ok() {
        bail!("{} invariant(s) broken", report.broken.len());
    }
    Ok(())
}

fn run_query(config: &NodeConfig, query: QueryCommand) -> Result<()> {
    let mut host = open_host(config)?;
    match query {
        QueryCommand::Token { denom } => {
            let view = host.query(|ctx, keeper| keeper.token_view(ctx, &denom))?;
            print_json(&view)
        }
        QueryCommand::Issuer {
            issuer,
            offset,
            limit,
        } => {
            let issuer = Address::new(issuer);
            let page =
                host.query(|ctx, keeper| keeper.tokens_by_issuer(ctx, &issuer, offset, limit))?;
            print_json(&page)
        }
        QueryCommand::Balance { account, denom } => {
            let account = Address::new(account);
            let summary =
                host.query(|ctx, keeper| keeper.balance_summary(ctx, &account, &denom))?;
            print_json(&summary)
        }
        QueryCommand::FeatureBalances {
            kind,
            offset,
            limit,
        } => {
            let page = host
                .query(|ctx, keeper| keeper.feature_balances_page(ctx, kind.into(), offset, limit))?;
            print_json(&page)
        }
        QueryCommand::Params => print_json(host.keeper().params()),
    }
}

fn print_version() {
    println!("assetft-node {}", env!("CARGO_PKG_VERSION"));
    println!("engine       {}", ENGINE_VERSION);
}
