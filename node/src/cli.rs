//! # CLI Interface
//!
//! Defines the command-line argument structure for `assetft-node` using
//! `clap` derive. Global flags override the TOML config; every flag also
//! has an `ASSETFT_*` environment fallback.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use assetft_protocol::storage::FeatureKind;

use crate::logging::LogFormat;

/// AssetFT host node.
///
/// Runs the fungible-token engine over a local sled store: applies scripted
/// scenarios, checks module invariants and answers read-only queries.
#[derive(Parser, Debug)]
#[command(
    name = "assetft-node",
    about = "AssetFT host node",
    version,
    propagate_version = true
)]
pub struct AssetFtNodeCli {
    /// Path to the node configuration file (TOML).
    ///
    /// When omitted, the node looks for `assetft.toml` in the data directory.
    #[arg(long, short = 'c', env = "ASSETFT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the store and the default config file.
    #[arg(long, short = 'd', env = "ASSETFT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log filter directives, e.g. `info` or `assetft_protocol=debug`.
    #[arg(long, env = "ASSETFT_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, env = "ASSETFT_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, the store and a default config file.
    Init(InitArgs),
    /// Apply a scripted scenario (TOML) against the store.
    Apply(ApplyArgs),
    /// Scan the store and report broken invariants.
    CheckInvariants,
    /// Read-only queries.
    Query(QueryArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `apply` subcommand.
#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Scenario file.
    pub scenario: PathBuf,

    /// Keep going after a step whose outcome differs from its expectation.
    #[arg(long)]
    pub keep_going: bool,
}

/// Arguments for the `query` subcommand.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    #[command(subcommand)]
    pub query: QueryCommand,
}

/// Individual queries. Results are printed as JSON.
#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Definition, metadata, freeze flag and DEX settings of a denom.
    Token { denom: String },
    /// Tokens issued by an address.
    Issuer {
        issuer: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Every tracked balance of an account in one denom.
    Balance { account: String, denom: String },
    /// One page of a feature ledger.
    FeatureBalances {
        #[arg(value_enum)]
        kind: FeatureKindArg,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Module parameters in effect.
    Params,
}

/// CLI spelling of the feature ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeatureKindArg {
    Frozen,
    Whitelisted,
    DexLocked,
    DexExpectedToReceive,
}

impl From<FeatureKindArg> for FeatureKind {
    fn from(arg: FeatureKindArg) -> Self {
        match arg {
            FeatureKindArg::Frozen => FeatureKind::Frozen,
            FeatureKindArg::Whitelisted => FeatureKind::Whitelisted,
            FeatureKindArg::DexLocked => FeatureKind::DexLocked,
            FeatureKindArg::DexExpectedToReceive => FeatureKind::DexExpectedToReceive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        AssetFtNodeCli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = AssetFtNodeCli::try_parse_from([
            "assetft-node",
            "check-invariants",
            "--data-dir",
            "/tmp/x",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::CheckInvariants));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn feature_balance_query_parses_kind() {
        let cli = AssetFtNodeCli::try_parse_from([
            "assetft-node",
            "query",
            "feature-balances",
            "dex-locked",
            "--limit",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(QueryArgs {
                query: QueryCommand::FeatureBalances { kind, offset, limit },
            }) => {
                assert_eq!(FeatureKind::from(kind), FeatureKind::DexLocked);
                assert_eq!((offset, limit), (0, 10));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn apply_requires_a_scenario() {
        assert!(AssetFtNodeCli::try_parse_from(["assetft-node", "apply"]).is_err());
    }
}
