//! Definitions of CLI arguments and commands for deploy scripts

use std::{path::PathBuf, time::Duration};

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};

use crate::{
    artifacts::ArtifactStore,
    backend::evm::ConfirmationPolicy,
    commands::{deploy, print_plan, upgrade},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_DEPLOYMENTS_PATH,
        DEFAULT_FEE_RECIPIENT, DEFAULT_NUM_CONFIRMATIONS, DEFAULT_PLATFORM_FEE_BPS,
        DEFAULT_ROYALTY_SHARE_BPS, DEFAULT_RPC_URL, DEFAULT_WETH,
    },
    errors::ScriptError,
    plan::MarketplaceConfig,
    types::ContractKind,
};

/// Deploy and manage the upgradeable NFT marketplace contracts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The commands supported by the scripts
#[derive(Subcommand)]
pub enum Command {
    /// Deploy both marketplaces, the royalties registry and the fee
    /// distributor, and bind the fee distributor into the marketplaces
    Deploy(DeployArgs),
    /// Validate the deployment plan and print it, without connecting to a node
    Plan(PlanArgs),
    /// Upgrade a deployed proxy to a new implementation
    Upgrade(UpgradeArgs),
}

impl Command {
    /// Run the command
    pub async fn run(self) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args).await,
            Command::Plan(args) => print_plan(args),
            Command::Upgrade(args) => upgrade(args).await,
        }
    }
}

/// Arguments for connecting to a node and locating artifacts & deployments
#[derive(Args)]
pub struct ChainArgs {
    /// Private key of the deployer
    #[arg(short, long, env = "PKEY")]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Directory containing the Hardhat compilation artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Path to the deployments file
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: PathBuf,

    /// Path to a TransparentUpgradeableProxy artifact. If unset, the proxy is
    /// looked up in the artifacts directory, then in the copy shipped with
    /// `@openzeppelin/hardhat-upgrades` under `node_modules`
    #[arg(long)]
    pub proxy_artifact: Option<PathBuf>,

    /// Number of blocks each transaction must be confirmed by
    #[arg(
        long,
        default_value_t = DEFAULT_NUM_CONFIRMATIONS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub confirmations: u64,

    /// Seconds to wait for each transaction to confirm
    #[arg(long, default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS)]
    pub confirmation_timeout_secs: u64,
}

impl ChainArgs {
    /// Open the artifacts directory, with the proxy override if one was given
    pub fn artifact_store(&self) -> Result<ArtifactStore, ScriptError> {
        let store = ArtifactStore::open(&self.artifacts_dir)?;
        Ok(store.with_proxy_artifact(self.proxy_artifact.clone()))
    }

    /// The confirmation policy requested on the command line
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            confirmations: self.confirmations,
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
        }
    }
}

/// The literal inputs to the marketplace deployment
#[derive(Args)]
pub struct MarketplaceArgs {
    /// Recipient of the platform fee
    #[arg(long, default_value = DEFAULT_FEE_RECIPIENT)]
    pub fee_recipient: Address,

    /// Wrapped native token (WETH) accepted by the marketplaces
    #[arg(long, default_value = DEFAULT_WETH)]
    pub weth: Address,

    /// Platform fee, in basis points
    #[arg(long, default_value_t = DEFAULT_PLATFORM_FEE_BPS)]
    pub platform_fee_bps: u64,

    /// Share of fees routed through the royalties registry, in basis points
    #[arg(long, default_value_t = DEFAULT_ROYALTY_SHARE_BPS)]
    pub royalty_share_bps: u64,

    /// Upgrade authority the marketplaces are initialized with.
    /// The zero address is passed if unset
    #[arg(long)]
    pub upgrade_authority: Option<Address>,
}

impl From<MarketplaceArgs> for MarketplaceConfig {
    fn from(args: MarketplaceArgs) -> Self {
        MarketplaceConfig {
            fee_recipient: args.fee_recipient,
            weth: args.weth,
            platform_fee_bps: args.platform_fee_bps,
            royalty_share_bps: args.royalty_share_bps,
            upgrade_authority: args.upgrade_authority,
        }
    }
}

/// Arguments for the marketplace deployment
#[derive(Args)]
pub struct DeployArgs {
    /// Connection arguments
    #[command(flatten)]
    pub chain: ChainArgs,

    /// The literal inputs to the plan
    #[command(flatten)]
    pub marketplace: MarketplaceArgs,
}

/// Arguments for printing the deployment plan
#[derive(Args)]
pub struct PlanArgs {
    /// The literal inputs to the plan
    #[command(flatten)]
    pub marketplace: MarketplaceArgs,
}

/// Upgrade a proxy recorded in the deployments file.
///
/// Deploys a new implementation of the contract and points the proxy at it
/// through its `ProxyAdmin`, which must be owned by the deployer.
#[derive(Args)]
pub struct UpgradeArgs {
    /// Connection arguments
    #[command(flatten)]
    pub chain: ChainArgs,

    /// The contract to deploy a new implementation of
    #[arg(short, long)]
    pub contract: ContractKind,

    /// The name the proxy is recorded under in the deployments file,
    /// defaults to the contract's default name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Optional calldata, in hex form, with which to
    /// call the implementation contract when upgrading
    #[arg(long)]
    pub calldata: Option<String>,
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, Address};
    use clap::Parser;

    use super::{Cli, Command};
    use crate::{plan::MarketplaceConfig, types::ContractKind};

    #[test]
    fn test_plan_defaults() {
        let cli = Cli::try_parse_from(["marketplace-deploy", "plan"]).unwrap();
        let Command::Plan(args) = cli.command else {
            panic!("expected the plan command");
        };

        let config = MarketplaceConfig::from(args.marketplace);
        assert_eq!(
            config.fee_recipient,
            address!("0d3C3d95dF3c9e71d39fd00Eb842026713ad64fE")
        );
        assert_eq!(config.weth, address!("A99cf32e9aAa700f9E881BA9BF2C57A211ae94df"));
        assert_eq!(config.platform_fee_bps, 250);
        assert_eq!(config.royalty_share_bps, 5000);
        assert_eq!(config.upgrade_authority_or_zero(), Address::ZERO);
    }

    #[test]
    fn test_deploy_args() {
        let cli = Cli::try_parse_from([
            "marketplace-deploy",
            "deploy",
            "--priv-key",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "--confirmations",
            "3",
            "--upgrade-authority",
            "0x1111111111111111111111111111111111111111",
        ])
        .unwrap();
        let Command::Deploy(args) = cli.command else {
            panic!("expected the deploy command");
        };

        assert_eq!(args.chain.confirmation_policy().confirmations, 3);
        assert_eq!(
            args.marketplace.upgrade_authority,
            Some(address!("1111111111111111111111111111111111111111"))
        );
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        let res = Cli::try_parse_from([
            "marketplace-deploy",
            "deploy",
            "--priv-key",
            "0x01",
            "--confirmations",
            "0",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_upgrade_args() {
        let cli = Cli::try_parse_from([
            "marketplace-deploy",
            "upgrade",
            "--priv-key",
            "0x01",
            "--contract",
            "fee-distributor",
        ])
        .unwrap();
        let Command::Upgrade(args) = cli.command else {
            panic!("expected the upgrade command");
        };

        assert_eq!(args.contract, ContractKind::FeeDistributor);
        assert!(args.name.is_none());
    }
}
