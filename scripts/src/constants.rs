//! Constants used in the deploy scripts

/// The default RPC URL, a local Hardhat or Anvil node
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default directory containing the Hardhat compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The extension of a Hardhat compilation artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The suffix Hardhat appends to the directory of each compiled source file
pub const SOLIDITY_SOURCE_DIR_SUFFIX: &str = ".sol";

/// The artifact name of the TransparentUpgradeableProxy contract
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/transparent/TransparentUpgradeableProxy.sol
pub const PROXY_ARTIFACT_NAME: &str = "TransparentUpgradeableProxy";

/// The directory npm installs packages into
pub const NODE_MODULES_DIR: &str = "node_modules";

/// The OpenZeppelin v5 proxy artifact shipped with `@openzeppelin/hardhat-upgrades`,
/// relative to a `node_modules` directory
pub const HARDHAT_UPGRADES_PROXY_ARTIFACT: &str = "@openzeppelin/upgrades-core/artifacts/@openzeppelin/contracts-v5/proxy/transparent/TransparentUpgradeableProxy.sol/TransparentUpgradeableProxy.json";

/// The name of the initializer invoked through the proxy on deployment
pub const INITIALIZER_METHOD: &str = "initialize";

/// The name of the method binding the fee distributor into a marketplace
pub const SET_FEE_DISTRIBUTOR_METHOD: &str = "setFeeDistributor";

/// The default number of confirmations to wait for each transaction
pub const DEFAULT_NUM_CONFIRMATIONS: u64 = 1;

/// The default number of seconds to wait for a transaction to confirm
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The default recipient of the platform fee
pub const DEFAULT_FEE_RECIPIENT: &str = "0x0d3C3d95dF3c9e71d39fd00Eb842026713ad64fE";

/// The default wrapped native token (WETH) address
pub const DEFAULT_WETH: &str = "0xA99cf32e9aAa700f9E881BA9BF2C57A211ae94df";

/// The default platform fee, in basis points
pub const DEFAULT_PLATFORM_FEE_BPS: u64 = 250;

/// The default share of the fee routed through the royalties registry, in basis points
pub const DEFAULT_ROYALTY_SHARE_BPS: u64 = 5000;

/// The number of basis points making up 100%
pub const MAX_BPS: u64 = 10_000;

/// The ERC721 marketplace key in the deployments file
pub const ERC721_MARKETPLACE_KEY: &str = "erc721_marketplace";

/// The ERC1155 marketplace key in the deployments file
pub const ERC1155_MARKETPLACE_KEY: &str = "erc1155_marketplace";

/// The royalties registry key in the deployments file
pub const ROYALTIES_REGISTRY_KEY: &str = "royalties_registry";

/// The fee distributor key in the deployments file
pub const FEE_DISTRIBUTOR_KEY: &str = "fee_distributor";
