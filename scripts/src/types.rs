//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use alloy_primitives::Address;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ERC1155_MARKETPLACE_KEY, ERC721_MARKETPLACE_KEY, FEE_DISTRIBUTOR_KEY, ROYALTIES_REGISTRY_KEY,
};

/// The upgradeable contracts the scripts know how to deploy
#[derive(ValueEnum, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ContractKind {
    /// The primary (ERC721) marketplace
    Erc721Marketplace,
    /// The secondary (ERC1155) marketplace
    Erc1155Marketplace,
    /// The royalties registry
    RoyaltiesRegistry,
    /// The fee distributor, splitting fees between the platform and royalty holders
    FeeDistributor,
}

impl ContractKind {
    /// The name of the Hardhat artifact holding this contract's ABI and bytecode
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractKind::Erc721Marketplace => "ERC721NFTMarketplaceV2",
            ContractKind::Erc1155Marketplace => "ERC1155NFTMarketplace",
            ContractKind::RoyaltiesRegistry => "RoyaltiesRegistry",
            ContractKind::FeeDistributor => "FeeDistributor",
        }
    }

    /// The key under which the contract is recorded by default
    pub fn default_key(&self) -> &'static str {
        match self {
            ContractKind::Erc721Marketplace => ERC721_MARKETPLACE_KEY,
            ContractKind::Erc1155Marketplace => ERC1155_MARKETPLACE_KEY,
            ContractKind::RoyaltiesRegistry => ROYALTIES_REGISTRY_KEY,
            ContractKind::FeeDistributor => FEE_DISTRIBUTOR_KEY,
        }
    }
}

impl Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Erc721Marketplace => write!(f, "erc721-marketplace"),
            ContractKind::Erc1155Marketplace => write!(f, "erc1155-marketplace"),
            ContractKind::RoyaltiesRegistry => write!(f, "royalties-registry"),
            ContractKind::FeeDistributor => write!(f, "fee-distributor"),
        }
    }
}

/// A confirmed upgradeable deployment
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    /// The kind of contract behind the proxy
    pub kind: ContractKind,
    /// The proxy address, through which the contract is used
    pub proxy: Address,
    /// The address of the implementation the proxy delegates to
    pub implementation: Address,
    /// The address of the `ProxyAdmin` authorized to upgrade the proxy
    pub proxy_admin: Address,
}
