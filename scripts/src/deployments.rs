//! Reading and writing the deployments file, which records the contracts
//! deployed by past runs

use std::{collections::BTreeMap, fs, path::Path};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{errors::ScriptError, orchestrator::AddressBook, types::DeployedContract};

/// The contents of a deployments file
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Deployments {
    /// The chain the contracts were last deployed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// The account that last deployed contracts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<Address>,
    /// The deployed contracts, by entity name
    #[serde(default)]
    pub deployments: BTreeMap<String, DeployedContract>,
}

impl Deployments {
    /// Read the deployments file at `path`, or an empty record if there is none
    pub fn read(path: &Path) -> Result<Self, ScriptError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
    }

    /// Write the deployments to `path`, replacing its contents
    pub fn write(&self, path: &Path) -> Result<(), ScriptError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        fs::write(path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))
    }

    /// Check that the recorded deployments live on the given chain.
    ///
    /// A file without entries belongs to no chain yet.
    pub fn check_chain(&self, chain_id: u64) -> Result<(), ScriptError> {
        match self.chain_id {
            Some(recorded) if recorded != chain_id && !self.deployments.is_empty() => {
                Err(ScriptError::ChainMismatch {
                    recorded,
                    connected: chain_id,
                })
            }
            _ => Ok(()),
        }
    }

    /// Record the deployments of a run on `chain_id`, replacing entries of the
    /// same name. Fails if the file holds deployments on another chain.
    pub fn merge(
        &mut self,
        chain_id: u64,
        deployer: Address,
        book: &AddressBook,
    ) -> Result<(), ScriptError> {
        self.check_chain(chain_id)?;
        self.chain_id = Some(chain_id);
        self.deployer = Some(deployer);
        for (name, contract) in book.iter() {
            self.deployments.insert(name.to_string(), *contract);
        }

        Ok(())
    }

    /// The recorded deployment with the given name
    pub fn get(&self, name: &str) -> Result<&DeployedContract, ScriptError> {
        self.deployments.get(name).ok_or_else(|| {
            ScriptError::ReadDeployments(format!("no deployment named `{name}` recorded"))
        })
    }
}

/// Merge the deployments of a run into the deployments file at `path`,
/// keeping entries recorded by earlier runs under other names
pub fn write_deployments(
    path: &Path,
    chain_id: u64,
    deployer: Address,
    book: &AddressBook,
) -> Result<(), ScriptError> {
    let mut deployments = Deployments::read(path)?;
    deployments.merge(chain_id, deployer, book)?;
    deployments.write(path)
}

/// Read a single recorded deployment from the deployments file at `path`
pub fn read_deployment(path: &Path, name: &str) -> Result<DeployedContract, ScriptError> {
    Deployments::read(path)?.get(name).copied()
}
