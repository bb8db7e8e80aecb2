//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy_primitives::Address;
use itertools::Itertools;

use crate::types::ContractKind;

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading the deployments file
    ReadDeployments(String),
    /// Error writing the deployments file
    WriteDeployments(String),
    /// Error reading or parsing a compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client or signer
    ClientInitialization(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// A transaction was mined but reverted, or never confirmed
    Confirmation(String),
    /// The deployment plan is malformed
    PlanValidation(String),
    /// A step referenced an entity that had not been confirmed yet
    StepOrdering(String),
    /// The deployments file records a different chain than the one connected to
    ChainMismatch {
        /// The chain recorded in the deployments file
        recorded: u64,
        /// The chain the client is connected to
        connected: u64,
    },
    /// A proxy deployment failed after its implementation was deployed
    OrphanedImplementation {
        /// The kind of contract whose proxy failed
        kind: ContractKind,
        /// The implementation left deployed without a proxy
        implementation: Address,
        /// The underlying error
        source: Box<ScriptError>,
    },
    /// A step of a deployment run failed, halting the run
    StepFailed {
        /// The position of the failing step in the executed order
        index: usize,
        /// A description of the failing step
        step: String,
        /// The contracts deployed before the failure, left in place
        left_deployed: Vec<(String, Address)>,
        /// The underlying error
        source: Box<ScriptError>,
    },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Confirmation(s) => write!(f, "error confirming transaction: {}", s),
            ScriptError::PlanValidation(s) => write!(f, "invalid deployment plan: {}", s),
            ScriptError::StepOrdering(s) => write!(f, "step ordering violation: {}", s),
            ScriptError::ChainMismatch {
                recorded,
                connected,
            } => write!(
                f,
                "deployments file records chain {}, but the client is connected to chain {}",
                recorded, connected
            ),
            ScriptError::OrphanedImplementation {
                kind,
                implementation,
                source,
            } => write!(
                f,
                "{} (the {} implementation at {:#x} has no proxy)",
                source, kind, implementation
            ),
            ScriptError::StepFailed {
                index,
                step,
                left_deployed,
                source,
            } => {
                write!(f, "step {} ({}) failed: {}", index, step, source)?;
                if !left_deployed.is_empty() {
                    let orphaned = left_deployed
                        .iter()
                        .map(|(name, address)| format!("{name} at {address:#x}"))
                        .join(", ");
                    write!(f, "; left deployed: {}", orphaned)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScriptError::StepFailed { source, .. }
            | ScriptError::OrphanedImplementation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl ScriptError {
    /// The index of the failing step, if this error halted a deployment run
    pub fn failed_step(&self) -> Option<usize> {
        match self {
            ScriptError::StepFailed { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Record that this error left the implementation of a `kind` proxy
    /// deployed without its proxy
    pub fn orphaning(self, kind: ContractKind, implementation: Address) -> Self {
        ScriptError::OrphanedImplementation {
            kind,
            implementation,
            source: Box::new(self),
        }
    }

    /// The implementation this error left deployed without a proxy, if any
    pub fn orphaned_implementation(&self) -> Option<(ContractKind, Address)> {
        match self {
            ScriptError::OrphanedImplementation {
                kind,
                implementation,
                ..
            } => Some((*kind, *implementation)),
            _ => None,
        }
    }
}
