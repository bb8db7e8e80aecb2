//! The interface through which deployment plans reach a chain

use alloy_primitives::Address;

use crate::{
    errors::ScriptError,
    plan::PlanValue,
    types::{ContractKind, DeployedContract},
};

pub mod evm;

/// A backend able to deploy upgradeable contracts and call methods on them.
///
/// Sending a transaction and waiting for it to confirm are separate calls,
/// so that the orchestrator decides when to block.
#[allow(async_fn_in_trait)]
pub trait DeploymentBackend {
    /// A deployment that has been sent but not yet confirmed
    type PendingDeployment;
    /// A method call that has been sent but not yet confirmed
    type PendingTransaction;

    /// The account authorizing and paying for the deployments
    fn deployer(&self) -> Address;

    /// Send the deployment of an upgradeable instance of `kind`, initialized
    /// with `args`
    async fn deploy_upgradeable(
        &self,
        kind: ContractKind,
        args: &[PlanValue],
    ) -> Result<Self::PendingDeployment, ScriptError>;

    /// Wait for a deployment to confirm, returning the deployed contract
    async fn await_deployment(
        &self,
        pending: Self::PendingDeployment,
    ) -> Result<DeployedContract, ScriptError>;

    /// Send a call of `method` on `target`
    async fn invoke(
        &self,
        target: &DeployedContract,
        method: &str,
        args: &[PlanValue],
    ) -> Result<Self::PendingTransaction, ScriptError>;

    /// Wait for a method call to confirm
    async fn await_transaction(&self, pending: Self::PendingTransaction)
        -> Result<(), ScriptError>;
}
