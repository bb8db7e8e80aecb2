//! A deployment backend sending transactions to an EVM node over JSON-RPC.
//!
//! Each upgradeable deployment is an implementation contract fronted by an
//! OpenZeppelin v5 [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy),
//! which itself deploys a `ProxyAdmin` contract owned by the deployer.
//!
//! Calls made directly to the `TransparentUpgradeableProxy` contract will be forwarded to the implementation contract.
//! Upgrade calls can only be made to the `TransparentUpgradeableProxy` through the `ProxyAdmin`.

use std::{str::FromStr, time::Duration};

use alloy::{
    network::{Ethereum, TransactionBuilder},
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use tracing::{debug, info};

use crate::{
    artifacts::{Artifact, ArtifactStore},
    constants::{PROXY_ADMIN_STORAGE_SLOT, PROXY_ARTIFACT_NAME},
    errors::ScriptError,
    plan::PlanValue,
    solidity::ProxyAdmin,
    types::{ContractKind, DeployedContract},
    utils::{address_from_storage_word, Wallet},
};

use super::DeploymentBackend;

/// How long to wait on transactions, and for how many blocks
#[derive(Copy, Clone, Debug)]
pub struct ConfirmationPolicy {
    /// The number of blocks a transaction must be buried under
    pub confirmations: u64,
    /// How long to wait for the confirmations before giving up
    pub timeout: Duration,
}

/// A proxy deployment that has been sent but not yet confirmed
pub struct PendingProxy {
    /// The kind of contract behind the proxy
    kind: ContractKind,
    /// The confirmed implementation the proxy will delegate to
    implementation: Address,
    /// The proxy creation transaction
    tx: PendingTransactionBuilder<Ethereum>,
}

/// A [`DeploymentBackend`] backed by an RPC node and a local signer
pub struct EvmBackend {
    /// The signing provider
    provider: Wallet,
    /// The address of the signer
    deployer: Address,
    /// The compilation artifacts of the deployable contracts
    artifacts: ArtifactStore,
    /// The confirmation policy applied to every transaction
    policy: ConfirmationPolicy,
}

impl EvmBackend {
    /// Create a backend sending transactions through `provider` as `deployer`
    pub fn new(
        provider: Wallet,
        deployer: Address,
        artifacts: ArtifactStore,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            provider,
            deployer,
            artifacts,
            policy,
        }
    }

    /// The chain the backend is connected to
    pub async fn chain_id(&self) -> Result<u64, ScriptError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
    }

    /// Deploy a new implementation of `kind` and wait for it to confirm
    pub async fn deploy_implementation(&self, kind: ContractKind) -> Result<Address, ScriptError> {
        let artifact = self.artifacts.load(kind.artifact_name())?;
        let address = self.deploy_artifact(&artifact).await?;
        info!("{} implementation deployed at {:#x}", kind, address);

        Ok(address)
    }

    /// Read the proxy admin of an upgradeable proxy
    pub async fn proxy_admin_of(&self, proxy: Address) -> Result<Address, ScriptError> {
        // This is the recommended way to get the proxy admin address:
        // https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
        let slot = U256::from_str(PROXY_ADMIN_STORAGE_SLOT)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let word = self
            .provider
            .get_storage_at(proxy, slot)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(address_from_storage_word(word))
    }

    /// Point `proxy` at a freshly deployed implementation of `kind`, calling
    /// it with `calldata` if non-empty. Returns the new implementation.
    pub async fn upgrade(
        &self,
        proxy: Address,
        kind: ContractKind,
        calldata: Bytes,
    ) -> Result<Address, ScriptError> {
        let proxy_admin_address = self.proxy_admin_of(proxy).await?;
        let proxy_admin = ProxyAdmin::new(proxy_admin_address, self.provider.clone());

        let owner = proxy_admin
            .owner()
            .call()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        if owner != self.deployer {
            return Err(ScriptError::ContractInteraction(format!(
                "proxy admin {:#x} is owned by {:#x}, not {:#x}",
                proxy_admin_address, owner, self.deployer
            )));
        }

        let implementation = self.deploy_implementation(kind).await?;
        let tx = proxy_admin
            .upgradeAndCall(proxy, implementation, calldata)
            .send()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        self.confirm(tx).await?;

        Ok(implementation)
    }

    /// Deploy the creation bytecode of an artifact, without constructor
    /// arguments, and wait for it to confirm
    async fn deploy_artifact(&self, artifact: &Artifact) -> Result<Address, ScriptError> {
        let tx = self.send_creation(artifact.bytecode.clone()).await?;
        let receipt = self.confirm(tx).await?;
        created_address(&receipt)
    }

    /// Send a contract creation transaction
    async fn send_creation(
        &self,
        code: Bytes,
    ) -> Result<PendingTransactionBuilder<Ethereum>, ScriptError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(code);

        self.provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))
    }

    /// Wait for a transaction to confirm under the backend's policy, failing
    /// if it reverted
    async fn confirm(
        &self,
        tx: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TransactionReceipt, ScriptError> {
        let tx_hash = *tx.tx_hash();
        debug!("Waiting on transaction {:#x}", tx_hash);

        let receipt = tx
            .with_required_confirmations(self.policy.confirmations)
            .with_timeout(Some(self.policy.timeout))
            .get_receipt()
            .await
            .map_err(|e| ScriptError::Confirmation(format!("transaction {tx_hash:#x}: {e}")))?;

        if !receipt.status() {
            return Err(ScriptError::Confirmation(format!("transaction {tx_hash:#x} reverted")));
        }

        Ok(receipt)
    }
}

impl DeploymentBackend for EvmBackend {
    type PendingDeployment = PendingProxy;
    type PendingTransaction = PendingTransactionBuilder<Ethereum>;

    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn deploy_upgradeable(
        &self,
        kind: ContractKind,
        args: &[PlanValue],
    ) -> Result<PendingProxy, ScriptError> {
        // Encode the initializer before deploying anything, so that bad
        // arguments do not leave an implementation behind
        let artifact = self.artifacts.load(kind.artifact_name())?;
        let init_calldata = artifact.initializer_calldata(args)?;
        let proxy_artifact = self.artifacts.load(PROXY_ARTIFACT_NAME)?;

        let implementation = self.deploy_artifact(&artifact).await?;
        info!("{} implementation deployed at {:#x}", kind, implementation);

        let constructor_args = (implementation, self.deployer, init_calldata).abi_encode_params();
        let code = [proxy_artifact.bytecode.as_ref(), constructor_args.as_slice()].concat();
        let tx = self
            .send_creation(code.into())
            .await
            .map_err(|e| e.orphaning(kind, implementation))?;

        Ok(PendingProxy {
            kind,
            implementation,
            tx,
        })
    }

    async fn await_deployment(
        &self,
        pending: PendingProxy,
    ) -> Result<DeployedContract, ScriptError> {
        let PendingProxy {
            kind,
            implementation,
            tx,
        } = pending;
        let proxy = self
            .confirm(tx)
            .await
            .and_then(|receipt| created_address(&receipt))
            .map_err(|e| e.orphaning(kind, implementation))?;
        let proxy_admin = self.proxy_admin_of(proxy).await?;

        Ok(DeployedContract {
            kind,
            proxy,
            implementation,
            proxy_admin,
        })
    }

    async fn invoke(
        &self,
        target: &DeployedContract,
        method: &str,
        args: &[PlanValue],
    ) -> Result<Self::PendingTransaction, ScriptError> {
        let artifact = self.artifacts.load(target.kind.artifact_name())?;
        let calldata = artifact.encode_call(method, args)?;

        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_to(target.proxy)
            .with_input(calldata);

        self.provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn await_transaction(
        &self,
        pending: Self::PendingTransaction,
    ) -> Result<(), ScriptError> {
        self.confirm(pending).await.map(|_| ())
    }
}

/// The address of the contract created by a transaction
fn created_address(receipt: &TransactionReceipt) -> Result<Address, ScriptError> {
    receipt.contract_address.ok_or_else(|| {
        ScriptError::ContractDeployment(format!(
            "transaction {:#x} created no contract",
            receipt.transaction_hash
        ))
    })
}
