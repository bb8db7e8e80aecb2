//! An in-memory deployment backend recording every call made to it

#![allow(dead_code)]

use std::{collections::HashSet, sync::Mutex};

use alloy_primitives::{address, Address};
use marketplace_deploy::{
    backend::DeploymentBackend,
    errors::ScriptError,
    plan::{MarketplaceConfig, PlanValue},
    types::{ContractKind, DeployedContract},
};

/// The fee recipient used by the tests
pub const FEE_RECIPIENT: Address = address!("0d3C3d95dF3c9e71d39fd00Eb842026713ad64fE");
/// The WETH address used by the tests
pub const WETH: Address = address!("A99cf32e9aAa700f9E881BA9BF2C57A211ae94df");
/// The deployer used by the tests
pub const DEPLOYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// The marketplace configuration used by the tests
pub fn marketplace_config() -> MarketplaceConfig {
    MarketplaceConfig {
        fee_recipient: FEE_RECIPIENT,
        weth: WETH,
        platform_fee_bps: 250,
        royalty_share_bps: 5000,
        upgrade_authority: None,
    }
}

/// A call issued to the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// An upgradeable deployment
    Deploy {
        kind: ContractKind,
        args: Vec<PlanValue>,
    },
    /// A method call
    Invoke {
        target: Address,
        method: String,
        args: Vec<PlanValue>,
    },
}

/// Where the backend should fail
#[derive(Copy, Clone, Debug)]
pub enum Failure {
    /// Refuse to issue the n-th call
    Issue(usize),
    /// Issue the n-th call, but fail its confirmation
    Confirmation(usize),
    /// Deploy the implementation of the n-th call, but refuse its proxy
    ProxyCreation(usize),
}

/// The mutable state of the mock
#[derive(Default)]
struct State {
    /// Every call issued, in order
    calls: Vec<Call>,
    /// Proxies handed out by issued deployments
    issued: HashSet<Address>,
    /// Proxies whose deployments confirmed
    confirmed: HashSet<Address>,
    /// Addresses that were passed to a call before they confirmed
    premature: Vec<Address>,
}

/// A backend that hands out fresh addresses and confirms everything, except
/// where told to fail
pub struct MockBackend {
    /// A byte distinguishing this backend's addresses from other backends'
    seed: u8,
    /// The injected failure, if any
    failure: Option<Failure>,
    /// The recorded state
    state: Mutex<State>,
}

impl MockBackend {
    /// A backend that confirms everything
    pub fn new(seed: u8) -> Self {
        Self {
            seed,
            failure: None,
            state: Mutex::default(),
        }
    }

    /// A backend that fails at the given point
    pub fn failing(seed: u8, failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(seed)
        }
    }

    /// The calls issued so far
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Addresses used in a call before their deployment confirmed
    pub fn premature_references(&self) -> Vec<Address> {
        self.state.lock().unwrap().premature.clone()
    }

    /// An address unique to this backend and counter
    fn address(&self, n: usize) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = self.seed;
        bytes[12..].copy_from_slice(&(n as u64).to_be_bytes());
        Address::from(bytes)
    }

    /// Record an issued call, returning its index
    fn issue(&self, call: Call, used: &[Address]) -> Result<usize, ScriptError> {
        let mut state = self.state.lock().unwrap();
        let index = state.calls.len();
        if let Some(Failure::Issue(n)) = self.failure {
            if n == index {
                return Err(ScriptError::ContractDeployment("node refused call".to_string()));
            }
        }

        for address in used {
            if state.issued.contains(address) && !state.confirmed.contains(address) {
                state.premature.push(*address);
            }
        }
        state.calls.push(call);

        Ok(index)
    }

    /// Whether the call with the given index should fail to confirm
    fn fails_confirmation(&self, index: usize) -> bool {
        matches!(self.failure, Some(Failure::Confirmation(n)) if n == index)
    }
}

/// The addresses among a list of values
fn addresses(args: &[PlanValue]) -> Vec<Address> {
    args.iter()
        .filter_map(|arg| match arg {
            PlanValue::Address(address) => Some(*address),
            PlanValue::Uint(_) => None,
        })
        .collect()
}

impl DeploymentBackend for MockBackend {
    type PendingDeployment = (usize, DeployedContract);
    type PendingTransaction = usize;

    fn deployer(&self) -> Address {
        DEPLOYER
    }

    async fn deploy_upgradeable(
        &self,
        kind: ContractKind,
        args: &[PlanValue],
    ) -> Result<Self::PendingDeployment, ScriptError> {
        let call = Call::Deploy {
            kind,
            args: args.to_vec(),
        };
        let index = self.issue(call, &addresses(args))?;

        let base = 3 * index;
        if matches!(self.failure, Some(Failure::ProxyCreation(n)) if n == index) {
            let refused = ScriptError::ContractDeployment("proxy creation refused".to_string());
            return Err(refused.orphaning(kind, self.address(base + 2)));
        }

        let contract = DeployedContract {
            kind,
            proxy: self.address(base + 1),
            implementation: self.address(base + 2),
            proxy_admin: self.address(base + 3),
        };
        self.state.lock().unwrap().issued.insert(contract.proxy);

        Ok((index, contract))
    }

    async fn await_deployment(
        &self,
        (index, contract): Self::PendingDeployment,
    ) -> Result<DeployedContract, ScriptError> {
        if self.fails_confirmation(index) {
            return Err(ScriptError::Confirmation(format!(
                "deployment of {} reverted",
                contract.kind
            )));
        }

        self.state.lock().unwrap().confirmed.insert(contract.proxy);
        Ok(contract)
    }

    async fn invoke(
        &self,
        target: &DeployedContract,
        method: &str,
        args: &[PlanValue],
    ) -> Result<Self::PendingTransaction, ScriptError> {
        let call = Call::Invoke {
            target: target.proxy,
            method: method.to_string(),
            args: args.to_vec(),
        };

        let mut used = addresses(args);
        used.push(target.proxy);
        self.issue(call, &used)
    }

    async fn await_transaction(&self, index: usize) -> Result<(), ScriptError> {
        if self.fails_confirmation(index) {
            return Err(ScriptError::Confirmation("call reverted".to_string()));
        }

        Ok(())
    }
}
