//! Execution of validated deployment plans against a [`DeploymentBackend`]

use std::collections::{btree_map::Entry, BTreeMap};

use alloy_primitives::Address;
use tracing::{error, info};

use crate::{
    backend::DeploymentBackend,
    errors::ScriptError,
    plan::{DeploymentPlan, EntityName, PlanArg, PlanValue, Step, ValidatedPlan},
    types::DeployedContract,
};

/// The confirmed deployments of a run, keyed by entity name.
///
/// Entries are only ever added; an entity is recorded once it is confirmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressBook {
    /// The confirmed deployments
    entries: BTreeMap<EntityName, DeployedContract>,
    /// The entity names, in the order they were confirmed
    order: Vec<EntityName>,
}

impl AddressBook {
    /// Record a confirmed deployment
    pub fn record(
        &mut self,
        name: EntityName,
        contract: DeployedContract,
    ) -> Result<(), ScriptError> {
        match self.entries.entry(name.clone()) {
            Entry::Occupied(_) => Err(ScriptError::StepOrdering(format!(
                "entity `{name}` was already recorded"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(contract);
                self.order.push(name);
                Ok(())
            }
        }
    }

    /// The confirmed deployment of the given entity
    pub fn get(&self, name: &str) -> Option<&DeployedContract> {
        self.entries.get(&EntityName::new(name))
    }

    /// The confirmed deployment of the given entity, failing if it has not
    /// been confirmed yet
    pub fn lookup(&self, name: &EntityName) -> Result<&DeployedContract, ScriptError> {
        self.entries.get(name).ok_or_else(|| {
            ScriptError::StepOrdering(format!("entity `{name}` has not been confirmed"))
        })
    }

    /// Replace references with the proxy addresses of the entities they name
    pub fn resolve(&self, args: &[PlanArg]) -> Result<Vec<PlanValue>, ScriptError> {
        args.iter()
            .map(|arg| match arg {
                PlanArg::Literal(value) => Ok(*value),
                PlanArg::Ref(name) => self.lookup(name).map(|c| PlanValue::Address(c.proxy)),
            })
            .collect()
    }

    /// The number of confirmed deployments
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no deployment has been confirmed
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The confirmed deployments, in confirmation order
    pub fn iter(&self) -> impl Iterator<Item = (&EntityName, &DeployedContract)> {
        self.order.iter().map(move |name| (name, &self.entries[name]))
    }

    /// The proxy address of each confirmed deployment, in confirmation order
    pub fn proxies(&self) -> Vec<(String, Address)> {
        self.iter()
            .map(|(name, contract)| (name.to_string(), contract.proxy))
            .collect()
    }
}

/// Drives deployment plans to completion, one step at a time.
///
/// A run halts at the first failing step. Nothing is retried, and entities
/// confirmed before the failure are left deployed.
pub struct Orchestrator<B: DeploymentBackend> {
    /// The backend the steps are executed against
    backend: B,
}

impl<B: DeploymentBackend> Orchestrator<B> {
    /// Create an orchestrator executing against the given backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend the steps are executed against
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validate a plan, then run it. An invalid plan never reaches the backend.
    pub async fn run_plan(&self, plan: DeploymentPlan) -> Result<AddressBook, ScriptError> {
        let plan = plan.validate()?;
        self.run(&plan).await
    }

    /// Run a validated plan, returning the confirmed deployments
    pub async fn run(&self, plan: &ValidatedPlan) -> Result<AddressBook, ScriptError> {
        info!(
            "Running {} steps as {:#x}",
            plan.steps().len(),
            self.backend.deployer()
        );

        let mut book = AddressBook::default();
        for (index, step) in plan.steps().iter().enumerate() {
            info!("[{}/{}] {}", index + 1, plan.steps().len(), step);

            if let Err(e) = self.execute(step, &mut book).await {
                error!("Step {} failed: {}", index, e);
                return Err(ScriptError::StepFailed {
                    index,
                    step: step.to_string(),
                    left_deployed: left_deployed(&book, &e),
                    source: Box::new(e),
                });
            }
        }

        Ok(book)
    }

    /// Execute a single step, recording the entity it deploys
    async fn execute(&self, step: &Step, book: &mut AddressBook) -> Result<(), ScriptError> {
        match step {
            Step::Deploy { name, kind, args } => {
                let args = book.resolve(args)?;
                let pending = self.backend.deploy_upgradeable(*kind, &args).await?;
                let contract = self.backend.await_deployment(pending).await?;

                info!("{} deployed at {:#x}", name, contract.proxy);
                book.record(name.clone(), contract)
            }
            Step::Configure {
                target,
                method,
                args,
            } => {
                let target_contract = *book.lookup(target)?;
                let args = book.resolve(args)?;
                let pending = self
                    .backend
                    .invoke(&target_contract, method, &args)
                    .await?;
                self.backend.await_transaction(pending).await?;

                info!("Called {} on {}", method, target);
                Ok(())
            }
        }
    }
}

/// The contracts a failed run leaves on chain: every confirmed proxy, and the
/// implementation of a proxy that failed to deploy
fn left_deployed(book: &AddressBook, err: &ScriptError) -> Vec<(String, Address)> {
    let mut contracts = book.proxies();
    if let Some((kind, implementation)) = err.orphaned_implementation() {
        contracts.push((format!("{kind} implementation"), implementation));
    }

    contracts
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::{left_deployed, AddressBook};
    use crate::{
        errors::ScriptError,
        plan::{EntityName, PlanArg, PlanValue},
        types::{ContractKind, DeployedContract},
    };

    fn contract(byte: u8) -> DeployedContract {
        DeployedContract {
            kind: ContractKind::RoyaltiesRegistry,
            proxy: Address::with_last_byte(byte),
            implementation: Address::with_last_byte(byte + 1),
            proxy_admin: Address::with_last_byte(byte + 2),
        }
    }

    #[test]
    fn test_resolve_references() {
        let mut book = AddressBook::default();
        book.record(EntityName::new("registry"), contract(1)).unwrap();

        let resolved = book
            .resolve(&[PlanArg::reference("registry"), PlanArg::literal(250u64)])
            .unwrap();
        assert_eq!(
            resolved,
            vec![PlanValue::Address(Address::with_last_byte(1)), PlanValue::from(250u64)]
        );
    }

    #[test]
    fn test_unconfirmed_reference() {
        let book = AddressBook::default();
        let res = book.resolve(&[PlanArg::reference("registry")]);
        assert!(matches!(res, Err(ScriptError::StepOrdering(_))));
    }

    #[test]
    fn test_record_once() {
        let mut book = AddressBook::default();
        book.record(EntityName::new("registry"), contract(1)).unwrap();
        let res = book.record(EntityName::new("registry"), contract(4));

        assert!(matches!(res, Err(ScriptError::StepOrdering(_))));
        assert_eq!(book.get("registry"), Some(&contract(1)));
    }

    #[test]
    fn test_confirmation_order() {
        let mut book = AddressBook::default();
        book.record(EntityName::new("zeta"), contract(1)).unwrap();
        book.record(EntityName::new("alpha"), contract(4)).unwrap();

        let names: Vec<String> = book.proxies().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_left_deployed_includes_orphaned_implementation() {
        let mut book = AddressBook::default();
        book.record(EntityName::new("registry"), contract(1)).unwrap();

        let refused = ScriptError::ContractDeployment("nonce too low".to_string());
        assert_eq!(left_deployed(&book, &refused), book.proxies());

        let orphaned = refused.orphaning(ContractKind::FeeDistributor, Address::with_last_byte(9));
        assert_eq!(
            left_deployed(&book, &orphaned),
            vec![
                ("registry".to_string(), Address::with_last_byte(1)),
                (
                    "fee-distributor implementation".to_string(),
                    Address::with_last_byte(9)
                ),
            ]
        );
    }
}
