//! Deployment plans: the steps to execute, the entities they produce, and the
//! addresses they consume.
//!
//! A plan is authored as a list of steps. Before anything is sent to a chain
//! it is validated into a [`ValidatedPlan`], whose steps are ordered so that
//! every step runs after the steps producing the entities it references.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{self, Display},
};

use alloy_primitives::{Address, U256};
use itertools::Itertools;

use crate::{
    constants::{MAX_BPS, SET_FEE_DISTRIBUTOR_METHOD},
    errors::ScriptError,
    types::ContractKind,
};

// ---------
// | Types |
// ---------

/// A plan-local name for a deployed entity, known before its address is
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityName(String);

impl EntityName {
    /// Create a new entity name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A literal value passed to a contract
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlanValue {
    /// An address
    Address(Address),
    /// An unsigned integer, narrowed to the parameter's width when encoded
    Uint(U256),
}

impl From<Address> for PlanValue {
    fn from(address: Address) -> Self {
        PlanValue::Address(address)
    }
}

impl From<u64> for PlanValue {
    fn from(value: u64) -> Self {
        PlanValue::Uint(U256::from(value))
    }
}

impl Display for PlanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanValue::Address(address) => write!(f, "{:#x}", address),
            PlanValue::Uint(value) => write!(f, "{}", value),
        }
    }
}

/// An argument to a step, either known up front or taken from an earlier step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanArg {
    /// A value known when the plan is written
    Literal(PlanValue),
    /// The proxy address of a deployed entity
    Ref(EntityName),
}

impl PlanArg {
    /// A reference to the entity with the given name
    pub fn reference(name: &str) -> Self {
        PlanArg::Ref(EntityName::new(name))
    }

    /// A literal argument
    pub fn literal(value: impl Into<PlanValue>) -> Self {
        PlanArg::Literal(value.into())
    }
}

impl Display for PlanArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanArg::Literal(value) => write!(f, "{}", value),
            PlanArg::Ref(name) => write!(f, "&{}", name),
        }
    }
}

/// A single step of a deployment plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Deploy an upgradeable contract, initialized with the given arguments,
    /// and record it under `name`
    Deploy {
        /// The name under which the deployment is recorded
        name: EntityName,
        /// The contract to deploy
        kind: ContractKind,
        /// The initializer arguments
        args: Vec<PlanArg>,
    },
    /// Call a method on an entity deployed by an earlier step
    Configure {
        /// The entity to call
        target: EntityName,
        /// The method to call
        method: String,
        /// The method arguments
        args: Vec<PlanArg>,
    },
}

impl Step {
    /// The arguments passed by this step
    pub fn args(&self) -> &[PlanArg] {
        match self {
            Step::Deploy { args, .. } | Step::Configure { args, .. } => args,
        }
    }

    /// The entity this step produces, if any
    pub fn produces(&self) -> Option<&EntityName> {
        match self {
            Step::Deploy { name, .. } => Some(name),
            Step::Configure { .. } => None,
        }
    }

    /// The entities that must be confirmed before this step can run
    pub fn dependencies(&self) -> impl Iterator<Item = &EntityName> {
        let target = match self {
            Step::Configure { target, .. } => Some(target),
            Step::Deploy { .. } => None,
        };

        target.into_iter().chain(self.args().iter().filter_map(|arg| match arg {
            PlanArg::Ref(name) => Some(name),
            PlanArg::Literal(_) => None,
        }))
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Deploy { name, kind, args } => {
                write!(f, "deploy {} as {}({})", kind, name, args.iter().join(", "))
            }
            Step::Configure {
                target,
                method,
                args,
            } => write!(f, "call {}.{}({})", target, method, args.iter().join(", ")),
        }
    }
}

// ------------
// | Planning |
// ------------

/// The literal inputs to the marketplace deployment
#[derive(Clone, Debug)]
pub struct MarketplaceConfig {
    /// The recipient of the platform fee
    pub fee_recipient: Address,
    /// The wrapped native token accepted by the marketplaces
    pub weth: Address,
    /// The platform fee, in basis points
    pub platform_fee_bps: u64,
    /// The share of fees routed through the royalties registry, in basis points
    pub royalty_share_bps: u64,
    /// The account the marketplaces are initialized with as their upgrade
    /// authority, if any
    pub upgrade_authority: Option<Address>,
}

impl MarketplaceConfig {
    /// The upgrade authority passed to the marketplaces, the zero address if unset
    pub fn upgrade_authority_or_zero(&self) -> Address {
        self.upgrade_authority.unwrap_or(Address::ZERO)
    }

    /// Check that the fee parameters are valid basis point values
    fn check(&self) -> Result<(), ScriptError> {
        for (label, bps) in [
            ("platform fee", self.platform_fee_bps),
            ("royalty share", self.royalty_share_bps),
        ] {
            if bps > MAX_BPS {
                return Err(ScriptError::PlanValidation(format!(
                    "{label} of {bps} bps exceeds {MAX_BPS} bps"
                )));
            }
        }

        Ok(())
    }
}

/// A deployment plan, as authored
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// The steps, in authored order
    steps: Vec<Step>,
}

impl DeploymentPlan {
    /// Append a deploy step
    pub fn deploy(mut self, name: &str, kind: ContractKind, args: Vec<PlanArg>) -> Self {
        self.steps.push(Step::Deploy {
            name: EntityName::new(name),
            kind,
            args,
        });
        self
    }

    /// Append a configure step
    pub fn configure(mut self, target: &str, method: &str, args: Vec<PlanArg>) -> Self {
        self.steps.push(Step::Configure {
            target: EntityName::new(target),
            method: method.to_string(),
            args,
        });
        self
    }

    /// The steps, in authored order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The plan deploying both marketplaces, the royalties registry and the
    /// fee distributor, then binding the fee distributor into each marketplace
    pub fn marketplace(config: &MarketplaceConfig) -> Result<Self, ScriptError> {
        config.check()?;

        let erc721 = ContractKind::Erc721Marketplace.default_key();
        let erc1155 = ContractKind::Erc1155Marketplace.default_key();
        let royalties = ContractKind::RoyaltiesRegistry.default_key();
        let fee_distributor = ContractKind::FeeDistributor.default_key();

        let marketplace_args = vec![
            PlanArg::literal(config.upgrade_authority_or_zero()),
            PlanArg::literal(config.weth),
        ];

        Ok(Self::default()
            .deploy(erc721, ContractKind::Erc721Marketplace, marketplace_args.clone())
            .deploy(erc1155, ContractKind::Erc1155Marketplace, marketplace_args)
            .deploy(royalties, ContractKind::RoyaltiesRegistry, vec![])
            .deploy(
                fee_distributor,
                ContractKind::FeeDistributor,
                vec![
                    PlanArg::reference(erc721),
                    PlanArg::reference(erc1155),
                    PlanArg::reference(royalties),
                    PlanArg::literal(config.fee_recipient),
                    PlanArg::literal(config.platform_fee_bps),
                    PlanArg::literal(config.royalty_share_bps),
                ],
            )
            .configure(
                erc721,
                SET_FEE_DISTRIBUTOR_METHOD,
                vec![PlanArg::reference(fee_distributor)],
            )
            .configure(
                erc1155,
                SET_FEE_DISTRIBUTOR_METHOD,
                vec![PlanArg::reference(fee_distributor)],
            ))
    }

    /// Validate the plan and order its steps by their dependencies.
    ///
    /// Fails if an entity is deployed twice, if a step references an entity
    /// no step deploys, or if the dependencies form a cycle. Independent steps
    /// keep their authored order.
    pub fn validate(self) -> Result<ValidatedPlan, ScriptError> {
        let n_steps = self.steps.len();

        let mut producers: HashMap<&EntityName, usize> = HashMap::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if let Some(name) = step.produces() {
                if producers.insert(name, idx).is_some() {
                    return Err(ScriptError::PlanValidation(format!(
                        "entity `{name}` is deployed more than once"
                    )));
                }
            }
        }

        let mut in_degree = vec![0; n_steps];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n_steps];
        for (idx, step) in self.steps.iter().enumerate() {
            let deps: BTreeSet<usize> = step
                .dependencies()
                .map(|name| {
                    producers.get(name).copied().ok_or_else(|| {
                        ScriptError::PlanValidation(format!(
                            "step `{step}` references `{name}`, which is never deployed"
                        ))
                    })
                })
                .collect::<Result<_, _>>()?;

            in_degree[idx] = deps.len();
            for dep in deps {
                dependents[dep].push(idx);
            }
        }

        // Kahn's algorithm, always taking the earliest authored ready step
        let mut ready: BTreeSet<usize> = (0..n_steps).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n_steps);
        let mut levels = vec![0; n_steps];
        while let Some(idx) = ready.pop_first() {
            order.push(idx);
            for &dependent in &dependents[idx] {
                levels[dependent] = levels[dependent].max(levels[idx] + 1);
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != n_steps {
            let stuck = (0..n_steps)
                .filter(|i| in_degree[*i] > 0)
                .map(|i| format!("`{}`", self.steps[i]))
                .join(", ");
            return Err(ScriptError::PlanValidation(format!(
                "dependency cycle between steps {stuck}"
            )));
        }

        let mut steps: Vec<Option<Step>> = self.steps.into_iter().map(Some).collect();
        let (steps, levels) = order
            .into_iter()
            .filter_map(|idx| steps[idx].take().map(|step| (step, levels[idx])))
            .unzip();

        Ok(ValidatedPlan { steps, levels })
    }
}

/// A plan whose steps are known to be in dependency order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPlan {
    /// The steps, in execution order
    steps: Vec<Step>,
    /// The dependency depth of each step
    levels: Vec<usize>,
}

impl ValidatedPlan {
    /// The steps, in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The entities the plan deploys, in execution order
    pub fn entities(&self) -> impl Iterator<Item = &EntityName> {
        self.steps.iter().filter_map(Step::produces)
    }

    /// Group the steps into waves, where no step depends on another step of
    /// its own wave
    pub fn independent_waves(&self) -> Vec<Vec<&Step>> {
        let mut waves: Vec<Vec<&Step>> = Vec::new();
        for (step, &level) in self.steps.iter().zip(self.levels.iter()) {
            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(step);
        }

        waves
    }
}
