//! Implementations of the various deploy scripts

use std::{
    io::{self, Write},
    path::Path,
    str::FromStr,
};

use alloy_primitives::{Address, Bytes};
use tracing::info;

use crate::{
    artifacts::ArtifactStore,
    backend::{evm::EvmBackend, DeploymentBackend},
    cli::{ChainArgs, DeployArgs, PlanArgs, UpgradeArgs},
    constants::PROXY_ARTIFACT_NAME,
    deployments::{write_deployments, Deployments},
    errors::ScriptError,
    orchestrator::{AddressBook, Orchestrator},
    plan::{DeploymentPlan, Step, ValidatedPlan},
    types::DeployedContract,
    utils::setup_client,
};

/// Deploy the marketplace contracts and record them in the deployments file
pub async fn deploy(args: DeployArgs) -> Result<(), ScriptError> {
    let plan = DeploymentPlan::marketplace(&args.marketplace.into())?.validate()?;

    let artifacts = args.chain.artifact_store()?;
    preload_artifacts(&artifacts, &plan)?;

    let backend = connect(&args.chain, artifacts).await?;
    let chain_id = backend.chain_id().await?;
    let deployer = backend.deployer();

    // Refuse to deploy if the run could not be recorded alongside the
    // existing deployments
    Deployments::read(&args.chain.deployments_path)?.check_chain(chain_id)?;

    let book = Orchestrator::new(backend).run(&plan).await?;
    report_and_record(
        &mut io::stdout(),
        &args.chain.deployments_path,
        chain_id,
        deployer,
        &book,
    )
}

/// Validate the marketplace plan and print its steps, grouped into waves of
/// steps that do not depend on each other
pub fn print_plan(args: PlanArgs) -> Result<(), ScriptError> {
    let plan = DeploymentPlan::marketplace(&args.marketplace.into())?.validate()?;

    for (i, wave) in plan.independent_waves().iter().enumerate() {
        println!("wave {}:", i);
        for step in wave {
            println!("    {}", step);
        }
    }

    Ok(())
}

/// Upgrade a recorded proxy to a new implementation, and record it
pub async fn upgrade(args: UpgradeArgs) -> Result<(), ScriptError> {
    let path = &args.chain.deployments_path;
    let mut deployments = Deployments::read(path)?;

    let name = args
        .name
        .unwrap_or_else(|| args.contract.default_key().to_string());
    let recorded = *deployments.get(&name)?;
    if recorded.kind != args.contract {
        return Err(ScriptError::ReadDeployments(format!(
            "`{}` is recorded as a {}, not a {}",
            name, recorded.kind, args.contract
        )));
    }

    let calldata = match args.calldata {
        Some(calldata) => Bytes::from_str(&calldata)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?,
        None => Bytes::new(),
    };

    let artifacts = args.chain.artifact_store()?;
    artifacts.load(args.contract.artifact_name())?;
    let backend = connect(&args.chain, artifacts).await?;
    deployments.check_chain(backend.chain_id().await?)?;

    let implementation = backend.upgrade(recorded.proxy, args.contract, calldata).await?;
    info!(
        "{} at {:#x} upgraded from {:#x} to {:#x}",
        name, recorded.proxy, recorded.implementation, implementation
    );

    deployments.deployments.insert(
        name,
        DeployedContract {
            implementation,
            ..recorded
        },
    );
    deployments.write(path)
}

/// Print the proxy address of every deployment of a run, then merge them into
/// the deployments file at `path`.
///
/// The addresses are printed even if the deployments file cannot be written.
fn report_and_record(
    out: &mut impl Write,
    path: &Path,
    chain_id: u64,
    deployer: Address,
    book: &AddressBook,
) -> Result<(), ScriptError> {
    let printed = book
        .iter()
        .try_for_each(|(name, contract)| writeln!(out, "{} address: {:#x}", name, contract.proxy));

    write_deployments(path, chain_id, deployer, book)?;
    info!("Deployments written to {}", path.display());

    printed.map_err(|e| ScriptError::WriteDeployments(format!("error printing addresses: {e}")))
}

/// Connect to the node given on the command line
async fn connect(chain: &ChainArgs, artifacts: ArtifactStore) -> Result<EvmBackend, ScriptError> {
    let (provider, deployer) = setup_client(&chain.priv_key, &chain.rpc_url).await?;
    Ok(EvmBackend::new(
        provider,
        deployer,
        artifacts,
        chain.confirmation_policy(),
    ))
}

/// Load every artifact a plan needs, so that a missing or malformed artifact
/// fails the run before anything is deployed
fn preload_artifacts(artifacts: &ArtifactStore, plan: &ValidatedPlan) -> Result<(), ScriptError> {
    artifacts.load(PROXY_ARTIFACT_NAME)?;
    for step in plan.steps() {
        if let Step::Deploy { kind, .. } = step {
            artifacts.load(kind.artifact_name())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use alloy_primitives::Address;

    use super::report_and_record;
    use crate::{
        errors::ScriptError,
        orchestrator::AddressBook,
        plan::EntityName,
        types::{ContractKind, DeployedContract},
    };

    fn marketplace_book() -> AddressBook {
        let mut book = AddressBook::default();
        let kinds = [
            ContractKind::Erc721Marketplace,
            ContractKind::Erc1155Marketplace,
            ContractKind::RoyaltiesRegistry,
            ContractKind::FeeDistributor,
        ];
        for (i, kind) in kinds.into_iter().enumerate() {
            let byte = 3 * i as u8 + 1;
            let contract = DeployedContract {
                kind,
                proxy: Address::with_last_byte(byte),
                implementation: Address::with_last_byte(byte + 1),
                proxy_admin: Address::with_last_byte(byte + 2),
            };
            book.record(EntityName::new(kind.default_key()), contract).unwrap();
        }
        book
    }

    #[test]
    fn test_report_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        let mut out = Vec::new();

        report_and_record(&mut out, &path, 31337, Address::ZERO, &marketplace_book()).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.lines().count(), 4);
        assert!(out.starts_with(&format!(
            "erc721_marketplace address: {:#x}",
            Address::with_last_byte(1)
        )));
        assert!(path.is_file());
    }

    #[test]
    fn test_addresses_reported_when_recording_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.json");
        fs::write(&path, "not json").unwrap();
        let mut out = Vec::new();

        let res = report_and_record(&mut out, &path, 31337, Address::ZERO, &marketplace_book());
        assert!(matches!(res, Err(ScriptError::ReadDeployments(_))));

        let out = String::from_utf8(out).unwrap();
        let names: Vec<&str> = out.lines().filter_map(|line| line.split(' ').next()).collect();
        assert_eq!(
            names,
            vec![
                "erc721_marketplace",
                "erc1155_marketplace",
                "royalties_registry",
                "fee_distributor"
            ]
        );
    }
}
