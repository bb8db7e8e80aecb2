//! Loading of Hardhat compilation artifacts and encoding of calls against
//! their ABIs

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
};
use alloy_primitives::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::{
    constants::{
        ARTIFACT_EXTENSION, HARDHAT_UPGRADES_PROXY_ARTIFACT, INITIALIZER_METHOD,
        NODE_MODULES_DIR, PROXY_ARTIFACT_NAME, SOLIDITY_SOURCE_DIR_SUFFIX,
    },
    errors::ScriptError,
    plan::PlanValue,
};

/// The directory Hardhat stores build metadata in, which holds no artifacts
const BUILD_INFO_DIR: &str = "build-info";

/// A Hardhat compilation artifact
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// The name of the compiled contract
    pub contract_name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
}

impl Artifact {
    /// Parse an artifact from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(json).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))
    }

    /// ABI-encode a call to `method`, selecting the overload whose arity
    /// matches the given values
    pub fn encode_call(&self, method: &str, values: &[PlanValue]) -> Result<Bytes, ScriptError> {
        let function = self
            .abi
            .function(method)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == values.len()))
            .ok_or_else(|| {
                ScriptError::CalldataConstruction(format!(
                    "{} has no method `{}` taking {} arguments",
                    self.contract_name,
                    method,
                    values.len()
                ))
            })?;

        let tokens = function
            .inputs
            .iter()
            .zip(values)
            .map(|(param, value)| to_sol_value(param, value))
            .collect::<Result<Vec<_>, _>>()?;

        function
            .abi_encode_input(&tokens)
            .map(Bytes::from)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
    }

    /// The calldata with which the proxy invokes the implementation's initializer.
    ///
    /// A contract without an initializer may be deployed without arguments,
    /// in which case the proxy is created with empty calldata.
    pub fn initializer_calldata(&self, values: &[PlanValue]) -> Result<Bytes, ScriptError> {
        if values.is_empty() && self.abi.function(INITIALIZER_METHOD).is_none() {
            return Ok(Bytes::new());
        }

        self.encode_call(INITIALIZER_METHOD, values)
    }
}

/// Convert a plan value into a value of the given ABI parameter's type
fn to_sol_value(param: &Param, value: &PlanValue) -> Result<DynSolValue, ScriptError> {
    let ty = param
        .resolve()
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;

    match (ty, value) {
        (DynSolType::Address, PlanValue::Address(address)) => Ok(DynSolValue::Address(*address)),
        (DynSolType::Uint(bits), PlanValue::Uint(amount)) => {
            if amount.bit_len() > bits {
                return Err(ScriptError::CalldataConstruction(format!(
                    "{} does not fit parameter `{}` of type {}",
                    amount, param.name, param.ty
                )));
            }

            Ok(DynSolValue::Uint(*amount, bits))
        }
        _ => Err(ScriptError::CalldataConstruction(format!(
            "{} cannot be passed as parameter `{}` of type {}",
            value, param.name, param.ty
        ))),
    }
}

/// A directory of Hardhat compilation artifacts.
///
/// Artifacts are parsed once and cached for the lifetime of the store.
#[derive(Debug)]
pub struct ArtifactStore {
    /// The root of the artifacts directory
    root: PathBuf,
    /// An explicit path to the proxy artifact, taking precedence over any
    /// other location
    proxy_artifact: Option<PathBuf>,
    /// The artifacts loaded so far, by contract name
    cache: Mutex<HashMap<String, Arc<Artifact>>>,
}

impl ArtifactStore {
    /// Open the artifacts directory at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ScriptError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ScriptError::ArtifactParsing(format!(
                "artifacts directory {} does not exist",
                root.display()
            )));
        }

        Ok(Self {
            root,
            proxy_artifact: None,
            cache: Mutex::default(),
        })
    }

    /// Load the proxy from the given artifact file instead of searching for it
    pub fn with_proxy_artifact(mut self, path: Option<PathBuf>) -> Self {
        self.proxy_artifact = path;
        self
    }

    /// Load the artifact of the contract with the given name
    pub fn load(&self, contract_name: &str) -> Result<Arc<Artifact>, ScriptError> {
        if let Some(artifact) = self.cache()?.get(contract_name) {
            return Ok(artifact.clone());
        }

        let path = self.locate(contract_name)?.ok_or_else(|| {
            ScriptError::ArtifactParsing(format!(
                "no artifact for {} under {}",
                contract_name,
                self.root.display()
            ))
        })?;
        debug!("Loading artifact {}", path.display());

        let json =
            fs::read_to_string(&path).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
        let artifact = Artifact::from_json(&json)?;
        if artifact.bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{} has no creation bytecode, is it abstract?",
                contract_name
            )));
        }

        let artifact = Arc::new(artifact);
        self.cache()?.insert(contract_name.to_string(), artifact.clone());
        Ok(artifact)
    }

    /// The path of the artifact of the given contract.
    ///
    /// The proxy is looked up in the explicit proxy artifact if one is set,
    /// then in the artifacts directory, and finally in the copy shipped with
    /// `@openzeppelin/hardhat-upgrades` in an enclosing `node_modules`.
    fn locate(&self, contract_name: &str) -> Result<Option<PathBuf>, ScriptError> {
        if contract_name != PROXY_ARTIFACT_NAME {
            return find_artifact(&self.root, contract_name);
        }

        if let Some(path) = &self.proxy_artifact {
            return Ok(Some(path.clone()));
        }
        if let Some(path) = find_artifact(&self.root, contract_name)? {
            return Ok(Some(path));
        }

        let bundled = self
            .root
            .ancestors()
            .skip(1)
            .map(|dir| dir.join(NODE_MODULES_DIR).join(HARDHAT_UPGRADES_PROXY_ARTIFACT))
            .find(|path| path.is_file());
        Ok(bundled)
    }

    /// Lock the artifact cache
    fn cache(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<Artifact>>>, ScriptError> {
        self.cache
            .lock()
            .map_err(|_| ScriptError::ArtifactParsing("artifact cache poisoned".to_string()))
    }
}

/// Search `dir` recursively for `<contract_name>.json`.
///
/// Hardhat nests artifacts under a directory named after the source file,
/// e.g. `artifacts/contracts/Foo.sol/Foo.json`; the file directly inside
/// `Foo.sol` is preferred over any deeper match.
fn find_artifact(dir: &Path, contract_name: &str) -> Result<Option<PathBuf>, ScriptError> {
    let candidate = dir.join(format!("{contract_name}.{ARTIFACT_EXTENSION}"));
    if candidate.is_file() {
        return Ok(Some(candidate));
    }

    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let is_build_info = path.file_name().is_some_and(|name| name == BUILD_INFO_DIR);
            (path.is_dir() && !is_build_info).then_some(path)
        })
        .collect();
    // Visit the source directories first, then the rest in a stable order
    subdirs.sort_by_key(|path| {
        let is_source_dir = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(SOLIDITY_SOURCE_DIR_SUFFIX));
        (!is_source_dir, path.clone())
    });

    for subdir in subdirs {
        if let Some(path) = find_artifact(&subdir, contract_name)? {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
