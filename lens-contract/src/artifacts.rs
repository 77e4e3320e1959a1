//! Compiled contract artifacts and constructor argument encoding.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use lens_address_book::{BytecodeHash, FingerprintError};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no artifact named {0} under {1}")]
    NotFound(String, PathBuf),

    #[error("io error on {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    #[error("malformed artifact {0}: {1}")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("{contract} expects {expected} constructor arguments, got {got}")]
    ArgCount {
        contract: String,
        expected: usize,
        got: usize,
    },

    #[error("{contract}: invalid constructor argument {param}: {reason}")]
    InvalidArg {
        contract: String,
        param: String,
        reason: String,
    },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    #[serde(default)]
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
    /// Runtime bytecode, if the compiler emitted it separately.
    #[serde(default)]
    pub deployed_bytecode: Bytes,
}

impl Artifact {
    pub fn new<S: Into<String>>(contract_name: S, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            contract_name: contract_name.into(),
            abi,
            bytecode,
            deployed_bytecode: Bytes::new(),
        }
    }

    /// Fingerprint of the creation bytecode, the value recorded in the
    /// address book.
    pub fn fingerprint(&self) -> Result<BytecodeHash, FingerprintError> {
        BytecodeHash::of(&self.bytecode)
    }

    /// Fingerprint expected for the code found on-chain after deployment.
    ///
    /// On zkSync the deployed code is the compiled bytecode itself, so both
    /// fingerprints agree when no separate runtime code is present.
    pub fn runtime_fingerprint(&self) -> Result<BytecodeHash, FingerprintError> {
        if self.deployed_bytecode.is_empty() {
            self.fingerprint()
        } else {
            BytecodeHash::of(&self.deployed_bytecode)
        }
    }

    /// ABI-encode JSON constructor arguments against the constructor ABI.
    pub fn encode_constructor(&self, args: &[Value]) -> Result<Bytes, ArtifactError> {
        let inputs = self
            .abi
            .constructor()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default();
        if inputs.len() != args.len() {
            return Err(ArtifactError::ArgCount {
                contract: self.contract_name.clone(),
                expected: inputs.len(),
                got: args.len(),
            });
        }
        if inputs.is_empty() {
            return Ok(Bytes::new());
        }
        let values = inputs
            .iter()
            .zip(args)
            .map(|(p, v)| {
                param_value(p, v).map_err(|reason| ArtifactError::InvalidArg {
                    contract: self.contract_name.clone(),
                    param: p.name.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DynSolValue::Tuple(values).abi_encode_params().into())
    }
}

fn param_value(param: &Param, value: &Value) -> Result<DynSolValue, String> {
    if param.ty.starts_with("tuple") {
        if let Some(outer) = param.ty.strip_suffix(']') {
            let Some((inner, dim)) = outer.rsplit_once('[') else {
                return Err(format!("bad type {}", param.ty));
            };
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected an array for {}", param.ty))?;
            let mut elem = param.clone();
            elem.ty = inner.to_string();
            let vals = items
                .iter()
                .map(|i| param_value(&elem, i))
                .collect::<Result<Vec<_>, _>>()?;
            if dim.is_empty() {
                return Ok(DynSolValue::Array(vals));
            }
            if dim.parse::<usize>().ok() != Some(vals.len()) {
                return Err(format!("expected {dim} elements for {}", param.ty));
            }
            return Ok(DynSolValue::FixedArray(vals));
        }
        let fields = param
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let v = match value {
                    Value::Object(map) => map.get(&c.name),
                    Value::Array(items) => items.get(i),
                    _ => None,
                }
                .ok_or_else(|| format!("missing struct field {}", c.name))?;
                param_value(c, v)
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(DynSolValue::Tuple(fields));
    }
    let ty: DynSolType = param.resolve().map_err(|e| e.to_string())?;
    coerce(&ty, value)
}

fn coerce(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => Ok(DynSolValue::Array(
            items
                .iter()
                .map(|v| coerce(inner, v))
                .collect::<Result<_, _>>()?,
        )),
        (DynSolType::FixedArray(inner, n), Value::Array(items)) if items.len() == *n => {
            Ok(DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|v| coerce(inner, v))
                    .collect::<Result<_, _>>()?,
            ))
        }
        (_, Value::String(s)) => ty.coerce_str(s).map_err(|e| e.to_string()),
        (_, Value::Number(n)) => ty.coerce_str(&n.to_string()).map_err(|e| e.to_string()),
        (_, Value::Bool(b)) => ty.coerce_str(&b.to_string()).map_err(|e| e.to_string()),
        _ => Err(format!("can not encode {value} as {ty}")),
    }
}

/// Artifacts by contract name, read from a hardhat artifacts directory and
/// cached.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    root: Option<PathBuf>,
    cache: Mutex<HashMap<String, Arc<Artifact>>>,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: Some(root.into()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A store that only knows what is [inserted](Self::insert).
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn insert(&self, artifact: Artifact) {
        self.cache
            .lock()
            .insert(artifact.contract_name.clone(), Arc::new(artifact));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Artifact>, ArtifactError> {
        if let Some(a) = self.cache.lock().get(name) {
            return Ok(a.clone());
        }
        let root = self.root.clone().unwrap_or_default();
        let path = find(&root, &format!("{name}.json"))?
            .ok_or_else(|| ArtifactError::NotFound(name.to_string(), root.clone()))?;
        debug!(%name, path = %path.display(), "loading artifact");
        let bytes = fs::read(&path).map_err(|e| ArtifactError::Io(path.clone(), e))?;
        let artifact: Artifact =
            serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Json(path, e))?;
        let artifact = Arc::new(artifact);
        self.cache.lock().insert(name.to_string(), artifact.clone());
        Ok(artifact)
    }
}

/// Depth-first search for a file called `file_name`.
fn find(dir: &Path, file_name: &str) -> Result<Option<PathBuf>, ArtifactError> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ArtifactError::Io(dir.to_path_buf(), e)),
    };
    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArtifactError::Io(dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name() == file_name {
            return Ok(Some(path));
        }
    }
    subdirs.sort();
    for sub in subdirs {
        if let Some(p) = find(&sub, file_name)? {
            return Ok(Some(p));
        }
    }
    Ok(None)
}
