use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{read_keypair_file, Keypair},
};
use solbatch_batch_tx::{BatchOptions, BatchResult, RawOperation};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Operations file structure (YAML or JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationsFile {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub operations: Vec<OperationEntry>,
}

/// Connection and batching settings; command-line flags take precedence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub rpc_url: Option<String>,

    /// processed, confirmed or finalized
    pub commitment: Option<String>,

    /// Signer for operations without a `sender_keypair`
    pub default_keypair: Option<PathBuf>,

    pub fee_payer_keypair: Option<PathBuf>,

    pub max_parallel: Option<usize>,
    pub delay_between_ms: Option<u64>,
    pub retry_failed: Option<bool>,
    pub disable_fallback_retry: Option<bool>,
    pub dynamic_batching: Option<bool>,
    pub skip_preflight: Option<bool>,
}

/// One operation plus the keypair that signs it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationEntry {
    #[serde(flatten)]
    pub operation: RawOperation,

    #[serde(default)]
    pub sender_keypair: Option<PathBuf>,
}

impl OperationsFile {
    /// Parse by extension: `.yaml`/`.yml` as YAML, anything else as JSON
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    pub fn raw_operations(&self) -> Vec<RawOperation> {
        self.operations
            .iter()
            .map(|entry| entry.operation.clone())
            .collect()
    }
}

impl Settings {
    pub fn commitment(&self) -> CliResult<CommitmentConfig> {
        match &self.commitment {
            None => Ok(CommitmentConfig::confirmed()),
            Some(level) => CommitmentConfig::from_str(level)
                .map_err(|_| CliError::InvalidConfig(format!("unknown commitment '{}'", level))),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        let defaults = BatchOptions::default();
        BatchOptions {
            max_parallel: self.max_parallel.unwrap_or(defaults.max_parallel),
            delay_between: self
                .delay_between_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay_between),
            retry_failed: self.retry_failed.unwrap_or(defaults.retry_failed),
            disable_fallback_retry: self
                .disable_fallback_retry
                .unwrap_or(defaults.disable_fallback_retry),
            dynamic_batching: self.dynamic_batching.unwrap_or(defaults.dynamic_batching),
            fee_payer: None,
        }
    }
}

/// Loads each keypair file once, so operations naming the same file share a signer
#[derive(Default)]
pub struct KeypairCache {
    loaded: HashMap<PathBuf, Arc<Keypair>>,
}

impl KeypairCache {
    pub fn load(&mut self, path: &Path) -> CliResult<Arc<Keypair>> {
        if let Some(keypair) = self.loaded.get(path) {
            return Ok(keypair.clone());
        }
        let keypair = read_keypair_file(path).map_err(|e| CliError::Keypair {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let keypair = Arc::new(keypair);
        self.loaded.insert(path.to_path_buf(), keypair.clone());
        Ok(keypair)
    }
}

/// Serializable form of one operation's outcome
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub operation_id: String,
    #[serde(rename = "type")]
    pub operation_type: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&BatchResult> for ResultRecord {
    fn from(result: &BatchResult) -> Self {
        Self {
            operation_id: result.operation_id.clone(),
            operation_type: result.operation_type.to_string(),
            success: result.success,
            signature: result.signature.map(|s| s.to_string()),
            error: result.error.clone(),
        }
    }
}
