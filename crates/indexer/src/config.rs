//! Configuration for farmscope.
//!
//! Loaded from a TOML file. `${VAR_NAME}` placeholders are replaced with
//! environment variables before parsing, except inside comments.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use farmscope_core::{ChainAddress, ChainId, PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::events::{DecodeMode, EventRegistry};
use crate::farms::FarmQueries;
use crate::quorum::{HttpIndexer, LogIndexer, QuorumClient, QuorumPolicy};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain the farms live on
    pub network: NetworkConfig,

    /// Farm contract addresses
    pub contracts: ContractsConfig,

    /// Log indexers, queried together for every farm query
    pub indexers: Vec<IndexerConfig>,

    /// Agreement thresholds
    #[serde(default)]
    pub quorum: QuorumConfig,

    /// Reward verifier service (optional: only proof and APR commands need it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<VerifierConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain ID (e.g. 137 for Polygon)
    pub chain_id: ChainId,
}

/// Contract configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// ReferralFarmsV1 contract address
    pub referral_farms: Address,

    /// Referred-token definition marking proportional farms, if the deployment
    /// uses something other than the built-in marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proportional_referred_token_defn: Option<ChainAddress>,
}

/// One log indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Endpoint the filter is POSTed to
    pub url: Url,

    /// Tie-break weight
    #[serde(default)]
    pub reliability: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumConfig {
    /// Shared deadline for all indexers, in milliseconds
    #[serde(default = "default_quorum_timeout_ms")]
    pub timeout_ms: u64,

    /// Indexers that must answer (default: majority of configured indexers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_respondents: Option<usize>,

    /// Minimum winning group size (default: 1; a strict majority of
    /// respondents is always required on top)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_agreeing: Option<usize>,

    /// `strict` fails a query on an undecodable log, `best_effort` skips it
    #[serde(default)]
    pub decode_mode: DecodeMode,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_quorum_timeout_ms(),
            min_respondents: None,
            min_agreeing: None,
            decode_mode: DecodeMode::Strict,
        }
    }
}

/// Reward verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Base URL of the verifier service
    pub url: Url,

    /// Per-request timeout
    #[serde(default = "default_verifier_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_quorum_timeout_ms() -> u64 {
    8_000
}

fn default_verifier_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 2] = ["json", "pretty"];

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// ```no_run
    /// # use farmscope_indexer::config::Config;
    /// let config = Config::from_file("farmscope.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)
            .with_context(|| format!("Failed to expand variables in {}", path.display()))?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string. No variable expansion.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }
        if self.contracts.referral_farms == Address::ZERO {
            anyhow::bail!("Contracts referral_farms must be a non-zero address");
        }

        if self.indexers.is_empty() {
            anyhow::bail!("At least one [[indexers]] entry is required");
        }
        for (i, indexer) in self.indexers.iter().enumerate() {
            check_http_url(&indexer.url).with_context(|| format!("Invalid indexer #{}", i))?;
        }

        let configured = self.indexers.len();
        if self.quorum.timeout_ms == 0 {
            anyhow::bail!("Quorum timeout_ms must be > 0");
        }
        if let Some(min) = self.quorum.min_respondents {
            if min == 0 || min > configured {
                anyhow::bail!(
                    "Quorum min_respondents must be between 1 and {} (got {})",
                    configured,
                    min
                );
            }
        }
        if let Some(min) = self.quorum.min_agreeing {
            if min == 0 || min > configured {
                anyhow::bail!(
                    "Quorum min_agreeing must be between 1 and {} (got {})",
                    configured,
                    min
                );
            }
        }

        if let Some(verifier) = &self.verifier {
            check_http_url(&verifier.url).context("Invalid verifier url")?;
            if verifier.timeout_secs == 0 {
                anyhow::bail!("Verifier timeout_secs must be > 0");
            }
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                VALID_LEVELS.join(", "),
                self.logging.level
            );
        }
        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                VALID_FORMATS.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }

    /// Referred-token definition that marks proportional farms.
    pub fn sentinel(&self) -> ChainAddress {
        self.contracts
            .proportional_referred_token_defn
            .unwrap_or(PROPORTIONAL_FARM_REFERRED_TOKEN_DEFN)
    }

    /// Quorum thresholds with defaults filled in.
    pub fn quorum_policy(&self) -> QuorumPolicy {
        let timeout = Duration::from_millis(self.quorum.timeout_ms);
        let mut policy = QuorumPolicy::majority_of(self.indexers.len(), timeout);
        if let Some(min) = self.quorum.min_respondents {
            policy.min_respondents = min;
        }
        if let Some(min) = self.quorum.min_agreeing {
            policy.min_agreeing = min;
        }
        policy
    }

    /// HTTP clients for every configured indexer.
    pub fn build_indexers(&self) -> Result<Vec<Arc<dyn LogIndexer>>> {
        let timeout = Duration::from_millis(self.quorum.timeout_ms);
        self.indexers
            .iter()
            .map(|cfg| {
                let indexer = HttpIndexer::new(cfg.url.clone(), cfg.reliability, timeout)
                    .with_context(|| format!("Failed to build indexer client for {}", cfg.url))?;
                Ok(Arc::new(indexer) as Arc<dyn LogIndexer>)
            })
            .collect()
    }

    /// Farm queries wired to the configured indexers and contract.
    pub fn farm_queries(&self) -> Result<FarmQueries> {
        let client = QuorumClient::new(self.build_indexers()?, self.quorum_policy());
        Ok(FarmQueries::new(
            client,
            EventRegistry::new(),
            self.contracts.referral_farms,
            self.network.chain_id,
            self.sentinel(),
        )
        .with_decode_mode(self.quorum.decode_mode))
    }
}

fn check_http_url(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("URL must use http or https (got '{}': {})", other, url),
    }
}

/// Replace `${VAR_NAME}` with the variable's value.
///
/// A `#` outside quotes starts a comment running to the end of the line;
/// placeholders inside comments are left alone. Unset variables, empty names
/// and unclosed placeholders are errors.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());

    for (line_no, line) in input.split_inclusive('\n').enumerate() {
        let (code, comment) = line.split_at(comment_start(line).unwrap_or(line.len()));

        let mut rest = code;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').with_context(|| {
                format!("Unclosed environment variable placeholder on line {}", line_no + 1)
            })?;

            let name = &after[..end];
            if name.is_empty() {
                anyhow::bail!("Empty environment variable name on line {}", line_no + 1);
            }
            let value = std::env::var(name).with_context(|| {
                format!(
                    "Environment variable '{}' is not set (referenced on line {})",
                    name,
                    line_no + 1
                )
            })?;
            out.push_str(&value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out.push_str(comment);
    }

    Ok(out)
}

/// Byte offset of a `#` that starts a comment, ignoring ones inside strings.
fn comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '#' => return Some(i),
            None => {}
        }
    }
    None
}
