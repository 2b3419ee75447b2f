//! Engine configuration.

use std::{fs, path::Path, time::Duration};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use delegation_scope_encoder::EnforcerSet;

use crate::errors::ExecutionError;

pub const DEFAULT_QUOTE_TTL_MS: u64 = 60_000;
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 15_000;
pub const DEFAULT_MAX_SLIPPAGE_BPS: u16 = 5_000;

/// Engine settings, usually loaded from JSON.
///
/// ```json
/// {
///   "enforcers": {
///     "allowed_methods": "0x...",
///     "allowed_targets": "0x...",
///     "logical_or_wrapper": "0x..."
///   },
///   "quote_ttl_ms": 60000,
///   "approved_spenders": ["0x..."]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub enforcers: EnforcerSet,
    #[serde(default = "default_quote_ttl_ms")]
    pub quote_ttl_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: u16,
    /// Spenders an `approve` quote may name. Empty disables the check; the on-chain approve
    /// group never restricts the token or spender.
    #[serde(default)]
    pub approved_spenders: Vec<Address>,
    /// Evaluate the selected group against the bound call before handing it out.
    #[serde(default = "default_preflight")]
    pub preflight: bool,
}

fn default_quote_ttl_ms() -> u64 {
    DEFAULT_QUOTE_TTL_MS
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

fn default_max_slippage_bps() -> u16 {
    DEFAULT_MAX_SLIPPAGE_BPS
}

fn default_preflight() -> bool {
    true
}

impl EngineConfig {
    pub fn new(enforcers: EnforcerSet) -> Self {
        Self {
            enforcers,
            quote_ttl_ms: DEFAULT_QUOTE_TTL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            approved_spenders: Vec::new(),
            preflight: true,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ExecutionError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ExecutionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ExecutionError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        let e = &self.enforcers;
        if e.allowed_methods == Address::ZERO
            || e.allowed_targets == Address::ZERO
            || e.logical_or_wrapper == Address::ZERO
        {
            return Err(ExecutionError::Config("enforcer addresses must be non-zero".into()));
        }
        if e.allowed_methods == e.allowed_targets
            || e.allowed_methods == e.logical_or_wrapper
            || e.allowed_targets == e.logical_or_wrapper
        {
            return Err(ExecutionError::Config("enforcer addresses must be distinct".into()));
        }
        if self.quote_ttl_ms == 0 {
            return Err(ExecutionError::Config("quote_ttl_ms must be positive".into()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ExecutionError::Config("sweep_interval_ms must be positive".into()));
        }
        if self.max_slippage_bps > 10_000 {
            return Err(ExecutionError::Config("max_slippage_bps exceeds 10000".into()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENFORCERS: &str = r#"{
        "allowed_methods": "0x1111111111111111111111111111111111111111",
        "allowed_targets": "0x2222222222222222222222222222222222222222",
        "logical_or_wrapper": "0x3333333333333333333333333333333333333333"
    }"#;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = EngineConfig::from_json_str(&format!(r#"{{"enforcers": {ENFORCERS}}}"#)).unwrap();
        assert_eq!(config.quote_ttl_ms, DEFAULT_QUOTE_TTL_MS);
        assert_eq!(config.max_slippage_bps, DEFAULT_MAX_SLIPPAGE_BPS);
        assert!(config.approved_spenders.is_empty());
        assert!(config.preflight);
    }

    #[test]
    fn rejects_zero_enforcer() {
        let raw = r#"{"enforcers": {
            "allowed_methods": "0x0000000000000000000000000000000000000000",
            "allowed_targets": "0x2222222222222222222222222222222222222222",
            "logical_or_wrapper": "0x3333333333333333333333333333333333333333"
        }}"#;
        assert!(matches!(
            EngineConfig::from_json_str(raw),
            Err(ExecutionError::Config(_))
        ));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_ttl() {
        let unknown = format!(r#"{{"enforcers": {ENFORCERS}, "ttl": 5}}"#);
        assert!(EngineConfig::from_json_str(&unknown).is_err());
        let zero_ttl = format!(r#"{{"enforcers": {ENFORCERS}, "quote_ttl_ms": 0}}"#);
        assert!(EngineConfig::from_json_str(&zero_ttl).is_err());
    }
}
