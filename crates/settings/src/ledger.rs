use std::fmt;
use std::time::Duration;

use lootledger_core::Address;
use serde::{Deserialize, Serialize};

use crate::{Result, SettingsError};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "LOOTLEDGER_";

/// Immutable configuration of the ledger client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger contract address; empty means unset.
    pub contract_address: String,
    pub rpc_url: String,
    /// Hex secret of the signing credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Credential file, used when `private_key` is not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    /// Ask the ledger to render the round chart instead of linking the charter.
    pub onchain_chart: bool,
    /// When false the reporting screen shows the closed notice and never
    /// touches the ledger.
    pub open: bool,
    pub confirmation_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Gas limit used when estimation fails.
    pub gas_limit: u64,
    /// Where the static leaderboard lives.
    pub charter_link: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            rpc_url: "http://localhost:8545".to_string(),
            private_key: None,
            key_file: None,
            onchain_chart: false,
            open: true,
            confirmation_timeout_secs: 120,
            poll_interval_ms: 1000,
            gas_limit: 500_000,
            charter_link: "/charter".to_string(),
        }
    }
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("contract_address", &self.contract_address)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("onchain_chart", &self.onchain_chart)
            .field("open", &self.open)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("gas_limit", &self.gas_limit)
            .field("charter_link", &self.charter_link)
            .finish()
    }
}

impl LedgerConfig {
    /// Apply `LOOTLEDGER_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("CONTRACT_ADDRESS") {
            self.contract_address = v;
        }
        if let Some(v) = var("RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = var("PRIVATE_KEY") {
            self.private_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = var("KEY_FILE") {
            self.key_file = Some(v).filter(|k| !k.is_empty());
        }
        // Opt-in: only the literal "true" turns the on-ledger chart on.
        if let Some(v) = var("ONCHAIN_CHART") {
            self.onchain_chart = v == "true";
        }
        // Opt-out: only the literal "false" closes the screen.
        if let Some(v) = var("OPEN") {
            self.open = v != "false";
        }
        if let Some(v) = var("CONFIRMATION_TIMEOUT_SECS") {
            self.confirmation_timeout_secs = parse_number("CONFIRMATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = var("GAS_LIMIT") {
            self.gas_limit = parse_number("GAS_LIMIT", &v)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.contract()?;
        if self.rpc_url.trim().is_empty() {
            return Err(invalid("rpc_url", "must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be positive"));
        }
        Ok(())
    }

    /// Parsed contract address, `None` when unset.
    pub fn contract(&self) -> Result<Option<Address>> {
        let raw = self.contract_address.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|e: lootledger_core::AddressError| invalid("contract_address", &e.to_string()))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, &format!("not a number: {value}")))
}

fn invalid(key: &str, reason: &str) -> SettingsError {
    SettingsError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.rpc_url, "http://localhost:8545");
        assert!(cfg.open);
        assert!(!cfg.onchain_chart);
        assert_eq!(cfg.contract().unwrap(), None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cfg = LedgerConfig::default()
            .with_overrides(lookup(&[
                ("CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
                ("RPC_URL", "http://node:8545"),
                ("PRIVATE_KEY", "0xabc"),
                ("ONCHAIN_CHART", "true"),
                ("OPEN", "false"),
                ("CONFIRMATION_TIMEOUT_SECS", "30"),
            ]))
            .unwrap();
        assert_eq!(cfg.rpc_url, "http://node:8545");
        assert_eq!(cfg.private_key.as_deref(), Some("0xabc"));
        assert!(cfg.onchain_chart);
        assert!(!cfg.open);
        assert_eq!(cfg.confirmation_timeout(), Duration::from_secs(30));
        assert!(cfg.contract().unwrap().is_some());
    }

    #[test]
    fn test_flag_literals() {
        let cfg = LedgerConfig::default()
            .with_overrides(lookup(&[("ONCHAIN_CHART", "yes"), ("OPEN", "0")]))
            .unwrap();
        assert!(!cfg.onchain_chart);
        assert!(cfg.open);
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let err = LedgerConfig::default()
            .with_overrides(lookup(&[("GAS_LIMIT", "lots")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { ref key, .. } if key == "GAS_LIMIT"));
    }

    #[test]
    fn test_bad_contract_fails_validation() {
        let cfg = LedgerConfig {
            contract_address: "0x12".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let cfg = LedgerConfig {
            private_key: Some("0xdeadbeef".into()),
            ..Default::default()
        };
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("deadbeef"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let cfg: LedgerConfig = serde_json::from_str(r#"{ "onchain_chart": true }"#).unwrap();
        assert!(cfg.onchain_chart);
        assert_eq!(cfg.poll_interval_ms, 1000);
    }
}
