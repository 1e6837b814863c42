//! Verifier engine configuration.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AC_VERIFIER_CONTRACT_ADDRESS` | unset | Watched contract address |
//! | `AC_VERIFIER_CONTRACT_ALIAS` | `assetclassificationalias.pb` | Alias resolved when no address is set |
//! | `AC_VERIFIER_CHAIN_ID` | `pio-testnet-1` | Chain id signed into transactions |
//! | `AC_VERIFIER_GAS_LIMIT` | `400000` | Gas limit per verification |
//! | `AC_VERIFIER_FEE_AMOUNT` | `762000000` | Fee per verification |
//! | `AC_VERIFIER_FEE_DENOM` | `nhash` | Fee denomination |
//! | `AC_VERIFIER_RESTART_MODE` | `exponential` | `off`, `fixed` or `exponential` |
//! | `AC_VERIFIER_RESTART_DELAY_MS` | `1000` | Base restart delay, `0` for immediate |
//! | `AC_VERIFIER_RESTART_MAX_DELAY_MS` | `300000` | Exponential backoff cap |
//! | `AC_VERIFIER_SHUTDOWN_TIMEOUT_MS` | `5000` | Per-task join timeout on stop |

use shared_types::{BroadcastMode, Coin, Fee};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Backoff, RestartConfig, RestartMode};
use crate::error::ConfigError;

pub const DEFAULT_CONTRACT_ALIAS: &str = "assetclassificationalias.pb";
pub const DEFAULT_CHAIN_ID: &str = "pio-testnet-1";
pub const DEFAULT_GAS_LIMIT: u64 = 400_000;
pub const DEFAULT_FEE_AMOUNT: u128 = 762_000_000;
pub const DEFAULT_FEE_DENOM: &str = "nhash";
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How the watched contract is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractIdentifier {
    Address(String),
    /// Name-service alias, resolved once when the service is built.
    Alias(String),
}

impl ContractIdentifier {
    fn value(&self) -> &str {
        match self {
            ContractIdentifier::Address(value) | ContractIdentifier::Alias(value) => value,
        }
    }
}

/// Fee attached to each verification transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeConfig {
    pub gas_limit: u64,
    pub amount: u128,
    pub denom: String,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            amount: DEFAULT_FEE_AMOUNT,
            denom: DEFAULT_FEE_DENOM.to_string(),
        }
    }
}

impl FeeConfig {
    pub fn to_fee(&self) -> Fee {
        Fee {
            amount: vec![Coin::new(self.amount, self.denom.clone())],
            gas_limit: self.gas_limit,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Contract whose events are processed
    pub contract: ContractIdentifier,
    /// Chain id signed into every transaction
    pub chain_id: String,
    pub fee: FeeConfig,
    /// Block stream restart behaviour
    pub restart: RestartConfig,
    /// Broadcast mode for verification transactions
    pub broadcast_mode: BroadcastMode,
    /// How long `stop` waits for each task before aborting it
    pub shutdown_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            contract: ContractIdentifier::Alias(DEFAULT_CONTRACT_ALIAS.to_string()),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            fee: FeeConfig::default(),
            restart: RestartConfig::default(),
            broadcast_mode: BroadcastMode::Async,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl VerifierConfig {
    /// Configuration watching the contract at `address`.
    pub fn for_contract(address: impl Into<String>) -> Self {
        Self {
            contract: ContractIdentifier::Address(address.into()),
            ..Self::default()
        }
    }

    /// Create configuration from `AC_VERIFIER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let contract = match (
            get("AC_VERIFIER_CONTRACT_ADDRESS"),
            get("AC_VERIFIER_CONTRACT_ALIAS"),
        ) {
            (Some(address), _) => ContractIdentifier::Address(address),
            (None, Some(alias)) => ContractIdentifier::Alias(alias),
            (None, None) => defaults.contract,
        };

        let restart_mode = get("AC_VERIFIER_RESTART_MODE").unwrap_or_else(|| "exponential".into());
        let delay_ms = parse(&get, "AC_VERIFIER_RESTART_DELAY_MS")?
            .unwrap_or(defaults.restart.delay_ms);
        let max_delay_ms = parse(&get, "AC_VERIFIER_RESTART_MAX_DELAY_MS")?
            .unwrap_or(crate::domain::DEFAULT_MAX_BACKOFF_MS);
        let restart = match restart_mode.to_ascii_lowercase().as_str() {
            "off" | "disabled" => RestartConfig {
                delay_ms,
                ..RestartConfig::disabled()
            },
            "fixed" => RestartConfig::fixed(delay_ms),
            "exponential" => RestartConfig::exponential(delay_ms, max_delay_ms),
            _ => return Err(ConfigError::UnknownRestartMode(restart_mode)),
        };

        let fee = FeeConfig {
            gas_limit: parse(&get, "AC_VERIFIER_GAS_LIMIT")?.unwrap_or(defaults.fee.gas_limit),
            amount: parse(&get, "AC_VERIFIER_FEE_AMOUNT")?.unwrap_or(defaults.fee.amount),
            denom: get("AC_VERIFIER_FEE_DENOM").unwrap_or(defaults.fee.denom),
        };

        let shutdown_timeout = parse::<u64>(&get, "AC_VERIFIER_SHUTDOWN_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.shutdown_timeout);

        let config = Self {
            contract,
            chain_id: get("AC_VERIFIER_CHAIN_ID").unwrap_or(defaults.chain_id),
            fee,
            restart,
            broadcast_mode: defaults.broadcast_mode,
            shutdown_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration and build the restart mode.
    pub fn validate(&self) -> Result<RestartMode, ConfigError> {
        if self.contract.value().trim().is_empty() {
            return Err(ConfigError::MissingContract);
        }
        if self.chain_id.trim().is_empty() {
            return Err(ConfigError::Empty("chain_id"));
        }
        if self.fee.denom.trim().is_empty() {
            return Err(ConfigError::Empty("fee denom"));
        }
        if self.fee.gas_limit == 0 {
            return Err(ConfigError::InvalidEnv {
                var: "AC_VERIFIER_GAS_LIMIT",
                value: "0".into(),
            });
        }
        self.restart.build()
    }

    /// Human-readable restart summary for startup logs.
    pub fn restart_summary(&self) -> String {
        if !self.restart.enabled {
            return "off".into();
        }
        match self.restart.backoff {
            Backoff::Fixed => format!("fixed {}ms", self.restart.delay_ms),
            Backoff::Exponential { max_delay_ms } => {
                format!("exponential {}ms..{}ms", self.restart.delay_ms, max_delay_ms)
            }
        }
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<VerifierConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VerifierConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(
            config.contract,
            ContractIdentifier::Alias(DEFAULT_CONTRACT_ALIAS.into())
        );
        assert_eq!(config.broadcast_mode, BroadcastMode::Async);
        assert_eq!(config.restart_summary(), "exponential 1000ms..300000ms");
    }

    #[test]
    fn test_address_wins_over_alias() {
        let config = config(&[
            ("AC_VERIFIER_CONTRACT_ADDRESS", "tp1contract"),
            ("AC_VERIFIER_CONTRACT_ALIAS", "other.pb"),
        ])
        .unwrap();
        assert_eq!(
            config.contract,
            ContractIdentifier::Address("tp1contract".into())
        );
    }

    #[test]
    fn test_fixed_restart_mode() {
        let config = config(&[
            ("AC_VERIFIER_RESTART_MODE", "fixed"),
            ("AC_VERIFIER_RESTART_DELAY_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.restart_summary(), "fixed 250ms");
    }

    #[test]
    fn test_restart_off() {
        let config = config(&[("AC_VERIFIER_RESTART_MODE", "off")]).unwrap();
        assert_eq!(config.validate(), Ok(RestartMode::Disabled));
    }

    #[test]
    fn test_out_of_bounds_delay_fails_fast() {
        let err = config(&[("AC_VERIFIER_RESTART_DELAY_MS", "-100")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRestartDelay { .. }));
    }

    #[test]
    fn test_unparseable_value() {
        let err = config(&[("AC_VERIFIER_GAS_LIMIT", "lots")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: "AC_VERIFIER_GAS_LIMIT",
                value: "lots".into()
            }
        );
    }

    #[test]
    fn test_unknown_restart_mode() {
        assert!(matches!(
            config(&[("AC_VERIFIER_RESTART_MODE", "sometimes")]),
            Err(ConfigError::UnknownRestartMode(_))
        ));
    }

    #[test]
    fn test_blank_contract_rejected() {
        let config = VerifierConfig::for_contract("  ");
        assert_eq!(config.validate(), Err(ConfigError::MissingContract));
    }

    #[test]
    fn test_fee_conversion() {
        let fee = FeeConfig::default().to_fee();
        assert_eq!(fee.gas_limit, DEFAULT_GAS_LIMIT);
        assert_eq!(fee.amount[0].denom, "nhash");
    }
}
