//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};

use clashcast_judge::SelectionMethod;

use crate::error::EngineError;

/// Configuration for the battle engine and its servers.
///
/// Loadable from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default
/// so a partial file is enough.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long each battle runs, in seconds.
    #[serde(default = "default_battle_duration")]
    pub battle_duration_secs: u64,

    /// Interval between sweep runs, in seconds. Tighter intervals
    /// trade CPU for payout latency; 60-300 is the sane range.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Interval between TIMER_UPDATE broadcasts, in seconds.
    #[serde(default = "default_timer_sync_interval")]
    pub timer_sync_interval_secs: u64,

    /// Interval between HEARTBEAT broadcasts, in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Winner-selection method.
    #[serde(default)]
    pub selection_method: SelectionMethod,

    /// Whether the sweep starts a fresh battle right after completing
    /// one (and at startup when none is active).
    #[serde(default = "default_true")]
    pub auto_restart: bool,

    /// HTTP API port.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// WebSocket port for live updates.
    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// Chain id of the settlement network (domain separator field).
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Escrow contract address (domain separator field). Payouts are
    /// disabled when empty.
    #[serde(default)]
    pub escrow_contract: String,

    /// Escrow chain gateway URL. Payouts are disabled when empty.
    #[serde(default)]
    pub chain_gateway_url: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_battle_duration() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_timer_sync_interval() -> u64 {
    15
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_rpc_port() -> u16 {
    8090
}

fn default_ws_port() -> u16 {
    8091
}

fn default_chain_id() -> u64 {
    8453
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("EngineConfig is always serializable to TOML")
    }

    /// Whether enough chain settings are present to attempt payouts.
    pub fn payouts_enabled(&self) -> bool {
        !self.escrow_contract.is_empty() && !self.chain_gateway_url.is_empty()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            battle_duration_secs: default_battle_duration(),
            sweep_interval_secs: default_sweep_interval(),
            timer_sync_interval_secs: default_timer_sync_interval(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            selection_method: SelectionMethod::default(),
            auto_restart: default_true(),
            rpc_port: default_rpc_port(),
            websocket_port: default_ws_port(),
            chain_id: default_chain_id(),
            escrow_contract: String::new(),
            chain_gateway_url: String::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = EngineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.sweep_interval_secs, config.sweep_interval_secs);
        assert_eq!(parsed.selection_method, config.selection_method);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.battle_duration_secs, 3600);
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.selection_method, SelectionMethod::Hybrid);
        assert!(config.auto_restart);
        assert!(!config.payouts_enabled());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            sweep_interval_secs = 120
            selection_method = "vote-based"
        "#;
        let config = EngineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.sweep_interval_secs, 120);
        assert_eq!(config.selection_method, SelectionMethod::VoteBased);
        assert_eq!(config.rpc_port, 8090); // default
    }

    #[test]
    fn payouts_require_both_chain_settings() {
        let mut config = EngineConfig::default();
        config.escrow_contract = "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef".into();
        assert!(!config.payouts_enabled());
        config.chain_gateway_url = "http://localhost:9000".into();
        assert!(config.payouts_enabled());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "battle_duration_secs = 900").unwrap();
        let config = EngineConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.battle_duration_secs, 900);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = EngineConfig::from_toml_file("/nonexistent/clashcast.toml");
        assert!(matches!(result.unwrap_err(), EngineError::Config(_)));
    }
}
