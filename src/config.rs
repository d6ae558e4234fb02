use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Linkup realtime gateway
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "linkup-realtime", version, about = "Linkup realtime gateway")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "LINKUP_PORT", default_value = "4010")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "LINKUP_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./linkup.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "LINKUP_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for the JWT signing secret shared with the auth service
    #[arg(long, env = "LINKUP_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Realtime tunables (loaded from [realtime] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Tunables for the presence and event-routing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Minimum interval between accepted chat messages per connection, in
    /// milliseconds (default: 100 = max 10 messages/sec)
    #[serde(default = "default_message_min_interval")]
    pub message_min_interval_ms: u64,

    /// Seconds without a renewed typing event before an implicit
    /// stopped-typing fires (default: 3)
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_secs: u64,

    /// Interval in seconds between stale-connection sweeps (default: 60)
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            message_min_interval_ms: 100,
            typing_timeout_secs: 3,
            reaper_interval_secs: 60,
        }
    }
}

fn default_message_min_interval() -> u64 {
    100
}

fn default_typing_timeout() -> u64 {
    3
}

fn default_reaper_interval() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4010,
            bind_address: "0.0.0.0".to_string(),
            config: "./linkup.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            realtime: RealtimeConfig::default(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (LINKUP_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("LINKUP_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Linkup Realtime Gateway Configuration
# Place this file at ./linkup.toml or specify with --config <path>
# All settings can be overridden via environment variables (LINKUP_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 4010)
# port = 4010

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the JWT signing secret.
# Must be shared with (or copied from) the auth service so access tokens
# validate here.
# data_dir = "./data"

# ---- Realtime Layer ----
# [realtime]

# Minimum interval between accepted chat messages per connection, in
# milliseconds (default: 100 = max 10 messages/sec)
# message_min_interval_ms = 100

# Seconds without a renewed typing event before an implicit stopped-typing
# fires (default: 3)
# typing_timeout_secs = 3

# Interval in seconds between stale-connection sweeps (default: 60)
# reaper_interval_secs = 60
"#
    .to_string()
}
