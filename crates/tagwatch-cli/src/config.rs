//! Runtime configuration.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. command-line flags and `TAGWATCH_*` environment variables
//!
//! ```toml
//! [wifi]
//! ssid = "workshop"
//! password = "secret"
//! connect_timeout_secs = 60
//!
//! [mqtt]
//! host = "10.0.0.2"
//! port = 1883
//! client_id = "door-1"
//! user = "door"
//! password = "secret"
//! topic_prefix = "rc522"
//! timeout_ms = 3000
//!
//! [cards]
//! "1036396588" = "Wies"
//! "571511444" = "Tim"
//! ```

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tagwatch_controller::ControllerConfig;
use tagwatch_core::constants::{DEFAULT_MQTT_PORT, DEFAULT_MQTT_TIMEOUT_MS, DEFAULT_TOPIC_PREFIX};
use tagwatch_core::{CardId, CardRegistry};
use tagwatch_network::MqttClientConfig;

/// Configuration flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "TAGWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Wireless network name
    #[arg(long, global = true, env = "TAGWATCH_WIFI_SSID")]
    pub wifi_ssid: Option<String>,

    /// Wireless network password
    #[arg(long, global = true, env = "TAGWATCH_WIFI_PASSWORD", hide_env_values = true)]
    pub wifi_password: Option<String>,

    /// Give up joining the network after this many seconds (default: wait forever)
    #[arg(long, global = true, env = "TAGWATCH_WIFI_TIMEOUT_SECS")]
    pub wifi_timeout_secs: Option<u64>,

    /// MQTT broker host
    #[arg(long, global = true, env = "TAGWATCH_MQTT_HOST")]
    pub mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long, global = true, env = "TAGWATCH_MQTT_PORT")]
    pub mqtt_port: Option<u16>,

    /// MQTT client identifier (default: tagwatch-<random>)
    #[arg(long, global = true, env = "TAGWATCH_MQTT_CLIENT_ID")]
    pub mqtt_client_id: Option<String>,

    /// MQTT user name
    #[arg(long, global = true, env = "TAGWATCH_MQTT_USER")]
    pub mqtt_user: Option<String>,

    /// MQTT password
    #[arg(long, global = true, env = "TAGWATCH_MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    /// Topic prefix for scan notifications
    #[arg(long, global = true, env = "TAGWATCH_TOPIC_PREFIX")]
    pub topic_prefix: Option<String>,

    /// Timeout for each broker I/O step, in milliseconds
    #[arg(long, global = true, env = "TAGWATCH_MQTT_TIMEOUT_MS")]
    pub mqtt_timeout_ms: Option<u64>,
}

/// On-disk configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub wifi: WifiSection,

    #[serde(default)]
    pub mqtt: MqttSection,

    /// `"<decimal id>" = "name"`
    pub cards: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WifiSection {
    pub ssid: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub client_id: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Wireless settings after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiSettings {
    pub ssid: String,
    pub password: String,
    pub connect_timeout: Option<Duration>,
}

/// Broker settings after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub timeout: Duration,
}

/// Fully resolved and validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub wifi: WifiSettings,
    pub mqtt: MqttSettings,
    pub registry: CardRegistry,
}

impl Settings {
    /// Load the file named by `args` (if any) and apply overrides.
    pub fn resolve(args: &ConfigArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(file, args)
    }

    /// Merge a parsed file with command-line overrides and validate.
    pub fn merge(file: FileConfig, args: &ConfigArgs) -> Result<Self> {
        let FileConfig { wifi, mqtt, cards } = file;

        let ssid = args.wifi_ssid.clone().or(wifi.ssid).unwrap_or_default();
        if ssid.trim().is_empty() {
            bail!("WiFi SSID is required (--wifi-ssid, TAGWATCH_WIFI_SSID or [wifi] ssid)");
        }

        let host = args.mqtt_host.clone().or(mqtt.host).unwrap_or_default();
        if host.trim().is_empty() {
            bail!("MQTT host is required (--mqtt-host, TAGWATCH_MQTT_HOST or [mqtt] host)");
        }

        let port = args.mqtt_port.or(mqtt.port).unwrap_or(DEFAULT_MQTT_PORT);
        if port == 0 {
            bail!("MQTT port must be non-zero");
        }

        let client_id = args
            .mqtt_client_id
            .clone()
            .or(mqtt.client_id)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("tagwatch-{}", uuid::Uuid::new_v4().simple()));

        let topic_prefix = args
            .topic_prefix
            .clone()
            .or(mqtt.topic_prefix)
            .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string());
        if topic_prefix.trim_matches('/').is_empty() {
            bail!("Topic prefix must not be empty");
        }

        let timeout_ms = args
            .mqtt_timeout_ms
            .or(mqtt.timeout_ms)
            .unwrap_or(DEFAULT_MQTT_TIMEOUT_MS);
        if timeout_ms == 0 {
            bail!("MQTT timeout must be non-zero");
        }

        let user = args.mqtt_user.clone().or(mqtt.user);
        let password = args.mqtt_password.clone().or(mqtt.password);
        if password.is_some() && user.is_none() {
            bail!("MQTT password given without a user");
        }

        let registry = match cards {
            Some(cards) => parse_cards(&cards)?,
            None => CardRegistry::reference(),
        };

        Ok(Self {
            wifi: WifiSettings {
                ssid,
                password: args.wifi_password.clone().or(wifi.password).unwrap_or_default(),
                connect_timeout: args
                    .wifi_timeout_secs
                    .or(wifi.connect_timeout_secs)
                    .map(Duration::from_secs),
            },
            mqtt: MqttSettings {
                host,
                port,
                client_id,
                user,
                password,
                topic_prefix,
                timeout: Duration::from_millis(timeout_ms),
            },
            registry,
        })
    }

    pub fn client_config(&self) -> MqttClientConfig {
        let mut config = MqttClientConfig::new(&self.mqtt.host, self.mqtt.port, &self.mqtt.client_id)
            .with_timeout(self.mqtt.timeout);
        config.username = self.mqtt.user.clone();
        config.password = self.mqtt.password.clone();
        config
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            topic_prefix: self.mqtt.topic_prefix.clone(),
            ..ControllerConfig::default()
        }
    }
}

fn parse_cards(cards: &BTreeMap<String, String>) -> Result<CardRegistry> {
    let entries = cards
        .iter()
        .map(|(id, name)| {
            let id: CardId = id
                .trim()
                .parse()
                .with_context(|| format!("Card id {id:?} is not a decimal number"))?;
            Ok((id, name.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    CardRegistry::new(entries).context("Invalid [cards] table")
}
