//! tagwatch - RFID access appliance
//!
//! This binary runs the appliance on a development host:
//! - joins the network (the host stack stands in for the wireless module)
//! - feeds the reader from stdin and renders indicators on mock lines
//! - publishes every scan to the MQTT broker
//! - `mqtt-test` checks broker connectivity and credentials

mod config;
mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::info;

use tagwatch_controller::ControlLoop;
use tagwatch_hardware::IndicatorPanel;
use tagwatch_hardware::mock::{MockLine, MockReader};
use tagwatch_network::{HostLink, InterfaceConfig, MqttPublisher, NetworkSession};

use crate::config::{ConfigArgs, Settings};

#[derive(Parser)]
#[command(name = "tagwatch")]
#[command(version)]
#[command(about = "RFID access appliance with MQTT scan notifications")]
#[command(long_about = "
tagwatch polls an RFID reader, checks each card against the authorized list,
lights the green or red indicator with a buzzer pattern and publishes the
result to an MQTT broker.

Quick start:
  1. Check the broker:  tagwatch --wifi-ssid lab --mqtt-host 10.0.0.2 mqtt-test
  2. Run the reader:    tagwatch --config tagwatch.toml run

On a development host, tags are typed on stdin as a hex UID (2C:28:C6:3D)
or as a card number (1036396588).
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reader loop until interrupted
    Run,

    /// Connect to the broker once and report whether it worked
    #[command(alias = "test")]
    MqttTest,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                [
                    "tagwatch",
                    "tagwatch_core",
                    "tagwatch_hardware",
                    "tagwatch_network",
                    "tagwatch_controller",
                ]
                .iter()
                .map(|target| format!("{target}={log_level}"))
                .collect::<Vec<_>>()
                .join(",")
                .into()
            }),
        )
        .with_target(false)
        .init();

    let settings = Settings::resolve(&cli.config)?;

    match cli.command {
        Commands::Run => cmd_run(settings).await,
        Commands::MqttTest => cmd_mqtt_test(settings).await,
    }
}

async fn join_network(settings: &Settings) -> Result<InterfaceConfig> {
    let mut link = HostLink::new(&settings.mqtt.host, settings.mqtt.port);
    NetworkSession::new()
        .with_timeout(settings.wifi.connect_timeout)
        .connect(&mut link, &settings.wifi.ssid, &settings.wifi.password)
        .await
        .with_context(|| format!("Failed to join network {}", settings.wifi.ssid))
}

async fn cmd_run(settings: Settings) -> Result<ExitCode> {
    join_network(&settings).await?;

    let (reader, handle) = MockReader::new();
    let panel = IndicatorPanel::new(
        MockLine::new("red"),
        MockLine::new("green"),
        MockLine::new("buzzer"),
    );
    let publisher = MqttPublisher::new(settings.client_config());
    let controller_config = settings.controller_config();
    let mut control = ControlLoop::new(reader, panel, settings.registry, publisher, controller_config);

    // Detached: a pending stdin read must not delay exit.
    console::spawn_stdin(handle)?;

    info!("Bring RFID TAG Closer...");

    tokio::select! {
        _ = control.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
        }
    }

    info!(scans = control.scans(), "Shutting down");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_mqtt_test(settings: Settings) -> Result<ExitCode> {
    join_network(&settings).await?;

    let publisher = MqttPublisher::new(settings.client_config());
    match publisher.check_connection().await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
