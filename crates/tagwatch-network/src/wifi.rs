//! Wireless network session (startup only).
//!
//! The appliance joins its network once, before the first reader poll. The
//! join is a blocking wait: activate the interface, request association, then
//! check "is connected" once per second until the link is up.
//!
//! By default there is no upper bound on that wait, matching the deployed
//! appliance, which simply sits at boot until the access point answers. A
//! bound can be set with [`NetworkSession::with_timeout`].

#![allow(async_fn_in_trait)]

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use tagwatch_core::constants::WIFI_POLL_INTERVAL_MS;

use crate::error::NetworkError;

/// Addressing of an up interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub address: IpAddr,
    pub netmask: Option<IpAddr>,
    pub gateway: Option<IpAddr>,
    pub dns: Option<IpAddr>,
}

impl InterfaceConfig {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            netmask: None,
            gateway: None,
            dns: None,
        }
    }
}

impl fmt::Display for InterfaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(addr: &Option<IpAddr>) -> String {
            addr.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "address={} netmask={} gateway={} dns={}",
            self.address,
            opt(&self.netmask),
            opt(&self.gateway),
            opt(&self.dns)
        )
    }
}

/// Wireless interface in station mode.
pub trait WirelessLink: Send {
    /// Power up the interface.
    async fn activate(&mut self) -> Result<(), NetworkError>;

    /// Start associating with `ssid`. Does not wait for completion.
    async fn join(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError>;

    /// Whether association and addressing have completed.
    async fn is_connected(&mut self) -> bool;

    /// Current addressing, if the interface has any.
    async fn config(&self) -> Option<InterfaceConfig>;
}

/// Startup phase that brings the link up.
#[derive(Debug, Clone)]
pub struct NetworkSession {
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl NetworkSession {
    /// Session polling every second with no timeout.
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(WIFI_POLL_INTERVAL_MS),
            timeout: None,
        }
    }

    /// Give up after `timeout` instead of waiting forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Join `ssid` and wait until the link reports connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the link refuses to activate or join, if a timeout
    /// is configured and elapses, or if the link comes up without an address.
    pub async fn connect<L: WirelessLink>(
        &self,
        link: &mut L,
        ssid: &str,
        password: &str,
    ) -> Result<InterfaceConfig, NetworkError> {
        link.activate().await?;
        debug!(ssid, "Joining network");
        link.join(ssid, password).await?;

        let started = Instant::now();
        while !link.is_connected().await {
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(NetworkError::JoinTimeout {
                        ssid: ssid.to_string(),
                        waited_secs: timeout.as_secs(),
                    });
                }
            }
            trace!("Waiting for network connection");
            tokio::time::sleep(self.poll_interval).await;
        }

        let config = link.config().await.ok_or(NetworkError::NoAddress)?;
        info!("Connected to WiFi");
        info!("IP Address: {}", config.address);
        info!("Network configuration: {}", config);
        Ok(config)
    }
}

impl Default for NetworkSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Link backed by the host's own network stack.
///
/// On a development host the operating system owns association, so `join`
/// only records the SSID. The link counts as connected once the host has a
/// route towards `probe` (typically the broker), and reports the local
/// address of that route.
#[derive(Debug, Clone)]
pub struct HostLink {
    probe_host: String,
    probe_port: u16,
    config: Option<InterfaceConfig>,
}

impl HostLink {
    pub fn new(probe_host: impl Into<String>, probe_port: u16) -> Self {
        Self {
            probe_host: probe_host.into(),
            probe_port,
            config: None,
        }
    }

    async fn route_address(&self) -> std::io::Result<IpAddr> {
        let target = tokio::net::lookup_host((self.probe_host.as_str(), self.probe_port))
            .await?
            .next()
            .ok_or_else(|| std::io::Error::other("probe host did not resolve"))?;

        let bind = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        // UDP connect only selects a route; nothing is sent.
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(target).await?;
        Ok(socket.local_addr()?.ip())
    }
}

impl WirelessLink for HostLink {
    async fn activate(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn join(&mut self, ssid: &str, _password: &str) -> Result<(), NetworkError> {
        debug!(ssid, "Host stack manages association; join is a no-op");
        Ok(())
    }

    async fn is_connected(&mut self) -> bool {
        match self.route_address().await {
            Ok(address) if !address.is_unspecified() => {
                self.config = Some(InterfaceConfig::new(address));
                true
            }
            Ok(_) => false,
            Err(e) => {
                trace!("No route to {}: {}", self.probe_host, e);
                false
            }
        }
    }

    async fn config(&self) -> Option<InterfaceConfig> {
        self.config
    }
}

/// Scripted link for tests and demos.
///
/// Comes up after a fixed number of `is_connected` checks, or never.
#[derive(Debug, Clone)]
pub struct MockLink {
    connect_after: Option<usize>,
    checks: usize,
    active: bool,
    joined: Option<String>,
    config: InterfaceConfig,
}

impl MockLink {
    /// Link that reports connected on the `checks`-th check (0 = at once).
    pub fn connects_after(checks: usize, config: InterfaceConfig) -> Self {
        Self {
            connect_after: Some(checks),
            checks: 0,
            active: false,
            joined: None,
            config,
        }
    }

    /// Link that never comes up.
    pub fn never_connects(config: InterfaceConfig) -> Self {
        Self {
            connect_after: None,
            ..Self::connects_after(0, config)
        }
    }

    /// Number of `is_connected` checks so far.
    pub fn checks(&self) -> usize {
        self.checks
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// SSID passed to the last `join`.
    pub fn joined_ssid(&self) -> Option<&str> {
        self.joined.as_deref()
    }
}

impl WirelessLink for MockLink {
    async fn activate(&mut self) -> Result<(), NetworkError> {
        self.active = true;
        Ok(())
    }

    async fn join(&mut self, ssid: &str, _password: &str) -> Result<(), NetworkError> {
        if !self.active {
            return Err(NetworkError::JoinFailed("interface not active".to_string()));
        }
        self.joined = Some(ssid.to_string());
        Ok(())
    }

    async fn is_connected(&mut self) -> bool {
        let connected = match self.connect_after {
            Some(after) => self.joined.is_some() && self.checks >= after,
            None => false,
        };
        self.checks += 1;
        connected
    }

    async fn config(&self) -> Option<InterfaceConfig> {
        self.joined.as_ref().map(|_| self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lan() -> InterfaceConfig {
        InterfaceConfig {
            address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42)),
            netmask: Some(IpAddr::V4(Ipv4Addr::new(255, 255, 255, 0))),
            gateway: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))),
            dns: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_immediately() {
        let mut link = MockLink::connects_after(0, lan());
        let started = Instant::now();

        let config = NetworkSession::new()
            .connect(&mut link, "lab", "pw")
            .await
            .unwrap();

        assert_eq!(config, lan());
        assert_eq!(link.joined_ssid(), Some("lab"));
        assert!(link.is_active());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_polls_every_second() {
        let mut link = MockLink::connects_after(3, lan());
        let started = Instant::now();

        NetworkSession::new()
            .connect(&mut link, "lab", "pw")
            .await
            .unwrap();

        assert_eq!(link.checks(), 4);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout() {
        let mut link = MockLink::never_connects(lan());

        let result = NetworkSession::new()
            .with_timeout(Some(Duration::from_secs(5)))
            .connect(&mut link, "lab", "pw")
            .await;

        assert!(matches!(
            result,
            Err(NetworkError::JoinTimeout { waited_secs: 5, .. })
        ));
        assert!(link.checks() >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_timeout_keeps_waiting() {
        let mut link = MockLink::never_connects(lan());
        let session = NetworkSession::new();

        let wait = tokio::time::timeout(
            Duration::from_secs(60),
            session.connect(&mut link, "lab", "pw"),
        )
        .await;

        assert!(wait.is_err(), "connect must block while the link is down");
    }

    #[test]
    fn test_interface_config_display() {
        assert_eq!(
            lan().to_string(),
            "address=192.168.1.42 netmask=255.255.255.0 gateway=192.168.1.1 dns=-"
        );
    }

    #[tokio::test]
    async fn test_host_link_loopback() {
        let mut link = HostLink::new("127.0.0.1", 1883);
        assert!(link.is_connected().await);
        let config = link.config().await.unwrap();
        assert!(config.address.is_loopback());
    }
}
