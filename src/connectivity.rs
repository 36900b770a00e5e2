use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use crate::config::ConnectivityConfig;
use crate::error::ScrapeError;
use crate::retry::{ExhaustionPolicy, RetryPolicy};

/// Answers "is the network reachable right now?". Must not fail.
pub trait Probe {
    fn is_connected(&self) -> bool;
}

pub trait Reconnector {
    fn reconnect(&self);
}

pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        TcpProbe { host: host.into(), port, timeout }
    }
}

impl Probe for TcpProbe {
    fn is_connected(&self) -> bool {
        match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => any_reachable(addrs, self.timeout),
            Err(e) => {
                debug!("Could not resolve {}: {}", self.host, e);
                false
            }
        }
    }
}

// A host may resolve to an unroutable address family first (IPv6 without a route).
fn any_reachable(addrs: impl IntoIterator<Item = SocketAddr>, timeout: Duration) -> bool {
    addrs.into_iter().any(|addr| match TcpStream::connect_timeout(&addr, timeout) {
        Ok(_) => true,
        Err(e) => {
            debug!("Could not connect to {}: {}", addr, e);
            false
        }
    })
}

/// Runs an external VPN client (NordVPN by default).
pub struct VpnCommand {
    command: Vec<String>,
    timeout: Duration,
}

impl VpnCommand {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        VpnCommand { command, timeout }
    }
}

impl Reconnector for VpnCommand {
    fn reconnect(&self) {
        let Some((program, args)) = self.command.split_first() else {
            debug!("No VPN command configured.");
            return;
        };

        let mut child = match Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} CLI not found. Continuing without VPN.", program);
                return;
            }
            Err(e) => {
                warn!("Could not start {}: {}", program, e);
                return;
            }
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => {
                    info!("VPN connection initiated.");
                    return;
                }
                Ok(None) if Instant::now() >= deadline => {
                    warn!("VPN connection timed out.");
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
                Ok(None) => thread::sleep(Duration::from_millis(200)),
                Err(e) => {
                    warn!("Lost track of {}: {}", program, e);
                    return;
                }
            }
        }
    }
}

pub struct ConnectivityMonitor {
    probe: Box<dyn Probe>,
    reconnector: Box<dyn Reconnector>,
    max_reconnects: usize,
    delay: Duration,
}

impl ConnectivityMonitor {
    pub fn new(
        probe: Box<dyn Probe>,
        reconnector: Box<dyn Reconnector>,
        max_reconnects: usize,
        delay: Duration,
    ) -> Self {
        ConnectivityMonitor { probe, reconnector, max_reconnects, delay }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(
            Box::new(TcpProbe::new(config.host.clone(), config.port, config.timeout())),
            Box::new(VpnCommand::new(config.vpn_command.clone(), config.vpn_timeout())),
            config.max_reconnect_attempts,
            config.reconnect_delay(),
        )
    }

    pub fn is_connected(&self) -> bool {
        self.probe.is_connected()
    }

    /// Returns once the network is reachable, reconnecting in between checks.
    ///
    /// Gives up with [`ScrapeError::ConnectivityLost`] after `max_reconnects`
    /// reconnect cycles. That error is fatal for the whole run.
    pub fn ensure_connectivity(&self) -> Result<(), ScrapeError> {
        let policy = RetryPolicy::new(self.max_reconnects + 1, ExhaustionPolicy::Abort);
        let mut reconnects = 0usize;

        let result = policy.run(
            "Connectivity check",
            &mut reconnects,
            |_| {
                if self.probe.is_connected() {
                    Ok(())
                } else {
                    Err("no connectivity")
                }
            },
            |reconnects| {
                *reconnects += 1;
                info!(
                    "No connectivity. Attempting VPN reconnect ({}/{})...",
                    reconnects, self.max_reconnects
                );
                self.reconnector.reconnect();
                thread::sleep(self.delay);
                Ok(())
            },
        );

        match result {
            Ok(_) => Ok(()),
            Err(ScrapeError::Exhausted { .. }) => {
                error!(
                    "Failed to establish connectivity after {} attempts.",
                    self.max_reconnects
                );
                Err(ScrapeError::ConnectivityLost { reconnects: self.max_reconnects })
            }
            Err(e) => Err(e),
        }
    }
}
