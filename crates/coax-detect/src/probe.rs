//! Status probing for switch detection
//!
//! This module sends a STATUS query to a serial port and checks for a
//! parseable state report to confirm the controller is on the other end.

use std::time::Duration;

use coax_protocol::{ControllerReply, HostCommand, LineCodec};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::error::DetectError;
use crate::scanner::PortScanner;

/// Environment variable that pins the controller to a specific port
pub const PORT_ENV_VAR: &str = "COAX_SWITCH_PORT";

/// Baud rate used when probing
const PROBE_BAUD: u32 = 115_200;

/// Configuration for probing
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for the whole probe attempt
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
        }
    }
}

/// Switch controller prober
pub struct SwitchProber {
    config: ProbeConfig,
}

impl SwitchProber {
    /// Create a new prober with default configuration
    pub fn new() -> Self {
        Self {
            config: ProbeConfig::default(),
        }
    }

    /// Create a prober with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probe a stream for the switch controller
    ///
    /// Sends STATUS and accepts the port if a state report comes back
    /// within the timeout. Boot banners and debug lines are skipped.
    pub async fn probe<S>(&self, stream: &mut S) -> bool
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        trace!("Sending STATUS probe");
        if let Err(e) = stream.write_all(&HostCommand::Status.encode()).await {
            warn!("Failed to write STATUS probe: {}", e);
            return false;
        }

        let mut codec = LineCodec::new();
        let mut buf = [0u8; 128];

        let result = timeout(self.config.timeout, async {
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) => return false,
                    Ok(n) => codec.push_bytes(&buf[..n]),
                    Err(e) => {
                        trace!("Probe read error: {}", e);
                        return false;
                    }
                }
                while let Some(reply) = codec.next_reply() {
                    match reply {
                        ControllerReply::State(_) | ControllerReply::Ack { state: Some(_) } => {
                            return true;
                        }
                        other => trace!("Ignoring probe reply: {:?}", other),
                    }
                }
            }
        })
        .await;

        match result {
            Ok(found) => found,
            Err(_) => {
                trace!("STATUS probe timeout");
                false
            }
        }
    }
}

impl Default for SwitchProber {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe a specific port at a given baud rate
pub async fn probe_port(port_name: &str, baud_rate: u32) -> bool {
    use tokio_serial::SerialPortBuilderExt;

    debug!("Probing {} at {} baud", port_name, baud_rate);

    let mut stream = match tokio_serial::new(port_name, baud_rate)
        .timeout(Duration::from_millis(100))
        .open_native_async()
    {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to open {}: {}", port_name, e);
            return false;
        }
    };

    // Give the port a moment to settle
    tokio::time::sleep(Duration::from_millis(50)).await;

    SwitchProber::new().probe(&mut stream).await
}

/// Find the switch controller's port
///
/// The `COAX_SWITCH_PORT` environment variable wins outright when set.
/// Otherwise every enumerated port is probed, USB descriptors that look
/// like the controller board first.
pub async fn find_switch_port() -> Result<String, DetectError> {
    if let Ok(port) = std::env::var(PORT_ENV_VAR) {
        info!("Using {} from {}", port, PORT_ENV_VAR);
        return Ok(port);
    }

    let candidates = PortScanner::new().candidate_ports()?;
    for candidate in candidates {
        if probe_port(&candidate.port, PROBE_BAUD).await {
            info!("Switch controller found on {}", candidate.port);
            return Ok(candidate.port);
        }
    }

    Err(DetectError::NotFound)
}
