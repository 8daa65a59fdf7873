//! Async gateway to the physical switch controller
//!
//! Generic over the I/O type to support both real serial ports and the
//! virtual switch bank: hardware uses `SerialStream`, tests use
//! `DuplexStream` from `tokio::io::duplex()`.
//!
//! The gateway is transport only. It never caches switch positions;
//! callers reconcile through [`SwitchGateway::read_all`] and must not
//! treat a successful set as the new truth.

use std::time::Duration;

use coax_protocol::{ControllerReply, HostCommand, LineCodec, RawSwitchSnapshot, SwitchId, SwitchPosition};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Instant};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

use crate::error::DeviceError;

/// Baud rate of the Pico controller
pub const DEFAULT_BAUD: u32 = 115_200;

/// Connection to the switch controller over a byte stream
pub struct SwitchGateway<T> {
    io: T,
    codec: LineCodec,
    reply_timeout: Duration,
    read_buf: Vec<u8>,
}

impl SwitchGateway<SerialStream> {
    /// Open a serial port to the controller
    pub fn connect(port: &str, baud: u32, reply_timeout: Duration) -> Result<Self, DeviceError> {
        let stream = tokio_serial::new(port, baud)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|e| DeviceError::Unreachable(format!("failed to open {}: {}", port, e)))?;

        Ok(Self::new(stream, reply_timeout))
    }
}

impl<T> SwitchGateway<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an existing byte stream
    pub fn new(io: T, reply_timeout: Duration) -> Self {
        Self {
            io,
            codec: LineCodec::new(),
            reply_timeout,
            read_buf: vec![0u8; 256],
        }
    }

    /// Request that the controller move one relay
    ///
    /// Local state is untouched: the controller's ack is accepted as
    /// delivery confirmation only, and the stored truth comes from a
    /// follow-up [`read_all`](Self::read_all).
    pub async fn set_switch(
        &mut self,
        id: SwitchId,
        position: SwitchPosition,
    ) -> Result<(), DeviceError> {
        self.send(HostCommand::Set { id, position }).await?;

        match self.await_reply().await? {
            ControllerReply::Error(message) => Err(DeviceError::Rejected(message)),
            // Any OK/STATE line acks the command; state is reconciled by re-read
            _ => Ok(()),
        }
    }

    /// Read the controller's self-reported positions
    ///
    /// The snapshot may be partial; deciding what a missing entry means is
    /// the caller's job (the store treats it as disconnected).
    pub async fn read_all(&mut self) -> Result<RawSwitchSnapshot, DeviceError> {
        self.send(HostCommand::Status).await?;

        loop {
            match self.await_reply().await? {
                ControllerReply::State(snapshot)
                | ControllerReply::Ack {
                    state: Some(snapshot),
                } => return Ok(snapshot),
                ControllerReply::Error(message) => return Err(DeviceError::Rejected(message)),
                // Bare OK from an earlier exchange; keep waiting for STATE
                ControllerReply::Ack { state: None } | ControllerReply::Unknown(_) => continue,
            }
        }
    }

    async fn send(&mut self, cmd: HostCommand) -> Result<(), DeviceError> {
        self.io
            .write_all(&cmd.encode())
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;
        self.io
            .flush()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))
    }

    /// Next parseable reply, skipping banner/debug lines, bounded by the
    /// reply timeout
    async fn await_reply(&mut self) -> Result<ControllerReply, DeviceError> {
        let deadline = Instant::now() + self.reply_timeout;

        loop {
            if let Some(reply) = self.codec.next_reply() {
                if let ControllerReply::Unknown(line) = &reply {
                    debug!("Skipping controller line: {}", line);
                    continue;
                }
                return Ok(reply);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(DeviceError::Unreachable(format!(
                    "no reply within {:?}",
                    self.reply_timeout
                )));
            }

            let n = timeout(remaining, self.io.read(&mut self.read_buf))
                .await
                .map_err(|_| {
                    DeviceError::Unreachable(format!("no reply within {:?}", self.reply_timeout))
                })?
                .map_err(|e| DeviceError::Unreachable(e.to_string()))?;

            if n == 0 {
                return Err(DeviceError::Unreachable("connection closed".to_string()));
            }
            self.codec.push_bytes(&self.read_buf[..n]);
        }
    }
}
