//! Duplex transport for the virtual switch bank
//!
//! Runs a [`VirtualSwitchBank`] behind one end of a `tokio::io::duplex`
//! pair. The other end reads and writes exactly like a serial port, so the
//! rest of the stack runs unmodified against the simulator.

use std::sync::{Arc, Mutex};

use coax_protocol::{SwitchId, SwitchPosition};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tracing::debug;

use crate::bank::{FaultMode, VirtualBankConfig, VirtualSwitchBank, BOOT_BANNER};

/// Control handle for a spawned bank
///
/// Lets tests flip faults and move relays while the bank serves traffic.
#[derive(Clone)]
pub struct BankHandle {
    inner: Arc<Mutex<VirtualSwitchBank>>,
}

impl BankHandle {
    /// Current position of one relay
    pub fn position(&self, id: SwitchId) -> SwitchPosition {
        self.inner.lock().unwrap().position(id)
    }

    /// Move a relay behind the host's back
    pub fn set_position(&self, id: SwitchId, position: SwitchPosition) {
        self.inner.lock().unwrap().set_position(id, position);
    }

    /// Change the failure behavior
    pub fn set_fault(&self, fault: FaultMode) {
        self.inner.lock().unwrap().set_fault(fault);
    }

    /// Lines the bank has received so far
    pub fn received(&self) -> Vec<String> {
        self.inner.lock().unwrap().received().to_vec()
    }
}

/// Spawn a virtual switch bank and return the host side of the link
///
/// The bank prints its boot banner, then answers line commands until the
/// host side is dropped.
pub fn spawn_bank(config: VirtualBankConfig) -> (DuplexStream, BankHandle) {
    let (host, device) = tokio::io::duplex(1024);
    let inner = Arc::new(Mutex::new(VirtualSwitchBank::from_config(config)));
    let handle = BankHandle {
        inner: inner.clone(),
    };

    tokio::spawn(async move {
        let (read_half, mut write_half) = tokio::io::split(device);
        let mut lines = BufReader::new(read_half).lines();

        if write_half
            .write_all(format!("{}\n", BOOT_BANNER).as_bytes())
            .await
            .is_err()
        {
            return;
        }

        while let Ok(Some(line)) = lines.next_line().await {
            debug!("Bank received: {}", line);
            let reply = inner.lock().unwrap().handle_line(&line);
            if let Some(reply) = reply {
                debug!("Bank replying: {}", reply);
                if write_half
                    .write_all(format!("{}\n", reply).as_bytes())
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    });

    (host, handle)
}
