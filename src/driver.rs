//! Public contract surface: open/close, send-bytes, send-tensor, receive-tensor, reset.

use crate::{
    error::Result,
    fmt,
    frame::{MacAddress, BROADCAST},
    link::{self, Backend, Link, LinkBackend},
    tensor,
    transport::Transport,
};

/// Remote MAC used when the caller doesn't override it.
///
/// spec.md §6 names two candidate defaults depending on build variant
/// (`01:02:03:04:05:06` or `00:80:10:64:00:00`); this crate picks the former as its single build
/// default and documents the choice in DESIGN.md rather than threading a build-time feature flag
/// through for a constant neither example repo nor original_source disambiguates further.
pub const DEFAULT_REMOTE_MAC: MacAddress = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

/// Conventional first Ethernet device name on Linux.
#[cfg(target_os = "linux")]
pub const DEFAULT_IFACE: &str = "eth0";
/// Conventional first Ethernet device name on non-Linux Unixes.
#[cfg(all(unix, not(target_os = "linux")))]
pub const DEFAULT_IFACE: &str = "en0";

/// An open session against the neuFlow accelerator.
///
/// Generic over the link's backend for the same reason [`Link`]/[`Transport`] are: so unit tests
/// can drive the public contract surface against a mock instead of real hardware.
pub struct Driver<B: LinkBackend = Backend> {
    transport: Transport<B>,
}

impl<B: LinkBackend> Driver<B> {
    /// Open the link on `iface` (or [`DEFAULT_IFACE`] if `None`), bound to `remote_mac` (or
    /// [`DEFAULT_REMOTE_MAC`]) and `local_mac` (resolved from the OS, or [`BROADCAST`] if the OS
    /// won't say).
    ///
    /// The session starts unsynced; call [`reset`](Self::reset) before any stream operation.
    pub fn open(
        iface: Option<&str>,
        remote_mac: Option<MacAddress>,
        local_mac: Option<MacAddress>,
    ) -> Result<Self> {
        let iface = iface.unwrap_or(DEFAULT_IFACE);
        let remote = remote_mac.unwrap_or(DEFAULT_REMOTE_MAC);
        let local = local_mac
            .or_else(|| link::local_mac(iface))
            .unwrap_or(BROADCAST);

        fmt::info!("opening driver on {} (local {:02x?}, remote {:02x?})", iface, local, remote);

        let link = Link::open(iface, remote, local)?;

        Ok(Self {
            transport: Transport::new(link),
        })
    }

    /// Wrap an already-constructed [`Transport`]. Used by unit tests to drive this type against a
    /// mock backend; production code should go through [`open`](Self::open).
    #[cfg(test)]
    pub(crate) fn from_transport(transport: Transport<B>) -> Self {
        Self { transport }
    }

    /// Run the reset handshake. Must succeed before any other stream operation.
    pub fn reset(&mut self) -> Result<()> {
        self.transport.reset()
    }

    /// Send raw bytes (e.g. a bytecode image) to the device.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.transport.send_stream(bytes)
    }

    /// Q8.8-encode `values` and send them.
    pub fn send_tensor_f32(&mut self, values: &[f32]) -> Result<()> {
        let bytes = tensor::encode(values);
        self.transport.send_stream(&bytes)
    }

    /// Q8.8-encode `values` and send them.
    pub fn send_tensor_f64(&mut self, values: &[f64]) -> Result<()> {
        let bytes = tensor::encode(values);
        self.transport.send_stream(&bytes)
    }

    /// Receive `2 * out.len()` Q8.8 bytes and decode them into `out`.
    ///
    /// `height` is accepted for parity with the original protocol surface but unused at this
    /// layer (spec.md §6).
    pub fn recv_tensor_f32(&mut self, out: &mut [f32], _height: usize) -> Result<()> {
        let mut bytes = vec![0u8; out.len() * 2];
        self.transport.recv_stream(&mut bytes)?;
        tensor::decode(&bytes, out);
        Ok(())
    }

    /// Receive `2 * out.len()` Q8.8 bytes and decode them into `out`.
    ///
    /// `height` is accepted for parity with the original protocol surface but unused at this
    /// layer (spec.md §6).
    pub fn recv_tensor_f64(&mut self, out: &mut [f64], _height: usize) -> Result<()> {
        let mut bytes = vec![0u8; out.len() * 2];
        self.transport.recv_stream(&mut bytes)?;
        tensor::decode(&bytes, out);
        Ok(())
    }

    /// Explicit close, for parity with spec.md §6's public surface. Equivalent to dropping the
    /// `Driver` — the underlying OS handle is released by the backend's `Drop` impl either way.
    pub fn close(self) {}

    /// Bytes offered to the device so far in this synced session.
    pub fn send_seq(&self) -> u32 {
        self.transport.send_seq()
    }

    /// Bytes delivered to the caller from the device so far in this synced session.
    pub fn recv_seq(&self) -> u32 {
        self.transport.recv_seq()
    }
}
