//! Raw-frame send/receive against one network interface.
//!
//! Enforces destination MAC, source MAC and Ethertype filtering on receive, and a minimum
//! inter-frame gap on send. Two backends live behind the narrow [`LinkBackend`] interface:
//! [`linux::RawSocket`] (Linux `AF_PACKET`) and [`bsd::BpfDevice`] (BPF, for the other Unixes).

pub mod calibrate;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(all(unix, not(target_os = "linux")))]
mod bsd;

#[cfg(target_os = "linux")]
pub(crate) use linux::RawSocket as Backend;
#[cfg(all(unix, not(target_os = "linux")))]
pub(crate) use bsd::BpfDevice as Backend;

use crate::{
    fmt,
    frame::{self, MacAddress, ETH_FRAME_LEN},
};
use std::time::{Duration, Instant};

/// Minimum gap enforced between two consecutive frame transmissions.
///
/// The device cannot accept back-to-back frames at line rate; halving this is known to cause
/// drops.
pub const ETH_PACKET_DELAY_US: u64 = 170;

/// Lower bound a shaped pre-send sleep is clamped to, regardless of calibration.
const MIN_DELAY_US: u64 = 2;

/// A backend capable of sending and receiving one whole Ethernet frame at a time.
///
/// Generic over this (rather than hardcoding the platform backend into [`Link`]) so tests can
/// substitute a mock backend that replays canned frames instead of touching real hardware.
pub(crate) trait LinkBackend: Sized {
    fn open(iface: &str) -> std::io::Result<Self>;
    fn send(&mut self, frame: &[u8]) -> std::io::Result<usize>;
    /// Receive one frame into `buf`, returning the number of bytes written. A return of `0` is a
    /// transient hiccup, not end-of-stream — there is no such thing on a raw link.
    fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Look up the hardware address bound to `iface`, if the OS will tell us.
///
/// Grounded on the teacher's `BpfDevice::mac()`, which resolves the interface's MAC via
/// `nix::ifaddrs` rather than an ioctl (neither the raw socket nor the BPF descriptor exposes one
/// directly).
pub fn local_mac(iface: &str) -> Option<MacAddress> {
    nix::ifaddrs::getifaddrs()
        .ok()?
        .find(|a| a.interface_name == iface)
        .and_then(|a| a.address)
        .and_then(|addr| addr.as_link_addr()?.addr())
}

/// Link I/O: owns the OS handle, peer identity, and inter-frame timing state.
///
/// Generic over the backend so unit tests can inject a mock; production code always uses the
/// default [`Backend`] alias for the host platform.
pub struct Link<B: LinkBackend = Backend> {
    backend: B,
    local: MacAddress,
    remote: MacAddress,
    last_send: Option<Instant>,
    bias_us: i64,
}

impl<B: LinkBackend> Link<B> {
    /// Open the link on `iface`, bound to the given peer identity.
    ///
    /// Measures the sleep-overshoot calibration bias as part of opening, per spec.
    pub fn open(iface: &str, remote: MacAddress, local: MacAddress) -> crate::error::Result<Self> {
        let backend = B::open(iface)?;

        let bias_us = calibrate::calibrate_sleep_bias(Duration::from_micros(ETH_PACKET_DELAY_US));
        fmt::debug!("calibrated sleep bias: {} us", bias_us);

        Ok(Self {
            backend,
            local,
            remote,
            last_send: None,
            bias_us,
        })
    }

    /// Wrap an already-constructed backend with no calibration delay. Used by unit tests to
    /// inject a mock backend; production code should go through [`open`](Self::open).
    #[cfg(test)]
    pub(crate) fn from_backend(backend: B, remote: MacAddress, local: MacAddress) -> Self {
        Self {
            backend,
            local,
            remote,
            last_send: None,
            bias_us: 0,
        }
    }

    /// Send one frame whose TBSP header + payload already occupy
    /// `frame[ETH_HEADER_LEN..ETH_HEADER_LEN + tbsp_len]`. Prepends the MAC/Ethertype header,
    /// pads to the Ethernet minimum, shapes the inter-frame gap, then writes exactly one frame.
    pub fn send_frame(
        &mut self,
        frame: &mut [u8; ETH_FRAME_LEN],
        tbsp_len: usize,
    ) -> crate::error::Result<()> {
        let frame_len = frame::write_ethernet_header(frame, &self.remote, &self.local, tbsp_len);

        self.shape_gap();

        self.backend.send(&frame[..frame_len])?;
        self.last_send = Some(Instant::now());

        Ok(())
    }

    /// Block until one frame matching the configured peer/Ethertype filter arrives, then copy it
    /// into `buf`. Returns the number of bytes written (the whole accepted frame, header
    /// included).
    pub fn recv_frame(&mut self, buf: &mut [u8; ETH_FRAME_LEN]) -> crate::error::Result<usize> {
        loop {
            let n = self.backend.recv(buf)?;

            if n == 0 {
                fmt::trace!("zero-length read, retrying");
                continue;
            }

            if frame::accepts(&buf[..n], &self.local, &self.remote) {
                return Ok(n);
            }

            fmt::trace!("dropped non-matching frame of {} bytes", n);
        }
    }

    /// Sleep, if needed, so that at least `ETH_PACKET_DELAY_US` (minus the calibrated bias,
    /// clamped to `MIN_DELAY_US`) has elapsed since the previous send.
    fn shape_gap(&mut self) {
        let Some(last_send) = self.last_send else {
            return;
        };

        let elapsed_us = last_send.elapsed().as_micros() as i64;
        let target_us = ETH_PACKET_DELAY_US as i64;

        if elapsed_us >= target_us {
            return;
        }

        let delay_us = (target_us - elapsed_us - self.bias_us).max(MIN_DELAY_US as i64);

        std::thread::sleep(Duration::from_micros(delay_us as u64));
    }
}
