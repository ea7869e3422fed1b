//! TBSP reliable stream transport.
//!
//! Implements the reset handshake and the send-stream/receive-stream state machines described in
//! spec.md §4.3: two monotonic byte counters per direction, optimistic REQ/ACK resynchronisation
//! on send, and a carryover buffer that spans receive calls.
//!
//! The three protocol states (`Closed`, `Open-Unsynced`, `Open-Synced`) map onto this type as:
//! `Closed` is "no `Transport` value exists" (ownership of the underlying [`Link`] models
//! lifetime), and the remaining two are [`SyncState`]. See DESIGN.md for this mapping decision.

use crate::{
    error::{Error, Result},
    fmt,
    frame::{TbspHeader, TbspType, ETH_FRAME_LEN, ETH_HEADER_LEN, TBSP_DATA_LEN},
    link::{Backend, Link, LinkBackend},
};
use std::time::Duration;

const RESET_ATTEMPTS: u32 = 10;
const RESET_SETTLE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Unsynced,
    Synced,
}

/// Owns the link, the two stream counters, and the carryover buffer.
///
/// Generic over the link's backend for the same reason [`Link`] is: so unit tests can drive this
/// state machine against a mock instead of real hardware.
pub struct Transport<B: LinkBackend = Backend> {
    link: Link<B>,
    send_seq: u32,
    recv_seq: u32,
    carryover: Vec<u8>,
    state: SyncState,
}

impl<B: LinkBackend> Transport<B> {
    /// Wrap an already-open [`Link`]. Starts in `Open-Unsynced`; call [`reset`](Self::reset)
    /// before `send_stream`/`recv_stream`.
    pub fn new(link: Link<B>) -> Self {
        Self {
            link,
            send_seq: 0,
            recv_seq: 0,
            carryover: Vec::new(),
            state: SyncState::Unsynced,
        }
    }

    /// Bytes offered to the device so far in this synced session.
    pub fn send_seq(&self) -> u32 {
        self.send_seq
    }

    /// Bytes delivered to the caller from the device so far in this synced session.
    pub fn recv_seq(&self) -> u32 {
        self.recv_seq
    }

    fn require_synced(&self) -> Result<()> {
        if self.state == SyncState::Synced {
            Ok(())
        } else {
            Err(Error::NotSynced)
        }
    }

    /// Reset handshake (spec.md §4.3.1).
    ///
    /// Up to 10 attempts of RESET, a 10ms settle, then REQ; accepted on an ACK with both
    /// sequence fields zero. Zeroes both counters and the carryover buffer on success.
    pub fn reset(&mut self) -> Result<()> {
        for attempt in 1..=RESET_ATTEMPTS {
            fmt::debug!("reset attempt {}/{}", attempt, RESET_ATTEMPTS);

            self.send_control(TbspType::Reset)?;
            std::thread::sleep(RESET_SETTLE);
            self.send_control(TbspType::Req)?;

            let mut frame = [0u8; ETH_FRAME_LEN];
            let n = self.link.recv_frame(&mut frame)?;
            let header = TbspHeader::new(&mut frame[ETH_HEADER_LEN..n]);

            if header.read_type() == TbspType::Ack
                && header.read_seq_a() == 0
                && header.read_seq_b() == 0
            {
                self.send_seq = 0;
                self.recv_seq = 0;
                self.carryover.clear();
                self.state = SyncState::Synced;
                fmt::info!("reset succeeded on attempt {}", attempt);
                return Ok(());
            }

            fmt::trace!("reset attempt {} did not produce a matching ACK", attempt);
        }

        fmt::warn!("reset exhausted after {} attempts", RESET_ATTEMPTS);
        Err(Error::ResetExhausted)
    }

    fn send_control(&mut self, ty: TbspType) -> Result<()> {
        let mut frame = [0u8; ETH_FRAME_LEN];
        {
            let mut header = TbspHeader::new(&mut frame[ETH_HEADER_LEN..]);
            header.clear();
            header.write_type(ty);
        }
        self.link.send_frame(&mut frame, 0)
    }

    /// Send-stream (spec.md §4.3.2): chunk `bytes` into frames of up to
    /// [`TBSP_DATA_LEN`], the last of which carries type REQ and doubles as the end-of-stream
    /// request, even when it is exactly `TBSP_DATA_LEN` bytes long.
    pub fn send_stream(&mut self, bytes: &[u8]) -> Result<()> {
        self.require_synced()?;

        if bytes.len() > u32::MAX as usize {
            return Err(Error::PayloadTooLarge { len: bytes.len() });
        }

        let stream_start = self.send_seq;
        let mut cursor = 0usize;

        loop {
            let remaining = bytes.len() - cursor;
            let chunk_len = remaining.min(TBSP_DATA_LEN);
            let is_last = cursor + chunk_len == bytes.len();
            let ty = if is_last { TbspType::Req } else { TbspType::Data };

            let mut frame = [0u8; ETH_FRAME_LEN];
            {
                let mut header = TbspHeader::new(&mut frame[ETH_HEADER_LEN..]);
                header.clear();
                header.write_type(ty);
                header.write_seq_a(self.send_seq);
                header.write_seq_b(self.recv_seq);
                header.write_length(chunk_len as u16);
                header.payload_mut()[..chunk_len]
                    .copy_from_slice(&bytes[cursor..cursor + chunk_len]);
            }
            self.link.send_frame(&mut frame, chunk_len)?;

            self.send_seq = self.send_seq.wrapping_add(chunk_len as u32);
            cursor += chunk_len;

            fmt::trace!("sent {} of {} bytes, send_seq now {}", ty, chunk_len, self.send_seq);

            if !is_last {
                continue;
            }

            let mut ack = [0u8; ETH_FRAME_LEN];
            let n = self.link.recv_frame(&mut ack)?;
            let header = TbspHeader::new(&mut ack[ETH_HEADER_LEN..n]);

            self.send_seq = header.read_seq_b();
            cursor = self.send_seq.wrapping_sub(stream_start) as usize;

            fmt::trace!("ack seq_b={}, cursor now {}", self.send_seq, cursor);

            if cursor >= bytes.len() {
                return Ok(());
            }

            // Partial acceptance: the device confirmed fewer bytes than we sent. Resume chunking
            // from the new cursor instead of treating the REQ as final.
        }
    }

    /// Receive-stream (spec.md §4.3.3): fills `out` from carryover first, then from DATA frames.
    /// Stops once the device's acked position has caught up past `out.len()`, or once two
    /// consecutive ACKs arrive after the stream has started (carryover consumed or a DATA frame
    /// seen) — ACKs before that point don't count toward the two-in-a-row rule. Always advances
    /// `recv_seq` by exactly `out.len()` on return, per spec.
    pub fn recv_stream(&mut self, out: &mut [u8]) -> Result<()> {
        self.require_synced()?;

        let requested_len = out.len();
        let mut acks_in_a_row = 0u32;
        let mut started = false;

        if !self.carryover.is_empty() {
            let n = self.carryover.len().min(requested_len);
            out[..n].copy_from_slice(&self.carryover[..n]);
            self.carryover.drain(..n);
            started = true;

            if n == requested_len {
                self.recv_seq = self.recv_seq.wrapping_add(requested_len as u32);
                return Ok(());
            }
        }

        loop {
            let mut frame = [0u8; ETH_FRAME_LEN];
            let n = self.link.recv_frame(&mut frame)?;
            let header = TbspHeader::new(&mut frame[ETH_HEADER_LEN..n]);

            match header.read_type() {
                TbspType::Ack => {
                    if started {
                        acks_in_a_row += 1;
                    }
                    self.send_seq = header.read_seq_b();

                    let seq_a = header.read_seq_a();
                    let gap = seq_a as i64 - self.recv_seq as i64;

                    if acks_in_a_row == 2 || gap >= requested_len as i64 {
                        break;
                    }
                }
                TbspType::Data => {
                    started = true;
                    acks_in_a_row = 0;

                    let seq_pos = header.read_seq_a();
                    let length = header.read_length() as usize;
                    let offset = seq_pos as i64 - self.recv_seq as i64;

                    if offset < 0 {
                        fmt::trace!("dropping stale DATA frame at seq {}", seq_pos);
                        continue;
                    }
                    let offset = offset as usize;

                    if offset + length < requested_len {
                        out[offset..offset + length].copy_from_slice(header.payload());
                    } else {
                        let carryover_len = offset + length - requested_len;
                        let adjusted = length as i64 - carryover_len as i64;

                        if adjusted < 0 {
                            fmt::trace!("negative adjusted length at carryover boundary, clearing");
                            self.carryover.clear();
                            break;
                        }
                        let adjusted = adjusted as usize;

                        let payload = header.payload();
                        self.carryover = payload[adjusted..adjusted + carryover_len].to_vec();
                        out[offset..offset + adjusted].copy_from_slice(&payload[..adjusted]);
                        break;
                    }
                }
                other => {
                    fmt::trace!("ignoring unexpected {} frame during recv_stream", other);
                }
            }
        }

        self.recv_seq = self.recv_seq.wrapping_add(requested_len as u32);
        Ok(())
    }
}
