//! Shared mock [`LinkBackend`] for unit tests across `transport` and `driver`.
//!
//! Kept as a separate module (rather than duplicated per-module test code) since `LinkBackend`
//! is crate-private and can't be implemented from an external `tests/` crate — this is the one
//! place the mock is defined, both modules' test code uses it.

use crate::{
    frame::{self, MacAddress, TbspHeader, TbspType, ETH_FRAME_LEN, ETH_HEADER_LEN},
    link::LinkBackend,
};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

pub(crate) const LOCAL: MacAddress = [0xAA; 6];
pub(crate) const REMOTE: MacAddress = [0xBB; 6];

/// Frames the mock backend has been asked to send, shared with the test so it can inspect them
/// after handing the backend's ownership to a `Link`/`Transport`/`Driver`.
#[derive(Clone, Default)]
pub(crate) struct Sent(pub(crate) Rc<RefCell<Vec<Vec<u8>>>>);

pub(crate) struct MockBackend {
    pub(crate) inbound: VecDeque<Vec<u8>>,
    pub(crate) sent: Sent,
}

impl LinkBackend for MockBackend {
    fn open(_iface: &str) -> std::io::Result<Self> {
        Ok(Self {
            inbound: VecDeque::new(),
            sent: Sent::default(),
        })
    }

    fn send(&mut self, frame: &[u8]) -> std::io::Result<usize> {
        self.sent.0.borrow_mut().push(frame.to_vec());
        Ok(frame.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let frame = self
            .inbound
            .pop_front()
            .expect("mock backend ran out of inbound frames");
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }
}

/// Build a frame as the device would send it (source = REMOTE, destination = LOCAL).
pub(crate) fn device_frame(ty: TbspType, seq_a: u32, seq_b: u32, payload: &[u8]) -> Vec<u8> {
    let mut frame = [0u8; ETH_FRAME_LEN];
    {
        let mut header = TbspHeader::new(&mut frame[ETH_HEADER_LEN..]);
        header.clear();
        header.write_type(ty);
        header.write_seq_a(seq_a);
        header.write_seq_b(seq_b);
        header.write_length(payload.len() as u16);
        header.payload_mut()[..payload.len()].copy_from_slice(payload);
    }
    let len = frame::write_ethernet_header(&mut frame, &LOCAL, &REMOTE, payload.len());
    frame[..len].to_vec()
}

/// Read the TBSP header of a captured (host-sent) frame.
pub(crate) fn sent_header(raw: &[u8]) -> (TbspType, u32, u32, Vec<u8>) {
    let mut copy = raw.to_vec();
    let header = TbspHeader::new(&mut copy[ETH_HEADER_LEN..]);
    (
        header.read_type(),
        header.read_seq_a(),
        header.read_seq_b(),
        header.payload().to_vec(),
    )
}

pub(crate) fn mock_backend(inbound: Vec<Vec<u8>>) -> (MockBackend, Sent) {
    let sent = Sent::default();
    let backend = MockBackend {
        inbound: inbound.into(),
        sent: sent.clone(),
    };
    (backend, sent)
}
