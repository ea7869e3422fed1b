//! A host-side driver for the neuFlow accelerator: raw-Ethernet framing, the TBSP reliable
//! stream transport, and the Q8.8 fixed-point tensor codec.
//!
//! The accelerator is not an IP endpoint — frames are exchanged at layer 2, identified by a
//! fixed MAC pair and a private Ethertype (`0x88B5`). [`Driver`] is the public entry point:
//! [`Driver::open`] a session, [`Driver::reset`] it, then move data with `send_bytes`,
//! `send_tensor_f32`/`send_tensor_f64`, and `recv_tensor_f32`/`recv_tensor_f64`.
//!
//! This crate is single-threaded and synchronous: every public call blocks to completion, and a
//! receive has no timeout (see [`link`] and [`transport`]).

// This mod goes first so the rest of the crate sees its macros.
pub(crate) mod fmt;

pub mod error;
pub mod frame;
pub mod link;
pub mod tensor;
pub mod transport;

mod driver;
#[cfg(test)]
mod test_support;

pub use driver::{Driver, DEFAULT_IFACE, DEFAULT_REMOTE_MAC};
pub use error::{Error, Result};
