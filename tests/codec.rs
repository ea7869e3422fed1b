//! Integration tests exercising the public wire-format surface (tensor codec, frame layout) the
//! way an embedding application would: through `neuflow_tbsp`'s public API only.
//!
//! The protocol state machine itself (reset/send-stream/recv-stream) is tested against a mock
//! link backend in `src/transport.rs`'s unit tests, since `LinkBackend` is crate-private and
//! can't be implemented from here.

use neuflow_tbsp::{frame, tensor};
use pretty_assertions::assert_eq;

#[test]
fn tensor_round_trip_through_public_api() {
    let values = vec![1.0f32, -1.0, 0.5, -42.25, 0.0];
    let bytes = tensor::encode(&values);

    let mut out = vec![0.0f32; values.len()];
    tensor::decode(&bytes, &mut out);

    assert_eq!(out, values);
}

#[test]
fn f64_tensor_matches_f32_precision_at_q8_8_granularity() {
    let values_f32 = vec![3.125f32, -7.5, 100.0];
    let values_f64: Vec<f64> = values_f32.iter().map(|&v| v as f64).collect();

    let bytes_f32 = tensor::encode(&values_f32);
    let bytes_f64 = tensor::encode(&values_f64);

    assert_eq!(bytes_f32, bytes_f64);
}

#[test]
fn frame_header_round_trip() {
    let mut buf = [0u8; frame::TBSP_HEADER_LEN + 8];
    let mut header = frame::TbspHeader::new(&mut buf);

    header.clear();
    header.write_type(frame::TbspType::Data);
    header.write_seq_a(42);
    header.write_seq_b(7);
    header.write_length(8);
    header.payload_mut()[..8].copy_from_slice(b"neuflow!");

    assert_eq!(header.read_type(), frame::TbspType::Data);
    assert_eq!(header.read_seq_a(), 42);
    assert_eq!(header.read_seq_b(), 7);
    assert_eq!(header.payload(), b"neuflow!");
}

#[test]
fn ethernet_header_carries_configured_ethertype() {
    let mut frame_buf = [0u8; frame::ETH_FRAME_LEN];
    let dst = [1, 2, 3, 4, 5, 6];
    let src = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

    let len = frame::write_ethernet_header(&mut frame_buf, &dst, &src, 4);

    assert_eq!(frame::ethertype(&frame_buf[..len]), frame::TBSP_ETHERTYPE);
    assert!(frame::accepts(&frame_buf[..len], &dst, &src));
}
