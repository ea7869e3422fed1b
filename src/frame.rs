//! Ethernet + TBSP framing.
//!
//! Bounds-safe accessors onto a pre-allocated [`ETH_FRAME_LEN`]-byte buffer laid out as:
//!
//! `dst MAC (6) | src MAC (6) | Ethertype (2) | TBSP header (11) | TBSP payload (<=1489)`
//!
//! No allocation, no copying beyond what the caller asks for.

/// Maximum size of one Ethernet II frame, sans FCS.
pub const ETH_FRAME_LEN: usize = 1514;
/// Minimum size of one Ethernet II frame, sans FCS. Shorter frames are zero-padded up to this.
pub const ETH_ZLEN: usize = 60;
/// Octets in one Ethernet MAC address.
pub const ETH_ALEN: usize = 6;
/// Octets in the Ethernet header (two MACs + Ethertype).
pub const ETH_HEADER_LEN: usize = 2 * ETH_ALEN + 2;

/// The private Ethertype this driver speaks on top of.
pub const TBSP_ETHERTYPE: u16 = 0x88B5;

/// Octets in the TBSP header: type (1) + seq_a (4) + seq_b (4) + length (2).
pub const TBSP_HEADER_LEN: usize = 11;
/// Maximum TBSP payload that fits in one frame.
pub const TBSP_DATA_LEN: usize = ETH_FRAME_LEN - ETH_HEADER_LEN - TBSP_HEADER_LEN;

const OFF_TYPE: usize = 0;
const OFF_SEQ_A: usize = 1;
const OFF_SEQ_B: usize = 5;
const OFF_LEN: usize = 9;
const OFF_DATA: usize = TBSP_HEADER_LEN;

/// A MAC address.
pub type MacAddress = [u8; ETH_ALEN];

/// The broadcast MAC address, `ff:ff:ff:ff:ff:ff`.
pub const BROADCAST: MacAddress = [0xff; ETH_ALEN];

/// TBSP packet type tag.
///
/// `0` is reserved as an error sentinel and is never transmitted by the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum TbspType {
    /// Reserved error sentinel. Never sent; returned by [`TbspHeader::read_type`] for any byte
    /// value the driver does not recognise.
    Error = 0,
    /// Resets the device's stream state.
    Reset = 1,
    /// Carries stream payload; more data follows in this stream.
    Data = 2,
    /// Carries the final payload chunk of a stream and doubles as an end-of-stream request.
    Req = 3,
    /// Acknowledges a REQ or RESET; carries no payload.
    Ack = 4,
}

impl TbspType {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Reset,
            2 => Self::Data,
            3 => Self::Req,
            4 => Self::Ack,
            _ => Self::Error,
        }
    }
}

impl core::fmt::Display for TbspType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Error => f.write_str("ERROR"),
            Self::Reset => f.write_str("RESET"),
            Self::Data => f.write_str("DATA"),
            Self::Req => f.write_str("REQ"),
            Self::Ack => f.write_str("ACK"),
        }
    }
}

/// A view over the TBSP header + payload region of a frame buffer.
///
/// Holds no data of its own; every accessor reads or writes through to the slice it was built
/// from.
pub struct TbspHeader<'a> {
    buf: &'a mut [u8],
}

impl<'a> TbspHeader<'a> {
    /// Wrap the TBSP region of a frame buffer (i.e. everything from [`ETH_HEADER_LEN`] onward).
    ///
    /// Panics if `buf` is shorter than [`TBSP_HEADER_LEN`].
    pub fn new(buf: &'a mut [u8]) -> Self {
        assert!(buf.len() >= TBSP_HEADER_LEN, "buffer too short for TBSP header");
        Self { buf }
    }

    /// Zero the 11-byte header, leaving any payload bytes past it untouched.
    pub fn clear(&mut self) {
        self.buf[..TBSP_HEADER_LEN].fill(0);
    }

    pub fn write_type(&mut self, ty: TbspType) {
        self.buf[OFF_TYPE] = ty as u8;
    }

    pub fn read_type(&self) -> TbspType {
        TbspType::from_u8(self.buf[OFF_TYPE])
    }

    pub fn write_seq_a(&mut self, seq: u32) {
        self.buf[OFF_SEQ_A..OFF_SEQ_A + 4].copy_from_slice(&seq.to_be_bytes());
    }

    pub fn read_seq_a(&self) -> u32 {
        u32::from_be_bytes(self.buf[OFF_SEQ_A..OFF_SEQ_A + 4].try_into().unwrap())
    }

    pub fn write_seq_b(&mut self, seq: u32) {
        self.buf[OFF_SEQ_B..OFF_SEQ_B + 4].copy_from_slice(&seq.to_be_bytes());
    }

    pub fn read_seq_b(&self) -> u32 {
        u32::from_be_bytes(self.buf[OFF_SEQ_B..OFF_SEQ_B + 4].try_into().unwrap())
    }

    pub fn write_length(&mut self, len: u16) {
        self.buf[OFF_LEN..OFF_LEN + 2].copy_from_slice(&len.to_be_bytes());
    }

    pub fn read_length(&self) -> u16 {
        u16::from_be_bytes(self.buf[OFF_LEN..OFF_LEN + 2].try_into().unwrap())
    }

    /// The payload region, sized to [`read_length`](Self::read_length).
    pub fn payload(&self) -> &[u8] {
        let len = self.read_length() as usize;
        &self.buf[OFF_DATA..OFF_DATA + len]
    }

    /// A mutable view of up to [`TBSP_DATA_LEN`] payload bytes, irrespective of the current
    /// length field. Callers write into this then call [`write_length`](Self::write_length).
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[OFF_DATA..]
    }
}

/// Build the 14-byte Ethernet II header at the start of `frame`, then zero-pad `frame` up to
/// [`ETH_ZLEN`] if `payload_len` would otherwise produce a shorter frame.
///
/// Returns the total frame length to hand to the link layer.
pub fn write_ethernet_header(
    frame: &mut [u8; ETH_FRAME_LEN],
    dst: &MacAddress,
    src: &MacAddress,
    payload_len: usize,
) -> usize {
    frame[0..6].copy_from_slice(dst);
    frame[6..12].copy_from_slice(src);
    frame[12..14].copy_from_slice(&TBSP_ETHERTYPE.to_be_bytes());

    let frame_len = ETH_HEADER_LEN + TBSP_HEADER_LEN + payload_len;

    if frame_len < ETH_ZLEN {
        frame[frame_len..ETH_ZLEN].fill(0);
        ETH_ZLEN
    } else {
        frame_len
    }
}

/// Destination MAC of a received frame.
pub fn dst_mac(frame: &[u8]) -> &[u8] {
    &frame[0..6]
}

/// Source MAC of a received frame.
pub fn src_mac(frame: &[u8]) -> &[u8] {
    &frame[6..12]
}

/// Ethertype of a received frame.
pub fn ethertype(frame: &[u8]) -> u16 {
    u16::from_be_bytes([frame[12], frame[13]])
}

/// The TBSP region of a received frame (everything past the 14-byte Ethernet header).
pub fn tbsp_region(frame: &[u8]) -> &[u8] {
    &frame[ETH_HEADER_LEN..]
}

/// Returns whether `frame` passes the configured peer filter: destination MAC, source MAC and
/// Ethertype must all match.
pub fn accepts(frame: &[u8], local: &MacAddress, remote: &MacAddress) -> bool {
    frame.len() >= ETH_HEADER_LEN
        && dst_mac(frame) == local
        && src_mac(frame) == remote
        && ethertype(frame) == TBSP_ETHERTYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_header() {
        let mut buf = [0u8; TBSP_HEADER_LEN + 4];
        let mut header = TbspHeader::new(&mut buf);

        header.clear();
        header.write_type(TbspType::Data);
        header.write_seq_a(0xdead_beef);
        header.write_seq_b(0x1234_5678);
        header.write_length(4);
        header.payload_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);

        assert_eq!(header.read_type(), TbspType::Data);
        assert_eq!(header.read_seq_a(), 0xdead_beef);
        assert_eq!(header.read_seq_b(), 0x1234_5678);
        assert_eq!(header.read_length(), 4);
        assert_eq!(header.payload(), &[1, 2, 3, 4]);
    }

    #[test]
    fn unknown_type_reads_as_error() {
        let mut buf = [0u8; TBSP_HEADER_LEN];
        let mut header = TbspHeader::new(&mut buf);
        header.clear();
        buf[OFF_TYPE] = 0xFF;
        let header = TbspHeader::new(&mut buf);
        assert_eq!(header.read_type(), TbspType::Error);
    }

    #[test]
    fn ethernet_header_pads_short_frames() {
        let mut frame = [0xAAu8; ETH_FRAME_LEN];
        let dst = [1, 2, 3, 4, 5, 6];
        let src = [6, 5, 4, 3, 2, 1];

        let len = write_ethernet_header(&mut frame, &dst, &src, 0);

        assert_eq!(len, ETH_ZLEN);
        assert_eq!(&frame[0..6], &dst);
        assert_eq!(&frame[6..12], &src);
        assert_eq!(ethertype(&frame), TBSP_ETHERTYPE);
        assert!(frame[ETH_HEADER_LEN + TBSP_HEADER_LEN..ETH_ZLEN]
            .iter()
            .all(|&b| b == 0));
    }

    #[test]
    fn ethernet_header_no_pad_when_long_enough() {
        let mut frame = [0u8; ETH_FRAME_LEN];
        let len = write_ethernet_header(&mut frame, &BROADCAST, &BROADCAST, 100);
        assert_eq!(len, ETH_HEADER_LEN + TBSP_HEADER_LEN + 100);
    }

    #[test]
    fn filter_rejects_wrong_ethertype_or_mac() {
        let local: MacAddress = [1, 1, 1, 1, 1, 1];
        let remote: MacAddress = [2, 2, 2, 2, 2, 2];

        let mut good = vec![0u8; ETH_ZLEN];
        good[0..6].copy_from_slice(&local);
        good[6..12].copy_from_slice(&remote);
        good[12..14].copy_from_slice(&TBSP_ETHERTYPE.to_be_bytes());
        assert!(accepts(&good, &local, &remote));

        let mut bad_type = good.clone();
        bad_type[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        assert!(!accepts(&bad_type, &local, &remote));

        let mut bad_src = good.clone();
        bad_src[6..12].copy_from_slice(&[9, 9, 9, 9, 9, 9]);
        assert!(!accepts(&bad_src, &local, &remote));

        let mut bad_dst = good.clone();
        bad_dst[0..6].copy_from_slice(&[9, 9, 9, 9, 9, 9]);
        assert!(!accepts(&bad_dst, &local, &remote));
    }
}
