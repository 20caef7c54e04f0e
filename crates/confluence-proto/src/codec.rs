//! Binary encoding of [`InterfaceFrame`].
//!
//! A frame is a fixed 48-byte header followed by the bulk fractions and then
//! the trace fractions, each an IEEE-754 `f64`. All multi-byte values are
//! big-endian.
//!
//! ```text
//!  0       4   5   6       8          12         16
//!  | magic | v | f | rsvd  | count    | loopback |
//! 16                  24                  32                  40
//!  | capacitance      | source           | energy           |
//! 40        42        44        48
//!  | bulk_n  | trace_n | rsvd    |  bulk[bulk_n] trace[trace_n]
//! ```

use bitflags::bitflags;
use bytes::{Buf, BufMut, BytesMut};
use zerocopy::byteorder::big_endian::{F64, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::ProtocolError;
use crate::frame::InterfaceFrame;

/// Protocol magic at the start of every encoded frame.
pub const MAGIC: [u8; 4] = *b"CFLX";

/// Current wire version.
pub const VERSION: u8 = 1;

bitflags! {
    /// Header flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u8 {
        /// Sender is in Demand role.
        const DEMAND = 0b0000_0001;
    }
}

/// Fixed-size frame header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    magic: [u8; 4],
    version: u8,
    flags: u8,
    reserved: [u8; 2],
    frame_count: U32,
    frame_loopback: U32,
    capacitance: F64,
    source: F64,
    energy: F64,
    bulk_len: U16,
    trace_len: U16,
    reserved2: [u8; 4],
}

impl FrameHeader {
    /// Encoded size of the header.
    pub const SIZE: usize = 48;

    /// Header describing `frame`.
    pub fn for_frame(frame: &InterfaceFrame) -> Result<Self, ProtocolError> {
        let sizes = frame.sizes();
        let bulk_len =
            u16::try_from(sizes.bulk).map_err(|_| ProtocolError::TooManyFractions(sizes.bulk))?;
        let trace_len =
            u16::try_from(sizes.trace).map_err(|_| ProtocolError::TooManyFractions(sizes.trace))?;

        let mut flags = FrameFlags::empty();
        flags.set(FrameFlags::DEMAND, frame.demand_mode);

        Ok(Self {
            magic: MAGIC,
            version: VERSION,
            flags: flags.bits(),
            reserved: [0; 2],
            frame_count: U32::new(frame.frame_count),
            frame_loopback: U32::new(frame.frame_loopback),
            capacitance: F64::new(frame.capacitance),
            source: F64::new(frame.source),
            energy: F64::new(frame.energy),
            bulk_len: U16::new(bulk_len),
            trace_len: U16::new(trace_len),
            reserved2: [0; 4],
        })
    }

    /// Decoded flag bits. Fails on bits with no defined meaning.
    pub fn flags(&self) -> Result<FrameFlags, ProtocolError> {
        FrameFlags::from_bits(self.flags).ok_or(ProtocolError::UnknownFlags(self.flags))
    }

    /// Number of bytes of fractions following the header.
    pub fn payload_len(&self) -> usize {
        (usize::from(self.bulk_len.get()) + usize::from(self.trace_len.get())) * size_of::<f64>()
    }

    fn check(&self) -> Result<FrameFlags, ProtocolError> {
        if self.magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(self.magic));
        }
        if self.version != VERSION {
            return Err(ProtocolError::UnsupportedVersion(self.version));
        }
        self.flags()
    }
}

impl InterfaceFrame {
    /// Total encoded length of this frame.
    pub fn encoded_len(&self) -> usize {
        let sizes = self.sizes();
        FrameHeader::SIZE + (sizes.bulk + sizes.trace) * size_of::<f64>()
    }

    /// Append the binary encoding of this frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let header = FrameHeader::for_frame(self)?;
        dst.reserve(self.encoded_len());
        dst.put_slice(header.as_bytes());
        for value in self.mixture_fractions().iter().chain(self.trace_mixture_fractions()) {
            dst.put_f64(*value);
        }
        Ok(())
    }

    /// Decode one frame from the start of `src`.
    ///
    /// Trailing bytes after the declared payload are ignored.
    pub fn decode(src: &[u8]) -> Result<Self, ProtocolError> {
        let (header, mut rest) = FrameHeader::read_from_prefix(src).map_err(|_| {
            ProtocolError::TooShort { expected: FrameHeader::SIZE, actual: src.len() }
        })?;
        let flags = header.check()?;

        let payload_len = header.payload_len();
        if rest.len() < payload_len {
            return Err(ProtocolError::TooShort {
                expected: FrameHeader::SIZE + payload_len,
                actual: src.len(),
            });
        }

        let bulk: Vec<f64> = (0..header.bulk_len.get()).map(|_| rest.get_f64()).collect();
        let trace: Vec<f64> = (0..header.trace_len.get()).map(|_| rest.get_f64()).collect();

        Ok(Self::from_parts(
            header.frame_count.get(),
            header.frame_loopback.get(),
            flags.contains(FrameFlags::DEMAND),
            [header.capacitance.get(), header.source.get(), header.energy.get()],
            bulk,
            trace,
        ))
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use proptest::prelude::*;

    use super::*;
    use crate::frame::MixtureSizes;

    fn sample_frame() -> InterfaceFrame {
        let mut frame = InterfaceFrame::new(MixtureSizes::new(2, 1));
        frame.frame_count = 1;
        frame.frame_loopback = 0;
        frame.demand_mode = true;
        frame.capacitance = 1.0;
        frame.source = 2.0;
        frame.energy = 0.5;
        frame.set_fractions(&[0.5, 0.25], &[0.25]);
        frame
    }

    #[test]
    fn header_size_matches_layout() {
        assert_eq!(size_of::<FrameHeader>(), FrameHeader::SIZE);
    }

    #[test]
    fn header_wire_layout() {
        let mut buf = BytesMut::new();
        sample_frame().encode(&mut buf).expect("encode");

        let expected = hex!(
            "43464c58 01 01 0000"
            "00000001 00000000"
            "3ff0000000000000"
            "4000000000000000"
            "3fe0000000000000"
            "0002 0001 00000000"
        );
        assert_eq!(&buf[..FrameHeader::SIZE], &expected[..]);
        assert_eq!(buf.len(), FrameHeader::SIZE + 3 * 8);
        assert_eq!(&buf[FrameHeader::SIZE..FrameHeader::SIZE + 8], &hex!("3fe0000000000000"));
    }

    #[test]
    fn encode_then_decode_preserves_frame() {
        let frame = sample_frame();
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).expect("encode");
        assert_eq!(buf.len(), frame.encoded_len());

        let decoded = InterfaceFrame::decode(&buf).expect("decode");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn decode_rejects_short_header() {
        let result = InterfaceFrame::decode(&[0u8; 10]);
        assert_eq!(result, Err(ProtocolError::TooShort { expected: 48, actual: 10 }));
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let mut buf = BytesMut::new();
        sample_frame().encode(&mut buf).expect("encode");
        let truncated = &buf[..buf.len() - 1];

        let result = InterfaceFrame::decode(truncated);
        assert_eq!(result, Err(ProtocolError::TooShort { expected: 72, actual: 71 }));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut buf = BytesMut::new();
        sample_frame().encode(&mut buf).expect("encode");
        buf[0] = b'X';

        assert_eq!(InterfaceFrame::decode(&buf), Err(ProtocolError::InvalidMagic(*b"XFLX")));
    }

    #[test]
    fn decode_rejects_unknown_version_and_flags() {
        let mut buf = BytesMut::new();
        sample_frame().encode(&mut buf).expect("encode");

        let mut bad_version = buf.clone();
        bad_version[4] = 9;
        assert_eq!(InterfaceFrame::decode(&bad_version), Err(ProtocolError::UnsupportedVersion(9)));

        let mut bad_flags = buf.clone();
        bad_flags[5] = 0x81;
        assert_eq!(InterfaceFrame::decode(&bad_flags), Err(ProtocolError::UnknownFlags(0x81)));

        // Only the demand bit is defined; energy convention is not on the wire.
        let mut energy_bit = buf;
        energy_bit[5] = 0x02;
        assert_eq!(InterfaceFrame::decode(&energy_bit), Err(ProtocolError::UnknownFlags(0x02)));
    }

    #[test]
    fn encode_rejects_oversized_mixture() {
        let frame = InterfaceFrame::new(MixtureSizes::new(70_000, 0));
        let mut buf = BytesMut::new();

        assert_eq!(frame.encode(&mut buf), Err(ProtocolError::TooManyFractions(70_000)));
        assert!(buf.is_empty());
    }

    #[test]
    fn supply_frame_clears_demand_flag() {
        let mut frame = sample_frame();
        frame.demand_mode = false;
        let mut buf = BytesMut::new();
        frame.encode(&mut buf).expect("encode");

        assert_eq!(buf[5], 0);
        assert!(!InterfaceFrame::decode(&buf).expect("decode").demand_mode);
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = InterfaceFrame::decode(&bytes);
        }

        #[test]
        fn decoded_sizes_match_header(bulk in 0usize..8, trace in 0usize..4, count in any::<u32>()) {
            let mut frame = InterfaceFrame::new(MixtureSizes::new(bulk, trace));
            frame.frame_count = count;
            let mut buf = BytesMut::new();
            frame.encode(&mut buf).expect("encode");

            let decoded = InterfaceFrame::decode(&buf).expect("decode");
            prop_assert_eq!(decoded.sizes(), MixtureSizes::new(bulk, trace));
            prop_assert_eq!(decoded.frame_count, count);
        }
    }
}
