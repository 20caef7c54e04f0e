//! Fuzz target for [`InterfaceFrame::decode`]
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary bytes
//! - A decoded frame re-encodes to exactly `encoded_len` bytes
//! - Encoding is a fixed point: decode then encode reproduces the same bytes
//!   (reserved bytes are normalized on the first pass)
//! - Validity can always be queried, whatever the decoded values

#![no_main]

use bytes::BytesMut;
use confluence_proto::InterfaceFrame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = InterfaceFrame::decode(data) else {
        return;
    };

    let _ = frame.validity();

    let mut first = BytesMut::new();
    frame.encode(&mut first).expect("decoded frame must re-encode");
    assert_eq!(first.len(), frame.encoded_len());

    let again = InterfaceFrame::decode(&first).expect("encoded frame must decode");
    let mut second = BytesMut::new();
    again.encode(&mut second).expect("decoded frame must re-encode");
    assert_eq!(first, second, "encoding is not a fixed point");
});
