//! DCA framing: a 2-byte little-endian length prefix ahead of each Opus
//! payload, for sinks that require it. Sinks that accept raw Opus frames
//! skip this step entirely.

/// Wraps an Opus payload in a DCA frame. Panics if `payload` exceeds
/// `u16::MAX` bytes, which an Opus frame at any sane bitrate never does.
pub fn dca_frame(payload: &[u8]) -> Vec<u8> {
    let len = u16::try_from(payload.len()).expect("opus frame exceeds u16 length prefix");
    let mut framed = Vec::with_capacity(2 + payload.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(payload);
    framed
}
