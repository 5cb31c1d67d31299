//! Binary encoding of [`ValueDict`]s: MessagePack, compressed with zstd.
//!
//! Waveforms are long lists of floats, which compress well; both sides of a
//! transport only have to agree on these two functions.

use crate::{CodecError, ValueDict};

fn decompress(raw: &[u8]) -> Result<Vec<u8>, CodecError> {
    use ruzstd::io::Read;
    let mut decoder = ruzstd::decoding::StreamingDecoder::new(raw)
        .map_err(|e| CodecError::Decompression(std::io::Error::other(e)))?;
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(CodecError::Decompression)?;
    Ok(decompressed)
}

fn compress(raw: &[u8]) -> Vec<u8> {
    ruzstd::encoding::compress_to_vec(raw, ruzstd::encoding::CompressionLevel::Default)
}

pub fn encode(values: &ValueDict) -> Result<Vec<u8>, CodecError> {
    let raw = rmp_serde::to_vec(values)?;
    Ok(compress(&raw))
}

pub fn decode(bytes: &[u8]) -> Result<ValueDict, CodecError> {
    let raw = decompress(bytes)?;
    Ok(rmp_serde::from_slice(&raw)?)
}
