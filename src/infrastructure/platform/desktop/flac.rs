//! FLAC file encoding
//!
//! Lossless output at the capture rate and channel count, 16-bit samples.

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

const BITS_PER_SAMPLE: usize = 16;

/// Encode interleaved 16-bit PCM into a FLAC stream.
pub fn encode_to_flac(
    interleaved: &[i16],
    channels: u16,
    sample_rate: u32,
) -> Result<Vec<u8>, EncodingError> {
    let samples: Vec<i32> = interleaved.iter().map(|&s| i32::from(s)).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        &samples,
        usize::from(channels),
        BITS_PER_SAMPLE,
        sample_rate as usize,
    );

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}

/// FLAC encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),
}
