//! Spike file header parsing.
//!
//! Layout (little-endian):
//!
//! ```text
//! u32   magic number
//! u16   version
//! cstr  source file name
//! cstr  native channel names, comma-separated
//! cstr  custom channel names, comma-separated
//! f32   sample rate (Hz)
//! u32   samples pre-detect
//! u32   samples post-detect
//! ```

use crate::cursor::ByteCursor;
use crate::decoder::DecodeError;
use crate::types::{
    DecodeWarning, FileFormat, FileHeader, MAX_SNAPSHOT_SAMPLES, SUPPORTED_VERSION,
};
use log::{debug, warn};
use std::io::Read;

/// Parses the header from a freshly opened cursor.
///
/// Returns the header together with any non-fatal warnings. Fatal problems
/// (unknown magic number, inconsistent channel lists, non-positive sample
/// rate, oversized snapshot window, short input) abort with an error.
pub fn parse_header<R: Read>(
    cursor: &mut ByteCursor<R>,
) -> Result<(FileHeader, Vec<DecodeWarning>), DecodeError> {
    let magic = cursor.read_u32()?;
    let format =
        FileFormat::from_magic(magic).ok_or(DecodeError::UnrecognizedFormat { magic })?;

    let version = cursor.read_u16()?;
    let source_file_name = cursor.read_cstring()?;
    let native_channel_names = split_channel_list(&cursor.read_cstring()?);
    let custom_channel_names = split_channel_list(&cursor.read_cstring()?);

    if native_channel_names.len() != custom_channel_names.len() {
        return Err(DecodeError::MalformedHeader(format!(
            "channel list length mismatch: {} native names, {} custom names",
            native_channel_names.len(),
            custom_channel_names.len()
        )));
    }

    let sample_rate_hz = cursor.read_f32()?;
    if sample_rate_hz.is_nan() || sample_rate_hz <= 0.0 {
        return Err(DecodeError::MalformedHeader(format!(
            "sample rate must be positive, got {}",
            sample_rate_hz
        )));
    }

    let samples_pre_detect = cursor.read_u32()?;
    let samples_post_detect = cursor.read_u32()?;
    let window = u64::from(samples_pre_detect) + u64::from(samples_post_detect);
    if window > MAX_SNAPSHOT_SAMPLES {
        return Err(DecodeError::MalformedHeader(format!(
            "snapshot window of {}+{} samples exceeds the maximum of {}",
            samples_pre_detect, samples_post_detect, MAX_SNAPSHOT_SAMPLES
        )));
    }

    let header = FileHeader {
        format,
        version,
        source_file_name,
        native_channel_names,
        custom_channel_names,
        sample_rate_hz,
        samples_pre_detect,
        samples_post_detect,
    };

    let mut warnings = Vec::new();
    if !header.is_version_supported() {
        warn!(
            "Spike file version {} is not supported by this reader (latest known: {}); \
             decoding with the version {} layout",
            version, SUPPORTED_VERSION, SUPPORTED_VERSION
        );
        warnings.push(DecodeWarning::UnsupportedVersion {
            found: version,
            supported: SUPPORTED_VERSION,
        });
    }

    debug!(
        "Parsed {:?} header v{}: {} channels, {} Hz, snapshot {}+{} samples, header ends at {}",
        header.format,
        header.version,
        header.channel_count(),
        header.sample_rate_hz,
        header.samples_pre_detect,
        header.samples_post_detect,
        cursor.position()
    );

    Ok((header, warnings))
}

/// Splits a comma-separated channel list. An empty list yields one empty name.
fn split_channel_list(list: &str) -> Vec<String> {
    list.split(',').map(str::to_string).collect()
}
