//! Spike file decoder.
//!
//! Parses the header once, then reads fixed-size records until the source
//! is exhausted, attributing each one to a channel and converting its
//! timestamp and snapshot to physical units.

use crate::channels::ChannelRegistry;
use crate::cursor::ByteCursor;
use crate::header::parse_header;
use crate::snapshot;
use crate::types::{
    ChannelSpikes, DecodeOptions, FileFormat, FileHeader, Snapshot, SpikeDataset, SpikeRecord,
    ARTIFACT_SPIKE_ID,
};
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while decoding a spike file.
///
/// Every variant is fatal: no partial dataset is returned.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized file type: magic number {magic:#010x}")]
    UnrecognizedFormat { magic: u32 },

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Unknown channel {token:?} in record at byte {offset}")]
    UnknownChannel { token: String, offset: u64 },

    #[error("Truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: u64,
        needed: u64,
        available: u64,
    },
}

/// Spike file decoder.
#[derive(Debug, Clone, Default)]
pub struct SpikeDecoder {
    pub options: DecodeOptions,
}

impl SpikeDecoder {
    /// Creates a decoder with default options (artifacts kept).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with the given options.
    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Drops spikes flagged as likely artifacts (spike ID 128).
    pub fn exclude_artifacts(mut self, exclude: bool) -> Self {
        self.options.exclude_artifacts = exclude;
        self
    }

    /// Sets the channel index used for every record of a single-channel file.
    pub fn single_channel_index(mut self, index: usize) -> Self {
        self.options.single_channel_index = index;
        self
    }

    /// Decodes a spike file from disk.
    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> Result<SpikeDataset, DecodeError> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        self.decode_reader(BufReader::new(file), len)
    }

    /// Decodes a spike file already held in memory.
    pub fn decode_bytes(&self, data: &[u8]) -> Result<SpikeDataset, DecodeError> {
        self.decode_reader(data, data.len() as u64)
    }

    /// Decodes `len` bytes of spike file data from `reader`.
    pub fn decode_reader<R: Read>(&self, reader: R, len: u64) -> Result<SpikeDataset, DecodeError> {
        let mut cursor = ByteCursor::new(reader, len);

        let (header, warnings) = parse_header(&mut cursor)?;
        let registry = ChannelRegistry::new(&header, self.options.single_channel_index);

        let record_count = check_record_alignment(&header, &cursor)?;
        if header.format == FileFormat::SingleChannel
            && record_count > 0
            && registry.single_channel_index() >= registry.len()
        {
            return Err(DecodeError::MalformedHeader(format!(
                "single-channel records map to channel {}, but the header declares {}",
                registry.single_channel_index(),
                registry.len()
            )));
        }

        let mut spikes: Vec<Vec<SpikeRecord>> = vec![Vec::new(); registry.len()];
        let mut discarded = 0u64;

        while cursor.remaining() > 0 {
            match self.decode_record(&header, &registry, &mut cursor)? {
                Some(record) => spikes[record.channel_index].push(record),
                None => discarded += 1,
            }
        }

        debug!(
            "Decoded {} records ({} artifacts discarded) across {} channels",
            record_count,
            discarded,
            registry.len()
        );

        let snapshot_time_axis = header.snapshots_present().then(|| {
            snapshot::time_axis(
                header.samples_pre_detect,
                header.samples_post_detect,
                header.sample_rate_hz,
            )
        });

        let channels = registry
            .channels()
            .iter()
            .cloned()
            .zip(spikes)
            .map(|(channel, spikes)| ChannelSpikes { channel, spikes })
            .collect();

        Ok(SpikeDataset {
            header,
            channels,
            snapshot_time_axis,
            warnings,
        })
    }

    /// Reads one record. Returns `None` if the record was discarded as an
    /// artifact.
    fn decode_record<R: Read>(
        &self,
        header: &FileHeader,
        registry: &ChannelRegistry,
        cursor: &mut ByteCursor<R>,
    ) -> Result<Option<SpikeRecord>, DecodeError> {
        let offset = cursor.position();
        let channel_index = registry.resolve(header.format, cursor)?;
        let raw_timestamp = cursor.read_i32()?;
        let spike_id = cursor.read_u8()?;

        // The snapshot is read even for discarded records to stay aligned.
        let raw_snapshot = if header.snapshots_present() {
            Some(cursor.read_u16_vec(header.n_samples())?)
        } else {
            None
        };

        if self.options.exclude_artifacts && spike_id == ARTIFACT_SPIKE_ID {
            trace!("Discarding artifact at byte {} on channel {}", offset, channel_index);
            return Ok(None);
        }

        let snapshot = raw_snapshot.map(|raw| {
            let microvolts = snapshot::convert_snapshot(&raw);
            Snapshot { raw, microvolts }
        });

        Ok(Some(SpikeRecord {
            channel_index,
            raw_timestamp,
            timestamp_seconds: f64::from(raw_timestamp) / f64::from(header.sample_rate_hz),
            spike_id,
            snapshot,
        }))
    }
}

/// Checks that the bytes after the header form a whole number of records.
///
/// Returns the record count, or `TruncatedInput` pointing at the start of
/// the partial trailing record.
fn check_record_alignment<R: Read>(
    header: &FileHeader,
    cursor: &ByteCursor<R>,
) -> Result<u64, DecodeError> {
    let record_size = header.record_size();
    let body = cursor.remaining();
    let partial = body % record_size;
    if partial != 0 {
        return Err(DecodeError::TruncatedInput {
            offset: cursor.position() + (body - partial),
            needed: record_size,
            available: partial,
        });
    }
    Ok(body / record_size)
}

/// Decodes an in-memory spike file with the given options.
pub fn decode(data: &[u8], options: DecodeOptions) -> Result<SpikeDataset, DecodeError> {
    SpikeDecoder::with_options(options).decode_bytes(data)
}

/// Decodes a spike file from disk with the given options.
pub fn decode_file<P: AsRef<Path>>(
    path: P,
    options: DecodeOptions,
) -> Result<SpikeDataset, DecodeError> {
    SpikeDecoder::with_options(options).decode_file(path)
}
