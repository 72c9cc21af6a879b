//! Core types for decoded Intan RHX spike data.
//!
//! This module defines the file header, channel, spike record and dataset
//! structures produced by a single decode pass over a spike file.

/// Magic number of a multi-channel spike file.
pub const MULTICHANNEL_MAGIC: u32 = 0x18f8_474b;

/// Magic number of a single-channel spike file.
pub const SINGLE_CHANNEL_MAGIC: u32 = 0x18f8_8c00;

/// Highest spike file version this decoder knows the layout of.
pub const SUPPORTED_VERSION: u16 = 1;

/// Spike ID reserved for events flagged as likely artifacts.
pub const ARTIFACT_SPIKE_ID: u8 = 128;

/// Length in bytes of the channel-name token preceding each multi-channel record.
pub const CHANNEL_TOKEN_LEN: usize = 5;

/// Largest snapshot window (pre + post samples) accepted in a header.
///
/// RHX snapshot windows span a few milliseconds; 65536 samples is over two
/// seconds at 30 kHz.
pub const MAX_SNAPSHOT_SAMPLES: u64 = 1 << 16;

/// On-disk layout variant, derived from the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Every record is tagged with a 5-byte channel-name token.
    MultiChannel,
    /// Records carry no channel token.
    SingleChannel,
}

impl FileFormat {
    /// Maps a magic number to a file format.
    #[inline]
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            MULTICHANNEL_MAGIC => Some(Self::MultiChannel),
            SINGLE_CHANNEL_MAGIC => Some(Self::SingleChannel),
            _ => None,
        }
    }

    /// Returns the magic number written for this format.
    #[inline]
    pub fn magic(self) -> u32 {
        match self {
            Self::MultiChannel => MULTICHANNEL_MAGIC,
            Self::SingleChannel => SINGLE_CHANNEL_MAGIC,
        }
    }
}

/// Header of a spike file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// Layout variant
    pub format: FileFormat,
    /// Spike file version number
    pub version: u16,
    /// Name of the recording the spikes were extracted from
    pub source_file_name: String,
    /// Native channel names (e.g. "A-000"), one per channel
    pub native_channel_names: Vec<String>,
    /// User-assigned channel names, parallel to `native_channel_names`
    pub custom_channel_names: Vec<String>,
    /// Amplifier sample rate in Hz
    pub sample_rate_hz: f32,
    /// Snapshot samples captured before the detection point
    pub samples_pre_detect: u32,
    /// Snapshot samples captured after the detection point
    pub samples_post_detect: u32,
}

impl FileHeader {
    /// Number of channels declared by the header.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.native_channel_names.len()
    }

    /// Number of samples in each snapshot (0 when snapshots were not saved).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.samples_pre_detect as usize + self.samples_post_detect as usize
    }

    /// Whether every record carries a voltage snapshot.
    #[inline]
    pub fn snapshots_present(&self) -> bool {
        self.n_samples() > 0
    }

    /// Size in bytes of one record following the header.
    pub fn record_size(&self) -> u64 {
        let token = match self.format {
            FileFormat::MultiChannel => CHANNEL_TOKEN_LEN as u64,
            FileFormat::SingleChannel => 0,
        };
        // i32 timestamp + u8 spike id + u16 per snapshot sample
        token + 4 + 1 + 2 * self.n_samples() as u64
    }

    /// Whether the header version is newer than the layout known to this crate.
    #[inline]
    pub fn is_version_supported(&self) -> bool {
        self.version <= SUPPORTED_VERSION
    }
}

/// A recording channel declared in the file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Position of the channel in the header's channel lists
    pub index: usize,
    /// Native channel name, matched against record tokens
    pub native_name: String,
    /// User-assigned channel name
    pub custom_name: String,
}

/// A spike snapshot in both raw ADC units and microvolts.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Raw unsigned 16-bit ADC samples as stored in the file
    pub raw: Vec<u16>,
    /// Calibrated samples in microvolts
    pub microvolts: Vec<f64>,
}

/// A single decoded spike event.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeRecord {
    /// Index of the channel the spike was detected on
    pub channel_index: usize,
    /// Timestamp in amplifier samples, as stored in the file
    pub raw_timestamp: i32,
    /// Timestamp in seconds (`raw_timestamp / sample_rate_hz`)
    pub timestamp_seconds: f64,
    /// Spike ID: 1 for normal spikes, 128 for likely artifacts
    pub spike_id: u8,
    /// Voltage snapshot around the spike, present iff the file saved snapshots
    pub snapshot: Option<Snapshot>,
}

impl SpikeRecord {
    /// Returns true if the spike is flagged as a likely artifact.
    #[inline]
    pub fn is_artifact(&self) -> bool {
        self.spike_id == ARTIFACT_SPIKE_ID
    }
}

/// Spikes decoded for one channel, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpikes {
    pub channel: Channel,
    pub spikes: Vec<SpikeRecord>,
}

/// Non-fatal conditions reported while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// The file version is newer than the known layout; decoding used the
    /// best-known layout anyway.
    UnsupportedVersion { found: u16, supported: u16 },
}

impl std::fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "spike file version {} is newer than supported version {}",
                found, supported
            ),
        }
    }
}

/// Result of decoding a spike file.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeDataset {
    /// Parsed file header
    pub header: FileHeader,
    /// Per-channel spikes, indexed by channel index
    pub channels: Vec<ChannelSpikes>,
    /// Snapshot time axis in seconds relative to detection, shared by all channels
    pub snapshot_time_axis: Option<Vec<f64>>,
    /// Non-fatal conditions encountered during decoding
    pub warnings: Vec<DecodeWarning>,
}

impl SpikeDataset {
    /// Total number of spikes across all channels.
    pub fn total_spikes(&self) -> usize {
        self.channels.iter().map(|c| c.spikes.len()).sum()
    }

    /// Number of spikes flagged as likely artifacts.
    pub fn artifact_count(&self) -> usize {
        self.iter_spikes().filter(|s| s.is_artifact()).count()
    }

    /// Returns the spikes of the channel at `index`.
    pub fn channel(&self, index: usize) -> Option<&ChannelSpikes> {
        self.channels.get(index)
    }

    /// Looks up a channel by native or custom name.
    pub fn channel_by_name(&self, name: &str) -> Option<&ChannelSpikes> {
        self.channels
            .iter()
            .find(|c| c.channel.native_name == name || c.channel.custom_name == name)
    }

    /// Iterates over all spikes, channel by channel.
    pub fn iter_spikes(&self) -> impl Iterator<Item = &SpikeRecord> {
        self.channels.iter().flat_map(|c| c.spikes.iter())
    }
}

/// Options controlling how records are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Drop spikes whose ID marks them as likely artifacts
    pub exclude_artifacts: bool,
    /// Channel index assigned to every record of a single-channel file
    pub single_channel_index: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            exclude_artifacts: false,
            single_channel_index: 1,
        }
    }
}
