//! Output writers for decoded spike data.
//!
//! Supports CSV export of spike times and snapshots, and re-encoding a
//! dataset into the native spike file layout.

use crate::types::{
    DecodeOptions, FileFormat, FileHeader, SpikeDataset, SpikeRecord, CHANNEL_TOKEN_LEN,
    MAX_SNAPSHOT_SAMPLES,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output writing.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// CSV writer for spike times.
///
/// Each row is `native_name,custom_name,timestamp_s,spike_id`.
pub struct SpikeCsvWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> SpikeCsvWriter<W> {
    /// Creates a new spike CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the column header row.
    pub fn write_header(&mut self) -> Result<(), OutputError> {
        writeln!(self.writer, "native_name,custom_name,timestamp_s,spike_id")?;
        Ok(())
    }

    /// Writes every spike of the dataset, channel by channel.
    pub fn write_dataset(&mut self, dataset: &SpikeDataset) -> Result<(), OutputError> {
        for chan in &dataset.channels {
            for spike in &chan.spikes {
                writeln!(
                    self.writer,
                    "{},{},{},{}",
                    chan.channel.native_name,
                    chan.channel.custom_name,
                    spike.timestamp_seconds,
                    spike.spike_id
                )?;
            }
        }
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// CSV writer for spike snapshots.
///
/// The first row holds the shared time axis in seconds; each following row
/// is `native_name,spike_index,uV_0,uV_1,...`.
pub struct SnapshotCsvWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> SnapshotCsvWriter<W> {
    /// Creates a new snapshot CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the time axis row.
    pub fn write_time_axis(&mut self, axis: &[f64]) -> Result<(), OutputError> {
        write!(self.writer, "channel,spike")?;
        for t in axis {
            write!(self.writer, ",{}", t)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    /// Writes the time axis and every snapshot of the dataset.
    pub fn write_dataset(&mut self, dataset: &SpikeDataset) -> Result<(), OutputError> {
        let axis = dataset.snapshot_time_axis.as_deref().ok_or_else(|| {
            OutputError::InvalidFormat("dataset has no snapshots".to_string())
        })?;
        self.write_time_axis(axis)?;

        for chan in &dataset.channels {
            for (i, spike) in chan.spikes.iter().enumerate() {
                let Some(snapshot) = &spike.snapshot else {
                    continue;
                };
                write!(self.writer, "{},{}", chan.channel.native_name, i)?;
                for uv in &snapshot.microvolts {
                    write!(self.writer, ",{}", uv)?;
                }
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writer for the native spike file layout.
///
/// The header is written on construction; records follow in the order they
/// are passed to [`SpikeFileWriter::write_record`]. Only records that decode
/// back onto the same channel are accepted: single-channel records must sit
/// on the single-channel index, and multi-channel records on the first
/// channel carrying their native name.
pub struct SpikeFileWriter<W: Write> {
    writer: BufWriter<W>,
    header: FileHeader,
    single_channel_index: usize,
}

impl<W: Write> SpikeFileWriter<W> {
    /// Creates a writer and immediately writes `header`.
    pub fn new(writer: W, header: FileHeader) -> Result<Self, OutputError> {
        if header.native_channel_names.len() != header.custom_channel_names.len() {
            return Err(OutputError::InvalidFormat(format!(
                "{} native channel names but {} custom names",
                header.native_channel_names.len(),
                header.custom_channel_names.len()
            )));
        }
        for name in header
            .native_channel_names
            .iter()
            .chain(&header.custom_channel_names)
        {
            if name.contains(',') || name.contains('\0') {
                return Err(OutputError::InvalidFormat(format!(
                    "channel name {:?} contains a separator or NUL byte",
                    name
                )));
            }
        }
        if header.source_file_name.contains('\0') {
            return Err(OutputError::InvalidFormat(
                "source file name contains a NUL byte".to_string(),
            ));
        }
        if header.n_samples() as u64 > MAX_SNAPSHOT_SAMPLES {
            return Err(OutputError::InvalidFormat(format!(
                "snapshot window of {} samples exceeds the maximum of {}",
                header.n_samples(),
                MAX_SNAPSHOT_SAMPLES
            )));
        }

        let mut writer = BufWriter::new(writer);
        writer.write_all(&header.format.magic().to_le_bytes())?;
        writer.write_all(&header.version.to_le_bytes())?;
        write_cstr(&mut writer, &header.source_file_name)?;
        write_cstr(&mut writer, &header.native_channel_names.join(","))?;
        write_cstr(&mut writer, &header.custom_channel_names.join(","))?;
        writer.write_all(&header.sample_rate_hz.to_le_bytes())?;
        writer.write_all(&header.samples_pre_detect.to_le_bytes())?;
        writer.write_all(&header.samples_post_detect.to_le_bytes())?;

        Ok(Self {
            writer,
            header,
            single_channel_index: DecodeOptions::default().single_channel_index,
        })
    }

    /// Sets the channel index single-channel records must belong to.
    ///
    /// Must match the index the file will be decoded with.
    pub fn with_single_channel_index(mut self, index: usize) -> Self {
        self.single_channel_index = index;
        self
    }

    /// Writes one record.
    pub fn write_record(&mut self, record: &SpikeRecord) -> Result<(), OutputError> {
        let index = record.channel_index;
        let name = self.header.native_channel_names.get(index).ok_or_else(|| {
            OutputError::InvalidFormat(format!("channel index {} out of range", index))
        })?;

        match self.header.format {
            FileFormat::MultiChannel => {
                if name.len() != CHANNEL_TOKEN_LEN {
                    return Err(OutputError::InvalidFormat(format!(
                        "channel name {:?} is not a {}-byte token",
                        name, CHANNEL_TOKEN_LEN
                    )));
                }
                let first = self
                    .header
                    .native_channel_names
                    .iter()
                    .position(|n| n == name);
                if first != Some(index) {
                    return Err(OutputError::InvalidFormat(format!(
                        "channel {} shares native name {:?} with an earlier channel",
                        index, name
                    )));
                }
                self.writer.write_all(name.as_bytes())?;
            }
            FileFormat::SingleChannel => {
                if index != self.single_channel_index {
                    return Err(OutputError::InvalidFormat(format!(
                        "single-channel records belong to channel {}, got channel {}",
                        self.single_channel_index, index
                    )));
                }
            }
        }

        self.writer.write_all(&record.raw_timestamp.to_le_bytes())?;
        self.writer.write_all(&[record.spike_id])?;

        let n_samples = self.header.n_samples();
        match (&record.snapshot, n_samples) {
            (None, 0) => {}
            (Some(snapshot), n) if snapshot.raw.len() == n => {
                for sample in &snapshot.raw {
                    self.writer.write_all(&sample.to_le_bytes())?;
                }
            }
            (snapshot, n) => {
                return Err(OutputError::InvalidFormat(format!(
                    "record has {} snapshot samples, header declares {}",
                    snapshot.as_ref().map_or(0, |s| s.raw.len()),
                    n
                )));
            }
        }
        Ok(())
    }

    /// Flushes buffered output and returns the inner writer.
    pub fn finish(self) -> Result<W, OutputError> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Io(e.into_error()))
    }
}

fn write_cstr<W: Write>(writer: &mut W, s: &str) -> std::io::Result<()> {
    writer.write_all(s.as_bytes())?;
    writer.write_all(&[0])
}

/// Encodes a dataset into the native spike file layout.
///
/// Records are written channel by channel, each channel in dataset order.
/// Single-channel datasets may only hold spikes on the default
/// single-channel index.
pub fn encode_dataset(dataset: &SpikeDataset) -> Result<Vec<u8>, OutputError> {
    let mut writer = SpikeFileWriter::new(Vec::new(), dataset.header.clone())?;
    for spike in dataset.iter_spikes() {
        writer.write_record(spike)?;
    }
    writer.finish()
}

/// Writes spike times to a CSV file.
pub fn write_spike_csv<P: AsRef<Path>>(path: P, dataset: &SpikeDataset) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = SpikeCsvWriter::new(file);
    writer.write_header()?;
    writer.write_dataset(dataset)?;
    writer.flush()?;
    Ok(())
}

/// Writes spike snapshots (in microvolts) to a CSV file.
pub fn write_snapshot_csv<P: AsRef<Path>>(
    path: P,
    dataset: &SpikeDataset,
) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = SnapshotCsvWriter::new(file);
    writer.write_dataset(dataset)?;
    writer.flush()?;
    Ok(())
}

/// Writes a dataset to disk in the native spike file layout.
pub fn write_spike_file<P: AsRef<Path>>(
    path: P,
    dataset: &SpikeDataset,
) -> Result<(), OutputError> {
    let bytes = encode_dataset(dataset)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::SpikeDecoder;
    use crate::snapshot;
    use crate::types::{Channel, ChannelSpikes, Snapshot};

    fn header(format: FileFormat, pre: u32, post: u32) -> FileHeader {
        FileHeader {
            format,
            version: 1,
            source_file_name: "session.rhd".to_string(),
            native_channel_names: vec!["A-001".to_string(), "A-002".to_string()],
            custom_channel_names: vec!["ChanA".to_string(), "ChanB".to_string()],
            sample_rate_hz: 30000.0,
            samples_pre_detect: pre,
            samples_post_detect: post,
        }
    }

    fn spike(
        channel_index: usize,
        raw_timestamp: i32,
        spike_id: u8,
        raw: Option<Vec<u16>>,
    ) -> SpikeRecord {
        SpikeRecord {
            channel_index,
            raw_timestamp,
            timestamp_seconds: f64::from(raw_timestamp) / 30000.0,
            spike_id,
            snapshot: raw.map(|raw| Snapshot {
                microvolts: snapshot::convert_snapshot(&raw),
                raw,
            }),
        }
    }

    fn dataset(header: FileHeader, per_channel: Vec<Vec<SpikeRecord>>) -> SpikeDataset {
        let snapshot_time_axis = header.snapshots_present().then(|| {
            snapshot::time_axis(
                header.samples_pre_detect,
                header.samples_post_detect,
                header.sample_rate_hz,
            )
        });
        let channels = per_channel
            .into_iter()
            .enumerate()
            .map(|(index, spikes)| ChannelSpikes {
                channel: Channel {
                    index,
                    native_name: header.native_channel_names[index].clone(),
                    custom_name: header.custom_channel_names[index].clone(),
                },
                spikes,
            })
            .collect();
        SpikeDataset {
            header,
            channels,
            snapshot_time_axis,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_roundtrip_multichannel() {
        let original = dataset(
            header(FileFormat::MultiChannel, 1, 2),
            vec![
                vec![
                    spike(0, 10, 1, Some(vec![1, 2, 3])),
                    spike(0, 40, 128, Some(vec![4, 5, 6])),
                ],
                vec![spike(1, 25, 1, Some(vec![65535, 0, 32768]))],
            ],
        );

        let bytes = encode_dataset(&original).unwrap();
        let decoded = SpikeDecoder::new().decode_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_roundtrip_single_channel() {
        let original = dataset(
            header(FileFormat::SingleChannel, 0, 0),
            vec![vec![], vec![spike(1, 7, 1, None), spike(1, 9, 1, None)]],
        );

        let bytes = encode_dataset(&original).unwrap();
        let decoded = SpikeDecoder::new().decode_bytes(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_single_channel_rejects_multiple_populated_channels() {
        let ds = dataset(
            header(FileFormat::SingleChannel, 0, 0),
            vec![vec![spike(0, 1, 1, None)], vec![spike(1, 2, 1, None)]],
        );
        assert!(matches!(
            encode_dataset(&ds),
            Err(OutputError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_single_channel_rejects_spikes_off_the_single_channel_index() {
        // Would decode back onto channel 1
        let ds = dataset(
            header(FileFormat::SingleChannel, 0, 0),
            vec![vec![spike(0, 1, 1, None)], vec![]],
        );
        assert!(matches!(
            encode_dataset(&ds),
            Err(OutputError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_single_channel_index_roundtrip() {
        let original = dataset(
            header(FileFormat::SingleChannel, 0, 0),
            vec![vec![spike(0, 3, 1, None), spike(0, 5, 128, None)], vec![]],
        );

        let mut writer = SpikeFileWriter::new(Vec::new(), original.header.clone())
            .unwrap()
            .with_single_channel_index(0);
        for spike in original.iter_spikes() {
            writer.write_record(spike).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let decoded = SpikeDecoder::new()
            .single_channel_index(0)
            .decode_bytes(&bytes)
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_rejects_spike_on_duplicate_native_name() {
        let mut h = header(FileFormat::MultiChannel, 0, 0);
        h.native_channel_names[1] = "A-001".to_string();

        // The first channel with the name still encodes
        let ok = dataset(h.clone(), vec![vec![spike(0, 1, 1, None)], vec![]]);
        let decoded = SpikeDecoder::new()
            .decode_bytes(&encode_dataset(&ok).unwrap())
            .unwrap();
        assert_eq!(decoded, ok);

        // A spike on the second "A-001" would decode back onto channel 0
        let shadowed = dataset(h, vec![vec![], vec![spike(1, 1, 1, None)]]);
        assert!(matches!(
            encode_dataset(&shadowed),
            Err(OutputError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_snapshot_window() {
        let h = header(FileFormat::MultiChannel, 1 << 16, 1);
        assert!(matches!(
            SpikeFileWriter::new(Vec::new(), h),
            Err(OutputError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_bad_token_length() {
        let mut h = header(FileFormat::MultiChannel, 0, 0);
        h.native_channel_names[0] = "A-1".to_string();
        let mut writer = SpikeFileWriter::new(Vec::new(), h).unwrap();
        assert!(matches!(
            writer.write_record(&spike(0, 1, 1, None)),
            Err(OutputError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_snapshot_length_mismatch() {
        let mut writer =
            SpikeFileWriter::new(Vec::new(), header(FileFormat::MultiChannel, 1, 1)).unwrap();
        assert!(writer.write_record(&spike(0, 1, 1, Some(vec![1]))).is_err());
        assert!(writer.write_record(&spike(0, 1, 1, None)).is_err());
    }

    #[test]
    fn test_rejects_separator_in_channel_name() {
        let mut h = header(FileFormat::MultiChannel, 0, 0);
        h.custom_channel_names[1] = "a,b".to_string();
        assert!(SpikeFileWriter::new(Vec::new(), h).is_err());
    }

    #[test]
    fn test_spike_csv_writer() {
        let ds = dataset(
            header(FileFormat::MultiChannel, 0, 0),
            vec![vec![spike(0, 15000, 1, None)], vec![spike(1, 30000, 128, None)]],
        );

        let mut output = Vec::new();
        {
            let mut writer = SpikeCsvWriter::new(&mut output);
            writer.write_header().unwrap();
            writer.write_dataset(&ds).unwrap();
            writer.flush().unwrap();
        }

        let output_str = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output_str.lines().collect();
        assert_eq!(lines[0], "native_name,custom_name,timestamp_s,spike_id");
        assert_eq!(lines[1], "A-001,ChanA,0.5,1");
        assert_eq!(lines[2], "A-002,ChanB,1,128");
    }

    #[test]
    fn test_snapshot_csv_writer() {
        let ds = dataset(
            header(FileFormat::MultiChannel, 1, 1),
            vec![vec![spike(0, 1, 1, Some(vec![32768, 32768]))], vec![]],
        );

        let mut output = Vec::new();
        {
            let mut writer = SnapshotCsvWriter::new(&mut output);
            writer.write_dataset(&ds).unwrap();
            writer.flush().unwrap();
        }

        let output_str = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output_str.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("channel,spike,"));
        assert_eq!(lines[1], "A-001,0,0,0");
    }

    #[test]
    fn test_snapshot_csv_requires_snapshots() {
        let ds = dataset(header(FileFormat::MultiChannel, 0, 0), vec![vec![], vec![]]);
        let mut writer = SnapshotCsvWriter::new(Vec::new());
        assert!(writer.write_dataset(&ds).is_err());
    }
}
