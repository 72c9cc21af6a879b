//! Decoder library for Intan RHX spike data files.
//!
//! RHX acquisition software can save detected spikes to a compact binary
//! file: a header describing the channels and snapshot window, followed by
//! one fixed-size record per spike (channel token, timestamp, spike ID and
//! an optional voltage snapshot). This crate decodes such files into a
//! per-channel [`SpikeDataset`].
//!
//! # Example
//!
//! ```no_run
//! use rhx_spike_core::SpikeDecoder;
//!
//! let decoder = SpikeDecoder::new().exclude_artifacts(true);
//! let dataset = decoder.decode_file("spike.dat").unwrap();
//!
//! for chan in &dataset.channels {
//!     println!("{}: {} spikes", chan.channel.custom_name, chan.spikes.len());
//! }
//! ```
//!
//! # Features
//!
//! - Multi-channel and single-channel file variants
//! - Timestamps in seconds and snapshots in microvolts
//! - Optional removal of spikes flagged as artifacts
//! - CSV export and re-encoding to the native layout

pub mod channels;
pub mod cursor;
pub mod decoder;
pub mod header;
pub mod output;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use decoder::{decode, decode_file, DecodeError, SpikeDecoder};
pub use output::{encode_dataset, OutputError};
pub use types::{
    Channel, ChannelSpikes, DecodeOptions, DecodeWarning, FileFormat, FileHeader, Snapshot,
    SpikeDataset, SpikeRecord,
};
