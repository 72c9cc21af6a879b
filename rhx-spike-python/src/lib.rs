//! Python bindings for the Intan RHX spike file decoder with numpy support.
//!
//! This module provides Python bindings using PyO3 that decode spike files
//! into per-channel numpy arrays, ready for plotting or further analysis.

use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use rhx_spike_core::{DecodeError, FileFormat, SpikeDataset, SpikeDecoder};
use std::path::PathBuf;

/// Spikes of one channel in columnar format.
///
/// Timestamps, spike IDs and snapshots are stored as separate arrays, which
/// maps directly onto numpy.
#[pyclass]
pub struct ChannelSpikes {
    /// Channel index in the file header
    #[pyo3(get)]
    index: usize,
    /// Native channel name (e.g. "A-000")
    #[pyo3(get)]
    native_name: String,
    /// User-assigned channel name
    #[pyo3(get)]
    custom_name: String,
    /// Timestamps in seconds
    timestamps: Vec<f64>,
    /// Spike IDs (128 = likely artifact)
    spike_ids: Vec<u8>,
    /// Snapshots in microvolts, row-major (one row per spike)
    snapshots: Vec<f64>,
    /// Samples per snapshot
    n_samples: usize,
}

#[pymethods]
impl ChannelSpikes {
    /// Returns the number of spikes.
    fn __len__(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns a string representation.
    fn __repr__(&self) -> String {
        format!(
            "ChannelSpikes(native_name={:?}, custom_name={:?}, count={})",
            self.native_name,
            self.custom_name,
            self.timestamps.len()
        )
    }

    /// Returns the spike timestamps in seconds as a numpy array.
    #[getter]
    fn timestamps<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.timestamps.clone().into_pyarray(py)
    }

    /// Returns the spike IDs as a numpy array.
    ///
    /// Values: 1 = normal spike, 128 = likely artifact
    #[getter]
    fn spike_ids<'py>(&self, py: Python<'py>) -> &'py PyArray1<u8> {
        self.spike_ids.clone().into_pyarray(py)
    }

    /// Returns the snapshots in microvolts as a 2-D numpy array.
    ///
    /// Shape is (spikes, samples); samples is 0 if the file has no snapshots.
    #[getter]
    fn snapshots<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        self.snapshots
            .clone()
            .into_pyarray(py)
            .reshape([self.timestamps.len(), self.n_samples])
    }

    /// Returns all arrays as a dictionary.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("native_name", &self.native_name)?;
        dict.set_item("custom_name", &self.custom_name)?;
        dict.set_item("timestamps", self.timestamps(py))?;
        dict.set_item("spike_ids", self.spike_ids(py))?;
        dict.set_item("snapshots", self.snapshots(py)?)?;
        Ok(dict.into())
    }
}

/// A decoded spike file.
#[pyclass]
pub struct SpikeFile {
    /// Name of the recording the spikes were extracted from
    #[pyo3(get)]
    source_file_name: String,
    /// Spike file version
    #[pyo3(get)]
    version: u16,
    /// True for multi-channel files
    #[pyo3(get)]
    multichannel: bool,
    /// Amplifier sample rate in Hz
    #[pyo3(get)]
    sample_rate: f32,
    /// Snapshot samples before the detection point
    #[pyo3(get)]
    samples_pre_detect: u32,
    /// Snapshot samples after the detection point
    #[pyo3(get)]
    samples_post_detect: u32,
    /// Non-fatal decode warnings
    #[pyo3(get)]
    warnings: Vec<String>,
    snapshot_time: Vec<f64>,
    channels: Vec<Py<ChannelSpikes>>,
}

#[pymethods]
impl SpikeFile {
    /// Returns the number of channels.
    fn __len__(&self) -> usize {
        self.channels.len()
    }

    /// Returns a string representation.
    fn __repr__(&self) -> String {
        format!(
            "SpikeFile(channels={}, sample_rate={}, snapshot_samples={})",
            self.channels.len(),
            self.sample_rate,
            self.snapshot_time.len()
        )
    }

    /// Returns the snapshot time axis in seconds relative to detection.
    ///
    /// The axis is shared by all channels and is empty if the file has no
    /// snapshots.
    #[getter]
    fn snapshot_time<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.snapshot_time.clone().into_pyarray(py)
    }

    /// Returns the per-channel spike containers, indexed by channel.
    #[getter]
    fn channels(&self, py: Python<'_>) -> Vec<Py<ChannelSpikes>> {
        self.channels.iter().map(|c| c.clone_ref(py)).collect()
    }

    /// Looks up a channel by native or custom name.
    fn channel(&self, py: Python<'_>, name: &str) -> Option<Py<ChannelSpikes>> {
        self.channels
            .iter()
            .find(|c| {
                let c = c.borrow(py);
                c.native_name == name || c.custom_name == name
            })
            .map(|c| c.clone_ref(py))
    }
}

impl SpikeFile {
    /// Converts a decoded dataset into Python-owned containers.
    fn from_dataset(py: Python<'_>, dataset: SpikeDataset) -> PyResult<Self> {
        let header = dataset.header;
        let n_samples = header.n_samples();

        let mut channels = Vec::with_capacity(dataset.channels.len());
        for chan in dataset.channels {
            let len = chan.spikes.len();
            let mut timestamps = Vec::with_capacity(len);
            let mut spike_ids = Vec::with_capacity(len);
            let mut snapshots = Vec::with_capacity(len * n_samples);

            for spike in chan.spikes {
                timestamps.push(spike.timestamp_seconds);
                spike_ids.push(spike.spike_id);
                if let Some(snapshot) = spike.snapshot {
                    snapshots.extend(snapshot.microvolts);
                }
            }

            channels.push(Py::new(
                py,
                ChannelSpikes {
                    index: chan.channel.index,
                    native_name: chan.channel.native_name,
                    custom_name: chan.channel.custom_name,
                    timestamps,
                    spike_ids,
                    snapshots,
                    n_samples,
                },
            )?);
        }

        Ok(Self {
            source_file_name: header.source_file_name,
            version: header.version,
            multichannel: header.format == FileFormat::MultiChannel,
            sample_rate: header.sample_rate_hz,
            samples_pre_detect: header.samples_pre_detect,
            samples_post_detect: header.samples_post_detect,
            warnings: dataset.warnings.iter().map(|w| w.to_string()).collect(),
            snapshot_time: dataset.snapshot_time_axis.unwrap_or_default(),
            channels,
        })
    }
}

fn to_py_err(err: DecodeError) -> PyErr {
    match err {
        DecodeError::Io(e) => PyIOError::new_err(format!("Failed to read spike file: {}", e)),
        other => PyValueError::new_err(format!("Failed to decode spike file: {}", other)),
    }
}

fn decoder(no_artifacts: bool, single_channel_index: usize) -> SpikeDecoder {
    SpikeDecoder::new()
        .exclude_artifacts(no_artifacts)
        .single_channel_index(single_channel_index)
}

/// Decodes an Intan RHX spike data file.
///
/// Args:
///     path: Path to the spike file
///     no_artifacts: Drop spikes flagged as likely artifacts (ID 128)
///     single_channel_index: Channel that single-channel records belong to
///
/// Returns:
///     SpikeFile: Header fields, snapshot time axis and per-channel spikes
///
/// Example:
///     >>> import rhx_spikes
///     >>> f = rhx_spikes.decode_file("spike.dat", no_artifacts=True)
///     >>> chan = f.channels[1]
///     >>> plt.plot(f.snapshot_time, chan.snapshots[5])
#[pyfunction]
#[pyo3(signature = (path, no_artifacts=false, single_channel_index=1))]
fn decode_file(
    py: Python<'_>,
    path: &str,
    no_artifacts: bool,
    single_channel_index: usize,
) -> PyResult<Py<SpikeFile>> {
    let path = PathBuf::from(path);

    let dataset = decoder(no_artifacts, single_channel_index)
        .decode_file(&path)
        .map_err(to_py_err)?;

    Py::new(py, SpikeFile::from_dataset(py, dataset)?)
}

/// Decodes spike file contents already held in memory.
///
/// Args:
///     data: Raw bytes of a spike file
///     no_artifacts: Drop spikes flagged as likely artifacts (ID 128)
///     single_channel_index: Channel that single-channel records belong to
///
/// Returns:
///     SpikeFile: Header fields, snapshot time axis and per-channel spikes
#[pyfunction]
#[pyo3(signature = (data, no_artifacts=false, single_channel_index=1))]
fn decode_bytes(
    py: Python<'_>,
    data: &[u8],
    no_artifacts: bool,
    single_channel_index: usize,
) -> PyResult<Py<SpikeFile>> {
    let dataset = decoder(no_artifacts, single_channel_index)
        .decode_bytes(data)
        .map_err(to_py_err)?;

    Py::new(py, SpikeFile::from_dataset(py, dataset)?)
}

/// Intan RHX spike file decoder module for Python.
#[pymodule]
fn rhx_spikes(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(decode_file, m)?)?;
    m.add_function(wrap_pyfunction!(decode_bytes, m)?)?;
    m.add_class::<SpikeFile>()?;
    m.add_class::<ChannelSpikes>()?;
    Ok(())
}
