//! Conversion of raw snapshot samples to physical units.
//!
//! Snapshot samples are stored as unsigned 16-bit amplifier ADC codes with
//! a midscale offset of 32768 and a resolution of 0.195 uV per bit.

/// Amplifier resolution in microvolts per ADC step.
pub const MICROVOLTS_PER_BIT: f64 = 0.195;

/// ADC code corresponding to 0 uV.
pub const ADC_MIDSCALE: f64 = 32768.0;

/// Converts one raw ADC sample to microvolts.
#[inline]
pub fn to_microvolts(raw: u16) -> f64 {
    MICROVOLTS_PER_BIT * (f64::from(raw) - ADC_MIDSCALE)
}

/// Converts a raw snapshot element-wise, preserving order.
pub fn convert_snapshot(raw: &[u16]) -> Vec<f64> {
    raw.iter().map(|&s| to_microvolts(s)).collect()
}

/// Builds the snapshot time axis in seconds relative to the detection point.
///
/// `axis[k] = (k - samples_pre_detect) / sample_rate_hz` for every sample
/// `k` of the acquisition window. The axis is shared by every snapshot in a
/// file.
pub fn time_axis(
    samples_pre_detect: u32,
    samples_post_detect: u32,
    sample_rate_hz: f32,
) -> Vec<f64> {
    let n_samples = samples_pre_detect as usize + samples_post_detect as usize;
    let pre = f64::from(samples_pre_detect);
    let rate = f64::from(sample_rate_hz);
    (0..n_samples).map(|k| (k as f64 - pre) / rate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_to_microvolts() {
        assert_eq!(to_microvolts(32768), 0.0);
        assert!((to_microvolts(0) - (-6389.76)).abs() < EPS);
        assert!((to_microvolts(65535) - 0.195 * (65535.0 - 32768.0)).abs() < EPS);
        assert!((to_microvolts(32769) - 0.195).abs() < EPS);
    }

    #[test]
    fn test_convert_snapshot_preserves_order() {
        let uv = convert_snapshot(&[32768, 0, 32769]);
        assert_eq!(uv.len(), 3);
        assert_eq!(uv[0], 0.0);
        assert!(uv[1] < 0.0);
        assert!(uv[2] > 0.0);
        assert!(convert_snapshot(&[]).is_empty());
    }

    #[test]
    fn test_time_axis() {
        let axis = time_axis(10, 20, 30000.0);
        assert_eq!(axis.len(), 30);
        assert!((axis[0] - (-10.0 / 30000.0)).abs() < EPS);
        assert_eq!(axis[10], 0.0);
        assert!((axis[29] - 19.0 / 30000.0).abs() < EPS);

        // Strictly increasing by one sample period
        for pair in axis.windows(2) {
            assert!((pair[1] - pair[0] - 1.0 / 30000.0).abs() < EPS);
        }
    }

    #[test]
    fn test_time_axis_empty_window() {
        assert!(time_axis(0, 0, 30000.0).is_empty());
    }
}
