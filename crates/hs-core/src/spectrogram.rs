//! Read-only access to precomputed multi-resolution spectrograms.
//!
//! The spectral estimation itself happens elsewhere. This module only checks
//! that each precomputed level is internally consistent and hands out
//! borrowed views into it.

use std::ops::Range;

use rayon::prelude::*;

use crate::types::ScoringError;

/// Row-major power matrix: one row per frequency bin, one column per time bin.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl PowerMatrix {
    /// Wraps `data`, returning `None` unless it holds exactly `rows * cols` values.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Option<Self> {
        (rows.checked_mul(cols)? == data.len()).then_some(Self { rows, cols, data })
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }

    /// Power across time for one frequency bin.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.cols)?;
        let end = start.checked_add(self.cols)?;
        self.data.get(start..end)
    }
}

/// One precomputed resolution level.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramLevel {
    pub name: String,
    pub time_axis: Vec<f64>,
    pub freq_axis: Vec<f64>,
    /// One matrix per recording channel.
    pub channels: Vec<PowerMatrix>,
}

impl SpectrogramLevel {
    fn validate(&self, level: usize) -> Result<(), ScoringError> {
        let malformed = |reason: String| ScoringError::MalformedSpectrogram { level, reason };

        if !self.time_axis.windows(2).all(|w| w[0] < w[1]) {
            return Err(malformed("time axis is not strictly increasing".to_string()));
        }

        let (n_freq, n_time) = (self.freq_axis.len(), self.time_axis.len());
        let mismatch = self
            .channels
            .par_iter()
            .enumerate()
            .find_map_any(|(channel, matrix)| {
                (matrix.rows() != n_freq || matrix.cols() != n_time).then(|| {
                    format!(
                        "channel {channel} is {}x{}, axes are {n_freq}x{n_time}",
                        matrix.rows(),
                        matrix.cols()
                    )
                })
            });
        mismatch.map_or(Ok(()), |reason| Err(malformed(reason)))
    }
}

/// Borrowed view of one channel at one resolution level.
#[derive(Debug, Clone, Copy)]
pub struct SpectrogramView<'a> {
    pub time_axis: &'a [f64],
    pub freq_axis: &'a [f64],
    pub power: &'a PowerMatrix,
}

impl SpectrogramView<'_> {
    /// Column range whose time bins fall inside `[start, end]`.
    pub fn window(&self, start: f64, end: f64) -> Range<usize> {
        let lo = self.time_axis.partition_point(|&t| t < start);
        let hi = self.time_axis.partition_point(|&t| t <= end);
        lo..hi.max(lo)
    }
}

/// Source of spectrogram views, indexed by resolution level and channel.
pub trait SpectrogramSource {
    /// Number of resolution levels available.
    fn level_count(&self) -> usize;

    /// Display name of a level.
    fn level_name(&self, level: usize) -> Option<&str>;

    /// Returns the view for a level and channel, if both exist.
    fn view(&self, level: usize, channel: usize) -> Option<SpectrogramView<'_>>;
}

/// Fully populated spectrogram cache, ordered coarsest level first.
#[derive(Debug, Clone, Default)]
pub struct SpectrogramCache {
    levels: Vec<SpectrogramLevel>,
}

impl SpectrogramCache {
    /// Validates every level's matrices against its axes.
    pub fn new(levels: Vec<SpectrogramLevel>) -> Result<Self, ScoringError> {
        for (index, level) in levels.iter().enumerate() {
            level.validate(index)?;
        }
        Ok(Self { levels })
    }
}

impl SpectrogramSource for SpectrogramCache {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_name(&self, level: usize) -> Option<&str> {
        self.levels.get(level).map(|l| l.name.as_str())
    }

    fn view(&self, level: usize, channel: usize) -> Option<SpectrogramView<'_>> {
        let level = self.levels.get(level)?;
        Some(SpectrogramView {
            time_axis: &level.time_axis,
            freq_axis: &level.freq_axis,
            power: level.channels.get(channel)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Level with `n_time` bins spaced `step` seconds apart and two channels.
    pub(crate) fn level(name: &str, n_time: usize, step: f64) -> SpectrogramLevel {
        let freq_axis = vec![0.5, 1.0, 2.0];
        #[expect(clippy::cast_precision_loss, reason = "small test sizes")]
        let time_axis: Vec<f64> = (0..n_time).map(|i| i as f64 * step).collect();
        #[expect(clippy::cast_precision_loss, reason = "small test sizes")]
        let channel = |offset: f32| {
            let data = (0..freq_axis.len() * n_time)
                .map(|i| i as f32 + offset)
                .collect();
            PowerMatrix::new(freq_axis.len(), n_time, data).unwrap()
        };
        SpectrogramLevel {
            name: name.to_string(),
            channels: vec![channel(0.0), channel(1000.0)],
            time_axis,
            freq_axis,
        }
    }

    #[test]
    fn power_matrix_requires_matching_length() {
        assert!(PowerMatrix::new(2, 3, vec![0.0; 6]).is_some());
        assert!(PowerMatrix::new(2, 3, vec![0.0; 5]).is_none());
        assert!(PowerMatrix::new(usize::MAX, 2, Vec::new()).is_none());
    }

    #[test]
    fn power_matrix_indexes_row_major() {
        let matrix = PowerMatrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(matrix.get(1, 0), Some(4.0));
        assert_eq!(matrix.get(0, 3), None);
        assert_eq!(matrix.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(matrix.row(2), None);
        assert_eq!(matrix.row(usize::MAX / 3), None);
    }

    #[test]
    fn cache_rejects_channel_shape_mismatch() {
        let mut bad = level("stage", 4, 30.0);
        bad.channels[1] = PowerMatrix::new(3, 5, vec![0.0; 15]).unwrap();

        let err = SpectrogramCache::new(vec![level("full", 2, 300.0), bad]).unwrap_err();
        match err {
            ScoringError::MalformedSpectrogram { level, reason } => {
                assert_eq!(level, 1);
                assert!(reason.contains("channel 1"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cache_rejects_unsorted_time_axis() {
        let mut bad = level("full", 3, 300.0);
        bad.time_axis.swap(0, 2);
        assert!(SpectrogramCache::new(vec![bad]).is_err());
    }

    #[test]
    fn view_borrows_level_and_channel() {
        let cache = SpectrogramCache::new(vec![level("full", 4, 300.0), level("stage", 8, 30.0)])
            .unwrap();

        assert_eq!(cache.level_count(), 2);
        assert_eq!(cache.level_name(1), Some("stage"));

        let view = cache.view(1, 1).unwrap();
        assert_eq!(view.time_axis.len(), 8);
        assert_eq!(view.power.get(0, 0), Some(1000.0));
        assert!(cache.view(2, 0).is_none());
        assert!(cache.view(0, 2).is_none());
    }

    #[test]
    fn window_selects_columns_inside_time_range() {
        let cache = SpectrogramCache::new(vec![level("stage", 10, 30.0)]).unwrap();
        let view = cache.view(0, 0).unwrap();

        assert_eq!(view.window(60.0, 150.0), 2..6);
        assert_eq!(view.window(61.0, 89.0), 3..3);
        assert_eq!(view.window(-100.0, 1e9), 0..10);
    }
}
