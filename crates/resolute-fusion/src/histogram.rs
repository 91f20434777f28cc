//! Joint intensity histograms of two co-registered volumes.
//!
//! Bins are one intensity unit wide: channel `c` gets `max_c - min_c + 1`
//! bins over its observed range, so integer-valued data maps one value to one
//! bin. Samples are paired by flat voxel index.

use burn::tensor::backend::Backend;
use resolute_core::error::{ResoluteError, Result};
use resolute_core::image::{Image, ImageMetadata};
use resolute_core::spatial::{Direction, Point, Spacing};
use tracing::debug;

/// Upper bound on `bins_a * bins_b`; beyond this the intensities are almost
/// certainly not integer-quantized.
pub const MAX_TOTAL_BINS: usize = 1 << 26;

/// 2-D frequency grid over the intensity ranges of two channels.
#[derive(Debug, Clone, PartialEq)]
pub struct JointHistogram {
    minimum: [f32; 2],
    maximum: [f32; 2],
    dims: [usize; 2],
    /// Row-major, channel A along rows.
    counts: Vec<u64>,
}

impl JointHistogram {
    /// Empty histogram covering `[minimum, maximum]` on each channel.
    pub fn new(minimum: [f32; 2], maximum: [f32; 2]) -> Result<Self> {
        let dims = [
            bin_count(minimum[0], maximum[0])?,
            bin_count(minimum[1], maximum[1])?,
        ];
        let total = dims[0].checked_mul(dims[1]).filter(|&t| t <= MAX_TOTAL_BINS).ok_or_else(|| {
            ResoluteError::computation(format!(
                "joint histogram of {} x {} bins exceeds {} bins",
                dims[0], dims[1], MAX_TOTAL_BINS
            ))
        })?;

        Ok(Self {
            minimum,
            maximum,
            dims,
            counts: vec![0; total],
        })
    }

    /// Bins per axis, `[channel A, channel B]`.
    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    pub fn minimum(&self) -> [f32; 2] {
        self.minimum
    }

    pub fn maximum(&self) -> [f32; 2] {
        self.maximum
    }

    /// Bin of `value` on `channel` (0 = A, 1 = B), clamped into range.
    pub fn bin_of(&self, channel: usize, value: f32) -> usize {
        let offset = (value - self.minimum[channel]).round();
        if offset <= 0.0 {
            0
        } else {
            (offset as usize).min(self.dims[channel] - 1)
        }
    }

    /// Count one sample pair.
    pub fn add(&mut self, a: f32, b: f32) {
        let index = self.bin_of(0, a) * self.dims[1] + self.bin_of(1, b);
        self.counts[index] += 1;
    }

    pub fn frequency(&self, bin_a: usize, bin_b: usize) -> u64 {
        self.counts[bin_a * self.dims[1] + bin_b]
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total_frequency(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Frequencies of channel A alone.
    pub fn marginal_a(&self) -> Vec<u64> {
        self.counts
            .chunks(self.dims[1])
            .map(|row| row.iter().sum())
            .collect()
    }

    /// Frequencies of channel B alone.
    pub fn marginal_b(&self) -> Vec<u64> {
        let mut marginal = vec![0; self.dims[1]];
        for row in self.counts.chunks(self.dims[1]) {
            for (total, &count) in marginal.iter_mut().zip(row) {
                *total += count;
            }
        }
        marginal
    }

    /// Render as a 2-D intensity image: axis 0 is channel A, origin at the
    /// channel minima, one unit per bin.
    pub fn to_image<B: Backend>(&self, device: &B::Device) -> Result<Image<B, 2>> {
        let metadata = ImageMetadata::new(
            Point::new([f64::from(self.minimum[0]), f64::from(self.minimum[1])]),
            Spacing::uniform(1.0),
            Direction::identity(),
        );
        let samples = self.counts.iter().map(|&c| c as f32).collect();
        Image::from_samples(samples, self.dims, &metadata, device)
    }
}

/// Computes [`JointHistogram`]s from pairs of volumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointHistogramEngine;

impl JointHistogramEngine {
    pub fn new() -> Self {
        Self
    }

    /// Histogram of `channel_a` against `channel_b`.
    ///
    /// Bin ranges come from a full scan of each channel. When `mask` is given
    /// only voxels with a non-zero mask value are counted.
    pub fn compute<B: Backend, const D: usize>(
        &self,
        channel_a: &Image<B, D>,
        channel_b: &Image<B, D>,
        mask: Option<&Image<B, D>>,
    ) -> Result<JointHistogram> {
        if channel_a.shape() != channel_b.shape() {
            return Err(ResoluteError::shape_mismatch(&channel_a.shape(), &channel_b.shape()));
        }
        if let Some(mask) = mask {
            if mask.shape() != channel_a.shape() {
                return Err(ResoluteError::shape_mismatch(&channel_a.shape(), &mask.shape()));
            }
        }

        let a = channel_a.samples()?;
        let b = channel_b.samples()?;

        let (min_a, max_a) = intensity_range(&a).map_err(|e| {
            ResoluteError::computation(format!("could not calculate min/max for channel A: {}", e))
        })?;
        debug!("Channel A: min = {}, max = {}", min_a, max_a);
        let (min_b, max_b) = intensity_range(&b).map_err(|e| {
            ResoluteError::computation(format!("could not calculate min/max for channel B: {}", e))
        })?;
        debug!("Channel B: min = {}, max = {}", min_b, max_b);

        let mut histogram = JointHistogram::new([min_a, min_b], [max_a, max_b])?;

        match mask {
            Some(mask) => {
                let labels = mask.samples()?;
                for ((&va, &vb), &label) in a.iter().zip(&b).zip(&labels) {
                    if label != 0.0 {
                        histogram.add(va, vb);
                    }
                }
            }
            None => {
                for (&va, &vb) in a.iter().zip(&b) {
                    histogram.add(va, vb);
                }
            }
        }

        let [bins_a, bins_b] = histogram.dims();
        debug!(
            "Joint histogram: {} x {} bins, {} samples",
            bins_a,
            bins_b,
            histogram.total_frequency()
        );
        Ok(histogram)
    }
}

fn intensity_range(samples: &[f32]) -> std::result::Result<(f32, f32), String> {
    let mut iter = samples.iter().copied();
    let first = iter.next().ok_or_else(|| "volume is empty".to_string())?;
    let mut range = (first, first);
    for v in std::iter::once(first).chain(iter) {
        if !v.is_finite() {
            return Err(format!("non-finite sample {}", v));
        }
        range.0 = range.0.min(v);
        range.1 = range.1.max(v);
    }
    Ok(range)
}

fn bin_count(minimum: f32, maximum: f32) -> Result<usize> {
    if !(minimum.is_finite() && maximum.is_finite()) || maximum < minimum {
        return Err(ResoluteError::computation(format!(
            "invalid histogram range [{}, {}]",
            minimum, maximum
        )));
    }
    Ok((f64::from(maximum) - f64::from(minimum) + 1.0) as usize)
}
