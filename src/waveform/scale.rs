//! Amplitude-to-row mapping.

use crate::audio::FULL_SCALE;

/// Level reported for digital silence.
pub const SILENCE_DB: f32 = -9999.9;

/// Converts a linear amplitude to decibels. Zero maps to [`SILENCE_DB`].
pub fn float2db(x: f32) -> f32 {
    let x = x.abs();
    if x > 0.0 {
        20.0 * x.log10()
    } else {
        SILENCE_DB
    }
}

/// Converts decibels to a linear amplitude.
pub fn db2float(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Maps `x` from `[in_min, in_max]` onto `[out_min, out_max]`, clamped to the
/// output range.
pub fn map2range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let mapped = out_min + (out_max - out_min) * (x - in_min) / (in_max - in_min);
    // NaN (from a degenerate input range) lands on the lower bound
    if mapped.is_nan() {
        return out_min;
    }
    mapped.clamp(out_min, out_max)
}

/// Vertical amplitude scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmplitudeScale {
    Linear,
    /// Levels between `floor` and `ceiling` dBFS are spread over half the height.
    Decibel { floor: f32, ceiling: f32 },
}

/// Per-column sample statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnStatistics {
    pub min: i16,
    pub max: i16,
    pub median: i16,
}

impl ColumnStatistics {
    /// Computes min, max and median over interleaved samples.
    ///
    /// Channels are not separated, so the median of a multi-channel column is
    /// taken over all channels at once. Reorders `samples`.
    pub fn from_samples(samples: &mut [i16]) -> Self {
        let (min, max) = samples
            .iter()
            .fold((0i16, 0i16), |(lo, hi), &s| (lo.min(s), hi.max(s)));

        let median = if samples.is_empty() {
            0
        } else {
            let mid = samples.len() / 2;
            *samples.select_nth_unstable(mid).1
        };

        Self { min, max, median }
    }
}

/// Pixel rows derived from one column's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRows {
    /// First foreground row (inclusive), in `[0, height/2]`.
    pub top: u32,
    /// End of the foreground band (exclusive), in `[height/2, height]`.
    pub bottom: u32,
    /// Row the line-only style passes through, in `[0, height)`.
    pub median: u32,
}

impl AmplitudeScale {
    /// Maps column statistics to rows of a canvas `height` pixels tall.
    pub fn rows(&self, stats: &ColumnStatistics, height: u32) -> ColumnRows {
        let h = height as f32;
        let half = h / 2.0;
        let norm = |v: i16| v as f32 / FULL_SCALE;

        let (top, bottom, median) = match *self {
            AmplitudeScale::Linear => (
                map2range(stats.min as f32, -FULL_SCALE, 0.0, 0.0, half),
                map2range(stats.max as f32, 0.0, FULL_SCALE, half, h),
                map2range(stats.median as f32, -FULL_SCALE, FULL_SCALE, 0.0, h),
            ),
            AmplitudeScale::Decibel { floor, ceiling } => {
                // Levels grow from the whole-pixel centre row
                let center = (height / 2) as f32;
                let level = |v: i16| map2range(float2db(norm(v)), floor, ceiling, 0.0, half);
                (
                    center - level(stats.min),
                    center + level(stats.max),
                    center + level(stats.median),
                )
            }
        };

        ColumnRows {
            top: top.clamp(0.0, half) as u32,
            bottom: bottom.clamp(half, h) as u32,
            median: (median.max(0.0) as u32).min(height.saturating_sub(1)),
        }
    }
}
