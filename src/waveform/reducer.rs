//! Column-by-column reduction of audio frames into painted pixels.

use super::canvas::Canvas;
use super::scale::ColumnStatistics;
use super::{RenderConfig, RenderStatus};
use crate::audio::SampleSource;
use image::Rgba;

/// Paints one waveform into a canvas, one column per step.
///
/// Columns are processed strictly left to right because the line style
/// joins each column to the previous one.
pub struct WaveformReducer<'a> {
    config: &'a RenderConfig,
    previous_median: Option<u32>,
}

impl<'a> WaveformReducer<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self {
            config,
            previous_median: None,
        }
    }

    /// Reads `source` across the full width of `canvas`.
    ///
    /// `progress` receives percentages; returning `false` stops immediately
    /// and leaves the canvas partially painted.
    pub fn paint<S, P>(&mut self, source: &mut S, canvas: &mut Canvas, mut progress: P) -> RenderStatus
    where
        S: SampleSource + ?Sized,
        P: FnMut(u32) -> bool,
    {
        let width = canvas.width();
        let channels = source.channels().max(1);
        let frames_per_pixel = (source.frames() / width as u64).max(1) as usize;
        let progress_step = (width / 100).max(1);

        let mut block = vec![0i16; channels * frames_per_pixel];
        self.previous_median = None;

        for x in 0..width {
            let read = source.read_frames(&mut block, frames_per_pixel) * channels;
            let stats = ColumnStatistics::from_samples(&mut block[..read]);
            self.paint_column(canvas, x, &stats);

            if x % progress_step == 0 && !progress((100 * x as u64 / width as u64) as u32) {
                return RenderStatus::Aborted;
            }
        }

        if !progress(100) {
            return RenderStatus::Aborted;
        }
        RenderStatus::Completed
    }

    fn paint_column(&mut self, canvas: &mut Canvas, x: u32, stats: &ColumnStatistics) {
        let height = canvas.height();
        let rows = self.config.scale.rows(stats, height);
        let (bg, fg) = (self.config.background, self.config.foreground);

        if self.config.line_only {
            canvas.fill_column(x, 0..height, bg);
            if let Some(previous) = self.previous_median {
                draw_connector(canvas, x - 1, previous, rows.median, fg);
            }
            self.previous_median = Some(rows.median);
        } else {
            canvas.fill_column(x, 0..rows.top, bg);
            canvas.fill_column(x, rows.top..rows.bottom, fg);
            canvas.fill_column(x, rows.bottom..height, bg);
        }
    }
}

/// Joins row `y0` in column `x0` to row `y1` in column `x0 + 1`.
///
/// The first half of the vertical run goes in the left column and the rest in
/// the right one, giving a staircase instead of a bar in a single column.
pub fn draw_connector(canvas: &mut Canvas, x0: u32, y0: u32, y1: u32, color: Rgba<u8>) {
    let run = y0.abs_diff(y1);
    for dy in 0..=run {
        let y = if y1 >= y0 { y0 + dy } else { y0 - dy };
        let x = if dy < run / 2 { x0 } else { x0 + 1 };
        canvas.set(x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MemorySource;
    use crate::waveform::AmplitudeScale;

    const BG: Rgba<u8> = Rgba([239, 239, 239, 255]);
    const FG: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn config(width: u32, height: u32, line_only: bool) -> RenderConfig {
        RenderConfig {
            width,
            height,
            background: BG,
            foreground: FG,
            scale: AmplitudeScale::Linear,
            line_only,
        }
    }

    fn column(canvas: &Canvas, x: u32) -> Vec<Rgba<u8>> {
        (0..canvas.height()).map(|y| canvas.get(x, y)).collect()
    }

    #[test]
    fn test_connector_splits_run_at_midpoint() {
        let mut canvas = Canvas::new(2, 30);
        draw_connector(&mut canvas, 0, 10, 20, FG);

        let left: Vec<u32> = (0..30).filter(|&y| canvas.get(0, y) == FG).collect();
        let right: Vec<u32> = (0..30).filter(|&y| canvas.get(1, y) == FG).collect();
        assert_eq!(left, (10..15).collect::<Vec<_>>());
        assert_eq!(right, (15..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_connector_upwards_and_flat() {
        let mut canvas = Canvas::new(2, 10);
        draw_connector(&mut canvas, 0, 8, 4, FG);
        assert_eq!(canvas.get(0, 8), FG);
        assert_eq!(canvas.get(0, 7), FG);
        assert_eq!(canvas.get(1, 6), FG);
        assert_eq!(canvas.get(1, 4), FG);
        assert_ne!(canvas.get(0, 4), FG);

        let mut flat = Canvas::new(2, 10);
        draw_connector(&mut flat, 0, 3, 3, FG);
        assert_eq!(flat.get(1, 3), FG);
        assert_ne!(flat.get(0, 3), FG);
    }

    #[test]
    fn test_fill_mode_paints_every_pixel() {
        let samples: Vec<i16> = (0..400).map(|i| ((i * 997) % 20000 - 10000) as i16).collect();
        let mut source = MemorySource::new(samples, 2);
        let config = config(50, 40, false);
        let mut canvas = Canvas::new(50, 40);

        let status = WaveformReducer::new(&config).paint(&mut source, &mut canvas, |_| true);
        assert_eq!(status, RenderStatus::Completed);

        for x in 0..50 {
            for y in 0..40 {
                let pixel = canvas.get(x, y);
                assert!(pixel == BG || pixel == FG, "unpainted pixel at {x},{y}");
            }
            // foreground is one contiguous band
            let col = column(&canvas, x);
            let first = col.iter().position(|&p| p == FG);
            let last = col.iter().rposition(|&p| p == FG);
            if let (Some(first), Some(last)) = (first, last) {
                assert!(col[first..=last].iter().all(|&p| p == FG));
                assert!(first <= 20 && last + 1 >= 20);
            }
        }
    }

    #[test]
    fn test_line_mode_draws_only_the_connector() {
        // constant signal: every median sits on the same row
        let mut source = MemorySource::new(vec![16384; 40], 1);
        let config = config(4, 20, true);
        let mut canvas = Canvas::new(4, 20);

        WaveformReducer::new(&config).paint(&mut source, &mut canvas, |_| true);

        let median_row = config.scale.rows(
            &ColumnStatistics { min: 0, max: 16384, median: 16384 },
            20,
        ).median;
        assert_eq!(median_row, 15);
        for x in 0..4 {
            let col = column(&canvas, x);
            let painted: Vec<usize> = (0..20).filter(|&y| col[y] == FG).collect();
            if x == 0 {
                assert!(painted.is_empty(), "first column has no predecessor");
            } else {
                assert_eq!(painted, vec![15]);
            }
        }
    }

    #[test]
    fn test_progress_reports_and_ends_at_100() {
        let mut source = MemorySource::new(vec![0; 1000], 1);
        let config = config(250, 10, false);
        let mut canvas = Canvas::new(250, 10);
        let mut seen = Vec::new();

        WaveformReducer::new(&config).paint(&mut source, &mut canvas, |p| {
            seen.push(p);
            true
        });

        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        // step of 2 columns over 250 columns, plus the final report
        assert_eq!(seen.len(), 126);
    }

    #[test]
    fn test_progress_abort_stops_painting() {
        let mut source = MemorySource::new(vec![20000; 1000], 1);
        let config = config(200, 10, false);
        let mut canvas = Canvas::new(200, 10);

        let status = WaveformReducer::new(&config).paint(&mut source, &mut canvas, |p| p < 50);

        assert_eq!(status, RenderStatus::Aborted);
        assert_eq!(canvas.get(199, 9), Rgba([0, 0, 0, 0]));
        assert_eq!(canvas.get(0, 9), BG);
    }
}
