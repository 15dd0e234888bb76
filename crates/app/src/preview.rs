use spectrum_bars_core::{BarShape, PcmBuffer, VisualizerConfig};

/// Peak magnitude per band, scaled to the bar height.
///
/// This is only a placeholder for a real spectrum analyser: each band is the
/// loudest sample in an equal slice of the buffer.
pub fn channel_levels(pcm: &PcmBuffer, detail: u32) -> (Vec<f64>, Vec<f64>) {
    let detail = detail as usize;
    if detail == 0 || pcm.is_empty() {
        return (vec![0.0; detail], vec![0.0; detail]);
    }

    let chunk = pcm.len().div_ceil(detail).max(1);
    let scale = |v: i16| f64::from(v.unsigned_abs()) / f64::from(i16::MAX as u16) * 100.0;

    let mut left = vec![0.0; detail];
    let mut right = vec![0.0; detail];
    for (band, samples) in pcm.samples().chunks(chunk).enumerate().take(detail) {
        left[band] = samples.iter().map(|s| scale(s.l)).fold(0.0, f64::max);
        right[band] = samples.iter().map(|s| scale(s.r)).fold(0.0, f64::max);
    }
    (left, right)
}

/// Text rendering of a frame, one character column per band.
pub fn ascii(config: &VisualizerConfig, shapes: &[BarShape]) -> String {
    const ROWS: u32 = 16;

    let total = if config.stereo {
        config.bar_height + config.stereo_space
    } else {
        config.bar_height
    }
    .max(1);
    let columns = shapes.iter().map(|s| s.band + 1).max().unwrap_or(0);

    let mut grid = vec![vec![' '; columns]; ROWS as usize];
    for shape in shapes {
        let top = (shape.y.max(0.0) / total as f32 * ROWS as f32).floor() as usize;
        let bottom = ((shape.y + shape.height as f32) / total as f32 * ROWS as f32).ceil() as usize;
        for row in grid.iter_mut().take(bottom.min(ROWS as usize)).skip(top) {
            row[shape.band] = '#';
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
