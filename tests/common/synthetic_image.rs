use vessel_detector::image::{ImageF32, MaskImage};

/// Uniform background with one horizontal bright segment, plus the matching
/// ground-truth mask. Mimics a single straight vessel at 0°.
pub fn line_image(
    width: usize,
    height: usize,
    row: usize,
    col_start: usize,
    length: usize,
    background: f32,
    foreground: f32,
) -> (ImageF32, MaskImage) {
    assert!(row < height && col_start + length <= width);

    let mut image = ImageF32::from_vec(width, height, vec![background; width * height]);
    let mut truth = MaskImage::new(width, height);
    for x in col_start..col_start + length {
        image.set(x, row, foreground);
        truth.set(x, row, true);
    }
    (image, truth)
}
