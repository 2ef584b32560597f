use crate::utils::error::WasteError;
use crate::Result;
use ndarray::Array3;

/// Geometry and normalization primitives shared by the model preprocessors.
/// All functions operate on HWC `Array3<f32>` images with values 0..255,
/// except `to_chw_normalized` which produces the CHW tensor layout the ONNX
/// models consume.
pub struct ImageTransforms;

impl ImageTransforms {
    /// Bilinear resize to an exact target size.
    pub fn resize_bilinear(image: &Array3<f32>, new_h: usize, new_w: usize) -> Result<Array3<f32>> {
        let (orig_h, orig_w, channels) = image.dim();

        if orig_h == 0 || orig_w == 0 || new_h == 0 || new_w == 0 {
            return Err(WasteError::InvalidInput(format!(
                "Cannot resize {}x{} image to {}x{}",
                orig_h, orig_w, new_h, new_w
            )));
        }

        let mut resized = Array3::<f32>::zeros((new_h, new_w, channels));
        let scale_y = orig_h as f32 / new_h as f32;
        let scale_x = orig_w as f32 / new_w as f32;

        for y in 0..new_h {
            // Sample at pixel centers
            let src_y = ((y as f32 + 0.5) * scale_y - 0.5).max(0.0);
            let y0 = (src_y as usize).min(orig_h - 1);
            let y1 = (y0 + 1).min(orig_h - 1);
            let fy = src_y - y0 as f32;

            for x in 0..new_w {
                let src_x = ((x as f32 + 0.5) * scale_x - 0.5).max(0.0);
                let x0 = (src_x as usize).min(orig_w - 1);
                let x1 = (x0 + 1).min(orig_w - 1);
                let fx = src_x - x0 as f32;

                for c in 0..channels {
                    let top = image[[y0, x0, c]] * (1.0 - fx) + image[[y0, x1, c]] * fx;
                    let bottom = image[[y1, x0, c]] * (1.0 - fx) + image[[y1, x1, c]] * fx;
                    resized[[y, x, c]] = top * (1.0 - fy) + bottom * fy;
                }
            }
        }

        Ok(resized)
    }

    /// Resize so the shorter side equals `target`, preserving aspect ratio.
    pub fn resize_shortest_edge(image: &Array3<f32>, target: usize) -> Result<Array3<f32>> {
        let (orig_h, orig_w, _) = image.dim();

        if orig_h == 0 || orig_w == 0 {
            return Err(WasteError::InvalidInput(
                "Cannot resize empty image".to_string(),
            ));
        }

        let scale = target as f32 / orig_h.min(orig_w) as f32;
        let new_h = ((orig_h as f32 * scale).round() as usize).max(target);
        let new_w = ((orig_w as f32 * scale).round() as usize).max(target);

        Self::resize_bilinear(image, new_h, new_w)
    }

    /// Crop a centered window of the given size.
    pub fn center_crop(image: &Array3<f32>, crop_h: usize, crop_w: usize) -> Result<Array3<f32>> {
        let (orig_h, orig_w, channels) = image.dim();

        if crop_h > orig_h || crop_w > orig_w {
            return Err(WasteError::InvalidInput(format!(
                "Crop {}x{} exceeds image {}x{}",
                crop_h, crop_w, orig_h, orig_w
            )));
        }

        let start_y = (orig_h - crop_h) / 2;
        let start_x = (orig_w - crop_w) / 2;

        let mut cropped = Array3::<f32>::zeros((crop_h, crop_w, channels));
        for y in 0..crop_h {
            for x in 0..crop_w {
                for c in 0..channels {
                    cropped[[y, x, c]] = image[[start_y + y, start_x + x, c]];
                }
            }
        }

        Ok(cropped)
    }

    /// Scale 0..255 pixels to 0..1, normalize per channel with the supplied
    /// mean/std, and transpose HWC to the CHW layout the models expect.
    pub fn to_chw_normalized(
        image: &Array3<f32>,
        mean: &[f32; 3],
        std: &[f32; 3],
    ) -> Result<Array3<f32>> {
        let (height, width, channels) = image.dim();

        if channels != 3 {
            return Err(WasteError::InvalidInput(format!(
                "Expected 3 channels, got {}",
                channels
            )));
        }

        let mut chw = Array3::<f32>::zeros((3, height, width));
        for c in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    let scaled = image[[y, x, c]] / 255.0;
                    chw[[c, y, x]] = (scaled - mean[c]) / std[c];
                }
            }
        }

        Ok(chw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(height: usize, width: usize, value: f32) -> Array3<f32> {
        Array3::from_elem((height, width, 3), value)
    }

    #[test]
    fn resize_preserves_solid_color() {
        let image = solid(10, 20, 128.0);
        let resized = ImageTransforms::resize_bilinear(&image, 5, 5).unwrap();
        assert_eq!(resized.dim(), (5, 5, 3));
        assert!((resized[[2, 2, 1]] - 128.0).abs() < 1e-4);
    }

    #[test]
    fn shortest_edge_resize_keeps_aspect_ratio() {
        let image = solid(100, 200, 0.0);
        let resized = ImageTransforms::resize_shortest_edge(&image, 50).unwrap();
        assert_eq!(resized.dim(), (50, 100, 3));
    }

    #[test]
    fn center_crop_takes_the_middle() {
        let mut image = solid(4, 4, 0.0);
        image[[1, 1, 0]] = 7.0;
        image[[2, 2, 0]] = 9.0;

        let cropped = ImageTransforms::center_crop(&image, 2, 2).unwrap();
        assert_eq!(cropped.dim(), (2, 2, 3));
        assert_eq!(cropped[[0, 0, 0]], 7.0);
        assert_eq!(cropped[[1, 1, 0]], 9.0);
    }

    #[test]
    fn oversized_crop_is_rejected() {
        let image = solid(4, 4, 0.0);
        assert!(ImageTransforms::center_crop(&image, 8, 8).is_err());
    }

    #[test]
    fn chw_normalization_applies_mean_and_std() {
        let image = solid(2, 2, 255.0);
        let chw =
            ImageTransforms::to_chw_normalized(&image, &[0.5, 0.5, 0.5], &[0.5, 0.5, 0.5]).unwrap();
        assert_eq!(chw.dim(), (3, 2, 2));
        // (1.0 - 0.5) / 0.5 = 1.0
        assert!((chw[[0, 0, 0]] - 1.0).abs() < 1e-6);
    }
}
