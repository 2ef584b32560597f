use crate::utils::error::WasteError;
use crate::Result;
use image::{DynamicImage, GenericImageView, ImageFormat};
use ndarray::Array3;
use std::path::Path;

/// Upper bound on an input buffer before decode is attempted.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// Load an image from a filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<DynamicImage> {
        let image = image::open(path.as_ref()).map_err(WasteError::ImageDecode)?;

        Ok(image)
    }

    /// Load an image from an in-memory byte buffer (upload or network fetch).
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(WasteError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(WasteError::UnsupportedFormat(format!("{:?}", format)));
            }
        }

        let image = image::load_from_memory(bytes).map_err(WasteError::ImageDecode)?;

        Ok(image)
    }

    /// Detect the container format from magic bytes.
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Tiff
                | ImageFormat::WebP
        )
    }

    /// Convert a decoded image into the shared classifier representation:
    /// RGB forced, `Array3<f32>` in HWC order, values 0..255.
    pub fn to_array3(image: &DynamicImage) -> Array3<f32> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut array = Array3::<f32>::zeros((height as usize, width as usize, 3));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                array[[y as usize, x as usize, c]] = pixel[c] as f32;
            }
        }

        array
    }

    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width < 16 || height < 16 {
            return Err(WasteError::InvalidInput(format!(
                "Image too small: {}x{}, minimum 16x16",
                width, height
            )));
        }

        if width > 8192 || height > 8192 {
            return Err(WasteError::InvalidInput(format!(
                "Image too large: {}x{}, maximum 8192x8192",
                width, height
            )));
        }

        Ok(())
    }

    /// Validate and normalize a decoded image for classification. This is the
    /// single decode/normalize step shared by both classifiers.
    pub fn decode(image: &DynamicImage) -> Result<Array3<f32>> {
        Self::validate_dimensions(image)?;

        Ok(Self::to_array3(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    #[test]
    fn to_array3_preserves_pixels_in_hwc_order() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([10, 20, 30]));
        img.put_pixel(1, 0, Rgb([40, 50, 60]));

        let array = ImageLoader::to_array3(&DynamicImage::ImageRgb8(img));

        assert_eq!(array.dim(), (1, 2, 3));
        assert_eq!(array[[0, 0, 0]], 10.0);
        assert_eq!(array[[0, 0, 2]], 30.0);
        assert_eq!(array[[0, 1, 1]], 50.0);
    }

    #[test]
    fn grayscale_input_is_forced_to_three_channels() {
        let gray = DynamicImage::new_luma8(20, 20);
        let array = ImageLoader::to_array3(&gray);
        assert_eq!(array.dim(), (20, 20, 3));
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let result = ImageLoader::from_bytes(b"definitely not an image");
        assert!(result.is_err());
    }

    #[test]
    fn roundtrip_through_png_bytes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([1, 2, 3])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();

        let decoded = ImageLoader::from_bytes(&buffer.into_inner()).unwrap();
        assert_eq!(decoded.dimensions(), (32, 32));
    }

    #[test]
    fn tiny_images_are_rejected() {
        let img = DynamicImage::new_rgb8(8, 8);
        assert!(ImageLoader::decode(&img).is_err());
    }
}
