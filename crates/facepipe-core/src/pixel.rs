//! Pixel normalization for detector output.
//!
//! Detector backends may hand back crops as 8-bit pixels, unit-scaled
//! floats, or 0–255 floats. Everything is folded into 8-bit before a crop
//! is written; encoding a raw float buffer as an image would produce
//! corrupt output.

use crate::error::PipelineError;
use crate::types::{ChannelOrder, PixelBuffer, PixelData};
use image::RgbImage;

impl PixelBuffer {
    /// Fold the buffer into 8-bit pixels.
    ///
    /// 8-bit data passes through unchanged. Float data with a maximum
    /// value of at most 1.0 is scaled by 255; either way floats are
    /// clipped to [0, 255] and truncated to u8.
    pub fn normalized_u8(&self) -> Vec<u8> {
        match &self.data {
            PixelData::U8(data) => data.clone(),
            PixelData::F32(data) => {
                let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let scale = if max <= 1.0 { 255.0 } else { 1.0 };
                data.iter()
                    .map(|&v| (v * scale).clamp(0.0, 255.0) as u8)
                    .collect()
            }
        }
    }

    /// Normalize and convert into an [`RgbImage`] ready for encoding,
    /// swapping channels when the buffer is BGR-ordered.
    pub fn to_rgb_image(&self) -> Result<RgbImage, PipelineError> {
        let mut data = self.normalized_u8();
        if self.order == ChannelOrder::Bgr {
            for px in data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
        let len = data.len();
        RgbImage::from_raw(self.width, self.height, data).ok_or(PipelineError::MalformedBuffer {
            width: self.width,
            height: self.height,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(order: ChannelOrder, data: PixelData) -> PixelBuffer {
        PixelBuffer { width: 1, height: 1, order, data }
    }

    #[test]
    fn test_u8_passthrough() {
        let buf = buffer(ChannelOrder::Rgb, PixelData::U8(vec![0, 128, 255]));
        assert_eq!(buf.normalized_u8(), vec![0, 128, 255]);
    }

    #[test]
    fn test_unit_floats_scaled() {
        // Max 0.8 <= 1.0, so the whole buffer scales by 255.
        let buf = buffer(ChannelOrder::Rgb, PixelData::F32(vec![0.0, 0.5, 0.8]));
        assert_eq!(buf.normalized_u8(), vec![0, 127, 204]);
    }

    #[test]
    fn test_large_floats_clipped_not_scaled() {
        let buf = buffer(ChannelOrder::Rgb, PixelData::F32(vec![-3.0, 64.7, 300.0]));
        assert_eq!(buf.normalized_u8(), vec![0, 64, 255]);
    }

    #[test]
    fn test_bgr_swapped_on_conversion() {
        let buf = buffer(ChannelOrder::Bgr, PixelData::U8(vec![10, 20, 30]));
        let img = buf.to_rgb_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10]);
    }

    #[test]
    fn test_rgb_unchanged_on_conversion() {
        let buf = buffer(ChannelOrder::Rgb, PixelData::U8(vec![10, 20, 30]));
        let img = buf.to_rgb_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let buf = PixelBuffer {
            width: 2,
            height: 2,
            order: ChannelOrder::Rgb,
            data: PixelData::U8(vec![0; 3]),
        };
        assert!(matches!(
            buf.to_rgb_image(),
            Err(PipelineError::MalformedBuffer { .. })
        ));
    }
}
