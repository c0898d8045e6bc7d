//! Crop alignment: rotate a face crop so the eye line is horizontal.
//!
//! Works on the already-cropped region rather than the full photograph,
//! rotating about the crop center with an inverse-mapped bilinear warp.
//! Out-of-frame samples are filled with black.

use image::{Rgb, RgbImage};

/// Angle of the eye line in radians, measured from the positive x axis.
///
/// Landmarks follow the SCRFD convention:
/// [left_eye, right_eye, nose, left_mouth, right_mouth].
pub fn eye_angle(landmarks: &[(f32, f32); 5]) -> f32 {
    let (lx, ly) = landmarks[0];
    let (rx, ry) = landmarks[1];
    (ry - ly).atan2(rx - lx)
}

/// Rotate `crop` about its center so that an eye line at `angle` radians
/// becomes horizontal.
///
/// Each output pixel is inverse-mapped through the rotation by `angle`,
/// which rotates the image content by `-angle`.
pub fn level_eyes(crop: &RgbImage, angle: f32) -> RgbImage {
    let (w, h) = (crop.width(), crop.height());
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;
    let (sin, cos) = angle.sin_cos();

    let mut output = RgbImage::new(w, h);

    for oy in 0..h {
        for ox in 0..w {
            let dx = ox as f32 - cx;
            let dy = oy as f32 - cy;
            let sx = cos * dx - sin * dy + cx;
            let sy = sin * dx + cos * dy + cy;
            output.put_pixel(ox, oy, sample_bilinear(crop, sx, sy));
        }
    }

    output
}

/// Bilinear sample at a fractional position; out-of-bounds taps are black.
fn sample_bilinear(img: &RgbImage, sx: f32, sy: f32) -> Rgb<u8> {
    let x0 = sx.floor() as i32;
    let y0 = sy.floor() as i32;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let tap = |x: i32, y: i32| -> [f32; 3] {
        if x >= 0 && (x as u32) < img.width() && y >= 0 && (y as u32) < img.height() {
            let px = img.get_pixel(x as u32, y as u32).0;
            [px[0] as f32, px[1] as f32, px[2] as f32]
        } else {
            [0.0; 3]
        }
    };

    let tl = tap(x0, y0);
    let tr = tap(x0 + 1, y0);
    let bl = tap(x0, y0 + 1);
    let br = tap(x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let val = tl[c] * (1.0 - fx) * (1.0 - fy)
            + tr[c] * fx * (1.0 - fy)
            + bl[c] * (1.0 - fx) * fy
            + br[c] * fx * fy;
        out[c] = val.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_eye_angle_horizontal() {
        let lms = [(30.0, 50.0), (70.0, 50.0), (50.0, 70.0), (40.0, 90.0), (60.0, 90.0)];
        assert!(eye_angle(&lms).abs() < 1e-6);
    }

    #[test]
    fn test_eye_angle_tilted() {
        // Right eye one unit lower than left over one unit across: 45 degrees.
        let lms = [(0.0, 0.0), (1.0, 1.0), (0.5, 1.0), (0.0, 2.0), (1.0, 2.0)];
        assert!((eye_angle(&lms) - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn test_zero_angle_is_identity() {
        let mut img = RgbImage::new(4, 4);
        for (i, px) in img.pixels_mut().enumerate() {
            *px = Rgb([i as u8 * 10, 0, 255 - i as u8 * 10]);
        }
        let rotated = level_eyes(&img, 0.0);
        assert_eq!(rotated, img);
    }

    #[test]
    fn test_uniform_interior_survives_rotation() {
        let img = RgbImage::from_pixel(11, 11, Rgb([100, 150, 200]));
        let rotated = level_eyes(&img, 0.3);
        // Center pixel maps to itself under any rotation about the center.
        assert_eq!(*rotated.get_pixel(5, 5), Rgb([100, 150, 200]));
    }

    #[test]
    fn test_quarter_turn_moves_pixels() {
        // 3x3 image with a bright pixel right of center; rotating the eye
        // line by +90 degrees turns content by -90, moving it above center.
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(2, 1, Rgb([255, 255, 255]));
        let rotated = level_eyes(&img, FRAC_PI_2);
        assert_eq!(*rotated.get_pixel(1, 0), Rgb([255, 255, 255]));
        assert_eq!(*rotated.get_pixel(2, 1), Rgb([0, 0, 0]));
    }
}
