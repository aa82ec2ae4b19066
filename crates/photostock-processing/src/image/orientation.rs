use image::DynamicImage;
use std::io::Cursor;

/// EXIF orientation correction (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the EXIF orientation tag (1..=8) from encoded image bytes.
    /// Missing, unreadable or out-of-range values read as `1` (upright).
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
            .map(|value| value as u8)
            .unwrap_or(1)
    }

    /// Rotation (clockwise degrees) and flips, applied in that order, that bring
    /// an image stored with `orientation` upright.
    /// Returns (rotate_angle, flip_horizontal, flip_vertical)
    pub fn transforms(orientation: u8) -> (Option<u16>, bool, bool) {
        match orientation {
            2 => (None, true, false),
            3 => (Some(180), false, false),
            4 => (None, false, true),
            5 => (Some(90), true, false),
            6 => (Some(90), false, false),
            7 => (Some(270), true, false),
            8 => (Some(270), false, false),
            _ => (None, false, false),
        }
    }

    /// Apply the EXIF orientation found in `data` to the decoded `img`
    pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
        let orientation = Self::read_exif_orientation(data);
        if orientation == 1 {
            return img;
        }

        let (rotate, flip_h, flip_v) = Self::transforms(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );

        Self::apply(img, rotate, flip_h, flip_v)
    }

    fn apply(mut img: DynamicImage, rotate: Option<u16>, flip_h: bool, flip_v: bool) -> DynamicImage {
        img = match rotate {
            Some(90) => img.rotate90(),
            Some(180) => img.rotate180(),
            Some(270) => img.rotate270(),
            _ => img,
        };
        if flip_h {
            img = img.fliph();
        }
        if flip_v {
            img = img.flipv();
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// 2x1 image: red on the left, blue on the right
    fn marker() -> DynamicImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(img)
    }

    fn oriented(orientation: u8) -> DynamicImage {
        let (rotate, flip_h, flip_v) = ImageOrientation::transforms(orientation);
        ImageOrientation::apply(marker(), rotate, flip_h, flip_v)
    }

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_no_exif_reads_upright() {
        assert_eq!(ImageOrientation::read_exif_orientation(b""), 1);
        assert_eq!(ImageOrientation::read_exif_orientation(b"not an image"), 1);
    }

    #[test]
    fn test_apply_without_exif_is_identity() {
        let img = marker();
        let out = ImageOrientation::apply_exif_orientation(img.clone(), b"");
        assert_eq!(out.dimensions(), img.dimensions());
        assert_eq!(out.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_rotations_swap_dimensions() {
        assert_eq!(oriented(6).dimensions(), (1, 2));
        assert_eq!(oriented(8).dimensions(), (1, 2));
        assert_eq!(oriented(3).dimensions(), (2, 1));
    }

    #[test]
    fn test_transpose_orientations() {
        // 5 is a transpose: (x, y) -> (y, x), so red stays at the origin.
        let five = oriented(5);
        assert_eq!(five.dimensions(), (1, 2));
        assert_eq!(five.get_pixel(0, 0), RED);

        // 7 is a transverse: red moves to the far corner.
        let seven = oriented(7);
        assert_eq!(seven.dimensions(), (1, 2));
        assert_eq!(seven.get_pixel(0, 1), RED);
    }

    #[test]
    fn test_mirror_orientation() {
        assert_eq!(oriented(2).get_pixel(1, 0), RED);
        assert_eq!(oriented(4).get_pixel(0, 0), RED);
    }
}
