//! Caller-supplied bitmaps
//!
//! A [`Bitmap`] is straight-alpha RGBA8 pixel data in top-down row order plus a
//! [`TextureKey`] chosen by the caller. The key is the texture's identity: two
//! entities pointing at the same key share one GPU texture.

use std::path::Path;

use thiserror::Error;

/// Stable identity of a texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey(pub u64);

#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("bitmap of {width}x{height} needs {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decoded image ready to become a texture
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub key: TextureKey,
    pub width: u32,
    pub height: u32,
    /// RGBA8, straight alpha, first row is the top of the image
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Wraps raw RGBA8 data, checking its length against the dimensions
    pub fn from_rgba8(
        key: TextureKey,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    ) -> Result<Self, BitmapError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BitmapError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            key,
            width,
            height,
            pixels,
        })
    }

    /// Decodes an encoded image (png, jpeg) held in memory
    pub fn decode(key: TextureKey, bytes: &[u8]) -> Result<Self, BitmapError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(key, width, height, rgba.into_raw())
    }

    /// Loads and decodes an image file
    pub fn open(key: TextureKey, path: impl AsRef<Path>) -> Result<Self, BitmapError> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(key, width, height, rgba.into_raw())
    }

    /// Pixels as the GPU wants them: rows flipped bottom-up, alpha premultiplied
    pub fn to_upload_pixels(&self) -> Vec<u8> {
        let row_len = self.width as usize * 4;
        let mut out = Vec::with_capacity(self.pixels.len());

        if row_len > 0 {
            for row in self.pixels.chunks_exact(row_len).rev() {
                out.extend_from_slice(row);
            }
        }

        premultiply_rgba8_in_place(&mut out);
        out
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn rejects_wrong_pixel_count() {
        let err = Bitmap::from_rgba8(TextureKey(1), 2, 2, vec![0; 12]).unwrap_err();
        assert!(matches!(err, BitmapError::SizeMismatch { expected: 16, .. }));
    }

    #[test]
    fn upload_pixels_are_flipped_and_premultiplied() {
        // top row: opaque red, bottom row: half transparent white
        let pixels = vec![255, 0, 0, 255, 255, 255, 255, 128];
        let bitmap = Bitmap::from_rgba8(TextureKey(7), 1, 2, pixels).unwrap();

        let upload = bitmap.to_upload_pixels();
        assert_eq!(&upload[0..4], &[128, 128, 128, 128]);
        assert_eq!(&upload[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn decodes_png_from_memory() {
        let img = image::RgbaImage::from_raw(1, 1, vec![10, 20, 30, 255]).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let bitmap = Bitmap::decode(TextureKey(3), &buf).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (1, 1));
        assert_eq!(bitmap.pixels, vec![10, 20, 30, 255]);
        assert_eq!(bitmap.key, TextureKey(3));
    }
}
