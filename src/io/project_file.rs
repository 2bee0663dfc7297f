//! `PIX1` project files.
//!
//! Layout, all integers little-endian `u32`, no compression:
//!
//! ```text
//! "PIX1" width height frame_count
//! frame_count x { name_len name_bytes(utf-8) pixels(width*height*4, RGBA8 row-major) }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::canvas::{Frame, MAX_DIMENSION, MAX_FRAMES, MAX_NAME_LEN, PixelBuffer, Sprite};
use crate::error::{PixError, Result};

pub const MAGIC: &[u8; 4] = b"PIX1";
/// Conventional file extension, without the dot.
pub const EXTENSION: &str = "pix";

const HEADER_LEN: usize = 16;

// ============================================================================
// WRITE
// ============================================================================

/// Serialize `sprite` into `writer`.
pub fn write_project<W: Write>(sprite: &Sprite, writer: &mut W) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&sprite.width().to_le_bytes())?;
    writer.write_all(&sprite.height().to_le_bytes())?;
    writer.write_all(&(sprite.frame_count() as u32).to_le_bytes())?;
    for frame in sprite.frames() {
        let name = frame.name().as_bytes();
        writer.write_all(&(name.len() as u32).to_le_bytes())?;
        writer.write_all(name)?;
        writer.write_all(frame.buffer().as_raw())?;
    }
    Ok(())
}

/// Serialize `sprite` to an in-memory byte vector.
pub fn encode(sprite: &Sprite) -> Vec<u8> {
    let frame_bytes = sprite.width() as usize * sprite.height() as usize * 4;
    let mut out = Vec::with_capacity(HEADER_LEN + sprite.frame_count() * (frame_bytes + 16));
    // Writing into a Vec cannot fail.
    let _ = write_project(sprite, &mut out);
    out
}

/// Write `sprite` to `path`, creating or truncating the file.
pub fn save_project(sprite: &Sprite, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_project(sprite, &mut writer)?;
    writer.flush()?;
    Ok(())
}

// ============================================================================
// READ
// ============================================================================

/// Bounds-checked little-endian cursor over the raw file bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(PixError::TruncatedData(format!(
                "{} needs {} bytes at offset {}, only {} left",
                what,
                len,
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Parse a complete project from bytes. Bytes after the last frame are ignored.
pub fn decode(data: &[u8]) -> Result<Sprite> {
    if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
        return Err(PixError::Format(format!(
            "bad magic {:?}, expected \"PIX1\"",
            String::from_utf8_lossy(&data[..data.len().min(MAGIC.len())])
        )));
    }

    let mut reader = Reader::new(data);
    reader.take(MAGIC.len(), "magic")?;
    let width = reader.u32("width")?;
    let height = reader.u32("height")?;
    let frame_count = reader.u32("frame count")?;

    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(PixError::InvalidDimensions(format!(
            "canvas {}x{} (each side must be 1..={})",
            width, height, MAX_DIMENSION
        )));
    }
    if frame_count == 0 || frame_count as usize > MAX_FRAMES {
        return Err(PixError::InvalidDimensions(format!(
            "frame count {} (must be 1..={})",
            frame_count, MAX_FRAMES
        )));
    }

    let pixel_len = width as usize * height as usize * 4;
    let mut frames = Vec::with_capacity(frame_count as usize);
    for i in 0..frame_count as usize {
        let name_len = reader.u32("frame name length")? as usize;
        if name_len > MAX_NAME_LEN {
            return Err(PixError::TruncatedData(format!(
                "frame {} name length {} exceeds {}",
                i, name_len, MAX_NAME_LEN
            )));
        }
        let name_bytes = reader.take(name_len, "frame name")?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|e| PixError::Format(format!("frame {} name is not UTF-8: {}", i, e)))?;
        let pixels = reader.take(pixel_len, "frame pixels")?;
        let buffer = PixelBuffer::from_raw(width, height, pixels.to_vec())?;
        frames.push(Frame::from_buffer(name, buffer));
    }

    Sprite::from_frames(width, height, frames)
}

/// Read and parse the project at `path`.
pub fn load_project(path: &Path) -> Result<Sprite> {
    let raw = std::fs::read(path)?;
    decode(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn header(width: u32, height: u32, frames: u32) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&frames.to_le_bytes());
        out
    }

    #[test]
    fn encodes_exact_layout() {
        let mut sprite = Sprite::new(1, 2).unwrap();
        sprite.rename_frame(0, "ab");
        sprite
            .frame_mut(0)
            .unwrap()
            .buffer_mut()
            .set(0, 1, Rgba([1, 2, 3, 4]));

        let bytes = encode(&sprite);
        let mut expected = header(1, 2, 1);
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"ab");
        expected.extend_from_slice(&[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn decode_round_trips_and_ignores_trailing_bytes() {
        let mut sprite = Sprite::new(3, 2).unwrap();
        sprite.add_frame();
        sprite.rename_frame(1, "walk \u{1F6B6}");
        let mut bytes = encode(&sprite);
        bytes.extend_from_slice(b"junk");
        let loaded = decode(&bytes).unwrap();
        assert_eq!(loaded.frames(), sprite.frames());
        assert_eq!(loaded.current_index(), 0);
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(matches!(decode(b"PIX2rest"), Err(PixError::Format(_))));
        assert!(matches!(decode(b"PI"), Err(PixError::Format(_))));
    }

    #[test]
    fn rejects_out_of_range_header() {
        let err = |w, h, n| decode(&header(w, h, n)).unwrap_err();
        assert!(matches!(err(0, 4, 1), PixError::InvalidDimensions(_)));
        assert!(matches!(err(4, 2049, 1), PixError::InvalidDimensions(_)));
        assert!(matches!(err(4, 4, 1001), PixError::InvalidDimensions(_)));
        assert!(matches!(err(4, 4, 0), PixError::InvalidDimensions(_)));
    }

    #[test]
    fn truncation_is_reported() {
        assert!(matches!(
            decode(&MAGIC[..]).unwrap_err(),
            PixError::TruncatedData(_)
        ));

        let mut long_name = header(1, 1, 1);
        long_name.extend_from_slice(&1001u32.to_le_bytes());
        assert!(matches!(
            decode(&long_name).unwrap_err(),
            PixError::TruncatedData(_)
        ));

        let mut short_pixels = header(2, 2, 1);
        short_pixels.extend_from_slice(&0u32.to_le_bytes());
        short_pixels.extend_from_slice(&[0; 15]);
        assert!(matches!(
            decode(&short_pixels).unwrap_err(),
            PixError::TruncatedData(_)
        ));
    }

    #[test]
    fn non_utf8_name_is_a_format_error() {
        let mut bytes = header(1, 1, 1);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(&[0; 4]);
        assert!(matches!(decode(&bytes).unwrap_err(), PixError::Format(_)));
    }
}
