use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};

use crate::canvas::{Frame, PixelBuffer, TRANSPARENT};
use crate::error::{PixError, Result};

/// Write raw RGBA rows as a PNG. The PNG container itself comes from `image`.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ColorType::Rgba8,
    )?;
    writer.flush()?;
    Ok(())
}

/// Export one buffer as a PNG.
pub fn export_png(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    write_png(buffer.as_image(), path)
}

/// File name used for frame `index` when exporting every frame.
pub fn frame_png_path(basename: &Path, index: usize) -> PathBuf {
    let mut name = basename.as_os_str().to_os_string();
    name.push(format!("_{}.png", index));
    PathBuf::from(name)
}

/// Export every frame as `{basename}_{i}.png`. Stops at the first failure.
/// Returns the written paths in frame order.
pub fn export_all_png(frames: &[Frame], basename: &Path) -> Result<Vec<PathBuf>> {
    if frames.is_empty() {
        return Err(PixError::EmptySprite);
    }
    let mut written = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        let path = frame_png_path(basename, i);
        export_png(frame.buffer(), &path)?;
        written.push(path);
    }
    log_info!(
        "Exported {} frame(s) to {}_*.png",
        written.len(),
        basename.display()
    );
    Ok(written)
}

/// All frames side by side, left to right, in one image.
pub fn sprite_sheet(frames: &[Frame]) -> Result<RgbaImage> {
    let first = frames.first().ok_or(PixError::EmptySprite)?;
    let (w, h) = (first.width(), first.height());
    let sheet_w: u32 = (w as u64 * frames.len() as u64)
        .try_into()
        .map_err(|_| PixError::InvalidDimensions(format!("sheet of {} frames", frames.len())))?;

    let mut sheet = RgbaImage::from_pixel(sheet_w, h, TRANSPARENT);
    for (i, frame) in frames.iter().enumerate() {
        let offset = i as u32 * w;
        for (x, y, p) in frame.buffer().as_image().enumerate_pixels() {
            sheet.put_pixel(offset + x, y, *p);
        }
    }
    Ok(sheet)
}

pub fn export_sprite_sheet(frames: &[Frame], path: &Path) -> Result<()> {
    let sheet = sprite_sheet(frames)?;
    write_png(&sheet, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn frame_paths_append_index() {
        assert_eq!(
            frame_png_path(Path::new("out/walk"), 3),
            PathBuf::from("out/walk_3.png")
        );
    }

    #[test]
    fn sheet_places_frames_horizontally() {
        let mut a = Frame::new("a", 2, 1).unwrap();
        a.buffer_mut().set(1, 0, Rgba([1, 1, 1, 255]));
        let mut b = Frame::new("b", 2, 1).unwrap();
        b.buffer_mut().set(0, 0, Rgba([2, 2, 2, 255]));

        let sheet = sprite_sheet(&[a, b]).unwrap();
        assert_eq!(sheet.dimensions(), (4, 1));
        assert_eq!(sheet.get_pixel(1, 0), &Rgba([1, 1, 1, 255]));
        assert_eq!(sheet.get_pixel(2, 0), &Rgba([2, 2, 2, 255]));
        assert_eq!(sheet.get_pixel(3, 0), &TRANSPARENT);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(sprite_sheet(&[]), Err(PixError::EmptySprite)));
        assert!(matches!(
            export_all_png(&[], Path::new("x")),
            Err(PixError::EmptySprite)
        ));
    }
}
