use image::{Rgba, RgbaImage};

use crate::error::{PixError, Result};

/// RGBA8 pixel colour.
pub type Color = Rgba<u8>;

/// Fully transparent black; the fill colour of every new buffer.
pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// Largest accepted width or height, in pixels.
pub const MAX_DIMENSION: u32 = 2048;
/// Largest number of frames a sprite may hold.
pub const MAX_FRAMES: usize = 1000;
/// Longest frame name, in bytes.
pub const MAX_NAME_LEN: usize = 1000;
/// Canvas edge used by new projects when the caller has no preference.
pub const DEFAULT_SIZE: u32 = 64;
/// Edge of the square thumbnail handed to the frame strip.
pub const THUMBNAIL_SIZE: u32 = 48;

/// Reject widths/heights outside `1..=MAX_DIMENSION`.
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(PixError::InvalidDimensions(format!(
            "{}x{} (each side must be 1..={})",
            width, height, MAX_DIMENSION
        )));
    }
    Ok(())
}

// ============================================================================
// PIXEL BUFFER – one rectangular RGBA grid
// ============================================================================

/// A rectangular grid of RGBA pixels.
///
/// Out-of-range reads return [`TRANSPARENT`] and out-of-range writes are
/// ignored, so callers can hand in raw cursor coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Transparent buffer of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        validate_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
        })
    }

    /// Wrap row-major RGBA8 bytes. `data` must hold exactly `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        validate_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(PixError::TruncatedData(format!(
                "expected {} pixel bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        RgbaImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| PixError::TruncatedData("pixel buffer size mismatch".into()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.image.width() && y < self.image.height()
    }

    /// Colour at `(x, y)`, or transparent black when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Color {
        if self.in_bounds(x, y) {
            *self.image.get_pixel(x, y)
        } else {
            TRANSPARENT
        }
    }

    /// Overwrite `(x, y)`; no-op when out of bounds.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if self.in_bounds(x, y) {
            self.image.put_pixel(x, y, color);
        }
    }

    pub fn fill(&mut self, color: Color) {
        for p in self.image.pixels_mut() {
            *p = color;
        }
    }

    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Reallocate at the new size, keeping the overlapping top-left rectangle.
    /// New area is transparent. On error the buffer is left untouched.
    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        validate_dimensions(new_width, new_height)?;
        let mut resized = RgbaImage::from_pixel(new_width, new_height, TRANSPARENT);
        let copy_w = self.width().min(new_width);
        let copy_h = self.height().min(new_height);
        for y in 0..copy_h {
            for x in 0..copy_w {
                resized.put_pixel(x, y, *self.image.get_pixel(x, y));
            }
        }
        self.image = resized;
        Ok(())
    }

    /// Nearest-neighbour point sampling to a new size, preserving hard edges.
    pub fn resample_nearest(&self, width: u32, height: u32) -> Result<PixelBuffer> {
        validate_dimensions(width, height)?;
        if width == self.width() && height == self.height() {
            return Ok(self.clone());
        }
        let (src_w, src_h) = (self.width() as u64, self.height() as u64);
        let image = RgbaImage::from_fn(width, height, |x, y| {
            let sx = (x as u64 * src_w / width as u64) as u32;
            let sy = (y as u64 * src_h / height as u64) as u32;
            *self.image.get_pixel(sx, sy)
        });
        Ok(PixelBuffer { image })
    }

    /// Square preview of the buffer for the frame strip.
    pub fn thumbnail(&self, size: u32) -> PixelBuffer {
        let size = size.clamp(1, MAX_DIMENSION);
        match self.resample_nearest(size, size) {
            Ok(thumb) => thumb,
            // size is clamped into range above
            Err(_) => self.clone(),
        }
    }

    /// Row-major RGBA8 bytes, `width * height * 4` long.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Raw RGBA rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.image.as_raw().chunks_exact(self.width() as usize * 4)
    }

    /// Borrow as an `image` buffer for external encoders.
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

// ============================================================================
// FRAME – a named pixel buffer
// ============================================================================

/// One still image within a sprite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    name: String,
    buffer: PixelBuffer,
}

impl Frame {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Result<Self> {
        Ok(Self::from_buffer(name, PixelBuffer::new(width, height)?))
    }

    pub fn from_buffer(name: impl Into<String>, buffer: PixelBuffer) -> Self {
        Self {
            name: clamp_name(name.into()),
            buffer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename, truncating to [`MAX_NAME_LEN`] bytes on a char boundary.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = clamp_name(name.into());
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Deep copy named `"{name} copy"`.
    pub fn duplicate(&self) -> Frame {
        Frame::from_buffer(format!("{} copy", self.name), self.buffer.clone())
    }

    pub fn thumbnail(&self) -> PixelBuffer {
        self.buffer.thumbnail(THUMBNAIL_SIZE)
    }
}

fn clamp_name(mut name: String) -> String {
    if name.len() > MAX_NAME_LEN {
        let mut cut = MAX_NAME_LEN;
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        name.truncate(cut);
    }
    name
}

// ============================================================================
// SPRITE – ordered frames sharing one size
// ============================================================================

/// The multi-frame animation document.
///
/// Never empty, every frame matches `width x height`, and the current-frame
/// cursor always indexes a live frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    frames: Vec<Frame>,
    current_frame: usize,
}

impl Sprite {
    /// One transparent frame named `"Frame 0"`.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let first = Frame::new("Frame 0", width, height)?;
        Ok(Self {
            width,
            height,
            frames: vec![first],
            current_frame: 0,
        })
    }

    /// Assemble a sprite from decoded frames, checking every invariant.
    pub fn from_frames(width: u32, height: u32, frames: Vec<Frame>) -> Result<Self> {
        validate_dimensions(width, height)?;
        if frames.is_empty() || frames.len() > MAX_FRAMES {
            return Err(PixError::InvalidDimensions(format!(
                "frame count {} (must be 1..={})",
                frames.len(),
                MAX_FRAMES
            )));
        }
        if let Some((i, f)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.width() != width || f.height() != height)
        {
            return Err(PixError::InvalidDimensions(format!(
                "frame {} is {}x{}, sprite is {}x{}",
                i,
                f.width(),
                f.height(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            frames,
            current_frame: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub(crate) fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_frame
    }

    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.current_frame]
    }

    pub(crate) fn current_frame_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.current_frame]
    }

    /// Point the cursor at `index`. Returns `false` when out of range.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.frames.len() {
            self.current_frame = index;
            true
        } else {
            false
        }
    }

    /// Append a transparent `"Frame {n}"` and select it.
    /// Returns the new index, or `None` at the frame limit.
    pub fn add_frame(&mut self) -> Option<usize> {
        if self.frames.len() >= MAX_FRAMES {
            log_warn!("add_frame: maximum frame limit ({}) reached", MAX_FRAMES);
            return None;
        }
        let index = self.frames.len();
        let buffer = self.blank_buffer();
        self.frames
            .push(Frame::from_buffer(format!("Frame {}", index), buffer));
        self.current_frame = index;
        Some(index)
    }

    /// Deep-clone the current frame into the slot after it and select the copy.
    /// Returns the new index, or `None` at the frame limit.
    pub fn duplicate_frame(&mut self) -> Option<usize> {
        if self.frames.len() >= MAX_FRAMES {
            log_warn!("duplicate_frame: maximum frame limit ({}) reached", MAX_FRAMES);
            return None;
        }
        let copy = self.frames[self.current_frame].duplicate();
        let index = self.current_frame + 1;
        self.frames.insert(index, copy);
        self.current_frame = index;
        Some(index)
    }

    /// Remove frame `index`. Refused (returns `false`) for the last remaining
    /// frame or an out-of-range index.
    ///
    /// The cursor keeps pointing at the same frame when a frame before it is
    /// removed, and moves to the previous neighbour when the current frame
    /// itself is removed.
    pub fn delete_frame(&mut self, index: usize) -> bool {
        if self.frames.len() <= 1 || index >= self.frames.len() {
            log_warn!(
                "delete_frame: refused (index {}, {} frame(s))",
                index,
                self.frames.len()
            );
            return false;
        }
        self.frames.remove(index);
        if self.current_frame > index || (self.current_frame == index && self.current_frame > 0) {
            self.current_frame -= 1;
        }
        self.current_frame = self.current_frame.min(self.frames.len() - 1);
        true
    }

    /// Swap the current frame with the one before it; the cursor follows.
    pub fn move_frame_up(&mut self) -> bool {
        if self.current_frame == 0 {
            return false;
        }
        self.frames.swap(self.current_frame, self.current_frame - 1);
        self.current_frame -= 1;
        true
    }

    /// Swap the current frame with the one after it; the cursor follows.
    pub fn move_frame_down(&mut self) -> bool {
        if self.current_frame + 1 >= self.frames.len() {
            return false;
        }
        self.frames.swap(self.current_frame, self.current_frame + 1);
        self.current_frame += 1;
        true
    }

    pub fn next_frame(&mut self) {
        if !self.frames.is_empty() {
            self.current_frame = (self.current_frame + 1) % self.frames.len();
        }
    }

    pub fn prev_frame(&mut self) {
        if !self.frames.is_empty() {
            let len = self.frames.len();
            self.current_frame = (self.current_frame + len - 1) % len;
        }
    }

    pub fn clear_frame(&mut self, index: usize) -> bool {
        match self.frame_mut(index) {
            Some(frame) => {
                frame.clear();
                true
            }
            None => false,
        }
    }

    pub fn rename_frame(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.frame_mut(index) {
            Some(frame) => {
                frame.set_name(name);
                true
            }
            None => false,
        }
    }

    /// Resize every frame, keeping the top-left overlap. Nothing changes on error.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        validate_dimensions(width, height)?;
        for frame in &mut self.frames {
            frame.buffer_mut().resize(width, height)?;
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Frame drawn faded behind the current one (cyclic previous), if any.
    pub fn onion_skin_frame(&self) -> Option<usize> {
        let len = self.frames.len();
        if len > 1 {
            Some((self.current_frame + len - 1) % len)
        } else {
            None
        }
    }

    fn blank_buffer(&self) -> PixelBuffer {
        // Sprite dimensions are validated at construction and on resize.
        PixelBuffer {
            image: RgbaImage::from_pixel(self.width, self.height, TRANSPARENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Rgba([255, 0, 0, 255]);

    #[test]
    fn buffer_rejects_bad_dimensions() {
        assert!(matches!(PixelBuffer::new(0, 10), Err(PixError::InvalidDimensions(_))));
        assert!(matches!(PixelBuffer::new(2049, 10), Err(PixError::InvalidDimensions(_))));
        assert!(matches!(PixelBuffer::new(10, 0), Err(PixError::InvalidDimensions(_))));
        assert!(PixelBuffer::new(2048, 1).is_ok());
    }

    #[test]
    fn out_of_bounds_access_is_harmless() {
        let mut buf = PixelBuffer::new(4, 4).unwrap();
        buf.set(4, 0, RED);
        buf.set(0, 100, RED);
        assert_eq!(buf.get(4, 0), TRANSPARENT);
        assert_eq!(buf.get(u32::MAX, u32::MAX), TRANSPARENT);
        assert!(buf.as_raw().iter().all(|&b| b == 0));
    }

    #[test]
    fn resize_keeps_top_left_overlap() {
        let mut buf = PixelBuffer::new(4, 4).unwrap();
        buf.set(0, 0, RED);
        buf.set(3, 3, RED);
        buf.resize(2, 6).unwrap();
        assert_eq!((buf.width(), buf.height()), (2, 6));
        assert_eq!(buf.get(0, 0), RED);
        assert_eq!(buf.get(1, 5), TRANSPARENT);
        assert!(buf.resize(0, 4).is_err());
        assert_eq!((buf.width(), buf.height()), (2, 6));
    }

    #[test]
    fn resample_uses_point_sampling() {
        let mut buf = PixelBuffer::new(2, 1).unwrap();
        buf.set(1, 0, RED);
        let up = buf.resample_nearest(4, 2).unwrap();
        assert_eq!(up.get(0, 0), TRANSPARENT);
        assert_eq!(up.get(1, 1), TRANSPARENT);
        assert_eq!(up.get(2, 0), RED);
        assert_eq!(up.get(3, 1), RED);
    }

    #[test]
    fn thumbnail_is_square() {
        let buf = PixelBuffer::new(100, 20).unwrap();
        let thumb = buf.thumbnail(THUMBNAIL_SIZE);
        assert_eq!((thumb.width(), thumb.height()), (48, 48));
    }

    #[test]
    fn long_names_are_truncated_on_char_boundary() {
        let name = "é".repeat(MAX_NAME_LEN);
        let frame = Frame::new(name, 1, 1).unwrap();
        assert!(frame.name().len() <= MAX_NAME_LEN);
        assert!(frame.name().chars().all(|c| c == 'é'));
    }

    #[test]
    fn add_and_duplicate_frames() {
        let mut sprite = Sprite::new(8, 8).unwrap();
        assert_eq!(sprite.add_frame(), Some(1));
        assert_eq!(sprite.frame(1).unwrap().name(), "Frame 1");
        sprite.set_current(0);
        sprite.current_frame_mut().buffer_mut().set(2, 2, RED);
        assert_eq!(sprite.duplicate_frame(), Some(1));
        assert_eq!(sprite.current_index(), 1);
        assert_eq!(sprite.frame(1).unwrap().name(), "Frame 0 copy");
        assert_eq!(sprite.frame(1).unwrap().buffer().get(2, 2), RED);
        assert_eq!(sprite.frame(2).unwrap().name(), "Frame 1");
    }

    #[test]
    fn frame_limit_is_enforced() {
        let mut sprite = Sprite::new(1, 1).unwrap();
        while sprite.frame_count() < MAX_FRAMES {
            assert!(sprite.add_frame().is_some());
        }
        assert_eq!(sprite.add_frame(), None);
        assert_eq!(sprite.duplicate_frame(), None);
        assert_eq!(sprite.frame_count(), MAX_FRAMES);
    }

    #[test]
    fn delete_frame_reindexes_cursor() {
        let mut sprite = Sprite::new(4, 4).unwrap();
        sprite.add_frame();
        sprite.add_frame();
        assert_eq!(sprite.current_index(), 2);
        assert!(sprite.delete_frame(1));
        assert_eq!(sprite.frame_count(), 2);
        assert_eq!(sprite.current_index(), 1);
        assert_eq!(sprite.current_frame().name(), "Frame 2");
    }

    #[test]
    fn deleting_current_first_frame_stays_in_range() {
        let mut sprite = Sprite::new(4, 4).unwrap();
        sprite.add_frame();
        sprite.set_current(0);
        assert!(sprite.delete_frame(0));
        assert_eq!(sprite.current_index(), 0);
        assert_eq!(sprite.current_frame().name(), "Frame 1");
        assert!(!sprite.delete_frame(0));
        assert_eq!(sprite.frame_count(), 1);
    }

    #[test]
    fn move_and_cycle() {
        let mut sprite = Sprite::new(4, 4).unwrap();
        sprite.add_frame();
        sprite.add_frame();
        assert!(!sprite.move_frame_down());
        assert!(sprite.move_frame_up());
        assert_eq!(sprite.current_index(), 1);
        assert_eq!(sprite.frame(1).unwrap().name(), "Frame 2");
        sprite.set_current(2);
        sprite.next_frame();
        assert_eq!(sprite.current_index(), 0);
        sprite.prev_frame();
        assert_eq!(sprite.current_index(), 2);
        sprite.set_current(0);
        assert!(!sprite.move_frame_up());
    }

    #[test]
    fn sprite_resize_touches_every_frame() {
        let mut sprite = Sprite::new(4, 4).unwrap();
        sprite.add_frame();
        sprite.resize(6, 2).unwrap();
        assert!(sprite.frames().iter().all(|f| f.width() == 6 && f.height() == 2));
        assert!(sprite.resize(3000, 2).is_err());
        assert_eq!((sprite.width(), sprite.height()), (6, 2));
    }

    #[test]
    fn from_frames_checks_sizes() {
        let a = Frame::new("a", 4, 4).unwrap();
        let b = Frame::new("b", 4, 5).unwrap();
        assert!(Sprite::from_frames(4, 4, vec![a.clone(), b]).is_err());
        assert!(Sprite::from_frames(4, 4, Vec::new()).is_err());
        assert!(Sprite::from_frames(4, 4, vec![a]).is_ok());
    }

    #[test]
    fn onion_skin_points_at_previous_frame() {
        let mut sprite = Sprite::new(2, 2).unwrap();
        assert_eq!(sprite.onion_skin_frame(), None);
        sprite.add_frame();
        sprite.add_frame();
        sprite.set_current(0);
        assert_eq!(sprite.onion_skin_frame(), Some(2));
    }
}
