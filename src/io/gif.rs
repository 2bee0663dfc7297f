//! Animated GIF89a export with the fixed 16-colour palette.
//!
//! The stream is written by hand rather than through a general GIF library so
//! that the header, palette layout and control blocks are byte-exact:
//! a 256-entry global table (16 palette colours, 240 black), a `NETSCAPE2.0`
//! infinite-loop block, and one GCE + full-size image per frame.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::canvas::{Frame, PixelBuffer, validate_dimensions};
use crate::components::colors::{PALETTE, nearest_palette_index};
use crate::error::{PixError, Result};

/// Frame delay used when the caller does not pick one, in 1/100 s.
pub const DEFAULT_GIF_DELAY_CS: u16 = 5;
/// Preview playback rate of the editor.
pub const DEFAULT_FPS: f32 = 6.0;

/// Every frame is coded with 8-bit LZW roots (clear = 256, end = 257).
const MIN_CODE_SIZE: u8 = 8;
const MAX_CODE_SIZE: u32 = 12;
const MAX_TABLE_SIZE: u32 = 1 << MAX_CODE_SIZE;
const GLOBAL_TABLE_ENTRIES: usize = 256;

/// Graphic control packed field: disposal bits `001`, no transparency.
const GCE_PACKED: u8 = 0x04;

const NETSCAPE_LOOP: [u8; 19] = [
    0x21, 0xFF, 0x0B, // application extension, 11-byte identifier
    b'N', b'E', b'T', b'S', b'C', b'A', b'P', b'E', b'2', b'.', b'0',
    0x03, 0x01, // sub-block: loop
    0x00, 0x00, // loop count 0 = forever
    0x00,
];

// ============================================================================
// OPTIONS
// ============================================================================

/// Output settings for [`export_gif`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GifOptions {
    /// Output width; `None` keeps the canvas width.
    pub width: Option<u32>,
    /// Output height; `None` keeps the canvas height.
    pub height: Option<u32>,
    /// Delay between frames in hundredths of a second.
    pub delay_cs: u16,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            delay_cs: DEFAULT_GIF_DELAY_CS,
        }
    }
}

impl GifOptions {
    /// Canvas-sized output at the delay closest to `fps` (at least 1 cs).
    /// Non-positive or non-finite rates fall back to the default delay.
    pub fn from_fps(fps: f32) -> Self {
        let delay_cs = if fps.is_finite() && fps > 0.0 {
            (100.0 / fps).round().clamp(1.0, u16::MAX as f32) as u16
        } else {
            DEFAULT_GIF_DELAY_CS
        };
        Self {
            delay_cs,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Output size for a canvas of `canvas_w x canvas_h`.
    pub fn output_size(&self, canvas_w: u32, canvas_h: u32) -> (u32, u32) {
        (
            self.width.unwrap_or(canvas_w),
            self.height.unwrap_or(canvas_h),
        )
    }
}

// ============================================================================
// ENCODER
// ============================================================================

/// Streaming GIF writer. The header goes out on [`GifEncoder::new`], one image
/// per [`GifEncoder::add_frame`], and the trailer on [`GifEncoder::finish`].
pub struct GifEncoder<W: Write> {
    writer: W,
    width: u32,
    height: u32,
    delay_cs: u16,
    frame_count: u32,
}

impl<W: Write> GifEncoder<W> {
    /// Write the GIF header for a `width x height` animation.
    pub fn new(mut writer: W, width: u32, height: u32, delay_cs: u16) -> Result<Self> {
        validate_dimensions(width, height)?;
        write_header(&mut writer, width as u16, height as u16)?;
        Ok(Self {
            writer,
            width,
            height,
            delay_cs,
            frame_count: 0,
        })
    }

    /// Append one frame. Buffers of a different size are point-sampled to the
    /// output size first.
    pub fn add_frame(&mut self, buffer: &PixelBuffer) -> Result<()> {
        let indices = if buffer.width() == self.width && buffer.height() == self.height {
            quantize(buffer)
        } else {
            quantize(&buffer.resample_nearest(self.width, self.height)?)
        };

        let w = self.width as u16;
        let h = self.height as u16;
        let d = self.delay_cs.to_le_bytes();
        self.writer
            .write_all(&[0x21, 0xF9, 0x04, GCE_PACKED, d[0], d[1], 0x00, 0x00])?;

        self.writer.write_all(&[0x2C, 0, 0, 0, 0])?;
        self.writer.write_all(&w.to_le_bytes())?;
        self.writer.write_all(&h.to_le_bytes())?;
        self.writer.write_all(&[0x00])?;

        self.writer.write_all(&[MIN_CODE_SIZE])?;
        let compressed = lzw_compress(&indices, MIN_CODE_SIZE);
        for block in compressed.chunks(255) {
            self.writer.write_all(&[block.len() as u8])?;
            self.writer.write_all(block)?;
        }
        self.writer.write_all(&[0x00])?;

        self.frame_count += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Write the trailer, flush, and hand the sink back.
    pub fn finish(mut self) -> Result<W> {
        self.writer.write_all(&[0x3B])?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn write_header<W: Write>(writer: &mut W, width: u16, height: u16) -> Result<()> {
    writer.write_all(b"GIF89a")?;

    // Logical screen descriptor: global table present, 8-bit colour, 256 entries.
    writer.write_all(&width.to_le_bytes())?;
    writer.write_all(&height.to_le_bytes())?;
    writer.write_all(&[0xF7, 0x00, 0x00])?;

    let mut table = [0u8; GLOBAL_TABLE_ENTRIES * 3];
    for (i, c) in PALETTE.iter().enumerate() {
        table[i * 3..i * 3 + 3].copy_from_slice(&[c[0], c[1], c[2]]);
    }
    writer.write_all(&table)?;

    writer.write_all(&NETSCAPE_LOOP)?;
    Ok(())
}

/// Map every pixel to its palette index, row-major.
pub fn quantize(buffer: &PixelBuffer) -> Vec<u8> {
    buffer
        .as_raw()
        .chunks_exact(4)
        .map(|p| nearest_palette_index(image::Rgba([p[0], p[1], p[2], p[3]])))
        .collect()
}

// ============================================================================
// LZW
// ============================================================================

/// Variable-width GIF LZW. Starts with a clear code, widens codes as the table
/// grows, and emits clear + reset once the 4096-entry table is full. The
/// end-of-information code is the last code in the stream.
fn lzw_compress(data: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear_code = 1u32 << min_code_size;
    let eoi_code = clear_code + 1;
    let first_free = eoi_code + 1;

    let mut output = BitWriter::new();
    let mut code_size = min_code_size as u32 + 1;
    let mut next_code = first_free;
    let mut table: HashMap<(u32, u8), u32> = HashMap::with_capacity(MAX_TABLE_SIZE as usize);

    output.write_bits(clear_code, code_size);

    let Some((&first, rest)) = data.split_first() else {
        output.write_bits(eoi_code, code_size);
        return output.finish();
    };

    let mut prefix = first as u32;
    for &byte in rest {
        if let Some(&code) = table.get(&(prefix, byte)) {
            prefix = code;
            continue;
        }

        output.write_bits(prefix, code_size);
        if next_code < MAX_TABLE_SIZE {
            table.insert((prefix, byte), next_code);
            next_code += 1;
            if next_code > (1 << code_size) && code_size < MAX_CODE_SIZE {
                code_size += 1;
            }
        } else {
            output.write_bits(clear_code, code_size);
            table.clear();
            code_size = min_code_size as u32 + 1;
            next_code = first_free;
        }
        prefix = byte as u32;
    }

    output.write_bits(prefix, code_size);
    output.write_bits(eoi_code, code_size);
    output.finish()
}

/// Packs codes least-significant-bit first.
struct BitWriter {
    data: Vec<u8>,
    current: u32,
    bits: u32,
}

impl BitWriter {
    fn new() -> Self {
        BitWriter {
            data: Vec::with_capacity(8192),
            current: 0,
            bits: 0,
        }
    }

    fn write_bits(&mut self, value: u32, num_bits: u32) {
        self.current |= value << self.bits;
        self.bits += num_bits;
        while self.bits >= 8 {
            self.data.push(self.current as u8);
            self.current >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.data.push(self.current as u8);
        }
        self.data
    }
}

// ============================================================================
// EXPORT
// ============================================================================

fn encode_frames<W: Write>(frames: &[Frame], writer: W, options: &GifOptions) -> Result<W> {
    let first = frames.first().ok_or(PixError::EmptySprite)?;
    let (width, height) = options.output_size(first.width(), first.height());
    let mut encoder = GifEncoder::new(writer, width, height, options.delay_cs)?;
    for frame in frames {
        encoder.add_frame(frame.buffer())?;
    }
    encoder.finish()
}

/// Encode `frames` into an in-memory GIF.
pub fn encode_gif(frames: &[Frame], options: &GifOptions) -> Result<Vec<u8>> {
    encode_frames(frames, Vec::new(), options)
}

/// Write `frames` as a looping GIF at `path`, creating missing parent directories.
pub fn export_gif(frames: &[Frame], path: &Path, options: &GifOptions) -> Result<()> {
    let first = frames.first().ok_or(PixError::EmptySprite)?;
    let (width, height) = options.output_size(first.width(), first.height());
    validate_dimensions(width, height)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    encode_frames(frames, BufWriter::new(file), options)?;

    log_info!(
        "GIF export: {} frame(s) at {}x{}, delay {}cs -> {}",
        frames.len(),
        width,
        height,
        options.delay_cs,
        path.display()
    );
    Ok(())
}
