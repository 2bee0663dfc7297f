use crate::canvas::{Color, PixelBuffer, TRANSPARENT};
use crate::components::history::{Action, PixelRecord};

/// Any fully transparent colour erases to canonical transparent black, so a
/// replayed `Erase` lands on exactly the pixels the original edit produced.
fn normalize(color: Color) -> Color {
    if color[3] == 0 { TRANSPARENT } else { color }
}

/// Paint one pixel. Returns the action to record, or `None` when the pixel is
/// out of bounds or already `color`.
pub fn paint_pixel(buffer: &mut PixelBuffer, x: u32, y: u32, color: Color) -> Option<Action> {
    let color = normalize(color);
    if !buffer.in_bounds(x, y) {
        return None;
    }
    let old = buffer.get(x, y);
    if old == color {
        return None;
    }
    buffer.set(x, y, color);
    Some(Action::stroke(vec![PixelRecord { x, y, color: old }], color))
}

/// Paint a `diameter x diameter` square centred on `(cx, cy)`.
///
/// The square spans `[c - d/2, c - d/2 + d)` on each axis and is clipped to
/// the buffer. All changed pixels are batched into one action; `None` if
/// nothing changed.
pub fn paint_brush(
    buffer: &mut PixelBuffer,
    cx: i32,
    cy: i32,
    diameter: u32,
    color: Color,
) -> Option<Action> {
    let color = normalize(color);
    let d = diameter.max(1) as i64;
    let x0 = cx as i64 - d / 2;
    let y0 = cy as i64 - d / 2;
    let w = buffer.width() as i64;
    let h = buffer.height() as i64;

    let mut before = Vec::new();
    for y in y0.max(0)..(y0 + d).min(h) {
        for x in x0.max(0)..(x0 + d).min(w) {
            let (x, y) = (x as u32, y as u32);
            let old = buffer.get(x, y);
            if old != color {
                before.push(PixelRecord { x, y, color: old });
            }
        }
    }

    if before.is_empty() {
        return None;
    }
    for p in &before {
        buffer.set(p.x, p.y, color);
    }
    Some(Action::stroke(before, color))
}

/// Erase every non-transparent pixel in one action.
pub fn clear_all(buffer: &mut PixelBuffer) -> Option<Action> {
    let mut before = Vec::new();
    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            let old = buffer.get(x, y);
            if old != TRANSPARENT {
                before.push(PixelRecord { x, y, color: old });
            }
        }
    }
    if before.is_empty() {
        return None;
    }
    buffer.clear();
    Some(Action::Erase { before })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Color = Rgba([255, 0, 0, 255]);

    #[test]
    fn unchanged_pixel_records_nothing() {
        let mut buf = PixelBuffer::new(2, 2).unwrap();
        assert!(paint_pixel(&mut buf, 0, 0, TRANSPARENT).is_none());
        assert!(paint_pixel(&mut buf, 0, 0, RED).is_some());
        assert!(paint_pixel(&mut buf, 0, 0, RED).is_none());
        assert!(paint_pixel(&mut buf, 5, 0, RED).is_none());
    }

    #[test]
    fn transparent_paint_is_an_erase() {
        let mut buf = PixelBuffer::new(2, 2).unwrap();
        buf.set(1, 1, RED);
        let action = paint_pixel(&mut buf, 1, 1, Rgba([9, 9, 9, 0])).unwrap();
        assert!(matches!(action, Action::Erase { .. }));
        assert_eq!(buf.get(1, 1), TRANSPARENT);
    }

    #[test]
    fn brush_covers_even_and_odd_diameters() {
        let mut buf = PixelBuffer::new(8, 8).unwrap();
        let odd = paint_brush(&mut buf, 4, 4, 3, RED).unwrap();
        assert_eq!(odd.pixel_count(), 9);
        assert_eq!(buf.get(3, 3), RED);
        assert_eq!(buf.get(5, 5), RED);
        assert_eq!(buf.get(6, 6), TRANSPARENT);

        let mut buf = PixelBuffer::new(8, 8).unwrap();
        let even = paint_brush(&mut buf, 4, 4, 2, RED).unwrap();
        assert_eq!(even.pixel_count(), 4);
        assert_eq!(buf.get(3, 3), RED);
        assert_eq!(buf.get(4, 4), RED);
        assert_eq!(buf.get(5, 5), TRANSPARENT);
    }

    #[test]
    fn brush_clips_at_edges_and_skips_unchanged() {
        let mut buf = PixelBuffer::new(4, 4).unwrap();
        // spans [-1, 2) on both axes, so only a 2x2 corner lands on the canvas
        let action = paint_brush(&mut buf, 0, 0, 3, RED).unwrap();
        assert_eq!(action.pixel_count(), 4);
        assert_eq!(buf.get(1, 1), RED);
        assert_eq!(buf.get(2, 2), TRANSPARENT);

        // every covered pixel already red
        assert!(paint_brush(&mut buf, 0, 0, 3, RED).is_none());
        assert!(paint_brush(&mut buf, -1, -1, 3, RED).is_none());
        assert!(paint_brush(&mut buf, 100, 100, 5, RED).is_none());
    }

    #[test]
    fn clear_all_records_only_visible_pixels() {
        let mut buf = PixelBuffer::new(3, 3).unwrap();
        assert!(clear_all(&mut buf).is_none());
        buf.set(0, 0, RED);
        buf.set(2, 1, RED);
        let action = clear_all(&mut buf).unwrap();
        assert_eq!(action.pixel_count(), 2);
        action.undo(&mut buf);
        assert_eq!(buf.get(2, 1), RED);
    }
}
