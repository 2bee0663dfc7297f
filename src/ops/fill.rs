use crate::canvas::{Color, PixelBuffer};
use crate::components::history::{Action, FillRegion};

/// Flood fill the 4-connected region of `seed`'s colour with `new_color`.
///
/// Returns the `Fill` action to record, or `None` when the seed is out of
/// bounds or already `new_color`.
pub fn flood_fill(
    buffer: &mut PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    new_color: Color,
) -> Option<Action> {
    if !buffer.in_bounds(seed_x, seed_y) {
        return None;
    }
    let target = buffer.get(seed_x, seed_y);
    if target == new_color {
        return None;
    }

    let painted = fill_from(buffer, seed_x, seed_y, target, new_color, None);
    if painted.is_empty() {
        return None;
    }

    Some(Action::Fill {
        seed: (seed_x, seed_y),
        old_color: target,
        new_color,
        region: FillRegion::from_points(&painted),
    })
}

/// Replay a fill from `seed` with `color`, using whatever colour the seed has
/// now as the target. Returns the number of pixels repainted.
pub(crate) fn replay_fill(buffer: &mut PixelBuffer, seed_x: u32, seed_y: u32, color: Color) -> usize {
    if !buffer.in_bounds(seed_x, seed_y) {
        return 0;
    }
    let target = buffer.get(seed_x, seed_y);
    if target == color {
        return 0;
    }
    fill_from(buffer, seed_x, seed_y, target, color, None).len()
}

/// Like [`replay_fill`], but never leaves `region`.
pub(crate) fn replay_fill_within(
    buffer: &mut PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    color: Color,
    region: &FillRegion,
) -> usize {
    if !buffer.in_bounds(seed_x, seed_y) {
        return 0;
    }
    let target = buffer.get(seed_x, seed_y);
    if target == color {
        return 0;
    }
    fill_from(buffer, seed_x, seed_y, target, color, Some(region)).len()
}

/// Iterative DFS over a Vec stack. A pixel is repainted as soon as it is
/// pushed, so the repaint doubles as the visited mark and every pixel enters
/// the stack at most once. `target != replacement` is required.
fn fill_from(
    buffer: &mut PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    target: Color,
    replacement: Color,
    limit: Option<&FillRegion>,
) -> Vec<(u32, u32)> {
    let mut painted = Vec::new();
    if target == replacement {
        return painted;
    }

    let width = buffer.width();
    let height = buffer.height();

    #[inline(always)]
    fn visit(
        buffer: &mut PixelBuffer,
        x: u32,
        y: u32,
        target: Color,
        replacement: Color,
        limit: Option<&FillRegion>,
        stack: &mut Vec<(u32, u32)>,
        painted: &mut Vec<(u32, u32)>,
    ) {
        if buffer.get(x, y) != target {
            return;
        }
        if let Some(region) = limit
            && !region.contains(x, y)
        {
            return;
        }
        buffer.set(x, y, replacement);
        painted.push((x, y));
        stack.push((x, y));
    }

    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(1024);
    visit(buffer, seed_x, seed_y, target, replacement, limit, &mut stack, &mut painted);

    while let Some((x, y)) = stack.pop() {
        // Right
        if x + 1 < width {
            visit(buffer, x + 1, y, target, replacement, limit, &mut stack, &mut painted);
        }
        // Left
        if x > 0 {
            visit(buffer, x - 1, y, target, replacement, limit, &mut stack, &mut painted);
        }
        // Down
        if y + 1 < height {
            visit(buffer, x, y + 1, target, replacement, limit, &mut stack, &mut painted);
        }
        // Up
        if y > 0 {
            visit(buffer, x, y - 1, target, replacement, limit, &mut stack, &mut painted);
        }
    }

    painted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use image::Rgba;

    const RED: Color = Rgba([255, 0, 0, 255]);
    const BLUE: Color = Rgba([0, 0, 255, 255]);
    const WHITE: Color = Rgba([255, 255, 255, 255]);

    /// 5x1 strip: two transparent runs split by a white wall at x=2.
    fn split_strip() -> PixelBuffer {
        let mut buf = PixelBuffer::new(5, 1).unwrap();
        buf.set(2, 0, WHITE);
        buf
    }

    #[test]
    fn fills_only_the_seed_component() {
        let mut buf = split_strip();
        let action = flood_fill(&mut buf, 0, 0, RED).unwrap();
        assert_eq!(action.pixel_count(), 2);
        assert_eq!(buf.get(0, 0), RED);
        assert_eq!(buf.get(1, 0), RED);
        assert_eq!(buf.get(2, 0), WHITE);
        assert_eq!(buf.get(3, 0), TRANSPARENT);
        assert_eq!(buf.get(4, 0), TRANSPARENT);
    }

    #[test]
    fn diagonal_neighbours_are_not_connected() {
        let mut buf = PixelBuffer::new(2, 2).unwrap();
        buf.set(1, 0, WHITE);
        buf.set(0, 1, WHITE);
        flood_fill(&mut buf, 0, 0, RED).unwrap();
        assert_eq!(buf.get(1, 1), TRANSPARENT);
    }

    #[test]
    fn second_identical_fill_is_a_noop() {
        let mut buf = PixelBuffer::new(8, 8).unwrap();
        assert!(flood_fill(&mut buf, 3, 3, BLUE).is_some());
        assert!(flood_fill(&mut buf, 3, 3, BLUE).is_none());
        assert!(buf.as_raw().chunks(4).all(|p| p == [0, 0, 255, 255]));
    }

    #[test]
    fn out_of_bounds_seed_does_nothing() {
        let mut buf = PixelBuffer::new(3, 3).unwrap();
        assert!(flood_fill(&mut buf, 3, 0, RED).is_none());
        assert!(flood_fill(&mut buf, 0, 9, RED).is_none());
    }

    #[test]
    fn large_canvas_does_not_recurse() {
        let mut buf = PixelBuffer::new(1024, 1024).unwrap();
        let action = flood_fill(&mut buf, 512, 512, RED).unwrap();
        assert_eq!(action.pixel_count(), 1024 * 1024);
    }

    #[test]
    fn confined_replay_leaves_touching_regions_alone() {
        // Fill the left run red while the right run is already red; a plain
        // refill from the seed would sweep both once the wall is gone.
        let mut buf = PixelBuffer::new(4, 1).unwrap();
        buf.set(2, 0, RED);
        buf.set(3, 0, RED);
        let action = flood_fill(&mut buf, 0, 0, RED).unwrap();
        let Action::Fill { region, .. } = &action else {
            panic!("expected a fill action");
        };
        assert_eq!(region.len(), 2);

        action.undo(&mut buf);
        assert_eq!(buf.get(0, 0), TRANSPARENT);
        assert_eq!(buf.get(1, 0), TRANSPARENT);
        assert_eq!(buf.get(2, 0), RED);
        assert_eq!(buf.get(3, 0), RED);

        action.redo(&mut buf);
        assert!(buf.as_raw().chunks(4).all(|p| p == [255, 0, 0, 255]));
    }
}
