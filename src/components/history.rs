use std::collections::VecDeque;

use crate::canvas::{Color, PixelBuffer, TRANSPARENT};
use crate::ops::fill;

/// Undo entries kept per frame before the oldest is evicted.
pub const MAX_HISTORY: usize = 100;

// ============================================================================
// ACTION - one reversible edit
// ============================================================================

/// A pixel's colour before an edit touched it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRecord {
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

/// The set of pixels a flood fill repainted, stored as a bit mask over the
/// fill's bounding box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FillRegion {
    min_x: u32,
    min_y: u32,
    width: u32,
    height: u32,
    bits: Vec<u64>,
    count: usize,
}

impl FillRegion {
    /// Build from `(x, y)` points. Duplicates are counted once.
    pub fn from_points(points: &[(u32, u32)]) -> Self {
        let Some(&(first_x, first_y)) = points.first() else {
            return Self {
                min_x: 0,
                min_y: 0,
                width: 0,
                height: 0,
                bits: Vec::new(),
                count: 0,
            };
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first_x, first_y, first_x, first_y);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        let total = width as usize * height as usize;
        let mut bits = vec![0u64; total.div_ceil(64)];
        let mut count = 0;
        for &(x, y) in points {
            let bit = (y - min_y) as usize * width as usize + (x - min_x) as usize;
            let word = &mut bits[bit / 64];
            let mask = 1u64 << (bit % 64);
            if *word & mask == 0 {
                *word |= mask;
                count += 1;
            }
        }

        Self {
            min_x,
            min_y,
            width,
            height,
            bits,
            count,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x < self.min_x || y < self.min_y {
            return false;
        }
        let (dx, dy) = (x - self.min_x, y - self.min_y);
        if dx >= self.width || dy >= self.height {
            return false;
        }
        let bit = dy as usize * self.width as usize + dx as usize;
        self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
    }

    /// Number of pixels in the region.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bounding box as `(min_x, min_y, max_x, max_y)`, inclusive.
    pub fn bounds(&self) -> Option<(u32, u32, u32, u32)> {
        if self.is_empty() {
            return None;
        }
        Some((
            self.min_x,
            self.min_y,
            self.min_x + self.width - 1,
            self.min_y + self.height - 1,
        ))
    }

    pub fn memory_size(&self) -> usize {
        self.bits.len() * 8
    }
}

/// A reversible record of one edit. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Pixels overwritten with an opaque or translucent colour.
    Paint { before: Vec<PixelRecord>, color: Color },
    /// Pixels cleared to transparent.
    Erase { before: Vec<PixelRecord> },
    /// A flood fill, replayed from its seed rather than stored pixel by pixel.
    Fill {
        seed: (u32, u32),
        old_color: Color,
        new_color: Color,
        region: FillRegion,
    },
}

impl Action {
    /// `Erase` when `color` is fully transparent, `Paint` otherwise.
    pub fn stroke(before: Vec<PixelRecord>, color: Color) -> Self {
        if color[3] == 0 {
            Action::Erase { before }
        } else {
            Action::Paint { before, color }
        }
    }

    /// Put the buffer back the way it was before this action.
    pub fn undo(&self, buffer: &mut PixelBuffer) {
        match self {
            Action::Paint { before, .. } | Action::Erase { before } => {
                for p in before.iter().rev() {
                    buffer.set(p.x, p.y, p.color);
                }
            }
            Action::Fill {
                seed,
                old_color,
                region,
                ..
            } => {
                fill::replay_fill_within(buffer, seed.0, seed.1, *old_color, region);
            }
        }
    }

    /// Re-apply this action forward.
    pub fn redo(&self, buffer: &mut PixelBuffer) {
        match self {
            Action::Paint { before, color } => {
                for p in before {
                    buffer.set(p.x, p.y, *color);
                }
            }
            Action::Erase { before } => {
                for p in before {
                    buffer.set(p.x, p.y, TRANSPARENT);
                }
            }
            Action::Fill {
                seed, new_color, ..
            } => {
                fill::replay_fill(buffer, seed.0, seed.1, *new_color);
            }
        }
    }

    /// Number of pixels the action changed.
    pub fn pixel_count(&self) -> usize {
        match self {
            Action::Paint { before, .. } | Action::Erase { before } => before.len(),
            Action::Fill { region, .. } => region.len(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Action::Paint { before, .. } => format!("Paint ({} px)", before.len()),
            Action::Erase { before } => format!("Erase ({} px)", before.len()),
            Action::Fill { seed, region, .. } => {
                format!("Fill at {},{} ({} px)", seed.0, seed.1, region.len())
            }
        }
    }

    pub fn memory_size(&self) -> usize {
        match self {
            Action::Paint { before, .. } | Action::Erase { before } => {
                before.len() * std::mem::size_of::<PixelRecord>()
            }
            Action::Fill { region, .. } => region.memory_size(),
        }
    }
}

// ============================================================================
// FRAME HISTORY - bounded undo/redo stacks for one frame
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct FrameHistory {
    undo_stack: VecDeque<Action>,
    redo_stack: VecDeque<Action>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new edit. Clears the redo stack and evicts the oldest entry
    /// past [`MAX_HISTORY`].
    pub fn push(&mut self, action: Action) {
        self.redo_stack.clear();
        self.undo_stack.push_back(action);
        while self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.pop_front();
        }
    }

    pub fn undo(&mut self, buffer: &mut PixelBuffer) -> bool {
        match self.undo_stack.pop_back() {
            Some(action) => {
                action.undo(buffer);
                self.redo_stack.push_back(action);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self, buffer: &mut PixelBuffer) -> bool {
        match self.redo_stack.pop_back() {
            Some(action) => {
                action.redo(buffer);
                self.undo_stack.push_back(action);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(Action::description)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(Action::description)
    }

    /// All undo descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(Action::description).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(Action::memory_size)
            .sum()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

// ============================================================================
// UNDO ENGINE - one history per frame, kept in frame order
// ============================================================================

/// Per-frame undo/redo histories.
///
/// Slot `i` belongs to frame `i` of the sprite; frame lifecycle operations
/// must be mirrored here so that each history travels with its frame.
#[derive(Clone, Debug)]
pub struct UndoEngine {
    histories: Vec<FrameHistory>,
}

impl UndoEngine {
    pub fn new(frame_count: usize) -> Self {
        Self {
            histories: (0..frame_count).map(|_| FrameHistory::new()).collect(),
        }
    }

    /// Drop every history and start over with `frame_count` empty ones.
    pub fn reset(&mut self, frame_count: usize) {
        *self = Self::new(frame_count);
    }

    pub fn frame_count(&self) -> usize {
        self.histories.len()
    }

    pub fn history(&self, frame: usize) -> Option<&FrameHistory> {
        self.histories.get(frame)
    }

    pub fn push(&mut self, frame: usize, action: Action) {
        match self.histories.get_mut(frame) {
            Some(history) => history.push(action),
            None => log_err!("UndoEngine::push: frame {} has no history", frame),
        }
    }

    /// Undo the newest action of `frame` against `buffer`. `false` if there is none.
    pub fn undo(&mut self, frame: usize, buffer: &mut PixelBuffer) -> bool {
        self.histories
            .get_mut(frame)
            .is_some_and(|h| h.undo(buffer))
    }

    /// Redo the newest undone action of `frame`. `false` if there is none.
    pub fn redo(&mut self, frame: usize, buffer: &mut PixelBuffer) -> bool {
        self.histories
            .get_mut(frame)
            .is_some_and(|h| h.redo(buffer))
    }

    pub fn can_undo(&self, frame: usize) -> bool {
        self.histories.get(frame).is_some_and(FrameHistory::can_undo)
    }

    pub fn can_redo(&self, frame: usize) -> bool {
        self.histories.get(frame).is_some_and(FrameHistory::can_redo)
    }

    /// A frame was inserted at `index`; it starts with an empty history.
    pub fn insert_frame(&mut self, index: usize) {
        let index = index.min(self.histories.len());
        self.histories.insert(index, FrameHistory::new());
    }

    /// A frame was removed; its history goes with it.
    pub fn remove_frame(&mut self, index: usize) {
        if index < self.histories.len() {
            self.histories.remove(index);
        }
    }

    /// Two frames traded places; their histories trade too.
    pub fn swap_frames(&mut self, a: usize, b: usize) {
        if a < self.histories.len() && b < self.histories.len() {
            self.histories.swap(a, b);
        }
    }

    /// Clear every frame's stacks, keeping the slot count.
    pub fn clear_all(&mut self) {
        for h in &mut self.histories {
            h.clear();
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.histories.iter().map(FrameHistory::memory_usage).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Color = Rgba([255, 0, 0, 255]);

    fn paint_action(x: u32, y: u32, old: Color, new: Color) -> Action {
        Action::stroke(vec![PixelRecord { x, y, color: old }], new)
    }

    #[test]
    fn fill_region_membership() {
        let region = FillRegion::from_points(&[(2, 3), (3, 3), (3, 4), (3, 4)]);
        assert_eq!(region.len(), 3);
        assert!(region.contains(2, 3));
        assert!(region.contains(3, 4));
        assert!(!region.contains(2, 4));
        assert!(!region.contains(0, 0));
        assert!(!region.contains(100, 100));
        assert_eq!(region.bounds(), Some((2, 3, 3, 4)));
        assert!(FillRegion::from_points(&[]).is_empty());
    }

    #[test]
    fn stroke_picks_erase_for_transparent() {
        assert!(matches!(paint_action(0, 0, RED, TRANSPARENT), Action::Erase { .. }));
        assert!(matches!(paint_action(0, 0, TRANSPARENT, RED), Action::Paint { .. }));
    }

    #[test]
    fn push_clears_redo_and_bounds_history() {
        let mut buffer = PixelBuffer::new(4, 4).unwrap();
        let mut history = FrameHistory::new();
        for i in 0..(MAX_HISTORY + 5) {
            history.push(paint_action((i % 4) as u32, 0, TRANSPARENT, RED));
        }
        assert_eq!(history.undo_count(), MAX_HISTORY);

        assert!(history.undo(&mut buffer));
        assert!(history.can_redo());
        history.push(paint_action(0, 0, TRANSPARENT, RED));
        assert!(!history.can_redo());
        assert!(!history.redo(&mut buffer));
    }

    #[test]
    fn undo_and_redo_move_between_stacks() {
        let mut buffer = PixelBuffer::new(2, 2).unwrap();
        let mut history = FrameHistory::new();
        buffer.set(1, 1, RED);
        history.push(paint_action(1, 1, TRANSPARENT, RED));

        assert!(history.undo(&mut buffer));
        assert_eq!(buffer.get(1, 1), TRANSPARENT);
        assert!(!history.undo(&mut buffer));
        assert!(history.redo(&mut buffer));
        assert_eq!(buffer.get(1, 1), RED);
        assert_eq!(history.undo_description().as_deref(), Some("Paint (1 px)"));
    }

    #[test]
    fn engine_histories_follow_frames() {
        let mut engine = UndoEngine::new(2);
        engine.push(0, paint_action(0, 0, TRANSPARENT, RED));
        engine.swap_frames(0, 1);
        assert!(!engine.can_undo(0));
        assert!(engine.can_undo(1));

        engine.insert_frame(1);
        assert_eq!(engine.frame_count(), 3);
        assert!(!engine.can_undo(1));
        assert!(engine.can_undo(2));

        engine.remove_frame(2);
        assert_eq!(engine.frame_count(), 2);
        assert!(!engine.can_undo(0) && !engine.can_undo(1));
        assert!(!engine.can_undo(99));
    }
}
