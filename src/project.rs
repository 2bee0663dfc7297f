use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::canvas::{Color, PixelBuffer, Sprite, TRANSPARENT};
use crate::components::history::{Action, UndoEngine};
use crate::error::Result;
use crate::io::{export, gif, godot, project_file};
use crate::ops::{fill, paint};

/// File name used by [`Project::save`] when the project has never been saved.
pub const DEFAULT_PROJECT_FILE: &str = "project.pix";

/// Single open document: the sprite, one undo history per frame, and file
/// bookkeeping.
///
/// All frame lifecycle operations go through here so the histories stay
/// aligned with their frames.
#[derive(Clone, Debug)]
pub struct Project {
    pub id: Uuid,
    sprite: Sprite,
    history: UndoEngine,
    /// `None` for unsaved/untitled projects.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
    /// Display name (derived from path or "Untitled")
    pub name: String,
}

impl Project {
    /// Untitled project with one transparent frame.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self::from_sprite(Sprite::new(width, height)?))
    }

    pub fn from_sprite(sprite: Sprite) -> Self {
        let history = UndoEngine::new(sprite.frame_count());
        Self {
            id: Uuid::new_v4(),
            sprite,
            history,
            path: None,
            is_dirty: false,
            name: "Untitled".to_string(),
        }
    }

    /// Open a `.pix` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let sprite = project_file::load_project(path)?;
        let mut project = Self::from_sprite(sprite);
        project.path = Some(path.to_path_buf());
        project.update_name_from_path();
        Ok(project)
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub fn history(&self) -> &UndoEngine {
        &self.history
    }

    pub fn current_frame(&self) -> usize {
        self.sprite.current_index()
    }

    pub fn current_buffer(&self) -> &PixelBuffer {
        self.sprite.current_frame().buffer()
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Name with a trailing `*` when there are unsaved changes.
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    // ========================================================================
    // EDITS - each changed-pixel batch becomes one undo entry on the current frame
    // ========================================================================

    fn commit(&mut self, action: Option<Action>) -> bool {
        match action {
            Some(action) => {
                self.history.push(self.sprite.current_index(), action);
                self.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Paint one pixel of the current frame. A fully transparent `color` erases.
    /// `false` when nothing changed.
    pub fn paint(&mut self, x: u32, y: u32, color: Color) -> bool {
        let action = paint::paint_pixel(self.sprite.current_frame_mut().buffer_mut(), x, y, color);
        self.commit(action)
    }

    pub fn erase(&mut self, x: u32, y: u32) -> bool {
        self.paint(x, y, TRANSPARENT)
    }

    /// Paint a `size x size` square centred on `(cx, cy)` as a single edit.
    pub fn paint_brush(&mut self, cx: i32, cy: i32, size: u32, color: Color) -> bool {
        let action =
            paint::paint_brush(self.sprite.current_frame_mut().buffer_mut(), cx, cy, size, color);
        self.commit(action)
    }

    pub fn erase_brush(&mut self, cx: i32, cy: i32, size: u32) -> bool {
        self.paint_brush(cx, cy, size, TRANSPARENT)
    }

    /// Flood fill the current frame from `(x, y)`. `false` when the seed is out
    /// of bounds or already `color`.
    pub fn flood_fill(&mut self, x: u32, y: u32, color: Color) -> bool {
        let action = fill::flood_fill(self.sprite.current_frame_mut().buffer_mut(), x, y, color);
        self.commit(action)
    }

    /// Erase the whole current frame as one undoable edit.
    pub fn clear_current_frame(&mut self) -> bool {
        let action = paint::clear_all(self.sprite.current_frame_mut().buffer_mut());
        self.commit(action)
    }

    // ========================================================================
    // UNDO / REDO - scoped to the current frame
    // ========================================================================

    pub fn undo(&mut self) -> bool {
        let index = self.sprite.current_index();
        let done = self
            .history
            .undo(index, self.sprite.current_frame_mut().buffer_mut());
        if done {
            self.mark_dirty();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        let index = self.sprite.current_index();
        let done = self
            .history
            .redo(index, self.sprite.current_frame_mut().buffer_mut());
        if done {
            self.mark_dirty();
        }
        done
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo(self.sprite.current_index())
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo(self.sprite.current_index())
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history
            .history(self.sprite.current_index())
            .and_then(|h| h.undo_description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history
            .history(self.sprite.current_index())
            .and_then(|h| h.redo_description())
    }

    // ========================================================================
    // FRAMES - sprite lifecycle mirrored into the undo engine
    // ========================================================================

    pub fn add_frame(&mut self) -> Option<usize> {
        let index = self.sprite.add_frame()?;
        self.history.insert_frame(index);
        self.mark_dirty();
        Some(index)
    }

    /// The copy starts with an empty history.
    pub fn duplicate_frame(&mut self) -> Option<usize> {
        let index = self.sprite.duplicate_frame()?;
        self.history.insert_frame(index);
        self.mark_dirty();
        Some(index)
    }

    pub fn delete_frame(&mut self, index: usize) -> bool {
        if !self.sprite.delete_frame(index) {
            return false;
        }
        self.history.remove_frame(index);
        self.mark_dirty();
        true
    }

    pub fn move_frame_up(&mut self) -> bool {
        let from = self.sprite.current_index();
        if !self.sprite.move_frame_up() {
            return false;
        }
        self.history.swap_frames(from, from - 1);
        self.mark_dirty();
        true
    }

    pub fn move_frame_down(&mut self) -> bool {
        let from = self.sprite.current_index();
        if !self.sprite.move_frame_down() {
            return false;
        }
        self.history.swap_frames(from, from + 1);
        self.mark_dirty();
        true
    }

    pub fn next_frame(&mut self) {
        self.sprite.next_frame();
    }

    pub fn prev_frame(&mut self) {
        self.sprite.prev_frame();
    }

    pub fn select_frame(&mut self, index: usize) -> bool {
        self.sprite.set_current(index)
    }

    pub fn rename_frame(&mut self, index: usize, name: impl Into<String>) -> bool {
        let renamed = self.sprite.rename_frame(index, name);
        if renamed {
            self.mark_dirty();
        }
        renamed
    }

    /// Per-frame thumbnails for the frame strip, in frame order.
    pub fn thumbnails(&self) -> Vec<PixelBuffer> {
        self.sprite.frames().iter().map(|f| f.thumbnail()).collect()
    }

    // ========================================================================
    // CANVAS
    // ========================================================================

    /// Replace the document with a blank `width x height` sprite. Nothing
    /// changes when the size is rejected.
    pub fn new_project(&mut self, width: u32, height: u32) -> Result<()> {
        let sprite = Sprite::new(width, height).inspect_err(|e| {
            log_warn!("new_project {}x{} rejected: {}", width, height, e);
        })?;
        let id = self.id;
        *self = Self::from_sprite(sprite);
        self.id = id;
        Ok(())
    }

    /// Resize every frame, keeping the top-left overlap. Undo histories are
    /// dropped because their coordinates no longer describe the canvas.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<()> {
        self.sprite.resize(width, height).inspect_err(|e| {
            log_warn!("resize to {}x{} rejected: {}", width, height, e);
        })?;
        self.history.clear_all();
        self.mark_dirty();
        Ok(())
    }

    // ========================================================================
    // FILES
    // ========================================================================

    /// Save to the current path, or to [`DEFAULT_PROJECT_FILE`] when untitled.
    /// Returns the path written.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_FILE));
        self.save_project(&path)?;
        Ok(path)
    }

    /// Write the project to `path` and adopt it as the current path.
    pub fn save_project(&mut self, path: &Path) -> Result<()> {
        if let Err(e) = project_file::save_project(&self.sprite, path) {
            log_err!("Failed to save {}: {}", path.display(), e);
            return Err(e);
        }
        log_info!(
            "Saved {} ({} frame(s), {}x{})",
            path.display(),
            self.sprite.frame_count(),
            self.sprite.width(),
            self.sprite.height()
        );
        self.path = Some(path.to_path_buf());
        self.update_name_from_path();
        self.mark_clean();
        Ok(())
    }

    /// Replace the document with the project at `path`. On any error the
    /// current sprite and histories are left exactly as they were.
    pub fn load_project(&mut self, path: &Path) -> Result<()> {
        let mut loaded = match Self::from_file(path) {
            Ok(project) => project,
            Err(e) => {
                log_err!("Failed to load {}: {}", path.display(), e);
                return Err(e);
            }
        };
        log_info!(
            "Loaded {} ({} frame(s), {}x{})",
            path.display(),
            loaded.sprite.frame_count(),
            loaded.sprite.width(),
            loaded.sprite.height()
        );
        loaded.id = self.id;
        *self = loaded;
        Ok(())
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    pub fn export_gif(&self, path: &Path, options: &gif::GifOptions) -> Result<()> {
        gif::export_gif(self.sprite.frames(), path, options)
            .inspect_err(|e| log_err!("GIF export to {} failed: {}", path.display(), e))
    }

    /// Export the current frame as a PNG.
    pub fn export_png(&self, path: &Path) -> Result<()> {
        export::export_png(self.current_buffer(), path)
            .inspect_err(|e| log_err!("PNG export to {} failed: {}", path.display(), e))
    }

    pub fn export_all_png(&self, basename: &Path) -> Result<Vec<PathBuf>> {
        export::export_all_png(self.sprite.frames(), basename)
    }

    pub fn export_sprite_sheet(&self, path: &Path) -> Result<()> {
        export::export_sprite_sheet(self.sprite.frames(), path)
    }

    pub fn export_godot(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        godot::export_godot(self.sprite.frames(), base_dir)
            .inspect_err(|e| log_err!("Godot export failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PixError;
    use image::Rgba;

    const RED: Color = Rgba([255, 0, 0, 255]);
    const BLUE: Color = Rgba([0, 0, 255, 255]);

    #[test]
    fn basic_edit_and_undo() {
        let mut project = Project::new(4, 4).unwrap();
        assert!(project.paint(1, 1, RED));
        assert!(project.paint(1, 1, BLUE));
        assert!(project.undo());
        assert_eq!(project.current_buffer().get(1, 1), RED);
        assert!(project.undo());
        assert_eq!(project.current_buffer().get(1, 1), TRANSPARENT);
        assert!(!project.can_undo());
        assert!(!project.undo());
    }

    #[test]
    fn edits_mark_dirty_and_noops_do_not() {
        let mut project = Project::new(4, 4).unwrap();
        assert!(!project.erase(0, 0));
        assert!(!project.is_dirty);
        assert_eq!(project.display_title(), "Untitled");
        assert!(project.flood_fill(0, 0, RED));
        assert!(project.is_dirty);
        assert_eq!(project.display_title(), "Untitled*");
        assert!(!project.flood_fill(0, 0, RED));
    }

    #[test]
    fn history_is_per_frame_and_travels_with_reorder() {
        let mut project = Project::new(4, 4).unwrap();
        project.paint(0, 0, RED);
        project.add_frame();
        assert_eq!(project.current_frame(), 1);
        assert!(!project.can_undo());

        assert!(project.move_frame_up());
        assert_eq!(project.current_frame(), 0);
        assert!(!project.can_undo());
        project.select_frame(1);
        assert!(project.can_undo());
        assert!(project.undo());
        assert_eq!(project.current_buffer().get(0, 0), TRANSPARENT);
    }

    #[test]
    fn duplicate_copies_pixels_but_not_history() {
        let mut project = Project::new(2, 2).unwrap();
        project.paint(0, 0, RED);
        assert_eq!(project.duplicate_frame(), Some(1));
        assert_eq!(project.current_buffer().get(0, 0), RED);
        assert_eq!(project.sprite().current_frame().name(), "Frame 0 copy");
        assert!(!project.can_undo());
    }

    #[test]
    fn delete_reindexes_cursor_and_histories() {
        let mut project = Project::new(2, 2).unwrap();
        project.add_frame();
        project.add_frame();
        project.paint(1, 1, BLUE);
        assert_eq!(project.current_frame(), 2);

        assert!(project.delete_frame(1));
        assert_eq!(project.sprite().frame_count(), 2);
        assert_eq!(project.current_frame(), 1);
        assert!(project.can_undo());
        assert_eq!(project.history().frame_count(), 2);

        assert!(project.delete_frame(0));
        assert!(!project.delete_frame(0));
        assert_eq!(project.sprite().frame_count(), 1);
    }

    #[test]
    fn resize_clears_history() {
        let mut project = Project::new(4, 4).unwrap();
        project.paint(3, 3, RED);
        project.paint(0, 0, RED);
        project.resize_canvas(2, 2).unwrap();
        assert!(!project.can_undo());
        assert_eq!(project.current_buffer().get(0, 0), RED);
        assert_eq!(project.current_buffer().get(3, 3), TRANSPARENT);

        assert!(matches!(
            project.resize_canvas(0, 2),
            Err(PixError::InvalidDimensions(_))
        ));
        assert_eq!(project.sprite().width(), 2);
    }

    #[test]
    fn new_project_rejects_bad_size_without_touching_state() {
        let mut project = Project::new(4, 4).unwrap();
        project.paint(0, 0, RED);
        assert!(project.new_project(2049, 10).is_err());
        assert_eq!(project.current_buffer().get(0, 0), RED);
        project.new_project(8, 8).unwrap();
        assert_eq!(project.sprite().width(), 8);
        assert!(!project.can_undo());
    }

    #[test]
    fn clear_current_frame_is_undoable() {
        let mut project = Project::new(3, 3).unwrap();
        project.paint_brush(1, 1, 3, RED);
        assert!(project.clear_current_frame());
        assert_eq!(project.current_buffer().get(2, 2), TRANSPARENT);
        assert_eq!(project.undo_description().as_deref(), Some("Erase (9 px)"));
        assert!(project.undo());
        assert_eq!(project.current_buffer().get(2, 2), RED);
        assert!(project.can_redo());
    }
}
