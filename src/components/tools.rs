use image::Rgba;

use crate::canvas::Color;

/// Opacity (0-255) of the previous frame when onion skinning is on.
pub const ONION_SKIN_ALPHA: u8 = 100;

/// Largest brush the tool settings accept.
pub const MAX_BRUSH_SIZE: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Fill,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Fill => "Fill",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Pencil, Tool::Eraser, Tool::Fill]
    }

    /// Case-insensitive lookup by label.
    pub fn from_name(name: &str) -> Option<Tool> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.label().eq_ignore_ascii_case(name.trim()))
    }
}

/// What the next edit uses: active tool, colour, brush diameter and whether
/// the previous frame is shown underneath.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolSettings {
    pub tool: Tool,
    pub color: Color,
    pub brush_size: u32,
    pub onion_skin: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            color: Rgba([255, 0, 0, 255]),
            brush_size: 1,
            onion_skin: false,
        }
    }
}

impl ToolSettings {
    /// Set the brush diameter, clamped to `1..=MAX_BRUSH_SIZE`.
    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.clamp(1, MAX_BRUSH_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for tool in Tool::all() {
            assert_eq!(Tool::from_name(tool.label()), Some(*tool));
        }
        assert_eq!(Tool::from_name(" eraser "), Some(Tool::Eraser));
        assert_eq!(Tool::from_name("lasso"), None);
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut settings = ToolSettings::default();
        assert_eq!(settings.tool, Tool::Pencil);
        settings.set_brush_size(0);
        assert_eq!(settings.brush_size, 1);
        settings.set_brush_size(500);
        assert_eq!(settings.brush_size, MAX_BRUSH_SIZE);
    }
}
