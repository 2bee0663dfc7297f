//! File formats and exports: `PIX1` projects, GIF animation, PNG and Godot resources.

pub mod export;
pub mod gif;
pub mod godot;
pub mod project_file;
