//! Godot resource export.
//!
//! A single-frame sprite becomes `sprite.png` + `sprite.tres`. An animation
//! becomes a horizontal `spritesheet.png`, a `spritesheet.tres` SpriteFrames
//! resource, and an `animation.tres` driving `Sprite:frame` at 0.2 s per frame.
//! Everything is written to `<base>/godot_export/`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::canvas::Frame;
use crate::error::{PixError, Result};
use crate::io::export::{export_png, export_sprite_sheet};

pub const EXPORT_DIR: &str = "godot_export";
/// SpriteFrames playback speed, frames per second.
const SPEED: f64 = 5.0;

/// `[gd_resource type="SpriteFrames"]` referencing `texture` once per frame.
pub fn sprite_frames_tres(texture: &str, frame_count: usize) -> String {
    let mut out = String::new();
    out.push_str("[gd_resource type=\"SpriteFrames\" load_steps=2 format=2]\n\n");
    let _ = writeln!(
        out,
        "[ext_resource path=\"res://{}\" type=\"Texture\" id=1]\n",
        texture
    );
    out.push_str("[resource]\n");
    out.push_str("animations = [ {\n");
    let refs = vec![" ExtResource( 1 )"; frame_count.max(1)].join(",");
    let _ = writeln!(out, "\"frames\": [{} ],", refs);
    out.push_str("\"loop\": true,\n");
    out.push_str("\"name\": \"default\",\n");
    let _ = writeln!(out, "\"speed\": {:.1}", SPEED);
    out.push_str("} ]\n");
    out
}

/// `[gd_resource type="Animation"]` stepping `Sprite:frame` through
/// `0..frame_count`, one key every 0.2 s.
pub fn animation_tres(sprite_frames: &str, frame_count: usize) -> String {
    let join = |f: &dyn Fn(usize) -> String| {
        (0..frame_count).map(f).collect::<Vec<_>>().join(", ")
    };

    let mut out = String::new();
    out.push_str("[gd_resource type=\"Animation\" load_steps=2 format=2]\n\n");
    let _ = writeln!(
        out,
        "[ext_resource path=\"res://{}\" type=\"SpriteFrames\" id=1]\n",
        sprite_frames
    );
    out.push_str("[resource]\n");
    out.push_str("loop = true\n");
    out.push_str("step = 0.1\n");
    let _ = writeln!(out, "length = {}", frame_count as f64 / SPEED);
    out.push_str("tracks/0 = \"value\"\n");
    out.push_str("tracks/0/type = 0\n");
    out.push_str("tracks/0/path = NodePath(\"Sprite:frame\")\n");
    out.push_str("tracks/0/interp = 1\n");
    out.push_str("tracks/0/loop_wrap = true\n");
    out.push_str("tracks/0/imported = false\n");
    out.push_str("tracks/0/enabled = true\n");
    out.push_str("tracks/0/keys = {\n");
    let _ = writeln!(
        out,
        "\"times\": PoolRealArray({}),",
        join(&|i| format!("{}", i as f64 / SPEED))
    );
    let _ = writeln!(
        out,
        "\"transitions\": PoolRealArray({}),",
        join(&|_| "1.0".to_string())
    );
    out.push_str("\"update\": 0,\n");
    let _ = writeln!(out, "\"values\": [ {} ]", join(&|i| i.to_string()));
    out.push_str("}\n");
    out
}

/// Write the Godot resources for `frames` under `<base_dir>/godot_export/`.
/// Returns the files written.
pub fn export_godot(frames: &[Frame], base_dir: &Path) -> Result<Vec<PathBuf>> {
    let first = frames.first().ok_or(PixError::EmptySprite)?;
    let dir = base_dir.join(EXPORT_DIR);
    fs::create_dir_all(&dir)?;

    let written = if frames.len() == 1 {
        let png = dir.join("sprite.png");
        let tres = dir.join("sprite.tres");
        export_png(first.buffer(), &png)?;
        fs::write(&tres, sprite_frames_tres("sprite.png", 1))?;
        vec![png, tres]
    } else {
        let png = dir.join("spritesheet.png");
        let frames_tres = dir.join("spritesheet.tres");
        let anim_tres = dir.join("animation.tres");
        export_sprite_sheet(frames, &png)?;
        fs::write(&frames_tres, sprite_frames_tres("spritesheet.png", frames.len()))?;
        fs::write(&anim_tres, animation_tres("spritesheet.tres", frames.len()))?;
        vec![png, frames_tres, anim_tres]
    };

    log_info!(
        "Godot export: {} frame(s) -> {}",
        frames.len(),
        dir.display()
    );
    Ok(written)
}
