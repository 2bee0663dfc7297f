//! Multi-frame pixel-art sprite engine.
//!
//! The core is the [`canvas::Sprite`] data model, per-frame undo/redo
//! ([`components::history`]), flood fill ([`ops::fill`]), the `PIX1` project
//! format ([`io::project_file`]) and a 16-colour animated GIF encoder
//! ([`io::gif`]). [`project::Project`] ties them together into the API an
//! editor front end calls; the `pix` binary drives the same API headlessly.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod project;

pub use canvas::{Color, Frame, PixelBuffer, Sprite, TRANSPARENT};
pub use components::history::{Action, UndoEngine};
pub use error::{PixError, Result};
pub use io::gif::GifOptions;
pub use project::Project;
