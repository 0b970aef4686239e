//! Rendering style resolution, independent of the graph layer.

pub mod palette;

pub use palette::{NodeStyle, Palette, PALETTE_FILE_NAME};
