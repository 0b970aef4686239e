//! Node style resolution for renderers.
//!
//! Maps a node kind to visual attributes through two levels of
//! indirection: kind -> base theme key, then base key -> each attribute
//! table. The palette is independent of the graph and the builder; a
//! renderer consults it per node by kind string alone.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CartoError, Result};

/// The packaged default table, compiled into the binary.
const DEFAULT_PALETTE: &str = include_str!("default_palette.json");

/// File name the user-writable copy and any imported palette must use.
pub const PALETTE_FILE_NAME: &str = "palette.json";

/// Resolved visual attributes for one node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// The base theme key the kind mapped through.
    pub base: String,
    /// Whether the renderer should draw the node's label.
    pub label: bool,
    pub shape: String,
    pub color: String,
    pub size: f64,
    pub alpha: f64,
}

/// The persisted table shape: six parallel maps, `bases` keyed by kind,
/// the rest keyed by base theme key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PaletteData {
    bases: IndexMap<String, String>,
    labels: IndexMap<String, bool>,
    shapes: IndexMap<String, String>,
    colors: IndexMap<String, String>,
    sizes: IndexMap<String, f64>,
    alphas: IndexMap<String, f64>,
}

impl PaletteData {
    fn parse(text: &str) -> Result<Self> {
        let data: PaletteData = serde_json::from_str(text)
            .map_err(|err| CartoError::InvalidPalette(err.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// The Unknown fallback must always be resolvable, and every mapped
    /// base must appear in every attribute table.
    fn validate(&self) -> Result<()> {
        if !self.bases.contains_key("Unknown") {
            return Err(CartoError::InvalidPalette(
                "missing the 'Unknown' kind mapping".to_string(),
            ));
        }
        for (kind, base) in &self.bases {
            let complete = self.labels.contains_key(base)
                && self.shapes.contains_key(base)
                && self.colors.contains_key(base)
                && self.sizes.contains_key(base)
                && self.alphas.contains_key(base);
            if !complete {
                return Err(CartoError::InvalidPalette(format!(
                    "base '{base}' (used by '{kind}') is missing from an attribute table"
                )));
            }
        }
        Ok(())
    }
}

/// The style resolver.
pub struct Palette {
    /// User-writable copy; `None` keeps the palette purely in memory.
    user_path: Option<PathBuf>,
    data: PaletteData,
}

impl Palette {
    /// A palette backed by no file, holding the packaged defaults.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            user_path: None,
            data: PaletteData::parse(DEFAULT_PALETTE)?,
        })
    }

    /// Open the palette stored under `dir` (as `palette.json`), falling
    /// back to the packaged defaults when no user copy exists yet.
    pub fn open(dir: &Path) -> Result<Self> {
        let user_path = dir.join(PALETTE_FILE_NAME);
        let data = if user_path.is_file() {
            let text = fs::read_to_string(&user_path)?;
            PaletteData::parse(&text)?
        } else {
            debug!(path = %user_path.display(), "no user palette, using packaged defaults");
            PaletteData::parse(DEFAULT_PALETTE)?
        };
        Ok(Self {
            user_path: Some(user_path),
            data,
        })
    }

    /// Persist the current table to the user copy, if one is configured.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.user_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.data)
            .map_err(|err| CartoError::InvalidPalette(err.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Copy the packaged default table over the user copy.
    pub fn reset(&mut self) -> Result<()> {
        info!("resetting palette to packaged defaults");
        self.data = PaletteData::parse(DEFAULT_PALETTE)?;
        self.save()
    }

    /// Replace the user copy with `path` after validating it.
    ///
    /// The file must exist, be a `.json` file named `palette.json`, and
    /// parse into the expected six-table shape.
    pub fn import_from(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(CartoError::PathNotFound(path.to_path_buf()));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(CartoError::InvalidPalette(format!(
                "palette file must be a json file: {}",
                path.display()
            )));
        }
        if path.file_name().and_then(|n| n.to_str()) != Some(PALETTE_FILE_NAME) {
            return Err(CartoError::InvalidPalette(format!(
                "palette file must be named '{PALETTE_FILE_NAME}': {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        self.data = PaletteData::parse(&text)?;
        self.save()
    }

    /// Export the current table to `dir` under a timestamped name that
    /// avoids clobbering earlier exports. Returns the written path.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.is_dir() {
            return Err(CartoError::PathNotFound(dir.to_path_buf()));
        }
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let target = dir.join(format!("palette_{stamp}.json"));
        let text = serde_json::to_string_pretty(&self.data)
            .map_err(|err| CartoError::InvalidPalette(err.to_string()))?;
        fs::write(&target, text)?;
        Ok(target)
    }

    /// Resolve a kind to its style. Unmapped kinds get the fixed
    /// `Unknown` style rather than failing.
    pub fn get_style(&self, kind: &str) -> NodeStyle {
        let base = self
            .data
            .bases
            .get(kind)
            .or_else(|| self.data.bases.get("Unknown"))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        self.style_for_base(&base)
    }

    /// Styles for every mapped kind.
    pub fn get_all_styles(&self) -> IndexMap<String, NodeStyle> {
        self.data
            .bases
            .keys()
            .map(|kind| (kind.clone(), self.get_style(kind)))
            .collect()
    }

    /// All mapped kinds, in table order.
    pub fn kinds(&self) -> Vec<String> {
        self.data.bases.keys().cloned().collect()
    }

    /// Create or overwrite a theme for `kind`.
    ///
    /// If the kind is already mapped and `overwrite` is false, nothing
    /// changes and `None` is returned (the interactive confirmation lives
    /// in the CLI). Otherwise all attribute tables are written for the
    /// base key, the table is persisted, and the resolved style returned.
    #[allow(clippy::too_many_arguments)]
    pub fn create_theme(
        &mut self,
        kind: &str,
        base: &str,
        label: bool,
        shape: &str,
        size: f64,
        color: &str,
        alpha: f64,
        overwrite: bool,
    ) -> Result<Option<NodeStyle>> {
        if self.data.bases.contains_key(kind) && !overwrite {
            return Ok(None);
        }
        self.data.bases.insert(kind.to_string(), base.to_string());
        self.data.labels.insert(base.to_string(), label);
        self.data.shapes.insert(base.to_string(), shape.to_string());
        self.data.colors.insert(base.to_string(), color.to_string());
        self.data.sizes.insert(base.to_string(), size);
        self.data.alphas.insert(base.to_string(), alpha);
        self.save()?;
        Ok(Some(self.get_style(kind)))
    }

    fn style_for_base(&self, base: &str) -> NodeStyle {
        NodeStyle {
            base: base.to_string(),
            label: self.data.labels.get(base).copied().unwrap_or(false),
            shape: self
                .data
                .shapes
                .get(base)
                .cloned()
                .unwrap_or_else(|| "o".to_string()),
            color: self
                .data
                .colors
                .get(base)
                .cloned()
                .unwrap_or_else(|| "#c7c7c7".to_string()),
            size: self.data.sizes.get(base).copied().unwrap_or(100.0),
            alpha: self.data.alphas.get(base).copied().unwrap_or(0.4),
        }
    }
}
