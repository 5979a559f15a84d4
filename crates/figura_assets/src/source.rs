//! Asset sources: where figure definitions, animation tracks and catalogs come from.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use figura_animation::AnimationTrack;
use figura_core::{FiguraError, Result};

use crate::catalog::{Character, Outfit};
use crate::definition::FigureDesc;
use crate::import::ImportSettings;

/// Resolves assets by name.
pub trait AssetSource: Send + Sync {
    /// Serialized definition of the figure `name`, or `AssetNotFound`.
    fn figure_desc(&self, name: &str) -> Result<FigureDesc>;

    /// The animation track `name`, or `AssetNotFound`.
    fn animation_track(&self, name: &str) -> Result<AnimationTrack>;

    /// Every animation track this source can resolve.
    fn animation_names(&self) -> Result<Vec<String>>;

    fn characters(&self) -> Result<Vec<Character>>;

    fn outfits(&self) -> Result<Vec<Outfit>>;
}

// ============================================================================
// In-memory source
// ============================================================================

/// Asset source backed by values held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    figures: BTreeMap<String, FigureDesc>,
    animations: BTreeMap<String, AnimationTrack>,
    characters: Vec<Character>,
    outfits: Vec<Outfit>,
}

impl MemoryAssetSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_figure(mut self, desc: FigureDesc) -> Self {
        self.insert_figure(desc);
        self
    }

    #[must_use]
    pub fn with_animation(mut self, track: AnimationTrack) -> Self {
        self.animations.insert(track.name.clone(), track);
        self
    }

    #[must_use]
    pub fn with_character(mut self, character: Character) -> Self {
        self.characters.push(character);
        self
    }

    #[must_use]
    pub fn with_outfit(mut self, outfit: Outfit) -> Self {
        self.outfits.push(outfit);
        self
    }

    /// Adds or replaces a figure.
    pub fn insert_figure(&mut self, desc: FigureDesc) {
        self.figures.insert(desc.name.clone(), desc);
    }
}

impl AssetSource for MemoryAssetSource {
    fn figure_desc(&self, name: &str) -> Result<FigureDesc> {
        self.figures
            .get(name)
            .cloned()
            .ok_or_else(|| FiguraError::AssetNotFound(format!("figure '{name}'")))
    }

    fn animation_track(&self, name: &str) -> Result<AnimationTrack> {
        self.animations
            .get(name)
            .cloned()
            .ok_or_else(|| FiguraError::AssetNotFound(format!("animation '{name}'")))
    }

    fn animation_names(&self) -> Result<Vec<String>> {
        Ok(self.animations.keys().cloned().collect())
    }

    fn characters(&self) -> Result<Vec<Character>> {
        Ok(self.characters.clone())
    }

    fn outfits(&self) -> Result<Vec<Outfit>> {
        Ok(self.outfits.clone())
    }
}

// ============================================================================
// Directory source
// ============================================================================

/// Asset source reading JSON documents from a content directory:
///
/// ```text
/// <root>/figures/<name>.json
/// <root>/animations/<name>.json
/// <root>/characters.json
/// <root>/outfits.json
/// ```
///
/// With [`ImportSettings`], only the listed figures resolve and their shapes
/// and material sets are pruned to the selection.
#[derive(Debug, Clone)]
pub struct DirectoryAssetSource {
    root: PathBuf,
    import: Option<ImportSettings>,
}

impl DirectoryAssetSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            import: None,
        }
    }

    #[must_use]
    pub fn with_import_settings(mut self, settings: ImportSettings) -> Self {
        self.import = Some(settings);
        self
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    fn read_json<T: DeserializeOwned>(&self, relative: &Path, what: &str) -> Result<T> {
        let path = self.root.join(relative);
        let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FiguraError::AssetNotFound(format!("{what} ({})", path.display())),
            _ => FiguraError::Io(err),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Reads an optional catalog; a missing file is an empty catalog.
    fn read_catalog<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        match self.read_json(Path::new(file), file) {
            Err(FiguraError::AssetNotFound(_)) => {
                log::debug!("No {file} in {}; catalog is empty", self.root.display());
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

impl AssetSource for DirectoryAssetSource {
    fn figure_desc(&self, name: &str) -> Result<FigureDesc> {
        let settings = match &self.import {
            Some(import) => Some(import.figure(name).ok_or_else(|| {
                FiguraError::AssetNotFound(format!("figure '{name}' (not selected for import)"))
            })?),
            None => None,
        };

        let relative = Path::new("figures").join(format!("{name}.json"));
        let mut desc: FigureDesc = self.read_json(&relative, &format!("figure '{name}'"))?;
        if desc.name != name {
            log::warn!("Figure file '{name}.json' declares name '{}'; using file name", desc.name);
            desc.name = name.to_string();
        }
        if let Some(settings) = settings {
            settings.prune(&mut desc);
        }
        Ok(desc)
    }

    fn animation_track(&self, name: &str) -> Result<AnimationTrack> {
        let relative = Path::new("animations").join(format!("{name}.json"));
        let mut track: AnimationTrack = self.read_json(&relative, &format!("animation '{name}'"))?;
        track.name = name.to_string();
        Ok(track)
    }

    fn animation_names(&self) -> Result<Vec<String>> {
        let dir = self.root.join("animations");
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn characters(&self) -> Result<Vec<Character>> {
        self.read_catalog("characters.json")
    }

    fn outfits(&self) -> Result<Vec<Outfit>> {
        self.read_catalog("outfits.json")
    }
}
