//! Theme Assets
//!
//! A theme is a directory under `<plugin_root>/themes/<name>/` holding
//! character images, sounds, an optional `manifest.json` and an optional
//! `messages.json`.
//!
//! # Resolution
//!
//! Image: manifest path (if the file exists), then
//! `characters/<state>.{png,gif}`, then `characters/idle.{png,gif}`.
//! Sound: manifest path (if the file exists), then
//! `sounds/<state>.{wav,mp3,m4a,aiff,caf}`. Anything still missing resolves
//! to `None`; the renderer and notifier carry on without it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::messages::MessageBook;
use crate::state::CompanionState;

/// Manifest file name inside a theme directory
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

const IMAGE_EXTENSIONS: [&str; 2] = ["png", "gif"];
const SOUND_EXTENSIONS: [&str; 5] = ["wav", "mp3", "m4a", "aiff", "caf"];

/// Errors raised while reading a theme manifest
#[derive(Debug, Error)]
pub enum ThemeError {
    /// The manifest exists but could not be read
    #[error("Failed to read theme manifest at {path}: {source}")]
    Read {
        /// The manifest path
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The manifest is not valid JSON for this schema
    #[error("Failed to parse theme manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Explicit per-state asset mapping
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThemeManifest {
    /// Display name
    pub name: Option<String>,
    /// Per-state entries keyed by state name
    pub states: HashMap<String, StateAssets>,
}

/// Assets named by the manifest for one state
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StateAssets {
    /// Image path relative to the theme directory
    pub animation: Option<String>,
    /// Sound path relative to the theme directory
    pub sound: Option<String>,
}

impl ThemeManifest {
    /// Read `manifest.json` from `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_dir(dir: &Path) -> Result<Self, ThemeError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ThemeError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn entry(&self, state: CompanionState) -> Option<&StateAssets> {
        self.states.get(state.name())
    }
}

/// Asset paths resolved for one state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedAssets {
    /// Base image
    pub image: Option<PathBuf>,
    /// Entry sound
    pub sound: Option<PathBuf>,
}

/// A loaded theme with every state's assets resolved up front
#[derive(Clone, Debug)]
pub struct Theme {
    name: String,
    dir: PathBuf,
    assets: HashMap<CompanionState, ResolvedAssets>,
    messages: MessageBook,
}

impl Theme {
    /// Load theme `name` from `<plugin_root>/themes/`
    ///
    /// Never fails: a missing directory or broken manifest leaves every
    /// state unresolved and logs a warning.
    #[must_use]
    pub fn load(plugin_root: &Path, name: &str) -> Self {
        let dir = plugin_root.join("themes").join(name);
        if !dir.is_dir() {
            warn!(theme = %name, path = %dir.display(), "Theme directory not found");
        }

        let manifest = ThemeManifest::from_dir(&dir).unwrap_or_else(|e| {
            warn!(theme = %name, error = %e, "Invalid theme manifest, using conventional names");
            ThemeManifest::default()
        });

        let assets = CompanionState::ALL
            .into_iter()
            .map(|state| (state, resolve(&dir, &manifest, state)))
            .collect();

        debug!(theme = %name, path = %dir.display(), "Loaded theme");

        Self {
            name: name.to_string(),
            messages: MessageBook::load(&dir),
            dir,
            assets,
        }
    }

    /// Theme name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Theme directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Image for `state`
    #[must_use]
    pub fn image(&self, state: CompanionState) -> Option<&Path> {
        self.assets.get(&state).and_then(|a| a.image.as_deref())
    }

    /// Sound for `state`
    #[must_use]
    pub fn sound(&self, state: CompanionState) -> Option<&Path> {
        self.assets.get(&state).and_then(|a| a.sound.as_deref())
    }

    /// Bubble lines shipped with the theme (or the built-ins)
    #[must_use]
    pub fn messages(&self) -> &MessageBook {
        &self.messages
    }
}

/// Resolve both assets for `state`
#[must_use]
pub fn resolve(dir: &Path, manifest: &ThemeManifest, state: CompanionState) -> ResolvedAssets {
    let entry = manifest.entry(state);

    let image = explicit(dir, entry.and_then(|e| e.animation.as_deref()))
        .or_else(|| conventional(&dir.join("characters"), state.name(), &IMAGE_EXTENSIONS))
        .or_else(|| conventional(&dir.join("characters"), CompanionState::Idle.name(), &IMAGE_EXTENSIONS));

    let sound = explicit(dir, entry.and_then(|e| e.sound.as_deref()))
        .or_else(|| {
            sound_stems(state)
                .iter()
                .find_map(|stem| conventional(&dir.join("sounds"), stem, &SOUND_EXTENSIONS))
        });

    if image.is_none() {
        debug!(%state, "No image for state");
    }

    ResolvedAssets { image, sound }
}

/// File stems tried for a state's sound, in order
fn sound_stems(state: CompanionState) -> &'static [&'static str] {
    match state {
        CompanionState::Celebrating => &["celebrating", "celebration"],
        CompanionState::Idle => &["idle"],
        CompanionState::Greeting => &["greeting"],
        CompanionState::Working => &["working"],
        CompanionState::Success => &["success"],
        CompanionState::Error => &["error"],
        CompanionState::Sleeping => &["sleeping"],
        CompanionState::Farewell => &["farewell"],
    }
}

fn explicit(dir: &Path, relative: Option<&str>) -> Option<PathBuf> {
    let path = dir.join(relative?);
    if path.is_file() {
        Some(path)
    } else {
        debug!(path = %path.display(), "Manifest asset missing, falling back");
        None
    }
}

fn conventional(dir: &Path, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_manifest_wins() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("themes").join("neon");
        touch(&dir.join("anim/wave.gif"));
        touch(&dir.join("characters/greeting.png"));
        touch(&dir.join("audio/hi.mp3"));
        std::fs::write(
            dir.join(MANIFEST_FILE_NAME),
            r#"{"name": "Neon", "states": {"greeting": {"animation": "anim/wave.gif", "sound": "audio/hi.mp3"}}}"#,
        )
        .unwrap();

        let theme = Theme::load(root.path(), "neon");
        assert_eq!(theme.image(CompanionState::Greeting), Some(dir.join("anim/wave.gif").as_path()));
        assert_eq!(theme.sound(CompanionState::Greeting), Some(dir.join("audio/hi.mp3").as_path()));
    }

    #[test]
    fn test_conventional_names_and_idle_fallback() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("themes").join("default");
        touch(&dir.join("characters/idle.png"));
        touch(&dir.join("characters/error.gif"));
        touch(&dir.join("sounds/error.wav"));

        let theme = Theme::load(root.path(), "default");
        assert_eq!(theme.image(CompanionState::Error), Some(dir.join("characters/error.gif").as_path()));
        assert_eq!(theme.sound(CompanionState::Error), Some(dir.join("sounds/error.wav").as_path()));
        assert_eq!(theme.image(CompanionState::Working), Some(dir.join("characters/idle.png").as_path()));
        assert_eq!(theme.sound(CompanionState::Working), None);
    }

    #[test]
    fn test_missing_manifest_asset_falls_back() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("themes").join("default");
        touch(&dir.join("characters/success.png"));
        std::fs::write(
            dir.join(MANIFEST_FILE_NAME),
            r#"{"states": {"success": {"animation": "gone.gif"}}}"#,
        )
        .unwrap();

        let theme = Theme::load(root.path(), "default");
        assert_eq!(theme.image(CompanionState::Success), Some(dir.join("characters/success.png").as_path()));
    }

    #[test]
    fn test_celebration_sound_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("themes").join("default");
        touch(&dir.join("sounds/celebration.wav"));

        let theme = Theme::load(root.path(), "default");
        assert_eq!(
            theme.sound(CompanionState::Celebrating),
            Some(dir.join("sounds/celebration.wav").as_path())
        );

        touch(&dir.join("sounds/celebrating.mp3"));
        let theme = Theme::load(root.path(), "default");
        assert_eq!(
            theme.sound(CompanionState::Celebrating),
            Some(dir.join("sounds/celebrating.mp3").as_path())
        );
    }

    #[test]
    fn test_missing_theme_is_empty_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        let theme = Theme::load(root.path(), "nope");
        for state in CompanionState::ALL {
            assert_eq!(theme.image(state), None);
            assert_eq!(theme.sound(state), None);
        }
        assert_eq!(theme.messages(), &MessageBook::default());
    }

    #[test]
    fn test_invalid_manifest_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "{ nope").unwrap();
        assert!(matches!(ThemeManifest::from_dir(dir.path()), Err(ThemeError::Parse(_))));
    }
}
