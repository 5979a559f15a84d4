//! Actor configuration.
//!
//! [`ActorSettings`] names the figures, animation and controllers an actor
//! starts with. It deserializes from JSON where every field is optional and
//! falls back to the reference figure set.

use std::path::Path;

use serde::{Deserialize, Serialize};

use figura_animation::{BreathingController, MotionFollowController};
use figura_assets::{FigureImportSettings, FigureRecipe, ImportSettings};
use figura_core::Result;

pub const DEFAULT_MAIN_FIGURE: &str = "genesis-3-female";
pub const DEFAULT_ANIMATION: &str = "idle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ActorSettings {
    /// The root figure.
    pub main: String,
    /// Hair figure attached to `main`, if any.
    pub hair: Option<String>,
    /// Clothing worn at load.
    pub clothing: Vec<FigureRecipe>,
    /// Animation track played at load.
    pub animation: Option<String>,
    /// Pose controllers instantiated for the main figure, all enabled.
    pub controllers: Vec<String>,
    /// Multiplier on the animation clock.
    pub animation_speed: f32,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            main: DEFAULT_MAIN_FIGURE.to_string(),
            hair: None,
            clothing: Vec::new(),
            animation: Some(DEFAULT_ANIMATION.to_string()),
            controllers: vec![
                BreathingController::NAME.to_string(),
                MotionFollowController::NAME.to_string(),
            ],
            animation_speed: 1.0,
        }
    }
}

impl ActorSettings {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&text)?;
        log::info!("Actor settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn with_hair(mut self, hair: impl Into<String>) -> Self {
        self.hair = Some(hair.into());
        self
    }

    #[must_use]
    pub fn with_clothing(mut self, clothing: Vec<FigureRecipe>) -> Self {
        self.clothing = clothing;
        self
    }

    /// Every figure the settings reference, main first.
    pub fn figure_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main.as_str())
            .chain(self.hair.as_deref())
            .chain(self.clothing.iter().map(|recipe| recipe.name.as_str()))
    }

    /// Import settings exposing every figure these settings reference.
    #[must_use]
    pub fn to_import_settings(&self) -> ImportSettings {
        let mut settings = ImportSettings::default();
        for name in self.figure_names() {
            settings
                .figures
                .insert(name.to_string(), FigureImportSettings::all());
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_the_default() {
        let settings = ActorSettings::from_json("{}").unwrap();
        assert_eq!(settings, ActorSettings::default());
        assert_eq!(settings.main, DEFAULT_MAIN_FIGURE);
        assert_eq!(settings.controllers, vec!["breathing", "motion-follow"]);
    }

    #[test]
    fn fields_use_kebab_case() {
        let settings = ActorSettings::from_json(
            r#"{
                "main": "body",
                "hair": "liv-hair",
                "clothing": [{ "name": "shirt", "material-set": "Red" }],
                "animation-speed": 0.5
            }"#,
        )
        .unwrap();
        assert_eq!(settings.hair.as_deref(), Some("liv-hair"));
        assert_eq!(settings.clothing[0].material_set.as_deref(), Some("Red"));
        assert!((settings.animation_speed - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.animation.as_deref(), Some(DEFAULT_ANIMATION));
    }

    #[test]
    fn import_settings_cover_every_figure() {
        let settings = ActorSettings::default()
            .with_hair("liv-hair")
            .with_clothing(vec![FigureRecipe::named("shirt")]);
        let import = settings.to_import_settings();
        let figures: Vec<_> = import.figures_to_import().collect();
        assert_eq!(figures, vec!["genesis-3-female", "liv-hair", "shirt"]);
        assert!(import.should_import_shape("shirt", "Anything"));
    }

    #[test]
    fn load_reads_a_settings_file() {
        let path = std::env::temp_dir().join(format!(
            "figura-settings-{}.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, r#"{ "hair": "liv-hair" }"#).unwrap();
        let settings = ActorSettings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.hair.as_deref(), Some("liv-hair"));
        assert_eq!(settings.main, DEFAULT_MAIN_FIGURE);
    }

    #[test]
    fn malformed_document_is_a_json_error() {
        assert!(matches!(
            ActorSettings::from_json("{ \"main\": 3 }"),
            Err(figura_core::FiguraError::Json(_))
        ));
    }
}
