//! Import settings: which figures, shapes and material sets an asset source exposes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::definition::{DEFAULT_SHAPE, FigureDesc};

/// Names selected from a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Selection {
    Specific(BTreeSet<String>),
    All,
    /// Everything except the collection's default entry.
    AllExceptDefault,
}

impl Default for Selection {
    fn default() -> Self {
        Self::Specific(BTreeSet::new())
    }
}

impl Selection {
    pub fn specific<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Specific(names.into_iter().map(Into::into).collect())
    }

    /// Whether `name` is selected, given the collection's default entry.
    #[must_use]
    pub fn includes(&self, name: &str, default: &str) -> bool {
        match self {
            Self::Specific(names) => names.contains(name),
            Self::All => true,
            Self::AllExceptDefault => name != default,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FigureImportSettings {
    #[serde(default)]
    pub shapes: Selection,
    #[serde(default)]
    pub material_sets: Selection,
}

impl FigureImportSettings {
    #[must_use]
    pub fn all() -> Self {
        Self {
            shapes: Selection::AllExceptDefault,
            material_sets: Selection::All,
        }
    }

    #[must_use]
    pub fn should_import_shape(&self, shape: &str) -> bool {
        self.shapes.includes(shape, DEFAULT_SHAPE)
    }

    /// Material sets have no default entry; `AllExceptDefault` selects them all.
    #[must_use]
    pub fn should_import_material_set(&self, material_set: &str) -> bool {
        self.material_sets.includes(material_set, "")
    }

    /// Drops the shapes and material sets this selection excludes.
    ///
    /// The default shape is part of the base geometry and always survives.
    pub fn prune(&self, desc: &mut FigureDesc) {
        let shapes_before = desc.shapes.len();
        let sets_before = desc.material_sets.len();

        desc.shapes
            .retain(|name, _| name == DEFAULT_SHAPE || self.should_import_shape(name));
        desc.material_sets
            .retain(|name, _| self.should_import_material_set(name));
        if desc
            .default_material_set
            .as_ref()
            .is_some_and(|name| !desc.material_sets.contains_key(name))
        {
            desc.default_material_set = None;
        }

        log::debug!(
            "Import settings kept {}/{shapes_before} shapes and {}/{sets_before} material sets of '{}'",
            desc.shapes.len(),
            desc.material_sets.len(),
            desc.name
        );
    }
}

/// Per-figure import settings. Figures not listed are not imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    #[serde(default)]
    pub figures: BTreeMap<String, FigureImportSettings>,
}

impl ImportSettings {
    /// Settings used for release builds of the reference content.
    #[must_use]
    pub fn release() -> Self {
        let release_characters = ["Mei Lin", "Rune", "Eva", "Monique", "Victoria"];
        let mut figures = BTreeMap::new();
        figures.insert(
            "genesis-3-female".to_string(),
            FigureImportSettings {
                shapes: Selection::specific(release_characters),
                material_sets: Selection::specific(release_characters),
            },
        );
        figures.insert("liv-hair".to_string(), FigureImportSettings::all());
        Self { figures }
    }

    pub fn figures_to_import(&self) -> impl Iterator<Item = &str> {
        self.figures.keys().map(String::as_str)
    }

    #[must_use]
    pub fn figure(&self, name: &str) -> Option<&FigureImportSettings> {
        self.figures.get(name)
    }

    #[must_use]
    pub fn should_import_shape(&self, figure: &str, shape: &str) -> bool {
        self.figure(figure)
            .is_some_and(|settings| settings.should_import_shape(shape))
    }

    #[must_use]
    pub fn should_import_material_set(&self, figure: &str, material_set: &str) -> bool {
        self.figure(figure)
            .is_some_and(|settings| settings.should_import_material_set(material_set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::MaterialSet;

    #[test]
    fn selection_semantics() {
        let specific = Selection::specific(["Eva"]);
        assert!(specific.includes("Eva", DEFAULT_SHAPE));
        assert!(!specific.includes("Rune", DEFAULT_SHAPE));

        assert!(Selection::All.includes(DEFAULT_SHAPE, DEFAULT_SHAPE));
        assert!(!Selection::AllExceptDefault.includes(DEFAULT_SHAPE, DEFAULT_SHAPE));
        assert!(Selection::AllExceptDefault.includes("Eva", DEFAULT_SHAPE));
    }

    #[test]
    fn release_settings() {
        let settings = ImportSettings::release();
        let figures: Vec<_> = settings.figures_to_import().collect();
        assert_eq!(figures, vec!["genesis-3-female", "liv-hair"]);

        assert!(settings.should_import_shape("genesis-3-female", "Eva"));
        assert!(!settings.should_import_shape("genesis-3-female", "Base"));
        assert!(settings.should_import_shape("liv-hair", "Curly"));
        assert!(!settings.should_import_shape("liv-hair", "Base"));
        assert!(settings.should_import_material_set("liv-hair", "Anything"));
        assert!(!settings.should_import_shape("unlisted", "Eva"));
    }

    #[test]
    fn prune_keeps_default_shape() {
        let mut desc = FigureDesc {
            name: "body".into(),
            default_material_set: Some("Gone".into()),
            ..FigureDesc::default()
        };
        for shape in ["Base", "Eva", "Rune"] {
            desc.shapes.insert(shape.into(), BTreeMap::new());
        }
        for set in ["Eva", "Gone"] {
            desc.material_sets.insert(set.into(), MaterialSet::default());
        }

        let settings = FigureImportSettings {
            shapes: Selection::specific(["Eva"]),
            material_sets: Selection::specific(["Eva"]),
        };
        settings.prune(&mut desc);

        assert_eq!(desc.shapes.keys().collect::<Vec<_>>(), vec!["Base", "Eva"]);
        assert_eq!(desc.material_sets.keys().collect::<Vec<_>>(), vec!["Eva"]);
        assert_eq!(desc.default_material_set, None);
    }

    #[test]
    fn selection_deserializes_from_tagged_form() {
        let settings: FigureImportSettings =
            serde_json::from_str(r#"{"shapes":{"specific":["Eva"]},"material-sets":"all"}"#)
                .unwrap();
        assert_eq!(settings.shapes, Selection::specific(["Eva"]));
        assert_eq!(settings.material_sets, Selection::All);
    }
}
