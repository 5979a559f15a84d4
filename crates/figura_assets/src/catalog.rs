//! Named presets offered to the user: characters (main figure looks) and
//! outfits (clothing sets).

use serde::{Deserialize, Serialize};

use crate::recipe::FigureRecipe;

/// A look for the main figure: its shape and material set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Character {
    pub name: String,
    pub shape: String,
    pub material_set: String,
}

impl Character {
    /// Recipe applying this character to the main figure `figure`.
    #[must_use]
    pub fn to_recipe(&self, figure: &str) -> FigureRecipe {
        FigureRecipe::named(figure)
            .with_shape(self.shape.clone())
            .with_material_set(self.material_set.clone())
    }
}

/// A set of clothing figures worn together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outfit {
    pub name: String,
    #[serde(default)]
    pub items: Vec<FigureRecipe>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_parse() {
        let characters: Vec<Character> = serde_json::from_str(
            r#"[{"name":"Eva","shape":"Eva","material-set":"Eva"}]"#,
        )
        .unwrap();
        let recipe = characters[0].to_recipe("genesis-3-female");
        assert_eq!(recipe.shape.as_deref(), Some("Eva"));

        let outfits: Vec<Outfit> =
            serde_json::from_str(r#"[{"name":"Nude"},{"name":"Casual","items":[{"name":"shirt"}]}]"#)
                .unwrap();
        assert!(outfits[0].items.is_empty());
        assert_eq!(outfits[1].items[0].name, "shirt");
    }
}
