use serde::{Deserialize, Serialize};

/// Snapshot of one figure's shape and material-set choice.
///
/// `name` identifies the figure. The other fields are optional: `None` leaves
/// the live choice unchanged when merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FigureRecipe {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_set: Option<String>,
}

impl FigureRecipe {
    /// Recipe naming only the figure.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: None,
            material_set: None,
        }
    }

    #[must_use]
    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    #[must_use]
    pub fn with_material_set(mut self, material_set: impl Into<String>) -> Self {
        self.material_set = Some(material_set.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_stay_absent() {
        let recipe: FigureRecipe = serde_json::from_str(r#"{"name":"shirt"}"#).unwrap();
        assert_eq!(recipe, FigureRecipe::named("shirt"));
        assert_eq!(serde_json::to_string(&recipe).unwrap(), r#"{"name":"shirt"}"#);

        let full = FigureRecipe::named("shirt").with_material_set("Red");
        assert_eq!(
            serde_json::to_string(&full).unwrap(),
            r#"{"name":"shirt","material-set":"Red"}"#
        );
    }
}
