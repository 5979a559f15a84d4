//! Whole-actor snapshots and the outcome of merging them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use figura_animation::{BehaviorRecipe, PoseRecipe};
use figura_assets::FigureRecipe;
use figura_core::{FiguraError, RecipeMismatch};

/// Serializable snapshot of an actor.
///
/// Every field is optional. An absent field leaves that part of the actor
/// unchanged on merge, so a partial recipe such as `{ "clothing": [] }`
/// changes only what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ActorRecipe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<FigureRecipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hair: Option<HairRecipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clothing: Option<Vec<FigureRecipe>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behaviour: Option<BehaviorRecipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_values: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<PoseRecipe>,
}

impl ActorRecipe {
    pub fn from_json(text: &str) -> figura_core::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> figura_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// True when merging this recipe changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The hair slot in an [`ActorRecipe`].
///
/// Serializes as a figure recipe object, or as the string `"none"` for an
/// actor without hair. A `null` or absent `hair` key is not a `HairRecipe`:
/// it leaves the slot unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HairRepr", into = "HairRepr")]
pub enum HairRecipe {
    Removed,
    Figure(FigureRecipe),
}

impl HairRecipe {
    const REMOVED: &'static str = "none";

    /// The figure recipe, unless the slot is empty.
    #[must_use]
    pub fn figure(&self) -> Option<&FigureRecipe> {
        match self {
            Self::Removed => None,
            Self::Figure(recipe) => Some(recipe),
        }
    }
}

impl From<FigureRecipe> for HairRecipe {
    fn from(recipe: FigureRecipe) -> Self {
        Self::Figure(recipe)
    }
}

impl From<Option<FigureRecipe>> for HairRecipe {
    fn from(recipe: Option<FigureRecipe>) -> Self {
        recipe.map_or(Self::Removed, Self::Figure)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum HairRepr {
    Figure(FigureRecipe),
    Keyword(String),
}

impl TryFrom<HairRepr> for HairRecipe {
    type Error = String;

    fn try_from(repr: HairRepr) -> Result<Self, Self::Error> {
        match repr {
            HairRepr::Figure(recipe) => Ok(Self::Figure(recipe)),
            HairRepr::Keyword(word) if word == Self::REMOVED => Ok(Self::Removed),
            HairRepr::Keyword(word) => Err(format!(
                "hair must be a figure recipe or \"{}\", found \"{word}\"",
                Self::REMOVED
            )),
        }
    }
}

impl From<HairRecipe> for HairRepr {
    fn from(hair: HairRecipe) -> Self {
        match hair {
            HairRecipe::Removed => Self::Keyword(HairRecipe::REMOVED.to_string()),
            HairRecipe::Figure(recipe) => Self::Figure(recipe),
        }
    }
}

/// References a merge skipped. A report with mismatches still means the
/// rest of the recipe was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    mismatches: Vec<RecipeMismatch>,
}

impl MergeReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    #[must_use]
    pub fn mismatches(&self) -> &[RecipeMismatch] {
        &self.mismatches
    }

    pub fn push(&mut self, mismatch: RecipeMismatch) {
        self.mismatches.push(mismatch);
    }

    pub fn absorb(&mut self, other: MergeReport) {
        self.mismatches.extend(other.mismatches);
    }

    /// The mismatches as errors, for callers that treat them as failures.
    pub fn errors(&self) -> impl Iterator<Item = FiguraError> + '_ {
        self.mismatches
            .iter()
            .cloned()
            .map(FiguraError::RecipeMergeMismatch)
    }

    /// `Ok` when clean, otherwise the first mismatch as an error.
    pub fn into_result(self) -> figura_core::Result<()> {
        match self.mismatches.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(first.into()),
        }
    }
}

impl Extend<RecipeMismatch> for MergeReport {
    fn extend<T: IntoIterator<Item = RecipeMismatch>>(&mut self, iter: T) {
        self.mismatches.extend(iter);
    }
}

impl From<Vec<RecipeMismatch>> for MergeReport {
    fn from(mismatches: Vec<RecipeMismatch>) -> Self {
        Self { mismatches }
    }
}
