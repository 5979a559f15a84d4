//! Error Types
//!
//! This module defines the error types used throughout Figura.
//!
//! # Overview
//!
//! [`FiguraError`] covers every failure mode of the deformation and
//! composition pipeline:
//! - Load-time failures (missing or malformed assets, incompatible rigs, missing shaders)
//! - Per-frame failures (deformation, GPU resource access)
//! - Recipe merge mismatches (reported, never fatal)
//!
//! Load-time errors surface synchronously to the caller of a load or swap.
//! Per-frame errors abandon the frame and surface to the frame driver, which
//! decides whether to retry next frame or halt.
//!
//! # Usage
//!
//! ```rust,ignore
//! use figura_core::errors::{FiguraError, Result};
//!
//! fn resolve(name: &str) -> Result<()> {
//!     Err(FiguraError::AssetNotFound(name.to_string()))
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// The main error type for Figura.
#[derive(Error, Debug)]
pub enum FiguraError {
    // ========================================================================
    // Load-time Errors
    // ========================================================================
    /// A figure, animation or material asset could not be resolved.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// A child figure cannot be attached to the requested parent.
    #[error("Incompatible rig: '{figure}' cannot attach to '{parent}': {reason}")]
    IncompatibleRig {
        /// Figure being loaded
        figure: String,
        /// Parent it was supposed to attach to (empty when no parent was given)
        parent: String,
        /// Which compatibility rule failed
        reason: String,
    },

    /// An asset was found but its contents are inconsistent.
    #[error("Invalid asset '{asset}': {reason}")]
    InvalidAsset {
        /// Asset that failed validation
        asset: String,
        /// Which rule it broke
        reason: String,
    },

    /// A surface needs a shader that the shader cache does not hold.
    #[error("Shader not available in cache: {0}")]
    ShaderUnavailable(String),

    // ========================================================================
    // Per-frame Errors
    // ========================================================================
    /// Deformation evaluation failed mid-frame.
    #[error("Deformation failure on '{figure}': {reason}")]
    DeformationFailure {
        /// Figure whose evaluation failed
        figure: String,
        /// What went wrong
        reason: String,
    },

    /// A GPU resource operation was rejected by the device.
    #[error("GPU resource error: {0}")]
    Gpu(String),

    /// A facade was used after it released its GPU resources.
    #[error("Figure facade '{0}' has already been disposed")]
    FacadeDisposed(String),

    /// A figure key no longer refers to a live facade.
    #[error("Unknown figure in group: {0}")]
    UnknownFigure(String),

    // ========================================================================
    // Recipe Errors
    // ========================================================================
    /// A recipe references something the live state no longer has.
    ///
    /// Merges never fail with this variant; mismatches are collected in a
    /// merge report and can be converted here for logging or inspection.
    #[error("Recipe mismatch: {0}")]
    RecipeMergeMismatch(RecipeMismatch),

    // ========================================================================
    // I/O & Format Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FiguraError {
    pub fn deformation(figure: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeformationFailure {
            figure: figure.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_asset(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAsset {
            asset: asset.into(),
            reason: reason.into(),
        }
    }

    pub fn incompatible_rig(
        figure: impl Into<String>,
        parent: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IncompatibleRig {
            figure: figure.into(),
            parent: parent.into(),
            reason: reason.into(),
        }
    }
}

/// What kind of reference a recipe carried that could not be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchKind {
    Figure,
    Shape,
    MaterialSet,
    Animation,
    Channel,
    Controller,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Figure => "figure",
            Self::Shape => "shape",
            Self::MaterialSet => "material set",
            Self::Animation => "animation",
            Self::Channel => "channel",
            Self::Controller => "controller",
        };
        f.write_str(label)
    }
}

/// One ignored reference found while merging a recipe onto live state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeMismatch {
    pub kind: MismatchKind,
    pub name: String,
}

impl RecipeMismatch {
    pub fn new(kind: MismatchKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for RecipeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.name)
    }
}

impl From<RecipeMismatch> for FiguraError {
    fn from(mismatch: RecipeMismatch) -> Self {
        FiguraError::RecipeMergeMismatch(mismatch)
    }
}

/// Alias for `Result<T, FiguraError>`.
pub type Result<T> = std::result::Result<T, FiguraError>;
