//! Rendering passes.
//!
//! The frame driver issues passes in [`RenderingPass::ALL`] order; within a
//! pass, figures draw in group order and surfaces in their figure's render
//! order.

use smallvec::SmallVec;

/// Rendering pass enumeration.
///
/// | Pass | Purpose |
/// |------|---------|
/// | `DepthPrepass` | Depth of every opaque surface |
/// | `Opaque` | Shaded opaque surfaces |
/// | `Transparent` | Alpha-blended surfaces, in render order |
/// | `PostEffect` | Screen-space resolve for surfaces with precomputed scattering |
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[repr(u8)]
pub enum RenderingPass {
    DepthPrepass = 0,
    Opaque = 1,
    Transparent = 2,
    PostEffect = 3,
}

/// Surfaces at or below this opacity are not drawn at all.
pub const HIDDEN_OPACITY: f32 = 0.0;

impl RenderingPass {
    pub const ALL: [Self; 4] = [
        Self::DepthPrepass,
        Self::Opaque,
        Self::Transparent,
        Self::PostEffect,
    ];

    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DepthPrepass => "DepthPrepass",
            Self::Opaque => "Opaque",
            Self::Transparent => "Transparent",
            Self::PostEffect => "PostEffect",
        }
    }

    /// Passes a surface with the given opacity draws in.
    #[must_use]
    pub fn for_surface(opacity: f32, precompute_scattering: bool) -> SmallVec<[Self; 3]> {
        let mut passes = SmallVec::new();
        if opacity <= HIDDEN_OPACITY {
            return passes;
        }
        if opacity < 1.0 {
            passes.push(Self::Transparent);
            return passes;
        }
        passes.push(Self::DepthPrepass);
        passes.push(Self::Opaque);
        if precompute_scattering {
            passes.push(Self::PostEffect);
        }
        passes
    }
}

impl std::fmt::Display for RenderingPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
