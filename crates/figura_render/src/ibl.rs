use glam::Vec3;

/// Image-based lighting supplied by the host for the current frame.
///
/// Only the scalar controls reach figure constants; the environment maps
/// themselves are bound by the host renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct IblEnvironment {
    pub name: String,
    pub intensity: f32,
    /// Rotation about the up axis, in radians.
    pub rotation: f32,
    pub tint: Vec3,
}

impl Default for IblEnvironment {
    fn default() -> Self {
        Self {
            name: "Studio".to_string(),
            intensity: 1.0,
            rotation: 0.0,
            tint: Vec3::ONE,
        }
    }
}

impl IblEnvironment {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
