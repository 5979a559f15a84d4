//! Figure definitions.
//!
//! A [`FigureDefinition`] is the immutable description of one figure: rest
//! geometry, topology, rig, channel schema, morph targets, surfaces, shapes
//! and material sets. It is deserialized from a [`FigureDesc`], validated once,
//! and shared as `Arc<FigureDefinition>` by every facade that instantiates it.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use figura_core::{
    ChannelDef, ChannelInputs, ChannelSchema, ControlVertex, FiguraError, Result, TopologyId,
};

/// Name of the shape every figure starts in.
pub const DEFAULT_SHAPE: &str = "Base";

// ============================================================================
// Serialized Form
// ============================================================================

/// Offset applied to one vertex at full channel weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphDelta {
    pub vertex: u32,
    pub offset: [f32; 3],
}

/// Sparse vertex offsets driven by one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphTarget {
    pub channel: String,
    #[serde(default)]
    pub deltas: Vec<MorphDelta>,
}

/// Binds a vertex of an attached figure to a vertex of its parent.
///
/// Each frame the bound vertex is moved by the parent vertex's displacement
/// from its rest position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FollowBinding {
    pub vertex: u32,
    pub parent_vertex: u32,
}

/// A contiguous face range drawn with one shader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Surface {
    pub name: String,
    pub shader: String,
    pub first_face: u32,
    pub face_count: u32,
}

/// A named material variant. Only opacity is meaningful to composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialSet {
    /// Per-surface opacity; `None` falls back to the figure's surface properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacities: Option<Vec<f32>>,
}

/// Rendering properties baked for a figure at import time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SurfaceProperties {
    #[serde(default)]
    pub subdivision_level: u32,
    /// Surface indices in draw order. Surfaces not listed draw afterwards in index order.
    #[serde(default)]
    pub render_order: Vec<u32>,
    /// Per-surface opacity used when the material set defines none.
    #[serde(default)]
    pub opacities: Vec<f32>,
    #[serde(default)]
    pub precompute_scattering: bool,
    /// Material set the baked `opacities` were taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_set_for_opacities: Option<String>,
}

/// Serialized figure definition, as stored by an asset source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FigureDesc {
    pub name: String,
    /// Parent figure this figure is rigged against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conforms_to: Option<String>,
    #[serde(default)]
    pub bones: Vec<String>,
    /// Parent bones this figure attaches to; all must exist on the parent.
    #[serde(default)]
    pub attachment_points: Vec<String>,
    #[serde(default)]
    pub channels: Vec<ChannelDef>,
    pub positions: Vec<[f32; 3]>,
    /// Rest normals; computed from the faces when empty.
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    #[serde(default)]
    pub morphs: Vec<MorphTarget>,
    #[serde(default)]
    pub follow: Vec<FollowBinding>,
    pub surfaces: Vec<Surface>,
    #[serde(default)]
    pub shapes: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub material_sets: BTreeMap<String, MaterialSet>,
    #[serde(default)]
    pub surface_properties: SurfaceProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_material_set: Option<String>,
}

// ============================================================================
// Figure Definition
// ============================================================================

/// Validated, immutable figure definition.
#[derive(Debug)]
pub struct FigureDefinition {
    name: String,
    conforms_to: Option<String>,
    bones: Vec<String>,
    attachment_points: Vec<String>,
    schema: Arc<ChannelSchema>,
    rest: Vec<ControlVertex>,
    faces: Vec<[u32; 3]>,
    morphs: Vec<MorphTarget>,
    follow: Vec<FollowBinding>,
    surfaces: Vec<Surface>,
    shapes: BTreeMap<String, BTreeMap<String, f64>>,
    material_sets: BTreeMap<String, MaterialSet>,
    surface_properties: SurfaceProperties,
    default_material_set: Option<String>,
    topology: TopologyId,
}

impl TryFrom<FigureDesc> for FigureDefinition {
    type Error = FiguraError;

    fn try_from(desc: FigureDesc) -> Result<Self> {
        Self::new(desc)
    }
}

impl FigureDefinition {
    /// Validates `desc` and derives the channel schema, rest normals and topology.
    pub fn new(desc: FigureDesc) -> Result<Self> {
        let invalid = |reason: String| FiguraError::invalid_asset(desc.name.clone(), reason);
        let vertex_count = desc.positions.len();

        if let Some(face) = desc
            .faces
            .iter()
            .find(|face| face.iter().any(|&i| i as usize >= vertex_count))
        {
            return Err(invalid(format!(
                "face {face:?} references a vertex outside 0..{vertex_count}"
            )));
        }
        if !desc.normals.is_empty() && desc.normals.len() != vertex_count {
            return Err(invalid(format!(
                "{} normals for {vertex_count} positions",
                desc.normals.len()
            )));
        }

        let schema = Arc::new(ChannelSchema::new(desc.channels));

        for morph in &desc.morphs {
            if !schema.contains(&morph.channel) {
                return Err(invalid(format!(
                    "morph drives undeclared channel '{}'",
                    morph.channel
                )));
            }
            if let Some(delta) = morph.deltas.iter().find(|d| d.vertex as usize >= vertex_count) {
                return Err(invalid(format!(
                    "morph '{}' offsets vertex {} outside 0..{vertex_count}",
                    morph.channel, delta.vertex
                )));
            }
        }
        if let Some(binding) = desc.follow.iter().find(|b| b.vertex as usize >= vertex_count) {
            return Err(invalid(format!(
                "follow binding for vertex {} outside 0..{vertex_count}",
                binding.vertex
            )));
        }

        let face_count = desc.faces.len() as u64;
        for surface in &desc.surfaces {
            if u64::from(surface.first_face) + u64::from(surface.face_count) > face_count {
                return Err(invalid(format!(
                    "surface '{}' covers faces past the end of the mesh",
                    surface.name
                )));
            }
        }

        let surface_count = desc.surfaces.len();
        if let Some(index) = desc
            .surface_properties
            .render_order
            .iter()
            .find(|&&i| i as usize >= surface_count)
        {
            return Err(invalid(format!("render order names unknown surface {index}")));
        }
        for (set_name, set) in &desc.material_sets {
            if let Some(opacities) = &set.opacities
                && opacities.len() != surface_count
            {
                return Err(invalid(format!(
                    "material set '{set_name}' has {} opacities for {surface_count} surfaces",
                    opacities.len()
                )));
            }
        }

        let mut shapes = desc.shapes;
        for (shape_name, values) in &mut shapes {
            values.retain(|channel, _| {
                let known = schema.contains(channel);
                if !known {
                    log::warn!(
                        "Shape '{shape_name}' of '{}' sets unknown channel '{channel}'; ignored",
                        desc.name
                    );
                }
                known
            });
        }
        shapes.entry(DEFAULT_SHAPE.to_string()).or_default();

        let positions: Vec<Vec3> = desc.positions.iter().copied().map(Vec3::from_array).collect();
        let normals = if desc.normals.is_empty() {
            compute_vertex_normals(&positions, &desc.faces)
        } else {
            desc.normals.iter().copied().map(Vec3::from_array).collect()
        };
        let rest = positions
            .iter()
            .zip(&normals)
            .map(|(&position, &normal)| ControlVertex::new(position, normal))
            .collect();

        let default_material_set = desc
            .default_material_set
            .filter(|name| desc.material_sets.contains_key(name))
            .or_else(|| desc.surface_properties.material_set_for_opacities.clone())
            .filter(|name| desc.material_sets.contains_key(name))
            .or_else(|| desc.material_sets.keys().next().cloned());

        let topology = TopologyId::compute(vertex_count, &desc.faces);
        log::debug!(
            "Figure definition '{}' validated: {vertex_count} vertices, {} faces, {} channels, topology {:#x}",
            desc.name,
            desc.faces.len(),
            schema.len(),
            topology.0
        );

        Ok(Self {
            name: desc.name,
            conforms_to: desc.conforms_to,
            bones: desc.bones,
            attachment_points: desc.attachment_points,
            schema,
            rest,
            faces: desc.faces,
            morphs: desc.morphs,
            follow: desc.follow,
            surfaces: desc.surfaces,
            shapes,
            material_sets: desc.material_sets,
            surface_properties: desc.surface_properties,
            default_material_set,
            topology,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn conforms_to(&self) -> Option<&str> {
        self.conforms_to.as_deref()
    }

    #[must_use]
    pub fn bones(&self) -> &[String] {
        &self.bones
    }

    #[must_use]
    pub fn has_bone(&self, bone: &str) -> bool {
        self.bones.iter().any(|b| b == bone)
    }

    #[must_use]
    pub fn attachment_points(&self) -> &[String] {
        &self.attachment_points
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<ChannelSchema> {
        &self.schema
    }

    #[must_use]
    pub fn rest_vertices(&self) -> &[ControlVertex] {
        &self.rest
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.rest.len()
    }

    #[must_use]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    #[must_use]
    pub fn morphs(&self) -> &[MorphTarget] {
        &self.morphs
    }

    #[must_use]
    pub fn follow(&self) -> &[FollowBinding] {
        &self.follow
    }

    #[must_use]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    #[must_use]
    pub fn surface_properties(&self) -> &SurfaceProperties {
        &self.surface_properties
    }

    #[must_use]
    pub fn topology(&self) -> TopologyId {
        self.topology
    }

    // ========================================================================
    // Shapes & Material Sets
    // ========================================================================

    pub fn shape_names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_shape(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// Base channel inputs of a shape.
    #[must_use]
    pub fn shape_inputs(&self, name: &str) -> Option<ChannelInputs> {
        let values = self.shapes.get(name)?;
        Some(ChannelInputs::from_values(
            Arc::clone(&self.schema),
            values.iter().map(|(channel, value)| (channel, *value)),
        ))
    }

    pub fn material_set_names(&self) -> impl Iterator<Item = &str> {
        self.material_sets.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_material_set(&self, name: &str) -> bool {
        self.material_sets.contains_key(name)
    }

    #[must_use]
    pub fn default_material_set(&self) -> Option<&str> {
        self.default_material_set.as_deref()
    }

    /// Effective opacity of every surface under `material_set`.
    ///
    /// Lookup order: the material set's opacities, then the baked surface
    /// properties, then fully opaque.
    #[must_use]
    pub fn surface_opacities(&self, material_set: Option<&str>) -> Vec<f32> {
        if let Some(opacities) = material_set
            .and_then(|name| self.material_sets.get(name))
            .and_then(|set| set.opacities.as_ref())
        {
            return opacities.clone();
        }
        let baked = &self.surface_properties.opacities;
        (0..self.surfaces.len())
            .map(|i| baked.get(i).copied().unwrap_or(1.0))
            .collect()
    }

    /// Surface indices in draw order.
    #[must_use]
    pub fn surface_draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = Vec::with_capacity(self.surfaces.len());
        for &index in &self.surface_properties.render_order {
            let index = index as usize;
            if !order.contains(&index) {
                order.push(index);
            }
        }
        for index in 0..self.surfaces.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }
        order
    }

    // ========================================================================
    // Rig Compatibility
    // ========================================================================

    /// Checks that this figure can be attached to `parent` (or loaded standalone).
    ///
    /// A conforming figure must name its parent exactly, find every attachment
    /// point among the parent's bones, and bind only to existing parent vertices.
    pub fn check_attachment(&self, parent: Option<&FigureDefinition>) -> Result<()> {
        let parent_name = parent.map_or("", FigureDefinition::name);
        let incompatible = |reason: String| {
            FiguraError::incompatible_rig(self.name.clone(), parent_name, reason)
        };

        let Some(parent) = parent else {
            return match &self.conforms_to {
                Some(expected) => Err(incompatible(format!(
                    "conforms to '{expected}' but was loaded without a parent"
                ))),
                None => Ok(()),
            };
        };

        match &self.conforms_to {
            Some(expected) if expected == parent.name() => {}
            Some(expected) => {
                return Err(incompatible(format!("conforms to '{expected}'")));
            }
            None => {
                return Err(incompatible("figure is not rigged for attachment".to_string()));
            }
        }

        if let Some(missing) = self
            .attachment_points
            .iter()
            .find(|point| !parent.has_bone(point))
        {
            return Err(incompatible(format!("parent has no bone '{missing}'")));
        }

        let parent_vertices = parent.vertex_count();
        if let Some(binding) = self
            .follow
            .iter()
            .find(|b| b.parent_vertex as usize >= parent_vertices)
        {
            return Err(incompatible(format!(
                "follow binding targets parent vertex {} outside 0..{parent_vertices}",
                binding.parent_vertex
            )));
        }
        Ok(())
    }
}

/// Area-weighted vertex normals.
#[must_use]
pub fn compute_vertex_normals(positions: &[Vec3], faces: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for face in faces {
        let [i0, i1, i2] = face.map(|i| i as usize);
        let (Some(&v0), Some(&v1), Some(&v2)) =
            (positions.get(i0), positions.get(i1), positions.get(i2))
        else {
            continue;
        };
        // Cross product length is twice the triangle area
        let face_normal = (v1 - v0).cross(v2 - v0);
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }
    for normal in &mut normals {
        *normal = normal.normalize_or_zero();
    }
    normals
}
