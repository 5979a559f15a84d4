//! CPU deformation of one figure.
//!
//! Evaluation order per frame:
//!
//! 1. rest positions
//! 2. morph targets, each weighted by its channel clamped to the channel's range
//! 3. follow bindings: the parent vertex's displacement from rest
//! 4. normals, recomputed when anything moved

use std::sync::Arc;

use glam::Vec3;

use figura_assets::{FigureDefinition, compute_vertex_normals};
use figura_core::{ChannelInputs, ControlVertex, FiguraError, Result};

/// What an attached figure sees of its parent in the current frame.
#[derive(Debug, Clone)]
pub struct ParentLink {
    pub definition: Arc<FigureDefinition>,
    /// The parent's deformed vertices from this frame.
    pub deformed: Arc<[ControlVertex]>,
    /// The channel inputs the parent was deformed with this frame.
    pub outputs: ChannelInputs,
}

/// Deforms `definition` for `inputs`, following `parent` when given.
pub fn deform(
    definition: &FigureDefinition,
    inputs: &ChannelInputs,
    parent: Option<&ParentLink>,
) -> Result<Vec<ControlVertex>> {
    let schema = definition.schema();
    let mut positions: Vec<Vec3> = definition
        .rest_vertices()
        .iter()
        .map(ControlVertex::position)
        .collect();
    let mut moved = false;

    for morph in definition.morphs() {
        let weight = schema.clamp(&morph.channel, inputs.get(&morph.channel));
        if !weight.is_finite() {
            return Err(FiguraError::deformation(
                definition.name(),
                format!("channel '{}' evaluated to {weight}", morph.channel),
            ));
        }
        if weight == 0.0 {
            continue;
        }
        let weight = weight as f32;
        for delta in &morph.deltas {
            positions[delta.vertex as usize] += Vec3::from_array(delta.offset) * weight;
        }
        moved = true;
    }

    if let Some(parent) = parent
        && !definition.follow().is_empty()
    {
        let parent_rest = parent.definition.rest_vertices();
        if parent.deformed.len() != parent_rest.len() {
            return Err(FiguraError::deformation(
                definition.name(),
                format!(
                    "parent '{}' supplied {} deformed vertices for {} rest vertices",
                    parent.definition.name(),
                    parent.deformed.len(),
                    parent_rest.len()
                ),
            ));
        }
        for binding in definition.follow() {
            let index = binding.parent_vertex as usize;
            let offset = parent.deformed[index].position() - parent_rest[index].position();
            positions[binding.vertex as usize] += offset;
            moved |= offset != Vec3::ZERO;
        }
    }

    if !moved {
        return Ok(definition.rest_vertices().to_vec());
    }

    let normals = compute_vertex_normals(&positions, definition.faces());
    Ok(positions
        .into_iter()
        .zip(normals)
        .map(|(position, normal)| ControlVertex::new(position, normal))
        .collect())
}
