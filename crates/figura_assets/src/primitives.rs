//! Procedural figures and animations.
//!
//! A small, self-consistent content set built from latitude bands of a UV
//! sphere: a body, conforming clothing and hair whose follow bindings line up
//! with the body's vertices, plus a couple of animation tracks and catalogs.
//! Used by tests and the headless demo in place of imported content.

use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::ops::RangeInclusive;

use glam::Vec3;

use figura_animation::{
    AnimationTrack, BreathingController, ChannelCurve, InterpolationMode, KeyframeTrack,
    MotionFollowController,
};
use figura_core::ChannelDef;

use crate::catalog::{Character, Outfit};
use crate::definition::{
    DEFAULT_SHAPE, FigureDesc, FollowBinding, MaterialSet, MorphDelta, MorphTarget, Surface,
    SurfaceProperties,
};
use crate::recipe::FigureRecipe;
use crate::source::MemoryAssetSource;

pub const MAIN_FIGURE: &str = "genesis-3-female";
pub const HAIR_FIGURE: &str = "liv-hair";

pub struct SphereOptions {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 12,
            height_segments: 8,
        }
    }
}

/// A band of latitude rows cut from a UV sphere.
struct SphereBand {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    faces: Vec<[u32; 3]>,
    /// Index each band vertex has in the full sphere of the same segmentation.
    sphere_indices: Vec<u32>,
}

fn sphere_band(options: &SphereOptions, rows: RangeInclusive<u32>) -> SphereBand {
    let radius = options.radius;
    let width_segments = options.width_segments.max(3);
    let height_segments = options.height_segments.max(2);
    let first_row = *rows.start();
    let last_row = (*rows.end()).min(height_segments);
    let stride = width_segments + 1;

    let mut band = SphereBand {
        positions: Vec::new(),
        normals: Vec::new(),
        faces: Vec::new(),
        sphere_indices: Vec::new(),
    };

    for y in first_row..=last_row {
        let v_ratio = y as f32 / height_segments as f32;
        // Latitude angle: from 0 (south pole) to PI (north pole)
        let theta = v_ratio * PI;
        let py = -radius * theta.cos();
        let ring_radius = radius * theta.sin();

        for x in 0..=width_segments {
            let u_ratio = x as f32 / width_segments as f32;
            let phi = u_ratio * 2.0 * PI;
            let position = Vec3::new(-ring_radius * phi.cos(), py, ring_radius * phi.sin());

            band.positions.push(position.to_array());
            band.normals.push((position / radius).to_array());
            band.sphere_indices.push(y * stride + x);
        }
    }

    // Each grid cell is two triangles; pole cells degenerate and are harmless
    for y in 0..(last_row - first_row) {
        for x in 0..width_segments {
            let v0 = y * stride + x;
            let v1 = v0 + 1;
            let v2 = (y + 1) * stride + x;
            let v3 = v2 + 1;
            band.faces.push([v0, v1, v2]);
            band.faces.push([v1, v3, v2]);
        }
    }
    band
}

fn morph_where(
    channel: &str,
    positions: &[[f32; 3]],
    offset: impl Fn(Vec3) -> Option<Vec3>,
) -> MorphTarget {
    let deltas = positions
        .iter()
        .enumerate()
        .filter_map(|(vertex, &p)| {
            offset(Vec3::from_array(p)).map(|o| MorphDelta {
                vertex: vertex as u32,
                offset: o.to_array(),
            })
        })
        .collect();
    MorphTarget {
        channel: channel.to_string(),
        deltas,
    }
}

fn belly_morph(positions: &[[f32; 3]]) -> MorphTarget {
    morph_where("belly", positions, |p| {
        (p.y < -0.1 && p.z > 0.0).then(|| p.normalize_or_zero() * 0.2)
    })
}

fn shapes(entries: &[(&str, &[(&str, f64)])]) -> BTreeMap<String, BTreeMap<String, f64>> {
    entries
        .iter()
        .map(|(shape, values)| {
            let values = values
                .iter()
                .map(|(channel, value)| ((*channel).to_string(), *value))
                .collect();
            ((*shape).to_string(), values)
        })
        .collect()
}

fn material_sets(entries: &[(&str, Option<Vec<f32>>)]) -> BTreeMap<String, MaterialSet> {
    entries
        .iter()
        .map(|(name, opacities)| {
            (
                (*name).to_string(),
                MaterialSet {
                    opacities: opacities.clone(),
                },
            )
        })
        .collect()
}

// ============================================================================
// Figures
// ============================================================================

/// The main body: a full sphere with three surfaces.
///
/// The last row of faces is a semi-transparent "Eyelashes" surface; the
/// figure precomputes scattering, so its opaque surfaces also draw in the
/// post-effect pass.
#[must_use]
pub fn body_desc(name: &str) -> FigureDesc {
    let options = SphereOptions::default();
    let band = sphere_band(&options, 0..=options.height_segments);
    let face_count = band.faces.len() as u32;
    let lash_faces = options.width_segments * 2;
    let torso_faces = face_count / 2;

    let morphs = vec![
        morph_where(BreathingController::CHANNEL, &band.positions, |p| {
            (p.y > 0.2).then(|| p.normalize_or_zero() * 0.03)
        }),
        morph_where(MotionFollowController::CHANNEL, &band.positions, |p| {
            (p.y > 0.5).then_some(Vec3::new(0.1, 0.0, 0.0))
        }),
        belly_morph(&band.positions),
        morph_where("arm-raise", &band.positions, |p| {
            (p.x.abs() > 0.7).then_some(Vec3::new(0.0, 0.3, 0.0))
        }),
    ];

    FigureDesc {
        name: name.to_string(),
        conforms_to: None,
        bones: ["hip", "abdomen", "chest", "neck", "head", "l-shoulder", "r-shoulder"]
            .map(String::from)
            .to_vec(),
        attachment_points: Vec::new(),
        channels: vec![
            ChannelDef::new(BreathingController::CHANNEL, 0.0).with_range(0.0, 1.0),
            ChannelDef::new(MotionFollowController::CHANNEL, 0.0).with_range(0.0, 1.0),
            ChannelDef::new("belly", 0.0).with_range(-1.0, 1.0),
            ChannelDef::new("arm-raise", 0.0).with_range(0.0, 1.0),
        ],
        positions: band.positions,
        normals: band.normals,
        faces: band.faces,
        morphs,
        follow: Vec::new(),
        surfaces: vec![
            Surface {
                name: "Torso".into(),
                shader: "skin".into(),
                first_face: 0,
                face_count: torso_faces,
            },
            Surface {
                name: "Head".into(),
                shader: "skin".into(),
                first_face: torso_faces,
                face_count: face_count - torso_faces - lash_faces,
            },
            Surface {
                name: "Eyelashes".into(),
                shader: "hair".into(),
                first_face: face_count - lash_faces,
                face_count: lash_faces,
            },
        ],
        shapes: shapes(&[
            (DEFAULT_SHAPE, &[]),
            ("Eva", &[("belly", 0.3)]),
            ("Mei Lin", &[("belly", -0.2)]),
            ("Rune", &[("belly", 0.6)]),
        ]),
        material_sets: material_sets(&[
            ("Base", None),
            ("Eva", Some(vec![1.0, 1.0, 0.6])),
            ("Mei Lin", None),
            ("Rune", Some(vec![1.0, 1.0, 0.8])),
        ]),
        surface_properties: SurfaceProperties {
            subdivision_level: 1,
            render_order: vec![0, 1, 2],
            opacities: vec![1.0, 1.0, 0.5],
            precompute_scattering: true,
            material_set_for_opacities: Some("Base".into()),
        },
        default_material_set: Some("Base".into()),
    }
}

/// A shirt covering the lower half of `parent`'s body.
///
/// Shares the `belly` channel with the body and carries its own conforming
/// morph for it; the collar row follows the body's vertices directly.
#[must_use]
pub fn shirt_desc(name: &str, parent: &str) -> FigureDesc {
    let options = SphereOptions {
        radius: 1.05,
        ..SphereOptions::default()
    };
    let collar_row = options.height_segments / 2;
    let band = sphere_band(&options, 0..=collar_row);
    let collar_start = (collar_row * (options.width_segments + 1)) as usize;
    let follow = band
        .sphere_indices
        .iter()
        .enumerate()
        .skip(collar_start)
        .map(|(vertex, &parent_vertex)| FollowBinding {
            vertex: vertex as u32,
            parent_vertex,
        })
        .collect();

    FigureDesc {
        name: name.to_string(),
        conforms_to: Some(parent.to_string()),
        attachment_points: vec!["hip".into(), "chest".into()],
        channels: vec![ChannelDef::new("belly", 0.0).with_range(-1.0, 1.0)],
        morphs: vec![belly_morph(&band.positions)],
        follow,
        surfaces: vec![Surface {
            name: "Shirt".into(),
            shader: "cloth".into(),
            first_face: 0,
            face_count: band.faces.len() as u32,
        }],
        positions: band.positions,
        normals: band.normals,
        faces: band.faces,
        material_sets: material_sets(&[("Red", None), ("Sheer", Some(vec![0.7]))]),
        default_material_set: Some("Red".into()),
        ..FigureDesc::default()
    }
}

/// A short skirt band around the hips; follows the body everywhere.
#[must_use]
pub fn skirt_desc(name: &str, parent: &str) -> FigureDesc {
    let options = SphereOptions {
        radius: 1.08,
        ..SphereOptions::default()
    };
    let band = sphere_band(&options, 1..=3);
    let follow = band
        .sphere_indices
        .iter()
        .enumerate()
        .map(|(vertex, &parent_vertex)| FollowBinding {
            vertex: vertex as u32,
            parent_vertex,
        })
        .collect();

    FigureDesc {
        name: name.to_string(),
        conforms_to: Some(parent.to_string()),
        attachment_points: vec!["hip".into()],
        follow,
        surfaces: vec![Surface {
            name: "Skirt".into(),
            shader: "cloth".into(),
            first_face: 0,
            face_count: band.faces.len() as u32,
        }],
        positions: band.positions,
        normals: band.normals,
        faces: band.faces,
        material_sets: material_sets(&[("Denim", None)]),
        ..FigureDesc::default()
    }
}

/// A hair cap over the top rows of the body, driven by the body's
/// `follow-sway` channel and following its head vertices.
#[must_use]
pub fn hair_desc(name: &str, parent: &str) -> FigureDesc {
    let options = SphereOptions {
        radius: 1.1,
        ..SphereOptions::default()
    };
    let band = sphere_band(&options, (options.height_segments - 2)..=options.height_segments);
    let follow = band
        .sphere_indices
        .iter()
        .enumerate()
        .map(|(vertex, &parent_vertex)| FollowBinding {
            vertex: vertex as u32,
            parent_vertex,
        })
        .collect();
    let sway = morph_where(MotionFollowController::CHANNEL, &band.positions, |_| {
        Some(Vec3::new(0.15, 0.0, 0.0))
    });

    FigureDesc {
        name: name.to_string(),
        conforms_to: Some(parent.to_string()),
        attachment_points: vec!["head".into()],
        channels: vec![
            ChannelDef::new(MotionFollowController::CHANNEL, 0.0).with_range(0.0, 1.0),
            ChannelDef::new("curl", 0.0).with_range(0.0, 1.0),
        ],
        morphs: vec![sway],
        follow,
        surfaces: vec![Surface {
            name: "Hair".into(),
            shader: "hair".into(),
            first_face: 0,
            face_count: band.faces.len() as u32,
        }],
        positions: band.positions,
        normals: band.normals,
        faces: band.faces,
        shapes: shapes(&[(DEFAULT_SHAPE, &[]), ("Curly", &[("curl", 1.0)])]),
        material_sets: material_sets(&[("Black", None), ("Blonde", None)]),
        surface_properties: SurfaceProperties {
            opacities: vec![0.9],
            ..SurfaceProperties::default()
        },
        default_material_set: Some("Black".into()),
        ..FigureDesc::default()
    }
}

/// A figure that conforms to `parent` but needs a bone the body lacks.
#[must_use]
pub fn tail_desc(name: &str, parent: &str) -> FigureDesc {
    let mut desc = skirt_desc(name, parent);
    desc.attachment_points = vec!["tailbone".into()];
    desc
}

// ============================================================================
// Animations & Catalogs
// ============================================================================

fn single_curve_track(name: &str, channel: &str, times: Vec<f32>, values: Vec<f64>) -> AnimationTrack {
    AnimationTrack::new(
        name,
        vec![ChannelCurve {
            channel: channel.to_string(),
            track: KeyframeTrack::new(times, values, InterpolationMode::Linear),
        }],
    )
}

#[must_use]
pub fn idle_animation() -> AnimationTrack {
    single_curve_track("idle", "arm-raise", vec![0.0, 2.0, 4.0], vec![0.0, 0.1, 0.0])
}

#[must_use]
pub fn wave_animation() -> AnimationTrack {
    single_curve_track("wave", "arm-raise", vec![0.0, 0.5, 1.0], vec![0.0, 1.0, 0.0])
}

#[must_use]
pub fn characters() -> Vec<Character> {
    ["Eva", "Mei Lin", "Rune"]
        .into_iter()
        .map(|name| Character {
            name: name.to_string(),
            shape: name.to_string(),
            material_set: name.to_string(),
        })
        .collect()
}

#[must_use]
pub fn outfits() -> Vec<Outfit> {
    vec![
        Outfit {
            name: "Nude".into(),
            items: Vec::new(),
        },
        Outfit {
            name: "Casual".into(),
            items: vec![
                FigureRecipe::named("shirt").with_material_set("Red"),
                FigureRecipe::named("skirt"),
            ],
        },
    ]
}

/// In-memory source holding the whole procedural content set.
#[must_use]
pub fn demo_source() -> MemoryAssetSource {
    let mut source = MemoryAssetSource::new()
        .with_figure(body_desc(MAIN_FIGURE))
        .with_figure(hair_desc(HAIR_FIGURE, MAIN_FIGURE))
        .with_figure(shirt_desc("shirt", MAIN_FIGURE))
        .with_figure(skirt_desc("skirt", MAIN_FIGURE))
        .with_figure(tail_desc("tail", MAIN_FIGURE))
        .with_animation(idle_animation())
        .with_animation(wave_animation());
    for character in characters() {
        source = source.with_character(character);
    }
    for outfit in outfits() {
        source = source.with_outfit(outfit);
    }
    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FigureDefinition;

    #[test]
    fn procedural_figures_validate() {
        let body = FigureDefinition::new(body_desc(MAIN_FIGURE)).unwrap();
        for desc in [
            shirt_desc("shirt", MAIN_FIGURE),
            skirt_desc("skirt", MAIN_FIGURE),
            hair_desc(HAIR_FIGURE, MAIN_FIGURE),
        ] {
            let child = FigureDefinition::new(desc).unwrap();
            child.check_attachment(Some(&body)).unwrap();
        }
        let tail = FigureDefinition::new(tail_desc("tail", MAIN_FIGURE)).unwrap();
        assert!(tail.check_attachment(Some(&body)).is_err());
    }

    #[test]
    fn follow_bindings_line_up_with_body() {
        let body = FigureDefinition::new(body_desc(MAIN_FIGURE)).unwrap();
        let skirt = FigureDefinition::new(skirt_desc("skirt", MAIN_FIGURE)).unwrap();
        for binding in skirt.follow() {
            let child = skirt.rest_vertices()[binding.vertex as usize].position();
            let parent = body.rest_vertices()[binding.parent_vertex as usize].position();
            // Same direction from the centre, larger radius
            assert!(child.normalize_or_zero().dot(parent.normalize_or_zero()) > 0.999);
        }
    }

    #[test]
    fn body_surfaces_cover_all_faces() {
        let body = FigureDefinition::new(body_desc(MAIN_FIGURE)).unwrap();
        let covered: u32 = body.surfaces().iter().map(|s| s.face_count).sum();
        assert_eq!(covered as usize, body.faces().len());
    }
}
