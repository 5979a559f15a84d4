//! Per-figure GPU resources.
//!
//! A [`FigureRenderer`] owns the three buffers of one live figure:
//!
//! - vertex buffer: deformed control vertices, rewritten every frame and read
//!   back after the frame for feedback
//! - index buffer: the definition's faces, written once
//! - constants buffer: [`FigureConstants`], rewritten every frame

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;
use wgpu::BufferUsages;

use figura_assets::FigureDefinition;
use figura_core::{ControlVertex, FiguraError, FrameUpdateParameters, Result};

use crate::device::{BufferDesc, BufferId, DrawCall, RenderDevice};
use crate::ibl::IblEnvironment;
use crate::pass::RenderingPass;
use crate::shader::{ShaderCache, ShaderHandle, ShaderKey};

/// Per-frame uniform data of one figure.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FigureConstants {
    /// IBL tint in `xyz`, intensity in `w`.
    pub ibl_tint_intensity: [f32; 4],
    pub ibl_rotation: f32,
    pub time: f32,
    pub subdivision_level: u32,
    pub vertex_count: u32,
    pub frame_lo: u32,
    pub frame_hi: u32,
    pub _padding: [u32; 2],
}

impl FigureConstants {
    #[must_use]
    pub fn new(
        params: &FrameUpdateParameters,
        ibl: &IblEnvironment,
        subdivision_level: u32,
        vertex_count: usize,
    ) -> Self {
        Self {
            ibl_tint_intensity: ibl.tint.extend(ibl.intensity).to_array(),
            ibl_rotation: ibl.rotation,
            time: params.time as f32,
            subdivision_level,
            vertex_count: vertex_count as u32,
            frame_lo: params.frame as u32,
            frame_hi: (params.frame >> 32) as u32,
            _padding: [0; 2],
        }
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        u64::from(self.frame_lo) | (u64::from(self.frame_hi) << 32)
    }
}

#[derive(Debug, Clone)]
struct SurfaceDraw {
    name: Arc<str>,
    shader: ShaderHandle,
    first_index: u32,
    index_count: u32,
    passes: SmallVec<[RenderingPass; 3]>,
}

/// GPU resources and draw list of one figure.
#[derive(Debug)]
pub struct FigureRenderer {
    figure: Arc<str>,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    constants_buffer: BufferId,
    vertex_count: usize,
    subdivision_level: u32,
    surfaces: Vec<SurfaceDraw>,
    draw_order: Vec<usize>,
}

impl FigureRenderer {
    /// Shader key of every surface of `definition`.
    #[must_use]
    pub fn surface_shader_keys(definition: &FigureDefinition) -> Vec<ShaderKey> {
        let properties = definition.surface_properties();
        definition
            .surfaces()
            .iter()
            .map(|surface| {
                let mut key = ShaderKey::new(surface.shader.as_str());
                if properties.subdivision_level > 0 {
                    key = key.with_define("SUBDIVISION");
                }
                if properties.precompute_scattering {
                    key = key.with_define("PRECOMPUTED_SCATTERING");
                }
                key
            })
            .collect()
    }

    /// Resolves shaders, then allocates and fills the figure's buffers.
    ///
    /// Shaders are resolved before anything is allocated, so a missing shader
    /// leaves the device untouched. A failed allocation releases whatever was
    /// already created.
    pub fn new(
        device: &mut dyn RenderDevice,
        shaders: &dyn ShaderCache,
        definition: &FigureDefinition,
        material_set: Option<&str>,
    ) -> Result<Self> {
        let figure: Arc<str> = Arc::from(definition.name());

        let mut surfaces = Vec::with_capacity(definition.surfaces().len());
        for (surface, key) in definition
            .surfaces()
            .iter()
            .zip(Self::surface_shader_keys(definition))
        {
            let shader = shaders.fetch(&key).ok_or_else(|| {
                FiguraError::ShaderUnavailable(format!("{key} (surface '{}' of '{figure}')", surface.name))
            })?;
            surfaces.push(SurfaceDraw {
                name: Arc::from(surface.name.as_str()),
                shader,
                first_index: surface.first_face * 3,
                index_count: surface.face_count * 3,
                passes: SmallVec::new(),
            });
        }

        let vertex_bytes = (definition.vertex_count() * size_of::<ControlVertex>()) as u64;
        let index_bytes = (definition.faces().len() * size_of::<[u32; 3]>()) as u64;
        let descs = [
            BufferDesc::new(
                format!("{figure}/vertices"),
                vertex_bytes,
                BufferUsages::VERTEX
                    | BufferUsages::STORAGE
                    | BufferUsages::COPY_DST
                    | BufferUsages::COPY_SRC,
            ),
            BufferDesc::new(
                format!("{figure}/indices"),
                index_bytes,
                BufferUsages::INDEX | BufferUsages::COPY_DST,
            ),
            BufferDesc::new(
                format!("{figure}/constants"),
                size_of::<FigureConstants>() as u64,
                BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            ),
        ];

        let mut created: SmallVec<[BufferId; 3]> = SmallVec::new();
        for desc in &descs {
            match device.create_buffer(desc) {
                Ok(id) => created.push(id),
                Err(err) => {
                    release_all(device, &created);
                    return Err(err);
                }
            }
        }
        let [vertex_buffer, index_buffer, constants_buffer] = [created[0], created[1], created[2]];

        let upload = device
            .write_buffer(index_buffer, 0, bytemuck::cast_slice(definition.faces()))
            .and_then(|()| {
                device.write_buffer(
                    vertex_buffer,
                    0,
                    bytemuck::cast_slice(definition.rest_vertices()),
                )
            });
        if let Err(err) = upload {
            release_all(device, &created);
            return Err(err);
        }

        let mut renderer = Self {
            figure,
            vertex_buffer,
            index_buffer,
            constants_buffer,
            vertex_count: definition.vertex_count(),
            subdivision_level: definition.surface_properties().subdivision_level,
            surfaces,
            draw_order: definition.surface_draw_order(),
        };
        renderer.assign_material_set(definition, material_set);

        log::debug!(
            "Allocated GPU resources for '{}' ({} vertices, {} surfaces)",
            renderer.figure,
            renderer.vertex_count,
            renderer.surfaces.len()
        );
        Ok(renderer)
    }

    /// Re-assigns surfaces to passes for the opacities of `material_set`.
    pub fn assign_material_set(&mut self, definition: &FigureDefinition, material_set: Option<&str>) {
        let opacities = definition.surface_opacities(material_set);
        let scattering = definition.surface_properties().precompute_scattering;
        for (surface, opacity) in self.surfaces.iter_mut().zip(opacities) {
            surface.passes = RenderingPass::for_surface(opacity, scattering);
        }
    }

    #[must_use]
    pub fn figure(&self) -> &str {
        &self.figure
    }

    #[must_use]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    #[must_use]
    pub fn buffers(&self) -> [BufferId; 3] {
        [self.vertex_buffer, self.index_buffer, self.constants_buffer]
    }

    /// Surface names drawn in `pass`, in draw order.
    #[must_use]
    pub fn surfaces_in(&self, pass: RenderingPass) -> Vec<&str> {
        self.draw_order
            .iter()
            .filter_map(|&index| self.surfaces.get(index))
            .filter(|surface| surface.passes.contains(&pass))
            .map(|surface| &*surface.name)
            .collect()
    }

    pub fn upload_vertices(
        &self,
        device: &mut dyn RenderDevice,
        vertices: &[ControlVertex],
    ) -> Result<()> {
        if vertices.len() != self.vertex_count {
            return Err(FiguraError::deformation(
                self.figure.as_ref(),
                format!(
                    "deformed {} vertices, figure has {}",
                    vertices.len(),
                    self.vertex_count
                ),
            ));
        }
        device.write_buffer(self.vertex_buffer, 0, bytemuck::cast_slice(vertices))
    }

    pub fn upload_constants(
        &self,
        device: &mut dyn RenderDevice,
        params: &FrameUpdateParameters,
        ibl: &IblEnvironment,
    ) -> Result<()> {
        let constants =
            FigureConstants::new(params, ibl, self.subdivision_level, self.vertex_count);
        device.write_buffer(self.constants_buffer, 0, bytemuck::bytes_of(&constants))
    }

    /// Reads the deformed vertices back; an incomplete copy is a deformation failure.
    pub fn read_vertices(&self, device: &mut dyn RenderDevice) -> Result<Vec<ControlVertex>> {
        let bytes = device.read_buffer(self.vertex_buffer)?;
        let expected = self.vertex_count * size_of::<ControlVertex>();
        if bytes.len() != expected {
            return Err(FiguraError::deformation(
                self.figure.as_ref(),
                format!("readback returned {} of {expected} bytes", bytes.len()),
            ));
        }
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Issues this figure's draws for `pass`. Returns the number of draws.
    pub fn render_pass(&self, device: &mut dyn RenderDevice, pass: RenderingPass) -> Result<usize> {
        let mut issued = 0;
        for &index in &self.draw_order {
            let Some(surface) = self.surfaces.get(index) else {
                continue;
            };
            if !surface.passes.contains(&pass) || surface.index_count == 0 {
                continue;
            }
            device.draw(DrawCall {
                pass,
                figure: Arc::clone(&self.figure),
                surface: Arc::clone(&surface.name),
                shader: surface.shader,
                vertex_buffer: self.vertex_buffer,
                index_buffer: self.index_buffer,
                constants: self.constants_buffer,
                first_index: surface.first_index,
                index_count: surface.index_count,
            })?;
            issued += 1;
        }
        Ok(issued)
    }

    /// Releases every buffer. Consumes the renderer so it cannot be released twice.
    pub fn release(self, device: &mut dyn RenderDevice) -> Result<()> {
        log::debug!("Releasing GPU resources of '{}'", self.figure);
        let mut first_error = None;
        for buffer in self.buffers() {
            if let Err(err) = device.release_buffer(buffer) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn release_all(device: &mut dyn RenderDevice, buffers: &[BufferId]) {
    for &buffer in buffers {
        if let Err(err) = device.release_buffer(buffer) {
            log::error!("Failed to release buffer during cleanup: {err}");
        }
    }
}
