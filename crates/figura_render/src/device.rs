//! GPU device seam.
//!
//! Figures allocate buffers, upload and read back data, and issue draws
//! through [`RenderDevice`]. [`HeadlessDevice`] implements it in memory with
//! the validation rules a real device applies (usage flags, bounds, copy
//! alignment) and records every draw for inspection.

use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};
use wgpu::BufferUsages;

use figura_core::{FiguraError, Result};

use crate::pass::RenderingPass;
use crate::shader::ShaderHandle;

new_key_type! {
    pub struct BufferId;
}

/// Copy offsets and sizes must be multiples of this.
pub const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsages,
}

impl BufferDesc {
    pub fn new(label: impl Into<String>, size: u64, usage: BufferUsages) -> Self {
        Self {
            label: label.into(),
            size,
            usage,
        }
    }
}

/// One recorded draw: a surface range of one figure in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub pass: RenderingPass,
    pub figure: Arc<str>,
    pub surface: Arc<str>,
    pub shader: ShaderHandle,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub constants: BufferId,
    pub first_index: u32,
    pub index_count: u32,
}

pub trait RenderDevice {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId>;

    /// Queues a write of `data` at `offset`.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    /// Copies the buffer back to the CPU, blocking until the copy completes.
    fn read_buffer(&mut self, buffer: BufferId) -> Result<Vec<u8>>;

    fn release_buffer(&mut self, buffer: BufferId) -> Result<()>;

    fn draw(&mut self, call: DrawCall) -> Result<()>;
}

// ============================================================================
// Headless device
// ============================================================================

/// Operations a test can make the headless device fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    Create,
    Write,
    Read,
    Draw,
}

#[derive(Debug)]
struct HeadlessBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
}

/// In-memory [`RenderDevice`].
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: SlotMap<BufferId, HeadlessBuffer>,
    draws: Vec<DrawCall>,
    created: usize,
    released: usize,
    pending_fault: Option<DeviceOp>,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `op` fail with a GPU error.
    pub fn fail_next(&mut self, op: DeviceOp) {
        self.pending_fault = Some(op);
    }

    fn check_fault(&mut self, op: DeviceOp) -> Result<()> {
        if self.pending_fault == Some(op) {
            self.pending_fault = None;
            return Err(FiguraError::Gpu(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn buffer(&self, id: BufferId) -> Result<&HeadlessBuffer> {
        self.buffers
            .get(id)
            .ok_or_else(|| FiguraError::Gpu(format!("buffer {id:?} does not exist")))
    }

    fn require_usage(&self, id: BufferId, usage: BufferUsages, action: &str) -> Result<()> {
        let buffer = self.buffer(id)?;
        if buffer.desc.usage.contains(usage) {
            Ok(())
        } else {
            Err(FiguraError::Gpu(format!(
                "cannot {action} buffer '{}': usage {:?} lacks {usage:?}",
                buffer.desc.label, buffer.desc.usage
            )))
        }
    }

    /// Draws recorded since the last [`take_draws`](Self::take_draws).
    #[must_use]
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn created_buffers(&self) -> usize {
        self.created
    }

    #[must_use]
    pub fn released_buffers(&self) -> usize {
        self.released
    }

    #[must_use]
    pub fn is_live(&self, id: BufferId) -> bool {
        self.buffers.contains_key(id)
    }

    #[must_use]
    pub fn buffer_desc(&self, id: BufferId) -> Option<&BufferDesc> {
        self.buffers.get(id).map(|buffer| &buffer.desc)
    }

    #[must_use]
    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(id).map(|buffer| buffer.data.as_slice())
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId> {
        self.check_fault(DeviceOp::Create)?;
        if desc.usage.is_empty() {
            return Err(FiguraError::Gpu(format!(
                "buffer '{}' created without usage flags",
                desc.label
            )));
        }
        if desc.size % COPY_ALIGNMENT != 0 {
            return Err(FiguraError::Gpu(format!(
                "buffer '{}' size {} is not a multiple of {COPY_ALIGNMENT}",
                desc.label, desc.size
            )));
        }

        let size = usize::try_from(desc.size)
            .map_err(|_| FiguraError::Gpu(format!("buffer '{}' is too large", desc.label)))?;
        self.created += 1;
        Ok(self.buffers.insert(HeadlessBuffer {
            desc: desc.clone(),
            data: vec![0; size],
        }))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        self.check_fault(DeviceOp::Write)?;
        self.require_usage(buffer, BufferUsages::COPY_DST, "write")?;
        if offset % COPY_ALIGNMENT != 0 || data.len() as u64 % COPY_ALIGNMENT != 0 {
            return Err(FiguraError::Gpu(format!(
                "unaligned write of {} bytes at offset {offset}",
                data.len()
            )));
        }

        let target = self
            .buffers
            .get_mut(buffer)
            .ok_or_else(|| FiguraError::Gpu(format!("buffer {buffer:?} does not exist")))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > target.data.len() {
            return Err(FiguraError::Gpu(format!(
                "write of {} bytes at offset {offset} overruns buffer '{}' ({} bytes)",
                data.len(),
                target.desc.label,
                target.data.len()
            )));
        }
        target.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferId) -> Result<Vec<u8>> {
        self.check_fault(DeviceOp::Read)?;
        self.require_usage(buffer, BufferUsages::COPY_SRC, "read back")?;
        Ok(self.buffer(buffer)?.data.clone())
    }

    fn release_buffer(&mut self, buffer: BufferId) -> Result<()> {
        let released = self
            .buffers
            .remove(buffer)
            .ok_or_else(|| FiguraError::Gpu(format!("buffer {buffer:?} released twice")))?;
        log::trace!("Released buffer '{}'", released.desc.label);
        self.released += 1;
        Ok(())
    }

    fn draw(&mut self, call: DrawCall) -> Result<()> {
        self.check_fault(DeviceOp::Draw)?;
        self.require_usage(call.vertex_buffer, BufferUsages::VERTEX, "draw from")?;
        self.require_usage(call.index_buffer, BufferUsages::INDEX, "index with")?;
        self.require_usage(call.constants, BufferUsages::UNIFORM, "bind")?;

        let index_bytes = self.buffer(call.index_buffer)?.desc.size;
        let end = (u64::from(call.first_index) + u64::from(call.index_count)) * 4;
        if end > index_bytes {
            return Err(FiguraError::Gpu(format!(
                "draw of '{}' reads past the end of its index buffer",
                call.surface
            )));
        }
        self.draws.push(call);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip_respects_usage() {
        let mut device = HeadlessDevice::new();
        let readable = device
            .create_buffer(&BufferDesc::new(
                "readable",
                8,
                BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            ))
            .unwrap();
        device.write_buffer(readable, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.read_buffer(readable).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);

        let write_only = device
            .create_buffer(&BufferDesc::new("write-only", 4, BufferUsages::COPY_DST))
            .unwrap();
        assert!(matches!(
            device.read_buffer(write_only),
            Err(FiguraError::Gpu(_))
        ));
    }

    #[test]
    fn writes_are_bounds_and_alignment_checked() {
        let mut device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(&BufferDesc::new("b", 8, BufferUsages::COPY_DST))
            .unwrap();
        assert!(device.write_buffer(buffer, 4, &[0; 8]).is_err());
        assert!(device.write_buffer(buffer, 2, &[0; 4]).is_err());
        assert!(device.write_buffer(buffer, 0, &[0; 3]).is_err());
    }

    #[test]
    fn double_release_is_an_error() {
        let mut device = HeadlessDevice::new();
        let buffer = device
            .create_buffer(&BufferDesc::new("b", 4, BufferUsages::UNIFORM))
            .unwrap();
        device.release_buffer(buffer).unwrap();
        assert!(device.release_buffer(buffer).is_err());
        assert_eq!(device.created_buffers(), 1);
        assert_eq!(device.released_buffers(), 1);
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn injected_fault_fails_once() {
        let mut device = HeadlessDevice::new();
        device.fail_next(DeviceOp::Create);
        let desc = BufferDesc::new("b", 4, BufferUsages::UNIFORM);
        assert!(device.create_buffer(&desc).is_err());
        assert!(device.create_buffer(&desc).is_ok());
    }
}
