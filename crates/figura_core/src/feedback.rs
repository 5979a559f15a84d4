//! Control-vertex feedback.
//!
//! After a figure is deformed in frame N its control vertices are read back
//! and published as a [`ControlVertexInfo`]. Frame N+1's animators receive that
//! info read-only. Indexing is only meaningful for the topology it was
//! produced from, so every info carries a [`TopologyId`] and a
//! [`FeedbackBuffer`] refuses data from a different topology.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use xxhash_rust::xxh3::Xxh3;

use crate::errors::{FiguraError, Result};

/// One deformed mesh vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ControlVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl ControlVertex {
    #[inline]
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[inline]
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Identity of a vertex topology: vertex count plus face indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TopologyId(pub u64);

impl TopologyId {
    #[must_use]
    pub fn compute(vertex_count: usize, faces: &[[u32; 3]]) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(&(vertex_count as u64).to_le_bytes());
        hasher.update(bytemuck::cast_slice(faces));
        Self(hasher.digest())
    }
}

/// Deformed vertices of one figure from its most recently completed frame.
#[derive(Debug, Clone)]
pub struct ControlVertexInfo {
    figure: Arc<str>,
    topology: TopologyId,
    frame: Option<u64>,
    vertices: Arc<[ControlVertex]>,
}

impl ControlVertexInfo {
    #[must_use]
    pub fn new(
        figure: Arc<str>,
        topology: TopologyId,
        frame: u64,
        vertices: Arc<[ControlVertex]>,
    ) -> Self {
        Self {
            figure,
            topology,
            frame: Some(frame),
            vertices,
        }
    }

    /// Placeholder for a figure that has not completed a frame yet.
    #[must_use]
    pub fn empty(figure: Arc<str>, topology: TopologyId) -> Self {
        Self {
            figure,
            topology,
            frame: None,
            vertices: Arc::from(Vec::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn figure(&self) -> &str {
        &self.figure
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> TopologyId {
        self.topology
    }

    /// Frame this data was produced in; `None` for an empty placeholder.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> Option<u64> {
        self.frame
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[ControlVertex] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[must_use]
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.vertices.get(index).map(ControlVertex::position)
    }

    /// True when both infos share the same vertex storage.
    #[must_use]
    pub fn shares_storage(&self, other: &ControlVertexInfo) -> bool {
        Arc::ptr_eq(&self.vertices, &other.vertices)
    }
}

/// Per-figure holder of the latest published feedback.
#[derive(Debug, Clone)]
pub struct FeedbackBuffer {
    topology: TopologyId,
    latest: ControlVertexInfo,
}

impl FeedbackBuffer {
    #[must_use]
    pub fn new(figure: Arc<str>, topology: TopologyId) -> Self {
        Self {
            topology,
            latest: ControlVertexInfo::empty(figure, topology),
        }
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> TopologyId {
        self.topology
    }

    #[inline]
    #[must_use]
    pub fn latest(&self) -> &ControlVertexInfo {
        &self.latest
    }

    /// Replaces the latest feedback.
    ///
    /// Rejects data from another topology and data older than what is
    /// already published. Data for the same frame replaces it.
    pub fn publish(&mut self, info: ControlVertexInfo) -> Result<()> {
        if info.topology != self.topology {
            return Err(FiguraError::deformation(
                info.figure(),
                format!(
                    "feedback topology {:#x} does not match buffer topology {:#x}",
                    info.topology.0, self.topology.0
                ),
            ));
        }
        if let (Some(published), Some(incoming)) = (self.latest.frame, info.frame) {
            if incoming < published {
                return Err(FiguraError::deformation(
                    info.figure(),
                    format!("feedback for frame {incoming} is older than frame {published}"),
                ));
            }
        }
        self.latest = info;
        Ok(())
    }

    /// Discards all feedback and binds the buffer to a new topology.
    pub fn reinitialize(&mut self, figure: Arc<str>, topology: TopologyId) {
        log::debug!(
            "Feedback for '{figure}' reinitialized ({:#x} -> {:#x})",
            self.topology.0,
            topology.0
        );
        self.topology = topology;
        self.latest = ControlVertexInfo::empty(figure, topology);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACES: [[u32; 3]; 2] = [[0, 1, 2], [2, 1, 3]];

    fn info(topology: TopologyId, frame: u64) -> ControlVertexInfo {
        let vertices = vec![ControlVertex::new(Vec3::X, Vec3::Y); 4];
        ControlVertexInfo::new(Arc::from("body"), topology, frame, Arc::from(vertices))
    }

    #[test]
    fn topology_depends_on_count_and_faces() {
        let a = TopologyId::compute(4, &FACES);
        assert_eq!(a, TopologyId::compute(4, &FACES));
        assert_ne!(a, TopologyId::compute(5, &FACES));
        assert_ne!(a, TopologyId::compute(4, &FACES[..1]));
    }

    #[test]
    fn publish_rejects_foreign_topology() {
        let topology = TopologyId::compute(4, &FACES);
        let mut buffer = FeedbackBuffer::new(Arc::from("body"), topology);

        let foreign = TopologyId::compute(5, &FACES);
        let err = buffer.publish(info(foreign, 1)).unwrap_err();
        assert!(matches!(err, FiguraError::DeformationFailure { .. }));
        assert!(buffer.latest().frame().is_none());
    }

    #[test]
    fn publish_rejects_out_of_order_frames() {
        let topology = TopologyId::compute(4, &FACES);
        let mut buffer = FeedbackBuffer::new(Arc::from("body"), topology);

        buffer.publish(info(topology, 3)).unwrap();
        assert!(buffer.publish(info(topology, 2)).is_err());
        buffer.publish(info(topology, 4)).unwrap();
        assert_eq!(buffer.latest().frame(), Some(4));
    }

    #[test]
    fn publish_for_the_same_frame_replaces() {
        let topology = TopologyId::compute(4, &FACES);
        let mut buffer = FeedbackBuffer::new(Arc::from("body"), topology);

        buffer.publish(info(topology, 0)).unwrap();
        let first = buffer.latest().clone();
        buffer.publish(info(topology, 0)).unwrap();

        assert_eq!(buffer.latest().frame(), Some(0));
        assert!(!buffer.latest().shares_storage(&first));
    }

    #[test]
    fn reinitialize_discards_old_feedback() {
        let topology = TopologyId::compute(4, &FACES);
        let mut buffer = FeedbackBuffer::new(Arc::from("body"), topology);
        buffer.publish(info(topology, 1)).unwrap();

        let next = TopologyId::compute(5, &FACES);
        buffer.reinitialize(Arc::from("body"), next);

        assert!(buffer.latest().is_empty());
        assert_eq!(buffer.latest().topology(), next);
        assert!(buffer.publish(info(topology, 2)).is_err());
    }
}
