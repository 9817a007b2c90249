//! Flat exchange buffers shared by registration, gather and scatter.

use std::ops::Range;

use crate::data::vector::Vec2;
use crate::topology::point::VertexId;

/// Contiguous per-vertex storage, laid out region-then-node.
///
/// All four arrays have the same length, the registered vertex total. Slot `i`
/// of every array refers to the same vertex.
#[derive(Clone, Debug, Default)]
pub struct ExchangeBuffers {
    initial: Vec<Vec2>,
    forces: Vec<Vec2>,
    displacements: Vec<Vec2>,
    vertex_ids: Vec<VertexId>,
}

impl ExchangeBuffers {
    /// Zero-filled buffers for `len` vertices.
    pub fn with_len(len: usize) -> Self {
        Self {
            initial: vec![Vec2::ZERO; len],
            forces: vec![Vec2::ZERO; len],
            displacements: vec![Vec2::ZERO; len],
            vertex_ids: vec![VertexId::default(); len],
        }
    }

    /// Number of vertex slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.initial.len()
    }

    /// Whether there are no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.initial.is_empty()
    }

    /// Initial coordinates captured at registration.
    #[inline]
    pub fn initial(&self) -> &[Vec2] {
        &self.initial
    }

    /// Mutable initial coordinates (registration only).
    #[inline]
    pub(crate) fn initial_mut(&mut self) -> &mut [Vec2] {
        &mut self.initial
    }

    /// Outbound forces.
    #[inline]
    pub fn forces(&self) -> &[Vec2] {
        &self.forces
    }

    /// Inbound displacements.
    #[inline]
    pub fn displacements(&self) -> &[Vec2] {
        &self.displacements
    }

    /// Vertex ids issued by the coupling service.
    #[inline]
    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.vertex_ids
    }

    /// Installs the vertex ids returned by the coupling service.
    pub(crate) fn set_vertex_ids(&mut self, ids: Vec<VertexId>) {
        debug_assert_eq!(ids.len(), self.initial.len());
        self.vertex_ids = ids;
    }

    /// Initial coordinates as flat `[x0, y0, x1, y1, ...]`.
    #[inline]
    pub fn initial_flat(&self) -> &[f64] {
        bytemuck::cast_slice(&self.initial)
    }

    /// Mutable outbound forces (gather only).
    #[inline]
    pub(crate) fn forces_mut(&mut self) -> &mut [Vec2] {
        &mut self.forces
    }

    /// Outbound forces as flat `[fx0, fy0, fx1, fy1, ...]`.
    #[inline]
    pub fn forces_flat(&self) -> &[f64] {
        bytemuck::cast_slice(&self.forces)
    }

    /// Displacement sub-range as a flat mutable slice, with the matching ids.
    pub(crate) fn displacement_window(
        &mut self,
        range: Range<usize>,
    ) -> (&[VertexId], &mut [f64]) {
        let ids = &self.vertex_ids[range.clone()];
        let values = bytemuck::cast_slice_mut(&mut self.displacements[range]);
        (ids, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_only_the_requested_vertices() {
        let mut buffers = ExchangeBuffers::with_len(4);
        buffers.set_vertex_ids((0..4).map(VertexId).collect());
        {
            let (ids, values) = buffers.displacement_window(1..3);
            assert_eq!(ids, &[VertexId(1), VertexId(2)]);
            assert_eq!(values.len(), 4);
            values.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        }
        assert_eq!(
            buffers.displacements(),
            &[
                Vec2::ZERO,
                Vec2::new(1.0, 2.0),
                Vec2::new(3.0, 4.0),
                Vec2::ZERO
            ]
        );
    }
}
