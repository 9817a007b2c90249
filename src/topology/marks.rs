//! Per-node update marks.
//!
//! The host keeps one mark per mesh node. Registration marks every coupled node
//! `NeedsUpdate`; reading a displacement for the node flips it back to
//! `Settled`, so each received value is applied at most once. `Counted` only
//! exists for the duration of a read-side consistency sweep.

/// Update state of a mesh node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeMark {
    /// No displacement pending.
    #[default]
    Settled,
    /// A displacement must be applied on the next read.
    NeedsUpdate,
    /// Temporarily claimed by a counting sweep; restored to `NeedsUpdate` afterwards.
    Counted,
}

impl NodeMark {
    #[inline]
    pub fn needs_update(self) -> bool {
        matches!(self, NodeMark::NeedsUpdate)
    }
}
