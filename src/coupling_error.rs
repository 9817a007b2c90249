//! CouplingError: Unified error type for fsi-adapter public APIs
//!
//! Every fallible operation in the adapter returns this type. Variants are split
//! into two families: fatal conditions (misconfigured mesh, protocol violations,
//! service failures) that the host glue must turn into a terminated simulation,
//! and drift reports that only signal stale registration state.

use thiserror::Error;

use crate::topology::point::{NodeId, RegionId};

/// Unified error type for adapter operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CouplingError {
    /// The host mesh exposes no region carrying the coupling role.
    #[error("no dynamic region tagged `{role}` found in the host mesh")]
    NoRegions {
        /// Role tag that was searched for.
        role: String,
    },
    /// Registration was asked to register an empty region list.
    #[error("no coupled regions to register")]
    EmptyRegionList,
    /// A region has no backing face set.
    #[error("region {0} has no backing face set")]
    MissingFaceSet(RegionId),
    /// The number of regions visited during a gather differs from registration.
    #[error("number of dynamic regions has changed: expected {expected}, visited {found}")]
    RegionCountChanged {
        /// Regions known at registration.
        expected: usize,
        /// Regions actually visited.
        found: usize,
    },
    /// The motion callback was invoked for a region that is not a coupled region.
    #[error("grid motion called for invalid dynamic region {region} (`{name}`)")]
    InvalidRegion {
        /// Host id of the offending region.
        region: RegionId,
        /// Host-side name of the offending region.
        name: String,
    },
    /// Only two-dimensional meshes can be coupled.
    #[error("unsupported mesh dimension {0}: only 2D coupling is implemented")]
    UnsupportedDimension(usize),
    /// The coupling service returned a vertex id array of the wrong size.
    #[error("vertex registration mismatch: sent {expected} vertices, received {found} ids")]
    VertexCountMismatch {
        /// Number of vertices sent.
        expected: usize,
        /// Number of ids returned.
        found: usize,
    },
    /// A block transfer was attempted with inconsistent buffer lengths.
    #[error("block transfer length mismatch: {ids} vertex ids but {values} values")]
    BufferLengthMismatch {
        /// Number of vertex ids.
        ids: usize,
        /// Number of scalar values.
        values: usize,
    },
    /// A region appears twice in the offset index.
    #[error("region {0} registered twice")]
    DuplicateRegion(RegionId),
    /// The offset index or the slot table is internally inconsistent.
    #[error("invalid exchange layout: expected {expected}, found {found}")]
    InvalidLayout {
        /// Value implied by the region counts.
        expected: usize,
        /// Value actually stored.
        found: usize,
    },
    /// Attempted to construct a node or face id from zero.
    #[error("node/face ids must be non-zero (0 is reserved as invalid)")]
    InvalidNodeId,
    /// A face references a node that was not registered for its region.
    #[error("node {node} in region {region} was not registered")]
    UnknownNode {
        /// Region being traversed.
        region: RegionId,
        /// Unregistered node.
        node: NodeId,
    },
    /// Operation is not valid in the current session lifecycle state.
    #[error("invalid session state: expected {expected}, found {found}")]
    InvalidState {
        /// Required state.
        expected: &'static str,
        /// Actual state.
        found: &'static str,
    },
    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
    /// The coupling service reported a failure.
    #[error("coupling service error: {0}")]
    Service(String),
    /// The live write-side node count no longer matches the registered total.
    #[error("wet node count has changed: registered {expected}, now {found}")]
    TopologyDrift {
        /// Registered total.
        expected: usize,
        /// Recounted total.
        found: usize,
    },
    /// The live read-side node count for one region no longer matches registration.
    #[error("wet node count has changed for dynamic region {region}: registered {expected}, now {found}")]
    ReadDrift {
        /// Region index in traversal order.
        region: usize,
        /// Registered node count.
        expected: usize,
        /// Nodes currently awaiting an update.
        found: usize,
    },
}

impl CouplingError {
    /// Whether the condition is unrecoverable at the adapter layer.
    ///
    /// Drift reports are the only recoverable family: the caller may rebuild the
    /// vertex registration and retry.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CouplingError::TopologyDrift { .. } | CouplingError::ReadDrift { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_is_not_fatal() {
        assert!(!CouplingError::TopologyDrift { expected: 4, found: 5 }.is_fatal());
        assert!(
            !CouplingError::ReadDrift {
                region: 0,
                expected: 2,
                found: 1
            }
            .is_fatal()
        );
        assert!(CouplingError::RegionCountChanged { expected: 2, found: 1 }.is_fatal());
        assert!(CouplingError::UnsupportedDimension(3).is_fatal());
        assert!(CouplingError::InvalidLayout { expected: 2, found: 7 }.is_fatal());
    }

    #[test]
    fn messages_name_the_violated_precondition() {
        let e = CouplingError::MissingFaceSet(RegionId::new(7));
        assert_eq!(e.to_string(), "region 7 has no backing face set");
    }
}
