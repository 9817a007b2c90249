#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fsi-adapter
//!
//! fsi-adapter lets a CFD solver take part in a partitioned fluid-structure
//! co-simulation. At every solver timestep it gathers boundary forces from the
//! fluid mesh, hands them to an external coupling service, and applies the
//! displacements it gets back, following the service's implicit-coupling
//! checkpoint protocol.
//!
//! ## Features
//! - Stable mapping between mesh nodes and flat exchange buffers over several
//!   independently iterated boundary regions ([`data::RegionAtlas`])
//! - Block gather/scatter of 2D vector data ([`algs::exchange`])
//! - An explicit coupling state machine, testable without a coupling library
//!   ([`coupling::CouplingMode`], [`coupling::ScriptedService`])
//! - Topology drift detection before writes and reads ([`algs::consistency`])
//! - Pluggable process groups (serial, in-process threads, MPI) for the
//!   single-coordinator model
//!
//! ## Usage
//! The host solver implements [`topology::HostMesh`], the coupling library is
//! wrapped in a [`coupling::CouplingService`], and the host glue drives a
//! [`coupling::CouplingSession`]:
//!
//! ```
//! use fsi_adapter::prelude::*;
//!
//! # fn main() -> Result<(), CouplingError> {
//! let mut mesh = InMemoryMesh::new();
//! let wall = mesh.add_region(RegionId::new(1), "gridmotions");
//! mesh.add_polyline(wall, &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)])?;
//!
//! let mut session = CouplingSession::create(AdapterConfig::default(), NoComm, |info| {
//!     Ok(ScriptedService::new(info.clone(), "moving_base", &["Forces", "Displacements"]))
//! })?;
//! session.initialize(&mut mesh)?;
//! let step = session.write_and_advance(&mesh, 0.1)?;
//! assert!(!step.flags.ongoing);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//! Progress is reported through the [`log`] facade with a `(rank)` prefix; the
//! crate installs no logger.

pub mod algs;
pub mod config;
pub mod coupling;
pub mod coupling_error;
pub mod data;
pub mod debug_invariants;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::config::{AdapterConfig, DisplacementPolicy};
    pub use crate::coupling::mode::{CouplingMode, SessionFlags, StatusKey};
    pub use crate::coupling::scripted::{AdvanceScript, ScriptedService};
    pub use crate::coupling::service::{Action, CouplingService, ParticipantInfo};
    pub use crate::coupling::session::{CouplingSession, Lifecycle, MotionOutcome, StepReport};
    pub use crate::coupling_error::CouplingError;
    pub use crate::data::atlas::RegionAtlas;
    pub use crate::data::vector::Vec2;
    pub use crate::data::vertex_map::VertexMap;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::topology::marks::NodeMark;
    pub use crate::topology::memory::InMemoryMesh;
    pub use crate::topology::mesh::{FaceLoads, HostMesh, RegionInfo};
    pub use crate::topology::point::{FaceId, NodeId, RegionId, VertexId};
}
