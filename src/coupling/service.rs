//! The coupling service contract.
//!
//! A [`CouplingService`] is the adapter's view of the external co-simulation
//! library: it accepts the coupled mesh, moves block vector data, and drives the
//! time-window and checkpoint protocol. Exactly one process (the coordinator)
//! owns an instance; calls are never made concurrently or re-entrantly.
//!
//! Block sizes are implied by slice lengths: a block of `n` vertices carries
//! `n` ids and `n * ND` values.

use std::fmt;

use crate::coupling_error::CouplingError;
use crate::topology::point::VertexId;

/// Handle of a mesh known to the coupling service.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub i32);

/// Handle of a data field on a coupled mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataId(pub i32);

/// Protocol actions the service may require from the solver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Save solver state before the first implicit sub-iteration of a window.
    WriteIterationCheckpoint,
    /// Restore solver state because the window did not converge.
    ReadIterationCheckpoint,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::WriteIterationCheckpoint => f.write_str("write-iteration-checkpoint"),
            Action::ReadIterationCheckpoint => f.write_str("read-iteration-checkpoint"),
        }
    }
}

/// Identity passed to the service when the session is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantInfo {
    /// Participant name, e.g. `"Fluent"`.
    pub name: String,
    /// Path of the coupling configuration file.
    pub config_path: String,
    /// Process id reported to the service.
    pub rank: usize,
    /// Number of processes reported to the service.
    pub size: usize,
}

/// Operations consumed from the coupling service.
pub trait CouplingService {
    /// Id of the mesh named `name`.
    fn mesh_id(&self, name: &str) -> Result<MeshId, CouplingError>;

    /// Id of data field `name` on `mesh`.
    fn data_id(&self, name: &str, mesh: MeshId) -> Result<DataId, CouplingError>;

    /// Register vertices given as flat coordinates; returns one id per vertex.
    fn set_mesh_vertices(
        &mut self,
        mesh: MeshId,
        coords: &[f64],
    ) -> Result<Vec<VertexId>, CouplingError>;

    /// Write vector data for `ids`.
    fn write_block_vector_data(
        &mut self,
        data: DataId,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError>;

    /// Read vector data for `ids` into `values`.
    fn read_block_vector_data(
        &mut self,
        data: DataId,
        ids: &[VertexId],
        values: &mut [f64],
    ) -> Result<(), CouplingError>;

    /// Start the coupling; returns the first timestep limit.
    fn initialize(&mut self) -> Result<f64, CouplingError>;

    /// Commit the step of size `dt`; returns the new timestep limit.
    fn advance(&mut self, dt: f64) -> Result<f64, CouplingError>;

    /// Whether the coupled simulation continues.
    fn is_coupling_ongoing(&self) -> bool;

    /// Whether data must be written for a step of size `dt`.
    fn is_write_data_required(&self, dt: f64) -> bool;

    /// Whether `action` is currently required.
    fn is_action_required(&self, action: Action) -> bool;

    /// Acknowledge that `action` was performed.
    fn mark_action_fulfilled(&mut self, action: Action);

    /// Tear down the coupling.
    fn finalize(&mut self) -> Result<(), CouplingError>;
}
