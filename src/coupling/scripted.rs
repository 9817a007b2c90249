//! In-process coupling service driven by canned responses.
//!
//! `ScriptedService` implements [`CouplingService`] without any external
//! library: vertices and block data are held in memory, and the answers to
//! `advance`, `is_write_data_required` and the checkpoint queries come from a
//! script prepared up front. Every call is recorded so protocol order can be
//! asserted on afterwards.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::coupling::service::{Action, CouplingService, DataId, MeshId, ParticipantInfo};
use crate::coupling_error::CouplingError;
use crate::data::vector::{ND, Vec2};
use crate::topology::point::VertexId;

/// One recorded service call.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceCall {
    SetMeshVertices { mesh: MeshId, count: usize },
    WriteBlock { data: DataId, count: usize },
    ReadBlock { data: DataId, count: usize },
    Initialize,
    Advance(f64),
    MarkActionFulfilled(Action),
    Finalize,
}

/// Canned outcome of a single `advance` call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdvanceScript {
    /// Timestep limit returned by `advance`.
    pub timestep_limit: f64,
    /// `is_coupling_ongoing` after the call.
    pub ongoing: bool,
    /// Whether a write checkpoint is required after the call.
    pub write_checkpoint: bool,
    /// Whether a read checkpoint is required after the call.
    pub read_checkpoint: bool,
}

impl AdvanceScript {
    /// Explicit step that keeps the coupling running.
    pub fn step(timestep_limit: f64) -> Self {
        Self {
            timestep_limit,
            ongoing: true,
            write_checkpoint: false,
            read_checkpoint: false,
        }
    }

    /// Implicit window that converged: the next window starts with a write checkpoint.
    pub fn converged(timestep_limit: f64) -> Self {
        Self {
            write_checkpoint: true,
            ..Self::step(timestep_limit)
        }
    }

    /// Implicit window that did not converge: state must be rolled back.
    pub fn rollback(timestep_limit: f64) -> Self {
        Self {
            read_checkpoint: true,
            ..Self::step(timestep_limit)
        }
    }

    /// Last step of the coupled run.
    pub fn finished(timestep_limit: f64) -> Self {
        Self {
            ongoing: false,
            ..Self::step(timestep_limit)
        }
    }
}

/// Scripted, in-memory coupling service.
#[derive(Clone, Debug)]
pub struct ScriptedService {
    info: ParticipantInfo,
    mesh_name: String,
    fields: Vec<String>,
    vertices: Vec<Vec2>,
    values: HashMap<(DataId, VertexId), Vec2>,
    last_writes: HashMap<DataId, Vec<f64>>,
    initial_limit: f64,
    initial_write_checkpoint: bool,
    advances: VecDeque<AdvanceScript>,
    write_required: VecDeque<bool>,
    ongoing: bool,
    pending: HashSet<Action>,
    finalized: bool,
    finalize_error: Option<String>,
    calls: Vec<ServiceCall>,
}

impl ScriptedService {
    /// Service exposing mesh `mesh_name` with the data fields `fields`.
    ///
    /// Without further scripting the coupling is explicit, starts with a
    /// timestep limit of `1.0`, and stops after the first `advance`.
    pub fn new(info: ParticipantInfo, mesh_name: &str, fields: &[&str]) -> Self {
        Self {
            info,
            mesh_name: mesh_name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            vertices: Vec::new(),
            values: HashMap::new(),
            last_writes: HashMap::new(),
            initial_limit: 1.0,
            initial_write_checkpoint: false,
            advances: VecDeque::new(),
            write_required: VecDeque::new(),
            ongoing: true,
            pending: HashSet::new(),
            finalized: false,
            finalize_error: None,
            calls: Vec::new(),
        }
    }

    /// Require a write checkpoint right after `initialize` (implicit coupling).
    pub fn implicit(mut self) -> Self {
        self.initial_write_checkpoint = true;
        self
    }

    /// Timestep limit returned by `initialize`.
    pub fn with_initial_limit(mut self, limit: f64) -> Self {
        self.initial_limit = limit;
        self
    }

    /// Queue the outcome of the next unscripted `advance`.
    pub fn then_advance(mut self, script: AdvanceScript) -> Self {
        self.advances.push_back(script);
        self
    }

    /// Queue answers to `is_write_data_required`, one per step; unscripted steps answer `true`.
    pub fn with_write_required(mut self, answers: &[bool]) -> Self {
        self.write_required.extend(answers.iter().copied());
        self
    }

    /// Make `finalize` fail with `message` after recording the call.
    pub fn with_failing_finalize(mut self, message: &str) -> Self {
        self.finalize_error = Some(message.to_string());
        self
    }

    /// Participant identity the service was created with.
    pub fn info(&self) -> &ParticipantInfo {
        &self.info
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> &[ServiceCall] {
        &self.calls
    }

    /// Number of recorded calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&ServiceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Coordinates registered so far, indexed by vertex id.
    pub fn registered_vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Whether `finalize` has been called.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Store `value` for `vertex` in field `field`, as the partner solver would.
    pub fn set_value(&mut self, field: &str, vertex: VertexId, value: Vec2) -> Result<(), CouplingError> {
        let data = self.field(field)?;
        self.values.insert((data, vertex), value);
        Ok(())
    }

    /// Value currently stored for `vertex` in `field`.
    pub fn value(&self, field: &str, vertex: VertexId) -> Option<Vec2> {
        let data = self.field(field).ok()?;
        self.values.get(&(data, vertex)).copied()
    }

    /// Flat payload of the last block write to `field`.
    pub fn last_write(&self, field: &str) -> Option<&[f64]> {
        let data = self.field(field).ok()?;
        self.last_writes.get(&data).map(Vec::as_slice)
    }

    fn field(&self, name: &str) -> Result<DataId, CouplingError> {
        self.fields
            .iter()
            .position(|f| f == name)
            .map(|i| DataId(i as i32))
            .ok_or_else(|| CouplingError::Service(format!("unknown data field `{name}`")))
    }

    fn ensure_live(&self) -> Result<(), CouplingError> {
        if self.finalized {
            return Err(CouplingError::Service("coupling already finalized".into()));
        }
        Ok(())
    }

    fn check_block(&self, ids: &[VertexId], values: usize) -> Result<(), CouplingError> {
        if values != ids.len() * ND {
            return Err(CouplingError::BufferLengthMismatch {
                ids: ids.len(),
                values,
            });
        }
        if let Some(bad) = ids
            .iter()
            .find(|v| v.0 < 0 || v.0 as usize >= self.vertices.len())
        {
            return Err(CouplingError::Service(format!("unknown vertex id {bad}")));
        }
        Ok(())
    }
}

impl CouplingService for ScriptedService {
    fn mesh_id(&self, name: &str) -> Result<MeshId, CouplingError> {
        if name == self.mesh_name {
            Ok(MeshId(0))
        } else {
            Err(CouplingError::Service(format!("unknown mesh `{name}`")))
        }
    }

    fn data_id(&self, name: &str, mesh: MeshId) -> Result<DataId, CouplingError> {
        if mesh != MeshId(0) {
            return Err(CouplingError::Service(format!("unknown mesh id {}", mesh.0)));
        }
        self.field(name)
    }

    fn set_mesh_vertices(
        &mut self,
        mesh: MeshId,
        coords: &[f64],
    ) -> Result<Vec<VertexId>, CouplingError> {
        self.ensure_live()?;
        if coords.len() % ND != 0 {
            return Err(CouplingError::BufferLengthMismatch {
                ids: coords.len() / ND,
                values: coords.len(),
            });
        }
        let count = coords.len() / ND;
        let first = self.vertices.len();
        self.vertices
            .extend(coords.chunks_exact(ND).map(|c| Vec2::new(c[0], c[1])));
        self.calls.push(ServiceCall::SetMeshVertices { mesh, count });
        Ok((first..first + count).map(|i| VertexId(i as i32)).collect())
    }

    fn write_block_vector_data(
        &mut self,
        data: DataId,
        ids: &[VertexId],
        values: &[f64],
    ) -> Result<(), CouplingError> {
        self.ensure_live()?;
        self.check_block(ids, values.len())?;
        for (id, v) in ids.iter().zip(values.chunks_exact(ND)) {
            self.values.insert((data, *id), Vec2::new(v[0], v[1]));
        }
        self.last_writes.insert(data, values.to_vec());
        self.calls.push(ServiceCall::WriteBlock {
            data,
            count: ids.len(),
        });
        Ok(())
    }

    fn read_block_vector_data(
        &mut self,
        data: DataId,
        ids: &[VertexId],
        values: &mut [f64],
    ) -> Result<(), CouplingError> {
        self.ensure_live()?;
        self.check_block(ids, values.len())?;
        for (id, out) in ids.iter().zip(values.chunks_exact_mut(ND)) {
            let v = self.values.get(&(data, *id)).copied().unwrap_or_default();
            out.copy_from_slice(&v.0);
        }
        self.calls.push(ServiceCall::ReadBlock {
            data,
            count: ids.len(),
        });
        Ok(())
    }

    fn initialize(&mut self) -> Result<f64, CouplingError> {
        self.ensure_live()?;
        if self.initial_write_checkpoint {
            self.pending.insert(Action::WriteIterationCheckpoint);
        }
        self.calls.push(ServiceCall::Initialize);
        Ok(self.initial_limit)
    }

    fn advance(&mut self, dt: f64) -> Result<f64, CouplingError> {
        self.ensure_live()?;
        self.calls.push(ServiceCall::Advance(dt));
        self.write_required.pop_front();
        let script = self
            .advances
            .pop_front()
            .unwrap_or_else(|| AdvanceScript::finished(dt));
        self.pending.clear();
        if script.write_checkpoint {
            self.pending.insert(Action::WriteIterationCheckpoint);
        }
        if script.read_checkpoint {
            self.pending.insert(Action::ReadIterationCheckpoint);
        }
        self.ongoing = script.ongoing;
        Ok(script.timestep_limit)
    }

    fn is_coupling_ongoing(&self) -> bool {
        self.ongoing && !self.finalized
    }

    fn is_write_data_required(&self, _dt: f64) -> bool {
        self.write_required.front().copied().unwrap_or(true)
    }

    fn is_action_required(&self, action: Action) -> bool {
        self.pending.contains(&action)
    }

    fn mark_action_fulfilled(&mut self, action: Action) {
        self.pending.remove(&action);
        self.calls.push(ServiceCall::MarkActionFulfilled(action));
    }

    fn finalize(&mut self) -> Result<(), CouplingError> {
        self.ensure_live()?;
        self.finalized = true;
        self.calls.push(ServiceCall::Finalize);
        match self.finalize_error.take() {
            Some(message) => Err(CouplingError::Service(message)),
            None => Ok(()),
        }
    }
}
