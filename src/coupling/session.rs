//! CouplingSession: per-run coupling state and the host-facing entry points.
//!
//! A session owns everything that lives for the duration of a coupled run:
//! the coupling service handle (coordinator only), the registered vertex map,
//! the coupling mode, the timestep limit and the motion cursor. The host
//! drives it through three calls:
//!
//! 1. [`CouplingSession::initialize`] once, after the mesh is loaded,
//! 2. [`CouplingSession::write_and_advance`] once per solver timestep,
//! 3. [`CouplingSession::on_grid_motion`] once per coupled region and solve
//!    iteration.
//!
//! Only the coordinator rank talks to the coupling service. Every other rank
//! mirrors the coordinator's flags, received by broadcast after initialization
//! and after each step, and keeps its own motion cursor in lockstep.

use std::fmt;

use crate::algs::communicator::{COORDINATOR_RANK, Communicator};
use crate::algs::consistency::{check_read_positions, check_write_positions};
use crate::algs::exchange::{GatherReport, ScatterReport, gather_forces, scatter_displacements};
use crate::algs::registry::register_mesh;
use crate::config::AdapterConfig;
use crate::coupling::mode::{CheckpointResponse, CouplingMode, FlagWire, SessionFlags};
use crate::coupling::service::{Action, CouplingService, DataId, MeshId, ParticipantInfo};
use crate::coupling_error::CouplingError;
use crate::data::vector::ND;
use crate::data::vertex_map::VertexMap;
use crate::topology::mesh::HostMesh;
use crate::topology::point::RegionId;
use crate::topology::region::{RegionDescriptor, RegionRole, classify_regions};

/// Lifecycle of a coupling session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, mesh not yet registered.
    Uninitialized,
    /// Mesh registered, coupling not yet initialized.
    Registered,
    /// Exchanging data every timestep.
    TimeStepping,
    /// Coupling service torn down.
    Finalized,
}

impl Lifecycle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Registered => "registered",
            Lifecycle::TimeStepping => "time-stepping",
            Lifecycle::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotating region cursor of the grid-motion callback.
///
/// The first full cycle over all regions only establishes baseline geometry:
/// while `skip_first_round` is set, callbacks advance the cursor and return.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MotionCursor {
    /// Ordinal of the region expected next.
    pub index: usize,
    /// Whether the baseline cycle is still running.
    pub skip_first_round: bool,
}

impl Default for MotionCursor {
    fn default() -> Self {
        Self {
            index: 0,
            skip_first_round: true,
        }
    }
}

/// Result of one grid-motion callback.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MotionOutcome {
    /// Baseline cycle: nothing was read.
    BaselineSkipped,
    /// Displacements were read and consumed on the coordinator.
    Applied(ScatterReport),
    /// Follower rank: cursor and flags updated, no service call.
    Mirrored,
    /// The coupling has already been finalized.
    AfterFinalize,
}

/// Result of one write/advance step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepReport {
    /// The service did not require data this step.
    pub subcycling: bool,
    /// Force gather, if one ran on this rank.
    pub gather: Option<GatherReport>,
    /// Timestep limit returned by `advance`.
    pub timestep_limit: f64,
    /// Flags after the step, as published to the host.
    pub flags: SessionFlags,
}

#[derive(Copy, Clone, Debug)]
struct ServiceIds {
    mesh: MeshId,
    forces: DataId,
    displacements: DataId,
}

/// Coupling state of one process.
pub struct CouplingSession<S, C> {
    config: AdapterConfig,
    comm: C,
    service: Option<S>,
    ids: Option<ServiceIds>,
    lifecycle: Lifecycle,
    regions: Vec<RegionDescriptor>,
    vertices: Option<VertexMap>,
    timestep_limit: f64,
    mode: CouplingMode,
    ongoing: bool,
    cursor: MotionCursor,
}

impl<S, C> fmt::Debug for CouplingSession<S, C>
where
    C: Communicator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouplingSession")
            .field("rank", &self.comm.rank())
            .field("lifecycle", &self.lifecycle)
            .field("regions", &self.regions.len())
            .field("vertices", &self.vertices.as_ref().map(VertexMap::total))
            .field("timestep_limit", &self.timestep_limit)
            .field("mode", &self.mode)
            .field("ongoing", &self.ongoing)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl<S, C> CouplingSession<S, C>
where
    S: CouplingService,
    C: Communicator,
{
    /// Create a session; the coordinator builds its service with `factory`.
    ///
    /// The service sees a single participant process: all coupling calls are
    /// funnelled through the coordinator.
    ///
    /// # Errors
    /// Returns [`CouplingError::Config`] for an invalid configuration, or
    /// whatever `factory` fails with.
    pub fn create<F>(config: AdapterConfig, comm: C, factory: F) -> Result<Self, CouplingError>
    where
        F: FnOnce(&ParticipantInfo) -> Result<S, CouplingError>,
    {
        config.validate()?;
        let service = if comm.is_coordinator() {
            log::info!("({}) Creating solver interface", comm.rank());
            let info = ParticipantInfo {
                name: config.participant.clone(),
                config_path: config.config_path.clone(),
                rank: COORDINATOR_RANK,
                size: 1,
            };
            Some(factory(&info)?)
        } else {
            None
        };
        Ok(Self {
            config,
            comm,
            service,
            ids: None,
            lifecycle: Lifecycle::Uninitialized,
            regions: Vec::new(),
            vertices: None,
            timestep_limit: 0.0,
            mode: CouplingMode::Explicit,
            ongoing: true,
            cursor: MotionCursor::default(),
        })
    }

    /// Register the coupled mesh, initialize the coupling and sync all ranks.
    ///
    /// # Errors
    /// - [`CouplingError::InvalidState`] unless the session is uninitialized,
    /// - [`CouplingError::UnsupportedDimension`] for a non-2D host,
    /// - any registration or service error.
    pub fn initialize<M: HostMesh + ?Sized>(&mut self, mesh: &mut M) -> Result<(), CouplingError> {
        self.expect_lifecycle(Lifecycle::Uninitialized)?;
        if mesh.dimension() != ND {
            return Err(CouplingError::UnsupportedDimension(mesh.dimension()));
        }
        let rank = self.comm.rank();
        self.regions = classify_regions(&mesh.regions(), &self.config.region_role)?;

        if let Some(service) = self.service.as_mut() {
            let mesh_id = service.mesh_id(&self.config.mesh_name)?;
            let ids = ServiceIds {
                mesh: mesh_id,
                forces: service.data_id(&self.config.force_data, mesh_id)?,
                displacements: service.data_id(&self.config.displacement_data, mesh_id)?,
            };
            let map = register_mesh(mesh, &self.regions, service, ids.mesh)?;
            self.ids = Some(ids);
            self.vertices = Some(map);
            self.lifecycle = Lifecycle::Registered;

            log::info!("({rank}) Initializing coupled simulation");
            self.timestep_limit = service.initialize()?;
            self.ongoing = service.is_coupling_ongoing();
            let implicit = service.is_action_required(Action::WriteIterationCheckpoint);
            self.mode = CouplingMode::on_initialize(implicit);
            if implicit {
                log::info!("({rank}) Implicit coupling");
                service.mark_action_fulfilled(Action::WriteIterationCheckpoint);
            } else {
                log::info!("({rank}) Explicit coupling");
            }
        } else {
            self.lifecycle = Lifecycle::Registered;
        }

        log::info!("({rank}) Synchronizing processes");
        self.synchronize();
        self.lifecycle = Lifecycle::TimeStepping;
        Ok(())
    }

    /// Write forces (unless subcycling), advance the coupling by `dt` and
    /// handle the checkpoint actions.
    ///
    /// # Errors
    /// - [`CouplingError::InvalidState`] outside of time-stepping,
    /// - [`CouplingError::TopologyDrift`] if write position checks are enabled,
    ///   this step writes, and the wet node count changed; nothing has been
    ///   written or advanced and the caller may [`reregister`](Self::reregister)
    ///   and retry,
    /// - any gather or service error.
    pub fn write_and_advance<M: HostMesh + ?Sized>(
        &mut self,
        mesh: &M,
        dt: f64,
    ) -> Result<StepReport, CouplingError> {
        self.expect_lifecycle(Lifecycle::TimeStepping)?;
        let rank = self.comm.rank();
        let mut subcycling = false;
        let mut gather = None;

        if let (Some(service), Some(map), Some(ids)) =
            (self.service.as_mut(), self.vertices.as_mut(), self.ids)
        {
            subcycling = !service.is_write_data_required(dt);
            if !subcycling && self.config.check_write_positions {
                if let Some(found) = check_write_positions(mesh, map)? {
                    log::warn!(
                        "({rank}) Wet node count has changed: registered {}, now {found}",
                        map.total()
                    );
                    return Err(CouplingError::TopologyDrift {
                        expected: map.total(),
                        found,
                    });
                }
            }

            if subcycling {
                log::info!("({rank}) In subcycle, skip writing");
            } else if map.total() > 0 {
                let report = gather_forces(mesh, map, service, ids.forces)?;
                log::info!("({rank}) Max force: {}", report.max_force);
                gather = Some(report);
            }

            self.timestep_limit = service.advance(dt)?;
            self.ongoing = service.is_coupling_ongoing();

            let response = CheckpointResponse {
                write_required: service.is_action_required(Action::WriteIterationCheckpoint),
                read_required: service.is_action_required(Action::ReadIterationCheckpoint),
            };
            if response.write_required {
                service.mark_action_fulfilled(Action::WriteIterationCheckpoint);
            } else if response.read_required {
                service.mark_action_fulfilled(Action::ReadIterationCheckpoint);
            }
            self.mode = self.mode.on_advance(response, self.ongoing);
            log::debug!("({rank}) mode after advance: {}", self.mode);
        }

        self.synchronize();
        Ok(StepReport {
            subcycling,
            gather,
            timestep_limit: self.timestep_limit,
            flags: self.flags(),
        })
    }

    /// Grid-motion callback for `region`.
    ///
    /// # Errors
    /// - [`CouplingError::InvalidState`] before initialization,
    /// - [`CouplingError::InvalidRegion`] if `region` is not a coupled region
    ///   or no longer carries the coupling role,
    /// - [`CouplingError::MissingFaceSet`] if the region has no face set,
    /// - [`CouplingError::ReadDrift`] if read position checks are enabled and
    ///   the pending node count changed,
    /// - any scatter or service error.
    pub fn on_grid_motion<M: HostMesh + ?Sized>(
        &mut self,
        mesh: &mut M,
        region: RegionId,
    ) -> Result<MotionOutcome, CouplingError> {
        match self.lifecycle {
            Lifecycle::Finalized => return Ok(MotionOutcome::AfterFinalize),
            Lifecycle::TimeStepping => {}
            other => {
                return Err(CouplingError::InvalidState {
                    expected: Lifecycle::TimeStepping.as_str(),
                    found: other.as_str(),
                });
            }
        }
        let rank = self.comm.rank();
        let n = self.regions.len();
        if self.cursor.index >= n {
            log::debug!("({rank}) Reset region index");
            self.cursor.index = 0;
        }

        let index = self.coupled_index(&*mesh, region)?;
        if mesh.principal_faces(region).is_none() {
            return Err(CouplingError::MissingFaceSet(region));
        }

        if self.cursor.skip_first_round {
            if self.cursor.index + 1 >= n {
                self.cursor.skip_first_round = false;
            }
            self.cursor.index += 1;
            log::info!("({rank}) Skipping first round grid motion");
            return Ok(MotionOutcome::BaselineSkipped);
        }

        let outcome = match (self.service.as_mut(), self.vertices.as_mut(), self.ids) {
            (Some(service), Some(map), Some(ids)) => {
                if self.config.check_read_positions {
                    if let Some(found) = check_read_positions(mesh, map, index)? {
                        return Err(CouplingError::ReadDrift {
                            region: index,
                            expected: map.atlas().count_of(index).unwrap_or_default(),
                            found,
                        });
                    }
                }
                let report = scatter_displacements(
                    mesh,
                    map,
                    service,
                    ids.displacements,
                    index,
                    self.config.displacement_policy,
                )?;
                log::info!("({rank}) Max displacement delta: {}", report.max_delta);
                self.ongoing = service.is_coupling_ongoing();
                MotionOutcome::Applied(report)
            }
            _ => MotionOutcome::Mirrored,
        };
        self.cursor.index += 1;
        self.mode = self.mode.on_motion(self.ongoing);

        if !self.ongoing {
            self.lifecycle = Lifecycle::Finalized;
            if let Some(service) = self.service.as_mut() {
                log::info!("({rank}) Finalizing coupling");
                service.finalize()?;
            }
        }
        Ok(outcome)
    }

    /// Rebuild the vertex registration from the live mesh.
    ///
    /// Regions are reclassified and every vertex is registered again with the
    /// service; the motion cursor is kept.
    pub fn reregister<M: HostMesh + ?Sized>(&mut self, mesh: &mut M) -> Result<(), CouplingError> {
        self.expect_lifecycle(Lifecycle::TimeStepping)?;
        let regions = classify_regions(&mesh.regions(), &self.config.region_role)?;
        if let (Some(service), Some(ids)) = (self.service.as_mut(), self.ids) {
            let map = register_mesh(mesh, &regions, service, ids.mesh)?;
            log::info!(
                "({}) Re-registered {} vertices over {} regions",
                self.comm.rank(),
                map.total(),
                regions.len()
            );
            self.vertices = Some(map);
        }
        self.regions = regions;
        Ok(())
    }

    /// Flags the host reads to steer its iteration loop.
    #[inline]
    pub fn flags(&self) -> SessionFlags {
        self.mode.flags(self.ongoing)
    }

    #[inline]
    pub fn mode(&self) -> CouplingMode {
        self.mode
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Upper bound on the next timestep size.
    #[inline]
    pub fn timestep_limit(&self) -> f64 {
        self.timestep_limit
    }

    #[inline]
    pub fn cursor(&self) -> MotionCursor {
        self.cursor
    }

    /// Coupled regions, in traversal order.
    #[inline]
    pub fn regions(&self) -> &[RegionDescriptor] {
        &self.regions
    }

    /// Registered vertices; `None` on followers and before initialization.
    #[inline]
    pub fn vertex_map(&self) -> Option<&VertexMap> {
        self.vertices.as_ref()
    }

    /// Coupling service; `None` on followers.
    #[inline]
    pub fn service(&self) -> Option<&S> {
        self.service.as_ref()
    }

    #[inline]
    pub fn service_mut(&mut self) -> Option<&mut S> {
        self.service.as_mut()
    }

    #[inline]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    #[inline]
    pub fn comm(&self) -> &C {
        &self.comm
    }

    fn expect_lifecycle(&self, expected: Lifecycle) -> Result<(), CouplingError> {
        if self.lifecycle != expected {
            return Err(CouplingError::InvalidState {
                expected: expected.as_str(),
                found: self.lifecycle.as_str(),
            });
        }
        Ok(())
    }

    /// Ordinal of `region` among the coupled regions, checked against the live role.
    fn coupled_index<M: HostMesh + ?Sized>(
        &self,
        mesh: &M,
        region: RegionId,
    ) -> Result<usize, CouplingError> {
        let live = mesh.region_info(region);
        let index = self.regions.iter().position(|r| r.id == region);
        match (index, live) {
            (Some(index), Some(info))
                if RegionRole::classify(&info.name, &self.config.region_role)
                    == RegionRole::GridMotion =>
            {
                Ok(index)
            }
            (_, info) => {
                let name = info.map(|i| i.name).unwrap_or_default();
                log::error!(
                    "({}) called grid motion for invalid dynamic region {region}: `{name}`",
                    self.comm.rank()
                );
                Err(CouplingError::InvalidRegion { region, name })
            }
        }
    }

    /// Barrier, then replicate the coordinator's flags and timestep limit.
    fn synchronize(&mut self) {
        self.comm.barrier();
        let mut wire = FlagWire::encode(self.flags(), self.timestep_limit);
        self.comm
            .broadcast(COORDINATOR_RANK, bytemuck::bytes_of_mut(&mut wire));
        if !self.comm.is_coordinator() {
            let (flags, limit) = wire.decode();
            self.mode = CouplingMode::from_flags(flags);
            self.ongoing = flags.ongoing;
            self.timestep_limit = limit;
        }
    }
}
