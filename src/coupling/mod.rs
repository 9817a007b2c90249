//! Coupling protocol: the service contract, the mode state machine and the session.

pub mod mode;
pub mod scripted;
pub mod service;
pub mod session;

pub use mode::{CheckpointResponse, CouplingMode, FlagWire, SessionFlags, StatusKey};
pub use scripted::{AdvanceScript, ScriptedService, ServiceCall};
pub use service::{Action, CouplingService, DataId, MeshId, ParticipantInfo};
pub use session::{CouplingSession, Lifecycle, MotionCursor, MotionOutcome, StepReport};
