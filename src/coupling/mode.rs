//! Coupling mode state machine and the flags it publishes to the host.
//!
//! The host solver drives its inner iteration loop from three shared flags:
//! `convergence`, `iterate` and `ongoing`. Rather than mutating those flags
//! from scattered call sites, the session keeps a [`CouplingMode`] and derives
//! the flags from it. All transitions are pure functions of the current mode
//! and the service's answers, so the protocol can be exercised without a
//! coupling library.

use std::fmt;

/// Convergence state of the coupling scheme.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CouplingMode {
    /// Explicit scheme: one exchange per window, never iterated.
    Explicit,
    /// Implicit scheme, current window still iterating.
    ImplicitAwaitingCheckpoint,
    /// Implicit scheme, current window accepted by the service.
    ImplicitConverged,
}

/// Checkpoint actions reported by the service after an `advance`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckpointResponse {
    /// A write-iteration checkpoint is required.
    pub write_required: bool,
    /// A read-iteration checkpoint is required.
    pub read_required: bool,
}

impl CouplingMode {
    /// Mode right after `initialize`.
    ///
    /// A write checkpoint at start-up is the only signal that the scheme is
    /// implicit; the first window then starts iterating.
    pub fn on_initialize(write_required: bool) -> Self {
        if write_required {
            CouplingMode::ImplicitAwaitingCheckpoint
        } else {
            CouplingMode::Explicit
        }
    }

    /// Mode after an `advance`.
    ///
    /// A write checkpoint means the window was accepted, a read checkpoint
    /// means it must be repeated. When the coupling has ended the window is
    /// always reported converged so the host does not wait forever.
    pub fn on_advance(self, response: CheckpointResponse, ongoing: bool) -> Self {
        if self == CouplingMode::Explicit {
            return self;
        }
        let mut next = self;
        if response.write_required {
            next = CouplingMode::ImplicitConverged;
        } else if response.read_required {
            next = CouplingMode::ImplicitAwaitingCheckpoint;
        }
        if !ongoing {
            next = CouplingMode::ImplicitConverged;
        }
        next
    }

    /// Mode after a grid-motion callback.
    ///
    /// A converged implicit window that is still coupled starts the next round
    /// of iterations.
    pub fn on_motion(self, ongoing: bool) -> Self {
        let flags = self.flags(ongoing);
        if flags.convergence && flags.iterate && flags.ongoing {
            CouplingMode::ImplicitAwaitingCheckpoint
        } else {
            self
        }
    }

    /// Rebuild the mode from replicated flags.
    pub fn from_flags(flags: SessionFlags) -> Self {
        match (flags.iterate, flags.convergence) {
            (false, _) => CouplingMode::Explicit,
            (true, true) => CouplingMode::ImplicitConverged,
            (true, false) => CouplingMode::ImplicitAwaitingCheckpoint,
        }
    }

    /// Whether the scheme uses checkpoints.
    #[inline]
    pub fn is_implicit(self) -> bool {
        self != CouplingMode::Explicit
    }

    /// Flags derived from this mode.
    pub fn flags(self, ongoing: bool) -> SessionFlags {
        SessionFlags {
            convergence: self != CouplingMode::ImplicitAwaitingCheckpoint,
            iterate: self.is_implicit(),
            ongoing,
        }
    }
}

impl fmt::Display for CouplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouplingMode::Explicit => f.write_str("explicit"),
            CouplingMode::ImplicitAwaitingCheckpoint => f.write_str("implicit (iterating)"),
            CouplingMode::ImplicitConverged => f.write_str("implicit (converged)"),
        }
    }
}

/// Keys of the host's shared status store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatusKey {
    Convergence,
    Iterate,
    Ongoing,
}

impl StatusKey {
    /// Name of the key in the host's variable store.
    pub const fn as_str(self) -> &'static str {
        match self {
            StatusKey::Convergence => "udf/convergence",
            StatusKey::Iterate => "udf/iterate",
            StatusKey::Ongoing => "udf/ongoing",
        }
    }

    /// All keys, in publication order.
    pub const ALL: [StatusKey; 3] = [StatusKey::Convergence, StatusKey::Iterate, StatusKey::Ongoing];
}

/// Flags the host reads to steer its iteration loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionFlags {
    pub convergence: bool,
    pub iterate: bool,
    pub ongoing: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        CouplingMode::Explicit.flags(true)
    }
}

impl SessionFlags {
    /// Value stored under `key`.
    pub fn get(&self, key: StatusKey) -> bool {
        match key {
            StatusKey::Convergence => self.convergence,
            StatusKey::Iterate => self.iterate,
            StatusKey::Ongoing => self.ongoing,
        }
    }

    /// `(key, value)` pairs as the host stores them, `1` for true.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        StatusKey::ALL
            .into_iter()
            .map(move |k| (k.as_str(), i32::from(self.get(k))))
    }
}

/// Wire form of the replicated session state.
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct FlagWire {
    /// Current timestep limit.
    pub timestep_limit: f64,
    /// `[convergence, iterate, ongoing, _]`, one byte each.
    pub flags: [u8; 8],
}

impl FlagWire {
    pub fn encode(flags: SessionFlags, timestep_limit: f64) -> Self {
        let mut raw = [0u8; 8];
        raw[0] = u8::from(flags.convergence);
        raw[1] = u8::from(flags.iterate);
        raw[2] = u8::from(flags.ongoing);
        Self {
            timestep_limit,
            flags: raw,
        }
    }

    pub fn decode(&self) -> (SessionFlags, f64) {
        let flags = SessionFlags {
            convergence: self.flags[0] != 0,
            iterate: self.flags[1] != 0,
            ongoing: self.flags[2] != 0,
        };
        (flags, self.timestep_limit)
    }
}

static_assertions::assert_eq_size!(FlagWire, [u8; 16]);
