//! Strong handles for host mesh entities and coupling-service vertices.
//!
//! The adapter deals with four distinct identity spaces that must never be mixed:
//! - `NodeId` / `FaceId`: the host solver's own node and face handles,
//! - `RegionId`: the host's id for a dynamic region (a "dynamic thread"),
//! - `VertexId`: the id the coupling service assigns to a registered vertex.
//!
//! `NodeId` and `FaceId` wrap a `NonZeroU64`; 0 is reserved as an invalid value so
//! that `Option<NodeId>` stays pointer-sized.

use std::{fmt, num::NonZeroU64};

use crate::coupling_error::CouplingError;

macro_rules! nonzero_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Creates a new handle from a raw `u64` value.
            ///
            /// # Errors
            /// Returns [`CouplingError::InvalidNodeId`] if `raw == 0`.
            #[inline]
            pub fn new(raw: u64) -> Result<Self, CouplingError> {
                NonZeroU64::new(raw)
                    .map($name)
                    .ok_or(CouplingError::InvalidNodeId)
            }

            /// Wraps an already non-zero value.
            #[inline]
            pub const fn from_nonzero(raw: NonZeroU64) -> Self {
                $name(raw)
            }

            /// Returns the inner `u64` value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.get())
            }
        }
    };
}

nonzero_handle!(
    /// Host-side handle of a mesh node.
    NodeId
);

nonzero_handle!(
    /// Host-side handle of a boundary face (an edge in 2D).
    FaceId
);

/// Host-side id of a dynamic region.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct RegionId(u32);

impl RegionId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        RegionId(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vertex id handed out by the coupling service at mesh registration.
///
/// Layout-compatible with `i32` so that a `&[VertexId]` can be passed to a
/// C coupling library without copying.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    bytemuck::Pod,
    bytemuck::Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct VertexId(pub i32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
