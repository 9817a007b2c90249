//! Data module: offset index, exchange buffers and vertex map
#![warn(missing_docs)]

pub mod atlas;
pub mod buffers;
pub mod vector;
pub mod vertex_map;

pub use crate::debug_invariants::DebugInvariants;

pub use atlas::{RegionAtlas, RegionSpan};
pub use buffers::ExchangeBuffers;
pub use vector::{ND, Vec2};
pub use vertex_map::VertexMap;
