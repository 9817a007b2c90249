//! Re-export public algorithms.

pub mod communicator;
pub mod consistency;
pub mod exchange;
pub mod registry;

pub use consistency::{check_read_positions, check_write_positions};
pub use exchange::{GatherReport, ScatterReport, gather_forces, scatter_displacements};
pub use registry::{count_region_nodes, owned_region_nodes, region_nodes, register_mesh};
