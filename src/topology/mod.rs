//! Host-mesh facing types: handles, marks, region tagging and the host contract.

pub mod marks;
pub mod memory;
pub mod mesh;
pub mod point;
pub mod region;

pub use marks::NodeMark;
pub use memory::InMemoryMesh;
pub use mesh::{FaceLoads, HostMesh, RegionInfo};
pub use point::{FaceId, NodeId, RegionId, VertexId};
pub use region::{DEFAULT_REGION_ROLE, RegionDescriptor, RegionRole, classify_regions};
