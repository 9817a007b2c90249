//! Role tagging for dynamic regions.
//!
//! The host exposes every dynamic region it knows about; only those whose motion
//! profile carries the coupling role take part in the exchange. Classification
//! runs once per registration and yields an ordered list of
//! [`RegionDescriptor`]s that all later traversals reuse.

use crate::coupling_error::CouplingError;
use crate::topology::mesh::RegionInfo;
use crate::topology::point::RegionId;

/// Default role tag carried by coupled regions.
pub const DEFAULT_REGION_ROLE: &str = "gridmotions";

/// Role of a dynamic region with respect to coupling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionRole {
    /// Region moves with the structure and exchanges data.
    GridMotion,
    /// Any other dynamic region; ignored by the adapter.
    Other,
}

impl RegionRole {
    /// Classify a region name against `role`.
    ///
    /// A region belongs to the role if its name starts with the role tag, so
    /// `gridmotions::udf` and `gridmotions` both match `gridmotions`.
    pub fn classify(name: &str, role: &str) -> Self {
        if !role.is_empty() && name.starts_with(role) {
            RegionRole::GridMotion
        } else {
            RegionRole::Other
        }
    }
}

/// A coupled region, fixed at registration time.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionDescriptor {
    /// Host id.
    pub id: RegionId,
    /// Host name at classification time.
    pub name: String,
    /// Ordinal among coupled regions, in host traversal order.
    pub index: usize,
}

/// Filter the host region list down to coupled regions, preserving order.
///
/// # Errors
/// Returns [`CouplingError::NoRegions`] if no region carries `role`.
pub fn classify_regions(
    regions: &[RegionInfo],
    role: &str,
) -> Result<Vec<RegionDescriptor>, CouplingError> {
    let selected: Vec<RegionDescriptor> = regions
        .iter()
        .filter(|r| RegionRole::classify(&r.name, role) == RegionRole::GridMotion)
        .enumerate()
        .map(|(index, r)| RegionDescriptor {
            id: r.id,
            name: r.name.clone(),
            index,
        })
        .collect();
    if selected.is_empty() {
        return Err(CouplingError::NoRegions {
            role: role.to_string(),
        });
    }
    Ok(selected)
}
