//! RegionAtlas: mapping coupled regions to contiguous spans of the exchange buffers.
//!
//! Every coupled region owns one slice of the flat buffers: its vertices are
//! stored back to back, and regions follow each other in traversal order. The
//! atlas records, for each region, its node count and the offset of its first
//! vertex; the offset of region *r* is always the prefix sum of the counts of
//! regions `0..r`.

use std::ops::Range;

use hashbrown::HashMap;

use crate::coupling_error::CouplingError;
use crate::data::DebugInvariants;
use crate::topology::point::RegionId;

/// Span of a single region inside the exchange buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionSpan {
    /// Host id of the region.
    pub region: RegionId,
    /// Index of the first vertex of the region.
    pub offset: usize,
    /// Number of vertices the region contributes.
    pub count: usize,
}

impl RegionSpan {
    /// Vertex range covered by this span.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// `RegionAtlas` maintains:
/// - the ordered list of region spans,
/// - a lookup from host `RegionId` to its ordinal,
/// - and `total_len`, the total number of vertices.
///
/// # Invariants
///
/// - Each region appears exactly once.
/// - Offsets are contiguous in insertion order and `total_len` equals the sum
///   of all counts.
///
/// Unlike a general point atlas, zero-sized spans are allowed: a coupled
/// region may legitimately have no principal faces on this process.
///
/// Serialized form is the span list alone; the lookup is rebuilt on load.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(into = "Vec<RegionSpan>", try_from = "Vec<RegionSpan>")]
pub struct RegionAtlas {
    spans: Vec<RegionSpan>,
    lookup: HashMap<RegionId, usize>,
    total_len: usize,
    version: u64,
}

impl RegionAtlas {
    /// Build an atlas from `(region, count)` pairs in traversal order.
    pub fn from_counts<I>(counts: I) -> Result<Self, CouplingError>
    where
        I: IntoIterator<Item = (RegionId, usize)>,
    {
        let mut atlas = RegionAtlas::default();
        for (region, count) in counts {
            atlas.try_insert(region, count)?;
        }
        Ok(atlas)
    }

    /// Append `region` with `count` vertices and return its offset.
    ///
    /// # Errors
    /// Returns `Err(DuplicateRegion)` if `region` is already present.
    pub fn try_insert(&mut self, region: RegionId, count: usize) -> Result<usize, CouplingError> {
        if self.lookup.contains_key(&region) {
            return Err(CouplingError::DuplicateRegion(region));
        }
        let offset = self.total_len;
        self.lookup.insert(region, self.spans.len());
        self.spans.push(RegionSpan {
            region,
            offset,
            count,
        });
        self.total_len += count;
        self.version = self.version.wrapping_add(1);
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        self.debug_assert_invariants();
        Ok(offset)
    }

    /// Offset of the region at ordinal `index`.
    #[inline]
    pub fn offset_of(&self, index: usize) -> Option<usize> {
        self.spans.get(index).map(|s| s.offset)
    }

    /// Vertex count of the region at ordinal `index`.
    #[inline]
    pub fn count_of(&self, index: usize) -> Option<usize> {
        self.spans.get(index).map(|s| s.count)
    }

    /// Span of the region at ordinal `index`.
    #[inline]
    pub fn span(&self, index: usize) -> Option<RegionSpan> {
        self.spans.get(index).copied()
    }

    /// Ordinal of the region with host id `region`.
    #[inline]
    pub fn index_of(&self, region: RegionId) -> Option<usize> {
        self.lookup.get(&region).copied()
    }

    /// Number of regions.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether no region is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Total number of vertices over all regions.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Monotonic version that changes whenever the atlas structure changes.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Spans in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = &RegionSpan> + '_ {
        self.spans.iter()
    }
}

impl From<RegionAtlas> for Vec<RegionSpan> {
    fn from(atlas: RegionAtlas) -> Self {
        atlas.spans
    }
}

impl TryFrom<Vec<RegionSpan>> for RegionAtlas {
    type Error = CouplingError;

    fn try_from(spans: Vec<RegionSpan>) -> Result<Self, Self::Error> {
        let atlas = RegionAtlas::from_counts(spans.iter().map(|s| (s.region, s.count)))?;
        atlas.validate_invariants()?;
        // stored offsets must agree with the rebuilt prefix sums
        if let Some((stored, rebuilt)) = spans.iter().zip(atlas.iter()).find(|(a, b)| a != b) {
            return Err(CouplingError::InvalidLayout {
                expected: rebuilt.offset,
                found: stored.offset,
            });
        }
        Ok(atlas)
    }
}

impl DebugInvariants for RegionAtlas {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "RegionAtlas invalid");
    }

    fn validate_invariants(&self) -> Result<(), CouplingError> {
        if self.lookup.len() != self.spans.len() {
            // some region was inserted twice
            let mut seen = hashbrown::HashSet::new();
            if let Some(dup) = self.spans.iter().map(|s| s.region).find(|r| !seen.insert(*r)) {
                return Err(CouplingError::DuplicateRegion(dup));
            }
        }
        let mut expected = 0usize;
        for (index, span) in self.spans.iter().enumerate() {
            if self.lookup.get(&span.region) != Some(&index) || span.offset != expected {
                return Err(CouplingError::InvalidLayout {
                    expected,
                    found: span.offset,
                });
            }
            expected += span.count;
        }
        if expected != self.total_len {
            return Err(CouplingError::InvalidLayout {
                expected,
                found: self.total_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(raw: u32) -> RegionId {
        RegionId::new(raw)
    }

    #[test]
    fn offsets_are_prefix_sums() {
        let atlas = RegionAtlas::from_counts([(rid(4), 3), (rid(9), 2)]).unwrap();
        assert_eq!(atlas.offset_of(0), Some(0));
        assert_eq!(atlas.offset_of(1), Some(3));
        assert_eq!(atlas.count_of(1), Some(2));
        assert_eq!(atlas.total_len(), 5);
        assert_eq!(atlas.span(1).unwrap().range(), 3..5);
        assert_eq!(atlas.index_of(rid(9)), Some(1));
        assert_eq!(atlas.offset_of(2), None);
    }

    #[test]
    fn zero_sized_regions_are_allowed() {
        let atlas = RegionAtlas::from_counts([(rid(1), 0), (rid(2), 4), (rid(3), 0)]).unwrap();
        assert_eq!(atlas.offset_of(1), Some(0));
        assert_eq!(atlas.offset_of(2), Some(4));
        assert_eq!(atlas.total_len(), 4);
        assert!(atlas.validate_invariants().is_ok());
    }

    #[test]
    fn duplicate_region_rejected() {
        let mut atlas = RegionAtlas::default();
        atlas.try_insert(rid(1), 2).unwrap();
        assert_eq!(
            atlas.try_insert(rid(1), 5),
            Err(CouplingError::DuplicateRegion(rid(1)))
        );
        assert_eq!(atlas.len(), 1);
        assert_eq!(atlas.total_len(), 2);
    }

    #[test]
    fn version_bumps_on_insert() {
        let mut atlas = RegionAtlas::default();
        let v0 = atlas.version();
        atlas.try_insert(rid(1), 1).unwrap();
        assert_ne!(atlas.version(), v0);
    }

    #[test]
    fn corrupted_offset_fails_validation() {
        let mut atlas = RegionAtlas::from_counts([(rid(1), 2), (rid(2), 2)]).unwrap();
        atlas.spans[1].offset = 3;
        assert!(matches!(
            atlas.validate_invariants(),
            Err(CouplingError::InvalidLayout { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn gapped_offsets_are_rejected_on_load() {
        let json = r#"[{"region":1,"offset":0,"count":2},{"region":2,"offset":7,"count":2}]"#;
        let spans: Vec<RegionSpan> = serde_json::from_str(json).unwrap();
        let err = RegionAtlas::try_from(spans).unwrap_err();
        assert_eq!(err, CouplingError::InvalidLayout { expected: 2, found: 7 });
        assert!(err.is_fatal());
        assert!(serde_json::from_str::<RegionAtlas>(json).is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_order() {
        let atlas = RegionAtlas::from_counts([(rid(5), 3), (rid(6), 2)]).unwrap();
        let ser = serde_json::to_string(&atlas).expect("serialize");
        let de: RegionAtlas = serde_json::from_str(&ser).expect("deserialize");
        assert_eq!(de.iter().copied().collect::<Vec<_>>(), atlas.iter().copied().collect::<Vec<_>>());
        assert_eq!(de.index_of(rid(6)), Some(1));
    }
}
