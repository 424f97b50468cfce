// THEORY:
// The Side Partitioner decides which markers belong to the left edge of the
// corridor and which to the right. The default strategy is deliberately simple:
// sort by x and cut the list in half. It assumes the cones form two roughly
// separated vertical bands and does not look at the gap between them, so an
// uneven number of cones per side shifts markers across the cut. That is a
// known limitation of the heuristic, which is why the split is a pluggable
// `PartitionStrategy` rather than a fixed step.

use crate::core_modules::center_point::CenterPoint;

/// The two halves of a partitioned centroid set, each ordered by x ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideGroups {
    pub left: Vec<CenterPoint>,
    pub right: Vec<CenterPoint>,
}

impl SideGroups {
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Splits a set of centroids into left and right groups.
///
/// Implementations must not drop or duplicate points: the two groups together
/// are exactly the input multiset.
pub trait PartitionStrategy: Send + Sync {
    fn partition(&self, centers: Vec<CenterPoint>) -> SideGroups;
}

impl<F> PartitionStrategy for F
where
    F: Fn(Vec<CenterPoint>) -> SideGroups + Send + Sync,
{
    fn partition(&self, centers: Vec<CenterPoint>) -> SideGroups {
        self(centers)
    }
}

/// Stable sort by x, then cut at `len / 2`. With an odd count the right group
/// receives the extra point.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidpointSplit;

impl PartitionStrategy for MidpointSplit {
    fn partition(&self, mut centers: Vec<CenterPoint>) -> SideGroups {
        centers.sort_by_key(|center| center.x);
        let right = centers.split_off(centers.len() / 2);
        SideGroups {
            left: centers,
            right,
        }
    }
}

/// Partitions with the default midpoint split.
pub fn partition(centers: Vec<CenterPoint>) -> SideGroups {
    MidpointSplit.partition(centers)
}
