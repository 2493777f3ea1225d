//! Bounding box spatial index over scene items.
//!
//! Every entry maps a planar envelope to the index of the item in the list
//! that owns it (walls, terrain triangles or sources).

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::Envelope;

#[derive(Debug, Clone)]
struct IndexedBox {
    idx: usize,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;
    #[inline]
    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

fn to_aabb(env: &Envelope) -> AABB<[f64; 2]> {
    AABB::from_corners([env.min_x, env.min_y], [env.max_x, env.max_y])
}

/// Immutable R-tree of item envelopes.
#[derive(Debug, Clone, Default)]
pub struct BoxIndex {
    tree: RTree<IndexedBox>,
}

impl BoxIndex {
    /// Bulk loads `(envelope, item index)` pairs.
    pub fn bulk_load(entries: impl IntoIterator<Item = (Envelope, usize)>) -> Self {
        let boxes: Vec<IndexedBox> = entries
            .into_iter()
            .map(|(env, idx)| IndexedBox {
                idx,
                env: to_aabb(&env),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(boxes),
        }
    }

    /// Indices whose envelope intersects `env`, ascending and without
    /// duplicates.
    pub fn query(&self, env: &Envelope) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(env))
            .map(|b| b.idx)
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Largest item index referenced by the index.
    pub fn max_item(&self) -> Option<usize> {
        self.tree.iter().map(|b| b.idx).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_intersecting_items() {
        let index = BoxIndex::bulk_load(vec![
            (Envelope::new(0.0, 0.0, 1.0, 1.0), 0),
            (Envelope::new(5.0, 5.0, 6.0, 6.0), 1),
            (Envelope::new(0.5, 0.5, 5.5, 5.5), 2),
        ]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.query(&Envelope::new(0.9, 0.9, 0.95, 0.95)), vec![0, 2]);
        assert_eq!(index.query(&Envelope::new(5.8, 5.8, 7.0, 7.0)), vec![1]);
        assert!(index.query(&Envelope::new(10.0, 10.0, 11.0, 11.0)).is_empty());
        assert_eq!(index.max_item(), Some(2));
    }

    #[test]
    fn degenerate_query_boxes_touch() {
        let index = BoxIndex::bulk_load(vec![(Envelope::new(0.0, 0.0, 2.0, 0.0), 7)]);
        assert_eq!(index.query(&Envelope::new(1.0, -1.0, 1.0, 1.0)), vec![7]);
    }

    #[test]
    fn empty_index() {
        let index = BoxIndex::default();
        assert!(index.is_empty());
        assert!(index.query(&Envelope::new(0.0, 0.0, 1.0, 1.0)).is_empty());
        assert_eq!(index.max_item(), None);
    }
}
