use std::collections::BTreeMap;

use cubemark_core::{MarkerId, PixelPoint};
use serde::{Deserialize, Serialize};

/// Projected endpoints of one vertical cube edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerPair {
    pub bottom: PixelPoint,
    pub top: PixelPoint,
}

/// Anchor edges published by the markers seen so far in the current frame.
///
/// A cache lives for exactly one frame: it is created empty, filled while
/// the frame's markers are resolved, and handed back with the frame result.
/// Registering the same identity twice keeps the later edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CornerCache {
    edges: BTreeMap<MarkerId, CornerPair>,
}

impl CornerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MarkerId, pair: CornerPair) -> Option<CornerPair> {
        self.edges.insert(id, pair)
    }

    #[inline]
    pub fn get(&self, id: MarkerId) -> Option<&CornerPair> {
        self.edges.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: MarkerId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &CornerPair)> + '_ {
        self.edges.iter().map(|(id, p)| (*id, p))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn pair(x: i32) -> CornerPair {
        CornerPair {
            bottom: Point2::new(x, 0),
            top: Point2::new(x, -10),
        }
    }

    #[test]
    fn later_registration_wins() {
        let mut cache = CornerCache::new();
        assert!(cache.insert(3, pair(1)).is_none());
        assert_eq!(cache.insert(3, pair(2)), Some(pair(1)));
        assert_eq!(cache.get(3), Some(&pair(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn serializes_as_a_map_of_ids() {
        let mut cache = CornerCache::new();
        cache.insert(1, pair(5));
        let json = serde_json::to_value(&cache).expect("serialize");
        assert_eq!(json["1"]["bottom"], serde_json::json!([5, 0]));
        assert_eq!(json["1"]["top"], serde_json::json!([5, -10]));
    }
}
