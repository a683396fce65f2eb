//! Spatial index used for nearest-neighbour trust and the k-NN classifier.
pub mod kdtree;

pub use kdtree::{KdTree, Neighbor};
