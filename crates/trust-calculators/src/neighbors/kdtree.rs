use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayView1};

/// One result of a k-nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row index into the indexed point set.
    pub index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct Node {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Candidate ordered by (squared distance, index) so that equal distances
/// resolve to the lower index.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist2: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist2
            .total_cmp(&other.dist2)
            .then(self.index.cmp(&other.index))
    }
}

/// Static k-d tree over the rows of a feature matrix (Euclidean metric).
///
/// Each split uses the axis of widest spread among the points in the subtree
/// and the median point along it.
#[derive(Debug, Clone)]
pub struct KdTree {
    points: Array2<f64>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl KdTree {
    pub fn new(points: Array2<f64>) -> Self {
        let mut tree = KdTree {
            nodes: Vec::with_capacity(points.nrows()),
            root: None,
            points,
        };
        let mut indices: Vec<usize> = (0..tree.points.nrows()).collect();
        tree.root = tree.build(&mut indices);
        tree
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    fn coord(&self, row: usize, axis: usize) -> f64 {
        if self.points.ncols() == 0 {
            0.0
        } else {
            self.points[(row, axis)]
        }
    }

    fn widest_axis(&self, indices: &[usize]) -> usize {
        let mut best_axis = 0;
        let mut best_spread = f64::NEG_INFINITY;
        for axis in 0..self.points.ncols() {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in indices {
                let v = self.points[(i, axis)];
                lo = lo.min(v);
                hi = hi.max(v);
            }
            if hi - lo > best_spread {
                best_spread = hi - lo;
                best_axis = axis;
            }
        }
        best_axis
    }

    fn build(&mut self, indices: &mut [usize]) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let axis = self.widest_axis(indices);
        indices.sort_unstable_by(|&a, &b| {
            self.coord(a, axis)
                .total_cmp(&self.coord(b, axis))
                .then(a.cmp(&b))
        });
        let mid = indices.len() / 2;
        let point = indices[mid];

        let node_id = self.nodes.len();
        self.nodes.push(Node {
            point,
            axis,
            left: None,
            right: None,
        });

        let (left_half, rest) = indices.split_at_mut(mid);
        let left = self.build(left_half);
        let right = self.build(&mut rest[1..]);
        self.nodes[node_id].left = left;
        self.nodes[node_id].right = right;
        Some(node_id)
    }

    fn dist2(&self, row: usize, query: &ArrayView1<f64>) -> f64 {
        self.points
            .row(row)
            .iter()
            .zip(query.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// The `k` nearest indexed rows to `query`, closest first. Fewer than `k`
    /// results are returned when the tree holds fewer points.
    pub fn nearest(&self, query: ArrayView1<f64>, k: usize) -> Vec<Neighbor> {
        let k = k.min(self.len());
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = self.root {
            self.search(root, &query, k, &mut heap);
        }
        let mut found = heap.into_sorted_vec();
        found.truncate(k);
        found
            .into_iter()
            .map(|c| Neighbor {
                index: c.index,
                distance: c.dist2.sqrt(),
            })
            .collect()
    }

    fn search(
        &self,
        node_id: usize,
        query: &ArrayView1<f64>,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_id];
        let candidate = Candidate {
            dist2: self.dist2(node.point, query),
            index: node.point,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }

        let diff = if self.points.ncols() == 0 {
            0.0
        } else {
            query[node.axis] - self.coord(node.point, node.axis)
        };
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, k, heap);
        }
        if let Some(far) = far {
            // `<=` keeps equidistant points with a lower index reachable.
            let must_visit = heap.len() < k
                || heap.peek().map_or(true, |worst| diff * diff <= worst.dist2);
            if must_visit {
                self.search(far, query, k, heap);
            }
        }
    }
}
