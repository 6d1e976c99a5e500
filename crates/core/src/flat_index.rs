use serde::{Deserialize, Serialize};

/// Exact nearest-neighbour index over a row-major `f32` matrix, compared by
/// Euclidean distance. Rows keep insertion order, so row `i` is the `i`-th
/// vector added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlatL2Index {
    dimension: u32,
    data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    /// Squared Euclidean distance.
    pub distance: f32,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension as u32,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension as usize
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one row. Returns `false` and leaves the index unchanged when the
    /// vector length differs from the index dimension.
    pub fn add(&mut self, vector: &[f32]) -> bool {
        if vector.len() != self.dimension() {
            return false;
        }
        self.data.extend_from_slice(vector);
        true
    }

    pub fn row(&self, position: usize) -> Option<&[f32]> {
        let dimension = self.dimension();
        let start = position.checked_mul(dimension)?;
        self.data.get(start..start + dimension)
    }

    /// The `k` rows closest to `query`, nearest first. Ties keep the lower
    /// position first. Returns nothing when the query length is wrong.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if query.len() != self.dimension() || k == 0 || self.dimension == 0 {
            return Vec::new();
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension())
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .collect();

        neighbors.sort_by(|left, right| {
            left.distance
                .total_cmp(&right.distance)
                .then_with(|| left.position.cmp(&right.position))
        });
        neighbors.truncate(k);
        neighbors
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(left, right)| {
            let delta = left - right;
            delta * delta
        })
        .sum()
}
