//! Isolation Tree
//!
//! Nodes live in a flat arena; children always sit after their parent, so
//! the root is node 0 and a walk can only move forward.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Euler–Mascheroni constant for the harmonic-number approximation
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful BST search over `n` items, c(n)
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Depth limit for a tree grown over `subsample` rows: ceil(log2(psi))
pub fn max_depth_for(subsample: usize) -> usize {
    if subsample <= 1 {
        return 0;
    }
    (subsample as f64).log2().ceil() as usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Rows with `values[feature] <= value` go left
    Split {
        feature: usize,
        value: f64,
        left: u32,
        right: u32,
    },
    /// Residual rows that were not isolated further
    Leaf { size: usize, depth: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<Node>,
    max_depth: usize,
}

impl IsolationTree {
    /// Grow a tree over a bootstrap subsample (drawn with replacement) of `pool`
    pub fn build<R: Rng + ?Sized>(pool: &[FeatureVector], subsample: usize, rng: &mut R) -> Self {
        let mut rows: Vec<usize> = (0..subsample).map(|_| rng.gen_range(0..pool.len())).collect();

        let mut tree = Self {
            nodes: Vec::with_capacity(2 * subsample),
            max_depth: max_depth_for(subsample),
        };
        tree.grow(pool, &mut rows, 0, rng);
        tree
    }

    fn grow<R: Rng + ?Sized>(
        &mut self,
        pool: &[FeatureVector],
        rows: &mut [usize],
        depth: usize,
        rng: &mut R,
    ) -> u32 {
        let id = self.nodes.len() as u32;
        let leaf = Node::Leaf { size: rows.len(), depth };

        if depth >= self.max_depth || rows.len() <= 1 {
            self.nodes.push(leaf);
            return id;
        }

        // Only features that still vary inside this node can split it
        let mut candidates = [(0usize, 0.0f64, 0.0f64); FEATURE_COUNT];
        let mut count = 0;
        for feature in 0..FEATURE_COUNT {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = pool[r].values[feature];
                (lo.min(v), hi.max(v))
            });
            if hi > lo {
                candidates[count] = (feature, lo, hi);
                count += 1;
            }
        }

        if count == 0 {
            self.nodes.push(leaf);
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..count)];
        let value = rng.gen_range(lo..hi);

        // lo <= value < hi, so both sides are non-empty
        let mut mid = 0;
        for i in 0..rows.len() {
            if pool[rows[i]].values[feature] <= value {
                rows.swap(i, mid);
                mid += 1;
            }
        }

        self.nodes.push(leaf);
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.grow(pool, left_rows, depth + 1, rng);
        let right = self.grow(pool, right_rows, depth + 1, rng);
        self.nodes[id as usize] = Node::Split { feature, value, left, right };
        id
    }

    /// Path length h(x): edges to the leaf plus c(leaf size)
    pub fn path_length(&self, vector: &FeatureVector) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Split { feature, value, left, right } => {
                    let next = if vector.values[*feature] <= *value { *left } else { *right };
                    idx = next as usize;
                }
                Node::Leaf { size, depth } => {
                    return *depth as f64 + average_path_length(*size);
                }
            }
        }
    }

    /// Add, per feature, how much of the subsample the splits on the path of
    /// `vector` cut away: log2(rows at the node / rows in the child taken).
    pub fn isolation_credit(&self, vector: &FeatureVector, credit: &mut [f64; FEATURE_COUNT]) {
        let sizes = self.subtree_sizes();
        let mut idx = 0usize;
        while let Node::Split { feature, value, left, right } = &self.nodes[idx] {
            let next = (if vector.values[*feature] <= *value { *left } else { *right }) as usize;
            if sizes[next] > 0 {
                credit[*feature] += (sizes[idx] as f64 / sizes[next] as f64).log2();
            }
            idx = next;
        }
    }

    /// Subsample rows under each node; children sit after parents
    fn subtree_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            sizes[i] = match &self.nodes[i] {
                Node::Leaf { size, .. } => *size,
                Node::Split { left, right, .. } => sizes[*left as usize] + sizes[*right as usize],
            };
        }
        sizes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Deepest leaf actually reached while growing
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Leaf { depth, .. } => Some(*depth),
                Node::Split { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Structural check for trees that come from outside (snapshots)
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(EngineError::InvalidConfig("isolation tree has no nodes".to_string()));
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split { feature, value, left, right } = node {
                let (l, r) = (*left as usize, *right as usize);
                let child_out_of_order = l <= i || r <= i || l >= len || r >= len;
                if *feature >= FEATURE_COUNT || !value.is_finite() || child_out_of_order {
                    return Err(EngineError::InvalidConfig(format!(
                        "isolation tree node {} is malformed",
                        i
                    )));
                }
            }
        }
        Ok(())
    }
}
