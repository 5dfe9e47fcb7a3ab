//! Least-squares regression trees grown level by level.
//!
//! Trees follow the `x[feature] <= threshold -> left` convention. Growing is
//! deterministic: candidate features are scanned in column order, rows in a
//! stable presorted order, and only strictly better splits replace the
//! current best.

use serde::{Deserialize, Serialize};

use crate::domain::FEATURE_COUNT;

/// Minimum squared-error reduction per sample for a split to be kept.
const MIN_GAIN_PER_SAMPLE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted regression tree stored as a node arena (root at index 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Value of the leaf reached by `row`.
    #[must_use]
    pub fn predict(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[feature] <= threshold { left } else { right },
                Node::Leaf { value } => return value,
            }
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of edges on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
                Node::Leaf { .. } => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub(crate) fn set_leaf_value(&mut self, idx: usize, new_value: f64) {
        if let Node::Leaf { value } = &mut self.nodes[idx] {
            *value = new_value;
        }
    }
}

/// A freshly grown tree plus the leaf each training row landed in.
///
/// Leaf values are left at zero; the caller fills them in.
pub(crate) struct GrownTree {
    pub tree: RegressionTree,
    pub assignment: Vec<usize>,
}

/// Row indices sorted by value, one list per feature.
pub(crate) fn presort(rows: &[[f64; FEATURE_COUNT]]) -> Vec<Vec<usize>> {
    (0..FEATURE_COUNT)
        .map(|feature| {
            let mut order: Vec<usize> = (0..rows.len()).collect();
            order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));
            order
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct NodeStats {
    count: usize,
    sum: f64,
}

impl NodeStats {
    fn score(&self) -> f64 {
        self.sum * self.sum / self.count as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: NodeStats,
}

/// Grow a least-squares tree on `targets` up to `max_depth` levels.
pub(crate) fn grow(
    rows: &[[f64; FEATURE_COUNT]],
    sorted: &[Vec<usize>],
    targets: &[f64],
    max_depth: usize,
) -> GrownTree {
    let n = rows.len();
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut stats = vec![NodeStats {
        count: n,
        sum: targets.iter().sum(),
    }];
    let mut assignment = vec![0usize; n];
    let mut frontier = vec![0usize];

    for _ in 0..max_depth {
        if frontier.is_empty() {
            break;
        }

        let mut slot = vec![usize::MAX; nodes.len()];
        for (k, &node) in frontier.iter().enumerate() {
            slot[node] = k;
        }

        let mut best: Vec<Option<Candidate>> = vec![None; frontier.len()];
        for (feature, order) in sorted.iter().enumerate() {
            let mut left = vec![NodeStats { count: 0, sum: 0.0 }; frontier.len()];
            let mut last = vec![f64::NEG_INFINITY; frontier.len()];

            for &i in order {
                let k = slot[assignment[i]];
                if k == usize::MAX {
                    continue;
                }
                let value = rows[i][feature];

                if left[k].count > 0 && value > last[k] {
                    let total = stats[frontier[k]];
                    let right = NodeStats {
                        count: total.count - left[k].count,
                        sum: total.sum - left[k].sum,
                    };
                    let gain = left[k].score() + right.score() - total.score();
                    let floor = best[k].map_or(MIN_GAIN_PER_SAMPLE * total.count as f64, |b| b.gain);
                    if gain > floor {
                        best[k] = Some(Candidate {
                            feature,
                            threshold: midpoint(last[k], value),
                            gain,
                            left: left[k],
                        });
                    }
                }

                left[k].count += 1;
                left[k].sum += targets[i];
                last[k] = value;
            }
        }

        let mut next = Vec::new();
        for (k, &node) in frontier.iter().enumerate() {
            let Some(candidate) = best[k] else {
                continue;
            };
            let total = stats[node];

            let left = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            stats.push(candidate.left);

            let right = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            stats.push(NodeStats {
                count: total.count - candidate.left.count,
                sum: total.sum - candidate.left.sum,
            });

            nodes[node] = Node::Split {
                feature: candidate.feature,
                threshold: candidate.threshold,
                left,
                right,
            };
            next.push(left);
            next.push(right);
        }

        if next.is_empty() {
            break;
        }

        for (i, node) in assignment.iter_mut().enumerate() {
            if let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = nodes[*node]
            {
                *node = if rows[i][feature] <= threshold { left } else { right };
            }
        }

        frontier = next;
    }

    GrownTree {
        tree: RegressionTree { nodes },
        assignment,
    }
}

/// Threshold strictly between two distinct sorted values, falling back to
/// the lower one when they are adjacent floats.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid >= upper {
        lower
    } else {
        mid
    }
}
