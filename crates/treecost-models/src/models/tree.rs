//! Regression trees grown on squared-error gradients.
//!
//! Trees are grown level by level with the exact greedy algorithm: every
//! feature is scanned once per level in presorted order, and each row feeds
//! the split statistics of the node it currently sits in.
use ndarray::{Array2, ArrayView1};

const UNASSIGNED: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// Rows with `value < threshold` go left; everything else, NaN included, goes right.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Feature index of every split node.
    pub fn split_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            TreeNode::Split { feature, .. } => Some(*feature),
            TreeNode::Leaf { .. } => None,
        })
    }

    pub fn predict_row(&self, row: ArrayView1<f32>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Parameters shared by every tree of an ensemble.
#[derive(Debug, Clone, Copy)]
pub struct GrowParams {
    pub max_depth: u32,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
}

impl GrowParams {
    /// Leaf weight minimizing the second-order loss approximation.
    fn leaf_weight(&self, grad: f64, hess: f64) -> f64 {
        -grad / (hess + self.reg_lambda) * self.learning_rate
    }

    fn score(&self, grad: f64, hess: f64) -> f64 {
        grad * grad / (hess + self.reg_lambda)
    }

    fn gain(&self, left: (f64, f64), parent: (f64, f64)) -> f64 {
        let right = (parent.0 - left.0, parent.1 - left.1);
        0.5 * (self.score(left.0, left.1) + self.score(right.0, right.1)
            - self.score(parent.0, parent.1))
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    gain: f64,
    left_grad: f64,
    left_hess: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    grad: f64,
    hess: f64,
    last: Option<f32>,
}

/// Grows trees over a fixed feature matrix.
pub struct TreeGrower<'a> {
    x: &'a Array2<f32>,
    /// Per feature: row indices with a non-NaN value, ascending by value.
    sorted: Vec<Vec<usize>>,
    params: GrowParams,
}

impl<'a> TreeGrower<'a> {
    pub fn new(x: &'a Array2<f32>, params: GrowParams) -> Self {
        let sorted = (0..x.ncols())
            .map(|feature| {
                let column = x.column(feature);
                let mut rows: Vec<usize> = (0..x.nrows()).filter(|&r| !column[r].is_nan()).collect();
                rows.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
                rows
            })
            .collect();
        TreeGrower { x, sorted, params }
    }

    /// Grow one tree on `rows` for the given per-row gradients and hessians.
    pub fn grow(&self, grad: &[f64], hess: &[f64], rows: &[usize]) -> RegressionTree {
        let mut position = vec![UNASSIGNED; self.x.nrows()];
        for &r in rows {
            position[r] = 0;
        }

        let root = rows
            .iter()
            .fold((0.0, 0.0), |acc, &r| (acc.0 + grad[r], acc.1 + hess[r]));
        let mut stats: Vec<(f64, f64)> = vec![root];
        let mut nodes = vec![TreeNode::Leaf { value: 0.0 }];
        let mut frontier = vec![0usize];

        for _depth in 0..self.params.max_depth {
            if frontier.is_empty() {
                break;
            }

            let best = self.find_splits(&frontier, &position, &stats, grad, hess);

            let mut next_frontier = Vec::new();
            for (slot, &node) in frontier.iter().enumerate() {
                let Some(candidate) = best[slot] else {
                    continue;
                };
                let (grad_sum, hess_sum) = stats[node];
                let left = nodes.len();
                let right = left + 1;
                nodes.push(TreeNode::Leaf { value: 0.0 });
                nodes.push(TreeNode::Leaf { value: 0.0 });
                stats.push((candidate.left_grad, candidate.left_hess));
                stats.push((grad_sum - candidate.left_grad, hess_sum - candidate.left_hess));
                nodes[node] = TreeNode::Split {
                    feature: candidate.feature,
                    threshold: candidate.threshold,
                    left,
                    right,
                };
                next_frontier.push(left);
                next_frontier.push(right);
            }

            for &r in rows {
                if let TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } = nodes[position[r]]
                {
                    position[r] = if self.x[[r, feature]] < threshold {
                        left
                    } else {
                        right
                    };
                }
            }

            frontier = next_frontier;
        }

        for (node, &(grad_sum, hess_sum)) in nodes.iter_mut().zip(&stats) {
            if let TreeNode::Leaf { value } = node {
                *value = self.params.leaf_weight(grad_sum, hess_sum);
            }
        }

        RegressionTree { nodes }
    }

    /// Best split per frontier node, `None` when no split improves the loss.
    fn find_splits(
        &self,
        frontier: &[usize],
        position: &[usize],
        stats: &[(f64, f64)],
        grad: &[f64],
        hess: &[f64],
    ) -> Vec<Option<SplitCandidate>> {
        let mut node_slot = vec![UNASSIGNED; stats.len()];
        for (slot, &node) in frontier.iter().enumerate() {
            node_slot[node] = slot;
        }

        let mut best: Vec<Option<SplitCandidate>> = vec![None; frontier.len()];
        for (feature, rows) in self.sorted.iter().enumerate() {
            let mut scan = vec![ScanState::default(); frontier.len()];
            for &r in rows {
                let node = position[r];
                if node == UNASSIGNED || node_slot[node] == UNASSIGNED {
                    continue;
                }
                let slot = node_slot[node];
                let value = self.x[[r, feature]];
                let state = &mut scan[slot];

                if let Some(last) = state.last {
                    if value > last {
                        let parent = stats[node];
                        let left = (state.grad, state.hess);
                        let right_hess = parent.1 - left.1;
                        if left.1 >= self.params.min_child_weight
                            && right_hess >= self.params.min_child_weight
                        {
                            let gain = self.params.gain(left, parent);
                            let improves = match &best[slot] {
                                Some(current) => gain > current.gain,
                                None => gain > 0.0,
                            };
                            if improves {
                                best[slot] = Some(SplitCandidate {
                                    feature,
                                    threshold: value,
                                    gain,
                                    left_grad: left.0,
                                    left_hess: left.1,
                                });
                            }
                        }
                    }
                }

                state.grad += grad[r];
                state.hess += hess[r];
                state.last = Some(value);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GrowParams {
        GrowParams {
            max_depth: 3,
            min_child_weight: 1.0,
            reg_lambda: 0.0,
            learning_rate: 1.0,
        }
    }

    #[test]
    fn test_single_split_on_step_function() {
        // target is 0 for x < 5 and 10 above; gradient = 0 - target
        let x = Array2::from_shape_fn((10, 1), |(r, _)| r as f32);
        let grad: Vec<f64> = (0..10).map(|r| if r < 5 { 0.0 } else { -10.0 }).collect();
        let hess = vec![1.0; 10];
        let rows: Vec<usize> = (0..10).collect();

        let tree = TreeGrower::new(&x, params()).grow(&grad, &hess, &rows);
        assert_eq!(tree.split_features().count(), 1);
        assert_eq!(tree.predict_row(x.row(2)), 0.0);
        assert_eq!(tree.predict_row(x.row(7)), 10.0);
    }

    #[test]
    fn test_constant_gradient_gives_single_leaf() {
        let x = Array2::from_shape_fn((6, 2), |(r, c)| (r + c) as f32);
        let grad = vec![-2.0; 6];
        let hess = vec![1.0; 6];
        let rows: Vec<usize> = (0..6).collect();
        let p = GrowParams {
            reg_lambda: 1.0,
            ..params()
        };

        let tree = TreeGrower::new(&x, p).grow(&grad, &hess, &rows);
        assert_eq!(tree.nodes().len(), 1);
        assert!((tree.predict_row(x.row(0)) - 12.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_follows_right_branch() {
        let mut x = Array2::from_shape_fn((8, 1), |(r, _)| r as f32);
        x[[7, 0]] = f32::NAN;
        let grad: Vec<f64> = (0..8).map(|r| if r < 4 { 1.0 } else { -1.0 }).collect();
        let hess = vec![1.0; 8];
        let rows: Vec<usize> = (0..8).collect();

        let tree = TreeGrower::new(&x, params()).grow(&grad, &hess, &rows);
        let nan_row = ndarray::arr1(&[f32::NAN]);
        let high_row = ndarray::arr1(&[6.0f32]);
        assert_eq!(tree.predict_row(nan_row.view()), tree.predict_row(high_row.view()));
    }

    #[test]
    fn test_depth_limit_respected() {
        let x = Array2::from_shape_fn((64, 1), |(r, _)| r as f32);
        let grad: Vec<f64> = (0..64).map(|r| -(r as f64)).collect();
        let hess = vec![1.0; 64];
        let rows: Vec<usize> = (0..64).collect();
        let p = GrowParams {
            max_depth: 2,
            ..params()
        };

        let tree = TreeGrower::new(&x, p).grow(&grad, &hess, &rows);
        assert!(tree.n_leaves() <= 4);
    }
}
