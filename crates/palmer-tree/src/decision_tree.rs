use palmer_core::{Matrix, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// A node in the regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    /// Internal node: rows with `feature <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf { value: f64 },
}

/// Decision Tree Regressor using CART (MSE criterion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    tree: Option<TreeNode>,
}

/// Sum and sum of squares, enough to get the squared error of a node.
#[derive(Default, Clone, Copy)]
struct Moments {
    n: f64,
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    fn add(&mut self, v: f64) {
        self.n += 1.0;
        self.sum += v;
        self.sum_sq += v * v;
    }

    fn remove(&mut self, v: f64) {
        self.n -= 1.0;
        self.sum -= v;
        self.sum_sq -= v * v;
    }

    fn sse(&self) -> f64 {
        if self.n == 0.0 {
            0.0
        } else {
            self.sum_sq - self.sum * self.sum / self.n
        }
    }
}

impl DecisionTreeRegressor {
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeRegressor {
            max_depth,
            min_samples_split,
            min_samples_leaf: min_samples_leaf.max(1),
            tree: None,
        }
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> PipelineResult<()> {
        if x.rows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![x.rows()],
                got: vec![y.len()],
            });
        }
        if y.is_empty() {
            return Err(PipelineError::empty("cannot fit a tree on zero rows"));
        }
        let indices: Vec<usize> = (0..y.len()).collect();
        self.tree = Some(self.build_tree(x, y, indices, 0));
        Ok(())
    }

    fn build_tree(&self, x: &Matrix, y: &[f64], indices: Vec<usize>, depth: usize) -> TreeNode {
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;
        if depth >= self.max_depth || indices.len() < self.min_samples_split.max(2) {
            return TreeNode::Leaf { value: mean };
        }

        let data = x.data();
        let cols = x.cols();
        let mut total = Moments::default();
        indices.iter().for_each(|&i| total.add(y[i]));

        // (score, feature, threshold)
        let mut best: Option<(f64, usize, f64)> = None;
        for feature in 0..cols {
            let mut sorted = indices.clone();
            sorted.sort_by(|&a, &b| data[a * cols + feature].total_cmp(&data[b * cols + feature]));

            let mut left = Moments::default();
            let mut right = total;
            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                left.add(y[i]);
                right.remove(y[i]);
                let here = data[i * cols + feature];
                let next = data[sorted[pos + 1] * cols + feature];
                if here == next
                    || (pos + 1) < self.min_samples_leaf
                    || sorted.len() - pos - 1 < self.min_samples_leaf
                {
                    continue;
                }
                let score = left.sse() + right.sse();
                if best.map_or(true, |(s, _, _)| score < s) {
                    best = Some((score, feature, (here + next) / 2.0));
                }
            }
        }

        let Some((score, feature, threshold)) = best else {
            return TreeNode::Leaf { value: mean };
        };
        if score >= total.sse() {
            return TreeNode::Leaf { value: mean };
        }

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[i * cols + feature] <= threshold);

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.build_tree(x, y, left, depth + 1)),
            right: Box::new(self.build_tree(x, y, right, depth + 1)),
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> PipelineResult<f64> {
        let mut node = self.tree.as_ref().ok_or_else(|| PipelineError::NotFitted {
            component: "DecisionTreeRegressor".into(),
        })?;
        loop {
            match node {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split { feature, threshold, left, right } => {
                    let v = row.get(*feature).ok_or_else(|| PipelineError::ShapeMismatch {
                        expected: vec![*feature + 1],
                        got: vec![row.len()],
                    })?;
                    node = if *v <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    pub fn predict(&self, x: &Matrix) -> PipelineResult<Vec<f64>> {
        x.row_iter().map(|row| self.predict_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_tree_regressor() {
        let x = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = [2.0, 4.0, 6.0, 8.0];

        let mut tree = DecisionTreeRegressor::new(10, 2, 1);
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();

        for i in 0..4 {
            assert!((pred[i] - y[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_depth_limit_gives_mean() {
        let x = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let mut stump = DecisionTreeRegressor::new(0, 2, 1);
        stump.fit(&x, &[1.0, 2.0, 3.0, 6.0]).unwrap();
        assert_eq!(stump.predict_row(&[10.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_step_function_split() {
        let x = Matrix::from_rows(&[vec![0.0, 5.0], vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]]).unwrap();
        let mut tree = DecisionTreeRegressor::new(1, 2, 1);
        tree.fit(&x, &[0.0, 0.0, 10.0, 10.0]).unwrap();
        assert_eq!(tree.predict_row(&[0.4, 5.0]).unwrap(), 0.0);
        assert_eq!(tree.predict_row(&[2.6, 5.0]).unwrap(), 10.0);
    }

    #[test]
    fn test_unfitted() {
        let tree = DecisionTreeRegressor::new(3, 2, 1);
        assert!(tree.predict_row(&[1.0]).is_err());
    }
}
