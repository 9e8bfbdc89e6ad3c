use palmer_core::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

fn check_lengths(a: usize, b: usize) -> PipelineResult<()> {
    if a != b {
        return Err(PipelineError::ShapeMismatch {
            expected: vec![a],
            got: vec![b],
        });
    }
    if a == 0 {
        return Err(PipelineError::empty("no predictions to score"));
    }
    Ok(())
}

/// Compute accuracy: fraction of correct predictions, always in `[0, 1]`.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> PipelineResult<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Confusion matrix of shape `[n_classes][n_classes]`; rows are true labels,
/// columns predicted labels.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> PipelineResult<Vec<Vec<usize>>> {
    check_lengths(y_true.len(), y_pred.len())?;
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t >= n_classes || p >= n_classes {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![n_classes],
                got: vec![t.max(p) + 1],
            });
        }
        matrix[t][p] += 1;
    }
    Ok(matrix)
}

/// Precision for a specific class.
pub fn precision_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let predicted = y_pred.iter().filter(|&&p| p == class).count();
    let tp = y_true
        .iter()
        .zip(y_pred)
        .filter(|(&t, &p)| p == class && t == class)
        .count();
    if predicted == 0 {
        0.0
    } else {
        tp as f64 / predicted as f64
    }
}

/// Recall for a specific class.
pub fn recall_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let actual = y_true.iter().filter(|&&t| t == class).count();
    let tp = y_true
        .iter()
        .zip(y_pred)
        .filter(|(&t, &p)| p == class && t == class)
        .count();
    if actual == 0 {
        0.0
    } else {
        tp as f64 / actual as f64
    }
}

/// F1 score for a specific class.
pub fn f1_score_class(y_true: &[usize], y_pred: &[usize], class: usize) -> f64 {
    let p = precision_class(y_true, y_pred, class);
    let r = recall_class(y_true, y_pred, class);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// One operating point of a ROC curve.
///
/// `threshold` is `None` for the origin, where nothing is predicted positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub threshold: Option<f64>,
    pub fpr: f64,
    pub tpr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

/// ROC curve for binary labels, class 1 being positive.
///
/// Thresholds sweep the distinct scores from high to low; a row counts as
/// positive when its score is at or above the threshold. The curve starts at
/// (0, 0) and ends at (1, 1); the area uses the trapezoidal rule.
pub fn roc_curve(y_true: &[usize], y_scores: &[f64]) -> PipelineResult<RocCurve> {
    check_lengths(y_true.len(), y_scores.len())?;
    if let Some((row, bad)) = y_true.iter().enumerate().find(|(_, t)| **t > 1) {
        return Err(PipelineError::MalformedRow {
            row,
            reason: format!("binary labels required, found class {}", bad),
        });
    }
    if let Some((row, bad)) = y_scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
        return Err(PipelineError::MalformedRow {
            row,
            reason: format!("score {} is not finite", bad),
        });
    }
    let total_pos = y_true.iter().filter(|&&t| t == 1).count() as f64;
    let total_neg = y_true.len() as f64 - total_pos;
    if total_pos == 0.0 || total_neg == 0.0 {
        return Err(PipelineError::empty(
            "ROC needs both positive and negative samples",
        ));
    }

    let mut pairs: Vec<(f64, usize)> = y_scores.iter().copied().zip(y_true.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut points = vec![RocPoint {
        threshold: None,
        fpr: 0.0,
        tpr: 0.0,
    }];
    let (mut tp, mut fp) = (0.0, 0.0);
    let mut auc = 0.0;

    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].0;
        while i < pairs.len() && pairs[i].0.total_cmp(&threshold).is_eq() {
            if pairs[i].1 == 1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        let prev = &points[points.len() - 1];
        let (tpr, fpr) = (tp / total_pos, fp / total_neg);
        auc += (fpr - prev.fpr) * (tpr + prev.tpr) / 2.0;
        points.push(RocPoint {
            threshold: Some(threshold),
            fpr,
            tpr,
        });
    }

    Ok(RocCurve { points, auc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use palmer_core::ErrorKind;

    #[test]
    fn test_accuracy() {
        let acc = accuracy(&[0, 1, 2, 1, 0], &[0, 1, 2, 0, 0]).unwrap();
        assert_abs_diff_eq!(acc, 0.8, epsilon = 1e-10);
        assert!(accuracy(&[0, 1], &[0]).is_err());
        assert!(accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = confusion_matrix(&[0, 0, 1, 1], &[0, 1, 0, 1], 2).unwrap();
        assert_eq!(cm[0][0], 1); // TN
        assert_eq!(cm[0][1], 1); // FP
        assert_eq!(cm[1][0], 1); // FN
        assert_eq!(cm[1][1], 1); // TP
        assert!(confusion_matrix(&[0, 2], &[0, 1], 2).is_err());
    }

    #[test]
    fn test_precision_recall() {
        let y_true = [1, 1, 0, 0, 1];
        let y_pred = [1, 0, 0, 1, 1];
        // TP=2, FP=1, FN=1 → P=2/3, R=2/3
        assert_abs_diff_eq!(precision_class(&y_true, &y_pred, 1), 2.0 / 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(recall_class(&y_true, &y_pred, 1), 2.0 / 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(f1_score_class(&y_true, &y_pred, 1), 2.0 / 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_roc_perfect_separation() {
        let roc = roc_curve(&[0, 0, 1, 1], &[0.1, 0.4, 0.6, 0.8]).unwrap();
        assert_abs_diff_eq!(roc.auc, 1.0, epsilon = 1e-12);
        let first = &roc.points[0];
        let last = roc.points.last().unwrap();
        assert_eq!((first.fpr, first.tpr), (0.0, 0.0));
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
        assert_eq!(last.threshold, Some(0.1));
    }

    #[test]
    fn test_roc_tied_scores() {
        // All scores equal: a single step straight to (1, 1).
        let roc = roc_curve(&[0, 1, 0, 1], &[0.6; 4]).unwrap();
        assert_eq!(roc.points.len(), 2);
        assert_abs_diff_eq!(roc.auc, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_roc_thresholds_descend() {
        let roc = roc_curve(&[1, 0, 1, 0, 1], &[0.8, 0.6, 0.4, 0.2, 1.0]).unwrap();
        let thresholds: Vec<f64> = roc.points.iter().filter_map(|p| p.threshold).collect();
        assert!(thresholds.windows(2).all(|w| w[0] > w[1]));
        assert!(roc.points.windows(2).all(|w| w[1].fpr >= w[0].fpr && w[1].tpr >= w[0].tpr));
    }

    #[test]
    fn test_roc_requires_binary() {
        assert!(roc_curve(&[0, 0], &[0.1, 0.2]).is_err());
        let err = roc_curve(&[0, 2], &[0.1, 0.2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(matches!(err, PipelineError::MalformedRow { row: 1, .. }));
    }

    #[test]
    fn test_roc_rejects_non_finite_scores() {
        let err = roc_curve(&[0, 1, 1], &[0.2, f64::NAN, 0.9]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(matches!(err, PipelineError::MalformedRow { row: 1, .. }));
        assert!(roc_curve(&[0, 1], &[f64::INFINITY, 0.3]).is_err());
    }
}
