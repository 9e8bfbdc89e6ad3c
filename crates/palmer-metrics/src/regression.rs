use palmer_core::{PipelineError, PipelineResult};

fn check(y_true: &[f64], y_pred: &[f64]) -> PipelineResult<f64> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: vec![y_true.len()],
            got: vec![y_pred.len()],
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::empty("no predictions to score"));
    }
    Ok(y_true.len() as f64)
}

/// Mean Squared Error.
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> PipelineResult<f64> {
    let n = check(y_true, y_pred)?;
    Ok(y_true.iter().zip(y_pred).map(|(t, p)| (t - p) * (t - p)).sum::<f64>() / n)
}

/// Root Mean Squared Error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> PipelineResult<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean Absolute Error.
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> PipelineResult<f64> {
    let n = check(y_true, y_pred)?;
    Ok(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / n)
}

/// R² (coefficient of determination). A constant target scores 0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> PipelineResult<f64> {
    let n = check(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / n;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();
    if ss_tot == 0.0 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_regression_metrics() {
        let y_true = [3.0, -0.5, 2.0, 7.0];
        let y_pred = [2.5, 0.0, 2.0, 8.0];
        assert_abs_diff_eq!(mse(&y_true, &y_pred).unwrap(), 0.375, epsilon = 1e-12);
        assert_abs_diff_eq!(mae(&y_true, &y_pred).unwrap(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse(&y_true, &y_pred).unwrap(), 0.375f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(r2_score(&y_true, &y_pred).unwrap(), 0.948_608_137, epsilon = 1e-8);
    }

    #[test]
    fn test_perfect_and_empty() {
        assert_abs_diff_eq!(r2_score(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), 1.0, epsilon = 1e-12);
        assert!(mse(&[], &[]).is_err());
    }
}
