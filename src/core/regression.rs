use std::ops::Range;

/// Straight line fitted by ordinary least squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// One forward-chaining fold: training indices always precede the test block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Closed-form OLS over `(x, y)` pairs.
///
/// With zero variance in `x` (a single observation, or none) the slope is 0 and the
/// intercept is the mean of `y`.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> LinearFit {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return LinearFit {
            slope: 0.0,
            intercept: 0.0,
        };
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    }
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// Unbounded below. When the actual values have no variance the score is 1.0 for a
/// perfect prediction and 0.0 otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }

    let mean = actual[..n].iter().sum::<f64>() / n as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (a, p) in actual[..n].iter().zip(&predicted[..n]) {
        ss_res += (a - p) * (a - p);
        ss_tot += (a - mean) * (a - mean);
    }

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// In-sample R² of `fit` against the points it was fitted on.
pub fn fit_score(fit: &LinearFit, xs: &[f64], ys: &[f64]) -> f64 {
    let predicted: Vec<f64> = xs.iter().map(|&x| fit.predict(x)).collect();
    r_squared(ys, &predicted)
}

/// Time-ordered folds for `n` observations.
///
/// The series is cut into `splits + 1` blocks of `n / (splits + 1)` observations, the
/// remainder going to the first training window. Fold `k` trains on everything before
/// its test block. Returns no folds if a block would be empty.
pub fn forward_chaining_folds(n: usize, splits: usize) -> Vec<Fold> {
    if splits == 0 {
        return Vec::new();
    }
    let test_size = n / (splits + 1);
    if test_size == 0 {
        return Vec::new();
    }

    let first_test = n - splits * test_size;
    (0..splits)
        .map(|k| {
            let start = first_test + k * test_size;
            Fold {
                train: 0..start,
                test: start..start + test_size,
            }
        })
        .collect()
}

/// Out-of-sample R² for each forward-chaining fold.
pub fn cross_validate(xs: &[f64], ys: &[f64], splits: usize) -> Vec<f64> {
    let n = xs.len().min(ys.len());
    forward_chaining_folds(n, splits)
        .into_iter()
        .map(|fold| {
            let fit = fit_line(&xs[fold.train.clone()], &ys[fold.train]);
            fit_score(&fit, &xs[fold.test.clone()], &ys[fold.test])
        })
        .collect()
}
