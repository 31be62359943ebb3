//! Correlation coefficients over paired score sequences.
//!
//! Both coefficients are NaN when the input is empty, mismatched in length,
//! contains a NaN, or when either side is constant. A single pair is constant
//! on both sides, so n = 1 always yields NaN.

/// Pearson product-moment correlation, clamped to [-1, 1]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if !is_valid_pair(x, y) || is_constant(x) || is_constant(y) {
        return f64::NAN;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }

    (cov / denominator).clamp(-1.0, 1.0)
}

/// Spearman rank correlation: Pearson over tie-averaged ranks
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    if !is_valid_pair(x, y) {
        return f64::NAN;
    }
    pearson(&fractional_ranks(x), &fractional_ranks(y))
}

/// 1-based ranks where tied values share the mean of their positions.
/// NaN never ties, so each NaN gets its own rank after every number.
fn fractional_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }

    ranks
}

fn is_valid_pair(x: &[f64], y: &[f64]) -> bool {
    x.len() == y.len() && !x.is_empty() && !x.iter().chain(y).any(|v| v.is_nan())
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}
