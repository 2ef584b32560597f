/// Numerically stable softmax over a score vector.
///
/// Subtracts the maximum before exponentiating so that large logits do not
/// overflow to infinity. An empty slice yields an empty vector.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value. Ties resolve to the lowest index, which keeps
/// classification deterministic for identical scores.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best_idx = None;
    let mut best_val = f32::NEG_INFINITY;

    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = Some(i);
        }
    }

    // All-NaN input still yields the first index rather than nothing
    if best_idx.is_none() && !values.is_empty() {
        return Some(0);
    }

    best_idx
}

/// L2-normalize a vector in place. Zero vectors are left unchanged to avoid
/// dividing by zero.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Round to two decimal places, matching the confidence-percentage contract.
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0, 998.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_of_empty_is_empty() {
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.1, 0.9, 0.9]), Some(1));
    }

    #[test]
    fn argmax_of_empty_is_none() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn l2_normalize_yields_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(87.4321), 87.43);
        assert_eq!(round2(91.0261), 91.03);
        assert_eq!(round2(100.0), 100.0);
    }
}
