//! Single-unit effect estimation and candidate pruning.

use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, ExplainResult};
use crate::oracle::ConfidenceVector;
use crate::select::top_k_indices;

/// Target-class confidence of one perturbed variant and the drop it caused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitEffect {
    pub confidence: f64,
    /// `original_confidence - confidence`; positive means the unit mattered.
    pub effect: f64,
}

/// Effects aligned index-for-index with `variants`.
pub fn estimate(
    original_confidence: f64,
    target_class: usize,
    variants: &[ConfidenceVector],
) -> ExplainResult<Vec<UnitEffect>> {
    variants
        .iter()
        .map(|variant| {
            let confidence = variant.get(target_class)?;
            let effect = original_confidence - confidence;
            if !effect.is_finite() {
                return Err(ExplainError::numerical(format!(
                    "non-finite single-unit effect ({original_confidence} - {confidence})"
                )));
            }
            Ok(UnitEffect { confidence, effect })
        })
        .collect()
}

/// Candidate unit indices for pairing.
///
/// With a bound, keeps the `min(sent_k, N)` variants with the highest
/// *retained confidence* (not the highest effect), ordered by confidence
/// descending. Without a bound every index passes through in order.
pub fn candidate_indices(effects: &[UnitEffect], sent_k: Option<usize>) -> Vec<usize> {
    match sent_k {
        Some(k) => {
            let confidences: Vec<f64> = effects.iter().map(|e| e.confidence).collect();
            top_k_indices(&confidences, k)
        }
        None => (0..effects.len()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn conf(p: &[f64]) -> ConfidenceVector {
        ConfidenceVector::from_probabilities(p.to_vec()).unwrap()
    }

    #[test]
    fn test_effect_is_confidence_drop() {
        let effects = estimate(0.92, 1, &[conf(&[0.6, 0.4]), conf(&[0.45, 0.55])]).unwrap();
        assert!((effects[0].effect - 0.52).abs() < 1e-12);
        assert!((effects[1].effect - 0.37).abs() < 1e-12);
        assert_eq!(effects[1].confidence, 0.55);
    }

    #[test]
    fn test_estimate_rejects_missing_class() {
        let err = estimate(0.9, 3, &[conf(&[0.5, 0.5])]).unwrap_err();
        assert!(matches!(err, ExplainError::ClassOutOfRange { class: 3, .. }));
    }

    #[test]
    fn test_non_finite_baseline_is_numerical_error() {
        let err = estimate(f64::NAN, 0, &[conf(&[0.5, 0.5])]).unwrap_err();
        assert!(matches!(err, ExplainError::Numerical(_)));
        let err = estimate(f64::INFINITY, 1, &[conf(&[0.5, 0.5])]).unwrap_err();
        assert!(matches!(err, ExplainError::Numerical(_)));
    }

    fn unit(confidence: f64, effect: f64) -> UnitEffect {
        UnitEffect { confidence, effect }
    }

    #[test]
    fn test_candidates_by_confidence() {
        let effects = [unit(0.2, 0.7), unit(0.8, 0.1), unit(0.5, 0.4)];
        assert_eq!(candidate_indices(&effects, Some(2)), vec![1, 2]);
        assert_eq!(candidate_indices(&effects, None), vec![0, 1, 2]);
    }

    #[test]
    fn test_bound_above_len_keeps_all() {
        let effects = [unit(0.3, 0.0), unit(0.3, 0.0)];
        assert_eq!(candidate_indices(&effects, Some(5)), vec![0, 1]);
    }
}
