//! Pairwise interaction scoring over premise x hypothesis candidates.

use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, ExplainResult};
use crate::estimate::UnitEffect;
use crate::select::Scored;

/// How a joint perturbation is turned into an attribution score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionPolicy {
    /// `f(x) - f(x without i, j)`
    #[default]
    SimpleOcclusion,
    /// `f(x) - f(x without i) - f(x without j) + f(x without i, j)`
    SuperadditiveOcclusion,
}

impl InteractionPolicy {
    pub fn from_flag(interaction_occlusion: bool) -> Self {
        if interaction_occlusion {
            Self::SuperadditiveOcclusion
        } else {
            Self::SimpleOcclusion
        }
    }

    /// Whether scoring needs the single-unit confidences of both sides.
    pub fn needs_single_units(self) -> bool {
        matches!(self, Self::SuperadditiveOcclusion)
    }
}

impl std::str::FromStr for InteractionPolicy {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "simple" | "simple_occlusion" | "occlusion" => Ok(Self::SimpleOcclusion),
            "interaction" | "interaction_occlusion" | "superadditive"
            | "superadditive_occlusion" => Ok(Self::SuperadditiveOcclusion),
            other => Err(ExplainError::invalid_input(format!(
                "unknown interaction policy '{other}'"
            ))),
        }
    }
}

/// A (premise unit, hypothesis unit) pair and its attribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredInteraction {
    pub premise_unit: usize,
    pub hypothesis_unit: usize,
    pub effect: f64,
}

impl ScoredInteraction {
    pub fn pair(&self) -> (usize, usize) {
        (self.premise_unit, self.hypothesis_unit)
    }
}

impl Scored for ScoredInteraction {
    fn score(&self) -> f64 {
        self.effect
    }
}

/// Single-unit confidences of both sides, indexed by unit.
#[derive(Debug, Clone, Copy)]
pub struct SingleUnits<'a> {
    pub premise: &'a [UnitEffect],
    pub hypothesis: &'a [UnitEffect],
}

/// Output of [`score_pairs`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairScores {
    /// Pairs evaluated before filtering.
    pub evaluated: usize,
    /// Non-negative interactions in premise-major enumeration order.
    pub retained: Vec<ScoredInteraction>,
}

/// Score the full cross-product of candidates.
///
/// `joint_confidence(p, h)` must return the target-class confidence with
/// premise unit `p` and hypothesis unit `h` masked together; it is called
/// exactly once per pair. Pairs whose effect is negative are dropped.
pub fn score_pairs<F>(
    original_confidence: f64,
    premise_candidates: &[usize],
    hypothesis_candidates: &[usize],
    policy: InteractionPolicy,
    single_units: Option<SingleUnits<'_>>,
    mut joint_confidence: F,
) -> ExplainResult<PairScores>
where
    F: FnMut(usize, usize) -> ExplainResult<f64>,
{
    if policy.needs_single_units() && single_units.is_none() {
        return Err(ExplainError::config(
            "interaction occlusion requires single-unit confidences",
        ));
    }

    let mut scores = PairScores::default();
    for &p in premise_candidates {
        for &h in hypothesis_candidates {
            let joint = joint_confidence(p, h)?;
            scores.evaluated += 1;

            let effect = match policy {
                InteractionPolicy::SimpleOcclusion => original_confidence - joint,
                InteractionPolicy::SuperadditiveOcclusion => {
                    let singles = single_units.ok_or_else(|| {
                        ExplainError::config("missing single-unit confidences")
                    })?;
                    let premise_only = unit_confidence(singles.premise, p, "premise")?;
                    let hypothesis_only = unit_confidence(singles.hypothesis, h, "hypothesis")?;
                    original_confidence - premise_only - hypothesis_only + joint
                }
            };

            if !effect.is_finite() {
                return Err(ExplainError::numerical(format!(
                    "non-finite interaction effect for pair ({p}, {h})"
                )));
            }
            if effect < 0.0 {
                tracing::trace!(
                    premise = p,
                    hypothesis = h,
                    effect,
                    "dropping confidence-raising pair"
                );
                continue;
            }
            scores.retained.push(ScoredInteraction {
                premise_unit: p,
                hypothesis_unit: h,
                effect,
            });
        }
    }
    Ok(scores)
}

fn unit_confidence(units: &[UnitEffect], index: usize, side: &str) -> ExplainResult<f64> {
    units.get(index).map(|u| u.confidence).ok_or_else(|| {
        ExplainError::invalid_input(format!(
            "{side} unit {index} has no single-unit confidence ({} available)",
            units.len()
        ))
    })
}
