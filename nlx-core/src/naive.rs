//! Naive occlusion explainer: pairwise premise x hypothesis interactions.
//!
//! One `explain` call runs the whole pipeline:
//!
//! 1. score the unperturbed pair and fix the target class,
//! 2. build leave-one-out variants of premise and hypothesis,
//! 3. score single-unit variants when pruning or interaction occlusion needs them,
//! 4. pick candidate units per side (`sent_k`),
//! 5. score every candidate pair with both units masked,
//! 6. rank and truncate (`top_k`).
//!
//! Cost is one oracle call per candidate pair plus one per unit when single-unit
//! confidences are needed; bound long inputs with `sent_k`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ExplainerSettings, LabelMap, ModelProfile};
use crate::error::ExplainResult;
use crate::estimate::{UnitEffect, candidate_indices, estimate};
use crate::interaction::{InteractionPolicy, ScoredInteraction, SingleUnits, score_pairs};
use crate::oracle::{Classifier, ScoringOracle, Tokenizer};
use crate::perturb::{Granularity, PerturbedVariant, perturb_text};
use crate::select::select_top_k;

/// Per-call knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainOptions {
    /// Class to explain; the model's prediction when unset.
    pub target_class: Option<usize>,
    /// Ranked interactions to return; all surviving pairs in enumeration order when unset.
    pub top_k: Option<usize>,
    /// Candidate units kept per side before pairing.
    pub sent_k: Option<usize>,
}

/// Ranked interactions plus the context needed to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub interactions: Vec<ScoredInteraction>,
    /// Token strings of the jointly encoded input.
    pub tokens: Vec<String>,
    pub predicted_class: usize,
    pub target_class: usize,
    /// Predicted-class confidence on the unperturbed pair.
    pub original_confidence: f64,
    /// Units of the premise, indexed by `ScoredInteraction::premise_unit`.
    pub premise_units: Vec<String>,
    /// Units of the hypothesis, indexed by `ScoredInteraction::hypothesis_unit`.
    pub hypothesis_units: Vec<String>,
    /// Pairs scored before negative effects were dropped.
    pub evaluated_pairs: usize,
}

impl Explanation {
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.interactions.iter().map(ScoredInteraction::pair).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.interactions.iter().map(|i| i.effect).collect()
    }
}

pub struct NaiveExplainer {
    oracle: ScoringOracle,
    profile: ModelProfile,
    baseline_token: String,
    policy: InteractionPolicy,
    granularity: Granularity,
}

impl NaiveExplainer {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        tokenizer: Arc<dyn Tokenizer>,
        profile: ModelProfile,
        baseline_token: impl Into<String>,
        policy: InteractionPolicy,
    ) -> Self {
        Self {
            oracle: ScoringOracle::new(classifier, tokenizer),
            profile,
            baseline_token: baseline_token.into(),
            policy,
            granularity: Granularity::Token,
        }
    }

    pub fn from_settings(
        classifier: Arc<dyn Classifier>,
        tokenizer: Arc<dyn Tokenizer>,
        profile: ModelProfile,
        settings: &ExplainerSettings,
    ) -> Self {
        Self::new(
            classifier,
            tokenizer,
            profile,
            settings.baseline_token.clone(),
            settings.policy,
        )
        .with_granularity(settings.granularity)
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn policy(&self) -> InteractionPolicy {
        self.policy
    }

    pub fn model_card(&self) -> &str {
        &self.profile.model_card
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.profile.label_map
    }

    pub fn inverse_label_map(&self) -> BTreeMap<usize, String> {
        self.profile.label_map.inverse()
    }

    fn single_unit_effects(
        &self,
        original_confidence: f64,
        target_class: usize,
        variants: &[PerturbedVariant],
        score: impl Fn(&str) -> ExplainResult<crate::oracle::ConfidenceVector>,
    ) -> ExplainResult<Vec<UnitEffect>> {
        let confidences = variants
            .iter()
            .map(|variant| score(&variant.text))
            .collect::<ExplainResult<Vec<_>>>()?;
        estimate(original_confidence, target_class, &confidences)
    }

    pub fn explain(
        &self,
        premise: &str,
        hypothesis: &str,
        options: &ExplainOptions,
    ) -> ExplainResult<Explanation> {
        let input = self.oracle.encode(premise, hypothesis)?;
        let confidence = self.oracle.score(&input)?;
        // Effects are measured against the top-class confidence even when a
        // different target class is explained.
        let (predicted_class, original_confidence) = confidence.predicted();
        let target_class = options.target_class.unwrap_or(predicted_class);
        confidence.get(target_class)?;
        let tokens = self.oracle.tokenizer().decode_tokens(&input.input_ids);

        let premise_variants = perturb_text(premise, &self.baseline_token, self.granularity);
        let hypothesis_variants = perturb_text(hypothesis, &self.baseline_token, self.granularity);
        tracing::debug!(
            predicted_class,
            target_class,
            original_confidence,
            premise_units = premise_variants.len(),
            hypothesis_units = hypothesis_variants.len(),
            "scoring single-unit perturbations"
        );

        let singles = if options.sent_k.is_some() || self.policy.needs_single_units() {
            let premise_effects = self.single_unit_effects(
                original_confidence,
                target_class,
                &premise_variants,
                |text| self.oracle.score_pair(text, hypothesis),
            )?;
            let hypothesis_effects = self.single_unit_effects(
                original_confidence,
                target_class,
                &hypothesis_variants,
                |text| self.oracle.score_pair(premise, text),
            )?;
            Some((premise_effects, hypothesis_effects))
        } else {
            None
        };

        let (premise_candidates, hypothesis_candidates): (Vec<usize>, Vec<usize>) = match &singles
        {
            Some((p, h)) => (
                candidate_indices(p, options.sent_k),
                candidate_indices(h, options.sent_k),
            ),
            None => (
                (0..premise_variants.len()).collect(),
                (0..hypothesis_variants.len()).collect(),
            ),
        };

        let single_units = singles.as_ref().map(|(p, h)| SingleUnits {
            premise: p,
            hypothesis: h,
        });
        let scores = score_pairs(
            original_confidence,
            &premise_candidates,
            &hypothesis_candidates,
            self.policy,
            single_units,
            |p, h| {
                self.oracle.confidence(
                    &premise_variants[p].text,
                    &hypothesis_variants[h].text,
                    target_class,
                )
            },
        )?;

        let evaluated_pairs = scores.evaluated;
        let interactions = select_top_k(scores.retained, options.top_k);
        tracing::info!(
            policy = ?self.policy,
            evaluated_pairs,
            returned = interactions.len(),
            "naive explanation finished"
        );

        Ok(Explanation {
            interactions,
            tokens,
            predicted_class,
            target_class,
            original_confidence,
            premise_units: premise_variants.into_iter().map(|v| v.replaced).collect(),
            hypothesis_units: hypothesis_variants.into_iter().map(|v| v.replaced).collect(),
            evaluated_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplainError;
    use crate::oracle::{Encoding, TokenId};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// One id per whitespace word; id 0 = [CLS], 1 = [SEP], 2 = [MASK].
    struct WordTokenizer {
        vocab: Mutex<HashMap<String, TokenId>>,
    }

    impl WordTokenizer {
        fn new() -> Self {
            let vocab = [("[CLS]", 0), ("[SEP]", 1), ("[MASK]", 2)]
                .into_iter()
                .map(|(w, id)| (w.to_string(), id))
                .collect();
            Self {
                vocab: Mutex::new(vocab),
            }
        }

        fn id(&self, word: &str) -> TokenId {
            let mut vocab = self.vocab.lock().unwrap();
            let next = vocab.len() as TokenId;
            *vocab.entry(word.to_string()).or_insert(next)
        }
    }

    impl Tokenizer for WordTokenizer {
        fn encode_pair(&self, text: &str, text_pair: &str) -> ExplainResult<Encoding> {
            let mut ids = vec![0];
            ids.extend(text.split_whitespace().map(|w| self.id(w)));
            ids.push(1);
            ids.extend(text_pair.split_whitespace().map(|w| self.id(w)));
            ids.push(1);
            let n = ids.len();
            Ok(Encoding {
                special_tokens_mask: ids.iter().map(|id| u32::from(*id < 2)).collect(),
                input_ids: ids,
                attention_mask: vec![1; n],
                token_type_ids: vec![0; n],
            })
        }

        fn decode_tokens(&self, ids: &[TokenId]) -> Vec<String> {
            let vocab = self.vocab.lock().unwrap();
            ids.iter()
                .map(|id| {
                    vocab
                        .iter()
                        .find(|(_, v)| *v == id)
                        .map(|(w, _)| w.clone())
                        .unwrap_or_default()
                })
                .collect()
        }

        fn separator_id(&self) -> TokenId {
            1
        }

        fn token_to_id(&self, token: &str) -> Option<TokenId> {
            self.vocab.lock().unwrap().get(token).copied()
        }
    }

    /// Two-class model whose class-1 confidence is looked up by masked words.
    struct MaskTable {
        tokenizer: Arc<WordTokenizer>,
        table: Vec<(Vec<&'static str>, f64)>,
        default: f64,
    }

    impl Classifier for MaskTable {
        fn logits(&self, input: &Encoding) -> ExplainResult<Vec<f32>> {
            let words = self.tokenizer.decode_tokens(&input.input_ids);
            let present: Vec<&str> = words.iter().map(String::as_str).collect();
            let p = self
                .table
                .iter()
                .find(|(missing, _)| {
                    missing.iter().all(|w| !present.contains(w))
                        && present.iter().filter(|w| **w == "[MASK]").count() == missing.len()
                })
                .map(|(_, p)| *p)
                .unwrap_or(self.default);
            // logits whose softmax is (1 - p, p)
            Ok(vec![0.0, (p / (1.0 - p)).ln() as f32])
        }
    }

    fn options(
        target_class: Option<usize>,
        top_k: Option<usize>,
        sent_k: Option<usize>,
    ) -> ExplainOptions {
        ExplainOptions {
            target_class,
            top_k,
            sent_k,
        }
    }

    fn explainer(policy: InteractionPolicy, default: f64) -> NaiveExplainer {
        let tokenizer = Arc::new(WordTokenizer::new());
        let classifier = Arc::new(MaskTable {
            tokenizer: tokenizer.clone(),
            table: vec![
                (vec![], 0.92),
                (vec!["dog"], 0.40),
                (vec!["animal"], 0.55),
                (vec!["dog", "animal"], 0.10),
                (vec!["A", "An"], 0.97),
            ],
            default,
        });
        NaiveExplainer::new(
            classifier,
            tokenizer,
            ModelProfile::from_card("test-mnli"),
            "[MASK]",
            policy,
        )
    }

    #[test]
    fn test_simple_occlusion_picks_dog_animal() {
        let exp = explainer(InteractionPolicy::SimpleOcclusion, 0.95);
        let result = exp
            .explain("A dog runs.", "An animal moves.", &options(None, Some(1), None))
            .unwrap();
        assert_eq!(result.predicted_class, 1);
        assert_eq!(result.target_class, 1);
        assert!((result.original_confidence - 0.92).abs() < 1e-6);
        assert_eq!(result.pairs(), vec![(1, 1)]);
        assert!((result.scores()[0] - 0.82).abs() < 1e-6);
        assert_eq!(result.premise_units[1], "dog");
        assert_eq!(result.hypothesis_units[1], "animal");
        assert_eq!(result.evaluated_pairs, 9);
        assert_eq!(result.tokens.len(), 8);
        assert_eq!(result.tokens[0], "[CLS]");
    }

    #[test]
    fn test_interaction_occlusion_unique_candidate() {
        for (policy, expected) in [
            (InteractionPolicy::SimpleOcclusion, 0.82),
            (InteractionPolicy::SuperadditiveOcclusion, 0.07),
        ] {
            let exp = explainer(policy, 0.95);
            let result = exp
                .explain("dog", "animal", &options(None, Some(1), None))
                .unwrap();
            assert_eq!(result.pairs(), vec![(0, 0)]);
            assert!((result.scores()[0] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_without_top_k_returns_surviving_pairs_in_order() {
        let exp = explainer(InteractionPolicy::SimpleOcclusion, 0.90);
        let result = exp
            .explain("A dog runs.", "An animal moves.", &ExplainOptions::default())
            .unwrap();
        // (0, 0) raises confidence to 0.97 and is dropped.
        assert_eq!(
            result.pairs(),
            vec![(0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 0), (2, 1), (2, 2)]
        );
        assert_eq!(result.evaluated_pairs, 9);
        assert!(result.scores().iter().all(|s| *s >= 0.0));
        assert!((result.scores()[3] - 0.82).abs() < 1e-6);
    }

    #[test]
    fn test_sent_k_bounds_candidates() {
        let exp = explainer(InteractionPolicy::SimpleOcclusion, 0.95);
        let result = exp
            .explain("A dog runs.", "An animal moves.", &options(None, None, Some(2)))
            .unwrap();
        // "dog" and "animal" retain the least confidence and are pruned.
        assert_eq!(result.evaluated_pairs, 4);
        assert!(result.pairs().iter().all(|(p, h)| *p != 1 && *h != 1));
    }

    #[test]
    fn test_explicit_target_class() {
        let exp = explainer(InteractionPolicy::SimpleOcclusion, 0.95);
        let result = exp
            .explain("dog", "animal", &options(Some(0), None, None))
            .unwrap();
        assert_eq!(result.predicted_class, 1);
        assert_eq!(result.target_class, 0);
        // baseline stays the predicted-class confidence
        assert!((result.original_confidence - 0.92).abs() < 1e-6);
        // class-0 confidence with both masked is 0.90
        assert_eq!(result.pairs(), vec![(0, 0)]);
        assert!((result.scores()[0] - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_target_class_out_of_range() {
        let exp = explainer(InteractionPolicy::SimpleOcclusion, 0.95);
        let err = exp
            .explain("A dog runs.", "An animal moves.", &options(Some(5), None, None))
            .unwrap_err();
        assert!(matches!(err, ExplainError::ClassOutOfRange { class: 5, .. }));
    }

    #[test]
    fn test_empty_premise_yields_no_interactions() {
        let exp = explainer(InteractionPolicy::SuperadditiveOcclusion, 0.95);
        let result = exp
            .explain("", "An animal moves.", &options(None, Some(3), None))
            .unwrap();
        assert!(result.interactions.is_empty());
        assert!(result.premise_units.is_empty());
        assert_eq!(result.evaluated_pairs, 0);
    }

    #[test]
    fn test_label_maps() {
        let exp = explainer(InteractionPolicy::SimpleOcclusion, 0.95);
        assert_eq!(exp.label_map().index_of("entailment"), Some(1));
        assert_eq!(exp.inverse_label_map().get(&1).map(String::as_str), Some("entailment"));
        assert_eq!(exp.model_card(), "test-mnli");
    }
}
