//! Scoring oracle: the single call contract between the attribution engine
//! and the black-box classifier.
//!
//! The engine never sees model weights or tokenizer internals. It talks to a
//! [`Tokenizer`] that jointly encodes a premise/hypothesis pair and to a
//! [`Classifier`] that maps an [`Encoding`] to raw logits. [`ScoringOracle`]
//! glues the two together and applies the softmax, so every downstream stage
//! works with a [`ConfidenceVector`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, ExplainResult};

/// Vocabulary identifier produced by a tokenizer.
pub type TokenId = u32;

/// Jointly encoded premise/hypothesis pair. All vectors are parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoding {
    pub input_ids: Vec<TokenId>,
    pub attention_mask: Vec<u32>,
    pub token_type_ids: Vec<u32>,
    /// 1 for tokens the tokenizer inserted (`[CLS]`, `[SEP]`, ...).
    pub special_tokens_mask: Vec<u32>,
}

impl Encoding {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    pub fn is_special(&self, position: usize) -> bool {
        self.special_tokens_mask
            .get(position)
            .is_some_and(|flag| *flag != 0)
    }
}

/// Tokenizer capability consumed by the explainers.
pub trait Tokenizer: Send + Sync {
    /// Encode `text` and `text_pair` into one sequence joined by the separator.
    fn encode_pair(&self, text: &str, text_pair: &str) -> ExplainResult<Encoding>;

    /// Human-readable token strings, one per id.
    fn decode_tokens(&self, ids: &[TokenId]) -> Vec<String>;

    fn separator_id(&self) -> TokenId;

    fn token_to_id(&self, token: &str) -> Option<TokenId>;
}

/// Sequence classifier capability: encoded input in, raw logits out.
pub trait Classifier: Send + Sync {
    fn logits(&self, input: &Encoding) -> ExplainResult<Vec<f32>>;

    /// Batched forward pass. Backends that can batch should override this.
    fn logits_batch(&self, inputs: &[Encoding]) -> ExplainResult<Vec<Vec<f32>>> {
        inputs.iter().map(|input| self.logits(input)).collect()
    }
}

/// Class-probability vector from a single forward evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceVector(Vec<f64>);

impl ConfidenceVector {
    /// Numerically stable softmax over raw logits.
    pub fn from_logits(logits: &[f32]) -> ExplainResult<Self> {
        if logits.is_empty() {
            return Err(ExplainError::numerical("classifier returned no logits"));
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(ExplainError::numerical(format!(
                "classifier returned non-finite logits: {logits:?}"
            )));
        }
        let max = logits
            .iter()
            .map(|l| f64::from(*l))
            .fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (f64::from(*l) - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        Ok(Self(exps.into_iter().map(|e| e / sum).collect()))
    }

    /// Wrap probabilities that are already normalized.
    pub fn from_probabilities(probabilities: Vec<f64>) -> ExplainResult<Self> {
        if probabilities.is_empty() || probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ExplainError::numerical(format!(
                "invalid probability vector: {probabilities:?}"
            )));
        }
        Ok(Self(probabilities))
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.0
    }

    pub fn num_classes(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, class: usize) -> ExplainResult<f64> {
        self.0
            .get(class)
            .copied()
            .ok_or(ExplainError::ClassOutOfRange {
                class,
                num_classes: self.0.len(),
            })
    }

    /// Argmax class and its probability. The first maximum wins on ties.
    pub fn predicted(&self) -> (usize, f64) {
        let mut best = (0, self.0[0]);
        for (class, p) in self.0.iter().enumerate().skip(1) {
            if *p > best.1 {
                best = (class, *p);
            }
        }
        best
    }
}

/// Classifier + tokenizer behind one scoring call.
#[derive(Clone)]
pub struct ScoringOracle {
    classifier: Arc<dyn Classifier>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl ScoringOracle {
    pub fn new(classifier: Arc<dyn Classifier>, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            classifier,
            tokenizer,
        }
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn encode(&self, premise: &str, hypothesis: &str) -> ExplainResult<Encoding> {
        self.tokenizer.encode_pair(premise, hypothesis)
    }

    pub fn score(&self, input: &Encoding) -> ExplainResult<ConfidenceVector> {
        let logits = self.classifier.logits(input)?;
        ConfidenceVector::from_logits(&logits)
    }

    pub fn score_pair(&self, premise: &str, hypothesis: &str) -> ExplainResult<ConfidenceVector> {
        let input = self.encode(premise, hypothesis)?;
        self.score(&input)
    }

    pub fn score_batch(&self, inputs: &[Encoding]) -> ExplainResult<Vec<ConfidenceVector>> {
        let batch = self.classifier.logits_batch(inputs)?;
        if batch.len() != inputs.len() {
            return Err(ExplainError::model(format!(
                "classifier returned {} rows for a batch of {}",
                batch.len(),
                inputs.len()
            )));
        }
        batch
            .iter()
            .map(|logits| ConfidenceVector::from_logits(logits))
            .collect()
    }

    /// Probability of `class` for a text pair.
    pub fn confidence(&self, premise: &str, hypothesis: &str, class: usize) -> ExplainResult<f64> {
        self.score_pair(premise, hypothesis)?.get(class)
    }
}

impl std::fmt::Debug for ScoringOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringOracle").finish_non_exhaustive()
    }
}
