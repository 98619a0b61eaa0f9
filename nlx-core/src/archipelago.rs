//! Archipelago-based explainer.
//!
//! The interaction search itself lives outside this crate and is reached
//! through [`InteractionSearch`]. This module owns everything around it:
//! building the input transform that masks units toward the baseline,
//! targeting the model's own prediction, and filtering stop-word-only
//! interactions out of the result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{LabelMap, ModelProfile};
use crate::error::{ExplainError, ExplainResult};
use crate::oracle::{Classifier, Encoding, ScoringOracle, TokenId, Tokenizer};
use crate::select::Scored;
use crate::stopwords::process_stop_words;

const ATTENTION_PREFIX: &str = "attention";

/// Search strategy requested from the interaction library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainerClass {
    Archipelago,
    CrossArchipelago,
}

impl std::str::FromStr for ExplainerClass {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arch" => Ok(Self::Archipelago),
            "cross_arch" => Ok(Self::CrossArchipelago),
            other => Err(ExplainError::not_implemented(format!(
                "explainer class '{other}'"
            ))),
        }
    }
}

/// How a masked unit is hidden from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Masking {
    /// Replace the token id with the baseline id.
    Token,
    /// Replace the token id and zero its attention.
    Attention,
}

/// Parsed baseline specification, e.g. `[MASK]` or `attention+[MASK]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSpec {
    pub token: String,
    pub masking: Masking,
}

impl BaselineSpec {
    pub fn parse(spec: &str) -> ExplainResult<Self> {
        if !spec.contains(ATTENTION_PREFIX) {
            return Ok(Self {
                token: spec.to_string(),
                masking: Masking::Token,
            });
        }
        match spec.split('+').nth(1).filter(|token| !token.is_empty()) {
            Some(token) => Ok(Self {
                token: token.to_string(),
                masking: Masking::Attention,
            }),
            None => Err(ExplainError::invalid_input(format!(
                "attention baseline '{spec}' must name a token as 'attention+<token>'"
            ))),
        }
    }
}

/// Baseline sequence: every non-special position replaced by `baseline_id`.
pub fn baseline_ids(input: &Encoding, baseline_id: TokenId) -> Vec<TokenId> {
    input
        .input_ids
        .iter()
        .enumerate()
        .map(|(i, id)| if input.is_special(i) { *id } else { baseline_id })
        .collect()
}

/// Segment ids: 0 through the first separator, 1 afterwards.
fn segment_ids(ids: &[TokenId], sep_token_id: TokenId) -> Vec<u32> {
    let mut segment = 0;
    ids.iter()
        .map(|id| {
            let current = segment;
            if *id == sep_token_id {
                segment = 1;
            }
            current
        })
        .collect()
}

/// Maps a unit mask onto a model input.
pub trait InputTransform: Send + Sync {
    /// Number of maskable units (one per token position).
    fn num_units(&self) -> usize;

    /// The unperturbed input.
    fn input(&self) -> &Encoding;

    /// `keep[i] == false` masks unit `i` toward the baseline.
    fn transform(&self, keep: &[bool]) -> ExplainResult<Encoding>;

    /// The input with only `index` masked.
    fn mask_unit(&self, index: usize) -> ExplainResult<Encoding> {
        if index >= self.num_units() {
            return Err(ExplainError::invalid_input(format!(
                "unit {index} out of range for {} units",
                self.num_units()
            )));
        }
        let keep: Vec<bool> = (0..self.num_units()).map(|i| i != index).collect();
        self.transform(&keep)
    }
}

fn check_mask(keep: &[bool], expected: usize) -> ExplainResult<()> {
    if keep.len() != expected {
        return Err(ExplainError::invalid_input(format!(
            "mask has {} entries for {expected} units",
            keep.len()
        )));
    }
    Ok(())
}

/// Masks units by substituting baseline ids.
#[derive(Debug, Clone)]
pub struct TextTransform {
    input: Encoding,
    baseline_ids: Vec<TokenId>,
    sep_token_id: TokenId,
}

impl TextTransform {
    pub fn new(input: Encoding, baseline_ids: Vec<TokenId>, sep_token_id: TokenId) -> Self {
        Self {
            input,
            baseline_ids,
            sep_token_id,
        }
    }

    fn substitute(&self, keep: &[bool]) -> Vec<TokenId> {
        self.input
            .input_ids
            .iter()
            .zip(&self.baseline_ids)
            .zip(keep)
            .map(|((orig, base), keep)| if *keep { *orig } else { *base })
            .collect()
    }
}

impl InputTransform for TextTransform {
    fn num_units(&self) -> usize {
        self.input.len()
    }

    fn input(&self) -> &Encoding {
        &self.input
    }

    fn transform(&self, keep: &[bool]) -> ExplainResult<Encoding> {
        check_mask(keep, self.num_units())?;
        let input_ids = self.substitute(keep);
        Ok(Encoding {
            token_type_ids: segment_ids(&input_ids, self.sep_token_id),
            attention_mask: self.input.attention_mask.clone(),
            special_tokens_mask: self.input.special_tokens_mask.clone(),
            input_ids,
        })
    }
}

/// Masks units by substituting baseline ids and removing them from attention.
#[derive(Debug, Clone)]
pub struct AttentionTransform {
    text: TextTransform,
}

impl AttentionTransform {
    pub fn new(input: Encoding, baseline_ids: Vec<TokenId>, sep_token_id: TokenId) -> Self {
        Self {
            text: TextTransform::new(input, baseline_ids, sep_token_id),
        }
    }
}

impl InputTransform for AttentionTransform {
    fn num_units(&self) -> usize {
        self.text.num_units()
    }

    fn input(&self) -> &Encoding {
        self.text.input()
    }

    fn transform(&self, keep: &[bool]) -> ExplainResult<Encoding> {
        let mut encoding = self.text.transform(keep)?;
        for (mask, keep) in encoding.attention_mask.iter_mut().zip(keep) {
            if !*keep {
                *mask = 0;
            }
        }
        Ok(encoding)
    }
}

/// A set of token positions and its interaction strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSet {
    pub indices: Vec<usize>,
    pub score: f64,
}

impl Scored for InteractionSet {
    fn score(&self) -> f64 {
        self.score
    }
}

/// Arguments handed to the interaction search.
pub struct SearchRequest<'a> {
    pub class: ExplainerClass,
    pub oracle: &'a ScoringOracle,
    pub transform: &'a dyn InputTransform,
    pub target_class: usize,
    pub top_k: Option<usize>,
    pub batch_size: usize,
    pub use_embedding: bool,
}

/// Explain/top-k contract of the external interaction-attribution library.
pub trait InteractionSearch: Send + Sync {
    fn search(&self, request: SearchRequest<'_>) -> ExplainResult<Vec<InteractionSet>>;
}

/// Result of [`ArchExplainer::explain`], after stop-word filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchExplanation {
    pub interactions: Vec<InteractionSet>,
    pub tokens: Vec<String>,
    pub predicted_class: usize,
    pub original_confidence: f64,
}

/// Explainer that delegates interaction search to Archipelago.
pub struct ArchExplainer {
    oracle: ScoringOracle,
    search: Arc<dyn InteractionSearch>,
    profile: ModelProfile,
    baseline: BaselineSpec,
    class: ExplainerClass,
}

impl ArchExplainer {
    /// Fails fast with [`ExplainError::NotImplemented`] for an unknown
    /// `explainer_class`.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        tokenizer: Arc<dyn Tokenizer>,
        search: Arc<dyn InteractionSearch>,
        profile: ModelProfile,
        baseline_token: &str,
        explainer_class: &str,
    ) -> ExplainResult<Self> {
        let class = explainer_class.parse()?;
        let baseline = BaselineSpec::parse(baseline_token)?;
        Ok(Self {
            oracle: ScoringOracle::new(classifier, tokenizer),
            search,
            profile,
            baseline,
            class,
        })
    }

    pub fn class(&self) -> ExplainerClass {
        self.class
    }

    pub fn baseline(&self) -> &BaselineSpec {
        &self.baseline
    }

    pub fn model_card(&self) -> &str {
        &self.profile.model_card
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.profile.label_map
    }

    pub fn inverse_label_map(&self) -> std::collections::BTreeMap<usize, String> {
        self.profile.label_map.inverse()
    }

    fn build_transform(&self, input: Encoding) -> ExplainResult<Box<dyn InputTransform>> {
        let tokenizer = self.oracle.tokenizer();
        let baseline_id = tokenizer.token_to_id(&self.baseline.token).ok_or_else(|| {
            ExplainError::invalid_input(format!(
                "baseline token '{}' is not in the vocabulary",
                self.baseline.token
            ))
        })?;
        let baseline = baseline_ids(&input, baseline_id);
        let sep = tokenizer.separator_id();
        Ok(match self.baseline.masking {
            Masking::Token => Box::new(TextTransform::new(input, baseline, sep)),
            Masking::Attention => Box::new(AttentionTransform::new(input, baseline, sep)),
        })
    }

    pub fn explain(
        &self,
        premise: &str,
        hypothesis: &str,
        top_k: Option<usize>,
        batch_size: usize,
    ) -> ExplainResult<ArchExplanation> {
        let input = self.oracle.encode(premise, hypothesis)?;
        let (predicted_class, original_confidence) = self.oracle.score(&input)?.predicted();
        tracing::debug!(
            class = ?self.class,
            predicted_class,
            original_confidence,
            tokens = input.len(),
            "running interaction search"
        );

        let tokens = self.oracle.tokenizer().decode_tokens(&input.input_ids);
        let transform = self.build_transform(input)?;
        let interactions = self.search.search(SearchRequest {
            class: self.class,
            oracle: &self.oracle,
            transform: transform.as_ref(),
            target_class: predicted_class,
            top_k,
            batch_size,
            use_embedding: true,
        })?;

        let found = interactions.len();
        let (interactions, tokens) = process_stop_words(interactions, tokens)?;
        tracing::info!(
            found,
            kept = interactions.len(),
            tokens = tokens.len(),
            "archipelago explanation finished"
        );

        Ok(ArchExplanation {
            interactions,
            tokens,
            predicted_class,
            original_confidence,
        })
    }
}
