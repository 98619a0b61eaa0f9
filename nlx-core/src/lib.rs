//! # nlx-core - interaction attribution for NLI classifiers
//!
//! Given a premise/hypothesis pair and a black-box sequence classifier, this
//! crate finds which pairs of premise and hypothesis units most reduce the
//! model's confidence when masked together, and ranks them.
//!
//! The classifier and tokenizer are consumed through the [`Classifier`] and
//! [`Tokenizer`] traits; nothing here loads weights or touches the network.
//!
//! Two explainers are provided:
//! - [`NaiveExplainer`]: leave-one-out occlusion over the full premise x
//!   hypothesis cross-product, scored by an [`InteractionPolicy`].
//! - [`ArchExplainer`]: delegates the interaction search to an external
//!   Archipelago implementation and post-processes its output.

pub mod archipelago;
pub mod config;
pub mod error;
pub mod estimate;
pub mod interaction;
pub mod naive;
pub mod oracle;
pub mod perturb;
pub mod report;
pub mod select;
pub mod stopwords;

// Re-exports
pub use archipelago::{
    ArchExplainer, ArchExplanation, ExplainerClass, InputTransform, InteractionSearch,
    InteractionSet, SearchRequest,
};
pub use config::{Device, LabelMap, ModelProfile, NlxConfig, load_config};
pub use error::{ExplainError, ExplainResult};
pub use interaction::{InteractionPolicy, ScoredInteraction};
pub use naive::{ExplainOptions, Explanation, NaiveExplainer};
pub use oracle::{Classifier, ConfidenceVector, Encoding, ScoringOracle, TokenId, Tokenizer};
pub use perturb::Granularity;
