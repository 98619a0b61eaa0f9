//! # nlx-backends - concrete collaborators for nlx
//!
//! - [`HfTokenizer`] loads a HuggingFace `tokenizer.json` and implements
//!   [`nlx_core::Tokenizer`].
//! - [`HttpClassifier`] sends encoded inputs to a logits endpoint and
//!   implements [`nlx_core::Classifier`].

pub mod error;
pub mod hf_tokenizer;
pub mod http_classifier;

pub use error::BackendError;
pub use hf_tokenizer::HfTokenizer;
pub use http_classifier::HttpClassifier;
