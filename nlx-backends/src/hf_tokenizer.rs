//! HuggingFace `tokenizers` backend.

use std::path::Path;

use nlx_core::{Encoding, ExplainResult, TokenId, Tokenizer};

use crate::error::BackendError;

const UNKNOWN: &str = "[UNK]";

/// Tokenizer loaded from a `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    sep_token_id: TokenId,
}

impl HfTokenizer {
    /// Load from disk. `sep_token` names the separator joining premise and
    /// hypothesis (`[SEP]` for BERT-style vocabularies, `</s>` for RoBERTa).
    pub fn from_file(path: impl AsRef<Path>, sep_token: &str) -> Result<Self, BackendError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("tokenizer file not found: {}", path.display()),
            )));
        }
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| BackendError::tokenizer(format!("{}: {e}", path.display())))?;
        Self::from_tokenizer(inner, sep_token)
    }

    /// Parse a serialized `tokenizer.json`.
    pub fn from_bytes(bytes: impl AsRef<[u8]>, sep_token: &str) -> Result<Self, BackendError> {
        let inner = tokenizers::Tokenizer::from_bytes(bytes)
            .map_err(|e| BackendError::tokenizer(e.to_string()))?;
        Self::from_tokenizer(inner, sep_token)
    }

    pub fn from_tokenizer(
        inner: tokenizers::Tokenizer,
        sep_token: &str,
    ) -> Result<Self, BackendError> {
        let sep_token_id = inner.token_to_id(sep_token).ok_or_else(|| {
            BackendError::tokenizer(format!("separator '{sep_token}' is not in the vocabulary"))
        })?;
        tracing::debug!(sep_token, sep_token_id, "loaded tokenizer");
        Ok(Self {
            inner,
            sep_token_id,
        })
    }
}

impl Tokenizer for HfTokenizer {
    fn encode_pair(&self, text: &str, text_pair: &str) -> ExplainResult<Encoding> {
        let encoding = self
            .inner
            .encode((text, text_pair), true)
            .map_err(|e| BackendError::tokenizer(e.to_string()))?;
        Ok(Encoding {
            input_ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            token_type_ids: encoding.get_type_ids().to_vec(),
            special_tokens_mask: encoding.get_special_tokens_mask().to_vec(),
        })
    }

    fn decode_tokens(&self, ids: &[TokenId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.inner
                    .id_to_token(*id)
                    .unwrap_or_else(|| UNKNOWN.to_string())
            })
            .collect()
    }

    fn separator_id(&self) -> TokenId {
        self.sep_token_id
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.inner.token_to_id(token)
    }
}
