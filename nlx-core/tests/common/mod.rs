//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use nlx_core::{Classifier, Encoding, ExplainResult, TokenId, Tokenizer};

pub const CLS: TokenId = 0;
pub const SEP: TokenId = 1;
pub const MASK: TokenId = 2;

/// Lower-cased whitespace tokenizer that grows its vocabulary on demand.
pub struct WordTokenizer {
    vocab: Mutex<Vec<String>>,
}

impl Default for WordTokenizer {
    fn default() -> Self {
        Self {
            vocab: Mutex::new(vec!["[CLS]".into(), "[SEP]".into(), "[MASK]".into()]),
        }
    }
}

impl WordTokenizer {
    fn id(&self, word: &str) -> TokenId {
        let word = if word == "[MASK]" {
            word.to_string()
        } else {
            word.to_lowercase()
        };
        let mut vocab = self.vocab.lock().unwrap();
        match vocab.iter().position(|w| *w == word) {
            Some(id) => id as TokenId,
            None => {
                vocab.push(word);
                (vocab.len() - 1) as TokenId
            }
        }
    }
}

impl Tokenizer for WordTokenizer {
    fn encode_pair(&self, text: &str, text_pair: &str) -> ExplainResult<Encoding> {
        let mut ids = vec![CLS];
        let mut types = vec![0];
        for word in text.split_whitespace() {
            ids.push(self.id(word));
            types.push(0);
        }
        ids.push(SEP);
        types.push(0);
        for word in text_pair.split_whitespace() {
            ids.push(self.id(word));
            types.push(1);
        }
        ids.push(SEP);
        types.push(1);
        Ok(Encoding {
            special_tokens_mask: ids.iter().map(|id| u32::from(*id == CLS || *id == SEP)).collect(),
            attention_mask: vec![1; ids.len()],
            token_type_ids: types,
            input_ids: ids,
        })
    }

    fn decode_tokens(&self, ids: &[TokenId]) -> Vec<String> {
        let vocab = self.vocab.lock().unwrap();
        ids.iter()
            .map(|id| vocab.get(*id as usize).cloned().unwrap_or_else(|| "[UNK]".into()))
            .collect()
    }

    fn separator_id(&self) -> TokenId {
        SEP
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        let vocab = self.vocab.lock().unwrap();
        vocab.iter().position(|w| w == token).map(|id| id as TokenId)
    }
}

/// Three-class overlap model: entailment logit grows with the number of
/// attended, unmasked token ids shared by both segments.
#[derive(Default)]
pub struct OverlapClassifier {
    pub calls: AtomicUsize,
}

impl OverlapClassifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for OverlapClassifier {
    fn logits(&self, input: &Encoding) -> ExplainResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut premise = HashMap::new();
        let mut hypothesis = HashMap::new();
        for (i, id) in input.input_ids.iter().enumerate() {
            if input.attention_mask[i] == 0 || *id <= MASK {
                continue;
            }
            let side = if input.token_type_ids[i] == 0 { &mut premise } else { &mut hypothesis };
            *side.entry(*id).or_insert(0u32) += 1;
        }
        let shared = premise.keys().filter(|id| hypothesis.contains_key(id)).count() as f32;
        let masked = input.input_ids.iter().filter(|id| **id == MASK).count() as f32;
        // [contradiction, entailment, neutral]
        Ok(vec![0.2 * masked, 1.0 + 1.5 * shared, 0.5 + 0.1 * masked])
    }
}
