//! Stop-word filtering for Archipelago explanations.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::archipelago::InteractionSet;
use crate::error::{ExplainError, ExplainResult};

/// English stop-word list (NLTK corpus).
const ENGLISH_STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

/// Subword markers stripped before lookup (`Ġ` byte-BPE, `▁` sentencepiece, `##` wordpiece).
fn normalize(token: &str) -> String {
    token
        .trim_start_matches('Ġ')
        .trim_start_matches('▁')
        .trim_start_matches("##")
        .to_lowercase()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(normalize(token).as_str())
}

/// Remove stop-word tokens from `tokens` and from every interaction, in lockstep.
///
/// Each interaction loses the indices of removed tokens and has the rest
/// remapped onto the shrunk token list. Interactions made only of stop words
/// are dropped.
pub fn process_stop_words(
    interactions: Vec<InteractionSet>,
    tokens: Vec<String>,
) -> ExplainResult<(Vec<InteractionSet>, Vec<String>)> {
    // remap[i] = new position of token i, None when removed
    let mut remap = Vec::with_capacity(tokens.len());
    let mut kept_tokens = Vec::with_capacity(tokens.len());
    for token in tokens {
        if is_stop_word(&token) {
            remap.push(None);
        } else {
            remap.push(Some(kept_tokens.len()));
            kept_tokens.push(token);
        }
    }

    // Stripping stop words can collapse two sets onto the same indices; the
    // first (higher-ranked) one wins.
    let mut seen = HashSet::new();
    let mut kept_interactions = Vec::with_capacity(interactions.len());
    for interaction in interactions {
        let mut indices = Vec::with_capacity(interaction.indices.len());
        for &index in &interaction.indices {
            let slot = remap.get(index).ok_or_else(|| {
                ExplainError::invalid_input(format!(
                    "interaction index {index} out of range for {} tokens",
                    remap.len()
                ))
            })?;
            if let Some(new_index) = slot {
                indices.push(*new_index);
            }
        }
        if indices.is_empty() || !seen.insert(indices.clone()) {
            continue;
        }
        kept_interactions.push(InteractionSet {
            indices,
            score: interaction.score,
        });
    }
    Ok((kept_interactions, kept_tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn set(indices: &[usize], score: f64) -> InteractionSet {
        InteractionSet {
            indices: indices.to_vec(),
            score,
        }
    }

    #[test]
    fn test_stop_word_normalization() {
        assert!(is_stop_word("The"));
        assert!(is_stop_word("Ġthe"));
        assert!(is_stop_word("▁and"));
        assert!(!is_stop_word("dog"));
        assert!(!is_stop_word("[SEP]"));
    }

    #[test]
    fn test_lockstep_removal() {
        let toks = tokens(&["[CLS]", "a", "dog", "runs", "[SEP]", "the", "animal", "[SEP]"]);
        let interactions = vec![set(&[2, 6], 0.8), set(&[1, 5], 0.5), set(&[1, 3], 0.2)];
        let (interactions, toks) = process_stop_words(interactions, toks).unwrap();
        assert_eq!(toks, tokens(&["[CLS]", "dog", "runs", "[SEP]", "animal", "[SEP]"]));
        assert_eq!(interactions, vec![set(&[1, 4], 0.8), set(&[2], 0.2)]);
    }

    #[test]
    fn test_collapsed_sets_keep_first() {
        let toks = tokens(&["[CLS]", "the", "dog", "[SEP]"]);
        let interactions = vec![set(&[1, 2], 0.9), set(&[2], 0.1)];
        let (interactions, toks) = process_stop_words(interactions, toks).unwrap();
        assert_eq!(toks, tokens(&["[CLS]", "dog", "[SEP]"]));
        assert_eq!(interactions, vec![set(&[1], 0.9)]);
    }

    #[test]
    fn test_out_of_range_index_is_error() {
        let err = process_stop_words(vec![set(&[9], 1.0)], tokens(&["dog"])).unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput(_)));
    }
}
