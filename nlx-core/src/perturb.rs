//! Leave-one-out perturbation of premise/hypothesis text.

use serde::{Deserialize, Serialize};

/// Unit that a single perturbation masks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Whitespace-separated word.
    #[default]
    Token,
    Sentence,
}

impl std::str::FromStr for Granularity {
    type Err = crate::error::ExplainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" | "word" => Ok(Self::Token),
            "sentence" => Ok(Self::Sentence),
            other => Err(crate::error::ExplainError::invalid_input(format!(
                "unknown perturbation granularity '{other}'"
            ))),
        }
    }
}

/// The input text with exactly one unit replaced by the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerturbedVariant {
    pub text: String,
    /// Position of the replaced unit in the original unit order.
    pub unit_index: usize,
    /// The original unit text that was masked.
    pub replaced: String,
}

/// Split `text` into maskable units, preserving order.
pub fn split_units(text: &str, granularity: Granularity) -> Vec<&str> {
    match granularity {
        Granularity::Token => text.split_whitespace().collect(),
        Granularity::Sentence => split_sentences(text),
    }
}

/// One variant per unit, in unit order. Text without units yields no variants.
pub fn perturb_text(text: &str, baseline: &str, granularity: Granularity) -> Vec<PerturbedVariant> {
    let units = split_units(text, granularity);
    (0..units.len())
        .map(|masked| {
            let text = units
                .iter()
                .enumerate()
                .map(|(i, unit)| if i == masked { baseline } else { unit })
                .collect::<Vec<_>>()
                .join(" ");
            PerturbedVariant {
                text,
                unit_index: masked,
                replaced: units[masked].to_string(),
            }
        })
        .collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
        if at_boundary {
            let end = i + c.len_utf8();
            push_trimmed(&mut sentences, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_leave_one_out() {
        let variants = perturb_text("A dog runs.", "[MASK]", Granularity::Token);
        let texts: Vec<_> = variants.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["[MASK] dog runs.", "A [MASK] runs.", "A dog [MASK]"]);
        assert_eq!(variants[1].replaced, "dog");
        assert_eq!(variants[1].unit_index, 1);
    }

    #[test]
    fn test_empty_text_has_no_variants() {
        assert!(perturb_text("", "[MASK]", Granularity::Token).is_empty());
        assert!(perturb_text("   \n ", "[MASK]", Granularity::Sentence).is_empty());
    }

    #[test]
    fn test_sentence_split() {
        let units = split_units("It rains. Is it cold?  Yes!No trailing", Granularity::Sentence);
        assert_eq!(units, vec!["It rains.", "Is it cold?", "Yes!No trailing"]);
    }

    #[test]
    fn test_sentence_split_keeps_decimals_together() {
        let units = split_units("Pi is 3.14 roughly. Done.", Granularity::Sentence);
        assert_eq!(units, vec!["Pi is 3.14 roughly.", "Done."]);
    }

    #[test]
    fn test_sentence_leave_one_out() {
        let variants = perturb_text("First one. Second one.", "[MASK]", Granularity::Sentence);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].text, "[MASK] Second one.");
        assert_eq!(variants[1].text, "First one. [MASK]");
        assert_eq!(variants[1].replaced, "Second one.");
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("Sentence".parse::<Granularity>().unwrap(), Granularity::Sentence);
        assert!("paragraph".parse::<Granularity>().is_err());
    }
}
