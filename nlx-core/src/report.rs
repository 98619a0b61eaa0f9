//! Human-readable rendering of explanations.

use std::collections::BTreeSet;

use crate::archipelago::ArchExplanation;
use crate::config::LabelMap;
use crate::naive::Explanation;
use crate::select::select_top_k;

fn label_name(labels: &LabelMap, class: usize) -> String {
    labels
        .label_of(class)
        .map(str::to_string)
        .unwrap_or_else(|| format!("class {class}"))
}

fn unit<'a>(units: &'a [String], index: usize) -> &'a str {
    units.get(index).map(String::as_str).unwrap_or("?")
}

/// Ranked confidence drops with the masked premise/hypothesis units.
pub fn format_report(
    premise: &str,
    hypothesis: &str,
    explanation: &Explanation,
    labels: &LabelMap,
) -> String {
    let mut out = format!("premise: {premise}\nhypothesis: {hypothesis}\n\n");
    out.push_str(&format!(
        "original prediction was {} / with confidence: {:.4}\n",
        label_name(labels, explanation.predicted_class),
        explanation.original_confidence
    ));
    if explanation.target_class != explanation.predicted_class {
        out.push_str(&format!(
            "explaining target class {}\n",
            label_name(labels, explanation.target_class)
        ));
    }
    out.push('\n');

    let ranked = select_top_k(
        explanation.interactions.clone(),
        Some(explanation.interactions.len()),
    );
    let mut premise_words = BTreeSet::new();
    let mut hypothesis_words = BTreeSet::new();
    for (rank, interaction) in ranked.iter().enumerate() {
        let p = unit(&explanation.premise_units, interaction.premise_unit);
        let h = unit(&explanation.hypothesis_units, interaction.hypothesis_unit);
        premise_words.insert(p);
        hypothesis_words.insert(h);
        out.push_str(&format!(
            "{}. ({p}, {h}) | -{:.4}\n",
            rank + 1,
            interaction.effect
        ));
    }
    if ranked.is_empty() {
        out.push_str("no confidence-reducing interactions found\n");
    }

    out.push_str(&format!(
        "\npremise: {premise_words:?}\nhypothesis: {hypothesis_words:?}"
    ));
    out
}

/// Interaction sets rendered as joined token strings.
pub fn format_arch_report(explanation: &ArchExplanation, labels: &LabelMap) -> String {
    let mut out = format!(
        "predicted {} / with confidence: {:.4}\n",
        label_name(labels, explanation.predicted_class),
        explanation.original_confidence
    );
    for (rank, interaction) in explanation.interactions.iter().enumerate() {
        let words: Vec<&str> = interaction
            .indices
            .iter()
            .map(|i| unit(&explanation.tokens, *i))
            .collect();
        out.push_str(&format!(
            "{}. {} | {:.4}\n",
            rank + 1,
            words.join(" + "),
            interaction.score
        ));
    }
    out
}
