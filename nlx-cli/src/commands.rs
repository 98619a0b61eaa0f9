//! CLI subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use nlx_backends::{HfTokenizer, HttpClassifier};
use nlx_core::config::{NlxConfig, load_config};
use nlx_core::report::format_report;
use nlx_core::{ExplainOptions, LabelMap, ModelProfile, NaiveExplainer};

use crate::{Commands, ConfigAction, ExplainArgs};

pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    match command {
        Commands::Explain(args) => handle_explain(args, config),
        Commands::Labels { model, inverse } => handle_labels(&config, model.as_deref(), inverse),
        Commands::Config { action } => handle_config(action, &config),
    }
}

fn resolve_profile(config: &NlxConfig, model: Option<&str>) -> anyhow::Result<ModelProfile> {
    let name = model
        .or(config.default_model.as_deref())
        .context("no model given: pass --model or set `default_model` in config")?;
    Ok(config.model_profile(name))
}

/// Accept either a label name or a class index.
fn resolve_target_class(labels: &LabelMap, target: &str) -> anyhow::Result<usize> {
    if let Ok(index) = target.parse::<usize>() {
        return Ok(index);
    }
    labels
        .index_of(target)
        .or_else(|| labels.index_of(&target.to_lowercase()))
        .with_context(|| format!("unknown target class '{target}'"))
}

fn handle_explain(args: ExplainArgs, mut config: NlxConfig) -> anyhow::Result<()> {
    // CLI flags win over every config layer.
    if let Some(policy) = args.policy {
        config.explainer.policy = policy;
    }
    if let Some(granularity) = args.granularity {
        config.explainer.granularity = granularity;
    }
    if let Some(token) = args.baseline_token {
        config.explainer.baseline_token = token;
    }
    if let Some(endpoint) = args.endpoint {
        config.backend.endpoint = endpoint;
    }

    let profile = resolve_profile(&config, args.model.as_deref())?;
    let tokenizer_path = args
        .tokenizer
        .or_else(|| profile.tokenizer.clone())
        .with_context(|| {
            format!(
                "no tokenizer for '{}': pass --tokenizer or set models.<name>.tokenizer",
                profile.model_card
            )
        })?;

    let tokenizer = HfTokenizer::from_file(&tokenizer_path, &args.sep_token)
        .with_context(|| format!("Failed to load tokenizer {}", tokenizer_path.display()))?;
    let classifier = HttpClassifier::from_settings(&config.backend, profile.model_card.clone())?;
    tracing::info!(
        model = %profile.model_card,
        endpoint = classifier.endpoint(),
        policy = ?config.explainer.policy,
        "explaining"
    );

    let target_class = args
        .target_class
        .as_deref()
        .map(|t| resolve_target_class(&profile.label_map, t))
        .transpose()?;
    let options = ExplainOptions {
        target_class,
        top_k: args.top_k.or(config.explainer.top_k),
        sent_k: args.sent_k.or(config.explainer.sent_k),
    };

    let labels = profile.label_map.clone();
    let explainer = NaiveExplainer::from_settings(
        Arc::new(classifier),
        Arc::new(tokenizer),
        profile,
        &config.explainer,
    );
    let explanation = explainer.explain(&args.premise, &args.hypothesis, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
    } else {
        println!(
            "{}",
            format_report(&args.premise, &args.hypothesis, &explanation, &labels)
        );
    }
    Ok(())
}

fn handle_labels(config: &NlxConfig, model: Option<&str>, inverse: bool) -> anyhow::Result<()> {
    let profile = resolve_profile(config, model)?;
    let json = if inverse {
        serde_json::to_string_pretty(&profile.label_map.inverse())?
    } else {
        serde_json::to_string_pretty(profile.label_map.forward())?
    };
    println!("{}", json);
    Ok(())
}

fn handle_config(action: ConfigAction, config: &NlxConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
