use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

mod json_io;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod settings;
pub mod style_guide;
pub mod terms;
pub mod terms_md;
pub mod translator;

#[cfg(test)]
mod test_util;

pub use providers::{Claude, OpenAI, Provider, ProviderImpl, ProviderKind};
pub use settings::Settings;
pub use style_guide::{StyleLearner, TrainingPair};
pub use terms::{Category, ExtractSummary, Registration, Side, TermCatalogue};
pub use translator::{DirectorySummary, Translator};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings_path: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
}

/// Subcommands with their per-run overrides; `None` keeps the settings value.
#[derive(Debug, Clone)]
pub enum Command {
    ExtractTerms {
        source_dir: Option<PathBuf>,
        translated_dir: Option<PathBuf>,
        prefix: Option<String>,
        output: Option<PathBuf>,
    },
    TermsMarkdown {
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        marker: Option<String>,
    },
    StyleGuide {
        source_dir: Option<PathBuf>,
        translated_dir: Option<PathBuf>,
        output: Option<PathBuf>,
    },
    Translate {
        input_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        style_guide: Option<PathBuf>,
        target_lang: Option<String>,
    },
    Run,
}

pub async fn run(config: Config, command: Command) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;

    match command {
        Command::ExtractTerms {
            source_dir,
            translated_dir,
            prefix,
            output,
        } => {
            override_value(&mut settings.terms.source_dir, source_dir);
            override_value(&mut settings.terms.translated_dir, translated_dir);
            override_value(&mut settings.terms.source_prefix, prefix);
            override_value(&mut settings.terms.output, output);
            let summary = extract_terms(&settings)?;
            Ok(format!(
                "processed: {}\nskipped: {}\nfailed: {}",
                summary.processed, summary.skipped, summary.failed
            ))
        }
        Command::TermsMarkdown {
            input,
            output,
            marker,
        } => {
            override_value(&mut settings.terms.output, input);
            override_value(&mut settings.terms.markdown_output, output);
            override_value(&mut settings.terms.unresolved_marker, marker);
            terms_md::convert_file(
                &settings.terms.output,
                &settings.terms.markdown_output,
                &settings.terms.unresolved_marker,
            )?;
            Ok(format!(
                "markdown: {}",
                settings.terms.markdown_output.display()
            ))
        }
        Command::StyleGuide {
            source_dir,
            translated_dir,
            output,
        } => {
            override_value(&mut settings.style.training_source_dir, source_dir);
            override_value(&mut settings.style.training_translated_dir, translated_dir);
            override_value(&mut settings.style.output, output);
            let provider = build_provider(&config, &settings)?;
            let guide = generate_style_guide(provider, &settings).await;
            Ok(match guide {
                Some(_) => format!("style guide: {}", settings.style.output.display()),
                None => "style guide: not generated".to_string(),
            })
        }
        Command::Translate {
            input_dir,
            output_dir,
            style_guide,
            target_lang,
        } => {
            override_value(&mut settings.translate.source_dir, input_dir);
            override_value(&mut settings.translate.output_dir, output_dir);
            override_value(&mut settings.style.output, style_guide);
            override_value(&mut settings.translate.target_lang, target_lang);
            let provider = build_provider(&config, &settings)?;
            let mut translator = Translator::new(provider, settings.translate.target_lang.clone());
            translator.load_style_guide(&settings.style.output)?;
            let summary = translate_directory(&translator, &settings).await?;
            Ok(format_translation_summary(&summary))
        }
        Command::Run => {
            let provider = build_provider(&config, &settings)?;
            let guide = generate_style_guide(provider.clone(), &settings).await;
            let mut translator = Translator::new(provider, settings.translate.target_lang.clone());
            match guide {
                Some(guide) => translator = translator.with_style_guide(guide),
                None => translator.load_style_guide(&settings.style.output)?,
            }
            let summary = translate_directory(&translator, &settings).await?;
            Ok(format_translation_summary(&summary))
        }
    }
}

/// Runs the extractor over the configured directories and saves the
/// catalogue. Only the final write is fatal.
pub fn extract_terms(settings: &Settings) -> Result<ExtractSummary> {
    let terms = &settings.terms;
    info!(
        "extracting terms from {} and {}",
        terms.source_dir.display(),
        terms.translated_dir.display()
    );
    let mut catalogue = TermCatalogue::new();
    let summary = terms::extract_directory(
        &mut catalogue,
        &terms.source_dir,
        &terms.translated_dir,
        &terms.source_prefix,
    )?;
    catalogue
        .save(&terms.output)
        .with_context(|| format!("failed to save terms to {}", terms.output.display()))?;
    Ok(summary)
}

pub async fn generate_style_guide<P: Provider>(
    provider: P,
    settings: &Settings,
) -> Option<String> {
    let style = &settings.style;
    let pairs = style_guide::load_training_data(
        &style.training_source_dir,
        &style.training_translated_dir,
    );
    let learner = StyleLearner::new(
        provider,
        settings.translate.target_lang.clone(),
        style.examples,
    );
    learner.generate_style_guide(&pairs, &style.output).await
}

pub async fn translate_directory<P: Provider>(
    translator: &Translator<P>,
    settings: &Settings,
) -> Result<DirectorySummary> {
    translator
        .process_directory(&settings.translate.source_dir, &settings.translate.output_dir)
        .await
}

pub fn build_provider(config: &Config, settings: &Settings) -> Result<ProviderImpl> {
    let model_arg = config.model.as_deref().or(settings.model.as_deref());
    let selection = providers::resolve_provider_selection(model_arg, config.key.as_deref())?;
    let key = providers::resolve_key(selection.provider, config.key.as_deref())
        .with_context(|| "no API key found for selected provider")?;
    let model = selection.model();
    info!("using {}:{}", selection.provider.as_str(), model);
    Ok(providers::build_provider(selection.provider, key, model))
}

fn format_translation_summary(summary: &DirectorySummary) -> String {
    format!(
        "processed: {}\nfailed: {}\ntranslated fields: {}\nfallbacks: {}",
        summary.processed, summary.failed, summary.translated, summary.fallbacks
    )
}

fn override_value<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
