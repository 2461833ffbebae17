use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const HOME_DIR_NAME: &str = ".story-translator-rust";

#[derive(Debug, Clone)]
pub struct Settings {
    pub terms: TermsSettings,
    pub style: StyleSettings,
    pub translate: TranslateSettings,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TermsSettings {
    pub source_dir: PathBuf,
    pub translated_dir: PathBuf,
    pub source_prefix: String,
    pub output: PathBuf,
    pub markdown_output: PathBuf,
    pub unresolved_marker: String,
}

#[derive(Debug, Clone)]
pub struct StyleSettings {
    pub training_source_dir: PathBuf,
    pub training_translated_dir: PathBuf,
    pub output: PathBuf,
    pub examples: usize,
}

#[derive(Debug, Clone)]
pub struct TranslateSettings {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub target_lang: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            terms: TermsSettings {
                source_dir: PathBuf::from("source"),
                translated_dir: PathBuf::from("translated"),
                source_prefix: "EN_".to_string(),
                output: PathBuf::from("terms.json"),
                markdown_output: PathBuf::from("terms.md"),
                unresolved_marker: "？？？".to_string(),
            },
            style: StyleSettings {
                training_source_dir: PathBuf::from("training/source"),
                training_translated_dir: PathBuf::from("training/translated"),
                output: PathBuf::from("style_guide.md"),
                examples: 5,
            },
            translate: TranslateSettings {
                source_dir: PathBuf::from("source"),
                output_dir: PathBuf::from("translated"),
                target_lang: "zh-Hans".to_string(),
            },
            model: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    terms: Option<TermsFile>,
    style: Option<StyleFile>,
    translate: Option<TranslateFile>,
    provider: Option<ProviderFile>,
}

#[derive(Debug, Default, Deserialize)]
struct TermsFile {
    source_dir: Option<String>,
    translated_dir: Option<String>,
    source_prefix: Option<String>,
    output: Option<String>,
    markdown_output: Option<String>,
    unresolved_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StyleFile {
    training_source_dir: Option<String>,
    training_translated_dir: Option<String>,
    output: Option<String>,
    examples: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateFile {
    source_dir: Option<String>,
    output_dir: Option<String>,
    target_lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderFile {
    model: Option<String>,
}

/// Loads the embedded defaults, then overlays the working directory files,
/// the per-user files and finally `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

pub(crate) fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(terms) = incoming.terms {
            merge_path(&mut self.terms.source_dir, terms.source_dir);
            merge_path(&mut self.terms.translated_dir, terms.translated_dir);
            merge_string(&mut self.terms.source_prefix, terms.source_prefix);
            merge_path(&mut self.terms.output, terms.output);
            merge_path(&mut self.terms.markdown_output, terms.markdown_output);
            merge_string(&mut self.terms.unresolved_marker, terms.unresolved_marker);
        }
        if let Some(style) = incoming.style {
            merge_path(&mut self.style.training_source_dir, style.training_source_dir);
            merge_path(
                &mut self.style.training_translated_dir,
                style.training_translated_dir,
            );
            merge_path(&mut self.style.output, style.output);
            if let Some(examples) = style.examples {
                if examples > 0 {
                    self.style.examples = examples;
                }
            }
        }
        if let Some(translate) = incoming.translate {
            merge_path(&mut self.translate.source_dir, translate.source_dir);
            merge_path(&mut self.translate.output_dir, translate.output_dir);
            merge_string(&mut self.translate.target_lang, translate.target_lang);
        }
        if let Some(provider) = incoming.provider {
            if let Some(model) = provider.model {
                if !model.trim().is_empty() {
                    self.model = Some(model.trim().to_string());
                }
            }
        }
    }
}

fn merge_string(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            *slot = value;
        }
    }
}

fn merge_path(slot: &mut PathBuf, value: Option<String>) {
    if let Some(value) = value {
        let value = value.trim();
        if !value.is_empty() {
            *slot = PathBuf::from(value);
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(HOME_DIR_NAME))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedded_defaults_are_loaded() {
        let settings = load_settings_from(&[]).expect("load settings");
        assert_eq!(settings.terms.source_prefix, "EN_");
        assert_eq!(settings.terms.unresolved_marker, "？？？");
        assert_eq!(
            settings.terms.output,
            PathBuf::from("config/translatePrompt/terms.json")
        );
        assert_eq!(settings.style.examples, 5);
        assert_eq!(settings.model.as_deref(), Some("openai:gpt-4o-mini"));
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempdir().expect("tempdir");
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(
            &first,
            "[terms]\nsource_prefix = \"JP_\"\noutput = \"a.json\"\n[style]\nexamples = 3\n",
        )
        .expect("write first");
        fs::write(&second, "[terms]\noutput = \"b.json\"\n").expect("write second");

        let settings = load_settings_from(&[first, second]).expect("load settings");
        assert_eq!(settings.terms.source_prefix, "JP_");
        assert_eq!(settings.terms.output, PathBuf::from("b.json"));
        assert_eq!(settings.style.examples, 3);
    }

    #[test]
    fn blank_and_zero_values_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("blank.toml");
        fs::write(
            &path,
            "[terms]\nsource_prefix = \"  \"\n[style]\nexamples = 0\n[provider]\nmodel = \"\"\n",
        )
        .expect("write settings");

        let settings = load_settings_from(&[path]).expect("load settings");
        assert_eq!(settings.terms.source_prefix, "EN_");
        assert_eq!(settings.style.examples, 5);
        assert_eq!(settings.model.as_deref(), Some("openai:gpt-4o-mini"));
    }

    #[test]
    fn missing_extra_settings_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("missing.toml");
        let err = load_settings(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn malformed_settings_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[terms\n").expect("write settings");
        let err = load_settings_from(&[path]).unwrap_err();
        assert!(err.to_string().contains("failed to parse settings"));
    }
}
