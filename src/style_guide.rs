use anyhow::{Result, anyhow};
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

use crate::json_io;
use crate::prompts::{self, ExamplePair, STYLE_GUIDE_TOOL};
use crate::providers::Provider;

/// Fields compared between zipped source/translated records, in prompt order.
const TRAINING_FIELDS: [&str; 3] = ["content", "title", "teller"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingPair {
    pub original: String,
    pub translated: String,
}

/// Reads same-named flat JSON arrays from both directories and pairs their
/// records by position.
pub fn load_training_data(source_dir: &Path, translated_dir: &Path) -> Vec<TrainingPair> {
    let mut pairs = Vec::new();
    if !source_dir.is_dir() || !translated_dir.is_dir() {
        warn!(
            "training data directory missing: {} / {}",
            source_dir.display(),
            translated_dir.display()
        );
        return pairs;
    }

    let files = match json_io::list_json_files(source_dir) {
        Ok(files) => files,
        Err(err) => {
            error!("{:#}", err);
            return pairs;
        }
    };

    for source_path in files {
        let file_name = json_io::file_name(&source_path);
        let translated_path = translated_dir.join(&file_name);
        if !translated_path.is_file() {
            continue;
        }
        match load_file_pairs(&source_path, &translated_path) {
            Ok(found) => pairs.extend(found),
            Err(err) => error!("failed to load training file {}: {:#}", file_name, err),
        }
    }
    info!("loaded {} training pairs", pairs.len());
    pairs
}

fn load_file_pairs(source_path: &Path, translated_path: &Path) -> Result<Vec<TrainingPair>> {
    let source = json_io::read_json(source_path)?;
    let translated = json_io::read_json(translated_path)?;
    let source = records(&source, source_path)?;
    let translated = records(&translated, translated_path)?;

    let mut pairs = Vec::new();
    for (source_record, translated_record) in source.iter().zip(translated) {
        for field in TRAINING_FIELDS {
            let original = source_record.get(field).and_then(Value::as_str);
            let rendered = translated_record.get(field).and_then(Value::as_str);
            if let (Some(original), Some(rendered)) = (original, rendered) {
                pairs.push(TrainingPair {
                    original: original.to_string(),
                    translated: rendered.to_string(),
                });
            }
        }
    }
    Ok(pairs)
}

fn records<'a>(document: &'a Value, path: &Path) -> Result<&'a [Value]> {
    document
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| anyhow!("expected a JSON array of records: {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct StyleLearner<P: Provider> {
    provider: P,
    target_lang: String,
    examples: usize,
}

impl<P: Provider> StyleLearner<P> {
    pub fn new(provider: P, target_lang: impl Into<String>, examples: usize) -> Self {
        Self {
            provider,
            target_lang: target_lang.into(),
            examples: examples.max(1),
        }
    }

    /// Asks the provider for a style guide based on the first few pairs.
    pub async fn request_style_guide(&self, pairs: &[TrainingPair]) -> Result<String> {
        let examples = pairs
            .iter()
            .take(self.examples)
            .map(|pair| ExamplePair {
                original: &pair.original,
                translated: &pair.translated,
            })
            .collect::<Vec<_>>();
        let system_prompt = prompts::render_style_guide_system(&self.target_lang)?;
        let user_prompt = prompts::render_style_guide_user(&examples)?;

        let response = self
            .provider
            .clone()
            .register_tool(prompts::style_guide_tool())
            .append_system_input(system_prompt)
            .append_user_input(user_prompt)
            .call_tool(STYLE_GUIDE_TOOL)
            .await?;
        prompts::parse_style_guide_args(response.args)
    }

    /// Writes the generated guide to `output_path`. Failures are logged and
    /// leave any existing guide untouched.
    pub async fn generate_style_guide(
        &self,
        pairs: &[TrainingPair],
        output_path: &Path,
    ) -> Option<String> {
        if pairs.is_empty() {
            warn!("no training data available; style guide not generated");
            return None;
        }
        let guide = match self.request_style_guide(pairs).await {
            Ok(guide) => guide,
            Err(err) => {
                error!("failed to generate style guide: {:#}", err);
                return None;
            }
        };
        if let Err(err) = json_io::write_text(output_path, &guide) {
            error!("failed to save style guide: {:#}", err);
            return None;
        }
        info!("style guide saved to {}", output_path.display());
        Some(guide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::ScriptedProvider;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn pair(original: &str, translated: &str) -> TrainingPair {
        TrainingPair {
            original: original.to_string(),
            translated: translated.to_string(),
        }
    }

    #[test]
    fn training_pairs_are_zipped_by_position() {
        let dir = tempdir().expect("tempdir");
        let source_dir = dir.path().join("source");
        let translated_dir = dir.path().join("translated");
        fs::create_dir_all(&source_dir).expect("create source");
        fs::create_dir_all(&translated_dir).expect("create translated");

        fs::write(
            source_dir.join("a.json"),
            json!([
                {"teller": "Alice", "content": "Hello", "title": "Queen"},
                {"content": "Bye"},
                {"content": "Extra"}
            ])
            .to_string(),
        )
        .expect("write source");
        fs::write(
            translated_dir.join("a.json"),
            json!([
                {"teller": "爱丽丝", "content": "你好"},
                {"content": "再见"}
            ])
            .to_string(),
        )
        .expect("write translated");
        fs::write(source_dir.join("b.json"), "[]").expect("write unpaired");
        fs::write(source_dir.join("c.json"), "{}").expect("write object");
        fs::write(translated_dir.join("c.json"), "[]").expect("write object counterpart");

        let pairs = load_training_data(&source_dir, &translated_dir);
        assert_eq!(
            pairs,
            vec![
                pair("Hello", "你好"),
                pair("Alice", "爱丽丝"),
                pair("Bye", "再见"),
            ]
        );
    }

    #[test]
    fn missing_training_directory_yields_no_pairs() {
        let dir = tempdir().expect("tempdir");
        let pairs = load_training_data(&dir.path().join("nope"), dir.path());
        assert!(pairs.is_empty());
    }

    #[tokio::test]
    async fn generated_guide_is_written_and_uses_the_first_examples() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("guide/style.md");
        let provider =
            ScriptedProvider::new(vec![Ok(json!({"style_guide": "Use formal register."}))]);
        let learner = StyleLearner::new(provider.clone(), "zh-Hans", 2);
        let pairs = vec![pair("One", "一"), pair("Two", "二"), pair("Three", "三")];

        let guide = learner.generate_style_guide(&pairs, &output).await;
        assert_eq!(guide.as_deref(), Some("Use formal register."));
        assert_eq!(
            fs::read_to_string(&output).expect("read guide"),
            "Use formal register."
        );

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, STYLE_GUIDE_TOOL);
        assert!(calls[0].user[0].contains("Source: Two"));
        assert!(!calls[0].user[0].contains("Source: Three"));
    }

    #[tokio::test]
    async fn failed_call_leaves_no_guide() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("style.md");
        let provider = ScriptedProvider::new(vec![Err("boom".to_string())]);
        let learner = StyleLearner::new(provider, "zh-Hans", 5);

        let guide = learner
            .generate_style_guide(&[pair("One", "一")], &output)
            .await;
        assert!(guide.is_none());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn empty_training_data_skips_the_call() {
        let dir = tempdir().expect("tempdir");
        let provider = ScriptedProvider::new(Vec::new());
        let learner = StyleLearner::new(provider.clone(), "zh-Hans", 5);

        let guide = learner
            .generate_style_guide(&[], &dir.path().join("style.md"))
            .await;
        assert!(guide.is_none());
        assert!(provider.calls().is_empty());
    }
}
