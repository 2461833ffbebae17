use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::json_io;
use crate::prompts::{self, TRANSLATION_TOOL};
use crate::providers::Provider;

/// Record fields that are machine translated, in the order they are sent.
pub const TRANSLATED_FIELDS: [&str; 3] = ["content", "title", "teller"];

#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: P,
    style_guide: String,
    target_lang: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub records: usize,
    pub translated: usize,
    pub fallbacks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySummary {
    pub processed: usize,
    pub failed: usize,
    pub translated: usize,
    pub fallbacks: usize,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P, target_lang: impl Into<String>) -> Self {
        Self {
            provider,
            style_guide: String::new(),
            target_lang: target_lang.into(),
        }
    }

    pub fn with_style_guide(mut self, style_guide: impl Into<String>) -> Self {
        self.style_guide = style_guide.into();
        self
    }

    pub fn style_guide(&self) -> &str {
        &self.style_guide
    }

    /// A missing file leaves the current guide in place.
    pub fn load_style_guide(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            warn!("style guide not found: {}", path.display());
            return Ok(());
        }
        self.style_guide = fs::read_to_string(path)
            .with_context(|| format!("failed to read style guide: {}", path.display()))?;
        Ok(())
    }

    pub async fn request_translation(&self, text: &str) -> Result<String> {
        let system_prompt =
            prompts::render_translate_system(&self.style_guide, &self.target_lang)?;
        let user_prompt = prompts::render_translate_user(text)?;
        let response = self
            .provider
            .clone()
            .register_tool(prompts::translation_tool())
            .append_system_input(system_prompt)
            .append_user_input(user_prompt)
            .call_tool(TRANSLATION_TOOL)
            .await?;
        prompts::parse_translation_args(response.args)
    }

    /// Returns the original text when the call fails.
    pub async fn translate_text(&self, text: &str) -> String {
        self.translate_or_fallback(text).await.0
    }

    async fn translate_or_fallback(&self, text: &str) -> (String, bool) {
        if text.trim().is_empty() {
            return (text.to_string(), false);
        }
        match self.request_translation(text).await {
            Ok(translation) => (translation, true),
            Err(err) => {
                warn!("translation failed, keeping original text: {:#}", err);
                (text.to_string(), false)
            }
        }
    }

    pub async fn process_json_file(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<FileStats> {
        let mut document = json_io::read_json(input_path)?;
        let records = document.as_array_mut().ok_or_else(|| {
            anyhow!("expected a JSON array of records: {}", input_path.display())
        })?;

        let mut stats = FileStats::default();
        for record in records.iter_mut() {
            let Some(fields) = record.as_object_mut() else {
                continue;
            };
            stats.records += 1;
            for field in TRANSLATED_FIELDS {
                let Some(Value::String(text)) = fields.get(field) else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                let (translated, ok) = self.translate_or_fallback(text).await;
                if ok {
                    stats.translated += 1;
                } else {
                    stats.fallbacks += 1;
                }
                fields.insert(field.to_string(), Value::String(translated));
            }
        }

        json_io::write_json_pretty(output_path, &document)?;
        Ok(stats)
    }

    /// Translates every `*.json` file of `input_dir` into the same file name
    /// under `output_dir`. A failing file is logged and skipped.
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<DirectorySummary> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

        let mut summary = DirectorySummary::default();
        for input_path in json_io::list_json_files(input_dir)? {
            let file_name = json_io::file_name(&input_path);
            info!("translating file: {}", file_name);
            let output_path = output_dir.join(&file_name);
            match self.process_json_file(&input_path, &output_path).await {
                Ok(stats) => {
                    summary.processed += 1;
                    summary.translated += stats.translated;
                    summary.fallbacks += stats.fallbacks;
                }
                Err(err) => {
                    error!("failed to translate {}: {:#}", file_name, err);
                    summary.failed += 1;
                }
            }
        }
        info!(
            "translation finished: processed {}, failed {}, fallbacks {}",
            summary.processed, summary.failed, summary.fallbacks
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::ScriptedProvider;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn translate_text_falls_back_to_the_original_on_failure() {
        let provider = ScriptedProvider::new(vec![
            Ok(json!({"translation": "你好"})),
            Err("network down".to_string()),
            Ok(json!({"translation": ""})),
        ]);
        let translator = Translator::new(provider, "zh-Hans");
        assert_eq!(translator.translate_text("Hello").await, "你好");
        assert_eq!(translator.translate_text("Bye").await, "Bye");
        assert_eq!(translator.translate_text("Again").await, "Again");
    }

    #[tokio::test]
    async fn style_guide_is_sent_with_every_call() {
        let dir = tempdir().expect("tempdir");
        let guide_path = dir.path().join("style.md");
        fs::write(&guide_path, "Keep honorifics.").expect("write guide");

        let provider = ScriptedProvider::new(vec![Ok(json!({"translation": "先生"}))]);
        let mut translator = Translator::new(provider.clone(), "zh-Hans");
        translator.load_style_guide(&guide_path).expect("load guide");
        translator
            .load_style_guide(&dir.path().join("missing.md"))
            .expect("missing guide");
        assert_eq!(translator.style_guide(), "Keep honorifics.");

        translator.translate_text("Sir").await;
        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].system[0].contains("Keep honorifics."));
        assert!(calls[0].user[0].contains("Sir"));
    }

    #[tokio::test]
    async fn process_json_file_replaces_only_text_fields() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("story.json");
        let output = dir.path().join("out/story.json");
        fs::write(
            &input,
            json!([
                {"id": 1, "teller": "Alice", "content": "Hello", "voice": "a01"},
                {"id": 2, "title": 5},
                "not a record"
            ])
            .to_string(),
        )
        .expect("write input");

        let provider = ScriptedProvider::new(vec![
            Ok(json!({"translation": "你好"})),
            Err("rate limited".to_string()),
        ]);
        let translator = Translator::new(provider, "zh-Hans");
        let stats = translator
            .process_json_file(&input, &output)
            .await
            .expect("process file");
        assert_eq!(
            stats,
            FileStats {
                records: 2,
                translated: 1,
                fallbacks: 1,
            }
        );

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output).expect("read output")).unwrap();
        assert_eq!(
            written,
            json!([
                {"id": 1, "teller": "Alice", "content": "你好", "voice": "a01"},
                {"id": 2, "title": 5},
                "not a record"
            ])
        );
        let keys = written[0]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["id", "teller", "content", "voice"]);
    }

    #[tokio::test]
    async fn process_directory_mirrors_files_and_skips_failures() {
        let dir = tempdir().expect("tempdir");
        let input_dir = dir.path().join("in");
        let output_dir = dir.path().join("out");
        fs::create_dir_all(&input_dir).expect("create input");
        fs::write(input_dir.join("a.json"), json!([{"title": "Lord"}]).to_string())
            .expect("write a");
        fs::write(input_dir.join("b.json"), "{ broken").expect("write b");

        let provider = ScriptedProvider::new(vec![Ok(json!({"translation": "领主"}))]);
        let translator = Translator::new(provider, "zh-Hans");
        let summary = translator
            .process_directory(&input_dir, &output_dir)
            .await
            .expect("process directory");
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.translated, 1);

        let written = fs::read_to_string(output_dir.join("a.json")).expect("read a");
        assert_eq!(written, "[\n  {\n    \"title\": \"领主\"\n  }\n]\n");
        assert!(!output_dir.join("b.json").exists());
    }
}
