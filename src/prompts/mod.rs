use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tera::{Context as TeraContext, Tera};

use crate::providers::ToolSpec;

pub const STYLE_GUIDE_TOOL: &str = "deliver_style_guide";
pub const TRANSLATION_TOOL: &str = "deliver_translation";

const STYLE_GUIDE_SYSTEM: &str = include_str!("style_guide_system.tera");
const STYLE_GUIDE_USER: &str = include_str!("style_guide_user.tera");
const TRANSLATE_SYSTEM: &str = include_str!("translate_system.tera");
const TRANSLATE_USER: &str = include_str!("translate_user.tera");

#[derive(Debug, Clone, Serialize)]
pub struct ExamplePair<'a> {
    pub original: &'a str,
    pub translated: &'a str,
}

pub fn style_guide_tool() -> ToolSpec {
    ToolSpec {
        name: STYLE_GUIDE_TOOL.to_string(),
        description: "Return the translation style guide.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "style_guide": {"type": "string"}
            },
            "required": ["style_guide"]
        }),
    }
}

pub fn translation_tool() -> ToolSpec {
    ToolSpec {
        name: TRANSLATION_TOOL.to_string(),
        description: "Return the translated text.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "translation": {"type": "string"}
            },
            "required": ["translation"]
        }),
    }
}

pub fn render_style_guide_system(target_lang: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("target_lang", target_lang);
    context.insert("tool_name", STYLE_GUIDE_TOOL);
    render(STYLE_GUIDE_SYSTEM, &context, "style guide system prompt")
}

pub fn render_style_guide_user(pairs: &[ExamplePair<'_>]) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("pairs", pairs);
    render(STYLE_GUIDE_USER, &context, "style guide user prompt")
}

pub fn render_translate_system(style_guide: &str, target_lang: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("style_guide", style_guide.trim());
    context.insert("target_lang", target_lang);
    context.insert("tool_name", TRANSLATION_TOOL);
    render(TRANSLATE_SYSTEM, &context, "translation system prompt")
}

pub fn render_translate_user(text: &str) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("text", text);
    render(TRANSLATE_USER, &context, "translation user prompt")
}

fn render(template: &str, context: &TeraContext, what: &str) -> Result<String> {
    Tera::one_off(template, context, false).with_context(|| format!("failed to render {}", what))
}

#[derive(Debug, Deserialize)]
struct StyleGuideArgs {
    style_guide: String,
}

#[derive(Debug, Deserialize)]
struct TranslationArgs {
    translation: String,
}

pub fn parse_style_guide_args(value: Value) -> Result<String> {
    let args: StyleGuideArgs =
        serde_json::from_value(value).with_context(|| "invalid style guide tool arguments")?;
    if args.style_guide.trim().is_empty() {
        return Err(anyhow!("style_guide is empty"));
    }
    Ok(args.style_guide)
}

pub fn parse_translation_args(value: Value) -> Result<String> {
    let args: TranslationArgs =
        serde_json::from_value(value).with_context(|| "invalid translation tool arguments")?;
    if args.translation.trim().is_empty() {
        return Err(anyhow!("translation is empty"));
    }
    Ok(args.translation)
}
