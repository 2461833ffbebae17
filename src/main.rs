use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use story_translator_rust::{Command, Config};

#[derive(Parser, Debug)]
#[command(
    name = "story-translator",
    version,
    about = "Extract term pairs and machine translate story JSON files"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "settings", global = true)]
    settings: Option<String>,

    /// Model name or provider:model (e.g. openai:gpt-4o-mini)
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key", global = true)]
    key: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the term catalogue from paired source/translated story files
    ExtractTerms {
        /// Directory with prefixed source files
        #[arg(long = "source-dir")]
        source_dir: Option<PathBuf>,
        /// Directory with the translated counterparts
        #[arg(long = "translated-dir")]
        translated_dir: Option<PathBuf>,
        /// File name prefix marking source files (default: EN_)
        #[arg(long = "prefix")]
        prefix: Option<String>,
        /// Catalogue JSON to write
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Render the term catalogue as a Markdown table
    TermsMd {
        /// Catalogue JSON to read
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
        /// Markdown file to write
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Skip entries whose translation contains this marker
        #[arg(long = "marker")]
        marker: Option<String>,
    },
    /// Generate a translation style guide from training pairs
    StyleGuide {
        #[arg(long = "source-dir")]
        source_dir: Option<PathBuf>,
        #[arg(long = "translated-dir")]
        translated_dir: Option<PathBuf>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Translate every JSON file of a directory into a mirrored directory
    Translate {
        #[arg(short = 'i', long = "input-dir")]
        input_dir: Option<PathBuf>,
        #[arg(short = 'o', long = "output-dir")]
        output_dir: Option<PathBuf>,
        /// Style guide to follow
        #[arg(long = "style-guide")]
        style_guide: Option<PathBuf>,
        /// Target language (default: zh-Hans)
        #[arg(short = 'l', long = "lang")]
        lang: Option<String>,
    },
    /// Generate the style guide, then translate the source directory
    Run,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::ExtractTerms {
                source_dir,
                translated_dir,
                prefix,
                output,
            } => Command::ExtractTerms {
                source_dir,
                translated_dir,
                prefix,
                output,
            },
            Commands::TermsMd {
                input,
                output,
                marker,
            } => Command::TermsMarkdown {
                input,
                output,
                marker,
            },
            Commands::StyleGuide {
                source_dir,
                translated_dir,
                output,
            } => Command::StyleGuide {
                source_dir,
                translated_dir,
                output,
            },
            Commands::Translate {
                input_dir,
                output_dir,
                style_guide,
                lang,
            } => Command::Translate {
                input_dir,
                output_dir,
                style_guide,
                target_lang: lang,
            },
            Commands::Run => Command::Run,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    story_translator_rust::logging::init(cli.verbose)?;

    let output = story_translator_rust::run(
        Config {
            settings_path: cli.settings,
            model: cli.model,
            key: cli.key,
        },
        cli.command.into(),
    )
    .await?;

    println!("{}", output);
    Ok(())
}
