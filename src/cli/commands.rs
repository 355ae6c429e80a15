//! CLI argument definitions and the file-based round-trip driver

use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::client::OpenRouterClient;
use crate::core::config::AppConfig;
use crate::core::errors::TranslationError;
use crate::core::models::{PipelineResult, RoundTripRequest, Stage, DEFAULT_MODEL};
use crate::core::pipeline::RoundTrip;
use crate::core::prompt::PromptLoader;
use crate::core::translator::Translator;

/// Back-translation output, relative to the working directory
pub const BACK_FILE: &str = "back.txt";

/// Comparison review output, relative to the working directory
pub const REVIEW_FILE: &str = "review.txt";

/// File translator via OpenRouter with back-translation review
#[derive(Parser, Debug)]
#[command(name = "transback", version, about, long_about = None)]
pub struct Args {
    /// File to translate
    pub input_file: PathBuf,

    /// Where to write the translation
    pub output_file: PathBuf,

    /// Source language
    #[arg(long, default_value = "en")]
    pub source: String,

    /// Target language
    #[arg(long, default_value = "af")]
    pub target: String,

    /// Completion model
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sent as the HTTP-Referer attribution header
    #[arg(long)]
    pub app_url: Option<String>,

    /// Sent as the X-Title attribution header
    #[arg(long)]
    pub app_title: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Where each stage's output is written
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub translation: PathBuf,
    pub back_translation: PathBuf,
    pub review: PathBuf,
}

impl OutputPaths {
    /// Translation to `output`, the rest to the fixed files in the working directory
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            translation: output.into(),
            back_translation: PathBuf::from(BACK_FILE),
            review: PathBuf::from(REVIEW_FILE),
        }
    }

    /// Put the fixed files under `dir` instead
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.back_translation = dir.join(BACK_FILE);
        self.review = dir.join(REVIEW_FILE);
        self
    }
}

async fn write_output(path: &Path, content: &str) -> Result<(), TranslationError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| TranslationError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Run the round trip over a file, writing each stage's output as soon as it
/// is available. A failed stage leaves earlier outputs on disk.
pub async fn translate_file(
    pipeline: &RoundTrip,
    input: &Path,
    paths: &OutputPaths,
    source_lang: &str,
    target_lang: &str,
    model: &str,
) -> anyhow::Result<PipelineResult> {
    info!("Reading input file: {}", input.display());
    let text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| TranslationError::FileError {
            path: input.display().to_string(),
            message: e.to_string(),
        })?;
    info!("Input file read successfully. Length: {} characters", text.len());

    let request = RoundTripRequest::new(text)
        .with_languages(source_lang, target_lang)
        .with_model(model);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Step 1/3: Translating to target language");

    let mut result = PipelineResult::default();
    let mut stages = Box::pin(pipeline.stream(request));

    while let Some(stage) = stages.next().await {
        let stage = match stage {
            Ok(stage) => stage,
            Err(e) => {
                pb.abandon_with_message(format!("Failed: {}", e));
                return Err(e.into());
            }
        };

        match stage {
            Stage::Translated(text) => {
                write_output(&paths.translation, &text).await?;
                info!("Translation saved to {}", paths.translation.display());
                pb.set_message("Step 2/3: Back-translating to source language");
                result.translated = text;
            }
            Stage::BackTranslated(text) => {
                write_output(&paths.back_translation, &text).await?;
                info!("Back-translation saved to {}", paths.back_translation.display());
                pb.set_message("Step 3/3: Comparing meanings");
                result.back_translated = text;
            }
            Stage::Review(text) => {
                write_output(&paths.review, &text).await?;
                info!("Comparison review saved to {}", paths.review.display());
                result.review = text;
            }
            Stage::Complete => pb.finish_with_message("Completed"),
        }
    }

    Ok(result)
}

/// Handle the command line: build the client from `config` and run the file
pub async fn handle_translate(args: Args, mut config: AppConfig) -> anyhow::Result<()> {
    let start_time = Instant::now();

    if args.app_url.is_some() {
        config.app_url = args.app_url.clone();
    }
    if args.app_title.is_some() {
        config.app_title = args.app_title.clone();
    }

    info!("Input file: {}", args.input_file.display());
    info!("Output file: {}", args.output_file.display());
    info!("Source language: {}", args.source);
    info!("Target language: {}", args.target);
    info!("Model: {}", args.model);

    let prompts = PromptLoader::new(&config.prompts_dir);
    let client = OpenRouterClient::new(Arc::new(config))?;
    let pipeline = RoundTrip::new(Translator::new(Arc::new(client), prompts));

    let paths = OutputPaths::new(&args.output_file);
    let result = translate_file(
        &pipeline,
        &args.input_file,
        &paths,
        &args.source,
        &args.target,
        &args.model,
    )
    .await?;

    let duration = start_time.elapsed();
    info!("Translation process completed in {:?}", duration);

    println!("\n✅ Round trip completed!");
    println!("   Translation: {}", paths.translation.display());
    println!("   Back-translation: {}", paths.back_translation.display());
    println!("   Review: {}", paths.review.display());
    if result.is_same() {
        println!("   Meaning preserved");
    } else {
        println!("   ⚠️  Differences found, see {}", paths.review.display());
    }
    println!("   Time: {:?}", duration);

    Ok(())
}
