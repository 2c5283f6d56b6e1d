use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use speechbridge::{
    AnalysisResult, CaptureSource, Config, Language, RecordingSession, SessionConfig,
};

#[derive(Parser)]
#[command(name = "speechbridge", version, about = "Record speech and translate it")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/speechbridge")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone until Enter is pressed, then transcribe
    /// and translate the utterance
    Record {
        /// Target translation language
        #[arg(short, long, value_enum)]
        language: Option<Language>,

        /// Also write the normalized WAV container to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run an existing audio file through the pipeline and translate it
    TranslateFile {
        /// Audio file to decode (any format the decoder recognizes)
        path: PathBuf,

        /// Target translation language
        #[arg(short, long, value_enum)]
        language: Option<Language>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    info!(service = %config.service.name, "starting");

    match cli.command {
        Command::Record { language, output } => record(&config, language, output).await,
        Command::TranslateFile { path, language } => {
            translate_file(&config, path, language).await
        }
    }
}

async fn record(config: &Config, language: Option<Language>, output: Option<PathBuf>) -> Result<()> {
    let session_config = SessionConfig::from_config(config, language)?;
    let target = session_config.target_language;
    let mut session = RecordingSession::new(session_config, CaptureSource::Microphone)?;

    session.start().await?;
    println!("Recording... press Enter to stop.");
    wait_for_enter().await?;

    let container = session.stop().await?;
    let stats = session.stats();
    println!(
        "Captured {:.1}s of audio ({} chunks, {} bytes compressed).",
        stats.duration_secs, stats.chunks_captured, stats.bytes_captured
    );

    if let Some(path) = &output {
        tokio::fs::write(path, container.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Saved recording to {}", path.display());
    }

    let result = session.analyze(container).await?;
    print_result(&result, target);
    Ok(())
}

async fn translate_file(
    config: &Config,
    path: PathBuf,
    language: Option<Language>,
) -> Result<()> {
    let session_config = SessionConfig::from_config(config, language)?;
    let target = session_config.target_language;
    let mut session = RecordingSession::new(session_config, CaptureSource::File(path))?;

    // The file backend seals as soon as the replay completes, so the whole
    // capture cycle happens here without user interaction.
    session.start().await?;
    let result = session.stop_and_analyze().await?;
    print_result(&result, target);
    Ok(())
}

async fn wait_for_enter() -> Result<()> {
    use tokio::io::AsyncBufReadExt;
    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(())
}

fn print_result(result: &AnalysisResult, target: Language) {
    println!();
    println!("Transcription: {}", result.transcription);
    println!(
        "Translation ({}): {}",
        target.display_name(),
        result.translation
    );
}
