use clap::{Parser, Subcommand, ValueEnum};
use codi::explainer::validate_endpoint;
use codi::narration::DisabledSynthesizer;
use codi::{
    init_logging, load_local_env, resolve_artifact, AppError, DataDirs, EspeakSynthesizer,
    ExplanationStyle, HfExplainer, Session, SpeechSynthesizer, VoiceGender,
};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "codi", version, about = "Code-explanation assistant with voice narration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a source file and print its explanation
    Explain {
        file: PathBuf,
        /// Override the configured explanation style for this run
        #[arg(long)]
        style: Option<ExplanationStyle>,
    },
    /// Ask a question, with the most recent upload as code context
    Ask { question: String },
    /// Show one of the history logs
    History { kind: HistoryKind },
    /// Clear one of the history logs (and its generated artifacts)
    Clear { kind: HistoryKind },
    /// Show or change persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Export the chat log as a PDF
    ExportChat,
}

#[derive(Clone, Copy, ValueEnum)]
enum HistoryKind {
    Uploads,
    Explanations,
    Chat,
}

#[derive(Subcommand)]
enum SettingsCmd {
    /// Print the current settings
    Show,
    /// Set the explanation style (concise, reiterate, in-depth)
    Style { style: ExplanationStyle },
    /// Set the narration voice gender (Neutral, Female, Male)
    Voice { gender: VoiceGender },
    /// Set the speech rate in words per minute
    Rate { wpm: u32 },
    /// Enable or disable the voice assistant
    Assistant { enabled: bool },
    /// Enable or disable voice activation
    Activation { enabled: bool },
}

fn open_session() -> Session {
    let dirs = DataDirs::resolve();

    let token = std::env::var("HF_TOKEN").unwrap_or_default();
    if token.is_empty() {
        warn!("HF_TOKEN is not set; explanation requests will be rejected by the endpoint");
    }
    let explainer = match std::env::var("CODI_MODEL_URL") {
        Ok(url) => match validate_endpoint(&url) {
            Ok(endpoint) => HfExplainer::with_endpoint(token, endpoint),
            Err(e) => {
                warn!("Ignoring CODI_MODEL_URL: {}", e);
                HfExplainer::new(token)
            }
        },
        Err(_) => HfExplainer::new(token),
    };

    let narrator: Box<dyn SpeechSynthesizer> = match EspeakSynthesizer::locate() {
        Ok(synth) => Box::new(synth),
        Err(e) => {
            warn!("{}", e);
            Box::new(DisabledSynthesizer::new(e.message()))
        }
    };

    Session::open(dirs, Box::new(explainer), narrator)
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Explain { file, style } => {
            let content = fs::read_to_string(&file)
                .map_err(|e| AppError::Storage(format!("Cannot read {}: {}", file.display(), e)))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());

            let mut session = open_session();
            if let Some(style) = style {
                session.settings.explanation_style = style;
            }
            let event = session.next_upload_event(filename, content);
            let entry = session.process_upload(&event)?;

            println!("{}", entry.explanation);
            if let Some(pdf) = resolve_artifact(entry.pdf_path.as_deref()) {
                println!("\nPDF: {}", pdf.display());
            }
            if let Some(audio) = resolve_artifact(entry.audio_path.as_deref()) {
                println!("Audio: {}", audio.display());
            }
        }
        Command::Ask { question } => {
            let mut session = open_session();
            let entry = session.ask(&question)?;
            println!("{}", entry.answer);
        }
        Command::History { kind } => {
            let session = open_session();
            match kind {
                HistoryKind::Uploads => {
                    for entry in session.uploads() {
                        println!("{} ({} bytes)", entry.filename, entry.content.len());
                    }
                }
                HistoryKind::Explanations => {
                    for entry in session.explanations() {
                        println!("== {} ==", entry.filename);
                        println!("{}", entry.explanation);
                        if let Some(pdf) = resolve_artifact(entry.pdf_path.as_deref()) {
                            println!("PDF: {}", pdf.display());
                        }
                        if let Some(audio) = resolve_artifact(entry.audio_path.as_deref()) {
                            println!("Audio: {}", audio.display());
                        }
                        println!();
                    }
                }
                HistoryKind::Chat => {
                    for entry in session.chat() {
                        println!("Q: {}", entry.question);
                        println!("A: {}", entry.answer);
                        println!();
                    }
                }
            }
        }
        Command::Clear { kind } => {
            let mut session = open_session();
            match kind {
                HistoryKind::Uploads => session.clear_uploads()?,
                HistoryKind::Explanations => session.clear_explanations()?,
                HistoryKind::Chat => session.clear_chat()?,
            }
            println!("History cleared.");
        }
        Command::Settings { action } => {
            let mut session = open_session();
            match action {
                SettingsCmd::Show => {
                    let raw = serde_json::to_string_pretty(&session.settings)
                        .map_err(|e| AppError::Storage(e.to_string()))?;
                    println!("{}", raw);
                    return Ok(());
                }
                SettingsCmd::Style { style } => session.settings.explanation_style = style,
                SettingsCmd::Voice { gender } => session.settings.voice_gender = gender,
                SettingsCmd::Rate { wpm } => session.settings.speech_rate = wpm,
                SettingsCmd::Assistant { enabled } => session.settings.voice_assistant = enabled,
                SettingsCmd::Activation { enabled } => session.settings.voice_activation = enabled,
            }
            session.save_settings()?;
            println!("Settings saved.");
        }
        Command::ExportChat => {
            let session = open_session();
            let path = session.export_chat_pdf()?;
            println!("Chat exported to {}", path.display());
        }
    }
    Ok(())
}

fn main() {
    load_local_env();
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}: {}", e.title(), e.message());
        std::process::exit(1);
    }
}
