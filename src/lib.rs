// Codi - code-explanation assistant core

pub mod constants;
pub mod errors;
pub mod explainer;
pub mod history;
pub mod narration;
pub mod paths;
pub mod pdf;
pub mod session;
pub mod settings;
mod util;

pub use errors::AppError;
pub use explainer::{ExplanationProvider, HfExplainer};
pub use history::{resolve_artifact, ChatEntry, ExplanationEntry, HistoryStore, UploadEntry};
pub use narration::{EspeakSynthesizer, SpeechSynthesizer, VoiceProfile};
pub use paths::DataDirs;
pub use session::{Session, UploadEvent};
pub use settings::{ExplanationStyle, Settings, SettingsStore, SpeechState, VoiceGender};

use std::fs;
use std::path::PathBuf;
use tracing::info;

pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Codi starting up");
}

/// Load `codi.env` / `.env` style files from the working directory into the
/// process environment (used for `HF_TOKEN`). Existing variables win.
pub fn load_local_env() {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let candidates = vec![
        cwd.join("codi.env"),
        cwd.join(".env.local"),
        cwd.join(".env"),
    ];

    for path in candidates {
        if !path.exists() {
            continue;
        }
        if let Ok(raw) = fs::read_to_string(&path) {
            for line in raw.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let mut parts = line.splitn(2, '=');
                let key = parts.next().unwrap_or("").trim();
                let value = parts.next().unwrap_or("").trim();
                if key.is_empty() || value.is_empty() {
                    continue;
                }
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }
}
