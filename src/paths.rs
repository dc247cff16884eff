use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of everything the stores own: the JSON files live in the
/// base directory, narration audio in `audio/`, generated PDFs next to the
/// JSON files.
#[derive(Debug, Clone)]
pub struct DataDirs {
  pub base: PathBuf,
  pub audio: PathBuf,
  pub pdf: PathBuf,
}

impl DataDirs {
  /// Resolve the data directory: `CODI_DATA_DIR` wins, otherwise `data/`
  /// under the current working directory.
  pub fn resolve() -> Self {
    if let Ok(dir) = std::env::var("CODI_DATA_DIR") {
      let trimmed = dir.trim();
      if !trimmed.is_empty() {
        return Self::at(PathBuf::from(trimmed));
      }
    }
    let base = std::env::current_dir()
      .unwrap_or_else(|_| PathBuf::from("."))
      .join("data");
    Self::at(base)
  }

  /// Layout rooted at an explicit base directory. Directory creation is
  /// idempotent and best-effort; a failure surfaces later as a write error.
  pub fn at(base: impl Into<PathBuf>) -> Self {
    let base = base.into();
    let audio = base.join("audio");
    let _ = fs::create_dir_all(&base);
    let _ = fs::create_dir_all(&audio);
    Self {
      pdf: base.clone(),
      audio,
      base,
    }
  }

  pub fn settings_path(&self) -> PathBuf {
    self.base.join("settings.json")
  }

  pub fn upload_history_path(&self) -> PathBuf {
    self.base.join("upload_history.json")
  }

  pub fn explanation_history_path(&self) -> PathBuf {
    self.base.join("explanation_history.json")
  }

  pub fn chat_history_path(&self) -> PathBuf {
    self.base.join("chat_history.json")
  }
}

pub(crate) fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent() {
    let _ = fs::create_dir_all(parent);
  }
}
