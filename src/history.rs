use crate::constants::{AUDIO_EXT, CHAT_PDF_PREFIX, EXPL_PDF_PREFIX};
use crate::errors::AppError;
use crate::paths::{ensure_parent_dir, DataDirs};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One uploaded source file, verbatim. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEntry {
  pub filename: String,
  pub content: String,
  #[serde(default)]
  pub timestamp_ms: u64,
}

/// One (file, explanation) pair with the artifacts generated alongside it.
/// A recorded path is valid until the log is cleared; after that, readers go
/// through [`resolve_artifact`] and treat absence as "nothing to offer".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationEntry {
  pub filename: String,
  pub explanation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pdf_path: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub audio_path: Option<PathBuf>,
  #[serde(default)]
  pub timestamp_ms: u64,
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
  pub question: String,
  pub answer: String,
  #[serde(default)]
  pub timestamp_ms: u64,
}

/// Existence check for artifact paths that may dangle after a `clear_*`.
pub fn resolve_artifact(path: Option<&Path>) -> Option<PathBuf> {
  path.filter(|p| p.is_file()).map(Path::to_path_buf)
}

/// Three independent JSON-array logs plus the artifact files they index.
/// The store performs no de-duplication and no auto-persist: callers own
/// ordering, and every save is an explicit full overwrite.
pub struct HistoryStore {
  upload_path: PathBuf,
  explanation_path: PathBuf,
  chat_path: PathBuf,
  audio_dir: PathBuf,
  pdf_dir: PathBuf,
}

fn read_log<T: DeserializeOwned>(path: &Path) -> Vec<T> {
  match fs::read_to_string(path) {
    Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
    Err(_) => Vec::new(),
  }
}

fn write_log<T: Serialize>(path: &Path, entries: &[T]) -> Result<(), AppError> {
  let raw =
    serde_json::to_string_pretty(entries).map_err(|e| AppError::Storage(e.to_string()))?;
  ensure_parent_dir(path);
  fs::write(path, raw).map_err(|e| AppError::Storage(e.to_string()))?;
  Ok(())
}

impl HistoryStore {
  pub fn new(dirs: &DataDirs) -> Self {
    Self {
      upload_path: dirs.upload_history_path(),
      explanation_path: dirs.explanation_history_path(),
      chat_path: dirs.chat_history_path(),
      audio_dir: dirs.audio.clone(),
      pdf_dir: dirs.pdf.clone(),
    }
  }

  pub fn audio_dir(&self) -> &Path {
    &self.audio_dir
  }

  pub fn pdf_dir(&self) -> &Path {
    &self.pdf_dir
  }

  pub fn load_uploads(&self) -> Vec<UploadEntry> {
    read_log(&self.upload_path)
  }

  pub fn save_uploads(&self, entries: &[UploadEntry]) -> Result<(), AppError> {
    write_log(&self.upload_path, entries)
  }

  pub fn clear_uploads(&self) -> Result<(), AppError> {
    write_log::<UploadEntry>(&self.upload_path, &[])
  }

  pub fn load_explanations(&self) -> Vec<ExplanationEntry> {
    read_log(&self.explanation_path)
  }

  pub fn save_explanations(&self, entries: &[ExplanationEntry]) -> Result<(), AppError> {
    write_log(&self.explanation_path, entries)
  }

  /// Empties the explanation log, then deletes every narration file in the
  /// audio directory and every `expl_*.pdf`. Each deletion is independent;
  /// a failure is logged and the sweep continues.
  pub fn clear_explanations(&self) -> Result<(), AppError> {
    write_log::<ExplanationEntry>(&self.explanation_path, &[])?;
    sweep_dir(&self.audio_dir, |name| {
      Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_EXT))
    });
    sweep_dir(&self.pdf_dir, |name| {
      name.starts_with(EXPL_PDF_PREFIX) && name.ends_with(".pdf")
    });
    Ok(())
  }

  pub fn load_chat(&self) -> Vec<ChatEntry> {
    read_log(&self.chat_path)
  }

  pub fn save_chat(&self, entries: &[ChatEntry]) -> Result<(), AppError> {
    write_log(&self.chat_path, entries)
  }

  /// Empties the chat log and deletes every `chat_*.pdf`. Explanation and
  /// upload artifacts are untouched.
  pub fn clear_chat(&self) -> Result<(), AppError> {
    write_log::<ChatEntry>(&self.chat_path, &[])?;
    sweep_dir(&self.pdf_dir, |name| {
      name.starts_with(CHAT_PDF_PREFIX) && name.ends_with(".pdf")
    });
    Ok(())
  }
}

fn sweep_dir(dir: &Path, matches: impl Fn(&str) -> bool) {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(_) => return, // Directory missing: nothing to sweep
  };
  for entry in entries.flatten() {
    let name = entry.file_name();
    let Some(name) = name.to_str() else { continue };
    if !matches(name) {
      continue;
    }
    let path = entry.path();
    if !path.is_file() {
      continue;
    }
    if let Err(e) = fs::remove_file(&path) {
      warn!("Failed to delete artifact {}: {}", path.display(), e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store_in(base: &Path) -> HistoryStore {
    HistoryStore::new(&DataDirs::at(base))
  }

  #[test]
  fn test_load_missing_logs_are_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path());
    assert!(store.load_uploads().is_empty());
    assert!(store.load_explanations().is_empty());
    assert!(store.load_chat().is_empty());
  }

  #[test]
  fn test_load_corrupt_log_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path());
    fs::write(tmp.path().join("upload_history.json"), "[{broken").unwrap();
    assert!(store.load_uploads().is_empty());
  }

  #[test]
  fn test_upload_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path());
    let entries = vec![UploadEntry {
      filename: "a.py".to_string(),
      content: "print(1)".to_string(),
      timestamp_ms: 1,
    }];
    store.save_uploads(&entries).unwrap();
    assert_eq!(store.load_uploads(), entries);
  }

  #[test]
  fn test_clear_explanations_sweeps_audio_and_expl_pdfs_only() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DataDirs::at(tmp.path());
    let store = HistoryStore::new(&dirs);

    let audio = dirs.audio.join("f1.wav");
    let expl_pdf = dirs.pdf.join("expl_f1.pdf");
    let chat_pdf = dirs.pdf.join("chat_c1.pdf");
    let settings = dirs.settings_path();
    fs::write(&audio, b"wav").unwrap();
    fs::write(&expl_pdf, b"pdf").unwrap();
    fs::write(&chat_pdf, b"pdf").unwrap();
    fs::write(&settings, b"{}").unwrap();

    store
      .save_explanations(&[ExplanationEntry {
        filename: "f1.py".to_string(),
        explanation: "does things".to_string(),
        pdf_path: Some(expl_pdf.clone()),
        audio_path: Some(audio.clone()),
        timestamp_ms: 1,
      }])
      .unwrap();

    store.clear_explanations().unwrap();

    assert!(store.load_explanations().is_empty());
    assert!(!audio.exists());
    assert!(!expl_pdf.exists());
    assert!(chat_pdf.exists());
    assert!(settings.exists());
  }

  #[test]
  fn test_clear_chat_sweeps_chat_pdfs_only() {
    let tmp = tempfile::tempdir().unwrap();
    let dirs = DataDirs::at(tmp.path());
    let store = HistoryStore::new(&dirs);

    let chat_pdf = dirs.pdf.join("chat_c1.pdf");
    let expl_pdf = dirs.pdf.join("expl_f1.pdf");
    let audio = dirs.audio.join("f1.wav");
    fs::write(&chat_pdf, b"pdf").unwrap();
    fs::write(&expl_pdf, b"pdf").unwrap();
    fs::write(&audio, b"wav").unwrap();

    store
      .save_chat(&[ChatEntry {
        question: "why".to_string(),
        answer: "because".to_string(),
        timestamp_ms: 1,
      }])
      .unwrap();

    store.clear_chat().unwrap();

    assert!(store.load_chat().is_empty());
    assert!(!chat_pdf.exists());
    assert!(expl_pdf.exists());
    assert!(audio.exists());
  }

  #[test]
  fn test_logs_are_independent() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path());
    store
      .save_uploads(&[UploadEntry {
        filename: "a.py".to_string(),
        content: "pass".to_string(),
        timestamp_ms: 1,
      }])
      .unwrap();
    store.clear_chat().unwrap();
    store.clear_explanations().unwrap();
    assert_eq!(store.load_uploads().len(), 1);
  }

  #[test]
  fn test_resolve_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let present = tmp.path().join("present.wav");
    fs::write(&present, b"wav").unwrap();
    let missing = tmp.path().join("missing.wav");

    assert_eq!(resolve_artifact(Some(&present)), Some(present));
    assert_eq!(resolve_artifact(Some(&missing)), None);
    assert_eq!(resolve_artifact(None), None);
  }

  #[test]
  fn test_optional_paths_omitted_from_json() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path());
    store
      .save_explanations(&[ExplanationEntry {
        filename: "f.py".to_string(),
        explanation: "short".to_string(),
        pdf_path: None,
        audio_path: None,
        timestamp_ms: 0,
      }])
      .unwrap();
    let raw = fs::read_to_string(tmp.path().join("explanation_history.json")).unwrap();
    assert!(!raw.contains("pdf_path"));
    assert!(!raw.contains("audio_path"));
  }
}
