use crate::constants::{SPEECH_RATE_DEFAULT, SPEECH_RATE_MAX, SPEECH_RATE_MIN};
use crate::errors::AppError;
use crate::paths::ensure_parent_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplanationStyle {
  #[serde(rename = "concise")]
  Concise,
  #[serde(rename = "reiterate")]
  Reiterate,
  #[serde(rename = "in-depth")]
  InDepth,
}

impl ExplanationStyle {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExplanationStyle::Concise => "concise",
      ExplanationStyle::Reiterate => "reiterate",
      ExplanationStyle::InDepth => "in-depth",
    }
  }
}

impl fmt::Display for ExplanationStyle {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ExplanationStyle {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "concise" => Ok(ExplanationStyle::Concise),
      "reiterate" => Ok(ExplanationStyle::Reiterate),
      "in-depth" | "indepth" => Ok(ExplanationStyle::InDepth),
      other => Err(format!(
        "unknown style '{}' (expected concise, reiterate or in-depth)",
        other
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceGender {
  Neutral,
  Female,
  Male,
}

impl fmt::Display for VoiceGender {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      VoiceGender::Neutral => f.write_str("Neutral"),
      VoiceGender::Female => f.write_str("Female"),
      VoiceGender::Male => f.write_str("Male"),
    }
  }
}

impl FromStr for VoiceGender {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "neutral" => Ok(VoiceGender::Neutral),
      "female" => Ok(VoiceGender::Female),
      "male" => Ok(VoiceGender::Male),
      other => Err(format!(
        "unknown voice gender '{}' (expected Neutral, Female or Male)",
        other
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechState {
  Paused,
  Playing,
}

/// User-facing configuration, persisted as one pretty-printed JSON object.
///
/// Load policy: keys present in the file win, keys missing from the file fall
/// back to their defaults (struct-level `#[serde(default)]`). A wholly
/// absent or unparseable file yields the full default record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub explanation_style: ExplanationStyle,
  pub voice_assistant: bool,
  pub voice_activation: bool,
  pub voice_gender: VoiceGender,
  pub speech_rate: u32,
  pub speech_state: SpeechState,
  pub current_block_index: u64,
  pub last_uploaded_file_id: Option<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      explanation_style: ExplanationStyle::Concise,
      voice_assistant: false,
      voice_activation: false,
      voice_gender: VoiceGender::Neutral,
      speech_rate: SPEECH_RATE_DEFAULT,
      speech_state: SpeechState::Paused,
      current_block_index: 0,
      last_uploaded_file_id: None,
    }
  }
}

pub struct SettingsStore {
  path: PathBuf,
}

impl SettingsStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Never fails: a missing, unreadable or corrupt file yields the default
  /// record. Out-of-range numeric fields are pulled back to their defaults;
  /// in-range values round-trip untouched.
  pub fn load(&self) -> Settings {
    let mut settings = match fs::read_to_string(&self.path) {
      Ok(raw) => serde_json::from_str::<Settings>(&raw).unwrap_or_default(),
      Err(_) => Settings::default(),
    };
    if !(SPEECH_RATE_MIN..=SPEECH_RATE_MAX).contains(&settings.speech_rate) {
      settings.speech_rate = SPEECH_RATE_DEFAULT;
    }
    settings
  }

  /// Unconditional overwrite, last-writer-wins. I/O errors propagate to the
  /// caller, which owns user-visible messaging.
  pub fn save(&self, settings: &Settings) -> Result<(), AppError> {
    let raw = serde_json::to_string_pretty(settings)
      .map_err(|e| AppError::Storage(e.to_string()))?;
    ensure_parent_dir(&self.path);
    fs::write(&self.path, raw).map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(())
  }
}
