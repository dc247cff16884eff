use crate::errors::AppError;
use crate::paths::ensure_parent_dir;
use crate::settings::VoiceGender;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;
use which::which;

/// Voice parameters taken from the current settings at synthesis time.
#[derive(Debug, Clone, Copy)]
pub struct VoiceProfile {
    pub gender: VoiceGender,
    pub rate_wpm: u32,
}

/// Speech-synthesis collaborator: writes an audio file at the destination
/// and returns its final path.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        dest: &Path,
        voice: &VoiceProfile,
    ) -> Result<PathBuf, AppError>;
}

/// Narration via the espeak-ng CLI (espeak as a fallback).
pub struct EspeakSynthesizer {
    binary: PathBuf,
}

impl EspeakSynthesizer {
    /// Locate the TTS binary: `CODI_ESPEAK` override first, then PATH.
    pub fn locate() -> Result<Self, AppError> {
        if let Ok(path) = std::env::var("CODI_ESPEAK") {
            let candidate = PathBuf::from(path);
            if candidate.exists() {
                return Ok(Self { binary: candidate });
            }
        }
        for name in ["espeak-ng", "espeak"] {
            if let Ok(path) = which(name) {
                return Ok(Self { binary: path });
            }
        }
        Err(AppError::Narration(
            "espeak-ng not found (install it or set CODI_ESPEAK)".to_string(),
        ))
    }
}

/// Stand-in for when no TTS binary could be located. Every call fails with
/// the original discovery error, which the session records as a warning and
/// a missing audio artifact.
pub struct DisabledSynthesizer {
    reason: String,
}

impl DisabledSynthesizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechSynthesizer for DisabledSynthesizer {
    fn synthesize(
        &self,
        _text: &str,
        _dest: &Path,
        _voice: &VoiceProfile,
    ) -> Result<PathBuf, AppError> {
        Err(AppError::Narration(self.reason.clone()))
    }
}

fn voice_arg(gender: VoiceGender) -> &'static str {
    match gender {
        VoiceGender::Neutral => "en",
        VoiceGender::Female => "en+f3",
        VoiceGender::Male => "en+m3",
    }
}

fn build_args(text: &str, dest: &Path, voice: &VoiceProfile) -> Vec<OsString> {
    vec![
        OsString::from("-v"),
        OsString::from(voice_arg(voice.gender)),
        OsString::from("-s"),
        OsString::from(voice.rate_wpm.to_string()),
        OsString::from("-w"),
        dest.as_os_str().to_os_string(),
        OsString::from(text),
    ]
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn synthesize(
        &self,
        text: &str,
        dest: &Path,
        voice: &VoiceProfile,
    ) -> Result<PathBuf, AppError> {
        ensure_parent_dir(dest);
        let output = Command::new(&self.binary)
            .args(build_args(text, dest, voice))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| AppError::Narration(format!("Failed to run espeak: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Narration(format!(
                "espeak exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if !dest.is_file() {
            return Err(AppError::Narration(format!(
                "espeak reported success but wrote no file at {}",
                dest.display()
            )));
        }
        info!("Narration written to {}", dest.display());
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_arg_mapping() {
        assert_eq!(voice_arg(VoiceGender::Neutral), "en");
        assert_eq!(voice_arg(VoiceGender::Female), "en+f3");
        assert_eq!(voice_arg(VoiceGender::Male), "en+m3");
    }

    #[test]
    fn test_build_args_order() {
        let voice = VoiceProfile {
            gender: VoiceGender::Male,
            rate_wpm: 165,
        };
        let args = build_args("hello", Path::new("/tmp/out.wav"), &voice);
        assert_eq!(args[0], "-v");
        assert_eq!(args[1], "en+m3");
        assert_eq!(args[2], "-s");
        assert_eq!(args[3], "165");
        assert_eq!(args[4], "-w");
        assert_eq!(args[5], "/tmp/out.wav");
        assert_eq!(args[6], "hello");
    }
}
