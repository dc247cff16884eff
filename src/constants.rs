pub const DEFAULT_MODEL_URL: &str =
  "https://api-inference.huggingface.co/models/mistralai/Mixtral-8x7B-Instruct-v0.1";

pub const CONNECT_TIMEOUT_SECS: u64 = 10;
pub const READ_TIMEOUT_SECS: u64 = 40;

pub const MAX_NEW_TOKENS: u32 = 512;
pub const TEMPERATURE: f64 = 0.7;
pub const TOP_P: f64 = 0.95;

pub const SPEECH_RATE_DEFAULT: u32 = 165;
pub const SPEECH_RATE_MIN: u32 = 80;
pub const SPEECH_RATE_MAX: u32 = 400;

/// Extension of generated narration files; the explanation-history sweep
/// matches on this.
pub const AUDIO_EXT: &str = "wav";

pub const EXPL_PDF_PREFIX: &str = "expl_";
pub const CHAT_PDF_PREFIX: &str = "chat_";
