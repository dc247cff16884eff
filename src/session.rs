use crate::constants::{AUDIO_EXT, CHAT_PDF_PREFIX, EXPL_PDF_PREFIX};
use crate::errors::AppError;
use crate::explainer::ExplanationProvider;
use crate::history::{ChatEntry, ExplanationEntry, HistoryStore, UploadEntry};
use crate::narration::{SpeechSynthesizer, VoiceProfile};
use crate::paths::DataDirs;
use crate::pdf::write_text_pdf;
use crate::settings::{Settings, SettingsStore};
use crate::util::now_ms;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// One distinct upload action. The id is monotonic within a session; a
/// re-delivery of the same event (a re-render, not a new upload) carries the
/// same id and must not append twice.
#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub id: u64,
    pub filename: String,
    pub content: String,
}

/// The single application actor: owns the working copies of settings and all
/// three history logs, and flushes to the stores explicitly after each
/// mutation. The stores never persist on their own.
pub struct Session {
    dirs: DataDirs,
    settings_store: SettingsStore,
    store: HistoryStore,
    explainer: Box<dyn ExplanationProvider>,
    narrator: Box<dyn SpeechSynthesizer>,
    pub settings: Settings,
    uploads: Vec<UploadEntry>,
    explanations: Vec<ExplanationEntry>,
    chat: Vec<ChatEntry>,
    last_saved_upload: Option<(u64, String)>,
    next_event_id: u64,
}

impl Session {
    pub fn open(
        dirs: DataDirs,
        explainer: Box<dyn ExplanationProvider>,
        narrator: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        let settings_store = SettingsStore::new(dirs.settings_path());
        let store = HistoryStore::new(&dirs);
        let settings = settings_store.load();
        let uploads = store.load_uploads();
        let explanations = store.load_explanations();
        let chat = store.load_chat();
        Self {
            dirs,
            settings_store,
            store,
            explainer,
            narrator,
            settings,
            uploads,
            explanations,
            chat,
            last_saved_upload: None,
            next_event_id: 0,
        }
    }

    pub fn uploads(&self) -> &[UploadEntry] {
        &self.uploads
    }

    pub fn explanations(&self) -> &[ExplanationEntry] {
        &self.explanations
    }

    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    /// Mint the idempotency key for a new upload action.
    pub fn next_upload_event(&mut self, filename: String, content: String) -> UploadEvent {
        self.next_event_id += 1;
        UploadEvent {
            id: self.next_event_id,
            filename,
            content,
        }
    }

    /// Record the upload, obtain its explanation, generate the artifacts and
    /// append the explanation entry. Artifacts are on disk before the log
    /// save that references them; a failed artifact leaves `None` behind.
    ///
    /// Re-delivery of an already-processed event returns the recorded entry
    /// without appending anything.
    pub fn process_upload(&mut self, event: &UploadEvent) -> Result<ExplanationEntry, AppError> {
        if self.last_saved_upload.as_ref() == Some(&(event.id, event.filename.clone())) {
            info!("Upload event {} already processed, skipping", event.id);
            return self
                .explanations
                .iter()
                .find(|e| e.filename == event.filename)
                .cloned()
                .ok_or_else(|| {
                    AppError::Other("Upload already processed this session".to_string())
                });
        }

        self.uploads.insert(
            0,
            UploadEntry {
                filename: event.filename.clone(),
                content: event.content.clone(),
                timestamp_ms: now_ms(),
            },
        );
        self.store.save_uploads(&self.uploads)?;

        let explanation = match self
            .explainer
            .explain(&event.content, self.settings.explanation_style)
        {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: {}", e.title(), e.message());
                format!("Error explaining code: {}", e.message())
            }
        };

        let file_id = Uuid::new_v4().to_string();
        let pdf_dest = self
            .dirs
            .pdf
            .join(format!("{}{}.pdf", EXPL_PDF_PREFIX, file_id));
        let pdf_path = match write_text_pdf(&pdf_dest, &event.filename, &explanation) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Explanation PDF not generated: {}", e);
                None
            }
        };

        let voice = VoiceProfile {
            gender: self.settings.voice_gender,
            rate_wpm: self.settings.speech_rate,
        };
        let audio_dest = self.dirs.audio.join(format!("{}.{}", file_id, AUDIO_EXT));
        let audio_path = match self.narrator.synthesize(&explanation, &audio_dest, &voice) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Narration not generated: {}", e);
                None
            }
        };

        let entry = ExplanationEntry {
            filename: event.filename.clone(),
            explanation,
            pdf_path,
            audio_path,
            timestamp_ms: now_ms(),
        };
        self.explanations.insert(0, entry.clone());
        self.store.save_explanations(&self.explanations)?;

        self.last_saved_upload = Some((event.id, event.filename.clone()));
        self.settings.last_uploaded_file_id = Some(file_id);
        Ok(entry)
    }

    /// Answer a question with the newest upload (if any) as code context.
    /// A collaborator failure becomes the recorded answer; the session keeps
    /// going.
    pub fn ask(&mut self, question: &str) -> Result<ChatEntry, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::Other("Please enter a question".to_string()));
        }
        let code = self.uploads.first().map(|u| u.content.clone());
        let answer = match self.explainer.answer(
            question,
            self.settings.explanation_style,
            code.as_deref(),
        ) {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: {}", e.title(), e.message());
                format!("Error fetching answer: {}", e.message())
            }
        };
        let entry = ChatEntry {
            question: question.to_string(),
            answer,
            timestamp_ms: now_ms(),
        };
        self.chat.insert(0, entry.clone());
        self.store.save_chat(&self.chat)?;
        Ok(entry)
    }

    /// Export the whole chat log (oldest first) as a `chat_*.pdf` artifact.
    pub fn export_chat_pdf(&self) -> Result<PathBuf, AppError> {
        if self.chat.is_empty() {
            return Err(AppError::Other("No chat history to export".to_string()));
        }
        let mut body = String::new();
        for entry in self.chat.iter().rev() {
            body.push_str("Q: ");
            body.push_str(&entry.question);
            body.push_str("\nA: ");
            body.push_str(&entry.answer);
            body.push_str("\n\n");
        }
        let dest = self
            .dirs
            .pdf
            .join(format!("{}{}.pdf", CHAT_PDF_PREFIX, Uuid::new_v4()));
        write_text_pdf(&dest, "Chat history", &body)
    }

    pub fn clear_uploads(&mut self) -> Result<(), AppError> {
        self.store.clear_uploads()?;
        self.uploads.clear();
        self.last_saved_upload = None;
        Ok(())
    }

    pub fn clear_explanations(&mut self) -> Result<(), AppError> {
        self.store.clear_explanations()?;
        self.explanations.clear();
        Ok(())
    }

    pub fn clear_chat(&mut self) -> Result<(), AppError> {
        self.store.clear_chat()?;
        self.chat.clear();
        Ok(())
    }

    /// Explicit flush of the working settings copy; nothing auto-saves.
    pub fn save_settings(&self) -> Result<(), AppError> {
        self.settings_store.save(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::resolve_artifact;
    use crate::settings::ExplanationStyle;
    use std::fs;
    use std::path::Path;

    struct StubExplainer {
        fail: bool,
    }

    impl ExplanationProvider for StubExplainer {
        fn explain(&self, code: &str, _style: ExplanationStyle) -> Result<String, AppError> {
            if self.fail {
                return Err(AppError::Network("connection refused".to_string()));
            }
            Ok(format!("explained: {}", code))
        }

        fn answer(
            &self,
            question: &str,
            _style: ExplanationStyle,
            code: Option<&str>,
        ) -> Result<String, AppError> {
            if self.fail {
                return Err(AppError::Network("connection refused".to_string()));
            }
            Ok(format!("answered: {} (ctx: {})", question, code.is_some()))
        }
    }

    struct StubNarrator {
        fail: bool,
    }

    impl SpeechSynthesizer for StubNarrator {
        fn synthesize(
            &self,
            _text: &str,
            dest: &Path,
            _voice: &VoiceProfile,
        ) -> Result<std::path::PathBuf, AppError> {
            if self.fail {
                return Err(AppError::Narration("no tts".to_string()));
            }
            fs::write(dest, b"RIFF").unwrap();
            Ok(dest.to_path_buf())
        }
    }

    fn session_in(base: &Path, explain_fail: bool, narrate_fail: bool) -> Session {
        Session::open(
            DataDirs::at(base),
            Box::new(StubExplainer { fail: explain_fail }),
            Box::new(StubNarrator { fail: narrate_fail }),
        )
    }

    #[test]
    fn test_process_upload_records_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        let entry = session.process_upload(&event).unwrap();

        assert_eq!(session.uploads().len(), 1);
        assert_eq!(session.uploads()[0].filename, "a.py");
        assert_eq!(entry.explanation, "explained: print(1)");

        // Artifact coupling: recorded paths exist on disk
        assert!(resolve_artifact(entry.pdf_path.as_deref()).is_some());
        assert!(resolve_artifact(entry.audio_path.as_deref()).is_some());
        assert!(session.settings.last_uploaded_file_id.is_some());
    }

    #[test]
    fn test_duplicate_event_is_not_appended_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        session.process_upload(&event).unwrap();
        session.process_upload(&event).unwrap();

        assert_eq!(session.uploads().len(), 1);
        assert_eq!(session.explanations().len(), 1);
    }

    #[test]
    fn test_distinct_events_with_same_filename_both_count() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        let first = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        session.process_upload(&first).unwrap();
        let second = session.next_upload_event("a.py".to_string(), "print(2)".to_string());
        session.process_upload(&second).unwrap();

        assert_eq!(session.uploads().len(), 2);
        // Newest first
        assert_eq!(session.uploads()[0].content, "print(2)");
    }

    #[test]
    fn test_explainer_failure_is_recorded_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), true, false);
        let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        let entry = session.process_upload(&event).unwrap();

        assert!(entry.explanation.starts_with("Error explaining code:"));
        assert_eq!(session.explanations().len(), 1);
    }

    #[test]
    fn test_narrator_failure_leaves_audio_path_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, true);
        let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        let entry = session.process_upload(&event).unwrap();

        assert!(entry.audio_path.is_none());
        assert!(entry.pdf_path.is_some());
    }

    #[test]
    fn test_ask_uses_newest_upload_as_context() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        let no_ctx = session.ask("what is a list").unwrap();
        assert!(no_ctx.answer.contains("ctx: false"));

        let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        session.process_upload(&event).unwrap();
        let with_ctx = session.ask("what does it print").unwrap();
        assert!(with_ctx.answer.contains("ctx: true"));

        // Newest first
        assert_eq!(session.chat()[0].question, "what does it print");
        assert_eq!(session.chat().len(), 2);
    }

    #[test]
    fn test_ask_rejects_empty_question() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        assert!(session.ask("  ").is_err());
        assert!(session.chat().is_empty());
    }

    #[test]
    fn test_clear_explanations_removes_artifacts_and_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
        let entry = session.process_upload(&event).unwrap();
        let audio = entry.audio_path.clone().unwrap();
        assert!(audio.exists());

        session.clear_explanations().unwrap();
        assert!(session.explanations().is_empty());
        assert!(!audio.exists());
        // Uploads untouched
        assert_eq!(session.uploads().len(), 1);
    }

    #[test]
    fn test_chat_export_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = session_in(tmp.path(), false, false);
        session.ask("first").unwrap();
        session.ask("second").unwrap();

        let pdf = session.export_chat_pdf().unwrap();
        assert!(pdf.exists());
        assert!(pdf
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("chat_"));

        session.clear_chat().unwrap();
        assert!(session.chat().is_empty());
        assert!(!pdf.exists());
    }

    #[test]
    fn test_state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut session = session_in(tmp.path(), false, false);
            let event = session.next_upload_event("a.py".to_string(), "print(1)".to_string());
            session.process_upload(&event).unwrap();
            session.ask("why").unwrap();
            session.settings.explanation_style = ExplanationStyle::InDepth;
            session.save_settings().unwrap();
        }
        let session = session_in(tmp.path(), false, false);
        assert_eq!(session.uploads().len(), 1);
        assert_eq!(session.explanations().len(), 1);
        assert_eq!(session.chat().len(), 1);
        assert_eq!(session.settings.explanation_style, ExplanationStyle::InDepth);
    }
}
