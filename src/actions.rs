//! Business logic - what happens when the user picks a function
//!
//! Each flow shows a message, then asks for input through a [`Prompt`]. The
//! answer comes back through [`on_answer`]; slow work (translation, credential
//! checks) runs on a worker and returns through the `on_*` result handlers.

use std::time::Duration;

use pet_core::{MessageSink, Pattern};
use pet_services::{
    detect_language, format_translation, Credentials, Lang, NoteError, NoteStore, TranslateError,
};

/// Entries of the function menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ReadNote,
    AddNote,
    Question,
    Translate,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 4] = [Self::ReadNote, Self::AddNote, Self::Question, Self::Translate];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ReadNote => "1. Read note",
            Self::AddNote => "2. Add note",
            Self::Question => "3. Ask a question",
            Self::Translate => "4. Translate",
        }
    }
}

/// Input the pet is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// File or folder whose note should be read
    ReadKey,
    /// "y" to modify an existing note, "n" for a new one
    ModifyOrNew,
    NoteKey { modify: bool },
    NoteText { key: String, modify: bool },
    /// Text to translate; offline uses the built-in dictionary only
    TranslateText { offline: bool },
    Credentials,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Self::ReadKey => "Read note",
            Self::ModifyOrNew => "Add note",
            Self::NoteKey { modify: true } => "Modify note",
            Self::NoteKey { modify: false } => "New note",
            Self::NoteText { .. } => "Note",
            Self::TranslateText { .. } => "Translate",
            Self::Credentials => "Translation API",
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::ReadKey => "File name:".to_string(),
            Self::ModifyOrNew => "Enter y or n:".to_string(),
            Self::NoteKey { modify: true } => "File whose note should change:".to_string(),
            Self::NoteKey { modify: false } => "File to add a note to:".to_string(),
            Self::NoteText { key, .. } => format!("Note for '{}':", key),
            Self::TranslateText { offline: false } => "Text to translate:".to_string(),
            Self::TranslateText { offline: true } => {
                "Text to translate (offline dictionary):".to_string()
            }
            Self::Credentials => "APPID and secret key:".to_string(),
        }
    }
}

/// What the user entered in a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Text(String),
    Credentials(Credentials),
    Cancelled,
}

impl PromptAnswer {
    /// Trimmed, non-empty text; anything else counts as a cancel.
    fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }
}

/// Work scheduled to run after a delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    Ask(Prompt),
    StartTranslation,
}

/// One translation job for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub from: Lang,
    pub to: Lang,
    pub offline: bool,
}

/// Why credentials are being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Stored credentials, checked before a translation
    Stored,
    /// Entered by the user; saved when valid
    Entered,
}

/// What the flows need from the host shell.
pub trait PetHost: MessageSink {
    /// Show `prompt` once the current message had a moment to appear.
    fn ask(&mut self, prompt: Prompt);
    /// Run `action` after `delay`.
    fn defer(&mut self, delay: Duration, action: Deferred);
    /// Delay before the translation flow restarts after configuring the API.
    fn retry_delay(&self) -> Duration;
    fn notes(&mut self) -> &mut NoteStore;
    fn credentials(&self) -> Option<Credentials>;
    fn save_credentials(&mut self, credentials: &Credentials) -> Result<(), TranslateError>;
    fn spawn_translation(&mut self, request: TranslationRequest);
    fn spawn_credential_check(&mut self, credentials: Credentials, check: CredentialCheck);
}

/// Handle a function menu pick
pub fn on_menu_choice(host: &mut impl PetHost, choice: MenuChoice) {
    log::info!("Action: {:?}", choice);
    match choice {
        MenuChoice::ReadNote => {
            host.show_message("Which file's note do you want to read?", Pattern::TalkingA);
            host.ask(Prompt::ReadKey);
        }
        MenuChoice::AddNote => {
            host.show_message(
                "Modify the note of an existing file (y), or add a new note (n)?",
                Pattern::TalkingA,
            );
            host.ask(Prompt::ModifyOrNew);
        }
        MenuChoice::Question => {
            host.show_message("Asking questions is not supported yet", Pattern::Denying);
        }
        MenuChoice::Translate => start_translation(host),
    }
}

/// Begin the translation flow: check stored credentials, or ask for them.
pub fn start_translation(host: &mut impl PetHost) {
    match host.credentials() {
        Some(credentials) => host.spawn_credential_check(credentials, CredentialCheck::Stored),
        None => {
            host.show_message(
                "No translation API is configured yet, please set it up first",
                Pattern::TalkingB,
            );
            host.ask(Prompt::Credentials);
        }
    }
}

/// Handle the answer to `prompt`
pub fn on_answer(host: &mut impl PetHost, prompt: Prompt, answer: PromptAnswer) {
    log::debug!("Prompt {:?} answered: {:?}", prompt, answer);
    match prompt {
        Prompt::ReadKey => match answer.text() {
            Some(key) => read_note(host, key),
            None => host.show_message("Reading the note was cancelled", Pattern::Denying),
        },
        Prompt::ModifyOrNew => match answer.text().map(str::to_lowercase).as_deref() {
            Some("y") => host.ask(Prompt::NoteKey { modify: true }),
            Some("n") => host.ask(Prompt::NoteKey { modify: false }),
            _ => host.show_message("Adding a note was cancelled", Pattern::Denying),
        },
        Prompt::NoteKey { modify } => match answer.text() {
            Some(key) => host.ask(Prompt::NoteText {
                key: key.to_string(),
                modify,
            }),
            None if modify => host.show_message("Modifying the note was cancelled", Pattern::Denying),
            None => host.show_message("The new note was cancelled", Pattern::Denying),
        },
        Prompt::NoteText { key, modify } => match answer.text() {
            Some(note) => save_note(host, &key, note, modify),
            None => host.show_message("Saving the note was cancelled", Pattern::Denying),
        },
        Prompt::TranslateText { offline } => match answer.text() {
            Some(text) => {
                let from = detect_language(text);
                host.spawn_translation(TranslationRequest {
                    text: text.to_string(),
                    from,
                    to: from.opposite(),
                    offline,
                });
            }
            None => host.show_message("Translation was cancelled", Pattern::Denying),
        },
        Prompt::Credentials => match answer {
            PromptAnswer::Credentials(credentials) if credentials.is_complete() => {
                host.spawn_credential_check(credentials, CredentialCheck::Entered);
            }
            PromptAnswer::Credentials(_) => {
                host.show_message("Both the APPID and the key are required", Pattern::Denying);
                host.ask(Prompt::Credentials);
            }
            _ => {
                host.show_message(
                    "API configuration cancelled, I'll use my little dictionary instead",
                    Pattern::Denying,
                );
                host.ask(Prompt::TranslateText { offline: true });
            }
        },
    }
}

fn read_note(host: &mut impl PetHost, key: &str) {
    let message = match host.notes().get(key) {
        Ok(note) => Ok(format!("The note for '{}' is:\n{}", key, note)),
        Err(NoteError::NotFound(_)) => Err(format!("No note found for '{}'", key)),
        Err(e) => Err(format!("Error while reading the note:\n{}", e)),
    };
    match message {
        Ok(text) => host.show_message(&text, Pattern::TalkingA),
        Err(text) => host.show_message(&text, Pattern::Denying),
    }
}

fn save_note(host: &mut impl PetHost, key: &str, note: &str, modify: bool) {
    match host.notes().set(key, note) {
        Ok(()) => {
            let action = if modify { "updated" } else { "added" };
            host.show_message(
                &format!("Successfully {} the note for '{}'", action, key),
                Pattern::TalkingA,
            );
        }
        Err(e) => {
            log::error!("Failed to save note for '{}': {}", key, e);
            host.show_message(&format!("Error while saving the note:\n{}", e), Pattern::Denying);
        }
    }
}

/// Handle a finished translation
pub fn on_translation_result(
    host: &mut impl PetHost,
    request: &TranslationRequest,
    result: Result<String, TranslateError>,
) {
    match result {
        Ok(translated) => {
            let message = format_translation(&request.text, request.from, &translated, request.to);
            host.show_message(&message, Pattern::TalkingA);
        }
        Err(e) => {
            log::warn!("Translation failed: {}", e);
            host.show_message(&format!("Translation failed:\n{}", e), Pattern::Denying);
        }
    }
}

/// Handle a finished credential check
pub fn on_credentials_checked(
    host: &mut impl PetHost,
    credentials: Credentials,
    check: CredentialCheck,
    result: Result<(), TranslateError>,
) {
    match (check, result) {
        (CredentialCheck::Stored, Ok(())) => {
            host.show_message("Please enter the text to translate", Pattern::TalkingA);
            host.ask(Prompt::TranslateText { offline: false });
        }
        (CredentialCheck::Stored, Err(e)) => {
            log::warn!("Stored translation credentials rejected: {}", e);
            host.show_message(
                "Sorry... the API doesn't seem right. Could you enter your APPID and key?",
                Pattern::Denying,
            );
            host.ask(Prompt::Credentials);
        }
        (CredentialCheck::Entered, Ok(())) => match host.save_credentials(&credentials) {
            Ok(()) => {
                host.show_message(
                    "API configured, thank you! Translation is ready now",
                    Pattern::TalkingA,
                );
                let delay = host.retry_delay();
                host.defer(delay, Deferred::StartTranslation);
            }
            Err(e) => {
                host.show_message(
                    &format!("Failed to save the API configuration:\n{}", e),
                    Pattern::Denying,
                );
            }
        },
        (CredentialCheck::Entered, Err(e)) => {
            host.show_message(&format!("The API check failed:\n{}", e), Pattern::Denying);
            host.ask(Prompt::Credentials);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHost {
        messages: Vec<(String, Pattern)>,
        prompts: Vec<Prompt>,
        deferred: Vec<(Duration, Deferred)>,
        notes: NoteStore,
        credentials: Option<Credentials>,
        saved: Vec<Credentials>,
        translations: Vec<TranslationRequest>,
        checks: Vec<(Credentials, CredentialCheck)>,
        _dir: tempfile::TempDir,
    }

    impl FakeHost {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let notes = NoteStore::open(dir.path().join("folder_notes.txt")).unwrap();
            Self {
                messages: Vec::new(),
                prompts: Vec::new(),
                deferred: Vec::new(),
                notes,
                credentials: None,
                saved: Vec::new(),
                translations: Vec::new(),
                checks: Vec::new(),
                _dir: dir,
            }
        }

        fn last_message(&self) -> (&str, Pattern) {
            let (text, pattern) = self.messages.last().unwrap();
            (text.as_str(), *pattern)
        }
    }

    impl MessageSink for FakeHost {
        fn show_message(&mut self, text: &str, pattern: Pattern) {
            self.messages.push((text.to_string(), pattern));
        }
    }

    impl PetHost for FakeHost {
        fn ask(&mut self, prompt: Prompt) {
            self.prompts.push(prompt);
        }

        fn defer(&mut self, delay: Duration, action: Deferred) {
            self.deferred.push((delay, action));
        }

        fn retry_delay(&self) -> Duration {
            Duration::from_secs(2)
        }

        fn notes(&mut self) -> &mut NoteStore {
            &mut self.notes
        }

        fn credentials(&self) -> Option<Credentials> {
            self.credentials.clone()
        }

        fn save_credentials(&mut self, credentials: &Credentials) -> Result<(), TranslateError> {
            self.saved.push(credentials.clone());
            self.credentials = Some(credentials.clone());
            Ok(())
        }

        fn spawn_translation(&mut self, request: TranslationRequest) {
            self.translations.push(request);
        }

        fn spawn_credential_check(&mut self, credentials: Credentials, check: CredentialCheck) {
            self.checks.push((credentials, check));
        }
    }

    #[test]
    fn test_read_note_hit_and_miss() {
        let mut host = FakeHost::new();
        host.notes.set("report.docx", "final version").unwrap();

        on_menu_choice(&mut host, MenuChoice::ReadNote);
        assert_eq!(host.prompts, vec![Prompt::ReadKey]);
        assert_eq!(host.last_message().1, Pattern::TalkingA);

        on_answer(&mut host, Prompt::ReadKey, PromptAnswer::Text(" report.docx ".into()));
        assert_eq!(
            host.last_message(),
            ("The note for 'report.docx' is:\nfinal version", Pattern::TalkingA)
        );

        on_answer(&mut host, Prompt::ReadKey, PromptAnswer::Text("missing.txt".into()));
        assert_eq!(
            host.last_message(),
            ("No note found for 'missing.txt'", Pattern::Denying)
        );

        on_answer(&mut host, Prompt::ReadKey, PromptAnswer::Cancelled);
        assert_eq!(host.last_message().1, Pattern::Denying);
    }

    #[test]
    fn test_add_note_flow_saves() {
        let mut host = FakeHost::new();

        on_menu_choice(&mut host, MenuChoice::AddNote);
        on_answer(&mut host, Prompt::ModifyOrNew, PromptAnswer::Text("N".into()));
        assert_eq!(host.prompts.last(), Some(&Prompt::NoteKey { modify: false }));

        on_answer(&mut host, Prompt::NoteKey { modify: false }, PromptAnswer::Text("a.txt".into()));
        let next = host.prompts.last().cloned().unwrap();
        assert_eq!(next, Prompt::NoteText { key: "a.txt".into(), modify: false });

        on_answer(&mut host, next, PromptAnswer::Text("shopping list".into()));
        assert_eq!(host.notes.get("a.txt").unwrap(), "shopping list");
        assert_eq!(
            host.last_message(),
            ("Successfully added the note for 'a.txt'", Pattern::TalkingA)
        );
    }

    #[test]
    fn test_add_note_cancel_and_invalid_key() {
        let mut host = FakeHost::new();

        on_answer(&mut host, Prompt::ModifyOrNew, PromptAnswer::Text("maybe".into()));
        assert_eq!(host.last_message().1, Pattern::Denying);
        assert!(host.prompts.is_empty());

        on_answer(
            &mut host,
            Prompt::NoteText { key: "a|b".into(), modify: true },
            PromptAnswer::Text("x".into()),
        );
        let (text, pattern) = host.last_message();
        assert!(text.starts_with("Error while saving the note"));
        assert_eq!(pattern, Pattern::Denying);
    }

    #[test]
    fn test_question_is_denied() {
        let mut host = FakeHost::new();
        on_menu_choice(&mut host, MenuChoice::Question);
        assert_eq!(host.last_message().1, Pattern::Denying);
        assert!(host.prompts.is_empty());
    }

    #[test]
    fn test_translate_without_credentials_asks_for_them() {
        let mut host = FakeHost::new();
        on_menu_choice(&mut host, MenuChoice::Translate);
        assert_eq!(host.last_message().1, Pattern::TalkingB);
        assert_eq!(host.prompts, vec![Prompt::Credentials]);

        on_answer(&mut host, Prompt::Credentials, PromptAnswer::Cancelled);
        assert_eq!(host.prompts.last(), Some(&Prompt::TranslateText { offline: true }));

        on_answer(
            &mut host,
            Prompt::TranslateText { offline: true },
            PromptAnswer::Text("你好".into()),
        );
        assert_eq!(
            host.translations,
            vec![TranslationRequest {
                text: "你好".into(),
                from: Lang::Zh,
                to: Lang::En,
                offline: true,
            }]
        );
    }

    #[test]
    fn test_entered_credentials_are_checked_then_saved() {
        let mut host = FakeHost::new();
        let credentials = Credentials::new("id", "secret");

        on_answer(&mut host, Prompt::Credentials, PromptAnswer::Credentials(Credentials::new("id", "")));
        assert_eq!(host.prompts.last(), Some(&Prompt::Credentials));
        assert!(host.checks.is_empty());

        on_answer(&mut host, Prompt::Credentials, PromptAnswer::Credentials(credentials.clone()));
        assert_eq!(host.checks, vec![(credentials.clone(), CredentialCheck::Entered)]);

        on_credentials_checked(&mut host, credentials.clone(), CredentialCheck::Entered, Ok(()));
        assert_eq!(host.saved, vec![credentials.clone()]);
        assert_eq!(host.deferred, vec![(Duration::from_secs(2), Deferred::StartTranslation)]);

        start_translation(&mut host);
        assert_eq!(host.checks.last(), Some(&(credentials, CredentialCheck::Stored)));
    }

    #[test]
    fn test_rejected_credentials() {
        let mut host = FakeHost::new();
        let credentials = Credentials::new("id", "wrong");
        let rejected = || TranslateError::Service {
            code: "54001".into(),
            message: "Invalid Sign".into(),
        };

        on_credentials_checked(&mut host, credentials.clone(), CredentialCheck::Entered, Err(rejected()));
        assert!(host.saved.is_empty());
        assert!(host.last_message().0.contains("54001"));
        assert_eq!(host.prompts.last(), Some(&Prompt::Credentials));

        on_credentials_checked(&mut host, credentials, CredentialCheck::Stored, Err(rejected()));
        assert_eq!(host.last_message().1, Pattern::Denying);
        assert_eq!(host.prompts.last(), Some(&Prompt::Credentials));
    }

    #[test]
    fn test_stored_credentials_lead_to_text_prompt() {
        let mut host = FakeHost::new();
        host.credentials = Some(Credentials::new("id", "key"));
        on_menu_choice(&mut host, MenuChoice::Translate);
        assert!(host.messages.is_empty());

        let (credentials, check) = host.checks.pop().unwrap();
        on_credentials_checked(&mut host, credentials, check, Ok(()));
        assert_eq!(host.prompts, vec![Prompt::TranslateText { offline: false }]);
    }

    #[test]
    fn test_translation_results() {
        let mut host = FakeHost::new();
        let request = TranslationRequest {
            text: "hello".into(),
            from: Lang::En,
            to: Lang::Zh,
            offline: false,
        };

        on_translation_result(&mut host, &request, Ok("你好".into()));
        assert_eq!(
            host.last_message(),
            ("English:\nhello\n\nChinese:\n你好", Pattern::TalkingA)
        );

        on_translation_result(&mut host, &request, Err(TranslateError::Network("timed out".into())));
        let (text, pattern) = host.last_message();
        assert!(text.starts_with("Translation failed:"));
        assert!(text.contains("timed out"));
        assert_eq!(pattern, Pattern::Denying);
    }
}
