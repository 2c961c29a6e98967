//! Application state - combines the animation core, services and the flows

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pet_core::{
    AvatarFrame, DialogBuffer, Expression, ExpressionDriver, ExpressionSet, MessageSink, Pattern,
    Synchronizer, TextRevealer,
};
use pet_services::{
    fallback_translate, CredentialStore, Credentials, NoteStore, TranslateError, Translator,
};

use crate::actions::{self, CredentialCheck, Deferred, MenuChoice, PetHost, Prompt, PromptAnswer, TranslationRequest};
use crate::config::Config;
use crate::sound::TypewriterSound;
use crate::tray::TrayCommand;
use crate::vars::PetState;

/// Style tag of reminder text in the dialog
pub const REMINDER_TAG: &str = "reminder";

/// Events posted to the UI loop from background threads
#[derive(Debug)]
pub enum UserEvent {
    Reminder,
    Translated {
        request: TranslationRequest,
        result: Result<String, TranslateError>,
    },
    CredentialsChecked {
        credentials: Credentials,
        check: CredentialCheck,
        result: Result<(), TranslateError>,
    },
}

/// Posts a [`UserEvent`] to the UI loop from any thread
pub type EventSink = Arc<dyn Fn(UserEvent) + Send + Sync>;

/// What the window asks the app to do
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    ToggleMenu,
    CloseMenu,
    Choose(MenuChoice),
    Answer(PromptAnswer),
    /// Show the whole message at once
    Skip,
    Quit,
}

/// Something to run once its delay has elapsed
enum Scheduled {
    Welcome,
    Action(Deferred),
}

struct Timer {
    remaining: f32,
    task: Scheduled,
}

/// Main application state
pub struct PetApp {
    config: Config,
    sync: Synchronizer<AvatarFrame, DialogBuffer>,
    state: PetState,
    notes: NoteStore,
    credential_store: CredentialStore,
    translator: Translator,
    events: EventSink,
    timers: Vec<Timer>,
    /// Prompt currently shown to the user
    active_prompt: Option<Prompt>,
    menu_open: bool,
    should_quit: bool,
}

impl PetApp {
    /// Create new app from configuration
    pub fn new(config: Config, events: EventSink) -> Self {
        let expressions = ExpressionSet::load(
            &config.avatar.directory,
            &config.avatar.expression_files(),
            config.avatar.size,
        );
        let driver = ExpressionDriver::new(expressions, AvatarFrame::default());

        let mut revealer = TextRevealer::new(DialogBuffer::default(), config.dialog.char_delay());
        if let Some(path) = &config.dialog.sound {
            match TypewriterSound::open(path) {
                Ok(sound) => revealer.set_pulse(Some(Box::new(sound))),
                Err(e) => log::warn!("Typewriter sound disabled: {}", e),
            }
        }

        let notes = match NoteStore::open(&config.notes.path) {
            Ok(notes) => notes,
            Err(e) => {
                log::error!("Failed to load notes from {}: {}", config.notes.path, e);
                NoteStore::empty(&config.notes.path)
            }
        };

        let credential_store = CredentialStore::new(&config.translation.credentials_path);
        let translator = Translator::new(
            config.translation.translator_config(),
            credential_store.load(),
        );

        let timers = vec![Timer {
            remaining: config.dialog.welcome_delay().as_secs_f32(),
            task: Scheduled::Welcome,
        }];

        Self {
            config,
            sync: Synchronizer::new(driver, revealer),
            state: PetState::new(),
            notes,
            credential_store,
            translator,
            events,
            timers,
            active_prompt: None,
            menu_open: false,
            should_quit: false,
        }
    }

    /// Present `text` with a style tag, tracking it for the full-text view.
    pub fn present_tagged(&mut self, text: &str, tag: Option<&str>, pattern: Pattern) {
        self.state.begin_message(text);
        let state = self.state.clone();
        self.sync.present_tagged(
            text,
            tag,
            pattern,
            Some(Box::new(move || state.finish_message())),
        );
    }

    /// Advance animations and timers by `delta` seconds
    pub fn update(&mut self, delta: f32) {
        self.sync.update(delta);

        for timer in &mut self.timers {
            timer.remaining -= delta;
        }
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.timers)
            .into_iter()
            .partition(|timer| timer.remaining <= 0.0);
        self.timers = pending;

        // Tasks may schedule new timers
        for timer in due {
            self.run_scheduled(timer.task);
        }
    }

    fn run_scheduled(&mut self, task: Scheduled) {
        match task {
            Scheduled::Welcome => {
                let welcome = self.config.dialog.welcome.clone();
                let pattern = configured_pattern(&self.config.dialog.welcome_pattern, Pattern::TalkingA);
                self.present_tagged(&welcome, None, pattern);
            }
            Scheduled::Action(Deferred::Ask(prompt)) => {
                log::debug!("Showing prompt {:?}", prompt);
                self.active_prompt = Some(prompt);
            }
            Scheduled::Action(Deferred::StartTranslation) => actions::start_translation(self),
        }
    }

    pub fn handle_user_event(&mut self, event: UserEvent) {
        match event {
            UserEvent::Reminder => {
                log::info!("Reminder");
                let text = self.config.reminder.text.clone();
                let pattern = configured_pattern(&self.config.reminder.pattern, Pattern::TalkingB);
                self.present_tagged(&text, Some(REMINDER_TAG), pattern);
            }
            UserEvent::Translated { request, result } => {
                actions::on_translation_result(self, &request, result);
            }
            UserEvent::CredentialsChecked {
                credentials,
                check,
                result,
            } => actions::on_credentials_checked(self, credentials, check, result),
        }
    }

    pub fn handle_tray(&mut self, command: TrayCommand) {
        log::debug!("Tray command: {:?}", command);
        match command {
            TrayCommand::OpenMenu => self.menu_open = true,
            TrayCommand::Play(pattern) => {
                let text = demo_text(pattern);
                self.present_tagged(text, None, pattern);
            }
            TrayCommand::Quit => self.should_quit = true,
        }
    }

    pub fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::ToggleMenu => self.menu_open = !self.menu_open,
            UiAction::CloseMenu => self.menu_open = false,
            UiAction::Choose(choice) => {
                self.menu_open = false;
                actions::on_menu_choice(self, choice);
            }
            UiAction::Answer(answer) => match self.active_prompt.take() {
                Some(prompt) => actions::on_answer(self, prompt, answer),
                None => log::warn!("Answer without an open prompt: {:?}", answer),
            },
            UiAction::Skip => {
                if self.sync.is_busy() {
                    self.sync.skip();
                }
            }
            UiAction::Quit => self.should_quit = true,
        }
    }

    pub fn expressions(&self) -> &ExpressionSet {
        self.sync.driver().expressions()
    }

    pub fn current_expression(&self) -> Expression {
        self.sync
            .driver()
            .current_expression()
            .unwrap_or(Expression::Close)
    }

    pub fn dialog(&self) -> &DialogBuffer {
        self.sync.revealer().surface()
    }

    /// True once after the dialog asked to scroll to its end.
    pub fn take_scroll_request(&mut self) -> bool {
        self.sync.revealer_mut().surface_mut().take_scroll_request()
    }

    pub fn state(&self) -> &PetState {
        &self.state
    }

    pub fn active_prompt(&self) -> Option<&Prompt> {
        self.active_prompt.as_ref()
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn is_busy(&self) -> bool {
        self.sync.is_busy()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn spawn_worker<F>(&mut self, name: &str, job: F)
    where
        F: FnOnce() -> UserEvent + Send + 'static,
    {
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || events(job()));
        if let Err(e) = spawned {
            log::error!("Failed to start {} worker: {}", name, e);
            self.show_message(&format!("Something went wrong:\n{}", e), Pattern::Denying);
        }
    }
}

impl MessageSink for PetApp {
    fn show_message(&mut self, text: &str, pattern: Pattern) {
        self.present_tagged(text, None, pattern);
    }
}

impl PetHost for PetApp {
    fn ask(&mut self, prompt: Prompt) {
        self.defer(self.config.prompt.delay(), Deferred::Ask(prompt));
    }

    fn defer(&mut self, delay: Duration, action: Deferred) {
        self.timers.push(Timer {
            remaining: delay.as_secs_f32(),
            task: Scheduled::Action(action),
        });
    }

    fn retry_delay(&self) -> Duration {
        self.config.prompt.retry_delay()
    }

    fn notes(&mut self) -> &mut NoteStore {
        &mut self.notes
    }

    fn credentials(&self) -> Option<Credentials> {
        self.translator.credentials().cloned()
    }

    fn save_credentials(&mut self, credentials: &Credentials) -> Result<(), TranslateError> {
        self.credential_store.save(credentials)?;
        self.translator.set_credentials(Some(credentials.clone()));
        Ok(())
    }

    fn spawn_translation(&mut self, request: TranslationRequest) {
        let translator = self.translator.clone();
        self.spawn_worker("translate", move || {
            let result = if request.offline {
                Ok(fallback_translate(&request.text))
            } else {
                translator.translate_or_fallback(&request.text, request.from, request.to)
            };
            UserEvent::Translated { request, result }
        });
    }

    fn spawn_credential_check(&mut self, credentials: Credentials, check: CredentialCheck) {
        let translator = self.translator.clone();
        self.spawn_worker("credential-check", move || {
            let result = translator.check_credentials(&credentials);
            UserEvent::CredentialsChecked {
                credentials,
                check,
                result,
            }
        });
    }
}

fn configured_pattern(name: &str, fallback: Pattern) -> Pattern {
    name.parse().unwrap_or_else(|e| {
        log::warn!("{}, using {}", e, fallback);
        fallback
    })
}

/// Sample line for trying out a pattern from the tray
fn demo_text(pattern: Pattern) -> &'static str {
    match pattern {
        Pattern::TalkingA => "This is the first talking animation. The text and the face should move together, even for a longer line that needs to scroll inside the dialog box.",
        Pattern::TalkingB => "This is the second talking animation, starting on the other mouth shape. When the text is longer than the box, use the full text button to read all of it.",
        Pattern::Denying => "This is the denying face, for when something is not possible.",
        _ => "Just a test line.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_services::Lang;
    use std::sync::mpsc;
    use std::sync::Mutex;

    fn test_app(dir: &std::path::Path) -> (PetApp, mpsc::Receiver<UserEvent>) {
        let mut config = Config::default();
        config.avatar.directory = dir.join("missing-avatar").display().to_string();
        config.dialog.sound = None;
        config.dialog.welcome = "Hi!".to_string();
        config.notes.path = dir.join("folder_notes.txt").display().to_string();
        config.translation.credentials_path = dir.join("translation_config.json").display().to_string();

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let events: EventSink = Arc::new(move |event| {
            let _ = tx.lock().unwrap().send(event);
        });
        (PetApp::new(config, events), rx)
    }

    #[test]
    fn test_welcome_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        assert!(app.dialog().is_empty());

        app.update(0.05);
        assert!(app.dialog().is_empty());
        app.update(0.06);
        assert_eq!(app.dialog().text(), "H");
        assert_eq!(app.current_expression(), Expression::OpenB);

        app.update(0.2);
        assert_eq!(app.dialog().text(), "Hi!");
        assert!(app.state().expand_visible());
        assert_eq!(app.state().full_text(), "Hi!");
    }

    #[test]
    fn test_prompt_appears_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());

        app.apply(UiAction::ToggleMenu);
        assert!(app.menu_open());
        app.apply(UiAction::Choose(MenuChoice::ReadNote));
        assert!(!app.menu_open());
        assert!(app.active_prompt().is_none());

        app.update(0.5);
        assert!(app.active_prompt().is_none());
        app.update(0.6);
        assert_eq!(app.active_prompt(), Some(&Prompt::ReadKey));

        app.apply(UiAction::Answer(PromptAnswer::Cancelled));
        assert!(app.active_prompt().is_none());
        assert_eq!(app.state().full_text(), "Reading the note was cancelled");
        assert_eq!(app.current_expression(), Expression::Denying);
    }

    #[test]
    fn test_reminder_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.handle_user_event(UserEvent::Reminder);
        app.apply(UiAction::Skip);

        let spans = app.dialog().spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, app.config().reminder.text);
        assert_eq!(spans[0].tag.as_deref(), Some(REMINDER_TAG));
        assert!(!app.is_busy());
        assert_eq!(app.current_expression(), Expression::Close);
    }

    #[test]
    fn test_offline_translation_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, rx) = test_app(dir.path());

        let request = TranslationRequest {
            text: "good morning".to_string(),
            from: Lang::En,
            to: Lang::Zh,
            offline: true,
        };
        app.spawn_translation(request);
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        app.handle_user_event(event);
        app.apply(UiAction::Skip);
        assert_eq!(app.dialog().text(), "English:\ngood morning\n\nChinese:\n早上好");
    }

    #[test]
    fn test_configured_reminder_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());
        app.config.reminder.pattern = "denying".to_string();
        app.handle_user_event(UserEvent::Reminder);
        assert_eq!(app.current_expression(), Expression::Denying);

        assert_eq!(configured_pattern("nonsense", Pattern::TalkingB), Pattern::TalkingB);
        assert_eq!(configured_pattern("open-a", Pattern::TalkingB), Pattern::Single(Expression::OpenA));
    }

    #[test]
    fn test_tray_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _rx) = test_app(dir.path());

        app.handle_tray(TrayCommand::Play(Pattern::Denying));
        assert_eq!(app.current_expression(), Expression::Denying);
        app.handle_tray(TrayCommand::OpenMenu);
        assert!(app.menu_open());
        app.handle_tray(TrayCommand::Quit);
        assert!(app.should_quit());
    }
}
