//! # pet-services
//!
//! Collaborators the pet talks to: a file/folder note store and a remote
//! translation client with an offline phrase dictionary.

pub mod credentials;
pub mod dictionary;
pub mod error;
pub mod notes;
pub mod translate;

pub use credentials::{CredentialStore, Credentials};
pub use dictionary::fallback_translate;
pub use error::{NoteError, TranslateError};
pub use notes::{NoteFormat, NoteStore};
pub use translate::{detect_language, format_translation, Lang, Translator, TranslatorConfig};
