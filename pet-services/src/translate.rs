//! Blocking client for a Baidu-style translation API
//!
//! Requests are signed with `md5(appid + q + salt + key)`. Calls block, so the
//! host runs them on a worker thread.

use std::time::Duration;

use md5::{Digest, Md5};
use rand::Rng;
use serde::Deserialize;

use crate::credentials::Credentials;
use crate::dictionary::fallback_translate;
use crate::error::TranslateError;

pub const DEFAULT_ENDPOINT: &str = "https://fanyi-api.baidu.com/api/trans/vip/translate";

/// Error code used when the service answers with something unreadable
pub const INVALID_RESPONSE: &str = "invalid-response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Auto,
    En,
    Zh,
}

impl Lang {
    /// Wire code of the language
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::En => "English",
            Self::Zh => "Chinese",
        }
    }

    /// The other side of an English/Chinese pair.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Zh => Self::En,
            Self::En | Self::Auto => Self::Zh,
        }
    }
}

/// Chinese when any CJK unified ideograph is present, English otherwise.
pub fn detect_language(text: &str) -> Lang {
    if text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)) {
        Lang::Zh
    } else {
        Lang::En
    }
}

/// Two-section message shown after a translation.
pub fn format_translation(source: &str, from: Lang, translated: &str, to: Lang) -> String {
    format!("{}:\n{}\n\n{}:\n{}", from.label(), source, to.label(), translated)
}

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub endpoint: String,
    /// Timeout of a translation request
    pub timeout: Duration,
    /// Timeout of the credential check request
    pub test_timeout: Duration,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            test_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslationWire {
    #[serde(default)]
    error_code: Option<serde_json::Value>,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    trans_result: Option<Vec<SegmentWire>>,
}

#[derive(Debug, Deserialize)]
struct SegmentWire {
    dst: String,
}

/// Signature of one request.
pub fn sign(appid: &str, q: &str, salt: &str, key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(appid.as_bytes());
    hasher.update(q.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_salt() -> String {
    rand::thread_rng().gen_range(32768..=65536).to_string()
}

/// Extract the translated text from a response body.
///
/// Segments are joined with newlines. An `error_code` other than the success
/// code becomes a service error.
pub fn parse_response(body: &str) -> Result<String, TranslateError> {
    let wire: TranslationWire = serde_json::from_str(body).map_err(|e| TranslateError::Service {
        code: INVALID_RESPONSE.to_string(),
        message: e.to_string(),
    })?;

    if let Some(code) = wire.error_code {
        let code = match code {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        if code != "52000" {
            return Err(TranslateError::Service {
                code,
                message: wire.error_msg.unwrap_or_default(),
            });
        }
    }

    match wire.trans_result {
        Some(segments) if !segments.is_empty() => Ok(segments
            .into_iter()
            .map(|s| s.dst)
            .collect::<Vec<_>>()
            .join("\n")),
        _ => Err(TranslateError::Service {
            code: INVALID_RESPONSE.to_string(),
            message: "response has no translation".to_string(),
        }),
    }
}

/// Translation client. Cheap to clone; clones share the HTTP agent.
#[derive(Debug, Clone)]
pub struct Translator {
    config: TranslatorConfig,
    credentials: Option<Credentials>,
    agent: ureq::Agent,
}

impl Translator {
    pub fn new(config: TranslatorConfig, credentials: Option<Credentials>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .build();
        Self {
            config,
            credentials: credentials.filter(Credentials::is_complete),
            agent,
        }
    }

    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.credentials = credentials.filter(Credentials::is_complete);
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate `text` with the configured credentials.
    pub fn translate(&self, text: &str, from: Lang, to: Lang) -> Result<String, TranslateError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(TranslateError::ConfigurationMissing)?;
        self.request(credentials, text, from, to, self.config.timeout)
    }

    /// Translate remotely, or fall back to the offline dictionary when no
    /// credentials are configured. Service and network errors still surface.
    pub fn translate_or_fallback(
        &self,
        text: &str,
        from: Lang,
        to: Lang,
    ) -> Result<String, TranslateError> {
        match self.translate(text, from, to) {
            Err(TranslateError::ConfigurationMissing) => {
                log::info!("No translation credentials, using offline dictionary");
                Ok(fallback_translate(text))
            }
            other => other,
        }
    }

    /// Validate credentials with a short test call.
    pub fn check_credentials(&self, credentials: &Credentials) -> Result<(), TranslateError> {
        if !credentials.is_complete() {
            return Err(TranslateError::ConfigurationMissing);
        }
        self.request(credentials, "test", Lang::En, Lang::Zh, self.config.test_timeout)
            .map(|_| ())
    }

    fn request(
        &self,
        credentials: &Credentials,
        text: &str,
        from: Lang,
        to: Lang,
        timeout: Duration,
    ) -> Result<String, TranslateError> {
        let salt = random_salt();
        let signature = sign(&credentials.appid, text, &salt, &credentials.key);

        log::debug!(
            "Translating {} chars {} -> {}",
            text.chars().count(),
            from.code(),
            to.code()
        );

        let resp = self
            .agent
            .get(&self.config.endpoint)
            .timeout(timeout)
            .query("q", text)
            .query("from", from.code())
            .query("to", to.code())
            .query("appid", &credentials.appid)
            .query("salt", &salt)
            .query("sign", &signature)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => TranslateError::Network(format!("HTTP status {}", code)),
                other => TranslateError::Network(other.to_string()),
            })?;

        let body = resp
            .into_string()
            .map_err(|e| TranslateError::Network(e.to_string()))?;

        let result = parse_response(&body);
        if let Err(e) = &result {
            log::warn!("Translation failed: {}", e);
        }
        result
    }
}
