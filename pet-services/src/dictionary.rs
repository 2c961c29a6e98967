//! Offline phrase dictionary used when the translation service is unavailable

const PHRASES: &[(&str, &str)] = &[
    ("hello", "你好"),
    ("world", "世界"),
    ("good morning", "早上好"),
    ("thank you", "谢谢"),
    ("goodbye", "再见"),
    ("file", "文件"),
    ("save", "保存"),
    ("folder", "文件夹"),
    ("note", "注释"),
    ("computer", "电脑"),
    ("program", "程序"),
    ("python", "Python编程语言"),
    ("desktop", "桌面"),
    ("pet", "宠物"),
];

/// Dictionary entry for `text`, matched case-insensitively after trimming.
pub fn lookup(text: &str) -> Option<&'static str> {
    let needle = text.trim().to_lowercase();
    PHRASES
        .iter()
        .find(|(en, _)| *en == needle)
        .map(|(_, zh)| *zh)
}

/// Translate from the dictionary, or return the text annotated as untranslated.
pub fn fallback_translate(text: &str) -> String {
    match lookup(text) {
        Some(translated) => translated.to_string(),
        None => format!(
            "'{}' (configure the translation API for an accurate result)",
            text.trim()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_phrase_ignores_case_and_padding() {
        assert_eq!(fallback_translate("  Hello "), "你好");
        assert_eq!(fallback_translate("GOOD MORNING"), "早上好");
    }

    #[test]
    fn test_unknown_phrase_is_annotated() {
        let out = fallback_translate("spaceship");
        assert!(out.starts_with("'spaceship'"));
        assert!(out.contains("translation API"));
        assert_eq!(lookup("spaceship"), None);
    }
}
