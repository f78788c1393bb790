//! Identifier & Sanitizer (spec §4.A) — pure functions, exhaustively
//! unit-tested against adversarial input per spec §9's design notes.

use rand::Rng;
use rand::rng;
use thiserror::Error;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_MAX_RETRIES: u32 = 10;

const NAME_MAX_LEN: usize = 20;
const CHAT_MAX_LEN: usize = 500;

const RESERVED_SETTINGS_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("name must be 1-{NAME_MAX_LEN} characters of letters, digits, spaces, _ or -")]
    InvalidName,
    #[error("room code must be 6 alphanumeric characters")]
    InvalidRoomCode,
    #[error("message must be 1-{CHAT_MAX_LEN} characters after trimming")]
    InvalidMessage,
    #[error("settings contain a reserved key: {0}")]
    ReservedKey(String),
}

/// Maximum rejection-sampling attempts before `generate_room_code`
/// gives up with `ROOM_CODE_COLLISION` (spec §4.A).
pub const ROOM_CODE_RETRY_LIMIT: u32 = ROOM_CODE_MAX_RETRIES;

/// Draw a single candidate room code from the fixed alphabet.
pub fn random_room_code_candidate() -> String {
    let mut rng = rng();
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a fresh room code, retrying against the synchronous
/// predicate `is_taken` up to `ROOM_CODE_RETRY_LIMIT` times before
/// failing with `ROOM_CODE_COLLISION` (spec §4.A). Store-backed callers
/// that need to `.await` a uniqueness check should drive the same
/// retry budget themselves using `random_room_code_candidate` (see
/// `db::room::create`), since this module stays free of I/O.
pub fn generate_room_code(mut is_taken: impl FnMut(&str) -> bool) -> Result<String, SanitizeError> {
    for _ in 0..ROOM_CODE_RETRY_LIMIT {
        let code = random_room_code_candidate();
        if !is_taken(&code) {
            return Ok(code);
        }
    }
    Err(SanitizeError::InvalidRoomCode)
}

/// Trim, restrict to `[A-Za-z0-9 _-]`, truncate to 20 chars. Rejects
/// inputs that are empty after sanitization.
pub fn sanitize_name(raw: &str) -> Result<String, SanitizeError> {
    let trimmed = raw.trim();
    let filtered: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_' || *c == '-')
        .take(NAME_MAX_LEN)
        .collect();
    let filtered = filtered.trim().to_string();
    if filtered.is_empty() {
        return Err(SanitizeError::InvalidName);
    }
    Ok(filtered)
}

/// Uppercase and strip non-alphanumerics; must end up exactly 6 chars.
pub fn sanitize_room_code(raw: &str) -> Result<String, SanitizeError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() != ROOM_CODE_LEN {
        return Err(SanitizeError::InvalidRoomCode);
    }
    Ok(cleaned)
}

/// Trim, strip script-like substrings, truncate to 500 chars.
pub fn sanitize_chat_message(raw: &str) -> Result<String, SanitizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError::InvalidMessage);
    }

    // Strip obvious script-injection substrings before truncating, so the
    // final length bound (testable property #8) is computed post-strip.
    let stripped = strip_script_like(trimmed);
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Err(SanitizeError::InvalidMessage);
    }

    let truncated: String = stripped.chars().take(CHAT_MAX_LEN).collect();
    Ok(truncated)
}

fn strip_script_like(input: &str) -> String {
    let lowered = input.to_ascii_lowercase();
    let mut out = input.to_string();
    for needle in ["<script", "</script", "javascript:", "onerror=", "onload="] {
        while let Some(idx) = out.to_ascii_lowercase().find(needle) {
            let _ = &lowered;
            out.replace_range(idx..idx + needle.len(), "");
        }
    }
    html_escape::decode_html_entities(&out).into_owned()
}

/// Recursively walk a JSON settings map, rejecting `__proto__`,
/// `constructor`, and `prototype` keys at any depth (spec §4.A).
pub fn sanitize_settings(value: &serde_json::Value) -> Result<(), SanitizeError> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map.iter() {
                if RESERVED_SETTINGS_KEYS.contains(&key.as_str()) {
                    return Err(SanitizeError::ReservedKey(key.clone()));
                }
                sanitize_settings(v)?;
            }
            Ok(())
        }
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_settings(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_trims_and_filters() {
        assert_eq!(sanitize_name("  Alice  ").unwrap(), "Alice");
        assert_eq!(sanitize_name("Bob_the-2nd!!").unwrap(), "Bob_the-2nd");
    }

    #[test]
    fn sanitize_name_truncates_at_20() {
        let long = "a".repeat(40);
        let out = sanitize_name(&long).unwrap();
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn sanitize_name_rejects_empty_after_filter() {
        assert!(sanitize_name("!!!###").is_err());
        assert!(sanitize_name("   ").is_err());
    }

    #[test]
    fn sanitize_name_strips_control_chars() {
        let out = sanitize_name("Ali\u{0007}ce\n").unwrap();
        assert_eq!(out, "Alice");
    }

    #[test]
    fn room_code_sanitizer_rejects_wrong_length() {
        assert!(sanitize_room_code("ABC12").is_err());
        assert!(sanitize_room_code("ABCDEFG").is_err());
    }

    #[test]
    fn room_code_sanitizer_uppercases_and_strips_punct() {
        assert_eq!(sanitize_room_code("ab!c-123").unwrap(), "ABC123".to_string());
    }

    #[test]
    fn chat_message_truncates_to_500() {
        let long = "x".repeat(600);
        let out = sanitize_chat_message(&long).unwrap();
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn chat_message_strips_script_tags() {
        let out = sanitize_chat_message("hello <script>alert(1)</script> world").unwrap();
        assert!(!out.to_ascii_lowercase().contains("<script"));
    }

    #[test]
    fn chat_message_rejects_empty() {
        assert!(sanitize_chat_message("   ").is_err());
    }

    #[test]
    fn settings_sanitizer_rejects_reserved_keys_at_any_depth() {
        let nested = serde_json::json!({ "a": { "b": { "__proto__": 1 } } });
        assert!(sanitize_settings(&nested).is_err());

        let top = serde_json::json!({ "constructor": "x" });
        assert!(sanitize_settings(&top).is_err());

        let in_array = serde_json::json!({ "list": [ { "prototype": 1 } ] });
        assert!(sanitize_settings(&in_array).is_err());
    }

    #[test]
    fn settings_sanitizer_accepts_benign_maps() {
        let ok = serde_json::json!({ "maxRounds": 5, "nested": { "difficulty": "hard" } });
        assert!(sanitize_settings(&ok).is_ok());
    }

    #[test]
    fn room_code_generation_avoids_collisions() {
        let taken = ["AAAAAA".to_string()];
        let code = generate_room_code(|c| taken.contains(&c.to_string())).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn room_code_generation_fails_after_retry_limit() {
        let result = generate_room_code(|_| true);
        assert!(matches!(result, Err(SanitizeError::InvalidRoomCode)));
    }
}
