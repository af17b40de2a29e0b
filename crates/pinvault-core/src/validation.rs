//! Keyword and payload validation.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{Result, VaultError};

/// Maximum bytes per keyword.
pub const MAX_KEYWORD_BYTES: usize = 64;

/// Maximum bytes for an entry body.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Maximum media URLs per entry.
pub const MAX_MEDIA_URLS: usize = 4;

/// Maximum bytes per media URL.
pub const MAX_MEDIA_URL_BYTES: usize = 2048;

/// Validate a keyword.
///
/// Keywords are case-sensitive and stored exactly as given, so surrounding
/// whitespace is rejected rather than trimmed. A keyword may not parse as a
/// UUID; those address entries by id.
pub fn validate_keyword(keyword: &str) -> Result<()> {
    if keyword.is_empty() {
        return Err(VaultError::Validation("Keyword is empty".to_string()));
    }
    if keyword.len() > MAX_KEYWORD_BYTES {
        return Err(VaultError::Validation(format!(
            "Keyword too long (max {} bytes)",
            MAX_KEYWORD_BYTES
        )));
    }
    if keyword.trim() != keyword {
        return Err(VaultError::Validation(
            "Keyword has leading or trailing whitespace".to_string(),
        ));
    }
    if keyword.chars().any(char::is_control) {
        return Err(VaultError::Validation(
            "Keyword contains control characters".to_string(),
        ));
    }
    if Uuid::parse_str(keyword).is_ok() {
        return Err(VaultError::Validation(
            "Keyword must not look like an entry id".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_body(body: &str) -> Result<()> {
    if body.len() > MAX_BODY_BYTES {
        return Err(VaultError::Validation(format!(
            "Body too large (max {} bytes)",
            MAX_BODY_BYTES
        )));
    }
    Ok(())
}

/// Normalize and validate media URLs.
///
/// - Trims whitespace
/// - Removes duplicates, keeping first occurrence order
/// - Requires an http or https scheme
pub fn normalize_media_urls(urls: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::with_capacity(urls.len());
    let mut normalized = Vec::with_capacity(urls.len());

    for url in urls {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(VaultError::Validation("Empty media URL".to_string()));
        }
        if trimmed.len() > MAX_MEDIA_URL_BYTES {
            return Err(VaultError::Validation(format!(
                "Media URL too long (max {} bytes)",
                MAX_MEDIA_URL_BYTES
            )));
        }
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(VaultError::Validation(format!(
                "Media URL must use http or https: {}",
                trimmed
            )));
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }

    if normalized.len() > MAX_MEDIA_URLS {
        return Err(VaultError::Validation(format!(
            "Too many media URLs (max {})",
            MAX_MEDIA_URLS
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_rules() {
        assert!(validate_keyword("Sunset").is_ok());
        assert!(validate_keyword("夕焼け").is_ok());
        assert!(validate_keyword("").is_err());
        assert!(validate_keyword(" padded").is_err());
        assert!(validate_keyword("tab\there").is_err());
        assert!(validate_keyword(&"k".repeat(MAX_KEYWORD_BYTES + 1)).is_err());
    }

    #[test]
    fn test_keyword_cannot_be_an_entry_id() {
        let id = Uuid::new_v4();
        assert!(validate_keyword(&id.to_string()).is_err());
        assert!(validate_keyword(&id.simple().to_string()).is_err());
        assert!(validate_keyword("123e4567").is_ok());
    }

    #[test]
    fn test_body_limit() {
        assert!(validate_body("").is_ok());
        assert!(validate_body(&"x".repeat(MAX_BODY_BYTES + 1)).is_err());
    }

    #[test]
    fn test_normalize_media_urls_dedupes() {
        let urls = vec![
            " https://cdn.example/a.png ".to_string(),
            "https://cdn.example/a.png".to_string(),
            "http://cdn.example/b.m4a".to_string(),
        ];
        let normalized = normalize_media_urls(&urls).unwrap();
        assert_eq!(
            normalized,
            vec!["https://cdn.example/a.png", "http://cdn.example/b.m4a"]
        );
    }

    #[test]
    fn test_normalize_media_urls_rejects_bad_scheme() {
        assert!(normalize_media_urls(&["ftp://x/y".to_string()]).is_err());
        assert!(normalize_media_urls(&["  ".to_string()]).is_err());
        let too_many: Vec<String> = (0..=MAX_MEDIA_URLS)
            .map(|i| format!("https://cdn.example/{}.png", i))
            .collect();
        assert!(normalize_media_urls(&too_many).is_err());
    }
}
