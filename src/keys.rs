//! Deterministic storage key derivation.
//!
//! Every comprovante is addressed by a key derived purely from
//! `(userId, date, descricao, mimeType)`. The same inputs always produce
//! the same key, which gives uploads overwrite semantics on the object
//! store and makes listing prefixes predictable.

use chrono::NaiveDate;

/// Fallback filename stem when the description sanitizes to nothing.
pub const DEFAULT_DESCRICAO: &str = "comprovante";

/// Extension used when the mime type is absent or has no subtype.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Derived address of a stored comprovante.
///
/// Both backend forms come from the same value: the object store uses
/// [`ReceiptKey::object_key`], the folder-hierarchy backend uses
/// `user_id` / `month` as folder names and `file_name` inside the leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptKey {
    pub user_id: String,
    pub date: String,
    pub month: String,
    pub file_name: String,
}

impl ReceiptKey {
    /// Derive a key from validated inputs. `date` must already be a valid
    /// `YYYY-MM-DD` string (see [`is_valid_date`]).
    pub fn derive(
        user_id: &str,
        date: &str,
        descricao: Option<&str>,
        mime_type: Option<&str>,
    ) -> Self {
        let descricao = sanitize_descricao(descricao);
        let ext = extension_for(mime_type);
        Self {
            user_id: sanitize_segment(user_id),
            date: date.to_string(),
            month: date[..7].to_string(),
            file_name: format!("{}_{}.{}", date, descricao, ext),
        }
    }

    /// Flat object-store form: `{userId}/{YYYY-MM}/{date}_{descricao}.{ext}`.
    pub fn object_key(&self) -> String {
        format!("{}/{}/{}", self.user_id, self.month, self.file_name)
    }
}

/// Prefix under which all of a user's objects for a month live.
pub fn month_prefix(user_id: &str, month: &str) -> String {
    format!("{}/{}/", sanitize_segment(user_id), month)
}

/// Lowercase, collapse whitespace runs to `-`, strip everything outside
/// `[a-z0-9_.-]`. Falls back to `comprovante` when nothing survives.
pub fn sanitize_descricao(descricao: Option<&str>) -> String {
    let cleaned = sanitize_segment(descricao.unwrap_or(""));
    if cleaned.is_empty() {
        DEFAULT_DESCRICAO.to_string()
    } else {
        cleaned
    }
}

/// Character policy shared by every key segment: lowercase, whitespace
/// runs become `-`, everything outside `[a-z0-9_.-]` is stripped. No
/// fallback; callers decide what an empty result means.
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_gap = false;
    for c in raw.to_lowercase().chars() {
        if c.is_whitespace() {
            in_gap = true;
            continue;
        }
        if matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-') {
            if in_gap && !out.is_empty() {
                out.push('-');
            }
            in_gap = false;
            out.push(c);
        }
    }
    out
}

/// Extension from the mime subtype (`image/png` -> `png`), filtered to
/// `[a-z0-9]`. Absent or malformed mime types get `bin`, as does the
/// generic `application/octet-stream`.
pub fn extension_for(mime_type: Option<&str>) -> String {
    let ext: String = match mime_type.and_then(|m| m.split_once('/')) {
        Some((_, "octet-stream")) | None => String::new(),
        Some((_, subtype)) => subtype
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_alphanumeric())
            .collect(),
    };

    if ext.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        ext
    }
}

/// `YYYY-MM-DD`, checked against the calendar.
pub fn is_valid_date(date: &str) -> bool {
    date.len() == 10 && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// Shape check for `YYYY-MM` month selectors.
pub fn is_valid_month(month: &str) -> bool {
    let bytes = month.as_bytes();
    bytes.len() == 7
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let a = ReceiptKey::derive("42", "2025-08-11", Some("mercado"), Some("image/png"));
        let b = ReceiptKey::derive("42", "2025-08-11", Some("mercado"), Some("image/png"));
        assert_eq!(a, b);
        assert_eq!(a.object_key(), "42/2025-08/2025-08-11_mercado.png");
    }

    #[test]
    fn descricao_is_sanitized() {
        let key = ReceiptKey::derive("7", "2025-08-11", Some("Compra Café!!"), Some("image/png"));
        assert!(!key.file_name.contains(' '));
        assert!(!key.file_name.contains('!'));
        assert!(!key.file_name.chars().any(|c| c.is_uppercase()));
        assert_eq!(key.file_name, "2025-08-11_compra-caf.png");
    }

    #[test]
    fn whitespace_runs_collapse_to_one_separator() {
        assert_eq!(sanitize_descricao(Some("conta   de  luz")), "conta-de-luz");
        assert_eq!(sanitize_descricao(Some("  padaria ")), "padaria");
    }

    #[test]
    fn empty_descricao_falls_back() {
        assert_eq!(sanitize_descricao(None), DEFAULT_DESCRICAO);
        assert_eq!(sanitize_descricao(Some("")), DEFAULT_DESCRICAO);
        assert_eq!(sanitize_descricao(Some("   ")), DEFAULT_DESCRICAO);
        assert_eq!(sanitize_descricao(Some("!!??")), DEFAULT_DESCRICAO);
    }

    #[test]
    fn extension_from_mime_subtype() {
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("application/PDF")), "pdf");
        assert_eq!(extension_for(Some("image/svg+xml")), "svgxml");
    }

    #[test]
    fn malformed_mime_gets_default_extension() {
        assert_eq!(extension_for(None), DEFAULT_EXTENSION);
        assert_eq!(extension_for(Some("png")), DEFAULT_EXTENSION);
        assert_eq!(extension_for(Some("image/")), DEFAULT_EXTENSION);
        assert_eq!(
            extension_for(Some("application/octet-stream")),
            DEFAULT_EXTENSION
        );
    }

    #[test]
    fn date_validation() {
        assert!(is_valid_date("2025-08-11"));
        assert!(!is_valid_date("2025-8-11"));
        assert!(!is_valid_date("2025-02-30"));
        assert!(!is_valid_date("11/08/2025"));
    }

    #[test]
    fn month_validation() {
        assert!(is_valid_month("2025-08"));
        assert!(!is_valid_month("2025-8"));
        assert!(!is_valid_month("25-08"));
        assert!(!is_valid_month("2025/08"));
        assert!(!is_valid_month(""));
    }

    #[test]
    fn month_prefix_matches_object_key() {
        let key = ReceiptKey::derive("42", "2025-08-11", None, None);
        assert!(key.object_key().starts_with(&month_prefix("42", "2025-08")));
    }
}
