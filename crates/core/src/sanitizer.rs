//! Input sanitisation and normalisation.
//!
//! Everything here is a pure function over strings. [`sanitize_text`] is the only
//! transformation applied to stored free text; the `normalize_*` helpers turn user-typed
//! contact details and search boxes into canonical forms, and [`is_valid`] gates inputs that
//! must match a narrow pattern.

use crate::constants::MAX_SEARCH_QUERY_LEN;
use clinic_types::PhoneNumber;
use once_cell::sync::Lazy;
use regex::Regex;

/// Entities produced by [`sanitize_text`]. Existing occurrences are never re-encoded.
const HTML_ENTITIES: &[&str] = &["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

static SQL_BLACKLIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)--|/\*|\*/|\bxp_|\bunion\s+(?:all\s+)?select\b|\bdrop\s+table\b|\binsert\s+into\b|\bdelete\s+from\b|\btruncate\s+table\b|\balter\s+table\b|\bexec(?:\s+|\s*\()|\bor\s+1\s*=\s*1\b",
    )
    .expect("SQL blacklist pattern is valid")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}$")
        .expect("email pattern is valid")
});

static SEARCH_DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{N}\s\-'@.]").expect("search pattern is valid")
});

static ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("alphanumeric pattern is valid"));
static ALPHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+(?: [A-Za-z]+)*$").expect("alpha pattern is valid"));
static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?$").expect("numeric pattern is valid"));
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?(?::[0-9]{1,5})?(?:/[^\s<>]*)?$")
        .expect("url pattern is valid")
});
static FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.-]{0,254}$").expect("filename pattern is valid")
});
static CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9.-]{0,19}$").expect("code pattern is valid"));

/// Shape an input must have to pass [`is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Alphanumeric,
    /// Letters, optionally separated by single spaces
    Alpha,
    /// Optionally signed integer or decimal
    Numeric,
    /// `http`/`https` URL
    Url,
    /// A bare filename; path separators and `..` are rejected
    Filename,
    /// Upper-case ICD/CPT style code
    Code,
}

/// Sanitises free text for storage and later HTML display.
///
/// The result is a fixpoint of the sanitising step, so `sanitize_text(sanitize_text(x, n), n)
/// == sanitize_text(x, n)`. The output never exceeds `max_len` characters and contains no raw
/// `<`, `>` or null bytes.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let mut current = sanitize_step(input, max_len);
    // Every step after the first only deletes characters, so this terminates.
    loop {
        let next = sanitize_step(&current, max_len);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn sanitize_step(input: &str, max_len: usize) -> String {
    let without_nulls: String = input.chars().filter(|c| *c != '\0').collect();
    let without_sql = SQL_BLACKLIST.replace_all(&without_nulls, "");
    let collapsed = WHITESPACE.replace_all(&without_sql, " ");
    let encoded = html_encode(collapsed.trim());
    truncate_preserving_entities(&encoded, max_len)
        .trim_end()
        .to_string()
}

fn html_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.char_indices() {
        match c {
            '&' if HTML_ENTITIES.iter().any(|e| input[i..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Truncates to `max_chars` characters, backing off so an entity is never split.
fn truncate_preserving_entities(input: &str, max_chars: usize) -> &str {
    let mut cut = match input.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return input,
    };

    if let Some(amp) = input[..cut].rfind('&') {
        let tail = &input[amp..];
        if let Some(entity) = HTML_ENTITIES.iter().find(|e| tail.starts_with(*e)) {
            if amp + entity.len() > cut {
                cut = amp;
            }
        }
    }

    &input[..cut]
}

/// Lower-cases and validates an email address. Returns `None` if it is not plausible.
pub fn normalize_email(input: &str) -> Option<String> {
    let candidate = input.trim().to_ascii_lowercase();
    EMAIL.is_match(&candidate).then_some(candidate)
}

/// Normalises a phone number to `+?digits`. Returns `None` if it is not plausible.
pub fn normalize_phone(input: &str) -> Option<String> {
    PhoneNumber::parse(input).ok().map(|p| p.as_str().to_string())
}

/// Strips characters that have no business in a search box and bounds the length.
pub fn normalize_search_query(input: &str) -> String {
    let cleaned = SEARCH_DISALLOWED.replace_all(input, "");
    let collapsed = WHITESPACE.replace_all(&cleaned, " ");
    collapsed
        .trim()
        .chars()
        .take(MAX_SEARCH_QUERY_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Returns true if `input` matches the pattern for `kind`.
pub fn is_valid(input: &str, kind: InputKind) -> bool {
    match kind {
        InputKind::Alphanumeric => ALPHANUMERIC.is_match(input),
        InputKind::Alpha => ALPHA.is_match(input),
        InputKind::Numeric => NUMERIC.is_match(input),
        InputKind::Url => URL.is_match(input),
        InputKind::Filename => FILENAME.is_match(input) && !input.contains(".."),
        InputKind::Code => CODE.is_match(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   plain text   ",
        "<script>alert('x')</script>",
        "Tom & Jerry &amp; friends",
        "Robert'); DROP TABLE patients;--",
        "DROP DROP TABLE TABLE students",
        "1' OR 1=1 --",
        "null\0byte",
        "a   b\t\tc\n\nd",
        "&lt;already encoded&gt;",
        "ünïcödé text",
        "exec(xp_cmdshell 'dir')",
        "/* comment */ select",
        "delete fromage",
    ];

    #[test]
    fn encodes_html() {
        assert_eq!(
            sanitize_text("<b>\"hi\"</b>", 100),
            "&lt;b&gt;&quot;hi&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn leaves_existing_entities_alone() {
        assert_eq!(sanitize_text("a &amp; b & c", 100), "a &amp; b &amp; c");
    }

    #[test]
    fn removes_sql_patterns() {
        let out = sanitize_text("Robert'); DROP TABLE patients;--", 100);
        assert!(!out.to_lowercase().contains("drop table"));
        assert!(!out.contains("--"));
    }

    #[test]
    fn removal_does_not_reassemble_keywords() {
        let out = sanitize_text("DROP DROP TABLE TABLE students", 100);
        assert!(!out.to_lowercase().contains("drop table"), "{out}");
    }

    #[test]
    fn strips_nulls_and_collapses_whitespace() {
        assert_eq!(sanitize_text("  a \0 b\n\n c ", 100), "a b c");
    }

    #[test]
    fn is_idempotent() {
        for max in [5, 12, 100] {
            for sample in SAMPLES {
                let once = sanitize_text(sample, max);
                let twice = sanitize_text(&once, max);
                assert_eq!(once, twice, "not idempotent for {sample:?} at {max}");
            }
        }
    }

    #[test]
    fn respects_length_bound() {
        for max in [0, 1, 4, 7, 20] {
            for sample in SAMPLES {
                let out = sanitize_text(sample, max);
                assert!(out.chars().count() <= max, "{sample:?} -> {out:?} exceeds {max}");
                assert!(!out.contains('<') && !out.contains('>') && !out.contains('\0'));
            }
        }
    }

    #[test]
    fn truncation_never_splits_entities() {
        // "ab" + "&lt;" would be cut mid-entity at 4 chars.
        assert_eq!(sanitize_text("ab<cd", 4), "ab");
        assert_eq!(sanitize_text("ab<cd", 6), "ab&lt;");
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(
            normalize_email("  Jane.Doe@Example.ORG "),
            Some("jane.doe@example.org".to_string())
        );
        assert_eq!(normalize_email("jane@localhost"), None);
        assert_eq!(normalize_email("not an email"), None);
    }

    #[test]
    fn normalizes_phone() {
        assert_eq!(normalize_phone("(555) 123-4567"), Some("5551234567".into()));
        assert_eq!(normalize_phone("call me"), None);
    }

    #[test]
    fn normalizes_search_query() {
        assert_eq!(normalize_search_query("  smith; DROP <x>  "), "smith DROP x");
        assert_eq!(normalize_search_query("o'brien-jones"), "o'brien-jones");
        assert_eq!(
            normalize_search_query(&"a".repeat(500)).chars().count(),
            MAX_SEARCH_QUERY_LEN
        );
    }

    #[test]
    fn validates_input_kinds() {
        assert!(is_valid("abc123", InputKind::Alphanumeric));
        assert!(!is_valid("abc 123", InputKind::Alphanumeric));
        assert!(is_valid("Mary Ann", InputKind::Alpha));
        assert!(!is_valid("Mary  Ann", InputKind::Alpha));
        assert!(is_valid("-12.5", InputKind::Numeric));
        assert!(!is_valid("12.", InputKind::Numeric));
        assert!(is_valid("https://clinic.example/path?q=1", InputKind::Url));
        assert!(!is_valid("javascript:alert(1)", InputKind::Url));
        assert!(is_valid("scan_01.png", InputKind::Filename));
        assert!(!is_valid("../scan.png", InputKind::Filename));
        assert!(!is_valid("a/b.png", InputKind::Filename));
        assert!(is_valid("H90.3", InputKind::Code));
        assert!(!is_valid("h90.3", InputKind::Code));
    }
}
