//! Material code auto-generation (`PREFIX-###`).

use std::collections::HashSet;

use ptar_core::{DomainError, DomainResult};

/// Prefix used for categories without a dedicated one.
pub const FALLBACK_PREFIX: &str = "MAT";

/// Upper bound on candidates tried past the highest suffix.
pub const MAX_CODE_CANDIDATES: u32 = 1000;

const CATEGORY_PREFIXES: &[(&str, &str)] = &[
    ("Fontanería y Ferretería", "FON"),
    ("Herramientas y Equipos", "HER"),
    ("Seguridad", "SEG"),
    ("Limpieza", "LIM"),
    ("Papelería", "PAP"),
];

/// Fixed three-letter prefix for a category.
pub fn category_prefix(category: &str) -> &'static str {
    let category = category.trim();
    CATEGORY_PREFIXES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, prefix)| *prefix)
        .unwrap_or(FALLBACK_PREFIX)
}

/// `PREFIX-NNN`, zero-padded to at least three digits.
pub fn format_code(prefix: &str, number: u32) -> String {
    format!("{prefix}-{number:03}")
}

/// Numeric suffix of `code` when it has the shape `PREFIX-<digits>`.
pub fn parse_suffix(prefix: &str, code: &str) -> Option<u32> {
    let digits = code.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// LIKE pattern selecting the codes that share `prefix`.
pub fn like_pattern(prefix: &str) -> String {
    format!("{prefix}-%")
}

/// Allocate the next free code for `category` given the codes already in use.
///
/// Takes the highest numeric suffix among codes sharing the prefix, adds one, and
/// tries upward on collision for at most [`MAX_CODE_CANDIDATES`] candidates.
pub fn next_code<'a>(
    category: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> DomainResult<String> {
    let prefix = category_prefix(category);
    let taken: HashSet<&str> = existing.into_iter().collect();

    let highest = taken
        .iter()
        .filter_map(|code| parse_suffix(prefix, code))
        .max()
        .unwrap_or(0);

    let start = highest.saturating_add(1);
    for offset in 0..MAX_CODE_CANDIDATES {
        let Some(number) = start.checked_add(offset) else {
            break;
        };
        let candidate = format_code(prefix, number);
        if !taken.contains(candidate.as_str()) {
            return Ok(candidate);
        }
    }

    Err(DomainError::validation(format!(
        "no free code for prefix {prefix} after {MAX_CODE_CANDIDATES} attempts"
    )))
}
