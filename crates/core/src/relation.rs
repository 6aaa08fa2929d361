//! Relationship-type sanitization
//!
//! Extraction produces free-form relationship labels ("works at",
//! "Co-founded by", ...). The store persists them as edge-table
//! identifiers, so they must be reduced to a fixed character class
//! before they are ever embedded in a query.

/// Fallback type used when sanitization strips a label down to nothing.
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "RELATED_TO";

/// Reduce a free-form relationship label to a safe identifier.
///
/// ASCII letters and digits are uppercased, every other character becomes
/// an underscore, runs of underscores collapse, and leading/trailing
/// underscores are stripped. An empty result falls back to
/// [`DEFAULT_RELATIONSHIP_TYPE`]. The transform is idempotent.
pub fn sanitize_relationship_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        DEFAULT_RELATIONSHIP_TYPE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether a string is already a sanitized relationship identifier.
///
/// The store asserts this before embedding a type into a query template.
pub fn is_sanitized(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
        && !value.starts_with('_')
        && !value.ends_with('_')
        && !value.contains("__")
}
