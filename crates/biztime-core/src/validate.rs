use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug regex"));

/// Returns the field when it holds a non-empty string.
pub fn present(field: Option<&str>) -> Option<&str> {
    field.filter(|s| !s.is_empty())
}

/// Returns the fields only when every one of them is present.
pub fn all_present<'a, const N: usize>(fields: [Option<&'a str>; N]) -> Option<[&'a str; N]> {
    let mut out = [""; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = present(field)?;
    }
    Some(out)
}

/// Normalizes a company code into an identifier-safe slug: lowercase,
/// with every character outside `[a-z0-9]` dropped and no separator.
pub fn slugify(code: &str) -> String {
    NON_SLUG.replace_all(&code.to_lowercase(), "").into_owned()
}
