use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_.-]").expect("static filename pattern is valid")
});

/// Reduce a client-supplied filename to something safe to join onto the
/// upload directory.
///
/// Path separators turn into word breaks, non-ASCII characters are dropped,
/// whitespace runs collapse to `_` and only `[A-Za-z0-9_.-]` survive. Leading
/// and trailing `.`/`_` are stripped so the result can never climb out of the
/// directory. May return an empty string.
pub fn secure_filename(raw: &str) -> String {
    let ascii: String = raw
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .filter(char::is_ascii)
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    DISALLOWED
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
