use once_cell::sync::Lazy;
use regex::Regex;

/// Suffix SEC form types carry when they amend an earlier filing.
pub const AMENDMENT_MARKER: &str = "/A";

static AMENDMENT_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([\w-]+/A)\b").expect("valid amendment regex"));
static TICKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{1,5})\b").expect("valid ticker regex"));

/// Case-sensitive: `10-k/a` is not recognised, matching how the listing
/// prints form types.
pub fn is_amendment(form_type: &str) -> bool {
    form_type.contains(AMENDMENT_MARKER)
}

/// The form being amended, e.g. `10-K` for `10-K/A`.
pub fn base_form(form_type: &str) -> &str {
    let form_type = form_type.trim();
    form_type.strip_suffix(AMENDMENT_MARKER).unwrap_or(form_type)
}

/// First amendment form token in free text.
pub fn find_amendment(text: &str) -> Option<&str> {
    AMENDMENT_FORM
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// First run of one to five capital letters standing alone.
pub fn find_ticker(text: &str) -> Option<&str> {
    TICKER
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}
