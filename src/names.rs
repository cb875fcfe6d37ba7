//! First-name extraction from author entries.

use crate::crossref::Author;

/// First name of an author, as sent to the gender service.
///
/// Periods become spaces and the first whitespace-separated token of the
/// given name is kept, so `"J. D."` gives `"J"` and `"Jane Ann"` gives
/// `"Jane"`. A missing or blank given name gives `""`. A leading initial is
/// not recognised as such.
pub fn extract_first_name(author: &Author) -> String {
    author
        .given
        .as_deref()
        .map(|given| given.replace('.', " "))
        .and_then(|given| given.split_whitespace().next().map(str::to_string))
        .unwrap_or_default()
}
