//! Text normalization for ballot markup.

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case every word after collapsing whitespace.
///
/// A letter is uppercased when it follows a non-letter and lowercased
/// otherwise, so `"REPRESENTATIVE in congress"` becomes
/// `"Representative In Congress"` and `"u.s. taxpayers"` becomes
/// `"U.S. Taxpayers"`.
pub fn titleize(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let mut result = String::with_capacity(collapsed.len());
    let mut previous_is_letter = false;
    for c in collapsed.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}

/// First whitespace-delimited token of the text.
pub fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// Seat count from a term cell, defaulting to one.
///
/// Accepts a trailing integer (`"... Vote for 2"`) or an integer followed by
/// a trailing seat noun (`"... 2 Seats"`).
pub fn trailing_seats(term: &str) -> u32 {
    let tokens: Vec<&str> = term.split_whitespace().collect();
    let seats = match tokens.as_slice() {
        [.., last] if last.parse::<u32>().is_ok() => last.parse().ok(),
        [.., count, noun] if noun.to_ascii_lowercase().starts_with("seat") => count.parse().ok(),
        _ => None,
    };
    seats.filter(|seats| *seats > 0).unwrap_or(1)
}

/// Reduce a heading like `"Local School District"` to its category name.
pub fn clean_district_category(text: &str) -> String {
    let name = titleize(text);
    for suffix in [" Districts", " District"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped.trim_end().to_string();
        }
    }
    name
}
