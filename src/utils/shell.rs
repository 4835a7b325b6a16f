//! Shell quoting for rendered command lines and generated scripts

/// Characters that never need quoting in a POSIX shell word
const fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.' | ':' | '=' | ',' | '+' | '@' | '%')
}

/// Quote `word` so a POSIX shell reads it back verbatim
///
/// Plain words are returned unchanged. Anything else is wrapped in single
/// quotes, with embedded single quotes written as `'\''`.
#[must_use]
pub fn shell_escape(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_plain) {
        return word.to_owned();
    }

    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('\'');
    for part in word.split_inclusive('\'') {
        match part.strip_suffix('\'') {
            Some(head) => {
                quoted.push_str(head);
                quoted.push_str(r"'\''");
            }
            None => quoted.push_str(part),
        }
    }
    quoted.push('\'');
    quoted
}
