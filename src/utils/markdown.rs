//! Helpers for Telegram MarkdownV2 text.
//!
//! Every message the bot sends uses MarkdownV2, so any dynamic text (user
//! names, camp titles, dates) has to pass through [`escape_markdown`] first.

/// Escapes markdown special characters for MarkdownV2 parsing mode
///
/// # Example
/// ```
/// use study_camp_bot::utils::markdown::escape_markdown;
///
/// let text = "Camp *Finals* (week 2)";
/// let escaped = escape_markdown(text);
/// assert_eq!(escaped, "Camp \\*Finals\\* \\(week 2\\)");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escapes `text` and wraps it in bold markers.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown(text))
}

/// Escapes `text` and wraps it in an inline code span.
pub fn code(text: &str) -> String {
    format!("`{}`", text.replace('\\', "\\\\").replace('`', "\\`"))
}
