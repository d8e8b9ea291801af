//! Markdown code-fence handling for generated text.
//!
//! Models often wrap structured output in fences. [`strip_code_fence`]
//! prefers a block tagged with the expected language, then any fenced block,
//! and otherwise returns the text untouched.

/// Extract the payload of a fenced block, if any.
///
/// # Examples
///
/// ```
/// use consultant_pipeline::extract::strip_code_fence;
///
/// let tagged = "Here you go:\n```xml\n<a/>\n```";
/// assert_eq!(strip_code_fence(tagged, "xml"), "<a/>");
///
/// let bare = "```\n<a/>\n```";
/// assert_eq!(strip_code_fence(bare, "xml"), "<a/>");
///
/// assert_eq!(strip_code_fence("<a/>", "xml"), "<a/>");
/// ```
pub fn strip_code_fence<'a>(text: &'a str, lang: &str) -> &'a str {
    if let Some(content) = extract_code_block_for(text, lang) {
        return content;
    }
    if let Some((_, content)) = extract_code_block(text) {
        return content;
    }
    text
}

/// Extract content from the first complete markdown code block.
///
/// Returns `(language_hint, content)` where hint is `None` for bare fences.
pub fn extract_code_block(text: &str) -> Option<(Option<&str>, &str)> {
    let mut search_from = 0;
    while let Some(fence_start) = text[search_from..].find("```") {
        let after_backticks = search_from + fence_start + 3;
        match block_at(text, after_backticks) {
            Some(block) => return Some((block.lang, block.content)),
            None => search_from = after_backticks,
        }
    }
    None
}

/// Extract content from a code block tagged with `lang` (case-insensitive).
pub fn extract_code_block_for<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(fence_start) = text[search_from..].find("```") {
        let after_backticks = search_from + fence_start + 3;
        match block_at(text, after_backticks) {
            Some(block) if block.lang.is_some_and(|l| l.eq_ignore_ascii_case(lang)) => {
                return Some(block.content)
            }
            // Skip past this block's closing fence so it is not read as an opener.
            Some(block) => search_from = block.end,
            None => search_from = after_backticks,
        }
    }
    None
}

struct Block<'a> {
    lang: Option<&'a str>,
    content: &'a str,
    /// Byte offset just past the closing fence.
    end: usize,
}

/// Parse the block opened by the backticks ending at `after`.
///
/// `None` when the backticks are not an opener (prose such as "use ``` to
/// fence") or the block is never closed.
fn block_at(text: &str, after: usize) -> Option<Block<'_>> {
    let rest = &text[after..];
    let newline = rest.find('\n');
    let inline_close = rest.find("```");

    let (lang, content_start) = match (newline, inline_close) {
        (Some(nl), close) if close.map_or(true, |c| nl < c) => {
            let hint = rest[..nl].trim();
            if hint.contains(char::is_whitespace) {
                return None;
            }
            (non_empty(hint), after + nl + 1)
        }
        // Opener and closer on one line: "```xml<a/>```"
        (_, Some(close)) => {
            let line = &rest[..close];
            let hint_len = line
                .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))
                .unwrap_or(line.len());
            if hint_len < line.len() {
                (non_empty(&line[..hint_len]), after + hint_len)
            } else {
                (None, after)
            }
        }
        (None, None) => return None,
        // Covered by the first arm: its guard always holds when `close` is None.
        (Some(_), None) => unreachable!(),
    };

    let close = text[content_start..].find("```")?;
    Some(Block {
        lang,
        content: text[content_start..content_start + close].trim(),
        end: content_start + close + 3,
    })
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
