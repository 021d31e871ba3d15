//! Text processing utilities.

/// Form feed, emitted between pages by common PDF text extractors.
pub const PAGE_BREAK: char = '\x0c';

/// Byte ranges of the whitespace-separated words in `text`.
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;

    for (idx, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

/// Byte offsets of every page break in `text`.
pub fn page_breaks(text: &str) -> Vec<usize> {
    text.char_indices()
        .filter(|(_, c)| *c == PAGE_BREAK)
        .map(|(idx, _)| idx)
        .collect()
}

/// 1-based page containing `offset`, given sorted page break offsets.
pub fn page_at(breaks: &[usize], offset: usize) -> u32 {
    breaks.partition_point(|&b| b < offset) as u32 + 1
}

/// True when nothing but whitespace remains after trimming.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// First `max_chars` characters, with an ellipsis when truncated.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
