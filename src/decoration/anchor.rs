//! Anchor resolution
//!
//! Turns a decoration's (selector, text quote) pair into a [`TextRange`].
//! The selector narrows the scope; the quote is then searched within that
//! scope. Candidates are ranked by how much of the recorded context
//! (`textBefore` / `textAfter`) they reproduce, ties going to the first
//! match in document order.

use crate::dom::{ContentDocument, TextRange};
use crate::error::DecorationError;

use super::types::{Decoration, TextQuote};

/// Resolve the anchor of `decoration` against the current document
pub fn resolve_anchor<D: ContentDocument + ?Sized>(
    doc: &D,
    decoration: &Decoration,
) -> Result<TextRange, DecorationError> {
    if decoration.css_selector.is_none() && decoration.text_quote.is_none() {
        return Err(DecorationError::MissingAnchor(decoration.id.clone()));
    }

    let scope = match &decoration.css_selector {
        Some(selector) => doc
            .select(selector)
            .ok_or_else(|| DecorationError::SelectorNotFound(selector.clone()))?,
        None => doc.document_range(),
    };

    let range = match &decoration.text_quote {
        Some(quote) => anchor_quote(doc.text(), scope, quote)
            .ok_or_else(|| DecorationError::QuoteNotFound(quote.quoted_text.clone()))?,
        None => scope,
    };

    if range.is_collapsed() {
        return Err(DecorationError::EmptyRange(decoration.id.clone()));
    }

    Ok(range)
}

/// Find `quote` inside `scope` of `text`
pub fn anchor_quote(text: &str, scope: TextRange, quote: &TextQuote) -> Option<TextRange> {
    if quote.quoted_text.is_empty() || scope.end > text.len() || scope.start > scope.end {
        return None;
    }
    let haystack = text.get(scope.start..scope.end)?;

    let mut candidates = exact_matches(haystack, &quote.quoted_text);
    if candidates.is_empty() {
        candidates = whitespace_insensitive_matches(haystack, &quote.quoted_text);
    }

    let mut best: Option<(usize, TextRange)> = None;
    for candidate in candidates {
        let absolute = scope.offset(candidate);
        let score = context_score(text, absolute, quote);
        // strictly greater keeps the earliest match on ties
        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, absolute));
        }
    }

    best.map(|(_, range)| range)
}

/// All (possibly overlapping) occurrences of `needle`, in order
fn exact_matches(haystack: &str, needle: &str) -> Vec<TextRange> {
    let mut matches = Vec::new();
    let mut from = 0;

    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        matches.push(TextRange::new(start, start + needle.len()));
        // resume one character later to allow overlaps
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
        if from > haystack.len() {
            break;
        }
    }

    matches
}

/// Matches after collapsing runs of whitespace on both sides
fn whitespace_insensitive_matches(haystack: &str, needle: &str) -> Vec<TextRange> {
    let (collapsed, offsets) = collapse_whitespace(haystack);
    let (needle, _) = collapse_whitespace(needle);
    let needle = needle.trim();
    if needle.is_empty() {
        return Vec::new();
    }

    exact_matches(&collapsed, needle)
        .into_iter()
        .map(|m| {
            let start = offsets[m.start];
            // end maps through the last byte of the match
            let last = offsets[m.end - 1];
            let last_len = haystack[last..].chars().next().map_or(1, char::len_utf8);
            TextRange::new(start, last + last_len)
        })
        .collect()
}

/// Collapse whitespace runs to a single space, keeping a byte map from the
/// collapsed string back into `text`
fn collapse_whitespace(text: &str) -> (String, Vec<usize>) {
    let mut collapsed = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    let mut in_space = false;

    for (index, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_space {
                continue;
            }
            in_space = true;
            collapsed.push(' ');
            offsets.push(index);
        } else {
            in_space = false;
            collapsed.push(ch);
            offsets.extend(std::iter::repeat(index).take(ch.len_utf8()));
        }
    }

    (collapsed, offsets)
}

/// Characters of recorded context reproduced around `range`
fn context_score(text: &str, range: TextRange, quote: &TextQuote) -> usize {
    let before = common_suffix_len(&text[..range.start], &quote.text_before);
    let after = common_prefix_len(&text[range.end..], &quote.text_after);
    before + after
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count()
}
