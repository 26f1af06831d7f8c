//! Cleans model output into plain text that can be dropped into a resume field.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::enhance::models::FieldKind;
use crate::enhance::validation::{sanitize, validate_output, ContentRejection};
use crate::llm_client::prompts::INVALID_CONTENT_MARKER;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputError {
    /// The model classified the input as not being resume content.
    #[error("model classified the input as invalid content")]
    NotResumeContent,

    #[error("model returned no usable text")]
    Empty,

    #[error("model output failed safety filters: {}", .0.message)]
    Unsafe(ContentRejection),
}

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#{1,6}\s*").expect("heading pattern compiles"));

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•▪‣–]|\d{1,2}[.)])\s+").expect("list marker pattern compiles")
});

static EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__|\*([^*\n]+)\*")
        .expect("emphasis pattern compiles")
});

static INTERJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:sure|certainly|of course|absolutely|okay|ok)\b[!,.]*\s*")
        .expect("interjection pattern compiles")
});

/// "Here is the enhanced summary:" style lead-ins, optionally followed by text.
/// First-person and "This is" openers only count when they talk about the
/// rewrite itself, so résumé sentences containing a colon survive.
static PREFACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:here(?:'s|’s| is| are)|below (?:is|are))\b[^:\n]{0,100}|this is (?:the|an?|your) (?:enhanced|improved|rewritten|revised|polished|refined|updated)\b[^:\n]{0,80}|(?:i've|i’ve|i have) (?:enhanced|improved|rewritten|revised|polished|refined|updated) your\b[^:\n]{0,80}):\s*",
    )
    .expect("preface pattern compiles")
});

/// "Enhanced summary:" / "Summary:" style labels.
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:enhanced|improved|rewritten|revised|polished|updated|new)\s+)?(?:professional\s+)?(?:summary|text|version|description|achievement|experience|project|education|output|result)\s*:\s*",
    )
    .expect("label pattern compiles")
});

static CLOSING_REMARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:let me know|i hope|feel free|hope this|note:|this version|this revision)")
        .expect("closing remark pattern compiles")
});

/// Turns raw model text into the final field value.
pub fn clean_output(field: FieldKind, raw: &str) -> Result<String, OutputError> {
    let raw = raw.trim();
    if is_invalid_marker(raw) {
        return Err(OutputError::NotResumeContent);
    }

    let mut lines: Vec<String> = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .map(strip_markdown)
        .collect();

    drop_leading_blank(&mut lines);
    strip_preface(&mut lines);
    drop_leading_blank(&mut lines);
    while lines
        .last()
        .is_some_and(|l| l.trim().is_empty() || CLOSING_REMARK.is_match(l.trim()))
    {
        lines.pop();
    }

    let joined = if field.single_paragraph() {
        lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        lines.join("\n")
    };

    let text = sanitize(strip_wrapping_quotes(joined.trim()));
    if is_invalid_marker(&text) {
        return Err(OutputError::NotResumeContent);
    }

    let text = truncate_at_boundary(&text, field.max_chars());
    if text.is_empty() {
        return Err(OutputError::Empty);
    }

    validate_output(&text).map_err(OutputError::Unsafe)?;
    Ok(text)
}

fn is_invalid_marker(text: &str) -> bool {
    text.trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_uppercase()
        .starts_with(INVALID_CONTENT_MARKER)
}

fn strip_markdown(line: &str) -> String {
    let line = HEADING.replace(line, "");
    let line = LIST_MARKER.replace(&line, "");
    let line = EMPHASIS.replace_all(&line, |caps: &regex::Captures| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    });
    line.replace('`', "").trim_end().to_string()
}

fn drop_leading_blank(lines: &mut Vec<String>) {
    let blank = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..blank);
}

/// Removes lead-ins from the first line, dropping it entirely if nothing
/// remains.
fn strip_preface(lines: &mut Vec<String>) {
    let Some(first) = lines.first_mut() else {
        return;
    };

    let mut current = first.trim().to_string();
    loop {
        let next = INTERJECTION.replace(&current, "");
        let next = PREFACE.replace(&next, "");
        let next = LABEL.replace(&next, "").trim().to_string();
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        lines.remove(0);
    } else {
        *first = current;
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    const PAIRS: &[(char, char)] = &[('"', '"'), ('“', '”'), ('\'', '\''), ('«', '»')];
    for &(open, close) in PAIRS {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            // Only strip when the quotes wrap the whole text.
            if !inner.contains(open) && !inner.contains(close) {
                return inner.trim();
            }
        }
    }
    text
}

/// Cuts `text` to at most `max_chars` characters, preferring the end of a
/// sentence in the latter half, then a word boundary.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];

    let sentence_end = head
        .char_indices()
        .filter(|&(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&end| head[..end].chars().count() >= max_chars / 2)
        .last();
    if let Some(end) = sentence_end {
        return head[..end].trim().to_string();
    }

    match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => head[..space].trim_end().to_string(),
        _ => head.to_string(),
    }
}
