//! Input sanitisation and content filters for the enhancement endpoint.
//!
//! Filters run in a fixed order and the first failure wins:
//! length → script injection → SQL → URL → email → banned phrase → spam.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::enhance::models::FieldKind;

pub const MIN_CHARS: usize = 20;
pub const MIN_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    TooShort,
    TooLong,
    ScriptInjection,
    SqlInjection,
    ContainsUrl,
    ContainsEmail,
    BannedPhrase,
    Spam,
    NotResumeContent,
}

impl RejectionReason {
    fn default_message(self) -> &'static str {
        match self {
            RejectionReason::TooShort => "Please write a little more before enhancing.",
            RejectionReason::TooLong => "This text is too long to enhance.",
            RejectionReason::ScriptInjection => "The text contains code or markup that is not allowed.",
            RejectionReason::SqlInjection => "The text contains database commands that are not allowed.",
            RejectionReason::ContainsUrl => "Please remove links from the text before enhancing.",
            RejectionReason::ContainsEmail => {
                "Please remove email addresses from the text before enhancing."
            }
            RejectionReason::BannedPhrase => "The text contains phrases that cannot be processed.",
            RejectionReason::Spam => "The text looks like spam. Please write it in plain sentences.",
            RejectionReason::NotResumeContent => {
                "This doesn't look like resume content. Please describe your own experience."
            }
        }
    }
}

/// A structured, user-facing refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl ContentRejection {
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            message: reason.default_message().to_string(),
        }
    }

    pub fn with_message(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

static SCRIPT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<\s*/?\s*script|javascript\s*:|vbscript\s*:|\bon[a-z]{3,}\s*=|<\s*iframe|<\s*object|<\s*embed|<\s*svg|<\s*img[^>]*\bsrc|data\s*:\s*text/html|\beval\s*\(|document\.cookie|\{\{.*\}\}|\$\{.*\}",
    )
    .expect("script pattern compiles")
});

static SQL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bdrop\s+(?:table|database)\b|\bunion\s+(?:all\s+)?select\b|\binsert\s+into\b|\bdelete\s+from\b|\btruncate\s+table\b|\bor\s+1\s*=\s*1\b|'\s*or\s*'[^']*'\s*=\s*'|;\s*--|\bxp_cmdshell\b|\bexec\s*\(",
    )
    .expect("sql pattern compiles")
});

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:https?|ftp)://\S+|\bwww\.[a-z0-9-]+\.\S+|\b[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|org|net|io|dev|co|me|ai|app|xyz|info|biz|ru|cn|tk|top|click|link|site|online|tech)\b(?:/\S*)?|\b[a-z0-9-]+\.[a-z]{2,}/\S+",
    )
    .expect("url pattern compiles")
});

/// Dotted technology names that would otherwise read as domains.
const TECH_NAMES: &[&str] = &[
    "asp.net",
    "ado.net",
    "vb.net",
    "socket.io",
    "node.js",
    "vue.js",
    "next.js",
    "nuxt.js",
    "express.js",
    "react.js",
    "three.js",
    "chart.js",
    "d3.js",
];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b")
        .expect("email pattern compiles")
});

/// Matched against lowercased, whitespace-collapsed text.
const BANNED_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous",
    "ignore the above",
    "ignore your instructions",
    "disregard previous",
    "disregard the above",
    "disregard all prior",
    "forget your instructions",
    "forget everything above",
    "system prompt",
    "new instructions:",
    "reveal your instructions",
    "you are now",
    "pretend to be",
    "jailbreak",
    "developer mode",
    "do anything now",
    "respond only with",
    "click here",
    "buy now",
    "free money",
    "limited time offer",
    "work from home and earn",
];

/// Strips control and zero-width characters, collapses runs of spaces and
/// blank lines, and trims.
pub fn sanitize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            '\n' => Some('\n'),
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;
    for line in cleaned.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}

/// Runs every input filter over already-sanitised text.
pub fn validate_input(field: FieldKind, text: &str) -> Result<(), ContentRejection> {
    check_length(field, text)?;
    check_script(text)?;
    check_sql(text)?;
    check_url(text)?;
    check_email(text)?;
    check_banned_phrases(text)?;
    check_spam(text)?;
    Ok(())
}

/// Filters applied to model output before it is returned.
pub fn validate_output(text: &str) -> Result<(), ContentRejection> {
    check_script(text)?;
    check_url(text)?;
    check_email(text)?;
    Ok(())
}

fn check_length(field: FieldKind, text: &str) -> Result<(), ContentRejection> {
    let chars = text.chars().count();
    let words = text.split_whitespace().count();

    if chars < MIN_CHARS || words < MIN_WORDS {
        return Err(ContentRejection::with_message(
            RejectionReason::TooShort,
            format!(
                "Please write at least {MIN_CHARS} characters and {MIN_WORDS} words for your {}.",
                field.label()
            ),
        ));
    }
    if chars > field.max_chars() {
        return Err(ContentRejection::with_message(
            RejectionReason::TooLong,
            format!(
                "Your {} is too long ({chars} characters). The limit is {} characters.",
                field.label(),
                field.max_chars()
            ),
        ));
    }
    Ok(())
}

fn check_script(text: &str) -> Result<(), ContentRejection> {
    if SCRIPT_PATTERN.is_match(text) {
        return Err(ContentRejection::new(RejectionReason::ScriptInjection));
    }
    Ok(())
}

fn check_sql(text: &str) -> Result<(), ContentRejection> {
    if SQL_PATTERN.is_match(text) {
        return Err(ContentRejection::new(RejectionReason::SqlInjection));
    }
    Ok(())
}

fn check_url(text: &str) -> Result<(), ContentRejection> {
    // Addresses are left to the email check.
    let mut candidate = EMAIL_PATTERN.replace_all(&text.to_lowercase(), " ").into_owned();
    for name in TECH_NAMES {
        candidate = candidate.replace(name, " ");
    }
    if URL_PATTERN.is_match(&candidate) {
        return Err(ContentRejection::new(RejectionReason::ContainsUrl));
    }
    Ok(())
}

fn check_email(text: &str) -> Result<(), ContentRejection> {
    if EMAIL_PATTERN.is_match(text) {
        return Err(ContentRejection::new(RejectionReason::ContainsEmail));
    }
    Ok(())
}

fn check_banned_phrases(text: &str) -> Result<(), ContentRejection> {
    let normalised = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if BANNED_PHRASES.iter().any(|p| normalised.contains(p)) {
        return Err(ContentRejection::new(RejectionReason::BannedPhrase));
    }
    Ok(())
}

fn check_spam(text: &str) -> Result<(), ContentRejection> {
    if has_long_char_run(text, 6)
        || dominant_word_ratio(text) > 0.4
        || uppercase_ratio(text) > 0.6
        || symbol_ratio(text) > 0.3
    {
        return Err(ContentRejection::new(RejectionReason::Spam));
    }
    Ok(())
}

/// True if any non-whitespace character repeats `run` or more times in a row.
fn has_long_char_run(text: &str, run: usize) -> bool {
    let mut prev: Option<char> = None;
    let mut count = 0;
    for c in text.chars() {
        if Some(c) == prev {
            count += 1;
        } else {
            prev = Some(c);
            count = 1;
        }
        if count >= run && !c.is_whitespace() {
            return true;
        }
    }
    false
}

/// Share of the most frequent word. Zero for texts under ten words.
fn dominant_word_ratio(text: &str) -> f64 {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < 10 {
        return 0.0;
    }

    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for w in &words {
        *counts.entry(w.as_str()).or_default() += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    max as f64 / words.len() as f64
}

/// Share of uppercase letters. Zero for texts under twenty letters.
fn uppercase_ratio(text: &str) -> f64 {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 20 {
        return 0.0;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters.len() as f64
}

/// Share of non-whitespace characters that are neither alphanumeric nor
/// ordinary prose punctuation.
fn symbol_ratio(text: &str) -> f64 {
    const PROSE: &str = ".,;:!?'\"()-/&%+#@$€£*";
    let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if visible.is_empty() {
        return 0.0;
    }
    let symbols = visible
        .iter()
        .filter(|c| !c.is_alphanumeric() && !PROSE.contains(**c))
        .count();
    symbols as f64 / visible.len() as f64
}
