//! Content file parsing: frontmatter extraction and markdown rendering.
//!
//! A content file is an optional metadata block followed by a markdown body:
//!
//! ```text
//! ---                      +++
//! title: Hello             title = "Hello"
//! date: 2024-01-05         date = 2024-01-05
//! ---                      +++
//! # Hi                     # Hi
//! ```
//!
//! A missing or broken block never fails the build: the whole file becomes
//! the body and the metadata is empty.

use crate::{log, utils::slug::heading_slug};
use anyhow::{Context, Result};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html::push_html};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Metadata block of one content file, passed to templates verbatim.
pub type Frontmatter = serde_json::Map<String, Value>;

/// Why a file's leading metadata block could not be used.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("no frontmatter block")]
    Missing,

    #[error("unterminated `{0}` frontmatter block")]
    Unterminated(&'static str),

    #[error("invalid YAML frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML frontmatter: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("frontmatter must be a mapping, found {0}")]
    NotMapping(&'static str),
}

/// A content file split into metadata and rendered HTML body.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub frontmatter: Frontmatter,
    pub html: String,
}

// ============================================================================
// Document Parsing
// ============================================================================

/// Parse raw file bytes into frontmatter and HTML.
///
/// Only invalid UTF-8 is an error; frontmatter problems are logged as
/// warnings and the file is rendered as plain markdown.
pub fn parse_document(path: &Path, bytes: &[u8]) -> Result<ParsedDocument> {
    let text = std::str::from_utf8(bytes)
        .with_context(|| format!("Failed to decode {} as UTF-8", path.display()))?;

    let (frontmatter, body) = match split_frontmatter(text) {
        Ok(parts) => parts,
        Err(err) => {
            log!("warn"; "{}: {err}, treating whole file as markdown", path.display());
            (Frontmatter::new(), text)
        }
    };

    Ok(ParsedDocument {
        frontmatter,
        html: render_markdown(body),
    })
}

#[derive(Clone, Copy)]
enum BlockFormat {
    Yaml,
    Toml,
}

impl BlockFormat {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }

    fn is_closing(self, line: &str) -> bool {
        match self {
            Self::Yaml => line == "---" || line == "...",
            Self::Toml => line == "+++",
        }
    }

    fn parse(self, block: &str) -> Result<Frontmatter, FrontmatterError> {
        let value = match self {
            Self::Yaml => serde_yaml::from_str::<Value>(block)?,
            Self::Toml => toml_to_json(toml::Value::Table(toml::from_str(block)?)),
        };

        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Frontmatter::new()),
            Value::Bool(_) => Err(FrontmatterError::NotMapping("a boolean")),
            Value::Number(_) => Err(FrontmatterError::NotMapping("a number")),
            Value::String(_) => Err(FrontmatterError::NotMapping("a string")),
            Value::Array(_) => Err(FrontmatterError::NotMapping("a list")),
        }
    }
}

/// Split a leading `---` (YAML) or `+++` (TOML) block from the body.
pub fn split_frontmatter(src: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);

    let (first, rest) = split_line(src);
    let format = match first.trim_end() {
        "---" => BlockFormat::Yaml,
        "+++" => BlockFormat::Toml,
        _ => return Err(FrontmatterError::Missing),
    };
    let rest = rest.ok_or(FrontmatterError::Unterminated(format.delimiter()))?;

    let mut block_len = 0;
    let mut remaining = rest;
    loop {
        let (line, next) = split_line(remaining);
        if format.is_closing(line.trim_end()) {
            let frontmatter = format.parse(&rest[..block_len])?;
            return Ok((frontmatter, next.unwrap_or("")));
        }
        let next = next.ok_or(FrontmatterError::Unterminated(format.delimiter()))?;
        block_len += remaining.len() - next.len();
        remaining = next;
    }
}

/// First line (without `\n`) and the remainder after it, if any.
fn split_line(s: &str) -> (&str, Option<&str>) {
    match s.find('\n') {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    }
}

/// TOML values as JSON; datetimes become their RFC 3339 text.
pub(crate) fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

// ============================================================================
// Markdown Rendering
// ============================================================================

/// Render a markdown body to HTML.
///
/// GitHub-flavored extensions (tables, strikethrough, task lists, footnotes),
/// an `id` on every heading, and hard line breaks: a single newline in the
/// source becomes `<br />`.
pub fn render_markdown(body: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM;

    let parser = Parser::new_ext(body, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut html = String::with_capacity(body.len() * 2);
    push_html(&mut html, with_heading_ids(parser).into_iter());
    html
}

/// Buffer each heading, derive its id from the heading text, and emit the
/// heading with that id. Repeated ids get `-1`, `-2`, … suffixes.
fn with_heading_ids<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    let mut heading: Option<Vec<Event<'a>>> = None;
    let mut text = String::new();

    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) if heading.is_none() => {
                text.clear();
                heading = Some(vec![event]);
            }
            Event::End(TagEnd::Heading(_)) if heading.is_some() => {
                let mut buffer = heading.take().unwrap_or_default();
                buffer.push(event);

                let id = unique_id(&mut seen, &text);
                if let Some(Event::Start(Tag::Heading { id: slot, .. })) = buffer.first_mut()
                    && slot.is_none()
                {
                    *slot = Some(CowStr::from(id));
                }
                out.extend(buffer);
            }
            event => match heading.as_mut() {
                Some(buffer) => {
                    if let Event::Text(t) | Event::Code(t) = &event {
                        text.push_str(t);
                    }
                    buffer.push(event);
                }
                None => out.push(event),
            },
        }
    }

    out
}

/// `seen` maps every id handed out so far to the last suffix tried for it.
fn unique_id(seen: &mut FxHashMap<String, usize>, text: &str) -> String {
    let mut base = heading_slug(text);
    if base.is_empty() {
        base = "heading".to_owned();
    }

    let Some(&last) = seen.get(&base) else {
        seen.insert(base.clone(), 0);
        return base;
    };

    let mut suffix = last;
    let id = loop {
        suffix += 1;
        let candidate = format!("{base}-{suffix}");
        if !seen.contains_key(&candidate) {
            break candidate;
        }
    };
    seen.insert(base, suffix);
    seen.insert(id.clone(), 0);
    id
}

// ============================================================================
// Tests
// ============================================================================
