//! Line-preserving `.env` document model.
//!
//! A document is an ordered list of lines. Comments, blank lines, and any
//! line the parser cannot interpret are kept verbatim; `KEY=VALUE` entries
//! additionally remember their original text so an untouched document
//! serializes back byte-for-byte. Edited or appended entries are formatted
//! fresh, with quoting when the value needs it.

/// One line of an env document.
#[derive(Debug, Clone)]
enum Line {
    /// Comment, blank, or unparseable line — kept exactly as read,
    /// terminator included.
    Literal(String),
    /// A `KEY=VALUE` entry. `raw` holds the original line text and is
    /// cleared when the value changes.
    Entry {
        key: String,
        value: String,
        raw: Option<String>,
    },
}

/// An ordered, comment-preserving `.env` document.
#[derive(Debug, Clone, Default)]
pub struct EnvDocument {
    lines: Vec<Line>,
}

impl EnvDocument {
    /// Parse document text. Never fails: lines that are not comments, blanks
    /// or `KEY=VALUE` pairs are carried through verbatim.
    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::with_capacity(text.lines().count());
        for raw in split_lines(text) {
            let stripped = raw.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                lines.push(Line::Literal(raw));
                continue;
            }
            match split_pair(stripped) {
                Some((key, value)) => lines.push(Line::Entry {
                    key,
                    value,
                    raw: Some(raw),
                }),
                None => lines.push(Line::Literal(raw)),
            }
        }
        Self { lines }
    }

    /// Value of `key`. When a key appears more than once, the last
    /// occurrence wins (dotenv semantics).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|l| match l {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key` to `value`, editing the last occurrence in place or
    /// appending a new entry at the end. A no-op set keeps the original
    /// line text.
    pub fn set(&mut self, key: &str, value: &str) {
        let idx = self
            .lines
            .iter()
            .rposition(|l| matches!(l, Line::Entry { key: k, .. } if k == key));
        match idx {
            Some(i) => {
                if let Line::Entry { value: v, raw, .. } = &mut self.lines[i] {
                    if v != value {
                        *v = value.to_string();
                        *raw = None;
                    }
                }
            }
            None => self.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.to_string(),
                raw: None,
            }),
        }
    }

    /// All entries in document order, deduplicated (first position,
    /// last value).
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut order: Vec<String> = Vec::new();
        let mut values: std::collections::HashMap<String, String> =
            std::collections::HashMap::new();
        for l in &self.lines {
            if let Line::Entry { key, value, .. } = l {
                if !values.contains_key(key) {
                    order.push(key.clone());
                }
                values.insert(key.clone(), value.clone());
            }
        }
        order
            .into_iter()
            .map(|k| {
                let v = values.remove(&k).unwrap_or_default();
                (k, v)
            })
            .collect()
    }

    /// Serialize back to text. Untouched lines reproduce their original
    /// bytes; edited and appended entries are freshly formatted.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Literal(raw) => out.push_str(raw),
                Line::Entry { raw: Some(raw), .. } => out.push_str(raw),
                Line::Entry {
                    key,
                    value,
                    raw: None,
                } => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&format_entry(key, value));
                }
            }
        }
        out
    }
}

/// Split text into lines, keeping each line's terminator.
fn split_lines(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            out.push(text[start..=i].to_string());
            start = i + 1;
        }
    }
    if start < text.len() {
        out.push(text[start..].to_string());
    }
    out
}

/// Split a stripped line into `(key, value)`. Keys with embedded whitespace
/// are not treated as entries.
fn split_pair(stripped: &str) -> Option<(String, String)> {
    let (k, v) = stripped.split_once('=')?;
    let key = k.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_string(), unquote(v.trim())))
}

/// Strip one layer of matching quotes. Inside double quotes, `\"` and `\\`
/// unescape; single quotes are literal.
fn unquote(v: &str) -> String {
    let b = v.as_bytes();
    if b.len() >= 2 && b[0] == b'"' && b[b.len() - 1] == b'"' {
        let inner = &v[1..v.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(c);
            }
        }
        out
    } else if b.len() >= 2 && b[0] == b'\'' && b[b.len() - 1] == b'\'' {
        v[1..v.len() - 1].to_string()
    } else {
        v.to_string()
    }
}

/// Format a fresh entry line. Values containing spaces, `#`, or quotes are
/// double-quoted with `"` and `\` escaped. Empty values serialize as `KEY=`
/// so the record survives a cleared value.
fn format_entry(key: &str, value: &str) -> String {
    if value.is_empty() {
        return format!("{key}=\n");
    }
    if value
        .chars()
        .any(|c| c == ' ' || c == '#' || c == '"' || c == '\'')
    {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("{key}=\"{escaped}\"\n")
    } else {
        format!("{key}={value}\n")
    }
}
