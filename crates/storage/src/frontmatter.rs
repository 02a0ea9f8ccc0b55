//! YAML frontmatter: the structured metadata block at the top of a markdown note,
//! and the codec for its `tags` field.

use serde_yaml::{Mapping, Value};

pub const TAGS_KEY: &str = "tags";
const DELIMITER: &str = "---";
const END_DELIMITER: &str = "...";

/// A document split into its frontmatter source and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document<'a> {
    /// Raw YAML between the delimiter lines, `None` when the note has no block.
    pub yaml: Option<&'a str>,
    pub body: &'a str,
    pub newline: &'static str,
}

pub fn split(content: &str) -> Document<'_> {
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let without = Document {
        yaml: None,
        body: content,
        newline,
    };

    let Some(first_end) = content.find('\n') else {
        return without;
    };
    if content[..first_end].trim_end_matches('\r') != DELIMITER {
        return without;
    }

    let start = first_end + 1;
    let mut offset = start;
    while offset < content.len() {
        let rest = &content[offset..];
        let (line, next) = match rest.find('\n') {
            Some(i) => (&rest[..i], offset + i + 1),
            None => (rest, content.len()),
        };
        let line = line.trim_end_matches('\r');
        if line == DELIMITER || line == END_DELIMITER {
            return Document {
                yaml: Some(&content[start..offset]),
                body: &content[next..],
                newline,
            };
        }
        offset = next;
    }

    // Unterminated block: treat the whole file as body.
    without
}

/// Parses a frontmatter block. `Ok(None)` means the block is valid YAML but
/// not a mapping, so it cannot carry tags.
pub fn parse(yaml: &str) -> Result<Option<Mapping>, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(Some(Mapping::new()));
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(mapping) => Ok(Some(mapping)),
        Value::Null => Ok(Some(Mapping::new())),
        _ => Ok(None),
    }
}

pub fn render(
    mapping: &Mapping,
    body: &str,
    newline: &str,
    had_block: bool,
) -> Result<String, serde_yaml::Error> {
    if mapping.is_empty() {
        if !had_block {
            return Ok(body.to_string());
        }
        return Ok(format!("{DELIMITER}{newline}{DELIMITER}{newline}{body}"));
    }
    let mut yaml = serde_yaml::to_string(mapping)?;
    if newline != "\n" {
        yaml = yaml.replace('\n', newline);
    }
    Ok(format!("{DELIMITER}{newline}{yaml}{DELIMITER}{newline}{body}"))
}

/// Decodes the `tags` field. Accepts a sequence of scalars or a string of
/// comma/whitespace separated tags; a missing or null field is empty. Tags are
/// returned exactly as written so that `write_tags` round-trips them.
pub fn read_tags(mapping: &Mapping) -> Vec<String> {
    match mapping.get(TAGS_KEY) {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

/// Writes the `tags` field. Sequence items that `read_tags` does not decode
/// (nulls, nested values) stay at their index; scalars keep their YAML type.
/// The field is removed when nothing is left in it.
pub fn write_tags(mapping: &mut Mapping, tags: &[String]) {
    let existing = match mapping.get(TAGS_KEY) {
        Some(Value::Sequence(items)) => items.clone(),
        _ => Vec::new(),
    };
    let mut items: Vec<Value> = tags
        .iter()
        .map(|tag| {
            existing
                .iter()
                .find(|item| scalar_text(item).as_deref() == Some(tag.as_str()))
                .cloned()
                .unwrap_or_else(|| Value::String(tag.clone()))
        })
        .collect();
    for (index, item) in existing.into_iter().enumerate() {
        if scalar_text(&item).is_none() {
            let at = index.min(items.len());
            items.insert(at, item);
        }
    }

    if items.is_empty() {
        mapping.shift_remove(TAGS_KEY);
        return;
    }
    // Inserting over an existing key keeps its position.
    mapping.insert(Value::String(TAGS_KEY.to_string()), Value::Sequence(items));
}

fn scalar_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
