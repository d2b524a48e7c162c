//! A minimal reader for the `key=value` text format used both by `.desktop`
//! session descriptors and by this system's own config files.
//!
//! This is intentionally not a full INI parser: there is no nesting, no
//! escaping beyond what `trim` gives us for free, and `[section]` headers are
//! recognized only so they can be skipped, never interpreted.

use std::fmt;

/// One `key=value` line, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

/// A parsed document: an ordered list of entries.
///
/// Order is preserved because some formats (notably `.desktop` session
/// descriptors) are defined in terms of "the *first* line starting with
/// `Exec=`", not the last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub text: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: not a key=value pair: {:?}", self.line, self.text)
    }
}

impl std::error::Error for ParseError {}

impl Document {
    /// Parses `input`, skipping blank lines, `#`/`;` comments, and
    /// `[section]` headers. Any other line must contain `=`; lines without
    /// it are reported as [`ParseError`] rather than silently dropped, since
    /// a malformed config file should be loud about it.
    pub fn parse(input: &str) -> Result<Document, ParseError> {
        let mut entries = Vec::new();
        for (idx, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            match line.find('=') {
                Some(pos) => {
                    let key = line[..pos].trim().to_string();
                    let value = line[pos + 1..].trim().to_string();
                    entries.push(Entry { key, value });
                }
                None => {
                    return Err(ParseError {
                        line: idx + 1,
                        text: raw_line.to_string(),
                    })
                }
            }
        }
        Ok(Document { entries })
    }

    /// All entries, in file order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The value of the *first* entry with the given key, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// The value of the *last* entry with the given key, if any. Useful for
    /// config files where a later line is meant to override an earlier one.
    pub fn last(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pairs() {
        let doc = Document::parse("a=1\nb = 2\n").unwrap();
        assert_eq!(doc.first("a"), Some("1"));
        assert_eq!(doc.first("b"), Some("2"));
    }

    #[test]
    fn skips_comments_blanks_and_sections() {
        let doc = Document::parse("# comment\n\n[Desktop Entry]\n; also comment\nExec=/bin/true\n")
            .unwrap();
        assert_eq!(doc.first("Exec"), Some("/bin/true"));
    }

    #[test]
    fn first_wins_but_last_is_available() {
        let doc = Document::parse("Exec=one\nExec=two\n").unwrap();
        assert_eq!(doc.first("Exec"), Some("one"));
        assert_eq!(doc.last("Exec"), Some("two"));
    }

    #[test]
    fn rejects_lines_without_equals() {
        let err = Document::parse("not-a-pair\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn missing_key_is_none() {
        let doc = Document::parse("a=1\n").unwrap();
        assert_eq!(doc.first("missing"), None);
    }
}
