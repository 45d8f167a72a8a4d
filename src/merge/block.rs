//! Locating and extending the `lazy.setup({ ... })` block of an init file.
//!
//! Matching is purely textual: the first `lazy.setup({` up to the nearest
//! following `})` is the managed block. Everything outside it is copied
//! through byte for byte.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const INDENT: &str = "  ";

fn setup_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"lazy\.setup\(\{(?s:.*?)\}\)").expect("valid setup block regex"))
}

/// Byte range of the managed block inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedBlock {
    start: usize,
    /// Offset of the closing `}`.
    close: usize,
    end: usize,
}

impl ManagedBlock {
    pub fn find(document: &str) -> Option<Self> {
        setup_block_regex().find(document).map(|m| Self {
            start: m.start(),
            close: m.end() - "})".len(),
            end: m.end(),
        })
    }

    #[cfg(test)]
    fn text<'a>(&self, document: &'a str) -> &'a str {
        &document[self.start..self.end]
    }

    fn body<'a>(&self, document: &'a str) -> &'a str {
        &document[self.start..self.close]
    }

    /// Whether `name` already appears quoted inside the block.
    pub fn references(&self, document: &str, name: &str) -> bool {
        let body = self.body(document);
        body.contains(&format!("'{name}'")) || body.contains(&format!("\"{name}\""))
    }

    /// Where new lines go, and whether they need a leading newline.
    ///
    /// A `})` on its own line gets the new lines above it; otherwise a line
    /// break is opened right before the `}`.
    fn insertion_point(&self, document: &str) -> (usize, bool) {
        let before_close = &document[..self.close];
        let line_start = before_close.rfind('\n').map_or(0, |i| i + 1);
        if line_start > self.start && before_close[line_start..].trim().is_empty() {
            (line_start, false)
        } else {
            (self.close, true)
        }
    }

    /// Offset right after the last entry before `at`, when that entry is not
    /// yet followed by a `,` or `;`.
    fn missing_separator(&self, document: &str, at: usize) -> Option<usize> {
        let head = document[self.start..at].trim_end();
        match head.chars().last() {
            Some(',' | ';' | '{') | None => None,
            Some(_) => Some(self.start + head.len()),
        }
    }
}

/// `  require('<name>'),` plus newline.
pub fn reference_line(name: &str) -> String {
    format!("{INDENT}require('{name}'),\n")
}

/// Result of merging names into a document held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDocument {
    pub text: String,
    pub added: Vec<String>,
    pub created_block: bool,
}

impl MergedDocument {
    pub fn changed(&self) -> bool {
        self.created_block || !self.added.is_empty()
    }
}

/// Appends every name not yet referenced to the managed block, creating the
/// block at the end of the document if there is none.
pub fn merge_names(document: &str, names: &[String]) -> MergedDocument {
    let mut seen = HashSet::new();
    let names: Vec<&String> = names.iter().filter(|n| seen.insert(n.as_str())).collect();

    match ManagedBlock::find(document) {
        Some(block) => {
            let missing: Vec<String> = names
                .into_iter()
                .filter(|n| !block.references(document, n))
                .cloned()
                .collect();
            if missing.is_empty() {
                return MergedDocument {
                    text: document.to_string(),
                    added: Vec::new(),
                    created_block: false,
                };
            }

            let (at, needs_newline) = block.insertion_point(document);
            let mut text = String::with_capacity(document.len() + missing.len() * 32);
            match block.missing_separator(document, at) {
                Some(after) => {
                    text.push_str(&document[..after]);
                    text.push(',');
                    text.push_str(&document[after..at]);
                }
                None => text.push_str(&document[..at]),
            }
            if needs_newline {
                text.push('\n');
            }
            for name in &missing {
                text.push_str(&reference_line(name));
            }
            text.push_str(&document[at..]);

            MergedDocument {
                text,
                added: missing,
                created_block: false,
            }
        }
        None if names.is_empty() => MergedDocument {
            text: document.to_string(),
            added: Vec::new(),
            created_block: false,
        },
        None => {
            let added: Vec<String> = names.into_iter().cloned().collect();
            let mut text = document.to_string();
            if !text.is_empty() {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push('\n');
            }
            text.push_str("lazy.setup({\n");
            for name in &added {
                text.push_str(&reference_line(name));
            }
            text.push_str("})\n");

            MergedDocument {
                text,
                added,
                created_block: true,
            }
        }
    }
}
