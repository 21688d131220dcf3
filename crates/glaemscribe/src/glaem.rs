//! A small, forgiving, line/indentation-based parser for the mode and
//! charset document formats consumed by the core (see SPEC_FULL.md §4.10-4.11
//! and §6).
//!
//! This is deliberately *not* a general markup grammar — the core only
//! needs a document tree of named elements with string arguments, ordered
//! children, and line numbers, plus raw text lines inside `rules` bodies.
//! Indentation establishes nesting the way it would in YAML or Python,
//! rather than requiring explicit closing tags, except inside `rules`
//! bodies where the rule-group compiler (see [`crate::rule_group`]) handles
//! its own `if`/`elsif`/`else`/`endif` text terms.

use crate::error::{ErrorKind, ModeError};

/// One node of the parsed document tree.
///
/// `name` is empty and `is_text` is `true` for raw text lines (rule-line
/// strings inside a `rules` element, or other free text); otherwise `name`
/// is the element name and `args` are its whitespace-separated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub args: Vec<String>,
    pub children: Vec<Node>,
    pub line: u32,
    pub is_text: bool,
}

impl Node {
    fn element(name: String, args: Vec<String>, line: u32) -> Self {
        Node { name, args, children: Vec::new(), line, is_text: false }
    }

    fn text(content: String, line: u32) -> Self {
        Node { name: String::new(), args: vec![content], children: Vec::new(), line, is_text: true }
    }

    /// The raw text of a text node, or `""` for an element node.
    pub fn text_content(&self) -> &str {
        if self.is_text {
            self.args.first().map(String::as_str).unwrap_or("")
        } else {
            ""
        }
    }

    /// Direct children whose name matches, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| !c.is_text && c.name == name)
    }

    pub fn first_child_named(&self, name: &str) -> Option<&Node> {
        self.children_named(name).next()
    }
}

struct Entry {
    indent: usize,
    node: Node,
}

/// Parse a mode/charset document into its root node.
///
/// The root is a synthetic element named `"document"` at line 0 whose
/// children are the top-level elements of the file.
pub fn parse(source: &str) -> Result<Node, Vec<ModeError>> {
    let mut errors = Vec::new();
    let mut entries = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let content = strip_comment(raw_line);
        if content.trim().is_empty() {
            continue;
        }

        let indent = leading_whitespace(content);
        let trimmed = content[indent..].trim_end();

        if let Some(rest) = trimmed.strip_prefix('\\') {
            match tokenize_element(rest) {
                Some((name, args)) if !name.is_empty() => {
                    entries.push(Entry { indent, node: Node::element(name, args, line_no) });
                }
                _ => errors.push(ModeError::parse(line_no, "element line is missing a name after '\\'")),
            }
        } else {
            entries.push(Entry { indent, node: Node::text(trimmed.to_string(), line_no) });
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let base_indent = entries.first().map(|e| e.indent).unwrap_or(0);
    let mut pos = 0usize;
    let children = build_children(&entries, &mut pos, base_indent, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Node { name: "document".to_string(), args: Vec::new(), children, line: 0, is_text: false })
}

fn build_children(
    entries: &[Entry],
    pos: &mut usize,
    level_indent: usize,
    errors: &mut Vec<ModeError>,
) -> Vec<Node> {
    let mut out = Vec::new();

    while *pos < entries.len() {
        let indent = entries[*pos].indent;

        if indent < level_indent {
            break;
        }

        if indent > level_indent {
            errors.push(ModeError::parse(
                entries[*pos].node.line,
                "unexpected indentation (does not match any enclosing level)",
            ));
            *pos += 1;
            continue;
        }

        let mut node = entries[*pos].node.clone();
        *pos += 1;

        if *pos < entries.len() && entries[*pos].indent > level_indent {
            let child_indent = entries[*pos].indent;
            node.children = build_children(entries, pos, child_indent, errors);
        }

        out.push(node);
    }

    out
}

/// Strip a `#`-led line comment, honoring single- and double-quoted strings.
fn strip_comment(line: &str) -> &str {
    let mut in_quote: Option<char> = None;
    for (i, ch) in line.char_indices() {
        match in_quote {
            Some(q) if ch == q => in_quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => in_quote = Some(ch),
            None if ch == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Split an element line's remainder into `(name, args)`, honoring quoted
/// arguments the way [`tokenize_element`]'s callers expect (an argument
/// containing whitespace must be wrapped in double quotes).
fn tokenize_element(rest: &str) -> Option<(String, Vec<String>)> {
    let tokens = tokenize_args(rest);
    let mut iter = tokens.into_iter();
    let name = iter.next()?;
    Some((name, iter.collect()))
}

fn tokenize_args(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                in_quotes = false;
            } else {
                current.push(ch);
            }
        } else if ch == '"' {
            in_quotes = true;
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_elements() {
        let doc = parse("\\version 1.0\n\\language qya\n\\writing teng").unwrap();
        assert_eq!(doc.children.len(), 3);
        assert_eq!(doc.children[0].name, "version");
        assert_eq!(doc.children[0].args, vec!["1.0"]);
    }

    #[test]
    fn parses_nested_children_by_indentation() {
        let src = "\\rules main\n  a --> b\n  c --> d\n\\version 1.0";
        let doc = parse(src).unwrap();
        assert_eq!(doc.children.len(), 2);
        let rules = &doc.children[0];
        assert_eq!(rules.name, "rules");
        assert_eq!(rules.children.len(), 2);
        assert!(rules.children[0].is_text);
        assert_eq!(rules.children[0].text_content(), "a --> b");
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let src = "# a comment\n\n\\version 1.0 # trailing comment\n";
        let doc = parse(src).unwrap();
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].args, vec!["1.0"]);
    }

    #[test]
    fn quoted_args_preserve_whitespace() {
        let doc = parse("\\option \"human name\" \"Quenya (Classical)\"").unwrap();
        assert_eq!(doc.children[0].args, vec!["human name", "Quenya (Classical)"]);
    }

    #[test]
    fn rejects_nameless_element() {
        let err = parse("\\  arg").unwrap_err();
        assert_eq!(err[0].kind, ErrorKind::Parse);
    }

    #[test]
    fn rejects_unexpected_indentation() {
        // indent 4 opens a child level under "language"; indent 1 then
        // matches neither that level nor the outer one at indent 0.
        let bad = "\\version 1.0\n    \\language qya\n \\bad x";
        let err = parse(bad).unwrap_err();
        assert_eq!(err[0].kind, ErrorKind::Parse);
    }
}
