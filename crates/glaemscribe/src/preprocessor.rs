//! An ordered list of text-rewriting operators applied to input text before
//! word splitting and trie traversal.

use crate::error::ModeError;
use regex::Regex;

#[derive(Debug, Clone)]
pub enum Operator {
    /// Literal, leftmost-first, non-overlapping string replacement.
    Substitute { pattern: String, replacement: String },
    /// Regex replacement; `replacement` may use `\1`..`\9` backreferences.
    RxSubstitute { pattern: Regex, pattern_source: String, replacement: String },
    /// An operator name registered via [`crate::config::CompilerConfig`] but
    /// with no implementation in the core: accepted at compile time, a
    /// no-op at `apply` time. The embedding application that registered the
    /// name is expected to run its own pass for it outside this crate.
    External { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    ops: Vec<Operator>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Preprocessor { ops: Vec::new() }
    }

    pub fn push_substitute(&mut self, pattern: impl Into<String>, replacement: impl Into<String>) {
        self.ops.push(Operator::Substitute { pattern: pattern.into(), replacement: replacement.into() });
    }

    pub fn push_rx_substitute(&mut self, line: u32, pattern: &str, replacement: impl Into<String>) -> Result<(), ModeError> {
        let compiled = Regex::new(pattern)
            .map_err(|e| ModeError::compile(line, format!("invalid preprocessor regex '{pattern}': {e}")))?;
        self.ops.push(Operator::RxSubstitute {
            pattern: compiled,
            pattern_source: pattern.to_string(),
            replacement: replacement.into(),
        });
        Ok(())
    }

    pub fn push_external(&mut self, name: impl Into<String>) {
        self.ops.push(Operator::External { name: name.into() });
    }

    /// Apply every operator in declaration order.
    pub fn apply(&self, input: &str) -> String {
        let mut text = input.to_string();
        for op in &self.ops {
            text = match op {
                Operator::Substitute { pattern, replacement } => {
                    if pattern.is_empty() {
                        text
                    } else {
                        text.replace(pattern.as_str(), replacement)
                    }
                }
                Operator::RxSubstitute { pattern, replacement, .. } => {
                    pattern.replace_all(&text, to_dollar_backreferences(replacement).as_str()).into_owned()
                }
                Operator::External { .. } => text,
            };
        }
        text
    }

    pub fn ops(&self) -> &[Operator] {
        &self.ops
    }
}

/// `regex`'s replacement syntax uses `$1`, not the `\1` used by the mode
/// file format, so translate unescaped `\N` to `${N}` before handing the
/// template to `Regex::replace_all`. A literal backslash is written `\\`.
fn to_dollar_backreferences(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str(&format!("${{{d}}}"));
                    chars.next();
                }
                Some('\\') => {
                    out.push('\\');
                    chars.next();
                }
                _ => out.push('\\'),
            }
        } else if c == '$' {
            out.push_str("$$");
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_is_literal_and_non_overlapping() {
        let mut pp = Preprocessor::new();
        pp.push_substitute("aa", "b");
        assert_eq!(pp.apply("aaaa"), "bb");
    }

    #[test]
    fn rx_substitute_supports_backreferences() {
        let mut pp = Preprocessor::new();
        pp.push_rx_substitute(1, r"(\w)\1", r"\1").unwrap();
        assert_eq!(pp.apply("nnaa"), "na");
    }

    #[test]
    fn operators_apply_in_declaration_order() {
        let mut pp = Preprocessor::new();
        pp.push_substitute("a", "b");
        pp.push_substitute("b", "c");
        assert_eq!(pp.apply("a"), "c");
    }

    #[test]
    fn invalid_regex_is_a_compile_error() {
        let mut pp = Preprocessor::new();
        assert!(pp.push_rx_substitute(1, "(", "x").is_err());
    }

    #[test]
    fn external_operator_is_a_no_op_at_apply_time() {
        let mut pp = Preprocessor::new();
        pp.push_external("ipa_map");
        assert_eq!(pp.apply("aa"), "aa");
    }
}
