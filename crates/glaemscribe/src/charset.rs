//! Charsets: the mapping from character-name tokens to actual output text,
//! plus the sequence-expansion, swap, and virtual-character machinery that
//! runs ahead of plain code-point resolution.

use crate::error::{Warning, WarningSink};
use crate::sheaf::Token;
use std::collections::{HashMap, HashSet};

/// One class of a [`VirtualChar`]: a set of trigger neighbor-token names
/// and the output text to use when one of them is adjacent.
#[derive(Debug, Clone)]
pub struct VirtualClass {
    pub triggers: HashSet<String>,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct VirtualChar {
    pub classes: Vec<VirtualClass>,
    pub default: Option<String>,
    /// When true, resolution inspects the *next* token rather than the
    /// previous one (right-to-left contextual shaping).
    pub reversed: bool,
}

impl VirtualChar {
    /// Resolve against a single neighboring token name (the name used in
    /// the source mode file, or [`BOUNDARY_NAME`] at a stream edge).
    pub fn resolve(&self, neighbor: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|c| c.triggers.contains(neighbor))
            .map(|c| c.target.as_str())
            .or(self.default.as_deref())
    }
}

#[derive(Debug, Clone)]
pub enum CharEntry {
    Simple(String),
    Virtual(VirtualChar),
}

/// The name used for a stream edge (no neighboring token) when resolving
/// virtual characters, matching the in-tree boundary token.
pub const BOUNDARY_NAME: &str = "\u{0}";

/// Sentinel emitted for tokens with no usable mapping.
pub const UNMAPPED_SENTINEL: &str = "?";

#[derive(Debug, Clone, Default)]
pub struct Charset {
    pub name: String,
    entries: HashMap<String, CharEntry>,
    sequences: HashMap<String, Vec<String>>,
    swaps: HashMap<String, HashSet<String>>,
}

impl Charset {
    pub fn new(name: impl Into<String>) -> Self {
        Charset { name: name.into(), ..Default::default() }
    }

    pub fn insert_simple(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(name.into(), CharEntry::Simple(text.into()));
    }

    pub fn insert_virtual(&mut self, name: impl Into<String>, v: VirtualChar) {
        self.entries.insert(name.into(), CharEntry::Virtual(v));
    }

    pub fn insert_sequence(&mut self, name: impl Into<String>, members: Vec<String>) {
        self.sequences.insert(name.into(), members);
    }

    pub fn insert_swap(&mut self, a: impl Into<String>, b: impl Into<String>) {
        self.swaps.entry(a.into()).or_default().insert(b.into());
    }

    pub fn entry(&self, name: &str) -> Option<&CharEntry> {
        self.entries.get(name)
    }

    /// Expand sequence references in place. A [`Token::CharsetName`] whose
    /// name is a known sequence is replaced by its member tokens, in order;
    /// anything else passes through unchanged.
    fn expand_sequences(&self, tokens: &[Token]) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token {
                Token::CharsetName(name) => match self.sequences.get(name) {
                    Some(members) => out.extend(members.iter().cloned().map(Token::CharsetName)),
                    None => out.push(token.clone()),
                },
                Token::Literal(_) => out.push(token.clone()),
            }
        }
        out
    }

    /// Apply registered swaps left to right, single pass, non-overlapping:
    /// a `(a, b)` adjacent pair becomes `(b, a)` when `b` is registered as
    /// a swap partner of `a`.
    fn apply_swaps(&self, tokens: &[Token]) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            if i + 1 < tokens.len() {
                if let Some(partners) = self.swaps.get(tokens[i].as_str()) {
                    if partners.contains(tokens[i + 1].as_str()) {
                        out.push(tokens[i + 1].clone());
                        out.push(tokens[i].clone());
                        i += 2;
                        continue;
                    }
                }
            }
            out.push(tokens[i].clone());
            i += 1;
        }
        out
    }

    /// Resolve a token stream to final output text, expanding sequences and
    /// applying swaps first. Unmapped tokens become [`UNMAPPED_SENTINEL`]
    /// and push a [`Warning`] into `warnings`.
    pub fn resolve(&self, tokens: &[Token], warnings: &mut WarningSink) -> String {
        let expanded = self.expand_sequences(tokens);
        let swapped = self.apply_swaps(&expanded);
        let mut out = String::new();

        for (i, token) in swapped.iter().enumerate() {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::CharsetName(name) => match self.entries.get(name) {
                    Some(CharEntry::Simple(text)) => out.push_str(text),
                    Some(CharEntry::Virtual(v)) => {
                        let neighbor = if v.reversed {
                            swapped.get(i + 1).map(Token::as_str).unwrap_or(BOUNDARY_NAME)
                        } else if i == 0 {
                            BOUNDARY_NAME
                        } else {
                            swapped[i - 1].as_str()
                        };
                        match v.resolve(neighbor) {
                            Some(text) => out.push_str(text),
                            None => {
                                warnings.push(Warning::unmapped_token(name));
                                out.push_str(UNMAPPED_SENTINEL);
                            }
                        }
                    }
                    None => {
                        warnings.push(Warning::unmapped_token(name));
                        out.push_str(UNMAPPED_SENTINEL);
                    }
                },
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_entry_resolves_directly() {
        let mut cs = Charset::new("test");
        cs.insert_simple("t_tinco", "t");
        let mut warnings = WarningSink::default();
        let out = cs.resolve(&[Token::CharsetName("t_tinco".into())], &mut warnings);
        assert_eq!(out, "t");
        assert!(!warnings.truncated());
    }

    #[test]
    fn unknown_token_yields_sentinel_and_warning() {
        let cs = Charset::new("test");
        let mut warnings = WarningSink::new(4);
        let out = cs.resolve(&[Token::CharsetName("nope".into())], &mut warnings);
        assert_eq!(out, "?");
        assert_eq!(warnings.into_vec().len(), 1);
    }

    #[test]
    fn sequence_expands_before_resolution() {
        let mut cs = Charset::new("test");
        cs.insert_simple("a", "A");
        cs.insert_simple("b", "B");
        cs.insert_sequence("ab_seq", vec!["a".into(), "b".into()]);
        let mut warnings = WarningSink::default();
        let out = cs.resolve(&[Token::CharsetName("ab_seq".into())], &mut warnings);
        assert_eq!(out, "AB");
    }

    #[test]
    fn swap_reorders_adjacent_pair() {
        let mut cs = Charset::new("test");
        cs.insert_simple("a", "A");
        cs.insert_simple("b", "B");
        cs.insert_swap("a", "b");
        let mut warnings = WarningSink::default();
        let out = cs.resolve(&[Token::CharsetName("a".into()), Token::CharsetName("b".into())], &mut warnings);
        assert_eq!(out, "BA");
    }

    #[test]
    fn virtual_char_resolves_by_previous_neighbor() {
        let mut cs = Charset::new("test");
        cs.insert_simple("cons", "C");
        cs.insert_virtual(
            "tehta",
            VirtualChar {
                classes: vec![VirtualClass { triggers: ["cons".to_string()].into(), target: "over-cons".into() }],
                default: Some("standalone".into()),
                reversed: false,
            },
        );
        let mut warnings = WarningSink::default();
        let out = cs.resolve(
            &[Token::CharsetName("cons".into()), Token::CharsetName("tehta".into())],
            &mut warnings,
        );
        assert_eq!(out, "Cover-cons");
    }

    #[test]
    fn virtual_char_falls_back_to_default_at_boundary() {
        let mut cs = Charset::new("test");
        cs.insert_virtual(
            "tehta",
            VirtualChar {
                classes: vec![VirtualClass { triggers: ["cons".to_string()].into(), target: "over-cons".into() }],
                default: Some("standalone".into()),
                reversed: false,
            },
        );
        let mut warnings = WarningSink::default();
        let out = cs.resolve(&[Token::CharsetName("tehta".into())], &mut warnings);
        assert_eq!(out, "standalone");
    }
}
