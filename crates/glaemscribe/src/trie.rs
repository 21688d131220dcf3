//! The transcription trie: a prefix tree over source tokens, built from
//! every enabled rule group's sub-rules.
//!
//! Nodes live in a flat arena (`Vec<TrieNode>`) indexed by [`NodeId`] rather
//! than behind owned references, so a node can cheaply hold its parent's
//! index without fighting the borrow checker (see SPEC_FULL.md §9's note on
//! arena-style storage for cyclic/back-referential structures).

use crate::error::ModeError;
use crate::rule_group::SubRule;
use crate::sheaf::Token;
use std::collections::BTreeMap;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct TrieNode {
    pub parent: Option<NodeId>,
    pub incoming: Option<Token>,
    pub children: BTreeMap<Token, NodeId>,
    pub effective: bool,
    pub replacement: Vec<Token>,
    pub cross_schema: Option<Vec<usize>>,
    pub defined_at_line: u32,
}

impl TrieNode {
    fn root() -> Self {
        TrieNode {
            parent: None,
            incoming: None,
            children: BTreeMap::new(),
            effective: false,
            replacement: Vec::new(),
            cross_schema: None,
            defined_at_line: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionTrie {
    nodes: Vec<TrieNode>,
}

impl TranscriptionTrie {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        TranscriptionTrie { nodes: vec![TrieNode::root()] }
    }

    /// Build a trie from every sub-rule, in order, across `groups`.
    ///
    /// Two sub-rules from *different* rule groups may legitimately share a
    /// source sequence — spec.md's duplicate invariant is scoped to sub-rules
    /// within the same rule group, and
    /// [`rule_group::check_duplicates`](crate::rule_group) is what enforces
    /// it there. When that happens here, the earlier-inserted one (i.e. the
    /// earlier rule group in document declaration order) wins; see
    /// `insert`'s doc comment.
    pub fn build<'a>(sub_rules: impl Iterator<Item = &'a SubRule>) -> Result<Self, ModeError> {
        let mut trie = TranscriptionTrie::new();
        for sub_rule in sub_rules {
            trie.insert(sub_rule)?;
        }
        Ok(trie)
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id]
    }

    pub fn child(&self, id: NodeId, token: &Token) -> Option<NodeId> {
        self.nodes[id].children.get(token).copied()
    }

    /// Children of `id` in deterministic (sorted-by-token) order.
    pub fn children_sorted(&self, id: NodeId) -> impl Iterator<Item = (&Token, NodeId)> {
        self.nodes[id].children.iter().map(|(t, &n)| (t, n))
    }

    fn insert(&mut self, sub_rule: &SubRule) -> Result<(), ModeError> {
        let mut current = Self::ROOT;
        for token in &sub_rule.src {
            current = match self.nodes[current].children.get(token) {
                Some(&next) => next,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(TrieNode {
                        parent: Some(current),
                        incoming: Some(token.clone()),
                        children: BTreeMap::new(),
                        effective: false,
                        replacement: Vec::new(),
                        cross_schema: None,
                        defined_at_line: sub_rule.line,
                    });
                    self.nodes[current].children.insert(token.clone(), id);
                    id
                }
            };
        }

        let node = &mut self.nodes[current];
        if node.effective {
            // The earlier-inserted sub-rule wins the same source sequence,
            // whether or not its replacement agrees with this one. A
            // same-rule-group conflict was already rejected by
            // `rule_group::check_duplicates` before sub-rules ever reach the
            // trie; a conflict across rule groups is the documented
            // declaration-order precedence contract (DESIGN.md), not an
            // error.
            return Ok(());
        }
        node.effective = true;
        node.replacement = sub_rule.dst.clone();
        node.cross_schema = sub_rule.cross_schema.clone();
        node.defined_at_line = sub_rule.line;
        Ok(())
    }
}

impl Default for TranscriptionTrie {
    fn default() -> Self {
        TranscriptionTrie::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(line: u32, src: &[&str], dst: &[&str]) -> SubRule {
        SubRule {
            line,
            src: src.iter().map(|s| Token::Literal(s.to_string())).collect(),
            dst: dst.iter().map(|s| Token::Literal(s.to_string())).collect(),
            cross_schema: None,
        }
    }

    #[test]
    fn builds_shared_prefix_paths() {
        let rules = vec![sub(1, &["a"], &["A"]), sub(2, &["a", "b"], &["X"])];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();

        let a = trie.child(TranscriptionTrie::ROOT, &Token::Literal("a".into())).unwrap();
        assert!(trie.node(a).effective);
        assert_eq!(trie.node(a).replacement, vec![Token::Literal("A".into())]);

        let ab = trie.child(a, &Token::Literal("b".into())).unwrap();
        assert!(trie.node(ab).effective);
        assert_eq!(trie.node(ab).replacement, vec![Token::Literal("X".into())]);
    }

    #[test]
    fn earlier_insertion_wins_on_conflicting_replacement_across_rule_groups() {
        let rules = vec![sub(1, &["a"], &["A"]), sub(2, &["a"], &["B"])];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let a = trie.child(TranscriptionTrie::ROOT, &Token::Literal("a".into())).unwrap();
        assert_eq!(trie.node(a).replacement, vec![Token::Literal("A".into())]);
        assert_eq!(trie.node(a).defined_at_line, 1);
    }

    #[test]
    fn identical_replacement_on_same_source_is_not_rejected() {
        let rules = vec![sub(1, &["a"], &["A"]), sub(2, &["a"], &["A"])];
        assert!(TranscriptionTrie::build(rules.iter()).is_ok());
    }

    #[test]
    fn children_are_sorted_by_token() {
        let rules = vec![sub(1, &["b"], &["B"]), sub(2, &["a"], &["A"])];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let order: Vec<_> = trie.children_sorted(TranscriptionTrie::ROOT).map(|(t, _)| t.as_str().to_string()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }
}
