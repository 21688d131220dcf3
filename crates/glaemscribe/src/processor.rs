//! Word splitting and longest-match trie traversal: turns preprocessed
//! input text into a token stream ready for [`crate::postprocessor`].

use crate::sheaf::Token;
use crate::trie::{NodeId, TranscriptionTrie};

/// The boundary character injected at the virtual start/end of every word
/// so rules anchored on an edge (via an explicit `{UNI_0}` source token)
/// can match it.
const BOUNDARY: char = '\u{0}';

/// Split preprocessed text into words on the user word-breaker `|` and on
/// whitespace, dropping empty spans from adjacent separators.
pub fn split_words(input: &str) -> Vec<&str> {
    input.split(|c: char| c == '|' || c.is_whitespace()).filter(|w| !w.is_empty()).collect()
}

/// Process an entire (preprocessed) line: each word is traversed
/// independently, and a single literal space token is emitted between
/// consecutive words.
pub fn process(trie: &TranscriptionTrie, input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    for (i, word) in split_words(input).into_iter().enumerate() {
        if i > 0 {
            out.push(Token::Literal(" ".to_string()));
        }
        out.extend(process_word(trie, word));
    }
    out
}

/// Longest-match, left-to-right traversal of one word, with the boundary
/// character injected at both ends.
pub fn process_word(trie: &TranscriptionTrie, word: &str) -> Vec<Token> {
    let mut chars: Vec<char> = Vec::with_capacity(word.chars().count() + 2);
    chars.push(BOUNDARY);
    chars.extend(word.chars());
    chars.push(BOUNDARY);

    let mut out = Vec::new();
    let mut cursor = 0usize;

    while cursor < chars.len() {
        let mut node = TranscriptionTrie::ROOT;
        let mut scan = cursor;
        let mut candidate: Option<(usize, NodeId)> = None;

        loop {
            match best_child_match(trie, node, &chars, scan) {
                Some((next_node, consumed)) => {
                    scan += consumed;
                    node = next_node;
                    if trie.node(node).effective {
                        candidate = Some((scan, node));
                    }
                    if scan >= chars.len() {
                        break;
                    }
                }
                None => break,
            }
        }

        match candidate {
            Some((end, node_id)) if end > cursor => {
                let node = trie.node(node_id);
                out.extend(apply_cross_schema(&node.replacement, node.cross_schema.as_deref()));
                cursor = end;
            }
            _ => {
                if chars[cursor] != BOUNDARY {
                    out.push(Token::Literal(chars[cursor].to_string()));
                }
                cursor += 1;
            }
        }
    }

    out
}

/// Reorder `replacement` by the validated 1-based permutation `schema`
/// (SPEC_FULL.md §4.7's "Cross-rule application"): output position `i`
/// takes the token at source position `schema[i] - 1`. Absent or
/// length-mismatched schemas (the latter can't happen once a rule has
/// compiled, since `schema` is validated against the chain's arity) leave
/// `replacement` untouched.
fn apply_cross_schema(replacement: &[Token], schema: Option<&[usize]>) -> Vec<Token> {
    match schema {
        Some(perm) if perm.len() == replacement.len() => {
            perm.iter().map(|&i| replacement[i - 1].clone()).collect()
        }
        _ => replacement.to_vec(),
    }
}

/// Among `node`'s children, find the longest one whose token text matches
/// the input at `scan`, breaking ties lexicographically for determinism.
fn best_child_match(trie: &TranscriptionTrie, node: NodeId, chars: &[char], scan: usize) -> Option<(NodeId, usize)> {
    let mut children: Vec<(&Token, NodeId)> = trie.children_sorted(node).collect();
    children.sort_by(|a, b| {
        let len_a = a.0.as_str().chars().count();
        let len_b = b.0.as_str().chars().count();
        len_b.cmp(&len_a).then_with(|| a.0.cmp(b.0))
    });

    for (token, child_id) in children {
        let token_chars: Vec<char> = token.as_str().chars().collect();
        let len = token_chars.len();
        if len > 0 && scan + len <= chars.len() && chars[scan..scan + len] == token_chars[..] {
            return Some((child_id, len));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_group::SubRule;

    fn sub(line: u32, src: &str, dst: &str) -> SubRule {
        SubRule {
            line,
            src: src.chars().map(|c| Token::Literal(c.to_string())).collect(),
            dst: vec![Token::Literal(dst.to_string())],
            cross_schema: None,
        }
    }

    #[test]
    fn longest_match_wins_over_shorter_prefix() {
        let rules = vec![sub(1, "a", "A"), sub(2, "ab", "X")];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let out = process_word(&trie, "ab");
        assert_eq!(out, vec![Token::Literal("X".into())]);
    }

    #[test]
    fn cross_schema_permutation_reorders_replacement_at_emission_time() {
        // dst is the identity ordering (not pre-swapped by hand); only the
        // runtime permutation should produce the swapped output.
        let rules = vec![SubRule {
            line: 1,
            src: vec![Token::Literal("a".into()), Token::Literal("b".into())],
            dst: vec![Token::Literal("a".into()), Token::Literal("b".into())],
            cross_schema: Some(vec![2, 1]),
        }];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let out = process_word(&trie, "ab");
        assert_eq!(out, vec![Token::Literal("b".into()), Token::Literal("a".into())]);
    }

    #[test]
    fn absent_cross_schema_leaves_replacement_in_declared_order() {
        let rules = vec![SubRule {
            line: 1,
            src: vec![Token::Literal("a".into()), Token::Literal("b".into())],
            dst: vec![Token::Literal("a".into()), Token::Literal("b".into())],
            cross_schema: None,
        }];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let out = process_word(&trie, "ab");
        assert_eq!(out, vec![Token::Literal("a".into()), Token::Literal("b".into())]);
    }

    #[test]
    fn unmatched_character_is_emitted_raw() {
        let rules = vec![sub(1, "a", "A")];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let out = process_word(&trie, "az");
        assert_eq!(out, vec![Token::Literal("A".into()), Token::Literal("z".into())]);
    }

    #[test]
    fn words_are_separated_by_a_literal_space() {
        let rules = vec![sub(1, "a", "A")];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let out = process(&trie, "a|a");
        assert_eq!(out, vec![Token::Literal("A".into()), Token::Literal(" ".into()), Token::Literal("A".into())]);
    }

    #[test]
    fn boundary_token_can_be_matched_explicitly() {
        let rules = vec![SubRule {
            line: 1,
            src: vec![Token::Literal(BOUNDARY.to_string()), Token::Literal("a".into())],
            dst: vec![Token::Literal("INITIAL-A".into())],
            cross_schema: None,
        }];
        let trie = TranscriptionTrie::build(rules.iter()).unwrap();
        let out = process_word(&trie, "a");
        assert_eq!(out, vec![Token::Literal("INITIAL-A".into())]);
    }
}
