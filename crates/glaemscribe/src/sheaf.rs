//! Sheaf chains: the parsed shape of one side of a rule.
//!
//! A rule's source or destination text (after [`crate::resolver::apply_vars`]
//! has expanded plain variables) is parsed into a [`SheafChain`]: an ordered
//! sequence of *sheaves*, each occupying one position in the eventual token
//! combination. A sheaf is either:
//!
//! - a single literal/charset-name fragment with no alternation (arity 1),
//! - a bracketed alternation `[a/b/c]` of literal/charset-name fragments
//!   (arity N — a Cartesian factor, see [`crate::sheaf_iter`]), or
//! - a pointer-variable reference `{NAME}`, carrying all of that variable's
//!   alternatives tied to a shared cohort so that same-named references
//!   across the source and destination sides advance in lockstep.
//!
//! Plain (unbracketed) literal text decomposes into one single-fragment
//! sheaf per Unicode scalar value, since each trie edge consumes one token;
//! `[nn]` groups a multi-character literal into a single token explicitly.

use crate::error::ModeError;
use crate::resolver::VarTable;

/// One token produced by selecting a fragment: either literal input/output
/// text, or the name of a charset entry to look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(String),
    CharsetName(String),
}

impl Token {
    pub fn as_str(&self) -> &str {
        match self {
            Token::Literal(s) => s,
            Token::CharsetName(s) => s,
        }
    }
}

/// Ordered by underlying text, not by variant, so trie siblings enumerate
/// in a stable, input-meaningful order regardless of token kind.
impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// An identifier shared by every sheaf referencing the same pointer
/// variable. Equality by variable name is exactly what makes source-side
/// and destination-side occurrences of `{NAME}` advance together.
pub type CohortId = String;

/// One candidate value a sheaf may contribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Literal(String),
    CharsetRef(String),
}

impl Fragment {
    fn into_token(self) -> Token {
        match self {
            Fragment::Literal(s) => Token::Literal(s),
            Fragment::CharsetRef(s) => Token::CharsetName(s),
        }
    }
}

/// One position in a sheaf chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sheaf {
    /// Zero or more alternative plain fragments (arity = `alternatives.len()`).
    /// Arity 1 is the common case of an unbracketed literal/charset token.
    Alternatives(Vec<Fragment>),
    /// A pointer-variable reference: exactly one token is selected per
    /// cohort step, shared with every other sheaf of the same cohort.
    Pointer { cohort: CohortId, alternatives: Vec<Fragment> },
}

impl Sheaf {
    pub fn arity(&self) -> usize {
        match self {
            Sheaf::Alternatives(frags) => frags.len(),
            Sheaf::Pointer { .. } => 1,
        }
    }

    pub fn cohort(&self) -> Option<&CohortId> {
        match self {
            Sheaf::Pointer { cohort, .. } => Some(cohort),
            Sheaf::Alternatives(_) => None,
        }
    }
}

/// A rule side, fully parsed: an ordered sequence of sheaves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheafChain {
    pub sheaves: Vec<Sheaf>,
}

/// The structural shape of a chain, compared between a rule's source and
/// destination sides: same length, same per-position arity, same per-position
/// pointer cohort identity (or lack of one).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prototype(pub Vec<(usize, Option<CohortId>)>);

impl SheafChain {
    pub fn prototype(&self) -> Prototype {
        Prototype(self.sheaves.iter().map(|s| (s.arity(), s.cohort().cloned())).collect())
    }
}

/// Parse one rule side into a [`SheafChain`].
///
/// `string` should already have had non-pointer variables substituted by
/// [`crate::resolver::apply_vars`]; any `{NAME}` still present here must
/// name a pointer variable in `vars`.
pub fn parse_chain(vars: &VarTable, line: u32, string: &str) -> Result<SheafChain, Vec<ModeError>> {
    let mut sheaves = Vec::new();
    let mut errors = Vec::new();
    let chars: Vec<char> = string.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '[' => {
                let Some(close) = find_matching(&chars, i, '[', ']') else {
                    errors.push(ModeError::compile(line, format!("unterminated '[' in: {string}")));
                    break;
                };
                let inner: String = chars[i + 1..close].iter().collect();
                match parse_alternatives(&inner) {
                    Ok(frags) if !frags.is_empty() => sheaves.push(Sheaf::Alternatives(frags)),
                    Ok(_) => errors.push(ModeError::compile(line, "empty sheaf '[]' in rule side")),
                    Err(e) => errors.push(ModeError::compile(line, e)),
                }
                i = close + 1;
            }
            '{' => {
                let Some(close) = find_matching(&chars, i, '{', '}') else {
                    errors.push(ModeError::compile(line, format!("unterminated '{{' in: {string}")));
                    break;
                };
                let name: String = chars[i + 1..close].iter().collect();
                match vars.get(&name) {
                    Some(var) if var.is_pointer => {
                        match parse_alternatives(&var.value) {
                            Ok(alts) if !alts.is_empty() => {
                                sheaves.push(Sheaf::Pointer { cohort: name.clone(), alternatives: alts })
                            }
                            Ok(_) => errors.push(ModeError::compile(
                                line,
                                format!("pointer variable {{{name}}} has no alternatives"),
                            )),
                            Err(e) => errors.push(ModeError::compile(line, e)),
                        }
                    }
                    Some(_) => errors.push(ModeError::compile(
                        line,
                        format!("{{{name}}} should have been substituted before sheaf parsing (not a pointer variable)"),
                    )),
                    None => errors.push(ModeError::compile(line, format!("unresolved variable reference: {{{name}}}"))),
                }
                i = close + 1;
            }
            ch => {
                sheaves.push(Sheaf::Alternatives(vec![classify_fragment(&ch.to_string())]));
                i += 1;
            }
        }
    }

    if errors.is_empty() {
        Ok(SheafChain { sheaves })
    } else {
        Err(errors)
    }
}

fn find_matching(chars: &[char], open_pos: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    for (offset, &c) in chars[open_pos..].iter().enumerate() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_pos + offset);
            }
        }
    }
    None
}

fn parse_alternatives(inner: &str) -> Result<Vec<Fragment>, String> {
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    let mut frags = Vec::new();
    for part in inner.split('/') {
        if part.is_empty() {
            return Err(format!("empty alternative in sheaf: [{inner}]"));
        }
        frags.push(classify_fragment(part));
    }
    Ok(frags)
}

/// The in-language boundary token: a bare, unquoted `_` in rule-side text
/// stands for a word edge and is translated here to the same internal tree
/// boundary marker [`crate::processor`] injects at the start/end of every
/// word, so a rule like `_t --> X` matches word-initial `t`. Quoting it
/// (`'_'`) still yields a literal underscore character.
pub const BOUNDARY_MARKER: &str = "\u{0}";

/// Decide whether a raw fragment string names a charset entry or is literal
/// text. `'...'` always forces a literal; `$name` always forces a charset
/// reference; a bare `_` is the in-language word-boundary token; otherwise
/// an identifier-shaped token containing an underscore is taken to be a
/// charset name, matching the `category_name` mnemonic convention charsets
/// use (`t_tinco`, `v_a`, `p_andaith`) — a plain underscore-less span,
/// including ordinary multi-letter digraphs like `th` or `ng`, stays
/// literal text.
fn classify_fragment(raw: &str) -> Fragment {
    if let Some(stripped) = raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        return Fragment::Literal(stripped.to_string());
    }
    if let Some(name) = raw.strip_prefix('$') {
        return Fragment::CharsetRef(name.to_string());
    }
    if raw == "_" {
        return Fragment::Literal(BOUNDARY_MARKER.to_string());
    }
    let is_identifier_shaped = raw.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_identifier_shaped && raw.contains('_') {
        Fragment::CharsetRef(raw.to_string())
    } else {
        Fragment::Literal(raw.to_string())
    }
}

pub(crate) fn fragment_into_token(f: Fragment) -> Token {
    f.into_token()
}
