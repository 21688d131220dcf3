//! Variable/expression resolution: `{NAME}` and `{UNI_hhhh}` substitution.
//!
//! A rule group's variable table holds both plain and *pointer* variables
//! (see [`RuleGroupVar`]). Plain variables are substituted eagerly and
//! repeatedly until a pass makes no further changes or [`MAX_PASSES`] is
//! exceeded (a cycle). Pointer variables are left untouched here — they are
//! resolved structurally by [`crate::sheaf`] during sheaf-chain construction,
//! since each occurrence needs to become a distinct [`crate::sheaf::Fragment`]
//! tied to a cohort rather than inline text.

use crate::error::ModeError;
use std::collections::HashMap;

/// The maximum number of substitution passes before a variable reference is
/// considered cyclic (SPEC_FULL.md §3 invariant).
pub const MAX_PASSES: u32 = 32;

/// A single rule-group variable: `{NAME} === value` (plain) or
/// `{NAME} <=> alt/alt/alt` (pointer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGroupVar {
    pub name: String,
    pub value: String,
    pub is_pointer: bool,
}

impl RuleGroupVar {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        RuleGroupVar { name: name.into(), value: value.into(), is_pointer: false }
    }

    pub fn pointer(name: impl Into<String>, value: impl Into<String>) -> Self {
        RuleGroupVar { name: name.into(), value: value.into(), is_pointer: true }
    }
}

/// A rule group's variable table, keyed by name without braces.
#[derive(Debug, Clone, Default)]
pub struct VarTable(HashMap<String, RuleGroupVar>);

impl VarTable {
    pub fn new() -> Self {
        VarTable(HashMap::new())
    }

    /// Insert a variable, returning the previous one if this name was
    /// already bound (callers treat this as a redefinition concern where
    /// applicable — the table itself is agnostic about that policy).
    pub fn insert(&mut self, var: RuleGroupVar) -> Option<RuleGroupVar> {
        self.0.insert(var.name.clone(), var)
    }

    pub fn get(&self, name: &str) -> Option<&RuleGroupVar> {
        self.0.get(name)
    }

    pub fn is_pointer(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|v| v.is_pointer)
    }
}

/// Result of one `apply_vars` call: the (possibly still error-laden) output
/// string plus any diagnostics raised along the way.
pub struct Resolved {
    pub text: String,
    pub errors: Vec<ModeError>,
}

/// Repeatedly substitute `{NAME}` references in `string` until stable.
///
/// Pointer-variable references are left as-is (deferred to sheaf
/// construction). Unicode escapes `{UNI_hhhh}` are substituted to their
/// code point only when `allow_unicode` is true; otherwise a
/// [`ModeError::resolution`] is raised and the placeholder is left in
/// place so the caller can still see where it was.
pub fn apply_vars(vars: &VarTable, line: u32, string: &str, allow_unicode: bool) -> Resolved {
    let mut errors = Vec::new();
    let mut current = string.to_string();

    for _pass in 0..MAX_PASSES {
        let (next, changed) = substitute_pass(vars, line, &current, allow_unicode, &mut errors);
        current = next;
        if !changed {
            return Resolved { text: current, errors };
        }
    }

    errors.push(ModeError::resolution(
        line,
        format!("variable expansion did not terminate within {MAX_PASSES} passes (cycle?) in expression: {string}"),
    ));
    Resolved { text: current, errors }
}

fn substitute_pass(
    vars: &VarTable,
    line: u32,
    input: &str,
    allow_unicode: bool,
    errors: &mut Vec<ModeError>,
) -> (String, bool) {
    let mut out = String::with_capacity(input.len());
    let mut changed = false;
    let bytes = input.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = input[i..].find('}') {
                let end = i + end;
                let name = &input[i + 1..end];
                let whole = &input[i..=end];

                if is_valid_name(name) {
                    if let Some(hex) = name.strip_prefix("UNI_") {
                        if is_hex(hex) {
                            if allow_unicode {
                                match parse_unicode_escape(hex) {
                                    Some(ch) => {
                                        out.push(ch);
                                        changed = true;
                                    }
                                    None => {
                                        errors.push(ModeError::resolution(
                                            line,
                                            format!(
                                                "unicode escape out of range: {whole} (must be <= 10FFFF)"
                                            ),
                                        ));
                                        out.push_str(whole);
                                    }
                                }
                            } else {
                                errors.push(ModeError::resolution(
                                    line,
                                    format!(
                                        "In expression: {input}: making wrong use of unicode variable: {whole}. \
                                         Unicode vars can only be used in source members of a rule or in the \
                                         definition of another variable."
                                    ),
                                ));
                                out.push_str(whole);
                            }
                            i = end + 1;
                            continue;
                        }
                    }

                    match vars.get(name) {
                        Some(var) if var.is_pointer => {
                            // Deferred to sheaf construction; leave untouched.
                            out.push_str(whole);
                        }
                        Some(var) => {
                            out.push_str(&var.value);
                            changed = true;
                        }
                        None => {
                            errors.push(ModeError::resolution(
                                line,
                                format!("In expression: {input}: failed to evaluate variable: {whole}."),
                            ));
                            out.push_str(whole);
                        }
                    }
                    i = end + 1;
                    continue;
                }
            }
        }

        // Not the start of a recognized `{...}` token: copy one char verbatim.
        let ch = input[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }

    (out, changed)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.len() <= 6 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_unicode_escape(hex: &str) -> Option<char> {
    let code = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_plain_variable() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::plain("A", "xyz"));
        let r = apply_vars(&vars, 1, "{A}", false);
        assert!(r.errors.is_empty());
        assert_eq!(r.text, "xyz");
    }

    #[test]
    fn substitutes_nested_variables_across_passes() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::plain("A", "{B}{B}"));
        vars.insert(RuleGroupVar::plain("B", "x"));
        let r = apply_vars(&vars, 1, "{A}", false);
        assert!(r.errors.is_empty());
        assert_eq!(r.text, "xx");
    }

    #[test]
    fn leaves_pointer_variables_untouched() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::pointer("P", "a/b/c"));
        let r = apply_vars(&vars, 1, "{P}", false);
        assert!(r.errors.is_empty());
        assert_eq!(r.text, "{P}");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let vars = VarTable::new();
        let r = apply_vars(&vars, 1, "{NOPE}", false);
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.text, "{NOPE}");
    }

    #[test]
    fn unicode_escape_resolves_when_allowed() {
        let vars = VarTable::new();
        let r = apply_vars(&vars, 1, "{UNI_41}", true);
        assert!(r.errors.is_empty());
        assert_eq!(r.text, "A");
    }

    #[test]
    fn unicode_escape_errors_when_disallowed() {
        let vars = VarTable::new();
        let r = apply_vars(&vars, 1, "{UNI_41}", false);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn unicode_escape_out_of_range_errors() {
        let vars = VarTable::new();
        let r = apply_vars(&vars, 1, "{UNI_110000}", true);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn cyclic_variable_is_reported_and_bounded() {
        let mut vars = VarTable::new();
        vars.insert(RuleGroupVar::plain("A", "{B}"));
        vars.insert(RuleGroupVar::plain("B", "{A}"));
        let r = apply_vars(&vars, 1, "{A}", false);
        assert_eq!(r.errors.len(), 1);
    }
}
