//! Compiles one `rules <name>` document element into a flat set of
//! [`SubRule`]s.
//!
//! This walks the element's children top to bottom, eagerly resolving
//! `if`/`elsif`/`else`/`endif` conditionals against the transcription
//! options in effect and expanding `deploy` macro calls, down to a flat
//! ordered list of raw lines. Each line is then either a variable
//! declaration (`{NAME} === value` / `{NAME} <=> alt/alt/alt`) or a rule
//! (`SRC --> DST` / `SRC --> SCHEMA --> DST`), compiled via
//! [`crate::sheaf`] and [`crate::sheaf_iter`].

use crate::error::ModeError;
use crate::glaem::Node;
use crate::resolver::{apply_vars, RuleGroupVar, VarTable};
use crate::sheaf::{self, Token};
use crate::sheaf_iter::SheafChainIterator;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SubRule {
    pub line: u32,
    pub src: Vec<Token>,
    pub dst: Vec<Token>,
    pub cross_schema: Option<Vec<usize>>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub line: u32,
    pub cross_schema: Option<Vec<usize>>,
    pub sub_rules: Vec<SubRule>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleGroup {
    pub name: String,
    pub vars: VarTable,
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    /// Every sub-rule across every rule, in enumeration order.
    pub fn sub_rules(&self) -> impl Iterator<Item = &SubRule> {
        self.rules.iter().flat_map(|r| r.sub_rules.iter())
    }
}

#[derive(Debug, Clone)]
struct MacroDef {
    params: Vec<String>,
    body: Vec<Node>,
}

/// Compile a `rules <name>` element into a [`RuleGroup`].
///
/// `options` is the resolved set of `name -> value` transcription options
/// used to evaluate `if`/`elsif` conditions.
pub fn finalize(rules_node: &Node, options: &HashMap<String, String>) -> Result<RuleGroup, Vec<ModeError>> {
    let name = rules_node.args.first().cloned().unwrap_or_default();
    let mut errors = Vec::new();
    let mut macros: HashMap<String, MacroDef> = HashMap::new();

    let lines = flatten(&rules_node.children, options, &mut macros, &mut errors);

    let mut vars = VarTable::new();
    let mut rules = Vec::new();

    for (line, text) in &lines {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((var_name, rest)) = split_brace_prefix(trimmed) {
            if let Some(value) = rest.trim_start().strip_prefix("===") {
                vars.insert(RuleGroupVar::plain(var_name, value.trim().to_string()));
                continue;
            }
            if let Some(value) = rest.trim_start().strip_prefix("<=>") {
                vars.insert(RuleGroupVar::pointer(var_name, value.trim().to_string()));
                continue;
            }
        }

        match compile_rule_line(&vars, *line, trimmed) {
            Ok(rule) => rules.push(rule),
            Err(mut e) => errors.append(&mut e),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let group = RuleGroup { name, vars, rules };
    if let Err(mut dup_errors) = check_duplicates(&group) {
        errors.append(&mut dup_errors);
        return Err(errors);
    }

    Ok(group)
}

/// Split a leading `{NAME}` off of `s`, returning `(NAME, rest)`. Returns
/// `None` if `s` doesn't start with a brace-enclosed all-caps name.
fn split_brace_prefix(s: &str) -> Option<(String, &str)> {
    let rest = s.strip_prefix('{')?;
    let close = rest.find('}')?;
    let name = &rest[..close];
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        Some((name.to_string(), &rest[close + 1..]))
    } else {
        None
    }
}

fn compile_rule_line(vars: &VarTable, line: u32, text: &str) -> Result<Rule, Vec<ModeError>> {
    let parts: Vec<&str> = text.split("-->").map(str::trim).collect();
    let (src_text, schema_text, dst_text) = match parts.as_slice() {
        [src, dst] => (*src, None, *dst),
        [src, schema, dst] => (*src, Some(*schema), *dst),
        _ => {
            return Err(vec![ModeError::compile(
                line,
                format!("rule line must have the form 'SRC --> DST' or 'SRC --> SCHEMA --> DST': {text}"),
            )])
        }
    };

    let mut errors = Vec::new();

    let src_resolved = apply_vars(vars, line, src_text, true);
    errors.extend(src_resolved.errors);
    let dst_resolved = apply_vars(vars, line, dst_text, false);
    errors.extend(dst_resolved.errors);

    let src_chain = match sheaf::parse_chain(vars, line, &src_resolved.text) {
        Ok(c) => Some(c),
        Err(mut e) => {
            errors.append(&mut e);
            None
        }
    };
    let dst_chain = match sheaf::parse_chain(vars, line, &dst_resolved.text) {
        Ok(c) => Some(c),
        Err(mut e) => {
            errors.append(&mut e);
            None
        }
    };

    let (Some(src_chain), Some(dst_chain)) = (src_chain, dst_chain) else {
        return Err(errors);
    };

    if src_chain.sheaves.is_empty() {
        errors.push(ModeError::compile(line, format!("rule source must not be empty: {text}")));
    }

    if src_chain.prototype() != dst_chain.prototype() {
        errors.push(ModeError::compile(
            line,
            format!("source and destination have different shapes: {text}"),
        ));
    }

    let cross_schema = match schema_text {
        None => None,
        Some(raw) => {
            let resolved = apply_vars(vars, line, raw, false);
            errors.extend(resolved.errors);
            match parse_cross_schema(resolved.text.trim(), src_chain.sheaves.len(), line) {
                Ok(schema) => schema,
                Err(e) => {
                    errors.push(e);
                    None
                }
            }
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let src_iter = SheafChainIterator::new(&src_chain, line);
    let dst_iter = SheafChainIterator::new(&dst_chain, line);
    let (mut src_iter, mut dst_iter) = match (src_iter, dst_iter) {
        (Ok(s), Ok(d)) => (s, d),
        (Err(e), _) | (_, Err(e)) => return Err(vec![e]),
    };

    if src_iter.cardinality() != dst_iter.cardinality() {
        return Err(vec![ModeError::compile(
            line,
            "pointer cohort cardinality mismatch between source and destination",
        )]);
    }

    let mut sub_rules = Vec::new();
    loop {
        let src_combos = src_iter.combinations();
        let dst_combo = dst_iter.combinations().into_iter().next().unwrap_or_default();
        for src_combo in src_combos {
            sub_rules.push(SubRule {
                line,
                src: src_combo,
                dst: dst_combo.clone(),
                cross_schema: cross_schema.clone(),
            });
        }
        let src_more = src_iter.advance();
        let dst_more = dst_iter.advance();
        if src_more != dst_more {
            return Err(vec![ModeError::compile(
                line,
                "pointer cohort iteration desynchronized between source and destination",
            )]);
        }
        if !src_more {
            break;
        }
    }

    Ok(Rule { line, cross_schema, sub_rules })
}

fn parse_cross_schema(text: &str, src_len: usize, line: u32) -> Result<Option<Vec<usize>>, ModeError> {
    if text == "identity" {
        return Ok(None);
    }
    let mut indices = Vec::new();
    for part in text.split(',') {
        let n: usize = part.trim().parse().map_err(|_| {
            ModeError::compile(line, format!("cross-schema '{text}' is not a comma-separated list of indices"))
        })?;
        indices.push(n);
    }
    if indices.len() != src_len {
        return Err(ModeError::compile(
            line,
            format!("cross-schema '{text}' has {} entries, expected {src_len}", indices.len()),
        ));
    }
    let mut sorted = indices.clone();
    sorted.sort_unstable();
    let is_bijection = sorted.iter().enumerate().all(|(i, &v)| v == i + 1);
    if !is_bijection {
        return Err(ModeError::compile(
            line,
            format!("cross-schema '{text}' is not a permutation of 1..{src_len}"),
        ));
    }
    Ok(Some(indices))
}

fn check_duplicates(group: &RuleGroup) -> Result<(), Vec<ModeError>> {
    let mut seen: HashMap<(Vec<Token>, Option<Vec<usize>>), u32> = HashMap::new();
    for sub_rule in group.sub_rules() {
        let key = (sub_rule.src.clone(), sub_rule.cross_schema.clone());
        if let Some(&first_line) = seen.get(&key) {
            return Err(vec![ModeError::compile(
                sub_rule.line,
                format!(
                    "duplicate source combination also defined on line {first_line} (rule group '{}')",
                    group.name
                ),
            )]);
        }
        seen.insert(key, sub_rule.line);
    }
    Ok(())
}

/// Flatten a sequence of document-tree children into raw rule/var-decl
/// lines, resolving conditionals and macro deploys along the way.
fn flatten(
    nodes: &[Node],
    options: &HashMap<String, String>,
    macros: &mut HashMap<String, MacroDef>,
    errors: &mut Vec<ModeError>,
) -> Vec<(u32, String)> {
    let mut pos = 0usize;
    flatten_from(nodes, &mut pos, options, macros, errors)
}

fn flatten_from(
    nodes: &[Node],
    pos: &mut usize,
    options: &HashMap<String, String>,
    macros: &mut HashMap<String, MacroDef>,
    errors: &mut Vec<ModeError>,
) -> Vec<(u32, String)> {
    let mut out = Vec::new();

    while *pos < nodes.len() {
        let node = &nodes[*pos];

        if node.is_text {
            out.push((node.line, node.text_content().to_string()));
            *pos += 1;
            continue;
        }

        match node.name.as_str() {
            "elsif" | "else" | "endif" => break,
            "if" => {
                out.extend(flatten_if_chain(nodes, pos, options, macros, errors));
            }
            "macro" => {
                let macro_name = node.args.first().cloned().unwrap_or_default();
                let params = node.args.get(1..).map(<[_]>::to_vec).unwrap_or_default();
                if macros.contains_key(&macro_name) {
                    errors.push(ModeError::compile(node.line, format!("macro '{macro_name}' redefined")));
                } else {
                    macros.insert(macro_name, MacroDef { params, body: node.children.clone() });
                }
                *pos += 1;
            }
            "deploy" => {
                let macro_name = node.args.first().cloned().unwrap_or_default();
                let args = node.args.get(1..).map(<[_]>::to_vec).unwrap_or_default();
                out.extend(deploy_macro(&macro_name, &args, node.line, macros, options, errors));
                *pos += 1;
            }
            other => {
                errors.push(ModeError::compile(node.line, format!("unexpected '{other}' inside rule group body")));
                *pos += 1;
            }
        }
    }

    out
}

fn flatten_if_chain(
    nodes: &[Node],
    pos: &mut usize,
    options: &HashMap<String, String>,
    macros: &mut HashMap<String, MacroDef>,
    errors: &mut Vec<ModeError>,
) -> Vec<(u32, String)> {
    let if_line = nodes[*pos].line;
    let mut winner: Option<Vec<(u32, String)>> = None;

    let cond = nodes[*pos].args.join(" ");
    *pos += 1;
    let branch = flatten_from(nodes, pos, options, macros, errors);
    if eval_condition(&cond, options, if_line, errors) {
        winner = Some(branch);
    }

    loop {
        if *pos >= nodes.len() {
            errors.push(ModeError::compile(if_line, "'if' without a matching 'endif'"));
            break;
        }
        let node = &nodes[*pos];
        match node.name.as_str() {
            "elsif" => {
                let cond = node.args.join(" ");
                let node_line = node.line;
                *pos += 1;
                let branch = flatten_from(nodes, pos, options, macros, errors);
                if winner.is_none() && eval_condition(&cond, options, node_line, errors) {
                    winner = Some(branch);
                }
            }
            "else" => {
                *pos += 1;
                let branch = flatten_from(nodes, pos, options, macros, errors);
                if winner.is_none() {
                    winner = Some(branch);
                }
            }
            "endif" => {
                *pos += 1;
                break;
            }
            other => {
                errors.push(ModeError::compile(node.line, format!("expected 'elsif', 'else' or 'endif', found '{other}'")));
                *pos += 1;
            }
        }
    }

    winner.unwrap_or_default()
}

/// Evaluate a boolean condition over `&` (AND), `|` (OR, lower precedence
/// than `&`), and `!` (NOT) of terms that are `true`, `false`, a bare
/// option name (true iff present and non-empty/non-"false"), or
/// `NAME=VALUE` (equality against the option's value).
fn eval_condition(expr: &str, options: &HashMap<String, String>, line: u32, errors: &mut Vec<ModeError>) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        errors.push(ModeError::compile(line, "empty condition"));
        return false;
    }
    expr.split('|').any(|and_clause| {
        and_clause.split('&').all(|raw_term| eval_term(raw_term.trim(), options))
    })
}

fn eval_term(term: &str, options: &HashMap<String, String>) -> bool {
    let (negate, term) = match term.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, term),
    };
    let value = match term.split_once('=') {
        Some((name, expected)) => options.get(name.trim()).is_some_and(|v| v == expected.trim()),
        None => match term {
            "true" => true,
            "false" => false,
            name => options.get(name).is_some_and(|v| v != "false" && !v.is_empty()),
        },
    };
    value != negate
}

fn deploy_macro(
    name: &str,
    args: &[String],
    line: u32,
    macros: &HashMap<String, MacroDef>,
    options: &HashMap<String, String>,
    errors: &mut Vec<ModeError>,
) -> Vec<(u32, String)> {
    let Some(def) = macros.get(name) else {
        errors.push(ModeError::compile(line, format!("deploy of undefined macro '{name}'")));
        return Vec::new();
    };
    if def.params.len() != args.len() {
        errors.push(ModeError::compile(
            line,
            format!("macro '{name}' expects {} argument(s), got {}", def.params.len(), args.len()),
        ));
        return Vec::new();
    }

    let substituted = substitute_nodes(&def.body, &def.params, args);
    let mut macros_copy = macros.clone();
    flatten(&substituted, options, &mut macros_copy, errors)
}

/// Deep-clone `nodes`, substituting `{PARAM}` (direct) and `{_PARAM_}`
/// (protected — braces in the argument's own text are escaped with a
/// private-use sentinel so later passes don't re-expand them) in text
/// content and element arguments.
fn substitute_nodes(nodes: &[Node], params: &[String], args: &[String]) -> Vec<Node> {
    nodes
        .iter()
        .map(|n| {
            let mut clone = n.clone();
            clone.args = clone.args.iter().map(|a| substitute_params(a, params, args)).collect();
            clone.children = substitute_nodes(&clone.children, params, args);
            clone
        })
        .collect()
}

fn substitute_params(text: &str, params: &[String], args: &[String]) -> String {
    let mut out = text.to_string();
    for (p, a) in params.iter().zip(args.iter()) {
        out = out.replace(&format!("{{_{p}_}}"), &protect_braces(a));
        out = out.replace(&format!("{{{p}}}"), a);
    }
    unprotect_braces(&out)
}

const PROTECT_OPEN: char = '\u{E000}';
const PROTECT_CLOSE: char = '\u{E001}';

fn protect_braces(s: &str) -> String {
    s.replace('{', &PROTECT_OPEN.to_string()).replace('}', &PROTECT_CLOSE.to_string())
}

fn unprotect_braces(s: &str) -> String {
    s.replace(PROTECT_OPEN, "{").replace(PROTECT_CLOSE, "}")
}
