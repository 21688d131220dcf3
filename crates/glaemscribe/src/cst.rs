//! Charset document parser: turns a `.cst`-shaped [`crate::glaem::Node`] tree
//! into a [`Charset`].
//!
//! `.cst` files share the mode file's line/indentation syntax (see
//! [`crate::glaem`]), so this module only has to know the charset-specific
//! element vocabulary: `char`, `virtual`, `swap`, `sequence`.

use crate::charset::{Charset, VirtualChar, VirtualClass};
use crate::error::ModeError;
use crate::glaem::Node;
use std::collections::HashSet;

/// Build a [`Charset`] named `name` from a parsed `.cst` document's root node.
pub fn finalize(name: &str, document: &Node) -> Result<Charset, Vec<ModeError>> {
    let mut charset = Charset::new(name);
    let mut errors = Vec::new();

    for node in &document.children {
        if node.is_text {
            continue;
        }
        match node.name.as_str() {
            "char" => compile_char(&mut charset, node, &mut errors),
            "virtual" => compile_virtual(&mut charset, node, &mut errors),
            "swap" => compile_swap(&mut charset, node, &mut errors),
            "sequence" => compile_sequence(&mut charset, node, &mut errors),
            other => errors.push(ModeError::charset(node.line, format!("unknown charset element: {other}"))),
        }
    }

    if errors.is_empty() {
        Ok(charset)
    } else {
        Err(errors)
    }
}

/// `char <hex> <name>+`: one code point registered under one or more names.
fn compile_char(charset: &mut Charset, node: &Node, errors: &mut Vec<ModeError>) {
    let Some(hex) = node.args.first() else {
        errors.push(ModeError::charset(node.line, "char element is missing its hex code point"));
        return;
    };
    let Some(text) = parse_code_point(hex) else {
        errors.push(ModeError::charset(node.line, format!("invalid hex code point: {hex}")));
        return;
    };
    let names = &node.args[1..];
    if names.is_empty() {
        errors.push(ModeError::charset(node.line, "char element names no charset entries"));
        return;
    }
    for name in names {
        charset.insert_simple(name, text.clone());
    }
}

fn parse_code_point(hex: &str) -> Option<String> {
    let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("U+")).unwrap_or(hex);
    let code = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(code).map(String::from)
}

/// `virtual <name> [<default>]` containing `class <target> <trigger>+`,
/// `reversed` (a flag with no args) and/or `default <name>`.
fn compile_virtual(charset: &mut Charset, node: &Node, errors: &mut Vec<ModeError>) {
    let Some(name) = node.args.first() else {
        errors.push(ModeError::charset(node.line, "virtual element is missing its name"));
        return;
    };

    let mut virt = VirtualChar { default: node.args.get(1).cloned(), ..Default::default() };

    for child in &node.children {
        if child.is_text {
            continue;
        }
        match child.name.as_str() {
            "class" => {
                let Some(target) = child.args.first() else {
                    errors.push(ModeError::charset(child.line, "class element is missing its target"));
                    continue;
                };
                let triggers: HashSet<String> = child.args[1..].iter().cloned().collect();
                if triggers.is_empty() {
                    errors.push(ModeError::charset(child.line, "class element names no triggers"));
                    continue;
                }
                virt.classes.push(VirtualClass { triggers, target: target.clone() });
            }
            "reversed" => virt.reversed = true,
            "default" => match child.args.first() {
                Some(d) => virt.default = Some(d.clone()),
                None => errors.push(ModeError::charset(child.line, "default element is missing its value")),
            },
            other => errors.push(ModeError::charset(child.line, format!("unknown virtual charset element: {other}"))),
        }
    }

    charset.insert_virtual(name, virt);
}

/// `swap <a> <b>+`: `a` trades places with each listed partner when adjacent.
fn compile_swap(charset: &mut Charset, node: &Node, errors: &mut Vec<ModeError>) {
    let Some(a) = node.args.first() else {
        errors.push(ModeError::charset(node.line, "swap element is missing its anchor token"));
        return;
    };
    let partners = &node.args[1..];
    if partners.is_empty() {
        errors.push(ModeError::charset(node.line, "swap element names no partner tokens"));
        return;
    }
    for b in partners {
        charset.insert_swap(a, b);
    }
}

/// `sequence <name> <token>+`: expands `name` in place to the listed tokens.
fn compile_sequence(charset: &mut Charset, node: &Node, errors: &mut Vec<ModeError>) {
    let Some(name) = node.args.first() else {
        errors.push(ModeError::charset(node.line, "sequence element is missing its name"));
        return;
    };
    let members = &node.args[1..];
    if members.is_empty() {
        errors.push(ModeError::charset(node.line, "sequence element names no members"));
        return;
    }
    charset.insert_sequence(name, members.to_vec());
}
