//! Ties the whole pipeline together: a [`Mode`] owns the compiled rule
//! groups, preprocessor, postprocessor/charsets, and the transcription trie
//! built from all enabled rule groups, and exposes `transcribe`.

use crate::config::CompilerConfig;
use crate::cst;
use crate::error::{ErrorLog, ModeError, Warning, WarningSink};
use crate::glaem::{self, Node};
use crate::postprocessor::PostProcessor;
use crate::preprocessor::Preprocessor;
use crate::processor;
use crate::rule_group::{self, RuleGroup};
use crate::trie::{NodeId, TranscriptionTrie};
use serde::Serialize;
use std::collections::HashMap;

/// A declared option's name and default value (`option <name> <default>`).
#[derive(Debug, Clone)]
pub struct OptionDecl {
    pub name: String,
    pub default: String,
}

/// A compiled, immutable mode: language tag, writing-system tag, declared
/// options, rule groups, preprocessor/postprocessor pipelines, and the
/// trie built from every rule group's sub-rules.
///
/// Once built, a `Mode` never mutates; it may be shared freely across
/// concurrent `transcribe` calls (SPEC_FULL.md §5).
#[derive(Debug, Clone)]
pub struct Mode {
    pub version: String,
    pub language: String,
    pub writing: String,
    pub options: Vec<OptionDecl>,
    pub rule_groups: Vec<RuleGroup>,
    pub preprocessor: Preprocessor,
    pub postprocessor: PostProcessor,
    trie: TranscriptionTrie,
}

/// The result of a `transcribe` call: the output text (best-effort even
/// when warnings were raised), plus any warnings accumulated along the way.
#[derive(Debug, Clone)]
pub struct TranscribeOutput {
    pub text: String,
    pub warnings: Vec<Warning>,
}

/// Inputs needed to locate the charset document(s) a `charset <name> <ref>`
/// element refers to: the caller supplies the already-parsed `.cst`
/// document trees, keyed by the `ref` string used in the mode file.
pub type CharsetSources<'a> = HashMap<&'a str, &'a Node>;

impl Mode {
    /// Parse and compile a mode document's source text into a `Mode`,
    /// resolving the `charset <name> <ref>` elements it declares against
    /// `charset_sources` (pre-parsed `.cst` document trees keyed by the
    /// `ref` argument).
    #[tracing::instrument(skip(source, charset_sources), fields(bytes = source.len()))]
    pub fn finalize(source: &str, charset_sources: &CharsetSources) -> Result<Mode, ErrorLog> {
        Self::finalize_with_config(source, charset_sources, &CompilerConfig::default())
    }

    /// As [`Mode::finalize`], but accepting a [`CompilerConfig`] whose
    /// `extra_preprocessor_ops` names are recognized (as no-op placeholders;
    /// see [`crate::preprocessor::Operator::External`]) instead of rejected
    /// as unknown preprocessor elements.
    #[tracing::instrument(skip(source, charset_sources, config), fields(bytes = source.len()))]
    pub fn finalize_with_config(
        source: &str,
        charset_sources: &CharsetSources,
        config: &CompilerConfig,
    ) -> Result<Mode, ErrorLog> {
        let document = glaem::parse(source).map_err(ErrorLog)?;
        Self::finalize_document(&document, charset_sources, config)
    }

    fn finalize_document(document: &Node, charset_sources: &CharsetSources, config: &CompilerConfig) -> Result<Mode, ErrorLog> {
        let mut errors = ErrorLog::new();

        let version = document.first_child_named("version").and_then(|n| n.args.first().cloned()).unwrap_or_default();
        let language = document.first_child_named("language").and_then(|n| n.args.first().cloned()).unwrap_or_default();
        let writing = document.first_child_named("writing").and_then(|n| n.args.first().cloned()).unwrap_or_default();

        let mut option_decls = Vec::new();
        let mut options: HashMap<String, String> = HashMap::new();
        for node in document.children_named("option") {
            let Some(name) = node.args.first().cloned() else {
                errors.push(ModeError::compile(node.line, "option element is missing its name"));
                continue;
            };
            let default = node.args.get(1).cloned().unwrap_or_default();
            options.insert(name.clone(), default.clone());
            option_decls.push(OptionDecl { name, default });
        }

        let mut postprocessor = PostProcessor::new();
        for node in document.children_named("charset") {
            let (Some(name), Some(ref_name)) = (node.args.first(), node.args.get(1)) else {
                errors.push(ModeError::compile(node.line, "charset element requires a name and a reference"));
                continue;
            };
            match charset_sources.get(ref_name.as_str()) {
                Some(cst_doc) => match cst::finalize(name, cst_doc) {
                    Ok(charset) => postprocessor.add_charset(charset),
                    Err(mut e) => errors.0.append(&mut e),
                },
                None => errors.push(ModeError::charset(node.line, format!("unknown charset reference: {ref_name}"))),
            }
        }

        let preprocessor = compile_preprocessor(document, config, &mut errors);

        let mut rule_groups = Vec::new();
        for node in document.children_named("rules") {
            match rule_group::finalize(node, &options) {
                Ok(group) => rule_groups.push(group),
                Err(mut e) => errors.0.append(&mut e),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let trie = match TranscriptionTrie::build(rule_groups.iter().flat_map(RuleGroup::sub_rules)) {
            Ok(t) => t,
            Err(e) => {
                errors.push(e);
                return Err(errors);
            }
        };

        Ok(Mode { version, language, writing, options: option_decls, rule_groups, preprocessor, postprocessor, trie })
    }

    /// Transcribe `input` through preprocessing, word-level trie traversal,
    /// and the named (or default) charset.
    #[tracing::instrument(skip(self, input), fields(len = input.len()))]
    pub fn transcribe(&self, input: &str, charset_name: Option<&str>) -> Option<TranscribeOutput> {
        let preprocessed = self.preprocessor.apply(input);
        tracing::trace!(preprocessed, "preprocessor output");
        let tokens = processor::process(&self.trie, &preprocessed);
        let (text, warnings) = self.postprocessor.resolve(&tokens, charset_name, 256)?;
        Some(TranscribeOutput { text, warnings })
    }

    /// A structured trace of the trie's reachable paths, for
    /// cross-implementation diffing (SPEC_FULL.md §6).
    pub fn debug_tree(&self) -> DebugNode {
        build_debug_node(&self.trie, TranscriptionTrie::ROOT, "ROOT".to_string(), String::new())
    }

    pub fn charset_names(&self) -> impl Iterator<Item = &str> {
        self.postprocessor.charset_names()
    }
}

fn compile_preprocessor(document: &Node, config: &CompilerConfig, errors: &mut ErrorLog) -> Preprocessor {
    let mut pp = Preprocessor::new();
    let Some(container) = document.first_child_named("preprocessor") else {
        return pp;
    };
    let extra_names = config.preprocessor_op_names();
    for node in &container.children {
        if node.is_text {
            continue;
        }
        match node.name.as_str() {
            "substitute" => match (node.args.first(), node.args.get(1)) {
                (Some(pattern), Some(replacement)) => pp.push_substitute(pattern, replacement),
                _ => errors.push(ModeError::compile(node.line, "substitute element requires a pattern and a replacement")),
            },
            "rx_substitute" => match (node.args.first(), node.args.get(1)) {
                (Some(pattern), Some(replacement)) => {
                    if let Err(e) = pp.push_rx_substitute(node.line, pattern, replacement.as_str()) {
                        errors.push(e);
                    }
                }
                _ => errors.push(ModeError::compile(node.line, "rx_substitute element requires a pattern and a replacement")),
            },
            other if extra_names.contains(&other) => pp.push_external(other),
            other => errors.push(ModeError::compile(node.line, format!("unknown preprocessor element: {other}"))),
        }
    }
    pp
}

/// One node of the debug trace tree; see SPEC_FULL.md §6's serialization
/// contract (`character`, `path`, `replacement`, `effective`, `child_count`,
/// `children`, children sorted by `character` ascending).
#[derive(Debug, Clone, Serialize)]
pub struct DebugNode {
    pub character: String,
    pub path: String,
    pub replacement: Option<Vec<String>>,
    pub effective: bool,
    pub child_count: usize,
    pub children: Vec<DebugNode>,
}

fn build_debug_node(trie: &TranscriptionTrie, id: NodeId, character: String, path: String) -> DebugNode {
    let node = trie.node(id);
    let replacement = if node.effective {
        Some(node.replacement.iter().map(|t| t.as_str().to_string()).collect())
    } else {
        None
    };

    let mut children: Vec<(&str, NodeId)> = trie.children_sorted(id).map(|(t, n)| (t.as_str(), n)).collect();
    children.sort_by(|a, b| a.0.cmp(b.0));

    let child_count = children.len();
    let children = children
        .into_iter()
        .map(|(text, child_id)| {
            let mut child_path = path.clone();
            child_path.push_str(text);
            build_debug_node(trie, child_id, text.to_string(), child_path)
        })
        .collect();

    DebugNode { character, path, replacement, effective: node.effective, child_count, children }
}
