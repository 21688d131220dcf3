//! Compiler configuration for extensibility.
//!
//! Mirrors the teacher's `ExternalBuiltin`/`CompilerConfig` pattern: external
//! projects can register additional preprocessor/postprocessor operator
//! kinds by name without forking the crate.
//!
//! Only the preprocessor half is wired into mode finalization so far:
//! `Mode::finalize_with_config` accepts a bare element name in a
//! `\preprocessor` block as a recognized no-op
//! ([`crate::preprocessor::Operator::External`]) when it matches an
//! `extra_preprocessor_ops` entry, instead of rejecting it as an unknown
//! element. `extra_postprocessor_ops` is accepted by this struct but not yet
//! consulted anywhere — there is no postprocessor-element compilation pass
//! to extend. Wiring an actual implementation behind a registered name (on
//! either side) is left to the embedding application, the same way the
//! teacher's external builtins are validated by name but linked externally.

/// Declaration of an operator kind provided by a runtime extension (e.g. a
/// `transliterate` or `ipa_map` preprocessor step not built into the core).
#[derive(Debug, Clone)]
pub struct OperatorSpec {
    /// The element name used in mode files (e.g. "ipa_map").
    pub name: String,

    /// A human-readable description, surfaced in diagnostics and docs.
    pub description: String,
}

impl OperatorSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        OperatorSpec { name: name.into(), description: description.into() }
    }
}

/// Configuration for the Glaemscribe core.
///
/// Allows external projects to extend mode finalization with additional
/// preprocessor/postprocessor operator kinds.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub extra_preprocessor_ops: Vec<OperatorSpec>,
    pub extra_postprocessor_ops: Vec<OperatorSpec>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_preprocessor_op(mut self, spec: OperatorSpec) -> Self {
        self.extra_preprocessor_ops.push(spec);
        self
    }

    pub fn with_postprocessor_op(mut self, spec: OperatorSpec) -> Self {
        self.extra_postprocessor_ops.push(spec);
        self
    }

    pub fn preprocessor_op_names(&self) -> Vec<&str> {
        self.extra_preprocessor_ops.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn postprocessor_op_names(&self) -> Vec<&str> {
        self.extra_postprocessor_ops.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_specs() {
        let config = CompilerConfig::new()
            .with_preprocessor_op(OperatorSpec::new("ipa_map", "maps IPA symbols to mode tokens"))
            .with_postprocessor_op(OperatorSpec::new("font_subst", "post-resolution glyph substitution"));

        assert_eq!(config.preprocessor_op_names(), vec!["ipa_map"]);
        assert_eq!(config.postprocessor_op_names(), vec!["font_subst"]);
    }

    #[test]
    fn default_config_is_empty() {
        let config = CompilerConfig::new();
        assert!(config.extra_preprocessor_ops.is_empty());
        assert!(config.extra_postprocessor_ops.is_empty());
    }
}
