//! Selects a charset and resolves a processor token stream through it into
//! final output text.

use crate::charset::Charset;
use crate::error::{Warning, WarningSink};
use crate::sheaf::Token;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PostProcessor {
    charsets: HashMap<String, Charset>,
    default_charset: Option<String>,
}

impl PostProcessor {
    pub fn new() -> Self {
        PostProcessor::default()
    }

    pub fn add_charset(&mut self, charset: Charset) {
        if self.default_charset.is_none() {
            self.default_charset = Some(charset.name.clone());
        }
        self.charsets.insert(charset.name.clone(), charset);
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_charset = Some(name.into());
    }

    pub fn charset_names(&self) -> impl Iterator<Item = &str> {
        self.charsets.keys().map(String::as_str)
    }

    /// Resolve `tokens` through the named charset, or the default one if
    /// `charset_name` is `None`. Returns `None` if the name doesn't match
    /// any registered charset.
    pub fn resolve(&self, tokens: &[Token], charset_name: Option<&str>, cap: usize) -> Option<(String, Vec<Warning>)> {
        let name = charset_name.or(self.default_charset.as_deref())?;
        let charset = self.charsets.get(name)?;
        let mut sink = WarningSink::new(cap);
        let text = charset.resolve(tokens, &mut sink);
        Some((text, sink.into_vec()))
    }
}
