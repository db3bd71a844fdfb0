//! Flat Makefile emitter.
//!
//! The Makefile flavour does not serialize the build graph. It renders the
//! derived settings block and either substitutes it into a template with a
//! named slot, or writes a minimal "driver" file that sets the variables
//! and delegates every rule to a separately maintained base file. The two
//! renderings are mutually exclusive per invocation.

use crate::graph::Variable;
use crate::stamp;
use camino::Utf8Path;
use std::fmt::Write;
use thiserror::Error;

/// Where the maintained base Makefile template is published.
pub const TEMPLATE_URL: &str = "https://pastebin.com/raw/tqzQMF15";

/// The single slot name recognised in templates, written `@settings@`.
pub const SETTINGS_SLOT: &str = "settings";

/// Errors raised while rendering the Makefile flavour.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template text contains no `@settings@` slot to fill.
    #[error("template does not contain the '@settings@' placeholder slot")]
    MissingSettingsSlot,
}

/// A flat-text template parsed into literal and slot segments.
///
/// Only known slot names become slots; any other `@word@` sequence stays
/// literal, so user-authored content cannot collide with the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot,
}

impl Template {
    /// Parse template text, recognising the `@settings@` slot.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let token = format!("@{SETTINGS_SLOT}@");
        let mut segments = Vec::new();
        let mut rest = text;
        while let Some(at) = rest.find(&token) {
            if at > 0 {
                segments.push(Segment::Literal(rest[..at].to_owned()));
            }
            segments.push(Segment::Slot);
            rest = &rest[at + token.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }
        Self { segments }
    }

    /// Whether the template contains at least one settings slot.
    #[must_use]
    pub fn has_slot(&self) -> bool {
        self.segments.iter().any(|s| *s == Segment::Slot)
    }

    /// Substitute the rendered settings block into every slot.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingSettingsSlot`] when the template has
    /// no slot; appending silently would hide a broken template.
    pub fn render(&self, settings: &str) -> Result<String, TemplateError> {
        if !self.has_slot() {
            return Err(TemplateError::MissingSettingsSlot);
        }
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot => out.push_str(settings),
            }
        }
        Ok(out)
    }
}

/// Render the ordered variables into a Makefile settings block.
///
/// Overridable variables use `?=` so caller-supplied values win.
#[must_use]
pub fn render_settings(variables: &[Variable], toolchain_name: &str) -> String {
    let banner = "#".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{banner}");
    let _ = writeln!(out, "# Makefile settings for {toolchain_name}");
    let _ = writeln!(out, "{}", stamp::generated_line());
    let _ = writeln!(out, "{banner}");
    for variable in variables {
        let assign = if variable.overridable { "?=" } else { "=" };
        let _ = writeln!(out, "{} {assign} {}", variable.name, variable.value);
    }
    out
}

/// Render a minimal driver file: the settings block plus an include of the
/// separately maintained base file.
#[must_use]
pub fn render_driver(settings: &str, base: &Utf8Path) -> String {
    format!("{settings}\ninclude {base}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn variables() -> Vec<Variable> {
        vec![
            Variable::overridable("PREFIX", "\"/opt/gcc-arm\""),
            Variable::overridable("SUFFIX", ""),
        ]
    }

    #[rstest]
    fn settings_block_uses_lazy_assignment() {
        let block = render_settings(&variables(), "gcc-arm");
        assert!(block.contains("# Makefile settings for gcc-arm"));
        assert!(block.contains("PREFIX ?= \"/opt/gcc-arm\""));
        assert!(block.contains("SUFFIX ?= "));
    }

    #[rstest]
    fn template_substitutes_every_slot() {
        let template = Template::parse("head\n@settings@\ntail\n");
        let rendered = template.render("A = 1\n").expect("slot is present");
        assert_eq!(rendered, "head\nA = 1\n\ntail\n");
    }

    #[rstest]
    fn unknown_tokens_stay_literal() {
        let template = Template::parse("@other@ and @settings@");
        let rendered = template.render("X").expect("slot is present");
        assert_eq!(rendered, "@other@ and X");
    }

    #[rstest]
    fn template_without_slot_is_rejected() {
        let template = Template::parse("nothing to fill here");
        assert!(!template.has_slot());
        assert_eq!(
            template.render("X"),
            Err(TemplateError::MissingSettingsSlot)
        );
    }

    #[rstest]
    fn driver_delegates_to_the_base_file() {
        let driver = render_driver("PREFIX ?= \"/opt\"\n", Utf8Path::new("Makefile"));
        assert!(driver.ends_with("\ninclude Makefile\n"));
        assert!(driver.starts_with("PREFIX ?= "));
    }
}
