//! Signatory injection: fill the Head Officer's blank signature line.
//!
//! DTR exports leave the Head Officer line as an empty span,
//! `<span>&nbsp;</span>`, followed a little further down by the caption
//! "Signature of the Head Officer". The injector rewrites the `&nbsp;` of
//! every such span into the signatory's name, directly on the raw archive
//! text and before any MIME decoding.
//!
//! The lookahead between the span and the caption is bounded (300 characters
//! by default, see [`crate::config::SignConfig::placeholder_window`]) so a
//! blank span belonging to an unrelated field further up the page is never
//! matched.

use crate::config::DEFAULT_PLACEHOLDER_WINDOW;
use crate::pipeline::decode::TransferEncoding;
use crate::pipeline::mhtml::transfer_encoding_at;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Caption that anchors the placeholder.
pub const HEAD_OFFICER_LABEL: &str = "Signature of the Head Officer";

/// Largest accepted window; keeps the compiled pattern within regex size limits.
pub const MAX_PLACEHOLDER_WINDOW: usize = 2000;

static DEFAULT_INJECTOR: Lazy<SignatoryInjector> =
    Lazy::new(|| SignatoryInjector::with_window(DEFAULT_PLACEHOLDER_WINDOW));

/// Compiled placeholder pattern for one lookahead window.
#[derive(Debug, Clone)]
pub struct SignatoryInjector {
    pattern: Regex,
    window: usize,
}

/// Result of an injection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub text: String,
    /// Number of placeholders rewritten.
    pub replacements: usize,
}

impl SignatoryInjector {
    /// Build an injector whose caption must follow the closing `</span>`
    /// within `window` characters (clamped to `1..=MAX_PLACEHOLDER_WINDOW`).
    pub fn with_window(window: usize) -> Self {
        let window = window.clamp(1, MAX_PLACEHOLDER_WINDOW);
        let pattern = format!(
            r"(?is)(<span>)(&nbsp;)(</span>.{{0,{window}}}?{label})",
            label = regex::escape(HEAD_OFFICER_LABEL),
        );
        Self {
            pattern: Regex::new(&pattern).expect("placeholder pattern is valid"),
            window,
        }
    }

    /// Shared injector for the default 300-character window.
    pub fn default_window() -> &'static SignatoryInjector {
        &DEFAULT_INJECTOR
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Replace the placeholder of every match with `signatory`.
    ///
    /// The name is inserted verbatim: no HTML escaping and no `$group`
    /// expansion. Inside a quoted-printable part `=` is escaped so the name
    /// decodes back to itself. Text outside the replaced `&nbsp;` spans is left
    /// byte-identical; when nothing matches the input is returned unchanged.
    pub fn inject(&self, raw: &str, signatory: &str) -> Injection {
        let mut replacements = 0;
        let text = self
            .pattern
            .replace_all(raw, |caps: &Captures| {
                replacements += 1;
                let name = encode_for_part(raw, caps.get(0).map_or(0, |m| m.start()), signatory);
                format!("{}{}{}", &caps[1], name, &caps[3])
            })
            .into_owned();

        if replacements == 0 {
            warn!(
                "No Head Officer placeholder found within {} characters of the label",
                self.window
            );
        } else {
            info!("Injected signatory into {} placeholder(s)", replacements);
        }
        debug!("Injection: {} → {} bytes", raw.len(), text.len());

        Injection { text, replacements }
    }
}

/// The name as it must appear in the raw text of the part at `offset`.
///
/// A quoted-printable body reads `=` as the start of an escape, so a literal
/// `=` in the name is written as `=3D` there. Other parts take the name as-is.
fn encode_for_part<'a>(raw: &str, offset: usize, signatory: &'a str) -> Cow<'a, str> {
    if signatory.contains('=')
        && transfer_encoding_at(raw, offset) == TransferEncoding::QuotedPrintable
    {
        Cow::Owned(signatory.replace('=', "=3D"))
    } else {
        Cow::Borrowed(signatory)
    }
}

/// Inject with the default window.
pub fn inject_signatory(raw: &str, signatory: &str) -> Injection {
    SignatoryInjector::default_window().inject(raw, signatory)
}
