//! Pipeline stages for signing a DTR archive.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets the rendering backend
//! be swapped without touching the text stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ inject ──▶ mhtml ──▶ render
//! (file)    (regex)    (MIME)    (Chromium)
//!                        │
//!                      decode
//!                    (QP / base64)
//! ```
//!
//! 1. [`input`]  — read an archive from disk with a size cap (CLI only)
//! 2. [`inject`] — write the signatory into the Head Officer placeholder of
//!    the raw archive text
//! 3. [`mhtml`]  — split the archive, keep HTML and CSS parts, decoding each
//!    body with [`decode`]
//! 4. [`render`] — apply the print stylesheet and print through a
//!    [`render::RenderEngine`]; the only stage with I/O and a timeout

pub mod decode;
pub mod inject;
pub mod input;
pub mod mhtml;
pub mod render;
