//! Print stylesheet for re-rendered DTR forms.
//!
//! The archived page was laid out for a browser window, not for paper.
//! Keeping every override here means the renderer only has to know *where*
//! to put the style block, and tests can inspect the rules directly.
//!
//! The block is assembled in a fixed order: the archive's own CSS first, then
//! [`DTR_PRINT_STYLES`], then [`PRINT_MEDIA_RESET`]. Every override carries
//! `!important`, so later position is not what makes it win; the order only
//! keeps the output readable when debugging a render.

/// Overrides for the known DTR table and class selectors, plus elements that
/// browser extensions inject into the page before it was saved.
pub const DTR_PRINT_STYLES: &str = r#"
/* DTR Print Styles */
body {
  font-family: Arial, sans-serif !important;
  font-size: 11px !important;
  margin: 0 !important;
  padding: 10px !important;
}
.dtrtbl {
  width: 100% !important;
  border-collapse: collapse !important;
}
.dtrtd1 {
  vertical-align: top !important;
  padding: 10px !important;
  width: 50% !important;
}
.dtrtitle {
  font-size: 14px !important;
  font-weight: bold !important;
}
.dtrinnertbl {
  width: 100% !important;
}
.tblrows {
  width: 100% !important;
  border-collapse: collapse !important;
}
.border1heght15 {
  border: 1px solid #000 !important;
  padding: 2px 4px !important;
  height: 15px !important;
}
.borderbottom1heght15 {
  border-bottom: 1px solid #000 !important;
  padding: 2px 4px !important;
}
.centertext, center {
  text-align: center !important;
}
.fontsm {
  font-size: 10px !important;
}
.heght15 {
  height: 15px !important;
}
.totaltd {
  text-align: right !important;
  padding-right: 10px !important;
  font-weight: bold !important;
}
.iclarify {
  font-size: 10px !important;
  padding: 5px !important;
}
.centerh15fs {
  text-align: center !important;
  font-size: 10px !important;
}
.d1d1 {
  background-color: #f0f0f0 !important;
}
.floating-text, .posabsl100t0ml5 {
  display: none !important;
}

/* Hide browser extensions */
grammarly-desktop-integration,
grammarly-assistant-notch-view,
[data-grammarly-shadow-root] {
  display: none !important;
}
"#;

/// Final rule of the block: no extra body margin on paper.
pub const PRINT_MEDIA_RESET: &str = r#"
@media print {
  body { margin: 0 !important; }
}
"#;

/// Build the complete `<style>` element for a document whose archive
/// stylesheets concatenate to `archive_css`.
pub fn build_style_block(archive_css: &str) -> String {
    let mut block = String::with_capacity(
        archive_css.len() + DTR_PRINT_STYLES.len() + PRINT_MEDIA_RESET.len() + 32,
    );
    block.push_str("<style>\n");
    block.push_str(archive_css);
    block.push_str(DTR_PRINT_STYLES);
    block.push_str(PRINT_MEDIA_RESET);
    block.push_str("</style>\n");
    block
}

/// Insert `style_block` immediately before the first `</head>` (matched
/// case-insensitively), or prepend it when the document has no head.
pub fn inject_style_block(html: &str, style_block: &str) -> String {
    match find_ascii_ci(html, "</head>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + style_block.len());
            out.push_str(&html[..idx]);
            out.push_str(style_block);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{style_block}{html}"),
    }
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
