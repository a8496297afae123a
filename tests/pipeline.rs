//! Library-level tests of the signing pipeline with a stub engine.

use dtr_signatory::config::PageLayout;
use dtr_signatory::{
    sign_archive, sign_archive_sync, sign_file, RenderEngine, SignConfig, SignError,
};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records the HTML and layout it is given and answers with a fixed payload.
struct StubEngine {
    reply: Vec<u8>,
    seen: Mutex<Vec<(String, PageLayout, Duration)>>,
}

impl StubEngine {
    fn pdf() -> Arc<Self> {
        Arc::new(Self {
            reply: b"%PDF-1.4\n%%EOF\n".to_vec(),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn html(&self) -> String {
        self.seen.lock().unwrap().last().map(|s| s.0.clone()).unwrap_or_default()
    }
}

impl RenderEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn print_to_pdf<'a>(
        &'a self,
        html: &'a str,
        layout: &'a PageLayout,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignError>> {
        self.seen
            .lock()
            .unwrap()
            .push((html.to_string(), layout.clone(), timeout));
        let reply = self.reply.clone();
        Box::pin(async move { Ok(reply) })
    }
}

/// Engine that never finishes within any timeout.
struct TimingOut;

impl RenderEngine for TimingOut {
    fn name(&self) -> &str {
        "timing-out"
    }

    fn print_to_pdf<'a>(
        &'a self,
        _html: &'a str,
        _layout: &'a PageLayout,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, SignError>> {
        Box::pin(async move {
            Err(SignError::RenderTimeout {
                stage: "loading the page",
                secs: timeout.as_secs(),
            })
        })
    }
}

fn config_with(engine: Arc<dyn RenderEngine>) -> SignConfig {
    SignConfig::builder()
        .render_timeout_secs(7)
        .engine(engine)
        .build()
        .unwrap()
}

const TWO_SIGNATURES: &str = "MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"----B----\"\r\n\
\r\n\
------B----\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<html><head><title>DTR</title></head><body>\r\n\
<SPAN>&nbsp;</SPAN></td><td>signature of the head officer</td>\r\n\
<span>&nbsp;</span></td><td>Signature of the Head Officer</td>\r\n\
<p>Fe=C3=B1a</p></body></html>\r\n\
------B----\r\n\
Content-Type: text/css\r\n\
\r\n\
.first {}\r\n\
------B----\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
------B----\r\n\
Content-Type: text/css\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
LnNlY29uZCB7fQ==\r\n\
------B------\r\n";

#[tokio::test]
async fn every_placeholder_is_signed() {
    let engine = StubEngine::pdf();
    let signed = sign_archive(TWO_SIGNATURES, "J. DOE", &config_with(engine.clone()))
        .await
        .unwrap();

    assert_eq!(signed.stats.replacements, 2);
    assert_eq!(signed.stats.signatory, "J. DOE");
    assert_eq!(signed.stats.html_parts, 1);
    assert_eq!(signed.stats.css_parts, 2);
    assert!(!signed.stats.degraded);
    assert_eq!(signed.stats.pdf_bytes, signed.pdf.len());

    let html = engine.html();
    // Tag case is preserved around the name.
    assert!(html.contains("<SPAN>J. DOE</SPAN>"));
    assert!(html.contains("<span>J. DOE</span>"));
    assert!(!html.contains("&nbsp;</span>"));
    assert!(html.contains("<p>Feña</p>"));
}

#[tokio::test]
async fn css_parts_keep_archive_order() {
    let engine = StubEngine::pdf();
    sign_archive(TWO_SIGNATURES, "J. DOE", &config_with(engine.clone()))
        .await
        .unwrap();

    let html = engine.html();
    let first = html.find(".first {}").unwrap();
    let second = html.find(".second {}").unwrap();
    assert!(first < second);
    assert!(!html.contains("iVBORw0KGgo"));
}

#[tokio::test]
async fn engine_receives_layout_and_timeout() {
    let engine = StubEngine::pdf();
    sign_archive(TWO_SIGNATURES, "J. DOE", &config_with(engine.clone()))
        .await
        .unwrap();

    let seen = engine.seen.lock().unwrap();
    let (_, layout, timeout) = &seen[0];
    assert!(layout.landscape);
    assert_eq!(layout.margin_mm, 5.0);
    assert_eq!(*timeout, Duration::from_secs(7));
}

#[tokio::test]
async fn name_with_replacement_syntax_is_literal() {
    let engine = StubEngine::pdf();
    sign_archive(TWO_SIGNATURES, "$1 & $2", &config_with(engine.clone()))
        .await
        .unwrap();
    assert!(engine.html().contains("<span>$1 & $2</span>"));
}

#[tokio::test]
async fn name_with_equals_sign_decodes_intact() {
    for name in ["J=DOE", "A=20B"] {
        let engine = StubEngine::pdf();
        let signed = sign_archive(TWO_SIGNATURES, name, &config_with(engine.clone()))
            .await
            .unwrap();
        assert_eq!(signed.stats.replacements, 2);
        assert_eq!(signed.stats.signatory, name);
        assert!(engine.html().contains(&format!("<span>{name}</span>")), "{name}");
    }
}

#[tokio::test]
async fn archive_without_placeholder_still_renders() {
    let engine = StubEngine::pdf();
    let raw = "MIME-Version: 1.0\r\nContent-Type: multipart/related; boundary=Q\r\n\r\n\
               --Q\r\nContent-Type: text/html\r\n\r\n<html><body>no line</body></html>\r\n--Q--\r\n";
    let signed = sign_archive(raw, "J. DOE", &config_with(engine.clone()))
        .await
        .unwrap();
    assert_eq!(signed.stats.replacements, 0);
    assert!(engine.html().contains("no line"));
}

#[tokio::test]
async fn timeout_propagates_unchanged() {
    let err = sign_archive(TWO_SIGNATURES, "J. DOE", &config_with(Arc::new(TimingOut)))
        .await
        .unwrap_err();
    assert!(err.is_render_error());
    assert!(matches!(err, SignError::RenderTimeout { secs: 7, .. }));
}

#[tokio::test]
async fn non_pdf_output_is_rejected() {
    let engine = Arc::new(StubEngine {
        reply: b"<html>".to_vec(),
        seen: Mutex::new(Vec::new()),
    });
    let err = sign_archive(TWO_SIGNATURES, "J. DOE", &config_with(engine))
        .await
        .unwrap_err();
    assert!(matches!(err, SignError::RenderFailed(_)));
}

#[tokio::test]
async fn sign_file_writes_signed_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("DTR-April.MHTML");
    std::fs::write(&input, TWO_SIGNATURES).unwrap();

    let engine = StubEngine::pdf();
    let (out, stats) = sign_file(&input, None, None, &config_with(engine.clone()))
        .await
        .unwrap();

    assert_eq!(out, dir.path().join("DTR-April_signed.pdf"));
    assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.4\n%%EOF\n");
    assert_eq!(stats.signatory, dtr_signatory::DEFAULT_SIGNATORY);
}

#[tokio::test]
async fn sign_file_explicit_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.mhtml");
    let output = dir.path().join("out/custom.pdf");
    std::fs::write(&input, TWO_SIGNATURES).unwrap();

    let (out, _) = sign_file(&input, Some(&output), Some("J. DOE"), &config_with(StubEngine::pdf()))
        .await
        .unwrap();
    assert_eq!(out, output);
    assert!(output.exists());
}

#[tokio::test]
async fn sign_file_respects_size_cap() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("big.mhtml");
    std::fs::write(&input, TWO_SIGNATURES).unwrap();

    let config = SignConfig::builder()
        .max_archive_bytes(16)
        .engine(StubEngine::pdf())
        .build()
        .unwrap();
    let err = sign_file(&input, None, None, &config).await.unwrap_err();
    assert!(matches!(err, SignError::ArchiveTooLarge { limit: 16, .. }));
    assert!(!dir.path().join("big_signed.pdf").exists());
}

#[test]
fn sync_wrapper_runs_pipeline() {
    let engine = StubEngine::pdf();
    let signed = sign_archive_sync(TWO_SIGNATURES, "J. DOE", &config_with(engine)).unwrap();
    assert!(signed.into_bytes().starts_with(b"%PDF"));
}
