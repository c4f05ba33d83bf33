//! Certificate artifact rendering. The engine only needs a file id back; how
//! the artifact looks is up to the renderer.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{EngineError, Result};
use crate::models::Certificate;

#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(&self, certificate: &Certificate) -> Result<String>;
}

/// Writes a standalone HTML certificate under `<data_dir>/certificates/`.
/// The returned id is relative to `data_dir`, which is served at `/content`.
#[derive(Debug, Clone)]
pub struct FsCertificateRenderer {
    data_dir: PathBuf,
}

impl FsCertificateRenderer {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[async_trait]
impl CertificateRenderer for FsCertificateRenderer {
    async fn render(&self, certificate: &Certificate) -> Result<String> {
        let rel = format!("certificates/{}.html", certificate.code);
        let out = self.data_dir.join(&rel);
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::Render(e.to_string()))?;
        }
        tokio::fs::write(&out, certificate_html(certificate))
            .await
            .map_err(|e| EngineError::Render(e.to_string()))?;
        tracing::debug!(path = %out.display(), "wrote certificate artifact");
        Ok(rel)
    }
}

fn certificate_html(c: &Certificate) -> String {
    let instructor = c
        .instructor_name
        .as_deref()
        .map(escape_html)
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>Certificate {code}</title>
  <style>
    body{{font-family:serif;text-align:center;padding:48px}}
    .code{{font-family:monospace;color:#555}}
  </style>
</head>
<body>
<h1>Certificate of Completion</h1>
<p>Awarded to <strong>{user}</strong></p>
<p>for completing course <strong>{course}</strong></p>
<p>Instructor: {instructor}</p>
<p>Issued {issued}</p>
<p class='code'>{code}</p>
</body>
</html>"#,
        code = escape_html(&c.code),
        user = escape_html(&c.user_id),
        course = c.course_id,
        instructor = instructor,
        issued = c.issued_at.format("%Y-%m-%d"),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Deserialize)]
struct RenderResponse {
    file_id: String,
}

/// Delegates rendering to an external service: POSTs the certificate as
/// JSON and expects `{"file_id": "..."}` back.
#[derive(Debug, Clone)]
pub struct HttpCertificateRenderer {
    client: reqwest::Client,
    url: String,
}

impl HttpCertificateRenderer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CertificateRenderer for HttpCertificateRenderer {
    async fn render(&self, certificate: &Certificate) -> Result<String> {
        let res = self
            .client
            .post(&self.url)
            .json(certificate)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::Render(e.to_string()))?;
        let body: RenderResponse = res
            .json()
            .await
            .map_err(|e| EngineError::Render(e.to_string()))?;
        Ok(body.file_id)
    }
}
