//! Entry point that picks between augmenting a source document and
//! composing a standalone certificate.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::augment::augment_document;
use crate::certificate::compose_certificate;
use crate::config::{FetchFailurePolicy, GenerationConfig};
use crate::error::Result;
use crate::fetch::{DocumentSource, HttpFetcher};
use crate::imaging::SignatureImage;
use crate::signature::SignatureInfo;

/// Explicitly constructed dependencies for one or more generation calls.
///
/// Holds no per-document state: fonts and images are embedded afresh on
/// every call, so one context may serve concurrent requests.
#[derive(Debug, Clone)]
pub struct GenerationContext<S: DocumentSource = HttpFetcher> {
    pub config: GenerationConfig,
    source: S,
}

impl GenerationContext<HttpFetcher> {
    pub fn new(config: GenerationConfig) -> Self {
        Self::with_source(config, HttpFetcher::new())
    }
}

impl Default for GenerationContext<HttpFetcher> {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl<S: DocumentSource> GenerationContext<S> {
    pub fn with_source(config: GenerationConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Produces the signed PDF. A missing or blank `source_url` yields a
    /// signing certificate; otherwise the fetched document is augmented.
    pub fn generate_signed_document(
        &self,
        source_url: Option<&str>,
        info: &SignatureInfo,
    ) -> Result<Vec<u8>> {
        self.generate_at(source_url, info, Utc::now())
    }

    /// Like [`generate_signed_document`](Self::generate_signed_document) with
    /// an explicit generation instant, which seeds the certificate id.
    pub fn generate_at(
        &self,
        source_url: Option<&str>,
        info: &SignatureInfo,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        info.validate()?;
        let image = SignatureImage::from_data_uri(&info.signature_image_data)?;

        let source_url = source_url.map(str::trim).filter(|url| !url.is_empty());
        let Some(url) = source_url else {
            info!(title = %info.document_title, "no source document, composing certificate");
            return compose_certificate(info, &image, &self.config, &generated_at);
        };

        match self.source.fetch(url) {
            Ok(bytes) => augment_document(&bytes, info, &image, &self.config),
            Err(err)
                if err.is_fetch_failure()
                    && self.config.on_fetch_failure == FetchFailurePolicy::Certificate =>
            {
                warn!(url, error = %err, "source document unavailable, composing certificate instead");
                compose_certificate(info, &image, &self.config, &generated_at)
            }
            Err(err) => Err(err),
        }
    }
}

/// Generates with default configuration, fetching over HTTP.
pub fn generate_signed_document(source_url: Option<&str>, info: &SignatureInfo) -> Result<Vec<u8>> {
    GenerationContext::default().generate_signed_document(source_url, info)
}
