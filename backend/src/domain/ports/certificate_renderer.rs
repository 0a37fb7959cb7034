//! Driven port turning certificate details into a document.

use super::define_port_error;
use crate::domain::{CertificateDetails, RenderedArtifact};

define_port_error! {
    /// Errors raised while rendering a certificate.
    pub enum CertificateRenderError {
        /// The document could not be produced.
        Render { message: String } => "certificate rendering failed: {message}",
    }
}

/// Synchronous renderer for certificate documents.
#[cfg_attr(test, mockall::automock)]
pub trait CertificateRenderer: Send + Sync {
    /// Render the certificate.
    fn render(&self, details: &CertificateDetails) -> Result<RenderedArtifact, CertificateRenderError>;
}
