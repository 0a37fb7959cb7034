//! Certificate document renderers.

mod svg_certificate_renderer;

pub use svg_certificate_renderer::SvgCertificateRenderer;
