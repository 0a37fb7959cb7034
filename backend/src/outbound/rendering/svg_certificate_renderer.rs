//! SVG certificate renderer.
//!
//! Produces a 1200×800 landscape document with a framed border, the holder's
//! name, the course title, the instructor and the completion date. Text is
//! XML-escaped, so names can contain any characters.

use std::fmt::Write as _;

use crate::domain::ports::{CertificateRenderError, CertificateRenderer};
use crate::domain::{CertificateDetails, RenderedArtifact};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 800;
const BORDER_INSET: u32 = 20;

/// Renders certificates as standalone SVG documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgCertificateRenderer;

impl SvgCertificateRenderer {
    /// Create a renderer.
    pub const fn new() -> Self {
        Self
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// One centred line of text: anchor x, baseline y, font size, content.
struct Line<'a> {
    x: u32,
    y: u32,
    size: u32,
    text: &'a str,
}

impl CertificateRenderer for SvgCertificateRenderer {
    fn render(
        &self,
        details: &CertificateDetails,
    ) -> Result<RenderedArtifact, CertificateRenderError> {
        let centre = WIDTH / 2;
        let quarter = WIDTH / 4;
        let instructor = format!("Instructor: {}", details.instructor());
        let date = format!("Date: {}", details.completed_on().format("%Y-%m-%d"));
        let lines = [
            Line {
                x: centre,
                y: 150,
                size: 48,
                text: "CERTIFICATE OF COMPLETION",
            },
            Line {
                x: centre,
                y: 250,
                size: 28,
                text: "This is to certify that",
            },
            Line {
                x: centre,
                y: 320,
                size: 40,
                text: details.display_name(),
            },
            Line {
                x: centre,
                y: 400,
                size: 28,
                text: "has successfully completed the course",
            },
            Line {
                x: centre,
                y: 460,
                size: 36,
                text: details.course_title(),
            },
            Line {
                x: quarter,
                y: 600,
                size: 24,
                text: &instructor,
            },
            Line {
                x: WIDTH - quarter,
                y: 600,
                size: 24,
                text: &date,
            },
        ];

        let mut svg = String::new();
        let inner_width = WIDTH - 2 * BORDER_INSET;
        let inner_height = HEIGHT - 2 * BORDER_INSET;
        write!(
            svg,
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r#"<rect width="{w}" height="{h}" fill="white"/>"#,
                r#"<rect x="{inset}" y="{inset}" width="{iw}" height="{ih}" fill="none" stroke="black" stroke-width="8"/>"#,
            ),
            w = WIDTH,
            h = HEIGHT,
            inset = BORDER_INSET,
            iw = inner_width,
            ih = inner_height,
        )
        .map_err(|err| CertificateRenderError::render(err.to_string()))?;
        for line in &lines {
            write!(
                svg,
                r#"<text x="{}" y="{}" font-family="serif" font-size="{}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
                line.x,
                line.y,
                line.size,
                escape_xml(line.text)
            )
            .map_err(|err| CertificateRenderError::render(err.to_string()))?;
        }
        svg.push_str("</svg>");

        Ok(RenderedArtifact {
            bytes: svg.into_bytes(),
            extension: "svg",
            content_type: "image/svg+xml",
        })
    }
}
