//! Certificate document rendering adapters.

mod html_renderer;

pub use html_renderer::{HtmlCertificateRenderer, RendererSetupError};
