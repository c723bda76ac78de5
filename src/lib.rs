//! # wkpdf
//!
//! Convert HTML pages, URLs and in-memory HTML into a single PDF by driving
//! the `wkhtmltopdf` executable.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wkpdf::{Document, Flag, Page};
//!
//! fn main() -> wkpdf::Result<()> {
//!     let mut doc = Document::new();
//!     doc.add_options([Flag::with_value("--page-size", "Letter")]);
//!     doc.add_pages([
//!         Page::file("intro.html"),
//!         Page::from_html("<h1>Generated section</h1>"),
//!     ]);
//!     doc.write_to_file("out.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Mixed sources**: files, URLs and in-memory HTML in one document
//! - **Stdin or temp files**: a single in-memory page is piped, several are
//!   staged in a temp directory that is always removed afterwards
//! - **Headless fallback**: retries under a virtual-display wrapper
//!   (`xvfb-run` by default) when the direct run fails
//! - **Classified errors**: setup, render, timeout, cleanup and delivery
//!   failures are distinct [`ErrorKind`]s

pub mod config;
pub mod detect;
pub mod document;
pub mod error;
pub mod exec;
pub mod option;
pub mod page;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use config::RendererConfig;
pub use detect::{is_pdf, is_pdf_bytes, pdf_version};
pub use document::{
    render_all, Document, InputStrategy, ResolvedSources, StagedInput, STDIN_SENTINEL,
};
pub use error::{Error, ErrorKind, Result};
pub use exec::Invocation;
pub use option::{Flag, OptionSet, PdfOption};
pub use page::{Page, PageSource};

use std::io::Write;
use std::path::Path;

/// Render one HTML file to PDF bytes.
///
/// # Example
///
/// ```no_run
/// let pdf = wkpdf::render_file("invoice.html").unwrap();
/// assert!(wkpdf::detect::is_pdf_bytes(&pdf));
/// ```
pub fn render_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut doc = Document::new();
    doc.add_page(Page::file(path.as_ref()));
    doc.render()
}

/// Render one URL to PDF bytes.
pub fn render_url(url: &str) -> Result<Vec<u8>> {
    let mut doc = Document::new();
    doc.add_page(Page::url(url));
    doc.render()
}

/// Render an HTML string to PDF bytes.
///
/// # Example
///
/// ```no_run
/// let pdf = wkpdf::render_html("<h1>Hello</h1>").unwrap();
/// std::fs::write("hello.pdf", pdf).unwrap();
/// ```
pub fn render_html(html: &str) -> Result<Vec<u8>> {
    let mut doc = Document::new();
    doc.add_page(Page::from_html(html));
    doc.render()
}

/// Builder for configuring and rendering a document in one chain.
///
/// # Example
///
/// ```no_run
/// use wkpdf::Wkpdf;
///
/// Wkpdf::new()
///     .renderer("/usr/local/bin/wkhtmltopdf")
///     .option("--grayscale")
///     .cover_html("<h1>Annual Report</h1>")
///     .file("body.html")
///     .url("https://example.com/appendix")
///     .write_to_file("report.pdf")?;
/// # Ok::<(), wkpdf::Error>(())
/// ```
pub struct Wkpdf {
    config: RendererConfig,
    options: OptionSet,
    pages: Vec<Page>,
}

impl Wkpdf {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: RendererConfig::default(),
            options: OptionSet::new(),
            pages: Vec::new(),
        }
    }

    /// Replace the whole renderer configuration.
    pub fn with_config(mut self, config: RendererConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the renderer executable.
    pub fn renderer(mut self, renderer: impl Into<std::path::PathBuf>) -> Self {
        self.config = self.config.with_renderer(renderer);
        self
    }

    /// Disable the display-wrapped fallback.
    pub fn no_display_wrapper(mut self) -> Self {
        self.config = self.config.without_display_wrapper();
        self
    }

    /// Set the render timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Add a document option.
    pub fn option<O: PdfOption>(mut self, option: O) -> Self {
        self.options.push(option);
        self
    }

    /// Append a prepared page.
    pub fn page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Append a file page.
    pub fn file(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.page(Page::file(path))
    }

    /// Append a URL page.
    pub fn url(self, url: impl Into<String>) -> Self {
        self.page(Page::url(url))
    }

    /// Append an in-memory HTML page.
    pub fn html(self, html: impl Into<String>) -> Self {
        self.page(Page::from_html(html))
    }

    /// Append an in-memory HTML cover page.
    pub fn cover_html(self, html: impl Into<String>) -> Self {
        self.page(Page::from_html(html).cover())
    }

    /// Build the document.
    pub fn build(self) -> Document {
        let mut doc = Document::with_config(self.config);
        doc.add_options(self.options.as_slice().iter().cloned());
        doc.add_pages(self.pages);
        doc
    }

    /// Build and render the document.
    pub fn render(self) -> Result<Vec<u8>> {
        self.build().render()
    }

    /// Build, render and write the document to a file.
    pub fn write_to_file<P: AsRef<Path>>(self, path: P) -> Result<()> {
        self.build().write_to_file(path)
    }

    /// Build, render and copy the document to a writer.
    pub fn write<W: Write>(self, writer: &mut W) -> Result<()> {
        self.build().write(writer)
    }
}

impl Default for Wkpdf {
    fn default() -> Self {
        Self::new()
    }
}
