//! Page-level types.

use crate::error::Result;
use crate::option::{OptionSet, PdfOption};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where the HTML for a page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// A file on the local filesystem
    File(PathBuf),
    /// A URL fetched by the renderer
    Url(String),
    /// HTML buffered in memory
    Content(Vec<u8>),
}

/// One HTML input unit of a document.
///
/// A page holds its source, its own renderer options and a cover flag. It is
/// never modified by the document that renders it, so the same page may be
/// added to several documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    source: PageSource,
    options: OptionSet,
    cover: bool,
}

impl Page {
    fn new(source: PageSource) -> Self {
        Self {
            source,
            options: OptionSet::new(),
            cover: false,
        }
    }

    /// Create a page from a file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(PageSource::File(path.into()))
    }

    /// Create a page from a URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self::new(PageSource::Url(url.into()))
    }

    /// Create a page by buffering everything a reader yields.
    ///
    /// # Example
    ///
    /// ```
    /// use wkpdf::Page;
    ///
    /// let html = "<html><body><h1>Hello</h1></body></html>";
    /// let page = Page::from_reader(html.as_bytes())?;
    /// assert!(page.is_reader());
    /// # Ok::<(), wkpdf::Error>(())
    /// ```
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::from_bytes(buf))
    }

    /// Create a page from HTML bytes already in memory.
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self::new(PageSource::Content(content.into()))
    }

    /// Create a page from an HTML string.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self::from_bytes(html.into().into_bytes())
    }

    /// Add page options, returning the page.
    pub fn with_options<I, O>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: PdfOption,
    {
        self.options.extend(options);
        self
    }

    /// Append page options in place.
    pub fn add_options<I, O>(&mut self, options: I)
    where
        I: IntoIterator<Item = O>,
        O: PdfOption,
    {
        self.options.extend(options);
    }

    /// Mark the page as a cover, returning the page.
    pub fn cover(mut self) -> Self {
        self.cover = true;
        self
    }

    /// Mark the page as a cover.
    pub fn set_cover(&mut self) {
        self.cover = true;
    }

    /// Check if the page is a cover.
    pub fn is_cover(&self) -> bool {
        self.cover
    }

    /// Check if the page content is held in memory.
    pub fn is_reader(&self) -> bool {
        matches!(self.source, PageSource::Content(_))
    }

    /// The page source.
    pub fn source(&self) -> &PageSource {
        &self.source
    }

    /// Buffered HTML, for in-memory pages.
    pub fn content(&self) -> Option<&[u8]> {
        match &self.source {
            PageSource::Content(buf) => Some(buf),
            _ => None,
        }
    }

    /// Page options in insertion order.
    pub fn options(&self) -> &[String] {
        self.options.as_slice()
    }

    /// The literal source token for file and URL pages.
    pub(crate) fn literal_token(&self) -> Option<String> {
        match &self.source {
            PageSource::File(path) => Some(path_token(path)),
            PageSource::Url(url) => Some(url.clone()),
            PageSource::Content(_) => None,
        }
    }
}

pub(crate) fn path_token(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
