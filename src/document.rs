//! Documents: ordered pages plus document options, rendered to one PDF.
//!
//! The renderer accepts at most one page on stdin. How in-memory pages reach
//! it depends on how many there are:
//!
//! - none: every page is a path or URL, nothing is piped;
//! - one: that page becomes the stdin sentinel `-` and its bytes are piped;
//! - two or more: each is written to `page%08d.html` inside a fresh temp
//!   directory, which is removed again before the render call returns.

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::exec::{self, Invocation};
use crate::option::{OptionSet, PdfOption};
use crate::page::{path_token, Page};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Source token telling the renderer to read the page from stdin.
pub const STDIN_SENTINEL: &str = "-";

/// Token preceding the source of a cover page.
pub const COVER_KEYWORD: &str = "cover";

/// Prefix of temp directories created for in-memory pages.
pub const TEMP_DIR_PREFIX: &str = "temp";

/// File name used for the in-memory page at `index` when staged to disk.
pub fn temp_page_name(index: usize) -> String {
    format!("page{:08}.html", index)
}

/// How in-memory page content is handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategy {
    /// No in-memory pages
    NoStdin,
    /// Exactly one in-memory page, piped through stdin
    Stdin {
        /// Index of the piped page
        page: usize,
    },
    /// Several in-memory pages, each written to a temp file
    TempFiles,
}

/// The effective source token of every page, by page index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSources {
    tokens: Vec<String>,
}

impl ResolvedSources {
    /// Resolve every page of `doc`.
    ///
    /// `staging_dir` is the directory holding staged in-memory pages; when it
    /// is `None` such pages resolve to their bare temp file name.
    pub fn resolve(doc: &Document, staging_dir: Option<&Path>) -> Self {
        let strategy = doc.input_strategy();
        let tokens = doc
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| match page.literal_token() {
                Some(token) => token,
                None => match strategy {
                    InputStrategy::Stdin { .. } => STDIN_SENTINEL.to_string(),
                    _ => match staging_dir {
                        Some(dir) => path_token(&dir.join(temp_page_name(index))),
                        None => temp_page_name(index),
                    },
                },
            })
            .collect();
        Self { tokens }
    }

    /// Token for the page at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// All tokens in page order.
    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }
}

/// Everything the renderer needs for one run.
///
/// Owns the temp directory of staged pages, if any. Call [`close`] to
/// remove it and learn whether removal worked; dropping removes it too but
/// silently.
///
/// [`close`]: StagedInput::close
#[derive(Debug)]
pub struct StagedInput<'a> {
    sources: ResolvedSources,
    stdin: Option<&'a [u8]>,
    temp_dir: Option<TempDir>,
}

impl<'a> StagedInput<'a> {
    /// Resolved page sources.
    pub fn sources(&self) -> &ResolvedSources {
        &self.sources
    }

    /// Bytes to pipe through stdin.
    pub fn stdin(&self) -> Option<&'a [u8]> {
        self.stdin
    }

    /// Temp directory holding staged pages.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Remove the temp directory, if one was created.
    pub fn close(self) -> std::result::Result<(), (PathBuf, std::io::Error)> {
        match self.temp_dir {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                log::debug!("Removing temp directory {}", path.display());
                dir.close().map_err(|e| (path, e))
            }
            None => Ok(()),
        }
    }
}

/// A single PDF document.
///
/// # Example
///
/// ```no_run
/// use wkpdf::{Document, Flag, Page};
///
/// let mut doc = Document::new();
/// doc.add_options([Flag::with_value("--page-size", "A4")]);
/// doc.add_cover(Page::from_html("<h1>Quarterly report</h1>"));
/// doc.add_pages([Page::file("summary.html"), Page::url("https://example.com/charts")]);
/// doc.write_to_file("report.pdf")?;
/// # Ok::<(), wkpdf::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Document {
    pages: Vec<Page>,
    options: OptionSet,
    config: RendererConfig,
}

impl Document {
    /// Create an empty document using the default renderer configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document with an explicit renderer configuration.
    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            pages: Vec::new(),
            options: OptionSet::new(),
            config,
        }
    }

    /// Renderer configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Append a page. Pages render in the order they are added.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Append pages, preserving order.
    pub fn add_pages<I: IntoIterator<Item = Page>>(&mut self, pages: I) {
        self.pages.extend(pages);
    }

    /// Append a page marked as cover.
    ///
    /// The page is appended, not moved to the front; place the cover first
    /// if the renderer should show it first.
    pub fn add_cover(&mut self, page: Page) {
        self.pages.push(page.cover());
    }

    /// Append document options, preserving order.
    pub fn add_options<I, O>(&mut self, options: I)
    where
        I: IntoIterator<Item = O>,
        O: PdfOption,
    {
        self.options.extend(options);
    }

    /// Pages in render order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Document option tokens.
    pub fn options(&self) -> &[String] {
        self.options.as_slice()
    }

    /// Number of pages whose content is held in memory.
    pub fn count_reader_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_reader()).count()
    }

    /// How in-memory content will be handed to the renderer.
    pub fn input_strategy(&self) -> InputStrategy {
        match self.count_reader_pages() {
            0 => InputStrategy::NoStdin,
            1 => InputStrategy::Stdin {
                page: self
                    .pages
                    .iter()
                    .position(Page::is_reader)
                    .unwrap_or_default(),
            },
            _ => InputStrategy::TempFiles,
        }
    }

    /// Build the argument vector for the given resolved sources.
    ///
    /// Document options come first, then for each page its options followed
    /// by its source token (preceded by `cover` for cover pages).
    pub fn compute_arguments(&self, sources: &ResolvedSources) -> Vec<String> {
        let mut args = self.options.as_slice().to_vec();
        for (index, page) in self.pages.iter().enumerate() {
            args.extend(page.options().iter().cloned());
            if page.is_cover() {
                args.push(COVER_KEYWORD.to_string());
            }
            if let Some(token) = sources.get(index) {
                args.push(token.to_string());
            }
        }
        args
    }

    /// Argument vector without staging anything to disk.
    ///
    /// Staged pages appear as bare `page%08d.html` names.
    pub fn arguments(&self) -> Vec<String> {
        self.compute_arguments(&ResolvedSources::resolve(self, None))
    }

    /// Prepare the renderer input: pick the stdin page or write temp files.
    pub fn stage(&self) -> Result<StagedInput<'_>> {
        match self.input_strategy() {
            InputStrategy::NoStdin => Ok(StagedInput {
                sources: ResolvedSources::resolve(self, None),
                stdin: None,
                temp_dir: None,
            }),
            InputStrategy::Stdin { page } => {
                log::debug!("Piping page {} through stdin", page);
                Ok(StagedInput {
                    sources: ResolvedSources::resolve(self, None),
                    stdin: self.pages[page].content(),
                    temp_dir: None,
                })
            }
            InputStrategy::TempFiles => {
                let temp_dir = tempfile::Builder::new()
                    .prefix(TEMP_DIR_PREFIX)
                    .tempdir_in(&self.config.temp_root)
                    .map_err(|e| {
                        Error::setup(
                            format!(
                                "creating temp directory in {}",
                                self.config.temp_root.display()
                            ),
                            e,
                        )
                    })?;
                log::debug!(
                    "Staging {} pages in {}",
                    self.count_reader_pages(),
                    temp_dir.path().display()
                );

                for (index, page) in self.pages.iter().enumerate() {
                    let Some(content) = page.content() else {
                        continue;
                    };
                    let path = temp_dir.path().join(temp_page_name(index));
                    fs::write(&path, content).map_err(|e| {
                        Error::setup(format!("writing {}", path.display()), e)
                    })?;
                }

                Ok(StagedInput {
                    sources: ResolvedSources::resolve(self, Some(temp_dir.path())),
                    stdin: None,
                    temp_dir: Some(temp_dir),
                })
            }
        }
    }

    /// Render the document and return the PDF bytes.
    ///
    /// The direct renderer is tried first, then the display-wrapped one.
    /// Any temp directory is removed before returning; if that removal fails
    /// after a successful render the result is [`Error::Cleanup`], which
    /// still carries the PDF.
    pub fn render(&self) -> Result<Vec<u8>> {
        let staged = self.stage()?;
        let args = self.compute_arguments(staged.sources());
        log::debug!("Renderer arguments: {:?}", args);

        let attempts = Invocation::chain(&self.config);
        let result = exec::run_chain(&attempts, &args, staged.stdin(), &self.config);

        match (result, staged.close()) {
            (Ok(output), Ok(())) => Ok(output),
            (Ok(output), Err((path, source))) => Err(Error::Cleanup {
                path,
                source,
                output,
            }),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err((path, source))) => {
                log::warn!(
                    "Failed to remove temp directory {}: {}",
                    path.display(),
                    source
                );
                Err(err)
            }
        }
    }

    /// Render the document and write it to `path`, replacing any existing file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let output = self.render()?;
        let path = path.as_ref();

        let create_error = |source: std::io::Error| Error::CreateFile {
            path: path.to_path_buf(),
            source,
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let mut file = options.open(path).map_err(create_error)?;
        file.write_all(&output).map_err(create_error)?;
        file.flush().map_err(create_error)?;
        Ok(())
    }

    /// Render the document and copy it to `writer`.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let output = self.render()?;
        writer.write_all(&output).map_err(Error::WriteOutput)?;
        writer.flush().map_err(Error::WriteOutput)?;
        Ok(())
    }

    /// Render on tokio's blocking pool.
    #[cfg(feature = "async")]
    pub async fn render_async(&self) -> Result<Vec<u8>> {
        let doc = self.clone();
        tokio::task::spawn_blocking(move || doc.render())
            .await
            .map_err(|e| Error::Other(format!("render task failed: {}", e)))?
    }
}

/// Render independent documents in parallel.
///
/// Results are returned in the same order as `docs`.
pub fn render_all(docs: &[Document]) -> Vec<Result<Vec<u8>>> {
    use rayon::prelude::*;

    docs.par_iter().map(Document::render).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::Flag;

    fn doc_in(root: &Path) -> Document {
        Document::with_config(RendererConfig::new().with_temp_root(root))
    }

    #[test]
    fn test_arguments_file_and_url_pages() {
        let mut doc = Document::new();
        doc.add_options([Flag::with_value("--page-size", "A4"), Flag::new("-q")]);
        doc.add_page(Page::file("a.html").with_options(["--zoom", "2"]));
        doc.add_page(Page::url("https://example.com/b"));

        assert_eq!(doc.count_reader_pages(), 0);
        assert_eq!(doc.input_strategy(), InputStrategy::NoStdin);
        assert_eq!(
            doc.arguments(),
            vec![
                "--page-size",
                "A4",
                "-q",
                "--zoom",
                "2",
                "a.html",
                "https://example.com/b"
            ]
        );
    }

    #[test]
    fn test_single_reader_uses_stdin_sentinel() {
        let mut doc = Document::new();
        doc.add_pages([Page::file("a.html"), Page::from_html("<p>b</p>")]);

        assert_eq!(doc.input_strategy(), InputStrategy::Stdin { page: 1 });
        let staged = doc.stage().unwrap();
        assert_eq!(staged.sources().as_slice(), &["a.html", "-"]);
        assert_eq!(staged.stdin(), Some(&b"<p>b</p>"[..]));
        assert!(staged.temp_dir().is_none());
        staged.close().unwrap();
    }

    #[test]
    fn test_cover_does_not_reorder() {
        let mut doc = Document::new();
        doc.add_page(Page::file("first.html"));
        doc.add_cover(Page::file("cover.html"));
        doc.add_page(Page::file("last.html"));

        assert!(doc.pages()[1].is_cover());
        assert_eq!(
            doc.arguments(),
            vec!["first.html", "cover", "cover.html", "last.html"]
        );
    }

    #[test]
    fn test_compute_arguments_is_idempotent() {
        let mut doc = Document::new();
        doc.add_options(["--grayscale"]);
        doc.add_pages([Page::from_html("a"), Page::from_html("b")]);

        let sources = ResolvedSources::resolve(&doc, Some(Path::new("/tmp/tempX")));
        let first = doc.compute_arguments(&sources);
        let second = doc.compute_arguments(&sources);
        assert_eq!(first, second);
        assert_eq!(doc.arguments(), doc.arguments());
    }

    #[test]
    fn test_stage_multiple_readers_writes_temp_files() {
        let root = tempfile::tempdir().unwrap();
        let mut doc = doc_in(root.path());
        doc.add_pages([
            Page::from_html("<p>zero</p>"),
            Page::file("one.html"),
            Page::from_html("<p>two</p>"),
        ]);

        assert_eq!(doc.count_reader_pages(), 2);
        let staged = doc.stage().unwrap();
        let dir = staged.temp_dir().unwrap().to_path_buf();
        assert!(dir.starts_with(root.path()));
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMP_DIR_PREFIX));
        assert!(staged.stdin().is_none());

        let first = dir.join("page00000000.html");
        let third = dir.join("page00000002.html");
        assert_eq!(fs::read(&first).unwrap(), b"<p>zero</p>");
        assert_eq!(fs::read(&third).unwrap(), b"<p>two</p>");
        assert_eq!(
            staged.sources().as_slice(),
            &[
                first.to_string_lossy().into_owned(),
                "one.html".to_string(),
                third.to_string_lossy().into_owned(),
            ]
        );

        staged.close().unwrap();
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stage_fails_without_temp_root() {
        let root = tempfile::tempdir().unwrap();
        let mut doc = doc_in(&root.path().join("does-not-exist"));
        doc.add_pages([Page::from_html("a"), Page::from_html("b")]);

        let err = doc.stage().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Setup);
    }

    #[test]
    fn test_page_reuse_across_documents() {
        let shared = Page::from_html("<p>shared</p>");

        let mut single = Document::new();
        single.add_page(shared.clone());
        let mut multi = Document::new();
        multi.add_pages([shared.clone(), shared.clone()]);

        assert_eq!(single.arguments(), vec!["-"]);
        assert_eq!(
            multi.arguments(),
            vec!["page00000000.html", "page00000001.html"]
        );
        // The original page is untouched by either document
        assert_eq!(shared.content(), Some(&b"<p>shared</p>"[..]));
    }

    #[test]
    fn test_temp_page_name() {
        assert_eq!(temp_page_name(0), "page00000000.html");
        assert_eq!(temp_page_name(42), "page00000042.html");
    }
}
