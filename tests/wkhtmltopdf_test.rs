//! End-to-end tests against a real `wkhtmltopdf`.
//!
//! Each test returns early when the renderer is not installed.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use wkpdf::{Document, ErrorKind, Page, RendererConfig};

fn renderer_available() -> bool {
    let available = Command::new("wkhtmltopdf")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !available {
        eprintln!("wkhtmltopdf not found on PATH, skipping");
    }
    available
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

struct BadWriter;

impl Write for BadWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "Bad writer doesn't write"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_simple_file_renders_pdf() {
    if !renderer_available() {
        return;
    }
    let mut doc = Document::new();
    doc.add_page(Page::file(fixture("simple.html")));

    let pdf = doc.render().unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn test_missing_file_is_render_error() {
    if !renderer_available() {
        return;
    }
    let mut doc = Document::new();
    doc.add_page(Page::file("test_data/missing.html"));

    let err = doc.render().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().starts_with("Error running"), "{err}");
}

#[test]
fn test_bad_output_path_is_delivery_error() {
    if !renderer_available() {
        return;
    }
    let mut doc = Document::new();
    doc.add_page(Page::file(fixture("simple.html")));

    let err = doc.write_to_file("<>/!//bad.pdf").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Delivery);
}

#[test]
fn test_five_reader_pages_with_cover() {
    if !renderer_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let mut doc = Document::with_config(RendererConfig::new().with_temp_root(root.path()));
    doc.add_cover(Page::from_html("<html><body><h1>Cover</h1></body></html>"));
    for i in 1..5 {
        doc.add_page(Page::from_html(format!(
            "<html><body><h1>Section {i}</h1></body></html>"
        )));
    }

    let pdf = doc.render().unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_failing_writer_is_delivery_error() {
    if !renderer_available() {
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let mut doc = Document::with_config(RendererConfig::new().with_temp_root(root.path()));
    doc.add_pages([
        Page::from_html("<p>one</p>"),
        Page::from_html("<p>two</p>"),
    ]);

    let err = doc.write(&mut BadWriter).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Delivery);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
