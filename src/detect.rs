//! PDF output detection.
//!
//! The renderer writes its result to stdout. A successful exit is only
//! trusted once the bytes start with a `%PDF-x.y` header.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

const HEADER_LEN: usize = PDF_MAGIC.len() + 3;

/// The `x.y` version from a PDF header, if `data` starts with one.
pub fn pdf_version(data: &[u8]) -> Option<&str> {
    let version = data.get(PDF_MAGIC.len()..HEADER_LEN)?;
    if !data.starts_with(PDF_MAGIC) {
        return None;
    }
    match version {
        [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            std::str::from_utf8(version).ok()
        }
        _ => None,
    }
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    pdf_version(data).is_some()
}

/// Check if a file starts with a PDF header. Unreadable files are not PDFs.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64).read_to_end(&mut header).is_ok() && is_pdf_bytes(&header)
}
