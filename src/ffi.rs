//! C-ABI FFI bindings for cross-language integration.
//!
//! Every call renders with the configuration from [`RendererConfig::from_env`],
//! so hosts point at custom executables through environment variables.

use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::ptr;

use crate::{Document, Page, RendererConfig};

/// Result structure returned by FFI functions.
#[repr(C)]
pub struct WkpdfResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message (null if succeeded). Must be freed with `wkpdf_free_result`.
    pub error: *mut c_char,
}

impl WkpdfResult {
    fn success() -> Self {
        Self {
            success: true,
            error: ptr::null_mut(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            error: CString::new(message).unwrap_or_default().into_raw(),
        }
    }

    fn from_result(result: crate::Result<()>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, WkpdfResult> {
    if ptr.is_null() {
        return Err(WkpdfResult::error(format!("{} cannot be null", name)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| WkpdfResult::error(format!("Invalid UTF-8 {}", name)))
}

/// Render an HTML file (or URL) to a PDF file.
///
/// # Safety
///
/// `input` and `output` must be valid null-terminated UTF-8 strings.
/// The returned result must be freed with `wkpdf_free_result`.
#[no_mangle]
pub unsafe extern "C" fn wkpdf_render_file(
    input: *const c_char,
    output: *const c_char,
) -> WkpdfResult {
    let input = match str_arg(input, "input") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let output = match str_arg(output, "output") {
        Ok(s) => s,
        Err(e) => return e,
    };

    WkpdfResult::from_result(render_file_internal(input, Path::new(output)))
}

fn render_file_internal(input: &str, output: &Path) -> crate::Result<()> {
    let page = if input.starts_with("http://") || input.starts_with("https://") {
        Page::url(input)
    } else {
        Page::file(input)
    };
    let mut doc = Document::with_config(RendererConfig::from_env()?);
    doc.add_page(page);
    doc.write_to_file(output)
}

/// Render an in-memory HTML string to a PDF file.
///
/// # Safety
///
/// `html` and `output` must be valid null-terminated UTF-8 strings.
/// The returned result must be freed with `wkpdf_free_result`.
#[no_mangle]
pub unsafe extern "C" fn wkpdf_render_html(
    html: *const c_char,
    output: *const c_char,
) -> WkpdfResult {
    let html = match str_arg(html, "html") {
        Ok(s) => s,
        Err(e) => return e,
    };
    let output = match str_arg(output, "output") {
        Ok(s) => s,
        Err(e) => return e,
    };

    WkpdfResult::from_result(render_html_internal(html, Path::new(output)))
}

fn render_html_internal(html: &str, output: &Path) -> crate::Result<()> {
    let mut doc = Document::with_config(RendererConfig::from_env()?);
    doc.add_page(Page::from_html(html));
    doc.write_to_file(output)
}

/// Check if a file starts with a PDF header.
///
/// # Safety
///
/// The `path` must be a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn wkpdf_is_pdf(path: *const c_char) -> bool {
    match str_arg(path, "path") {
        Ok(s) => crate::detect::is_pdf(s),
        Err(e) => {
            wkpdf_free_result(e);
            false
        }
    }
}

/// Free a result returned by wkpdf.
///
/// # Safety
///
/// The `result` must have been returned by a wkpdf function.
/// This function should only be called once per result.
#[no_mangle]
pub unsafe extern "C" fn wkpdf_free_result(result: WkpdfResult) {
    if !result.error.is_null() {
        drop(CString::from_raw(result.error));
    }
}

/// Get the version of the wkpdf library.
///
/// The returned string is statically allocated and should not be freed.
#[no_mangle]
pub extern "C" fn wkpdf_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
