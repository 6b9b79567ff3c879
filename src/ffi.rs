//! FFI interface for C/C++ callers
//!
//! Scrape results are handed back as JSON, flow text as plain text. Every
//! string crossing the boundary is owned by Rust and must be released with
//! `scraperboard_free_result`.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use scraper::Html;

use crate::markdown::{markdownify_html, render_flow_text};
use crate::selection::Selection;
use crate::template::Scraper;

/// Result struct returned to C
/// Exactly one of the two pointers is set
#[repr(C)]
pub struct ScrapeResultFFI {
    /// Output (null-terminated): JSON for scrapes, text for markdown
    pub output_ptr: *mut c_char,
    /// Error message (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Scrape HTML with an XML template.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `template_xml` - Scraper template document (null-terminated)
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `template_xml` must be a valid null-terminated C string
/// - Caller must free the result via `scraperboard_free_result`
#[no_mangle]
pub unsafe extern "C" fn scraperboard_scrape(
    html_ptr: *const c_char,
    html_len: usize,
    template_xml: *const c_char,
) -> ScrapeResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    if template_xml.is_null() {
        return make_error_result("Template is null");
    }
    let template = match CStr::from_ptr(template_xml).to_str() {
        Ok(s) => s,
        Err(_) => return make_error_result("Invalid UTF-8 in template"),
    };

    let scraper = match Scraper::from_xml_str(template) {
        Ok(scraper) => scraper,
        Err(e) => return make_error_result(&e.to_string()),
    };

    let document = Html::parse_document(html);
    match scraper.scrape_document(&document) {
        Ok(record) => match serde_json::to_string(&record) {
            Ok(json) => make_output_result(json),
            Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
        },
        Err(e) => make_error_result(&e.to_string()),
    }
}

/// Render HTML as flow text. A null `selector` renders the whole document.
///
/// # Safety
/// Same as `scraperboard_scrape`; `selector` may be null
#[no_mangle]
pub unsafe extern "C" fn scraperboard_markdown(
    html_ptr: *const c_char,
    html_len: usize,
    selector: *const c_char,
) -> ScrapeResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    if selector.is_null() {
        return make_output_result(markdownify_html(html));
    }
    let selector = match CStr::from_ptr(selector).to_str() {
        Ok(s) => s,
        Err(_) => return make_error_result("Invalid UTF-8 in selector"),
    };

    let document = Html::parse_document(html);
    match Selection::document(&document).find(selector) {
        Ok(selection) => make_output_result(render_flow_text(&selection)),
        Err(e) => make_error_result(&e.to_string()),
    }
}

/// Free a ScrapeResultFFI returned by this library
///
/// # Safety
/// - `result` must have been returned by `scraperboard_scrape` or `scraperboard_markdown`
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn scraperboard_free_result(result: ScrapeResultFFI) {
    if !result.output_ptr.is_null() {
        drop(CString::from_raw(result.output_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_html<'a>(html_ptr: *const c_char, html_len: usize) -> Result<&'a str, &'static str> {
    if html_ptr.is_null() || html_len == 0 {
        return Ok("");
    }
    let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
    std::str::from_utf8(slice).map_err(|_| "Invalid UTF-8 in HTML content")
}

fn make_output_result(output: String) -> ScrapeResultFFI {
    match CString::new(output) {
        Ok(cstr) => ScrapeResultFFI {
            output_ptr: cstr.into_raw(),
            error_ptr: ptr::null_mut(),
        },
        Err(_) => make_error_result("Result contains null bytes"),
    }
}

// Helper to create error result
fn make_error_result(msg: &str) -> ScrapeResultFFI {
    let error_cstr = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    ScrapeResultFFI {
        output_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}
