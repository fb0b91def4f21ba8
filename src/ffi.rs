//! FFI interface for C/C++ hosts
//!
//! Provides C-compatible functions for running a spec table over an HTML
//! snapshot. Tables go in and records come out as JSON.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use serde::Serialize;

use crate::document::Document;
use crate::engine::{extract_table, ExtractedField};
use crate::error::{ExtractError, Result};
use crate::layout::{plan_inputs, FormLayout, InputField};
use crate::spec::SpecTable;

/// Result struct returned to the host
/// Both pointers are owned by Rust and must be freed via field_extract_free
#[repr(C)]
pub struct ExtractionResultFFI {
    /// JSON-serialized result (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if extraction failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

#[derive(Serialize)]
struct RecordJson<'a> {
    table: &'a str,
    extracted_at: String,
    fields: &'a [ExtractedField],
}

#[derive(Serialize)]
struct InputPlanJson {
    layout: FormLayout,
    inputs: Vec<InputJson>,
}

#[derive(Serialize)]
struct InputJson {
    field: InputField,
    selector: Option<String>,
}

/// Extract every field of a spec table from an HTML snapshot.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `table_json` - JSON-serialized SpecTable (null-terminated)
///
/// # Returns
/// ExtractionResultFFI with either json_ptr set (success) or error_ptr set (failure)
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `table_json` must be a valid null-terminated C string
/// - Caller must free the result via `field_extract_free`
#[no_mangle]
pub unsafe extern "C" fn field_extract_html(
    html_ptr: *const c_char,
    html_len: usize,
    table_json: *const c_char,
) -> ExtractionResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    let table_str = if table_json.is_null() {
        return make_error_result("Table JSON is null");
    } else {
        match CStr::from_ptr(table_json).to_str() {
            Ok(s) => s,
            Err(_) => return make_error_result("Invalid UTF-8 in table JSON"),
        }
    };

    into_result(extract_json(html, table_str))
}

/// Classify a lookup form and resolve its input selectors.
///
/// # Safety
/// Same as field_extract_html
#[no_mangle]
pub unsafe extern "C" fn field_extract_plan_inputs(
    html_ptr: *const c_char,
    html_len: usize,
) -> ExtractionResultFFI {
    let html = match read_html(html_ptr, html_len) {
        Ok(html) => html,
        Err(msg) => return make_error_result(msg),
    };

    into_result(plan_json(html))
}

/// Free an ExtractionResultFFI returned by this library
///
/// # Safety
/// - `result` must have been returned by a `field_extract_*` function
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn field_extract_free(result: ExtractionResultFFI) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_html<'a>(
    html_ptr: *const c_char,
    html_len: usize,
) -> std::result::Result<&'a str, &'static str> {
    if html_ptr.is_null() || html_len == 0 {
        return Ok("");
    }
    let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
    std::str::from_utf8(slice).map_err(|_| "Invalid UTF-8 in HTML content")
}

fn extract_json(html: &str, table_json: &str) -> Result<String> {
    let table = SpecTable::from_json(table_json)?;
    let document = Document::parse(html);
    let record = extract_table(&document, &table, Vec::new())?;

    Ok(serde_json::to_string(&RecordJson {
        table: &table.name,
        extracted_at: record.extracted_at().to_rfc3339(),
        fields: record.fields(),
    })?)
}

fn plan_json(html: &str) -> Result<String> {
    let document = Document::parse(html);
    document.ensure_valid()?;
    let plan = plan_inputs(&document)?;

    Ok(serde_json::to_string(&InputPlanJson {
        layout: plan.layout,
        inputs: plan
            .inputs
            .into_iter()
            .map(|i| InputJson {
                field: i.field,
                selector: i.selector,
            })
            .collect(),
    })?)
}

fn into_result(result: Result<String>) -> ExtractionResultFFI {
    match result {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => ExtractionResultFFI {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&error_message(&e)),
    }
}

fn error_message(e: &ExtractError) -> String {
    match e {
        ExtractError::Json(inner) => format!("Failed to parse table JSON: {inner}"),
        other => other.to_string(),
    }
}

// Helper to create error result
fn make_error_result(msg: &str) -> ExtractionResultFFI {
    let error_cstr = CString::new(msg)
        .unwrap_or_else(|_| CString::new("Unknown error").unwrap_or_default());
    ExtractionResultFFI {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}
