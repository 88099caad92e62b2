//! Form decoding module
//!
//! Looks up a form field the way browsers submit it: the URL-encoded body of
//! a POST/PUT/PATCH first, then the query string.

use hyper::Method;
use percent_encoding::percent_decode;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request parts a form value can come from
pub struct FormSource<'a> {
    pub method: &'a Method,
    pub content_type: Option<&'a str>,
    pub query: Option<&'a str>,
    pub body: &'a [u8],
}

/// First value of `key`, body fields taking precedence over query fields
///
/// Values are returned as the decoded bytes, which need not be UTF-8.
/// Malformed percent escapes are kept literally.
pub fn form_value(source: &FormSource<'_>, key: &str) -> Option<Vec<u8>> {
    if has_form_body(source.method, source.content_type) {
        if let Some(value) = lookup(source.body, key) {
            return Some(value);
        }
    }
    source.query.and_then(|q| lookup(q.as_bytes(), key))
}

fn has_form_body(method: &Method, content_type: Option<&str>) -> bool {
    let accepts_body = matches!(*method, Method::POST | Method::PUT | Method::PATCH);
    let is_form = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));
    accepts_body && is_form
}

fn lookup(encoded: &[u8], key: &str) -> Option<Vec<u8>> {
    encoded
        .split(|&b| b == b'&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (name, value) = match pair.iter().position(|&b| b == b'=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, &[][..]),
            };
            (decode_component(name) == key.as_bytes()).then(|| decode_component(value))
        })
}

/// Decode one `application/x-www-form-urlencoded` component
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}
