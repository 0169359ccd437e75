//! Helpers for walking parsed JSON documents.
//!
//! Every structural fault (missing key, wrong type, index out of range, empty
//! array) is reported as [`CheckError::MalformedResponse`] so callers only
//! deal with one error for "the document does not look as expected".

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CheckError, MalformedCause};

/// Deserialize a whole document into `T`.
pub(crate) fn deserialize<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, CheckError> {
    serde_json::from_value(value).map_err(|error| CheckError::malformed(url, error))
}

pub(crate) fn field<'a>(url: &str, value: &'a Value, name: &str) -> Result<&'a Value, CheckError> {
    value
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| CheckError::malformed(url, MalformedCause::MissingField(name.to_string())))
}

pub(crate) fn str_field<'a>(
    url: &str,
    value: &'a Value,
    name: &str,
) -> Result<&'a str, CheckError> {
    field(url, value, name)?.as_str().ok_or_else(|| {
        CheckError::malformed(
            url,
            MalformedCause::WrongType {
                field: name.to_string(),
                expected: "a string",
            },
        )
    })
}

pub(crate) fn element<'a, T>(url: &str, items: &'a [T], index: usize) -> Result<&'a T, CheckError> {
    items.get(index).ok_or_else(|| {
        CheckError::malformed(
            url,
            MalformedCause::IndexOutOfRange {
                index,
                len: items.len(),
            },
        )
    })
}

pub(crate) fn non_empty<'a, T>(
    url: &str,
    items: &'a [T],
    what: &str,
) -> Result<&'a [T], CheckError> {
    if items.is_empty() {
        Err(CheckError::malformed(url, MalformedCause::Empty(what.to_string())))
    } else {
        Ok(items)
    }
}
