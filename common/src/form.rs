use std::collections::HashMap;

use thiserror::Error;

/// Decoded `application/x-www-form-urlencoded` body. Values are kept verbatim.
pub type FormParams = HashMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormDecodeError {
    #[error("form pair `{0}` has no `=` separator")]
    MissingSeparator(String),
}

/// Splits `key=value&key=value` without percent-decoding. Later duplicates win.
pub fn decode_form(body: &str) -> Result<FormParams, FormDecodeError> {
    let mut params = FormParams::new();
    for pair in body.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(FormDecodeError::MissingSeparator(pair.to_string()));
        };
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

/// Like [`decode_form`], but a malformed body yields no parameters at all.
pub fn decode_form_or_empty(body: &str) -> FormParams {
    match decode_form(body) {
        Ok(params) => params,
        Err(err) => {
            tracing::debug!("discarding form body: {err}");
            FormParams::new()
        }
    }
}
