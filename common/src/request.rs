use crate::form::{decode_form_or_empty, FormParams};

const POST_TOKEN: &str = "POST";
const HEADER_TERMINATOR: &str = "\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRequest {
    /// Any request that does not start with `POST`.
    Get,
    Post(FormParams),
}

impl ParsedRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post(_) => "POST",
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        match self {
            Self::Get => None,
            Self::Post(params) => params.get(key).map(String::as_str),
        }
    }
}

/// Classifies a raw request chunk. Returns `None` when the peer sent nothing.
pub fn parse_request(raw: &[u8]) -> Option<ParsedRequest> {
    if raw.is_empty() {
        return None;
    }
    let text: String = raw.utf8_chunks().map(|chunk| chunk.valid()).collect();
    Some(parse_request_text(&text))
}

pub fn parse_request_text(text: &str) -> ParsedRequest {
    if !text.starts_with(POST_TOKEN) {
        return ParsedRequest::Get;
    }

    let body = text
        .split_once(HEADER_TERMINATOR)
        .map(|(_, body)| body)
        .unwrap_or_default();
    ParsedRequest::Post(decode_form_or_empty(body))
}
