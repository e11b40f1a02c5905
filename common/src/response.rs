#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `200 OK` with an HTML body.
    Page(String),
    /// `204 No Content`, no body.
    NoContent,
}

impl Response {
    pub fn status_line(&self) -> &'static str {
        match self {
            Self::Page(_) => "HTTP/1.1 200 OK",
            Self::NoContent => "HTTP/1.1 204 No Content",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Page(body) => format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                self.status_line(),
                body.len(),
                body
            )
            .into_bytes(),
            Self::NoContent => format!("{}\r\n\r\n", self.status_line()).into_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_content_is_bare_status_line() {
        assert_eq!(
            Response::NoContent.to_bytes(),
            b"HTTP/1.1 204 No Content\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn page_carries_html_headers_and_body() {
        let bytes = Response::Page("<p>hi</p>".to_string()).to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>hi</p>"));
    }
}
