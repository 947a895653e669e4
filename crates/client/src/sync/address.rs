//! Feed address construction.
//!
//! The feed lives on the same host as the page, on a fixed port, at
//! `/ws/{url-encoded subscription key}`. The socket scheme is derived from the
//! page origin, so a page served over TLS always dials `wss://`.

use url::Url;

use super::error::AddressError;

/// Scheme and host of the page hosting the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin {
    secure: bool,
    host: String,
}

impl PageOrigin {
    /// Parse an origin such as `https://orders.example.com` or
    /// `http://localhost:3000`. Any port on the origin is ignored.
    pub fn parse(origin: &str) -> Result<Self, AddressError> {
        let url = Url::parse(origin.trim())
            .map_err(|_| AddressError::InvalidOrigin(origin.to_string()))?;
        let secure = match url.scheme() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            other => return Err(AddressError::UnsupportedScheme(other.to_string())),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AddressError::MissingHost(origin.to_string()))?
            .to_string();
        Ok(Self { secure, host })
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn socket_scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }
}

/// Build the feed URL for a subscription key.
pub fn feed_url(origin: &PageOrigin, port: u16, key: &str) -> Result<String, AddressError> {
    if key.trim().is_empty() {
        return Err(AddressError::EmptyKey);
    }
    Ok(format!(
        "{}://{}:{}/ws/{}",
        origin.socket_scheme(),
        origin.host,
        port,
        urlencoding::encode(key)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_page_dials_wss() {
        let origin = PageOrigin::parse("https://orders.example.com").unwrap();
        assert!(origin.is_secure());
        assert_eq!(
            feed_url(&origin, 8000, "sheet-1").unwrap(),
            "wss://orders.example.com:8000/ws/sheet-1"
        );
    }

    #[test]
    fn page_port_is_replaced_by_feed_port() {
        let origin = PageOrigin::parse("http://localhost:3000").unwrap();
        assert_eq!(origin.host(), "localhost");
        assert_eq!(
            feed_url(&origin, 8000, "abc").unwrap(),
            "ws://localhost:8000/ws/abc"
        );
    }

    #[test]
    fn key_is_url_encoded() {
        let origin = PageOrigin::parse("http://127.0.0.1").unwrap();
        let url = feed_url(
            &origin,
            8000,
            "https://docs.google.com/spreadsheets/d/1AbC/edit#gid=0",
        )
        .unwrap();
        assert_eq!(
            url,
            "ws://127.0.0.1:8000/ws/https%3A%2F%2Fdocs.google.com%2Fspreadsheets%2Fd%2F1AbC%2Fedit%23gid%3D0"
        );
    }

    #[test]
    fn rejects_unusable_origins_and_keys() {
        assert!(matches!(
            PageOrigin::parse("file:///tmp/index.html"),
            Err(AddressError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            PageOrigin::parse("not an origin"),
            Err(AddressError::InvalidOrigin(_))
        ));
        let origin = PageOrigin::parse("https://orders.example.com").unwrap();
        assert_eq!(feed_url(&origin, 8000, "  "), Err(AddressError::EmptyKey));
    }
}
