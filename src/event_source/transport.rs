//! The network seam under the calendar sources

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavRequest {
    /// `PROPFIND` or `REPORT`
    pub method: &'static str,
    pub url: String,
    pub depth: Option<u8>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one WebDAV request. Any status code is a successful exchange, only transport
/// failures are errors.
pub trait DavTransport {
    fn send(&self, request: &DavRequest) -> Result<DavResponse>;
}

#[cfg(feature = "http")]
pub use http::HttpDavTransport;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use log::debug;
    use reqwest::blocking::Client;
    use reqwest::header::CONTENT_TYPE;
    use reqwest::Method;

    use super::{DavRequest, DavResponse, DavTransport};
    use crate::error::{Error, Result};

    const USER_AGENT: &str = concat!("dot-calendar/", env!("CARGO_PKG_VERSION"));

    /// Blocking client with basic auth
    pub struct HttpDavTransport {
        client: Client,
        username: String,
        password: String,
    }

    impl HttpDavTransport {
        pub fn new(username: &str, password: &str, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()?;
            Ok(Self {
                client,
                username: username.to_string(),
                password: password.to_string(),
            })
        }
    }

    impl DavTransport for HttpDavTransport {
        fn send(&self, request: &DavRequest) -> Result<DavResponse> {
            let method = Method::from_bytes(request.method.as_bytes())
                .map_err(|e| Error::Config(format!("bad method {}: {e}", request.method)))?;
            debug!("{} {}", request.method, request.url);

            let mut builder = self
                .client
                .request(method, &request.url)
                .basic_auth(&self.username, Some(&self.password))
                .header(CONTENT_TYPE, "application/xml; charset=utf-8")
                .body(request.body.clone());
            if let Some(depth) = request.depth {
                builder = builder.header("Depth", depth.to_string());
            }

            let response = builder.send()?;
            let status = response.status().as_u16();
            let body = response.text()?;
            Ok(DavResponse { status, body })
        }
    }
}
