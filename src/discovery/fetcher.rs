//! HTTP fetcher with retry support.
//!
//! Non-2xx responses are never turned into errors here: callers get the
//! status back and decide. Only transport failures (DNS, connect, timeout,
//! body read) surface as `Err`.

use crate::types::{HttpConfig, Result};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

/// A response whose status the caller is expected to inspect.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network access used by the recovery pipeline.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// GET a URL and return status plus body.
    async fn get(&self, url: &Url) -> Result<FetchResponse>;

    /// HEAD a URL and return the status only.
    async fn head(&self, url: &Url) -> Result<u16>;
}

/// `reqwest`-backed fetcher with bounded timeouts and retries.
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    /// Create a new fetcher.
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .http1_only()
            .build()?;

        Ok(Self { client, config })
    }

    /// Send a request, retrying transport errors and 5xx responses.
    async fn send(&self, method: Method, url: &Url) -> Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            let result = self.client.request(method.clone(), url.clone()).send().await;
            let retries_left = attempt < self.config.max_retries;

            match result {
                Ok(response) if response.status().is_server_error() && retries_left => {
                    trace!("{} {} returned {}, retrying", method, url, response.status());
                }
                Ok(response) => {
                    debug!("{} {} -> {}", method, url, response.status());
                    return Ok(response);
                }
                Err(e) if retries_left => {
                    trace!("{} {} failed: {}, retrying", method, url, e);
                }
                Err(e) => {
                    if attempt > 0 {
                        warn!("Failed to fetch {} after {} retries: {}", url, attempt, e);
                    } else {
                        debug!("Failed to fetch {}: {}", url, e);
                    }
                    return Err(e.into());
                }
            }

            attempt += 1;
            tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
        }
    }
}

impl Fetch for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        let response = self.send(Method::GET, url).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(FetchResponse { status, body })
    }

    async fn head(&self, url: &Url) -> Result<u16> {
        let response = self.send(Method::HEAD, url).await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SnatchError;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_response_status() {
        let ok = FetchResponse { status: 204, body: Vec::new() };
        let missing = FetchResponse { status: 404, body: b"not found".to_vec() };
        let redirect = FetchResponse { status: 301, body: Vec::new() };

        assert!(ok.is_success());
        assert!(!missing.is_success());
        assert!(!redirect.is_success());
        assert_eq!(missing.text(), "not found");
    }

    #[test]
    fn test_lossy_text() {
        let response = FetchResponse { status: 200, body: vec![b'o', b'k', 0xff] };
        assert!(response.text().starts_with("ok"));
    }

    #[test]
    fn test_fetcher_builds() {
        assert!(HttpFetcher::new(HttpConfig::default()).is_ok());
    }

    fn response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Serve `responses` on loopback, one per connection; the last one repeats.
    fn serve(responses: Vec<String>) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/main.js.map", listener.local_addr().unwrap())).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                read_request(&mut stream);
                let reply = &responses[n.min(responses.len() - 1)];
                let _ = stream.write_all(reply.as_bytes());
                let _ = stream.flush();
            }
        });

        (url, hits)
    }

    fn config(max_retries: u32, timeout_secs: u64) -> HttpConfig {
        HttpConfig {
            timeout_secs,
            max_retries,
            ..HttpConfig::default()
        }
    }

    #[tokio::test]
    async fn test_server_error_retried_until_success() {
        let (url, hits) = serve(vec![
            response("503 Service Unavailable", ""),
            response("200 OK", "{\"version\":3}"),
        ]);
        let fetcher = HttpFetcher::new(config(2, 5)).unwrap();

        let result = fetcher.get(&url).await.unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.text(), "{\"version\":3}");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_server_error_returned_when_retries_exhausted() {
        let (url, hits) = serve(vec![response("502 Bad Gateway", "")]);
        let fetcher = HttpFetcher::new(config(1, 5)).unwrap();

        let result = fetcher.get(&url).await.unwrap();

        assert_eq!(result.status, 502);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let (url, hits) = serve(vec![response("404 Not Found", "missing")]);
        let fetcher = HttpFetcher::new(config(3, 5)).unwrap();

        let result = fetcher.get(&url).await.unwrap();

        assert_eq!(result.status, 404);
        assert!(!result.is_success());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert_eq!(fetcher.head(&url).await.unwrap(), 404);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = Url::parse(&format!("http://{}/main.js", listener.local_addr().unwrap())).unwrap();
        std::thread::spawn(move || {
            // Accept and hold connections without ever answering.
            let mut held = Vec::new();
            for stream in listener.incoming() {
                match stream {
                    Ok(s) => held.push(s),
                    Err(_) => break,
                }
            }
        });
        let fetcher = HttpFetcher::new(config(0, 1)).unwrap();

        let started = Instant::now();
        let result = fetcher.get(&url).await;

        assert!(matches!(result, Err(SnatchError::HttpError(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
