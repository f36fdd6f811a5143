use crate::config::Settings;
use crate::error::{FetchError, FetchResult};
use crate::fetcher::traits::{ListingSource, SessionProvider, StaticSession};
use crate::models::{ItemCategory, PagedResults};
use crate::normalize::{normalize_page, RawPage};
use crate::search::SearchCriteria;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SEARCH_PATH: &str = "/api/market/search";
const CATEGORIES_PATH: &str = "/api/market/categories";

/// Listing source backed by the market's HTTP API
pub struct HttpListingSource {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpListingSource {
    /// Create a source from loaded settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let session = Arc::new(StaticSession::new(settings.session_token.clone()));
        Self::with_session(settings, session)
    }

    /// Create a source that asks `session` for credentials on every request
    pub fn with_session(settings: &Settings, session: Arc<dyn SessionProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> FetchResult<String> {
        let response = request.send().await?;

        if !response.status().is_success() {
            warn!("Market returned status: {}", response.status());
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn search(&self, criteria: &SearchCriteria) -> FetchResult<PagedResults> {
        let params = criteria.to_request_params();
        debug!(?params, "Fetching {}{}", self.base_url, SEARCH_PATH);

        let body = self.send(self.get(SEARCH_PATH).query(&params)).await?;
        debug!("Downloaded {} bytes of search results", body.len());

        let raw: RawPage = serde_json::from_str(&body)?;
        let page = normalize_page(raw);
        info!(
            total = page.total,
            items = page.items.len(),
            "Fetched market page {}",
            criteria.page_index
        );
        Ok(page)
    }

    async fn categories(&self) -> FetchResult<Vec<ItemCategory>> {
        let body = self.send(self.get(CATEGORIES_PATH)).await?;
        let categories: Vec<ItemCategory> = serde_json::from_str(&body)?;
        debug!("Fetched {} item categories", categories.len());
        Ok(categories)
    }

    fn source_name(&self) -> &'static str {
        "Market API"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned response on a local port. The handle yields the
    /// request head the client sent.
    async fn serve_once(status: &str, body: &str) -> (Settings, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let settings = Settings {
            api_base_url: format!("http://{}", listener.local_addr().unwrap()),
            request_timeout_secs: 5,
            ..Settings::default()
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&head).into_owned()
        });
        (settings, server)
    }

    struct Rotating;

    impl SessionProvider for Rotating {
        fn bearer_token(&self) -> Option<String> {
            Some("fresh".into())
        }
    }

    #[test]
    fn builds_requests_against_trimmed_base_url() {
        let settings = Settings {
            api_base_url: "https://market.example/".into(),
            ..Settings::default()
        };
        let source = HttpListingSource::with_session(&settings, Arc::new(Rotating)).unwrap();
        let request = source.get(SEARCH_PATH).build().unwrap();
        assert_eq!(request.url().as_str(), "https://market.example/api/market/search");
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer fresh"
        );
    }

    #[test]
    fn anonymous_requests_carry_no_auth_header() {
        let source = HttpListingSource::new(&Settings::default()).unwrap();
        let request = source.get(CATEGORIES_PATH).build().unwrap();
        assert!(request.headers().get("authorization").is_none());
        assert_eq!(source.source_name(), "Market API");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (settings, server) = serve_once("503 Service Unavailable", "{}").await;
        let source = HttpListingSource::new(&settings).unwrap();

        let err = source.search(&SearchCriteria::default()).await.unwrap_err();
        assert_eq!(err, FetchError::Status { status: 503 });
        assert!(err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_envelope_is_a_decode_error() {
        let (settings, server) = serve_once("200 OK", r#"{"total": "many", "listings": []}"#).await;
        let source = HttpListingSource::new(&settings).unwrap();

        let err = source.search(&SearchCriteria::default()).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn search_sends_params_and_normalizes_the_page() {
        let body = r#"{"total": 3, "listings": [{"listing_id": "a1", "title": "Arclight", "price": 10}]}"#;
        let (settings, server) = serve_once("200 OK", body).await;
        let source = HttpListingSource::new(&settings).unwrap();

        let page = source.search(&SearchCriteria::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), "a1");
        assert_eq!(page.items[0].title(), "Arclight");

        let head = server.await.unwrap();
        let request_line = head.lines().next().unwrap_or_default();
        assert!(request_line.starts_with("GET /api/market/search?"), "{request_line}");
        assert!(request_line.contains("page_size=48"), "{request_line}");
    }
}
