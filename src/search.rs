//! Jamendo track search client

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{SearchError, SearchResult};
use crate::songs::{TrackDescriptor, TrackSource};

pub const JAMENDO_BASE_URL: &str = "https://api.jamendo.com/v3.0";
pub const DEFAULT_LIMIT: u32 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One keyword search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// A track record from the search API. Only the fields we show are kept.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration: u32,
    /// Streamable audio URL, empty when the track cannot be streamed
    pub audio: String,
    pub image: String,
    pub album_image: String,
    pub shareurl: String,
}

impl TrackRecord {
    pub fn has_audio(&self) -> bool {
        !self.audio.trim().is_empty()
    }

    pub fn into_descriptor(self) -> TrackDescriptor {
        let non_empty = |s: String| if s.trim().is_empty() { None } else { Some(s) };
        let cover = non_empty(self.album_image).or_else(|| non_empty(self.image));
        TrackDescriptor {
            title: self.name,
            artist: self.artist_name,
            audio_url: non_empty(self.audio),
            cover_url: cover,
            share_url: non_empty(self.shareurl),
            source: TrackSource::Jamendo,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TrackRecord>,
}

/// A remote catalog that can answer keyword searches
pub trait TrackSearch {
    /// Ordered results, possibly empty. Errors only on config or transport failure.
    fn search(
        &self,
        query: &SearchQuery,
    ) -> impl Future<Output = SearchResult<Vec<TrackRecord>>> + Send;
}

/// HTTP client for the Jamendo v3 API
#[derive(Clone, Debug)]
pub struct JamendoClient {
    http: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
}

impl JamendoClient {
    pub fn new(client_id: Option<String>) -> Self {
        Self::with_base_url(client_id, JAMENDO_BASE_URL)
    }

    pub fn with_base_url(client_id: Option<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self::with_http(http, client_id, base_url)
    }

    /// Use a preconfigured HTTP client
    pub fn with_http(
        http: reqwest::Client,
        client_id: Option<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.filter(|id| !id.trim().is_empty()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.client_id.is_some()
    }

    fn query_params(client_id: &str, query: &SearchQuery) -> Vec<(&'static str, String)> {
        vec![
            ("client_id", client_id.to_string()),
            ("format", "json".to_string()),
            ("limit", query.limit.to_string()),
            ("include", "musicinfo".to_string()),
            // MP3 at ~96kbps, good enough for previews
            ("audioformat", "mp32".to_string()),
            ("search", query.query.clone()),
            // One track per artist keeps results varied
            ("groupby", "artist_id".to_string()),
            ("boost", "popularity_month".to_string()),
        ]
    }
}

impl TrackSearch for JamendoClient {
    async fn search(&self, query: &SearchQuery) -> SearchResult<Vec<TrackRecord>> {
        let client_id = self.client_id.as_deref().ok_or(SearchError::Configuration)?;
        let url = format!("{}/tracks/", self.base_url);

        debug!(query = %query.query, limit = query.limit, "jamendo search");
        let response = self
            .http
            .get(&url)
            .query(&Self::query_params(client_id, query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, query = %query.query, "jamendo search failed");
            return Err(SearchError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&body)?;
        debug!(query = %query.query, results = parsed.results.len(), "jamendo search done");
        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP response; the handle yields the request head.
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
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
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&head).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn local_client(base: String) -> JamendoClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        JamendoClient::with_http(http, Some("id".into()), base)
    }

    #[test]
    fn test_query_params() {
        let query = SearchQuery::new("tag:Peru").with_limit(5);
        let params = JamendoClient::query_params("abc", &query);
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("client_id"), Some("abc"));
        assert_eq!(get("format"), Some("json"));
        assert_eq!(get("limit"), Some("5"));
        assert_eq!(get("include"), Some("musicinfo"));
        assert_eq!(get("audioformat"), Some("mp32"));
        assert_eq!(get("search"), Some("tag:Peru"));
        assert_eq!(get("groupby"), Some("artist_id"));
        assert_eq!(get("boost"), Some("popularity_month"));
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let client = JamendoClient::with_base_url(Some("  ".into()), "http://127.0.0.1:9");
        assert!(!client.has_credential());
        let err = client.search(&SearchQuery::new("Peru")).await.unwrap_err();
        assert!(matches!(err, SearchError::Configuration));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client(format!("http://{addr}"));
        let err = client.search(&SearchQuery::new("Peru")).await.unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let (base, server) = serve_once("503 Service Unavailable", "{}").await;
        let client = local_client(base);
        let err = client.search(&SearchQuery::new("Peru")).await.unwrap_err();
        assert!(matches!(err, SearchError::Upstream { status: 503 }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_results_are_parsed_in_order() {
        let body = r#"{"headers":{"status":"success"},"results":[
            {"id":"1","name":"Valicha","artist_name":"Los Andinos","audio":"","duration":180},
            {"id":"2","name":"El Condor Pasa","artist_name":"Inti",
             "audio":"https://cdn.example/2.mp3",
             "album_image":"https://cdn.example/2.jpg","shareurl":"https://jamendo.example/2"}
        ]}"#;
        let (base, server) = serve_once("200 OK", body).await;
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let client = JamendoClient::with_http(http, Some("secret".into()), base);
        let results = client.search(&SearchQuery::new("Peru")).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results[0].has_audio());
        assert!(results[1].has_audio());

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /tracks/?"));
        assert!(head.contains("client_id=secret"));
        assert!(head.contains("search=Peru"));

        let track = results[1].clone().into_descriptor();
        assert_eq!(track.title, "El Condor Pasa");
        assert_eq!(track.audio_url.as_deref(), Some("https://cdn.example/2.mp3"));
        assert_eq!(track.cover_url.as_deref(), Some("https://cdn.example/2.jpg"));
        assert_eq!(track.source, TrackSource::Jamendo);
    }

    #[tokio::test]
    async fn test_missing_results_key_is_empty() {
        let (base, server) = serve_once("200 OK", r#"{"headers":{}}"#).await;
        let client = local_client(base);
        let results = client.search(&SearchQuery::new("Atlantis")).await.unwrap();
        assert!(results.is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (base, server) = serve_once("200 OK", "<html>").await;
        let client = local_client(base);
        let err = client.search(&SearchQuery::new("Peru")).await.unwrap_err();
        assert!(matches!(err, SearchError::Decode(_)));
        server.await.unwrap();
    }
}
