//! HTTP client for the complaint portal API.
//!
//! `PortalClient` backs the domain submission and engagement flows. Listing
//! reads degrade to an empty page so a browsing screen can still render.
//! `subscribe_problem` feeds a problem's change events into `LiveCounters`.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use domain::models::{
    CreateProblemRequest, ListProblemsQuery, Problem, ProblemCounts, ProblemEvent, ProblemPage,
    Taxonomy,
};
use domain::services::{BackendError, EngagementBackend, ImageAttachment, SubmissionBackend};
use futures::{Stream, StreamExt};
use reqwest::{header, multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::pagination::PageRequest;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default page size for public listings.
const DEFAULT_PER_PAGE: i64 = 9;

/// Errors raised by `PortalClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found")]
    NotFound,

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound => BackendError::NotFound,
            ClientError::Rejected { status, message } => BackendError::Rejected { status, message },
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Client for the portal's public API.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: Client,
    // No overall timeout; event streams stay open indefinitely.
    events_http: Client,
    base_url: String,
}

impl PortalClient {
    /// Creates a client for `base_url`, e.g. `https://portal.example.org`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = Client::builder().timeout(timeout).build()?;
        let events_http = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            http,
            events_http,
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Lists problems. Any failure is logged and yields an empty page.
    pub async fn list_problems(&self, query: &ListProblemsQuery) -> ProblemPage {
        match self.try_list_problems(query).await {
            Ok(page) => page,
            Err(err) => {
                error!(error = %err, "Failed to load problems");
                ProblemPage::empty(&query.page_request(DEFAULT_PER_PAGE))
            }
        }
    }

    async fn try_list_problems(&self, query: &ListProblemsQuery) -> Result<ProblemPage, ClientError> {
        let page: PageRequest = query.page_request(DEFAULT_PER_PAGE);
        let mut params = vec![
            ("page", page.page.to_string()),
            ("perPage", page.per_page.to_string()),
        ];
        for (key, value) in [
            ("category", &query.category),
            ("status", &query.status),
            ("upazila", &query.upazila),
            ("search", &query.search),
        ] {
            if let Some(value) = value {
                params.push((key, value.clone()));
            }
        }

        let response = self
            .http
            .get(self.url("/api/v1/problems"))
            .query(&params)
            .send()
            .await?;
        decode(response).await
    }

    /// Fetches one problem, `None` if it does not exist.
    pub async fn get_problem(&self, id: i64) -> Result<Option<Problem>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/v1/problems/{}", id)))
            .send()
            .await?;
        match decode(response).await {
            Ok(problem) => Ok(Some(problem)),
            Err(ClientError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Current dropdown taxonomies.
    pub async fn taxonomy(&self) -> Result<Taxonomy, ClientError> {
        let response = self
            .http
            .get(self.url("/api/v1/settings/taxonomy"))
            .send()
            .await?;
        decode(response).await
    }

    /// Subscribes to change events for one problem.
    ///
    /// Fails with `NotFound` if the problem does not exist. The stream ends
    /// when the server closes the connection or the transfer breaks.
    pub async fn subscribe_problem(
        &self,
        id: i64,
    ) -> Result<impl Stream<Item = ProblemEvent> + Send + 'static, ClientError> {
        let response = self
            .events_http
            .get(self.url(&format!("/api/v1/problems/{}/events", id)))
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        info!(problem_id = id, "Subscribed to problem events");

        let bytes = Box::pin(response.bytes_stream());
        let events = futures::stream::unfold(
            (bytes, EventStreamDecoder::default(), VecDeque::new()),
            move |(mut bytes, mut decoder, mut ready)| async move {
                loop {
                    if let Some(event) = ready.pop_front() {
                        return Some((event, (bytes, decoder, ready)));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => ready.extend(decoder.feed(&chunk)),
                        Some(Err(err)) => {
                            warn!(problem_id = id, error = %err, "Problem event stream broke");
                            return None;
                        }
                        None => {
                            debug!(problem_id = id, "Problem event stream closed");
                            return None;
                        }
                    }
                }
            },
        );
        Ok(events)
    }

    async fn post_counter(&self, problem_id: i64, action: &str) -> Result<ProblemCounts, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/api/v1/problems/{}/{}", problem_id, action)))
            .send()
            .await?;
        decode(response).await
    }
}

/// Decodes a success body, or maps the error status.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    if response.status().is_success() {
        return Ok(response.json::<T>().await?);
    }
    Err(rejection(response).await)
}

/// Maps an error response to `NotFound` or `Rejected` with the server's message.
async fn rejection(response: Response) -> ClientError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return ClientError::NotFound;
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    debug!(status = status.as_u16(), message = %message, "Request rejected");
    ClientError::Rejected {
        status: status.as_u16(),
        message,
    }
}

/// Incremental `text/event-stream` decoder for problem events.
///
/// Only `data:` fields are used. Comments, `event:`, `id:` and `retry:`
/// lines are skipped, and a blank line ends an event.
#[derive(Debug, Default)]
struct EventStreamDecoder {
    pending: Vec<u8>,
    data: String,
}

impl EventStreamDecoder {
    /// Consumes a chunk and returns every event it completed.
    fn feed(&mut self, chunk: &[u8]) -> Vec<ProblemEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                events.extend(self.dispatch());
            } else if let Some(value) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value.strip_prefix(' ').unwrap_or(value));
            }
        }
        events
    }

    fn dispatch(&mut self) -> Option<ProblemEvent> {
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data);
        match serde_json::from_str(&data) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(error = %err, "Skipping undecodable problem event");
                None
            }
        }
    }
}

#[async_trait]
impl SubmissionBackend for PortalClient {
    async fn upload_image(&self, image: &ImageAttachment) -> Result<String, BackendError> {
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(ClientError::from)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/api/v1/assets/problem-images"))
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::from)?;
        let uploaded: UploadResponse = decode(response).await?;
        Ok(uploaded.url)
    }

    async fn insert_problem(&self, request: &CreateProblemRequest) -> Result<Problem, BackendError> {
        let response = self
            .http
            .post(self.url("/api/v1/problems"))
            .json(request)
            .send()
            .await
            .map_err(ClientError::from)?;
        Ok(decode(response).await?)
    }
}

#[async_trait]
impl EngagementBackend for PortalClient {
    async fn record_vote(&self, problem_id: i64) -> Result<ProblemCounts, BackendError> {
        Ok(self.post_counter(problem_id, "vote").await?)
    }

    async fn record_view(&self, problem_id: i64) -> Result<ProblemCounts, BackendError> {
        Ok(self.post_counter(problem_id, "view").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode as AxumStatus,
        response::sse::{Event, Sse},
        routing::{get, post},
        Json, Router,
    };
    use domain::models::ProblemEventKind;
    use domain::services::LiveCounters;
    use serde_json::json;
    use std::convert::Infallible;

    fn updated_event(votes: i64, views: i64) -> serde_json::Value {
        json!({
            "problemId": 7,
            "kind": "updated",
            "status": "pending",
            "votesCount": votes,
            "viewsCount": views,
            "occurredAt": "2026-03-01T10:00:00Z"
        })
    }

    async fn serve(router: Router) -> PortalClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        PortalClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            PortalClient::new("portal.example.org", Duration::from_secs(1)),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_list_problems_degrades_to_empty_page() {
        let client = PortalClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let query = ListProblemsQuery {
            page: Some(2),
            ..Default::default()
        };

        let page = client.list_problems(&query).await;
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, 0);
        assert_eq!(page.pagination.page, 2);
    }

    #[tokio::test]
    async fn test_record_vote_returns_counts() {
        let router = Router::new().route(
            "/api/v1/problems/:id/vote",
            post(|| async { Json(json!({ "votesCount": 4, "viewsCount": 10 })) }),
        );
        let client = serve(router).await;

        let counts = client.record_vote(3).await.unwrap();
        assert_eq!(counts.votes_count, 4);
        assert_eq!(counts.views_count, 10);
    }

    #[tokio::test]
    async fn test_missing_problem_maps_to_not_found() {
        let router = Router::new().route(
            "/api/v1/problems/:id/view",
            post(|| async {
                (
                    AxumStatus::NOT_FOUND,
                    Json(json!({ "error": "not_found", "message": "Problem not found" })),
                )
            }),
        );
        let client = serve(router).await;

        assert_eq!(client.record_view(99).await, Err(BackendError::NotFound));
        assert!(client.get_problem(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_carries_server_message() {
        let router = Router::new().route(
            "/api/v1/problems",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({ "error": "validation_error", "message": "সঠিক মোবাইল নম্বর লিখুন" })),
                )
            }),
        );
        let client = serve(router).await;

        let err = client
            .insert_problem(&CreateProblemRequest::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::Rejected {
                status: 400,
                message: "সঠিক মোবাইল নম্বর লিখুন".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_upload_image_returns_public_url() {
        let router = Router::new().route(
            "/api/v1/assets/problem-images",
            post(|| async {
                (
                    AxumStatus::CREATED,
                    Json(json!({ "url": "/uploads/problem-images/1-abc.png", "path": "problem-images/1-abc.png", "size": 3 })),
                )
            }),
        );
        let client = serve(router).await;

        let url = client
            .upload_image(&ImageAttachment::new("a.png", "image/png", vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(url, "/uploads/problem-images/1-abc.png");
    }

    #[tokio::test]
    async fn test_taxonomy_is_decoded() {
        let router = Router::new().route(
            "/api/v1/settings/taxonomy",
            get(|| async { Json(Taxonomy::default_seed()) }),
        );
        let client = serve(router).await;

        let taxonomy = client.taxonomy().await.unwrap();
        assert_eq!(taxonomy, Taxonomy::default_seed());
    }

    #[test]
    fn test_event_decoder_handles_split_chunks() {
        let frame = format!(
            ": keep-alive\r\nevent: problem.updated\r\nid: 7\r\ndata: {}\r\n\r\n",
            updated_event(3, 9)
        );
        let bytes = frame.as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() / 2);

        let mut decoder = EventStreamDecoder::default();
        assert!(decoder.feed(head).is_empty());
        let events = decoder.feed(tail);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].problem_id, 7);
        assert_eq!(events[0].kind, ProblemEventKind::Updated);
        assert_eq!(events[0].votes_count, 3);
    }

    #[test]
    fn test_event_decoder_skips_bad_payloads() {
        let mut decoder = EventStreamDecoder::default();
        let events = decoder.feed(b"data: not json\n\n: ping\n\n");
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_problem_feeds_live_counters() {
        let router = Router::new().route(
            "/api/v1/problems/:id/events",
            get(|| async {
                let frames = vec![updated_event(3, 9), updated_event(3, 9)]
                    .into_iter()
                    .map(|data| {
                        Ok::<_, Infallible>(
                            Event::default().event("problem.updated").id("7").data(data.to_string()),
                        )
                    });
                Sse::new(futures::stream::iter(frames))
            }),
        );
        let client = serve(router).await;

        let events: Vec<ProblemEvent> = client.subscribe_problem(7).await.unwrap().collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], events[1]);

        let mut counters = LiveCounters::new(
            7,
            ProblemCounts {
                votes_count: 2,
                views_count: 8,
            },
        );
        assert!(counters.apply(&events[0]));
        assert!(!counters.apply(&events[1]));
        assert_eq!(counters.votes_count(), 3);
        assert_eq!(counters.views_count(), 9);
    }

    #[tokio::test]
    async fn test_subscribe_missing_problem_is_not_found() {
        let router = Router::new().route(
            "/api/v1/problems/:id/events",
            get(|| async {
                (
                    AxumStatus::NOT_FOUND,
                    Json(json!({ "error": "not_found", "message": "Problem not found" })),
                )
            }),
        );
        let client = serve(router).await;

        assert!(matches!(
            client.subscribe_problem(99).await,
            Err(ClientError::NotFound)
        ));
    }
}
