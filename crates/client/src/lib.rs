//! HTTP client for the queue REST API.
//!
//! [`HttpQueueService`] implements [`QueueService`] so a [`queue_core::QueueSession`] can run
//! against a remote server, and adds the administrative calls the operator CLI needs
//! (counters, check-in, the display board).
//!
//! Error mapping:
//! - transport failures and unreadable responses become [`QueueError::ServiceUnavailable`]
//! - error bodies from the server are rebuilt into the same [`QueueError`] the server raised

use api_shared::{
    AssignReq, CheckInReq, CreateCounterReq, EntryActionReq, HealthRes, PurgeRes, ReorderReq,
    ServerConfigRes,
};
use async_trait::async_trait;
use queue_core::{
    AlreadyServingPolicy, CounterId, CounterState, EntryId, NowServingBoard, Priority, QueueEntry,
    QueueError, QueueResult, QueueService, QueueSession,
};
use queue_wire::{
    board_from_wire, counter_from_wire, entry_from_wire, error_from_wire, parse_json_bytes,
    BoardWire, CounterListWire, CounterStateWire, EntryListWire, ErrorWire, QueueEntryWire,
    ServingWire, WaitingListWire, WireError,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// A counter as listed by the server, with its derived waiting count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterSummary {
    pub counter: CounterState,
    pub waiting_count: usize,
}

#[derive(Clone, Debug)]
pub struct HttpQueueService {
    http: Client,
    server_url: String,
}

fn unavailable(err: WireError) -> QueueError {
    QueueError::ServiceUnavailable(format!("malformed response: {err}"))
}

fn summary_from_wire(wire: CounterStateWire) -> QueueResult<CounterSummary> {
    let waiting_count = wire.waiting_count;
    Ok(CounterSummary {
        counter: counter_from_wire(wire).map_err(unavailable)?,
        waiting_count,
    })
}

fn entries_from_wire(entries: Vec<QueueEntryWire>) -> QueueResult<Vec<QueueEntry>> {
    entries
        .into_iter()
        .map(|e| entry_from_wire(e).map_err(unavailable))
        .collect()
}

impl HttpQueueService {
    /// Client for the server at `server_url` (e.g. `http://localhost:3000`).
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidInput`] if the URL does not parse or is not http(s).
    pub fn new(server_url: &str) -> QueueResult<Self> {
        let parsed = Url::parse(server_url).map_err(|e| {
            QueueError::InvalidInput(format!("invalid server URL '{server_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(QueueError::InvalidInput(format!(
                "server URL must start with http:// or https://, got '{server_url}'"
            )));
        }

        Ok(Self {
            http: Client::new(),
            server_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    /// Sends `request` and parses a successful body as `T`.
    async fn send<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> QueueResult<T> {
        let body = self.send_raw(request).await?;
        parse_json_bytes(what, &body).map_err(unavailable)
    }

    async fn send_raw(&self, request: RequestBuilder) -> QueueResult<Vec<u8>> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("queue server request failed: {e}");
            QueueError::ServiceUnavailable(e.to_string())
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| QueueError::ServiceUnavailable(e.to_string()))?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        match parse_json_bytes::<ErrorWire>("error body", &body) {
            Ok(wire) => Err(error_from_wire(wire)),
            Err(_) => Err(QueueError::ServiceUnavailable(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&body)
            ))),
        }
    }

    async fn entry_action(
        &self,
        counter_id: CounterId,
        action: &str,
        entry_id: EntryId,
    ) -> QueueResult<QueueEntry> {
        let request = self
            .http
            .post(self.url(&format!("/counters/{counter_id}/{action}")))
            .json(&EntryActionReq {
                entry_id: entry_id.to_string(),
            });
        let wire: QueueEntryWire = self.send("queue entry", request).await?;
        entry_from_wire(wire).map_err(unavailable)
    }

    pub async fn health(&self) -> QueueResult<HealthRes> {
        self.send("health", self.http.get(self.url("/health"))).await
    }

    /// The already-serving policy the server was started with.
    pub async fn already_serving_policy(&self) -> QueueResult<AlreadyServingPolicy> {
        let res: ServerConfigRes = self
            .send("server config", self.http.get(self.url("/config")))
            .await?;
        res.already_serving_policy
            .parse::<AlreadyServingPolicy>()
            .map_err(|e| {
                QueueError::ServiceUnavailable(format!("server reported an unknown policy: {e}"))
            })
    }

    /// A session whose local mirror applies the server's own already-serving policy.
    pub async fn session(self: &Arc<Self>) -> QueueResult<QueueSession<Self>> {
        let policy = self.already_serving_policy().await?;
        Ok(QueueSession::new(Arc::clone(self), policy))
    }

    pub async fn list_counters(&self) -> QueueResult<Vec<CounterSummary>> {
        let wire: CounterListWire = self
            .send("counter list", self.http.get(self.url("/counters")))
            .await?;
        wire.counters.into_iter().map(summary_from_wire).collect()
    }

    pub async fn create_counter(
        &self,
        title: &str,
        counter_number: Option<u32>,
    ) -> QueueResult<CounterSummary> {
        let request = self.http.post(self.url("/counters")).json(&CreateCounterReq {
            title: title.to_string(),
            counter_number,
        });
        summary_from_wire(self.send("counter", request).await?)
    }

    pub async fn activate(&self, counter_id: CounterId) -> QueueResult<CounterSummary> {
        let request = self
            .http
            .post(self.url(&format!("/counters/{counter_id}/activate")));
        summary_from_wire(self.send("counter", request).await?)
    }

    pub async fn deactivate(&self, counter_id: CounterId) -> QueueResult<CounterSummary> {
        let request = self
            .http
            .post(self.url(&format!("/counters/{counter_id}/deactivate")));
        summary_from_wire(self.send("counter", request).await?)
    }

    /// Checks a patient in; the server issues the queue number.
    pub async fn check_in(
        &self,
        display_name: &str,
        initials: Option<String>,
        priority: Priority,
        counter_id: Option<CounterId>,
    ) -> QueueResult<QueueEntry> {
        let request = self.http.post(self.url("/entries")).json(&CheckInReq {
            display_name: display_name.to_string(),
            initials,
            priority: priority.into(),
            counter_id: counter_id.map(|id| id.to_string()),
        });
        let wire: QueueEntryWire = self.send("queue entry", request).await?;
        entry_from_wire(wire).map_err(unavailable)
    }

    /// Removes an entry. Succeeds whether or not the entry existed.
    pub async fn remove_entry(&self, entry_id: EntryId) -> QueueResult<()> {
        let request = self.http.delete(self.url(&format!("/entries/{entry_id}")));
        self.send_raw(request).await.map(|_| ())
    }

    pub async fn list_unassigned(&self) -> QueueResult<Vec<QueueEntry>> {
        let wire: EntryListWire = self
            .send("entry list", self.http.get(self.url("/entries/unassigned")))
            .await?;
        entries_from_wire(wire.entries)
    }

    pub async fn assign(
        &self,
        entry_id: EntryId,
        counter_id: CounterId,
    ) -> QueueResult<QueueEntry> {
        let request = self
            .http
            .post(self.url(&format!("/entries/{entry_id}/assign")))
            .json(&AssignReq {
                counter_id: counter_id.to_string(),
            });
        let wire: QueueEntryWire = self.send("queue entry", request).await?;
        entry_from_wire(wire).map_err(unavailable)
    }

    pub async fn purge_completed(&self) -> QueueResult<usize> {
        let res: PurgeRes = self
            .send(
                "purge result",
                self.http.post(self.url("/entries/purge-completed")),
            )
            .await?;
        Ok(res.purged)
    }

    pub async fn display(&self) -> QueueResult<NowServingBoard> {
        let wire: BoardWire = self
            .send("board", self.http.get(self.url("/display")))
            .await?;
        board_from_wire(wire).map_err(unavailable)
    }
}

#[async_trait]
impl QueueService for HttpQueueService {
    async fn fetch_waiting(&self, counter_id: CounterId) -> QueueResult<Vec<QueueEntry>> {
        let request = self
            .http
            .get(self.url(&format!("/counters/{counter_id}/waiting")));
        let wire: WaitingListWire = self.send("waiting list", request).await?;
        entries_from_wire(wire.entries)
    }

    async fn fetch_counter_state(&self, counter_id: CounterId) -> QueueResult<CounterState> {
        let request = self.http.get(self.url(&format!("/counters/{counter_id}")));
        summary_from_wire(self.send("counter", request).await?).map(|s| s.counter)
    }

    async fn fetch_serving(&self, counter_id: CounterId) -> QueueResult<Option<QueueEntry>> {
        let request = self
            .http
            .get(self.url(&format!("/counters/{counter_id}/serving")));
        let wire: ServingWire = self.send("serving entry", request).await?;
        wire.entry
            .map(|e| entry_from_wire(e).map_err(unavailable))
            .transpose()
    }

    async fn commit_serve_next(&self, counter_id: CounterId) -> QueueResult<QueueEntry> {
        let request = self
            .http
            .post(self.url(&format!("/counters/{counter_id}/serve-next")));
        let wire: QueueEntryWire = self.send("queue entry", request).await?;
        entry_from_wire(wire).map_err(unavailable)
    }

    async fn commit_skip(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()> {
        self.entry_action(counter_id, "skip", entry_id)
            .await
            .map(|_| ())
    }

    async fn commit_recall(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()> {
        self.entry_action(counter_id, "recall", entry_id)
            .await
            .map(|_| ())
    }

    async fn commit_complete(&self, counter_id: CounterId, entry_id: EntryId) -> QueueResult<()> {
        self.entry_action(counter_id, "complete", entry_id)
            .await
            .map(|_| ())
    }

    async fn commit_reorder(
        &self,
        counter_id: CounterId,
        ordered_ids: &[EntryId],
    ) -> QueueResult<()> {
        let request = self
            .http
            .put(self.url(&format!("/counters/{counter_id}/order")))
            .json(&ReorderReq {
                entry_ids: ordered_ids.iter().map(|id| id.to_string()).collect(),
            });
        let _: WaitingListWire = self.send("waiting list", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_rest::{router, AppState};
    use queue_core::{CoreConfig, NonEmptyText};

    /// Starts a real server on an ephemeral port and returns a client for it.
    async fn spawn_server() -> HttpQueueService {
        spawn_server_with(AlreadyServingPolicy::Reject).await
    }

    async fn spawn_server_with(policy: AlreadyServingPolicy) -> HttpQueueService {
        let cfg = CoreConfig::new(
            policy,
            3,
            vec![NonEmptyText::new("Reception").expect("title")],
        )
        .expect("config");
        let app = router(AppState::new(Arc::new(cfg)).expect("state"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        HttpQueueService::new(&format!("http://{addr}/")).expect("client")
    }

    async fn reception(client: &HttpQueueService) -> CounterId {
        client.list_counters().await.expect("list")[0].counter.id()
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            HttpQueueService::new("ftp://example.org"),
            Err(QueueError::InvalidInput(_))
        ));
        assert!(HttpQueueService::new("not a url").is_err());
        let client = HttpQueueService::new("http://localhost:3000/").expect("client");
        assert_eq!(client.server_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn health_round_trip() {
        let client = spawn_server().await;
        assert!(client.health().await.expect("health").ok);
    }

    #[tokio::test]
    async fn server_errors_keep_their_kind() {
        let client = spawn_server().await;
        let counter = reception(&client).await;

        let err = client.commit_serve_next(counter).await.expect_err("empty");
        assert_eq!(err, QueueError::EmptyQueue(counter));

        let missing = CounterId::new();
        let err = client.fetch_counter_state(missing).await.expect_err("unknown");
        assert_eq!(err, QueueError::CounterNotFound(missing));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = HttpQueueService::new(&format!("http://{addr}")).expect("client");
        assert!(matches!(
            client.health().await,
            Err(QueueError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn session_follows_auto_complete_server() {
        let client = Arc::new(spawn_server_with(AlreadyServingPolicy::AutoComplete).await);
        assert_eq!(
            client.already_serving_policy().await.expect("config"),
            AlreadyServingPolicy::AutoComplete
        );

        let counter = reception(&client).await;
        let first = client
            .check_in("Ana Lima", None, Priority::Normal, Some(counter))
            .await
            .expect("check in");
        let second = client
            .check_in("Bo Chen", None, Priority::Normal, Some(counter))
            .await
            .expect("check in");

        let session = client.session().await.expect("session");
        session.refresh(counter).await.expect("refresh");
        assert_eq!(session.serve_next(counter).await.expect("serve").id, first.id);

        // The first patient is still being served; the server completes them.
        let served = session.serve_next(counter).await.expect("serve again");
        assert_eq!(served.id, second.id);

        let serving = client.fetch_serving(counter).await.expect("serving");
        assert_eq!(serving.map(|e| e.id), Some(second.id));
        assert_eq!(client.purge_completed().await.expect("purge"), 1);
    }

    #[tokio::test]
    async fn session_runs_against_the_server() {
        let client = Arc::new(spawn_server().await);
        let counter = reception(&client).await;
        let first = client
            .check_in("Ana Lima", None, Priority::Normal, Some(counter))
            .await
            .expect("check in");
        let second = client
            .check_in("Bo Chen", None, Priority::High, Some(counter))
            .await
            .expect("check in");

        let session = client.session().await.expect("session");
        assert!(session.refresh(counter).await.expect("refresh"));

        let served = session.serve_next(counter).await.expect("serve");
        assert_eq!(served.id, first.id);

        session.skip_patient(counter).await.expect("skip");
        let waiting = client.fetch_waiting(counter).await.expect("waiting");
        assert_eq!(
            waiting.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        session
            .recall_patient(counter, first.id)
            .await
            .expect("recall");
        session.complete_current(counter).await.expect("complete");

        let board = client.display().await.expect("board");
        assert_eq!(board.counters[0].waiting_count, 1);
        assert_eq!(client.purge_completed().await.expect("purge"), 1);
    }

    #[tokio::test]
    async fn unassigned_pool_and_assignment() {
        let client = spawn_server().await;
        let counter = reception(&client).await;
        let entry = client
            .check_in("Cy Dunn", Some("CD".into()), Priority::Low, None)
            .await
            .expect("check in");
        assert_eq!(client.list_unassigned().await.expect("pool").len(), 1);

        let assigned = client.assign(entry.id, counter).await.expect("assign");
        assert_eq!(assigned.counter_id, Some(counter));
        assert!(client.list_unassigned().await.expect("pool").is_empty());

        client.remove_entry(entry.id).await.expect("remove");
        client.remove_entry(entry.id).await.expect("remove again");
        assert!(client.fetch_waiting(counter).await.expect("waiting").is_empty());
    }
}
