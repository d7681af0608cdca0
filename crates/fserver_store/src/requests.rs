//! Request lifecycle.
//!
//! ```text
//! pending --update--> running --update--> done | error
//!    |                   |
//!    +------update-------+--timeout sweep--> error
//! ```
//!
//! Terminal states (`done`, `error`) never move back. The timeout sweep is
//! not a background task: it runs at the start of every request query.

use crate::boards::BoardRegistry;
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::query::{self, AttributeSchema, FirstMatchSchema, QueryParams, StoreAttributes};
use crate::store::{Collection, Mutation, RecordStore};
use chrono::{DateTime, Duration, Utc};
use fserver_ids::{parse_datetime, BoardId, RequestId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The only fields an update may touch.
pub const UPDATABLE_FIELDS: [&str; 5] = ["state", "run_id", "start_time", "done_time", "reason"];

/// Filename fields a request query can match without opening records.
pub const REQUEST_NAME_FIELDS: [&str; 2] = ["host", "board"];

/// Reason recorded when the sweep expires a running request.
pub const TIMEOUT_REASON: &str = "timed out";

/// Default age after which a running request is considered lost.
pub const DEFAULT_REQUEST_TIMEOUT_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Older servers wrote `new` for freshly submitted requests.
    #[serde(alias = "new")]
    Pending,
    Running,
    Done,
    Error,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Running => "running",
            RequestState::Done => "done",
            RequestState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Error)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RequestState::Pending),
            "running" => Ok(RequestState::Running),
            "done" => Ok(RequestState::Done),
            "error" => Ok(RequestState::Error),
            other => Err(StoreError::bad_request(format!(
                "Invalid state '{}': expected pending, running, done or error",
                other
            ))),
        }
    }
}

/// A stored request. Fields the server does not interpret are kept in
/// `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Records written by older servers lack this; it is filled in from
    /// the file name on load.
    #[serde(default)]
    pub request_id: String,
    pub host: String,
    pub board: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requestor: Option<String>,
    pub state: RequestState,
    pub request_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TimeoutVerdict {
    Alive,
    Expired,
    Unparsable(String),
}

fn timeout_verdict(request: &Request, now: DateTime<Utc>, timeout: Duration) -> TimeoutVerdict {
    let Some(raw) = request.start_time.as_deref() else {
        return TimeoutVerdict::Unparsable("running request has no start_time".to_string());
    };
    match parse_datetime(raw) {
        Some(start) if now > start + timeout => TimeoutVerdict::Expired,
        Some(_) => TimeoutVerdict::Alive,
        None => TimeoutVerdict::Unparsable(format!("start_time '{}' could not be parsed", raw)),
    }
}

fn backfill_id(request: &mut Request, stem: &str) {
    if request.request_id.is_empty() {
        request.request_id = stem.to_string();
    }
}

fn stamp(at: DateTime<Utc>) -> String {
    Timestamp::from_datetime(at).to_string()
}

pub struct RequestEngine {
    store: RecordStore,
    boards: BoardRegistry,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    schema: Box<dyn AttributeSchema>,
}

impl RequestEngine {
    pub fn new(store: RecordStore, boards: BoardRegistry, timeout: Duration) -> Self {
        Self {
            store,
            boards,
            clock: Arc::new(SystemClock),
            timeout,
            schema: Box::new(FirstMatchSchema),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_schema(mut self, schema: Box<dyn AttributeSchema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submit a request for a registered board.
    ///
    /// Every submitted field except `action` is kept; `request_id`, `state`
    /// and `request_time` are always set by the server.
    pub fn create(&self, fields: BTreeMap<String, String>) -> Result<Request> {
        let host = fields.get("host").filter(|v| !v.is_empty());
        let board = fields.get("board").filter(|v| !v.is_empty());
        let (Some(host), Some(board)) = (host, board) else {
            return Err(StoreError::bad_request(
                "Missing host or board in request fields",
            ));
        };
        let board_id = BoardId::new(host.as_str(), board.as_str())?;

        if !self.boards.exists(&board_id) {
            warn!("Refused request for unregistered board {}", board_id);
            return Err(StoreError::AdmissionDenied {
                board: board_id.to_string(),
            });
        }

        let now = self.clock.now();
        let id = RequestId::new(Timestamp::from_datetime(now), board_id);

        let mut record: Map<String, Value> = fields
            .into_iter()
            .filter(|(k, _)| k != "action")
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        record.insert("request_id".to_string(), Value::String(id.stem()));
        record.insert(
            "state".to_string(),
            Value::String(RequestState::Pending.as_str().to_string()),
        );
        record.insert("request_time".to_string(), Value::String(stamp(now)));
        let request: Request = serde_json::from_value(Value::Object(record))?;

        self.store.create(Collection::Requests, &id.stem(), &request)?;
        info!("Created request {}", id);
        Ok(request)
    }

    pub fn get(&self, id: &RequestId) -> Result<Request> {
        let stem = id.stem();
        let mut request: Request = self.store.load(Collection::Requests, &stem)?;
        backfill_id(&mut request, &stem);
        Ok(request)
    }

    /// Apply an update. The payload is validated in full before anything is
    /// written; a rejected update leaves the record untouched.
    pub fn update(&self, id: &RequestId, payload: &BTreeMap<String, String>) -> Result<Request> {
        if let Some(field) = payload
            .keys()
            .find(|k| !UPDATABLE_FIELDS.contains(&k.as_str()))
        {
            return Err(StoreError::bad_request(format!(
                "Cannot update field '{}' of request {}; updatable fields are {}",
                field,
                id,
                UPDATABLE_FIELDS.join(", ")
            )));
        }
        let next_state = payload
            .get("state")
            .map(|s| s.parse::<RequestState>())
            .transpose()?;
        let now = self.clock.now();
        let stem = id.stem();

        let request = self
            .store
            .update(Collection::Requests, &stem, |req: &mut Request| {
                backfill_id(req, &stem);
                if let Some(next) = next_state {
                    let back_to_pending =
                        next == RequestState::Pending && req.state != RequestState::Pending;
                    if back_to_pending || (req.state.is_terminal() && !next.is_terminal()) {
                        return Err(StoreError::bad_request(format!(
                            "Request {} is {}; it cannot move back to {}",
                            req.request_id, req.state, next
                        )));
                    }
                }
                let entering = next_state.filter(|next| *next != req.state);

                for (field, value) in payload {
                    let value = Some(value.clone());
                    match field.as_str() {
                        "run_id" => req.run_id = value,
                        "start_time" => req.start_time = value,
                        "done_time" => req.done_time = value,
                        "reason" => req.reason = value,
                        _ => {}
                    }
                }
                if let Some(next) = next_state {
                    req.state = next;
                }
                match entering {
                    Some(RequestState::Running) if !payload.contains_key("start_time") => {
                        req.start_time = Some(stamp(now));
                    }
                    Some(state) if state.is_terminal() && !payload.contains_key("done_time") => {
                        req.done_time = Some(stamp(now));
                    }
                    _ => {}
                }
                Ok(Mutation::Write)
            })?;

        info!(
            "Updated request {} ({})",
            id,
            payload.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(request)
    }

    /// Force every running request older than the timeout (or with an
    /// unreadable `start_time`) to `error`. Returns the affected stems.
    ///
    /// `run_id` is left as it was.
    pub fn sweep_timeouts(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        let mut expired = Vec::new();

        for stem in self.store.list(Collection::Requests)? {
            let mut current: Request = match self.store.load(Collection::Requests, &stem) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Skipping unreadable request {}: {}", stem, e);
                    continue;
                }
            };
            backfill_id(&mut current, &stem);
            if current.state != RequestState::Running {
                continue;
            }

            let mut forced = None;
            self.store
                .update(Collection::Requests, &stem, |req: &mut Request| {
                    backfill_id(req, &stem);
                    if req.state != RequestState::Running {
                        return Ok(Mutation::Skip);
                    }
                    let reason = match timeout_verdict(req, now, self.timeout) {
                        TimeoutVerdict::Alive => return Ok(Mutation::Skip),
                        TimeoutVerdict::Expired => TIMEOUT_REASON.to_string(),
                        TimeoutVerdict::Unparsable(reason) => reason,
                    };
                    req.state = RequestState::Error;
                    req.done_time = Some(stamp(now));
                    req.reason = Some(reason.clone());
                    forced = Some(reason);
                    Ok(Mutation::Write)
                })?;

            if let Some(reason) = forced {
                warn!("Request {} forced to error: {}", stem, reason);
                expired.push(stem);
            }
        }

        debug!("Timeout sweep forced {} requests to error", expired.len());
        Ok(expired)
    }

    /// Sweep timeouts, then return the record file names of matching
    /// requests in timestamp order.
    pub fn query(&self, params: &QueryParams) -> Result<Vec<String>> {
        self.sweep_timeouts()?;

        let stems = self.store.list(Collection::Requests)?;
        let candidates = query::filter_by_name(stems, &REQUEST_NAME_FIELDS, params, |stem| {
            RequestId::board_suffix(stem)
                .and_then(|suffix| suffix.split_once(':'))
                .map(|(host, board)| vec![host.to_string(), board.to_string()])
        });
        let source = StoreAttributes::new(&self.store, Collection::Requests);
        let matched = query::filter_by_attributes(
            candidates,
            params,
            &REQUEST_NAME_FIELDS,
            self.schema.as_ref(),
            &source,
        )?;

        Ok(matched
            .iter()
            .map(|stem| Collection::Requests.file_name(stem))
            .collect())
    }

    pub fn remove(&self, id: &RequestId) -> Result<()> {
        self.store.delete(Collection::Requests, &id.stem())?;
        info!("Removed request {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        store: RecordStore,
        clock: Arc<ManualClock>,
        engine: RequestEngine,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::open(temp.path()).unwrap();
        let boards = BoardRegistry::new(store.clone());
        for b in ["hostA:boardA", "hostA:boardB", "hostB:other"] {
            boards
                .register(&BoardId::parse(b).unwrap(), BTreeMap::new())
                .unwrap();
        }
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let engine = RequestEngine::new(
            store.clone(),
            boards,
            Duration::hours(DEFAULT_REQUEST_TIMEOUT_HOURS),
        )
        .with_clock(clock.clone());
        Fixture {
            _temp: temp,
            store,
            clock,
            engine,
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn submit(fx: &Fixture, host: &str, board: &str) -> RequestId {
        let request = fx
            .engine
            .create(fields(&[
                ("action", "put_request"),
                ("host", host),
                ("board", board),
                ("test_name", "Functional.bc"),
            ]))
            .unwrap();
        fx.clock.advance(Duration::milliseconds(10));
        RequestId::parse(&request.request_id).unwrap()
    }

    #[test]
    fn test_create_pending() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        let request = fx.engine.get(&id).unwrap();
        assert_eq!(request.state, RequestState::Pending);
        assert_eq!(request.test_name.as_deref(), Some("Functional.bc"));
        assert_eq!(request.request_time, "2024-01-01_00:00:00.00");
        assert_eq!(
            request.request_id,
            "request-2024-01-01_00:00:00.00-hostA:boardA"
        );
        assert!(!request.extra.contains_key("action"));
    }

    #[test]
    fn test_create_keeps_extra_fields_and_overrides_state() {
        let fx = fixture();
        let request = fx
            .engine
            .create(fields(&[
                ("host", "hostA"),
                ("board", "boardA"),
                ("state", "done"),
                ("timeout", "30m"),
            ]))
            .unwrap();
        assert_eq!(request.state, RequestState::Pending);
        assert_eq!(request.extra.get("timeout"), Some(&Value::from("30m")));
    }

    #[test]
    fn test_create_unregistered_board() {
        let fx = fixture();
        let err = fx
            .engine
            .create(fields(&[("host", "hostA"), ("board", "boardZ")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AdmissionDenied);
        assert!(fx.store.list(Collection::Requests).unwrap().is_empty());
    }

    #[test]
    fn test_create_missing_board() {
        let fx = fixture();
        let err = fx.engine.create(fields(&[("host", "hostA")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_same_centisecond_collides() {
        let fx = fixture();
        let f = fields(&[("host", "hostA"), ("board", "boardA")]);
        fx.engine.create(f.clone()).unwrap();
        let err = fx.engine.create(f).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_update_whitelist_is_all_or_nothing() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        let before = fx.engine.get(&id).unwrap();

        let err = fx
            .engine
            .update(&id, &fields(&[("state", "running"), ("host", "evil")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(fx.engine.get(&id).unwrap(), before);
    }

    #[test]
    fn test_update_rejects_unknown_state() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        let err = fx
            .engine
            .update(&id, &fields(&[("state", "paused")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_update_lifecycle_stamps_times() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");

        let running = fx
            .engine
            .update(&id, &fields(&[("state", "running")]))
            .unwrap();
        assert_eq!(running.state, RequestState::Running);
        assert!(running.start_time.is_some());
        assert!(running.done_time.is_none());

        let done = fx
            .engine
            .update(&id, &fields(&[("state", "done"), ("run_id", "run-42")]))
            .unwrap();
        assert_eq!(done.state, RequestState::Done);
        assert_eq!(done.run_id.as_deref(), Some("run-42"));
        assert!(done.done_time.is_some());
        assert_eq!(fx.engine.get(&id).unwrap(), done);
    }

    #[test]
    fn test_update_keeps_supplied_times() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        let running = fx
            .engine
            .update(
                &id,
                &fields(&[("state", "running"), ("start_time", "2023-12-31_23:00:00")]),
            )
            .unwrap();
        assert_eq!(running.start_time.as_deref(), Some("2023-12-31_23:00:00"));
    }

    #[test]
    fn test_terminal_states_do_not_go_back() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        fx.engine
            .update(&id, &fields(&[("state", "error"), ("reason", "boom")]))
            .unwrap();
        let err = fx
            .engine
            .update(&id, &fields(&[("state", "running")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(fx.engine.get(&id).unwrap().state, RequestState::Error);
    }

    #[test]
    fn test_running_does_not_go_back_to_pending() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        fx.engine
            .update(&id, &fields(&[("state", "running")]))
            .unwrap();
        let err = fx
            .engine
            .update(&id, &fields(&[("state", "pending")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(fx.engine.get(&id).unwrap().state, RequestState::Running);

        // re-asserting the current state is not a transition
        let again = fx.engine.update(&id, &fields(&[("state", "running")]));
        assert!(again.is_ok());
        let fresh = submit(&fx, "hostA", "boardA");
        assert!(fx
            .engine
            .update(&fresh, &fields(&[("state", "pending")]))
            .is_ok());
    }

    #[test]
    fn test_update_missing_request() {
        let fx = fixture();
        let id = RequestId::parse("request-2024-01-01_00:00:00.00-hostA:boardA").unwrap();
        let err = fx
            .engine
            .update(&id, &fields(&[("state", "running")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_timeout_boundary() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        fx.engine
            .update(
                &id,
                &fields(&[("state", "running"), ("start_time", "2024-01-01_00:00:00.00")]),
            )
            .unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        fx.clock.set(start + Duration::hours(11) + Duration::minutes(59));
        assert!(fx.engine.sweep_timeouts().unwrap().is_empty());

        fx.clock.set(start + Duration::hours(12));
        assert!(fx.engine.sweep_timeouts().unwrap().is_empty());
        assert_eq!(fx.engine.get(&id).unwrap().state, RequestState::Running);

        fx.clock.set(start + Duration::hours(12) + Duration::seconds(1));
        assert_eq!(fx.engine.sweep_timeouts().unwrap(), vec![id.stem()]);
        let request = fx.engine.get(&id).unwrap();
        assert_eq!(request.state, RequestState::Error);
        assert_eq!(request.reason.as_deref(), Some(TIMEOUT_REASON));
        assert!(request.done_time.is_some());
    }

    #[test]
    fn test_timeout_keeps_run_id() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        fx.engine
            .update(
                &id,
                &fields(&[
                    ("state", "running"),
                    ("start_time", "2023-01-01T00:00:00Z"),
                    ("run_id", "run-1"),
                ]),
            )
            .unwrap();
        fx.engine.sweep_timeouts().unwrap();
        let request = fx.engine.get(&id).unwrap();
        assert_eq!(request.state, RequestState::Error);
        assert_eq!(request.run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_unparsable_start_time_fails_fast() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        fx.engine
            .update(
                &id,
                &fields(&[("state", "running"), ("start_time", "yesterday-ish")]),
            )
            .unwrap();
        fx.engine.sweep_timeouts().unwrap();
        let request = fx.engine.get(&id).unwrap();
        assert_eq!(request.state, RequestState::Error);
        assert!(request.reason.unwrap().contains("yesterday-ish"));
    }

    #[test]
    fn test_query_filters_and_sweeps() {
        let fx = fixture();
        let a = submit(&fx, "hostA", "boardA");
        let b = submit(&fx, "hostA", "boardB");
        let _c = submit(&fx, "hostB", "other");
        fx.engine
            .update(&a, &fields(&[("state", "done")]))
            .unwrap();

        let params: QueryParams = [("board", "board*"), ("state", "done")]
            .into_iter()
            .collect();
        assert_eq!(
            fx.engine.query(&params).unwrap(),
            vec![format!("{}.json", a.stem())]
        );

        let params: QueryParams = [("host", "hostA")].into_iter().collect();
        assert_eq!(
            fx.engine.query(&params).unwrap(),
            vec![format!("{}.json", a.stem()), format!("{}.json", b.stem())]
        );
    }

    #[test]
    fn test_remove() {
        let fx = fixture();
        let id = submit(&fx, "hostA", "boardA");
        fx.engine.remove(&id).unwrap();
        let err = fx.engine.remove(&id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_legacy_new_state_loads_as_pending() {
        let state: RequestState = serde_json::from_str("\"new\"").unwrap();
        assert_eq!(state, RequestState::Pending);
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"pending\"");
    }

    fn write_legacy(fx: &Fixture, stem: &str, state: &str, start_time: Option<&str>) {
        let record = serde_json::json!({
            "board": "boardA",
            "host": "hostA",
            "request_time": "2023-12-31_09:05:02.07",
            "start_time": start_time,
            "state": state,
            "test_name": "Functional.bc",
        });
        let path = fx.store.record_path(Collection::Requests, stem).unwrap();
        std::fs::write(path, serde_json::to_vec_pretty(&record).unwrap()).unwrap();
    }

    #[test]
    fn test_legacy_record_without_request_id() {
        let fx = fixture();
        let stem = "request-2023-12-31_09:05:02.07-hostA:boardA";
        write_legacy(&fx, stem, "new", None);

        let id = RequestId::parse(stem).unwrap();
        let request = fx.engine.get(&id).unwrap();
        assert_eq!(request.request_id, stem);
        assert_eq!(request.state, RequestState::Pending);

        let updated = fx
            .engine
            .update(&id, &fields(&[("state", "running")]))
            .unwrap();
        assert_eq!(updated.request_id, stem);
        let stored = fx.store.load_value(Collection::Requests, stem).unwrap();
        assert_eq!(stored["request_id"], stem);
    }

    #[test]
    fn test_legacy_running_record_is_swept() {
        let fx = fixture();
        let stem = "request-2023-12-31_09:05:02.07-hostA:boardA";
        // 13 hours before the fixture clock
        write_legacy(&fx, stem, "running", Some("2023-12-31_11:00:00.00"));

        let expired = fx.engine.sweep_timeouts().unwrap();
        assert_eq!(expired, vec![stem.to_string()]);

        let request = fx.engine.get(&RequestId::parse(stem).unwrap()).unwrap();
        assert_eq!(request.state, RequestState::Error);
        assert_eq!(request.request_id, stem);
        assert_eq!(request.reason.as_deref(), Some(TIMEOUT_REASON));
    }
}
