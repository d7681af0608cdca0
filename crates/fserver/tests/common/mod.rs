//! Shared fixtures for action-surface tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fserver::{ActionRequest, ActionResponse, FuegoServer, UploadedFile};
use fserver_store::{ManualClock, ServerConfig};
use fserver_test_utils::TestLayout;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Harness {
    pub layout: TestLayout,
    pub clock: Arc<ManualClock>,
    pub server: FuegoServer,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 3, 7, 9, 5, 2).unwrap()
}

impl Harness {
    pub fn new() -> Self {
        let layout = TestLayout::new().unwrap();
        let config_path = layout.write_config("").unwrap();
        let config = ServerConfig::load(&config_path).unwrap();
        let clock = Arc::new(ManualClock::new(start_time()));
        let server = FuegoServer::open(config)
            .unwrap()
            .with_clock(clock.clone());
        Self {
            layout,
            clock,
            server,
        }
    }

    pub fn call(&self, action: &str, fields: &[(&str, &str)]) -> ActionResponse {
        let mut request = ActionRequest::new(action);
        for (k, v) in fields {
            request = request.field(*k, *v);
        }
        self.server.handle(request)
    }

    pub fn upload(&self, action: &str, filename: &str, bytes: Vec<u8>) -> ActionResponse {
        let request =
            ActionRequest::new(action).upload(UploadedFile::new(filename, Cursor::new(bytes)));
        self.server.handle(request)
    }

    pub fn show(&self, page: &str) -> ActionResponse {
        self.server.handle(ActionRequest::new("show").page(page))
    }

    pub fn register_board(&self, host: &str, board: &str) {
        let response = self.call("put_board", &[("host", host), ("board", board)]);
        assert!(response.is_ok(), "{}", response.render());
    }

    /// Submit a request and return its id. Advances the clock so requests
    /// for the same board never share a timestamp.
    pub fn submit(&self, host: &str, board: &str) -> String {
        let response = self.call(
            "put_request",
            &[("host", host), ("board", board), ("test_name", "Functional.bc")],
        );
        assert!(response.is_ok(), "{}", response.render());
        self.clock.advance(chrono::Duration::seconds(1));
        response
            .body
            .strip_prefix("request_id=")
            .unwrap()
            .to_string()
    }

    pub fn request_record(&self, id: &str) -> serde_json::Value {
        let response = self.call("get_request", &[("request_id", id)]);
        assert!(response.is_ok(), "{}", response.render());
        serde_json::from_str(&response.body).unwrap()
    }

    pub fn data_path(&self, rel: &str) -> PathBuf {
        self.layout.data_dir().join(rel)
    }

    pub fn files_path(&self, rel: &str) -> PathBuf {
        self.layout.files_dir().join(rel)
    }

    /// Visible record files in one collection.
    pub fn record_files(&self, collection: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.data_path(collection))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }
}
