//! Action dispatcher.
//!
//! [`FuegoServer`] owns one instance of every store component, built from
//! a resolved [`ServerConfig`]. Each call is handled independently; the
//! only shared state is the configuration.

use crate::action::{Action, ActionRequest, ActionResponse, Outcome, UploadedFile};
use crate::render::{
    ListPage, PageRenderer, PLAIN_LAYOUT, REQUEST_LAYOUT, RUN_LAYOUT, TEST_LAYOUT,
};
use fserver_ids::{BinaryPackageId, BoardId, RequestId, RunId, REQUEST_PREFIX, RUN_PREFIX};
use fserver_store::{
    encode_record, BoardRegistry, BundleIngestor, Clock, Collection, PackageCatalog, QueryParams,
    RecordStore, RequestEngine, Result, RunRegistry, ServerConfig, StoreError, Upload,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Page name that renders the index.
const INDEX_PAGE: &str = "fserver";

pub struct FuegoServer {
    config: ServerConfig,
    store: RecordStore,
    boards: BoardRegistry,
    requests: RequestEngine,
    runs: RunRegistry,
    ingestor: BundleIngestor,
    packages: PackageCatalog,
    renderer: PageRenderer,
}

impl FuegoServer {
    /// Create the data and files trees if needed and wire up components.
    pub fn open(config: ServerConfig) -> Result<Self> {
        let store = config.ensure_layout()?;
        let boards = BoardRegistry::new(store.clone());
        let requests =
            RequestEngine::new(store.clone(), boards.clone(), config.request_timeout());
        let runs = RunRegistry::new(store.clone(), &config.files_dir, &config.files_url_base);
        let ingestor = BundleIngestor::new(store.clone(), &config.files_dir);
        let packages = PackageCatalog::new(store.clone());
        let renderer = PageRenderer::new(&config.url_base);
        debug!("Opened store at {}", store.root().display());

        Ok(Self {
            config,
            store,
            boards,
            requests,
            runs,
            ingestor,
            packages,
            renderer,
        })
    }

    /// Replace the clock used for request timestamps and the timeout sweep.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.requests = self.requests.with_clock(clock);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle one call. Never fails: errors become the `FAIL` payload (or
    /// an HTML error page for `show`).
    pub fn handle(&self, request: ActionRequest) -> ActionResponse {
        let ActionRequest {
            action,
            fields,
            upload,
            page,
        } = request;

        let action = match Action::parse(&action) {
            Ok(action) => action,
            Err(e) => {
                warn!("{}", e);
                return ActionResponse::fail(&e);
            }
        };
        if action == Action::Show {
            return self.show(page.as_deref());
        }

        debug!("Handling {}", action);
        match self.dispatch(action, fields, upload) {
            Ok(body) => ActionResponse::ok(body),
            Err(e) => {
                warn!("{} failed: {}", action, e);
                ActionResponse::fail(&e)
            }
        }
    }

    fn dispatch(
        &self,
        action: Action,
        fields: BTreeMap<String, String>,
        upload: Option<UploadedFile>,
    ) -> Result<String> {
        match action {
            Action::PutTest => {
                let report = self.ingestor.ingest_test(take_upload(upload)?)?;
                Ok(report.summary())
            }
            Action::PutBinaryPackage => {
                let report = self.ingestor.ingest_binary_package(take_upload(upload)?)?;
                Ok(report.summary())
            }
            Action::PutRun => {
                let report = self.ingestor.ingest_run(take_upload(upload)?)?;
                Ok(report.summary())
            }
            Action::PutBoard => {
                let id = BoardId::new(
                    required(&fields, "host")?,
                    required(&fields, "board")?,
                )?;
                self.boards.register(&id, fields)?;
                Ok(format!("Board {} registered", id))
            }
            Action::PutRequest => {
                let request = self.requests.create(fields)?;
                Ok(format!("request_id={}", request.request_id))
            }
            Action::UpdateRequest => {
                let id = RequestId::parse(required(&fields, "request_id")?)?;
                let payload: BTreeMap<String, String> = fields
                    .into_iter()
                    .filter(|(k, _)| k != "request_id")
                    .collect();
                let request = self.requests.update(&id, &payload)?;
                record_text(&request)
            }
            Action::QueryBoards => Ok(self.boards.query(&QueryParams::new(fields))?.join("\n")),
            Action::QueryRequests => {
                Ok(self.requests.query(&QueryParams::new(fields))?.join("\n"))
            }
            Action::QueryRuns => Ok(self.runs.query(&QueryParams::new(fields))?.join("\n")),
            Action::QueryTests => Ok(self
                .packages
                .query_tests(&QueryParams::new(fields))?
                .join("\n")),
            Action::QueryBinaryPackages => Ok(self
                .packages
                .query_binary_packages(&QueryParams::new(fields))?
                .join("\n")),
            Action::GetRequest => {
                let id = RequestId::parse(required(&fields, "request_id")?)?;
                record_text(&self.requests.get(&id)?)
            }
            Action::GetRun => {
                let id = RunId::parse(required(&fields, "run_id")?)?;
                record_text(&self.runs.get(&id)?)
            }
            Action::GetRunUrl => {
                let id = RunId::parse(required(&fields, "run_id")?)?;
                self.runs.url(&id)
            }
            Action::GetTest => self.packages.get_test(required(&fields, "name")?),
            Action::RemoveRequest => {
                let id = RequestId::parse(required(&fields, "request_id")?)?;
                self.requests.remove(&id)?;
                Ok(format!("Request {} removed", id))
            }
            Action::RemoveRun => {
                let id = RunId::parse(required(&fields, "run_id")?)?;
                let report = self.runs.remove(&id)?;
                info!("Removed run {}", id);
                Ok(report.to_string())
            }
            Action::Show => Err(StoreError::bad_request("show is rendered as HTML")),
        }
    }

    fn show(&self, page: Option<&str>) -> ActionResponse {
        let page = page.unwrap_or(INDEX_PAGE);
        match self.render_page(page) {
            Ok(html) => ActionResponse::html(Outcome::Ok, html),
            Err(e) => {
                warn!("show {} failed: {}", page, e);
                ActionResponse::html(Outcome::Fail, self.renderer.error(&e.to_string()))
            }
        }
    }

    fn render_page(&self, page: &str) -> Result<String> {
        if page.is_empty() || page == INDEX_PAGE {
            return Ok(self.renderer.index());
        }
        if let Some(list) = ListPage::parse(page) {
            let collection = list.collection();
            let items = self
                .store
                .list(collection)?
                .iter()
                .map(|stem| collection.file_name(stem))
                .collect();
            return Ok(self.renderer.list(list, items));
        }

        if page.starts_with(REQUEST_PREFIX) {
            let id = RequestId::parse(page)?;
            let record = serde_json::to_value(self.requests.get(&id)?)?;
            Ok(self.renderer.item(page, &record, REQUEST_LAYOUT))
        } else if page.starts_with(RUN_PREFIX) {
            let id = RunId::parse(page)?;
            Ok(self.renderer.item(page, &self.runs.get(&id)?, RUN_LAYOUT))
        } else if page.ends_with(".yaml") {
            let record = self.packages.get_test_value(page)?;
            Ok(self.renderer.item(page, &record, TEST_LAYOUT))
        } else if let Ok(id) = BinaryPackageId::from_stem(Collection::BinaryPackages.stem_of(page))
        {
            let record = self.packages.get_binary_package(&id.stem())?;
            Ok(self.renderer.item(page, &record, PLAIN_LAYOUT))
        } else if let Ok(id) = BoardId::parse(Collection::Boards.stem_of(page)) {
            let record = serde_json::to_value(self.boards.get(&id)?)?;
            Ok(self.renderer.item(page, &record, PLAIN_LAYOUT))
        } else {
            Err(StoreError::not_found(format!("Unknown page '{}'", page)))
        }
    }
}

fn required<'a>(fields: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StoreError::bad_request(format!("Missing {} in form data", key)))
}

fn take_upload(upload: Option<UploadedFile>) -> Result<Upload<Box<dyn std::io::Read + Send>>> {
    let upload = upload.ok_or_else(|| StoreError::bad_request("Missing file in form data"))?;
    Ok(Upload::new(upload.filename, upload.body))
}

fn record_text<T: serde::Serialize>(record: &T) -> Result<String> {
    let bytes = encode_record(record)?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}
