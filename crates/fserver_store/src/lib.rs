//! Fuego server core.
//!
//! A filesystem-backed record store with filename-encoded indexing, and the
//! components built on it:
//!
//! - [`store`]: one file per record, atomic writes, per-record locks
//! - [`query`]: wildcard matching and two-stage filtering
//! - [`boards`]: board registry, the admission gate for requests
//! - [`ingest`]: upload acceptor and bundle ingestion
//! - [`requests`]: request lifecycle and the timeout sweep
//! - [`runs`]: run queries, URLs and best-effort removal
//! - [`packages`]: test and binary package catalog

pub mod archive;
pub mod boards;
pub mod clock;
pub mod config;
pub mod error;
pub mod ingest;
pub mod lock;
pub mod packages;
pub mod query;
pub mod removal;
pub mod requests;
pub mod runs;
pub mod store;

pub use boards::{Board, BoardRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{fserver_home, ServerConfig};
pub use error::{ErrorKind, Result, StoreError};
pub use ingest::{BundleIngestor, IngestReport, Upload, UploadAcceptor};
pub use packages::PackageCatalog;
pub use query::{item_match, AttributeSchema, FirstMatchSchema, QueryParams};
pub use removal::{RemovalReport, StepStatus};
pub use requests::{Request, RequestEngine, RequestState};
pub use runs::RunRegistry;
pub use store::{encode_record, Collection, Mutation, RecordStore};
