//! Fuego server action surface.
//!
//! An HTTP front end (or the `fserver` binary) builds an [`ActionRequest`]
//! from form fields and an optional uploaded file, hands it to
//! [`FuegoServer::handle`], and writes [`ActionResponse::render`] back.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fserver::{ActionRequest, FuegoServer};
//! use fserver_store::ServerConfig;
//!
//! let server = FuegoServer::open(ServerConfig::resolve(None)?)?;
//! let response = server.handle(
//!     ActionRequest::new("put_board")
//!         .field("host", "timdesk")
//!         .field("board", "bbb"),
//! );
//! println!("{}", response.render());
//! ```

pub mod action;
pub mod render;
pub mod server;

pub use action::{Action, ActionRequest, ActionResponse, ContentType, Outcome, UploadedFile};
pub use render::{ListPage, PageRenderer};
pub use server::FuegoServer;
