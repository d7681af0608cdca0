//! Fuego Server Test Utilities
//!
//! Builders for real tar / tar.gz bundles and throwaway server trees.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fserver_test_utils::{bundles, TestLayout};
//!
//! let layout = TestLayout::new().unwrap();
//! let bytes = bundles::test_package("mytest", "name: mytest\n").unwrap();
//! // hand `bytes` to the ingestor as `mytest-1.0-1.ftp`
//! ```

pub mod archive;
pub mod bundles;
pub mod layout;

pub use archive::ArchiveBuilder;
pub use layout::TestLayout;
