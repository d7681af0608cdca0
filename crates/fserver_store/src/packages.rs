//! Catalog of ingested test and binary packages.

use crate::error::Result;
use crate::query::{self, QueryParams};
use crate::store::{Collection, RecordStore};
use fserver_ids::{BinaryPackageId, TestPackageId};
use serde_json::Value;

pub const TEST_NAME_FIELDS: [&str; 1] = ["name"];
pub const BINARY_NAME_FIELDS: [&str; 3] = ["toolchain", "test_type", "name"];

#[derive(Debug, Clone)]
pub struct PackageCatalog {
    store: RecordStore,
}

impl PackageCatalog {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Manifest file names of test packages whose name matches.
    pub fn query_tests(&self, params: &QueryParams) -> Result<Vec<String>> {
        let stems = self.store.list(Collection::Tests)?;
        let matched = query::filter_by_name(stems, &TEST_NAME_FIELDS, params, |stem| {
            TestPackageId::from_stem(stem)
                .ok()
                .map(|id| vec![id.name().to_string()])
        });
        Ok(matched
            .iter()
            .map(|stem| Collection::Tests.file_name(stem))
            .collect())
    }

    pub fn query_binary_packages(&self, params: &QueryParams) -> Result<Vec<String>> {
        let stems = self.store.list(Collection::BinaryPackages)?;
        let matched = query::filter_by_name(stems, &BINARY_NAME_FIELDS, params, |stem| {
            BinaryPackageId::from_stem(stem).ok().map(|id| {
                vec![
                    id.toolchain().to_string(),
                    id.test_type().to_string(),
                    id.name().to_string(),
                ]
            })
        });
        Ok(matched
            .iter()
            .map(|stem| Collection::BinaryPackages.file_name(stem))
            .collect())
    }

    /// The stored `test.yaml`, verbatim. Accepts the stem or the file name.
    pub fn get_test(&self, name: &str) -> Result<String> {
        let stem = Collection::Tests.stem_of(name);
        let id = TestPackageId::from_stem(stem)?;
        self.store.load_text(Collection::Tests, id.stem())
    }

    /// The stored test manifest decoded for rendering.
    pub fn get_test_value(&self, name: &str) -> Result<Value> {
        let stem = Collection::Tests.stem_of(name);
        let id = TestPackageId::from_stem(stem)?;
        self.store.load_value(Collection::Tests, id.stem())
    }

    pub fn get_binary_package(&self, name: &str) -> Result<Value> {
        let stem = Collection::BinaryPackages.stem_of(name);
        let id = BinaryPackageId::from_stem(stem)?;
        self.store
            .load_value(Collection::BinaryPackages, &id.stem())
    }
}
