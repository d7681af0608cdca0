//! Board registry: the admission gate for requests.

use crate::error::{Result, StoreError};
use crate::query::{self, QueryParams};
use crate::store::{Collection, RecordStore};
use fserver_ids::BoardId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

/// Filename fields a board query can match without opening records.
pub const BOARD_NAME_FIELDS: [&str; 2] = ["host", "board"];

/// A registered board descriptor: identity plus free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub host: String,
    pub board: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Board {
    pub fn id(&self) -> Result<BoardId> {
        Ok(BoardId::new(&self.host, &self.board)?)
    }
}

#[derive(Debug, Clone)]
pub struct BoardRegistry {
    store: RecordStore,
}

impl BoardRegistry {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Write or overwrite the descriptor for `host:board`.
    ///
    /// `host`, `board` and `action` keys in `attributes` are ignored; the
    /// identity comes from the id.
    pub fn register(&self, id: &BoardId, attributes: BTreeMap<String, String>) -> Result<Board> {
        let board = Board {
            host: id.host().to_string(),
            board: id.board().to_string(),
            attributes: attributes
                .into_iter()
                .filter(|(k, _)| !matches!(k.as_str(), "host" | "board" | "action"))
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        };
        self.store.replace(Collection::Boards, &id.stem(), &board)?;
        info!("Registered board {}", id);
        Ok(board)
    }

    pub fn exists(&self, id: &BoardId) -> bool {
        self.store.contains(Collection::Boards, &id.stem())
    }

    pub fn get(&self, id: &BoardId) -> Result<Board> {
        self.store
            .load(Collection::Boards, &id.stem())
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    StoreError::not_found(format!("Board {} is not registered", id))
                }
                other => other,
            })
    }

    /// Record file names of boards matching the `host`/`board` patterns.
    pub fn query(&self, params: &QueryParams) -> Result<Vec<String>> {
        let stems = self.store.list(Collection::Boards)?;
        let matched = query::filter_by_name(stems, &BOARD_NAME_FIELDS, params, |stem| {
            BoardId::parse(stem)
                .ok()
                .map(|id| vec![id.host().to_string(), id.board().to_string()])
        });
        Ok(matched
            .iter()
            .map(|stem| Collection::Boards.file_name(stem))
            .collect())
    }
}
