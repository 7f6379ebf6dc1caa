//! The kanban table document posted by every worker.
//!
//! Built once at startup with random identifiers, serialized once, and shared
//! read-only by all workers for the life of the process.

use hyper::body::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GROUP_COUNT: usize = 10;
pub const ITEMS_PER_GROUP: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanItem {
    pub id: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanGroup {
    #[serde(rename = "groupName")]
    pub name: String,
    pub items: Vec<KanbanItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanTable {
    #[serde(rename = "tableName")]
    pub table_name: String,
    pub groups: Vec<KanbanGroup>,
}

impl KanbanTable {
    /// Builds a table of 10 groups with 20 items each.
    ///
    /// Item ids run 0..200 in group order; names and contents are random UUIDs.
    pub fn random() -> Self {
        let groups = (0..GROUP_COUNT)
            .map(|g| KanbanGroup {
                name: Uuid::new_v4().to_string(),
                items: (0..ITEMS_PER_GROUP)
                    .map(|i| KanbanItem {
                        id: (g * ITEMS_PER_GROUP + i) as i64,
                        content: Uuid::new_v4().to_string(),
                    })
                    .collect(),
            })
            .collect();

        KanbanTable {
            table_name: Uuid::new_v4().to_string(),
            groups,
        }
    }

    /// Serializes the table into a cheaply clonable request body.
    pub fn to_body(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
