//! Workflow document (workflow.json): a flat list of nodes.
//!
//! JSON shape:
//! {
//!   "nodes": [
//!     {
//!       "name": "reader",
//!       "inputs": [],
//!       "outputs": [{ "origin": "TST", "description": "RAW", "sub_spec": 0 }],
//!       "timeslices": 1,            // optional
//!       "labels": ["expendable"],   // optional
//!       "options": [],              // optional
//!       "completion": "consume-all" // optional
//!     }
//!   ]
//! }

use crate::Result;
use crate::spec::Node;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Workflow {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl From<Vec<Node>> for Workflow {
    fn from(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}
