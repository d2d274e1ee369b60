use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root object printed by `sinfo --json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SinfoResponse {
    #[serde(default)]
    pub nodes: Vec<SinfoNode>,
    #[serde(default)]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub warnings: Vec<serde_json::Value>,

    #[serde(flatten)]
    pub extra_fields: HashMap<String, serde_json::Value>,
}

/// One compute node of the `sinfo --json` output. Only the attributes the scheduler uses are
/// typed; everything else ends up in `unknown_attributes`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SinfoNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: String,

    // Lower weights are preferred by Slurm when allocating nodes.
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub partitions: Vec<String>,

    // Comma separated generic resources, e.g. "gpu:a100:2(S:0-1)".
    #[serde(default)]
    pub gres: String,

    // The total number of logical processors (CPUs) available on the node.
    #[serde(default)]
    pub cpus: u32,
    #[serde(default)]
    pub state: serde_json::Value,

    /// Captures any new attributes added in future Slurm releases
    #[serde(flatten)]
    pub unknown_attributes: HashMap<String, serde_json::Value>,
}

impl SinfoNode {
    /// Node name used for `--nodelist`. Older Slurm versions only report `hostname`.
    pub fn node_name(&self) -> &str {
        if self.name.is_empty() { &self.hostname } else { &self.name }
    }
}
