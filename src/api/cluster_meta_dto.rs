use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Additional per-node information which the batch system does not report.
///
/// ```json
/// { "nodes": { "gx01": { "cpus": { "tdp": 125 }, "gpus": { "tdp": 300 } } } }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClusterMetaDto {
    #[serde(default)]
    pub nodes: HashMap<String, NodeMetaDto>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeMetaDto {
    #[serde(default)]
    pub cpus: Option<DeviceMetaDto>,
    #[serde(default)]
    pub gpus: Option<DeviceMetaDto>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceMetaDto {
    /// Thermal design power in watts.
    pub tdp: Option<u32>,
}

impl ClusterMetaDto {
    pub fn get_cpu_tdp(&self, node: &str) -> Option<u32> {
        self.nodes.get(node)?.cpus.as_ref()?.tdp
    }

    pub fn get_gpu_tdp(&self, node: &str) -> Option<u32> {
        self.nodes.get(node)?.gpus.as_ref()?.tdp
    }
}
