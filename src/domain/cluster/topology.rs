use std::collections::BTreeMap;

use crate::api::cluster_meta_dto::ClusterMetaDto;
use crate::domain::cluster::gres::parse_gres_list;
use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::cluster::slurm::sinfo_response::SinfoResponse;
use crate::domain::utils::id::{NodeName, PartitionName};

/// Snapshot of the cluster nodes, enriched with the TDP values of the cluster meta file.
#[derive(Debug, Clone, Default)]
pub struct ClusterTopology {
    nodes: BTreeMap<NodeName, NodeInfo>,
}

impl ClusterTopology {
    pub fn new(nodes: Vec<NodeInfo>) -> Self {
        let mut topology = ClusterTopology::default();

        for node in nodes {
            if let Some(previous) = topology.nodes.insert(node.name.clone(), node) {
                log::warn!("Node {} is listed twice, keeping the later entry.", previous.name);
            }
        }

        topology
    }

    /// Builds the topology from `sinfo --json` output. `sinfo` lists a node once per partition,
    /// the entries are merged by node name.
    pub fn from_sinfo(response: &SinfoResponse, meta: &ClusterMetaDto) -> Self {
        let mut nodes: BTreeMap<NodeName, NodeInfo> = BTreeMap::new();

        for sinfo_node in &response.nodes {
            let name = sinfo_node.node_name();
            if name.is_empty() {
                log::warn!("Skipping sinfo entry without a node name.");
                continue;
            }

            let node = nodes.entry(NodeName::new(name)).or_insert_with(|| {
                NodeInfo::new(name, sinfo_node.weight)
                    .with_gres(parse_gres_list(&sinfo_node.gres))
                    .with_tdp(meta.get_cpu_tdp(name), meta.get_gpu_tdp(name))
            });
            node.partitions.extend(sinfo_node.partitions.iter().map(PartitionName::new));
        }

        log::info!("Loaded cluster topology with {} nodes.", nodes.len());
        ClusterTopology { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_node(&self, name: &NodeName) -> Option<&NodeInfo> {
        self.nodes.get(name)
    }

    /// Nodes of any of `partitions` that advertise at least `gpu_count` GPUs of `gpu_type`
    /// (any model if `None`), sorted ascending by weight and then by name.
    ///
    /// An empty result is valid and means no node can run the job.
    pub fn resolve_nodes(&self, partitions: &[PartitionName], gpu_count: Option<u32>, gpu_type: Option<&str>) -> Vec<NodeInfo> {
        let mut candidates: Vec<NodeInfo> = self
            .nodes
            .values()
            .filter(|node| node.in_any_partition(partitions))
            .filter(|node| gpu_count.is_none_or(|count| node.gpu_count(gpu_type) >= count))
            .cloned()
            .collect();

        candidates.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));

        log::debug!("Resolved {} nodes for partitions {:?} (gpus: {:?}, type: {:?}).", candidates.len(), partitions, gpu_count, gpu_type);
        candidates
    }
}
