use std::collections::BTreeSet;

use crate::domain::cluster::gres::Gres;
use crate::domain::utils::id::{NodeName, PartitionName};

/// Static description of one compute node as the strategies see it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub name: NodeName,

    /// Scheduling weight reported by the batch system; lower is preferred.
    pub weight: u32,
    pub partitions: BTreeSet<PartitionName>,
    pub generic_resources: Vec<Gres>,

    /// Thermal design power of the CPUs in watts.
    pub cpu_tdp: Option<u32>,

    /// Thermal design power of the GPUs in watts.
    pub gpu_tdp: Option<u32>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        NodeInfo { name: NodeName::new(name), weight, partitions: BTreeSet::new(), generic_resources: Vec::new(), cpu_tdp: None, gpu_tdp: None }
    }

    pub fn with_partitions<'a>(mut self, partitions: impl IntoIterator<Item = &'a str>) -> Self {
        self.partitions.extend(partitions.into_iter().map(PartitionName::new));
        self
    }

    pub fn with_gres(mut self, generic_resources: Vec<Gres>) -> Self {
        self.generic_resources = generic_resources;
        self
    }

    pub fn with_tdp(mut self, cpu_tdp: Option<u32>, gpu_tdp: Option<u32>) -> Self {
        self.cpu_tdp = cpu_tdp;
        self.gpu_tdp = gpu_tdp;
        self
    }

    pub fn in_any_partition(&self, partitions: &[PartitionName]) -> bool {
        partitions.iter().any(|partition| self.partitions.contains(partition))
    }

    /// Number of GPUs of `gpu_type` (any model if `None`) this node advertises.
    pub fn gpu_count(&self, gpu_type: Option<&str>) -> u32 {
        self.generic_resources.iter().map(|gres| gres.gpus_matching(gpu_type)).sum()
    }

    /// Power proxy used to rank nodes. For GPU jobs CPU and GPU TDP are weighted equally; if only
    /// one of them is known, that one is used.
    pub fn tdp(&self, uses_gpu: bool) -> Option<f64> {
        let cpu = self.cpu_tdp.map(f64::from);
        if !uses_gpu {
            return cpu;
        }

        match (cpu, self.gpu_tdp.map(f64::from)) {
            (Some(cpu), Some(gpu)) => Some((cpu + gpu) / 2.0),
            (cpu, gpu) => cpu.or(gpu),
        }
    }
}
