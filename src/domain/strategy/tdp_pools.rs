use crate::domain::cluster::node_info::NodeInfo;
use crate::domain::utils::id::NodeName;

/// Known-TDP nodes sharing one TDP value.
#[derive(Debug, Clone, PartialEq)]
pub struct TdpPool {
    pub tdp: f64,
    pub nodes: Vec<NodeName>,
}

/// Candidate nodes grouped by power draw. Pools are ordered by ascending TDP; nodes keep their
/// resolver order inside a pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TdpPools {
    pub pools: Vec<TdpPool>,

    /// Nodes without a known TDP.
    pub blackbox: Vec<NodeName>,
}

impl TdpPools {
    pub fn new(nodes: &[NodeInfo], uses_gpu: bool) -> Self {
        let mut known: Vec<(f64, &NodeName)> = Vec::new();
        let mut blackbox = Vec::new();

        for node in nodes {
            match node.tdp(uses_gpu) {
                Some(tdp) => known.push((tdp, &node.name)),
                None => blackbox.push(node.name.clone()),
            }
        }

        known.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut pools: Vec<TdpPool> = Vec::new();
        for (tdp, name) in known {
            match pools.last_mut() {
                Some(pool) if pool.tdp == tdp => pool.nodes.push(name.clone()),
                _ => pools.push(TdpPool { tdp, nodes: vec![name.clone()] }),
            }
        }

        TdpPools { pools, blackbox }
    }

    /// Known-TDP nodes in ascending TDP order.
    pub fn known_nodes(&self) -> impl Iterator<Item = &NodeName> {
        self.pools.iter().flat_map(|pool| pool.nodes.iter())
    }

    /// Earliest window start each pool may be used from.
    ///
    /// The cheapest pool starts at 0; every further pool starts `floor(tdp_gap / balance_grade)`
    /// hours after the previous one, clamped to `max_start`. A low `balance_grade` pushes the
    /// expensive pools further into the future.
    pub fn markers(&self, balance_grade: f64, max_start: usize) -> Vec<usize> {
        let mut markers = Vec::with_capacity(self.pools.len());
        let mut marker = 0usize;

        for (index, pool) in self.pools.iter().enumerate() {
            if index > 0 {
                let gap = pool.tdp - self.pools[index - 1].tdp;
                let shift = if balance_grade > 0.0 { (gap / balance_grade).floor() } else { f64::INFINITY };
                marker = if shift >= (max_start - marker) as f64 { max_start } else { marker + shift as usize };
            }
            markers.push(marker.min(max_start));
        }

        markers
    }
}
