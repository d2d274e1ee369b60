use crate::api::config_dto::SquirrelConfigDto;
use crate::domain::cluster::batch_system_trait::BatchSystem;
use crate::domain::cluster::topology::ClusterTopology;
use crate::error::Result;
use crate::loader::parser::load_cluster_meta;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Builds the cluster topology from the node list of `batch_system` and the cluster meta file of
/// the configuration.
pub async fn load_topology(config: &SquirrelConfigDto, batch_system: &dyn BatchSystem) -> Result<ClusterTopology> {
    let sinfo = batch_system.list_nodes().await?;
    log::info!("Batch system reported {} node entries.", sinfo.nodes.len());

    let meta = load_cluster_meta(config.local.cluster_meta.as_deref())?;

    Ok(ClusterTopology::from_sinfo(&sinfo, &meta))
}
