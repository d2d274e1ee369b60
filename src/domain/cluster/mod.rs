pub mod batch_system_trait;
pub mod gres;
pub mod node_info;
pub mod slurm;
pub mod topology;
