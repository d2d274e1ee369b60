pub mod sinfo_response;
pub mod slurm_cli;
