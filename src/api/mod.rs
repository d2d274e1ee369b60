pub mod cluster_meta_dto;
pub mod config_dto;
pub mod scenario_dto;
