pub mod cluster;
pub mod forecast;
pub mod gci_store;
pub mod schedule;
pub mod scheduler;
pub mod simulation;
pub mod strategy;
pub mod utils;
