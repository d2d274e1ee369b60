pub mod footprint;
pub mod simulation;
