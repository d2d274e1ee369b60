pub mod fifo;
pub mod planning_strategy;
pub mod spatial;
pub mod spatial_greedy;
pub mod spatiotemporal;
pub mod tdp_pools;
pub mod temporal;

#[cfg(test)]
mod test_strategies;
