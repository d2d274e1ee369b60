pub mod electricity_maps;
pub mod gci_store_trait;
pub mod in_memory;
pub mod influxdb;
