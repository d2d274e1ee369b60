pub mod forecast_service;
pub mod forecaster;
