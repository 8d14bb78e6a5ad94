// Library for tests to access modules

pub mod config;
pub mod metrics_repo;
pub mod models;
pub mod netstat;
pub mod probe;
pub mod reconcile;
pub mod routes;
pub mod sampler;
pub mod sessions;
pub mod version;
