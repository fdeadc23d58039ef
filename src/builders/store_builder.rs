//! Builders that turn a [`QueueConfig`] into a backend and a scheduler.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::config::{BackendConfig, QueueConfig};
use crate::core::{DeadlineScheduler, PriorityFanout, PriorityStore, QueueError, Registry};

/// Build the backend selected by `cfg`.
///
/// # Errors
///
/// `QueueError::InvalidConfiguration` if `cfg` does not validate or names a
/// backend this build was compiled without; connection failures from the
/// backend otherwise.
pub fn build_store<P>(cfg: &QueueConfig) -> Result<Arc<dyn PriorityStore<P>>, QueueError>
where
    P: Serialize + DeserializeOwned + Send + 'static,
{
    cfg.validate()
        .map_err(|e| QueueError::InvalidConfiguration(format!("config invalid: {e}")))?;

    match &cfg.backend {
        BackendConfig::InMemory => {
            info!("using in-memory registry backend");
            Ok(Arc::new(Registry::<P>::new()))
        }
        #[cfg(feature = "redis-store")]
        BackendConfig::Redis { url, key } => {
            let store = crate::infra::store::DistributedStore::open(url, key.as_str())?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis-store"))]
        BackendConfig::Redis { .. } => Err(QueueError::InvalidConfiguration(
            "redis backend requires the `redis-store` feature".into(),
        )),
    }
}

/// Build the configured backend and a scheduler draining it.
///
/// # Errors
///
/// See [`build_store`] and [`DeadlineScheduler::from_config`].
pub fn build_scheduler<P>(cfg: &QueueConfig) -> Result<DeadlineScheduler<P>, QueueError>
where
    P: Serialize + DeserializeOwned + Send + 'static,
{
    let store = build_store::<P>(cfg)?;
    DeadlineScheduler::from_config(store, cfg)
}

/// An empty fan-out using the configured channel capacity.
pub fn build_fanout<T: Send + 'static>(cfg: &QueueConfig) -> PriorityFanout<T> {
    PriorityFanout::new(cfg.fanout_capacity)
}
