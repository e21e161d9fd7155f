//! Provider data structure passed to resources

use crate::api::{ApiError, Client};
use crate::config::ProviderConfig;
use crate::mutexkv::MutexKv;
use crate::reconcile::Reconciler;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct HuaweiCloudProviderData {
    pub client: Arc<Client>,
    pub locks: MutexKv,
    /// Replaces every resource's delay and poll interval when set
    pub poll_interval: Option<Duration>,
}

impl HuaweiCloudProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
            locks: MutexKv::new(),
            poll_interval: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        self.client.config()
    }

    /// Client for `region`, or the provider's own when none is given
    pub fn client_for(&self, region: Option<&str>) -> Result<Arc<Client>, ApiError> {
        match region {
            Some(region) if region != self.config().region => {
                Ok(Arc::new(self.client.for_region(region)?))
            }
            _ => Ok(self.client.clone()),
        }
    }

    pub fn reconciler(&self, timeout: Duration, delay: Duration, interval: Duration) -> Reconciler {
        match self.poll_interval {
            Some(fixed) => Reconciler::new(timeout)
                .with_delay(fixed)
                .with_poll_interval(fixed),
            None => Reconciler::new(timeout)
                .with_delay(delay)
                .with_poll_interval(interval),
        }
    }
}
