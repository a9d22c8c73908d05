// ── Device resolution ──
//
// Picks the device to track and caches it across cycles. The cache is
// dropped on request (measurement endpoint no longer knows the device)
// and whenever the listing itself fails.

use std::sync::{Mutex, PoisonError};

use poolcare_api::{Credentials, Device, PoolCareClient, select_primary};
use tracing::{debug, info};

/// Lists the account's devices once and remembers the primary one.
#[derive(Debug)]
pub struct DeviceResolver {
    client: PoolCareClient,
    cached: Mutex<Option<Device>>,
}

impl DeviceResolver {
    pub fn new(client: PoolCareClient) -> Self {
        Self {
            client,
            cached: Mutex::new(None),
        }
    }

    /// The cached device, listing devices first if there is none.
    pub async fn resolve(&self, credentials: &Credentials) -> Result<Device, poolcare_api::Error> {
        if let Some(device) = self.cached() {
            debug!(device = %device, "using cached device");
            return Ok(device);
        }

        let devices = match self.client.list_devices(credentials).await {
            Ok(devices) => devices,
            Err(e) => {
                self.invalidate();
                return Err(e);
            }
        };
        let found = devices.len();
        let device = select_primary(devices)?;
        if found > 1 {
            info!(found, device = %device, "account has several pools, tracking the first");
        } else {
            debug!(device = %device, "device resolved");
        }

        *self.slot() = Some(device.clone());
        Ok(device)
    }

    /// Forget the cached device so the next cycle lists again.
    pub fn invalidate(&self) {
        if self.slot().take().is_some() {
            debug!("device cache dropped");
        }
    }

    pub fn cached(&self) -> Option<Device> {
        self.slot().clone()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Device>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
