// Device discovery
//
// The pool listing identifies a Blue Connect device by two keys: the
// pool it belongs to and its own `blue_key`. Only the first page is read.

use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::client::PoolCareClient;
use crate::error::Error;
use crate::models::PoolsResponse;

/// Fixed listing query: first page, up to 15 pools, sorted by owner.
const POOLS_PATH: &str = "pools?page=1&results=15&sortField=user_lastname&sortOrder=ASC";

/// Addressing pair for one monitoring device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    pub pool_id: String,
    pub blue_key: String,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pool_id, self.blue_key)
    }
}

impl PoolCareClient {
    /// List the devices visible to the account, in server order.
    ///
    /// Entries without both `pool_id` and `blue_key` are skipped.
    pub async fn list_devices(&self, credentials: &Credentials) -> Result<Vec<Device>, Error> {
        let url = self.endpoint(POOLS_PATH)?;
        let resp: PoolsResponse = self.signed_get(url, credentials).await?;

        let total = resp.data.len();
        let devices: Vec<Device> = resp
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(idx, pool)| match (pool.pool_id, pool.blue_key) {
                (Some(pool_id), Some(blue_key)) => Some(Device { pool_id, blue_key }),
                _ => {
                    warn!(index = idx, "skipping pool entry without pool_id/blue_key");
                    None
                }
            })
            .collect();

        debug!(total, usable = devices.len(), "pools listed");
        Ok(devices)
    }
}

/// First device in server order, or [`Error::NoDevicesFound`].
pub fn select_primary(devices: Vec<Device>) -> Result<Device, Error> {
    devices.into_iter().next().ok_or(Error::NoDevicesFound)
}
