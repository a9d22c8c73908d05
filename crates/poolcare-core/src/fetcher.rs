// Measurement retrieval and normalization.

use chrono::Utc;
use poolcare_api::{Credentials, Device, PoolCareClient};
use tracing::{debug, warn};

use crate::snapshot::Snapshot;

/// Reads the latest measurements of a device into a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct MeasurementFetcher {
    client: PoolCareClient,
}

impl MeasurementFetcher {
    pub fn new(client: PoolCareClient) -> Self {
        Self { client }
    }

    /// Fetch and normalize.
    ///
    /// A response whose status is not `"OK"` is not an error: it yields
    /// an empty snapshot.
    pub async fn fetch(
        &self,
        credentials: &Credentials,
        device: &Device,
    ) -> Result<Snapshot, poolcare_api::Error> {
        let resp = self.client.last_measurements(credentials, device).await?;
        let fetched_at = Utc::now();

        match resp.ensure_ok() {
            Ok(resp) => {
                let snapshot = Snapshot::from_measurements(resp, fetched_at);
                debug!(
                    device = %device,
                    sensors = snapshot.sensor_keys().len(),
                    "measurements normalized"
                );
                Ok(snapshot)
            }
            Err(poolcare_api::Error::DegradedResponse { status }) => {
                warn!(device = %device, status = %status, "measurement service degraded, publishing no sensors");
                Ok(Snapshot::empty_at(fetched_at))
            }
            Err(e) => Err(e),
        }
    }
}
