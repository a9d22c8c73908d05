// Latest measurements for one device

use tracing::debug;

use crate::auth::Credentials;
use crate::client::PoolCareClient;
use crate::error::Error;
use crate::models::LastMeasurements;
use crate::pools::Device;

impl PoolCareClient {
    /// `GET /swimming_pool/{pool_id}/blue/{blue_key}/lastMeasurements`.
    ///
    /// Returns the envelope as received; call
    /// [`LastMeasurements::ensure_ok`] to reject a non-`"OK"` status.
    pub async fn last_measurements(
        &self,
        credentials: &Credentials,
        device: &Device,
    ) -> Result<LastMeasurements, Error> {
        let url = self.endpoint_segments(&[
            "swimming_pool",
            &device.pool_id,
            "blue",
            &device.blue_key,
            "lastMeasurements",
        ])?;

        let resp: LastMeasurements = self.signed_get(url, credentials).await?;
        debug!(
            device = %device,
            status = resp.status.as_deref().unwrap_or("<missing>"),
            records = resp.data.len(),
            "measurements received"
        );
        Ok(resp)
    }
}
