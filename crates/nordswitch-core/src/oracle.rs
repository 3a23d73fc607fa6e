// ── Public IP observation seam ──

use std::future::Future;

use nordswitch_api::{IpOracleClient, PublicIp};

/// Something that can report the host's current public IP.
///
/// Any error means "observation unavailable"; the rotation workflow
/// decides whether to retry, fail or keep polling.
pub trait IpOracle: Send + Sync {
    fn observe(&self) -> impl Future<Output = Result<PublicIp, nordswitch_api::Error>> + Send;
}

impl IpOracle for IpOracleClient {
    async fn observe(&self) -> Result<PublicIp, nordswitch_api::Error> {
        self.lookup().await
    }
}
