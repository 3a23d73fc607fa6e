// nordswitch-api: Async client for public-IP lookup services (the "IP oracle")

pub mod error;
pub mod oracle;
pub mod transport;

pub use error::Error;
pub use oracle::{DEFAULT_ORACLE_URL, IpOracleClient, PublicIp};
pub use transport::TransportConfig;
