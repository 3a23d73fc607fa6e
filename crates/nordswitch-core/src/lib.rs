// nordswitch-core: Session bootstrap and IP-verified server rotation.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod oracle;
pub mod platform;
pub mod probe;
pub mod rotation;
pub mod runner;
pub mod schedule;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bootstrap::Bootstrapper;
pub use catalog::Catalog;
pub use config::{Credentials, OracleConfig, RotationPolicy, SessionConfig};
pub use descriptor::ConnectionDescriptor;
pub use error::CoreError;
pub use oracle::IpOracle;
pub use platform::Platform;
pub use probe::{ProcessProbe, SysinfoProbe, wait_until};
pub use rotation::{ConnectStatus, RotationOutcome, RotationReport, Rotator};
pub use runner::{ClientOutput, ClientRunner, Invocation, ProcessRunner};
pub use schedule::{Schedule, ScheduleEnd, ScheduleSummary};

pub use nordswitch_api::PublicIp;
