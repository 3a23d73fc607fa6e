// ── Rotation workflow ──
//
// One rotation: observe the baseline IP, ask the client to connect, then
// poll until the public IP differs from the baseline. Only a missing
// baseline is an error; connect trouble and an unconfirmed switch end up
// in the report.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RotationPolicy;
use crate::descriptor::ConnectionDescriptor;
use crate::error::CoreError;
use crate::oracle::IpOracle;
use crate::platform::Platform;
use crate::runner::{ClientOutput, ClientRunner};

const CONNECTED_MARKER: &str = "You are connected to";

static CONNECTED_SERVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"You are connected to ([^(\r\n]*)\(").expect("connected-server pattern is valid")
});

/// Result of the connect step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectStatus {
    /// The client accepted the command. `server` is what it reported, when
    /// it reports anything.
    Connected { server: Option<String> },
    /// Every connect attempt failed; the last reason is kept.
    Failed { reason: String },
}

impl ConnectStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Whether the public IP was seen to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RotationOutcome {
    /// An observed IP differed from the baseline.
    Confirmed,
    /// The oracle answered, but always with the baseline IP.
    Unconfirmed,
    /// Every confirmation call failed.
    TimedOut,
}

/// What one rotation did and saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    pub requested_target: String,
    pub server: String,
    pub baseline_ip: String,
    pub new_ip: Option<String>,
    pub connect: ConnectStatus,
    pub outcome: RotationOutcome,
    pub poll_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RotationReport {
    pub fn is_confirmed(&self) -> bool {
        self.outcome == RotationOutcome::Confirmed
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Drives rotations and disconnects for one client instance.
///
/// Calls are serialized: a second `rotate` or `disconnect` waits for the
/// one in flight.
pub struct Rotator<O, R> {
    oracle: O,
    runner: R,
    policy: RotationPolicy,
    in_flight: Mutex<()>,
}

impl<O: IpOracle, R: ClientRunner> Rotator<O, R> {
    pub fn new(oracle: O, runner: R, policy: RotationPolicy) -> Self {
        Self {
            oracle,
            runner,
            policy,
            in_flight: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn oracle(&self) -> &O {
        &self.oracle
    }

    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// Switch to the descriptor's server and wait for the public IP to move.
    pub async fn rotate(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<RotationReport, CoreError> {
        let _guard = self.in_flight.lock().await;
        let started_at = Utc::now();
        info!(
            target_server = descriptor.target_server(),
            requested = descriptor.requested_label(),
            "starting rotation"
        );

        let baseline = self.observe_baseline().await?;
        info!(ip = %baseline, "baseline public IP");

        let connect = self.connect(descriptor).await;

        let (outcome, new_ip, poll_attempts) = self.confirm(&baseline).await;
        match outcome {
            RotationOutcome::Confirmed => info!(
                from = %baseline,
                to = new_ip.as_deref().unwrap_or_default(),
                polls = poll_attempts,
                "public IP changed"
            ),
            RotationOutcome::Unconfirmed => warn!(
                ip = %baseline,
                polls = poll_attempts,
                "public IP did not change"
            ),
            RotationOutcome::TimedOut => warn!(
                polls = poll_attempts,
                "public IP could not be observed after connecting"
            ),
        }

        Ok(RotationReport {
            requested_target: descriptor.requested_label().to_owned(),
            server: descriptor.target_server().to_owned(),
            baseline_ip: baseline,
            new_ip,
            connect,
            outcome,
            poll_attempts,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Run the platform disconnect command once. The exit code is ignored.
    pub async fn disconnect(&self, descriptor: &ConnectionDescriptor) -> Result<(), CoreError> {
        let _guard = self.in_flight.lock().await;
        let invocation = descriptor.disconnect_invocation();
        let output = self.runner.run(&invocation).await?;
        if output.success {
            info!("disconnected");
        } else {
            debug!(code = ?output.code, "disconnect command exited non-zero");
        }
        Ok(())
    }

    async fn observe_baseline(&self) -> Result<String, CoreError> {
        let attempts = self.policy.baseline_attempts;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.oracle.observe().await {
                Ok(ip) => return Ok(ip.ip),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "baseline IP lookup failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.baseline_retry_delay).await;
                    }
                }
            }
        }

        Err(CoreError::IpObservation {
            attempts,
            last_error,
        })
    }

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> ConnectStatus {
        let invocation = descriptor.connect_invocation();
        let attempts = self.policy.connect_attempts;
        let mut reason = String::new();

        for attempt in 1..=attempts {
            let result = self
                .runner
                .run(&invocation)
                .await
                .and_then(|out| check_connected(descriptor.platform(), &out));
            match result {
                Ok(server) => {
                    match &server {
                        Some(name) => info!(server = %name, "client reports connection"),
                        None => info!(target_server = descriptor.target_server(), "connect command succeeded"),
                    }
                    return ConnectStatus::Connected { server };
                }
                Err(e) => {
                    warn!(
                        attempt,
                        attempts,
                        command = %invocation,
                        error = %e,
                        "connect failed, pausing before confirmation"
                    );
                    reason = e.to_string();
                    tokio::time::sleep(self.policy.connect_failure_delay).await;
                }
            }
        }

        ConnectStatus::Failed { reason }
    }

    async fn confirm(&self, baseline: &str) -> (RotationOutcome, Option<String>, u32) {
        let attempts = self.policy.confirm_attempts;
        let mut answered = false;

        for attempt in 1..=attempts {
            match self.oracle.observe().await {
                Ok(ip) if ip.ip != baseline => {
                    return (RotationOutcome::Confirmed, Some(ip.ip), attempt);
                }
                Ok(_) => {
                    answered = true;
                    debug!(attempt, attempts, "public IP unchanged");
                    if attempt < attempts && !self.policy.confirm_unchanged_delay.is_zero() {
                        tokio::time::sleep(self.policy.confirm_unchanged_delay).await;
                    }
                }
                Err(e) => {
                    debug!(attempt, attempts, error = %e, "confirmation lookup failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.confirm_retry_delay).await;
                    }
                }
            }
        }

        let outcome = if answered {
            RotationOutcome::Unconfirmed
        } else {
            RotationOutcome::TimedOut
        };
        (outcome, None, attempts)
    }
}

/// Judge a finished connect command. Returns the server the client named,
/// if any.
fn check_connected(platform: Platform, output: &ClientOutput) -> Result<Option<String>, CoreError> {
    let failure = |reason: String| CoreError::ClientInvocation {
        command: "connect".into(),
        reason,
    };

    if !output.success {
        let detail = output.combined();
        let detail = detail.trim();
        return Err(failure(match output.code {
            Some(code) if detail.is_empty() => format!("exited with status {code}"),
            Some(code) => format!("exited with status {code}: {detail}"),
            None => "terminated by signal".into(),
        }));
    }

    match platform {
        Platform::Windows => Ok(None),
        Platform::Linux => {
            let text = output.combined();
            if !text.contains(CONNECTED_MARKER) {
                return Err(failure(format!("output lacks '{CONNECTED_MARKER}'")));
            }
            Ok(connected_server(&text))
        }
    }
}

/// Server name from `You are connected to <server> (<host>)!`.
fn connected_server(text: &str) -> Option<String> {
    CONNECTED_SERVER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
}
