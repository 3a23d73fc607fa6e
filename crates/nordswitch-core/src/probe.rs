// ── Process probing and bounded waits ──

use std::ffi::OsStr;
use std::sync::Mutex;
use std::time::Duration;

use sysinfo::{ProcessesToUpdate, System};
use tokio::time::Instant;
use tracing::trace;

/// Answers "is a process with this executable name running?".
pub trait ProcessProbe: Send + Sync {
    fn is_running(&self, name: &str) -> bool;
}

/// Process probe backed by the OS process table.
#[derive(Debug, Default)]
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn is_running(&self, name: &str) -> bool {
        let Ok(mut system) = self.system.lock() else {
            return false;
        };
        system.refresh_processes(ProcessesToUpdate::All, true);
        let wanted = OsStr::new(name);
        let found = system
            .processes()
            .values()
            .any(|p| p.name().eq_ignore_ascii_case(wanted));
        trace!(process = name, found, "probed process table");
        found
    }
}

/// Poll `condition` every `interval` until it holds or `deadline` elapses.
///
/// The condition is checked once up front and once more at the deadline,
/// so a zero deadline still gives it a single chance.
pub async fn wait_until<F>(mut condition: F, deadline: Duration, interval: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let give_up = Instant::now() + deadline;
    loop {
        if condition() {
            return true;
        }
        let now = Instant::now();
        if now >= give_up {
            return false;
        }
        tokio::time::sleep(interval.min(give_up - now)).await;
    }
}
