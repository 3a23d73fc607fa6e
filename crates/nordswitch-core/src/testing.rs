// Scripted stand-ins for the client, the IP oracle and the process table.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use nordswitch_api::PublicIp;

use crate::error::CoreError;
use crate::oracle::IpOracle;
use crate::probe::ProcessProbe;
use crate::runner::{ClientOutput, ClientRunner, Invocation};

pub(crate) type Lookup = Result<PublicIp, nordswitch_api::Error>;

pub(crate) fn ip(addr: &str) -> Lookup {
    Ok(PublicIp {
        ip: addr.into(),
        country: None,
        country_code: None,
    })
}

pub(crate) fn down() -> Lookup {
    Err(nordswitch_api::Error::MissingField { field: "ip" })
}

/// Replays a script, then keeps answering with the fallback address, or a
/// fresh address per call when there is none.
pub(crate) struct ScriptedOracle {
    script: Mutex<VecDeque<Lookup>>,
    fallback: Option<String>,
    calls: AtomicU32,
}

impl ScriptedOracle {
    pub(crate) fn new(script: impl IntoIterator<Item = Lookup>, fallback: Option<&str>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: fallback.map(str::to_owned),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IpOracle for ScriptedOracle {
    async fn observe(&self) -> Lookup {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(addr) => ip(addr),
            None => ip(&format!("10.0.0.{n}")),
        }
    }
}

/// Records invocations and replays scripted outputs; unscripted calls
/// succeed with empty output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    pub(crate) outputs: Mutex<VecDeque<ClientOutput>>,
    pub(crate) calls: Mutex<Vec<Invocation>>,
    pub(crate) events: Mutex<Vec<&'static str>>,
    pub(crate) latency: Duration,
}

impl ScriptedRunner {
    pub(crate) fn with_outputs(outputs: impl IntoIterator<Item = ClientOutput>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl ClientRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ClientOutput, CoreError> {
        self.calls.lock().unwrap().push(invocation.clone());
        self.events.lock().unwrap().push("start");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.events.lock().unwrap().push("end");
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ClientOutput::ok("")))
    }
}

/// Process table with a fixed set of names, plus one name that shows up
/// only after it has been probed a number of times.
#[derive(Default)]
pub(crate) struct FakeProbe {
    running: HashSet<String>,
    late: Option<(String, u32)>,
    probes: AtomicU32,
}

impl FakeProbe {
    pub(crate) fn running(names: &[&str]) -> Self {
        Self {
            running: names.iter().map(|n| (*n).to_owned()).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub(crate) fn appearing_after(mut self, name: &str, probes: u32) -> Self {
        self.late = Some((name.to_owned(), probes));
        self
    }
}

impl ProcessProbe for FakeProbe {
    fn is_running(&self, name: &str) -> bool {
        if self.running.contains(name) {
            return true;
        }
        match &self.late {
            Some((late, after)) if late == name => {
                self.probes.fetch_add(1, Ordering::SeqCst) + 1 > *after
            }
            _ => false,
        }
    }
}
