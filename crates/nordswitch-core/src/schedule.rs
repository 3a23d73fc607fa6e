// ── Timed rotation loop ──
//
// Rotate on a fixed interval until a count is reached or the caller's
// stop signal fires. A rotation that cannot observe the baseline IP is
// logged and skipped; the loop keeps going. Only an interrupt disconnects.

use std::future::Future;
use std::path::Path;
use std::pin::pin;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::descriptor::ConnectionDescriptor;
use crate::error::CoreError;
use crate::oracle::IpOracle;
use crate::rotation::{RotationReport, Rotator};
use crate::runner::ClientRunner;

/// How often and how many times to rotate.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Pause between the end of one rotation and the start of the next.
    pub interval: Duration,
    /// Stop after this many rotations, skipped ones included.
    pub count: Option<u32>,
    /// Re-draw group targets from this catalog before every rotation
    /// after the first.
    pub reshuffle: Option<Catalog>,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEnd {
    /// The count was reached; the connection is left up.
    Finished,
    /// The stop signal fired; the client was disconnected.
    Interrupted,
}

/// What a scheduled run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub completed: u32,
    pub skipped: u32,
    pub end: ScheduleEnd,
}

impl ScheduleSummary {
    fn rounds(&self) -> u32 {
        self.completed + self.skipped
    }
}

impl<O: IpOracle, R: ClientRunner> Rotator<O, R> {
    /// Rotate per `schedule` until it runs out or `stop` resolves.
    ///
    /// Each finished rotation is handed to `on_report`. When `stop`
    /// resolves, the rotation in flight is abandoned and the client is
    /// disconnected exactly once.
    pub async fn run_schedule<G, S, F>(
        &self,
        mut descriptor: ConnectionDescriptor,
        schedule: &Schedule,
        rng: &mut G,
        stop: S,
        mut on_report: F,
    ) -> Result<ScheduleSummary, CoreError>
    where
        G: Rng + Send,
        S: Future<Output = ()> + Send,
        F: FnMut(&RotationReport) + Send,
    {
        let mut stop = pin!(stop);
        let mut summary = ScheduleSummary {
            completed: 0,
            skipped: 0,
            end: ScheduleEnd::Finished,
        };

        loop {
            if summary.rounds() > 0 {
                if let Some(catalog) = &schedule.reshuffle {
                    descriptor = redraw(catalog, &descriptor, rng)?;
                }
            }

            let rotation = tokio::select! {
                result = self.rotate(&descriptor) => result,
                () = &mut stop => {
                    summary.end = ScheduleEnd::Interrupted;
                    break;
                }
            };

            match rotation {
                Ok(report) => {
                    summary.completed += 1;
                    on_report(&report);
                }
                Err(e @ CoreError::IpObservation { .. }) => {
                    summary.skipped += 1;
                    warn!(round = summary.rounds(), error = %e, "rotation skipped");
                }
                Err(e) => return Err(e),
            }

            if schedule.count.is_some_and(|n| summary.rounds() >= n) {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(schedule.interval) => {}
                () = &mut stop => {
                    summary.end = ScheduleEnd::Interrupted;
                    break;
                }
            }
        }

        match summary.end {
            ScheduleEnd::Finished => info!(
                completed = summary.completed,
                skipped = summary.skipped,
                "schedule finished"
            ),
            ScheduleEnd::Interrupted => {
                info!(completed = summary.completed, "interrupted, disconnecting");
                self.disconnect(&descriptor).await?;
            }
        }
        Ok(summary)
    }
}

fn redraw<G: Rng + ?Sized>(
    catalog: &Catalog,
    current: &ConnectionDescriptor,
    rng: &mut G,
) -> Result<ConnectionDescriptor, CoreError> {
    let resolution = catalog.resolve(current.requested_label(), rng)?;
    ConnectionDescriptor::new(
        current.platform(),
        resolution.label,
        &resolution.server,
        current.working_directory().map(Path::to_path_buf),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::pending;

    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tokio::time::Instant;

    use super::*;
    use crate::config::RotationPolicy;
    use crate::platform::Platform;
    use crate::testing::{ScriptedOracle, ScriptedRunner, down};

    const INSTALL_DIR: &str = "C:/Program Files/NordVPN";

    fn windows(label: &str, server: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::new(Platform::Windows, label, server, Some(INSTALL_DIR.into()))
            .unwrap()
    }

    fn every_minute(count: Option<u32>) -> Schedule {
        Schedule {
            interval: Duration::from_secs(60),
            count,
            reshuffle: None,
        }
    }

    fn rotator(oracle: ScriptedOracle) -> Rotator<ScriptedOracle, ScriptedRunner> {
        Rotator::new(oracle, ScriptedRunner::default(), RotationPolicy::default())
    }

    /// Last argument of every client call, in order.
    fn targets(rotator: &Rotator<ScriptedOracle, ScriptedRunner>) -> Vec<String> {
        rotator
            .runner()
            .calls()
            .iter()
            .filter_map(|c| c.args.last().cloned())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn count_stops_and_leaves_connection_up() {
        let rotator = rotator(ScriptedOracle::new([], None));
        let started = Instant::now();
        let mut reports = Vec::new();

        let summary = rotator
            .run_schedule(
                windows("japan", "japan"),
                &every_minute(Some(3)),
                &mut StdRng::seed_from_u64(1),
                pending(),
                |r| reports.push(r.server.clone()),
            )
            .await
            .unwrap();

        assert_eq!(
            summary,
            ScheduleSummary {
                completed: 3,
                skipped: 0,
                end: ScheduleEnd::Finished
            }
        );
        assert_eq!(reports, ["japan", "japan", "japan"]);
        assert_eq!(targets(&rotator), ["japan", "japan", "japan"]);
        assert!(rotator.runner().calls().iter().all(|c| c.args[0] == "-c"));
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_baseline_is_skipped_not_fatal() {
        let oracle = ScriptedOracle::new([down(), down(), down()], None);
        let rotator = rotator(oracle);
        let mut reports = 0;

        let summary = rotator
            .run_schedule(
                windows("japan", "japan"),
                &every_minute(Some(2)),
                &mut StdRng::seed_from_u64(1),
                pending(),
                |_| reports += 1,
            )
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.end, ScheduleEnd::Finished);
        assert_eq!(reports, 1);
        // only the second round got as far as connecting
        assert_eq!(rotator.runner().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_disconnects_exactly_once() {
        let rotator = rotator(ScriptedOracle::new([], None));
        let stop = tokio::time::sleep(Duration::from_secs(90));

        let summary = rotator
            .run_schedule(
                windows("japan", "japan"),
                &every_minute(None),
                &mut StdRng::seed_from_u64(1),
                stop,
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(summary.end, ScheduleEnd::Interrupted);
        assert_eq!(summary.completed, 2);
        let calls = rotator.runner().calls();
        let disconnects = calls.iter().filter(|c| c.args == ["-d"]).count();
        assert_eq!(disconnects, 1);
        assert_eq!(calls.last().unwrap().args, ["-d"]);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_during_rotation_abandons_it() {
        let runner = ScriptedRunner {
            latency: Duration::from_secs(600),
            ..ScriptedRunner::default()
        };
        let rotator = Rotator::new(
            ScriptedOracle::new([], None),
            runner,
            RotationPolicy::default(),
        );
        let stop = tokio::time::sleep(Duration::from_secs(1));

        let summary = rotator
            .run_schedule(
                windows("japan", "japan"),
                &every_minute(None),
                &mut StdRng::seed_from_u64(1),
                stop,
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(summary.end, ScheduleEnd::Interrupted);
        assert_eq!(summary.completed, 0);
        let args: Vec<_> = rotator.runner().calls().into_iter().map(|c| c.args).collect();
        assert_eq!(args, [vec!["-c", "-g", "japan"], vec!["-d"]]);
        // the abandoned connect never finished
        assert_eq!(*rotator.runner().events.lock().unwrap(), ["start", "start", "end"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reshuffle_redraws_from_group() {
        let catalog = Catalog::from_toml_str("version = 1\n[groups]\npair = [\"beta\"]\n").unwrap();
        let rotator = rotator(ScriptedOracle::new([], None));
        let schedule = Schedule {
            reshuffle: Some(catalog),
            ..every_minute(Some(3))
        };

        rotator
            .run_schedule(
                windows("pair", "alpha"),
                &schedule,
                &mut StdRng::seed_from_u64(7),
                pending(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(targets(&rotator), ["alpha", "beta", "beta"]);
    }

    #[tokio::test(start_paused = true)]
    async fn without_reshuffle_target_is_fixed() {
        let rotator = rotator(ScriptedOracle::new([], None));

        rotator
            .run_schedule(
                windows("pair", "alpha"),
                &every_minute(Some(2)),
                &mut StdRng::seed_from_u64(7),
                pending(),
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(targets(&rotator), ["alpha", "alpha"]);
    }
}
