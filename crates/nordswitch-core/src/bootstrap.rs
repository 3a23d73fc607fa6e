// ── Session bootstrap ──
//
// Run once per session: make sure the NordVPN client is installed, up and
// logged in, resolve the caller's label to a concrete server, and hand
// back the descriptor every later rotation reuses.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::{Credentials, SessionConfig};
use crate::descriptor::ConnectionDescriptor;
use crate::error::CoreError;
use crate::platform::{CLIENT_PROGRAM, Platform, WINDOWS_APP_EXE, WINDOWS_SERVICE_PROCESS};
use crate::probe::{ProcessProbe, wait_until};
use crate::runner::{ClientRunner, Invocation};

const NOT_LOGGED_IN_MARKER: &str = "not logged in";
const LOGIN_OK_MARKER: &str = "Welcome";

/// Prepares the client and produces a [`ConnectionDescriptor`].
pub struct Bootstrapper<R, P> {
    runner: R,
    probe: P,
    catalog: Catalog,
    platform: Option<Platform>,
    search_path: Option<OsString>,
}

impl<R: ClientRunner, P: ProcessProbe> Bootstrapper<R, P> {
    /// Bootstrapper for the host platform using the embedded catalog.
    pub fn new(runner: R, probe: P) -> Self {
        Self {
            runner,
            probe,
            catalog: Catalog::embedded().clone(),
            platform: None,
            search_path: None,
        }
    }

    /// Resolve group names against a different catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Skip host detection and act as if running on `platform`.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Look for the Linux client in these directories instead of `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The platform this bootstrapper targets.
    pub fn platform(&self) -> Result<Platform, CoreError> {
        self.platform.map_or_else(Platform::current, Ok)
    }

    /// Resolve a label without touching the client.
    pub fn describe<G: Rng + ?Sized>(
        &self,
        label: &str,
        working_directory: Option<PathBuf>,
        rng: &mut G,
    ) -> Result<ConnectionDescriptor, CoreError> {
        let platform = self.platform()?;
        let resolution = self.catalog.resolve(label, rng)?;
        if let Some(group) = &resolution.group {
            info!(group = %group, server = %resolution.server, "picked server from group");
        }
        ConnectionDescriptor::new(platform, resolution.label, &resolution.server, working_directory)
    }

    /// Describe `label` against the client as it is, without logging in or
    /// launching anything. Windows still needs the install directory on disk.
    pub fn describe_installed<G: Rng + ?Sized>(
        &self,
        label: &str,
        install_dir: Option<&Path>,
        rng: &mut G,
    ) -> Result<ConnectionDescriptor, CoreError> {
        let working_directory = match self.platform()? {
            Platform::Linux => None,
            Platform::Windows => Some(locate_install_dir(install_dir)?),
        };
        self.describe(label, working_directory, rng)
    }

    /// Prepare the client and build a descriptor for `config.target`.
    pub async fn establish(&self, config: &SessionConfig) -> Result<ConnectionDescriptor, CoreError> {
        let mut rng = StdRng::from_entropy();
        self.establish_with_rng(config, &mut rng).await
    }

    /// [`establish`](Self::establish) with a caller-supplied random source.
    pub async fn establish_with_rng<G: Rng + Send>(
        &self,
        config: &SessionConfig,
        rng: &mut G,
    ) -> Result<ConnectionDescriptor, CoreError> {
        let platform = self.platform()?;
        info!(%platform, target = %config.target, "bootstrapping NordVPN session");

        let working_directory = match platform {
            Platform::Linux => {
                self.prepare_linux(config).await?;
                None
            }
            Platform::Windows => Some(self.prepare_windows(config).await?),
        };

        let descriptor = self.describe(&config.target, working_directory, rng)?;
        info!(
            server = descriptor.target_server(),
            "session ready"
        );
        Ok(descriptor)
    }

    // ── Linux ────────────────────────────────────────────────────────

    async fn prepare_linux(&self, config: &SessionConfig) -> Result<(), CoreError> {
        let binary = self.locate_linux_client()?;
        debug!(path = %binary.display(), "found NordVPN client");

        let account = Invocation::new(CLIENT_PROGRAM, ["account"]);
        let output = self.runner.run(&account).await?;
        let text = output.combined();

        if text.contains(NOT_LOGGED_IN_MARKER) {
            info!("NordVPN client is not logged in, logging in");
            return self.login(config.credentials.as_ref()).await;
        }
        if !output.success {
            return Err(CoreError::ClientInvocation {
                command: account.to_string(),
                reason: format!("exited with status {:?}: {}", output.code, text.trim()),
            });
        }

        debug!("NordVPN account already logged in");
        Ok(())
    }

    fn locate_linux_client(&self) -> Result<PathBuf, CoreError> {
        let found = match &self.search_path {
            Some(path) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
                which::which_in(CLIENT_PROGRAM, Some(path), cwd)
            }
            None => which::which(CLIENT_PROGRAM),
        };
        found.map_err(|e| CoreError::ClientNotInstalled {
            detail: format!("'{CLIENT_PROGRAM}' not found on PATH ({e})"),
        })
    }

    async fn login(&self, credentials: Option<&Credentials>) -> Result<(), CoreError> {
        let invocation = match credentials {
            Some(Credentials::Token(token)) => Invocation::new(
                CLIENT_PROGRAM,
                ["login", "--token", token.expose_secret()],
            ),
            Some(Credentials::Password { username, password }) => Invocation::new(
                CLIENT_PROGRAM,
                ["login", "-u", username.as_str(), "-p", password.expose_secret()],
            ),
            None => {
                return Err(CoreError::AuthenticationFailed {
                    message: "not logged in and no token or password configured".into(),
                });
            }
        }
        .sensitive();

        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|e| CoreError::AuthenticationFailed {
                message: e.to_string(),
            })?;
        let text = output.combined();

        if output.success && text.contains(LOGIN_OK_MARKER) {
            info!("logged in to NordVPN");
            return Ok(());
        }
        Err(CoreError::AuthenticationFailed {
            message: format!("unexpected client response: {}", text.trim()),
        })
    }

    // ── Windows ──────────────────────────────────────────────────────

    async fn prepare_windows(&self, config: &SessionConfig) -> Result<PathBuf, CoreError> {
        let install_dir = locate_install_dir(config.install_dir.as_deref())?;
        debug!(dir = %install_dir.display(), "found NordVPN install");

        if !self.probe.is_running(WINDOWS_SERVICE_PROCESS) {
            return Err(CoreError::ServiceNotRunning {
                service: WINDOWS_SERVICE_PROCESS.into(),
            });
        }
        debug!("NordVPN service is running");

        // `nordvpn -d` also drops a session left over from an earlier run,
        // so it is issued even when the app is already up.
        if self.probe.is_running(WINDOWS_APP_EXE) {
            debug!("NordVPN app already running, resetting session");
        }
        self.launch_app(&install_dir, config).await?;
        Ok(install_dir)
    }

    /// Run `nordvpn -d`, which opens the desktop app and disconnects, then
    /// wait for the app to show up in the process list. The launcher is
    /// always started first; it is dropped (and killed) once the app is up
    /// or the deadline passes.
    async fn launch_app(&self, install_dir: &Path, config: &SessionConfig) -> Result<(), CoreError> {
        let launch = Invocation::from_argv(Platform::Windows.disconnect_template())
            .in_dir(Some(install_dir.to_path_buf()))
            .through_shell(true);
        info!("starting NordVPN app");

        let appeared = wait_until(
            || self.probe.is_running(WINDOWS_APP_EXE),
            config.launch_timeout,
            config.launch_poll_interval,
        );
        let launcher = self.runner.run(&launch);
        tokio::pin!(appeared, launcher);

        let mut launcher_done = false;
        let up = loop {
            tokio::select! {
                biased;
                result = &mut launcher, if !launcher_done => {
                    launcher_done = true;
                    let output = result?;
                    if !output.success {
                        warn!(code = ?output.code, "app launcher exited non-zero");
                    }
                }
                up = &mut appeared => break up,
            }
        };

        if up {
            info!("NordVPN app is running");
            Ok(())
        } else {
            Err(CoreError::ClientLaunchTimeout {
                timeout_secs: config.launch_timeout.as_secs(),
            })
        }
    }
}

/// The configured install directory, or the first default one holding the
/// app executable.
fn locate_install_dir(configured: Option<&Path>) -> Result<PathBuf, CoreError> {
    if let Some(dir) = configured {
        if dir.join(WINDOWS_APP_EXE).is_file() {
            return Ok(dir.to_path_buf());
        }
        return Err(CoreError::ClientNotInstalled {
            detail: format!("{WINDOWS_APP_EXE} not found in {}", dir.display()),
        });
    }

    Platform::Windows
        .default_install_dirs()
        .into_iter()
        .find(|dir| dir.join(WINDOWS_APP_EXE).is_file())
        .ok_or_else(|| CoreError::ClientNotInstalled {
            detail: format!(
                "{WINDOWS_APP_EXE} not found in the default locations; set install_dir in your profile"
            ),
        })
}
