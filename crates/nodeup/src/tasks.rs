//! Task runner - turns commands into background tasks.
//!
//! Every spawned task reports back with exactly one terminal event on the
//! shared event channel. Long installs also stream progress through the
//! subsystem relays and are bounded by a deadline.

use crate::command::Command;
use crate::event::{Event, ValidationKind};
use crate::relay::{LogSender, RelaySenders};
use nodeup_shared::collaborators::{
    DeploymentSyncer, NetworkProbe, NetworkingInstaller, OsDetector, PackageInstaller,
    RegistryAuthChecker, RuntimeInstaller, SwapManager,
};
use nodeup_shared::config::TimeoutSettings;
use nodeup_shared::dns::{self, DomainValidationRequest, ProxyPolicy};
use nodeup_shared::{InstallerError, ProgressUpdate, Subsystem};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The collaborators the installer drives.
#[derive(Clone)]
pub struct Collaborators {
    pub os: Arc<dyn OsDetector>,
    pub packages: Arc<dyn PackageInstaller>,
    pub runtime: Arc<dyn RuntimeInstaller>,
    pub networking: Arc<dyn NetworkingInstaller>,
    pub deployment: Arc<dyn DeploymentSyncer>,
    pub probe: Arc<dyn NetworkProbe>,
    pub swap: Arc<dyn SwapManager>,
    pub registry: Arc<dyn RegistryAuthChecker>,
}

#[derive(Clone)]
pub struct TaskRunner {
    collaborators: Collaborators,
    events: UnboundedSender<Event>,
    relays: RelaySenders,
    log: LogSender,
    timeouts: TimeoutSettings,
}

impl TaskRunner {
    pub fn new(
        collaborators: Collaborators,
        events: UnboundedSender<Event>,
        relays: RelaySenders,
        log: LogSender,
        timeouts: TimeoutSettings,
    ) -> Self {
        Self {
            collaborators,
            events,
            relays,
            log,
            timeouts,
        }
    }

    /// Start the task for `command`. `Quit` is handled by the loop and spawns nothing.
    pub fn spawn(&self, command: Command) -> Option<JoinHandle<()>> {
        if matches!(command, Command::Quit) {
            return None;
        }
        debug!(command = command.name(), "spawning task");
        let runner = self.clone();
        Some(tokio::spawn(async move {
            if let Some(event) = runner.run(command).await {
                // The loop is gone once the receiver drops; nothing left to tell.
                let _ = runner.events.send(event);
            }
        }))
    }

    /// Run `command` to completion and return its terminal event.
    pub async fn run(&self, command: Command) -> Option<Event> {
        let c = &self.collaborators;
        let event = match command {
            Command::Quit => return None,

            Command::CheckRuntime => match c.runtime.is_installed().await {
                Ok(installed) => Event::RuntimeChecked { installed },
                Err(err) => failed("runtime check", err),
            },

            Command::UninstallRuntime => {
                let result = self
                    .with_deadline(
                        "runtime uninstall",
                        self.timeouts.heavy_install(),
                        c.runtime.uninstall(self.log.callback()),
                    )
                    .await;
                match result {
                    Ok(()) => Event::RuntimeUninstalled,
                    Err(err) => Event::Failed(err),
                }
            }

            Command::DetectOs => match c.os.detect().await {
                Ok(info) => Event::OsDetected(info),
                Err(err) => Event::Failed(err),
            },

            Command::CheckSwap => {
                let active = match c.swap.check_active().await {
                    Ok(active) => active,
                    Err(err) => return Some(failed("swap check", err)),
                };
                let available_disk_gb = match c.swap.available_disk_gb().await {
                    Ok(gb) => Some(gb),
                    Err(err) => {
                        warn!("disk space unknown: {:#}", err);
                        self.log.push(format!("warning: could not read free disk space: {err}"));
                        None
                    }
                };
                Event::SwapChecked {
                    active,
                    available_disk_gb,
                }
            }

            Command::CreateSwap { size_gb } => {
                match c.swap.create_swap_file(size_gb, self.log.callback()).await {
                    Ok(()) => Event::SwapCreated,
                    Err(err) => failed("swap creation", err),
                }
            }

            Command::InstallPackages { os, packages } => {
                let relay = self.relays.get(Subsystem::Packages).callback();
                let result = self
                    .run_tracked(
                        Subsystem::Packages,
                        "package install",
                        c.packages.install(&os, &packages, relay),
                    )
                    .await;
                match result {
                    Ok(()) => Event::PackagesInstalled,
                    Err(err) => Event::Failed(err),
                }
            }

            Command::DetectAddresses => match c.probe.detect_addresses().await {
                Ok(addresses) => Event::AddressesDetected(addresses),
                Err(err) => Event::Failed(InstallerError::Network(format!("{err:#}"))),
            },

            Command::ValidatePlatformDomain {
                attempt,
                domain,
                external_ip,
            } => {
                let request = DomainValidationRequest {
                    domain,
                    external_ip,
                    policy: ProxyPolicy::default(),
                };
                let now = chrono::Utc::now().timestamp();
                let verdict = dns::validate_platform_domain(c.probe.as_ref(), &request, now).await;
                Event::Validated {
                    kind: ValidationKind::Platform,
                    attempt,
                    verdict,
                }
            }

            Command::ValidateRegistryDomain {
                attempt,
                domain,
                external_ip,
            } => {
                let allow_proxy = ProxyPolicy::default().registry;
                let verdict = dns::validate_registry_domain(
                    c.probe.as_ref(),
                    &domain,
                    &external_ip,
                    allow_proxy,
                )
                .await;
                Event::Validated {
                    kind: ValidationKind::Registry,
                    attempt,
                    verdict,
                }
            }

            Command::ValidationTimer {
                kind,
                attempt,
                after,
            } => {
                tokio::time::sleep(after).await;
                Event::ValidationTimedOut { kind, attempt }
            }

            Command::ValidateExternalRegistry(registry) => {
                let limit = self.timeouts.registry_http();
                let check = c
                    .registry
                    .validate(&registry.host, &registry.username, &registry.password);
                let valid = match tokio::time::timeout(limit, check).await {
                    Ok(valid) => valid,
                    Err(_) => {
                        self.log.push(format!(
                            "registry {} did not answer within {}s",
                            registry.host,
                            limit.as_secs()
                        ));
                        false
                    }
                };
                Event::ExternalRegistryValidated { valid }
            }

            Command::InstallRuntime { internal_ip, cidr } => {
                let relay = self.relays.get(Subsystem::Runtime).callback();
                let kubeconfig = match self
                    .run_tracked(Subsystem::Runtime, "runtime install", c.runtime.install(relay))
                    .await
                {
                    Ok(path) => path,
                    Err(err) => return Some(Event::Failed(err)),
                };
                let relay = self.relays.get(Subsystem::Networking).callback();
                let result = self
                    .run_tracked(
                        Subsystem::Networking,
                        "networking install",
                        c.networking.install(relay, &internal_ip, &cidr),
                    )
                    .await;
                match result {
                    Ok(()) => Event::RuntimeInstalled { kubeconfig },
                    Err(err) => Event::Failed(err),
                }
            }

            Command::SyncDeployment(options) => {
                let relay = self.relays.get(Subsystem::Deployment).callback();
                let result = self
                    .run_tracked(
                        Subsystem::Deployment,
                        "deployment sync",
                        c.deployment.sync(&options, relay),
                    )
                    .await;
                match result {
                    Ok(()) => Event::DeploymentSynced,
                    Err(err) => Event::Failed(err),
                }
            }

            Command::AdvanceAfter { phase, delay } => {
                tokio::time::sleep(delay).await;
                Event::Advance(phase)
            }
        };
        Some(event)
    }

    /// Bracket a heavy install with relay start/end updates and the install deadline.
    async fn run_tracked<T>(
        &self,
        subsystem: Subsystem,
        what: &str,
        work: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, InstallerError> {
        let relay = self.relays.get(subsystem);
        relay.send(ProgressUpdate::installing(subsystem, 0.0, format!("starting {what}")));
        let result = self
            .with_deadline(what, self.timeouts.heavy_install(), work)
            .await;
        match &result {
            Ok(_) => relay.send(ProgressUpdate::completed(subsystem, format!("{what} finished"))),
            Err(err) => relay.send(ProgressUpdate::failed(subsystem, err.to_string())),
        }
        result
    }

    async fn with_deadline<T>(
        &self,
        what: &str,
        limit: Duration,
        work: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, InstallerError> {
        match tokio::time::timeout(limit, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(InstallerError::install(what, format!("{err:#}"))),
            Err(_) => Err(InstallerError::install(
                what,
                format!("timed out after {}s", limit.as_secs()),
            )),
        }
    }
}

fn failed(what: &str, err: anyhow::Error) -> Event {
    Event::Failed(InstallerError::install(what, format!("{err:#}")))
}
