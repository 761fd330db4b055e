//! Task runner tests against the scripted host.

mod common;

use common::*;
use nodeup::command::Command;
use nodeup::event::{Event, ValidationKind};
use nodeup::phase::Phase;
use nodeup::tasks::TaskRunner;
use nodeup_shared::collaborators::{DeployOptions, ExternalRegistry, RegistryTarget};
use nodeup_shared::config::TimeoutSettings;
use nodeup_shared::{InstallerError, ProgressStatus, ProgressUpdate, Subsystem};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn runner(
    h: &Harness,
    host: Arc<FakeHost>,
    timeouts: TimeoutSettings,
) -> (TaskRunner, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let runner = TaskRunner::new(
        collaborators(host),
        tx,
        h.relays.clone(),
        h.log.clone(),
        timeouts,
    );
    (runner, rx)
}

/// Everything queued for `subsystem`, in order.
fn relay_updates(h: &mut Harness, subsystem: Subsystem) -> Vec<ProgressUpdate> {
    h.model.relay.flush(subsystem)
}

#[tokio::test]
async fn quit_spawns_nothing() {
    let h = harness();
    let (runner, _rx) = runner(&h, Arc::new(FakeHost::default()), TimeoutSettings::default());
    assert!(runner.spawn(Command::Quit).is_none());
    assert!(runner.run(Command::Quit).await.is_none());
}

#[tokio::test]
async fn spawned_task_reports_on_event_channel() {
    let h = harness();
    let host = Arc::new(FakeHost {
        runtime_installed: true,
        ..FakeHost::default()
    });
    let (runner, mut rx) = runner(&h, host, TimeoutSettings::default());

    let handle = runner.spawn(Command::CheckRuntime).unwrap();
    handle.await.unwrap();
    match rx.recv().await {
        Some(Event::RuntimeChecked { installed }) => assert!(installed),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn package_install_streams_progress_and_ends_with_sentinel() {
    let mut h = harness();
    let host = Arc::new(FakeHost::default());
    let (runner, _rx) = runner(&h, host.clone(), TimeoutSettings::default());

    let event = runner
        .run(Command::InstallPackages {
            os: ubuntu(),
            packages: vec!["curl".into(), "jq".into()],
        })
        .await;
    assert!(matches!(event, Some(Event::PackagesInstalled)));
    assert_eq!(host.calls(), vec!["packages:curl,jq"]);

    let updates = relay_updates(&mut h, Subsystem::Packages);
    let statuses: Vec<ProgressStatus> = updates.iter().map(|u| u.status).collect();
    assert_eq!(
        statuses,
        vec![
            ProgressStatus::Installing,
            ProgressStatus::Installing,
            ProgressStatus::Installing,
            ProgressStatus::Completed,
        ]
    );
    assert_eq!(updates[1].fraction, 0.5);
    assert_eq!(updates[2].fraction, 1.0);
}

#[tokio::test]
async fn package_failure_becomes_typed_error() {
    let mut h = harness();
    let host = Arc::new(FakeHost {
        fail_packages: Some("mirror unreachable".into()),
        ..FakeHost::default()
    });
    let (runner, _rx) = runner(&h, host, TimeoutSettings::default());

    let event = runner
        .run(Command::InstallPackages {
            os: ubuntu(),
            packages: vec!["curl".into()],
        })
        .await;
    match event {
        Some(Event::Failed(InstallerError::Install { phase, message })) => {
            assert_eq!(phase, "package install");
            assert!(message.contains("mirror unreachable"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    let last = relay_updates(&mut h, Subsystem::Packages).pop().unwrap();
    assert_eq!(last.status, ProgressStatus::Failed);
}

#[tokio::test]
async fn runtime_install_runs_networking_after_runtime() {
    let mut h = harness();
    let host = Arc::new(FakeHost::default());
    let (runner, _rx) = runner(&h, host.clone(), TimeoutSettings::default());

    let event = runner
        .run(Command::InstallRuntime {
            internal_ip: "10.0.0.5".into(),
            cidr: "10.0.0.0/24".into(),
        })
        .await;
    match event {
        Some(Event::RuntimeInstalled { kubeconfig }) => {
            assert_eq!(kubeconfig.to_str(), Some("/etc/rancher/k3s/k3s.yaml"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(host.calls(), vec!["runtime", "networking:10.0.0.5:10.0.0.0/24"]);

    for subsystem in [Subsystem::Runtime, Subsystem::Networking] {
        let updates = relay_updates(&mut h, subsystem);
        assert!(updates.last().unwrap().is_terminal(), "{subsystem} not terminated");
        assert!(updates.iter().all(|u| u.subsystem == subsystem));
    }
}

#[tokio::test]
async fn heavy_install_deadline_fails_the_task() {
    let mut h = harness();
    let host = Arc::new(FakeHost {
        runtime_delay: Some(Duration::from_secs(5)),
        ..FakeHost::default()
    });
    let timeouts = TimeoutSettings {
        heavy_install_secs: 1,
        ..TimeoutSettings::default()
    };
    let (runner, _rx) = runner(&h, host.clone(), timeouts);

    let event = runner
        .run(Command::InstallRuntime {
            internal_ip: "10.0.0.5".into(),
            cidr: "10.0.0.0/24".into(),
        })
        .await;
    match event {
        Some(Event::Failed(err)) => assert!(err.to_string().contains("timed out")),
        other => panic!("unexpected event {other:?}"),
    }
    // Networking never started.
    assert_eq!(host.calls(), vec!["runtime"]);
    let last = relay_updates(&mut h, Subsystem::Runtime).pop().unwrap();
    assert_eq!(last.status, ProgressStatus::Failed);
}

#[tokio::test]
async fn deployment_sync_uses_options() {
    let h = harness();
    let host = Arc::new(FakeHost::default());
    let (runner, _rx) = runner(&h, host.clone(), TimeoutSettings::default());

    let options = DeployOptions {
        base_domain: "example.com".into(),
        app_domain: "app.example.com".into(),
        registry_domain: "registry.example.com".into(),
        wildcard: false,
        registry: RegistryTarget::SelfHosted {
            domain: "registry.example.com".into(),
        },
    };
    let event = runner.run(Command::SyncDeployment(options)).await;
    assert!(matches!(event, Some(Event::DeploymentSynced)));
    assert_eq!(host.calls(), vec!["sync:app.example.com"]);
}

#[tokio::test]
async fn timers_fire_with_their_payload() {
    let h = harness();
    let (runner, _rx) = runner(&h, Arc::new(FakeHost::default()), TimeoutSettings::default());

    let event = runner
        .run(Command::ValidationTimer {
            kind: ValidationKind::Registry,
            attempt: 7,
            after: Duration::from_millis(10),
        })
        .await;
    assert!(matches!(
        event,
        Some(Event::ValidationTimedOut {
            kind: ValidationKind::Registry,
            attempt: 7
        })
    ));

    let event = runner
        .run(Command::AdvanceAfter {
            phase: Phase::SwapCreated,
            delay: Duration::from_millis(10),
        })
        .await;
    assert!(matches!(event, Some(Event::Advance(Phase::SwapCreated))));
}

#[tokio::test]
async fn slow_registry_counts_as_invalid() {
    let mut h = harness();
    let host = Arc::new(FakeHost {
        registry_valid: true,
        registry_delay: Some(Duration::from_secs(5)),
        ..FakeHost::default()
    });
    let timeouts = TimeoutSettings {
        registry_http_secs: 1,
        ..TimeoutSettings::default()
    };
    let (runner, _rx) = runner(&h, host, timeouts);

    let event = runner
        .run(Command::ValidateExternalRegistry(ExternalRegistry {
            host: "ghcr.io".into(),
            username: "octo".into(),
            password: "token".into(),
        }))
        .await;
    assert!(matches!(event, Some(Event::ExternalRegistryValidated { valid: false })));
    let lines = h.model.log_rx.drain();
    assert!(lines.iter().any(|l| l.contains("did not answer")));
}

#[tokio::test]
async fn uninstall_and_swap_logs_reach_log_queue() {
    let mut h = harness();
    let host = Arc::new(FakeHost::default());
    let (runner, _rx) = runner(&h, host.clone(), TimeoutSettings::default());

    assert!(matches!(
        runner.run(Command::UninstallRuntime).await,
        Some(Event::RuntimeUninstalled)
    ));
    assert!(matches!(
        runner.run(Command::CreateSwap { size_gb: 6 }).await,
        Some(Event::SwapCreated)
    ));
    assert_eq!(h.model.log_rx.drain(), vec!["uninstalled", "swap 6G"]);
    assert_eq!(host.calls(), vec!["uninstall", "swap:6"]);
}

#[tokio::test]
async fn swap_check_reports_disk_space() {
    let h = harness();
    let (runner, _rx) = runner(&h, Arc::new(FakeHost::default()), TimeoutSettings::default());
    match runner.run(Command::CheckSwap).await {
        Some(Event::SwapChecked {
            active,
            available_disk_gb,
        }) => {
            assert!(!active);
            assert_eq!(available_disk_gb, Some(120.0));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn unreadable_disk_space_is_reported_as_unknown() {
    let mut h = harness();
    let host = Arc::new(FakeHost {
        disk_unreadable: true,
        ..FakeHost::default()
    });
    let (runner, _rx) = runner(&h, host, TimeoutSettings::default());
    match runner.run(Command::CheckSwap).await {
        Some(Event::SwapChecked {
            active,
            available_disk_gb,
        }) => {
            assert!(!active);
            assert_eq!(available_disk_gb, None);
        }
        other => panic!("unexpected event {other:?}"),
    }
    let lines = h.model.log_rx.drain();
    assert!(lines.iter().any(|l| l.contains("free disk space")));
}
