//! Runtime bootstrap, deployment sync and the two terminal screens.

use crate::command::Command;
use crate::event::Event;
use crate::keys;
use crate::model::Model;
use crate::phase::Phase;
use nodeup_shared::Subsystem;

pub(crate) fn start_runtime(model: &mut Model) -> Vec<Command> {
    model.begin_progress(Subsystem::Runtime);
    model.begin_progress(Subsystem::Networking);
    model.transition(Phase::InstallingRuntime);
    vec![Command::InstallRuntime {
        internal_ip: model.dns.internal_ip.clone(),
        cidr: model.dns.cidr.clone(),
    }]
}

pub(crate) fn installing_runtime(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::RuntimeInstalled { kubeconfig } => {
            model.settle_progress(Subsystem::Runtime);
            model.settle_progress(Subsystem::Networking);
            model.push_log(format!("kubeconfig at {}", kubeconfig.display()));
            model.kubeconfig = Some(kubeconfig);
            model.begin_progress(Subsystem::Deployment);
            model.transition(Phase::InstallingDeployment);
            vec![Command::SyncDeployment(model.dns.deploy_options())]
        }
        _ => Vec::new(),
    }
}

pub(crate) fn installing_deployment(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::DeploymentSynced => {
            model.settle_progress(Subsystem::Deployment);
            model.push_log(format!("platform available at https://{}", model.dns.app_domain));
            model.transition(Phase::InstallationComplete);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

pub(crate) fn installation_complete(model: &mut Model, event: Event) -> Vec<Command> {
    exit_on_key(model, event)
}

pub(crate) fn error(model: &mut Model, event: Event) -> Vec<Command> {
    exit_on_key(model, event)
}

fn exit_on_key(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key)
            if keys::is_enter(&key) || keys::is_esc(&key) || keys::letter(&key) == Some('q') =>
        {
            model.should_quit = true;
            vec![Command::Quit]
        }
        _ => Vec::new(),
    }
}
