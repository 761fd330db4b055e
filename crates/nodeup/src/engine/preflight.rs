//! Welcome, existing-runtime check and OS detection.

use crate::command::Command;
use crate::event::Event;
use crate::keys;
use crate::model::Model;
use crate::phase::Phase;
use nodeup_shared::InstallerError;

pub(crate) fn welcome(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) if keys::is_enter(&key) => {
            model.transition(Phase::CheckRuntime);
            vec![Command::CheckRuntime]
        }
        _ => Vec::new(),
    }
}

pub(crate) fn check_runtime(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::RuntimeChecked { installed: true } => {
            model.push_log("existing cluster runtime found");
            model.transition(Phase::ConfirmUninstall);
            Vec::new()
        }
        Event::RuntimeChecked { installed: false } => start_os_detect(model),
        _ => Vec::new(),
    }
}

pub(crate) fn confirm_uninstall(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) if keys::is_yes(&key) => {
            model.transition(Phase::Uninstalling);
            vec![Command::UninstallRuntime]
        }
        Event::Key(key) if keys::is_no(&key) => {
            model.fail(InstallerError::UserAbort(
                "the existing cluster runtime must be removed before installing".to_string(),
            ));
            Vec::new()
        }
        _ => Vec::new(),
    }
}

pub(crate) fn uninstalling(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::RuntimeUninstalled => {
            model.push_log("existing cluster runtime removed");
            start_os_detect(model)
        }
        _ => Vec::new(),
    }
}

fn start_os_detect(model: &mut Model) -> Vec<Command> {
    model.os = None;
    model.transition(Phase::OsDetect);
    vec![Command::DetectOs]
}

pub(crate) fn os_detect(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::OsDetected(info) => {
            model.push_log(format!("detected {}", info.summary()));
            model.os = Some(info);
            vec![Command::AdvanceAfter {
                phase: Phase::OsDetect,
                delay: model.settings.auto_advance,
            }]
        }
        Event::Key(key) if keys::is_enter(&key) && model.os.is_some() => advance(model),
        Event::Advance(_) if model.os.is_some() => advance(model),
        _ => Vec::new(),
    }
}

fn advance(model: &mut Model) -> Vec<Command> {
    model.transition(Phase::CheckingSwap);
    vec![Command::CheckSwap]
}
