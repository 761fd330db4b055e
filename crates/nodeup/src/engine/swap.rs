//! Swap check and optional swap file creation.

use super::packages::start_packages;
use crate::command::Command;
use crate::event::Event;
use crate::keys;
use crate::model::Model;
use crate::phase::Phase;
use crate::validation;

pub(crate) fn checking_swap(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::SwapChecked {
            active,
            available_disk_gb,
        } => {
            model.swap_available_gb = available_disk_gb;
            if active {
                model.push_log("swap already active");
                start_packages(model)
            } else {
                match available_disk_gb {
                    Some(gb) => {
                        model.push_log(format!("no active swap ({gb:.1} GB disk available)"))
                    }
                    None => model.push_log("no active swap (free disk space unknown)"),
                }
                model.transition(Phase::ConfirmCreateSwap);
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

pub(crate) fn confirm_create_swap(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) if keys::is_yes(&key) => {
            let default_gb = model.settings.swap.default_gb;
            model.swap_input.set(default_gb.to_string());
            model.transition(Phase::EnterSwapSize);
            Vec::new()
        }
        Event::Key(key) if keys::is_no(&key) => {
            model.push_log("continuing without swap");
            start_packages(model)
        }
        _ => Vec::new(),
    }
}

pub(crate) fn enter_swap_size(model: &mut Model, event: Event) -> Vec<Command> {
    let Event::Key(key) = event else {
        return Vec::new();
    };
    if keys::is_esc(&key) {
        model.transition(Phase::ConfirmCreateSwap);
        return Vec::new();
    }
    if keys::is_enter(&key) {
        return match validation::swap_size(
            &model.swap_input.value,
            model.swap_available_gb,
            &model.settings.swap,
        ) {
            Ok(size_gb) => {
                model.push_log(format!("creating {size_gb} GB swap file"));
                model.transition(Phase::CreatingSwap);
                vec![Command::CreateSwap { size_gb }]
            }
            Err(message) => {
                model.swap_input.reject(message);
                Vec::new()
            }
        };
    }
    keys::edit_text(&mut model.swap_input, &key, |c| c.is_ascii_digit());
    Vec::new()
}

pub(crate) fn creating_swap(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::SwapCreated => {
            model.transition(Phase::SwapCreated);
            vec![Command::AdvanceAfter {
                phase: Phase::SwapCreated,
                delay: model.settings.auto_advance,
            }]
        }
        _ => Vec::new(),
    }
}

pub(crate) fn swap_created(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) if keys::is_enter(&key) => start_packages(model),
        Event::Advance(_) => start_packages(model),
        _ => Vec::new(),
    }
}
