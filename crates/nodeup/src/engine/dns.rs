//! Platform domain entry, validation and the failed/succeeded screens.

use super::deploy::start_runtime;
use crate::command::Command;
use crate::event::{Event, ValidationKind};
use crate::keys;
use crate::model::Model;
use crate::phase::Phase;
use crate::validation;
use tracing::warn;

pub(crate) fn dns_config(model: &mut Model, event: Event) -> Vec<Command> {
    let Event::Key(key) = event else {
        return Vec::new();
    };
    if keys::is_enter(&key) {
        return match validation::domain(&model.domain_input.value, true) {
            Ok(domain) => {
                model.dns.set_domain(&domain);
                start_platform_validation(model)
            }
            Err(message) => {
                model.domain_input.reject(message);
                Vec::new()
            }
        };
    }
    keys::edit_text(&mut model.domain_input, &key, |c| {
        c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '*'
    });
    Vec::new()
}

pub(crate) fn start_platform_validation(model: &mut Model) -> Vec<Command> {
    let attempt = model.dns.begin_validation();
    model.push_log(format!(
        "validating DNS for {} (attempt {attempt})",
        model.dns.domain
    ));
    model.transition(Phase::DnsValidation);
    vec![
        Command::ValidatePlatformDomain {
            attempt,
            domain: model.dns.domain.clone(),
            external_ip: model.dns.external_ip.clone(),
        },
        Command::ValidationTimer {
            kind: ValidationKind::Platform,
            attempt,
            after: model.settings.dns_timeout,
        },
    ]
}

pub(crate) fn dns_validation(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Validated {
            kind: ValidationKind::Platform,
            attempt,
            verdict,
        } => {
            if !model.dns.finish_validation(attempt, verdict.success) {
                return Vec::new();
            }
            model.dns.apply_platform_verdict(&verdict);
            model.push_log(format!(
                "DNS validation {}: {}",
                if verdict.success { "passed" } else { "failed" },
                verdict.message
            ));
            if verdict.success {
                model.transition(Phase::RegistryTypeSelection);
            } else {
                model.transition(Phase::DnsFailed);
            }
            Vec::new()
        }
        Event::ValidationTimedOut {
            kind: ValidationKind::Platform,
            attempt,
        } => {
            if !model.dns.finish_validation(attempt, false) {
                return Vec::new();
            }
            model.dns.last_message = format!(
                "DNS validation timed out after {}s",
                model.settings.dns_timeout.as_secs()
            );
            model.push_log(model.dns.last_message.clone());
            model.transition(Phase::DnsFailed);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

pub(crate) fn dns_failed(model: &mut Model, event: Event) -> Vec<Command> {
    let Event::Key(key) = event else {
        return Vec::new();
    };
    match keys::letter(&key) {
        Some('r') => start_platform_validation(model),
        Some('e') => {
            model.domain_input.clear();
            model.transition(Phase::DnsConfig);
            Vec::new()
        }
        Some('c') => {
            warn!(domain = %model.dns.domain, "continuing despite failed DNS validation");
            model.push_log(format!(
                "warning: continuing with {} although DNS validation failed",
                model.dns.domain
            ));
            model.transition(Phase::RegistryTypeSelection);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

pub(crate) fn dns_success(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Key(key) if keys::is_enter(&key) => start_runtime(model),
        Event::Advance(_) => start_runtime(model),
        _ => Vec::new(),
    }
}
