//! Registry selection: self-hosted domain or external credentials.

use crate::command::Command;
use crate::event::{Event, ValidationKind};
use crate::keys;
use crate::model::{ExternalField, Model, RegistryType};
use crate::phase::Phase;
use crate::validation;
use crossterm::event::KeyCode;

/// Well-known registries offered on F1..F4.
pub const PROVIDERS: [(&str, &str); 4] = [
    ("Docker Hub", "registry-1.docker.io"),
    ("GitHub", "ghcr.io"),
    ("GitLab", "registry.gitlab.com"),
    ("Quay", "quay.io"),
];

pub(crate) fn registry_type_selection(model: &mut Model, event: Event) -> Vec<Command> {
    let Event::Key(key) = event else {
        return Vec::new();
    };
    match key.code {
        KeyCode::Up | KeyCode::Down => {
            model.registry_cursor = model.registry_cursor.toggle();
            return Vec::new();
        }
        KeyCode::Enter => {
            choose(model, model.registry_cursor);
            return Vec::new();
        }
        _ => {}
    }
    match keys::letter(&key) {
        Some('1') | Some('s') => choose(model, RegistryType::SelfHosted),
        Some('2') | Some('x') => choose(model, RegistryType::External),
        _ => {}
    }
    Vec::new()
}

fn choose(model: &mut Model, registry_type: RegistryType) {
    model.registry_cursor = registry_type;
    model.dns.registry_type = Some(registry_type);
    match registry_type {
        RegistryType::SelfHosted => {
            if model.registry_domain_input.value.is_empty() {
                let suggested = model.dns.registry_domain.clone();
                model.registry_domain_input.set(suggested);
            }
            model.transition(Phase::RegistryDomainInput);
        }
        RegistryType::External => {
            model.external_focus = ExternalField::Host;
            model.transition(Phase::ExternalRegistryInput);
        }
    }
}

pub(crate) fn registry_domain_input(model: &mut Model, event: Event) -> Vec<Command> {
    let Event::Key(key) = event else {
        return Vec::new();
    };
    if keys::is_esc(&key) {
        model.transition(Phase::RegistryTypeSelection);
        return Vec::new();
    }
    if keys::is_enter(&key) {
        return match validation::domain(&model.registry_domain_input.value, false) {
            Ok(domain) => {
                model.dns.registry_domain = domain.clone();
                let attempt = model.dns.begin_validation();
                model.push_log(format!("validating registry domain {domain}"));
                model.transition(Phase::RegistryDnsValidation);
                vec![
                    Command::ValidateRegistryDomain {
                        attempt,
                        domain,
                        external_ip: model.dns.external_ip.clone(),
                    },
                    Command::ValidationTimer {
                        kind: ValidationKind::Registry,
                        attempt,
                        after: model.settings.dns_timeout,
                    },
                ]
            }
            Err(message) => {
                model.registry_domain_input.reject(message);
                Vec::new()
            }
        };
    }
    keys::edit_text(&mut model.registry_domain_input, &key, |c| {
        c.is_ascii_alphanumeric() || c == '.' || c == '-'
    });
    Vec::new()
}

pub(crate) fn registry_dns_validation(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::Validated {
            kind: ValidationKind::Registry,
            attempt,
            verdict,
        } => {
            if !model.dns.finish_validation(attempt, verdict.success) {
                return Vec::new();
            }
            model.dns.last_message = verdict.message.clone();
            if verdict.success {
                model.push_log(format!("registry domain ok: {}", verdict.message));
                model.dns.registry_issue = false;
                return enter_dns_success(model);
            }
            model.dns.registry_issue = verdict.cloudflare;
            reject_registry_domain(model, verdict.message)
        }
        Event::ValidationTimedOut {
            kind: ValidationKind::Registry,
            attempt,
        } => {
            if !model.dns.finish_validation(attempt, false) {
                return Vec::new();
            }
            let message = format!(
                "registry DNS validation timed out after {}s",
                model.settings.dns_timeout.as_secs()
            );
            model.dns.last_message = message.clone();
            reject_registry_domain(model, message)
        }
        _ => Vec::new(),
    }
}

fn reject_registry_domain(model: &mut Model, message: String) -> Vec<Command> {
    model.push_log(format!("registry domain rejected: {message}"));
    model.registry_domain_input.clear();
    model.registry_domain_input.reject(message);
    model.transition(Phase::RegistryDomainInput);
    Vec::new()
}

pub(crate) fn external_registry_input(model: &mut Model, event: Event) -> Vec<Command> {
    let Event::Key(key) = event else {
        return Vec::new();
    };
    match key.code {
        KeyCode::Esc => {
            model.transition(Phase::RegistryTypeSelection);
            return Vec::new();
        }
        KeyCode::F(n @ 1..=4) => {
            let (name, host) = PROVIDERS[usize::from(n - 1)];
            model.host_input.set(host);
            model.external_focus = ExternalField::Username;
            model.push_log(format!("registry provider {name} ({host})"));
            return Vec::new();
        }
        KeyCode::Tab => {
            model.external_focus = model.external_focus.next();
            return Vec::new();
        }
        KeyCode::BackTab => {
            model.external_focus = model.external_focus.prev();
            return Vec::new();
        }
        KeyCode::Enter => return submit_external(model),
        _ => {}
    }
    let input = match model.external_focus {
        ExternalField::Host => &mut model.host_input,
        ExternalField::Username => &mut model.username_input,
        ExternalField::Password => &mut model.password_input,
    };
    keys::edit_text(input, &key, |c| !c.is_whitespace());
    Vec::new()
}

fn submit_external(model: &mut Model) -> Vec<Command> {
    match validation::external_registry(
        &model.host_input.value,
        &model.username_input.value,
        &model.password_input.value,
    ) {
        Ok(registry) => {
            model.push_log(format!(
                "checking credentials for {} as {}",
                registry.host, registry.username
            ));
            model.dns.external = Some(registry.clone());
            model.transition(Phase::ExternalRegistryValidation);
            vec![Command::ValidateExternalRegistry(registry)]
        }
        Err((field, message)) => {
            model.external_focus = field;
            match field {
                ExternalField::Host => model.host_input.reject(message),
                ExternalField::Username => model.username_input.reject(message),
                ExternalField::Password => model.password_input.reject(message),
            }
            Vec::new()
        }
    }
}

pub(crate) fn external_registry_validation(model: &mut Model, event: Event) -> Vec<Command> {
    match event {
        Event::ExternalRegistryValidated { valid: true } => {
            model.push_log("registry credentials accepted");
            enter_dns_success(model)
        }
        Event::ExternalRegistryValidated { valid: false } => {
            model.push_log("registry credentials rejected");
            model.dns.external = None;
            model.password_input.clear();
            model
                .password_input
                .reject("registry rejected the credentials");
            model.external_focus = ExternalField::Password;
            model.transition(Phase::ExternalRegistryInput);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn enter_dns_success(model: &mut Model) -> Vec<Command> {
    model.transition(Phase::DnsSuccess);
    vec![Command::AdvanceAfter {
        phase: Phase::DnsSuccess,
        delay: model.settings.auto_advance,
    }]
}
