//! Synchronous input checks run inside handlers.

use crate::model::ExternalField;
use nodeup_shared::collaborators::ExternalRegistry;
use nodeup_shared::config::SwapSettings;

/// Parse a swap size in whole gigabytes and check it fits on disk.
pub fn swap_size(
    input: &str,
    available_gb: Option<f64>,
    settings: &SwapSettings,
) -> Result<u32, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("enter a size in GB".to_string());
    }
    let size: u32 = input
        .parse()
        .map_err(|_| format!("'{input}' is not a whole number of GB"))?;
    if size == 0 {
        return Err("swap size must be at least 1 GB".to_string());
    }
    if size > settings.max_gb {
        return Err(format!("swap size cannot exceed {} GB", settings.max_gb));
    }
    if let Some(available) = available_gb {
        let usable = available - settings.min_free_gb;
        if f64::from(size) > usable {
            return Err(format!(
                "only {:.1} GB free; {} GB must stay free",
                available.max(0.0),
                settings.min_free_gb
            ));
        }
    }
    Ok(size)
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Check a DNS name. `allow_wildcard` accepts a leading `*.` label.
pub fn domain(input: &str, allow_wildcard: bool) -> Result<String, String> {
    let value = input.trim().to_ascii_lowercase();
    if value.is_empty() {
        return Err("enter a domain".to_string());
    }
    let name = match value.strip_prefix("*.") {
        Some(rest) if allow_wildcard => rest,
        Some(_) => return Err("wildcards are not allowed here".to_string()),
        None => value.as_str(),
    };
    if name.len() > 253 {
        return Err("domain is too long".to_string());
    }
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err(format!("'{name}' needs at least two labels (e.g. example.com)"));
    }
    if let Some(bad) = labels.iter().find(|l| !valid_label(l)) {
        return Err(format!("invalid label '{bad}' in '{name}'"));
    }
    if labels
        .last()
        .map_or(true, |tld| !tld.chars().all(|c| c.is_ascii_alphabetic()))
    {
        return Err(format!("'{name}' has an invalid top-level domain"));
    }
    Ok(value)
}

/// Registry host, optionally with a port.
pub fn registry_host(input: &str) -> Result<String, String> {
    let value = input
        .trim()
        .trim_start_matches("https://")
        .trim_end_matches('/')
        .to_ascii_lowercase();
    let (host, port) = match value.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (value.as_str(), None),
    };
    if let Some(port) = port {
        if port.parse::<u16>().map_or(true, |p| p == 0) {
            return Err(format!("invalid port '{port}'"));
        }
    }
    domain(host, false)?;
    Ok(value)
}

pub fn external_registry(
    host: &str,
    username: &str,
    password: &str,
) -> Result<ExternalRegistry, (ExternalField, String)> {
    let host = registry_host(host).map_err(|e| (ExternalField::Host, e))?;
    let username = username.trim();
    if username.is_empty() {
        return Err((ExternalField::Username, "enter a username".to_string()));
    }
    if password.is_empty() {
        return Err((ExternalField::Password, "enter a password or token".to_string()));
    }
    Ok(ExternalRegistry {
        host,
        username: username.to_string(),
        password: password.to_string(),
    })
}
