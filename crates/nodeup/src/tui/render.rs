//! Rendering - one body per phase, plus header, log pane, footer and debug overlay.

use crate::engine::PROVIDERS;
use crate::model::{ExternalField, Model, RegistryType, TextInput};
use crate::phase::Phase;
use nodeup_shared::{ProgressStatus, Subsystem};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const LOG_PANE_LINES: u16 = 6;

fn accent() -> Style {
    Style::default().fg(Color::Cyan)
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub fn draw(f: &mut Frame, model: &Model) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(LOG_PANE_LINES + 2),
            Constraint::Length(1),
        ])
        .split(f.size());

    draw_header(f, chunks[0], model);
    draw_body(f, chunks[1], model);
    draw_log_pane(f, chunks[2], model);
    draw_footer(f, chunks[3], model);

    if model.debug_overlay_open() {
        draw_debug_overlay(f, f.size(), model);
    }
}

fn draw_header(f: &mut Frame, area: Rect, model: &Model) {
    let line = Line::from(vec![
        Span::styled(
            format!(" nodeup {} ", env!("NODEUP_VERSION")),
            accent().add_modifier(Modifier::BOLD),
        ),
        Span::styled("| ", dim()),
        Span::raw(model.phase.title()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn spinner(model: &Model) -> &'static str {
    SPINNER[model.spinner_frame % SPINNER.len()]
}

fn waiting(model: &Model, message: impl Into<String>) -> Vec<Line<'static>> {
    vec![Line::from(vec![
        Span::styled(format!("{} ", spinner(model)), accent()),
        Span::raw(message.into()),
    ])]
}

fn input_line(label: &str, input: &TextInput, focused: bool, masked: bool) -> Vec<Line<'static>> {
    let shown = if masked {
        "*".repeat(input.value.chars().count())
    } else {
        input.value.clone()
    };
    let marker = if focused { "> " } else { "  " };
    let cursor = if focused { "_" } else { "" };
    let mut lines = vec![Line::from(vec![
        Span::styled(marker.to_string(), accent()),
        Span::styled(format!("{label}: "), bold()),
        Span::raw(format!("{shown}{cursor}")),
    ])];
    if let Some(err) = &input.error {
        lines.push(Line::from(Span::styled(
            format!("    {err}"),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

fn body_lines(model: &Model) -> Vec<Line<'static>> {
    let dns = &model.dns;
    match model.phase {
        Phase::Welcome => vec![
            Line::from(Span::styled("Single-node platform installer", bold())),
            Line::from(""),
            Line::from("This will prepare the host, install a k3s cluster with Cilium,"),
            Line::from("configure DNS and a container registry, and deploy the platform."),
            Line::from(""),
            Line::from("Press Enter to begin."),
        ],
        Phase::CheckRuntime => waiting(model, "Looking for an existing k3s installation..."),
        Phase::ConfirmUninstall => vec![
            Line::from("A k3s installation already exists on this host."),
            Line::from("It must be removed before installing. All cluster data will be lost."),
            Line::from(""),
            Line::from(Span::styled("Remove it now? [y/n]", bold())),
        ],
        Phase::Uninstalling => waiting(model, "Removing the existing cluster..."),
        Phase::OsDetect => match &model.os {
            Some(os) => vec![
                Line::from(vec![Span::raw("Detected: "), Span::styled(os.summary(), bold())]),
                Line::from(""),
                Line::from(Span::styled("Continuing shortly (Enter to skip the wait)", dim())),
            ],
            None => waiting(model, "Reading /etc/os-release..."),
        },
        Phase::CheckingSwap => waiting(model, "Checking swap and free disk space..."),
        Phase::ConfirmCreateSwap => {
            let mut lines = vec![Line::from("No swap is active on this host.")];
            if let Some(gb) = model.swap_available_gb {
                lines.push(Line::from(format!("{gb:.1} GB of disk space is available.")));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Create a swap file? [y/n]", bold())));
            lines
        }
        Phase::EnterSwapSize => {
            let mut lines = vec![
                Line::from(format!(
                    "Swap file size in GB (1-{}):",
                    model.settings.swap.max_gb
                )),
                Line::from(""),
            ];
            lines.extend(input_line("Size (GB)", &model.swap_input, true, false));
            lines
        }
        Phase::CreatingSwap => waiting(model, "Creating the swap file..."),
        Phase::SwapCreated => vec![Line::from("Swap file created and enabled.")],
        Phase::InstallingPackages => Vec::new(),
        Phase::InstallComplete => vec![Line::from("Required packages are installed.")],
        Phase::DetectingIps => waiting(model, "Detecting internal and external addresses..."),
        Phase::DnsConfig => {
            let mut lines = vec![
                Line::from(vec![
                    Span::raw("External IP: "),
                    Span::styled(dns.external_ip.clone(), bold()),
                    Span::raw(format!("   internal: {} ({})", dns.internal_ip, dns.cidr)),
                ]),
                Line::from(""),
                Line::from("Point these records at the external IP, or use a wildcard:"),
                Line::from(Span::styled(
                    "  app.<domain>  auth.<domain>  registry.<domain>",
                    accent(),
                )),
                Line::from(""),
            ];
            lines.extend(input_line("Domain", &model.domain_input, true, false));
            lines
        }
        Phase::DnsValidation => waiting(model, format!("Validating DNS for {}...", dns.domain)),
        Phase::DnsSuccess => {
            let registry = match dns.registry_type {
                Some(RegistryType::External) => dns
                    .external
                    .as_ref()
                    .map(|r| format!("{} (external)", r.host))
                    .unwrap_or_default(),
                _ => format!("{} (self-hosted)", dns.registry_domain),
            };
            let mut lines = vec![
                Line::from(format!("Platform: {}", dns.app_domain)),
                Line::from(format!("Registry: {registry}")),
            ];
            if dns.wildcard {
                lines.push(Line::from("Wildcard DNS record detected."));
            }
            if dns.cloudflare {
                lines.push(Line::from("Cloudflare proxy detected in front of the domain."));
            }
            lines
        }
        Phase::DnsFailed => {
            let mut lines = vec![
                Line::from(Span::styled(
                    format!("DNS for {} is not ready.", dns.domain),
                    Style::default().fg(Color::Yellow),
                )),
                Line::from(dns.last_message.clone()),
            ];
            if dns.registry_issue {
                lines.push(Line::from(
                    "The registry subdomain must not be proxied; switch it to DNS only.",
                ));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("[r] retry   [e] edit domain   [c] continue anyway"));
            lines
        }
        Phase::RegistryTypeSelection => {
            let option = |t: RegistryType, label: &str| {
                let selected = model.registry_cursor == t;
                Line::from(vec![
                    Span::styled(if selected { "> " } else { "  " }.to_string(), accent()),
                    Span::styled(
                        label.to_string(),
                        if selected { bold() } else { Style::default() },
                    ),
                ])
            };
            vec![
                Line::from("Where should container images be stored?"),
                Line::from(""),
                option(RegistryType::SelfHosted, "1. Self-hosted registry on this node"),
                option(RegistryType::External, "2. External registry (Docker Hub, GHCR, ...)"),
            ]
        }
        Phase::RegistryDomainInput => {
            let mut lines = vec![
                Line::from("Domain for the self-hosted registry (must not be proxied):"),
                Line::from(""),
            ];
            lines.extend(input_line(
                "Registry domain",
                &model.registry_domain_input,
                true,
                false,
            ));
            lines
        }
        Phase::RegistryDnsValidation => {
            waiting(model, format!("Validating {}...", dns.registry_domain))
        }
        Phase::ExternalRegistryInput => {
            let providers = PROVIDERS
                .iter()
                .enumerate()
                .map(|(i, (name, _))| format!("[F{}] {name}", i + 1))
                .collect::<Vec<_>>()
                .join("  ");
            let focus = model.external_focus;
            let mut lines = vec![Line::from(Span::styled(providers, dim())), Line::from("")];
            lines.extend(input_line(
                "Host",
                &model.host_input,
                focus == ExternalField::Host,
                false,
            ));
            lines.extend(input_line(
                "Username",
                &model.username_input,
                focus == ExternalField::Username,
                false,
            ));
            lines.extend(input_line(
                "Password",
                &model.password_input,
                focus == ExternalField::Password,
                true,
            ));
            lines
        }
        Phase::ExternalRegistryValidation => waiting(model, "Checking registry credentials..."),
        Phase::InstallingRuntime | Phase::InstallingDeployment => Vec::new(),
        Phase::InstallationComplete => {
            let mut lines = vec![
                Line::from(Span::styled(
                    "The platform is installed.",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("Open https://{}", dns.app_domain)),
            ];
            if let Some(path) = &model.kubeconfig {
                lines.push(Line::from(format!("kubeconfig: {}", path.display())));
            }
            lines
        }
        Phase::Error => match &model.error {
            Some(failure) => vec![
                Line::from(Span::styled(
                    failure.error.to_string(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("Failed during: {}", failure.phase.title())),
                Line::from(Span::styled("Details are in the installer log.", dim())),
            ],
            None => vec![Line::from("Installation stopped.")],
        },
    }
}

fn draw_body(f: &mut Frame, area: Rect, model: &Model) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", model.phase.title()));
    let gauges = crate::relay::subsystems_for(model.phase);
    if gauges.is_empty() {
        let paragraph = Paragraph::new(body_lines(model))
            .block(block)
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
        return;
    }

    let inner = block.inner(area);
    f.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            gauges
                .iter()
                .map(|_| Constraint::Length(3))
                .chain(std::iter::once(Constraint::Min(0)))
                .collect::<Vec<_>>(),
        )
        .split(inner);
    for (row, subsystem) in rows.iter().zip(gauges) {
        draw_gauge(f, *row, model, *subsystem);
    }
}

fn draw_gauge(f: &mut Frame, area: Rect, model: &Model, subsystem: Subsystem) {
    let (ratio, status, step) = match model.snapshot(subsystem) {
        Some(snap) => (snap.fraction, snap.status, snap.step.clone()),
        None => (0.0, ProgressStatus::Pending, String::new()),
    };
    let color = match status {
        ProgressStatus::Completed => Color::Green,
        ProgressStatus::Failed => Color::Red,
        _ => Color::Cyan,
    };
    let label = if step.is_empty() {
        format!("{:.0}%", ratio * 100.0)
    } else {
        format!("{:.0}%  {step}", ratio * 100.0)
    };
    let gauge = Gauge::default()
        .block(Block::default().title(format!(" {} {} ", spinner(model), subsystem)))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    f.render_widget(gauge, area);
}

fn draw_log_pane(f: &mut Frame, area: Rect, model: &Model) {
    let lines: Vec<Line> = model
        .recent_logs(usize::from(LOG_PANE_LINES))
        .map(|l| Line::from(Span::styled(l.clone(), dim())))
        .collect();
    let pane = Paragraph::new(lines).block(Block::default().borders(Borders::TOP).title(" log "));
    f.render_widget(pane, area);
}

/// Key hints for the footer.
pub fn hints(phase: Phase) -> &'static str {
    match phase {
        Phase::Welcome => "Enter start",
        Phase::ConfirmUninstall | Phase::ConfirmCreateSwap => "y yes   n no",
        Phase::EnterSwapSize | Phase::RegistryDomainInput => "Enter confirm   Esc back",
        Phase::DnsConfig => "Enter validate",
        Phase::DnsFailed => "r retry   e edit   c continue",
        Phase::RegistryTypeSelection => "1/2 or Up/Down + Enter",
        Phase::ExternalRegistryInput => "F1-F4 provider   Tab next field   Enter check   Esc back",
        Phase::OsDetect
        | Phase::SwapCreated
        | Phase::InstallComplete
        | Phase::DnsSuccess => "Enter continue",
        Phase::InstallationComplete | Phase::Error => "Enter/q exit",
        _ => "",
    }
}

fn draw_footer(f: &mut Frame, area: Rect, model: &Model) {
    let mut spans = vec![Span::styled(format!(" {}", hints(model.phase)), accent())];
    if model.phase.takes_text() {
        spans.push(Span::styled("   Backspace edit", accent()));
    }
    spans.push(Span::styled("   Ctrl+D log   Ctrl+C quit", dim()));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_debug_overlay(f: &mut Frame, area: Rect, model: &Model) {
    let popup = centered(area, 90, 80);
    let visible = usize::from(popup.height.saturating_sub(2));
    let lines: Vec<Line> = model
        .recent_logs(visible)
        .map(|l| Line::from(l.clone()))
        .collect();
    let title = match model.previous_phase {
        Some(phase) => format!(" debug log (opened in {phase}) - Esc close "),
        None => " debug log ".to_string(),
    };
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false }),
        popup,
    );
}
