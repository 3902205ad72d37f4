//! Stack CLI commands.

use anyhow::{Context, Result};
use berth_core::types::{PortMapping, StackDetails, StackStatus, TeardownReport};
use berth_core::{ComposeParser, EngineConfig, StackOrchestrator};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tabled::{settings::Style, Table, Tabled};

/// Deploy a stack from a compose file
pub async fn deploy(mut config: EngineConfig, name: &str, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read compose file {}", file.display()))?;

    // Parse locally to show what we're deploying
    let definition = ComposeParser::parse(&text).context("Failed to parse compose file")?;

    println!(
        "{} Deploying {} service(s) as '{}'",
        "→".cyan().bold(),
        definition.services.len(),
        name.bold()
    );
    println!();
    for (key, service) in &definition.services {
        println!("  {} {} {}", "•".dimmed(), key.bold(), service.image.dimmed());
    }
    println!();

    // Relative bind mounts resolve against the compose file's directory
    if config.project_dir.is_none() {
        config.project_dir = file
            .canonicalize()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf));
    }

    let engine = connect(&config)?;

    let spinner = spinner("green", "Creating networks, volumes and containers...")?;
    let result = engine.deploy(name, &text).await;
    spinner.finish_and_clear();
    let summary = result.context("Failed to deploy stack")?;

    println!("{} {}", "✓".green().bold(), summary.message);
    println!();

    #[derive(Tabled)]
    struct ResourceRow {
        #[tabled(rename = "KIND")]
        kind: &'static str,
        #[tabled(rename = "NAME")]
        name: String,
    }

    let rows: Vec<ResourceRow> = summary
        .services
        .iter()
        .map(|n| ResourceRow { kind: "container", name: n.clone() })
        .chain(summary.networks.iter().map(|n| ResourceRow { kind: "network", name: n.clone() }))
        .chain(summary.volumes.iter().map(|n| ResourceRow { kind: "volume", name: n.clone() }))
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    Ok(())
}

/// List all stacks
pub async fn ls(config: &EngineConfig, json: bool) -> Result<()> {
    let engine = connect(config)?;
    let stacks = engine.list().await.context("Failed to list stacks")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stacks)?);
        return Ok(());
    }

    if stacks.is_empty() {
        println!("No stacks deployed");
        return Ok(());
    }

    #[derive(Tabled)]
    struct StackRow {
        #[tabled(rename = "STACK NAME")]
        name: String,
        #[tabled(rename = "SERVICES")]
        services: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "CREATED")]
        created: String,
    }

    let rows: Vec<StackRow> = stacks
        .iter()
        .map(|s| {
            let running = s.services.iter().filter(|svc| svc.is_running()).count();
            StackRow {
                name: s.name.clone(),
                services: format!("{}/{}", running, s.services.len()),
                status: colorize_stack_status(s.status),
                created: format_age(s.created_at),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    Ok(())
}

/// Show details of one stack
pub async fn inspect(config: &EngineConfig, name: &str, json: bool) -> Result<()> {
    let engine = connect(config)?;
    let details = engine.get_details(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
    } else {
        display_stack_details(&details);
    }

    Ok(())
}

/// Stop every container of a stack
pub async fn stop(config: &EngineConfig, name: &str) -> Result<()> {
    let engine = connect(config)?;

    let spinner = spinner("yellow", &format!("Stopping stack '{}'...", name))?;
    let result = engine.stop(name).await;
    spinner.finish_and_clear();
    let report = result?;

    print_report("stopped", name, &report);
    Ok(())
}

/// Remove a stack
pub async fn rm(config: &EngineConfig, name: &str, volumes: bool, force: bool) -> Result<()> {
    // Confirm before removing (unless force)
    if !force {
        let what = if volumes { "and its volumes " } else { "" };
        print!(
            "{} Remove stack '{}' {}? [y/N]: ",
            "⚠".yellow().bold(),
            name.bold(),
            what
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let engine = connect(config)?;

    let spinner = spinner("yellow", &format!("Removing stack '{}'...", name))?;
    let result = engine.remove(name, volumes).await;
    spinner.finish_and_clear();
    let report = result?;

    print_report("removed", name, &report);
    if !volumes {
        println!("{}", "Volumes kept; pass --volumes to remove them".dimmed());
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn connect(config: &EngineConfig) -> Result<StackOrchestrator> {
    StackOrchestrator::connect(config).context("Failed to connect to container engine")
}

fn spinner(color: &str, message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(&format!("{{spinner:.{}}} {{msg}}", color))?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn print_report(verb: &str, name: &str, report: &TeardownReport) {
    if report.is_clean() {
        println!("{} Stack {}: {}", "✓".green().bold(), verb, name.bold());
    } else {
        println!("{} Stack {} with failures: {}", "⚠".yellow().bold(), verb, name.bold());
    }

    let counts = [
        ("containers", report.containers),
        ("networks", report.networks),
        ("volumes", report.volumes),
    ];
    for (kind, count) in counts {
        if count.succeeded + count.failed == 0 {
            continue;
        }
        let failed = if count.failed > 0 {
            format!(", {} failed", count.failed).red().to_string()
        } else {
            String::new()
        };
        println!("  {} {} {}{}", "•".dimmed(), count.succeeded, kind, failed);
    }
}

/// Display detailed information about a stack
fn display_stack_details(details: &StackDetails) {
    let stack = &details.stack;

    println!("{}", "Stack Details".bold().underline());
    println!();
    println!("{}: {}", "Name".bold(), stack.name);
    println!("{}: {}", "Status".bold(), colorize_stack_status(stack.status));
    println!("{}: {} ago", "Created".bold(), format_age(stack.created_at));
    println!();

    #[derive(Tabled)]
    struct ServiceRow {
        #[tabled(rename = "SERVICE")]
        service: String,
        #[tabled(rename = "CONTAINER")]
        container: String,
        #[tabled(rename = "IMAGE")]
        image: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "PORTS")]
        ports: String,
    }

    let rows: Vec<ServiceRow> = details
        .service_details
        .iter()
        .zip(&stack.services)
        .map(|(detail, instance)| ServiceRow {
            service: detail.service.clone(),
            container: detail.container_name.clone(),
            image: instance.image.clone(),
            status: colorize_status(&instance.status),
            ports: format_ports(&instance.ports),
        })
        .collect();

    println!("{}", "Services:".bold());
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if !details.network_details.is_empty() || !details.volume_details.is_empty() {
        #[derive(Tabled)]
        struct ResourceRow {
            #[tabled(rename = "KIND")]
            kind: &'static str,
            #[tabled(rename = "KEY")]
            key: String,
            #[tabled(rename = "NAME")]
            name: String,
            #[tabled(rename = "DRIVER")]
            driver: String,
        }

        let networks = details.network_details.iter().map(|r| ("network", r));
        let volumes = details.volume_details.iter().map(|r| ("volume", r));
        let rows: Vec<ResourceRow> = networks
            .chain(volumes)
            .map(|(kind, r)| ResourceRow {
                kind,
                key: r.key.clone(),
                name: r.name.clone(),
                driver: r.driver.clone(),
            })
            .collect();

        println!();
        println!("{}", "Resources:".bold());
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }
}

/// Colorize a container state
fn colorize_status(status: &str) -> String {
    match status {
        "running" => status.green().to_string(),
        "exited" | "dead" => status.red().to_string(),
        "created" | "restarting" | "paused" => status.yellow().to_string(),
        _ => status.to_string(),
    }
}

fn colorize_stack_status(status: StackStatus) -> String {
    let text = status.to_string();
    match status {
        StackStatus::Running => text.green().to_string(),
        StackStatus::Stopped => text.red().to_string(),
        StackStatus::Partial => text.yellow().to_string(),
    }
}

/// `8080->80/tcp, 53/udp`
fn format_ports(ports: &[PortMapping]) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|p| match p.host_port {
            Some(host) => format!("{}->{}/{}", host, p.container_port, p.protocol),
            None => format!("{}/{}", p.container_port, p.protocol),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_age(created_at: SystemTime) -> String {
    format_duration(created_at.elapsed().unwrap_or(Duration::from_secs(0)))
}

/// Format duration as human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::types::Protocol;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m");
        assert_eq!(format_duration(Duration::from_secs(3700)), "1h");
        assert_eq!(format_duration(Duration::from_secs(90000)), "1d");
    }

    #[test]
    fn test_format_ports() {
        assert_eq!(format_ports(&[]), "-");
        let ports = vec![
            PortMapping { container_port: 80, host_port: Some(8080), protocol: Protocol::Tcp },
            PortMapping { container_port: 53, host_port: None, protocol: Protocol::Udp },
        ];
        assert_eq!(format_ports(&ports), "8080->80/tcp, 53/udp");
    }

    #[test]
    fn test_colorize_status() {
        colored::control::set_override(false);
        assert_eq!(colorize_status("running"), "running");
        assert_eq!(colorize_status("unknown"), "unknown");
        assert_eq!(colorize_stack_status(StackStatus::Partial), "partial");
    }
}
