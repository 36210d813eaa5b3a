use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use colored::*;
use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;
use sniffr_common::config::Config;
use sniffr_common::events::MonitorEvent;
use sniffr_common::network::host::{DirectorySnapshot, ObservedHost};
use sniffr_common::network::interface;
use sniffr_core::capture::CaptureState;
use sniffr_core::monitor::NetworkMonitor;
use sniffr_core::vendors::MacOuiRepo;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task;
use tracing::{error, info, warn};

use crate::commands::ListenArgs;
use crate::terminal::progress::SweepBars;
use crate::terminal::{colors, format, print};

const NO_DEADLINE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

pub async fn listen(args: ListenArgs) -> anyhow::Result<()> {
    if !is_root::is_root() {
        warn!("Not running as root; opening capture handles will likely fail");
    }

    let config = Config::from(&args);
    let selected = select_interfaces(&args.interfaces)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut monitor = NetworkMonitor::new(config, Arc::new(tx), Arc::new(MacOuiRepo));
    let mut monitor = task::spawn_blocking(move || monitor.initialize(selected).map(|()| monitor)).await??;

    let listening: Vec<String> = monitor
        .interfaces()
        .into_iter()
        .filter(|status| status.state == CaptureState::Listening)
        .map(|status| status.binding.name)
        .collect();
    if listening.is_empty() {
        task::spawn_blocking(move || monitor.shutdown()).await?;
        bail!("No interface could be opened for capture");
    }

    if args.sweep {
        for name in &listening {
            if let Err(e) = monitor.sweep_subnet(name) {
                warn!(interface = %name, "Sweep not started: {e}");
            }
        }
    }

    print::header("listening");
    let deadline = args.duration.map(Duration::from_secs);
    event_loop(rx, deadline).await;

    let final_snapshot = close_monitor(monitor).await;

    print::header("directory");
    match final_snapshot {
        Ok(snapshot) => print_directory(&snapshot),
        Err(e) => error!("Could not read the host directory: {e}"),
    }
    print::end_of_program();
    Ok(())
}

/// Takes the last directory snapshot and shuts the monitor down on a
/// blocking thread, since both wait on worker threads.
async fn close_monitor(mut monitor: NetworkMonitor) -> anyhow::Result<DirectorySnapshot> {
    let snapshot = task::spawn_blocking(move || {
        let snapshot = monitor.snapshot();
        monitor.shutdown();
        snapshot
    })
    .await??;
    Ok(snapshot)
}

/// Keeps only the requested interfaces; all of them when none are named.
fn select_interfaces(names: &[String]) -> anyhow::Result<Vec<NetworkInterface>> {
    let all: Vec<NetworkInterface> = interface::discover_bindings()
        .into_iter()
        .map(|(intf, _)| intf)
        .collect();
    if names.is_empty() {
        return Ok(all);
    }

    for name in names {
        if !all.iter().any(|intf| &intf.name == name) {
            bail!("Unknown interface: {name}");
        }
    }
    Ok(all.into_iter().filter(|intf| names.contains(&intf.name)).collect())
}

async fn event_loop(mut rx: UnboundedReceiver<MonitorEvent>, deadline: Option<Duration>) {
    let mut known: HashMap<MacAddr, Ipv4Addr> = HashMap::new();
    let mut bars = SweepBars::default();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let timeout = tokio::time::sleep(deadline.unwrap_or(NO_DEADLINE));
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => handle_event(event, &mut known, &mut bars),
                    None => break,
                }
            }

            _ = &mut ctrl_c => {
                info!("Interrupted, stopping");
                break;
            }

            _ = &mut timeout, if deadline.is_some() => {
                break;
            }
        }
    }

    bars.clear();
}

fn handle_event(event: MonitorEvent, known: &mut HashMap<MacAddr, Ipv4Addr>, bars: &mut SweepBars) {
    match event {
        MonitorEvent::ListeningChanged { interface, listening } => {
            let state: ColoredString = if listening {
                "listening".green()
            } else {
                "stopped".red()
            };
            print::print_status(format!("{} {}", interface.color(colors::PRIMARY), state));
        }
        MonitorEvent::DirectoryChanged(snapshot) => {
            if snapshot.is_empty() {
                known.clear();
            }
            for host in changed_hosts(&snapshot, known) {
                print_host_line(host);
                known.insert(host.mac, host.ipv4);
            }
        }
        MonitorEvent::SweepProgress { interface, percent } => bars.update(&interface, percent),
        MonitorEvent::SweepCompleted { interface, cancelled } => bars.finish(&interface, cancelled),
        MonitorEvent::AggregatorStopped { reason } => {
            error!("Host discovery stopped: {reason}");
        }
    }
}

/// Hosts that are new, or whose address differs from the last one printed.
fn changed_hosts<'a>(
    snapshot: &'a DirectorySnapshot,
    known: &HashMap<MacAddr, Ipv4Addr>,
) -> Vec<&'a ObservedHost> {
    snapshot
        .iter()
        .filter(|host| known.get(&host.mac) != Some(&host.ipv4))
        .collect()
}

fn print_host_line(host: &ObservedHost) {
    print::print_status(format!(
        "{} {} {}",
        host.ipv4.to_string().color(colors::IPV4_ADDR),
        host.mac.to_string().color(colors::MAC_ADDR),
        host.manufacturer_label().color(colors::VENDOR),
    ));
}

fn print_directory(snapshot: &DirectorySnapshot) {
    if snapshot.is_empty() {
        print::no_results();
        return;
    }

    let mut idx: usize = 0;
    for (manufacturer, hosts) in snapshot.group_by_manufacturer() {
        print::print_status(format!("{} ({})", manufacturer.color(colors::VENDOR), hosts.len()));
        for host in &hosts {
            print::tree_head(idx, &host.ipv4.to_string());
            print::as_tree_one_level(format::host_to_key_value_pair(host));
            idx += 1;
        }
    }
}
