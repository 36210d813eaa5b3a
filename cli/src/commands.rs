pub mod interfaces;
pub mod listen;

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sniffr_common::config::Config;
use sniffr_common::network::filter::UnaddressedPolicy;

#[derive(Parser)]
#[command(name = "sniffr")]
#[command(about = "Passive LAN host discovery.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List local network interfaces
    #[command(alias = "i")]
    Interfaces,
    /// Listen for hosts on the local network
    #[command(alias = "l")]
    Listen(ListenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Only capture on these interfaces (repeatable)
    #[arg(short, long = "interface", value_name = "NAME")]
    pub interfaces: Vec<String>,

    /// Minimum time between directory updates
    #[arg(long, value_name = "MS", default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Receive timeout per capture call; bounds stop latency
    #[arg(long, value_name = "MS", default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    /// What to do with traffic seen on interfaces without an IPv4 address
    #[arg(long, value_enum, default_value_t = Unaddressed::Discard)]
    pub unaddressed: Unaddressed,

    /// Do not put interfaces into promiscuous mode
    #[arg(long)]
    pub no_promiscuous: bool,

    /// Ping every address of each listening interface's subnet once
    #[arg(long)]
    pub sweep: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unaddressed {
    Discard,
    Admit,
    AdmitPrivate,
}

impl From<Unaddressed> for UnaddressedPolicy {
    fn from(value: Unaddressed) -> Self {
        match value {
            Unaddressed::Discard => UnaddressedPolicy::Discard,
            Unaddressed::Admit => UnaddressedPolicy::Admit,
            Unaddressed::AdmitPrivate => UnaddressedPolicy::AdmitPrivate,
        }
    }
}

impl From<&ListenArgs> for Config {
    fn from(args: &ListenArgs) -> Self {
        Config {
            update_interval: Duration::from_millis(args.interval_ms),
            receive_timeout: Duration::from_millis(args.timeout_ms),
            promiscuous: !args.no_promiscuous,
            unaddressed_policy: args.unaddressed.into(),
            ..Config::default()
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
