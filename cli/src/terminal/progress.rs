use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::OnceLock;

use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const SWEEP_TEMPLATE: &str = "{prefix:>12.blue} [{bar:32.green/black}] {pos:>3}% {msg}";
const SWEEP_LENGTH: u64 = 100;

static MULTI: OnceLock<MultiProgress> = OnceLock::new();

pub fn multi() -> &'static MultiProgress {
    MULTI.get_or_init(MultiProgress::new)
}

/// Log sink that prints above any active progress bars.
pub struct ProgressWriter;

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let msg = String::from_utf8_lossy(buf);
        let msg = msg.trim_end();
        if console::user_attended_stderr() {
            multi().println(msg)?;
        } else {
            writeln!(io::stdout(), "{msg}")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// One progress bar per interface with a sweep in flight.
#[derive(Default)]
pub struct SweepBars {
    bars: HashMap<String, ProgressBar>,
}

impl SweepBars {
    pub fn update(&mut self, interface: &str, percent: f32) {
        let bar = self
            .bars
            .entry(interface.to_string())
            .or_insert_with(|| new_bar(interface));
        bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
    }

    pub fn finish(&mut self, interface: &str, cancelled: bool) {
        if let Some(bar) = self.bars.remove(interface) {
            if cancelled {
                bar.abandon_with_message(format!("{}", "cancelled".yellow()));
            } else {
                bar.finish_with_message(format!("{}", "done".green()));
            }
        }
    }

    pub fn clear(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.finish_and_clear();
        }
    }
}

fn new_bar(interface: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(SWEEP_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bar = multi().add(ProgressBar::new(SWEEP_LENGTH));
    bar.set_style(style);
    bar.set_prefix(interface.to_string());
    bar
}
