//! Render thread: wakes on a fixed interval, snapshots counters, prints a
//! single-line TTY update or a structured log line in non-TTY environments
//! (spec.md §4.5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use console::Term;

use super::Stats;

/// Handle to a spawned render task; drop or call [`DisplayHandle::stop`] to
/// end it, which also triggers one final summary print.
pub struct DisplayHandle {
    stop: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl DisplayHandle {
    pub async fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.task.await;
    }
}

/// Spawn the periodic render task. `label` names the run (e.g. `"recrawl"`,
/// `"verify"`) in non-TTY log lines.
pub fn run_display(stats: Arc<Stats>, label: &'static str, interval: Duration) -> DisplayHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let started_at = Instant::now();

    let task = tokio::spawn(async move {
        let is_tty = Term::stdout().is_term();
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let snap = stats.snapshot(started_at);
            render_line(label, &snap, is_tty, false);

            if stop_flag.load(Ordering::Relaxed) || stats.is_done() {
                let snap = stats.snapshot(started_at);
                render_line(label, &snap, is_tty, true);
                break;
            }
        }
    });

    DisplayHandle { stop, task }
}

fn render_line(label: &str, snap: &super::StatsSnapshot, is_tty: bool, is_final: bool) {
    let eta_s = snap
        .eta
        .map(|d| format!("{}s", d.as_secs()))
        .unwrap_or_else(|| "--".into());

    if is_tty && !is_final {
        print!(
            "\r\x1b[K{label}: {}/{} ({:.1}/s, eta {eta_s}) ok={} http_err={} timeout={} read_err={} dns_skip={}",
            snap.done,
            snap.total,
            snap.rate_per_sec,
            snap.ok,
            snap.http_error,
            snap.timeout,
            snap.read_failed,
            snap.dns_skipped
        );
        use std::io::Write;
        let _ = std::io::stdout().flush();
    } else if is_final {
        if is_tty {
            println!();
        }
        tracing::info!(
            done = snap.done,
            total = snap.total,
            ok = snap.ok,
            http_error = snap.http_error,
            timeout = snap.timeout,
            connect_failed = snap.connect_failed,
            read_failed = snap.read_failed,
            dns_skipped = snap.dns_skipped,
            cancelled = snap.cancelled,
            retries = snap.retries,
            elapsed_s = snap.elapsed.as_secs_f64(),
            "{label} finished"
        );
    } else {
        tracing::info!(
            done = snap.done,
            total = snap.total,
            rate_per_sec = snap.rate_per_sec,
            eta_s = snap.eta.map(|d| d.as_secs()),
            "{label} progress"
        );
    }
}
