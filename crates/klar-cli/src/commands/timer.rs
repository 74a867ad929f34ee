//! Foreground clock.
//!
//! `timer run` launches the whole app headless: the clock ticks in the timer
//! actor, widgets render to stderr and clock events are printed to stdout as
//! JSON lines.

use std::sync::Arc;

use clap::Subcommand;
use klar_core::{App, Durations, Event, Snapshot, ValidationError, WidgetKind};
use tokio::sync::broadcast::error::RecvError;

use super::{launch_app, runtime, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the clock until the phases finish or Ctrl-C
    Run {
        /// Work phase length in minutes
        #[arg(long)]
        work: Option<u64>,
        /// Break phase length in minutes
        #[arg(long = "break")]
        break_minutes: Option<u64>,
        /// Open a widget window (repeatable): timer or tasks
        #[arg(long, value_parser = parse_widget)]
        widget: Vec<WidgetKind>,
        /// Number of phases to run back to back
        #[arg(long, default_value = "1")]
        phases: u32,
    },
    /// Print the clock status (durations and today's stats) as JSON
    Status,
}

fn parse_widget(s: &str) -> Result<WidgetKind, String> {
    WidgetKind::parse(s).ok_or_else(|| format!("unknown widget '{s}' (expected timer or tasks)"))
}

fn print_snapshot(kind: WidgetKind, snapshot: &Snapshot) {
    match snapshot {
        Snapshot::Timer(t) => {
            let state = match (t.is_active, t.is_paused) {
                (true, true) => " (paused)",
                (false, _) => " (stopped)",
                _ => "",
            };
            eprintln!(
                "[{kind}] {:02}:{:02} {}{state}",
                t.time_left / 60,
                t.time_left % 60,
                t.phase_label
            );
        }
        Snapshot::Tasks(t) => {
            eprintln!(
                "[{kind}] {}/{} done ({}%)",
                t.completed_tasks, t.total_tasks, t.completion_percentage
            );
        }
    }
}

fn minutes_to_secs(field: &str, minutes: u64) -> Result<u64, ValidationError> {
    minutes.checked_mul(60).ok_or_else(|| ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("{minutes} minutes is too long"),
    })
}

/// Durations from the flags, falling back to the running settings.
fn durations(app: &App, work: Option<u64>, break_minutes: Option<u64>) -> Result<Option<Durations>, Box<dyn std::error::Error>> {
    if work.is_none() && break_minutes.is_none() {
        return Ok(None);
    }
    let current = app.settings();
    let work_secs = match work {
        Some(m) => minutes_to_secs("work", m)?,
        None => current.work_duration_secs,
    };
    let break_secs = match break_minutes {
        Some(m) => minutes_to_secs("break", m)?,
        None => current.short_break_duration_secs,
    };
    Ok(Some(Durations::new(work_secs, break_secs)?))
}

async fn run_clock(app: &App, phases: u32) -> CliResult {
    let mut events = app.timer().subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    app.timer().start().await?;
    let mut completed = 0;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                app.timer().stop().await?;
                eprintln!("interrupted");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if let Event::PhaseCompleted { .. } = event {
                        completed += 1;
                        if completed >= phases {
                            return Ok(());
                        }
                        app.timer().start().await?;
                    }
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "missed clock events"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

pub fn run(action: TimerAction) -> CliResult {
    runtime()?.block_on(async {
        let app = launch_app(Arc::new(print_snapshot)).await?;

        let result = match action {
            TimerAction::Run {
                work,
                break_minutes,
                widget,
                phases,
            } => {
                let setup = async {
                    if let Some(durations) = durations(&app, work, break_minutes)? {
                        app.timer().set_durations(durations).await?;
                    }
                    for kind in widget {
                        app.open_widget(kind).await?;
                    }
                    Ok::<_, Box<dyn std::error::Error>>(())
                };
                match setup.await {
                    Ok(()) => run_clock(&app, phases.max(1)).await,
                    Err(e) => Err(e),
                }
            }
            TimerAction::Status => match app.timer().status().await {
                Ok(status) => serde_json::to_string_pretty(&status)
                    .map(|json| println!("{json}"))
                    .map_err(Into::into),
                Err(e) => Err(e.into()),
            },
        };

        app.shutdown().await;
        result
    })
}
