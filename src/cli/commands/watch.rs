use anyhow::Result;
use chrono::Utc;
use std::io::Write;

use super::show::{print_actions, print_event};
use super::{report_load_error, with_api, Command};
use crate::api::{EntityId, SharedApi};
use crate::config::PollingConfig;
use crate::countdown::{countdown_target, CountdownTicker};
use crate::lifecycle::Role;
use crate::shutdown::ShutdownCoordinator;
use crate::views::{EventDetailView, MonitoringFrame, MonitoringView};

pub struct WatchCommand {
    pub event_id: String,
    pub monitor: bool,
    pub role: Role,
}

impl WatchCommand {
    pub fn new(event_id: String) -> Self {
        Self {
            event_id,
            monitor: false,
            role: Role::Admin,
        }
    }

    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Command for WatchCommand {
    async fn execute(&self) -> Result<()> {
        let id = EntityId::new(self.event_id.clone());
        let monitor = self.monitor;
        let role = self.role;

        let shutdown = ShutdownCoordinator::new();
        shutdown.install_signal_handlers();

        let result = with_api(|api, polling| {
            let shutdown = shutdown.clone();
            async move {
                if monitor {
                    watch_monitoring(api, id, &polling, &shutdown).await
                } else {
                    watch_event(api, id, role, &polling, &shutdown).await
                }
            }
        })
        .await;

        ShutdownCoordinator::shutdown_all_services().await?;
        result
    }
}

async fn watch_event(
    api: SharedApi,
    id: EntityId,
    role: Role,
    polling: &PollingConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<()> {
    let mut view = match EventDetailView::mount(api, id.clone(), role, polling).await {
        Ok(view) => view,
        Err(e) => {
            report_load_error(&format!("event {id}"), &e, &format!("expo-console watch {id}"));
            return Err(e.into());
        }
    };

    let event = view.event();
    print_event(&event, view.countdown().as_ref());
    print_actions(&event, &view.available_actions());

    if !view.is_polling() {
        println!("🏁 Event is {} - nothing left to watch", event.state.label());
        view.unmount();
        return Ok(());
    }

    println!();
    println!(
        "👁️  Watching event {} (refresh every {}s, Ctrl-C to stop)",
        id,
        polling.event_detail().as_secs()
    );

    let mut updates = view.resource().subscribe();
    let ticker = CountdownTicker::spawn(countdown_target(&event));
    let mut countdown = ticker.subscribe();

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = updates.borrow_and_update().clone();
                ticker.retarget(countdown_target(&event));

                println!();
                println!("🔄 Updated at {}", Utc::now().format("%H:%M:%S"));
                print_event(&event, view.countdown().as_ref());
                print_actions(&event, &view.available_actions());

                if !view.is_polling() {
                    println!("🏁 Event is {} - stopped watching", event.state.label());
                    break;
                }
            }
            changed = countdown.changed() => {
                if changed.is_err() {
                    break;
                }
                let display = countdown.borrow_and_update().clone();
                if let Some(display) = display {
                    print!("\r   ⏳ {:<24}", display.to_string());
                    std::io::stdout().flush()?;
                }
            }
        }
    }

    println!();
    if let Some(stats) = view.resource().poll_stats() {
        if stats.failures() > 0 {
            println!("⚠️  {} of {} refreshes failed while watching", stats.failures(), stats.fetches());
        }
    }
    view.unmount();
    Ok(())
}

async fn watch_monitoring(
    api: SharedApi,
    id: EntityId,
    polling: &PollingConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<()> {
    let mut view = match MonitoringView::mount(api, id.clone(), polling).await {
        Ok(view) => view,
        Err(e) => {
            report_load_error(&format!("monitoring for event {id}"), &e, &format!("expo-console watch {id} --monitor"));
            return Err(e.into());
        }
    };

    let frame = view.frame();
    print_frame(&frame);
    if !view.is_polling() {
        println!(
            "⏸️  Monitoring only updates while an event is live (this one is {})",
            frame.event.state.label()
        );
        view.unmount();
        return Ok(());
    }

    println!(
        "👁️  Monitoring event {} (refresh every {}s, Ctrl-C to stop)",
        id,
        polling.monitoring().as_secs()
    );

    let mut updates = view.resource().subscribe();
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = updates.borrow_and_update().clone();
                print_frame(&frame);
                if !frame.is_live() {
                    println!("🏁 Event is no longer live - stopped monitoring");
                    break;
                }
            }
        }
    }

    view.unmount();
    Ok(())
}

fn print_frame(frame: &MonitoringFrame) {
    let now = Utc::now().format("%H:%M:%S");
    match &frame.snapshot {
        Some(snapshot) => println!(
            "📈 [{}] {}: {} active visitors, {} total visits, {} open incidents",
            now, frame.event.title, snapshot.active_visitors, snapshot.total_visits, snapshot.open_incidents
        ),
        None => println!("📈 [{}] {}: {}", now, frame.event.title, frame.event.state.label()),
    }
}
