use anyhow::Result;

use super::{report_load_error, with_api, Command};
use crate::api::{EntityId, Event};
use crate::countdown::CountdownDisplay;
use crate::lifecycle::{EventAction, Role};
use crate::views::EventDetailView;

pub struct ShowCommand {
    pub event_id: String,
    pub role: Role,
}

impl ShowCommand {
    pub fn new(event_id: String) -> Self {
        Self {
            event_id,
            role: Role::Admin,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Command for ShowCommand {
    async fn execute(&self) -> Result<()> {
        let id = EntityId::new(self.event_id.clone());
        let role = self.role;

        with_api(|api, polling| async move {
            let mut view = match EventDetailView::mount(api, id.clone(), role, &polling).await {
                Ok(view) => view,
                Err(e) => {
                    report_load_error(&format!("event {id}"), &e, &format!("expo-console show {id}"));
                    return Err(e.into());
                }
            };

            print_event(&view.event(), view.countdown().as_ref());
            print_actions(&view.event(), &view.available_actions());
            view.unmount();
            Ok(())
        })
        .await
    }
}

pub(crate) fn print_event(event: &Event, countdown: Option<&CountdownDisplay>) {
    println!("📋 Event {}: {}", event.id, event.title);
    println!("   🏷️  State: {} ({})", event.state.label(), event.state);

    if let Some(start) = event.start_date {
        println!("   🗓️  Starts: {}", start.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(end) = event.end_date {
        println!("   🏁 Ends:   {}", end.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(amount) = event.payment_amount {
        println!("   💳 Payment due: {:.2}", amount);
    }
    if let Some(url) = &event.payment_proof_url {
        println!("   🧾 Payment proof: {}", url);
    }

    match countdown {
        Some(CountdownDisplay::PastDue) if event.state.is_live() => println!("   ⏳ Past due - waiting for auto-close"),
        Some(CountdownDisplay::PastDue) => println!("   ⏳ Past due - waiting for auto-start"),
        Some(CountdownDisplay::Remaining(text)) if event.state.is_live() => println!("   ⏳ Ends in {}", text),
        Some(CountdownDisplay::Remaining(text)) => println!("   ⏳ Starts in {}", text),
        None => {}
    }
}

pub(crate) fn print_actions(event: &Event, actions: &[EventAction]) {
    if actions.is_empty() {
        if !event.state.is_known() {
            println!("   ❓ Unrecognised state '{}' - no actions offered", event.state);
        } else {
            println!("   🎛️  No actions available");
        }
        return;
    }

    let names: Vec<String> = actions
        .iter()
        .map(|a| {
            if a.requires_confirmation() {
                format!("{} (confirm)", a)
            } else {
                a.to_string()
            }
        })
        .collect();
    println!("   🎛️  Actions: {}", names.join(", "));
    println!("   💡 Run 'expo-console act {} <action>'", event.id);
}
