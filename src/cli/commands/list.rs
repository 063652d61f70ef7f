use anyhow::Result;

use super::{report_load_error, with_api, Command};
use crate::lifecycle::{EventState, Role};
use crate::views::EventsListView;

pub struct ListCommand {
    pub state: Option<String>,
    pub role: Role,
}

impl ListCommand {
    pub fn new() -> Self {
        Self {
            state: None,
            role: Role::Admin,
        }
    }

    pub fn with_state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Default for ListCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for ListCommand {
    async fn execute(&self) -> Result<()> {
        let filter = self.state.as_deref().map(EventState::parse);
        if let Some(EventState::Unknown(raw)) = &filter {
            println!("⚠️  '{}' is not a known event state; the server may return nothing", raw);
        }
        let role = self.role;

        with_api(|api, polling| async move {
            let mut view = match EventsListView::mount(api, filter.clone(), role, &polling).await {
                Ok(view) => view,
                Err(e) => {
                    report_load_error("events", &e, "expo-console list");
                    return Err(e.into());
                }
            };

            let events = view.events();
            if events.is_empty() {
                match &filter {
                    Some(state) => println!("📋 No events in state {}", state),
                    None => println!("📋 No events found"),
                }
                view.unmount();
                return Ok(());
            }

            println!("📋 {} event(s)", events.len());
            println!();
            for event in &events {
                let actions = view.actions_for_row(&event.id);
                let actions = if actions.is_empty() {
                    "-".to_string()
                } else {
                    actions.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
                };
                println!("  #{:<8} {:<24} {:<32} [{}]", event.id, event.state.as_str(), event.title, actions);
            }

            view.unmount();
            Ok(())
        })
        .await
    }
}
