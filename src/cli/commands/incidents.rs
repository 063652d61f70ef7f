use anyhow::Result;

use super::{report_load_error, with_api, Command};
use crate::api::EntityId;
use crate::lifecycle::Role;
use crate::views::IncidentsView;

pub struct IncidentsCommand {
    pub event_id: String,
    pub advance: Option<String>,
    pub role: Role,
}

impl IncidentsCommand {
    pub fn new(event_id: String) -> Self {
        Self {
            event_id,
            advance: None,
            role: Role::Admin,
        }
    }

    pub fn with_advance(mut self, incident_id: Option<String>) -> Self {
        self.advance = incident_id;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Command for IncidentsCommand {
    async fn execute(&self) -> Result<()> {
        if self.advance.is_some() && self.role != Role::Admin {
            println!("🚫 Only admins can change incident status");
            return Err(anyhow::anyhow!("incident updates require the admin role"));
        }

        let event_id = EntityId::new(self.event_id.clone());
        let advance = self.advance.clone().map(EntityId::from);

        with_api(|api, polling| async move {
            let mut view = match IncidentsView::mount(api, event_id.clone(), &polling).await {
                Ok(view) => view,
                Err(e) => {
                    report_load_error(
                        &format!("incidents for event {event_id}"),
                        &e,
                        &format!("expo-console incidents {event_id}"),
                    );
                    return Err(e.into());
                }
            };

            if let Some(incident_id) = advance {
                print!("🔄 Advancing incident {}... ", incident_id);
                std::io::Write::flush(&mut std::io::stdout())?;

                match view.advance(&incident_id).await {
                    Ok(incident) => {
                        println!("✅ now {}", incident.status);
                        let history: Vec<String> = view.history(&incident_id).iter().map(|s| s.to_string()).collect();
                        if history.len() > 1 {
                            println!("   📜 Seen: {}", history.join(" -> "));
                        }
                    }
                    Err(e) => {
                        println!("❌");
                        println!("   {}", e.user_message());
                        view.unmount();
                        return Err(e.into());
                    }
                }
                println!();
            }

            let incidents = view.incidents();
            if incidents.is_empty() {
                println!("✅ No incidents reported for event {}", event_id);
            } else {
                println!("🚨 Incidents for event {}", event_id);
                for incident in &incidents {
                    let next = view
                        .next_status(&incident.id)
                        .map(|s| format!("next: {}", s))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  #{:<8} {:<9} {:<14} {} [{}]",
                        incident.id,
                        incident.severity.as_str(),
                        incident.status.as_str(),
                        incident.title,
                        next
                    );
                }
            }

            view.unmount();
            Ok(())
        })
        .await
    }
}
