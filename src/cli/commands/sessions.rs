use anyhow::Result;

use super::{report_load_error, with_api, Command};
use crate::api::{EntityId, Session};
use crate::lifecycle::{Role, SessionAction};
use crate::views::SessionsView;

pub struct SessionsCommand {
    pub event_id: String,
    pub action: Option<(SessionAction, String)>,
    pub role: Role,
}

impl SessionsCommand {
    pub fn new(event_id: String) -> Self {
        Self {
            event_id,
            action: None,
            role: Role::Admin,
        }
    }

    pub fn with_start(mut self, session_id: Option<String>) -> Self {
        if let Some(id) = session_id {
            self.action = Some((SessionAction::Start, id));
        }
        self
    }

    pub fn with_end(mut self, session_id: Option<String>) -> Self {
        if let Some(id) = session_id {
            self.action = Some((SessionAction::End, id));
        }
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Command for SessionsCommand {
    async fn execute(&self) -> Result<()> {
        if self.action.is_some() && self.role != Role::Admin {
            println!("🚫 Only admins can start or end sessions");
            return Err(anyhow::anyhow!("session control requires the admin role"));
        }

        let event_id = EntityId::new(self.event_id.clone());
        let action = self.action.clone();

        with_api(|api, polling| async move {
            let mut view = match SessionsView::mount(api, event_id.clone(), &polling).await {
                Ok(view) => view,
                Err(e) => {
                    report_load_error(
                        &format!("sessions for event {event_id}"),
                        &e,
                        &format!("expo-console sessions {event_id}"),
                    );
                    return Err(e.into());
                }
            };

            if let Some((action, session_id)) = action {
                let session_id = EntityId::new(session_id);
                print!("🔄 {} session {}... ", action, session_id);
                std::io::Write::flush(&mut std::io::stdout())?;

                let outcome = match action {
                    SessionAction::Start => view.start(&session_id).await,
                    SessionAction::End => view.end(&session_id).await,
                };
                match outcome {
                    Ok(session) => println!("✅ now {}", session.status),
                    Err(e) => {
                        println!("❌");
                        println!("   {}", e.user_message());
                        view.unmount();
                        return Err(e.into());
                    }
                }
                println!();
            }

            print_sessions(&view.sessions(), &view);
            view.unmount();
            Ok(())
        })
        .await
    }
}

fn print_sessions(sessions: &[Session], view: &SessionsView) {
    if sessions.is_empty() {
        println!("🎤 No sessions scheduled for event {}", view.event_id());
        return;
    }

    println!("🎤 Sessions for event {}", view.event_id());
    for session in sessions {
        let when = session
            .start_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unscheduled".to_string());
        let actions: Vec<&str> = view.actions_for(&session.id).iter().map(|a| a.as_str()).collect();
        println!(
            "  #{:<8} {:<10} {:<17} {} [{}]",
            session.id,
            session.status.as_str(),
            when,
            session.title,
            if actions.is_empty() { "-".to_string() } else { actions.join(", ") }
        );
    }
}
