use anyhow::{anyhow, Result};

use super::{prompt_confirmation, report_load_error, with_api, Command};
use crate::api::EntityId;
use crate::lifecycle::{EventAction, Role};
use crate::sync::{ActionRequest, InvokeError};
use crate::views::EventDetailView;

pub struct ActCommand {
    pub event_id: String,
    pub action: String,
    pub reason: Option<String>,
    pub yes: bool,
    pub role: Role,
}

impl ActCommand {
    pub fn new(event_id: String, action: String) -> Self {
        Self {
            event_id,
            action,
            reason: None,
            yes: false,
            role: Role::Admin,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_auto_confirm(mut self, yes: bool) -> Self {
        self.yes = yes;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    fn build_request(&self, action: EventAction) -> ActionRequest {
        let mut request = ActionRequest::new(action);
        if let Some(reason) = &self.reason {
            request = request.with_reason(reason.clone());
        }
        request
    }
}

impl Command for ActCommand {
    async fn execute(&self) -> Result<()> {
        let action: EventAction = self.action.parse().map_err(|e: String| {
            println!("❌ {}", e);
            anyhow!(e)
        })?;
        if self.reason.is_some() && action != EventAction::Reject {
            println!("⚠️  --reason is only sent with 'reject'; ignoring it");
        }

        let id = EntityId::new(self.event_id.clone());
        let mut request = self.build_request(action);
        let role = self.role;
        let yes = self.yes;

        with_api(|api, polling| async move {
            let mut view = match EventDetailView::mount(api, id.clone(), role, &polling).await {
                Ok(view) => view,
                Err(e) => {
                    report_load_error(&format!("event {id}"), &e, &format!("expo-console act {id} {action}"));
                    return Err(e.into());
                }
            };
            let event = view.event();

            if !view.available_actions().contains(&action) {
                println!(
                    "🚫 '{}' is not available for event {} while it is {}",
                    action,
                    id,
                    event.state.label()
                );
                view.unmount();
                return Err(InvokeError::not_available(action, &event.state).into());
            }

            if action.requires_confirmation() {
                let confirmed = yes
                    || prompt_confirmation(&format!(
                        "⚠️  {} for event {} ({})?",
                        action.label(),
                        id,
                        event.title
                    ))?;
                if !confirmed {
                    println!("🚫 Cancelled - nothing was sent");
                    view.unmount();
                    return Ok(());
                }
                request = request.confirmed();
            }

            print!("🔄 {}... ", action.label());
            std::io::Write::flush(&mut std::io::stdout())?;

            let outcome = view.invoke(request).await;
            view.unmount();

            match outcome {
                Ok(updated) => {
                    println!("✅");
                    println!("   📋 Event {} is now {}", updated.id, updated.state.label());
                    Ok(())
                }
                Err(e) => {
                    println!("❌");
                    println!("   {}", e.user_message());
                    if matches!(e, InvokeError::Api(_)) {
                        println!("   💡 The event was left unchanged; refresh with: expo-console show {}", id);
                    }
                    Err(e.into())
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_is_attached_to_request() {
        let command = ActCommand::new("7".to_string(), "reject".to_string())
            .with_reason(Some("Missing venue details".to_string()));
        let request = command.build_request(EventAction::Reject);
        assert_eq!(request.reason.as_deref(), Some("Missing venue details"));
        assert!(!request.is_confirmed());
    }
}
