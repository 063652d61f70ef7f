use anyhow::Result;
use std::path::PathBuf;

use super::{report_load_error, with_api, Command};
use crate::api::{EntityId, ProofFile};
use crate::lifecycle::{EventState, Role};
use crate::views::{OrganizerView, ProofError};

pub struct ProofCommand {
    pub event_id: String,
    pub file: PathBuf,
    pub role: Role,
}

impl ProofCommand {
    pub fn new(event_id: String, file: PathBuf) -> Self {
        Self {
            event_id,
            file,
            role: Role::Organizer,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Command for ProofCommand {
    async fn execute(&self) -> Result<()> {
        if self.role != Role::Organizer {
            println!("🚫 Payment proofs are uploaded by organizers (use --role organizer)");
            return Err(anyhow::anyhow!("payment proof upload requires the organizer role"));
        }

        let proof = match ProofFile::from_path(&self.file).await {
            Ok(proof) => proof,
            Err(e) => {
                println!("❌ Cannot read {}: {}", self.file.display(), e);
                return Err(e.into());
            }
        };
        let id = EntityId::new(self.event_id.clone());

        with_api(|api, polling| async move {
            let mut view = match OrganizerView::mount(api, id.clone(), &polling).await {
                Ok(view) => view,
                Err(e) => {
                    report_load_error(&format!("event {id}"), &e, &format!("expo-console submit-proof {id} <file>"));
                    return Err(e.into());
                }
            };

            let file_name = proof.file_name.clone();
            let size = proof.bytes.len();
            view.select_file(proof);

            if !view.can_submit() {
                let state = view.event().state;
                println!(
                    "🚫 Event {} is {} - payment proof is only accepted while {}",
                    id,
                    state.label(),
                    EventState::WaitingForPayment.label().to_lowercase()
                );
                view.unmount();
                return Err(ProofError::NotAccepting(state).into());
            }

            print!("🔄 Uploading {} ({} bytes)... ", file_name, size);
            std::io::Write::flush(&mut std::io::stdout())?;

            let outcome = view.submit_proof().await;
            view.unmount();

            match outcome {
                Ok(updated) => {
                    println!("✅");
                    println!("   📋 Event {} is now {}", updated.id, updated.state.label());
                    println!("   💡 An admin will confirm the payment");
                    Ok(())
                }
                Err(e) => {
                    println!("❌");
                    println!("   {}", e.user_message());
                    Err(e.into())
                }
            }
        })
        .await
    }
}
