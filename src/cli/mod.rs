use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::lifecycle::Role;

pub mod commands;

#[derive(Parser)]
#[command(name = "expo-console")]
#[command(about = "Operator console for the virtual exhibition platform")]
#[command(long_about = "Expo Console follows exhibition events through review, payment and their live run. \
                       It keeps event pages fresh by polling the platform API and only offers the actions \
                       an event's current state allows. Get started with 'expo-console list'.")]
pub struct Cli {
    /// Role to act as; decides which actions are offered
    #[arg(long, global = true, default_value = "admin", help = "Role to act as: admin, organizer, visitor, enterprise")]
    pub role: Role,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show one event with its countdown and available actions
    Show {
        /// Event identifier
        event_id: String,
    },
    /// List events, optionally filtered by lifecycle state
    List {
        /// Only show events in this state
        #[arg(long, help = "Filter by state, e.g. pending_approval or live")]
        state: Option<String>,
    },
    /// Keep an event page open and print every change until Ctrl-C
    Watch {
        /// Event identifier
        event_id: String,
        /// Show live visitor counters instead of the event page
        #[arg(long, help = "Watch the monitoring dashboard (only updates while the event is live)")]
        monitor: bool,
    },
    /// Run an admin action on an event: approve, reject, confirm_payment, force_start, force_close
    Act {
        /// Event identifier
        event_id: String,
        /// Action to run
        action: String,
        /// Reason sent along with a rejection
        #[arg(long, help = "Reason shown to the organizer when rejecting")]
        reason: Option<String>,
        /// Skip the confirmation prompt for payment, start and close actions
        #[arg(short = 'y', long, help = "Skip interactive confirmation")]
        yes: bool,
    },
    /// Upload a payment proof for an event waiting for payment (organizer)
    SubmitProof {
        /// Event identifier
        event_id: String,
        /// Receipt or transfer confirmation to upload
        file: PathBuf,
    },
    /// List an event's sessions, or start/end one
    Sessions {
        /// Event identifier
        event_id: String,
        /// Start this session
        #[arg(long, conflicts_with = "end", help = "Session id to start")]
        start: Option<String>,
        /// End this session
        #[arg(long, help = "Session id to end")]
        end: Option<String>,
    },
    /// List an event's incidents, or move one to its next status
    Incidents {
        /// Event identifier
        event_id: String,
        /// Advance this incident one step
        #[arg(long, help = "Incident id to advance (open -> investigating -> mitigating -> resolved)")]
        advance: Option<String>,
    },
}
