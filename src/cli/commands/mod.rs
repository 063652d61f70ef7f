use anyhow::Result;
use std::future::Future;
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::api::{ApiClient, ApiError, SharedApi};
use crate::config::{config, PollingConfig};

pub mod act;
pub mod incidents;
pub mod list;
pub mod proof;
pub mod sessions;
pub mod show;
pub mod watch;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Build the API client from configuration and hand it to `f`.
pub async fn with_api<F, Fut, R>(f: F) -> Result<R>
where
    F: FnOnce(SharedApi, PollingConfig) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let settings = config()?;
    match ApiClient::new(&settings.api) {
        Ok(client) => f(Arc::new(client), settings.polling.clone()).await,
        Err(e) => {
            println!("❌ Invalid API configuration: {}", e.user_message());
            println!("   💡 Set EXPO_CONSOLE__API__BASE_URL or edit expo-console.toml");
            Err(e.into())
        }
    }
}

/// Print a failed initial load with a retry hint.
pub fn report_load_error(what: &str, error: &ApiError, retry: &str) {
    println!("❌ Failed to load {}: {}", what, error.user_message());
    if error.is_not_found() {
        println!("   💡 Check the id and try again");
    } else {
        println!("   💡 Retry with: {}", retry);
    }
}

/// Ask a yes/no question on stdin. Anything but y/yes is a no.
pub fn prompt_confirmation(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub async fn show_how_to_use() -> Result<()> {
    println!("🎪 Expo Console - Exhibition Event Operations");
    println!();
    println!("To get started:");
    println!("  📋 expo-console list                    # Browse events");
    println!("  🔎 expo-console show <event>            # Event details and actions");
    println!("  👁️  expo-console watch <event>           # Follow an event live");
    println!();
    println!("Admin commands:");
    println!("  ✅ expo-console act <event> approve     # Run a lifecycle action");
    println!("  🎤 expo-console sessions <event>        # Manage live sessions");
    println!("  🚨 expo-console incidents <event>       # Track incidents");
    println!();
    println!("Organizer commands:");
    println!("  🧾 expo-console --role organizer submit-proof <event> <file>");
    println!();
    println!("💡 Start with 'expo-console list --state pending_approval' to review new events!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
        assert!(!is_yes("yep"));
    }
}
