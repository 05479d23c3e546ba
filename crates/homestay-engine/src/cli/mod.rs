//! Command-line surface over the workflow engine.
//!
//! User-facing output uses writeln! to the supplied writer (stdout in the
//! binary); logs go to stderr.

pub mod audit_cmd;
pub mod property_cmd;
pub mod report_cmd;
pub mod reservation_cmd;
pub mod user_cmd;

use std::io::Write;

use homestay_core::{Actor, UserId};

use crate::notifications::DispatchWarning;
use crate::workflow::Engine;

/// Engine plus the identity the command runs as.
#[derive(Debug, Clone)]
pub struct Context {
    pub engine: Engine,
    pub actor: Option<Actor>,
}

impl Context {
    /// Resolve `as_user` to an actor; `None` runs as the public. Suspended
    /// accounts are refused.
    pub async fn new(engine: Engine, as_user: Option<UserId>) -> anyhow::Result<Self> {
        let actor = match as_user {
            Some(id) => {
                let user = engine
                    .users
                    .get(id)
                    .await
                    .map_err(|e| anyhow::anyhow!("Cannot act as user {id}: {e}"))?;
                if !user.is_active() {
                    anyhow::bail!("Cannot act as user {id}: account is suspended");
                }
                Some(Actor::new(user.id, user.role))
            }
            None => None,
        };
        Ok(Self { engine, actor })
    }

    /// The acting user, for commands that need one.
    pub fn actor(&self) -> anyhow::Result<&Actor> {
        self.actor
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("This command needs --as <user-id>"))
    }
}

pub(crate) fn print_warnings(out: &mut impl Write, warnings: &[DispatchWarning]) -> anyhow::Result<()> {
    for warning in warnings {
        writeln!(out, "warning: {warning}")?;
    }
    Ok(())
}

/// Truncate `text` to `width` characters for table output.
pub(crate) fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
        clipped.push('~');
        clipped
    }
}
