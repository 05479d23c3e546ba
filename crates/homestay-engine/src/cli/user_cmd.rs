//! User subcommands: add, list, suspend, activate.

use std::io::Write;

use homestay_core::UserId;
use homestay_core::domain::Role;

use crate::storage::NewUser;

use super::{Context, clip};

/// User subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum UserAction {
    /// Register an account.
    Add {
        username: String,
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, default_value = "")]
        title: String,
        /// Customer, Moderator or Administrator.
        #[arg(long, default_value = "Customer")]
        role: Role,
    },
    /// List accounts.
    List,
    /// Suspend an account (administrators only).
    Suspend { user_id: UserId },
    /// Reactivate a suspended account (administrators only).
    Activate { user_id: UserId },
}

/// Execute a user subcommand.
pub async fn run(action: UserAction, ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        UserAction::Add {
            username,
            email,
            first_name,
            last_name,
            title,
            role,
        } => {
            let user = NewUser {
                username,
                email,
                first_name,
                last_name,
                title,
                role,
            };
            add(ctx, &user, out).await
        }
        UserAction::List => list(ctx, out).await,
        UserAction::Suspend { user_id } => {
            let user = ctx.engine.users.suspend_user(ctx.actor()?, user_id).await?;
            writeln!(out, "Suspended user {} ({})", user.id, user.username)?;
            Ok(())
        }
        UserAction::Activate { user_id } => {
            let user = ctx.engine.users.activate_user(ctx.actor()?, user_id).await?;
            writeln!(out, "Reactivated user {} ({})", user.id, user.username)?;
            Ok(())
        }
    }
}

async fn add(ctx: &Context, user: &NewUser, out: &mut impl Write) -> anyhow::Result<()> {
    // Staff accounts need an administrator, except the very first account.
    if user.role != Role::Customer {
        let bootstrap = ctx.engine.users.list().await?.is_empty();
        let by_admin = ctx.actor.is_some_and(|a| a.is_administrator());
        if !bootstrap && !by_admin {
            anyhow::bail!("Only an administrator may register {} accounts", user.role);
        }
    }

    let created = ctx.engine.users.create_user(user).await?;
    writeln!(out, "Registered user {} ({}) as {}", created.id, created.username, created.role)?;
    Ok(())
}

async fn list(ctx: &Context, out: &mut impl Write) -> anyhow::Result<()> {
    let users = ctx.engine.users.list().await?;
    if users.is_empty() {
        writeln!(out, "No users registered")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<5} {:<16} {:<28} {:<14} {:<9}",
        "ID", "USERNAME", "EMAIL", "ROLE", "ACCOUNT"
    )?;
    for u in &users {
        writeln!(
            out,
            "{:<5} {:<16} {:<28} {:<14} {:<9}",
            u.id,
            clip(&u.username, 16),
            clip(&u.email, 28),
            u.role,
            u.activation
        )?;
    }
    Ok(())
}
