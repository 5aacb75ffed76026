//! Account and session commands.
//!
//! # Usage
//!
//! ```bash
//! rt-cli auth register -n "Ana Soto" -e ana@redthread.cl -p 'Secreta1!'
//! rt-cli auth login -e ana@redthread.cl -p 'Secreta1!'
//! rt-cli auth whoami
//! rt-cli auth logout
//! ```

use clap::Subcommand;
use redthread_client::AppState;

use super::CommandError;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account and log into it
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Log in; guest cart lines are moved to the server cart
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the logged-in profile
    Whoami,
    /// Change name and email
    Update {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
    },
    /// Change the password of the logged-in user
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Reset a forgotten password
    Reset {
        /// Email or username
        #[arg(short, long)]
        identifier: String,
        #[arg(short, long)]
        password: String,
    },
}

pub async fn run(app: &AppState, action: AuthAction) -> Result<(), CommandError> {
    match action {
        AuthAction::Register {
            name,
            email,
            password,
        } => {
            let session = app.register(&name, &email, &password).await?;
            println!("Welcome, {} ({})", session.name, session.role);
        }
        AuthAction::Login { email, password } => {
            let session = app.login(&email, &password).await?;
            println!("Logged in as {} ({})", session.email, session.role);
        }
        AuthAction::Logout => {
            app.logout().await?;
            println!("Logged out");
        }
        AuthAction::Whoami => {
            let profile = app.auth().me().await?;
            println!("#{} {} <{}>", profile.id, profile.full_name, profile.email);
            println!("Roles: {}", profile.roles.join(", "));
        }
        AuthAction::Update { name, email } => {
            let session = app.auth().update_me(&name, &email).await?;
            println!("Profile updated: {} <{}>", session.name, session.email);
        }
        AuthAction::Password { current, new } => {
            app.auth().change_password(&current, &new).await?;
            println!("Password changed");
        }
        AuthAction::Reset {
            identifier,
            password,
        } => {
            if app.auth().reset_password(&identifier, &password).await {
                println!("Password reset");
            } else {
                return Err(CommandError::Input(
                    "Could not reset the password.".to_string(),
                ));
            }
        }
    }
    Ok(())
}
