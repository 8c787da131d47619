//! `storefront` command-line client.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use storefront_auth::{PasswordChangeForm, Verification};
use storefront_client::{AppState, ClientConfig, Navigation, ProtectedView};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront panel identity client")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and start a session
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Start a session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session
    Logout,
    /// Revalidate the cached session with the backend
    Verify,
    /// Show the cached profile (no network)
    Whoami,
    /// Change the account password
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Mount a protected view and report where it leads
    Open {
        /// Route or name, e.g. `/admin/users` or `profile`
        view: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = ClientConfig::resolve(args.config.as_deref()).context("invalid configuration")?;
    storefront_observability::init_with(config.logging.format);
    tracing::debug!(auth_url = %config.auth_url, api_url = %config.api_url, "configuration loaded");

    let state = AppState::from_config(&config)?;

    match args.command {
        Command::Register {
            email,
            password,
            full_name,
            phone,
        } => {
            match state
                .identity
                .register(&email, &password, full_name.as_deref(), phone.as_deref())
                .await
            {
                Ok(session) => println!("registered as {}", session.user.display_name()),
                Err(err) => return fail(err.kind(), err.message()),
            }
        }
        Command::Login { email, password } => match state.identity.login(&email, &password).await {
            Ok(session) => println!(
                "logged in as {} ({})",
                session.user.display_name(),
                session.user.role
            ),
            Err(err) => return fail(err.kind(), err.message()),
        },
        Command::Logout => {
            state.identity.logout().await;
            println!("logged out");
        }
        Command::Verify => match state.identity.verify().await {
            Verification::Valid(user) => {
                println!("valid: {} ({})", user.email, user.role)
            }
            Verification::Invalid(reason) => {
                println!("invalid: {}", reason.as_str());
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Whoami => match state.identity.cached_user() {
            Some(user) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&user).context("failed to render profile")?
                );
                if let Some(saved_at) = state.store.saved_at() {
                    println!("session saved at {}", saved_at.to_rfc3339());
                }
            }
            None => {
                println!("not logged in");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::ChangePassword { old, new, confirm } => {
            let change = match PasswordChangeForm::new(&old, &new, &confirm).validate() {
                Ok(change) => change,
                Err(err) => return fail("validation_error", &err.to_string()),
            };
            match state.identity.submit_credential_change(change).await {
                Ok(()) => println!("password changed"),
                Err(err) => return fail(err.kind(), err.message()),
            }
        }
        Command::Open { view } => {
            let view: ProtectedView = view.parse()?;
            let mut controller = state.controller(view);

            match controller.mount().await {
                Navigation::Render => {
                    println!("render {view}");
                    match controller.load(&state.api).await {
                        Ok(Some(data)) => println!(
                            "{}",
                            serde_json::to_string_pretty(&data).context("failed to render data")?
                        ),
                        Ok(None) => {}
                        Err(err) => {
                            eprintln!("error: {err}");
                            if let Navigation::Redirect(route) = controller.navigation() {
                                println!("redirect {route}");
                            }
                            return Ok(ExitCode::FAILURE);
                        }
                    }
                }
                Navigation::Redirect(route) => {
                    println!("redirect {route}");
                    return Ok(ExitCode::FAILURE);
                }
                Navigation::Wait => {
                    println!("pending");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    if state.offline.is_offline() {
        eprintln!("warning: backend unreachable");
    }
    Ok(ExitCode::SUCCESS)
}

fn fail(kind: &str, message: &str) -> anyhow::Result<ExitCode> {
    tracing::debug!(kind, "command failed");
    eprintln!("error: {message}");
    Ok(ExitCode::FAILURE)
}
