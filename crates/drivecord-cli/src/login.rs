//! Getting credentials for this run.
//!
//! A configured user id and token are validated first. If there are none, or
//! the server rejects them, the user signs in with their password and the
//! issued token is kept in memory only.

use anyhow::{Context, Result, bail};
use dialoguer::{Input, Password};
use drivecord_client::{AccessClient, AccessError, Credentials};
use drivecord_kernel::Output;
use tracing::{info, warn};

use crate::config::Settings;
use crate::render;

/// Shortest password the server accepts.
const MIN_PASSWORD_LEN: usize = 3;

const PASSWORD_ATTEMPTS: usize = 3;

/// Credentials for the session: validated configured ones, or a fresh login.
pub fn credentials(access: &AccessClient, settings: &Settings) -> Result<Credentials> {
    if let (Some(user_id), Some(token)) = (settings.user_id, settings.token.clone()) {
        let credentials = Credentials { user_id, token };
        match access.validate_token(&credentials) {
            Ok(()) => {
                info!(user_id, "configured access token accepted");
                println!(
                    "{}",
                    render::output(&Output::success("Logged in using the configured access token"))
                );
                return Ok(credentials);
            }
            Err(err @ (AccessError::InvalidToken | AccessError::UnknownAccount(_))) => {
                warn!(user_id, error = %err, "configured credentials rejected");
                println!("{}", render::output(&Output::error(format!("Configured {err}."))));
            }
            Err(err) => return Err(err).context("failed to validate the configured access token"),
        }
    }
    sign_in(access, settings.user_id)
}

/// Ask for the account (unless already known) and password, then fetch a token.
fn sign_in(access: &AccessClient, known_user: Option<u64>) -> Result<Credentials> {
    println!("{}", render::output(&Output::info("Login to DriveCord.")));

    let user_id = match known_user {
        Some(user_id) => {
            access
                .validate_uid(user_id)
                .with_context(|| format!("cannot log in as {user_id}"))?;
            user_id
        }
        None => Input::<u64>::new()
            .with_prompt("Discord user ID")
            .validate_with(|user_id: &u64| -> Result<(), String> {
                access.validate_uid(*user_id).map_err(|err| match err {
                    AccessError::UnknownAccount(_) => format!(
                        "{err}. Create an account with the Discord bot first."
                    ),
                    other => other.to_string(),
                })
            })
            .interact_text()
            .context("failed to read the user id")?,
    };

    let password = ask_password(access, user_id)?;
    let credentials = access
        .get_token(user_id, &password)
        .context("login failed")?;
    info!(user_id, "fetched access token");
    println!("{}", render::output(&Output::success("Fetched access token.")));
    Ok(credentials)
}

fn ask_password(access: &AccessClient, user_id: u64) -> Result<String> {
    for _ in 0..PASSWORD_ATTEMPTS {
        let password = Password::new()
            .with_prompt("DriveCord password")
            .interact()
            .context("failed to read the password")?;
        if let Err(message) = check_password(&password) {
            println!("{}", render::output(&Output::error(message)));
            continue;
        }
        match access.login(user_id, &password) {
            Ok(()) => return Ok(password),
            Err(AccessError::InvalidPassword) => {
                println!("{}", render::output(&Output::error("Invalid password.")));
            }
            Err(err) => return Err(err).context("login failed"),
        }
    }
    bail!("login failed after {PASSWORD_ATTEMPTS} attempts")
}

fn check_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        ))
    } else {
        Ok(())
    }
}
