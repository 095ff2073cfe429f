//! One-shot command line operations that run without the terminal UI.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use otto_core::config::{ENV_EMAIL, ENV_PASSWORD};
use otto_core::{ApiClient, Config, SessionStatus, SessionStore};

use crate::app::Store;

fn open_session() -> Result<(Config, Store)> {
    let config = Config::load()?;
    let api = ApiClient::new(&config.base_url, Some(config.request_timeout()))?;
    let session = SessionStore::new(api, config.token_store()?);
    Ok((config, session))
}

/// Validate the saved token and print who is signed in
pub async fn status() -> Result<()> {
    let (config, session) = open_session()?;
    eprintln!("Server: {}", config.base_url);

    if session.status() == SessionStatus::Initializing {
        if let Err(e) = session.initialize().await {
            eprintln!("Saved session is no longer valid ({})", e);
        }
    }

    match session.user() {
        Some(user) => {
            println!("Signed in as {}", user.display_name());
            if let Some(clan) = user.clan() {
                println!("Clan: {}", clan);
            }
            if user.is_admin() {
                println!("Administrator");
            }
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Sign in from the terminal, prompting for anything not in the environment
pub async fn login() -> Result<()> {
    let (mut config, session) = open_session()?;

    let email = match std::env::var(ENV_EMAIL).ok().filter(|e| !e.trim().is_empty()) {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = match std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };
    if email.is_empty() || password.is_empty() {
        bail!("Email and password required");
    }

    let user = session.login(&email, &password).await?;
    println!("Signed in as {}", user.display_name());

    config.last_email = Some(email);
    config.save()?;
    Ok(())
}

fn prompt_email(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => eprint!("Email [{}]: ", last),
        None => eprint!("Email: "),
    }
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let email = line.trim();
    Ok(match (email.is_empty(), default) {
        (true, Some(last)) => last.to_string(),
        _ => email.to_string(),
    })
}

/// Forget the saved token
pub fn logout() -> Result<()> {
    let (_, session) = open_session()?;
    session.logout();
    println!("Signed out");
    Ok(())
}

/// Flip server-side route logging; needs an admin session
pub async fn toggle_route_logging() -> Result<()> {
    let (_, session) = open_session()?;
    if session.status() == SessionStatus::Initializing {
        session.initialize().await.context("Saved session is no longer valid")?;
    }
    let Some(token) = session.token().filter(|_| session.is_authenticated()) else {
        bail!("Not signed in. Run `otto --login` first.");
    };

    let status = session.api().toggle_route_logging(&token).await?;
    println!("Route logging {}", if status.is_enabled() { "enabled" } else { "disabled" });
    Ok(())
}
