//! Intranet portal CLI - log in, inspect the session, and check route access.
//!
//! Drives the same session store, API pipeline and navigation guard a
//! graphical shell would, and prints where each navigation lands.

use std::io::{self, Write};

use anyhow::{bail, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portal_core::auth::AuthError;
use portal_core::router::NavigationResult;
use portal_core::{Config, Portal};

/// Username override
const USERNAME_ENV: &str = "PORTAL_USERNAME";

/// Password override, for scripted logins
const PASSWORD_ENV: &str = "PORTAL_PASSWORD";

const USAGE: &str = "\
Usage: portal <command>

Commands:
  login [username]   Log in and store the session token
  logout             End the session and forget the token
  whoami             Show the signed-in user
  open <path>        Navigate to a view and show where it lands
  routes             List views and their access policy";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    debug!(api_base_url = %config.api_base_url, "Config loaded");

    let portal = Portal::new(&config)?;

    match command.as_str() {
        "login" => login(&portal, &mut config, args.get(1).cloned()).await,
        "logout" => {
            portal.logout();
            println!("Logged out.");
            Ok(())
        }
        "whoami" => whoami(&portal).await,
        "open" => {
            let Some(path) = args.get(1) else {
                bail!("open requires a path, e.g. `portal open /tasks`");
            };
            open(&portal, path).await
        }
        "routes" => {
            routes(&portal);
            Ok(())
        }
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            bail!("unknown command")
        }
    }
}

async fn login(portal: &Portal, config: &mut Config, username: Option<String>) -> Result<()> {
    let username = match username
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .filter(|u| !u.is_empty())
    {
        Some(u) => u,
        None => prompt_username(config.last_username.as_deref())?,
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => p,
        _ => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    match portal.login(&username, &password).await {
        Ok(user) => {
            config.last_username = Some(username);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            info!("Login successful");
            println!("Logged in as {}.", user.display_name());
            Ok(())
        }
        Err(e) => {
            let detail = match &e {
                AuthError::InvalidCredentials => "invalid username or password".to_string(),
                other => other.to_string(),
            };
            eprintln!("{}: {}", portal.session.error(), detail);
            Err(e.into())
        }
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Username required"),
        (false, _) => Ok(input.to_string()),
    }
}

async fn whoami(portal: &Portal) -> Result<()> {
    if !portal.session.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    match portal.session.fetch_identity().await {
        Ok(user) => {
            println!("{} <{}>", user.display_name(), user.email);
            println!("  username: {}", user.username);
            println!("  role:     {}", if user.is_admin() { "admin" } else { "staff" });
            Ok(())
        }
        Err(e) if e.is_unauthorized() => {
            println!("Session expired. Run `portal login` again.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn open(portal: &Portal, path: &str) -> Result<()> {
    match portal.open(path).await {
        NavigationResult::Arrived { location, redirected } => {
            if redirected {
                println!("{} -> redirected to {}", path, location);
            } else {
                println!("{} -> allowed", location);
            }
            Ok(())
        }
        NavigationResult::NotFound(p) => bail!("No view at {}", p),
        NavigationResult::Superseded => bail!("Navigation to {} was superseded", path),
        NavigationResult::RedirectLoop(p) => bail!("Redirect loop while opening {}", p),
    }
}

fn routes(portal: &Portal) {
    for route in portal.router.routes().iter() {
        let access = match (route.meta.requires_auth, route.meta.admin_only) {
            (_, true) => "admin",
            (true, false) => "login",
            (false, false) => "public",
        };
        println!("{:<22} {:<18} {}", route.pattern, route.view, access);
    }
}
