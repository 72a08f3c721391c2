// src/cli/mod.rs
// Terminal front end: subcommand dispatch over the client library

pub mod args;
pub mod display;
pub mod repl;

pub use args::{CliArgs, Command};
pub use display::TerminalDisplay;
pub use repl::ChatRepl;

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::login::LoginForm;
use crate::page::{CarouselTicker, PageShell};
use crate::realtime::RealtimeConfig;
use crate::session::{FileStorage, SessionStore};
use crate::types::{ContactRequest, Session};

/// Everything a subcommand needs, resolved from config, env and flags
struct CliContext {
    config: ClientConfig,
    api: ApiClient,
    store: SessionStore,
    display: TerminalDisplay,
}

impl CliContext {
    fn resolve(args: &CliArgs) -> Result<Self> {
        let mut config = ClientConfig::load().context("Failed to load ~/.ares/config.json")?;
        if let Some(url) = args.backend_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.backend_url = url.to_string();
        }
        debug!(backend_url = %config.backend_url, "Resolved configuration");

        let api = ApiClient::from_config(&config)
            .with_context(|| format!("Invalid backend URL {}", config.backend_url))?;
        let storage_path = config.storage_path()?;
        let store = SessionStore::new(Arc::new(FileStorage::new(storage_path)));

        Ok(Self {
            config,
            api,
            store,
            display: TerminalDisplay::new(args.no_color),
        })
    }
}

/// Run the selected subcommand
pub async fn run(args: CliArgs) -> Result<()> {
    let ctx = CliContext::resolve(&args)?;

    match args.command {
        Command::Page { watch } => page(ctx, watch).await,
        Command::Login { username, password } => login(ctx, username, password).await,
        Command::Logout => {
            let mut page = PageShell::mount(ctx.api, ctx.store);
            page.logout().context("Failed to clear session")?;
            ctx.display.print_success("Logged out");
            Ok(())
        }
        Command::Whoami => whoami(ctx).await,
        Command::Chat { name } => {
            let session = ctx.store.load();
            let realtime = RealtimeConfig::from_config(&ctx.config)?;
            let history_path = ctx.config.history_path()?;
            let repl = ChatRepl::new(ctx.api, realtime, session, name, ctx.display, history_path)?;
            repl.run().await
        }
        Command::Health => {
            let health = ctx.api.health().await.context("Backend health check failed")?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
        Command::Contact {
            name,
            phone,
            email,
            message,
        } => {
            let request = ContactRequest {
                name,
                phone,
                email,
                message,
                source: Some("cli".to_string()),
            };
            let receipt = ctx.api.contact(&request).await.context("Contact request failed")?;
            ctx.display.print_success(&receipt.message);
            if let Some(url) = receipt.whatsapp_url {
                println!("{url}");
            }
            Ok(())
        }
    }
}

async fn page(ctx: CliContext, watch: bool) -> Result<()> {
    let interval = ctx.config.carousel_interval();
    let mut page = PageShell::mount(ctx.api, ctx.store);
    ctx.display.print_header(page.session());
    ctx.display.print_loading();
    page.load().await;
    if let Some(content) = page.content() {
        ctx.display.print_page(content);
    }
    if !watch {
        return Ok(());
    }

    println!();
    ctx.display.print_slide(page.carousel());
    let mut ticker = CarouselTicker::new(interval);
    loop {
        tokio::select! {
            _ = ticker.advance(page.carousel_mut()) => ctx.display.print_slide(page.carousel()),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn login(ctx: CliContext, username: String, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            console::Term::stderr()
                .read_secure_line()
                .context("Failed to read password")?
        }
    };

    let mut form = LoginForm {
        username,
        password,
        ..LoginForm::default()
    };
    match form.submit(&ctx.api, &ctx.store).await {
        Some(session) => {
            ctx.display
                .print_success(&format!("Logged in as {}", session.user.username));
            if let Some(notice) = &form.error {
                ctx.display.print_error(notice);
            }
            ctx.display.print_header(Some(&session));
            Ok(())
        }
        None => bail!(form.error.unwrap_or_else(|| crate::login::LOGIN_FALLBACK_ERROR.to_string())),
    }
}

async fn whoami(ctx: CliContext) -> Result<()> {
    let Some(session) = ctx.store.load() else {
        ctx.display.print_info("Not logged in");
        return Ok(());
    };

    match ctx.api.me(&session.token).await {
        Ok(user) => {
            let email = user.email.clone();
            ctx.display.print_header(Some(&Session::new(user, session.token)));
            if let Some(email) = email {
                ctx.display.print_info(&email);
            }
            Ok(())
        }
        Err(e) if e.is_auth() => {
            warn!("Stored session rejected: {}", e);
            ctx.store.clear()?;
            bail!("Stored session is no longer valid; log in again")
        }
        Err(e) => Err(e).context("Failed to fetch profile"),
    }
}
