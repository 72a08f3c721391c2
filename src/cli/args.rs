// src/cli/args.rs
// Command line arguments for the ares binary

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ares")]
#[command(about = "Ares Club landing page, admin login and live support chat")]
#[command(version)]
pub struct CliArgs {
    /// Backend base URL (overrides ~/.ares/config.json)
    #[arg(long, global = true, env = "ARES_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the landing page: games, promotions, payment methods and FAQ
    Page {
        /// Keep running and rotate the hero carousel
        #[arg(long)]
        watch: bool,
    },

    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the profile of the stored session
    Whoami,

    /// Open the live support chat
    Chat {
        /// Display name for anonymous messages
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Check backend health
    Health,

    /// Register a contact request and print the WhatsApp link
    Contact {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
}
