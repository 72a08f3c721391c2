// src/cli/display.rs
// Terminal rendering for the page, chat messages and status lines

use console::style;

use crate::chat::SendRoute;
use crate::page::{Carousel, HERO_SLIDES, PageContent, WHATSAPP_URL};
use crate::types::{ChatMessage, ConnectionState, Session};

/// Styled stdout output. Logging goes to stderr separately.
#[derive(Debug, Clone, Copy)]
pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn new(no_color: bool) -> Self {
        if no_color {
            console::set_colors_enabled(false);
        }
        Self
    }

    pub fn print_header(&self, session: Option<&Session>) {
        println!("{}", style("ARES CLUB").red().bold());
        match session {
            Some(session) if session.is_admin() => {
                println!("{} {}", style("admin").green().bold(), session.user.username)
            }
            Some(session) => println!("{} {}", style("user").green(), session.user.username),
            None => println!("{}", style("not logged in").dim()),
        }
        println!();
    }

    pub fn print_loading(&self) {
        println!("{}", style("Cargando Ares Club...").dim());
    }

    pub fn print_page(&self, content: &PageContent) {
        self.print_section("Juegos", content.games.len());
        for game in &content.games {
            println!("  {} {}", style(&game.name).bold(), style(&game.provider).dim());
        }

        self.print_section("Bonos", content.promotions.len());
        for promo in &content.promotions {
            println!("  {}  {}", style(&promo.title).yellow().bold(), promo.description);
        }

        self.print_section("Medios de pago", content.payment_methods.len());
        let methods: Vec<&str> = content.payment_methods.iter().map(|m| m.name.as_str()).collect();
        if !methods.is_empty() {
            println!("  {}", methods.join(", "));
        }

        self.print_section("Preguntas frecuentes", content.faq.len());
        for item in &content.faq {
            println!("  {}", style(&item.question).cyan());
            println!("    {}", item.answer);
        }

        println!();
        println!("{} {}", style("WhatsApp:").green(), WHATSAPP_URL);
    }

    fn print_section(&self, title: &str, count: usize) {
        println!();
        println!("{} {}", style(title).cyan().bold(), style(format!("({count})")).dim());
        if count == 0 {
            println!("  {}", style("nothing to show").dim());
        }
    }

    pub fn print_slide(&self, carousel: &Carousel) {
        let image = HERO_SLIDES.get(carousel.index()).copied().unwrap_or_default();
        println!(
            "{} {}/{} {}",
            style("slide").magenta(),
            carousel.index() + 1,
            carousel.slide_count(),
            style(image).dim()
        );
    }

    pub fn print_message(&self, message: &ChatMessage) {
        let time = message.created_at.format("%H:%M");
        let name = if message.is_admin {
            style(format!("{} (admin)", message.username)).red().bold()
        } else {
            style(message.username.clone()).bold()
        };
        println!("{} {}: {}", style(time).dim(), name, message.message);
    }

    pub fn print_connection(&self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => println!("{}", style("● connected").green()),
            ConnectionState::Disconnected => println!("{}", style("○ disconnected").red()),
        }
    }

    pub fn print_route(&self, route: SendRoute, display_name: &str) {
        match route {
            SendRoute::Rest => println!("{}", style("sending as admin").dim()),
            SendRoute::Realtime if display_name.trim().is_empty() => {
                println!("{}", style("set a display name with /name <name> before sending").yellow())
            }
            SendRoute::Realtime => println!("{} {}", style("sending as").dim(), display_name),
        }
    }

    pub fn print_notice(&self, message: &str) {
        println!("{}", style(message).cyan());
    }

    pub fn print_success(&self, message: &str) {
        println!("{}", style(message).green());
    }

    pub fn print_info(&self, message: &str) {
        println!("{}", style(message).dim());
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", style("error:").red().bold(), message);
    }
}
