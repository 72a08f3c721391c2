// src/page/mod.rs
// Landing page shell and hero carousel

mod carousel;
mod shell;

pub use carousel::{Carousel, CarouselTicker, HERO_SLIDES};
pub use shell::{LoadState, PageContent, PageShell, WHATSAPP_URL};
