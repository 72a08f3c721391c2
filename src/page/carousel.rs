// src/page/carousel.rs
// Hero carousel index and its fixed-interval ticker

use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Hero slide images, in display order
pub const HERO_SLIDES: &[&str] = &[
    "https://images.pexels.com/photos/1763075/pexels-photo-1763075.jpeg?auto=compress&cs=tinysrgb&w=1200",
    "https://images.pexels.com/photos/1871508/pexels-photo-1871508.jpeg?auto=compress&cs=tinysrgb&w=1200",
    "https://images.pexels.com/photos/1871508/pexels-photo-1871508.jpeg?auto=compress&cs=tinysrgb&w=1200",
    "https://images.pexels.com/photos/1763075/pexels-photo-1763075.jpeg?auto=compress&cs=tinysrgb&w=1200",
];

const HERO_SLIDE_COUNT: NonZeroUsize = match NonZeroUsize::new(HERO_SLIDES.len()) {
    Some(count) => count,
    None => panic!("hero carousel needs at least one slide"),
};

/// Index into a fixed, non-empty set of slides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    slides: NonZeroUsize,
    index: usize,
}

impl Carousel {
    pub fn new(slides: NonZeroUsize) -> Self {
        Self { slides, index: 0 }
    }

    /// Carousel over [`HERO_SLIDES`]
    pub fn hero() -> Self {
        Self::new(HERO_SLIDE_COUNT)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slide_count(&self) -> usize {
        self.slides.get()
    }

    /// Advance by one, wrapping at the slide count
    pub fn tick(&mut self) -> usize {
        self.index = (self.index + 1) % self.slides.get();
        self.index
    }
}

impl Default for Carousel {
    fn default() -> Self {
        Self::hero()
    }
}

/// Fixed-period tick source for a [`Carousel`].
///
/// The first tick fires one full period after creation. Missed ticks are
/// skipped rather than replayed in a burst.
pub struct CarouselTicker {
    interval: Interval,
}

impl CarouselTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Wait for the next period and advance `carousel`
    pub async fn advance(&mut self, carousel: &mut Carousel) -> usize {
        self.interval.tick().await;
        carousel.tick()
    }
}
