//! Guide scrapers: non-client grabber implementations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pvr_api::{ApiResult, EpgEntry};

use crate::channels::Channel;

/// A guide data source independent of the owning backend client, e.g. an
/// XMLTV file reader. Resolved by name from a channel's grabber selector.
pub trait Scraper: Send + Sync {
    /// Name matching the channel's grabber selector.
    fn name(&self) -> &str;

    /// Guide entries for `channel` covering `[start, end)`. May block.
    fn fetch(
        &self,
        channel: &Channel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ApiResult<Vec<EpgEntry>>;
}

/// The registered scrapers, keyed by selector name.
#[derive(Default)]
pub struct ScraperSet {
    scrapers: HashMap<String, Box<dyn Scraper>>,
}

impl ScraperSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scraper: Box<dyn Scraper>) {
        self.scrapers.insert(scraper.name().to_string(), scraper);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Scraper> {
        self.scrapers.get(name).map(|s| s.as_ref())
    }
}

impl std::fmt::Debug for ScraperSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperSet")
            .field("names", &self.scrapers.keys().collect::<Vec<_>>())
            .finish()
    }
}
