//! Guide (EPG) engine.
//!
//! One [`GuideTable`] per channel, kept up to date by the [`EpgEngine`]:
//! window-covered short-circuiting against the store, grabbing through
//! the owning client or a named [`Scraper`], overlap resolution, and
//! periodic cleanup of expired entries.

mod engine;
mod scraper;
mod table;

pub use engine::{EpgEngine, EpgError};
pub use scraper::{Scraper, ScraperSet};
pub use table::{GuideState, GuideTable};
