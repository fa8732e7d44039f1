//! Domain model for a harvest run
//!
//! # Components
//!
//! - `Target`: one source to scrape (account, tag, or URL)
//! - `RawContentItem` / `EnrichedItem`: a scraped reel before and after enrichment
//! - `PersistedRecord`: the flattened row written to the store
//! - `PipelineRun`: the terminal outcome of processing one target

mod item;
mod run;
mod target;

pub use item::{Analysis, Comment, Creator, EnrichedItem, PersistedRecord, RawContentItem};
pub use run::{PipelineRun, PipelineRunBuilder, RunStatus, NO_CONTENT_FOUND};
pub use target::{Target, TargetKind};
