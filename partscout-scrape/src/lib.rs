//! Product extraction pipeline.
//!
//! A [`job::ScrapeJob`] flows through four stages:
//!
//! - [`sites`]: resolve the target site to a [`sites::SiteProfile`] (search URL
//!   template, link selectors, detail selectors, prompt context)
//! - [`orchestrator`]: drive the browser engine through the search page and
//!   each candidate product page under timeouts and pacing
//! - [`normalize`]: distil rendered HTML into bounded, de-noised text
//! - [`extract`]: ask the model for a [`record::ProductRecord`] and validate it
//!
//! Item-level failures never abort a job; they contribute an all-null record.

pub mod extract;
pub mod job;
pub mod normalize;
pub mod orchestrator;
pub mod record;
pub mod sites;

pub use extract::ExtractionEngine;
pub use job::{JobRequest, JobResponse, ScrapeJob};
pub use normalize::{ContentNormalizer, NormalizedText};
pub use orchestrator::ScrapeOrchestrator;
pub use record::{PriceBreak, ProductRecord, ScrapeBatchResult};
