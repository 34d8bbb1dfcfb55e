//! Campaign Orchestrator.
//!
//! One campaign run at a time: resolution, batching, content building and
//! paced sending live here. The control layer owns the single-run guard;
//! this module only executes.

pub mod batch;
pub mod content;
pub mod orchestrator;

pub use orchestrator::CampaignOrchestrator;
