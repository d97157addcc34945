//! Market research CLI
//!
//! Loads a landscape, gets the text of each site, and classifies every site
//! through one shared rate limiter, writing a JSON report.

pub mod cli;
pub mod config;
pub mod landscape;
pub mod orchestrator;
pub mod report;
pub mod site_text;

pub use cli::Cli;
pub use config::{Config, Provider};
pub use orchestrator::Orchestrator;
pub use report::{Report, SiteReport, SiteStatus};
pub use site_text::{HttpTextSource, SiteTextSource, TextDirSource};
