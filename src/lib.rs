pub mod config;
pub mod error;
pub mod graph;
pub mod output;
pub mod source;

pub use config::Config;
pub use error::{CrawlError, Result};
pub use graph::{explore, finalize, render, Crawler, Graph, Label, Marker, Notation};
pub use source::{Discovery, LinkSource, WikiSource};
