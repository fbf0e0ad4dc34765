pub mod config;
pub mod replay;
pub mod report;

pub use config::CliConfig;
pub use replay::{read_events, replay_events, replay_file};
pub use report::{list_narrows, summarize, NarrowListing, Summary};
