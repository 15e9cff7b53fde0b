pub mod algorithm;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod scanner;
pub mod source;
pub mod utils;

pub use algorithm::{Digest, HashAlgorithm};
pub use cache::{CacheStats, HashCache};
pub use cli::Cli;
pub use config::{MatchOptions, ScanOptions, Settings};
pub use duplicates::{GroupCollector, GroupSink, MatchPolicy, MatchSummary, Matcher, TextSink};
pub use error::CompareError;
pub use scanner::list_files;
pub use source::{BlockSource, FileCursor, FsOpener, SourceOpener};
pub use utils::{FileInfo, format_human_elapsed};
