use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::algorithm::HashAlgorithm;

#[derive(Parser, Debug)]
#[command(name = "match-file-dups", version)]
#[command(about = "Find groups of byte-identical files, comparing them block by block")]
pub struct Cli {
    /// Directories to search (same as --path)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Search path, repeat the option for every path to search
    #[arg(short = 'p', long = "path", value_name = "PATH")]
    pub search_paths: Vec<PathBuf>,

    /// Path excluded from the search, repeat the option for every path to exclude
    #[arg(short = 'x', long = "exclude", value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Descend into subdirectories: 1/true or 0/false [default: true]
    #[arg(short, long, value_name = "BOOL", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub recursion: Option<bool>,

    /// Regular expression the whole file name must match
    #[arg(short, long, value_name = "REGEX")]
    pub mask: Option<String>,

    /// Skip files smaller than this many bytes [default: 1]
    #[arg(short = 'z', long, value_name = "BYTES")]
    pub min_size: Option<u64>,

    /// Size in bytes of the blocks hashed and compared [default: 128]
    #[arg(short = 'S', long, value_name = "BYTES")]
    pub block_size: Option<usize>,

    /// Block hash algorithm [default: fast]
    #[arg(short = 'H', long, value_enum)]
    pub hash_algo: Option<HashAlgorithm>,

    /// Stop at the first file that cannot be read instead of skipping the pair
    #[arg(long)]
    pub fail_fast: bool,

    /// TOML file with default settings, overridden by command line options
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
