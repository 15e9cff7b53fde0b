use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::algorithm::HashAlgorithm;
use crate::cli::Cli;
use crate::duplicates::MatchPolicy;

pub const DEFAULT_BLOCK_SIZE: usize = 128;
pub const DEFAULT_MIN_SIZE: u64 = 1;
/// The block buffer is allocated up front, so its size is capped.
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Settings as read from a TOML config file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub paths: Option<Vec<PathBuf>>,
    pub exclude: Option<Vec<PathBuf>>,
    pub recursion: Option<bool>,
    pub mask: Option<String>,
    pub min_size: Option<u64>,
    pub block_size: Option<usize>,
    pub hash_algo: Option<HashAlgorithm>,
    pub fail_fast: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: '{}'", path.display()))
    }
}

/// Which files to list.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub paths: Vec<PathBuf>,
    pub exclude: Vec<PathBuf>,
    pub recursive: bool,
    /// Anchored so it must match the whole file name.
    pub mask: Option<Regex>,
    pub min_size: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            exclude: Vec::new(),
            recursive: true,
            mask: None,
            min_size: DEFAULT_MIN_SIZE,
        }
    }
}

/// How to compare the listed files.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    pub block_size: usize,
    pub algorithm: HashAlgorithm,
    pub policy: MatchPolicy,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            algorithm: HashAlgorithm::default(),
            policy: MatchPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub scan: ScanOptions,
    pub matching: MatchOptions,
}

impl Settings {
    /// Resolves settings from defaults, then the config file named on the
    /// command line (if any), then the command line itself.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                debug!("Loading config file: '{}'", path.display());
                FileConfig::load(path)?
            }
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> Result<Self> {
        let defaults = Settings::default();

        let mut paths: Vec<PathBuf> = cli.search_paths.iter().chain(&cli.paths).cloned().collect();
        if paths.is_empty() {
            paths = file.paths.unwrap_or(defaults.scan.paths);
        }
        let exclude = if cli.exclude.is_empty() {
            file.exclude.unwrap_or_default()
        } else {
            cli.exclude.clone()
        };

        let mask = match cli.mask.as_ref().or(file.mask.as_ref()) {
            Some(mask) if !mask.is_empty() => Some(
                Regex::new(&format!("^(?:{mask})$"))
                    .with_context(|| format!("Invalid file name mask: '{mask}'"))?,
            ),
            _ => None,
        };

        let block_size = cli
            .block_size
            .or(file.block_size)
            .unwrap_or(defaults.matching.block_size);
        if block_size == 0 {
            bail!("Block size must be greater than zero");
        }
        if block_size > MAX_BLOCK_SIZE {
            bail!("Block size must be at most {MAX_BLOCK_SIZE} bytes, got {block_size}");
        }

        let policy = if cli.fail_fast || file.fail_fast.unwrap_or(false) {
            MatchPolicy::FailFast
        } else {
            MatchPolicy::SkipPair
        };

        Ok(Self {
            scan: ScanOptions {
                paths,
                exclude,
                recursive: cli.recursion.or(file.recursion).unwrap_or(defaults.scan.recursive),
                mask,
                min_size: cli.min_size.or(file.min_size).unwrap_or(defaults.scan.min_size),
            },
            matching: MatchOptions {
                block_size,
                algorithm: cli
                    .hash_algo
                    .or(file.hash_algo)
                    .unwrap_or(defaults.matching.algorithm),
                policy,
            },
        })
    }
}
