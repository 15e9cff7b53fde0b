use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{HumanBytes, HumanCount, ProgressBar};
use log::{debug, error, info, trace};

use crate::cache::{CacheStats, HashCache};
use crate::error::CompareError;
use crate::source::{BlockSource, SourceOpener};
use crate::utils::FileInfo;

/// What the matcher does when a single comparison fails to read a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Log the failure, treat the pair as not matching and carry on.
    #[default]
    SkipPair,
    /// Stop the whole run at the first failure.
    FailFast,
}

/// Receives groups as they are discovered.
///
/// For every group `leader` is called once, followed by one `duplicate` call
/// per file found equal to it.
pub trait GroupSink {
    fn leader(&mut self, file_id: usize, file: &FileInfo) -> io::Result<()>;
    fn duplicate(&mut self, file_id: usize, file: &FileInfo) -> io::Result<()>;
}

/// Writes groups as plain text: a blank line, the leader, then each duplicate,
/// one path per line.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> GroupSink for TextSink<W> {
    fn leader(&mut self, _file_id: usize, file: &FileInfo) -> io::Result<()> {
        write!(self.out, "\n{}\n", file.path.display())
    }

    fn duplicate(&mut self, _file_id: usize, file: &FileInfo) -> io::Result<()> {
        writeln!(self.out, "{}", file.path.display())
    }
}

/// Collects groups of file ids in discovery order.
#[derive(Debug, Default)]
pub struct GroupCollector {
    pub groups: Vec<Vec<usize>>,
}

impl GroupCollector {
    /// The collected groups resolved to paths.
    pub fn paths(&self, files: &[FileInfo]) -> Vec<Vec<PathBuf>> {
        self.groups
            .iter()
            .map(|group| group.iter().map(|&id| files[id].path.clone()).collect())
            .collect()
    }
}

impl GroupSink for GroupCollector {
    fn leader(&mut self, file_id: usize, _file: &FileInfo) -> io::Result<()> {
        self.groups.push(vec![file_id]);
        Ok(())
    }

    fn duplicate(&mut self, file_id: usize, _file: &FileInfo) -> io::Result<()> {
        if let Some(group) = self.groups.last_mut() {
            group.push(file_id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub files: usize,
    pub groups: usize,
    pub duplicates: usize,
    /// Bytes taken by duplicates beyond their group's leader.
    pub duplicate_bytes: u64,
    /// Pairs of equal size whose contents were compared.
    pub pairs_compared: usize,
    pub pairs_failed: usize,
    pub cache: CacheStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    Unseen,
    Tracked,
    Skipped,
}

/// Pairwise block-by-block comparison of every candidate against every later one.
pub struct Matcher<'a, O> {
    files: &'a [FileInfo],
    opener: O,
    policy: MatchPolicy,
    progress: ProgressBar,
}

impl<'a, O: SourceOpener> Matcher<'a, O> {
    pub fn new(files: &'a [FileInfo], opener: O) -> Self {
        Self {
            files,
            opener,
            policy: MatchPolicy::default(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ticks `progress` once per file taken as a group leader candidate.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Groups byte-identical files, streaming each group to `sink`.
    ///
    /// Each file not yet placed in a group is taken in candidate order as a
    /// token and compared against every later unplaced file of the same size.
    /// Files found equal join the token's group and are never compared again.
    ///
    /// # Errors
    ///
    /// Fails if `sink` cannot be written, or on the first unreadable file when
    /// the policy is [`MatchPolicy::FailFast`]. Groups already written stay written.
    pub fn run(&self, cache: &mut HashCache, sink: &mut dyn GroupSink) -> Result<MatchSummary> {
        let n = self.files.len();
        info!(
            "Matching {} files ({} blocks, {})",
            HumanCount(n as u64),
            HumanBytes(cache.block_size() as u64),
            cache.algorithm().name()
        );

        let mut states = vec![FileState::Unseen; n];
        let mut summary = MatchSummary {
            files: n,
            ..MatchSummary::default()
        };
        self.progress.set_length(n as u64);

        for token_id in 0..n {
            self.progress.inc(1);
            if states[token_id] == FileState::Skipped {
                continue;
            }
            states[token_id] = FileState::Skipped;
            cache.register(token_id);

            let token = &self.files[token_id];
            let mut leader_emitted = false;

            for match_id in token_id + 1..n {
                if states[match_id] == FileState::Skipped {
                    continue;
                }
                if states[match_id] == FileState::Unseen {
                    cache.register(match_id);
                    states[match_id] = FileState::Tracked;
                }

                let candidate = &self.files[match_id];
                if token.size != candidate.size {
                    continue;
                }

                summary.pairs_compared += 1;
                let is_match = match self.compare_pair(cache, token_id, match_id) {
                    Ok(is_match) => is_match,
                    Err(e) if self.policy == MatchPolicy::SkipPair => {
                        error!(
                            "Skipping '{}' vs '{}': {:#}",
                            token.path.display(),
                            candidate.path.display(),
                            anyhow::Error::new(e)
                        );
                        summary.pairs_failed += 1;
                        continue;
                    }
                    Err(e) => {
                        return Err(e).with_context(|| {
                            format!(
                                "Aborting while comparing '{}' with '{}'",
                                token.path.display(),
                                candidate.path.display()
                            )
                        });
                    }
                };

                if is_match {
                    if !leader_emitted {
                        sink.leader(token_id, token)
                            .context("Failed to write duplicate group")?;
                        leader_emitted = true;
                        summary.groups += 1;
                    }
                    sink.duplicate(match_id, candidate)
                        .context("Failed to write duplicate group")?;
                    states[match_id] = FileState::Skipped;
                    summary.duplicates += 1;
                    summary.duplicate_bytes += candidate.size;
                    debug!(
                        "'{}' duplicates '{}'",
                        candidate.path.display(),
                        token.path.display()
                    );
                }
            }
        }

        self.progress.finish_and_clear();
        summary.cache = cache.stats();
        Ok(summary)
    }

    /// Compares two equal-size files block by block, stopping at the first
    /// differing block. Both read cursors are dropped on return.
    fn compare_pair(
        &self,
        cache: &mut HashCache,
        token_id: usize,
        match_id: usize,
    ) -> Result<bool, CompareError> {
        let mut token_source = self.opener.open(&self.files[token_id])?;
        let mut match_source = self.opener.open(&self.files[match_id])?;

        let mut block_index = 0;
        while !token_source.is_at_end() && !match_source.is_at_end() {
            cache.ensure_block(token_id, block_index, &mut token_source)?;
            cache.ensure_block(match_id, block_index, &mut match_source)?;
            if !cache.equal(token_id, match_id, block_index) {
                trace!("#{} and #{} differ at block {}", token_id, match_id, block_index);
                return Ok(false);
            }
            block_index += 1;
        }

        Ok(token_source.is_at_end() && match_source.is_at_end())
    }
}
