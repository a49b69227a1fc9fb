//! Per-OG orchestration on a **Rayon worker pool**.
//!
//! ### Design
//! - one unit of work per input file; each file holds one OG (miner output)
//!   or a few OGs (evaluated tables)
//! - workers share only read-only inputs (`OgTable`, thresholds, window)
//! - a failing unit is logged and reported in its [`FileOutcome`]; siblings
//!   keep running
//! - `threads = None` uses all logical cores
//!
//! Results come back in input order, so reports are reproducible.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, error, info};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::config::{AmpliconWindow, Thresholds};
use crate::error::RecordError;
use crate::metrics::{evaluate, Rejection};
use crate::pairs::{rank_pairs, select_pairs};
use crate::primer::{AlignmentLength, EvaluatedPrimer, OgMetadata, OgPrimers, PrimerCandidate, PrimerPair};
use crate::tsv::{self, OgTable};

/// Counts for one OG, enough to tell "no good primers" from a misconfiguration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OgReport {
    pub og_id: String,
    /// Candidates read (evaluation) or primers read (pairing only).
    pub candidates: usize,
    pub accepted: usize,
    pub rejections: BTreeMap<Rejection, usize>,
    /// `None` when pairing was not part of the run.
    pub pairs: Option<usize>,
}

impl OgReport {
    pub fn rejected(&self) -> usize { self.rejections.values().sum() }
}

/// What happened to one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<Vec<OgReport>>,
}

/// Evaluate all candidates of one OG. Pure; no I/O.
pub fn evaluate_og(candidates: &[PrimerCandidate], og: &OgMetadata, thresholds: &Thresholds) -> (Vec<EvaluatedPrimer>, OgReport) {
    let mut kept = Vec::new();
    let mut report = OgReport { og_id: og.og_id.clone(), candidates: candidates.len(), ..Default::default() };
    for c in candidates {
        match evaluate(c, og, thresholds) {
            Ok(p) => kept.push(p),
            Err(reason) => {
                if reason == Rejection::InvalidSequence {
                    debug!("{}: position {} has an unusable primer {:?}", og.og_id, c.position, c.sequence);
                }
                *report.rejections.entry(reason).or_insert(0) += 1;
            }
        }
    }
    report.accepted = kept.len();
    (kept, report)
}

/// Select and rank the pairs of one OG.
pub fn pair_og(group: &OgPrimers, alignment_dir: Option<&Path>, window: &AmpliconWindow) -> Result<Vec<PrimerPair>> {
    let alignment = match alignment_dir {
        Some(dir) => tsv::alignment_length(dir, &group.og.og_id)?,
        None => AlignmentLength::Unknown,
    };
    let mut pairs = select_pairs(&group.primers, alignment, window);
    rank_pairs(&mut pairs);
    Ok(pairs)
}

/// Stage 1 for one miner output file: evaluate and write `<stem>_stat_primer.tsv`.
pub fn evaluate_file(path: &Path, ogs: &OgTable, thresholds: &Thresholds, out_dir: &Path) -> Result<(OgPrimers, PathBuf, OgReport)> {
    let og_id = tsv::og_id_from_path(path)?;
    let og = ogs.get(&og_id).ok_or_else(|| RecordError::UnknownOg(og_id.clone()))?;
    let candidates = tsv::read_candidates(path)?;
    let (primers, report) = evaluate_og(&candidates, og, thresholds);

    let output = tsv::evaluated_output_path(out_dir, path);
    tsv::write_evaluated(&output, og, &primers)?;
    info!(
        "{og_id}: {} of {} candidates kept, written to {}",
        report.accepted, report.candidates, output.display()
    );
    Ok((OgPrimers { og: og.clone(), primers }, output, report))
}

/// Stage 2 for one evaluated table: pair every OG it holds, write `<stem>_couple.tsv`.
pub fn pair_file(path: &Path, alignment_dir: Option<&Path>, window: &AmpliconWindow) -> Result<Vec<OgReport>> {
    let groups = tsv::read_evaluated(path)?;
    pair_groups(path, &groups, alignment_dir, window, None)
}

fn pair_groups(
    path: &Path,
    groups: &[OgPrimers],
    alignment_dir: Option<&Path>,
    window: &AmpliconWindow,
    evaluated: Option<OgReport>,
) -> Result<Vec<OgReport>> {
    let mut selected = Vec::with_capacity(groups.len());
    for g in groups {
        selected.push((g, pair_og(g, alignment_dir, window)?));
    }

    let output = tsv::pairs_output_path(path);
    let written = tsv::write_pairs(&output, selected.iter().map(|(g, pairs)| (&g.og, pairs.as_slice())))?;
    info!("{}: {written} primer pairs written to {}", path.display(), output.display());

    // A freshly evaluated file carries exactly one OG; keep its rejection counts.
    let mut reports: Vec<OgReport> = selected
        .iter()
        .map(|(g, pairs)| OgReport {
            og_id: g.og.og_id.clone(),
            candidates: g.primers.len(),
            accepted: g.primers.len(),
            rejections: BTreeMap::new(),
            pairs: Some(pairs.len()),
        })
        .collect();
    if let (Some(ev), [only]) = (evaluated, reports.as_mut_slice()) {
        *only = OgReport { pairs: only.pairs, ..ev };
    }
    Ok(reports)
}

/// Both stages for one miner output file, without re-reading the evaluated table.
pub fn full_file(
    path: &Path,
    ogs: &OgTable,
    thresholds: &Thresholds,
    out_dir: &Path,
    alignment_dir: Option<&Path>,
    window: &AmpliconWindow,
) -> Result<Vec<OgReport>> {
    let (group, stat_path, report) = evaluate_file(path, ogs, thresholds, out_dir)?;
    pair_groups(&stat_path, std::slice::from_ref(&group), alignment_dir, window, Some(report))
}

/// Run `work` over `files` on a dedicated pool; failures are logged per file.
pub fn run_parallel<F>(files: &[PathBuf], threads: Option<usize>, work: F) -> Result<Vec<FileOutcome>>
where
    F: Fn(&Path) -> Result<Vec<OgReport>> + Send + Sync,
{
    let n = threads.filter(|&t| t > 0).unwrap_or_else(num_cpus::get).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(n).build()?;
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        files
            .par_iter()
            .map(|p| FileOutcome { input: p.clone(), result: work(p.as_path()) })
            .collect()
    });
    for o in &outcomes {
        if let Err(e) = &o.result {
            error!("{}: {e:#}", o.input.display());
        }
    }
    Ok(outcomes)
}

pub fn run_evaluate(files: &[PathBuf], ogs: &OgTable, thresholds: &Thresholds, out_dir: &Path, threads: Option<usize>) -> Result<Vec<FileOutcome>> {
    run_parallel(files, threads, |p| evaluate_file(p, ogs, thresholds, out_dir).map(|(_, _, r)| vec![r]))
}

pub fn run_pairing(files: &[PathBuf], alignment_dir: Option<&Path>, window: &AmpliconWindow, threads: Option<usize>) -> Result<Vec<FileOutcome>> {
    run_parallel(files, threads, |p| pair_file(p, alignment_dir, window))
}

pub fn run_full(
    files: &[PathBuf],
    ogs: &OgTable,
    thresholds: &Thresholds,
    out_dir: &Path,
    alignment_dir: Option<&Path>,
    window: &AmpliconWindow,
    threads: Option<usize>,
) -> Result<Vec<FileOutcome>> {
    run_parallel(files, threads, |p| full_file(p, ogs, thresholds, out_dir, alignment_dir, window))
}
