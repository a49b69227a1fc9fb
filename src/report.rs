//! Run summary as a Polars `DataFrame`: one row per OG (or per failed file)
//! with accepted/rejected candidate counts and pair counts.
use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::metrics::Rejection;
use crate::pipeline::FileOutcome;

/// Totals across the whole run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    pub files: usize,
    pub failed_files: usize,
    pub ogs: usize,
    pub ogs_without_pairs: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub pairs: usize,
}

pub fn totals(outcomes: &[FileOutcome]) -> Totals {
    let mut t = Totals { files: outcomes.len(), ..Default::default() };
    for o in outcomes {
        match &o.result {
            Ok(reports) => {
                for r in reports {
                    t.ogs += 1;
                    t.accepted += r.accepted;
                    t.rejected += r.rejected();
                    if let Some(n) = r.pairs {
                        t.pairs += n;
                        if n == 0 { t.ogs_without_pairs += 1; }
                    }
                }
            }
            Err(_) => t.failed_files += 1,
        }
    }
    t
}

pub fn summary_frame(outcomes: &[FileOutcome]) -> PolarsResult<DataFrame> {
    let mut input = Vec::new();
    let mut og = Vec::new();
    let mut status = Vec::new();
    let mut candidates = Vec::new();
    let mut accepted = Vec::new();
    let mut rejected: Vec<Vec<u64>> = vec![Vec::new(); Rejection::ALL.len()];
    let mut pairs: Vec<Option<u64>> = Vec::new();

    for o in outcomes {
        let name = o.input.display().to_string();
        match &o.result {
            Ok(reports) => {
                for r in reports {
                    input.push(name.clone());
                    og.push(r.og_id.clone());
                    status.push("ok".to_string());
                    candidates.push(r.candidates as u64);
                    accepted.push(r.accepted as u64);
                    for (col, reason) in rejected.iter_mut().zip(Rejection::ALL) {
                        col.push(r.rejections.get(&reason).copied().unwrap_or(0) as u64);
                    }
                    pairs.push(r.pairs.map(|n| n as u64));
                }
            }
            Err(e) => {
                input.push(name);
                og.push(String::new());
                status.push(format!("error: {e:#}"));
                candidates.push(0);
                accepted.push(0);
                for col in rejected.iter_mut() { col.push(0); }
                pairs.push(None);
            }
        }
    }

    let mut df = df!(
        "input"      => input,
        "og_id"      => og,
        "status"     => status,
        "candidates" => candidates,
        "accepted"   => accepted,
    )?;
    for (col, reason) in rejected.into_iter().zip(Rejection::ALL) {
        df.with_column(Series::new(reason.as_str().into(), col))?;
    }
    df.with_column(Series::new("pairs".into(), pairs))?;
    Ok(df)
}

/// Dump the summary as a tab-separated file.
pub fn write_summary(path: &Path, df: &mut DataFrame) -> anyhow::Result<()> {
    let f = File::create(path)?;
    CsvWriter::new(f).include_header(true).with_separator(b'\t').finish(df)?;
    Ok(())
}

#[cfg(test)]
mod report_tests {
    use super::*;
    use crate::pipeline::OgReport;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn outcomes() -> Vec<FileOutcome> {
        let mut rej = BTreeMap::new();
        rej.insert(Rejection::UnderThreshold, 4);
        rej.insert(Rejection::TmMaxAbove, 1);
        vec![
            FileOutcome {
                input: PathBuf::from("concatenated_OG1.tsv"),
                result: Ok(vec![OgReport { og_id: "OG1".into(), candidates: 7, accepted: 2, rejections: rej, pairs: Some(1) }]),
            },
            FileOutcome {
                input: PathBuf::from("concatenated_OG2.tsv"),
                result: Ok(vec![OgReport { og_id: "OG2".into(), candidates: 3, accepted: 0, rejections: BTreeMap::new(), pairs: Some(0) }]),
            },
            FileOutcome { input: PathBuf::from("broken.tsv"), result: Err(anyhow::anyhow!("missing column")) },
        ]
    }

    #[test]
    fn totals_separate_empty_results_from_failures() {
        let t = totals(&outcomes());
        assert_eq!(t, Totals { files: 3, failed_files: 1, ogs: 2, ogs_without_pairs: 1, accepted: 2, rejected: 5, pairs: 1 });
    }

    #[test]
    fn summary_has_a_row_per_og_and_failed_file() {
        let df = summary_frame(&outcomes()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 5 + Rejection::ALL.len() + 1);
        let under = df.column("under_threshold").unwrap().u64().unwrap();
        assert_eq!(under.get(0), Some(4));
        let pairs = df.column("pairs").unwrap().u64().unwrap();
        assert_eq!(pairs.get(2), None);
    }
}
