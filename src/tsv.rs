//! Tab-separated **input and output tables** of the two pipeline stages.
//!
//! ### Inputs
//! - degenerate-primer miner output, one file per OG (`<prefix>_<OG>.tsv`);
//!   columns used: 0 position, 4 degeneracy, 5 sequence, 6 match count
//! - OG metadata; columns used: 0 OG id, 4 percent single copy, 8 gene name,
//!   9 species count, 11 number of sequences
//! - evaluated primer tables written by this module, for standalone pairing
//! - alignments (FASTA), only to report their length next to each pair
//!
//! ### Outputs
//! Column names and value formatting (`90.0`, `True`) are those the
//! downstream in-silico PCR and report stages parse, so they are kept stable.
//!
//! ### Errors
//! Structural problems (missing column, non-numeric field) surface as
//! [`RecordError`] for the whole file; the caller decides whether that is
//! fatal for one OG or for the run.
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bio::io::fasta;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use log::warn;

use crate::error::RecordError;
use crate::iupac::parse_bases;
use crate::primer::{AlignmentLength, EvaluatedPrimer, OgMetadata, OgPrimers, PrimerCandidate, PrimerPair};

/// OG metadata keyed by OG id.
pub type OgTable = HashMap<String, OgMetadata>;

pub const EVALUATED_HEADER: [&str; 21] = [
    "OG_ID", "NumberOfSeq", "SpeciesCount", "PercentSingleCopy", "GeneName",
    "Primer", "Position", "Primer_Size", "Number_matching", "Percentage_NM",
    "Score_Percentage_NM", "Degenerescence", "Tm_max", "Tm_min",
    "GC_percentage_fraction", "GC_percentage_max", "GC_percentage_min",
    "GC_in_last_thirty_percent", "Ends_with_T", "Self_Complementarity", "GC_clamp",
];

/// Offset of the per-primer block inside [`EVALUATED_HEADER`].
const PRIMER_BLOCK: usize = 5;

/// Python-compatible float rendering: integral values keep a trailing `.0`.
pub fn fmt_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 { format!("{v:.1}") } else { format!("{v}") }
}

pub fn fmt_bool(b: bool) -> &'static str { if b { "True" } else { "False" } }

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn tsv_reader(path: &Path) -> Result<csv::Reader<File>> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

fn tsv_writer(path: &Path) -> Result<csv::Writer<File>> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))
}

fn line_of(rec: &StringRecord) -> u64 { rec.position().map(|p| p.line()).unwrap_or(0) }

fn field<'r>(rec: &'r StringRecord, column: usize, name: &'static str) -> Result<&'r str, RecordError> {
    rec.get(column).map(str::trim).ok_or(RecordError::MissingColumn { line: line_of(rec), column, name })
}

fn int_field(rec: &StringRecord, column: usize, name: &'static str) -> Result<u64, RecordError> {
    let v = field(rec, column, name)?;
    v.parse().map_err(|_| RecordError::BadInteger { line: line_of(rec), name, value: v.to_string() })
}

fn float_field(rec: &StringRecord, column: usize, name: &'static str) -> Result<f64, RecordError> {
    let v = field(rec, column, name)?;
    v.parse().map_err(|_| RecordError::BadFloat { line: line_of(rec), name, value: v.to_string() })
}

fn bool_field(rec: &StringRecord, column: usize, name: &'static str) -> Result<bool, RecordError> {
    let v = field(rec, column, name)?;
    parse_bool(v).ok_or(RecordError::BadBool { line: line_of(rec), name, value: v.to_string() })
}

/// OG id embedded in a miner output file name: `concatenated_OG42.tsv` -> `OG42`.
pub fn og_id_from_path(path: &Path) -> Result<String, RecordError> {
    path.file_name()
        .and_then(|s| s.to_str())
        .and_then(|name| name.split('_').nth(1))
        .and_then(|rest| rest.split('.').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RecordError::OgIdFromPath(path.to_path_buf()))
}

/// Parse one miner row. Symbols are upper-cased but not validated here.
pub fn candidate_from_record(rec: &StringRecord) -> Result<PrimerCandidate, RecordError> {
    Ok(PrimerCandidate {
        position: int_field(rec, 0, "position")? as usize,
        degeneracy: int_field(rec, 4, "degeneracy")?,
        sequence: field(rec, 5, "sequence")?.to_ascii_uppercase(),
        match_count: int_field(rec, 6, "match_count")?,
    })
}

/// Read every candidate of one miner output file. Any malformed row fails the file.
pub fn read_candidates(path: &Path) -> Result<Vec<PrimerCandidate>> {
    let mut rdr = tsv_reader(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let cand = candidate_from_record(&rec).with_context(|| format!("in {}", path.display()))?;
        out.push(cand);
    }
    Ok(out)
}

pub fn og_from_record(rec: &StringRecord) -> Result<OgMetadata, RecordError> {
    Ok(OgMetadata {
        og_id: field(rec, 0, "OG_ID")?.to_string(),
        percent_single_copy: field(rec, 4, "percent_single_copy")?.to_string(),
        gene_name: field(rec, 8, "gene_name")?.to_string(),
        species_count: field(rec, 9, "species_count")?.to_string(),
        total_sequences: int_field(rec, 11, "NumberOfSeq")?,
    })
}

/// Load the OG metadata table. Malformed rows are logged and skipped; their OGs
/// will later fail individually as unknown.
pub fn read_og_table(path: &Path) -> Result<OgTable> {
    let mut rdr = tsv_reader(path)?;
    let mut table = OgTable::new();
    for rec in rdr.records() {
        let rec = rec?;
        match og_from_record(&rec) {
            Ok(og) => { table.insert(og.og_id.clone(), og); }
            Err(e) => warn!("{}: skipping OG metadata row: {e}", path.display()),
        }
    }
    Ok(table)
}

fn primer_fields(p: &EvaluatedPrimer) -> [String; 16] {
    [
        p.sequence.clone(),
        p.position.to_string(),
        p.size().to_string(),
        p.match_count.to_string(),
        fmt_float(p.match_percentage),
        fmt_float(p.score_percentage_nm),
        p.degeneracy.to_string(),
        fmt_float(f64::from(p.tm_max)),
        fmt_float(f64::from(p.tm_min)),
        fmt_float(p.gc_fraction),
        fmt_float(p.gc_max),
        fmt_float(p.gc_min),
        p.gc_in_last_thirty_percent.to_string(),
        fmt_bool(p.ends_with_t).to_string(),
        fmt_bool(p.self_complementary).to_string(),
        fmt_bool(p.gc_clamp).to_string(),
    ]
}

fn og_fields(og: &OgMetadata) -> [String; 5] {
    [
        og.og_id.clone(),
        og.total_sequences.to_string(),
        og.species_count.clone(),
        og.percent_single_copy.clone(),
        og.gene_name.clone(),
    ]
}

pub fn evaluated_row(og: &OgMetadata, p: &EvaluatedPrimer) -> Vec<String> {
    og_fields(og).into_iter().chain(primer_fields(p)).collect()
}

/// Write the evaluated primer table; the header is written even with no rows.
pub fn write_evaluated(path: &Path, og: &OgMetadata, primers: &[EvaluatedPrimer]) -> Result<()> {
    let mut w = tsv_writer(path)?;
    w.write_record(EVALUATED_HEADER)?;
    for p in primers {
        w.write_record(evaluated_row(og, p))?;
    }
    w.flush()?;
    Ok(())
}

fn evaluated_from_record(rec: &StringRecord) -> Result<(OgMetadata, EvaluatedPrimer), RecordError> {
    let og = OgMetadata {
        og_id: field(rec, 0, "OG_ID")?.to_string(),
        total_sequences: int_field(rec, 1, "NumberOfSeq")?,
        species_count: field(rec, 2, "SpeciesCount")?.to_string(),
        percent_single_copy: field(rec, 3, "PercentSingleCopy")?.to_string(),
        gene_name: field(rec, 4, "GeneName")?.to_string(),
    };
    let sequence = field(rec, 5, "Primer")?.to_ascii_uppercase();
    if sequence.is_empty() {
        return Err(RecordError::EmptySequence { line: line_of(rec) });
    }
    if let Err((index, b)) = parse_bases(&sequence) {
        return Err(RecordError::InvalidSymbol { line: line_of(rec), sequence, symbol: b as char, index });
    }
    let primer = EvaluatedPrimer {
        og_id: og.og_id.clone(),
        sequence,
        position: int_field(rec, 6, "Position")? as usize,
        match_count: int_field(rec, 8, "Number_matching")?,
        match_percentage: float_field(rec, 9, "Percentage_NM")?,
        score_percentage_nm: float_field(rec, 10, "Score_Percentage_NM")?,
        degeneracy: int_field(rec, 11, "Degenerescence")?,
        tm_max: float_field(rec, 12, "Tm_max")? as u32,
        tm_min: float_field(rec, 13, "Tm_min")? as u32,
        gc_fraction: float_field(rec, 14, "GC_percentage_fraction")?,
        gc_max: float_field(rec, 15, "GC_percentage_max")?,
        gc_min: float_field(rec, 16, "GC_percentage_min")?,
        gc_in_last_thirty_percent: int_field(rec, 17, "GC_in_last_thirty_percent")? as usize,
        ends_with_t: bool_field(rec, 18, "Ends_with_T")?,
        self_complementary: bool_field(rec, 19, "Self_Complementarity")?,
        gc_clamp: bool_field(rec, 20, "GC_clamp")?,
    };
    Ok((og, primer))
}

/// Read an evaluated primer table back, grouped by OG in first-seen order.
pub fn read_evaluated(path: &Path) -> Result<Vec<OgPrimers>> {
    let mut rdr = tsv_reader(path)?;
    let mut groups: Vec<OgPrimers> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for rec in rdr.records() {
        let rec = rec?;
        let (og, primer) = evaluated_from_record(&rec).with_context(|| format!("in {}", path.display()))?;
        let slot = *index.entry(og.og_id.clone()).or_insert_with(|| {
            groups.push(OgPrimers { og, primers: Vec::new() });
            groups.len() - 1
        });
        groups[slot].primers.push(primer);
    }
    Ok(groups)
}

pub fn pair_header() -> Vec<String> {
    let mut h: Vec<String> = EVALUATED_HEADER[..PRIMER_BLOCK].iter().map(|s| s.to_string()).collect();
    h.push("Alignment_size".into());
    for suffix in ["A", "B"] {
        h.extend(EVALUATED_HEADER[PRIMER_BLOCK..].iter().map(|name| format!("{name}_{suffix}")));
    }
    h.extend(
        [
            "Reverse_Complement_B", "GC_clamp_RC_B", "GC_last_thirty_percent_RC_B",
            "potential_amplicon_size", "Amplicon_score", "Total_score",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    h
}

pub fn pair_row(og: &OgMetadata, pair: &PrimerPair) -> Vec<String> {
    let mut row: Vec<String> = og_fields(og).into();
    row.push(pair.alignment_length.to_string());
    row.extend(primer_fields(&pair.forward));
    row.extend(primer_fields(&pair.reverse));
    row.push(pair.reverse_complement.clone());
    row.push(fmt_bool(pair.gc_clamp_rc).to_string());
    row.push(pair.gc_last_thirty_percent_rc.to_string());
    row.push(pair.amplicon_size.to_string());
    row.push(fmt_float(pair.amplicon_score));
    row.push(fmt_float(pair.total_score));
    row
}

/// Write one or more OGs' pairs to a single table. With no pairs at all the
/// file is created empty, without a header.
pub fn write_pairs<'a, I>(path: &Path, groups: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a OgMetadata, &'a [PrimerPair])>,
{
    let groups: Vec<_> = groups.into_iter().filter(|(_, pairs)| !pairs.is_empty()).collect();
    if groups.is_empty() {
        File::create(path).with_context(|| format!("creating {}", path.display()))?.flush()?;
        return Ok(0);
    }
    let mut w = tsv_writer(path)?;
    w.write_record(pair_header())?;
    let mut n = 0;
    for (og, pairs) in groups {
        for pair in pairs {
            w.write_record(pair_row(og, pair))?;
            n += 1;
        }
    }
    w.flush()?;
    Ok(n)
}

/// `<out_dir>/<input stem>_stat_primer.tsv`
pub fn evaluated_output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("primers");
    out_dir.join(format!("{stem}_stat_primer.tsv"))
}

/// Input path with its `.tsv` extension replaced by `_couple.tsv`.
pub fn pairs_output_path(input: &Path) -> PathBuf {
    let name = input.file_name().and_then(|s| s.to_str()).unwrap_or("primers.tsv");
    let base = name.strip_suffix(".tsv").unwrap_or(name);
    input.with_file_name(format!("{base}_couple.tsv"))
}

/// Length of the OG's alignment in `dir`: the first file (by name) starting
/// with the OG id, up to its first `_`. A missing `dir` means no alignment.
pub fn alignment_length(dir: &Path, og_id: &str) -> Result<AlignmentLength> {
    let prefix = og_id.split('_').next().unwrap_or(og_id);
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("alignment folder {} not found; sizes reported as None", dir.display());
            return Ok(AlignmentLength::Unknown);
        }
        Err(e) => return Err(e).with_context(|| format!("listing {}", dir.display())),
    };
    let mut names: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.file_name().and_then(|s| s.to_str()).is_some_and(|n| n.starts_with(prefix)))
        .collect();
    names.sort();
    let Some(path) = names.first() else { return Ok(AlignmentLength::Unknown) };

    let reader = fasta::Reader::from_file(path).with_context(|| format!("opening {}", path.display()))?;
    let mut sizes = BTreeSet::new();
    for rec in reader.records() {
        let rec = rec.with_context(|| format!("reading {}", path.display()))?;
        sizes.insert(rec.seq().len());
    }
    Ok(match sizes.len() {
        0 => AlignmentLength::Unknown,
        1 => AlignmentLength::Uniform(sizes.into_iter().next().unwrap_or_default()),
        _ => AlignmentLength::Ragged,
    })
}

#[cfg(test)]
mod tsv_tests {
    use super::*;
    use std::fs;

    const MINER_HEADER: &str = "Pos\tNumberSpanning\tUniqueMers\tEntropy\tPrimerDeg\tPrimerSeq\tPrimerMatching\n";

    fn sample_primer() -> EvaluatedPrimer {
        EvaluatedPrimer {
            og_id: "OG9".into(),
            sequence: "ACGTRCGTACGTACGTGC".into(),
            position: 120,
            match_count: 9,
            degeneracy: 2,
            match_percentage: 90.0,
            score_percentage_nm: 10.0,
            tm_max: 58,
            tm_min: 56,
            gc_fraction: 52.78,
            gc_max: 61.11,
            gc_min: 50.0,
            gc_in_last_thirty_percent: 3,
            ends_with_t: false,
            self_complementary: false,
            gc_clamp: true,
        }
    }

    fn sample_og() -> OgMetadata {
        OgMetadata {
            og_id: "OG9".into(),
            total_sequences: 10,
            species_count: "8".into(),
            percent_single_copy: "97.5".into(),
            gene_name: "gyrB".into(),
        }
    }

    #[test]
    fn python_style_values() {
        assert_eq!(fmt_float(90.0), "90.0");
        assert_eq!(fmt_float(0.23), "0.23");
        assert_eq!(fmt_float(13.33), "13.33");
        assert_eq!(fmt_bool(true), "True");
    }

    #[test]
    fn og_id_is_taken_from_file_name() {
        assert_eq!(og_id_from_path(Path::new("dir/concatenated_OG42.tsv")).unwrap(), "OG42");
        assert_eq!(og_id_from_path(Path::new("x_12345_more.tsv")).unwrap(), "12345");
        assert!(og_id_from_path(Path::new("nounderscore.tsv")).is_err());
        assert!(og_id_from_path(Path::new("trailing_.tsv")).is_err());
    }

    #[test]
    fn output_paths() {
        assert_eq!(
            evaluated_output_path(Path::new("out"), Path::new("in/concatenated_OG1.tsv")),
            PathBuf::from("out/concatenated_OG1_stat_primer.tsv")
        );
        assert_eq!(
            pairs_output_path(Path::new("out/concatenated_OG1_stat_primer.tsv")),
            PathBuf::from("out/concatenated_OG1_stat_primer_couple.tsv")
        );
    }

    #[test]
    fn reads_miner_output() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("concatenated_OG1.tsv");
        fs::write(&p, format!("{MINER_HEADER}10\t50\t3\t0.5\t2\tacgtr\t45\n11\t50\t1\t0.1\t1\tCGTAA\t48\n")).unwrap();
        let c = read_candidates(&p).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0], PrimerCandidate { position: 10, sequence: "ACGTR".into(), match_count: 45, degeneracy: 2 });
        assert_eq!(c[1].match_count, 48);
    }

    #[test]
    fn short_miner_row_fails_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("concatenated_OG1.tsv");
        fs::write(&p, format!("{MINER_HEADER}10\t50\t3\t0.5\t2\tACGTR\n")).unwrap();
        let err = read_candidates(&p).unwrap_err();
        let rec = err.downcast_ref::<RecordError>().unwrap();
        assert!(matches!(rec, RecordError::MissingColumn { column: 6, .. }));
    }

    #[test]
    fn og_table_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("og.tsv");
        let header = (0..12).map(|i| format!("c{i}")).collect::<Vec<_>>().join("\t");
        let good = "OG1\tx\tx\tx\t99.1\tx\tx\tx\trpoB\t14\tx\t20";
        let bad = "OG2\tx\tx\tx\t99.1\tx\tx\tx\trpoC\t14\tx\tmany";
        fs::write(&p, format!("{header}\n{good}\n{bad}\n")).unwrap();
        let t = read_og_table(&p).unwrap();
        assert_eq!(t.len(), 1);
        let og = &t["OG1"];
        assert_eq!(og.total_sequences, 20);
        assert_eq!(og.species_count, "14");
        assert_eq!(og.percent_single_copy, "99.1");
        assert_eq!(og.gene_name, "rpoB");
    }

    #[test]
    fn evaluated_table_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("concatenated_OG9_stat_primer.tsv");
        let og = sample_og();
        let primer = sample_primer();
        write_evaluated(&p, &og, &[primer.clone()]).unwrap();

        let text = fs::read_to_string(&p).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), EVALUATED_HEADER.join("\t"));
        assert_eq!(
            lines.next().unwrap(),
            "OG9\t10\t8\t97.5\tgyrB\tACGTRCGTACGTACGTGC\t120\t18\t9\t90.0\t10.0\t2\t58.0\t56.0\t52.78\t61.11\t50.0\t3\tFalse\tFalse\tTrue"
        );

        let groups = read_evaluated(&p).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].og, og);
        assert_eq!(groups[0].primers, vec![primer]);
    }

    #[test]
    fn evaluated_reader_rejects_bad_primer() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.tsv");
        let mut row = evaluated_row(&sample_og(), &sample_primer());
        row[5] = "ACGU".into();
        fs::write(&p, format!("{}\n{}\n", EVALUATED_HEADER.join("\t"), row.join("\t"))).unwrap();
        let err = read_evaluated(&p).unwrap_err();
        assert!(matches!(err.downcast_ref::<RecordError>(), Some(RecordError::InvalidSymbol { index: 3, .. })));
    }

    #[test]
    fn pair_table_layout() {
        let h = pair_header();
        assert_eq!(h.len(), 6 + 16 * 2 + 6);
        assert_eq!(h[5], "Alignment_size");
        assert_eq!(h[6], "Primer_A");
        assert_eq!(h[22], "Primer_B");
        assert_eq!(h[37], "GC_clamp_B");
        assert_eq!(h.last().unwrap(), "Total_score");

        let pair = PrimerPair {
            forward: sample_primer(),
            reverse: sample_primer(),
            alignment_length: AlignmentLength::Uniform(1500),
            reverse_complement: "GCACGTACGTACGYACGT".into(),
            gc_clamp_rc: false,
            gc_last_thirty_percent_rc: 2,
            amplicon_size: 200,
            amplicon_score: 2.27,
            total_score: 12.27,
        };
        let row = pair_row(&sample_og(), &pair);
        assert_eq!(row.len(), h.len());
        assert_eq!(row[5], "1500");
        assert_eq!(row[38], "GCACGTACGTACGYACGT");
        assert_eq!(&row[41..], ["200", "2.27", "12.27"]);
    }

    #[test]
    fn empty_pair_table_is_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("x_couple.tsv");
        let og = sample_og();
        let n = write_pairs(&p, [(&og, &[][..])]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(fs::read_to_string(&p).unwrap(), "");
    }

    #[test]
    fn alignment_length_from_fasta() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OG5_aligned.fasta"), ">a\nAC-GT\n>b\nACGGT\n").unwrap();
        fs::write(dir.path().join("OG6_aligned.fasta"), ">a\nAC-GT\n>b\nACGT\n").unwrap();
        assert_eq!(alignment_length(dir.path(), "OG5").unwrap(), AlignmentLength::Uniform(5));
        assert_eq!(alignment_length(dir.path(), "OG6_extra").unwrap(), AlignmentLength::Ragged);
        assert_eq!(alignment_length(dir.path(), "OG7").unwrap(), AlignmentLength::Unknown);
    }

    #[test]
    fn missing_alignment_folder_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_folder");
        assert_eq!(alignment_length(&missing, "OG5").unwrap(), AlignmentLength::Unknown);
    }
}
