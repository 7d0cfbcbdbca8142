//! Gene lengths from a GTF annotation.
//!
//! Length-aware count normalisations (TPM, FPKM) need one length per gene.
//! The length of a gene is the number of bases covered by the union of its
//! exons, so overlapping exons from different transcripts count once.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use ldata_core::{LDataError, Result};

/// Union-of-exons length for every `gene_id` in a GTF file, in order of
/// first appearance.
pub fn gene_lengths(path: impl AsRef<Path>) -> Result<IndexMap<String, f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        LDataError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let reader = BufReader::new(file);

    let mut exons: IndexMap<String, Vec<(u64, u64)>> = IndexMap::new();
    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| {
            LDataError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: line {}: {}", path.display(), line_num + 1, e),
            ))
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((gene_id, interval)) = parse_exon_line(line, line_num + 1, path)? {
            exons.entry(gene_id).or_default().push(interval);
        }
    }

    Ok(exons
        .into_iter()
        .map(|(gene, intervals)| (gene, union_length(intervals) as f64))
        .collect())
}

/// Gene id and 0-based half-open interval of an exon line; `None` for
/// other feature types.
fn parse_exon_line(line: &str, line_num: usize, path: &Path) -> Result<Option<(String, (u64, u64))>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 9 {
        return Err(LDataError::Parse(format!(
            "{}: line {}: expected 9 tab-separated columns, found {}",
            path.display(),
            line_num,
            fields.len()
        )));
    }
    if fields[2] != "exon" {
        return Ok(None);
    }

    let coordinate = |field: &str, what: &str| {
        field.parse::<u64>().map_err(|_| {
            LDataError::Parse(format!(
                "{}: line {}: invalid {what} '{field}'",
                path.display(),
                line_num
            ))
        })
    };
    // 1-based closed → 0-based half-open.
    let start = coordinate(fields[3], "start")?.saturating_sub(1);
    let end = coordinate(fields[4], "end")?;
    if end < start {
        return Err(LDataError::Parse(format!(
            "{}: line {}: end {end} before start {}",
            path.display(),
            line_num,
            start + 1
        )));
    }

    let mut attrs = parse_attributes(fields[8]);
    let gene_id = attrs.remove("gene_id").ok_or_else(|| {
        LDataError::Parse(format!(
            "{}: line {}: exon without gene_id",
            path.display(),
            line_num
        ))
    })?;
    Ok(Some((gene_id, (start, end))))
}

/// Parse `key "value";` pairs.
fn parse_attributes(attr_str: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for pair in attr_str.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        if let Some(space_pos) = pair.find(char::is_whitespace) {
            let key = pair[..space_pos].trim();
            let value = pair[space_pos..].trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            attrs.insert(key.to_string(), value.to_string());
        }
    }
    attrs
}

/// Bases covered by a set of half-open intervals.
fn union_length(mut intervals: Vec<(u64, u64)>) -> u64 {
    intervals.sort_unstable();
    let mut total = 0;
    let mut current: Option<(u64, u64)> = None;
    for (start, end) in intervals {
        current = match current {
            Some((s, e)) if start <= e => Some((s, e.max(end))),
            Some((s, e)) => {
                total += e - s;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((s, e)) = current {
        total += e - s;
    }
    total
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn write_gtf(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".gtf").unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    const GTF: &str = "\
#!genome-build test
chr1\ttest\tgene\t1\t1000\t.\t+\t.\tgene_id \"G1\";
chr1\ttest\texon\t1\t100\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\ttest\texon\t51\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\";
chr1\ttest\texon\t301\t400\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\";
chr2\ttest\texon\t11\t20\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T3\";
";

    #[test]
    fn union_of_exons() {
        let file = write_gtf(GTF);
        let lengths = gene_lengths(file.path()).unwrap();
        assert_eq!(lengths.len(), 2);
        assert_eq!(lengths["G1"], 250.0);
        assert_eq!(lengths["G2"], 10.0);
        assert_eq!(lengths.keys().collect::<Vec<_>>(), vec!["G1", "G2"]);
    }

    #[test]
    fn union_length_merges_touching() {
        assert_eq!(union_length(vec![(0, 10), (10, 20)]), 20);
        assert_eq!(union_length(vec![(5, 8), (0, 3)]), 6);
        assert_eq!(union_length(vec![(0, 10), (2, 4)]), 10);
        assert_eq!(union_length(Vec::new()), 0);
    }

    #[test]
    fn attributes() {
        let attrs = parse_attributes("gene_id \"G1\"; gene_name \"ABC\";  ");
        assert_eq!(attrs["gene_id"], "G1");
        assert_eq!(attrs["gene_name"], "ABC");
    }

    #[test]
    fn malformed_lines() {
        let file = write_gtf("chr1\ttest\texon\t1\n");
        assert!(matches!(gene_lengths(file.path()), Err(LDataError::Parse(_))));

        let file = write_gtf("chr1\ttest\texon\tx\t10\t.\t+\t.\tgene_id \"G1\";\n");
        let err = gene_lengths(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid start"));

        let file = write_gtf("chr1\ttest\texon\t1\t10\t.\t+\t.\ttranscript_id \"T1\";\n");
        assert!(gene_lengths(file.path()).unwrap_err().to_string().contains("gene_id"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = gene_lengths("/nonexistent/annotation.gtf").unwrap_err();
        assert!(matches!(err, LDataError::Io(_)));
    }
}
