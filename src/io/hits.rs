/// Tabular hit readers and writers
///
/// Two producer formats are accepted:
/// - 12-column BLAST tabular output (`-outfmt 6`), tab separated
/// - nhmmer `--tblout` tables, whitespace aligned with `#` comments
///
/// Both are mapped onto [`RawHit`].
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::Error;
use crate::io::{create_output, open_input};
use crate::table::{AlignmentRecord, RawHit};

fn parse_field<T: std::str::FromStr>(
    value: &str,
    column: &str,
    source: &str,
    line: u64,
) -> Result<T, Error> {
    value.trim().parse::<T>().map_err(|_| {
        Error::Table(format!(
            "invalid {column} value '{value}' at {source}:{line}"
        ))
    })
}

/// Read 12-column tabular hits from a buffered reader.
pub fn read_tabular_hits<R: BufRead>(reader: R, source: &str) -> Result<Vec<RawHit>, Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut hits = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() < 12 {
            return Err(Error::Table(format!(
                "expected 12 columns, found {} at {source}:{line}",
                record.len()
            )));
        }

        hits.push(RawHit {
            query_id: record[0].trim().to_string(),
            target_id: record[1].trim().to_string(),
            identity_pct: parse_field(&record[2], "identity", source, line)?,
            align_len: parse_field(&record[3], "length", source, line)?,
            mismatches: parse_field(&record[4], "mismatch", source, line)?,
            gaps: parse_field(&record[5], "gap", source, line)?,
            query_start: parse_field(&record[6], "qstart", source, line)?,
            query_end: parse_field(&record[7], "qend", source, line)?,
            target_start: parse_field(&record[8], "sstart", source, line)?,
            target_end: parse_field(&record[9], "send", source, line)?,
            evalue: parse_field(&record[10], "evalue", source, line)?,
            score: parse_field(&record[11], "score", source, line)?,
        });
    }

    Ok(hits)
}

/// Read a (possibly gzipped) 12-column tabular hit file.
pub fn read_tabular_hits_file(path: &Path) -> Result<Vec<RawHit>, Error> {
    let reader = open_input(path)?;
    read_tabular_hits(reader, &path.display().to_string())
}

/// Read nhmmer `--tblout` rows.
///
/// Query coordinates are the profile (`hmmfrom`/`hmm to`), target
/// coordinates the sequence (`alifrom`/`alito`). Only the first hit of each
/// (sequence, profile) pair is kept.
pub fn read_nhmmer_tblout<R: BufRead>(reader: R, source: &str) -> Result<Vec<RawHit>, Error> {
    let mut seen = HashSet::new();
    let mut hits = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| Error::io(e, source))?;
        let line_no = line_num as u64 + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let cols: Vec<&str> = trimmed.split_whitespace().collect();
        if cols.len() < 15 {
            return Err(Error::Table(format!(
                "expected at least 15 columns, found {} at {source}:{line_no}",
                cols.len()
            )));
        }

        let target = cols[0];
        let query = cols[2];
        if !seen.insert((target.to_string(), query.to_string())) {
            continue;
        }

        let ali_from: i64 = parse_field(cols[6], "alifrom", source, line_no)?;
        let ali_to: i64 = parse_field(cols[7], "alito", source, line_no)?;

        hits.push(RawHit {
            query_id: query.to_string(),
            target_id: target.to_string(),
            identity_pct: 100.0,
            align_len: ali_from.abs_diff(ali_to) + 1,
            mismatches: 0,
            gaps: 0,
            query_start: parse_field(cols[4], "hmmfrom", source, line_no)?,
            query_end: parse_field(cols[5], "hmm to", source, line_no)?,
            target_start: ali_from,
            target_end: ali_to,
            evalue: parse_field(cols[12], "E-value", source, line_no)?,
            score: parse_field(cols[13], "score", source, line_no)?,
        });
    }

    log::info!("Profile search has {} distinct hits", hits.len());
    Ok(hits)
}

/// Read a (possibly gzipped) nhmmer `--tblout` file.
pub fn read_nhmmer_tblout_file(path: &Path) -> Result<Vec<RawHit>, Error> {
    let reader = open_input(path)?;
    read_nhmmer_tblout(reader, &path.display().to_string())
}

/// Write oriented records as CSV with a header row.
pub fn write_records_csv<'a, W: Write>(
    writer: W,
    records: impl IntoIterator<Item = &'a AlignmentRecord>,
) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write oriented records to a CSV file.
pub fn write_records_csv_file<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a AlignmentRecord>,
) -> Result<(), Error> {
    let writer = create_output(path)?;
    write_records_csv(writer, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::AlignmentTable;

    const BLAST: &str = "\
q1\tctg1\t98.5\t120\t2\t0\t1\t120\t300\t181\t1e-50\t230
q2\tctg2\t45.0\t60\t30\t1\t10\t70\t5\t64\t0.001\t40.2
";

    #[test]
    fn parse_blast_rows() {
        let hits = read_tabular_hits(BLAST.as_bytes(), "mem").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].query_id, "q1");
        assert_eq!(hits[0].target_start, 300);
        assert_eq!(hits[0].target_end, 181);
        assert!((hits[1].score - 40.2).abs() < 1e-9);
        assert_eq!(hits[1].gaps, 1);
    }

    #[test]
    fn short_blast_row_rejected() {
        let err = read_tabular_hits("a\tb\t1\n".as_bytes(), "mem").unwrap_err();
        assert!(err.to_string().contains("expected 12 columns"));
    }

    #[test]
    fn bad_number_rejected() {
        let text = "q\tt\tx\t1\t0\t0\t1\t2\t1\t2\t0\t1\n";
        let err = read_tabular_hits(text.as_bytes(), "mem").unwrap_err();
        assert!(err.to_string().contains("invalid identity"));
    }

    #[test]
    fn parse_tblout_dedups_pairs() {
        let text = "\
# target name accession query name accession hmmfrom hmm to alifrom alito envfrom envto sq len strand E-value score bias description
k141_7  -  cox1  -  1  510  100  1630  95  1640  5000  +  1e-200  700.1  3.2  some words here
k141_7  -  cox1  -  20  300  4000  3200  3990  3190  5000  -  1e-20  90.0  1.0  -
k141_9  -  nad1  -  5  300  900  30  905  25  1200  -  1e-60  210.5  0.4  -
";
        let hits = read_nhmmer_tblout(text.as_bytes(), "mem").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].query_id, "cox1");
        assert_eq!(hits[0].target_id, "k141_7");
        assert_eq!((hits[0].query_start, hits[0].query_end), (1, 510));
        assert_eq!(hits[0].align_len, 1531);
        assert_eq!(hits[1].target_start, 900);
        assert_eq!(hits[1].align_len, 871);
    }

    #[test]
    fn csv_output_has_header() {
        let hits = read_tabular_hits(BLAST.as_bytes(), "mem").unwrap();
        let table = AlignmentTable::from_raw_hits(hits);
        let mut buf = Vec::new();
        write_records_csv(&mut buf, table.iter()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "qseq,sseq,ident,length,mismatch,gap,qstart,qend,sstart,send,evalue,score,plus"
        );
        assert!(lines.next().unwrap().starts_with("q1,ctg1,98.5,120,2,0,1,120,181,300,"));
    }
}
