use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::Error;
use crate::genome::{SequencePool, SequenceRecord};
use crate::io::{create_output, open_input};

/// Parse `key=value` traits from a FASTA description.
///
/// Returns the abundance (`multi`) and whether the sequence is flagged
/// circular (`flag=3`). A missing `multi` means abundance 0.
fn parse_traits(description: &str, header: &str) -> Result<(f64, bool), Error> {
    let mut abundance = 0.0;
    let mut circular = false;

    for token in description.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "multi" => {
                abundance = value.parse::<f64>().map_err(|_| {
                    Error::Fasta(format!("invalid multi value '{value}' in header '{header}'"))
                })?;
                if abundance < 0.0 {
                    return Err(Error::Fasta(format!(
                        "negative multi value in header '{header}'"
                    )));
                }
            }
            "flag" => circular = value == "3",
            _ => {}
        }
    }

    Ok((abundance, circular))
}

/// Read FASTA records from any buffered reader.
///
/// `source` is used in error messages only.
pub fn read_fasta<R: BufRead>(reader: R, source: &str) -> Result<Vec<SequenceRecord>, Error> {
    let mut records = Vec::new();
    let mut current: Option<SequenceRecord> = None;

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| Error::io(e, source))?;
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        if let Some(stripped) = line.strip_prefix('>') {
            if let Some(rec) = current.take() {
                records.push(rec);
            }

            let mut parts = stripped.splitn(2, char::is_whitespace);
            let id = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    Error::Fasta(format!(
                        "empty sequence name at {}:{}",
                        source,
                        line_num + 1
                    ))
                })?
                .to_string();
            let (abundance, circular) = parse_traits(parts.next().unwrap_or(""), stripped)?;

            let mut rec = SequenceRecord::new(id, Vec::new(), abundance);
            rec.circular = circular;
            current = Some(rec);
        } else {
            let Some(rec) = current.as_mut() else {
                return Err(Error::Fasta(format!(
                    "sequence data before first header at {}:{}",
                    source,
                    line_num + 1
                )));
            };

            rec.residues.extend(
                line.bytes()
                    .filter(|b| !b.is_ascii_whitespace() && *b >= 32)
                    .map(|b| b.to_ascii_uppercase()),
            );
        }
    }

    if let Some(rec) = current {
        records.push(rec);
    }

    Ok(records)
}

/// Parse a (possibly gzipped) FASTA file into a sequence pool.
pub fn parse_fasta_file(path: &Path) -> Result<SequencePool, Error> {
    let reader = open_input(path)?;
    let records = read_fasta(reader, &path.display().to_string())?;
    if records.is_empty() {
        return Err(Error::EmptyInput(format!(
            "no sequences found in {}",
            path.display()
        )));
    }
    Ok(SequencePool::new(records))
}

/// Write records with `flag=`, `multi=` and `len=` traits in the header.
pub fn write_fasta<'a, W: Write>(
    mut writer: W,
    records: impl IntoIterator<Item = &'a SequenceRecord>,
) -> std::io::Result<()> {
    for rec in records {
        writeln!(
            writer,
            ">{} flag={} multi={} len={}",
            rec.id,
            rec.flag(),
            rec.abundance,
            rec.len()
        )?;
        for chunk in rec.residues.chunks(70) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()
}

/// Write a pool to a FASTA file.
pub fn write_fasta_file<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a SequenceRecord>,
) -> Result<(), Error> {
    let writer = create_output(path)?;
    write_fasta(writer, records).map_err(|e| Error::io(e, path))
}
