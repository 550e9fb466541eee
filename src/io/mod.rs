/// Input/output helpers shared by every run mode
pub mod hits;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Error;

/// Open a plain or gzip-compressed text input.
///
/// Compression is detected from the file extension.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>, Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let path_str = path.to_string_lossy();
    let is_gzipped = path_str.ends_with(".gz") || path_str.ends_with(".gzip");

    if is_gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Create (truncate) an output file behind a buffered writer.
pub fn create_output(path: &Path) -> Result<BufWriter<File>, Error> {
    let file = File::create(path).map_err(|e| Error::io(e, path))?;
    Ok(BufWriter::new(file))
}
