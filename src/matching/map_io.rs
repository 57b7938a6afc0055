//! Correspondence-map persistence.
//!
//! On disk a map is a JSON object of stringified candidate index to
//! reference index, gzip-compressed on write. Reads sniff the gzip magic
//! so both compressed and plain files load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{Map, Value};

use crate::constants::GZIP_MAGIC;
use crate::error::{IoResultExt, MorphError, MorphResult};
use crate::matching::CorrespondenceMap;

/// Write a correspondence map as a gzip-compressed JSON object. The file
/// is written to a temporary sibling first and renamed into place, so a
/// failure leaves no partial artifact.
pub fn write_matching_file(path: &Path, map: &CorrespondenceMap) -> MorphResult<()> {
    let mut object = Map::with_capacity(map.len());
    for (j, &i) in map.as_slice().iter().enumerate() {
        object.insert(j.to_string(), Value::from(i));
    }
    let document = Value::Object(object);

    let tmp = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp).at_path(&tmp)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, &document)
            .map_err(|e| MorphError::io(&tmp, e.into()))?;
        encoder.finish().at_path(&tmp)?.flush().at_path(&tmp)?;
    }
    std::fs::rename(&tmp, path).at_path(path)?;
    log::info!("[Matching] file \"{}\" generated", path.display());
    Ok(())
}

/// Load a correspondence map, sniffing for gzip compression. The object
/// must be dense: every candidate index `0..N-1` present exactly once.
pub fn read_matching_file(path: &Path) -> MorphResult<CorrespondenceMap> {
    let text = read_maybe_gzip(path)?;
    let document: Value = serde_json::from_str(&text).map_err(|e| MorphError::CorruptMatchingFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let object = document
        .as_object()
        .ok_or_else(|| corrupt(path, "top-level value is not an object"))?;

    let mut map = vec![u32::MAX; object.len()];
    let mut seen = vec![false; object.len()];
    for (key, value) in object {
        let j: usize = key
            .parse()
            .map_err(|_| corrupt(path, format!("non-numeric candidate index \"{}\"", key)))?;
        if j >= map.len() {
            return Err(corrupt(
                path,
                format!("candidate index {} out of range for {} entries", j, map.len()),
            ));
        }
        if seen[j] {
            return Err(corrupt(path, format!("duplicate candidate index {}", j)));
        }
        let i = value
            .as_u64()
            .ok_or_else(|| corrupt(path, format!("non-integer reference index for key {}", j)))?;
        map[j] = i as u32;
        seen[j] = true;
    }
    Ok(CorrespondenceMap::new(map))
}

fn corrupt(path: &Path, reason: impl Into<String>) -> MorphError {
    MorphError::CorruptMatchingFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Read a whole file as UTF-8 text, decompressing when the gzip magic is
/// present.
pub(crate) fn read_maybe_gzip(path: &Path) -> MorphResult<String> {
    let mut reader = BufReader::new(File::open(path).at_path(path)?);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).at_path(path)?;

    let text = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut out = String::new();
        decoder.read_to_string(&mut out).at_path(path)?;
        out
    } else {
        String::from_utf8(bytes)
            .map_err(|e| MorphError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?
    };
    Ok(text)
}
