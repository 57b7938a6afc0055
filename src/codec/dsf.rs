//! Morph descriptor (`.dsf`) codec.
//!
//! A descriptor is a JSON document, gzip-compressed or plain, whose
//! `modifier_library[0].morph` entry carries the displacement payload
//! metadata this engine owns: `deltas.count`, `deltas.values`,
//! `vertex_count` and the `hd_url` pointing at the companion `.dhdm`.
//! Everything else in the document belongs to the template.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::codec::dhdm::read_dhdm_level;
use crate::displacement::DisplacementSet;
use crate::error::{IoResultExt, MorphError, MorphResult};
use crate::matching::map_io::read_maybe_gzip;

/// Load a descriptor document, sniffing for gzip compression.
pub fn load_descriptor(path: &Path) -> MorphResult<Value> {
    let text = read_maybe_gzip(path)?;
    serde_json::from_str(&text).map_err(|e| MorphError::InvalidTemplate {
        reason: format!("\"{}\" is not valid JSON: {}", path.display(), e),
    })
}

/// Serialize a descriptor back to disk, four-space indented, optionally
/// gzip-compressed. Temp-file + rename: no partial artifact on failure.
pub fn write_descriptor(path: &Path, document: &Value, with_gzip: bool) -> MorphResult<()> {
    let mut text = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut text, formatter);
    serde::Serialize::serialize(document, &mut serializer).map_err(|e| {
        MorphError::InvalidTemplate {
            reason: format!("descriptor serialization failed: {}", e),
        }
    })?;

    let tmp = path.with_extension("dsf.tmp");
    {
        let mut file = File::create(&tmp).at_path(&tmp)?;
        if with_gzip {
            let mut encoder = GzEncoder::new(&mut file, Compression::default());
            encoder.write_all(&text).at_path(&tmp)?;
            encoder.finish().at_path(&tmp)?;
        } else {
            file.write_all(&text).at_path(&tmp)?;
        }
        file.sync_all().at_path(&tmp)?;
    }
    std::fs::rename(&tmp, path).at_path(path)?;
    Ok(())
}

fn invalid(reason: impl Into<String>) -> MorphError {
    MorphError::InvalidTemplate {
        reason: reason.into(),
    }
}

/// `modifier_library[0].morph`, or `InvalidTemplate`.
fn morph_entry(document: &Value) -> MorphResult<&Value> {
    document
        .get("modifier_library")
        .and_then(|lib| lib.get(0))
        .and_then(|entry| entry.get("morph"))
        .ok_or_else(|| invalid("no modifier_library[0].morph entry"))
}

fn morph_entry_mut(document: &mut Value) -> MorphResult<&mut Value> {
    document
        .get_mut("modifier_library")
        .and_then(|lib| lib.get_mut(0))
        .and_then(|entry| entry.get_mut("morph"))
        .ok_or_else(|| invalid("no modifier_library[0].morph entry"))
}

/// Inject a freshly computed displacement set into the descriptor's
/// `deltas` entry. The entry must already exist in the template.
pub fn inject_deltas(document: &mut Value, set: &DisplacementSet) -> MorphResult<()> {
    let morph = morph_entry_mut(document)?;
    let deltas = morph
        .get_mut("deltas")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| invalid("no modifier_library[0].morph.deltas object"))?;
    deltas.insert("count".to_string(), Value::from(set.count()));
    deltas.insert("values".to_string(), set.values_json());
    Ok(())
}

/// The morph's declared base vertex count. `None` when the descriptor
/// describes no geometry.
pub fn descriptor_vertex_count(document: &Value) -> Option<i64> {
    morph_entry(document)
        .ok()?
        .get("vertex_count")
        .and_then(Value::as_i64)
}

/// The library identifier of the first modifier entry.
pub fn descriptor_id(document: &Value) -> Option<&str> {
    document
        .get("modifier_library")?
        .get(0)?
        .get("id")
        .and_then(Value::as_str)
}

/// The asset identifier, stripped to its file stem.
pub fn descriptor_asset_id(document: &Value) -> Option<String> {
    let id = document.get("asset_info")?.get("id").and_then(Value::as_str)?;
    let name = id.rsplit('/').next().unwrap_or(id);
    Some(name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name).to_string())
}

/// Set `vertex_count` on the morph entry.
pub fn set_vertex_count(document: &mut Value, vertex_count: usize) -> MorphResult<()> {
    let morph = morph_entry_mut(document)?
        .as_object_mut()
        .ok_or_else(|| invalid("morph entry is not an object"))?;
    morph.insert("vertex_count".to_string(), Value::from(vertex_count));
    Ok(())
}

/// Point the morph's `hd_url` at the companion `.dhdm` next to the
/// descriptor's own asset URL.
pub fn set_hd_url(document: &mut Value, url: &str) -> MorphResult<()> {
    let morph = morph_entry_mut(document)?
        .as_object_mut()
        .ok_or_else(|| invalid("morph entry is not an object"))?;
    morph.insert("hd_url".to_string(), Value::from(url));
    Ok(())
}

/// The full asset URL with its extension stripped, the base for the
/// companion `.dhdm` URL.
pub fn asset_url_stem(document: &Value) -> Option<String> {
    let id = document.get("asset_info")?.get("id").and_then(Value::as_str)?;
    Some(id.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(id).to_string())
}

/// Deduplicate scene-level modifier references that collide with the
/// library identifiers being renamed, by appending a running counter.
pub fn uniquify_scene_modifier_ids(document: &mut Value, ids: &[&str]) {
    let Some(modifiers) = document
        .get_mut("scene")
        .and_then(|scene| scene.get_mut("modifiers"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    let mut n = 0;
    for entry in modifiers {
        let Some(id) = entry.get("id").and_then(Value::as_str) else {
            continue;
        };
        if ids.contains(&id) {
            let unique = format!("{}-{}", id, n);
            entry["id"] = Value::from(unique);
            n += 1;
        }
    }
}

/// Relabel the channel of every library entry whose identifier matches.
pub fn relabel_channels(document: &mut Value, ids: &[&str], new_label: &str) {
    let Some(library) = document
        .get_mut("modifier_library")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for entry in library {
        let has_label = entry
            .get("channel")
            .map_or(false, |channel| channel.get("label").is_some());
        if !has_label {
            continue;
        }
        let matches = entry
            .get("id")
            .and_then(Value::as_str)
            .map_or(false, |id| ids.contains(&id));
        if matches {
            entry["channel"]["label"] = Value::from(new_label);
        }
    }
}

/// Validate a template against the base mesh it will describe: a
/// declared vertex count of -1 (or no declaration) accepts any mesh.
pub fn validate_template_vertex_count(document: &Value, base_vertex_count: usize) -> MorphResult<()> {
    match descriptor_vertex_count(document) {
        None | Some(-1) => Ok(()),
        Some(v) if v == base_vertex_count as i64 => Ok(()),
        Some(v) => Err(invalid(format!(
            "template vertex count {} does not match base mesh's {}",
            v, base_vertex_count
        ))),
    }
}

/// Subdivision level of the morph this descriptor references: follows
/// `morph.hd_url` to the companion `.dhdm` next to the descriptor and
/// reads its header. A descriptor with no `hd_url` is a base-resolution
/// morph, level 0.
pub fn descriptor_level(path: &Path) -> MorphResult<u32> {
    let document = load_descriptor(path)?;
    let Some(hd_url) = morph_entry(&document)
        .ok()
        .and_then(|m| m.get("hd_url"))
        .and_then(Value::as_str)
    else {
        return Ok(0);
    };
    let file_name = hd_url.rsplit('/').next().unwrap_or(hd_url);
    let file_name = percent_decode(file_name);
    let dhdm_path: PathBuf = match path.parent() {
        Some(parent) => parent.join(&file_name),
        None => PathBuf::from(&file_name),
    };
    read_dhdm_level(&dhdm_path)
}

/// Replace every standalone occurrence of `old_id` in serialized
/// descriptor text. Standalone means delimited by a non-word character
/// (or the text boundary) on both sides; occurrences embedded in larger
/// words or hyphenated compounds (`abc-link`) are untouched, since DAZ
/// identifiers may themselves carry hyphens. The identifier appears both
/// as structured fields and inside cross-reference URL strings, which is
/// why this operates on the serialized text rather than the JSON tree.
pub fn rename_identifier(text: &str, old_id: &str, new_id: &str) -> String {
    if old_id.is_empty() {
        return text.to_string();
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '-';
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut offset = 0;
    while let Some(found) = rest.find(old_id) {
        let start = offset + found;
        let end = start + old_id.len();
        let before_ok = text[..start].chars().next_back().map_or(true, |c| !is_word(c));
        let after_ok = text[end..].chars().next().map_or(true, |c| !is_word(c));
        out.push_str(&rest[..found]);
        if before_ok && after_ok {
            out.push_str(new_id);
        } else {
            out.push_str(old_id);
        }
        rest = &rest[found + old_id.len()..];
        offset = end;
    }
    out.push_str(rest);
    out
}

/// Decode %XX escapes. Malformed escapes pass through untouched.
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode a DAZ content path, keeping `/` and `#` literal.
pub fn percent_encode_path(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'/' | b'#' | b'-' | b'_' | b'.' | b'~');
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
