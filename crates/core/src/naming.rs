//! Backend naming conventions.
//!
//! Job ids, artifact filenames, and session ids all follow fixed
//! grammars minted by the backend. Everything here is pure string work;
//! keeping the grammar in one place means history reconstruction and
//! the conversion tracker agree on what an artifact is called.
//!
//! Grammars:
//!   job id            `single_{unix}` | `batch_{index}`
//!   artifact file     `moshed_{artifact_id}.avi`
//!   converted file    `moshed_{artifact_id}_converted.{ext}`
//!   preview file      `preview_{artifact_id}.jpg`
//!   clip file         `clip_{start}_{end}.avi`
//!   session id        `session_{unix}`
//!   conversion job id `convert_{filename}_{format}_{unix}`

use crate::job::ConvertFormat;

const MOSHED_PREFIX: &str = "moshed_";
const MOSHED_SUFFIX: &str = ".avi";
const CONVERTED_MARKER: &str = "_converted";
const PREVIEW_PREFIX: &str = "preview_";
const CLIP_PREFIX: &str = "clip_";
const SESSION_PREFIX: &str = "session_";
const CONVERT_PREFIX: &str = "convert_";

/// Extract the artifact id from a moshed output filename.
///
/// `moshed_single_1749018199.avi` → `single_1749018199`. The path may
/// carry directories; only the final component is inspected. Returns
/// `None` for names outside the grammar.
pub fn artifact_id_from_filename(path: &str) -> Option<&str> {
    let name = file_name(path);
    let stem = name.strip_prefix(MOSHED_PREFIX)?.strip_suffix(MOSHED_SUFFIX)?;
    if stem.is_empty() || stem.ends_with(CONVERTED_MARKER) {
        return None;
    }
    Some(stem)
}

/// Filename of a mosh artifact: `moshed_{artifact_id}.avi`.
pub fn artifact_filename(artifact_id: &str) -> String {
    format!("{MOSHED_PREFIX}{artifact_id}{MOSHED_SUFFIX}")
}

/// Filename of a converted artifact:
/// `moshed_{artifact_id}_converted.{ext}`.
pub fn converted_filename(artifact_id: &str, format: ConvertFormat) -> String {
    format!(
        "{MOSHED_PREFIX}{artifact_id}{CONVERTED_MARKER}.{}",
        format.extension()
    )
}

/// Filename of an artifact's preview image: `preview_{artifact_id}.jpg`.
pub fn preview_filename(artifact_id: &str) -> String {
    format!("{PREVIEW_PREFIX}{artifact_id}.jpg")
}

/// Filename of an extracted clip: `clip_{start}_{end}.avi`.
pub fn clip_filename(start_frame: u32, end_frame: u32) -> String {
    format!("{CLIP_PREFIX}{start_frame}_{end_frame}{MOSHED_SUFFIX}")
}

/// Parse `(start_frame, end_frame)` out of a clip filename.
pub fn clip_frames_from_filename(path: &str) -> Option<(u32, u32)> {
    let name = file_name(path);
    let stem = name.strip_prefix(CLIP_PREFIX)?.strip_suffix(MOSHED_SUFFIX)?;
    let (start, end) = stem.split_once('_')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Session id minted from a creation timestamp: `session_{unix}`.
pub fn session_id_from_timestamp(unix_secs: i64) -> String {
    format!("{SESSION_PREFIX}{unix_secs}")
}

/// Conversion job id: `convert_{filename}_{format}_{unix}`.
pub fn conversion_job_id(filename: &str, format: ConvertFormat, unix_secs: i64) -> String {
    format!("{CONVERT_PREFIX}{filename}_{format}_{unix_secs}")
}

/// Split a conversion job id back into `(filename, format)`.
///
/// The filename itself contains underscores, so the id is parsed from
/// the right: the trailing component is the mint timestamp and the one
/// before it the format token.
pub fn parse_conversion_job_id(job_id: &str) -> Option<(&str, ConvertFormat)> {
    let body = job_id.strip_prefix(CONVERT_PREFIX)?;
    let (body, unix) = body.rsplit_once('_')?;
    unix.parse::<i64>().ok()?;
    let (filename, format) = body.rsplit_once('_')?;
    if filename.is_empty() {
        return None;
    }
    Some((filename, ConvertFormat::parse(format)?))
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
