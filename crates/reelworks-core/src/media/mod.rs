//! Media File Identification Module
//!
//! Extension-based file-type sniffing, image sequence resource naming,
//! and cache-key derivation for media files. These helpers are shared by
//! the importer, the render queue and the headless helper processes, so
//! they must never touch the files' contents.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::CoreResult;

// =============================================================================
// Media Types
// =============================================================================

/// Media type of a file, as determined by extension sniffing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    /// Numbered frame-file pattern (`clip%04d.png`), no single file on disk
    ImageSequence,
    Unknown,
    FileDoesNotExist,
}

/// Returns the media type of a path, with the image-sequence heuristics
/// applied for resource paths that do not exist on disk.
pub fn media_type_for_path<P: AsRef<Path>>(path: P) -> MediaType {
    let path = path.as_ref();
    if !path.exists() {
        // Image sequence media carries a printf-style resource path that
        // never points at a real file; detect those before giving up.
        let path_str = path.to_string_lossy();
        if path_str.contains("%0") && path_str.contains("d.") {
            return MediaType::ImageSequence;
        }
        if path_str.contains(".all") {
            return MediaType::ImageSequence;
        }
        return MediaType::FileDoesNotExist;
    }

    match file_type(path) {
        "video" => MediaType::Video,
        "audio" => MediaType::Audio,
        "image" => MediaType::Image,
        _ => MediaType::Unknown,
    }
}

/// Returns "video", "audio", "image" or "unknown" for a path, by extension.
pub fn file_type<P: AsRef<Path>>(path: P) -> &'static str {
    let Some(ext) = extension_lowercase(path.as_ref()) else {
        return "unknown";
    };
    if VIDEO_FILE_EXTENSIONS.contains(&ext.as_str()) {
        return "video";
    }
    if AUDIO_FILE_EXTENSIONS.contains(&ext.as_str()) {
        return "audio";
    }
    if GRAPHICS_FILE_EXTENSIONS.contains(&ext.as_str()) {
        return "image";
    }
    "unknown"
}

/// Checks whether a path has a known media extension of any kind.
pub fn is_media_file<P: AsRef<Path>>(path: P) -> bool {
    file_type(path) != "unknown"
}

/// Checks whether an extension (with or without leading dot) is a
/// graphics file extension.
pub fn is_graphics_file_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    GRAPHICS_FILE_EXTENSIONS.contains(&ext.as_str())
}

/// Checks whether a path is an MLT XML composition file.
pub fn is_mlt_xml_file<P: AsRef<Path>>(path: P) -> bool {
    matches!(
        extension_lowercase(path.as_ref()).as_deref(),
        Some("xml") | Some("mlt")
    )
}

// =============================================================================
// Image Sequences
// =============================================================================

/// Builds a printf-style resource name from a numbered frame file.
///
/// `frame0001.png` becomes `frame%04d.png`, keyed on the *last* digit run
/// in the file name. Returns `None` when the name carries no digits and
/// therefore cannot belong to a sequence.
pub fn image_sequence_resource_name(frame_file: &str) -> Option<String> {
    let file_name = Path::new(frame_file).file_name()?.to_string_lossy();

    let digits = Regex::new("[0-9]+").ok()?;
    let number_part = digits.find_iter(&file_name).last()?;

    let head = &file_name[..number_part.start()];
    let tail = &file_name[number_part.end()..];
    Some(format!(
        "{}%0{}d{}",
        head,
        number_part.as_str().len(),
        tail
    ))
}

/// Turns a printf-style sequence resource name into a glob pattern for
/// frame lookup (`frame%04d.png` -> `frame*.png`). Trailing producer
/// parameters after `?` are dropped.
pub fn image_sequence_glob_name(resource_name: &str) -> Option<String> {
    let (start, rest) = resource_name.split_once('%')?;
    let (_, end) = rest.split_once('d')?;
    let end = end.split('?').next().unwrap_or(end);
    Some(format!("{}*{}", start, end))
}

// =============================================================================
// Cache Naming
// =============================================================================

/// Derives a stable cache file name for a media file's audio levels data.
///
/// The digest covers the media path, its byte size and the profile
/// description, so a replaced or re-encoded file gets a fresh cache entry.
pub fn audio_levels_cache_name<P: AsRef<Path>>(
    media_file: P,
    profile_description: &str,
) -> CoreResult<String> {
    let media_file = media_file.as_ref();
    let size = std::fs::metadata(media_file)?.len();

    let mut hasher = Sha256::new();
    hasher.update(media_file.to_string_lossy().as_bytes());
    hasher.update(size.to_string().as_bytes());
    hasher.update(profile_description.as_bytes());

    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

// =============================================================================
// Extension Tables
// =============================================================================

pub const AUDIO_FILE_EXTENSIONS: &[&str] = &[
    "act", "aif", "aiff", "alfc", "aac", "alac", "amr", "atrac", "awb", "dct", "dss", "dvf",
    "flac", "gsm", "iklax", "m4a", "m4p", "mka", "mmf", "mp2", "mp3", "mpc", "msv", "ogg", "oga",
    "opus", "pcm", "u16be", "u16le", "u24be", "u24le", "u32be", "u32le", "u8", "ra", "rm", "raw",
    "tta", "vox", "wav", "wma", "wavpack",
];

pub const GRAPHICS_FILE_EXTENSIONS: &[&str] = &[
    "bmp", "tiff", "tif", "gif", "tga", "png", "pgm", "jpeg", "jpg", "svg",
];

pub const VIDEO_FILE_EXTENSIONS: &[&str] = &[
    "avi", "dv", "flv", "mkv", "mpg", "mpeg", "m2t", "mov", "mp4", "qt", "vob", "webm", "3gp",
    "3g2", "asf", "divx", "dirac", "f4v", "h264", "hdmov", "hdv", "m2p", "m2ts", "m2v", "m4e",
    "mlt", "mjpg", "mp4v", "mts", "m21", "m4v", "mj2", "m1v", "mpv", "mxf", "mpegts", "mpegtsraw",
    "mpegvideo", "nsv", "ogv", "ogx", "ps", "ts", "tsv", "tsa", "vfw", "video", "wtv", "wm", "wmv",
    "xvid", "y4m", "yuv", "xml",
];
