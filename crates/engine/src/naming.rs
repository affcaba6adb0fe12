use std::path::Path;

/// Containers accepted for upload.
pub const SUPPORTED_CONTAINERS: [&str; 3] = ["mp4", "mov", "avi"];

/// Container every clip is re-encoded to.
pub const CLIP_CONTAINER: &str = "mp4";

pub const ARCHIVE_FILENAME: &str = "clips.zip";

pub fn is_supported_container(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SUPPORTED_CONTAINERS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Reduce an uploaded file name to its final path component so it cannot
/// escape the upload directory. Returns `None` if nothing usable is left.
pub fn sanitize_upload_name(file_name: &str) -> Option<String> {
    let name = file_name.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Stem used as the base of every clip name, `"video"` if the path has none.
pub fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video")
        .to_string()
}

/// `{stem}_clip_{n}.mp4` with `n` 1-based. `index` is the 0-based interval index.
pub fn clip_file_name(stem: &str, index: usize) -> String {
    format!("{}_clip_{}.{}", stem, index + 1, CLIP_CONTAINER)
}

/// Names for a run of `count` clips, in interval order.
pub fn clip_file_names(stem: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| clip_file_name(stem, i)).collect()
}

/// Lay clips out row by row, `columns` per row. Clip `i` lands in column
/// `i % columns`.
pub fn grid_layout<T: Clone>(items: &[T], columns: usize) -> Vec<Vec<T>> {
    if columns == 0 {
        return vec![items.to_vec()];
    }
    items.chunks(columns).map(|row| row.to_vec()).collect()
}
