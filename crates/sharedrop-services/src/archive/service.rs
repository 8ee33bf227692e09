//! ZIP bundle of an upload's files and text blocks.

use anyhow::{Context, Result};
use futures::future::join_all;
use sharedrop_core::models::{StoredFile, TextBlock};
use sharedrop_storage::StorageRouter;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// Strip path components so entries cannot escape the archive root.
fn sanitize_archive_filename(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// `My Notes!` -> `My_Notes_`; blank titles fall back to `text_{n}`.
fn text_entry_name(title: &str, index: usize) -> String {
    let base: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if base.is_empty() {
        format!("text_{}.html", index + 1)
    } else {
        format!("{}.html", base)
    }
}

/// Append ` (2)`, ` (3)`, ... before the extension until the name is unused.
fn dedupe(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (name.clone(), String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Download every file and zip it with the text blocks.
///
/// Files whose download fails are left out of the bundle.
pub async fn build_bundle(
    router: &StorageRouter,
    files: &[StoredFile],
    text_blocks: &[TextBlock],
) -> Result<Vec<u8>> {
    let downloads = join_all(
        files
            .iter()
            .map(|file| router.download(file.backend, &file.storage_key)),
    )
    .await;

    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(files.len() + text_blocks.len());
    let mut used = HashSet::new();

    for (file, result) in files.iter().zip(downloads) {
        match result {
            Ok(data) => {
                let name = sanitize_archive_filename(
                    &file.original_name,
                    &format!("unnamed_{}", file.id),
                );
                entries.push((dedupe(name, &mut used), data));
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = %file.backend,
                    storage_key = %file.storage_key,
                    "Skipping file missing from storage"
                );
            }
        }
    }

    for (index, block) in text_blocks.iter().enumerate() {
        let name = dedupe(text_entry_name(&block.title, index), &mut used);
        entries.push((name, block.content.clone().into_bytes()));
    }

    tokio::task::spawn_blocking(move || write_zip(entries))
        .await
        .context("ZIP task panicked")?
}

fn write_zip(entries: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>> {
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, data) in entries {
            zip.start_file(name.as_str(), options)
                .with_context(|| format!("Failed to add file to ZIP: {}", name))?;
            zip.write_all(&data)
                .with_context(|| format!("Failed to write file data to ZIP: {}", name))?;
        }

        zip.finish().context("Failed to finalize ZIP archive")?;
    }

    Ok(buffer)
}
