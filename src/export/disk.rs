//! Copying and chunking VM state files.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::home::DISK_FILENAME;
use crate::ui::Ui;

/// Disk images larger than this are split (500 MiB).
pub const SPLIT_THRESHOLD_BYTES: u64 = 524_288_000;

/// Filename prefix of disk chunks; the suffix is a zero-padded index.
pub const PART_PREFIX: &str = "disk.img.part.";

/// Minimum width of the numeric chunk suffix.
const MIN_SUFFIX_WIDTH: usize = 2;

/// Read buffer for copying and splitting.
const IO_BUFFER_SIZE: usize = 1 << 20;

/// What happened to the disk image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskImage {
    /// The VM has no disk image.
    Missing,
    /// Copied whole to this path.
    Whole(PathBuf),
    /// Split into `disk.img.part.*` chunks in the work directory.
    Split,
}

/// Whether a disk image of `size` bytes is split rather than copied whole.
pub fn should_split(size: u64, threshold: u64) -> bool {
    size > threshold
}

/// Copy `src` to `dest`.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    fs::copy(src, dest).map_err(|e| Error::filesystem("copy file", src, e))
}

/// Copy `src` to `dest` if `src` exists. Returns whether it was copied.
pub fn copy_if_exists(src: &Path, dest: &Path) -> Result<bool> {
    match fs::metadata(src) {
        Ok(_) => {
            copy_file(src, dest)?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::filesystem("stat file", src, e)),
    }
}

/// Chunk filenames for a file of `len` bytes split into `chunk_size` pieces.
pub fn part_names(len: u64, chunk_size: u64) -> Vec<String> {
    let count = len.div_ceil(chunk_size);
    let width = count
        .saturating_sub(1)
        .to_string()
        .len()
        .max(MIN_SUFFIX_WIDTH);

    (0..count)
        .map(|index| format!("{}{:0width$}", PART_PREFIX, index, width = width))
        .collect()
}

/// Split `src` into `chunk_size`-byte chunks inside `dir`.
///
/// Returns the chunk paths in order.
pub fn split_file(ctx: &CancelToken, src: &Path, dir: &Path, chunk_size: u64) -> Result<Vec<PathBuf>> {
    let file = File::open(src).map_err(|e| Error::filesystem("open disk image", src, e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::filesystem("stat disk image", src, e))?
        .len();
    let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, file);

    let names = part_names(len, chunk_size);
    let mut parts = Vec::with_capacity(names.len());

    for name in names {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = dir.join(name);
        let out = File::create(&path).map_err(|e| Error::filesystem("create chunk", &path, e))?;
        let mut writer = BufWriter::with_capacity(IO_BUFFER_SIZE, out);

        let copied = io::copy(&mut (&mut reader).take(chunk_size), &mut writer)
            .and_then(|n| writer.flush().map(|_| n))
            .map_err(|e| Error::filesystem("split disk image", &path, e))?;

        if copied == 0 {
            return Err(Error::filesystem(
                "split disk image",
                src,
                io::Error::new(io::ErrorKind::UnexpectedEof, "file shrank while splitting"),
            ));
        }

        tracing::debug!(chunk = %path.display(), bytes = copied, "wrote chunk");
        parts.push(path);
    }

    Ok(parts)
}

/// Chunk files in `dir`, ordered by their numeric suffix.
pub fn find_parts(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::filesystem("list chunks", dir, e))?;

    let mut parts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::filesystem("list chunks", dir, e))?;
        let name = entry.file_name();
        let Some(suffix) = name.to_str().and_then(|n| n.strip_prefix(PART_PREFIX)) else {
            continue;
        };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(index) = suffix.parse::<u64>() {
            parts.push((index, entry.path()));
        }
    }

    parts.sort_by_key(|(index, _)| *index);
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

/// Copy the VM's disk image into `work_dir`, splitting it when larger than
/// `threshold`.
pub fn process_disk(
    ctx: &CancelToken,
    ui: &dyn Ui,
    src: &Path,
    work_dir: &Path,
    chunk_size: u64,
    threshold: u64,
) -> Result<DiskImage> {
    let metadata = match fs::metadata(src) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %src.display(), "no disk image");
            return Ok(DiskImage::Missing);
        }
        Err(e) => return Err(Error::filesystem("stat disk image", src, e)),
    };

    let dest = work_dir.join(DISK_FILENAME);

    if should_split(metadata.len(), threshold) {
        ui.say("disk.img is large. Splitting into chunks...");
        copy_file(src, &dest)?;
        let parts = split_file(ctx, &dest, work_dir, chunk_size)?;
        fs::remove_file(&dest).map_err(|e| Error::filesystem("remove disk copy", &dest, e))?;
        tracing::info!(chunks = parts.len(), size = metadata.len(), "disk image split");
        return Ok(DiskImage::Split);
    }

    ui.say("Copying disk.img...");
    copy_file(src, &dest)?;
    Ok(DiskImage::Whole(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::size::parse_chunk_size;
    use crate::ui::RecordingUi;

    fn write_bytes(path: &Path, len: usize) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_part_names_for_600mb_disk() {
        let chunk = parse_chunk_size("500M").unwrap();
        assert_eq!(
            part_names(600 * 1024 * 1024, chunk),
            ["disk.img.part.00", "disk.img.part.01"]
        );
    }

    #[test]
    fn test_part_names_widen_past_two_digits() {
        let names = part_names(101, 1);
        assert_eq!(names.len(), 101);
        assert_eq!(names[0], "disk.img.part.000");
        assert_eq!(names[100], "disk.img.part.100");

        assert_eq!(part_names(100, 1)[99], "disk.img.part.99");
        assert!(part_names(0, 10).is_empty());
    }

    #[test]
    fn test_split_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("disk.img");
        write_bytes(&src, 2500);

        let parts = split_file(&CancelToken::new(), &src, dir.path(), 1024).unwrap();
        let sizes: Vec<u64> = parts.iter().map(|p| fs::metadata(p).unwrap().len()).collect();
        assert_eq!(sizes, [1024, 1024, 452]);

        let joined: Vec<u8> = parts.iter().flat_map(|p| fs::read(p).unwrap()).collect();
        assert_eq!(joined, fs::read(&src).unwrap());
    }

    #[test]
    fn test_find_parts_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["disk.img.part.10", "disk.img.part.2", "disk.img.part.1", "disk.img.part.tmp", "disk.img"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let names: Vec<String> = find_parts(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["disk.img.part.1", "disk.img.part.2", "disk.img.part.10"]);
    }

    #[test]
    fn test_copy_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("nvram.bin");
        let dest = dir.path().join("copy.bin");

        assert!(!copy_if_exists(&src, &dest).unwrap());
        assert!(!dest.exists());

        fs::write(&src, b"efi").unwrap();
        assert!(copy_if_exists(&src, &dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"efi");
    }

    #[test]
    fn test_process_disk_threshold() {
        let state = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let src = state.path().join("disk.img");
        let ui = RecordingUi::new();
        let ctx = CancelToken::new();

        // At the threshold: copied whole
        write_bytes(&src, 1000);
        let disk = process_disk(&ctx, &ui, &src, work.path(), 512, 1000).unwrap();
        assert_eq!(disk, DiskImage::Whole(work.path().join("disk.img")));
        assert!(find_parts(work.path()).unwrap().is_empty());

        // Over the threshold: split, whole copy removed
        fs::remove_file(work.path().join("disk.img")).unwrap();
        write_bytes(&src, 1001);
        let disk = process_disk(&ctx, &ui, &src, work.path(), 512, 1000).unwrap();
        assert_eq!(disk, DiskImage::Split);
        assert!(!work.path().join("disk.img").exists());
        assert_eq!(find_parts(work.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_split_threshold_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("disk.img");
        let file = File::create(&src).unwrap();

        // Sparse: sizing the file costs no disk space.
        file.set_len(SPLIT_THRESHOLD_BYTES).unwrap();
        let size = fs::metadata(&src).unwrap().len();
        assert!(!should_split(size, SPLIT_THRESHOLD_BYTES));

        file.set_len(SPLIT_THRESHOLD_BYTES + 1).unwrap();
        let size = fs::metadata(&src).unwrap().len();
        assert!(should_split(size, SPLIT_THRESHOLD_BYTES));

        let chunk = parse_chunk_size("500M").unwrap();
        assert_eq!(part_names(size, chunk), ["disk.img.part.00", "disk.img.part.01"]);
    }

    #[test]
    fn test_process_missing_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ui = RecordingUi::new();
        let disk = process_disk(
            &CancelToken::new(),
            &ui,
            &dir.path().join("disk.img"),
            dir.path(),
            512,
            SPLIT_THRESHOLD_BYTES,
        )
        .unwrap();
        assert_eq!(disk, DiskImage::Missing);
        assert!(ui.lines().is_empty());
    }
}
