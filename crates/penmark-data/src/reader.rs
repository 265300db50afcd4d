// ResilientReader: decode an image, falling back to earlier siblings
//
// The canonical-resolution file of a variant folder is occasionally missing or
// truncated. Its siblings are earlier rendering stages of the same sample, so
// when the canonical file cannot be decoded the reader walks backward through
// the folder listing (sorted by name) and returns the first sibling that
// decodes. Only decode failures and missing files are retried; any other I/O
// error propagates. The walk is capped by `max_probes`.

use std::io;
use std::path::{Path, PathBuf};

use image::{ImageError, RgbImage};
use tracing::warn;

use crate::dataset::CorpusIndex;
use crate::error::{DataError, Result};
use crate::paired::list_files;

/// Default number of siblings tried after the requested file fails.
pub const DEFAULT_MAX_PROBES: usize = 16;

/// Why a single decode attempt failed.
#[derive(Debug)]
pub enum ReadFailure {
    /// The bytes are not a decodable image (corrupt, truncated, unknown format).
    Undecodable(ImageError),
    /// The file does not exist.
    Missing,
    /// Any other I/O failure, e.g. permission denied.
    Fatal(io::Error),
}

impl ReadFailure {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ReadFailure::Fatal(_))
    }

    fn into_error(self, path: &Path) -> DataError {
        match self {
            ReadFailure::Undecodable(source) => DataError::Image {
                path: path.to_path_buf(),
                source,
            },
            ReadFailure::Missing => DataError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "image file missing"),
            ),
            ReadFailure::Fatal(source) => DataError::io(path, source),
        }
    }
}

impl From<ImageError> for ReadFailure {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => match io.kind() {
                io::ErrorKind::NotFound => ReadFailure::Missing,
                // Decoders report truncated streams as I/O errors.
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                    ReadFailure::Undecodable(ImageError::IoError(io))
                }
                _ => ReadFailure::Fatal(io),
            },
            other => ReadFailure::Undecodable(other),
        }
    }
}

/// Decode `path` to 8-bit RGB, dropping any alpha channel.
pub fn decode(path: &Path) -> std::result::Result<RgbImage, ReadFailure> {
    let img = image::open(path).map_err(ReadFailure::from)?;
    Ok(img.to_rgb8())
}

/// Image reader that substitutes an earlier sibling for an undecodable file.
#[derive(Debug, Clone, Copy)]
pub struct ResilientReader {
    max_probes: usize,
}

impl Default for ResilientReader {
    fn default() -> Self {
        Self {
            max_probes: DEFAULT_MAX_PROBES,
        }
    }
}

impl ResilientReader {
    pub fn new(max_probes: usize) -> Self {
        Self { max_probes }
    }

    pub fn max_probes(&self) -> usize {
        self.max_probes
    }

    /// Read the image of `samples[index]`.
    pub fn read(&self, samples: &CorpusIndex, index: usize) -> Result<RgbImage> {
        let sample = samples.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: samples.len(),
        })?;
        self.read_path(&sample.path)
    }

    /// Read `path`, or the nearest earlier sibling that decodes.
    pub fn read_path(&self, path: &Path) -> Result<RgbImage> {
        self.read_with(path, decode)
    }

    fn read_with<F>(&self, path: &Path, decode: F) -> Result<RgbImage>
    where
        F: Fn(&Path) -> std::result::Result<RgbImage, ReadFailure>,
    {
        match decode(path) {
            Ok(img) => return Ok(img),
            Err(f) if !f.is_retryable() => return Err(f.into_error(path)),
            Err(f) => warn!(path = %path.display(), reason = ?f, "image unreadable, probing siblings"),
        }

        let mut attempts = 1;
        for candidate in earlier_siblings(path)?.iter().rev().take(self.max_probes) {
            attempts += 1;
            match decode(candidate) {
                Ok(img) => {
                    warn!(
                        requested = %path.display(),
                        substitute = %candidate.display(),
                        "using earlier sibling image"
                    );
                    return Ok(img);
                }
                Err(f) if f.is_retryable() => continue,
                Err(f) => return Err(f.into_error(candidate)),
            }
        }
        Err(DataError::ProbeExhausted {
            path: path.to_path_buf(),
            attempts,
        })
    }
}

/// Files listed before `path` in its directory, in listing order.
fn earlier_siblings(path: &Path) -> Result<Vec<PathBuf>> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut files = list_files(dir)?;
    let name = path.file_name();
    let end = files.partition_point(|p| p.file_name() < name);
    files.truncate(end);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::fs;

    fn write_rgb(path: &Path, value: u8) {
        RgbImage::from_pixel(4, 3, Rgb([value, value, value]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn reads_valid_file_directly() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("s_0150_x4.png");
        write_rgb(&p, 9);
        let img = ResilientReader::default().read_path(&p).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(0, 0), &Rgb([9, 9, 9]));
    }

    #[test]
    fn corrupt_file_falls_back_to_previous_sibling() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(&dir.path().join("s_0148_x4.png"), 10);
        write_rgb(&dir.path().join("s_0149_x4.png"), 20);
        let canonical = dir.path().join("s_0150_x4.png");
        fs::write(&canonical, b"\x89PNG not really").unwrap();
        let img = ResilientReader::default().read_path(&canonical).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([20, 20, 20]));
    }

    #[test]
    fn skips_several_corrupt_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(&dir.path().join("s_0147_x4.png"), 30);
        fs::write(dir.path().join("s_0148_x4.png"), b"junk").unwrap();
        fs::write(dir.path().join("s_0149_x4.png"), b"junk").unwrap();
        let canonical = dir.path().join("s_0150_x4.png");
        fs::write(&canonical, b"junk").unwrap();
        let img = ResilientReader::default().read_path(&canonical).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([30, 30, 30]));
    }

    #[test]
    fn missing_file_uses_insertion_point() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(&dir.path().join("s_0149_x4.png"), 40);
        write_rgb(&dir.path().join("s_0151_x4.png"), 99);
        let img = ResilientReader::default()
            .read_path(&dir.path().join("s_0150_x4.png"))
            .unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([40, 40, 40]));
    }

    #[test]
    fn exhausted_listing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s_0149_x4.png"), b"junk").unwrap();
        let canonical = dir.path().join("s_0150_x4.png");
        fs::write(&canonical, b"junk").unwrap();
        let err = ResilientReader::default().read_path(&canonical).unwrap_err();
        match err {
            DataError::ProbeExhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn probe_count_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(&dir.path().join("s_0100.png"), 1);
        for i in 101..110 {
            fs::write(dir.path().join(format!("s_{i:04}.png")), b"junk").unwrap();
        }
        let canonical = dir.path().join("s_0110.png");
        fs::write(&canonical, b"junk").unwrap();
        let err = ResilientReader::new(3).read_path(&canonical).unwrap_err();
        assert!(matches!(err, DataError::ProbeExhausted { attempts: 4, .. }));
        // A wide enough window reaches the valid file.
        assert!(ResilientReader::new(10).read_path(&canonical).is_ok());
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("rgba_0150_x2.png");
        RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 128]))
            .save(&p)
            .unwrap();
        let img = ResilientReader::default().read_path(&p).unwrap();
        assert_eq!(img.get_pixel(1, 1), &Rgb([1, 2, 3]));
        assert_eq!(img.as_raw().len(), 2 * 2 * 3);
    }

    #[test]
    fn permission_denied_is_not_retryable() {
        let f = ReadFailure::from(ImageError::IoError(io::ErrorKind::PermissionDenied.into()));
        assert!(matches!(f, ReadFailure::Fatal(_)));
        assert!(!f.is_retryable());
        match f.into_error(Path::new("a.png")) {
            DataError::Io { path, source } => {
                assert_eq!(path, Path::new("a.png"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn failure_classification() {
        let missing = ReadFailure::from(ImageError::IoError(io::ErrorKind::NotFound.into()));
        assert!(matches!(missing, ReadFailure::Missing));
        let truncated = ReadFailure::from(ImageError::IoError(io::ErrorKind::UnexpectedEof.into()));
        assert!(matches!(truncated, ReadFailure::Undecodable(_)));
        assert!(missing.is_retryable() && truncated.is_retryable());
    }

    #[test]
    fn fatal_failure_does_not_walk_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(&dir.path().join("s_0148_x4.png"), 10);
        write_rgb(&dir.path().join("s_0149_x4.png"), 20);
        let canonical = dir.path().join("s_0150_x4.png");
        write_rgb(&canonical, 30);

        let seen = RefCell::new(Vec::new());
        let err = ResilientReader::default()
            .read_with(&canonical, |p| {
                seen.borrow_mut().push(p.to_path_buf());
                if p == canonical.as_path() {
                    Err(ReadFailure::Fatal(io::ErrorKind::PermissionDenied.into()))
                } else {
                    decode(p)
                }
            })
            .unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
        assert_eq!(seen.into_inner(), vec![canonical]);
    }

    #[test]
    fn fatal_sibling_stops_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_rgb(&dir.path().join("s_0148_x4.png"), 10);
        let locked = dir.path().join("s_0149_x4.png");
        write_rgb(&locked, 20);
        let canonical = dir.path().join("s_0150_x4.png");
        fs::write(&canonical, b"junk").unwrap();

        let err = ResilientReader::default()
            .read_with(&canonical, |p| {
                if p == locked.as_path() {
                    Err(ReadFailure::Fatal(io::ErrorKind::PermissionDenied.into()))
                } else {
                    decode(p)
                }
            })
            .unwrap_err();
        match err {
            DataError::Io { path, .. } => assert_eq!(path, locked),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn read_by_index_checks_bounds() {
        let idx = CorpusIndex::new(vec![], vec![]).unwrap();
        let err = ResilientReader::default().read(&idx, 0).unwrap_err();
        assert!(matches!(err, DataError::IndexOutOfRange { index: 0, len: 0 }));
    }
}
