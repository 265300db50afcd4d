// PairedListing: lock-step walk over two parallel directory listings
//
// The image and label trees are separate hierarchies that are supposed to
// mirror each other. Listings are sorted by file name so the walk does not
// depend on the order the filesystem returns entries in. In strict mode each
// aligned pair must carry the same name and both sides must have the same
// number of entries; in listing-order mode pairs are formed by position and the
// longer side is truncated.

use std::fs;
use std::path::{Path, PathBuf};
use std::vec::IntoIter;

use crate::error::{DataError, Result};
use crate::layout::PairingMode;

/// Sorted subdirectories of `dir`.
pub fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    list_entries(dir, true)
}

/// Sorted regular files of `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    list_entries(dir, false)
}

fn list_entries(dir: &Path, want_dirs: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DataError::NotADirectory(dir.to_path_buf()));
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DataError::io(dir, e))? {
        let entry = entry.map_err(|e| DataError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() == want_dirs {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Last path component as UTF-8 (lossy).
pub fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One aligned step of a [`PairedListing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paired {
    /// Position in the sorted listing.
    pub position: usize,
    pub image: PathBuf,
    pub label: PathBuf,
}

/// Iterator over aligned subdirectories of an image directory and a label
/// directory.
#[derive(Debug)]
pub struct PairedListing {
    images: IntoIter<PathBuf>,
    labels: IntoIter<PathBuf>,
    mode: PairingMode,
    position: usize,
    failed: bool,
}

impl PairedListing {
    /// List the subdirectories of both sides.
    pub fn open(image_dir: &Path, label_dir: &Path, mode: PairingMode) -> Result<Self> {
        Ok(Self::from_lists(
            list_dirs(image_dir)?,
            list_dirs(label_dir)?,
            mode,
        ))
    }

    pub fn from_lists(images: Vec<PathBuf>, labels: Vec<PathBuf>, mode: PairingMode) -> Self {
        Self {
            images: images.into_iter(),
            labels: labels.into_iter(),
            mode,
            position: 0,
            failed: false,
        }
    }
}

impl Iterator for PairedListing {
    type Item = Result<Paired>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let position = self.position;
        let step = match (self.images.next(), self.labels.next()) {
            (Some(image), Some(label)) => {
                if self.mode == PairingMode::Strict && entry_name(&image) != entry_name(&label) {
                    Err(DataError::KeyMismatch {
                        position,
                        image,
                        label,
                    })
                } else {
                    Ok(Paired {
                        position,
                        image,
                        label,
                    })
                }
            }
            (None, None) => return None,
            (Some(image), None) if self.mode == PairingMode::Strict => {
                Err(DataError::KeyMismatch {
                    position,
                    image,
                    label: PathBuf::new(),
                })
            }
            (None, Some(label)) if self.mode == PairingMode::Strict => {
                Err(DataError::KeyMismatch {
                    position,
                    image: PathBuf::new(),
                    label,
                })
            }
            // Listing-order mode truncates to the shorter side.
            _ => return None,
        };
        self.position += 1;
        if step.is_err() {
            self.failed = true;
        }
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/x").join(n)).collect()
    }

    #[test]
    fn strict_pairs_matching_names() {
        let it = PairedListing::from_lists(
            paths(&["a", "b"]),
            paths(&["a", "b"]),
            PairingMode::Strict,
        );
        let pairs: Vec<Paired> = it.collect::<Result<_>>().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].position, 1);
        assert_eq!(entry_name(&pairs[1].label), "b");
    }

    #[test]
    fn strict_rejects_renamed_entry() {
        let mut it = PairedListing::from_lists(
            paths(&["a", "b"]),
            paths(&["a", "c"]),
            PairingMode::Strict,
        );
        assert!(it.next().unwrap().is_ok());
        match it.next() {
            Some(Err(DataError::KeyMismatch { position, .. })) => assert_eq!(position, 1),
            other => panic!("expected KeyMismatch, got {other:?}"),
        }
        assert!(it.next().is_none());
    }

    #[test]
    fn strict_rejects_unpaired_tail() {
        let it = PairedListing::from_lists(paths(&["a", "b"]), paths(&["a"]), PairingMode::Strict);
        let result: Result<Vec<Paired>> = it.collect();
        assert!(matches!(result, Err(DataError::KeyMismatch { .. })));
    }

    #[test]
    fn listing_order_truncates_and_ignores_names() {
        let it = PairedListing::from_lists(
            paths(&["a", "b", "c"]),
            paths(&["x", "y"]),
            PairingMode::ListingOrder,
        );
        let pairs: Vec<Paired> = it.collect::<Result<_>>().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(entry_name(&pairs[0].image), "a");
        assert_eq!(entry_name(&pairs[0].label), "x");
    }

    #[test]
    fn listings_are_sorted_and_split_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("f.txt"), b"x").unwrap();
        let dirs = list_dirs(dir.path()).unwrap();
        assert_eq!(
            dirs.iter().map(|p| entry_name(p)).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(list_files(dir.path()).unwrap().len(), 1);
        assert!(matches!(
            list_dirs(&dir.path().join("missing")),
            Err(DataError::NotADirectory(_))
        ));
    }
}
