// Path resolver: pair canonical images with writer ids
//
// Walks the image and label branches of one split in lock-step:
//
//   sentence group -> writer-attempt -> variant folder -> canonical image
//
// Traced writer-attempts are skipped. Each remaining attempt must have as many
// image variant folders as label variant folders, and its single label file
// supplies the writer id for every variant. Any structural mismatch aborts the
// whole resolution.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::dataset::CorpusIndex;
use crate::error::{DataError, Result};
use crate::label::read_writer_id;
use crate::layout::{CorpusLayout, SanityLimits, Split};
use crate::paired::{entry_name, list_dirs, list_files, PairedListing};

/// Resolve a split with the default corpus layout.
pub fn resolve<P: AsRef<Path>>(root: P, is_train: bool, sanity_check: bool) -> Result<CorpusIndex> {
    resolve_with(
        &CorpusLayout::default(),
        root.as_ref(),
        Split::from_is_train(is_train),
        sanity_check,
    )
}

/// Resolve a split using an explicit layout.
pub fn resolve_with(
    layout: &CorpusLayout,
    root: &Path,
    split: Split,
    sanity_check: bool,
) -> Result<CorpusIndex> {
    let start = Instant::now();
    let image_root = layout.image_branch(root, split);
    let label_root = layout.label_branch(root, split);
    let limits = sanity_check.then(|| layout.sanity_limits(split));
    if let Some(l) = &limits {
        l.validate()?;
    }

    let mut image_paths: Vec<PathBuf> = Vec::new();
    let mut writer_ids: Vec<String> = Vec::new();

    for sentence in PairedListing::open(&image_root, &label_root, layout.pairing)? {
        let sentence = sentence?;
        let attempts = PairedListing::open(&sentence.image, &sentence.label, layout.pairing)?;
        for attempt in attempts {
            let attempt = attempt?;
            if layout.is_traced(&entry_name(&attempt.image))
                || layout.is_traced(&entry_name(&attempt.label))
            {
                debug!(path = %attempt.image.display(), "skipping traced writer-attempt");
            } else {
                resolve_attempt(
                    layout,
                    &attempt.image,
                    &attempt.label,
                    &mut image_paths,
                    &mut writer_ids,
                )?;
            }
            if reached(limits, attempt.position, |l| l.writer_attempts) {
                break;
            }
        }
        if reached(limits, sentence.position, |l| l.sentence_groups) {
            break;
        }
    }

    let index = CorpusIndex::new(image_paths, writer_ids)?;
    info!(
        split = ?split,
        sanity_check,
        samples = index.len(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "resolved corpus paths"
    );
    Ok(index)
}

fn reached(limits: Option<SanityLimits>, position: usize, pick: fn(&SanityLimits) -> usize) -> bool {
    limits.is_some_and(|l| position + 1 >= pick(&l))
}

/// Resolve one writer-attempt, appending one entry per variant folder.
fn resolve_attempt(
    layout: &CorpusLayout,
    image_attempt: &Path,
    label_attempt: &Path,
    image_paths: &mut Vec<PathBuf>,
    writer_ids: &mut Vec<String>,
) -> Result<()> {
    let image_variants = list_dirs(image_attempt)?;
    let label_variants = list_dirs(label_attempt)?;
    if image_variants.len() != label_variants.len() {
        return Err(DataError::SubfolderCountMismatch {
            images: image_variants.len(),
            labels: label_variants.len(),
            image_dir: image_variants
                .first()
                .cloned()
                .unwrap_or_else(|| image_attempt.to_path_buf()),
            label_dir: label_variants
                .first()
                .cloned()
                .unwrap_or_else(|| label_attempt.to_path_buf()),
        });
    }
    let Some(first_label) = label_variants.first() else {
        return Ok(());
    };

    let label_path = first_label.join(&layout.label_file);
    let writer_id = read_writer_id(&label_path)?;

    for variant in &image_variants {
        let image_path = canonical_file(variant, &layout.canonical_marker)?;
        check_same_writer(&image_path, &label_path)?;
        image_paths.push(image_path);
    }
    writer_ids.extend(std::iter::repeat(writer_id).take(label_variants.len()));
    Ok(())
}

/// The first file (by name) in `dir` containing `marker`.
pub fn canonical_file(dir: &Path, marker: &str) -> Result<PathBuf> {
    list_files(dir)?
        .into_iter()
        .find(|p| entry_name(p).contains(marker))
        .ok_or_else(|| DataError::MissingCanonical {
            dir: dir.to_path_buf(),
            marker: marker.to_string(),
        })
}

/// Writer-attempt segment of a `<attempt>/<variant>/<file>` path.
pub fn writer_segment(path: &Path) -> String {
    path.parent()
        .and_then(Path::parent)
        .map(entry_name)
        .unwrap_or_default()
}

fn check_same_writer(image: &Path, label: &Path) -> Result<()> {
    let image_writer = writer_segment(image);
    let label_writer = writer_segment(label);
    if image_writer != label_writer {
        return Err(DataError::WriterMismatch {
            image: image.to_path_buf(),
            label: label.to_path_buf(),
            image_writer,
            label_writer,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writer_segment_is_attempt_folder() {
        let p = Path::new("/r/sent01/writer07/stage3/a_0150_x640.png");
        assert_eq!(writer_segment(p), "writer07");
        assert_eq!(writer_segment(Path::new("a.png")), "");
    }

    #[test]
    fn canonical_file_picks_marker() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s_0149_x640.png", "s_0150_x640.png", "s_0150_x320.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let picked = canonical_file(dir.path(), "_0150_x").unwrap();
        // sorted order: x320 before x640
        assert_eq!(entry_name(&picked), "s_0150_x320.png");
    }

    #[test]
    fn canonical_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s_0149_x640.png"), b"").unwrap();
        let err = canonical_file(dir.path(), "_0150_x").unwrap_err();
        assert!(matches!(err, DataError::MissingCanonical { .. }));
    }

    #[test]
    fn mismatched_writer_segments_fail() {
        let err = check_same_writer(
            Path::new("/i/s/w1/v/a_0150_x.png"),
            Path::new("/l/s/w2/v/labels.json"),
        )
        .unwrap_err();
        match err {
            DataError::WriterMismatch {
                image_writer,
                label_writer,
                ..
            } => {
                assert_eq!(image_writer, "w1");
                assert_eq!(label_writer, "w2");
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
