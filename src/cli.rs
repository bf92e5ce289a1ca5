// ============================================================================
// masktag CLI — headless mask tooling via command-line arguments
// ============================================================================
//
// Usage examples:
//   masktag --project shots/ --check
//   masktag -p shots/ --init-masks
//   masktag -p shots/ --stats
//   masktag -p shots/ --export-dir out/
//
// No GUI is opened in CLI mode. All processing runs synchronously on the
// current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{load_mask_sync, save_mask, MaskIoError};
use crate::mask::MaskBuffer;
use crate::project::{find_images, mask_path_for};

/// masktag headless mask tooling.
///
/// Validate, initialize, and export the mask sidecars of a project
/// directory without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "masktag",
    about = "masktag headless mask tooling",
    long_about = "Validate, initialize, inspect, and export the .mask sidecar files of a\n\
                  project directory without opening the GUI.\n\n\
                  Example:\n  \
                  masktag --project shots/ --check\n  \
                  masktag -p shots/ --export-dir masks-png/"
)]
pub struct CliArgs {
    /// Project directory (scanned recursively for .png/.jpg images).
    #[arg(short, long, value_name = "DIR")]
    pub project: PathBuf,

    /// Verify that every existing mask decodes and matches its image
    /// dimensions. Exit code 1 if any does not.
    #[arg(long)]
    pub check: bool,

    /// Create blank masks for images that have none.
    #[arg(long)]
    pub init_masks: bool,

    /// Print per-image tagged pixel counts and coverage.
    #[arg(long)]
    pub stats: bool,

    /// Re-encode every mask as `<stem>.png` into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--project" || a == "-p")
    }
}

/// Outcome of validating one image's mask sidecar.
#[derive(Debug, PartialEq)]
pub enum CheckOutcome {
    Ok,
    /// No sidecar on disk (not an error: the GUI creates one on demand).
    Missing,
    Mismatch {
        image: (u32, u32),
        mask: (u32, u32),
    },
    Unreadable(String),
}

pub struct MaskCheck {
    pub rel: String,
    pub outcome: CheckOutcome,
}

pub struct MaskStats {
    pub rel: String,
    pub dimensions: (u32, u32),
    pub tagged: u64,
    pub coverage: f64,
}

/// Validate every mask in the project. Images without a sidecar report
/// `Missing`; decode failures and dimension mismatches are failures.
pub fn check_project(root: &Path) -> Result<Vec<MaskCheck>, String> {
    let mut report = Vec::new();
    for rel in scan(root)? {
        let image_path = root.join(&rel);
        let mask_path = mask_path_for(&image_path);
        if !mask_path.exists() {
            report.push(MaskCheck {
                rel,
                outcome: CheckOutcome::Missing,
            });
            continue;
        }
        let dims = match image::image_dimensions(&image_path) {
            Ok(d) => d,
            Err(e) => {
                report.push(MaskCheck {
                    rel,
                    outcome: CheckOutcome::Unreadable(e.to_string()),
                });
                continue;
            }
        };
        let outcome = match load_mask_sync(&mask_path, dims) {
            Ok(_) => CheckOutcome::Ok,
            Err(MaskIoError::DimensionMismatch { image, mask }) => {
                CheckOutcome::Mismatch { image, mask }
            }
            Err(e) => CheckOutcome::Unreadable(e.to_string()),
        };
        report.push(MaskCheck { rel, outcome });
    }
    Ok(report)
}

/// Write a blank mask next to every image that has none. Returns the
/// relative paths of the images that got one.
pub fn init_missing_masks(root: &Path) -> Result<Vec<String>, String> {
    let mut created = Vec::new();
    for rel in scan(root)? {
        let image_path = root.join(&rel);
        let mask_path = mask_path_for(&image_path);
        if mask_path.exists() {
            continue;
        }
        let (w, h) = image::image_dimensions(&image_path)
            .map_err(|e| format!("{}: {}", rel, e))?;
        save_mask(&MaskBuffer::blank(w, h), &mask_path).map_err(|e| format!("{}: {}", rel, e))?;
        created.push(rel);
    }
    Ok(created)
}

/// Tagged pixel statistics for every image that has a mask.
pub fn collect_stats(root: &Path) -> Result<Vec<MaskStats>, String> {
    let mut stats = Vec::new();
    for rel in scan(root)? {
        let image_path = root.join(&rel);
        let mask_path = mask_path_for(&image_path);
        if !mask_path.exists() {
            continue;
        }
        let dims =
            image::image_dimensions(&image_path).map_err(|e| format!("{}: {}", rel, e))?;
        let mask = load_mask_sync(&mask_path, dims).map_err(|e| format!("{}: {}", rel, e))?;
        stats.push(MaskStats {
            rel,
            dimensions: dims,
            tagged: mask.tagged_count(),
            coverage: mask.coverage(),
        });
    }
    Ok(stats)
}

/// Re-encode every mask as `<stem>.png` into `dest`. Nested project paths
/// are flattened with `_` so the output directory stays flat.
pub fn export_masks(root: &Path, dest: &Path) -> Result<Vec<PathBuf>, String> {
    std::fs::create_dir_all(dest).map_err(|e| e.to_string())?;
    let mut written = Vec::new();
    for rel in scan(root)? {
        let image_path = root.join(&rel);
        let mask_path = mask_path_for(&image_path);
        if !mask_path.exists() {
            continue;
        }
        let dims =
            image::image_dimensions(&image_path).map_err(|e| format!("{}: {}", rel, e))?;
        let mask = load_mask_sync(&mask_path, dims).map_err(|e| format!("{}: {}", rel, e))?;
        let stem = Path::new(&rel)
            .with_extension("")
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "_");
        let out = dest.join(format!("{}.png", stem));
        save_mask(&mask, &out).map_err(|e| format!("{}: {}", rel, e))?;
        written.push(out);
    }
    Ok(written)
}

fn scan(root: &Path) -> Result<Vec<String>, String> {
    if !root.is_dir() {
        return Err(format!("{} is not a directory", root.display()));
    }
    find_images(root).map_err(|e| e.to_string())
}

/// Run all CLI processing and return an OS exit code.
/// `0` = everything succeeded, `1` = any failure.
pub fn run(args: CliArgs) -> ExitCode {
    if !(args.check || args.init_masks || args.stats || args.export_dir.is_some()) {
        eprintln!("error: nothing to do — pass --check, --init-masks, --stats or --export-dir.");
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    let mut failed = false;

    if args.check {
        match check_project(&args.project) {
            Ok(report) => {
                let mut bad = 0usize;
                for check in &report {
                    match &check.outcome {
                        CheckOutcome::Ok => {
                            if args.verbose {
                                println!("ok       {}", check.rel);
                            }
                        }
                        CheckOutcome::Missing => {
                            if args.verbose {
                                println!("missing  {}", check.rel);
                            }
                        }
                        CheckOutcome::Mismatch { image, mask } => {
                            bad += 1;
                            println!(
                                "MISMATCH {} (image {}x{}, mask {}x{})",
                                check.rel, image.0, image.1, mask.0, mask.1
                            );
                        }
                        CheckOutcome::Unreadable(e) => {
                            bad += 1;
                            println!("ERROR    {} ({})", check.rel, e);
                        }
                    }
                }
                println!("checked {} images, {} problem(s)", report.len(), bad);
                if bad > 0 {
                    failed = true;
                }
            }
            Err(e) => {
                eprintln!("error: {}", e);
                failed = true;
            }
        }
    }

    if args.init_masks {
        match init_missing_masks(&args.project) {
            Ok(created) => {
                for rel in &created {
                    if args.verbose {
                        println!("created mask for {}", rel);
                    }
                }
                println!("initialized {} mask(s)", created.len());
            }
            Err(e) => {
                eprintln!("error: {}", e);
                failed = true;
            }
        }
    }

    if args.stats {
        match collect_stats(&args.project) {
            Ok(stats) => {
                for s in &stats {
                    println!(
                        "{}: {}x{}, {} tagged ({:.2}%)",
                        s.rel,
                        s.dimensions.0,
                        s.dimensions.1,
                        s.tagged,
                        s.coverage * 100.0
                    );
                }
                println!("{} mask(s)", stats.len());
            }
            Err(e) => {
                eprintln!("error: {}", e);
                failed = true;
            }
        }
    }

    if let Some(dest) = &args.export_dir {
        match export_masks(&args.project, dest) {
            Ok(written) => println!("exported {} mask(s) to {}", written.len(), dest.display()),
            Err(e) => {
                eprintln!("error: {}", e);
                failed = true;
            }
        }
    }

    if args.verbose {
        println!("done in {:.2?}", start.elapsed());
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::TAGGED;
    use image::RgbaImage;

    fn write_png(path: &Path, w: u32, h: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::new(w, h).save(path).unwrap();
    }

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        write_png(&root.join("good.png"), 8, 6);
        write_png(&root.join("bare.png"), 4, 4);
        write_png(&root.join("bad.png"), 10, 10);

        let mut mask = MaskBuffer::blank(8, 6);
        mask.stamp(4.0, 3.0, 2.0, TAGGED);
        save_mask(&mask, &root.join("good.mask")).unwrap();
        // Wrong dimensions for bad.png.
        save_mask(&MaskBuffer::blank(3, 3), &root.join("bad.mask")).unwrap();
        (dir, root)
    }

    #[test]
    fn check_reports_each_outcome() {
        let (_dir, root) = fixture();
        let report = check_project(&root).unwrap();
        let outcome = |rel: &str| {
            &report
                .iter()
                .find(|c| c.rel == rel)
                .expect("missing report entry")
                .outcome
        };
        assert_eq!(*outcome("good.png"), CheckOutcome::Ok);
        assert_eq!(*outcome("bare.png"), CheckOutcome::Missing);
        assert_eq!(
            *outcome("bad.png"),
            CheckOutcome::Mismatch {
                image: (10, 10),
                mask: (3, 3),
            }
        );
    }

    #[test]
    fn init_masks_fills_only_the_gaps() {
        let (_dir, root) = fixture();
        let created = init_missing_masks(&root).unwrap();
        assert_eq!(created, vec!["bare.png"]);
        let mask = load_mask_sync(&root.join("bare.mask"), (4, 4)).unwrap();
        assert_eq!(mask.tagged_count(), 0);
        // Second run is a no-op.
        assert!(init_missing_masks(&root).unwrap().is_empty());
    }

    #[test]
    fn stats_cover_only_existing_masks() {
        let (_dir, root) = fixture();
        // Skip bad.mask by fixing it first.
        save_mask(&MaskBuffer::blank(10, 10), &root.join("bad.mask")).unwrap();
        let stats = collect_stats(&root).unwrap();
        assert_eq!(stats.len(), 2);
        let good = stats.iter().find(|s| s.rel == "good.png").unwrap();
        assert!(good.tagged > 0);
        assert_eq!(good.dimensions, (8, 6));
    }

    #[test]
    fn export_flattens_nested_paths() {
        let (_dir, root) = fixture();
        write_png(&root.join("sub/deep.png"), 5, 5);
        save_mask(&MaskBuffer::blank(5, 5), &root.join("sub/deep.mask")).unwrap();

        let out_dir = root.join("exported");
        let written = export_masks(&root, &out_dir).unwrap();
        assert!(written.iter().any(|p| p.ends_with("sub_deep.png")));
        assert!(out_dir.join("good.png").exists());
    }

    #[test]
    fn export_fails_on_mismatched_mask() {
        let (_dir, root) = fixture();
        let out_dir = root.join("exported");
        assert!(export_masks(&root, &out_dir).is_err());
    }
}
