// ============================================================================
// Raster I/O — image loading, mask sidecar load/save, background decode
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use image::codecs::png::PngEncoder;
use image::{ColorType, GrayImage, ImageEncoder, RgbaImage};
use rfd::FileDialog;

use crate::mask::MaskBuffer;
use crate::project;

#[derive(Debug)]
pub enum MaskIoError {
    Io(std::io::Error),
    Image(image::ImageError),
    /// Mask raster does not match its source image; a mask always has the
    /// source image's dimensions.
    DimensionMismatch {
        image: (u32, u32),
        mask: (u32, u32),
    },
}

impl std::fmt::Display for MaskIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskIoError::Io(e) => write!(f, "I/O error: {}", e),
            MaskIoError::Image(e) => write!(f, "image error: {}", e),
            MaskIoError::DimensionMismatch { image, mask } => write!(
                f,
                "mask is {}x{} but image is {}x{}",
                mask.0, mask.1, image.0, image.1
            ),
        }
    }
}

impl From<std::io::Error> for MaskIoError {
    fn from(e: std::io::Error) -> Self {
        MaskIoError::Io(e)
    }
}

impl From<image::ImageError> for MaskIoError {
    fn from(e: image::ImageError) -> Self {
        MaskIoError::Image(e)
    }
}

/// Decode a source image to RGBA8.
pub fn load_image_sync(path: &Path) -> Result<RgbaImage, MaskIoError> {
    Ok(image::open(path)?.to_rgba8())
}

/// Decode a mask sidecar. The file is PNG-encoded regardless of its `.mask`
/// extension, so the format is forced rather than guessed from the name.
/// Fails when the mask's dimensions differ from `expect`.
pub fn load_mask_sync(path: &Path, expect: (u32, u32)) -> Result<MaskBuffer, MaskIoError> {
    let reader = std::io::BufReader::new(File::open(path)?);
    let decoded = image::load(reader, image::ImageFormat::Png)?;
    let gray: GrayImage = decoded.to_luma8();
    if gray.dimensions() != expect {
        return Err(MaskIoError::DimensionMismatch {
            image: expect,
            mask: gray.dimensions(),
        });
    }
    Ok(MaskBuffer::from_gray(gray))
}

/// Write a mask as an 8-bit grayscale PNG (tagged = 255, untagged = 0).
pub fn save_mask(mask: &MaskBuffer, path: &Path) -> Result<(), MaskIoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    encoder.write_image(
        mask.as_gray().as_raw(),
        mask.width(),
        mask.height(),
        ColorType::L8,
    )?;
    Ok(())
}

// ============================================================================
// Background load pipeline
// ============================================================================
//
// Image + mask decoding runs off the UI thread; results come back over an
// mpsc channel drained once per frame. `token` is a monotonically increasing
// request id: when the user flips through images faster than decodes finish,
// stale results are dropped on receipt.

pub struct LoadedItem {
    pub rel: String,
    pub image: RgbaImage,
    pub mask: MaskBuffer,
    /// True when the mask came from an existing sidecar file.
    pub mask_from_file: bool,
    pub token: u64,
}

pub enum IoResult {
    Loaded(Box<LoadedItem>),
    Failed {
        rel: String,
        error: String,
        token: u64,
    },
}

/// Decode `rel` (image + mask sidecar) on a worker thread.
///
/// A missing sidecar yields a blank mask; a sidecar that fails to decode or
/// mismatches the image dimensions fails the whole load so a bad mask is
/// never silently replaced.
pub fn spawn_load(sender: mpsc::Sender<IoResult>, root: PathBuf, rel: String, token: u64) {
    std::thread::spawn(move || {
        let image_path = root.join(&rel);
        let result = load_item(&image_path);
        let message = match result {
            Ok((image, mask, mask_from_file)) => IoResult::Loaded(Box::new(LoadedItem {
                rel,
                image,
                mask,
                mask_from_file,
                token,
            })),
            Err(e) => IoResult::Failed {
                rel,
                error: e.to_string(),
                token,
            },
        };
        // Receiver gone means the app is shutting down; nothing to do.
        let _ = sender.send(message);
    });
}

fn load_item(image_path: &Path) -> Result<(RgbaImage, MaskBuffer, bool), MaskIoError> {
    let image = load_image_sync(image_path)?;
    let dims = image.dimensions();
    let mask_path = project::mask_path_for(image_path);
    if mask_path.exists() {
        let mask = load_mask_sync(&mask_path, dims)?;
        Ok((image, mask, true))
    } else {
        Ok((image, MaskBuffer::blank(dims.0, dims.1), false))
    }
}

// ============================================================================
// Native file dialogs
// ============================================================================

/// Wraps the rfd dialogs and remembers the directories last used with them.
#[derive(Default)]
pub struct FileHandler {
    pub last_project_dir: Option<PathBuf>,
    pub last_export_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new(last_project_dir: Option<PathBuf>) -> Self {
        Self {
            last_project_dir,
            last_export_dir: None,
        }
    }

    /// Choose a project directory.
    pub fn pick_project_dir(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new().set_title("Choose image directory");
        if let Some(dir) = &self.last_project_dir {
            dialog = dialog.set_directory(dir);
        }
        let picked = dialog.pick_folder()?;
        self.last_project_dir = Some(picked.clone());
        Some(picked)
    }

    /// Choose a destination for "Export Mask As…".
    pub fn pick_mask_export_path(&mut self, suggested_name: &str) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title("Export mask")
            .set_file_name(suggested_name)
            .add_filter("PNG image", &["png"])
            .add_filter("Mask sidecar", &[project::MASK_EXTENSION]);
        if let Some(dir) = &self.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        let picked = dialog.save_file()?;
        if let Some(parent) = picked.parent() {
            self.last_export_dir = Some(parent.to_path_buf());
        }
        Some(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{TAGGED, UNTAGGED};

    #[test]
    fn mask_save_load_round_trip_is_pixel_identical() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shot.mask");

        let mut mask = MaskBuffer::blank(40, 30);
        mask.stamp(10.0, 10.0, 6.0, TAGGED);
        mask.stroke_segment((5.0, 25.0), (35.0, 25.0), 2.0, TAGGED);
        save_mask(&mask, &path).unwrap();

        let reloaded = load_mask_sync(&path, (40, 30)).unwrap();
        assert_eq!(reloaded.as_gray().as_raw(), mask.as_gray().as_raw());

        // Re-export with no edits: byte content of the raster is stable.
        let path2 = dir.path().join("shot2.mask");
        save_mask(&reloaded, &path2).unwrap();
        let again = load_mask_sync(&path2, (40, 30)).unwrap();
        assert_eq!(again.as_gray().as_raw(), mask.as_gray().as_raw());
    }

    #[test]
    fn untouched_mask_exports_with_image_dimensions() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blank.mask");
        let mask = MaskBuffer::blank(123, 45);
        save_mask(&mask, &path).unwrap();
        let reloaded = load_mask_sync(&path, (123, 45)).unwrap();
        assert_eq!(reloaded.dimensions(), (123, 45));
        assert_eq!(reloaded.tagged_count(), 0);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wrong.mask");
        save_mask(&MaskBuffer::blank(10, 10), &path).unwrap();
        match load_mask_sync(&path, (20, 20)) {
            Err(MaskIoError::DimensionMismatch { image, mask }) => {
                assert_eq!(image, (20, 20));
                assert_eq!(mask, (10, 10));
            }
            other => panic!("expected dimension mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_mask_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.mask");
        assert!(matches!(
            load_mask_sync(&missing, (4, 4)),
            Err(MaskIoError::Io(_))
        ));
    }

    #[test]
    fn mask_values_survive_binary_threshold() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bin.mask");
        let mut mask = MaskBuffer::blank(3, 1);
        mask.stamp(1.5, 0.5, 0.5, TAGGED);
        save_mask(&mask, &path).unwrap();
        let reloaded = load_mask_sync(&path, (3, 1)).unwrap();
        assert_eq!(reloaded.value_at(1, 0), TAGGED);
        for x in 0..3 {
            let v = reloaded.value_at(x, 0);
            assert!(v == TAGGED || v == UNTAGGED);
        }
    }
}
