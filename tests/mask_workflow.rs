//! End-to-end mask workflow: open a project directory, load an image,
//! paint, save the sidecar, and re-import it.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use masktag::io::{load_image_sync, load_mask_sync, save_mask};
use masktag::mask::{MaskBuffer, TAGGED, UNTAGGED};
use masktag::project::{mask_path_for, Project};

fn write_test_image(path: &Path, w: u32, h: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut img = RgbaImage::new(w, h);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255]);
    }
    // The JPEG encoder rejects alpha, so route .jpg through RGB.
    if path.extension().is_some_and(|e| e == "jpg") {
        image::DynamicImage::ImageRgba8(img).to_rgb8().save(path).unwrap();
    } else {
        img.save(path).unwrap();
    }
}

fn project_fixture() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    write_test_image(&root.join("frames/0001.png"), 64, 48);
    write_test_image(&root.join("frames/0002.png"), 64, 48);
    write_test_image(&root.join("cover.jpg"), 32, 32);
    (dir, root)
}

#[test]
fn untouched_mask_exports_with_source_dimensions() {
    let (_dir, root) = project_fixture();
    let project = Project::open(root.clone()).unwrap();

    for rel in ["cover.jpg", "frames/0001.png", "frames/0002.png"] {
        let image = load_image_sync(&project.image_path(rel)).unwrap();
        let mask = MaskBuffer::blank(image.width(), image.height());
        let mask_path = project.mask_path(rel);
        save_mask(&mask, &mask_path).unwrap();

        let reloaded = load_mask_sync(&mask_path, image.dimensions()).unwrap();
        assert_eq!(reloaded.dimensions(), image.dimensions());
    }
}

#[test]
fn stroke_modifies_only_the_painted_path() {
    let (_dir, root) = project_fixture();
    let project = Project::open(root.clone()).unwrap();

    let image = load_image_sync(&project.image_path("frames/0001.png")).unwrap();
    let mut mask = MaskBuffer::blank(image.width(), image.height());

    mask.stroke_segment((10.0, 24.0), (50.0, 24.0), 3.0, TAGGED);

    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let px = (x as f32 + 0.5, y as f32 + 0.5);
            let dist = segment_distance(px, (10.0, 24.0), (50.0, 24.0));
            if dist <= 2.0 {
                assert_eq!(mask.value_at(x, y), TAGGED, "inside at {},{}", x, y);
            }
            if dist > 4.5 {
                assert_eq!(mask.value_at(x, y), UNTAGGED, "outside at {},{}", x, y);
            }
        }
    }
}

#[test]
fn reexport_without_edits_is_pixel_identical() {
    let (_dir, root) = project_fixture();
    let image_path = root.join("frames/0002.png");
    let mask_path = mask_path_for(&image_path);

    let mut mask = MaskBuffer::blank(64, 48);
    mask.stamp(20.0, 20.0, 7.0, TAGGED);
    mask.stroke_segment((30.0, 5.0), (30.0, 40.0), 2.5, TAGGED);
    mask.stamp(20.0, 20.0, 3.0, UNTAGGED);
    save_mask(&mask, &mask_path).unwrap();

    // Import, export untouched, import again.
    let first = load_mask_sync(&mask_path, (64, 48)).unwrap();
    let second_path = root.join("frames/0002-copy.mask");
    save_mask(&first, &second_path).unwrap();
    let second = load_mask_sync(&second_path, (64, 48)).unwrap();

    assert_eq!(first.as_gray().as_raw(), second.as_gray().as_raw());
    assert_eq!(mask.as_gray().as_raw(), second.as_gray().as_raw());
}

#[test]
fn reopening_a_project_sees_saved_masks() {
    let (_dir, root) = project_fixture();
    {
        let project = Project::open(root.clone()).unwrap();
        let rel = "frames/0001.png";
        let image = load_image_sync(&project.image_path(rel)).unwrap();
        let mut mask = MaskBuffer::blank(image.width(), image.height());
        mask.stamp(32.0, 24.0, 10.0, TAGGED);
        save_mask(&mask, &project.mask_path(rel)).unwrap();
    }

    let project = Project::open(root).unwrap();
    let rel = "frames/0001.png";
    let mask = load_mask_sync(&project.mask_path(rel), (64, 48)).unwrap();
    assert!(mask.tagged_count() > 0);
    // Mask sidecars must never be picked up as project images.
    assert!(project.filenames().all(|f| !f.ends_with(".mask")));
}

fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);
    let len2 = ab.0 * ab.0 + ab.1 * ab.1;
    let t = if len2 == 0.0 {
        0.0
    } else {
        ((ap.0 * ab.0 + ap.1 * ab.1) / len2).clamp(0.0, 1.0)
    };
    let closest = (a.0 + ab.0 * t, a.1 + ab.1 * t);
    ((p.0 - closest.0).powi(2) + (p.1 - closest.1).powi(2)).sqrt()
}
