//! File-level tests: load, trim, pixelate, grid and numbered saves.

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use pixelgrid::adjust::grayscale;
use pixelgrid::{
    compute_grid, render_grid, ColorMode, CropRegion, Enhancement, GridSpec, Params, PixelBuffer,
    PixelError, PixelationSpec, Session, TransformState,
};

/// White 100x50 canvas with a colored block in rows 10..40, columns 5..60.
fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let img = RgbaImage::from_fn(100, 50, |x, y| {
        if (10..40).contains(&y) && (5..60).contains(&x) {
            Rgba([(x * 3) as u8, (y * 5) as u8, 120, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let path = dir.path().join("block.png");
    img.save(&path).expect("write fixture");
    path
}

#[test]
fn test_load_decodes_rgba() {
    let dir = TempDir::new().unwrap();
    let buffer = PixelBuffer::load(write_fixture(&dir)).unwrap();
    assert_eq!(buffer.color_mode(), ColorMode::Rgba);
    assert_eq!(buffer.shape(), (50, 100, 4));
}

#[test]
fn test_load_rejects_non_image() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"definitely not a png").unwrap();
    assert!(matches!(PixelBuffer::load(&path), Err(PixelError::Decode { .. })));
}

#[test]
fn test_session_pipeline() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::open(write_fixture(&dir)).unwrap();
    assert_eq!(session.filename(), "block");

    assert!(session.auto_trim(1.0));
    assert_eq!(
        (session.current().width(), session.current().height()),
        (55, 30)
    );
    assert_eq!(session.state(), &TransformState { x_shift: 5, y_shift: 10 });

    let out = session.pixelate(&PixelationSpec::new(50, None), &Enhancement::default());
    assert_eq!(out.width().max(out.height()), 50);
    assert_eq!(out.height(), 27);
}

#[test]
fn test_pixelate_full_image_example() {
    let dir = TempDir::new().unwrap();
    let session = Session::open(write_fixture(&dir)).unwrap();
    let out = session.pixelate(&PixelationSpec::new(50, None), &Enhancement::default());
    assert_eq!((out.width(), out.height()), (50, 25));
}

#[test]
fn test_reopen_resets_shifts() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir);
    let mut session = Session::open(&path).unwrap();
    session.manual_trim(CropRegion::new(10, 10, 50, 40));
    assert_ne!(session.state(), &TransformState::default());

    let session = Session::open(&path).unwrap();
    assert_eq!(session.state(), &TransformState::default());
    assert!(session.trim_mode().is_none());
}

#[test]
fn test_numbered_saves_never_overwrite() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::open(write_fixture(&dir)).unwrap();
    let out = session.pixelate(&PixelationSpec::new(10, Some(2)), &Enhancement::default());

    let prefix = format!("{}/", dir.path().display());
    let first = session.save(&out, &prefix).unwrap();
    let second = session.save(&out, &prefix).unwrap();

    assert_eq!(first, dir.path().join("block0-pxd.png"));
    assert_eq!(second, dir.path().join("block1-pxd.png"));

    // a fresh session starts counting at 0 again and skips existing files
    let mut again = Session::open(dir.path().join("block.png")).unwrap();
    let third = again.save(&out, &prefix).unwrap();
    assert_eq!(third, dir.path().join("block2-pxd.png"));

    let reloaded = PixelBuffer::load(&third).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (out.width(), out.height()));
}

#[test]
fn test_grid_export() {
    let dir = TempDir::new().unwrap();
    let session = Session::open(write_fixture(&dir)).unwrap();
    let out = session.pixelate(&PixelationSpec::new(20, Some(4)), &Enhancement::new(2.0, 1.5));
    assert!(out.unique_colors() <= 4);

    let geometry = compute_grid(out.width(), out.height(), &GridSpec::default()).unwrap();
    let rendered = render_grid(&out, &geometry, 8).unwrap();
    assert_eq!(
        (rendered.width(), rendered.height()),
        (out.width() * 8, out.height() * 8)
    );
}

#[test]
fn test_grayscale_grid_export() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::open(write_fixture(&dir)).unwrap();
    let out = grayscale(&session.pixelate(&PixelationSpec::new(12, Some(3)), &Enhancement::default()));
    assert_eq!(out.color_mode(), ColorMode::Grayscale);

    let geometry = compute_grid(out.width(), out.height(), &GridSpec::default()).unwrap();
    let rendered = render_grid(&out, &geometry, 4).unwrap();
    let path = session.save(&rendered, &format!("{}/", dir.path().display())).unwrap();
    assert_eq!(path, dir.path().join("block0-pxd.png"));
}

#[test]
fn test_params_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("params.txt");
    std::fs::write(
        &path,
        "path_to_repos /repo\nsave_path /tmp/out/\nbogus\ninit_offset 0.5\nwindow_geometry 900x700\n",
    )
    .unwrap();
    let params = Params::load(&path).unwrap();
    assert_eq!(params.save_path, "/tmp/out/");
    assert_eq!(params.window_geometry, "900x700");
    assert_eq!(params.popup_geometry, Params::default().popup_geometry);
    assert_eq!(params.init_offset, 0.5);
}
