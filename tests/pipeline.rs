//! End-to-end tests through the public library API and the built binary.
//!
//! Fixtures are generated on the fly into temp directories; no binary files
//! are checked in.

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::process::Command;
use sticker_scale::config::{OutputLayout, RunConfig};
use sticker_scale::imaging::RustBackend;
use sticker_scale::job::JobOutcome;
use sticker_scale::run::{RunError, plan, run, run_on};
use sticker_scale::scan::ScanError;
use sticker_scale::scheduler::Scheduler;
use tempfile::TempDir;

fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]))
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

fn write_garbage(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"\x89PNG but not really").unwrap();
}

fn open(path: &Path) -> RgbaImage {
    image::open(path).unwrap().into_rgba8()
}

struct Dirs {
    _tmp: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn dirs() -> Dirs {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("stickers");
    let output = tmp.path().join("scaled");
    std::fs::create_dir_all(&input).unwrap();
    Dirs {
        _tmp: tmp,
        input,
        output,
    }
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Count of pixels with alpha 0 in the given row.
fn transparent_in_row(img: &RgbaImage, y: u32) -> u32 {
    (0..img.width()).filter(|&x| img.get_pixel(x, y)[3] == 0).count() as u32
}

// =============================================================================
// Batch behavior
// =============================================================================

#[test]
fn valid_files_are_written_and_corrupt_one_is_skipped() {
    let d = dirs();
    write_png(&d.input.join("wide.png"), 400, 100);
    write_png(&d.input.join("tall.png"), 100, 400);
    write_png(&d.input.join("square.png"), 64, 64);
    write_garbage(&d.input.join("corrupt.png"));

    let report = run(
        &RunConfig::new(&d.input, &d.output, 512, 512, 2),
        &RustBackend::new(),
        None,
    )
    .unwrap();

    assert_eq!(report.stats.discovered, 4);
    assert_eq!(report.stats.written, 3);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(output_names(&d.output), vec!["square.png", "tall.png", "wide.png"]);
    for name in ["square.png", "tall.png", "wide.png"] {
        let img = open(&d.output.join(name));
        assert_eq!(img.dimensions(), (512, 512), "{name}");
    }

    // 400x100 → 512x128 centered: rows above and below are fully transparent
    let wide = open(&d.output.join("wide.png"));
    assert_eq!(transparent_in_row(&wide, 0), 512);
    assert_eq!(transparent_in_row(&wide, 511), 512);
    assert_eq!(transparent_in_row(&wide, 256), 0);

    // 100x400 → 128x512 centered: 192 transparent columns on each side
    let tall = open(&d.output.join("tall.png"));
    assert_eq!(transparent_in_row(&tall, 256), 384);
    assert_eq!(tall.get_pixel(191, 256)[3], 0);
    assert_ne!(tall.get_pixel(192, 256)[3], 0);
    assert_ne!(tall.get_pixel(319, 256)[3], 0);
    assert_eq!(tall.get_pixel(320, 256)[3], 0);
}

#[test]
fn upscale_and_band_geometry_at_300() {
    let d = dirs();
    write_png(&d.input.join("small.png"), 100, 100);
    write_png(&d.input.join("banner.png"), 200, 50);

    run(
        &RunConfig::new(&d.input, &d.output, 300, 300, 2),
        &RustBackend::new(),
        None,
    )
    .unwrap();

    // 100x100 upscales to fill the canvas edge to edge
    let small = open(&d.output.join("small.png"));
    assert_eq!(small.dimensions(), (300, 300));
    assert_eq!(transparent_in_row(&small, 0), 0);
    assert_eq!(transparent_in_row(&small, 299), 0);

    // 200x50 → 300x75 at y = 112: bands of 112 rows above, 113 below
    let banner = open(&d.output.join("banner.png"));
    assert_eq!(banner.dimensions(), (300, 300));
    assert_eq!(transparent_in_row(&banner, 111), 300);
    assert_eq!(transparent_in_row(&banner, 112), 0);
    assert_eq!(transparent_in_row(&banner, 186), 0);
    assert_eq!(transparent_in_row(&banner, 187), 300);
}

#[test]
fn empty_input_is_not_an_error() {
    let d = dirs();
    std::fs::write(d.input.join("readme.txt"), "no images here").unwrap();

    let report = run(
        &RunConfig::new(&d.input, &d.output, 64, 64, 4),
        &RustBackend::new(),
        None,
    )
    .unwrap();

    assert_eq!(report.stats.discovered, 0);
    assert!(report.files.is_empty());
    assert!(output_names(&d.output).is_empty());
}

#[test]
fn missing_input_aborts_without_creating_output() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("scaled");

    let err = run(
        &RunConfig::new(tmp.path().join("does-not-exist"), &output, 64, 64, 2),
        &RustBackend::new(),
        None,
    )
    .unwrap_err();

    assert!(matches!(err, RunError::InputMissing(_)));
    assert!(!output.exists());
}

#[test]
fn serial_and_parallel_runs_produce_identical_pixels() {
    let d = dirs();
    for (i, (w, h)) in [(37, 91), (250, 13), (640, 480), (5, 5)].iter().enumerate() {
        write_png(&d.input.join(format!("s{i}.png")), *w, *h);
    }
    let serial_out = d.output.join("serial");
    let parallel_out = d.output.join("parallel");

    run(
        &RunConfig::new(&d.input, &serial_out, 128, 96, 1),
        &RustBackend::new(),
        None,
    )
    .unwrap();
    run(
        &RunConfig::new(&d.input, &parallel_out, 128, 96, 4),
        &RustBackend::new(),
        None,
    )
    .unwrap();

    for name in output_names(&serial_out) {
        assert_eq!(
            open(&serial_out.join(&name)),
            open(&parallel_out.join(&name)),
            "{name}"
        );
    }
}

// =============================================================================
// Output layout
// =============================================================================

#[test]
fn flat_layout_collision_fails_fast() {
    let d = dirs();
    write_png(&d.input.join("pack-1/cat.png"), 10, 10);
    write_png(&d.input.join("pack-2/cat.png"), 10, 10);

    let err = run(
        &RunConfig::new(&d.input, &d.output, 32, 32, 2),
        &RustBackend::new(),
        None,
    )
    .unwrap_err();

    assert!(matches!(err, RunError::Scan(ScanError::NameCollision { .. })));
    assert!(!d.output.exists());
}

#[test]
fn mirror_layout_keeps_subdirectories() {
    let d = dirs();
    write_png(&d.input.join("pack-1/cat.png"), 10, 10);
    write_png(&d.input.join("pack-2/cat.png"), 20, 10);
    let config = RunConfig {
        layout: OutputLayout::Mirror,
        ..RunConfig::new(&d.input, &d.output, 32, 32, 2)
    };

    let report = run(&config, &RustBackend::new(), None).unwrap();

    assert_eq!(report.stats.written, 2);
    assert_eq!(open(&d.output.join("pack-1/cat.png")).dimensions(), (32, 32));
    assert_eq!(open(&d.output.join("pack-2/cat.png")).dimensions(), (32, 32));
}

// =============================================================================
// Safety
// =============================================================================

#[cfg(unix)]
#[test]
fn symlink_escaping_input_is_rejected() {
    let d = dirs();
    let outside = TempDir::new().unwrap();
    write_png(&outside.path().join("private.png"), 10, 10);
    write_png(&d.input.join("ok.png"), 10, 10);
    std::os::unix::fs::symlink(outside.path().join("private.png"), d.input.join("leak.png"))
        .unwrap();

    let report = run(
        &RunConfig::new(&d.input, &d.output, 32, 32, 2),
        &RustBackend::new(),
        None,
    )
    .unwrap();

    assert_eq!(report.stats.written, 1);
    assert_eq!(report.stats.rejected, 1);
    assert_eq!(output_names(&d.output), vec!["ok.png"]);
}

#[test]
fn cancelled_run_writes_nothing() {
    let d = dirs();
    for name in ["a.png", "b.png", "c.png"] {
        write_png(&d.input.join(name), 10, 10);
    }
    let scheduler = Scheduler::new(1, 1).unwrap();
    scheduler.cancel_handle().cancel();

    let report = run_on(
        &scheduler,
        &RunConfig::new(&d.input, &d.output, 32, 32, 1),
        &RustBackend::new(),
        None,
    )
    .unwrap();

    assert_eq!(report.stats.cancelled, 3);
    assert!(report.files.iter().all(|f| f.outcome == JobOutcome::Cancelled));
    assert!(output_names(&d.output).is_empty());
}

#[test]
fn plan_touches_nothing() {
    let d = dirs();
    write_png(&d.input.join("a.png"), 10, 10);

    let plan = plan(&RunConfig::new(&d.input, &d.output, 32, 32, 2)).unwrap();

    assert_eq!(plan.files.len(), 1);
    assert!(!d.output.exists());
}

// =============================================================================
// Binary
// =============================================================================

fn sticker_scale() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sticker-scale"))
}

#[test]
fn cli_gen_config_is_valid_toml() {
    let out = sticker_scale().arg("gen-config").output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    let value: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(value.get("width").and_then(|v| v.as_integer()), Some(512));
}

#[test]
fn cli_run_writes_outputs_and_report() {
    let d = dirs();
    write_png(&d.input.join("a.png"), 30, 10);
    write_garbage(&d.input.join("bad.png"));
    let report_path = d.output.with_file_name("report.json");

    let out = sticker_scale()
        .arg("--input")
        .arg(&d.input)
        .arg("--output")
        .arg(&d.output)
        .args(["--width", "48", "--height", "48", "--parallelism", "2"])
        .arg("run")
        .arg("--report")
        .arg(&report_path)
        .output()
        .unwrap();

    assert!(
        out.status.success(),
        "{}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Processed 2 files"));
    assert_eq!(open(&d.output.join("a.png")).dimensions(), (48, 48));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["stats"]["written"], 1);
    assert_eq!(report["stats"]["skipped"], 1);
    assert_eq!(report["files"][1]["status"], "skipped");
}

#[test]
fn cli_missing_input_exits_nonzero() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("scaled");

    let out = sticker_scale()
        .arg("--input")
        .arg(tmp.path().join("nope"))
        .arg("--output")
        .arg(&output)
        .arg("run")
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(!output.exists());
}

#[test]
fn cli_check_lists_files() {
    let d = dirs();
    write_png(&d.input.join("pack/cat.png"), 10, 10);

    let out = sticker_scale()
        .arg("check")
        .arg("--input")
        .arg(&d.input)
        .arg("--output")
        .arg(&d.output)
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("001 cat.png"));
    assert!(stdout.contains("Source: pack/cat.png"));
    assert!(!d.output.exists());
}
