use std::path::PathBuf;

use dyngrad::{Color, GradientOptions, PaletteSection, ScheduleEntry};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_dyngrad")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "dyngrad.exe"
            } else {
                "dyngrad"
            });
            p
        })
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn cli_palette_prints_blend() {
    let dir = scratch("palette");
    let sections_path = dir.join("sections.json");
    let section = |name: &str, start: f64, end: f64, top: &str| PaletteSection {
        name: name.to_string(),
        start,
        end,
        top: Color::from(top),
        mid: Color::from(top),
        bottom: Color::from(top),
    };
    let sections = vec![
        section("day", 6.0, 18.0, "#000000"),
        section("night", 18.0, 6.0, "#ffffff"),
    ];
    let f = std::fs::File::create(&sections_path).unwrap();
    serde_json::to_writer_pretty(f, &sections).unwrap();

    let out = std::process::Command::new(exe())
        .args(["palette", "--in"])
        .arg(&sections_path)
        .args(["--hour", "12"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["clock"], "12:00");
    assert_eq!(v["top"], "#808080");
}

#[test]
fn cli_active_prints_entry() {
    let dir = scratch("active");
    let options_path = dir.join("options.json");
    let options = GradientOptions {
        schedule: vec![
            ScheduleEntry::new("06:00", &["#111111"]),
            ScheduleEntry::new("18:00", &["#222222"]),
        ],
        ..GradientOptions::default()
    };
    let f = std::fs::File::create(&options_path).unwrap();
    serde_json::to_writer_pretty(f, &options).unwrap();

    let out = std::process::Command::new(exe())
        .args(["active", "--in"])
        .arg(&options_path)
        .args(["--at", "2:15"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["time"], "18:00");
}

#[test]
fn cli_render_writes_frames() {
    let dir = scratch("render");
    let options_path = dir.join("options.json");
    let script_path = dir.join("script.json");
    let out_dir = dir.join("frames");

    std::fs::write(
        &options_path,
        r##"{ "colors": ["#ff0000", "#0000ff"], "transition_duration_ms": 200 }"##,
    )
    .unwrap();
    std::fs::write(
        &script_path,
        r##"[
            { "at_ms": 0, "action": "set_gradient", "colors": ["#00ff00", "#ffff00"] },
            { "at_ms": 100, "action": "trigger_effect", "loop": false, "hue": "gold" },
            { "at_ms": 300, "action": "stop_effects" }
        ]"##,
    )
    .unwrap();

    let status = std::process::Command::new(exe())
        .args(["render", "--in"])
        .arg(&options_path)
        .arg("--out")
        .arg(&out_dir)
        .arg("--script")
        .arg(&script_path)
        .args([
            "--duration-ms",
            "400",
            "--fps",
            "10",
            "--width",
            "16",
            "--height",
            "8",
            "--at",
            "12:00",
        ])
        .status()
        .unwrap();

    assert!(status.success());
    assert!(out_dir.join("frame_00000.png").exists());
    assert!(out_dir.join("frame_00004.png").exists());
}
