use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::{tempdir, NamedTempFile};

fn write_scene() -> NamedTempFile {
    let scene = r#"<scene>
  <ambient>25 25 25</ambient>
  <object>
    <name>Eye</name>
    <type>camera</type>
    <position>0 1 -5</position>
    <viewport>1920 1080</viewport>
    <render-mode>deferred</render-mode>
    <layers>wireframe</layers>
  </object>
  <object>
    <name>Sun</name>
    <type>directional</type>
    <rotation>45 0 0</rotation>
  </object>
  <object>
    <name>Lamp</name>
    <type>omni</type>
    <position>0 1 2</position>
    <shadows>true</shadows>
    <falloff-end>4</falloff-end>
  </object>
  <object>
    <name>Crate</name>
    <type>mesh</type>
  </object>
</scene>
"#;
    let mut tmp = NamedTempFile::new().expect("temp scene");
    tmp.write_all(scene.as_bytes()).expect("write scene");
    tmp
}

#[test]
fn cli_renders_frames_and_prints_reports() {
    let scene = write_scene();
    let mut cmd = Command::cargo_bin("umbra").expect("binary exists");
    cmd.arg(scene.path()).arg("--frames").arg("2");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 2 lights"))
        .stdout(contains(" - camera Eye"))
        .stdout(contains("Frame 1 (camera Eye):"))
        .stdout(contains(" - render mode: deferred, brdf: unknown, layers: wireframe"))
        .stdout(contains(" - lights: 1 directional, 0 omni, 0 spot"))
        .stdout(contains(" - shadowed lights: 0 directional, 1 omni, 0 spot"))
        .stdout(contains("(6 shadow cameras)"));
}

#[test]
fn cli_saves_settings_that_load_back() {
    let scene = write_scene();
    let dir = tempdir().expect("temp dir");
    let settings = dir.path().join("engine.var");

    Command::cargo_bin("umbra")
        .expect("binary exists")
        .arg(scene.path())
        .arg("--frames")
        .arg("0")
        .arg("--save-settings")
        .arg(&settings)
        .assert()
        .success()
        .stdout(contains("Saved settings to"));

    let text = std::fs::read_to_string(&settings).expect("settings written");
    assert!(text.starts_with("#begin"));
    assert!(text.contains("display_width int 1280"));

    Command::cargo_bin("umbra")
        .expect("binary exists")
        .arg(scene.path())
        .arg("--settings")
        .arg(&settings)
        .assert()
        .success()
        .stdout(contains("Frame 0 (camera Eye):"));
}

#[test]
fn cli_rejects_missing_scene() {
    Command::cargo_bin("umbra")
        .expect("binary exists")
        .arg("does-not-exist.xml")
        .assert()
        .failure()
        .stderr(contains("failed to read scene"));
}
