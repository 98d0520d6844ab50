//! Batch and pair expansion through the binary, including the cleanup sweep.
#![cfg(unix)]

mod common;

use common::{listing, path_arg, stderr, stdout, TestFixture};
use std::fs;

const SINGLE_SCENE_TEMPLATE: &str = r#"
[[workflow.primary]]
operator = "Apply-Orbit-File"
source = "replaced-per-instance"

[[workflow.primary]]
operator = "TOPSAR-Deburst"
"#;

const PAIR_TEMPLATE: &str = r#"
[[workflow.primary]]
operator = "Apply-Orbit-File"
source = "replaced-per-instance"

[[workflow.secondary]]
operator = "Apply-Orbit-File"
source = "replaced-per-instance"

[[workflow.stack]]
operator = "Back-Geocoding"
source = ["$primary", "$secondary"]
parameters = { demName = "SRTM 1Sec HGT" }
"#;

#[test]
fn batch_keeps_final_products_and_sweeps_intermediates() {
    let fixture = TestFixture::new();
    fixture.scene("scenes", "S1A_0623.dim", "23-JUN-2022 05:47:12.000000");
    fixture.scene("scenes", "S1A_0701.dim", "01-JUL-2022 05:47:12.000000");
    fixture.scene("scenes", "notes.dim.txt", "01-JUL-2022 05:47:12.000000");
    let config = fixture.write_config(SINGLE_SCENE_TEMPLATE);
    let gpt = fixture.stub_gpt();
    let out = fixture.output_dir();
    let manifest = fixture.root().join("manifest.json");

    let output = fixture.snapflow(&[
        "--gpt",
        &path_arg(&gpt),
        "batch",
        "--config",
        &path_arg(&config),
        "--output-dir",
        &path_arg(&out),
        "--input-dir",
        &path_arg(&fixture.root().join("scenes")),
        "--pattern",
        "S1A_*.dim",
        "--insert",
        "primary",
        "--manifest",
        &path_arg(&manifest),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert_eq!(fixture.gpt_calls().len(), 4);
    assert_eq!(
        listing(&out),
        vec![
            "20220623_Orb_Deb.data",
            "20220623_Orb_Deb.dim",
            "20220701_Orb_Deb.data",
            "20220701_Orb_Deb.dim",
        ]
    );
    let printed: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(
        printed,
        vec![
            path_arg(&out.join("20220623_Orb_Deb.dim")),
            path_arg(&out.join("20220701_Orb_Deb.dim")),
        ]
    );

    let instances: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&manifest).expect("read manifest"))
            .expect("manifest json");
    assert_eq!(instances.as_array().map(Vec::len), Some(2));
}

#[test]
fn sweep_spares_scenes_read_from_the_output_dir() {
    let fixture = TestFixture::new();
    fixture.scene("out", "S1A_0623.dim", "23-JUN-2022 05:47:12.000000");
    fs::create_dir_all(fixture.output_dir().join("S1A_0623.data")).expect("scene data");
    let config = fixture.write_config(SINGLE_SCENE_TEMPLATE);
    let gpt = fixture.stub_gpt();
    let out = fixture.output_dir();

    let output = fixture.snapflow(&[
        "--gpt",
        &path_arg(&gpt),
        "batch",
        "--config",
        &path_arg(&config),
        "--output-dir",
        &path_arg(&out),
        "--input-dir",
        &path_arg(&out),
        "--pattern",
        "S1A_*.dim",
        "--insert",
        "primary",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        listing(&out),
        vec![
            "20220623_Orb_Deb.data",
            "20220623_Orb_Deb.dim",
            "S1A_0623.data",
            "S1A_0623.dim",
        ]
    );
}

#[test]
fn batch_without_cleanup_keeps_intermediates() {
    let fixture = TestFixture::new();
    fixture.scene("scenes", "S1A_0623.dim", "23-JUN-2022 05:47:12.000000");
    let config = fixture.write_config(SINGLE_SCENE_TEMPLATE);
    let gpt = fixture.stub_gpt();
    let out = fixture.output_dir();

    let output = fixture.snapflow(&[
        "--gpt",
        &path_arg(&gpt),
        "batch",
        "--no-cleanup",
        "--config",
        &path_arg(&config),
        "--output-dir",
        &path_arg(&out),
        "--input-dir",
        &path_arg(&fixture.root().join("scenes")),
        "--pattern",
        "*.dim",
        "--insert",
        "primary",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.join("20220623_Orb.dim").is_file());
    assert!(out.join("20220623_Orb.data").is_dir());
}

#[test]
fn pairs_dry_run_names_stacks_by_date_range() {
    let fixture = TestFixture::new();
    fixture.scene("scenes", "a.dim", "23-JUN-2022 05:47:12.000000");
    fixture.scene("scenes", "b.dim", "01-JUL-2022 05:47:12.000000");
    fixture.scene("scenes", "c.dim", "2022-07-13T05:47:12.000000");
    let config = fixture.write_config(PAIR_TEMPLATE);
    let out = fixture.output_dir();

    let output = fixture.snapflow(&[
        "pairs",
        "--dry-run",
        "--gpt",
        "snapflow-missing-gpt",
        "--config",
        &path_arg(&config),
        "--output-dir",
        &path_arg(&out),
        "--input-dir",
        &path_arg(&fixture.root().join("scenes")),
        "--pattern",
        "*.dim",
        "--insert",
        "primary",
        "--insert",
        "secondary",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    let stack_commands: Vec<&str> = text
        .lines()
        .filter(|line| line.contains("Back-Geocoding"))
        .collect();
    assert_eq!(stack_commands.len(), 2);
    assert_eq!(
        stack_commands[0],
        format!(
            "snapflow-missing-gpt Back-Geocoding -PdemName=\"SRTM 1Sec HGT\" {} {} -t \"{}\"",
            out.join("20220623_Orb.dim").display(),
            out.join("20220701_Orb.dim").display(),
            out.join("20220623_20220701_Stack.dim").display()
        )
    );
    assert!(text.contains(&path_arg(&out.join("20220701_20220713_Stack.dim"))));
    assert!(!out.exists());
}

#[test]
fn clean_removes_everything_not_kept() {
    let fixture = TestFixture::new();
    let out = fixture.output_dir();
    std::fs::create_dir_all(out.join("keep.data")).expect("keep data");
    std::fs::write(out.join("keep.dim"), "").expect("keep dim");
    std::fs::create_dir_all(out.join("drop.data")).expect("drop data");
    std::fs::write(out.join("drop.dim"), "").expect("drop dim");

    let output = fixture.snapflow(&[
        "clean",
        "--output-dir",
        &path_arg(&out),
        "--keep",
        &path_arg(&out.join("keep.dim")),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(listing(&out), vec!["keep.data", "keep.dim"]);
    assert_eq!(stdout(&output).lines().count(), 2);
}
