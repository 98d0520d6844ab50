//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Scratch workspace with dated scenes, a workflow file and a stub processing
/// tool that records its arguments.
pub struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    pub fn gpt_log(&self) -> PathBuf {
        self.root().join("gpt.log")
    }

    /// Write a DIMAP descriptor carrying `start_time` under `dir`.
    pub fn scene(&self, dir: &str, name: &str, start_time: &str) -> PathBuf {
        let dir = self.root().join(dir);
        fs::create_dir_all(&dir).expect("create scene dir");
        let path = dir.join(name);
        fs::write(
            &path,
            format!(
                "<?xml version=\"1.0\"?>\n<Dimap_Document name=\"{name}\">\n  <Production>\n    <PRODUCT_SCENE_RASTER_START_TIME>{start_time}</PRODUCT_SCENE_RASTER_START_TIME>\n  </Production>\n</Dimap_Document>\n"
            ),
        )
        .expect("write scene");
        path
    }

    pub fn write_config(&self, toml: &str) -> PathBuf {
        let path = self.root().join("workflow.toml");
        fs::write(&path, toml).expect("write config");
        path
    }

    /// Stub processing tool: logs argv, then creates the `-t` or
    /// `-PoutputFile=` target with its `.data` directory.
    #[cfg(unix)]
    pub fn stub_gpt(&self) -> PathBuf {
        let body = format!(
            r#"echo "$@" >> "{log}"
target=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-t" ]; then target="$arg"; fi
  case "$arg" in -PoutputFile=*) target="${{arg#-PoutputFile=}}";; esac
  prev="$arg"
done
if [ -n "$target" ]; then
  : > "$target"
  mkdir -p "${{target%.dim}}.data"
fi"#,
            log = self.gpt_log().display()
        );
        self.script("gpt", &body)
    }

    /// Stub processing tool that always fails.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn failing_gpt(&self) -> PathBuf {
        self.script("gpt-failing", "exit 2")
    }

    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = self.root().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    /// Lines the stub processing tool logged, one per invocation.
    pub fn gpt_calls(&self) -> Vec<String> {
        fs::read_to_string(self.gpt_log())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Run the snapflow binary with `args`.
    pub fn snapflow(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_snapflow"))
            .args(args)
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn snapflow")
    }
}

pub fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Sorted entry names of `dir`.
#[allow(dead_code)]
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}
