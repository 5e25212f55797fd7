#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// The bincheck binary with an isolated registry and no ambient database.
pub fn bincheck(registry: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bincheck").unwrap();
    cmd.env("BINCHECK_REGISTRY", registry)
        .env_remove("BINCHECK_DB")
        .env_remove("BINCHECK_DATA")
        .env_remove("RUST_BACKTRACE")
        .env_remove("RUST_LIB_BACKTRACE");
    cmd
}

/// Scratch area holding a registry path, a database file and one genome.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("reference.dmnd"), b"stand-in database").unwrap();
        fs::create_dir(dir.path().join("bins")).unwrap();
        fs::write(dir.path().join("bins").join("bin_1.fna"), ">c1\nACGTACGT\n").unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn registry(&self) -> PathBuf {
        self.path().join("registry.json")
    }

    pub fn database(&self) -> PathBuf {
        self.path().join("reference.dmnd")
    }

    pub fn bins(&self) -> PathBuf {
        self.path().join("bins")
    }

    pub fn output(&self) -> PathBuf {
        self.path().join("out")
    }

    pub fn data(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Writes one test genome and a manifest recording `listed_sha256` for it.
    pub fn write_test_set(&self, genome: &str, listed_sha256: &str) {
        let testrun = self.data().join("testrun");
        fs::create_dir_all(&testrun).unwrap();
        fs::write(testrun.join("TEST1.tst"), genome).unwrap();
        fs::write(
            testrun.join("expected.tsv"),
            format!(
                "name\tsha256\tcompleteness_min\tcompleteness_max\tcontamination_min\tcontamination_max\n\
                 TEST1\t{listed_sha256}\t90\t100\t0\t5\n"
            ),
        )
        .unwrap();
    }

    pub fn command(&self) -> Command {
        bincheck(&self.registry())
    }
}

pub fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
