// Build automation tool - suppress style lints
#![allow(clippy::needless_borrow)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shell_escape::escape;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// One entry of config/arch-matrix.toml
#[derive(Debug, Deserialize)]
struct ArchEntry {
    name: String,
    feature: String,
    target_arch: String,
    instruction_word_size: u64,
    stack_alignment: u64,
}

#[derive(Debug, Deserialize)]
struct Matrix {
    arch: Vec<ArchEntry>,
}

#[derive(Debug, Serialize)]
struct DigestReport<'a> {
    name: &'a str,
    target_arch: &'a str,
    sha256: String,
}

fn describe(cmd: &Command) -> String {
    let mut parts = vec![escape(cmd.get_program().to_string_lossy())];
    parts.extend(cmd.get_args().map(|a| escape(a.to_string_lossy())));
    parts.join(" ")
}

fn run(cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("[RUN] {}", describe(cmd));
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("command failed: {}", describe(cmd));
    }
    Ok(())
}

fn capture(cmd: &mut Command) -> anyhow::Result<Vec<u8>> {
    eprintln!("[RUN] {}", describe(cmd));
    let out = cmd.output()?;
    if !out.status.success() {
        anyhow::bail!(
            "command failed: {}\n{}",
            describe(cmd),
            String::from_utf8_lossy(&out.stderr)
        );
    }
    Ok(out.stdout)
}

fn cargo() -> Command {
    Command::new("cargo")
}

fn have(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

fn root() -> anyhow::Result<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    match manifest_dir.parent() {
        Some(p) => Ok(p.to_path_buf()),
        None => anyhow::bail!("xtask manifest has no parent directory"),
    }
}

fn load_matrix() -> anyhow::Result<Matrix> {
    let path = root()?.join("config/arch-matrix.toml");
    let text = fs::read_to_string(&path)?;
    let matrix: Matrix = toml::from_str(&text)?;
    if matrix.arch.is_empty() {
        anyhow::bail!("{} lists no architectures", path.display());
    }
    Ok(matrix)
}

fn task_fmt() -> anyhow::Result<()> {
    run(cargo().args(["fmt", "--all"]))
}

fn task_fmt_check() -> anyhow::Result<()> {
    run(cargo().args(["fmt", "--all", "--", "--check"]))
}

fn task_clippy() -> anyhow::Result<()> {
    // not --all-features: the architecture features are mutually exclusive
    run(cargo().args([
        "clippy",
        "--workspace",
        "--all-targets",
        "--features",
        "cli",
        "--",
        "-D",
        "warnings",
    ]))
}

fn task_test() -> anyhow::Result<()> {
    run(cargo().args(["test", "--workspace"]))
}

/// Run the test suite once per architecture table
fn task_matrix() -> anyhow::Result<()> {
    let matrix = load_matrix()?;
    for entry in &matrix.arch {
        eprintln!("[MATRIX] {} ({})", entry.name, entry.target_arch);
        run(cargo().args([
            "test",
            "-p",
            "vm-archdefs",
            "--no-default-features",
            "--features",
            &entry.feature,
        ]))?;
    }
    Ok(())
}

fn dump_table(feature: &str) -> anyhow::Result<Vec<u8>> {
    capture(cargo().args([
        "run",
        "--quiet",
        "-p",
        "vm-archdefs",
        "--no-default-features",
        "--features",
        &format!("cli,{}", feature),
        "--bin",
        "arch-table",
        "--",
        "--format",
        "json",
        "--check",
    ]))
}

fn expect_field(
    json: &serde_json::Value,
    entry: &ArchEntry,
    field: &str,
    expected: u64,
) -> anyhow::Result<()> {
    match json.get(field).and_then(|v| v.as_u64()) {
        Some(v) if v == expected => Ok(()),
        other => anyhow::bail!(
            "{}: {} is {:?}, matrix expects {}",
            entry.name,
            field,
            other,
            expected
        ),
    }
}

/// Build each table twice from scratch and compare the dumps, then check
/// that all tables expose the same set of keys
fn task_determinism() -> anyhow::Result<()> {
    if !have("cargo") {
        anyhow::bail!("cargo not found in PATH");
    }
    let matrix = load_matrix()?;
    let mut reports = Vec::new();
    let mut key_sets: Vec<(String, BTreeSet<String>)> = Vec::new();

    for entry in &matrix.arch {
        let first = dump_table(&entry.feature)?;
        run(cargo().args(["clean", "-p", "vm-archdefs"]))?;
        let second = dump_table(&entry.feature)?;

        let d1 = hex::encode(Sha256::digest(&first));
        let d2 = hex::encode(Sha256::digest(&second));
        if d1 != d2 {
            anyhow::bail!("{}: table dump differs between builds ({} vs {})", entry.name, d1, d2);
        }

        let json: serde_json::Value = serde_json::from_slice(&first)?;
        if json.get("name").and_then(|v| v.as_str()) != Some(entry.name.as_str()) {
            anyhow::bail!("{}: feature `{}` selected another table", entry.name, entry.feature);
        }
        expect_field(&json, entry, "instruction_word_size", entry.instruction_word_size)?;
        expect_field(&json, entry, "stack_alignment", entry.stack_alignment)?;

        let keys: BTreeSet<String> = json
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        key_sets.push((entry.name.clone(), keys));

        eprintln!("[DETERMINISM] {} sha256={}", entry.name, d1);
        reports.push(DigestReport {
            name: &entry.name,
            target_arch: &entry.target_arch,
            sha256: d1,
        });
    }

    if let Some((first_name, first_keys)) = key_sets.first() {
        for (name, keys) in &key_sets[1..] {
            if keys != first_keys {
                anyhow::bail!("{} and {} expose different trait sets", first_name, name);
            }
        }
    }

    let out_dir = root()?.join("build");
    fs::create_dir_all(&out_dir)?;
    let report = out_dir.join("arch-digests.json");
    fs::write(&report, serde_json::to_string_pretty(&reports)?)?;
    eprintln!("[DETERMINISM] report written to {}", report.display());
    Ok(())
}

fn task_ci() -> anyhow::Result<()> {
    task_fmt_check()?;
    task_clippy()?;
    task_test()?;
    task_matrix()?;
    task_determinism()
}

fn print_help() {
    eprintln!(
        "xtask commands:\n  fmt | fmt-check | clippy | test\n  matrix        # test every architecture table\n  determinism   # build each table twice and compare dumps\n  ci            # all of the above\n\nExamples:\n  cargo run -p xtask -- matrix\n  cargo run -p xtask -- determinism"
    );
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "help".into());
    match cmd.as_str() {
        "fmt" => task_fmt(),
        "fmt-check" => task_fmt_check(),
        "clippy" => task_clippy(),
        "test" => task_test(),
        "matrix" => task_matrix(),
        "determinism" => task_determinism(),
        "ci" => task_ci(),
        _ => {
            print_help();
            Ok(())
        }
    }
}
