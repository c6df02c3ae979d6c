use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_evsync"))
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("evsync_cli_{}_{}_{}", std::process::id(), nanos, name));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn fixture_arg(name: &str) -> String {
    fixture_path(name).to_string_lossy().into_owned()
}

fn sync_args(out_dir: &str) -> Vec<String> {
    [
        "sync",
        "--config",
        &fixture_arg("sync.cfg"),
        "--channel",
        "mt",
        "--sample",
        "DY",
        "--group",
        "mine",
        "other",
        "--file",
        &fixture_arg("mine.json"),
        &fixture_arg("other.json"),
        "--tree",
        "events",
        "sync",
        "--output",
        out_dir,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn read_artifact(dir: &std::path::Path) -> serde_json::Value {
    let path = dir.join("PlotsDiff_mt_DY_mine_other.json");
    let bytes = std::fs::read(&path)
        .unwrap_or_else(|e| panic!("missing artifact {}: {}", path.display(), e));
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn sync_writes_diagnostics_and_artifact() {
    let dir = tmp_dir("sync");
    let args = sync_args(dir.to_string_lossy().as_ref());
    let out = run(&args.iter().map(String::as_str).collect::<Vec<_>>());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(out.status.success(), "sync should succeed, stderr={}", stderr);

    let expected_head = format!(
        "mt DY\nmine  {}  events\nother  {}  sync\n\
         # mine events = 4, # mine unique events = 3\n\
         mine duplicated events:\n1:7:12\n\n\
         # other events = 3, # other unique events = 3\n\
         # common events = 2\n\
         mine events\nrun:lumi:evt = 1:7:10\n\
         other events\nrun:lumi:evt = 1:7:13\n",
        fixture_arg("mine.json"),
        fixture_arg("other.json"),
    );
    assert!(stdout.starts_with(&expected_head), "stdout={}", stdout);

    let bad_line = "run:lumi:evt = 1:7:12, other = 45, mine = 42, other - mine = 3";
    assert!(stdout.contains(&format!("pt_1 bad events:\n{}\n", bad_line)), "stdout={}", stdout);
    assert!(stdout.contains("njets bad events:\nq_1 bad events:\n"), "stdout={}", stdout);
    assert!(
        stderr.contains(
            "WARNING: Unknown branch type combination (f32, u64) for branch ('vec_like', 'vec_like')."
        ),
        "stderr={}",
        stderr
    );

    let v = read_artifact(&dir);
    assert_eq!(v["meta"]["tool"], "evsync");
    assert_eq!(v["meta"]["groups"][1], "other");
    assert_eq!(v["events"]["common"], 2);
    assert_eq!(v["events"]["bad_events"], 2);
    assert_eq!(v["events"]["duplicates"][0], 1);

    let pages = v["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 16);
    assert_eq!(pages[0]["position"], "first");
    assert_eq!(pages[15]["position"], "last");
    assert_eq!(pages[0]["title"], "pt_1 (pt1), all events");
    assert_eq!(pages[3]["kind"], "correlation_2d");
    assert_eq!(pages[12]["title"], "pt_1 (pt1), all events, pre-selection: njets>=2");
    assert_eq!(v["skipped"][0]["branches"][0], "vec_like");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn print_sync_plots_uses_mine_other_arguments() {
    let dir = tmp_dir("print");
    let out = run(&[
        "print-sync-plots",
        "--config",
        &fixture_arg("sync.cfg"),
        "--channel",
        "mt",
        "--sample",
        "DY",
        "--my-group",
        "mine",
        "--my-file",
        &fixture_arg("mine.json"),
        "--my-tree",
        "events",
        "--group",
        "other",
        "--group-file",
        &fixture_arg("other.json"),
        "--group-tree",
        "sync",
        "--my-pre-selection",
        "njets >= 1",
        "--output",
        dir.to_string_lossy().as_ref(),
    ]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "print-sync-plots should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(stdout.contains("# mine events = 3, # mine unique events = 2\n"), "stdout={}", stdout);
    assert!(stdout.contains("mine events\nother events\n"), "stdout={}", stdout);

    let v = read_artifact(&dir);
    assert_eq!(v["events"]["only"][0], 0);
    assert_eq!(v["events"]["only"][1], 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn errors_exit_nonzero_with_message() {
    let dir = tmp_dir("errors");
    let dir_arg = dir.to_string_lossy().into_owned();

    // Only one group label.
    let mut args = sync_args(&dir_arg);
    args.retain(|a| a != "other");
    let out = run(&args.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("ERROR: Invalid number of arguments"), "stderr={}", stderr);

    let mut args = sync_args(&dir_arg);
    for a in args.iter_mut() {
        if a.ends_with("other.json") {
            *a = a.replace("other.json", "absent.json");
        }
    }
    let out = run(&args.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("ERROR: Cannot open file"), "stderr={}", stderr);
    assert!(stderr.contains("absent.json"), "stderr={}", stderr);

    let out = run(&["sync", "--config", "x.cfg"]);
    assert_eq!(out.status.code(), Some(2), "clap usage errors exit with 2");

    assert!(!dir.exists(), "no artifact directory on failure");
}
