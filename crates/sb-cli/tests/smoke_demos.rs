use sb_cli::run_cli_from_args;
use sb_test_scripts::{demo_script, demos_root};

fn arg(path: std::path::PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn hello_demo_runs_and_resolves_its_symbol() {
    let code = run_cli_from_args([
        "sb-cli".to_string(),
        "run".to_string(),
        "--script".to_string(),
        arg(demo_script("01-hello")),
        "--ticks".to_string(),
        "3".to_string(),
        "--symbol".to_string(),
        "BOOT_FLAG".to_string(),
    ]);
    assert_eq!(code, 0);
}

#[test]
fn all_demos_load_from_a_directory_scan() {
    let code = run_cli_from_args([
        "sb-cli".to_string(),
        "run".to_string(),
        "--scripts-dir".to_string(),
        arg(demos_root()),
        "--ticks".to_string(),
        "2".to_string(),
    ]);
    assert_eq!(code, 0);
}

#[test]
fn run_without_scripts_fails() {
    let code = run_cli_from_args(["sb-cli", "run"]);
    assert_eq!(code, 1);
}

#[test]
fn run_with_a_missing_script_path_fails() {
    let code = run_cli_from_args([
        "sb-cli",
        "run",
        "--script",
        "/nonexistent/never.rhai",
    ]);
    assert_eq!(code, 1);
}

#[test]
fn map_and_describe_print_without_error() {
    assert_eq!(run_cli_from_args(["sb-cli", "map"]), 0);
    assert_eq!(run_cli_from_args(["sb-cli", "describe"]), 0);
}
