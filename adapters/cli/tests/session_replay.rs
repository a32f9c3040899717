use std::process::Command;

fn run_session(seed: &str) -> Vec<u8> {
    let output = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args([
            "run",
            "--quiet",
            "--bin",
            "merge-grove",
            "--",
            "--ticks",
            "48",
            "--seed-items",
            "16",
            "--seed",
            seed,
        ])
        .output()
        .expect("failed to run the merge-grove session driver");

    assert!(output.status.success(), "session run should succeed");
    output.stdout
}

#[test]
fn equal_seeds_replay_equal_sessions() {
    assert_eq!(
        run_session("11"),
        run_session("11"),
        "equal seeds must replay byte-identical sessions"
    );
}
