use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn act(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("act"));
    cmd.current_dir(dir)
        .env("ACT_EMBEDDING_MODE", "stub")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ACT_INDEX_DIR")
        .env_remove("ACT_AUTH_TOKEN");
    cmd
}

fn write_sources(root: &Path) {
    let sources = root.join("sources");
    std::fs::create_dir_all(&sources).expect("create sources");
    std::fs::write(
        sources.join("Greeter.pas"),
        "procedure Greet;\nbegin\n  WriteLn('Hello');\nend;\n",
    )
    .expect("write pas");
    std::fs::write(
        sources.join("Greeter.cs"),
        "static void Greet()\n{\n    Console.WriteLine(\"Hello\");\n}\n",
    )
    .expect("write cs");
    std::fs::write(
        sources.join("Adder.pas"),
        "function Add(A, B: Integer): Integer;\nbegin\n  Result := A + B;\nend;\n",
    )
    .expect("write pas");
    std::fs::write(
        sources.join("Adder.cs"),
        "static int Add(int a, int b)\n{\n    return a + b;\n}\n",
    )
    .expect("write cs");
    std::fs::write(sources.join("Lonely.pas"), "unit Lonely;").expect("write pas");
}

fn pair_and_index(root: &Path) {
    write_sources(root);
    act(root)
        .args(["pair", "sources", "--out", "paired_data.jsonl"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote 2 examples"));
    act(root)
        .args(["index", "paired_data.jsonl"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Indexed 2/2 examples"));
}

#[test]
fn pair_index_and_search_offline() {
    let temp = TempDir::new().expect("tempdir");
    pair_and_index(temp.path());

    assert!(temp.path().join(".act/index/index.bin").is_file());
    assert!(temp.path().join(".act/index/metadata.jsonl").is_file());
    assert!(temp.path().join(".act/index/manifest.json").is_file());

    let output = act(temp.path())
        .args([
            "search",
            "--json",
            "-k",
            "1",
            "function Add(A, B: Integer): Integer;\nbegin\n  Result := A + B;\nend;",
        ])
        .output()
        .expect("run search");
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let hits = result["hits"].as_array().expect("hits");
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0]["example"]["output"],
        "static int Add(int a, int b)\n{\n    return a + b;\n}"
    );
}

#[test]
fn prompt_preview_lists_examples_before_query() {
    let temp = TempDir::new().expect("tempdir");
    pair_and_index(temp.path());

    act(temp.path())
        .args(["prompt", "x := 1;"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Translate Delphi Pascal to C# using the examples below.",
        ))
        .stdout(predicate::str::contains("---\n"))
        .stdout(predicate::str::contains("Delphi:\nx := 1;\n\nC#:\n"));
}

#[test]
fn blank_snippet_is_rejected_before_any_model_call() {
    let temp = TempDir::new().expect("tempdir");
    pair_and_index(temp.path());

    act(temp.path())
        .args(["translate", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source code is empty"));
}

#[test]
fn missing_index_points_at_index_command() {
    let temp = TempDir::new().expect("tempdir");
    act(temp.path())
        .args(["search", "begin end."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("act index"));
}

#[test]
fn index_dir_flag_and_config_file_are_honoured() {
    let temp = TempDir::new().expect("tempdir");
    write_sources(temp.path());
    std::fs::write(
        temp.path().join("act.toml"),
        "[embedding]\ndimension = 16\n\n[index]\ndir = \"from-config\"\n",
    )
    .expect("write config");

    act(temp.path())
        .args(["pair", "sources"])
        .assert()
        .success();
    act(temp.path())
        .args(["index", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"indexed\": 2"));
    assert!(temp.path().join("from-config/manifest.json").is_file());

    act(temp.path())
        .args(["--index-dir", "elsewhere", "index"])
        .assert()
        .success();
    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp.path().join("elsewhere/manifest.json")).expect("read"),
    )
    .expect("manifest json");
    assert_eq!(manifest["dimension"], 16);
    assert_eq!(manifest["embedding_model"], "stub");
}

#[test]
fn invalid_config_key_fails_fast() {
    let temp = TempDir::new().expect("tempdir");
    std::fs::write(temp.path().join("act.toml"), "[retrieval]\ntopk = 2\n").expect("write");

    act(temp.path())
        .args(["pair", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn serve_http_refuses_non_loopback_without_public() {
    let temp = TempDir::new().expect("tempdir");
    act(temp.path())
        .args(["serve-http", "--bind", "0.0.0.0:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to bind"));
}

#[test]
fn serve_http_public_requires_auth_token() {
    let temp = TempDir::new().expect("tempdir");
    act(temp.path())
        .args(["serve-http", "--public", "--bind", "0.0.0.0:0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--public requires an auth token"));
}

#[test]
fn serve_http_rejects_malformed_cors_origin() {
    let temp = TempDir::new().expect("tempdir");
    act(temp.path())
        .args(["serve-http", "--cors-origin", "http://bad\norigin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid CORS origin"));
}
