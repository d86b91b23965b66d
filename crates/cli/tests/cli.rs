use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn create_workspace() -> TempDir {
    let temp_dir = TempDir::new().expect("temp workspace");
    let root = temp_dir.path();
    fs::write(
        root.join("shape.lua"),
        "local Shape = {}\nShape.__index = Shape\n\nfunction Shape.new(w, h)\n  return setmetatable({ w = w, h = h }, Shape)\nend\n\nfunction Shape:area()\n  return self.w * self.h\nend\n\nreturn Shape\n",
    )
    .expect("write shape.lua");
    fs::write(
        root.join("main.lua"),
        "local Shape = require(\"shape\")\nlocal box = setmetatable({}, Shape)\nprint(box:area())\n",
    )
    .expect("write main.lua");
    temp_dir
}

fn luascope(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("luascope").expect("cargo bin luascope");
    cmd.env_remove("RUST_LOG").current_dir(workspace.path());
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run luascope");
    assert!(
        output.status.success(),
        "luascope failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn index_prints_summary() {
    let workspace = create_workspace();
    let summary = stdout_json(luascope(&workspace).arg("index"));

    assert_eq!(summary["files_processed"], 2);
    assert_eq!(summary["files_errored"], 0);
    assert_eq!(summary["workspace"]["documents"], 2);
}

#[test]
fn index_exports_statistics_file() {
    let workspace = create_workspace();
    let stats_path = workspace.path().join("stats.json");

    luascope(&workspace)
        .arg("index")
        .arg(format!("--stats={}", stats_path.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"luascope_version\""));

    let exported: Value =
        serde_json::from_str(&fs::read_to_string(&stats_path).expect("stats file")).unwrap();
    assert_eq!(exported["files_processed"], 2);
}

#[test]
fn definition_follows_metatable_to_method() {
    let workspace = create_workspace();
    let result = stdout_json(luascope(&workspace).args([
        "definition",
        "--file",
        "main.lua",
        "--line",
        "2",
        "--column",
        "11",
    ]));

    assert_eq!(result["kind"], "symbol");
    assert_eq!(result["symbol"]["search_name"], "Shape.area");
    assert!(
        result["symbol"]["location"]["uri"]
            .as_str()
            .unwrap()
            .ends_with("shape.lua")
    );
}

#[test]
fn definition_on_require_string_is_module() {
    let workspace = create_workspace();
    let result = stdout_json(luascope(&workspace).args([
        "definition",
        "--file",
        "main.lua",
        "--line",
        "0",
        "--column",
        "25",
    ]));

    assert_eq!(result["kind"], "module");
    assert!(result["uri"].as_str().unwrap().ends_with("shape.lua"));
}

#[test]
fn complete_lists_members_through_require() {
    let workspace = create_workspace();
    let items = stdout_json(luascope(&workspace).args([
        "complete", "--file", "main.lua", "--input", "Shape.",
    ]));

    let labels: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"new"), "{labels:?}");
    assert!(labels.contains(&"area"), "{labels:?}");
}

#[test]
fn comment_completion_requires_line() {
    let workspace = create_workspace();
    luascope(&workspace)
        .args(["complete", "--file", "shape.lua", "--input", "---"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--line"));
}

#[test]
fn comment_completion_above_function() {
    let workspace = create_workspace();
    let items = stdout_json(luascope(&workspace).args([
        "complete", "--file", "shape.lua", "--input", "---", "--line", "2",
    ]));

    let labels: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"Shape.new comment"), "{labels:?}");
    assert!(labels.contains(&"mark return"), "{labels:?}");
}

#[test]
fn symbols_searches_every_file() {
    let workspace = create_workspace();
    let found = stdout_json(luascope(&workspace).args(["symbols", "--query", "area"]));
    let names: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|symbol| symbol["search_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Shape.area"]);

    let locals = stdout_json(luascope(&workspace).args(["symbols", "--query", "^box$"]));
    assert_eq!(locals.as_array().unwrap().len(), 1);
    assert_eq!(locals[0]["is_local"], true);
}

#[test]
fn search_and_outline() {
    let workspace = create_workspace();
    let found = stdout_json(luascope(&workspace).args([
        "search", "--file", "shape.lua", "--name", "Shape.", "--mode", "prefix",
    ]));
    let names: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|symbol| symbol["search_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Shape.__index", "Shape.area", "Shape.new"]);

    let outline = stdout_json(luascope(&workspace).args(["outline", "--file", "shape.lua"]));
    assert_eq!(outline[0]["name"], "Shape");
    assert_eq!(outline[0]["children"].as_array().unwrap().len(), 3);
}

#[test]
fn unknown_file_is_an_error() {
    let workspace = create_workspace();
    luascope(&workspace)
        .args(["outline", "--file", "missing.lua"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}
