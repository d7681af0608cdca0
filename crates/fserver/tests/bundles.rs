//! Bundle upload flows: test packages, binary packages and runs.

mod common;

use common::Harness;
use fserver::{ContentType, Outcome};
use fserver_store::ErrorKind;
use fserver_test_utils::bundles;
use std::fs;

const TEST_YAML: &str = "\
name: mytest
description: Checks that the board boots
tags:
  - boot
  - smoke
data_files:
  - fuego_test.sh
";

const RUN_JSON: &str = r#"{
    "run_id": "2018-03-07_09-10-00-Functional.bc-hostA:boardA",
    "description": "Functional.bc on boardA",
    "files": ["testlog.txt"],
    "metadata": {"board": "boardA", "test_name": "Functional.bc", "result": "PASS"}
}"#;

const RUN_BUNDLE: &str = "run-2018-03-07_09-10-00-Functional.bc-hostA:boardA.frp";
const RUN_ID: &str = "2018-03-07_09-10-00-Functional.bc-hostA:boardA";

#[test]
fn test_put_test_stores_manifest() {
    let h = Harness::new();
    let bytes = bundles::test_package("mytest", TEST_YAML).unwrap();

    let response = h.upload("put_test", "mytest-1.0-1.ftp", bytes.clone());
    assert!(response.is_ok(), "{}", response.render());
    assert_eq!(h.record_files("tests"), vec!["mytest-1.0-1.yaml"]);
    assert!(h.files_path("tests/mytest-1.0-1.ftp").is_file());

    let again = h.upload("put_test", "mytest-1.0-1.ftp", bytes);
    assert_eq!(again.error_kind, Some(ErrorKind::AlreadyExists));
    assert!(again.body.starts_with("Already have a file mytest-1.0-1.ftp"));
    assert_eq!(h.record_files("tests"), vec!["mytest-1.0-1.yaml"]);

    let text = h.call("get_test", &[("name", "mytest-1.0-1")]);
    assert_eq!(text.body, TEST_YAML);

    let listed = h.call("query_tests", &[("name", "my*")]);
    assert_eq!(listed.render(), "OK\nmytest-1.0-1.yaml");
    let none = h.call("query_tests", &[("name", "other")]);
    assert_eq!(none.body, "");
}

#[test]
fn test_put_test_rejects_existing_upload_name() {
    let h = Harness::new();
    fs::write(h.files_path("tests/mytest-1.0-1.ftp"), b"leftover").unwrap();

    let bytes = bundles::test_package("mytest", TEST_YAML).unwrap();
    let response = h.upload("put_test", "mytest-1.0-1.ftp", bytes);
    assert_eq!(response.error_kind, Some(ErrorKind::AlreadyExists));
    assert!(response.body.contains("Already have a file"));
    assert_eq!(fs::read(h.files_path("tests/mytest-1.0-1.ftp")).unwrap(), b"leftover");
    assert!(h.record_files("tests").is_empty());
}

#[test]
fn test_put_test_without_manifest_fails() {
    let h = Harness::new();
    let bytes = bundles::test_package("othertest", TEST_YAML).unwrap();

    let response = h.upload("put_test", "mytest-1.0-1.ftp", bytes);
    assert_eq!(response.error_kind, Some(ErrorKind::ExtractionFailed));
    assert!(h.record_files("tests").is_empty());
}

#[test]
fn test_put_test_rejects_path_in_filename() {
    let h = Harness::new();
    let bytes = bundles::test_package("mytest", TEST_YAML).unwrap();

    let response = h.upload("put_test", "../mytest-1.0-1.ftp", bytes);
    assert_eq!(response.error_kind, Some(ErrorKind::BadRequest));
    assert!(!h.layout.home().join("files/mytest-1.0-1.ftp").exists());
}

#[test]
fn test_put_binary_package() {
    let h = Harness::new();
    let bytes =
        bundles::binary_package("hello", r#"{"toolchain": "arm64", "test": "hello"}"#).unwrap();

    let response = h.upload("put_binary_package", "arm64-Functional.hello.ftbp", bytes);
    assert!(response.is_ok(), "{}", response.render());
    assert_eq!(
        h.record_files("binary-packages"),
        vec!["arm64-Functional.hello.json"]
    );

    let by_type = h.call("query_binary_packages", &[("test_type", "Functional")]);
    assert_eq!(by_type.body, "arm64-Functional.hello.json");
    let by_toolchain = h.call("query_binary_packages", &[("toolchain", "x86*")]);
    assert_eq!(by_toolchain.body, "");
}

#[test]
fn test_put_binary_package_requires_marker() {
    let h = Harness::new();
    let bytes = bundles::binary_package("hello", "{}").unwrap();
    let response = h.upload("put_binary_package", "arm64-hello.ftbp", bytes);
    assert_eq!(response.error_kind, Some(ErrorKind::BadRequest));
}

#[test]
fn test_run_lifecycle() {
    let h = Harness::new();
    let bytes = bundles::run_bundle(RUN_JSON).unwrap();

    let put = h.upload("put_run", RUN_BUNDLE, bytes);
    assert!(put.is_ok(), "{}", put.render());
    assert!(put.body.contains(&format!("run-{}.json", RUN_ID)));
    assert!(h
        .files_path(&format!("runs/run-{}/testlog.txt", RUN_ID))
        .is_file());

    let manifest = h.call("get_run", &[("run_id", RUN_ID)]);
    let value: serde_json::Value = serde_json::from_str(&manifest.body).unwrap();
    assert_eq!(value["metadata"]["result"], "PASS");

    let url = h.call("get_run_url", &[("run_id", format!("run-{}.json", RUN_ID).as_str())]);
    assert_eq!(url.render(), format!("OK\n/fserver-files/runs/{}", RUN_BUNDLE));

    let by_meta = h.call("query_runs", &[("board", "board*"), ("result", "PASS")]);
    assert_eq!(by_meta.body, format!("run-{}.json", RUN_ID));
    let by_id = h.call("query_runs", &[("run_id", "2018-03-07*")]);
    assert_eq!(by_id.body, format!("run-{}.json", RUN_ID));
    let failed = h.call("query_runs", &[("result", "FAIL")]);
    assert_eq!(failed.body, "");

    let removed = h.call("remove_run", &[("run_id", RUN_ID)]);
    assert!(removed.is_ok(), "{}", removed.render());
    assert!(h.record_files("runs").is_empty());
    assert!(!h.files_path(&format!("runs/{}", RUN_BUNDLE)).exists());
    assert!(!h.files_path(&format!("runs/run-{}", RUN_ID)).exists());

    let again = h.call("remove_run", &[("run_id", RUN_ID)]);
    assert_eq!(again.error_kind, Some(ErrorKind::NotFound));
}

#[test]
fn test_remove_run_with_missing_bundle_still_removes_rest() {
    let h = Harness::new();
    let bytes = bundles::run_bundle(RUN_JSON).unwrap();
    assert!(h.upload("put_run", RUN_BUNDLE, bytes).is_ok());
    fs::remove_file(h.files_path(&format!("runs/{}", RUN_BUNDLE))).unwrap();

    let url = h.call("get_run_url", &[("run_id", RUN_ID)]);
    assert_eq!(url.error_kind, Some(ErrorKind::NotFound));

    let removed = h.call("remove_run", &[("run_id", RUN_ID)]);
    assert!(removed.is_ok(), "{}", removed.render());
    assert!(removed.body.contains("missing run bundle"));
    assert!(h.record_files("runs").is_empty());
}

#[test]
fn test_put_run_twice() {
    let h = Harness::new();
    let bytes = bundles::run_bundle(RUN_JSON).unwrap();
    assert!(h.upload("put_run", RUN_BUNDLE, bytes.clone()).is_ok());
    let again = h.upload("put_run", RUN_BUNDLE, bytes);
    assert_eq!(again.error_kind, Some(ErrorKind::AlreadyExists));
    assert!(again.body.starts_with("Already have a file"));
}

#[test]
fn test_show_pages() {
    let h = Harness::new();
    let bytes = bundles::test_package("mytest", TEST_YAML).unwrap();
    assert!(h.upload("put_test", "mytest-1.0-1.ftp", bytes).is_ok());
    let bytes = bundles::run_bundle(RUN_JSON).unwrap();
    assert!(h.upload("put_run", RUN_BUNDLE, bytes).is_ok());

    let list = h.show("Tests");
    assert_eq!(list.outcome, Outcome::Ok);
    assert_eq!(list.content_type, ContentType::Html);
    assert!(list
        .body
        .contains("<a href=\"/cgi-bin/fserver/mytest-1.0-1.yaml\">mytest-1.0-1.yaml</a>"));
    assert!(!list.render().starts_with("OK"));

    let test = h.show("mytest-1.0-1.yaml");
    assert!(test.is_ok(), "{}", test.body);
    assert!(test
        .body
        .contains("<h2>description</h2>\n<p>Checks that the board boots</p>"));
    assert!(test.body.contains("<li>smoke</li>"));

    let run = h.show(&format!("run-{}.json", RUN_ID));
    assert!(run.is_ok(), "{}", run.body);
    assert!(run.body.contains("<h2>files</h2>\n<ul>\n<li>testlog.txt</li>"));

    let empty = h.show("Requests");
    assert!(empty.body.contains("No request records found."));

    let missing = h.show("request-2018-03-07_09:05:02.00-hostA:boardA.json");
    assert_eq!(missing.outcome, Outcome::Fail);
    assert!(missing.body.contains("<font color=red>"));
}
