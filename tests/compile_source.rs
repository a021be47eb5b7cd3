use dbh_rs_core::package::{read_package, PackageMode};
use dbh_rs_core::project::CompileOptions;
use dbh_rs_core::{compile_source, write_project, ChainPolicy, Dialect};
use serde_json::json;
use std::fs;

const GAME: &str = r#"
# the demo from the README
sprite "Cat"
  costume "cat.svg"
  move 100 steps
  say "Hello!"
  when flag clicked
    turn right 15 degrees
    show
  end
end
"#;

const CAT_SVG: &str =
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="48" height="34" viewBox="0 0 48 34"><rect width="48" height="34"/></svg>"#;

#[test]
fn compiles_script_with_costume_into_archive() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cat.svg"), CAT_SVG).unwrap();
    let project = compile_source(GAME, dir.path(), CompileOptions::default()).unwrap();

    let out = dir.path().join("game.sb3");
    write_project(&project, &out, PackageMode::Archive).unwrap();
    let (document, assets) = read_package(&out).unwrap();

    let cat = &document["targets"][1];
    assert_eq!(cat["costumes"][0]["name"], json!("cat"));
    assert_eq!(cat["costumes"][0]["rotationCenterX"], json!(24.0));
    assert_eq!(cat["costumes"][0]["rotationCenterY"], json!(17.0));
    let md5ext = cat["costumes"][0]["md5ext"].as_str().unwrap();
    assert_eq!(assets[md5ext], CAT_SVG.as_bytes());

    let blocks = cat["blocks"].as_object().unwrap();
    assert_eq!(blocks.len(), 5);
    assert_eq!(blocks["3"]["opcode"], json!("event_whenflagclicked"));
    assert_eq!(blocks["3"]["next"], json!("4"));
    assert_eq!(blocks["4"]["inputs"]["DEGREES"], json!([1, [4, "15"]]));
    assert_eq!(blocks["5"]["parent"], json!("4"));
}

#[test]
fn sequential_named_field_options_flow_through() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cat.svg"), CAT_SVG).unwrap();
    let options = CompileOptions {
        dialect: Dialect::NamedField,
        chain: ChainPolicy::Sequential,
        ..CompileOptions::default()
    };
    let project = compile_source(GAME, dir.path(), options).unwrap();
    let document = project.build();
    let blocks = &document.targets()[1]["blocks"];
    assert_eq!(blocks["1"]["next"], json!("2"));
    assert_eq!(blocks["2"]["inputs"]["MESSAGE"]["name"], json!("Hello!"));
    assert_eq!(blocks["3"]["topLevel"], json!(true));
}

#[test]
fn plain_json_output_has_no_archive_wrapper() {
    let dir = tempfile::tempdir().unwrap();
    let project = compile_source("sprite Cat\n show\nend\n", dir.path(), CompileOptions::default()).unwrap();
    let out = dir.path().join("project.json");
    write_project(&project, &out, PackageMode::Json).unwrap();
    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes[0], b'{');
    assert_eq!(bytes, project.build().to_bytes().unwrap());
}

#[test]
fn script_errors_surface_positions() {
    let dir = tempfile::tempdir().unwrap();
    let err = compile_source("sprite Cat\n  move\nend\n", dir.path(), CompileOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Parse error: Expected a number. (line 2, column 7)");
}
