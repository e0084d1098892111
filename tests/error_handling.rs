// tests/error_handling.rs

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use assetwatch::config::{load_and_validate, project_root};
use assetwatch::errors::AssetwatchError;
use assetwatch::types::Category;

fn config_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

#[test]
fn full_config_loads_with_defaults_filled_in() {
    let file = config_file(
        r#"
[server]
port = 8080

[rule.styles]
category = "style"
src = ["src/assets/sass/*.sass"]
watch = ["src/assets/sass/**/*.sass"]
dest = "build/assets/css"
cmd = "sass src/assets/sass/main.sass build/assets/css/main.min.css"

[rule.images]
category = "image"
src = ["src/assets/images/**/*.{jpg,png}"]
dest = "build/assets/images"

[rule.html]
category = "html"
src = ["src/*.html"]
watch = ["src/**/*.html"]
dest = "build"

[chain]
image = ["images", "html"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.rules().len(), 3);
    assert_eq!(cfg.server_section().port, 8080);
    assert_eq!(cfg.server_section().host, "127.0.0.1");
    assert!(cfg.server_section().enabled);
    assert!(cfg.config_section().initial_build);
    assert_eq!(cfg.config_section().debounce_ms, 0);
    assert_eq!(
        cfg.chain_overrides().get(&Category::Image),
        Some(&vec!["images".to_string(), "html".to_string()])
    );
}

#[test]
fn duplicate_category_returns_structured_error() {
    let file = config_file(
        r#"
[rule.a]
category = "image"
src = ["src/a/*"]
dest = "build/a"

[rule.b]
category = "image"
src = ["src/b/*"]
dest = "build/b"
"#,
    );

    match load_and_validate(file.path()) {
        Err(AssetwatchError::ConfigError(msg)) => {
            assert!(msg.contains("both declare category 'image'"), "got: {msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn command_rule_without_cmd_is_rejected() {
    let file = config_file(
        r#"
[rule.scripts]
category = "script"
src = ["src/js/*.js"]
dest = "build/js"
"#,
    );

    match load_and_validate(file.path()) {
        Err(AssetwatchError::ConfigError(msg)) => {
            assert!(msg.contains("'scripts'"), "got: {msg}");
            assert!(msg.contains("no `cmd`"), "got: {msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn copy_override_makes_cmd_unnecessary() {
    let file = config_file(
        r#"
[rule.scripts]
category = "script"
transform = "copy"
src = ["src/js/*.js"]
dest = "build/js"
"#,
    );
    assert!(load_and_validate(file.path()).is_ok());
}

#[test]
fn chain_naming_an_unknown_rule_is_rejected() {
    let file = config_file(
        r#"
[rule.html]
category = "html"
src = ["src/*.html"]
dest = "build"

[chain]
html = ["styles", "html"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(AssetwatchError::ConfigError(msg)) => {
            assert!(msg.contains("unknown rule 'styles'"), "got: {msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn invalid_glob_is_rejected() {
    let file = config_file(
        r#"
[rule.images]
category = "image"
src = ["src/images/[.png"]
dest = "build/images"
"#,
    );

    match load_and_validate(file.path()) {
        Err(AssetwatchError::ConfigError(msg)) => {
            assert!(msg.contains("invalid glob"), "got: {msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn empty_config_is_rejected() {
    let file = config_file("[server]\nport = 4000\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AssetwatchError::ConfigError(_))
    ));
}

#[test]
fn unknown_category_is_a_toml_error() {
    let file = config_file(
        r#"
[rule.videos]
category = "video"
src = ["src/videos/*"]
dest = "build/videos"
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(AssetwatchError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("definitely/not/here/Assetwatch.toml"),
        Err(AssetwatchError::IoError(_))
    ));
}

#[test]
fn project_root_resolves_against_the_config_directory() {
    let file = config_file(
        r#"
[config]
root = "site"

[rule.images]
category = "image"
src = ["src/images/*.png"]
dest = "build/images"
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();
    let dir = file.path().parent().unwrap();

    assert_eq!(project_root(file.path(), &cfg), dir.join("site"));
    assert_eq!(
        project_root(Path::new("/srv/web/Assetwatch.toml"), &cfg),
        Path::new("/srv/web/site")
    );
}
