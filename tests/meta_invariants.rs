use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn src_files() -> Vec<PathBuf> {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut files: Vec<PathBuf> = WalkDir::new(&src)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "rs"))
        .collect();
    files.sort();
    assert!(!files.is_empty(), "expected rust files under {src:?}");
    files
}

/// Lines before the first `#[cfg(test)]`; unit-test files are skipped entirely.
fn non_test_lines(path: &Path) -> Vec<(usize, String)> {
    if path.file_name().is_some_and(|n| n == "tests.rs") {
        return Vec::new();
    }
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.to_string()))
        .collect()
}

#[test]
fn no_unwrap_or_expect_outside_tests() {
    let needle = Regex::new(r"\.(unwrap|expect)\(").expect("valid regex");
    let mut hits = Vec::new();
    for path in src_files() {
        for (line_no, line) in non_test_lines(&path) {
            let code = line.split("//").next().unwrap_or_default();
            if needle.is_match(code) {
                hits.push(format!("{}:{}: {}", path.display(), line_no, line.trim()));
            }
        }
    }
    assert!(
        hits.is_empty(),
        "panicking accessors in library code:\n{}",
        hits.join("\n")
    );
}

#[test]
fn check_names_are_unique_and_lowercase() {
    let shape = Regex::new(r"^[a-z][a-z_]*$").expect("valid regex");
    let mut seen = std::collections::BTreeSet::new();
    for check in refstate::check::all_checks() {
        assert!(shape.is_match(check.name), "bad check name `{}`", check.name);
        assert!(seen.insert(check.name), "duplicate check name `{}`", check.name);
        assert!(
            !check.description.is_empty(),
            "check `{}` has no description",
            check.name
        );
    }
}

#[test]
fn every_descriptor_is_registered() {
    let decl = Regex::new(r"pub static ([A-Z_]+): CheckDescriptor").expect("valid regex");
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("src/check.rs");
    let content = fs::read_to_string(&path).expect("read check.rs");
    let declared = decl.captures_iter(&content).count();
    assert_eq!(declared, refstate::check::all_checks().len());
}
