//! Ecosystem detection for manifest files.
//!
//! Detection tries, in order: an exact file-name match, a file-name suffix
//! match, and finally content heuristics. It never fails; anything it cannot
//! classify yields `None`.

use crate::model::Ecosystem;

static KNOWN_FILENAMES: &[(&str, Ecosystem)] = &[
    ("package.json", Ecosystem::Npm),
    ("requirements.txt", Ecosystem::PyPI),
    ("requirements-dev.txt", Ecosystem::PyPI),
    ("setup.py", Ecosystem::PyPI),
    ("pom.xml", Ecosystem::Maven),
    ("Gemfile", Ecosystem::RubyGems),
    ("gems.rb", Ecosystem::RubyGems),
    ("Cargo.toml", Ecosystem::Crates),
    ("go.mod", Ecosystem::Go),
];

static KNOWN_SUFFIXES: &[(&str, Ecosystem)] = &[
    (".gemspec", Ecosystem::RubyGems),
    ("requirements.txt", Ecosystem::PyPI),
    (".pom", Ecosystem::Maven),
];

/// Classifies a manifest by name and, when the name is ambiguous, content.
///
/// # Example
///
/// ```
/// use depscan::{detect, Ecosystem};
///
/// assert_eq!(detect("package.json", None), Some(Ecosystem::Npm));
/// assert_eq!(detect("rails.gemspec", None), Some(Ecosystem::RubyGems));
/// assert_eq!(detect("deps.txt", Some("module example.com/x\nrequire golang.org/x/net v0.1.0")), Some(Ecosystem::Go));
/// assert_eq!(detect("README.md", Some("hello")), None);
/// ```
pub fn detect(filename: &str, content: Option<&str>) -> Option<Ecosystem> {
    let basename = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    if let Some((_, eco)) = KNOWN_FILENAMES.iter().find(|(name, _)| *name == basename) {
        return Some(*eco);
    }

    if let Some((_, eco)) = KNOWN_SUFFIXES
        .iter()
        .find(|(suffix, _)| basename.ends_with(suffix))
    {
        return Some(*eco);
    }

    content.and_then(detect_from_content)
}

fn detect_from_content(content: &str) -> Option<Ecosystem> {
    if content.trim().is_empty() {
        return None;
    }

    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(content) {
        if obj.contains_key("dependencies") && obj.contains_key("name") {
            return Some(Ecosystem::Npm);
        }
    }

    if content.contains("install_requires") || content.contains("setup(") {
        return Some(Ecosystem::PyPI);
    }

    if content.contains("<groupId>") && content.contains("<artifactId>") {
        return Some(Ecosystem::Maven);
    }

    if content.contains("[dependencies]") && content.contains("version =") {
        return Some(Ecosystem::Crates);
    }

    let has_go_token = content.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("module ") || line.starts_with("require ")
    });
    if has_go_token {
        return Some(Ecosystem::Go);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_filenames() {
        assert_eq!(detect("package.json", None), Some(Ecosystem::Npm));
        assert_eq!(detect("requirements.txt", None), Some(Ecosystem::PyPI));
        assert_eq!(detect("pom.xml", None), Some(Ecosystem::Maven));
        assert_eq!(detect("Gemfile", None), Some(Ecosystem::RubyGems));
        assert_eq!(detect("Cargo.toml", None), Some(Ecosystem::Crates));
        assert_eq!(detect("go.mod", None), Some(Ecosystem::Go));
    }

    #[test]
    fn test_paths_use_basename() {
        assert_eq!(detect("web/frontend/package.json", None), Some(Ecosystem::Npm));
        assert_eq!(detect("C:\\proj\\go.mod", None), Some(Ecosystem::Go));
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(detect("mygem.gemspec", None), Some(Ecosystem::RubyGems));
        assert_eq!(detect("dev-requirements.txt", None), Some(Ecosystem::PyPI));
        assert_eq!(detect("library-1.0.pom", None), Some(Ecosystem::Maven));
    }

    #[test]
    fn test_content_heuristics() {
        assert_eq!(
            detect("manifest", Some(r#"{"name": "app", "dependencies": {}}"#)),
            Some(Ecosystem::Npm)
        );
        assert_eq!(
            detect("build.py", Some("setup(name='x', install_requires=['requests'])")),
            Some(Ecosystem::PyPI)
        );
        assert_eq!(
            detect("deps.xml", Some("<dependency><groupId>a</groupId><artifactId>b</artifactId></dependency>")),
            Some(Ecosystem::Maven)
        );
        assert_eq!(
            detect("deps.toml", Some("[dependencies]\nserde = { version = \"1\" }")),
            Some(Ecosystem::Crates)
        );
        assert_eq!(
            detect("modfile", Some("module example.com/app\n\ngo 1.21\n")),
            Some(Ecosystem::Go)
        );
    }

    #[test]
    fn test_json_without_name_is_not_npm() {
        assert_eq!(detect("data.json", Some(r#"{"dependencies": {}}"#)), None);
    }

    #[test]
    fn test_unknown_and_malformed_input() {
        assert_eq!(detect("", None), None);
        assert_eq!(detect("", Some("")), None);
        assert_eq!(detect("notes.txt", Some("{not json")), None);
        assert_eq!(detect("binary.bin", Some("\u{0}\u{1}\u{2}")), None);
    }
}
