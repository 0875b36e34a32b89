#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use xml_shape::config::Config;

/// Fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn library_xml(&self) -> PathBuf {
        self.fixtures_dir.join("library.xml")
    }

    pub fn library_dtd(&self) -> PathBuf {
        self.fixtures_dir.join("library.dtd")
    }
}

/// Write `content` to `name` inside `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Configuration with snapshots off and reports going to `dir`
pub fn final_only_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.progress.snapshots = false;
    config.output.directory = dir.path().to_path_buf();
    config
}

/// Report files in `dir` whose name starts with `prefix-`, sorted
pub fn reports_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let wanted = format!("{}-", prefix);
    let mut reports: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            let name = path.file_name().unwrap().to_string_lossy();
            name.starts_with(&wanted)
                && name.ends_with(".txt")
                && name.len() == wanted.len() + xml_shape::output::LABEL_LENGTH + 4
        })
        .collect();
    reports.sort();
    reports
}

/// Deep document of `entries` entries, each with an `id` and an optional `note`
pub fn generated_document(entries: usize) -> String {
    let mut xml = String::from("<feed>");
    for i in 0..entries {
        xml.push_str(&format!(r#"<entry id="{}"><title>Entry {}</title>"#, i, i));
        if i % 50 == 0 {
            xml.push_str("<note>rare</note>");
        }
        xml.push_str("</entry>");
    }
    xml.push_str("</feed>");
    xml
}
