//! Shared fixtures for configuration integration tests.

use std::fs;
use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;

/// A temporary tree holding TLS files and a mount directory.
pub struct Fixture {
    pub dir: TempDir,
    pub key: PathBuf,
    pub certificate: PathBuf,
    pub root: PathBuf,
    pub www: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("server.key");
        let certificate = dir.path().join("server.crt");
        let root = dir.path().join("RootCA.pem");
        let www = dir.path().join("dist");

        fs::write(&key, "key").unwrap();
        fs::write(&certificate, "certificate").unwrap();
        fs::write(&root, "root").unwrap();
        fs::create_dir(&www).unwrap();

        Self {
            dir,
            key,
            certificate,
            root,
            www,
        }
    }

    /// The documented single-SPA example, pointing at this fixture's files.
    pub fn document(&self) -> Value {
        json!({
            "ssl": {
                "key": self.key,
                "certificate": self.certificate,
                "root": self.root
            },
            "mounts": [
                { "name": "app", "type": "SPA", "path": "/", "directory": self.www }
            ],
            "origins": ["https://example.com"]
        })
    }

    /// Write a JSON document into the fixture and return its path.
    pub fn write(&self, name: &str, document: &Value) -> PathBuf {
        self.write_raw(name, &serde_json::to_string_pretty(document).unwrap())
    }

    /// Write arbitrary text into the fixture and return its path.
    pub fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// A path that is guaranteed not to exist inside the fixture.
#[allow(dead_code)]
pub fn missing(fixture: &Fixture, name: &str) -> PathBuf {
    let path = fixture.path(name);
    assert!(!path.exists());
    path
}
