//! Configuration validation.
//!
//! # Responsibilities
//! - Structural pass: required fields, field types, enum membership,
//!   unknown fields
//! - Reference pass: every path-typed field names an existing entry of the
//!   right kind
//! - Lint pass: non-fatal findings (duplicate mounts, unusable origins)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Reference checks run for every structurally valid path, even when other
//!   fields failed, so one load reports both classes of problem
//! - Field paths use `ssl.key` / `mounts[2].type` notation

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use serde_json::{Map, Value};
use url::Url;

use crate::config::schema::{Config, Mount, MountType, SslConfig};

const CONFIG_FIELDS: &[&str] = &["ssl", "mounts", "origins"];
const SSL_FIELDS: &[&str] = &["key", "certificate", "root"];
const MOUNT_FIELDS: &[&str] = &["name", "type", "path", "directory"];

/// What went wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent.
    Missing,
    /// A field not in the schema.
    UnknownField,
    /// The field has the wrong JSON type.
    WrongType,
    /// The field has the right type but an unacceptable value.
    InvalidValue,
    /// The referenced path does not exist.
    NotFound,
    /// The referenced path exists but is not a regular file.
    NotAFile,
    /// The referenced path exists but is not a directory.
    NotADirectory,
    /// The referenced path exists but cannot be read.
    Unreadable,
}

impl ViolationKind {
    /// True for problems with the filesystem rather than the document itself.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ViolationKind::NotFound
                | ViolationKind::NotAFile
                | ViolationKind::NotADirectory
                | ViolationKind::Unreadable
        )
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field path, e.g. `mounts[0].type`. Empty for the document root.
    pub field: String,
    pub kind: ViolationKind,
    pub reason: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "document: {}", self.reason)
        } else {
            write!(f, "{}: {}", self.field, self.reason)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A non-fatal finding about an otherwise valid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The kind of filesystem entry a path field must name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
}

/// A path-typed field awaiting its filesystem check.
#[derive(Debug)]
struct PathReference {
    field: String,
    path: PathBuf,
    expect: EntryKind,
}

/// Validate a parsed document and build the typed configuration from it.
pub fn validate_document(document: &Value) -> Result<Config, Vec<ValidationError>> {
    let mut walker = Walker::default();
    let config = walker.config(document);

    let mut errors = walker.errors;
    errors.extend(walker.references.iter().filter_map(check_reference));

    match config {
        Some(config) if errors.is_empty() => Ok(config),
        _ => Err(errors),
    }
}

/// Validate a configuration that was built in code rather than loaded.
///
/// Types already rule out most structural problems; what remains is the
/// non-empty mount name and every filesystem reference.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, mount) in config.mounts.iter().enumerate() {
        if mount.name.is_empty() {
            errors.push(ValidationError::new(
                format!("mounts[{i}].name"),
                ViolationKind::InvalidValue,
                "must not be empty",
            ));
        }
    }

    errors.extend(references(config).iter().filter_map(check_reference));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collect non-fatal findings about a configuration.
pub fn lint_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    let mut names: HashMap<&str, usize> = HashMap::new();
    let mut paths: HashMap<&str, usize> = HashMap::new();
    for (i, mount) in config.mounts.iter().enumerate() {
        match names.get(mount.name.as_str()) {
            Some(first) => warnings.push(ConfigWarning {
                field: format!("mounts[{i}].name"),
                message: format!("duplicates the name of mounts[{first}] (`{}`)", mount.name),
            }),
            None => {
                names.insert(&mount.name, i);
            }
        }
        match paths.get(mount.path.as_str()) {
            Some(first) => warnings.push(ConfigWarning {
                field: format!("mounts[{i}].path"),
                message: format!(
                    "duplicates the mount point of mounts[{first}] (`{}`); only the first is reachable",
                    mount.path
                ),
            }),
            None => {
                paths.insert(&mount.path, i);
            }
        }
        if !mount.path.starts_with('/') {
            warnings.push(ConfigWarning {
                field: format!("mounts[{i}].path"),
                message: format!("mount point `{}` does not start with `/`", mount.path),
            });
        }
    }

    for (i, origin) in config.origins.iter().enumerate() {
        if let Some(problem) = origin_problem(origin) {
            warnings.push(ConfigWarning {
                field: format!("origins[{i}]"),
                message: format!("`{origin}` will never match an Origin header: {problem}"),
            });
        }
    }

    warnings
}

fn origin_problem(origin: &str) -> Option<String> {
    if origin == "*" {
        return None;
    }

    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => return Some(format!("not a URL ({e})")),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Some(format!("scheme `{}` is not http or https", url.scheme()));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Some("origins carry no path, query or fragment".to_string());
    }
    if origin.ends_with('/') {
        return Some("trailing slash".to_string());
    }
    None
}

fn references(config: &Config) -> Vec<PathReference> {
    let ssl = &config.ssl;
    let mut refs = vec![
        PathReference {
            field: "ssl.key".into(),
            path: ssl.key.clone(),
            expect: EntryKind::File,
        },
        PathReference {
            field: "ssl.certificate".into(),
            path: ssl.certificate.clone(),
            expect: EntryKind::File,
        },
        PathReference {
            field: "ssl.root".into(),
            path: ssl.root.clone(),
            expect: EntryKind::File,
        },
    ];
    refs.extend(config.mounts.iter().enumerate().map(|(i, mount)| PathReference {
        field: format!("mounts[{i}].directory"),
        path: mount.directory.clone(),
        expect: EntryKind::Directory,
    }));
    refs
}

fn check_reference(reference: &PathReference) -> Option<ValidationError> {
    let path = &reference.path;
    let error = |kind, reason: String| Some(ValidationError::new(&reference.field, kind, reason));

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return error(ViolationKind::NotFound, format!("{} does not exist", path.display()));
        }
        Err(e) => {
            return error(ViolationKind::Unreadable, format!("cannot access {}: {e}", path.display()));
        }
    };

    match reference.expect {
        EntryKind::File if !metadata.is_file() => {
            error(ViolationKind::NotAFile, format!("{} is not a file", path.display()))
        }
        EntryKind::File => match File::open(path) {
            Ok(_) => None,
            Err(e) => error(ViolationKind::Unreadable, format!("cannot read {}: {e}", path.display())),
        },
        EntryKind::Directory if !metadata.is_dir() => {
            error(ViolationKind::NotADirectory, format!("{} is not a directory", path.display()))
        }
        EntryKind::Directory => None,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Structural pass over the document tree.
///
/// Each method records its own violations and returns `None` when the value
/// it was asked for could not be built. Siblings are always all visited
/// before combining, so one bad field never hides another.
#[derive(Default)]
struct Walker {
    errors: Vec<ValidationError>,
    references: Vec<PathReference>,
}

impl Walker {
    fn config(&mut self, value: &Value) -> Option<Config> {
        let map = self.object(value, "")?;
        self.unknown_fields(map, CONFIG_FIELDS, "");

        let ssl = self.required(map, "ssl", "").and_then(|v| self.ssl(v, "ssl"));
        let mounts = self.required(map, "mounts", "").and_then(|v| self.mounts(v, "mounts"));
        let origins = self.required(map, "origins", "").and_then(|v| self.origins(v, "origins"));

        Some(Config {
            ssl: ssl?,
            mounts: mounts?,
            origins: origins?,
        })
    }

    fn ssl(&mut self, value: &Value, field: &str) -> Option<SslConfig> {
        let map = self.object(value, field)?;
        self.unknown_fields(map, SSL_FIELDS, field);

        let key = self.path(map, "key", field, EntryKind::File);
        let certificate = self.path(map, "certificate", field, EntryKind::File);
        let root = self.path(map, "root", field, EntryKind::File);

        Some(SslConfig {
            key: key?,
            certificate: certificate?,
            root: root?,
        })
    }

    fn mounts(&mut self, value: &Value, field: &str) -> Option<Vec<Mount>> {
        let items = self.array(value, field)?;
        let mounts: Vec<Option<Mount>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.mount(item, &format!("{field}[{i}]")))
            .collect();
        mounts.into_iter().collect()
    }

    fn mount(&mut self, value: &Value, field: &str) -> Option<Mount> {
        let map = self.object(value, field)?;
        self.unknown_fields(map, MOUNT_FIELDS, field);

        let name = self.string_field(map, "name", field).and_then(|name| {
            if name.is_empty() {
                self.errors.push(ValidationError::new(
                    child(field, "name"),
                    ViolationKind::InvalidValue,
                    "must not be empty",
                ));
                None
            } else {
                Some(name)
            }
        });
        let mount_type = self.string_field(map, "type", field).and_then(|tag| {
            match tag.parse::<MountType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    self.errors.push(ValidationError::new(
                        child(field, "type"),
                        ViolationKind::InvalidValue,
                        e.to_string(),
                    ));
                    None
                }
            }
        });
        let path = self.string_field(map, "path", field);
        let directory = self.path(map, "directory", field, EntryKind::Directory);

        Some(Mount {
            name: name?,
            mount_type: mount_type?,
            path: path?,
            directory: directory?,
        })
    }

    fn origins(&mut self, value: &Value, field: &str) -> Option<Vec<String>> {
        let items = self.array(value, field)?;
        let origins: Vec<Option<String>> = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.string(item, &format!("{field}[{i}]")))
            .collect();
        origins.into_iter().collect()
    }

    /// A string field that names a filesystem entry; queued for the reference pass.
    fn path(
        &mut self,
        map: &Map<String, Value>,
        key: &str,
        parent: &str,
        expect: EntryKind,
    ) -> Option<PathBuf> {
        let path = PathBuf::from(self.string_field(map, key, parent)?);
        self.references.push(PathReference {
            field: child(parent, key),
            path: path.clone(),
            expect,
        });
        Some(path)
    }

    fn string_field(&mut self, map: &Map<String, Value>, key: &str, parent: &str) -> Option<String> {
        let value = self.required(map, key, parent)?;
        self.string(value, &child(parent, key))
    }

    fn required<'a>(&mut self, map: &'a Map<String, Value>, key: &str, parent: &str) -> Option<&'a Value> {
        let value = map.get(key);
        if value.is_none() {
            self.errors.push(ValidationError::new(
                child(parent, key),
                ViolationKind::Missing,
                "field required",
            ));
        }
        value
    }

    fn unknown_fields(&mut self, map: &Map<String, Value>, allowed: &[&str], parent: &str) {
        for key in map.keys().filter(|k| !allowed.contains(&k.as_str())) {
            self.errors.push(ValidationError::new(
                child(parent, key),
                ViolationKind::UnknownField,
                format!("unknown field (expected one of {})", allowed.join(", ")),
            ));
        }
    }

    fn object<'a>(&mut self, value: &'a Value, field: &str) -> Option<&'a Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.wrong_type(field, "an object", value);
        }
        map
    }

    fn array<'a>(&mut self, value: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
        let items = value.as_array();
        if items.is_none() {
            self.wrong_type(field, "an array", value);
        }
        items
    }

    fn string(&mut self, value: &Value, field: &str) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.wrong_type(field, "a string", value);
                None
            }
        }
    }

    fn wrong_type(&mut self, field: &str, expected: &str, found: &Value) {
        self.errors.push(ValidationError::new(
            field,
            ViolationKind::WrongType,
            format!("expected {expected}, found {}", describe(found)),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    struct Paths {
        _dir: TempDir,
        file: String,
        dir: String,
    }

    fn paths() -> Paths {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("material.pem");
        fs::write(&file, "pem").unwrap();
        let www = dir.path().join("www");
        fs::create_dir(&www).unwrap();
        Paths {
            file: file.to_string_lossy().into_owned(),
            dir: www.to_string_lossy().into_owned(),
            _dir: dir,
        }
    }

    fn document(p: &Paths) -> Value {
        json!({
            "ssl": { "key": p.file, "certificate": p.file, "root": p.file },
            "mounts": [
                { "name": "app", "type": "SPA", "path": "/", "directory": p.dir },
                { "name": "files", "type": "FTP", "path": "/files", "directory": p.dir }
            ],
            "origins": ["https://example.com"]
        })
    }

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_document() {
        let p = paths();
        let config = validate_document(&document(&p)).unwrap();
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(config.mounts[1].mount_type, MountType::Ftp);
        assert_eq!(config.ssl.root, PathBuf::from(&p.file));
    }

    #[test]
    fn test_root_must_be_object() {
        let errors = validate_document(&json!([1, 2])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ViolationKind::WrongType);
        assert_eq!(errors[0].to_string(), "document: expected an object, found an array");
    }

    #[test]
    fn test_all_violations_reported() {
        let p = paths();
        let mut doc = document(&p);
        doc["ssl"].as_object_mut().unwrap().remove("certificate");
        doc["mounts"][0]["type"] = json!("WEBDAV");
        doc["mounts"][1]["name"] = json!(42);
        doc["origins"] = json!(["https://a.example", null]);
        doc["listen"] = json!("0.0.0.0:443");

        let errors = validate_document(&doc).unwrap_err();
        let mut got = fields(&errors);
        got.sort();
        assert_eq!(
            got,
            vec!["listen", "mounts[0].type", "mounts[1].name", "origins[1]", "ssl.certificate"]
        );

        let kind_of = |f: &str| errors.iter().find(|e| e.field == f).unwrap().kind;
        assert_eq!(kind_of("listen"), ViolationKind::UnknownField);
        assert_eq!(kind_of("mounts[0].type"), ViolationKind::InvalidValue);
        assert_eq!(kind_of("mounts[1].name"), ViolationKind::WrongType);
        assert_eq!(kind_of("origins[1]"), ViolationKind::WrongType);
        assert_eq!(kind_of("ssl.certificate"), ViolationKind::Missing);
    }

    #[test]
    fn test_references_checked_alongside_structure() {
        let p = paths();
        let mut doc = document(&p);
        doc["mounts"][0]["type"] = json!("spa");
        doc["mounts"][1]["directory"] = json!(p.file);
        doc["ssl"]["root"] = json!(p.dir);

        let errors = validate_document(&doc).unwrap_err();
        assert_eq!(errors.len(), 3);

        let structural: Vec<_> = errors.iter().filter(|e| !e.kind.is_reference()).collect();
        assert_eq!(structural.len(), 1);
        assert_eq!(structural[0].field, "mounts[0].type");

        let reference: Vec<_> = errors.iter().filter(|e| e.kind.is_reference()).collect();
        assert_eq!(reference[0].field, "ssl.root");
        assert_eq!(reference[0].kind, ViolationKind::NotAFile);
        assert_eq!(reference[1].field, "mounts[1].directory");
        assert_eq!(reference[1].kind, ViolationKind::NotADirectory);
    }

    #[test]
    fn test_missing_paths() {
        let p = paths();
        let mut doc = document(&p);
        doc["ssl"]["key"] = json!("/nonexistent/filemount/key.pem");
        doc["mounts"][0]["directory"] = json!("/nonexistent/filemount/www");

        let errors = validate_document(&doc).unwrap_err();
        assert_eq!(fields(&errors), vec!["ssl.key", "mounts[0].directory"]);
        assert!(errors.iter().all(|e| e.kind == ViolationKind::NotFound));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_tls_file() {
        use std::os::unix::fs::PermissionsExt;

        let p = paths();
        fs::set_permissions(&p.file, fs::Permissions::from_mode(0o000)).unwrap();
        if File::open(&p.file).is_ok() {
            // Running as root: permission bits are not enforced.
            return;
        }

        let errors = validate_document(&document(&p)).unwrap_err();
        assert_eq!(fields(&errors), vec!["ssl.key", "ssl.certificate", "ssl.root"]);
        assert!(errors.iter().all(|e| e.kind == ViolationKind::Unreadable));
        assert!(errors[0].kind.is_reference());
    }

    #[test]
    fn test_empty_mount_name() {
        let p = paths();
        let mut doc = document(&p);
        doc["mounts"][1]["name"] = json!("");
        let errors = validate_document(&doc).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "mounts[1].name");
        assert_eq!(errors[0].kind, ViolationKind::InvalidValue);
    }

    #[test]
    fn test_validate_config_built_in_code() {
        let p = paths();
        let mut config = validate_document(&document(&p)).unwrap();
        assert!(validate_config(&config).is_ok());

        config.mounts[0].name.clear();
        config.ssl.key = PathBuf::from("/nonexistent/filemount/key.pem");
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["mounts[0].name", "ssl.key"]);
    }

    #[test]
    fn test_lint_duplicates_and_origins() {
        let p = paths();
        let mut doc = document(&p);
        doc["mounts"][1]["name"] = json!("app");
        doc["mounts"][1]["path"] = json!("/");
        doc["origins"] = json!([
            "https://example.com",
            "*",
            "https://example.com/",
            "https://example.com/app",
            "example.com",
            "ftp://example.com"
        ]);
        let config = validate_document(&doc).unwrap();

        let warnings = lint_config(&config);
        let got: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            got,
            vec!["mounts[1].name", "mounts[1].path", "origins[2]", "origins[3]", "origins[4]", "origins[5]"]
        );
    }

    #[test]
    fn test_lint_relative_mount_point() {
        let p = paths();
        let mut doc = document(&p);
        doc["mounts"][1]["path"] = json!("files");
        let config = validate_document(&doc).unwrap();
        let warnings = lint_config(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("does not start with `/`"));
    }
}
