//! Route document loading.
//!
//! The main document (`PATH_FILE`) is a JSON object whose keys are route
//! patterns and whose values are route specs. Bundle files under the paths
//! directory are merged over it in file-name order; on pattern collision the
//! later entry's spec replaces the earlier one.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::config::schema::{ProxyConfig, RouteSpec};
use crate::error::ConfigError;

/// Load the route document and bundles into an insertion-ordered list of
/// (pattern, spec) entries.
pub fn load_routes(config: &ProxyConfig) -> Result<Vec<(String, RouteSpec)>, ConfigError> {
    let mut document = if config.path_file.exists() {
        read_document(&config.path_file)?
    } else {
        tracing::warn!(path = %config.path_file.display(), "Route document not found, starting empty");
        Map::new()
    };

    for bundle in bundle_files(&config.paths_dir)? {
        let extra = read_document(&bundle)?;
        let count = extra.len();
        for (pattern, spec) in extra {
            document.insert(pattern, spec);
        }
        tracing::info!(bundle = %bundle.display(), routes = count, "Merged route bundle");
    }

    document
        .into_iter()
        .map(|(pattern, value)| {
            let spec: RouteSpec =
                serde_json::from_value(value).map_err(|e| ConfigError::InvalidRoute {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            Ok((pattern, spec))
        })
        .collect()
}

fn read_document(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Bundle files in deterministic (file-name) order. A missing directory is
/// not an error; the feature is optional.
fn bundle_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, ConfigError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Target;

    fn write_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn bundles_override_document_on_collision() {
        let dir = write_tree(&[
            (
                "paths.json",
                r#"{"/api*": {"to": "http://old.internal"}, "/site": {"to": "http://site.internal"}}"#,
            ),
            (
                "paths/10-api.json",
                r#"{"/api*": {"to": "http://new.internal"}}"#,
            ),
        ]);

        let config = ProxyConfig {
            path_file: dir.path().join("paths.json"),
            paths_dir: dir.path().join("paths"),
            ..ProxyConfig::default()
        };

        let routes = load_routes(&config).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].0, "/api*");
        match &routes[0].1.target {
            Some(Target::Remote(url)) => assert_eq!(url.as_str(), "http://new.internal/"),
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn missing_document_is_empty() {
        let config = ProxyConfig {
            path_file: "does-not-exist.json".into(),
            paths_dir: "also-does-not-exist".into(),
            ..ProxyConfig::default()
        };
        assert!(load_routes(&config).unwrap().is_empty());
    }

    #[test]
    fn invalid_spec_reports_pattern() {
        let dir = write_tree(&[("paths.json", r#"{"/bad": {"to": "not a url"}}"#)]);
        let config = ProxyConfig {
            path_file: dir.path().join("paths.json"),
            paths_dir: dir.path().join("paths"),
            ..ProxyConfig::default()
        };
        let err = load_routes(&config).unwrap_err();
        assert!(err.to_string().contains("/bad"));
    }
}
