use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::normalization::Entity;

/// Top-level shape of the FoodKeeper-style JSON exports.
#[derive(Debug, Default, Deserialize)]
pub struct Export {
    /// Missing `data` means nothing to seed.
    #[serde(default)]
    pub data: Vec<Entity>,
}

/// Read and parse an export file. Any I/O or shape error is fatal to the run.
pub fn load_export(path: &Path) -> Result<Export> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let export: Export = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {} as a data export", path.display()))?;
    debug!(path = %path.display(), entities = export.data.len(), "export loaded");
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("tmp file");
        f.write_all(contents.as_bytes()).expect("write");
        f
    }

    #[test]
    fn reads_entities_in_file_order() {
        let f = write_tmp(
            r#"{"sheet":"Product","data":[[{"ID":1},{"Name":"Beans"}],[{"ID":2}]]}"#,
        );
        let export = load_export(f.path()).unwrap();
        assert_eq!(export.data.len(), 2);
        assert_eq!(export.data[0].len(), 2);
        assert_eq!(export.data[1][0]["ID"], serde_json::json!(2));
    }

    #[test]
    fn missing_data_field_is_empty() {
        let f = write_tmp(r#"{"sheet":"Category"}"#);
        assert!(load_export(f.path()).unwrap().data.is_empty());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_export(Path::new("/nonexistent/product.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/product.json"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let f = write_tmp("{not json");
        assert!(load_export(f.path()).is_err());
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let f = write_tmp(r#"{"data":[{"ID":1}]}"#);
        assert!(load_export(f.path()).is_err());
    }
}
