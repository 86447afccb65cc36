//! Tax pack files and atomic writes
//!
//! Packs live in a data directory as `{country}-{year}.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DataError;
use crate::model::TaxPack;
use crate::validation::{validate_brackets, validate_metadata};

/// Path of the pack for `country` and `year` inside `dir`.
#[must_use]
pub fn tax_pack_path(dir: &Path, country: &str, year: i32) -> PathBuf {
    dir.join(format!("{}-{year}.json", country.to_ascii_lowercase()))
}

/// Read and parse a tax pack without structural checks.
pub fn load_tax_pack(dir: &Path, country: &str, year: i32) -> Result<TaxPack, DataError> {
    let path = tax_pack_path(dir, country, year);
    let content = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DataError::MissingDataFile(path.clone())
        } else {
            DataError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;

    let pack: TaxPack = serde_json::from_str(&content).map_err(|source| DataError::Json {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded tax pack");
    Ok(pack)
}

impl TaxPack {
    /// Load a pack and reject it unless it is fit for computation.
    ///
    /// Malformed bracket schedules fail with [`DataError::MalformedBrackets`];
    /// metadata or regional coverage gaps fail with
    /// [`DataError::SchemaValidation`].
    pub fn load_validated(dir: &Path, country: &str, year: i32) -> Result<Self, DataError> {
        let pack = load_tax_pack(dir, country, year)?;
        let findings = validate_brackets(&pack);
        if !findings.is_empty() {
            return Err(DataError::MalformedBrackets(findings));
        }
        let findings = validate_metadata(&pack);
        if !findings.is_empty() {
            return Err(DataError::SchemaValidation(findings));
        }
        Ok(pack)
    }
}

/// Years with a pack for `country` in `dir`, ascending. A missing directory yields none.
pub fn list_available_taxpack_years(dir: &Path, country: &str) -> Vec<i32> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let prefix = format!("{}-", country.to_ascii_lowercase());

    let mut years: Vec<i32> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let stem = name.to_str()?.strip_suffix(".json")?.strip_prefix(&prefix)?;
            stem.parse().ok()
        })
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Write to a sibling temp file, then rename over `path`.
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL_PACK: &str = r#"{
        "meta": {},
        "irpf": {
            "general": { "stateBrackets": [], "autonomousBracketsByRegion": {} },
            "savings": { "brackets": [{ "upTo": 6000, "rate": 0.19 }, { "upTo": null, "rate": 0.23 }] },
            "foral": { "bracketsByRegion": {}, "savingsBracketsByRegion": {} }
        },
        "wealth": { "regions": {}, "isgf": { "threshold": 3000000, "minExempt": 700000, "brackets": [] } }
    }"#;

    #[test]
    fn test_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");

        atomic_write(&path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!path.with_extension("json.tmp").exists());

        atomic_write(&path, "{\"a\":1}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_missing_pack() {
        let dir = tempdir().unwrap();
        let err = load_tax_pack(dir.path(), "es", 1999).unwrap_err();
        assert!(matches!(err, DataError::MissingDataFile(p) if p.ends_with("es-1999.json")));
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("es-2030.json"), "{ not json").unwrap();
        let err = load_tax_pack(dir.path(), "ES", 2030).unwrap_err();
        assert!(matches!(err, DataError::Json { .. }));
    }

    fn bundled_pack_json() -> String {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/taxpacks/es-2026.json");
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_load_validated_accepts_bundled_pack() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("es-2026.json"), bundled_pack_json()).unwrap();
        assert!(TaxPack::load_validated(dir.path(), "es", 2026).is_ok());
    }

    #[test]
    fn test_load_validated_rejects_coverage_gap() {
        let mut value: serde_json::Value = serde_json::from_str(&bundled_pack_json()).unwrap();
        value["wealth"]["regions"]
            .as_object_mut()
            .unwrap()
            .remove("madrid")
            .unwrap();
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("es-2026.json"), value.to_string()).unwrap();

        assert!(load_tax_pack(dir.path(), "es", 2026).is_ok());
        let err = TaxPack::load_validated(dir.path(), "es", 2026).unwrap_err();
        let DataError::SchemaValidation(findings) = err else {
            panic!("expected schema validation, got {err}");
        };
        assert_eq!(findings.len(), 1, "{findings:?}");
        assert!(findings[0].contains("Missing wealth tax coverage"));
        assert!(findings[0].contains("madrid"));
    }

    #[test]
    fn test_load_validated_rejects_bad_brackets() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("es-2030.json"), MINIMAL_PACK).unwrap();
        let err = TaxPack::load_validated(dir.path(), "es", 2030).unwrap_err();
        assert!(matches!(err, DataError::SchemaValidation(_)));

        let bad = MINIMAL_PACK.replace(
            r#"{ "upTo": null, "rate": 0.23 }"#,
            r#"{ "upTo": 5000, "rate": 0.23 }"#,
        );
        fs::write(dir.path().join("es-2031.json"), bad).unwrap();
        let err = TaxPack::load_validated(dir.path(), "es", 2031).unwrap_err();
        let DataError::MalformedBrackets(findings) = err else {
            panic!("expected malformed brackets");
        };
        assert!(!findings.is_empty());
    }

    #[test]
    fn test_list_years() {
        let dir = tempdir().unwrap();
        for name in [
            "es-2026.json",
            "es-2024.json",
            "pt-2025.json",
            "es-latest.json",
            "es-2025.txt",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        assert_eq!(list_available_taxpack_years(dir.path(), "es"), vec![2024, 2026]);
        assert!(list_available_taxpack_years(&dir.path().join("nope"), "es").is_empty());
    }
}
