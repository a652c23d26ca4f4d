use crate::BlasterError;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const SUPPORTED_METADATA_VERSIONS: &[&str] = &["1.1"];

/// A reference database as described by its remote metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDatabase {
    pub name: String,
    pub files: Vec<String>,
    pub size_bytes: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Version 1.1 `*-metadata.json` layout
#[derive(Debug, Deserialize)]
struct MetadataV1_1 {
    dbname: String,
    files: Vec<String>,
    #[serde(rename = "bytes-total")]
    bytes_total: u64,
    description: Option<String>,
    #[serde(rename = "last-updated")]
    last_updated: Option<String>,
}

fn is_supported(version: &str) -> bool {
    let parsed = version.trim().parse::<f64>().ok();
    SUPPORTED_METADATA_VERSIONS
        .iter()
        .any(|supported| parsed.is_some() && supported.parse::<f64>().ok() == parsed)
}

/// Parse a metadata document, rejecting schema versions this crate does not know
pub fn parse_metadata(json: &str) -> Result<RemoteDatabase, BlasterError> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    let version = match document.get("version") {
        Some(serde_json::Value::String(v)) => v.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            return Err(BlasterError::Parse(
                "Metadata document has no version field".to_string(),
            ))
        }
    };
    if !is_supported(&version) {
        return Err(BlasterError::UnsupportedMetadata(version));
    }

    let metadata: MetadataV1_1 = serde_json::from_value(document)?;
    Ok(RemoteDatabase {
        name: metadata.dbname,
        files: metadata.files,
        size_bytes: metadata.bytes_total,
        description: metadata.description,
        last_updated: metadata.last_updated,
    })
}

/// Names of every `...metadata.json` document linked from a directory listing
pub fn metadata_names_from_listing(listing: &str) -> Vec<String> {
    let Ok(pattern) = Regex::new(r#""([^"]+metadata\.json)""#) else {
        return Vec::new();
    };
    let mut names: Vec<String> = pattern
        .captures_iter(listing)
        .map(|c| c[1].to_string())
        .collect();
    names.dedup();
    names
}

pub fn metadata_url(base_url: &str, name: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "version": "1.1",
        "dbname": "16S_ribosomal_RNA",
        "dbtype": "Nucleotide",
        "description": "16S ribosomal RNA (Bacteria and Archaea type strains)",
        "files": ["ftp://ftp.ncbi.nlm.nih.gov/blast/db/16S_ribosomal_RNA.tar.gz"],
        "last-updated": "2024-05-01T00:00:00",
        "bytes-total": 73035245
    }"#;

    #[test]
    fn test_parse_supported_metadata() {
        let db = parse_metadata(METADATA).unwrap();
        assert_eq!(db.name, "16S_ribosomal_RNA");
        assert_eq!(db.files.len(), 1);
        assert_eq!(db.size_bytes, 73035245);
    }

    #[test]
    fn test_numeric_version_accepted() {
        let json = METADATA.replace("\"1.1\"", "1.1");
        assert!(parse_metadata(&json).is_ok());
    }

    #[test]
    fn test_unsupported_version_fails_loudly() {
        let json = METADATA.replace("\"1.1\"", "\"1.2\"");
        match parse_metadata(&json) {
            Err(BlasterError::UnsupportedMetadata(v)) => assert_eq!(v, "1.2"),
            other => panic!("expected unsupported version, got {:?}", other),
        }
    }

    #[test]
    fn test_listing_extraction() {
        let listing = r#"<a href="16S_ribosomal_RNA-nucl-metadata.json">x</a>
            <a href="16S_ribosomal_RNA.tar.gz">y</a>
            <a href="nt-nucl-metadata.json">z</a>"#;
        assert_eq!(
            metadata_names_from_listing(listing),
            vec![
                "16S_ribosomal_RNA-nucl-metadata.json".to_string(),
                "nt-nucl-metadata.json".to_string()
            ]
        );
    }

    #[test]
    fn test_metadata_url_joining() {
        assert_eq!(
            metadata_url("https://ftp.ncbi.nlm.nih.gov/blast/db/", "/nt-nucl-metadata.json"),
            "https://ftp.ncbi.nlm.nih.gov/blast/db/nt-nucl-metadata.json"
        );
    }
}
