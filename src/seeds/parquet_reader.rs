//! Direct-read parquet extraction. No intermediate import artifact is
//! created: rows are streamed straight off disk through `parquet`'s row
//! API and filtered as they come.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;

use super::{derive_domain, Seed, SeedFilter};
use crate::error::SeedExtractError;

const REQUIRED_COLUMNS: &[&str] = &["url"];

pub fn read_seeds(path: &Path, filter: &SeedFilter) -> Result<Vec<Seed>, SeedExtractError> {
    if !path.exists() {
        return Err(SeedExtractError::MissingSource(path.display().to_string()));
    }

    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;

    let schema_fields: HashSet<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !schema_fields.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SeedExtractError::SchemaMismatch(missing));
    }

    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    for row_result in reader.get_row_iter(None)? {
        let row = row_result?;

        let mut url: Option<String> = None;
        let mut status: i32 = -1;
        let mut mime = String::new();
        let mut languages = String::new();

        for (name, field) in row.get_column_iter() {
            match (name.as_str(), field) {
                ("url", Field::Str(s)) => url = Some(s.clone()),
                ("fetch_status", Field::Int(i)) => status = *i,
                ("content_mime_detected", Field::Str(s)) => mime = s.clone(),
                ("content_languages", Field::Str(s)) => languages = s.clone(),
                _ => {}
            }
        }

        let Some(url) = url else { continue };
        // The crawl's own registrable-domain column collapses subdomains;
        // derive the domain ourselves so per-domain bucketing sees them.
        let Some(domain) = derive_domain(&url) else {
            continue;
        };

        if !filter.matches(status, &mime, &languages, &domain) {
            continue;
        }
        if !seen.insert(url.clone()) {
            continue;
        }

        seeds.push(Seed {
            url,
            domain,
            referer: None,
        });

        if let Some(limit) = filter.limit {
            if seeds.len() >= limit {
                break;
            }
        }
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_missing_source_error() {
        let err = read_seeds(Path::new("/nonexistent/index.parquet"), &SeedFilter::default())
            .unwrap_err();
        assert!(matches!(err, SeedExtractError::MissingSource(_)));
    }
}
