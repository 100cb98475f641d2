//! Populates the search index from rendered documents.
//!
//! Each configured document is scanned and its entries inserted with the
//! document's category, one transaction per document.

use std::path::Path;

use tracing::{info, instrument};

use docsetkit_scanner::{Markers, scan_file};
use docsetkit_shared::{Category, DocumentSpec, IndexRecord, Result};
use docsetkit_storage::SearchIndex;

/// Number of records inserted for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCount {
    pub file: String,
    pub category: Category,
    pub entries: usize,
}

/// Scan `documents_dir/<doc.file>` and insert its entries.
///
/// A missing document contributes zero records. A duplicate
/// `(name, type, path)` aborts with an integrity error.
#[instrument(skip(index, documents_dir, markers), fields(file = %doc.file, category = %doc.category))]
pub async fn index_document(
    index: &SearchIndex,
    documents_dir: &Path,
    doc: &DocumentSpec,
    markers: &Markers,
) -> Result<usize> {
    let entries = scan_file(&documents_dir.join(&doc.file), markers)?;
    let records: Vec<IndexRecord> = entries
        .iter()
        .map(|entry| IndexRecord::from_entry(entry, doc.category))
        .collect();

    let inserted = index.insert_batch(&records).await?;
    info!(inserted, "document indexed");
    Ok(inserted)
}

/// Index every configured document in order, stopping at the first error.
///
/// `on_indexed` sees each document's count with its 1-based position and the
/// document total, after that document's batch is committed.
pub async fn index_documents<F>(
    index: &SearchIndex,
    documents_dir: &Path,
    docs: &[DocumentSpec],
    markers: &Markers,
    mut on_indexed: F,
) -> Result<Vec<DocumentCount>>
where
    F: FnMut(&DocumentCount, usize, usize),
{
    let total = docs.len();
    let mut counts = Vec::with_capacity(total);
    for (i, doc) in docs.iter().enumerate() {
        let entries = index_document(index, documents_dir, doc, markers).await?;
        let count = DocumentCount {
            file: doc.file.clone(),
            category: doc.category,
            entries,
        };
        on_indexed(&count, i + 1, total);
        counts.push(count);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dk-indexer-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn indexes_fixture_documents_with_their_category() {
        let tmp = temp_dir();
        let index = SearchIndex::create(&tmp.join("docSet.dsidx")).await.unwrap();
        let docs = vec![
            DocumentSpec::new("overview.html", "Overview", Category::Guide),
            DocumentSpec::new("g-code.html", "G-code", Category::Command),
            DocumentSpec::new("m-code.html", "M-code", Category::Command),
        ];

        let mut seen = Vec::new();
        let counts = index_documents(
            &index,
            Path::new("../../../fixtures/html"),
            &docs,
            &Markers::default(),
            |count, current, total| seen.push((count.file.clone(), current, total)),
        )
        .await
        .unwrap();

        let entries: Vec<usize> = counts.iter().map(|c| c.entries).collect();
        assert_eq!(entries, vec![0, 4, 0]);
        assert_eq!(
            seen,
            vec![
                ("overview.html".to_string(), 1, 3),
                ("g-code.html".to_string(), 2, 3),
                ("m-code.html".to_string(), 3, 3),
            ]
        );

        let records = index.records().await.unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.category == Category::Command));
        assert_eq!(records[0].name, "G0 Rapid Motion");
        assert_eq!(records[0].path, "g-code.html#gcode:g0");

        index.close();
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn repeated_document_is_an_integrity_error() {
        let tmp = temp_dir();
        let index = SearchIndex::create(&tmp.join("docSet.dsidx")).await.unwrap();
        let g_code = DocumentSpec::new("g-code.html", "G-code", Category::Command);
        let fixtures = Path::new("../../../fixtures/html");

        index_document(&index, fixtures, &g_code, &Markers::default())
            .await
            .unwrap();
        let err = index_document(&index, fixtures, &g_code, &Markers::default())
            .await
            .unwrap_err();
        assert!(err.is_integrity());

        // Same document under another category is a distinct triple.
        let as_guide = DocumentSpec::new("g-code.html", "G-code", Category::Guide);
        let inserted = index_document(&index, fixtures, &as_guide, &Markers::default())
            .await
            .unwrap();
        assert_eq!(inserted, 4);

        index.close();
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn stops_at_the_first_failing_document() {
        let tmp = temp_dir();
        let index = SearchIndex::create(&tmp.join("docSet.dsidx")).await.unwrap();
        let docs = vec![
            DocumentSpec::new("g-code.html", "G-code", Category::Command),
            DocumentSpec::new("g-code.html", "G-code", Category::Command),
            DocumentSpec::new("overview.html", "Overview", Category::Guide),
        ];

        let mut calls = 0;
        let err = index_documents(
            &index,
            Path::new("../../../fixtures/html"),
            &docs,
            &Markers::default(),
            |_, _, _| calls += 1,
        )
        .await
        .unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(calls, 1);
        assert_eq!(index.count().await.unwrap(), 4);

        index.close();
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
