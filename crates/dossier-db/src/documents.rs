use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use dossier_types::{DocumentType, OnboardingDocument};

use crate::models::{DocumentRow, NewDocument};
use crate::{Database, OptionalExt, ts};

const DOCUMENT_COLUMNS: &str = "id, user_id, onboarding_id, document_type, file_name, \
     original_name, file_size, mime_type, file_path, sha256, upload_date, status, \
     review_status, reviewed_by, reviewed_at, review_comments";

impl Database {
    // -- Documents --

    pub fn get_document(&self, id: Uuid) -> Result<Option<OnboardingDocument>> {
        self.with_conn(|conn| query_document(conn, &id.to_string()))
    }

    /// Current documents of one onboarding record in registry order.
    pub fn list_documents(&self, onboarding_id: Uuid) -> Result<Vec<OnboardingDocument>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {DOCUMENT_COLUMNS} FROM onboarding_documents WHERE onboarding_id = ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([onboarding_id.to_string()], map_document)?
                .collect::<Result<Vec<_>, _>>()?;

            let mut docs = rows
                .into_iter()
                .map(DocumentRow::into_document)
                .collect::<Result<Vec<_>>>()?;
            docs.sort_by_key(|d| d.document_type);
            Ok(docs)
        })
    }
}

pub(crate) fn query_document(conn: &Connection, id: &str) -> Result<Option<OnboardingDocument>> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM onboarding_documents WHERE id = ?1");
    let row = conn.prepare(&sql)?.query_row([id], map_document).optional()?;
    row.map(DocumentRow::into_document).transpose()
}

pub(crate) fn query_document_by_type(
    conn: &Connection,
    onboarding_id: &str,
    document_type: DocumentType,
) -> Result<Option<OnboardingDocument>> {
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM onboarding_documents
         WHERE onboarding_id = ?1 AND document_type = ?2"
    );
    let row = conn
        .prepare(&sql)?
        .query_row([onboarding_id, document_type.as_str()], map_document)
        .optional()?;
    row.map(DocumentRow::into_document).transpose()
}

pub(crate) fn insert_document(conn: &Connection, doc: &NewDocument) -> Result<()> {
    conn.execute(
        "INSERT INTO onboarding_documents (id, user_id, onboarding_id, document_type, file_name,
                                           original_name, file_size, mime_type, file_path,
                                           sha256, upload_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'pending')",
        rusqlite::params![
            doc.id.to_string(),
            doc.user_id.to_string(),
            doc.onboarding_id.to_string(),
            doc.document_type.as_str(),
            &doc.file_name,
            &doc.original_name,
            i64::try_from(doc.file_size)?,
            &doc.mime_type,
            &doc.file_path,
            &doc.sha256,
            ts(doc.upload_date),
        ],
    )
    .map_err(|e| crate::unique_violation(e, "document_type"))?;
    Ok(())
}

fn map_document(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        onboarding_id: row.get(2)?,
        document_type: row.get(3)?,
        file_name: row.get(4)?,
        original_name: row.get(5)?,
        file_size: row.get(6)?,
        mime_type: row.get(7)?,
        file_path: row.get(8)?,
        sha256: row.get(9)?,
        upload_date: row.get(10)?,
        status: row.get(11)?,
        review_status: row.get(12)?,
        reviewed_by: row.get(13)?,
        reviewed_at: row.get(14)?,
        review_comments: row.get(15)?,
    })
}
