use std::io;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Rows of a CSV file, held as text. Invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DocumentTable {
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|source| table_error(path, source))?;
        let table = Self::read(reader).map_err(|source| table_error(path, source))?;
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.headers.len(),
            "document table loaded"
        );
        Ok(table)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self::read(reader).map_err(|source| table_error(Path::new("<reader>"), source))
    }

    fn read<R: io::Read>(mut reader: csv::Reader<R>) -> std::result::Result<Self, csv::Error> {
        let headers = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| String::from_utf8_lossy(cell).into_owned())
                    .collect(),
            );
        }
        Ok(DocumentTable { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cells(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    fn is_text_column(&self, index: usize) -> bool {
        self.cells(index).any(|cell| {
            let cell = cell.trim();
            !cell.is_empty() && cell.parse::<f64>().is_err()
        })
    }

    /// Columns holding at least one non-numeric, non-empty cell.
    pub fn text_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .enumerate()
            .filter(|&(index, _)| self.is_text_column(index))
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Cells of the named column, one document per row. Short rows yield "".
    pub fn text_column(&self, name: &str) -> Result<Vec<String>> {
        let missing = || PipelineError::MissingTextColumn {
            column: name.to_string(),
        };
        let index = self
            .headers
            .iter()
            .position(|h| h == name.trim())
            .ok_or_else(missing)?;
        if !self.is_text_column(index) {
            return Err(missing());
        }
        let documents: Vec<String> = self.cells(index).map(str::to_string).collect();
        debug!(column = name, documents = documents.len(), "text column selected");
        Ok(documents)
    }
}

fn table_error(path: &Path, source: csv::Error) -> PipelineError {
    PipelineError::TableRead {
        path: PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "id,review,score,blank\n\
                       1,Chipotle is great,5,\n\
                       2,\"Chipotle, is bad\",1,\n\
                       3,great tacos,4,\n\
                       4\n";

    #[test]
    fn reads_headers_and_rows() {
        let table = DocumentTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["id", "review", "score", "blank"]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn only_non_numeric_columns_are_text() {
        let table = DocumentTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.text_columns(), vec!["review"]);
    }

    #[test]
    fn text_column_keeps_row_order_and_fills_short_rows() {
        let table = DocumentTable::from_reader(CSV.as_bytes()).unwrap();
        let docs = table.text_column("review").unwrap();
        assert_eq!(
            docs,
            vec!["Chipotle is great", "Chipotle, is bad", "great tacos", ""]
        );
    }

    #[test]
    fn absent_or_numeric_columns_are_rejected() {
        let table = DocumentTable::from_reader(CSV.as_bytes()).unwrap();
        for column in ["missing", "score", "blank"] {
            match table.text_column(column) {
                Err(PipelineError::MissingTextColumn { column: c }) => assert_eq!(c, column),
                other => panic!("unexpected result for {column}: {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let bytes = b"text\nabc\xffdef\n".to_vec();
        let table = DocumentTable::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(table.text_column("text").unwrap(), vec!["abc\u{fffd}def"]);
    }

    #[test]
    fn missing_file_is_a_table_error() {
        let err = DocumentTable::from_csv_path(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::TableRead { .. }));
    }
}
