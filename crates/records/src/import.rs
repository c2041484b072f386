//! Bulk loading of questions and knowledge points from tabular files.
//!
//! Columns are matched by header name; unknown columns (including any `id` or
//! `uuid` from an export) are ignored and every record gets a fresh uuid.
//! The whole file is validated before anything is returned, so a bad row never
//! results in a partial write.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use {
    calamine::{Data, Reader, open_workbook_auto},
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    model::{KnowledgePoint, Question},
};

type Fields = BTreeMap<String, String>;

/// Read questions from a `.csv`, `.xlsx`/`.xls` or `.json` file.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let rows = read_rows(path)?;
    let questions = rows
        .iter()
        .enumerate()
        .map(|(i, fields)| question_from_fields(i + 1, fields))
        .collect::<Result<Vec<_>>>()?;
    info!(path = %path.display(), count = questions.len(), "loaded questions");
    Ok(questions)
}

/// Read knowledge points from a `.csv`, `.xlsx`/`.xls` or `.json` file.
pub fn load_knowledge_points(path: &Path) -> Result<Vec<KnowledgePoint>> {
    let rows = read_rows(path)?;
    let points = rows
        .iter()
        .enumerate()
        .map(|(i, fields)| knowledge_point_from_fields(i + 1, fields))
        .collect::<Result<Vec<_>>>()?;
    info!(path = %path.display(), count = points.len(), "loaded knowledge points");
    Ok(points)
}

fn read_rows(path: &Path) -> Result<Vec<Fields>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_spreadsheet(path),
        "json" => read_json(path),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

fn read_csv(path: &Path) -> Result<Vec<Fields>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    debug!(path = %path.display(), ?headers, "reading csv");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

/// First sheet only; its first row is the header.
fn read_spreadsheet(path: &Path) -> Result<Vec<Fields>> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(Vec::new());
    };
    let range = workbook.worksheet_range(&sheet)?;
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();
    debug!(path = %path.display(), %sheet, ?headers, "reading spreadsheet");

    Ok(rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, cell)| (h.clone(), cell_text(cell)))
                .collect()
        })
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        other => other.to_string(),
    }
}

fn read_json(path: &Path) -> Result<Vec<Fields>> {
    let raw = std::fs::read_to_string(path)?;
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(&raw)?;
    Ok(objects
        .into_iter()
        .map(|object| {
            object
                .into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        serde_json::Value::Null => String::new(),
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, v)
                })
                .collect()
        })
        .collect())
}

fn required<'a>(row: usize, fields: &'a Fields, name: &str) -> Result<&'a str> {
    match fields.get(name).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::invalid_row(row, format!("missing required field `{name}`"))),
    }
}

fn optional<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr<Err = String>>(row: usize, fields: &Fields, name: &str) -> Result<T> {
    required(row, fields, name)?
        .parse()
        .map_err(|e: String| Error::invalid_row(row, e))
}

fn question_from_fields(row: usize, fields: &Fields) -> Result<Question> {
    let mut question = Question::new(
        parsed(row, fields, "type")?,
        parsed(row, fields, "subject")?,
        required(row, fields, "question")?,
        required(row, fields, "answer")?,
    )
    .with_difficulty(parsed(row, fields, "difficulty")?)
    .with_source(parsed(row, fields, "source")?);

    if let Some(options) = optional(fields, "options") {
        question = question.with_options(options);
    }
    if let Some(exam_point) = optional(fields, "exam_point") {
        question = question.with_exam_point(exam_point);
    }
    if let Some(document) = optional(fields, "document") {
        question.document = document.to_string();
    }
    Ok(question)
}

fn knowledge_point_from_fields(row: usize, fields: &Fields) -> Result<KnowledgePoint> {
    let mut point = KnowledgePoint::new(
        parsed(row, fields, "subject")?,
        required(row, fields, "knowledge_point")?,
    )
    .with_difficulty(parsed(row, fields, "difficulty")?)
    .with_source(parsed(row, fields, "source")?);

    if let Some(exam_point) = optional(fields, "exam_point") {
        point = point.with_exam_point(exam_point);
    }
    if let Some(document) = optional(fields, "document") {
        point = point.with_document(document);
    }
    Ok(point)
}
