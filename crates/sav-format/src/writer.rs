//! Save file writer.
//!
//! Re-serialization splices the edited record tables into the original
//! payload text. Bytes outside the edited tables, and every record an edit
//! does not name, are copied unchanged.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::edits::{SaveEdits, TableEdits};
use crate::error::{FormatError, Result};
use crate::header::build_header;
use crate::types::{RecordTable, SaveFile, WriterOptions};

/// Save file writer.
pub struct SaveWriter<W: Write> {
    writer: BufWriter<W>,
    options: WriterOptions,
}

impl<W: Write> SaveWriter<W> {
    /// Create a new save writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            options: WriterOptions::default(),
        }
    }

    /// Create a new save writer with options.
    pub fn with_options(writer: W, options: WriterOptions) -> Self {
        Self {
            writer: BufWriter::new(writer),
            options,
        }
    }

    /// Write `file` with `edits` applied.
    pub fn write_save(mut self, file: &SaveFile, edits: &SaveEdits) -> Result<()> {
        let bytes = encode_save_with_options(file, edits, &self.options)?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl SaveWriter<File> {
    /// Create a save file for writing.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

/// Write a save file to a path.
pub fn write_save(path: &Path, file: &SaveFile, edits: &SaveEdits) -> Result<()> {
    SaveWriter::create(path)?.write_save(file, edits)
}

/// Encode a save file with edits applied.
pub fn encode_save(file: &SaveFile, edits: &SaveEdits) -> Result<Vec<u8>> {
    encode_save_with_options(file, edits, &WriterOptions::default())
}

/// Encode a save file with edits applied and explicit writer options.
///
/// With no edits the original buffer is returned as-is.
pub fn encode_save_with_options(
    file: &SaveFile,
    edits: &SaveEdits,
    options: &WriterOptions,
) -> Result<Vec<u8>> {
    if edits.is_empty() {
        return Ok(file.source.clone());
    }
    let payload = render_payload(file, edits)?;
    let header = build_header(payload.len())?;

    let mut out = Vec::with_capacity(file.source.len() + 64);
    out.extend_from_slice(&header);
    let mut encoder = ZlibEncoder::new(out, Compression::new(options.compression_level));
    encoder.write_all(payload.as_bytes())?;
    let out = encoder.finish()?;

    tracing::debug!(
        payload_len = payload.len(),
        encoded_len = out.len(),
        removed = edits.entities.removed_count(),
        appended = edits.entities.appended().len(),
        "encoded save"
    );
    Ok(out)
}

/// Check that every edit addresses something that exists.
///
/// Called by the writer, and usable on its own to surface the same errors
/// without producing output.
pub fn check_edits(file: &SaveFile, edits: &SaveEdits) -> Result<()> {
    check_table(&file.entities, &edits.entities, "entities")?;
    match &file.connectors {
        Some(table) => check_table(table, &edits.connectors, "connectors"),
        None if edits.connectors.is_empty() => Ok(()),
        None => Err(FormatError::invalid_edit("save has no connector table")),
    }
}

fn check_table(table: &RecordTable, edits: &TableEdits, name: &str) -> Result<()> {
    let count = table.records.len();
    if let Some(&idx) = edits.removed.iter().find(|&&idx| idx >= count) {
        return Err(FormatError::invalid_edit(format!(
            "{name}: record {idx} of {count}"
        )));
    }
    for (&record_idx, patches) in &edits.fragments {
        let record = table.records.get(record_idx).ok_or_else(|| {
            FormatError::invalid_edit(format!("{name}: record {record_idx} of {count}"))
        })?;
        let body = record.entity().ok_or_else(|| {
            FormatError::invalid_edit(format!("{name}: record {} is opaque", record.key))
        })?;
        for &fragment_idx in patches.keys() {
            let is_text = body
                .fragments
                .get(fragment_idx)
                .is_some_and(|fragment| fragment.text.is_some());
            if !is_text {
                return Err(FormatError::invalid_edit(format!(
                    "{name}: record {} has no string fragment {fragment_idx}",
                    record.key
                )));
            }
        }
    }
    let mut keys: HashSet<&str> = table
        .records
        .iter()
        .enumerate()
        .filter(|(idx, _)| !edits.removed.contains(idx))
        .map(|(_, record)| record.key.as_str())
        .collect();
    for new_record in &edits.appended {
        if !keys.insert(new_record.key.as_str()) {
            return Err(FormatError::DuplicateKey {
                key: new_record.key.clone(),
            });
        }
        serde_json::from_str::<serde::de::IgnoredAny>(&new_record.value)?;
    }
    Ok(())
}

/// Produce the edited payload text.
pub fn render_payload(file: &SaveFile, edits: &SaveEdits) -> Result<String> {
    check_edits(file, edits)?;

    let mut regions: Vec<(&RecordTable, &TableEdits)> = Vec::with_capacity(2);
    if !edits.entities.is_empty() {
        regions.push((&file.entities, &edits.entities));
    }
    if let Some(table) = &file.connectors
        && !edits.connectors.is_empty()
    {
        regions.push((table, &edits.connectors));
    }
    regions.sort_by_key(|(table, _)| table.open);

    let text = file.payload.as_str();
    let mut out = String::with_capacity(text.len() + 256);
    let mut cursor = 0usize;
    for (table, table_edits) in regions {
        out.push_str(&text[cursor..=table.open]);
        render_table(text, table, table_edits, &mut out)?;
        cursor = table.close;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Write the inside of a table (between its braces).
fn render_table(
    text: &str,
    table: &RecordTable,
    edits: &TableEdits,
    out: &mut String,
) -> Result<()> {
    let records = &table.records;
    let Some(first_record) = records.first() else {
        let inner = &text[table.open + 1..table.close];
        append_records(edits, true, out)?;
        out.push_str(inner);
        return Ok(());
    };

    // Whitespace between `{` and the first record; reused by whichever record
    // ends up first so a removed head never leaves a leading comma.
    let head = &text[table.open + 1..first_record.offset()];
    let mut emitted_any = false;
    let mut prev_end = table.open + 1;
    for (idx, record) in records.iter().enumerate() {
        let span = record.span();
        let separator = &text[prev_end..span.start];
        prev_end = span.end;
        if edits.removed.contains(&idx) {
            continue;
        }
        out.push_str(if emitted_any { separator } else { head });
        emitted_any = true;
        match edits.fragments.get(&idx) {
            Some(patches) => {
                let mut cursor = span.start;
                let fragments = record
                    .entity()
                    .map(|body| body.fragments.as_slice())
                    .unwrap_or_default();
                for (&fragment_idx, replacement) in patches {
                    let fragment_span = fragments[fragment_idx].span();
                    out.push_str(&text[cursor..fragment_span.start]);
                    out.push_str(&serde_json::to_string(replacement)?);
                    cursor = fragment_span.end;
                }
                out.push_str(&text[cursor..span.end]);
            }
            None => out.push_str(&text[span]),
        }
    }
    append_records(edits, !emitted_any, out)?;
    out.push_str(&text[prev_end..table.close]);
    Ok(())
}

fn append_records(edits: &TableEdits, mut first: bool, out: &mut String) -> Result<()> {
    for new_record in &edits.appended {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&serde_json::to_string(&new_record.key)?);
        out.push(':');
        out.push_str(&new_record.value);
    }
    Ok(())
}
