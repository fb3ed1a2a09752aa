use super::columns::SpecialType;
use super::error::TableError;
use super::escape::encode_field;
use super::{
    CURRENT_VERSION, DETAIL_END, DETAIL_ID_END, DETAIL_ID_TAG, DETAIL_START, HEADER_END,
    HEADER_START, PROPERTIES_END, PROPERTIES_START, PROPERTY_PARENT, PROPERTY_SPECIAL_TYPE,
    PROPERTY_VERSION, ROW_COUNT_TAG, VERSION_TAG,
};
use crate::core::codec::bitpacked::BitPackedEncoder;
use std::io::{self, Write};
use tracing::debug;

/// A column to be written, with the properties stored in the column-properties block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub properties: Vec<(String, String)>,
}

impl ColumnSpec {
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn special(name: &str, special_type: &SpecialType) -> Self {
        Self::plain(name).with_property(PROPERTY_SPECIAL_TYPE, special_type.as_str())
    }

    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_parent(self, parent: &str) -> Self {
        self.with_property(PROPERTY_PARENT, parent)
    }

    pub fn with_version(self, version: &str) -> Self {
        self.with_property(PROPERTY_VERSION, version)
    }
}

/// Writes a native table: head on creation, then one line per row, then an
/// optional detail section on [`finish`](Self::finish).
pub struct TableWriter<W: Write> {
    sink: W,
    width: usize,
    rows_written: usize,
}

impl<W: Write> TableWriter<W> {
    /// Writes the header, the column-properties block (if any column has
    /// properties) and the title line.
    pub fn create(
        mut sink: W,
        columns: &[ColumnSpec],
        row_count: Option<usize>,
    ) -> Result<Self, TableError> {
        writeln!(sink, "{HEADER_START}")?;
        writeln!(sink, "<{VERSION_TAG}=\"{CURRENT_VERSION}\">")?;
        if let Some(count) = row_count {
            writeln!(sink, "<{ROW_COUNT_TAG}=\"{count}\">")?;
        }
        writeln!(sink, "{HEADER_END}")?;

        if columns.iter().any(|c| !c.properties.is_empty()) {
            writeln!(sink, "{PROPERTIES_START}")?;
            for column in columns.iter().filter(|c| !c.properties.is_empty()) {
                writeln!(sink, "<columnName=\"{}\">", column.name)?;
                for (key, value) in &column.properties {
                    writeln!(sink, "<columnProperty=\"{key}\t{value}\">")?;
                }
            }
            writeln!(sink, "{PROPERTIES_END}")?;
        }

        let titles: Vec<_> = columns.iter().map(|c| encode_field(&c.name)).collect();
        writeln!(sink, "{}", titles.join("\t"))?;
        Ok(Self {
            sink,
            width: columns.len(),
            rows_written: 0,
        })
    }

    /// Writes one row, one value per column in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] if the number of values differs from the
    /// number of columns.
    pub fn write_row<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), TableError> {
        if values.len() != self.width {
            return Err(TableError::RowWidth {
                expected: self.width,
                found: values.len(),
            });
        }
        for (index, value) in values.iter().enumerate() {
            if index > 0 {
                self.sink.write_all(b"\t")?;
            }
            self.sink.write_all(encode_field(value.as_ref()).as_bytes())?;
        }
        self.sink.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Appends the detail section for the given blobs and returns the sink.
    pub fn finish<'a, I>(mut self, details: I) -> Result<W, TableError>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut details = details.into_iter().peekable();
        if details.peek().is_some() {
            writeln!(self.sink, "{DETAIL_START}")?;
            for (id, bytes) in details {
                writeln!(self.sink, "<{DETAIL_ID_TAG}=\"{id}\">")?;
                write_blob(&mut self.sink, bytes)?;
                writeln!(self.sink, "{DETAIL_ID_END}")?;
            }
            writeln!(self.sink, "{DETAIL_END}")?;
        }
        debug!("Wrote table with {} rows.", self.rows_written);
        self.sink.flush()?;
        Ok(self.sink)
    }
}

fn write_blob<W: Write>(sink: &mut W, bytes: &[u8]) -> io::Result<()> {
    let count = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "detail blob is too large"))?;
    let mut encoder = BitPackedEncoder::new(sink);
    encoder.initialize(8, count)?;
    for &byte in bytes {
        encoder.write(u32::from(byte))?;
    }
    encoder.finish()?;
    Ok(())
}
