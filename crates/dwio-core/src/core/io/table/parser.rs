use super::columns::{ColumnDescriptor, CoordinateMode, SpecialType, resolve_coordinates};
use super::error::TableError;
use super::escape::decode_into;
use super::options::TableReadOptions;
use super::{
    COLUMN_NAME_TAG, COLUMN_PROPERTY_TAG, DETAIL_END, DETAIL_ID_END, DETAIL_ID_TAG, DETAIL_START,
    EXPLANATION_END, EXPLANATION_START, HEADER_END, HEADER_START, PROPERTIES_END,
    PROPERTIES_START, ROW_COUNT_TAG, STRUCTURE_COLUMN_NAME, SUPPORTED_VERSIONS, VERSION_TAG,
    is_tail_marker, parse_tag,
};
use crate::core::codec::bitpacked::BitPackedDecoder;
use crate::core::descriptors::{
    DefaultDescriptorRegistry, Descriptor, DescriptorError, DescriptorRegistry,
    SUBSTRUCTURE_FINGERPRINT, SUBSTRUCTURE_FINGERPRINT_VERSION,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    ColumnProperties,
    ColumnTitles,
    Rows,
    Tail,
    Closed,
}

struct LineSource<R> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> LineSource<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }

    /// Reads the next line without its terminator. Returns `false` at end of stream.
    fn read_into(&mut self, buf: &mut String) -> io::Result<bool> {
        buf.clear();
        if self.reader.read_line(buf)? == 0 {
            return Ok(false);
        }
        while buf.ends_with(['\n', '\r']) {
            buf.pop();
        }
        self.line_number += 1;
        Ok(true)
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        Ok(self.read_into(&mut line)?.then_some(line))
    }
}

/// Column layout of a table: declared special columns, visible plain columns, and
/// the columns resolved around the primary structure column.
///
/// Two index spaces coexist. A *source index* is a position in the raw row (the
/// title line); a *visible index* is a position among the plain columns only.
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    special: Vec<ColumnDescriptor>,
    visible: Vec<ColumnDescriptor>,
    source_count: usize,
    structure: Option<usize>,
    coordinates: Option<usize>,
    id: Option<usize>,
    descriptors: HashMap<String, usize>,
    substructure_index: Option<usize>,
}

impl TableLayout {
    fn resolve(
        titles: &str,
        declared: Vec<(String, HashMap<String, String>)>,
        mode: CoordinateMode,
    ) -> Self {
        let mut special = Vec::new();
        let mut plain_properties = HashMap::new();
        for (name, properties) in declared {
            let column = ColumnDescriptor::from_properties(&name, properties);
            if column.is_special() {
                special.push(column);
            } else {
                plain_properties.insert(name, column.properties);
            }
        }

        let mut visible = Vec::new();
        let mut source_count = 0;
        for (index, name) in titles.split('\t').enumerate() {
            source_count += 1;
            match special
                .iter_mut()
                .find(|c| c.name == name && c.source_index.is_none())
            {
                Some(column) => column.source_index = Some(index),
                None => {
                    let mut column = ColumnDescriptor::plain(name, index);
                    if let Some(properties) = plain_properties.remove(name) {
                        column.properties = properties;
                    }
                    visible.push(column);
                }
            }
        }
        for column in special.iter().filter(|c| c.source_index.is_none()) {
            debug!(
                "Special column '{}' is declared but missing from the title line.",
                column.name
            );
        }

        let mut layout = Self {
            special,
            visible,
            source_count,
            ..Self::default()
        };
        layout.resolve_structure(mode);
        layout
    }

    fn resolve_structure(&mut self, mode: CoordinateMode) {
        let is_structure = |c: &&ColumnDescriptor| {
            c.special_type == Some(SpecialType::StructureCode) && c.source_index.is_some()
        };
        let Some(structure) = self
            .special
            .iter()
            .filter(is_structure)
            .find(|c| c.name == STRUCTURE_COLUMN_NAME)
            .or_else(|| self.special.iter().filter(is_structure).min_by_key(|c| c.source_index))
        else {
            return;
        };
        let parent = structure.name.as_str();
        self.structure = structure.source_index;
        self.id = structure
            .id_column
            .as_deref()
            .and_then(|id| self.column(id))
            .and_then(|c| c.source_index);

        let children: Vec<&ColumnDescriptor> = self
            .special
            .iter()
            .filter(|c| c.is_child_of(parent) && c.source_index.is_some())
            .collect();
        let child_of_type = |wanted: SpecialType| {
            children
                .iter()
                .find(|c| c.special_type.as_ref() == Some(&wanted))
                .and_then(|c| c.source_index)
        };
        self.coordinates = resolve_coordinates(
            mode,
            child_of_type(SpecialType::Coordinates2D),
            child_of_type(SpecialType::Coordinates3D),
        );

        let mut descriptors = HashMap::new();
        let mut substructure_index = None;
        for child in &children {
            let (Some(short_name), Some(index)) = (
                child.special_type.as_ref().and_then(SpecialType::descriptor_name),
                child.source_index,
            ) else {
                continue;
            };
            if !DefaultDescriptorRegistry.is_known(short_name) {
                trace!("Ignoring column '{}' of unknown descriptor '{}'.", child.name, short_name);
                continue;
            }
            descriptors.entry(short_name.to_string()).or_insert(index);
            if short_name == SUBSTRUCTURE_FINGERPRINT
                && child.version.as_deref() == Some(SUBSTRUCTURE_FINGERPRINT_VERSION)
            {
                substructure_index.get_or_insert(index);
            }
        }
        trace!(
            "Resolved structure column '{}' with {} descriptor children.",
            parent,
            descriptors.len()
        );
        self.descriptors = descriptors;
        self.substructure_index = substructure_index;
    }

    /// Plain columns in visible order.
    pub fn visible_columns(&self) -> &[ColumnDescriptor] {
        &self.visible
    }

    /// Columns declared with a `specialType`, in declaration order.
    pub fn special_columns(&self) -> &[ColumnDescriptor] {
        &self.special
    }

    /// Number of fields in a raw row.
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.visible
            .iter()
            .chain(self.special.iter())
            .find(|c| c.name == name)
    }

    pub fn column_at(&self, source_index: usize) -> Option<&ColumnDescriptor> {
        self.visible
            .iter()
            .chain(self.special.iter())
            .find(|c| c.source_index == Some(source_index))
    }

    pub fn structure_index(&self) -> Option<usize> {
        self.structure
    }

    pub fn coordinates_index(&self) -> Option<usize> {
        self.coordinates
    }

    pub fn id_index(&self) -> Option<usize> {
        self.id
    }

    /// Descriptor children of the structure column, by short name.
    pub fn descriptor_indices(&self) -> &HashMap<String, usize> {
        &self.descriptors
    }

    /// Fingerprint column usable for substructure pre-screening.
    pub fn substructure_index(&self) -> Option<usize> {
        self.substructure_index
    }

    fn descriptor_index(&self, short_name: &str) -> Option<usize> {
        self.descriptors.get(short_name).copied()
    }
}

#[derive(Debug, Default)]
struct RowBuffer {
    fields: Vec<String>,
    present: usize,
}

/// Borrowed view of the current row. It is invalidated by the next
/// [`TableParser::advance`]; copy out what must be kept.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    layout: &'a TableLayout,
    buffer: &'a RowBuffer,
    index: usize,
}

impl<'a> Row<'a> {
    /// Zero-based position of the row in the file.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Field by source index. `None` if the row was too short to contain it.
    pub fn raw(&self, source_index: usize) -> Option<&'a str> {
        if source_index < self.buffer.present {
            Some(self.buffer.fields[source_index].as_str())
        } else {
            None
        }
    }

    /// Field by visible index.
    pub fn field(&self, visible_index: usize) -> Option<&'a str> {
        let column = self.layout.visible.get(visible_index)?;
        self.raw(column.source_index?)
    }

    pub fn structure(&self) -> Option<&'a str> {
        self.non_empty(self.layout.structure)
    }

    pub fn coordinates(&self) -> Option<&'a str> {
        self.non_empty(self.layout.coordinates)
    }

    pub fn display_name(&self) -> Option<&'a str> {
        self.non_empty(self.layout.id)
    }

    pub fn descriptor_text(&self, short_name: &str) -> Option<&'a str> {
        self.non_empty(self.layout.descriptor_index(short_name))
    }

    /// Decodes a descriptor cell through `registry`.
    ///
    /// Returns `Ok(None)` if the table has no such descriptor or the cell is empty.
    pub fn descriptor(
        &self,
        short_name: &str,
        registry: &dyn DescriptorRegistry,
    ) -> Result<Option<Descriptor>, DescriptorError> {
        let Some(text) = self.descriptor_text(short_name) else {
            return Ok(None);
        };
        let handler = registry
            .handler_for(short_name)
            .ok_or_else(|| DescriptorError::UnknownDescriptor(short_name.to_string()))?;
        handler.decode(text).map(Some)
    }

    /// Copies every present field out of the shared buffer.
    pub fn to_owned_fields(&self) -> Vec<String> {
        self.buffer.fields[..self.buffer.present].to_vec()
    }

    fn non_empty(&self, source_index: Option<usize>) -> Option<&'a str> {
        self.raw(source_index?).filter(|s| !s.is_empty())
    }
}

/// Forward-only reader of a native table.
///
/// Construction consumes everything up to and including the column title line.
/// [`advance`](Self::advance) then yields one row at a time. The source is dropped as
/// soon as no more rows can follow, after the tail has been read if options ask for it.
pub struct TableParser<R> {
    source: Option<LineSource<R>>,
    phase: Phase,
    options: TableReadOptions,
    line: String,
    version: String,
    row_count: Option<usize>,
    explanation: Option<String>,
    layout: TableLayout,
    row: RowBuffer,
    rows_read: usize,
    rows_with_errors: usize,
    details: Option<HashMap<String, Vec<u8>>>,
    head_lines: Vec<String>,
    tail_lines: Vec<String>,
    open_error: Option<io::Error>,
}

impl TableParser<BufReader<File>> {
    /// Opens a table file.
    ///
    /// A file that cannot be opened yields an empty parser rather than an error:
    /// [`advance`](Self::advance) returns `None` immediately and
    /// [`open_error`](Self::open_error) reports the cause.
    ///
    /// # Errors
    ///
    /// Returns format errors found while reading the head of the file.
    pub fn open(path: impl AsRef<Path>, options: TableReadOptions) -> Result<Self, TableError> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => {
                info!("Reading table from {:?}", path);
                Self::from_reader(BufReader::new(file), options)
            }
            Err(e) => {
                warn!("Cannot open table file {:?}: {}", path, e);
                let mut parser = Self::empty(options);
                parser.open_error = Some(e);
                Ok(parser)
            }
        }
    }
}

impl<R: BufRead> TableParser<R> {
    /// Reads the head of a table from `reader`.
    ///
    /// # Errors
    ///
    /// - [`TableError::NoHeader`] if the first line is not the header start marker.
    /// - [`TableError::UnsupportedVersion`] for a version other than 3.0, 3.1 or empty.
    /// - [`TableError::MissingTerminator`] if a header or property block is not closed.
    /// - [`TableError::MissingColumnTitles`] if the file ends before the title line.
    pub fn from_reader(reader: R, options: TableReadOptions) -> Result<Self, TableError> {
        let mut parser = Self::empty(options);
        parser.source = Some(LineSource::new(reader));
        parser.phase = Phase::Header;
        parser.read_head()?;
        Ok(parser)
    }

    fn empty(options: TableReadOptions) -> Self {
        Self {
            source: None,
            phase: Phase::Closed,
            options,
            line: String::new(),
            version: String::new(),
            row_count: None,
            explanation: None,
            layout: TableLayout::default(),
            row: RowBuffer::default(),
            rows_read: 0,
            rows_with_errors: 0,
            details: None,
            head_lines: Vec::new(),
            tail_lines: Vec::new(),
            open_error: None,
        }
    }

    fn next_head_line(&mut self) -> Result<Option<String>, TableError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let line = source.next_line()?;
        if let (Some(line), true) = (&line, self.options.buffer_head_and_tail) {
            self.head_lines.push(line.clone());
        }
        Ok(line)
    }

    fn read_head(&mut self) -> Result<(), TableError> {
        match self.next_head_line()? {
            Some(line) if line.trim_end() == HEADER_START => {}
            _ => return Err(TableError::NoHeader),
        }
        loop {
            let line = self
                .next_head_line()?
                .ok_or(TableError::MissingTerminator(HEADER_END))?;
            if line.trim_end() == HEADER_END {
                break;
            }
            match parse_tag(&line) {
                Some((VERSION_TAG, version)) => {
                    if !SUPPORTED_VERSIONS.contains(&version) {
                        return Err(TableError::UnsupportedVersion(version.to_string()));
                    }
                    self.version = version.to_string();
                }
                Some((ROW_COUNT_TAG, count)) => {
                    self.row_count = count.trim().parse().ok();
                    if self.row_count.is_none() {
                        debug!("Ignoring unparsable row count '{}'.", count);
                    }
                }
                _ => trace!("Skipping header line '{}'.", line),
            }
        }

        self.phase = Phase::ColumnProperties;
        let mut line = self
            .next_head_line()?
            .ok_or(TableError::MissingColumnTitles)?;
        if line.starts_with(EXPLANATION_START) {
            self.explanation = Some(self.read_explanation()?);
            line = self
                .next_head_line()?
                .ok_or(TableError::MissingColumnTitles)?;
        }
        let mut declared = Vec::new();
        if line.trim_end() == PROPERTIES_START {
            declared = self.read_column_properties()?;
            line = self
                .next_head_line()?
                .ok_or(TableError::MissingColumnTitles)?;
        }

        self.phase = Phase::ColumnTitles;
        self.layout = TableLayout::resolve(&line, declared, self.options.coordinate_mode);
        self.row.fields = vec![String::new(); self.layout.source_count];
        debug!(
            "Table version '{}' with {} columns ({} special), {:?} rows declared.",
            self.version,
            self.layout.source_count,
            self.layout.special.len(),
            self.row_count
        );
        self.phase = Phase::Rows;
        Ok(())
    }

    fn read_explanation(&mut self) -> Result<String, TableError> {
        let mut text: Vec<String> = Vec::new();
        loop {
            let line = self
                .next_head_line()?
                .ok_or(TableError::MissingTerminator(EXPLANATION_END))?;
            if line.trim_end() == EXPLANATION_END {
                return Ok(text.join("\n"));
            }
            text.push(line);
        }
    }

    fn read_column_properties(
        &mut self,
    ) -> Result<Vec<(String, HashMap<String, String>)>, TableError> {
        let mut declared: Vec<(String, HashMap<String, String>)> = Vec::new();
        loop {
            let line = self
                .next_head_line()?
                .ok_or(TableError::MissingTerminator(PROPERTIES_END))?;
            if line.trim_end() == PROPERTIES_END {
                return Ok(declared);
            }
            match parse_tag(&line) {
                Some((COLUMN_NAME_TAG, name)) => declared.push((name.to_string(), HashMap::new())),
                Some((COLUMN_PROPERTY_TAG, property)) => {
                    match (declared.last_mut(), property.split_once('\t')) {
                        (Some((_, properties)), Some((key, value))) => {
                            properties.insert(key.to_string(), value.to_string());
                        }
                        _ => debug!("Ignoring column property '{}'.", property),
                    }
                }
                _ => trace!("Skipping column property line '{}'.", line),
            }
        }
    }

    /// Reads the next row into the shared buffer.
    ///
    /// Returns `None` once the rows are exhausted, after a read error, or for a parser
    /// whose file could not be opened.
    pub fn advance(&mut self) -> Option<Row<'_>> {
        if self.phase != Phase::Rows {
            return None;
        }
        let source = self.source.as_mut()?;
        match source.read_into(&mut self.line) {
            Ok(true) => {}
            Ok(false) => {
                self.close();
                return None;
            }
            Err(e) => {
                warn!("Read error after {} rows: {}", self.rows_read, e);
                self.close();
                return None;
            }
        }
        let line_number = source.line_number;
        if is_tail_marker(&self.line) {
            self.enter_tail();
            return None;
        }

        let width = self.row.fields.len();
        let mut found = 0;
        for (index, value) in self.line.split('\t').enumerate() {
            if index < width {
                decode_into(value, &mut self.row.fields[index]);
            }
            found += 1;
        }
        self.row.present = found.min(width);
        if found != width {
            self.rows_with_errors += 1;
            trace!(
                "Line {} has {} fields, expected {}.",
                line_number, found, width
            );
        }
        self.rows_read += 1;
        Some(Row {
            layout: &self.layout,
            buffer: &self.row,
            index: self.rows_read - 1,
        })
    }

    fn enter_tail(&mut self) {
        self.phase = Phase::Tail;
        if self.options.needs_tail() {
            let marker = std::mem::take(&mut self.line);
            if let Err(e) = self.read_tail(marker) {
                warn!("Failed to read the table tail: {}", e);
            }
        }
        self.close();
    }

    fn read_tail(&mut self, marker: String) -> io::Result<()> {
        if self.options.buffer_head_and_tail {
            self.tail_lines.push(marker.clone());
        }
        let mut pending = Some(marker);
        loop {
            let line = match pending.take() {
                Some(line) => line,
                None => match self.next_tail_line()? {
                    Some(line) => line,
                    None => return Ok(()),
                },
            };
            if line == DETAIL_START && self.options.extract_details {
                let section = self.read_detail_section()?;
                self.details = match section.as_deref().map(decode_details) {
                    Some(Ok(details)) => {
                        debug!("Decoded {} detail blobs.", details.len());
                        Some(details)
                    }
                    Some(Err(e)) => {
                        warn!("Detail data cannot be decoded, details are unavailable: {}", e);
                        None
                    }
                    None => {
                        warn!("Detail data is not terminated, details are unavailable.");
                        None
                    }
                };
            }
        }
    }

    fn next_tail_line(&mut self) -> io::Result<Option<String>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let line = source.next_line()?;
        if let (Some(line), true) = (&line, self.options.buffer_head_and_tail) {
            self.tail_lines.push(line.clone());
        }
        Ok(line)
    }

    /// Collects the lines up to `</detail data>`; `None` if the stream ends first.
    fn read_detail_section(&mut self) -> io::Result<Option<Vec<String>>> {
        let mut section = Vec::new();
        while let Some(line) = self.next_tail_line()? {
            if line.trim_end() == DETAIL_END {
                return Ok(Some(section));
            }
            section.push(line);
        }
        Ok(None)
    }

    fn close(&mut self) {
        if self.source.take().is_some() {
            debug!(
                "Closed table source after {} rows ({} with errors).",
                self.rows_read, self.rows_with_errors
            );
        }
        self.phase = Phase::Closed;
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn options(&self) -> &TableReadOptions {
        &self.options
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Row count declared in the header, if present and numeric.
    pub fn row_count(&self) -> Option<usize> {
        self.row_count
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Rows whose field count differed from the number of columns.
    pub fn rows_with_errors(&self) -> usize {
        self.rows_with_errors
    }

    /// Decoded detail blobs. `None` unless extraction was requested and succeeded.
    pub fn details(&self) -> Option<&HashMap<String, Vec<u8>>> {
        self.details.as_ref()
    }

    pub fn take_details(&mut self) -> Option<HashMap<String, Vec<u8>>> {
        self.details.take()
    }

    pub fn head_lines(&self) -> &[String] {
        &self.head_lines
    }

    pub fn tail_lines(&self) -> &[String] {
        &self.tail_lines
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn open_error(&self) -> Option<&io::Error> {
        self.open_error.as_ref()
    }
}

fn decode_details(section: &[String]) -> io::Result<HashMap<String, Vec<u8>>> {
    let mut details = HashMap::new();
    let mut lines = section.iter().peekable();
    while let Some(line) = lines.next() {
        let Some((DETAIL_ID_TAG, id)) = parse_tag(line) else {
            trace!("Skipping detail line '{}'.", line);
            continue;
        };
        let mut encoded = String::new();
        while let Some(next) = lines.next_if(|l| {
            !matches!(parse_tag(l), Some((DETAIL_ID_TAG, _)))
        }) {
            if next.trim_end() == DETAIL_ID_END {
                break;
            }
            encoded.push_str(next);
            encoded.push('\n');
        }
        let mut decoder = BitPackedDecoder::new(Cursor::new(encoded.as_bytes()));
        let count = decoder.initialize(8)?;
        let bytes = (0..count)
            .map(|_| decoder.read().map(|b| b as u8))
            .collect::<io::Result<Vec<u8>>>()?;
        details.insert(id.to_string(), bytes);
    }
    Ok(details)
}
