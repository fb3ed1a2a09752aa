use super::error::TableError;
use super::parser::TableParser;
use crate::core::io::filetype::FileTypes;
use std::io::{BufRead, Write};
use tracing::debug;

/// Field delimiter for a delimited-text target, `None` for other file types.
pub fn delimiter_for(types: FileTypes) -> Option<u8> {
    if types.contains(FileTypes::CSV) {
        Some(b',')
    } else if types.contains(FileTypes::TEXT) {
        Some(b'\t')
    } else {
        None
    }
}

/// Writes the visible columns of every remaining row as delimited text.
///
/// The first record holds the column names. Missing trailing fields are written as
/// empty values. `on_row` is called after each row with the number written so far.
/// Returns the number of rows written.
pub fn export_rows<R, W, F>(
    parser: &mut TableParser<R>,
    sink: W,
    delimiter: u8,
    mut on_row: F,
) -> Result<usize, TableError>
where
    R: BufRead,
    W: Write,
    F: FnMut(usize),
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(sink);
    let width = parser.layout().visible_columns().len();
    writer.write_record(parser.layout().visible_columns().iter().map(|c| c.name()))?;

    let mut written = 0;
    while let Some(row) = parser.advance() {
        writer.write_record((0..width).map(|i| row.field(i).unwrap_or_default()))?;
        written += 1;
        on_row(written);
    }
    writer.flush().map_err(TableError::Io)?;
    debug!("Exported {} rows with delimiter {:?}.", written, delimiter as char);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::table::options::TableReadOptions;
    use std::io::Cursor;

    const TABLE: &str = "<datawarrior-fileinfo>\n<version=\"3.1\">\n</datawarrior-fileinfo>\n\
        <column properties>\n<columnName=\"Structure\">\n<columnProperty=\"specialType\tidcode\">\n</column properties>\n\
        Structure\tName\tNote\n\
        gJPHAD\tethanol\tsolvent, polar\n\
        gGPHD\twater\tline<NL>break\n\
        fHdP@\tshort\n";

    fn parser() -> TableParser<Cursor<&'static [u8]>> {
        TableParser::from_reader(Cursor::new(TABLE.as_bytes()), TableReadOptions::default()).unwrap()
    }

    #[test]
    fn delimiter_follows_target_file_type() {
        assert_eq!(delimiter_for(FileTypes::CSV), Some(b','));
        assert_eq!(delimiter_for(FileTypes::TEXT), Some(b'\t'));
        assert_eq!(delimiter_for(FileTypes::DATAWARRIOR), None);
    }

    #[test]
    fn csv_export_quotes_and_skips_special_columns() {
        let mut parser = parser();
        let mut out = Vec::new();
        let mut progress = Vec::new();
        let count = export_rows(&mut parser, &mut out, b',', |n| progress.push(n)).unwrap();

        assert_eq!(count, 3);
        assert_eq!(progress, vec![1, 2, 3]);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Name,Note\nethanol,\"solvent, polar\"\nwater,\"line\nbreak\"\nshort,\n"
        );
    }

    #[test]
    fn tab_export_reads_back_with_csv_reader() {
        let mut parser = parser();
        let mut out = Vec::new();
        export_rows(&mut parser, &mut out, b'\t', |_| {}).unwrap();

        let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["Name", "Note"]);
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[1][1], "line\nbreak");
    }
}
