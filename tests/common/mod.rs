// Shared helpers for integration tests

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// ZIP in memory with the given members.
pub fn build_zip(entries: &[(&str, Vec<u8>)]) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        zip.finish()?;
    }
    Ok(buf)
}

/// A day exported by the semicolon generator: decimal commas, reading at field 4,
/// Latin-1 header line.
pub fn semicolon_day(date: &str, readings: &[&str]) -> Vec<u8> {
    let mut out = b"Ponto;Data;Hora;Descri\xE7\xE3o;Vaz\xE3o\r\n".to_vec();
    for (i, reading) in readings.iter().enumerate() {
        out.extend_from_slice(
            format!("P1;{};{:02}:00;Medi\u{e7}ao;{}\r\n", date, i, reading)
                .chars()
                .map(|c| c as u8)
                .collect::<Vec<u8>>()
                .as_slice(),
        );
    }
    out
}

/// A day exported by the comma generator: decimal points, reading at field 5.
pub fn comma_day(date: &str, readings: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, reading) in readings.iter().enumerate() {
        out.extend_from_slice(
            format!("P1,{},{:02}:30,A,B,{}\n", date, i, reading).as_bytes(),
        );
    }
    out
}
