//! Minimal RFC 4180 CSV writing.

use std::io::{self, Write};

/// Column order of every exported file.
pub const HEADER: [&str; 6] = ["year", "week", "rank", "team", "record", "scraped_at"];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV row, quoting fields that need it.
pub fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            w.write_all(b",")?;
        }
        first = false;
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_row_quotes_when_needed() {
        let mut out = Vec::new();
        write_row(&mut out, &["2023", "Week 12", "Miami (OH), \"RedHawks\""]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2023,Week 12,\"Miami (OH), \"\"RedHawks\"\"\"\r\n"
        );
    }

    #[test]
    fn test_write_row_empty_fields() {
        let mut out = Vec::new();
        write_row(&mut out, &["1", "", "x"]).unwrap();
        assert_eq!(out, b"1,,x\r\n");
    }
}
