#![forbid(unsafe_code)]

use std::io;

/// Plain column-aligned table for terminal output, with a CSV mode for
/// scripts.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cols: impl IntoIterator<Item = impl Into<String>>) {
        self.rows.push(cols.into_iter().map(Into::into).collect());
    }

    pub fn print(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.write_to(&mut out)
    }

    pub fn write_csv(&self) -> io::Result<()> {
        self.write_csv_to(io::stdout().lock())
    }

    pub fn write_csv_to(&self, out: impl io::Write) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_to(&self, mut out: impl io::Write) -> io::Result<()> {
        let widths = self.widths();
        writeln!(&mut out, "{}", format_row(&self.headers, &widths))?;
        for row in &self.rows {
            writeln!(&mut out, "{}", format_row(row, &widths))?;
        }
        Ok(())
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| visible_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i >= widths.len() {
                    widths.push(0);
                }
                widths[i] = widths[i].max(visible_width(cell));
            }
        }
        widths
    }
}

fn visible_width(s: &str) -> usize {
    // One column per char; good enough for the ASCII-heavy task tables.
    s.chars().count()
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push_str(cell);
        // no trailing padding on the last column
        if i + 1 < row.len() {
            let w = widths.get(i).copied().unwrap_or(0);
            let pad = w.saturating_sub(visible_width(cell));
            out.extend(std::iter::repeat_n(' ', pad));
        }
    }
    out
}

/// Cuts `s` to `max` chars, marking the cut with `...`.
#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(t: &Table) -> String {
        let mut buf = Vec::new();
        t.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn columns_align_to_widest_cell() {
        let mut t = Table::new(["ID", "TITLE", "DUE"]);
        t.row(["1", "Pay rent", "2024-06-01"]);
        t.row(["1717000000000", "x", "-"]);
        assert_eq!(
            render(&t),
            "ID             TITLE     DUE\n\
             1              Pay rent  2024-06-01\n\
             1717000000000  x         -\n"
        );
    }

    #[test]
    fn csv_quotes_commas() {
        let mut t = Table::new(["id", "title"]);
        t.row(["1", "eggs, milk"]);
        let mut buf = Vec::new();
        t.write_csv_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "id,title\n1,\"eggs, milk\"\n");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
