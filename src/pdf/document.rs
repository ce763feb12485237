use serde::Serialize;

use crate::error::Result;
use crate::export::{to_records, Records};
use crate::report::Column;

/// A self-contained Typst document for one filtered report table.
///
/// Cells come from the same stringification as the delimited export, so
/// both outputs always carry identical rows and values.
#[derive(Debug, Clone)]
pub struct PrintDocument {
    pub title: String,
    pub source: String,
    pub records: Records,
}

impl PrintDocument {
    pub fn row_count(&self) -> usize {
        self.records.rows.len()
    }
}

const PAGE_SETUP: &str = r##"// Report Template
// Generated document, all data inline

#set page(
  paper: "us-letter",
  flipped: true,
  margin: (top: 0.75in, bottom: 0.75in, left: 0.75in, right: 0.75in),
  footer: context align(right, text(size: 8pt, fill: gray, counter(page).display("1 / 1", both: true))),
)

#set text(font: "Helvetica", size: 9pt)
"##;

/// Quote a value as a Typst string literal.
fn typst_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn render_print_document<T: Serialize>(
    title: &str,
    columns: &[Column],
    rows: &[T],
    generated_at: &str,
) -> Result<PrintDocument> {
    let records = to_records(rows, Some(columns))?;
    let mut s = String::from(PAGE_SETUP);

    // Title block
    s.push_str("\n#grid(\n  columns: (1fr, auto),\n  align: (left, right),\n");
    s.push_str(&format!(
        "  text(size: 18pt, weight: \"bold\", {}),\n",
        typst_str(title)
    ));
    s.push_str(&format!(
        "  text(size: 9pt, fill: gray, {}),\n)\n",
        typst_str(&format!("Generated {generated_at}"))
    ));
    s.push_str("\n#v(0.5em)\n#line(length: 100%, stroke: 0.5pt + gray)\n#v(0.5em)\n\n");

    // Table: header row always present, one row per record
    s.push_str("#table(\n");
    s.push_str(&format!("  columns: {},\n", records.headers.len().max(1)));
    s.push_str("  align: left,\n");
    s.push_str("  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { (bottom: 0.5pt + gray) },\n");
    s.push_str("  inset: 6pt,\n");
    s.push_str("  fill: (x, y) => if y == 0 { luma(240) } else if calc.even(y) { luma(250) } else { none },\n");
    s.push_str("  table.header(");
    let header_cells: Vec<String> = records
        .headers
        .iter()
        .map(|h| format!("strong({})", typst_str(h)))
        .collect();
    s.push_str(&header_cells.join(", "));
    s.push_str("),\n");
    for row in &records.rows {
        let cells: Vec<String> = row.iter().map(|c| typst_str(c)).collect();
        s.push_str("  ");
        s.push_str(&cells.join(", "));
        s.push_str(",\n");
    }
    s.push_str(")\n\n");

    s.push_str(&format!(
        "#v(1em)\n#text(size: 9pt, fill: gray, {})\n",
        typst_str(&format!("{} record(s)", records.rows.len()))
    ));

    Ok(PrintDocument {
        title: title.to_string(),
        source: s,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::to_delimited;
    use crate::report::{ReportRow, SlaBreachRow};

    fn sla(sla_type: &str, breaches: u64, delay: f64) -> SlaBreachRow {
        SlaBreachRow {
            sla_type: sla_type.to_string(),
            breach_count: breaches,
            avg_delay_days: delay,
        }
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let rows: Vec<SlaBreachRow> = Vec::new();
        let doc =
            render_print_document("SLA Breaches", SlaBreachRow::columns(), &rows, "2026-10-16")
                .unwrap();
        assert_eq!(doc.row_count(), 0);
        assert_eq!(doc.records.headers, vec!["SLA Type", "Breach Count", "Avg Delay (Days)"]);
        assert!(doc.source.contains("table.header(strong(\"SLA Type\")"));
        assert!(doc.source.contains("0 record(s)"));
    }

    #[test]
    fn test_one_table_row_per_record() {
        let rows = vec![sla("Invoice Approval", 12, 9.5), sla("PO Matching", 2, 1.0)];
        let doc =
            render_print_document("SLA Breaches", SlaBreachRow::columns(), &rows, "today").unwrap();
        assert_eq!(doc.row_count(), 2);
        assert!(doc.source.contains("  \"Invoice Approval\", \"12\", \"9.5\",\n"));
        assert!(doc.source.contains("  \"PO Matching\", \"2\", \"1\",\n"));
    }

    #[test]
    fn test_content_matches_delimited_export() {
        let rows = vec![sla("Approval, \"urgent\"", 4, 2.25), sla("Release", 11, 8.0)];
        let doc = render_print_document("t", SlaBreachRow::columns(), &rows, "d").unwrap();
        let text = to_delimited(&rows, Some(SlaBreachRow::columns()), b',').unwrap();

        let parsed: Vec<Vec<String>> = csv::ReaderBuilder::new()
            .from_reader(text.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(parsed, doc.records.rows);
    }

    #[test]
    fn test_typst_strings_are_escaped() {
        assert_eq!(typst_str("plain"), "\"plain\"");
        assert_eq!(typst_str("a \"b\" \\ c\nd"), "\"a \\\"b\\\" \\\\ c\\nd\"");
        // Markup characters are inert inside string literals
        assert_eq!(typst_str("#let x = *y*"), "\"#let x = *y*\"");
    }
}
