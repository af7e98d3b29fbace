use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

use handlebars::Handlebars;
use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

use super::error::AnkrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Column {
    pub(crate) id: &'static str,
    pub(crate) label: &'static str,
}

impl Column {
    pub(crate) const fn new(id: &'static str, label: &'static str) -> Self {
        Self { id, label }
    }
}

pub(crate) type Row = BTreeMap<&'static str, String>;

/// A command result that the output dispatcher knows how to render.
pub(crate) trait Displayable {
    /// Column ids and header labels, in display order.
    fn columns(&self) -> &'static [Column];

    fn rows(&self) -> Vec<Row>;

    /// The complete result, used for `--output json` and templates.
    fn json(&self) -> Result<Value, serde_json::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum OutputKind {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for OutputKind {
    type Err = AnkrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "text" => Ok(OutputKind::Text),
            "csv" => Ok(OutputKind::Csv),
            "json" => Ok(OutputKind::Json),
            other => Err(AnkrError::InvalidInput(format!(
                "unknown output format `{other}`; expected one of: text, csv, json"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DisplayOptions {
    pub(crate) kind: OutputKind,
    pub(crate) columns: Vec<String>,
    pub(crate) no_header: bool,
    pub(crate) template: Option<String>,
}

pub(crate) fn display(
    out: &mut dyn Write,
    item: &dyn Displayable,
    opts: &DisplayOptions,
) -> Result<(), AnkrError> {
    let columns = select_columns(item.columns(), &opts.columns)?;

    if let Some(template) = opts.template.as_deref().filter(|t| !t.is_empty()) {
        return render_template(out, item, template);
    }

    match opts.kind {
        OutputKind::Json => {
            serde_json::to_writer_pretty(&mut *out, &item.json()?)?;
            writeln!(out)?;
        }
        OutputKind::Text => write_table(out, &columns, item.rows(), opts.no_header)?,
        OutputKind::Csv => write_csv(out, &columns, item.rows(), opts.no_header)?,
    }

    Ok(())
}

fn select_columns(
    available: &'static [Column],
    requested: &[String],
) -> Result<Vec<Column>, AnkrError> {
    if requested.is_empty() {
        return Ok(available.to_vec());
    }

    let mut unknown = Vec::new();
    let mut selected = Vec::with_capacity(requested.len());
    for wanted in requested {
        match available.iter().find(|c| c.id == wanted.trim()) {
            Some(column) => selected.push(*column),
            None => unknown.push(wanted.trim().to_string()),
        }
    }

    if unknown.is_empty() {
        Ok(selected)
    } else {
        Err(AnkrError::InvalidInput(format!(
            "unknown column(s) {}; possible values: {}",
            unknown.join(", "),
            available
                .iter()
                .map(|c| c.id)
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

fn cells(columns: &[Column], row: &Row) -> Vec<String> {
    columns
        .iter()
        .map(|c| row.get(c.id).cloned().unwrap_or_default())
        .collect()
}

fn write_table(
    out: &mut dyn Write,
    columns: &[Column],
    rows: Vec<Row>,
    no_header: bool,
) -> Result<(), AnkrError> {
    let mut builder = Builder::default();
    if !no_header {
        builder.push_record(columns.iter().map(|c| c.label.to_string()));
    }
    for row in &rows {
        builder.push_record(cells(columns, row));
    }

    if no_header && rows.is_empty() {
        return Ok(());
    }

    let mut table = builder.build();
    table.with(Style::blank());
    writeln!(out, "{table}")?;

    Ok(())
}

fn write_csv(
    out: &mut dyn Write,
    columns: &[Column],
    rows: Vec<Row>,
    no_header: bool,
) -> Result<(), AnkrError> {
    let mut writer = csv::Writer::from_writer(out);
    if !no_header {
        writer.write_record(columns.iter().map(|c| c.label))?;
    }
    for row in &rows {
        writer.write_record(cells(columns, row))?;
    }
    writer.flush()?;

    Ok(())
}

fn render_template(
    out: &mut dyn Write,
    item: &dyn Displayable,
    template: &str,
) -> Result<(), AnkrError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    let items = match item.json()? {
        Value::Array(items) => items,
        other => vec![other],
    };
    for value in items {
        writeln!(out, "{}", handlebars.render_template(template, &value)?)?;
    }

    Ok(())
}

/// Renders a unix timestamp from the hub for table output.
pub(crate) fn timestamp(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(t) if secs > 0 => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod test {
    use serde_json::{Value, json};

    use super::{Column, DisplayOptions, Displayable, OutputKind, Row, display};
    use crate::cli::error::AnkrError;

    const COLUMNS: &[Column] = &[
        Column::new("ID", "ID"),
        Column::new("Name", "Name"),
        Column::new("Status", "Status"),
    ];

    struct Widgets(Vec<(&'static str, &'static str, &'static str)>);

    impl Displayable for Widgets {
        fn columns(&self) -> &'static [Column] {
            COLUMNS
        }

        fn rows(&self) -> Vec<Row> {
            self.0
                .iter()
                .map(|(id, name, status)| {
                    Row::from([
                        ("ID", id.to_string()),
                        ("Name", name.to_string()),
                        ("Status", status.to_string()),
                    ])
                })
                .collect()
        }

        fn json(&self) -> Result<Value, serde_json::Error> {
            Ok(Value::Array(
                self.0
                    .iter()
                    .map(|(id, name, status)| json!({"id": id, "name": name, "status": status}))
                    .collect(),
            ))
        }
    }

    fn widgets() -> Widgets {
        Widgets(vec![("w1", "alpha", "Running"), ("w2", "beta", "Done")])
    }

    fn render(opts: DisplayOptions) -> Result<String, AnkrError> {
        let mut out = Vec::new();
        display(&mut out, &widgets(), &opts)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn text_output_has_header_and_rows() {
        let text = render(DisplayOptions::default()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("ID") && lines[0].contains("Status"));
        assert!(lines[1].contains("alpha"));
        assert!(lines[2].contains("Done"));
    }

    #[test]
    fn column_selection_and_no_header() {
        let text = render(DisplayOptions {
            columns: vec!["Name".into()],
            no_header: true,
            ..Default::default()
        })
        .unwrap();
        let lines: Vec<_> = text.lines().map(str::trim).collect();
        assert_eq!(lines, vec!["alpha", "beta"]);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = render(DisplayOptions {
            columns: vec!["Name".into(), "Colour".into()],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(&err, AnkrError::InvalidInput(msg) if msg.contains("Colour")));
    }

    #[test]
    fn json_ignores_column_selection() {
        let text = render(DisplayOptions {
            kind: OutputKind::Json,
            columns: vec!["Name".into()],
            ..Default::default()
        })
        .unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[1]["status"], "Done");
        assert_eq!(parsed[0]["id"], "w1");
    }

    #[test]
    fn csv_output() {
        let text = render(DisplayOptions {
            kind: OutputKind::Csv,
            columns: vec!["ID".into(), "Status".into()],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(text, "ID,Status\nw1,Running\nw2,Done\n");
    }

    #[test]
    fn template_renders_each_item() {
        let text = render(DisplayOptions {
            template: Some("{{id}}={{status}}".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(text, "w1=Running\nw2=Done\n");
    }

    #[test]
    fn template_with_unknown_field_fails() {
        let err = render(DisplayOptions {
            template: Some("{{nope}}".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AnkrError::Render(_)));
    }

    #[test]
    fn output_kind_parsing() {
        assert_eq!("JSON".parse::<OutputKind>().unwrap(), OutputKind::Json);
        assert_eq!("".parse::<OutputKind>().unwrap(), OutputKind::Text);
        assert!("yaml".parse::<OutputKind>().is_err());
    }

    #[test]
    fn timestamps() {
        assert_eq!(super::timestamp(0), "");
        assert_eq!(super::timestamp(1_600_000_000), "2020-09-13 12:26:40 UTC");
    }
}
