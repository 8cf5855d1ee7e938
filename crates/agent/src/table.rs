use serde_json::Value;

/// Renders a backend result as a plain-text table. Accepts a single JSON
/// object (one data row) or an array of objects. Column order is the
/// first-seen key order across all rows; rows keep input order. Returns
/// `None` for shapes that are not tabular.
pub fn render_table(value: &Value) -> Option<String> {
    let rows: Vec<&Value> = match value {
        Value::Object(_) => vec![value],
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            items.iter().collect()
        }
        _ => return None,
    };

    let mut headers: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.as_object().into_iter().flat_map(|object| object.keys()) {
            if !headers.iter().any(|header| header == key) {
                headers.push(key);
            }
        }
    }
    if headers.is_empty() {
        return None;
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| headers.iter().map(|header| cell_text(row.get(*header))).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain([header.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(&headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(), &widths));
    lines.push(
        widths.iter().map(|width| "-".repeat(width + 2)).collect::<Vec<_>>().join("+"),
    );
    for row in &cells {
        lines.push(render_row(row, &widths));
    }

    Some(lines.join("\n"))
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!(" {cell:<width$} "))
        .collect::<Vec<_>>()
        .join("|")
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::render_table;

    #[test]
    fn array_of_objects_keeps_first_seen_header_order() {
        let value = json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]);
        let table = render_table(&value).expect("tabular value should render");

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        let header_cells: Vec<&str> = lines[0].split('|').map(str::trim).collect();
        assert_eq!(header_cells, vec!["id", "name"]);
        assert!(lines[2].contains('1') && lines[2].contains('A'));
        assert!(lines[3].contains('2') && lines[3].contains('B'));
    }

    #[test]
    fn single_object_renders_as_one_row() {
        let value = json!({"id": 7, "status": "approved"});
        let table = render_table(&value).expect("object should render");

        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("status"));
        assert!(table.contains("approved"));
    }

    #[test]
    fn later_rows_extend_the_header_set() {
        let value = json!([{"id": 1}, {"id": 2, "name": "B"}]);
        let table = render_table(&value).expect("tabular value should render");

        let header_cells: Vec<&str> =
            table.lines().next().unwrap().split('|').map(str::trim).collect();
        assert_eq!(header_cells, vec!["id", "name"]);
    }

    #[test]
    fn non_tabular_shapes_do_not_render() {
        assert!(render_table(&json!("just text")).is_none());
        assert!(render_table(&json!([1, 2, 3])).is_none());
        assert!(render_table(&json!([])).is_none());
    }
}
