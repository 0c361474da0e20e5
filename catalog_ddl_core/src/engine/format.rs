use crate::catalog::{CatalogObject, CatalogRepository, ObjectAttrs, RelationshipType};
use crate::types::Row;

/// Formats a SELECT result as a tab-separated table
pub fn format_select(columns: &[CatalogObject], rows: &[Row]) -> String {
    let header = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("\t");

    if rows.is_empty() {
        return header;
    }

    let row_lines = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n{}", header, row_lines)
}

/// One line per column (`name type [not null] [default v]`), then one per index
pub fn format_describe(
    repo: &dyn CatalogRepository,
    columns: &[CatalogObject],
    indexes: &[CatalogObject],
) -> String {
    let mut lines = Vec::new();
    for column in columns {
        if let ObjectAttrs::Column {
            data_type,
            nullable,
            default,
            ..
        } = &column.attrs
        {
            let mut line = format!("{} {}", column.name, data_type);
            if !nullable {
                line.push_str(" not null");
            }
            if let Some(default) = default {
                line.push_str(&format!(" default {default}"));
            }
            lines.push(line);
        }
    }
    for index in indexes {
        let ObjectAttrs::Index { unique, .. } = index.attrs else {
            continue;
        };
        let cols = repo
            .links_from(index.id, RelationshipType::IndexedColumn)
            .into_iter()
            .filter_map(|c| repo.lookup(c).map(|o| o.name.clone()))
            .collect::<Vec<_>>()
            .join(",");
        let label = if unique { "unique index" } else { "index" };
        lines.push(format!("{label} {}({cols})", index.name));
    }
    lines.join("\n")
}

pub fn format_tables(names: &[String]) -> String {
    names.join("\n")
}
