use crate::error::ExportError;
use crate::tree::{CellContext, NodeId, Tree};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Layout of delimited text written from a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub separator: u8,
    pub header: bool,
    /// Prepends the hierarchy level (0 for top level rows).
    pub level: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: b';',
            header: true,
            level: false,
        }
    }
}

/// Serializes the visible columns of every row, in document order.
///
/// With `only` set, rows not in the set are skipped.
pub fn rows_to_csv(
    tree: &Tree,
    ctx: &CellContext<'_>,
    options: CsvOptions,
    only: Option<&BTreeSet<NodeId>>,
) -> Result<String, ExportError> {
    let columns = ctx.columns.visible_columns();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.separator)
        .flexible(false)
        .from_writer(Vec::new());

    if options.header {
        let mut record: Vec<String> = Vec::with_capacity(columns.len() + 1);
        if options.level {
            record.push("Level".to_string());
        }
        record.extend(columns.iter().filter_map(|&c| ctx.columns.header(c)));
        writer.write_record(&record)?;
    }

    for (node, level) in tree.walk(Tree::ROOT) {
        if only.is_some_and(|set| !set.contains(&node)) {
            continue;
        }
        let mut record: Vec<String> = Vec::with_capacity(columns.len() + 1);
        if options.level {
            record.push(level.to_string());
        }
        record.extend(
            columns
                .iter()
                .map(|&c| tree.data(node, c, ctx).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })
}

pub fn export_csv<P: AsRef<Path>>(
    tree: &Tree,
    ctx: &CellContext<'_>,
    options: CsvOptions,
    only: Option<&BTreeSet<NodeId>>,
    path: P,
) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let text = rows_to_csv(tree, ctx, options, only)?;

    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;
    file.write_all(text.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    Ok(())
}
