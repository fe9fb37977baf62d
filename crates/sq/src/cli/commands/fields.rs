//! Implementation of `sq fields`.

use std::{path::Path, process::ExitCode};

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use sq_config::FieldTable;

use crate::cli::{
    context::CommandContext,
    output::{dim, subheader},
};

/// Prints the effective field registry.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let fields = ctx.config.fields();
    if fields.is_empty() {
        println!("{}", dim("No fields defined."));
        println!();
        println!(
            "Run {} to create a configuration file with field declarations.",
            subheader("sq init")
        );
        return ExitCode::SUCCESS;
    }

    println!("{}", fields_table(fields, &ctx.cwd));
    ExitCode::SUCCESS
}

/// Builds the field table, showing sources relative to `cwd` where possible.
fn fields_table(fields: &FieldTable, cwd: &Path) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Field", "Type", "Defined in"]);
    for (name, def) in fields.iter() {
        let source = def.source.strip_prefix(cwd).unwrap_or(def.source.as_path());
        table.add_row(vec![
            Cell::new(name),
            Cell::new(def.field_type),
            Cell::new(source.display()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use sq_query::FieldType;

    use super::*;

    #[test]
    fn table_lists_fields_in_name_order() {
        let mut fields = FieldTable::new();
        fields.declare("dateFiled", FieldType::Date, Path::new("/work/.sq.toml"));
        fields.declare("citeCount", FieldType::Number, Path::new("/home/u/.sq.toml"));

        let rendered = fields_table(&fields, Path::new("/work")).to_string();
        let cite = rendered.find("citeCount").unwrap();
        let date = rendered.find("dateFiled").unwrap();
        assert!(cite < date);
        assert!(rendered.contains("number"));
        assert!(rendered.contains("/home/u/.sq.toml"));
        assert!(rendered.contains(" .sq.toml"));
    }
}
