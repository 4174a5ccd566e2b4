//! Operation declaration commands.

use std::path::Path;

use anyhow::Result;

use crate::Format;
use crate::context::AppContext;
use crate::style::print_table;

pub fn list(project: &Path, format: Format) -> Result<()> {
    let ctx = AppContext::load(project)?;
    let declarations = ctx.guard.declarations();

    match format {
        Format::Json => {
            let all: Vec<_> = declarations.iter().collect();
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
        Format::Table => {
            let rows: Vec<Vec<String>> = declarations
                .iter()
                .map(|declaration| {
                    let required = if declaration.is_public() {
                        "(public)".to_string()
                    } else {
                        declaration.required.join(", ")
                    };
                    vec![declaration.operation.to_string(), required]
                })
                .collect();
            print_table(&["Operation", "Requires"], &rows, "operation");
        }
    }

    Ok(())
}
