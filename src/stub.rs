// Emits the small JavaScript module a bundle ships with so that, at
// runtime, a chunk can look up its own identifier.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::identifier::Identifier;

/// Render the lookup module. Unknown chunks fall back to the first entry.
pub fn render_stub(entries: &IndexMap<String, Identifier>) -> String {
    // serde_json string literals are valid JS string literals, so any
    // path survives quoting.
    let values = entries
        .iter()
        .map(|(chunk, id)| {
            format!(
                "{}: {}",
                serde_json::Value::from(chunk.as_str()),
                serde_json::Value::from(id.as_str())
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "exports.getBacktraceUuid = async function(chunk) {{\n\
         \x20 const values = {{ {values} }};\n\
         \x20 let uuid = values[chunk];\n\
         \x20 if (uuid == undefined) uuid = values[Object.keys(values)[0]];\n\
         \x20 return uuid;\n\
         }}\n"
    )
}

pub fn write_stub(path: &Path, entries: &IndexMap<String, Identifier>) -> Result<()> {
    fs::write(path, render_stub(entries)).map_err(|e| Error::io(path, e))
}
