//! Single-blob source assembly for backends that accept one source unit.

use crate::submission::{Artifact, SourceFile};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Concatenate files in order, each preceded by a
/// `<comment> FILE: <name>` marker, then append one
/// `<comment> JAR:<name>:<base64>` line per artifact. Artifact lines are
/// informational only; nothing here decodes or runs them.
pub fn assemble(files: &[SourceFile], jars: &[Artifact], comment: &str) -> String {
    let mut source = String::new();

    for file in files {
        source.push_str(comment);
        source.push_str(" FILE: ");
        source.push_str(&file.name);
        source.push('\n');
        source.push_str(&file.content);
        source.push_str("\n\n");
    }

    for jar in jars {
        source.push_str(&format!(
            "{} JAR:{}:{}\n",
            comment,
            jar.name,
            STANDARD.encode(&jar.bytes)
        ));
    }

    source
}
