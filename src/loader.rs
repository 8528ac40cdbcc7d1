//! Document loading and import resolution.
//!
//! The loader reads sources through the injected [`SourceReader`],
//! canonicalizes URIs, detects import cycles with an explicit in-progress
//! stack, and stitches the struct definitions of imported documents into
//! the importer (applying `alias` renames). Each document is fully parsed
//! and type-checked before its importer's checking begins, so call
//! resolution always sees finished callee signatures.

use crate::error::{SourcePosition, WdlError};
use crate::parser::{self, ParserOptions};
use crate::source::{FileSourceReader, SourceReader};
use crate::tree::{lower::lower_document, Document, StructTypeDef};

pub struct Loader<R: SourceReader> {
    reader: R,
    options: ParserOptions,
}

/// Load, parse, and type check a document and its import graph with the
/// default filesystem reader.
pub fn load_document(uri: &str) -> Result<Document, WdlError> {
    Loader::new(FileSourceReader::new()).load(uri)
}

impl<R: SourceReader> Loader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            options: ParserOptions::default(),
        }
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self { reader, options }
    }

    pub fn load(&self, uri: &str) -> Result<Document, WdlError> {
        let mut in_progress: Vec<String> = Vec::new();
        self.load_inner(uri, None, &mut in_progress)
    }

    fn load_inner(
        &self,
        uri: &str,
        import_pos: Option<&SourcePosition>,
        in_progress: &mut Vec<String>,
    ) -> Result<Document, WdlError> {
        let pos = import_pos.cloned().unwrap_or_else(SourcePosition::unknown);
        let (text, canonical) = self.reader.read(uri).map_err(|e| {
            WdlError::import(pos.clone(), uri, Some(e.to_string()))
        })?;

        if in_progress.contains(&canonical) {
            return Err(WdlError::import(
                pos,
                uri,
                Some(format!(
                    "circular import ({} is already being loaded)",
                    canonical
                )),
            ));
        }
        in_progress.push(canonical.clone());
        log::debug!("loading {} (canonical {})", uri, canonical);

        let result = self.load_parsed(&text, uri, &canonical, in_progress);
        in_progress.pop();
        result
    }

    fn load_parsed(
        &self,
        text: &str,
        uri: &str,
        canonical: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<Document, WdlError> {
        let cst = parser::parse_document_with_options(text, uri, canonical, self.options)?;
        let mut doc = lower_document(cst)?;

        for index in 0..doc.imports.len() {
            let (import_uri, import_pos, aliases) = {
                let import = &doc.imports[index];
                (
                    import.uri.clone(),
                    import.pos.clone(),
                    import.aliases.clone(),
                )
            };
            let resolved_uri = self.reader.resolve(canonical, &import_uri);
            let imported = self.load_inner(&resolved_uri, Some(&import_pos), in_progress)?;
            stitch_structs(&mut doc, &imported, &aliases, &import_pos)?;
            doc.imports[index].doc = Some(Box::new(imported));
        }

        doc.typecheck()?;
        Ok(doc)
    }
}

/// Merge an imported document's struct definitions into the importer,
/// applying `alias Old as New` renames. A name collision is rejected
/// unless the two definitions are structurally identical.
fn stitch_structs(
    doc: &mut Document,
    imported: &Document,
    aliases: &[(String, String)],
    import_pos: &SourcePosition,
) -> Result<(), WdlError> {
    for alias in aliases {
        if imported.find_struct(&alias.0).is_none() {
            return Err(WdlError::import(
                import_pos.clone(),
                &imported.uri,
                Some(format!("no struct {} to alias", alias.0)),
            ));
        }
    }

    for def in &imported.struct_typedefs {
        let name = aliases
            .iter()
            .find(|(original, _)| *original == def.name)
            .map(|(_, renamed)| renamed.clone())
            .unwrap_or_else(|| def.name.clone());

        if let Some(existing) = doc.find_struct(&name) {
            if existing.type_id() != def.type_id() {
                return Err(WdlError::MultipleDefinitions {
                    pos: import_pos.clone(),
                    message: format!(
                        "imported struct {} collides with an existing, different definition",
                        name
                    ),
                });
            }
            continue;
        }
        doc.struct_typedefs.push(StructTypeDef {
            pos: def.pos.clone(),
            name,
            members: def.members.clone(),
            imported: true,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use std::collections::HashMap;

    /// In-memory source registry keyed by URI.
    struct MemReader {
        sources: HashMap<String, String>,
    }

    impl MemReader {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                sources: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl SourceReader for MemReader {
        fn read(&self, uri: &str) -> Result<(String, String), WdlError> {
            self.sources
                .get(uri)
                .map(|text| (text.clone(), uri.to_string()))
                .ok_or_else(|| WdlError::Runtime {
                    message: format!("no such source {}", uri),
                })
        }

        fn resolve(&self, _base: &str, import_uri: &str) -> String {
            import_uri.to_string()
        }
    }

    #[test]
    fn test_load_single_document() {
        let reader = MemReader::new(&[(
            "main.wdl",
            "version 1.0\ntask t { command { } }",
        )]);
        let doc = Loader::new(reader).load("main.wdl").unwrap();
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.abspath, "main.wdl");
    }

    #[test]
    fn test_import_and_namespaced_call() {
        let reader = MemReader::new(&[
            (
                "lib.wdl",
                r#"version 1.0
task align {
  input {
    File reads
  }
  command {
    echo ~{reads}
  }
  output {
    File bam = "out.bam"
  }
}"#,
            ),
            (
                "main.wdl",
                r#"version 1.0
import "lib.wdl" as lib
workflow w {
  input {
    File r
  }
  call lib.align { input: reads = r }
  output {
    File bam = align.bam
  }
}"#,
            ),
        ]);
        let doc = Loader::new(reader).load("main.wdl").unwrap();
        let workflow = doc.workflow.unwrap();
        assert_eq!(workflow.complete_calls, Some(true));
        assert_eq!(
            workflow.type_env.unwrap().resolve("bam"),
            Some(&Type::file(false))
        );
    }

    #[test]
    fn test_struct_stitching_with_alias() {
        let reader = MemReader::new(&[
            (
                "types.wdl",
                "version 1.0\nstruct Sample {\n  String name\n  Int depth\n}",
            ),
            (
                "main.wdl",
                r#"version 1.0
import "types.wdl" as types alias Sample as LibSample
workflow w {
  LibSample s = object { name: "a", depth: 3 }
  Int d = s.depth
}"#,
            ),
        ]);
        let doc = Loader::new(reader).load("main.wdl").unwrap();
        let stitched = doc.find_struct("LibSample").unwrap();
        assert!(stitched.imported);
        assert_eq!(
            doc.workflow.unwrap().type_env.unwrap().resolve("d"),
            Some(&Type::int(false))
        );
    }

    #[test]
    fn test_struct_collision_identical_ok() {
        let reader = MemReader::new(&[
            ("a.wdl", "version 1.0\nstruct P { Int n }"),
            (
                "main.wdl",
                "version 1.0\nimport \"a.wdl\" as a\nstruct P { Int n }\nworkflow w { }",
            ),
        ]);
        assert!(Loader::new(reader).load("main.wdl").is_ok());
    }

    #[test]
    fn test_struct_collision_different_rejected() {
        let reader = MemReader::new(&[
            ("a.wdl", "version 1.0\nstruct P { Int n }"),
            (
                "main.wdl",
                "version 1.0\nimport \"a.wdl\" as a\nstruct P { String n }\nworkflow w { }",
            ),
        ]);
        assert!(matches!(
            Loader::new(reader).load("main.wdl"),
            Err(WdlError::MultipleDefinitions { .. })
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let reader = MemReader::new(&[
            ("a.wdl", "version 1.0\nimport \"b.wdl\" as b"),
            ("b.wdl", "version 1.0\nimport \"a.wdl\" as a"),
        ]);
        let err = Loader::new(reader).load("a.wdl").unwrap_err();
        assert_eq!(err.kind(), "ImportError");
    }

    #[test]
    fn test_unresolved_import() {
        let reader = MemReader::new(&[(
            "main.wdl",
            "version 1.0\nimport \"missing.wdl\" as m",
        )]);
        let err = Loader::new(reader).load("main.wdl").unwrap_err();
        assert_eq!(err.kind(), "ImportError");
    }

    #[test]
    fn test_duplicate_namespaces_rejected() {
        let reader = MemReader::new(&[
            ("a.wdl", "version 1.0"),
            ("b.wdl", "version 1.0"),
            (
                "main.wdl",
                "version 1.0\nimport \"a.wdl\" as same\nimport \"b.wdl\" as same",
            ),
        ]);
        assert!(matches!(
            Loader::new(reader).load("main.wdl"),
            Err(WdlError::MultipleDefinitions { .. })
        ));
    }
}
