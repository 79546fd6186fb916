//=====================================================
// File: modules/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Import path resolution and loading
// Objective: Map an import specifier onto a script file and parse it; every
//            import re-reads and re-parses so the importer re-executes it
//=====================================================

use crate::ast::Program;
use crate::parser::{ParseError, Parser};
use crate::tokenizer::Tokenizer;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const SCRIPT_EXTENSION: &str = "fsk";
const PACKAGE_DIR: &str = "fsk_modules";
const STD_DIR: &str = "std";
const PACKAGE_ENTRY: &str = "index.fsk";

#[derive(Debug, Clone, Error)]
pub enum ModuleError {
    #[error("Could not open file: {spec}")]
    NotFound { spec: String, tried: Vec<PathBuf> },
    #[error("Could not read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("{}: {message}", path.display())]
    Tokenize { path: PathBuf, message: String },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    search_paths: Vec<PathBuf>,
}

impl ModuleLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Candidate files for `spec`, in lookup order.
    pub fn candidates(&self, spec: &str, importer_dir: Option<&Path>) -> Vec<PathBuf> {
        let raw = PathBuf::from(spec);
        let mut names = vec![raw.clone()];
        if raw.extension().is_none() {
            names.push(raw.with_extension(SCRIPT_EXTENSION));
        }

        if raw.is_absolute() {
            return names;
        }

        let mut roots: Vec<PathBuf> = Vec::new();
        if let Some(dir) = importer_dir {
            roots.push(dir.to_path_buf());
        }
        roots.push(PathBuf::new());
        roots.extend(self.search_paths.iter().cloned());
        if let Some(dir) = importer_dir.and_then(Path::parent) {
            roots.push(dir.to_path_buf());
        }

        let mut candidates = Vec::new();
        for root in &roots {
            for name in &names {
                candidates.push(root.join(name));
            }
            for name in &names {
                candidates.push(root.join(PACKAGE_DIR).join(name));
            }
            candidates.push(root.join(PACKAGE_DIR).join(&raw).join(PACKAGE_ENTRY));
            for name in &names {
                candidates.push(root.join(STD_DIR).join(name));
            }
        }

        let mut unique = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }

    pub fn resolve(&self, spec: &str, importer_dir: Option<&Path>) -> Result<PathBuf, ModuleError> {
        let tried = self.candidates(spec, importer_dir);
        match tried.iter().find(|candidate| candidate.is_file()) {
            Some(found) => {
                debug!(spec, path = %found.display(), "module resolved");
                Ok(found.clone())
            }
            None => Err(ModuleError::NotFound {
                spec: spec.to_string(),
                tried,
            }),
        }
    }

    /// Read, tokenize and parse one file.
    pub fn load(&self, path: &Path) -> Result<Program, ModuleError> {
        let source = fs::read_to_string(path).map_err(|error| ModuleError::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        let tokens = Tokenizer::new(&source)
            .tokenize()
            .map_err(|message| ModuleError::Tokenize {
                path: path.to_path_buf(),
                message,
            })?;
        Parser::new(tokens)
            .parse()
            .map_err(|source| ModuleError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_relative_to_importer_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.fsk"), "let x = 1;").unwrap();
        let loader = ModuleLoader::default();
        let resolved = loader.resolve("util", Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path().join("util.fsk"));
    }

    #[test]
    fn resolves_packages_and_std() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("fsk_modules/http")).unwrap();
        fs::write(dir.path().join("fsk_modules/http/index.fsk"), "").unwrap();
        fs::create_dir_all(dir.path().join("std")).unwrap();
        fs::write(dir.path().join("std/math.fsk"), "").unwrap();

        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        assert_eq!(
            loader.resolve("http", None).unwrap(),
            dir.path().join("fsk_modules/http/index.fsk")
        );
        assert_eq!(
            loader.resolve("math", None).unwrap(),
            dir.path().join("std/math.fsk")
        );
    }

    #[test]
    fn missing_module_lists_attempts() {
        let loader = ModuleLoader::default();
        match loader.resolve("definitely_not_here_42", None) {
            Err(ModuleError::NotFound { spec, tried }) => {
                assert_eq!(spec, "definitely_not_here_42");
                assert!(!tried.is_empty());
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.fsk");
        fs::write(&path, "let = ;").unwrap();
        let error = ModuleLoader::default().load(&path).unwrap_err();
        assert!(matches!(error, ModuleError::Parse { .. }));
        assert!(error.to_string().contains("broken.fsk"));
    }
}

//=====================================================
// End of file
//=====================================================
