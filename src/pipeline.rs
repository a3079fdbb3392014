//! End-to-end generator run
//!
//! Each header is read, parsed and transformed on its own, so with `jobs > 1`
//! the per-file work runs on a rayon pool. Everything that depends on file
//! order (the record set and the "already defined" filter) happens after the
//! parallel section, over results collected in configuration order.

use crate::config::GeneratorConfig;
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::ir::{DeclFile, Macro, Project, Struct, StructField, TypeAlias, TypeInfo, Value};
use crate::parser::HeaderParser;
use crate::transform::{RuleSet, Transformer};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Name of the synthetic file prepended to every project
pub const BUILTIN_FILENAME: &str = "builtin";

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReport {
    /// Files processed, builtin file included
    pub files: usize,
    /// Top-level declarations across all files
    pub declarations: usize,
    /// Path of the generated module
    pub output: PathBuf,
    /// JSON dumps written
    pub dumps: Vec<PathBuf>,
    /// Size of the generated module in bytes
    pub bytes: usize,
}

/// Declarations every generated module relies on but no header provides
pub fn builtin_file() -> DeclFile {
    let mut file = DeclFile::new(BUILTIN_FILENAME);

    file.macros.push(Macro {
        ident: "E_INVALIDARG".to_string(),
        value: Value::Raw("-2147024809".to_string()),
    });

    file.structs.push(Struct::new(
        "GUID",
        vec![
            StructField::new("Data1", TypeInfo::basic("DWORD")),
            StructField::new("Data2", TypeInfo::basic("WORD")),
            StructField::new("Data3", TypeInfo::basic("WORD")),
            StructField::new("Data4", TypeInfo::array("BYTE", vec![8])),
        ],
    ));
    file.structs.push(Struct::new(
        "Rect",
        ["Left", "Top", "Right", "Bottom"]
            .iter()
            .map(|name| StructField::new(*name, TypeInfo::basic("LONG")))
            .collect(),
    ));

    for ident in ["HWND", "HMODULE", "ID3DInclude"] {
        file.type_aliases.push(TypeAlias {
            ident: ident.to_string(),
            alias: "usize".to_string(),
        });
    }
    file
}

/// Parses and transforms one header held in memory
pub fn parse_and_transform(
    filename: &str,
    source: &str,
    rules: &RuleSet,
    allow_conflicting_enum_duplicates: bool,
) -> Result<DeclFile> {
    let mut file = HeaderParser::new(filename, source, rules).parse()?;
    Transformer::new(rules, allow_conflicting_enum_duplicates).transform(&mut file)?;
    Ok(file)
}

/// Runs the whole pipeline for one configuration
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Generator { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Parses, transforms, dumps and emits every configured header
    pub fn run(&self) -> Result<GenerateReport> {
        self.config.validate()?;
        tracing::info!(
            "generating {} from {} headers in {}",
            self.config.output.display(),
            self.config.headers.len(),
            self.config.include_dir.display()
        );

        let project = self.build_project()?;
        let dumps = match &self.config.dump_dir {
            Some(dir) => dump_project(&project, dir)?,
            None => Vec::new(),
        };
        let code = self.emit(&project)?;
        write_file(&self.config.output, &code)?;

        let report = GenerateReport {
            files: project.files.len(),
            declarations: project.files.iter().map(DeclFile::len).sum(),
            output: self.config.output.clone(),
            dumps,
            bytes: code.len(),
        };
        tracing::info!(
            "wrote {} ({} bytes, {} declarations in {} files)",
            report.output.display(),
            report.bytes,
            report.declarations,
            report.files
        );
        Ok(report)
    }

    /// Reads, parses and transforms the configured headers, builtin file first
    pub fn build_project(&self) -> Result<Project> {
        let paths = self.config.header_paths();
        let headers = self.map_files(&paths, |path| self.load_header(path))?;

        let mut files = Vec::with_capacity(headers.len() + 1);
        if self.config.include_builtins {
            let mut builtin = builtin_file();
            self.transformer().transform(&mut builtin)?;
            files.push(builtin);
        }
        files.extend(headers);
        Ok(Project { files })
    }

    /// Emits a project into one module
    pub fn emit(&self, project: &Project) -> Result<String> {
        let emitter =
            Emitter::new(&self.config.rules, self.config.dll_name.as_str()).with_records(&project.files);
        let emitted = self.map_files(&project.files, |file| emitter.emit_file(file))?;
        Ok(emitter.merge(&emitted))
    }

    fn transformer(&self) -> Transformer<'_> {
        Transformer::new(
            &self.config.rules,
            self.config.allow_conflicting_enum_duplicates,
        )
    }

    fn load_header(&self, path: &Path) -> Result<DeclFile> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        parse_and_transform(
            &filename,
            &source,
            &self.config.rules,
            self.config.allow_conflicting_enum_duplicates,
        )
    }

    /// Applies `f` to every item, in parallel when more than one job is
    /// configured. Results keep the input order; the first error wins.
    fn map_files<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Send + Sync,
    {
        if self.config.jobs <= 1 || items.len() <= 1 {
            return items.iter().map(f).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs.min(items.len()))
            .build()
            .map_err(|e| Error::Config(format!("failed to create thread pool: {}", e)))?;
        pool.install(|| items.par_iter().map(|item| f(item)).collect())
    }
}

/// Writes each file's IR to `<dir>/<stem>.json`
pub fn dump_project(project: &Project, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    project
        .files
        .iter()
        .map(|file| {
            let path = dir.join(format!("{}.json", file.stem()));
            let json = serde_json::to_string_pretty(file)?;
            std::fs::write(&path, json).map_err(|e| Error::io(&path, e))?;
            tracing::debug!("dumped {} to {}", file.filename, path.display());
            Ok(path)
        })
        .collect()
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| Error::io(path, e))
}
