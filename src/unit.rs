//! Compilation unit API.
//!
//! A [`Unit`] holds one parsed program and the options to compile it with.
//! Building runs resolution, type checking and code generation in order and
//! stops at the first phase that reports errors.
//!
//! # Example
//!
//! ```ignore
//! use decaf::{CompilerOptions, Unit};
//!
//! let unit = Unit::from_json(source)?
//!     .with_options(CompilerOptions::new().with_register_count(4));
//!
//! // Nothing is written unless every phase succeeds.
//! unit.build_and_write("program.ami")?;
//! ```

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use decaf_ast::Program;
use decaf_compiler::{Compiler, CompilerOptions, Listing};
use decaf_core::Diagnostics;
use log::{debug, info};

use crate::error::DecafError;

/// A program ready to be compiled.
#[derive(Debug, Clone)]
pub struct Unit {
    program: Program,
    options: CompilerOptions,
}

impl Unit {
    /// Create a unit from an already ingested program.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            options: CompilerOptions::default(),
        }
    }

    /// Ingest a JSON syntax tree.
    ///
    /// # Errors
    ///
    /// Returns [`DecafError::Ingest`] for malformed JSON or a tree whose
    /// shape does not match the node schema.
    pub fn from_json(text: &str) -> Result<Self, DecafError> {
        Ok(Self::new(decaf_ast::from_json(text)?))
    }

    /// Read and ingest a JSON syntax tree from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecafError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DecafError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile the program.
    ///
    /// # Errors
    ///
    /// Returns the diagnostics of the first phase that reported any.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&self) -> Result<Artifact, Diagnostics> {
        let compiler = Compiler::new(self.options.clone());
        let listing = compiler.compile(&self.program)?;
        debug!(
            "built {} classes into {} instructions",
            self.program.classes.len(),
            listing.len()
        );
        Ok(Artifact { listing })
    }

    /// Compile the program and write the artifact to `path`.
    ///
    /// The file is only created when compilation succeeds.
    pub fn build_and_write(&self, path: impl AsRef<Path>) -> Result<Artifact, DecafError> {
        let artifact = self.build()?;
        artifact.write_to(path)?;
        Ok(artifact)
    }
}

/// The output of a successful build.
#[derive(Debug, Clone)]
pub struct Artifact {
    listing: Listing,
}

impl Artifact {
    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    /// Write the listing as text.
    ///
    /// The text goes to a staging file beside `path`, which is renamed over
    /// `path` only once it is complete. On failure the staging file is
    /// removed and `path` is left as it was.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), DecafError> {
        let path = path.as_ref();
        let staging = staging_path(path);
        let written = self
            .write_listing(&staging)
            .and_then(|()| fs::rename(&staging, path));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&staging) {
                debug!("could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(DecafError::io(path, err));
        }
        info!("wrote {} instructions to {}", self.listing.len(), path.display());
        Ok(())
    }

    fn write_listing(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.listing.write_to(&mut out)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()
    }
}

/// `<dir>/<name>.<pid>.tmp` for a target `<dir>/<name>`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.listing, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_ast::ProgramBuilder;

    fn hello() -> Program {
        let mut b = ProgramBuilder::new();
        let hello = b.string("hi");
        let print = b.print(hello);
        let body = b.block(vec![print]);
        let main = b.method("main", "void", &[], body).into_static();
        b.class("Main", None, vec![], vec![main]);
        b.finish()
    }

    #[test]
    fn build_produces_a_listing() {
        let artifact = Unit::new(hello()).build().unwrap();
        assert_eq!(artifact.listing().instructions()[0].to_string(), ".static_data 0");
        assert!(artifact.to_string().contains("M_4Main_main:\n"));
    }

    #[test]
    fn options_reach_the_code_generator() {
        let unit = Unit::new(hello()).with_options(CompilerOptions::new().with_entry_stub(false));
        assert!(!unit.options().emit_entry_stub);
        let text = unit.build().unwrap().to_string();
        assert!(!text.contains("__start"));
    }

    #[test]
    fn malformed_json_is_an_ingest_error() {
        let err = Unit::from_json("{\"classes\": 3}").unwrap_err();
        assert!(matches!(err, DecafError::Ingest(_)));
    }

    #[test]
    fn write_replaces_the_target_without_leftovers() {
        let path = std::env::temp_dir()
            .join(format!("decaf-unit-{}-replace.ami", std::process::id()));
        fs::write(&path, "stale").unwrap();
        let artifact = Unit::new(hello()).build().unwrap();
        artifact.write_to(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), artifact.to_string());
        assert!(!staging_path(&path).exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        // A directory cannot be replaced by a file, so the final rename fails.
        let dir = std::env::temp_dir().join(format!("decaf-unit-{}-dir", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let artifact = Unit::new(hello()).build().unwrap();
        let err = artifact.write_to(&dir).unwrap_err();
        assert!(matches!(err, DecafError::Io { .. }));
        assert!(dir.is_dir());
        assert!(!staging_path(&dir).exists());
        fs::remove_dir(&dir).unwrap();
    }

    #[test]
    fn missing_input_file_is_an_io_error() {
        let err = Unit::from_path("/nonexistent/decaf/input.json").unwrap_err();
        assert!(matches!(err, DecafError::Io { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
