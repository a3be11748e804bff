//! Runs the requested stages over every input and decides whether to link.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use bitc::{
    codegen::mangle::demangle,
    compile_unit,
    error::{Category, Diagnostics, Error},
    lexer,
    options::Options,
    parser,
    token::Span,
    util::fmt::{error::report, tree},
};

use crate::{
    cli::{Cli, Stage},
    toolchain::{TempPaths, ToolError, Toolchain},
};

/// Runs `cli` to completion. Per-unit failures are reported to `diag` and
/// recorded in the returned tally; only writing to `out` or the final link
/// step fail the whole run.
pub fn run(
    cli: &Cli,
    out: &mut impl Write,
    diag: &mut impl Write,
) -> Result<Diagnostics, ToolError> {
    let mut diagnostics = Diagnostics::new();

    if let Some(symbol) = &cli.demangle {
        match demangle(symbol) {
            Some(signature) => writeln!(out, "{signature}"),
            None => writeln!(out, "{symbol}: not a bitc symbol"),
        }
        .map_err(ToolError::Output)?;
        return Ok(diagnostics);
    }

    let mut driver = Driver {
        options: cli.options(),
        stage: cli.stage,
        toolchain: Toolchain {
            cc: cli.cc.clone(),
            entry: cli.entry.clone(),
        },
        paths: TempPaths::new(
            cli.tmp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir)
                .join("bitc-"),
        ),
        objects: Vec::with_capacity(cli.inputs.len()),
    };

    for input in &cli.inputs {
        let _span = tracing::debug_span!("unit", path = %input.display()).entered();
        match driver.unit(input, out, diag, &mut diagnostics) {
            Ok(()) => {}
            Err(error @ ToolError::Output(_)) => return Err(error),
            Err(error) => {
                tracing::debug!(%error, "unit aborted");
                diagnostics.record(Category::Tool);
                writeln!(diag, "{}: {} error: {error}", input.display(), Category::Tool)
                    .map_err(ToolError::Output)?;
            }
        }
    }

    if driver.stage == Stage::Link {
        if diagnostics.may_link() {
            driver.toolchain.link(&driver.objects, &cli.output)?;
            tracing::debug!(objects = driver.objects.len(), "linked");
        } else {
            writeln!(
                diag,
                "bitc: not linking {}: {} error(s)",
                cli.output.display(),
                diagnostics.count().max(1)
            )
            .map_err(ToolError::Output)?;
        }
    }

    Ok(diagnostics)
}

struct Driver {
    options: Options,
    stage: Stage,
    toolchain: Toolchain,
    paths: TempPaths,
    objects: Vec<PathBuf>,
}

impl Driver {
    fn unit(
        &mut self,
        input: &Path,
        out: &mut impl Write,
        diag: &mut impl Write,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ToolError> {
        let src = fs::read_to_string(input).map_err(|source| ToolError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let path = input.display().to_string();

        match self.stage {
            Stage::Lex => {
                let tokens = match lexer::lex_in_new(&src) {
                    Ok(tokens) => tokens,
                    Err(_) => {
                        let errors = [Span::default().wrap(Error::EmptyInput)];
                        diagnostics.record_all(&errors);
                        return report(diag, &path, &src, &errors).map_err(ToolError::Output);
                    }
                };
                for token in &tokens {
                    writeln!(out, "{token:?}").map_err(ToolError::Output)?;
                }
            }
            Stage::Parse => {
                let mut tokens = Vec::new();
                let (unit, errors) = match parser::parse_unit(&src, &mut tokens, &self.options) {
                    Ok(unit) => (unit, Vec::new()),
                    Err((unit, errors)) => (unit, errors),
                };
                tree::print_unit(out, &unit).map_err(ToolError::Output)?;
                diagnostics.record_all(&errors);
                report(diag, &path, &src, &errors).map_err(ToolError::Output)?;
            }
            Stage::C | Stage::Obj | Stage::Link => {
                let compiled = match compile_unit(&src, &self.options) {
                    Ok(compiled) => compiled,
                    Err(errors) => {
                        diagnostics.record_all(&errors);
                        return report(diag, &path, &src, &errors).map_err(ToolError::Output);
                    }
                };
                diagnostics.record_all(&compiled.errors);
                report(diag, &path, &src, &compiled.errors).map_err(ToolError::Output)?;

                if self.stage == Stage::C {
                    return out
                        .write_all(compiled.c_source.as_bytes())
                        .map_err(ToolError::Output);
                }
                if !compiled.errors.is_empty() {
                    tracing::debug!("skipping object, unit has errors");
                    return Ok(());
                }
                let object = self.object(&compiled.c_source)?;
                if self.stage == Stage::Obj {
                    writeln!(out, "{}", object.display()).map_err(ToolError::Output)?;
                }
                self.objects.push(object);
            }
        }
        Ok(())
    }

    /// Writes the C source to a fresh temporary file and compiles it.
    fn object(&mut self, c_source: &str) -> Result<PathBuf, ToolError> {
        let mut reserved = self.paths.reserve()?;
        reserved
            .file
            .write_all(c_source.as_bytes())
            .and_then(|()| reserved.file.flush())
            .map_err(|source| ToolError::Write {
                path: reserved.c.clone(),
                source,
            })?;
        drop(reserved.file);
        self.toolchain.compile(&reserved.c, &reserved.o)?;
        Ok(reserved.o)
    }
}
