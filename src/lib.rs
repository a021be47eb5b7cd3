pub mod ast;
pub mod block;
pub mod codec;
pub mod compile;
pub mod costume;
pub mod entity;
pub mod error;
pub mod graph;
pub mod lexer;
pub mod package;
pub mod parser;
pub mod project;
pub mod serialize;

pub mod cli;

use anyhow::{Context, Result};
use codec::ImageCrateCodec;
use lexer::Lexer;
use package::{read_package, write_package, PackageMode};
use parser::Parser as ScriptParser;
use project::{CompileOptions, Project, ProjectSettings};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub use block::{BlockId, Dialect, Hat, Literal, Op};
pub use entity::Entity;
pub use error::{CompileError, PackageError};
pub use graph::{ChainPolicy, EntityGraph, ScriptBody};
pub use project::ProjectDocument;

pub fn run_cli(args: &cli::Args) -> Result<()> {
    if args.inspect {
        let input = canonicalize_file(&args.input)?;
        return inspect_package(&input);
    }

    let total_stages = 3 + usize::from(args.output.is_some());
    let progress = CliProgress::new("Compile", total_stages);
    let mut stage = 0usize;

    stage += 1;
    progress.emit(stage, "Resolving input path");
    let input = canonicalize_file(&args.input)?;
    let source = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read '{}'.", input.display()))?;

    stage += 1;
    progress.emit(stage, "Lexing and parsing");
    let script = parse_source(&source)?;

    stage += 1;
    progress.emit(stage, "Building block graphs");
    let options = CompileOptions {
        dialect: args.dialect.into(),
        chain: args.chain.into(),
        settings: ProjectSettings {
            compress_images: !args.no_compress,
            quality: args.quality,
        },
        ..CompileOptions::default()
    };
    let name = args.name.clone().unwrap_or_else(|| {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("project")
            .to_string()
    });
    let source_dir = input.parent().unwrap_or(input.as_path());
    let project = compile::compile_script(&script, &name, source_dir, options, &ImageCrateCodec)?;

    if let Some(output) = &args.output {
        stage += 1;
        let mode = if args.json {
            progress.emit(stage, "Writing project.json");
            PackageMode::Json
        } else {
            progress.emit(stage, "Writing .sb3 archive");
            PackageMode::Archive
        };
        write_project(&project, output, mode)?;
    }

    Ok(())
}

pub fn parse_source(source: &str) -> Result<ast::Script> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize().map_err(|e| anyhow::anyhow!("Lex error: {}", e))?;
    let mut parser = ScriptParser::new(tokens);
    let script = parser
        .parse_script()
        .map_err(|e| anyhow::anyhow!("Parse error: {}", e))?;
    Ok(script)
}

/// Compiles script text into a project; costume paths resolve against `source_dir`.
pub fn compile_source(source: &str, source_dir: &Path, options: CompileOptions) -> Result<Project> {
    let script = parse_source(source)?;
    compile::compile_script(&script, "project", source_dir, options, &ImageCrateCodec)
}

pub fn write_project(project: &Project, output: &Path, mode: PackageMode) -> Result<()> {
    let document = project.build();
    let assets = match mode {
        PackageMode::Json => Default::default(),
        PackageMode::Archive => project.assets(),
    };
    write_package(&document, &assets, output, mode)
        .with_context(|| format!("Failed to write '{}'.", output.display()))?;
    tracing::info!(
        project = project.name(),
        sprites = project.sprites().len(),
        path = %pretty_path(output),
        "project written"
    );
    Ok(())
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
}

fn inspect_package(path: &Path) -> Result<()> {
    let (document, assets) = read_package(path)?;
    let agent = document
        .pointer("/meta/agent")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    println!("{} (agent: {})", pretty_path(path), agent);
    let targets = document
        .get("targets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for target in targets {
        let name = target.get("name").and_then(Value::as_str).unwrap_or("?");
        let kind = if target.get("isStage").and_then(Value::as_bool) == Some(true) {
            "stage"
        } else {
            "sprite"
        };
        let blocks = target
            .get("blocks")
            .and_then(Value::as_object)
            .map_or(0, |b| b.len());
        let costumes = target
            .get("costumes")
            .and_then(Value::as_array)
            .map_or(0, |c| c.len());
        println!("  {} '{}': {} blocks, {} costumes", kind, name, blocks, costumes);
    }
    println!("  {} assets", assets.len());
    Ok(())
}

fn pretty_path(path: &Path) -> String {
    let raw = path.display().to_string();
    if let Some(stripped) = raw.strip_prefix(r"\\?\") {
        stripped.to_string()
    } else {
        raw
    }
}

struct CliProgress {
    prefix: &'static str,
    total: usize,
}

impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            total: total.max(1),
        }
    }

    fn emit(&self, step: usize, label: &str) {
        let step = step.clamp(1, self.total);
        let bar = render_progress_bar(step, self.total, 14);
        eprintln!("[{}] {}... ({}/{}) {}", self.prefix, label, step, self.total, bar);
    }
}

fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < filled { '=' } else { '-' });
    }
    s.push(']');
    s
}
