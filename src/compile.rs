use crate::ast::{Command, CostumeDecl, Script, Target};
use crate::block::Op;
use crate::codec::{optimize_bitmap, ImageCodec};
use crate::costume::AssetFormat;
use crate::entity::Entity;
use crate::graph::ScriptBody;
use crate::project::{CompileOptions, Project};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Lowers a parsed script into a project. Costume paths resolve against
/// `source_dir`; bitmaps go through `codec` when compression is enabled.
pub fn compile_script(
    script: &Script,
    name: &str,
    source_dir: &Path,
    options: CompileOptions,
    codec: &dyn ImageCodec,
) -> Result<Project> {
    let mut project = Project::with_options(name, options);
    let mut stage_seen = false;
    let mut sprite_names = HashSet::new();
    for target in &script.targets {
        if target.is_stage {
            if stage_seen {
                bail!(
                    "Only one stage may be declared (line {}, column {}).",
                    target.pos.line,
                    target.pos.column
                );
            }
            stage_seen = true;
            lower_target(&mut project, None, target, source_dir, codec)?;
        } else {
            if !sprite_names.insert(target.name.to_lowercase()) {
                bail!(
                    "Duplicate sprite name '{}' (line {}, column {}).",
                    target.name,
                    target.pos.line,
                    target.pos.column
                );
            }
            let sprite = project.new_sprite(target.name.clone());
            lower_target(&mut project, Some(sprite), target, source_dir, codec)?;
        }
    }
    project.ensure_default_costumes()?;
    Ok(project)
}

fn lower_target(
    project: &mut Project,
    sprite: Option<Entity>,
    target: &Target,
    source_dir: &Path,
    codec: &dyn ImageCodec,
) -> Result<()> {
    let settings = project.options().settings;
    let mut add_to_project = None;
    let entity = match sprite {
        Some(sprite) => add_to_project.insert(sprite),
        None => project.stage_mut(),
    };
    for decl in &target.costumes {
        load_costume(entity, decl, source_dir, codec, &settings)
            .with_context(|| format!("Failed to load costume for '{}'.", target.name))?;
    }
    for command in &target.commands {
        lower_command(entity, command);
    }
    if let Some(sprite) = add_to_project {
        project.add_sprite(sprite)?;
    }
    Ok(())
}

fn lower_command(entity: &mut Entity, command: &Command) {
    match command {
        Command::WhenFlagClicked { body, .. } => {
            let body = body.iter().filter_map(command_op).collect::<ScriptBody>();
            entity.when_flag_clicked(body);
        }
        other => {
            if let Some(op) = command_op(other) {
                entity.graph_mut().emit(op);
            }
        }
    }
}

/// Stack command for a non-event command; the parser never nests events.
fn command_op(command: &Command) -> Option<Op> {
    match command {
        Command::Move { steps, .. } => Some(Op::MoveSteps(*steps)),
        Command::TurnRight { degrees, .. } => Some(Op::TurnRight(*degrees)),
        Command::Say { message, .. } => Some(Op::Say(message.clone())),
        Command::Show { .. } => Some(Op::Show),
        Command::WhenFlagClicked { .. } => None,
    }
}

fn load_costume(
    entity: &mut Entity,
    decl: &CostumeDecl,
    source_dir: &Path,
    codec: &dyn ImageCodec,
    settings: &crate::project::ProjectSettings,
) -> Result<()> {
    let path = source_dir.join(&decl.path);
    if !path.is_file() {
        bail!(
            "Costume file not found: '{}' resolved to '{}' (line {}, column {}).",
            decl.path,
            path.display(),
            decl.pos.line,
            decl.pos.column
        );
    }
    let ext = path.extension().and_then(|x| x.to_str()).unwrap_or("");
    let format = AssetFormat::from_extension(ext).ok_or_else(|| {
        anyhow!(
            "Unsupported costume format '.{}' for '{}'. Only .svg, .png and .jpg are supported.",
            ext,
            path.display()
        )
    })?;
    let data = fs::read(&path).with_context(|| format!("Failed to read '{}'.", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("costume")
        .to_string();
    let optimized = optimize_bitmap(codec, data, format, settings);
    entity.add_costume(&name, optimized.data, optimized.format, None)?;
    Ok(())
}
