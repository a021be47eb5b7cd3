use crate::block::{BlockId, Dialect, Hat, Op};
use crate::costume::{rotation_center, uniquify_costume_name, AssetFormat, Costume, DEFAULT_COSTUME_SVG};
use crate::error::CompileResult;
use crate::graph::{ChainPolicy, EntityGraph, ScriptBody};
use std::collections::{BTreeMap, HashSet};

pub const STAGE_NAME: &str = "Stage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStyle {
    #[default]
    AllAround,
    LeftRight,
    DontRotate,
}

impl RotationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationStyle::AllAround => "all around",
            RotationStyle::LeftRight => "left-right",
            RotationStyle::DontRotate => "don't rotate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAttrs {
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub direction: f64,
    pub draggable: bool,
    pub rotation_style: RotationStyle,
}

impl Default for SpriteAttrs {
    fn default() -> Self {
        Self {
            visible: true,
            x: 0.0,
            y: 0.0,
            size: 100.0,
            direction: 90.0,
            draggable: false,
            rotation_style: RotationStyle::AllAround,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageAttrs {
    pub tempo: u32,
    pub video_transparency: u32,
    pub video_state: String,
    pub text_to_speech_language: Option<String>,
}

impl Default for StageAttrs {
    fn default() -> Self {
        Self {
            tempo: 60,
            video_transparency: 50,
            video_state: "on".to_string(),
            text_to_speech_language: None,
        }
    }
}

/// Kind tag for an entity; the attribute set differs per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetAttrs {
    Stage(StageAttrs),
    Sprite(SpriteAttrs),
}

/// A sprite or the stage: its block graph plus display metadata and costumes.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    attrs: TargetAttrs,
    graph: EntityGraph,
    volume: u32,
    current_costume: usize,
    costumes: Vec<Costume>,
    costume_names: HashSet<String>,
    assets: BTreeMap<String, Vec<u8>>,
}

impl Entity {
    pub fn sprite(name: impl Into<String>, dialect: Dialect, chain: ChainPolicy) -> Self {
        Self::with_attrs(name.into(), TargetAttrs::Sprite(SpriteAttrs::default()), dialect, chain)
    }

    pub fn stage(dialect: Dialect, chain: ChainPolicy) -> Self {
        Self::with_attrs(
            STAGE_NAME.to_string(),
            TargetAttrs::Stage(StageAttrs::default()),
            dialect,
            chain,
        )
    }

    fn with_attrs(name: String, attrs: TargetAttrs, dialect: Dialect, chain: ChainPolicy) -> Self {
        Self {
            name,
            attrs,
            graph: EntityGraph::new(dialect, chain),
            volume: 100,
            current_costume: 0,
            costumes: Vec::new(),
            costume_names: HashSet::new(),
            assets: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stage(&self) -> bool {
        matches!(self.attrs, TargetAttrs::Stage(_))
    }

    pub fn attrs(&self) -> &TargetAttrs {
        &self.attrs
    }

    pub fn sprite_attrs_mut(&mut self) -> Option<&mut SpriteAttrs> {
        match &mut self.attrs {
            TargetAttrs::Sprite(attrs) => Some(attrs),
            TargetAttrs::Stage(_) => None,
        }
    }

    pub fn stage_attrs_mut(&mut self) -> Option<&mut StageAttrs> {
        match &mut self.attrs {
            TargetAttrs::Stage(attrs) => Some(attrs),
            TargetAttrs::Sprite(_) => None,
        }
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    /// Volume is a percentage; larger values are capped at 100.
    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume.min(100);
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    pub fn move_steps(&mut self, steps: f64) -> BlockId {
        self.graph.emit(Op::MoveSteps(steps))
    }

    pub fn turn_right(&mut self, degrees: f64) -> BlockId {
        self.graph.emit(Op::TurnRight(degrees))
    }

    pub fn say(&mut self, message: impl Into<String>) -> BlockId {
        self.graph.emit(Op::Say(message.into()))
    }

    pub fn show(&mut self) -> BlockId {
        self.graph.emit(Op::Show)
    }

    pub fn when_flag_clicked(&mut self, body: ScriptBody) -> BlockId {
        self.graph.emit_with_body(Hat::WhenFlagClicked, body)
    }

    /// Registers a costume and its asset bytes. A missing rotation center
    /// defaults to the middle of the drawing.
    pub fn add_costume(
        &mut self,
        name: &str,
        data: Vec<u8>,
        format: AssetFormat,
        center: Option<(f64, f64)>,
    ) -> CompileResult<&Costume> {
        let center = match center {
            Some(center) => center,
            None => rotation_center(name, &data, format)?,
        };
        let unique = uniquify_costume_name(name, &mut self.costume_names);
        let costume = Costume::from_data(unique, &data, format, center);
        tracing::debug!(target_name = %self.name, costume = %costume.name, md5ext = %costume.md5ext, "added costume");
        self.assets.insert(costume.md5ext.clone(), data);
        self.costumes.push(costume);
        Ok(&self.costumes[self.costumes.len() - 1])
    }

    /// A target without costumes does not load, so give it a blank one.
    pub fn ensure_default_costume(&mut self) -> CompileResult<()> {
        if !self.costumes.is_empty() {
            return Ok(());
        }
        let name = if self.is_stage() { "backdrop1" } else { "costume1" };
        self.add_costume(name, DEFAULT_COSTUME_SVG.as_bytes().to_vec(), AssetFormat::Svg, None)?;
        Ok(())
    }

    pub fn costumes(&self) -> &[Costume] {
        &self.costumes
    }

    pub fn current_costume(&self) -> usize {
        self.current_costume
    }

    pub fn set_current_costume(&mut self, index: usize) {
        self.current_costume = index.min(self.costumes.len().saturating_sub(1));
    }

    pub fn assets(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.assets
    }
}
