use crate::block::Dialect;
use crate::entity::{Entity, STAGE_NAME};
use crate::error::{CompileError, CompileResult};
use crate::graph::ChainPolicy;
use crate::serialize::serialize_target;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const PROJECT_SEMVER: &str = "3.0.0";
pub const PROJECT_VM: &str = "0.2.0";
pub const DEFAULT_AGENT: &str = "DBH Compiler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectSettings {
    pub compress_images: bool,
    pub quality: u8,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            compress_images: true,
            quality: 85,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub dialect: Dialect,
    pub chain: ChainPolicy,
    pub settings: ProjectSettings,
    pub agent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            chain: ChainPolicy::default(),
            settings: ProjectSettings::default(),
            agent: DEFAULT_AGENT.to_string(),
        }
    }
}

/// An owned snapshot of `project.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDocument(Value);

impl ProjectDocument {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn targets(&self) -> &[Value] {
        self.0
            .get("targets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The exact bytes stored on disk, in both plain and archive packages.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.0)
    }
}

/// One stage, ordered sprites, global metadata.
#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    options: CompileOptions,
    stage: Entity,
    sprites: Vec<Entity>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, CompileOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: CompileOptions) -> Self {
        let stage = Entity::stage(options.dialect, options.chain);
        Self {
            name: name.into(),
            options,
            stage,
            sprites: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// A fresh sprite that uses this project's dialect and chain policy.
    pub fn new_sprite(&self, name: impl Into<String>) -> Entity {
        Entity::sprite(name, self.options.dialect, self.options.chain)
    }

    pub fn stage(&self) -> &Entity {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Entity {
        &mut self.stage
    }

    pub fn sprites(&self) -> &[Entity] {
        &self.sprites
    }

    pub fn sprites_mut(&mut self) -> &mut [Entity] {
        &mut self.sprites
    }

    pub fn add_sprite(&mut self, sprite: Entity) -> CompileResult<()> {
        if sprite.is_stage() {
            return Err(CompileError::StageAsSprite(sprite.name().to_string()));
        }
        let name = sprite.name().trim();
        if name.is_empty() {
            return Err(CompileError::EmptySpriteName);
        }
        if name.eq_ignore_ascii_case(STAGE_NAME)
            || self
                .sprites
                .iter()
                .any(|existing| existing.name().trim().eq_ignore_ascii_case(name))
        {
            return Err(CompileError::DuplicateSprite(name.to_string()));
        }
        let found = sprite.graph().dialect();
        if found != self.options.dialect {
            return Err(CompileError::DialectMismatch {
                name: name.to_string(),
                expected: self.options.dialect.label(),
                found: found.label(),
            });
        }
        tracing::debug!(sprite = %name, blocks = sprite.graph().len(), layer = self.sprites.len() + 1, "added sprite");
        self.sprites.push(sprite);
        Ok(())
    }

    /// Gives every target without costumes a blank default one.
    pub fn ensure_default_costumes(&mut self) -> CompileResult<()> {
        self.stage.ensure_default_costume()?;
        for sprite in &mut self.sprites {
            sprite.ensure_default_costume()?;
        }
        Ok(())
    }

    pub fn build(&self) -> ProjectDocument {
        let mut targets = Vec::with_capacity(self.sprites.len() + 1);
        targets.push(serialize_target(&self.stage, 0));
        for (index, sprite) in self.sprites.iter().enumerate() {
            targets.push(serialize_target(sprite, index + 1));
        }
        ProjectDocument(json!({
            "targets": targets,
            "monitors": [],
            "extensions": [],
            "meta": {
                "semver": PROJECT_SEMVER,
                "vm": PROJECT_VM,
                "agent": self.options.agent
            }
        }))
    }

    /// Asset bytes of every target, keyed and sorted by `md5ext`.
    pub fn assets(&self) -> BTreeMap<String, Vec<u8>> {
        let mut out = BTreeMap::new();
        for entity in std::iter::once(&self.stage).chain(self.sprites.iter()) {
            for (name, bytes) in entity.assets() {
                out.entry(name.clone()).or_insert_with(|| bytes.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ScriptBody;

    #[test]
    fn empty_project_has_only_the_stage() {
        let doc = Project::new("empty").build();
        assert_eq!(doc.targets().len(), 1);
        assert_eq!(doc.targets()[0]["isStage"], json!(true));
        assert_eq!(doc.targets()[0]["blocks"], json!({}));
        let value = doc.as_value();
        assert_eq!(value["monitors"], json!([]));
        assert_eq!(value["extensions"], json!([]));
        assert_eq!(value["meta"]["semver"], json!("3.0.0"));
        assert_eq!(value["meta"]["vm"], json!("0.2.0"));
        assert_eq!(value["meta"]["agent"], json!("DBH Compiler"));
    }

    #[test]
    fn sprites_keep_insertion_order_and_layers() {
        let mut project = Project::new("layers");
        for name in ["Cat", "Dog", "Bird"] {
            let sprite = project.new_sprite(name);
            project.add_sprite(sprite).unwrap();
        }
        let doc = project.build();
        let names = doc
            .targets()
            .iter()
            .map(|t| (t["name"].as_str().unwrap().to_string(), t["layerOrder"].as_u64().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                ("Stage".to_string(), 0),
                ("Cat".to_string(), 1),
                ("Dog".to_string(), 2),
                ("Bird".to_string(), 3)
            ]
        );
    }

    #[test]
    fn built_document_is_a_snapshot() {
        let mut project = Project::new("snap");
        let mut cat = project.new_sprite("Cat");
        cat.show();
        project.add_sprite(cat).unwrap();
        let before = project.build();
        project.sprites_mut()[0].say("later");
        project.stage_mut().when_flag_clicked(ScriptBody::new().show());
        assert_eq!(before.targets()[1]["blocks"].as_object().unwrap().len(), 1);
        assert_eq!(before.targets()[0]["blocks"], json!({}));
        assert_ne!(before, project.build());
    }

    #[test]
    fn huge_step_counts_survive_the_build() {
        let mut project = Project::new("big");
        let mut cat = project.new_sprite("Cat");
        cat.move_steps(1e20);
        project.add_sprite(cat).unwrap();
        let doc = project.build();
        assert_eq!(
            doc.targets()[1]["blocks"]["1"]["inputs"]["STEPS"],
            json!([1, [4, "100000000000000000000"]])
        );
    }

    #[test]
    fn add_sprite_rejects_bad_input() {
        let mut project = Project::new("bad");
        let cat = project.new_sprite("Cat");
        project.add_sprite(cat).unwrap();

        let dup = project.new_sprite("cat");
        assert!(matches!(project.add_sprite(dup), Err(CompileError::DuplicateSprite(_))));
        let blank = project.new_sprite("  ");
        assert!(matches!(project.add_sprite(blank), Err(CompileError::EmptySpriteName)));
        let stage = Entity::stage(Dialect::TypedTuple, ChainPolicy::Independent);
        assert!(matches!(project.add_sprite(stage), Err(CompileError::StageAsSprite(_))));
        let named = Entity::sprite("Dog", Dialect::NamedField, ChainPolicy::Independent);
        assert!(matches!(
            project.add_sprite(named),
            Err(CompileError::DialectMismatch { .. })
        ));
        assert_eq!(project.sprites().len(), 1);
    }

    #[test]
    fn assets_are_collected_once_per_md5ext() {
        let mut project = Project::new("assets");
        for name in ["A", "B"] {
            let sprite = project.new_sprite(name);
            project.add_sprite(sprite).unwrap();
        }
        project.ensure_default_costumes().unwrap();
        assert_eq!(project.assets().len(), 1);
        let doc = project.build();
        let md5ext = doc.targets()[2]["costumes"][0]["md5ext"].as_str().unwrap();
        assert!(project.assets().contains_key(md5ext));
    }
}
