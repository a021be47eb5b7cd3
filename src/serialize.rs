use crate::entity::{Entity, TargetAttrs};
use crate::graph::EntityGraph;
use serde_json::{json, Map, Value};

/// Builds the `targets[]` entry for one entity. Pure: the same entity state
/// always yields the same value, keys in the same order.
pub fn serialize_target(entity: &Entity, layer_order: usize) -> Value {
    let costumes = entity
        .costumes()
        .iter()
        .map(|costume| costume.to_json())
        .collect::<Vec<_>>();
    let target = json!({
        "isStage": entity.is_stage(),
        "name": entity.name(),
        "variables": {},
        "lists": {},
        "broadcasts": {},
        "blocks": serialize_blocks(entity.graph()),
        "comments": {},
        "currentCostume": entity.current_costume(),
        "costumes": costumes,
        "sounds": [],
        "volume": entity.volume(),
        "layerOrder": layer_order
    });
    let extra = match entity.attrs() {
        TargetAttrs::Stage(stage) => json!({
            "tempo": stage.tempo,
            "videoTransparency": stage.video_transparency,
            "videoState": stage.video_state,
            "textToSpeechLanguage": stage.text_to_speech_language
        }),
        TargetAttrs::Sprite(sprite) => json!({
            "visible": sprite.visible,
            "x": sprite.x,
            "y": sprite.y,
            "size": sprite.size,
            "direction": sprite.direction,
            "draggable": sprite.draggable,
            "rotationStyle": sprite.rotation_style.as_str()
        }),
    };
    merge_object(target, extra)
}

/// `blocks` object keyed by id string, in ascending id order.
pub fn serialize_blocks(graph: &EntityGraph) -> Value {
    let dialect = graph.dialect();
    let mut blocks = Map::new();
    for record in graph.blocks() {
        blocks.insert(record.id.to_string(), record.to_json(dialect));
    }
    Value::Object(blocks)
}

fn merge_object(mut dst: Value, add: Value) -> Value {
    if let (Value::Object(dst_obj), Value::Object(add_obj)) = (&mut dst, add) {
        dst_obj.extend(add_obj);
    }
    dst
}
