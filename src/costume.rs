use crate::error::{CompileError, CompileResult};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::Cursor;
use xmltree::Element;

pub const DEFAULT_COSTUME_SVG: &str =
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1" viewBox="0 0 1 1"></svg>"##;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    Svg,
    Png,
    Jpg,
}

impl AssetFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }

    pub fn is_bitmap(self) -> bool {
        !matches!(self, Self::Svg)
    }
}

/// A costume entry as it appears in a target's `costumes` array.
#[derive(Debug, Clone, PartialEq)]
pub struct Costume {
    pub name: String,
    pub asset_id: String,
    pub md5ext: String,
    pub format: AssetFormat,
    pub rotation_center_x: f64,
    pub rotation_center_y: f64,
}

impl Costume {
    /// Hashes `data` and builds the matching entry. The asset bytes are stored
    /// under `md5ext` by the caller.
    pub fn from_data(name: impl Into<String>, data: &[u8], format: AssetFormat, center: (f64, f64)) -> Self {
        let digest = format!("{:x}", md5::compute(data));
        let md5ext = format!("{}.{}", digest, format.extension());
        Self {
            name: name.into(),
            asset_id: digest,
            md5ext,
            format,
            rotation_center_x: center.0,
            rotation_center_y: center.1,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut entry = json!({
            "name": self.name,
            "assetId": self.asset_id,
            "md5ext": self.md5ext,
            "dataFormat": self.format.extension(),
            "rotationCenterX": self.rotation_center_x,
            "rotationCenterY": self.rotation_center_y
        });
        if self.format.is_bitmap() {
            if let Value::Object(obj) = &mut entry {
                obj.insert("bitmapResolution".to_string(), json!(1));
            }
        }
        entry
    }
}

/// Default rotation center: the middle of the drawing.
pub fn rotation_center(name: &str, data: &[u8], format: AssetFormat) -> CompileResult<(f64, f64)> {
    match format {
        AssetFormat::Svg => {
            let (width, height) = svg_size(name, data)?;
            Ok((width / 2.0, height / 2.0))
        }
        AssetFormat::Png | AssetFormat::Jpg => {
            let image = image::load_from_memory(data).map_err(|e| CompileError::InvalidCostume {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            Ok((f64::from(image.width()) / 2.0, f64::from(image.height()) / 2.0))
        }
    }
}

fn svg_size(name: &str, data: &[u8]) -> CompileResult<(f64, f64)> {
    let root = Element::parse(Cursor::new(data)).map_err(|e| CompileError::InvalidCostume {
        name: name.to_string(),
        reason: format!("invalid SVG: {}", e),
    })?;
    if let Some(view_box) = root.attributes.get("viewBox") {
        let parts = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CompileError::InvalidCostume {
                name: name.to_string(),
                reason: format!("invalid SVG viewBox '{}'", view_box),
            })?;
        if let [_, _, width, height] = parts[..] {
            if width <= 0.0 || height <= 0.0 {
                return Err(CompileError::InvalidCostume {
                    name: name.to_string(),
                    reason: "SVG viewBox must have positive width/height".to_string(),
                });
            }
            return Ok((width, height));
        }
    }
    let width = parse_svg_length(root.attributes.get("width").map(String::as_str));
    let height = parse_svg_length(root.attributes.get("height").map(String::as_str));
    match (width, height) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Ok((0.0, 0.0)),
    }
}

/// Leading number of an SVG length such as `"48px"`; only positive values count.
fn parse_svg_length(value: Option<&str>) -> Option<f64> {
    let s = value?.trim();
    let end = s
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.' || *ch == '+' || *ch == '-'))
        .map(|(idx, _)| idx)
        .unwrap_or(s.len());
    let n = s[..end].parse::<f64>().ok()?;
    (n > 0.0).then_some(n)
}

pub fn uniquify_costume_name(base: &str, used: &mut HashSet<String>) -> String {
    let trimmed = base.trim();
    let base_name = if trimmed.is_empty() { "costume" } else { trimmed };
    let mut candidate = base_name.to_string();
    let mut suffix = 2usize;
    while !used.insert(candidate.to_lowercase()) {
        candidate = format!("{} {}", base_name, suffix);
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5ext_is_digest_plus_extension() {
        let costume = Costume::from_data("cat", b"<svg/>", AssetFormat::Svg, (1.0, 2.0));
        assert_eq!(costume.asset_id.len(), 32);
        assert_eq!(costume.md5ext, format!("{}.svg", costume.asset_id));
    }

    #[test]
    fn only_bitmaps_carry_bitmap_resolution() {
        let svg = Costume::from_data("a", b"x", AssetFormat::Svg, (0.0, 0.0)).to_json();
        assert!(svg.get("bitmapResolution").is_none());
        let png = Costume::from_data("b", b"x", AssetFormat::Png, (0.0, 0.0)).to_json();
        assert_eq!(png["bitmapResolution"], json!(1));
        assert_eq!(png["dataFormat"], json!("png"));
    }

    #[test]
    fn svg_center_prefers_view_box() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 48 34"></svg>"#;
        assert_eq!(rotation_center("cat", svg, AssetFormat::Svg).unwrap(), (24.0, 17.0));
    }

    #[test]
    fn svg_center_falls_back_to_width_and_height() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="40px" height="20px"></svg>"#;
        assert_eq!(rotation_center("cat", svg, AssetFormat::Svg).unwrap(), (20.0, 10.0));
    }

    #[test]
    fn invalid_svg_is_rejected() {
        let err = rotation_center("broken", b"not xml", AssetFormat::Svg).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn costume_names_are_uniquified_case_insensitively() {
        let mut used = HashSet::new();
        assert_eq!(uniquify_costume_name("Cat", &mut used), "Cat");
        assert_eq!(uniquify_costume_name("cat", &mut used), "cat 2");
        assert_eq!(uniquify_costume_name("  ", &mut used), "costume");
    }
}
