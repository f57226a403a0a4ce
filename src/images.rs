//! Entity image URLs
//!
//! Profiles reference images by relative path (or occasionally by absolute
//! URL) in one or more fields. Relative paths resolve against the image base
//! URL as `{image_base}/{kind.image_path}/{path}`.

use rustc_hash::FxHashSet;
use serde_json::Value;
use std::sync::Arc;

use crate::context::SharedContext;
use crate::kinds::EntityKind;
use crate::model::EntityProfile;

pub struct ImageResolver {
    context: Arc<SharedContext>,
}

impl ImageResolver {
    pub fn new(context: Arc<SharedContext>) -> Self {
        Self { context }
    }

    /// Image URLs for a profile, first-seen order, no duplicates. Empty when
    /// no image base URL is configured.
    pub fn profile_images(&self, kind: &EntityKind, profile: &EntityProfile) -> Vec<String> {
        let Some(base) = self.context.image_base_url() else {
            return Vec::new();
        };

        let mut seen = FxHashSet::default();
        kind.image_fields
            .iter()
            .filter_map(|field| profile.property(field))
            .flat_map(image_paths)
            .map(|path| resolve(base, &kind.image_path, &path))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

fn image_paths(value: &Value) -> Vec<String> {
    match value {
        Value::String(path) if !path.trim().is_empty() => vec![path.trim().to_string()],
        Value::Array(items) => items.iter().flat_map(image_paths).collect(),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("path"))
            .map(image_paths)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn resolve(base: &str, kind_path: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let path = path.trim_start_matches('/');
    if kind_path.is_empty() || path.starts_with(&format!("{}/", kind_path)) {
        format!("{}/{}", base, path)
    } else {
        format!("{}/{}/{}", base, kind_path, path)
    }
}
