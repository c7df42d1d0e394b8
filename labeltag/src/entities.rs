// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Catalog of entity types a label mapping can target.
//!
//! Keys are the strings collectors pass when they report labels, so different
//! providers must use disjoint keys. The null key is the legacy namespace that
//! predates per-entity mappings; its categories keep the `kubernetes::` prefix.

use std::error::Error;
use std::fmt;

pub const ALL_ENTITIES: &str = "_all_entities_";
pub const ALL_ENTITIES_LABEL: &str = "All Entities";
pub const DEFAULT_ENTITY_LABEL: &str = "<All>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappableEntity {
    pub key: Option<&'static str>,
    pub prefix: Option<&'static str>,
    pub model: Option<&'static str>,
}

impl MappableEntity {
    pub fn is_all_entities(&self) -> bool {
        self.key == Some(ALL_ENTITIES)
    }
}

const fn entity(
    key: Option<&'static str>,
    prefix: Option<&'static str>,
    model: Option<&'static str>,
) -> MappableEntity {
    MappableEntity { key, prefix, model }
}

pub static MAPPABLE_ENTITIES: &[MappableEntity] = &[
    entity(None, Some("kubernetes::"), None),
    entity(Some(ALL_ENTITIES), None, Some(ALL_ENTITIES_LABEL)),
    entity(
        Some("Vm"),
        Some("amazon:vm:"),
        Some("ManageIQ::Providers::Amazon::CloudManager::Vm"),
    ),
    entity(
        Some("VmOpenstack"),
        Some("openstack:vm:"),
        Some("ManageIQ::Providers::Openstack::CloudManager::Vm"),
    ),
    entity(
        Some("VmAzure"),
        Some("azure:vm:"),
        Some("ManageIQ::Providers::Azure::CloudManager::Vm"),
    ),
    entity(
        Some("Image"),
        Some("amazon:image:"),
        Some("ManageIQ::Providers::Amazon::CloudManager::Template"),
    ),
    entity(
        Some("ContainerProject"),
        Some("kubernetes:container_project:"),
        Some("ContainerProject"),
    ),
    entity(
        Some("ContainerRoute"),
        Some("kubernetes:container_route:"),
        Some("ContainerRoute"),
    ),
    entity(
        Some("ContainerNode"),
        Some("kubernetes:container_node:"),
        Some("ContainerNode"),
    ),
    entity(
        Some("ContainerReplicator"),
        Some("kubernetes:container_replicator:"),
        Some("ContainerReplicator"),
    ),
    entity(
        Some("ContainerService"),
        Some("kubernetes:container_service:"),
        Some("ContainerService"),
    ),
    entity(
        Some("ContainerGroup"),
        Some("kubernetes:container_group:"),
        Some("ContainerGroup"),
    ),
    entity(
        Some("ContainerBuild"),
        Some("kubernetes:container_build:"),
        Some("ContainerBuild"),
    ),
];

#[derive(Debug)]
pub struct EntityError {
    message: String,
}

impl EntityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for EntityError {}

pub fn lookup(key: Option<&str>) -> Result<&'static MappableEntity, EntityError> {
    MAPPABLE_ENTITIES
        .iter()
        .find(|entity| entity.key == key)
        .ok_or_else(|| {
            EntityError::new(format!(
                "Unknown entity type '{}'",
                key.unwrap_or_default()
            ))
        })
}

pub fn is_all_entities(key: Option<&str>) -> bool {
    key == Some(ALL_ENTITIES)
}

/// Translation and model-name resolution used for user-facing entity names.
pub trait DisplayNames: Send + Sync {
    fn translate(&self, text: &str) -> String;
    fn model_display_name(&self, model: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDisplayNames;

const MODEL_DISPLAY_NAMES: &[(&str, &str)] = &[
    (
        "ManageIQ::Providers::Amazon::CloudManager::Vm",
        "Instance (Amazon)",
    ),
    (
        "ManageIQ::Providers::Openstack::CloudManager::Vm",
        "Instance (OpenStack)",
    ),
    (
        "ManageIQ::Providers::Azure::CloudManager::Vm",
        "Instance (Azure)",
    ),
    (
        "ManageIQ::Providers::Amazon::CloudManager::Template",
        "Image (Amazon)",
    ),
    ("ContainerProject", "Container Project"),
    ("ContainerRoute", "Container Route"),
    ("ContainerNode", "Container Node"),
    ("ContainerReplicator", "Container Replicator"),
    ("ContainerService", "Container Service"),
    ("ContainerGroup", "Container Pod"),
    ("ContainerBuild", "Container Build"),
];

impl DisplayNames for BuiltinDisplayNames {
    fn translate(&self, text: &str) -> String {
        text.to_string()
    }

    fn model_display_name(&self, model: &str) -> String {
        if let Some((_, name)) = MODEL_DISPLAY_NAMES.iter().find(|(key, _)| *key == model) {
            return (*name).to_string();
        }
        let last = model.rsplit("::").next().unwrap_or(model);
        split_camel_case(last)
    }
}

fn split_camel_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    for (idx, ch) in value.chars().enumerate() {
        if idx > 0 && ch.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// User-facing name of an entity key, or of the legacy default when `key` is `None`.
pub fn display_name(key: Option<&str>, names: &dyn DisplayNames) -> String {
    let Some(key) = key else {
        return names.translate(DEFAULT_ENTITY_LABEL);
    };
    match lookup(Some(key)) {
        Ok(entity) if entity.is_all_entities() => names.translate(ALL_ENTITIES_LABEL),
        Ok(entity) => match entity.model {
            Some(model) => names.model_display_name(model),
            None => key.to_string(),
        },
        // Stored rows can outlive catalog entries; show the raw key.
        Err(_) => key.to_string(),
    }
}

/// `(display name, key)` pairs in catalog order, for selection controls.
pub fn entity_options(names: &dyn DisplayNames) -> Vec<(String, Option<String>)> {
    MAPPABLE_ENTITIES
        .iter()
        .map(|entity| {
            (
                display_name(entity.key, names),
                entity.key.map(str::to_string),
            )
        })
        .collect()
}

/// Lower-cases and replaces everything outside `[a-z0-9_:]` with `_`.
pub fn sanitize_category_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Name of the category owned by a mapping for `label_name` on `entity`.
pub fn category_name_from_label(
    entity: &MappableEntity,
    label_name: &str,
) -> Result<String, EntityError> {
    let prefix = entity.prefix.ok_or_else(|| {
        EntityError::new(format!(
            "Entity type '{}' cannot own a derived category",
            entity.key.unwrap_or_default()
        ))
    })?;
    Ok(format!(
        "{}{}",
        prefix,
        sanitize_category_name(&label_name.replace('/', ":"))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys: Vec<Option<&str>> = MAPPABLE_ENTITIES.iter().map(|e| e.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), MAPPABLE_ENTITIES.len());
    }

    #[test]
    fn derived_name_uses_prefix_and_sanitized_label() {
        let node = lookup(Some("ContainerNode")).unwrap();
        assert_eq!(
            category_name_from_label(node, "app").unwrap(),
            "kubernetes:container_node:app"
        );
        assert_eq!(
            category_name_from_label(node, "app.kubernetes.io/Name").unwrap(),
            "kubernetes:container_node:app_kubernetes_io:name"
        );
    }

    #[test]
    fn default_key_keeps_legacy_prefix() {
        let legacy = lookup(None).unwrap();
        assert_eq!(
            category_name_from_label(legacy, "tier").unwrap(),
            "kubernetes::tier"
        );
    }

    #[test]
    fn all_entities_cannot_derive_category() {
        let all = lookup(Some(ALL_ENTITIES)).unwrap();
        assert!(all.is_all_entities());
        assert!(category_name_from_label(all, "tier").is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = lookup(Some("Toaster")).unwrap_err();
        assert!(err.to_string().contains("Toaster"));
    }

    #[test]
    fn display_names_cover_special_keys() {
        let names = BuiltinDisplayNames;
        assert_eq!(display_name(None, &names), "<All>");
        assert_eq!(display_name(Some(ALL_ENTITIES), &names), "All Entities");
        assert_eq!(
            display_name(Some("ContainerNode"), &names),
            "Container Node"
        );
        assert_eq!(display_name(Some("Vm"), &names), "Instance (Amazon)");
    }

    #[test]
    fn model_resolver_falls_back_to_last_segment() {
        let names = BuiltinDisplayNames;
        assert_eq!(
            names.model_display_name("ManageIQ::Providers::Foo::CloudManager::OrchestrationStack"),
            "Orchestration Stack"
        );
    }

    #[test]
    fn options_follow_catalog_order() {
        let options = entity_options(&BuiltinDisplayNames);
        assert_eq!(options.len(), MAPPABLE_ENTITIES.len());
        assert_eq!(options[0], ("<All>".to_string(), None));
        assert_eq!(
            options[1],
            ("All Entities".to_string(), Some(ALL_ENTITIES.to_string()))
        );
    }
}
