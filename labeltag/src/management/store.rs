// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Persistent categories, tags and label mappings.
//!
//! The whole state lives in one YAML document so a unit of work can replace
//! it atomically. Every mutation goes through [`MappingStore::transaction`],
//! which works on a copy and only publishes it after the file is replaced.

use crate::management::yaml_store;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

pub const STORE_FILE_NAME: &str = "label_tag_mappings.yaml";
const MANAGED_TAG_NAMESPACE: &str = "/managed";
const MAX_CATEGORY_COUNT: usize = 10000;
const MAX_MAPPING_COUNT: usize = 10000;

pub type RecordId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CategoryRecord {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub single_value: bool,
    pub tag_id: RecordId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entries: BTreeMap<String, EntryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EntryRecord {
    pub description: String,
    pub tag_id: RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TagRecord {
    pub name: String,
    pub category_id: RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MappingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub label_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_value: Option<String>,
    pub tag_id: RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreState {
    #[serde(default = "first_record_id")]
    next_id: RecordId,
    #[serde(default)]
    pub categories: BTreeMap<RecordId, CategoryRecord>,
    #[serde(default)]
    pub tags: BTreeMap<RecordId, TagRecord>,
    #[serde(default)]
    pub mappings: BTreeMap<RecordId, MappingRecord>,
}

fn first_record_id() -> RecordId {
    1
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_id: first_record_id(),
            categories: BTreeMap::new(),
            tags: BTreeMap::new(),
            mappings: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

impl StoreState {
    fn allocate_id(&mut self) -> Result<RecordId, StoreError> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::new("Record id space exhausted"))?;
        Ok(id)
    }

    pub fn category(&self, id: RecordId) -> Option<&CategoryRecord> {
        self.categories.get(&id)
    }

    pub fn category_by_name(&self, name: &str) -> Option<(RecordId, &CategoryRecord)> {
        self.categories
            .iter()
            .find(|(_, category)| category.name == name)
            .map(|(id, category)| (*id, category))
    }

    /// Categories a label mapping could have created: read-only and single-valued.
    pub fn mapped_category_by_description(
        &self,
        description: &str,
    ) -> Option<(RecordId, &CategoryRecord)> {
        self.categories
            .iter()
            .find(|(_, category)| {
                category.read_only && category.single_value && category.description == description
            })
            .map(|(id, category)| (*id, category))
    }

    pub fn category_for_tag(&self, tag_id: RecordId) -> Option<(RecordId, &CategoryRecord)> {
        let tag = self.tags.get(&tag_id)?;
        self.categories
            .get(&tag.category_id)
            .map(|category| (tag.category_id, category))
    }

    pub fn mapping(&self, id: RecordId) -> Option<&MappingRecord> {
        self.mappings.get(&id)
    }

    pub fn has_mapping_for_label(&self, label_name: &str) -> bool {
        self.mappings
            .values()
            .any(|mapping| mapping.label_name == label_name)
    }

    pub fn create_category(
        &mut self,
        name: &str,
        description: &str,
        single_value: bool,
        read_only: bool,
    ) -> Result<RecordId, StoreError> {
        if name.is_empty() {
            return Err(StoreError::new("Category name is required"));
        }
        if self.category_by_name(name).is_some() {
            return Err(StoreError::new(format!(
                "Category name '{}' has already been taken",
                name
            )));
        }
        if self.categories.len() >= MAX_CATEGORY_COUNT {
            return Err(StoreError::new(format!(
                "Categories must be at most {} entries",
                MAX_CATEGORY_COUNT
            )));
        }
        let category_id = self.allocate_id()?;
        let tag_id = self.allocate_id()?;
        self.tags.insert(
            tag_id,
            TagRecord {
                name: format!("{}/{}", MANAGED_TAG_NAMESPACE, name),
                category_id,
            },
        );
        self.categories.insert(
            category_id,
            CategoryRecord {
                name: name.to_string(),
                description: description.to_string(),
                read_only,
                single_value,
                tag_id,
                entries: BTreeMap::new(),
            },
        );
        Ok(category_id)
    }

    pub fn create_entry(
        &mut self,
        category_id: RecordId,
        name: &str,
        description: &str,
    ) -> Result<RecordId, StoreError> {
        let category_name = match self.categories.get(&category_id) {
            Some(category) if category.entries.contains_key(name) => {
                return Err(StoreError::new(format!(
                    "Entry '{}' already exists in category '{}'",
                    name, category.name
                )));
            }
            Some(category) => category.name.clone(),
            None => return Err(StoreError::new("Category not found")),
        };
        let tag_id = self.allocate_id()?;
        self.tags.insert(
            tag_id,
            TagRecord {
                name: format!("{}/{}/{}", MANAGED_TAG_NAMESPACE, category_name, name),
                category_id,
            },
        );
        if let Some(category) = self.categories.get_mut(&category_id) {
            category.entries.insert(
                name.to_string(),
                EntryRecord {
                    description: description.to_string(),
                    tag_id,
                },
            );
        }
        Ok(tag_id)
    }

    pub fn update_category_description(
        &mut self,
        category_id: RecordId,
        description: &str,
    ) -> Result<(), StoreError> {
        let category = self
            .categories
            .get_mut(&category_id)
            .ok_or_else(|| StoreError::new("Category not found"))?;
        category.description = description.to_string();
        Ok(())
    }

    /// Mappings bound to any tag owned by `category_id`, in id order.
    pub fn mappings_for_category(&self, category_id: RecordId) -> Vec<RecordId> {
        self.mappings
            .iter()
            .filter(|(_, mapping)| {
                self.tags
                    .get(&mapping.tag_id)
                    .is_some_and(|tag| tag.category_id == category_id)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Removes the category and every tag it owns. Returns the number of tags removed.
    pub fn delete_category(&mut self, category_id: RecordId) -> Result<usize, StoreError> {
        if !self.categories.contains_key(&category_id) {
            return Err(StoreError::new("not found"));
        }
        let owned: BTreeSet<RecordId> = self
            .tags
            .iter()
            .filter(|(_, tag)| tag.category_id == category_id)
            .map(|(id, _)| *id)
            .collect();
        if let Some(mapping) = self
            .mappings
            .values()
            .find(|mapping| owned.contains(&mapping.tag_id))
        {
            return Err(StoreError::new(format!(
                "is still used by mapping for label '{}'",
                mapping.label_name
            )));
        }
        self.categories.remove(&category_id);
        self.tags.retain(|id, _| !owned.contains(id));
        Ok(owned.len())
    }

    pub fn create_mapping(
        &mut self,
        entity: Option<&str>,
        label_name: &str,
        tag_id: RecordId,
    ) -> Result<RecordId, StoreError> {
        if label_name.is_empty() {
            return Err(StoreError::new("Label name can't be blank"));
        }
        if !self.tags.contains_key(&tag_id) {
            return Err(StoreError::new("Tag must exist"));
        }
        if self.has_mapping_for_label(label_name) {
            return Err(StoreError::new(format!(
                "Label name '{}' has already been taken",
                label_name
            )));
        }
        if self.mappings.len() >= MAX_MAPPING_COUNT {
            return Err(StoreError::new(format!(
                "Mappings must be at most {} entries",
                MAX_MAPPING_COUNT
            )));
        }
        let id = self.allocate_id()?;
        self.mappings.insert(
            id,
            MappingRecord {
                entity: entity.map(str::to_string),
                label_name: label_name.to_string(),
                label_value: None,
                tag_id,
            },
        );
        Ok(id)
    }

    pub fn retag_mapping(&mut self, id: RecordId, tag_id: RecordId) -> Result<(), StoreError> {
        if !self.tags.contains_key(&tag_id) {
            return Err(StoreError::new("Tag must exist"));
        }
        let mapping = self
            .mappings
            .get_mut(&id)
            .ok_or_else(|| StoreError::new("Mapping not found"))?;
        mapping.tag_id = tag_id;
        Ok(())
    }

    pub fn delete_mapping(&mut self, id: RecordId) -> Result<MappingRecord, StoreError> {
        self.mappings
            .remove(&id)
            .ok_or_else(|| StoreError::new("not found"))
    }

    /// Checks the invariants the advisory checks in the services rely on.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut category_names = BTreeSet::new();
        for (id, category) in &self.categories {
            if !category_names.insert(category.name.as_str()) {
                return Err(StoreError::new(format!(
                    "Duplicate category name '{}'",
                    category.name
                )));
            }
            self.expect_owned_tag(category.tag_id, *id)?;
            for entry in category.entries.values() {
                self.expect_owned_tag(entry.tag_id, *id)?;
            }
        }
        for (id, tag) in &self.tags {
            if !self.categories.contains_key(&tag.category_id) {
                return Err(StoreError::new(format!(
                    "Tag {} references missing category {}",
                    id, tag.category_id
                )));
            }
        }
        let mut labels = BTreeSet::new();
        for (id, mapping) in &self.mappings {
            if !labels.insert(mapping.label_name.as_str()) {
                return Err(StoreError::new(format!(
                    "Duplicate mapping for label '{}'",
                    mapping.label_name
                )));
            }
            if !self.tags.contains_key(&mapping.tag_id) {
                return Err(StoreError::new(format!(
                    "Mapping {} references missing tag {}",
                    id, mapping.tag_id
                )));
            }
        }
        let highest = self
            .categories
            .keys()
            .chain(self.tags.keys())
            .chain(self.mappings.keys())
            .max()
            .copied()
            .unwrap_or(0);
        if self.next_id <= highest {
            return Err(StoreError::new(format!(
                "next_id {} must be greater than every record id ({})",
                self.next_id, highest
            )));
        }
        Ok(())
    }

    fn expect_owned_tag(&self, tag_id: RecordId, category_id: RecordId) -> Result<(), StoreError> {
        match self.tags.get(&tag_id) {
            Some(tag) if tag.category_id == category_id => Ok(()),
            Some(_) => Err(StoreError::new(format!(
                "Tag {} is not owned by category {}",
                tag_id, category_id
            ))),
            None => Err(StoreError::new(format!(
                "Category {} references missing tag {}",
                category_id, tag_id
            ))),
        }
    }
}

/// Outcome of a failed unit of work.
#[derive(Debug)]
pub enum TransactionError<E> {
    /// The closure rejected the change; nothing was written.
    Aborted(E),
    /// The change could not be persisted; nothing was published.
    Store(StoreError),
}

pub(crate) struct MappingStore {
    path: PathBuf,
    state: RwLock<StoreState>,
    writer: Mutex<()>,
}

impl MappingStore {
    pub fn new(state_sys_dir: PathBuf) -> Result<Self, StoreError> {
        let path = state_sys_dir.join(STORE_FILE_NAME);
        let state = Self::load_from_disk(&path)?;
        log::debug!(
            "Loaded {} label mappings and {} categories from {}",
            state.mappings.len(),
            state.categories.len(),
            path.display()
        );
        Ok(Self {
            path,
            state: RwLock::new(state),
            writer: Mutex::new(()),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Result<StoreState, StoreError> {
        self.state
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| StoreError::new("Mapping store lock poisoned"))
    }

    /// Runs `work` against a copy of the state and commits the copy only if
    /// `work` succeeds and the file is replaced.
    pub fn transaction<T, E, F>(&self, work: F) -> Result<T, TransactionError<E>>
    where
        F: FnOnce(&mut StoreState) -> Result<T, E>,
    {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| TransactionError::Store(StoreError::new("Mapping store lock poisoned")))?;
        let mut working = self.snapshot().map_err(TransactionError::Store)?;
        let value = work(&mut working).map_err(TransactionError::Aborted)?;
        working.validate().map_err(TransactionError::Store)?;
        yaml_store::write_yaml_file(&self.path, "label tag mapping", &working)
            .map_err(|err| TransactionError::Store(StoreError::new(err.to_string())))?;
        let mut guard = self
            .state
            .write()
            .map_err(|_| TransactionError::Store(StoreError::new("Mapping store lock poisoned")))?;
        *guard = working;
        Ok(value)
    }

    fn load_from_disk(path: &Path) -> Result<StoreState, StoreError> {
        let state: Option<StoreState> = yaml_store::read_yaml_file(path, "label tag mapping")
            .map_err(|err| StoreError::new(err.to_string()))?;
        let state = state.unwrap_or_default();
        state.validate().map_err(|err| {
            StoreError::new(format!("Invalid {}: {}", path.display(), err))
        })?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;

    fn store_in(fixture: &TestFixtureRoot) -> MappingStore {
        let sys_dir = fixture.state_dir().join("sys");
        std::fs::create_dir_all(&sys_dir).unwrap();
        MappingStore::new(sys_dir).expect("store")
    }

    #[test]
    fn category_creation_also_creates_its_tag() {
        let mut state = StoreState::default();
        let id = state
            .create_category("environment", "Environment", true, false)
            .unwrap();
        let category = state.category(id).unwrap();
        let tag = state.tags.get(&category.tag_id).unwrap();
        assert_eq!(tag.name, "/managed/environment");
        assert_eq!(tag.category_id, id);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn duplicate_category_names_are_rejected() {
        let mut state = StoreState::default();
        state.create_category("tier", "Tier", true, false).unwrap();
        let err = state
            .create_category("tier", "Other", true, false)
            .unwrap_err();
        assert!(err.to_string().contains("already been taken"));
    }

    #[test]
    fn delete_category_removes_every_owned_tag() {
        let mut state = StoreState::default();
        let id = state.create_category("tier", "Tier", true, false).unwrap();
        state.create_entry(id, "frontend", "Frontend").unwrap();
        state.create_entry(id, "backend", "Backend").unwrap();
        let other = state.create_category("owner", "Owner", true, false).unwrap();

        let removed = state.delete_category(id).unwrap();
        assert_eq!(removed, 3);
        assert!(state.tags.values().all(|tag| tag.category_id == other));
        assert!(state.validate().is_ok());
    }

    #[test]
    fn delete_category_refuses_while_mapped() {
        let mut state = StoreState::default();
        let id = state.create_category("tier", "Tier", true, false).unwrap();
        let tag_id = state.category(id).unwrap().tag_id;
        state.create_mapping(None, "tier", tag_id).unwrap();
        let err = state.delete_category(id).unwrap_err();
        assert!(err.to_string().contains("tier"));
    }

    #[test]
    fn validate_rejects_duplicate_labels() {
        let mut state = StoreState::default();
        let id = state.create_category("tier", "Tier", true, false).unwrap();
        let tag_id = state.category(id).unwrap().tag_id;
        state.create_mapping(None, "tier", tag_id).unwrap();
        let duplicate = state.mappings.values().next().cloned().unwrap();
        state.mappings.insert(999, duplicate);
        state.next_id = 1000;
        let err = state.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate mapping"));
    }

    #[test]
    fn transaction_commits_to_disk_and_memory() {
        let fixture = TestFixtureRoot::new_unique("store-commit").unwrap();
        let store = store_in(&fixture);
        let id = store
            .transaction(|state| state.create_category("tier", "Tier", true, true))
            .map_err(|_| "transaction failed")
            .unwrap();

        assert!(store.snapshot().unwrap().category(id).is_some());
        let reloaded = MappingStore::new(store.path().parent().unwrap().to_path_buf()).unwrap();
        assert_eq!(
            reloaded.snapshot().unwrap().category(id).unwrap().name,
            "tier"
        );
    }

    #[test]
    fn aborted_transaction_leaves_state_untouched() {
        let fixture = TestFixtureRoot::new_unique("store-abort").unwrap();
        let store = store_in(&fixture);
        let before = store.snapshot().unwrap();
        let result: Result<(), TransactionError<&str>> = store.transaction(|state| {
            state.create_category("tier", "Tier", true, true).unwrap();
            Err("rejected")
        });
        assert!(matches!(result, Err(TransactionError::Aborted("rejected"))));
        assert_eq!(store.snapshot().unwrap(), before);
        assert!(!store.path().exists());
    }

    #[test]
    fn failed_write_rolls_back_memory() {
        let fixture = TestFixtureRoot::new_unique("store-write-failure").unwrap();
        let store = store_in(&fixture);
        std::fs::create_dir_all(store.path()).unwrap();

        let result: Result<RecordId, TransactionError<StoreError>> =
            store.transaction(|state| state.create_category("tier", "Tier", true, true));
        assert!(matches!(result, Err(TransactionError::Store(_))));
        assert!(store.snapshot().unwrap().categories.is_empty());
    }

    #[test]
    fn load_rejects_corrupted_state() {
        let fixture = TestFixtureRoot::new_unique("store-corrupt").unwrap();
        let sys_dir = fixture.state_dir().join("sys");
        std::fs::create_dir_all(&sys_dir).unwrap();
        std::fs::write(
            sys_dir.join(STORE_FILE_NAME),
            "next_id: 5\nmappings:\n  1:\n    label_name: app\n    tag_id: 42\n",
        )
        .unwrap();
        let err = MappingStore::new(sys_dir).err().expect("corrupt state rejected");
        assert!(err.to_string().contains("missing tag"));
    }
}
