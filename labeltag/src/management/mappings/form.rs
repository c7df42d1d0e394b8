// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Client-held edit state for the add/edit mapping form.
//!
//! The session travels with every form request; the server keeps nothing.

use crate::entities;
use crate::management::mappings::service::{self, MAPPING_NAME, MappingError, MappingErrorKind};
use crate::management::mappings::{
    MappingAddRequest, MappingCommand, MappingShowResponse, MappingUpdateRequest,
};
use crate::management::store::RecordId;
use serde::{Deserialize, Serialize};

pub const EDIT_KEY_PREFIX: &str = "label_tag_mapping_edit__";
const RESET_MESSAGE: &str = "All changes have been reset";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingForm {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Fields sent by one form interaction. An empty `entity` selects the default entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormChanges {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub key: String,
    pub mapping_id: Option<RecordId>,
    pub current: MappingForm,
    pub new: MappingForm,
}

fn edit_key(mapping_id: Option<RecordId>) -> String {
    match mapping_id {
        Some(id) => format!("{}{}", EDIT_KEY_PREFIX, id),
        None => format!("{}new", EDIT_KEY_PREFIX),
    }
}

impl EditSession {
    pub fn new_mapping() -> Self {
        Self {
            key: edit_key(None),
            mapping_id: None,
            current: MappingForm::default(),
            new: MappingForm::default(),
        }
    }

    /// Starts editing an existing mapping. "All entities" mappings pick their
    /// category by name, every other mapping edits its category description.
    pub fn for_mapping(shown: &MappingShowResponse) -> Self {
        let category = if entities::is_all_entities(shown.entity_key.as_deref()) {
            shown.category_name.clone()
        } else {
            shown.category.clone()
        };
        let form = MappingForm {
            entity: shown.entity_key.clone(),
            label_name: Some(shown.label_name.clone()),
            category: Some(category),
        };
        Self {
            key: edit_key(Some(shown.id)),
            mapping_id: Some(shown.id),
            current: form.clone(),
            new: form,
        }
    }

    pub fn is_new(&self) -> bool {
        self.mapping_id.is_none()
    }

    /// Copies the present fields into `new`. Entity and label are fixed once a mapping exists.
    pub fn apply(&mut self, changes: FormChanges) {
        if self.is_new() {
            if let Some(entity) = changes.entity {
                self.new.entity = if entity.is_empty() { None } else { Some(entity) };
            }
            if let Some(label_name) = changes.label_name {
                self.new.label_name = Some(label_name);
            }
        }
        if let Some(category) = changes.category {
            self.new.category = Some(category);
        }
    }

    pub fn changed(&self) -> bool {
        self.new != self.current
    }

    pub fn reset(&mut self) -> &'static str {
        self.new = self.current.clone();
        RESET_MESSAGE
    }

    pub fn cancel_message(&self) -> String {
        match (&self.mapping_id, &self.current.label_name) {
            (Some(_), Some(label_name)) => format!(
                "Edit of {} \"{}\" was cancelled by the user",
                MAPPING_NAME, label_name
            ),
            _ => format!("Add of new {} was cancelled by the user", MAPPING_NAME),
        }
    }

    /// Rejects a session whose key does not match the mapping it edits.
    pub fn validate_key(&self) -> Result<(), MappingError> {
        if self.key == edit_key(self.mapping_id) {
            Ok(())
        } else {
            Err(MappingError::single(
                MappingErrorKind::NotFound,
                format!("Edit session '{}' does not match this form", self.key),
            ))
        }
    }

    /// Turns the form into the command that saves it.
    pub fn submit(&self) -> Result<MappingCommand, MappingError> {
        self.validate_key()?;
        let category = self.new.category.clone().unwrap_or_default();
        match self.mapping_id {
            None => {
                let label_name = self.new.label_name.clone().unwrap_or_default();
                service::require_fields(&label_name, &category)?;
                Ok(MappingCommand::Add(MappingAddRequest {
                    entity: self.new.entity.clone(),
                    label_name,
                    category,
                }))
            }
            Some(id) => {
                if service::is_blank(&category) {
                    return Err(MappingError::single(
                        MappingErrorKind::MissingField,
                        "Category is required",
                    ));
                }
                Ok(MappingCommand::Update(MappingUpdateRequest { id, category }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ALL_ENTITIES;

    fn shown(entity_key: Option<&str>) -> MappingShowResponse {
        MappingShowResponse {
            id: 7,
            entity_key: entity_key.map(str::to_string),
            entity: "Container Node".to_string(),
            label_name: "app".to_string(),
            category_name: "kubernetes:container_node:app".to_string(),
            category: "App Label".to_string(),
        }
    }

    #[test]
    fn keys_follow_mapping_id() {
        assert_eq!(EditSession::new_mapping().key, "label_tag_mapping_edit__new");
        assert_eq!(
            EditSession::for_mapping(&shown(Some("ContainerNode"))).key,
            "label_tag_mapping_edit__7"
        );
    }

    #[test]
    fn apply_marks_session_changed_and_reset_restores() {
        let mut session = EditSession::for_mapping(&shown(Some("ContainerNode")));
        assert!(!session.changed());

        session.apply(FormChanges {
            category: Some("Application".to_string()),
            ..FormChanges::default()
        });
        assert!(session.changed());

        assert_eq!(session.reset(), "All changes have been reset");
        assert!(!session.changed());
    }

    #[test]
    fn existing_mapping_keeps_entity_and_label() {
        let mut session = EditSession::for_mapping(&shown(Some("ContainerNode")));
        session.apply(FormChanges {
            entity: Some("Vm".to_string()),
            label_name: Some("other".to_string()),
            category: None,
        });
        assert!(!session.changed());
    }

    #[test]
    fn empty_entity_selects_default() {
        let mut session = EditSession::new_mapping();
        session.apply(FormChanges {
            entity: Some("Vm".to_string()),
            ..FormChanges::default()
        });
        assert_eq!(session.new.entity.as_deref(), Some("Vm"));
        session.apply(FormChanges {
            entity: Some(String::new()),
            ..FormChanges::default()
        });
        assert_eq!(session.new.entity, None);
    }

    #[test]
    fn all_entities_edits_category_by_name() {
        let session = EditSession::for_mapping(&shown(Some(ALL_ENTITIES)));
        assert_eq!(
            session.current.category.as_deref(),
            Some("kubernetes:container_node:app")
        );
    }

    #[test]
    fn cancel_messages() {
        assert_eq!(
            EditSession::new_mapping().cancel_message(),
            "Add of new Container Label Tag Mapping was cancelled by the user"
        );
        assert_eq!(
            EditSession::for_mapping(&shown(None)).cancel_message(),
            "Edit of Container Label Tag Mapping \"app\" was cancelled by the user"
        );
    }

    #[test]
    fn submit_new_requires_both_fields() {
        let mut session = EditSession::new_mapping();
        let err = session.submit().unwrap_err();
        assert_eq!(err.messages().len(), 2);

        session.apply(FormChanges {
            entity: Some("ContainerNode".to_string()),
            label_name: Some("app".to_string()),
            category: Some("App Label".to_string()),
        });
        match session.submit().unwrap() {
            MappingCommand::Add(request) => {
                assert_eq!(request.entity.as_deref(), Some("ContainerNode"));
                assert_eq!(request.label_name, "app");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn submit_existing_yields_update() {
        let mut session = EditSession::for_mapping(&shown(Some("ContainerNode")));
        session.apply(FormChanges {
            category: Some("Application".to_string()),
            ..FormChanges::default()
        });
        match session.submit().unwrap() {
            MappingCommand::Update(request) => {
                assert_eq!(request.id, 7);
                assert_eq!(request.category, "Application");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn tampered_key_is_rejected() {
        let mut session = EditSession::for_mapping(&shown(None));
        session.key = "label_tag_mapping_edit__8".to_string();
        assert_eq!(
            session.submit().unwrap_err().kind(),
            MappingErrorKind::NotFound
        );
    }
}
