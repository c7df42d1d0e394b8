// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, error, web};

use crate::management::ManagementErrorKind;

mod mappings;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/label-tag-mappings")
            .app_data(json_config())
            .route("", web::get().to(mappings::list_mappings))
            .route("", web::post().to(mappings::add_mapping))
            .route("/", web::get().to(mappings::list_mappings))
            .route("/", web::post().to(mappings::add_mapping))
            .route("/entities", web::get().to(mappings::list_entities))
            .route("/form", web::post().to(mappings::start_form))
            .route("/form/changed", web::post().to(mappings::form_changed))
            .route("/form/reset", web::post().to(mappings::form_reset))
            .route("/form/cancel", web::post().to(mappings::form_cancel))
            .route("/form/submit", web::post().to(mappings::form_submit))
            .route("/{id}", web::get().to(mappings::show_mapping))
            .route("/{id}", web::put().to(mappings::update_mapping))
            .route("/{id}", web::delete().to(mappings::delete_mapping)),
    );
}

/// Malformed JSON bodies get the same error shape as domain failures.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let response =
            mappings::error_response(ManagementErrorKind::Validation, err.to_string());
        error::InternalError::from_response(err, response).into()
    })
}
