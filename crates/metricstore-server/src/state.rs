// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Router state

use std::sync::Arc;

use crate::service::MetricService;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Metric operations, backed by whichever storage was selected at startup
    pub service: Arc<MetricService>,
}

impl AppState {
    /// Create app state around a service
    pub fn new(service: Arc<MetricService>) -> Self {
        Self { service }
    }
}
