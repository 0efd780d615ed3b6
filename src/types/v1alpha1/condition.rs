// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Condition type recorded for every create/update outcome.
pub const MACHINE_CREATION: &str = "MachineCreation";

pub const REASON_CREATION_SUCCEEDED: &str = "CreationSucceeded";
pub const REASON_CREATION_FAILED: &str = "CreationFailed";

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, Display, PartialEq, Eq)]
pub enum ConditionStatus {
    #[strum(to_string = "True")]
    True,

    #[strum(to_string = "False")]
    False,

    #[strum(to_string = "Unknown")]
    #[default]
    Unknown,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: ConditionStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probe_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_probe_time: None,
            last_transition_time: None,
        }
    }

    /// The condition recorded after the backend accepted a create or update.
    pub fn creation_succeeded() -> Self {
        Self::new(
            MACHINE_CREATION,
            ConditionStatus::True,
            REASON_CREATION_SUCCEEDED,
            "machine successfully created",
        )
    }

    /// The condition recorded after the backend rejected a create.
    pub fn creation_failed(message: impl Into<String>) -> Self {
        Self::new(
            MACHINE_CREATION,
            ConditionStatus::False,
            REASON_CREATION_FAILED,
            message,
        )
    }
}

/// Inserts `condition` into `conditions`, keeping at most one entry per type.
///
/// An existing entry of the same type is replaced in place. Its probe time is
/// refreshed whenever status, reason or message differ; its transition time
/// moves only when the status itself flips. An identical condition leaves
/// both timestamps untouched.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition, now: DateTime<Utc>) {
    let Some(index) = conditions.iter().position(|c| c.type_ == condition.type_) else {
        conditions.push(Condition {
            last_probe_time: Some(now),
            last_transition_time: Some(now),
            ..condition
        });
        return;
    };
    let existing = &mut conditions[index];

    let changed = existing.status != condition.status
        || existing.reason != condition.reason
        || existing.message != condition.message;
    if !changed {
        return;
    }

    if existing.status != condition.status {
        existing.last_transition_time = Some(now);
    }
    existing.status = condition.status;
    existing.reason = condition.reason;
    existing.message = condition.message;
    existing.last_probe_time = Some(now);
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
