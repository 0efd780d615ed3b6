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

//! Typed contents of a Machine's `providerSpec.value` and `providerStatus`.

use crate::types::kubevirt::{VirtualMachine, VirtualMachineStatus};
use crate::types::v1alpha1::condition::{self, Condition};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

pub const API_VERSION: &str = "kubevirtproviderconfig.openshift.io/v1alpha1";
pub const PROVIDER_STATUS_KIND: &str = "KubevirtMachineProviderStatus";

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtMachineProviderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// PVC cloned into the boot volume of every VM.
    #[serde(default)]
    pub source_pvc_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_memory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_cpu: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,

    /// Secret, in the machine's namespace, holding the infrastructure kubeconfig.
    #[serde(default)]
    pub credentials_secret_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret_name: Option<String>,
}

/// Lifecycle of the backing VM as surfaced on the machine.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, Display, PartialEq, Eq)]
pub enum VmState {
    #[strum(to_string = "vmNotCreated")]
    #[serde(rename = "vmNotCreated")]
    NotCreated,

    #[strum(to_string = "vmWasCreatedButNotReady")]
    #[serde(rename = "vmWasCreatedButNotReady")]
    CreatedNotReady,

    #[strum(to_string = "vmWasCreatedAndReady")]
    #[serde(rename = "vmWasCreatedAndReady")]
    CreatedAndReady,
}

impl VmState {
    pub fn of(vm: &VirtualMachine) -> Self {
        match (vm.is_created(), vm.is_ready()) {
            (_, true) => VmState::CreatedAndReady,
            (true, false) => VmState::CreatedNotReady,
            (false, false) => VmState::NotCreated,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtMachineProviderStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// UID of the backing VirtualMachine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_state: Option<VmState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_status: Option<ObservedVmStatus>,

    /// Last observed resource version of the backing VirtualMachine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservedVmStatus {
    pub created: bool,

    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printable_status: Option<String>,
}

impl From<&VirtualMachineStatus> for ObservedVmStatus {
    fn from(status: &VirtualMachineStatus) -> Self {
        Self {
            created: status.created,
            ready: status.ready,
            printable_status: status.printable_status.clone(),
        }
    }
}

impl KubevirtMachineProviderStatus {
    /// Records the observed VM (or its absence) together with `condition`.
    pub fn observe(&mut self, vm: Option<&VirtualMachine>, condition: Condition, now: DateTime<Utc>) {
        match vm {
            Some(vm) => {
                self.vm_id = vm.metadata.uid.clone();
                self.vm_state = Some(VmState::of(vm));
                self.vm_status = vm.status.as_ref().map(ObservedVmStatus::from);
                self.resource_version = vm.metadata.resource_version.clone();
            }
            None => {
                self.vm_id = None;
                self.vm_state = None;
                self.vm_status = None;
                self.resource_version = None;
            }
        }
        condition::set_condition(&mut self.conditions, condition, now);
    }

    pub(crate) fn with_type_meta(mut self) -> Self {
        self.api_version = Some(API_VERSION.to_owned());
        self.kind = Some(PROVIDER_STATUS_KIND.to_owned());
        self
    }
}
