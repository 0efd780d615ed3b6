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

use crate::types;
use crate::types::error::{
    DecodeProviderSpecSnafu, DecodeProviderStatusSnafu, MissingClusterIdSnafu,
    MissingProviderSpecSnafu, NoNamespaceSnafu,
};
use crate::types::v1alpha1::provider::{KubevirtMachineProviderSpec, KubevirtMachineProviderStatus};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use kube::{CustomResource, KubeSchema, ResourceExt};
use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};

pub mod virtual_machine;

/// Names the logical cluster a machine belongs to; doubles as the VM namespace.
pub const CLUSTER_ID_LABEL: &str = "machine.openshift.io/cluster-api-cluster";
pub const INSTANCE_TYPE_LABEL: &str = "machine.openshift.io/instance-type";
pub const INSTANCE_STATE_ANNOTATION: &str = "machine.openshift.io/instance-state";
pub const VM_ID_ANNOTATION: &str = "kubevirt.machine.openshift.io/vm-id";
pub const MACHINE_FINALIZER: &str = "machine.machine.openshift.io";

fn preserve_unknown_fields(_generator: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "nullable": true,
        "x-kubernetes-preserve-unknown-fields": true
    })
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default, PartialEq)]
#[kube(
    group = "machine.openshift.io",
    version = "v1beta1",
    kind = "Machine",
    namespaced,
    status = "MachineStatus",
    shortname = "ma",
    plural = "machines",
    singular = "machine",
    derive = "Default",
    derive = "PartialEq",
    printcolumn = r#"{"name":"ProviderID", "type":"string", "jsonPath":".spec.providerID"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".metadata.annotations['machine\\.openshift\\.io/instance-state']"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#,
    crates(serde_json = "k8s_openapi::serde_json")
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    #[serde(default)]
    pub provider_spec: ProviderSpec,

    #[serde(default, rename = "providerID", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub value: Option<RawExtension>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub provider_status: Option<RawExtension>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<corev1::ObjectReference>,
}

impl Machine {
    pub fn namespace(&self) -> Result<String, types::error::Error> {
        ResourceExt::namespace(self).context(NoNamespaceSnafu)
    }

    pub fn name(&self) -> String {
        ResourceExt::name_any(self)
    }

    /// The non-empty cluster-id label, or a configuration error naming it.
    pub fn cluster_id(&self) -> Result<String, types::error::Error> {
        self.labels()
            .get(CLUSTER_ID_LABEL)
            .filter(|id| !id.is_empty())
            .cloned()
            .context(MissingClusterIdSnafu {
                machine: self.name(),
                label: CLUSTER_ID_LABEL,
            })
    }

    /// Namespace the backing VM lives in: the cluster id, else the machine's own namespace.
    pub fn vm_namespace(&self) -> Option<String> {
        self.labels()
            .get(CLUSTER_ID_LABEL)
            .filter(|id| !id.is_empty())
            .cloned()
            .or_else(|| ResourceExt::namespace(self))
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.spec.provider_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.status.as_ref().and_then(|s| s.last_updated)
    }

    pub fn decode_provider_spec(&self) -> Result<KubevirtMachineProviderSpec, types::error::Error> {
        let raw = self
            .spec
            .provider_spec
            .value
            .as_ref()
            .context(MissingProviderSpecSnafu {
                machine: self.name(),
            })?;

        serde_json::from_value(raw.0.clone()).context(DecodeProviderSpecSnafu {
            machine: self.name(),
        })
    }

    /// Decodes the provider status; a machine that has never been reconciled has an empty one.
    pub fn decode_provider_status(
        &self,
    ) -> Result<KubevirtMachineProviderStatus, types::error::Error> {
        match self.status.as_ref().and_then(|s| s.provider_status.as_ref()) {
            Some(raw) if !raw.0.is_null() => {
                serde_json::from_value(raw.0.clone()).context(DecodeProviderStatusSnafu {
                    machine: self.name(),
                })
            }
            _ => Ok(KubevirtMachineProviderStatus::default()),
        }
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == MACHINE_FINALIZER)
    }
}
