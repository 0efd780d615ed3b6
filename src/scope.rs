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

//! Per-call reconciliation state for one machine.

use crate::backend::{BackendBuilder, VirtualizationBackend};
use crate::context::{CredentialResolver, Credentials, MachineStore};
use crate::error::Error;
use crate::types;
use crate::types::error::{
    EncodeProviderStatusSnafu, MissingCredentialsSecretSnafu, MissingSourceVolumeSnafu,
};
use crate::types::kubevirt::VirtualMachine;
use crate::types::v1alpha1::condition::Condition;
use crate::types::v1alpha1::provider::{
    KubevirtMachineProviderSpec, KubevirtMachineProviderStatus, VmState,
};
use crate::types::v1beta1::machine::virtual_machine::VirtualMachineDefaults;
use crate::types::v1beta1::machine::{
    INSTANCE_STATE_ANNOTATION, INSTANCE_TYPE_LABEL, Machine, VM_ID_ANNOTATION,
};
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use kube::ResourceExt;
use snafu::{OptionExt, ResultExt, ensure};
use std::sync::Arc;
use tracing::debug;

/// Everything one Create/Update/Delete/Exists call works on.
///
/// The provider spec and status are decoded once, here; the rest of the call
/// only sees the typed values. `original` is never mutated, so patches are
/// always computed against what was observed when the call started.
pub struct Scope {
    machine: Machine,
    original: Machine,
    provider_spec: KubevirtMachineProviderSpec,
    provider_status: KubevirtMachineProviderStatus,
    original_provider_status: KubevirtMachineProviderStatus,
    virtual_machine: VirtualMachine,
    vm_namespace: String,
    credentials: Credentials,
}

impl Scope {
    /// Validates the machine, derives its VM and resolves backend credentials.
    ///
    /// Validation and decoding run before the credential lookup, so a
    /// misconfigured machine causes no I/O at all.
    pub async fn new(
        machine: &Machine,
        resolver: &dyn CredentialResolver,
        defaults: &VirtualMachineDefaults,
    ) -> Result<Self, Error> {
        machine.cluster_id()?;
        let namespace = machine.namespace()?;
        let provider_spec = machine.decode_provider_spec()?;
        let provider_status = machine.decode_provider_status()?;

        ensure_configured(machine, &provider_spec)?;

        let virtual_machine =
            machine.new_virtual_machine(&provider_spec, &provider_spec.source_pvc_name, defaults)?;
        let vm_namespace = virtual_machine
            .namespace()
            .context(types::error::NoNamespaceSnafu)?;

        let credentials =
            resolve_credentials(resolver, &provider_spec.credentials_secret_name, &namespace)
                .await?;

        Ok(Self {
            machine: machine.clone(),
            original: machine.clone(),
            provider_spec,
            original_provider_status: provider_status.clone(),
            provider_status,
            virtual_machine,
            vm_namespace,
            credentials,
        })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn original(&self) -> &Machine {
        &self.original
    }

    pub fn provider_spec(&self) -> &KubevirtMachineProviderSpec {
        &self.provider_spec
    }

    pub fn provider_status(&self) -> &KubevirtMachineProviderStatus {
        &self.provider_status
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The desired VM.
    pub fn virtual_machine(&self) -> &VirtualMachine {
        &self.virtual_machine
    }

    pub fn virtual_machine_mut(&mut self) -> &mut VirtualMachine {
        &mut self.virtual_machine
    }

    pub fn vm_name(&self) -> String {
        self.virtual_machine.name_any()
    }

    pub fn vm_namespace(&self) -> &str {
        &self.vm_namespace
    }

    /// `namespace/name` of the VM, for logs and errors.
    pub fn vm_key(&self) -> String {
        format!("{}/{}", self.vm_namespace, self.vm_name())
    }

    pub fn set_provider_id(&mut self, provider_id: String) {
        if self.machine.provider_id() != Some(provider_id.as_str()) {
            debug!(machine = %self.machine.name(), provider_id, "assigning provider ID");
            self.machine.spec.provider_id = Some(provider_id);
        }
    }

    /// Mirrors facts about `vm` into the machine's labels and annotations.
    pub fn set_vm_metadata(&mut self, vm: &VirtualMachine) {
        let labels = self.machine.labels_mut();
        match vm.machine_type() {
            Some(machine_type) => {
                labels.insert(INSTANCE_TYPE_LABEL.to_owned(), machine_type.to_owned());
            }
            None => {
                labels.remove(INSTANCE_TYPE_LABEL);
            }
        }

        let annotations = self.machine.annotations_mut();
        annotations.insert(
            INSTANCE_STATE_ANNOTATION.to_owned(),
            VmState::of(vm).to_string(),
        );
        match vm.metadata.uid.as_deref() {
            Some(uid) => {
                annotations.insert(VM_ID_ANNOTATION.to_owned(), uid.to_owned());
            }
            None => {
                annotations.remove(VM_ID_ANNOTATION);
            }
        }
    }

    /// Whether the machine now differs from the one this scope was built from.
    /// Only meaningful before [`Scope::patch_back`].
    pub fn is_modified(&self) -> bool {
        self.provider_status != self.original_provider_status
            || self.machine.spec != self.original.spec
            || self.machine.metadata.labels != self.original.metadata.labels
            || self.machine.metadata.annotations != self.original.metadata.annotations
    }

    /// Records the observed VM, or its absence, in the provider status.
    pub fn set_provider_status(&mut self, vm: Option<&VirtualMachine>, condition: Condition) {
        self.provider_status.observe(vm, condition, Utc::now());
    }

    /// Writes the machine back: spec and metadata first, then status.
    ///
    /// The spec patch returns the object as persisted, whose status predates
    /// this call, so the in-memory status is carried over before the status
    /// patch is computed.
    pub async fn patch_back(&mut self, store: &dyn MachineStore) -> Result<(), Error> {
        self.encode_provider_status()?;

        let status = self.machine.status.clone();
        let mut patched = store.patch(&self.machine, &self.original).await?;
        patched.status = status;
        self.machine = store.patch_status(&patched, &self.original).await?;
        Ok(())
    }

    /// Serializes a changed provider status into the machine and stamps
    /// `lastUpdated`. An unchanged provider status leaves the machine alone.
    fn encode_provider_status(&mut self) -> Result<(), types::error::Error> {
        if self.provider_status == self.original_provider_status {
            return Ok(());
        }

        let raw = serde_json::to_value(self.provider_status.clone().with_type_meta()).context(
            EncodeProviderStatusSnafu {
                machine: self.machine.name(),
            },
        )?;

        let status = self.machine.status.get_or_insert_with(Default::default);
        status.provider_status = Some(RawExtension(raw));
        status.last_updated = Some(Utc::now());
        Ok(())
    }
}

fn ensure_configured(
    machine: &Machine,
    provider_spec: &KubevirtMachineProviderSpec,
) -> Result<(), types::error::Error> {
    ensure!(
        !provider_spec.source_pvc_name.is_empty(),
        MissingSourceVolumeSnafu {
            machine: machine.name(),
        }
    );
    ensure!(
        !provider_spec.credentials_secret_name.is_empty(),
        MissingCredentialsSecretSnafu {
            machine: machine.name(),
        }
    );
    Ok(())
}

/// Resolves backend credentials, reporting an unusable secret as a
/// configuration error and anything else as a retryable one.
pub(crate) async fn resolve_credentials(
    resolver: &dyn CredentialResolver,
    name: &str,
    namespace: &str,
) -> Result<Credentials, Error> {
    match resolver.resolve(name, namespace).await {
        Ok(credentials) => Ok(credentials),
        Err(e) if e.is_invalid_credentials() => Err(invalid_credentials(name, namespace, &e)),
        Err(source) => Err(Error::Context { source }),
    }
}

/// Opens a backend session; a kubeconfig that cannot be loaded is a configuration error.
pub(crate) async fn connect(
    builder: &dyn BackendBuilder,
    credentials: &Credentials,
    secret_name: &str,
    namespace: &str,
) -> Result<Arc<dyn VirtualizationBackend>, Error> {
    match builder.build(credentials).await {
        Ok(backend) => Ok(backend),
        Err(e) if e.is_invalid_credentials() => Err(invalid_credentials(secret_name, namespace, &e)),
        Err(source) => Err(Error::Backend {
            action: "connect to the backend of",
            vm: format!("{namespace}/{secret_name}"),
            source,
        }),
    }
}

fn invalid_credentials(name: &str, namespace: &str, cause: &dyn std::error::Error) -> Error {
    Error::Configuration {
        source: types::error::Error::InvalidCredentials {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            message: cause.to_string(),
        },
    }
}
