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

//! Create, Update, Delete and Exists for machines backed by KubeVirt VMs.
//!
//! Each call is independent: it builds a [`Scope`], compares the machine
//! against the backend and finishes by writing the machine back. Pending
//! states are reported as [`Error::RequeueAfter`] rather than by sleeping.

use crate::backend::{BackendBuilder, VirtualizationBackend};
use crate::config::Config;
use crate::context::{CredentialResolver, MachineStore};
use crate::error::{BackendSnafu, Error, resolve_outcome};
use crate::scope::{self, Scope};
use crate::types::kubevirt::VirtualMachine;
use crate::types::v1alpha1::condition::Condition;
use crate::types::v1beta1::machine::Machine;
use chrono::{DateTime, TimeDelta, Utc};
use snafu::ResultExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Actuator {
    config: Config,
    store: Arc<dyn MachineStore>,
    resolver: Arc<dyn CredentialResolver>,
    backends: Arc<dyn BackendBuilder>,
}

impl Actuator {
    pub fn new(
        config: Config,
        store: Arc<dyn MachineStore>,
        resolver: Arc<dyn CredentialResolver>,
        backends: Arc<dyn BackendBuilder>,
    ) -> Self {
        Self {
            config,
            store,
            resolver,
            backends,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn scope(&self, machine: &Machine) -> Result<Scope, Error> {
        Scope::new(machine, self.resolver.as_ref(), &self.config.vm_defaults).await
    }

    async fn connect(&self, scope: &Scope) -> Result<Arc<dyn VirtualizationBackend>, Error> {
        let namespace = scope.machine().namespace()?;
        scope::connect(
            self.backends.as_ref(),
            scope.credentials(),
            &scope.provider_spec().credentials_secret_name,
            &namespace,
        )
        .await
    }

    pub async fn create(&self, machine: &Machine) -> Result<(), Error> {
        let mut scope = self.scope(machine).await?;
        info!(machine = %machine.name(), vm = %scope.vm_key(), "creating machine");

        let created = self.create_vm(&mut scope).await;
        let patched = scope.patch_back(self.store.as_ref()).await;
        resolve_outcome(created, patched)
    }

    async fn create_vm(&self, scope: &mut Scope) -> Result<(), Error> {
        let backend = self.connect(scope).await?;

        let vm = match backend
            .create_vm(scope.vm_namespace(), scope.virtual_machine())
            .await
        {
            Ok(vm) => vm,
            Err(source) => {
                warn!(vm = %scope.vm_key(), error = %source, "VirtualMachine creation failed");
                scope.set_provider_status(None, Condition::creation_failed(source.to_string()));
                return Err(Error::Backend {
                    action: "create",
                    vm: scope.vm_key(),
                    source,
                });
            }
        };

        info!(vm = %scope.vm_key(), uid = ?vm.metadata.uid, "VirtualMachine created");
        self.record_vm(scope, &vm);
        self.requeue_unless_ready(scope, &vm)
    }

    /// Returns whether the machine had to change to match its VM.
    pub async fn update(&self, machine: &Machine) -> Result<bool, Error> {
        let mut scope = self.scope(machine).await?;
        debug!(machine = %machine.name(), vm = %scope.vm_key(), "updating machine");

        let updated = self.update_vm(&mut scope).await;
        let changed = scope.is_modified();
        let patched = scope.patch_back(self.store.as_ref()).await;
        resolve_outcome(updated, patched).map(|()| changed)
    }

    async fn update_vm(&self, scope: &mut Scope) -> Result<(), Error> {
        let backend = self.connect(scope).await?;

        let Some(existing) = self.get_vm(backend.as_ref(), scope).await? else {
            return self.vm_absent(scope);
        };

        scope.virtual_machine_mut().metadata.resource_version =
            existing.metadata.resource_version.clone();
        let updated = backend
            .update_vm(scope.vm_namespace(), scope.virtual_machine())
            .await
            .context(BackendSnafu {
                action: "update",
                vm: scope.vm_key(),
            })?;

        let latest = match backend.get_vm(scope.vm_namespace(), &scope.vm_name()).await {
            Ok(Some(vm)) => vm,
            Ok(None) => updated,
            Err(e) => {
                debug!(vm = %scope.vm_key(), error = %e, "re-fetch after update failed, using update response");
                updated
            }
        };

        self.record_vm(scope, &latest);
        self.requeue_unless_ready(scope, &latest)
    }

    /// Decides between read lag and a VM that vanished under a stable machine.
    fn vm_absent(&self, scope: &mut Scope) -> Result<(), Error> {
        let machine = scope.machine();
        if possibly_lagging(
            machine.provider_id(),
            machine.last_updated(),
            Utc::now(),
            self.config.requeue_after,
        ) {
            info!(
                vm = %scope.vm_key(),
                "VirtualMachine not found shortly after provider ID assignment, waiting for backend to catch up"
            );
            return Err(Error::RequeueAfter {
                after: self.config.requeue_after,
            });
        }

        warn!(vm = %scope.vm_key(), "VirtualMachine disappeared, clearing provider status");
        scope.set_provider_status(None, Condition::creation_succeeded());
        Err(Error::RequeueAfter {
            after: self.config.requeue_after_fatal,
        })
    }

    pub async fn delete(&self, machine: &Machine) -> Result<(), Error> {
        let mut scope = self.scope(machine).await?;
        info!(machine = %machine.name(), vm = %scope.vm_key(), "deleting machine");

        let deleted = self.delete_vm(&scope).await;
        let patched = scope.patch_back(self.store.as_ref()).await;
        resolve_outcome(deleted, patched)
    }

    async fn delete_vm(&self, scope: &Scope) -> Result<(), Error> {
        let backend = self.connect(scope).await?;

        if self.get_vm(backend.as_ref(), scope).await?.is_none() {
            info!(vm = %scope.vm_key(), "VirtualMachine already gone");
            return Ok(());
        }

        match backend
            .delete_vm(
                scope.vm_namespace(),
                &scope.vm_name(),
                self.config.delete_grace_period_seconds,
            )
            .await
        {
            Ok(()) => {
                info!(vm = %scope.vm_key(), "VirtualMachine deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(vm = %scope.vm_key(), "VirtualMachine removed concurrently");
                Ok(())
            }
            Err(source) => Err(Error::Backend {
                action: "delete",
                vm: scope.vm_key(),
                source,
            }),
        }
    }

    /// Read-only: never writes the machine back.
    pub async fn exists(&self, machine: &Machine) -> Result<bool, Error> {
        let scope = self.scope(machine).await?;
        let backend = self.connect(&scope).await?;
        let exists = self.get_vm(backend.as_ref(), &scope).await?.is_some();

        debug!(machine = %machine.name(), vm = %scope.vm_key(), exists, "checked VirtualMachine existence");
        Ok(exists)
    }

    /// Fetches the VM, folding a not-found error into `None`.
    async fn get_vm(
        &self,
        backend: &dyn VirtualizationBackend,
        scope: &Scope,
    ) -> Result<Option<VirtualMachine>, Error> {
        match backend.get_vm(scope.vm_namespace(), &scope.vm_name()).await {
            Ok(vm) => Ok(vm),
            Err(e) if e.is_not_found() => Ok(None),
            Err(source) => Err(Error::Backend {
                action: "get",
                vm: scope.vm_key(),
                source,
            }),
        }
    }

    fn record_vm(&self, scope: &mut Scope, vm: &VirtualMachine) {
        let provider_id = machine_provider_id(
            &self.config.provider_id_scheme,
            scope.vm_namespace(),
            &scope.vm_name(),
        );
        scope.set_provider_id(provider_id);
        scope.set_vm_metadata(vm);
        scope.set_provider_status(Some(vm), Condition::creation_succeeded());
    }

    fn requeue_unless_ready(&self, scope: &Scope, vm: &VirtualMachine) -> Result<(), Error> {
        if vm.is_ready() {
            return Ok(());
        }

        info!(
            vm = %scope.vm_key(),
            after = ?self.config.requeue_after,
            "VirtualMachine not ready yet"
        );
        Err(Error::RequeueAfter {
            after: self.config.requeue_after,
        })
    }
}

/// Provider ID written to machines, e.g. `kubevirt:///c1/m1`.
pub fn machine_provider_id(scheme: &str, namespace: &str, name: &str) -> String {
    format!("{scheme}:///{namespace}/{name}")
}

/// Whether an absent VM may just not be visible yet: the machine already
/// carries a provider ID and its status was last written less than `window` ago.
pub(crate) fn possibly_lagging(
    provider_id: Option<&str>,
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    if provider_id.is_none() {
        return false;
    }

    let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::zero());
    last_updated.is_none_or(|updated| {
        updated
            .checked_add_signed(window)
            .is_some_and(|deadline| deadline > now)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tests::{
        BackendCall, Failure, FakeBackend, Harness, StoreCall, create_test_machine,
    };
    use crate::types::v1alpha1::condition::{
        ConditionStatus, MACHINE_CREATION, REASON_CREATION_FAILED, REASON_CREATION_SUCCEEDED,
        find_condition,
    };
    use crate::types::v1alpha1::provider::{KubevirtMachineProviderStatus, VmState};
    use crate::types::v1beta1::machine::{
        INSTANCE_STATE_ANNOTATION, INSTANCE_TYPE_LABEL, MachineStatus, VM_ID_ANNOTATION,
    };
    use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
    use kube::ResourceExt;

    fn provider_status(machine: &Machine) -> KubevirtMachineProviderStatus {
        machine.decode_provider_status().unwrap()
    }

    /// A machine whose VM was created earlier and recorded `age` ago.
    fn provisioned_machine(name: &str, age: chrono::TimeDelta) -> Machine {
        let mut machine = create_test_machine(name, Some("c1"));
        machine.spec.provider_id = Some(machine_provider_id("kubevirt", "c1", name));

        let mut status = KubevirtMachineProviderStatus {
            vm_id: Some(format!("uid-{name}")),
            vm_state: Some(VmState::CreatedAndReady),
            ..Default::default()
        };
        status.conditions.push(Condition::creation_succeeded());
        machine.status = Some(MachineStatus {
            provider_status: Some(RawExtension(serde_json::to_value(status).unwrap())),
            last_updated: Some(Utc::now() - age),
            node_ref: None,
        });
        machine
    }

    fn seed_vm(harness: &Harness, machine: &Machine) {
        let vm = machine
            .new_virtual_machine(
                &machine.decode_provider_spec().unwrap(),
                "rhcos-source",
                &Default::default(),
            )
            .unwrap();
        harness.backend.insert_vm("c1", vm);
    }

    // Test: machine m1 in cluster c1 gets its provider ID even while the VM boots
    #[tokio::test]
    async fn test_create_not_ready_requeues_with_provider_id_set() {
        let harness = Harness::new(FakeBackend::default());
        let machine = create_test_machine("m1", Some("c1"));

        let err = harness.actuator.create(&machine).await.unwrap_err();

        assert_eq!(err.requeue_after(), Some(Duration::from_secs(20)));
        let patched = harness.store.last_spec_patch().expect("machine written back");
        assert_eq!(patched.spec.provider_id.as_deref(), Some("kubevirt:///c1/m1"));
        assert_eq!(
            patched.annotations().get(INSTANCE_STATE_ANNOTATION).map(String::as_str),
            Some("vmWasCreatedButNotReady")
        );
        assert_eq!(
            harness.backend.calls(),
            vec![BackendCall::Create {
                namespace: "c1".to_owned(),
                name: "m1".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn test_create_ready_records_success() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));

        harness.actuator.create(&machine).await.unwrap();

        let spec = harness.store.last_spec_patch().unwrap();
        assert_eq!(spec.provider_id(), Some("kubevirt:///c1/m1"));
        assert_eq!(
            spec.annotations().get(VM_ID_ANNOTATION).map(String::as_str),
            Some("uid-m1")
        );

        let status = harness.store.last_status_patch().unwrap();
        let provider = provider_status(&status);
        assert_eq!(provider.vm_state, Some(VmState::CreatedAndReady));
        let condition = find_condition(&provider.conditions, MACHINE_CREATION).unwrap();
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.reason, REASON_CREATION_SUCCEEDED);
        assert!(status.last_updated().is_some());
    }

    #[tokio::test]
    async fn test_create_failure_records_failed_condition() {
        let harness = Harness::new(FakeBackend::ready());
        harness.backend.fail("create", [Failure::Timeout]);
        let machine = create_test_machine("m1", Some("c1"));

        let err = harness.actuator.create(&machine).await.unwrap_err();

        assert!(matches!(err, Error::Backend { action: "create", .. }));
        let provider = provider_status(&harness.store.last_status_patch().unwrap());
        let condition = find_condition(&provider.conditions, MACHINE_CREATION).unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, REASON_CREATION_FAILED);
        assert!(condition.message.contains("did not complete"));
        assert_eq!(provider.vm_id, None);
    }

    #[tokio::test]
    async fn test_create_against_existing_vm_does_not_replace_it() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));
        harness.actuator.create(&machine).await.unwrap();
        let first = harness.backend.vm("c1", "m1").unwrap();

        let err = harness.actuator.create(&machine).await.unwrap_err();

        assert!(matches!(err, Error::Backend { action: "create", .. }));
        assert_eq!(harness.backend.vm("c1", "m1").unwrap(), first);
    }

    #[tokio::test]
    async fn test_patch_back_error_beats_requeue() {
        let harness = Harness::new(FakeBackend::default());
        harness.store.fail_patches();
        let machine = create_test_machine("m1", Some("c1"));

        let err = harness.actuator.create(&machine).await.unwrap_err();

        assert_eq!(err.requeue_after(), None);
        assert!(matches!(err, Error::Context { .. }));
    }

    #[tokio::test]
    async fn test_unusable_kubeconfig_is_configuration_error() {
        let harness = Harness::new(FakeBackend::ready());
        harness.builder.reject_credentials();
        let machine = create_test_machine("m1", Some("c1"));

        let err = harness.actuator.create(&machine).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(harness.backend.calls().is_empty());
    }

    // Test: m2 carries an empty cluster-id label
    #[tokio::test]
    async fn test_missing_cluster_id_makes_no_backend_calls() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m2", Some(""));

        let errors = vec![
            harness.actuator.create(&machine).await.unwrap_err(),
            harness.actuator.update(&machine).await.unwrap_err(),
            harness.actuator.delete(&machine).await.unwrap_err(),
            harness.actuator.exists(&machine).await.unwrap_err(),
        ];

        for err in errors {
            assert!(err.is_configuration(), "unexpected error: {err}");
            assert!(err.to_string().contains("machine.openshift.io/cluster-api-cluster"));
        }
        assert!(harness.backend.calls().is_empty());
        assert_eq!(harness.builder.builds(), 0);
        assert!(harness.store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_absent_vm_with_fresh_provider_id_waits() {
        let harness = Harness::new(FakeBackend::ready());
        let mut machine = create_test_machine("m1", Some("c1"));
        machine.spec.provider_id = Some("kubevirt:///c1/m1".to_owned());

        let err = harness.actuator.update(&machine).await.unwrap_err();

        assert_eq!(err.requeue_after(), Some(Duration::from_secs(20)));
        let status = harness.store.last_status_patch().unwrap();
        assert_eq!(status.status, None, "status must not be touched");
    }

    #[tokio::test]
    async fn test_update_absent_vm_recently_recorded_waits() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = provisioned_machine("m1", chrono::TimeDelta::seconds(5));

        let err = harness.actuator.update(&machine).await.unwrap_err();

        assert_eq!(err.requeue_after(), Some(Duration::from_secs(20)));
        let status = harness.store.last_status_patch().unwrap();
        assert_eq!(status.status, machine.status);
    }

    #[tokio::test]
    async fn test_update_absent_vm_with_stale_status_clears_it() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = provisioned_machine("m1", chrono::TimeDelta::minutes(10));

        let err = harness.actuator.update(&machine).await.unwrap_err();

        assert_eq!(err.requeue_after(), Some(Duration::from_secs(180)));
        let provider = provider_status(&harness.store.last_status_patch().unwrap());
        assert_eq!(provider.vm_id, None);
        assert_eq!(provider.vm_state, None);
        let condition = find_condition(&provider.conditions, MACHINE_CREATION).unwrap();
        assert_eq!(condition.status, ConditionStatus::True);
    }

    #[tokio::test]
    async fn test_update_not_ready_still_persists_provider_id() {
        let harness = Harness::new(FakeBackend::default());
        let machine = create_test_machine("m1", Some("c1"));
        seed_vm(&harness, &machine);

        let err = harness.actuator.update(&machine).await.unwrap_err();

        assert_eq!(err.requeue_after(), Some(Duration::from_secs(20)));
        let spec = harness.store.last_spec_patch().unwrap();
        assert_eq!(spec.provider_id(), Some("kubevirt:///c1/m1"));
        assert!(spec.annotations().contains_key(INSTANCE_STATE_ANNOTATION));
    }

    #[tokio::test]
    async fn test_update_drops_instance_type_label_without_machine_type() {
        let harness = Harness::new(FakeBackend::ready());
        let mut machine = create_test_machine("m1", Some("c1"));
        machine
            .labels_mut()
            .insert(INSTANCE_TYPE_LABEL.to_owned(), "q35".to_owned());
        seed_vm(&harness, &machine);
        assert_eq!(harness.backend.vm("c1", "m1").unwrap().machine_type(), None);

        assert!(harness.actuator.update(&machine).await.unwrap());

        let spec = harness.store.last_spec_patch().unwrap();
        assert!(!spec.labels().contains_key(INSTANCE_TYPE_LABEL));
        assert_eq!(
            spec.annotations().get(VM_ID_ANNOTATION).map(String::as_str),
            Some("uid-m1")
        );
    }

    #[tokio::test]
    async fn test_update_carries_existing_resource_version() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));
        seed_vm(&harness, &machine);

        harness.actuator.update(&machine).await.unwrap();

        let calls = harness.backend.calls();
        assert!(calls.contains(&BackendCall::Update {
            namespace: "c1".to_owned(),
            name: "m1".to_owned(),
            resource_version: Some("1".to_owned()),
        }));
        assert_eq!(
            harness.backend.vm("c1", "m1").unwrap().metadata.resource_version.as_deref(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_update_falls_back_to_update_response_when_refetch_fails() {
        let harness = Harness::new(FakeBackend::ready());
        harness.backend.fail("get", [Failure::Pass, Failure::Timeout]);
        let machine = create_test_machine("m1", Some("c1"));
        seed_vm(&harness, &machine);

        harness.actuator.update(&machine).await.unwrap();

        let provider = provider_status(&harness.store.last_status_patch().unwrap());
        assert_eq!(provider.resource_version.as_deref(), Some("2"));
        assert_eq!(provider.vm_state, Some(VmState::CreatedAndReady));
    }

    #[tokio::test]
    async fn test_update_conflict_is_backend_error() {
        let harness = Harness::new(FakeBackend::ready());
        harness.backend.fail("update", [Failure::Conflict]);
        let machine = create_test_machine("m1", Some("c1"));
        seed_vm(&harness, &machine);

        let err = harness.actuator.update(&machine).await.unwrap_err();

        assert!(matches!(err, Error::Backend { action: "update", .. }));
        assert!(!err.is_configuration());
    }

    #[tokio::test]
    async fn test_delete_absent_vm_is_noop() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));

        harness.actuator.delete(&machine).await.unwrap();

        harness.backend.fail("get", [Failure::NotFound]);
        harness.actuator.delete(&machine).await.unwrap();

        assert!(
            !harness
                .backend
                .calls()
                .iter()
                .any(|call| matches!(call, BackendCall::Delete { .. }))
        );
    }

    #[tokio::test]
    async fn test_delete_existing_vm() {
        let config = Config {
            delete_grace_period_seconds: Some(30),
            ..Config::default()
        };
        let harness = Harness::with_config(FakeBackend::ready(), config);
        let machine = create_test_machine("m1", Some("c1"));
        seed_vm(&harness, &machine);

        harness.actuator.delete(&machine).await.unwrap();

        assert!(harness.backend.vm("c1", "m1").is_none());
        assert!(harness.backend.calls().contains(&BackendCall::Delete {
            namespace: "c1".to_owned(),
            name: "m1".to_owned(),
            grace_period_seconds: Some(30),
        }));
    }

    #[tokio::test]
    async fn test_delete_racing_removal_is_success() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));
        seed_vm(&harness, &machine);
        harness.backend.fail("delete", [Failure::NotFound]);

        harness.actuator.delete(&machine).await.unwrap();

        assert!(harness.backend.calls().contains(&BackendCall::Delete {
            namespace: "c1".to_owned(),
            name: "m1".to_owned(),
            grace_period_seconds: None,
        }));
    }

    #[tokio::test]
    async fn test_delete_propagates_lookup_errors() {
        let harness = Harness::new(FakeBackend::ready());
        harness.backend.fail("get", [Failure::Timeout]);
        let machine = create_test_machine("m1", Some("c1"));

        let err = harness.actuator.delete(&machine).await.unwrap_err();

        assert!(matches!(err, Error::Backend { action: "get", .. }));
    }

    #[tokio::test]
    async fn test_exists_is_read_only() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));

        assert!(!harness.actuator.exists(&machine).await.unwrap());
        harness.backend.fail("get", [Failure::NotFound]);
        assert!(!harness.actuator.exists(&machine).await.unwrap());

        seed_vm(&harness, &machine);
        assert!(harness.actuator.exists(&machine).await.unwrap());

        harness.backend.fail("get", [Failure::Timeout]);
        assert!(harness.actuator.exists(&machine).await.is_err());

        assert!(harness.store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_spec_patch_precedes_status_patch() {
        let harness = Harness::new(FakeBackend::ready());
        let machine = create_test_machine("m1", Some("c1"));

        harness.actuator.create(&machine).await.unwrap();

        let calls = harness.store.calls();
        assert!(matches!(
            calls.as_slice(),
            [StoreCall::Patch(_), StoreCall::PatchStatus(_)]
        ));
    }

    #[test]
    fn test_possibly_lagging_window() {
        let now = Utc::now();
        let window = Duration::from_secs(20);

        assert!(!possibly_lagging(None, None, now, window));
        assert!(possibly_lagging(Some("kubevirt:///c1/m1"), None, now, window));
        assert!(possibly_lagging(
            Some("kubevirt:///c1/m1"),
            Some(now - TimeDelta::seconds(19)),
            now,
            window
        ));
        assert!(!possibly_lagging(
            Some("kubevirt:///c1/m1"),
            Some(now - TimeDelta::seconds(20)),
            now,
            window
        ));
    }

    #[test]
    fn test_machine_provider_id_format() {
        assert_eq!(machine_provider_id("kubevirt", "c1", "m1"), "kubevirt:///c1/m1");
    }
}
