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

//! The virtualization backend: KubeVirt running on an infrastructure cluster.

use crate::context::Credentials;
use crate::types::kubevirt::{VirtualMachine, VirtualMachineInstance};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, ResourceExt};
use snafu::{ResultExt, Snafu};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{} {}/{} not found", kind, namespace, name))]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[snafu(display("conflict on {} {}/{}", kind, namespace, name))]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[snafu(display("KubeVirt API error: {}", source))]
    Api { source: kube::Error },

    #[snafu(display("{} did not complete within {:?}", operation, timeout))]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[snafu(display("invalid infrastructure kubeconfig: {}", source))]
    Kubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("failed to build KubeVirt client: {}", source))]
    Client { source: kube::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The credentials cannot produce a client no matter how often we retry.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Error::Kubeconfig { .. })
    }
}

#[async_trait]
pub trait VirtualizationBackend: Send + Sync {
    async fn create_vm(&self, namespace: &str, vm: &VirtualMachine)
    -> Result<VirtualMachine, Error>;

    /// Returns `Ok(None)` when the VM does not exist.
    async fn get_vm(&self, namespace: &str, name: &str) -> Result<Option<VirtualMachine>, Error>;

    /// Replaces the VM; `vm` must carry the resource version it was derived from.
    async fn update_vm(&self, namespace: &str, vm: &VirtualMachine)
    -> Result<VirtualMachine, Error>;

    async fn delete_vm(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: Option<u32>,
    ) -> Result<(), Error>;

    async fn get_vm_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<VirtualMachineInstance, Error>;
}

/// Turns resolved credentials into a backend session.
#[async_trait]
pub trait BackendBuilder: Send + Sync {
    async fn build(&self, credentials: &Credentials)
    -> Result<Arc<dyn VirtualizationBackend>, Error>;
}

pub struct KubevirtBackend {
    client: Client,
    timeout: Duration,
}

impl KubevirtBackend {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn vms(&self, namespace: &str) -> Api<VirtualMachine> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn instances(&self, namespace: &str) -> Api<VirtualMachineInstance> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Bounds a backend call by `timeout`; dropping the returned future aborts the call.
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> Result<Result<T, kube::Error>, Error>
where
    F: Future<Output = Result<T, kube::Error>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| Error::Timeout { operation, timeout })
}

fn classify(kind: &'static str, namespace: &str, name: &str, source: kube::Error) -> Error {
    match source {
        kube::Error::Api(ae) if ae.code == 404 => Error::NotFound {
            kind,
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        },
        kube::Error::Api(ae) if ae.code == 409 => Error::Conflict {
            kind,
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        },
        source => Error::Api { source },
    }
}

const VM_KIND: &str = "VirtualMachine";
const VMI_KIND: &str = "VirtualMachineInstance";

#[async_trait]
impl VirtualizationBackend for KubevirtBackend {
    async fn create_vm(
        &self,
        namespace: &str,
        vm: &VirtualMachine,
    ) -> Result<VirtualMachine, Error> {
        let name = vm.name_any();
        debug!(namespace, vm = %name, "creating VirtualMachine");
        bounded(
            "create VirtualMachine",
            self.timeout,
            self.vms(namespace).create(&PostParams::default(), vm),
        )
        .await?
        .map_err(|e| classify(VM_KIND, namespace, &name, e))
    }

    async fn get_vm(&self, namespace: &str, name: &str) -> Result<Option<VirtualMachine>, Error> {
        bounded(
            "get VirtualMachine",
            self.timeout,
            self.vms(namespace).get_opt(name),
        )
        .await?
        .map_err(|e| classify(VM_KIND, namespace, name, e))
    }

    async fn update_vm(
        &self,
        namespace: &str,
        vm: &VirtualMachine,
    ) -> Result<VirtualMachine, Error> {
        let name = vm.name_any();
        debug!(namespace, vm = %name, resource_version = ?vm.metadata.resource_version, "replacing VirtualMachine");
        bounded(
            "update VirtualMachine",
            self.timeout,
            self.vms(namespace).replace(&name, &PostParams::default(), vm),
        )
        .await?
        .map_err(|e| classify(VM_KIND, namespace, &name, e))
    }

    async fn delete_vm(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: Option<u32>,
    ) -> Result<(), Error> {
        let params = DeleteParams {
            grace_period_seconds,
            ..Default::default()
        };
        bounded(
            "delete VirtualMachine",
            self.timeout,
            self.vms(namespace).delete(name, &params),
        )
        .await?
        .map(|_| ())
        .map_err(|e| classify(VM_KIND, namespace, name, e))
    }

    async fn get_vm_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<VirtualMachineInstance, Error> {
        bounded(
            "get VirtualMachineInstance",
            self.timeout,
            self.instances(namespace).get(name),
        )
        .await?
        .map_err(|e| classify(VMI_KIND, namespace, name, e))
    }
}

/// Builds a [`KubevirtBackend`] from a kubeconfig blob.
pub struct KubevirtBackendBuilder {
    timeout: Duration,
}

impl KubevirtBackendBuilder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl BackendBuilder for KubevirtBackendBuilder {
    async fn build(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn VirtualizationBackend>, Error> {
        let kubeconfig =
            Kubeconfig::from_yaml(&String::from_utf8_lossy(&credentials.0)).context(KubeconfigSnafu)?;
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context(KubeconfigSnafu)?;
        let client = Client::try_from(config).context(ClientSnafu)?;

        Ok(Arc::new(KubevirtBackend::new(client, self.timeout)))
    }
}
