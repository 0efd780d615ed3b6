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

use crate::types::v1beta1::machine::virtual_machine::{
    DEFAULT_BOOT_VOLUME_ACCESS_MODE, DEFAULT_BOOT_VOLUME_SIZE, DEFAULT_MEMORY,
    VirtualMachineDefaults,
};
use clap::Args;
use std::time::Duration;

pub const DEFAULT_PROVIDER_ID_SCHEME: &str = "kubevirt";
pub const DEFAULT_REQUEUE_AFTER_SECS: u64 = 20;
pub const DEFAULT_REQUEUE_AFTER_FATAL_SECS: u64 = 180;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESYNC_SECS: u64 = 600;

/// Where the Node Provider-ID Reconciler looks VM instances up.
#[derive(Clone, Debug, PartialEq)]
pub struct InfraCluster {
    pub namespace: String,
    pub credentials_secret: String,
    pub credentials_namespace: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub provider_id_scheme: String,

    /// Delay for state that is expected to converge shortly (VM not ready, lagging reads).
    pub requeue_after: Duration,

    /// Delay for a VM that vanished underneath a stable machine.
    pub requeue_after_fatal: Duration,

    pub vm_defaults: VirtualMachineDefaults,

    pub backend_timeout: Duration,

    pub delete_grace_period_seconds: Option<u32>,

    /// Periodic re-reconcile of converged machines.
    pub resync: Duration,

    pub infra: Option<InfraCluster>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_id_scheme: DEFAULT_PROVIDER_ID_SCHEME.to_owned(),
            requeue_after: Duration::from_secs(DEFAULT_REQUEUE_AFTER_SECS),
            requeue_after_fatal: Duration::from_secs(DEFAULT_REQUEUE_AFTER_FATAL_SECS),
            vm_defaults: VirtualMachineDefaults::default(),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            delete_grace_period_seconds: None,
            resync: Duration::from_secs(DEFAULT_RESYNC_SECS),
            infra: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Scheme of provider IDs written to machines and nodes
    #[arg(long, default_value = DEFAULT_PROVIDER_ID_SCHEME)]
    pub provider_id_scheme: String,

    /// Requeue delay while a VM converges
    #[arg(long, default_value_t = DEFAULT_REQUEUE_AFTER_SECS)]
    pub requeue_after_secs: u64,

    /// Requeue delay after a VM disappeared underneath its machine
    #[arg(long, default_value_t = DEFAULT_REQUEUE_AFTER_FATAL_SECS)]
    pub requeue_after_fatal_secs: u64,

    /// Memory request used when a provider spec does not set one
    #[arg(long, default_value = DEFAULT_MEMORY)]
    pub default_memory: String,

    /// Size of each VM boot volume
    #[arg(long, default_value = DEFAULT_BOOT_VOLUME_SIZE)]
    pub boot_volume_size: String,

    /// Access mode of each VM boot volume
    #[arg(long, default_value = DEFAULT_BOOT_VOLUME_ACCESS_MODE)]
    pub boot_volume_access_mode: String,

    /// Storage class of each VM boot volume; the cluster default when unset
    #[arg(long)]
    pub boot_volume_storage_class: Option<String>,

    /// Upper bound for a single call against the virtualization backend
    #[arg(long, default_value_t = DEFAULT_BACKEND_TIMEOUT_SECS)]
    pub backend_timeout_secs: u64,

    /// Grace period passed when deleting VMs
    #[arg(long)]
    pub delete_grace_period_secs: Option<u32>,

    /// Re-reconcile interval for converged machines
    #[arg(long, default_value_t = DEFAULT_RESYNC_SECS)]
    pub resync_secs: u64,

    /// Namespace of the VM instances backing this cluster's nodes
    #[arg(long, requires = "infra_credentials_secret")]
    pub infra_namespace: Option<String>,

    /// Secret holding the infrastructure kubeconfig; enables the node provider-ID loop
    #[arg(long, requires = "infra_namespace")]
    pub infra_credentials_secret: Option<String>,

    /// Namespace of the infrastructure credentials secret
    #[arg(long, default_value = "default")]
    pub infra_credentials_namespace: String,
}

impl From<ServerArgs> for Config {
    fn from(args: ServerArgs) -> Self {
        let infra = match (args.infra_namespace, args.infra_credentials_secret) {
            (Some(namespace), Some(credentials_secret)) => Some(InfraCluster {
                namespace,
                credentials_secret,
                credentials_namespace: args.infra_credentials_namespace,
            }),
            _ => None,
        };

        Self {
            provider_id_scheme: args.provider_id_scheme,
            requeue_after: Duration::from_secs(args.requeue_after_secs),
            requeue_after_fatal: Duration::from_secs(args.requeue_after_fatal_secs),
            vm_defaults: VirtualMachineDefaults {
                memory: args.default_memory,
                boot_volume_size: args.boot_volume_size,
                boot_volume_access_mode: args.boot_volume_access_mode,
                boot_volume_storage_class: args.boot_volume_storage_class,
            },
            backend_timeout: Duration::from_secs(args.backend_timeout_secs),
            delete_grace_period_seconds: args.delete_grace_period_secs,
            resync: Duration::from_secs(args.resync_secs),
            infra,
        }
    }
}
