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

use super::Machine;
use crate::types;
use crate::types::error::NoNamespaceSnafu;
use crate::types::kubevirt::{
    CloudInitConfigDriveSource, DataVolumeSource, DataVolumeSourcePvc, DataVolumeSpec,
    DataVolumeTemplateSpec, DataVolumeVolumeSource, Devices, Disk, DiskTarget, DomainMachine,
    DomainSpec, ResourceRequirements, SecretReference, VirtualMachine, VirtualMachineInstanceSpec,
    VirtualMachineInstanceTemplateSpec, VirtualMachineSpec, Volume,
};
use crate::types::quantity;
use crate::types::v1alpha1::provider::KubevirtMachineProviderSpec;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use snafu::OptionExt;
use std::collections::BTreeMap;

pub const DEFAULT_MEMORY: &str = "2048M";
pub const DEFAULT_BOOT_VOLUME_SIZE: &str = "35Gi";
pub const DEFAULT_BOOT_VOLUME_ACCESS_MODE: &str = "ReadWriteOnce";

const VM_LABEL: &str = "kubevirt.io/vm";
const DISK_BUS: &str = "virtio";
const USER_DATA_DISK_NAME: &str = "cloudinitdisk";

/// Sizing applied when a provider spec leaves resources unspecified.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualMachineDefaults {
    pub memory: String,
    pub boot_volume_size: String,
    pub boot_volume_access_mode: String,
    pub boot_volume_storage_class: Option<String>,
}

impl Default for VirtualMachineDefaults {
    fn default() -> Self {
        Self {
            memory: DEFAULT_MEMORY.to_owned(),
            boot_volume_size: DEFAULT_BOOT_VOLUME_SIZE.to_owned(),
            boot_volume_access_mode: DEFAULT_BOOT_VOLUME_ACCESS_MODE.to_owned(),
            boot_volume_storage_class: None,
        }
    }
}

pub fn boot_volume_name(vm_name: &str) -> String {
    format!("{vm_name}-bootvolume")
}

pub fn boot_disk_name(vm_name: &str) -> String {
    format!("{vm_name}-datavolumedisk1")
}

impl Machine {
    /// Derives the VirtualMachine backing this machine.
    ///
    /// The result depends only on the machine, its decoded provider spec, the
    /// source volume and the defaults, so repeated calls yield identical
    /// descriptors. Malformed quantities are rejected rather than defaulted.
    pub fn new_virtual_machine(
        &self,
        provider_spec: &KubevirtMachineProviderSpec,
        source_volume_name: &str,
        defaults: &VirtualMachineDefaults,
    ) -> Result<VirtualMachine, types::error::Error> {
        let vm_name = self.name();
        let namespace = self.vm_namespace().context(NoNamespaceSnafu)?;
        let boot_volume = boot_volume_name(&vm_name);
        let boot_disk = boot_disk_name(&vm_name);

        let mut requests = BTreeMap::new();
        let memory = provider_spec
            .requested_memory
            .as_deref()
            .unwrap_or(&defaults.memory);
        requests.insert("memory".to_owned(), quantity::parse("requestedMemory", memory)?);
        if let Some(cpu) = provider_spec.requested_cpu.as_deref() {
            requests.insert("cpu".to_owned(), quantity::parse("requestedCpu", cpu)?);
        }

        let mut disks = vec![Disk {
            name: boot_disk.clone(),
            disk: Some(DiskTarget {
                bus: Some(DISK_BUS.to_owned()),
            }),
        }];
        let mut volumes = vec![Volume {
            name: boot_disk,
            data_volume: Some(DataVolumeVolumeSource {
                name: boot_volume.clone(),
            }),
            ..Default::default()
        }];

        if let Some(secret) = provider_spec
            .user_data_secret_name
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            disks.push(Disk {
                name: USER_DATA_DISK_NAME.to_owned(),
                disk: Some(DiskTarget {
                    bus: Some(DISK_BUS.to_owned()),
                }),
            });
            volumes.push(Volume {
                name: USER_DATA_DISK_NAME.to_owned(),
                cloud_init_config_drive: Some(CloudInitConfigDriveSource {
                    secret_ref: Some(SecretReference {
                        name: secret.to_owned(),
                    }),
                }),
                ..Default::default()
            });
        }

        let labels: BTreeMap<String, String> =
            [(VM_LABEL.to_owned(), vm_name.clone())].into_iter().collect();

        Ok(VirtualMachine {
            metadata: metav1::ObjectMeta {
                name: Some(vm_name),
                namespace: Some(namespace.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: VirtualMachineSpec {
                running: Some(true),
                template: VirtualMachineInstanceTemplateSpec {
                    metadata: Some(metav1::ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(VirtualMachineInstanceSpec {
                        domain: DomainSpec {
                            resources: ResourceRequirements {
                                requests,
                                ..Default::default()
                            },
                            machine: provider_spec
                                .machine_type
                                .clone()
                                .filter(|t| !t.is_empty())
                                .map(|type_| DomainMachine { type_ }),
                            devices: Devices { disks },
                        },
                        volumes,
                        termination_grace_period_seconds: None,
                    }),
                },
                data_volume_templates: vec![self.boot_volume_template(
                    boot_volume,
                    &namespace,
                    source_volume_name,
                    defaults,
                )?],
            },
            status: None,
        })
    }

    fn boot_volume_template(
        &self,
        name: String,
        namespace: &str,
        source_volume_name: &str,
        defaults: &VirtualMachineDefaults,
    ) -> Result<DataVolumeTemplateSpec, types::error::Error> {
        let storage = quantity::parse("bootVolumeSize", &defaults.boot_volume_size)?;

        Ok(DataVolumeTemplateSpec {
            metadata: metav1::ObjectMeta {
                name: Some(name),
                ..Default::default()
            },
            spec: DataVolumeSpec {
                source: Some(DataVolumeSource {
                    pvc: Some(DataVolumeSourcePvc {
                        name: source_volume_name.to_owned(),
                        namespace: namespace.to_owned(),
                    }),
                }),
                pvc: Some(corev1::PersistentVolumeClaimSpec {
                    access_modes: Some(vec![defaults.boot_volume_access_mode.clone()]),
                    resources: Some(corev1::VolumeResourceRequirements {
                        requests: Some([("storage".to_owned(), storage)].into_iter().collect()),
                        ..Default::default()
                    }),
                    storage_class_name: defaults.boot_volume_storage_class.clone(),
                    ..Default::default()
                }),
            },
        })
    }
}
