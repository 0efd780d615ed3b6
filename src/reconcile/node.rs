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

//! Stamps workload-cluster Nodes with the provider ID of the VM instance
//! they run on.

use super::{ERROR_REQUEUE_AFTER, Operator};
use crate::backend::BackendBuilder;
use crate::config::InfraCluster;
use crate::context::{CredentialResolver, NodeStore};
use crate::error::{BackendSnafu, Error};
use crate::scope;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use kube::runtime::controller::Action;
use snafu::ResultExt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct NodeReconciler {
    nodes: Arc<dyn NodeStore>,
    resolver: Arc<dyn CredentialResolver>,
    backends: Arc<dyn BackendBuilder>,
    infra: InfraCluster,
    scheme: String,
}

impl NodeReconciler {
    pub fn new(
        nodes: Arc<dyn NodeStore>,
        resolver: Arc<dyn CredentialResolver>,
        backends: Arc<dyn BackendBuilder>,
        infra: InfraCluster,
        scheme: String,
    ) -> Self {
        Self {
            nodes,
            resolver,
            backends,
            infra,
            scheme,
        }
    }

    /// Sets `spec.providerID` on a node that does not carry one yet.
    pub async fn reconcile_provider_id(&self, node: &Node) -> Result<(), Error> {
        let name = node.name_any();

        // the watch event may be older than the node
        let Some(node) = self.nodes.get_node(&name).await? else {
            debug!(node = %name, "node no longer exists");
            return Ok(());
        };
        if has_provider_id(&node) {
            return Ok(());
        }

        let InfraCluster {
            namespace,
            credentials_secret,
            credentials_namespace,
        } = &self.infra;
        let credentials =
            scope::resolve_credentials(self.resolver.as_ref(), credentials_secret, credentials_namespace)
                .await?;
        let backend = scope::connect(
            self.backends.as_ref(),
            &credentials,
            credentials_secret,
            credentials_namespace,
        )
        .await?;

        let instance = backend
            .get_vm_instance(namespace, &name)
            .await
            .context(BackendSnafu {
                action: "look up instance of",
                vm: format!("{namespace}/{name}"),
            })?;

        let provider_id = node_provider_id(
            &self.scheme,
            instance.namespace().as_deref().unwrap_or(namespace.as_str()),
            &instance.name_any(),
        );
        self.nodes.patch_provider_id(&name, &provider_id).await?;
        info!(node = %name, provider_id, "assigned provider ID to node");
        Ok(())
    }
}

fn has_provider_id(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|spec| spec.provider_id.as_deref())
        .is_some_and(|id| !id.is_empty())
}

/// Provider ID written to nodes, e.g. `kubevirt://tenant/worker-0`.
pub fn node_provider_id(scheme: &str, namespace: &str, name: &str) -> String {
    format!("{scheme}://{namespace}/{name}")
}

pub async fn reconcile_node(node: Arc<Node>, operator: Arc<Operator>) -> Result<Action, Error> {
    if let Some(nodes) = operator.nodes.as_ref() {
        nodes.reconcile_provider_id(&node).await?;
    }
    Ok(Action::await_change())
}

pub fn node_error_policy(_node: Arc<Node>, error: &Error, _operator: Arc<Operator>) -> Action {
    if error.is_configuration() {
        Action::await_change()
    } else {
        Action::requeue(ERROR_REQUEUE_AFTER)
    }
}
