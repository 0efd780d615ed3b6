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

use crate::actuator::Actuator;
use crate::backend::{BackendBuilder, KubevirtBackendBuilder};
use crate::config::Config;
use crate::context::Context;
use crate::reconcile::node::{NodeReconciler, node_error_policy, reconcile_node};
use crate::reconcile::{Operator, error_policy, reconcile_machine};
use crate::types::v1beta1::machine::Machine;
use futures::StreamExt;
use k8s_openapi::api::core::v1 as corev1;
use kube::CustomResourceExt;
use kube::runtime::{Controller, watcher};
use kube::{Api, Client};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod actuator;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod reconcile;
pub mod scope;
pub mod types;


shadow_rs::shadow!(build);

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    info!(
        version = build::PKG_VERSION,
        commit = build::SHORT_COMMIT,
        built = build::BUILD_TIME,
        "starting kubevirt machine controller"
    );

    let client = Client::try_default().await?;
    let context = Arc::new(Context::new(client.clone()));
    let backends: Arc<dyn BackendBuilder> =
        Arc::new(KubevirtBackendBuilder::new(config.backend_timeout));

    let nodes = config.infra.clone().map(|infra| {
        NodeReconciler::new(
            context.clone(),
            context.clone(),
            backends.clone(),
            infra,
            config.provider_id_scheme.clone(),
        )
    });
    let node_loop_enabled = nodes.is_some();
    let actuator = Actuator::new(config, context.clone(), context.clone(), backends);
    let operator = Arc::new(Operator::new(context, actuator, nodes));

    let machines = Controller::new(Api::<Machine>::all(client.clone()), watcher::Config::default())
        .run(reconcile_machine, error_policy, operator.clone())
        .for_each(|res| async move {
            match res {
                Ok((machine, _)) => info!("reconciled successful, object{:?}", machine.name),
                Err(e) => warn!("reconcile failed: {}", e),
            }
        });

    let nodes = async {
        if !node_loop_enabled {
            info!("no infrastructure credentials configured, node provider-ID reconciler disabled");
            return;
        }

        Controller::new(Api::<corev1::Node>::all(client.clone()), watcher::Config::default())
            .run(reconcile_node, node_error_policy, operator.clone())
            .for_each(|res| async move {
                match res {
                    Ok((node, _)) => info!("reconciled node, object{:?}", node.name),
                    Err(e) => warn!("node reconcile failed: {}", e),
                }
            })
            .await;
    };

    futures::join!(machines, nodes);

    Ok(())
}

pub async fn crd(file: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer: Pin<Box<dyn AsyncWrite + Send>> = if let Some(file) = file {
        Box::pin(
            tokio::fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(file)
                .await?,
        )
    } else {
        Box::pin(tokio::io::stdout())
    };

    writer
        .write_all(serde_yaml_ng::to_string(&Machine::crd())?.as_bytes())
        .await?;
    writer.flush().await?;

    Ok(())
}
