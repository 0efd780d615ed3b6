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
use crate::types::v1beta1::machine::{MACHINE_FINALIZER, Machine};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Secret};
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Resource, ResourceExt};
use serde_json::{Map, Value};
use snafu::Snafu;
use snafu::futures::TryFutureExt;
use std::fmt;
use tracing::debug;

/// Secret key holding the kubeconfig of the infrastructure cluster.
pub const KUBECONFIG_KEY: &str = "kubeconfig";

const CONTROLLER_NAME: &str = "kubevirt-machine-controller";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Kubernetes API error: {}", source))]
    Kube { source: kube::Error },

    #[snafu(display("record event error: {}", source))]
    Record { source: kube::Error },

    #[snafu(transparent)]
    Types { source: types::error::Error },

    #[snafu(display("conflict writing {}: the object was modified concurrently", name))]
    Conflict { name: String },

    #[snafu(display("credential secret '{}/{}' not found", namespace, name))]
    CredentialSecretNotFound { name: String, namespace: String },

    #[snafu(display("credential secret '{}' missing required key '{}'", secret_name, key))]
    CredentialSecretMissingKey { secret_name: String, key: String },

    #[snafu(display(
        "credential secret '{}' has invalid data encoding for key '{}'",
        secret_name,
        key
    ))]
    CredentialSecretInvalidEncoding { secret_name: String, key: String },

    #[snafu(transparent)]
    Serde { source: serde_json::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            Error::CredentialSecretNotFound { .. } => true,
            _ => false,
        }
    }

    /// Whether the error describes the credential secret itself rather than
    /// a failure to reach it.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            Error::CredentialSecretNotFound { .. }
                | Error::CredentialSecretMissingKey { .. }
                | Error::CredentialSecretInvalidEncoding { .. }
        )
    }
}

fn kube_error(name: &str, source: kube::Error) -> Error {
    match source {
        kube::Error::Api(ae) if ae.code == 409 => Error::Conflict {
            name: name.to_owned(),
        },
        source => Error::Kube { source },
    }
}

/// Opaque credential blob for the virtualization backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(pub Vec<u8>);

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials(<{} bytes redacted>)", self.0.len())
    }
}

/// Writes machines back to the cluster with merge-patch semantics against
/// the object as it was first observed.
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// Patches spec and metadata. The returned object's status must not be trusted.
    async fn patch(&self, machine: &Machine, original: &Machine) -> Result<Machine, Error>;

    /// Patches the status subresource.
    async fn patch_status(&self, machine: &Machine, original: &Machine) -> Result<Machine, Error>;
}

#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self, name: &str, namespace: &str) -> Result<Credentials, Error>;
}

#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get_node(&self, name: &str) -> Result<Option<Node>, Error>;

    async fn patch_provider_id(&self, name: &str, provider_id: &str) -> Result<(), Error>;
}

pub struct Context {
    pub(crate) client: kube::Client,
    pub(crate) recorder: Recorder,
}

impl Context {
    pub fn new(client: kube::Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.into(),
            instance: std::env::var("HOSTNAME").ok(),
        };

        let recorder = Recorder::new(client.clone(), reporter);
        Self { client, recorder }
    }

    /// send event
    #[inline]
    pub async fn record(
        &self,
        resource: &Machine,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) -> Result<(), Error> {
        self.recorder
            .publish(
                &Event {
                    type_: event_type,
                    reason: reason.to_owned(),
                    note: Some(message.into()),
                    action: "Reconcile".into(),
                    secondary: None,
                },
                &resource.object_ref(&()),
            )
            .context(RecordSnafu)
            .await
    }

    fn machines(&self, machine: &Machine) -> Result<Api<Machine>, Error> {
        Ok(Api::namespaced(self.client.clone(), &machine.namespace()?))
    }

    pub async fn add_finalizer(&self, machine: &Machine) -> Result<(), Error> {
        if machine.has_finalizer() {
            return Ok(());
        }

        let mut finalizers = machine.finalizers().to_vec();
        finalizers.push(MACHINE_FINALIZER.to_owned());
        self.patch_finalizers(machine, finalizers).await
    }

    pub async fn remove_finalizer(&self, machine: &Machine) -> Result<(), Error> {
        if !machine.has_finalizer() {
            return Ok(());
        }

        let finalizers = machine
            .finalizers()
            .iter()
            .filter(|f| *f != MACHINE_FINALIZER)
            .cloned()
            .collect();
        self.patch_finalizers(machine, finalizers).await
    }

    async fn patch_finalizers(&self, machine: &Machine, finalizers: Vec<String>) -> Result<(), Error> {
        let name = machine.name();
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers
            }
        });

        self.machines(machine)?
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| kube_error(&name, e))?;
        Ok(())
    }
}

#[async_trait]
impl MachineStore for Context {
    async fn patch(&self, machine: &Machine, original: &Machine) -> Result<Machine, Error> {
        let patch = merge_patch(&without_status(original)?, &without_status(machine)?);
        if is_empty_patch(&patch) {
            debug!(machine = %machine.name(), "spec unchanged, skipping patch");
            return Ok(machine.clone());
        }

        let name = machine.name();
        self.machines(machine)?
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| kube_error(&name, e))
    }

    async fn patch_status(&self, machine: &Machine, original: &Machine) -> Result<Machine, Error> {
        let patch = merge_patch(&status_only(original)?, &status_only(machine)?);
        if is_empty_patch(&patch) {
            debug!(machine = %machine.name(), "status unchanged, skipping patch");
            return Ok(machine.clone());
        }

        let name = machine.name();
        self.machines(machine)?
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| kube_error(&name, e))
    }
}

#[async_trait]
impl CredentialResolver for Context {
    /// Reads the kubeconfig from the named Secret.
    ///
    /// A missing Secret, a missing `kubeconfig` key or non UTF-8 content are
    /// reported as their own variants so callers can treat them as permanent.
    async fn resolve(&self, name: &str, namespace: &str) -> Result<Credentials, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .context(KubeSnafu)
            .await?
            .ok_or_else(|| Error::CredentialSecretNotFound {
                name: name.to_owned(),
                namespace: namespace.to_owned(),
            })?;

        credentials_from_secret(name, &secret)
    }
}

pub(crate) fn credentials_from_secret(name: &str, secret: &Secret) -> Result<Credentials, Error> {
    let Some(bytes) = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_KEY))
        .filter(|bytes| !bytes.0.is_empty())
    else {
        return CredentialSecretMissingKeySnafu {
            secret_name: name,
            key: KUBECONFIG_KEY,
        }
        .fail();
    };

    if std::str::from_utf8(&bytes.0).is_err() {
        return CredentialSecretInvalidEncodingSnafu {
            secret_name: name,
            key: KUBECONFIG_KEY,
        }
        .fail();
    }

    Ok(Credentials(bytes.0.clone()))
}

#[async_trait]
impl NodeStore for Context {
    async fn get_node(&self, name: &str) -> Result<Option<Node>, Error> {
        let api: Api<Node> = Api::all(self.client.clone());
        api.get_opt(name).context(KubeSnafu).await
    }

    async fn patch_provider_id(&self, name: &str, provider_id: &str) -> Result<(), Error> {
        let api: Api<Node> = Api::all(self.client.clone());
        let patch = serde_json::json!({
            "spec": {
                "providerID": provider_id
            }
        });

        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| kube_error(name, e))?;
        Ok(())
    }
}

fn without_status(machine: &Machine) -> Result<Value, Error> {
    let mut value = serde_json::to_value(machine)?;
    if let Value::Object(map) = &mut value {
        map.remove("status");
    }
    Ok(value)
}

fn status_only(machine: &Machine) -> Result<Value, Error> {
    Ok(serde_json::json!({ "status": serde_json::to_value(&machine.status)? }))
}

fn is_empty_patch(patch: &Value) -> bool {
    patch.as_object().is_some_and(Map::is_empty)
}

/// Computes an RFC 7386 merge patch turning `original` into `modified`.
pub(crate) fn merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(original), Value::Object(modified)) => {
            let mut patch = Map::new();
            for (key, value) in modified {
                match original.get(key) {
                    Some(previous) if previous == value => {}
                    Some(previous) => {
                        patch.insert(key.clone(), merge_patch(previous, value));
                    }
                    None => {
                        patch.insert(key.clone(), value.clone());
                    }
                }
            }
            for key in original.keys() {
                if !modified.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        (_, modified) => modified.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tests::create_test_machine;
    use k8s_openapi::ByteString;
    use serde_json::json;

    #[test]
    fn test_merge_patch_contains_only_changes() {
        let original = json!({"metadata": {"name": "m1", "labels": {"a": "1"}}, "spec": {"x": 1}});
        let modified = json!({"metadata": {"name": "m1", "labels": {"a": "1", "b": "2"}}, "spec": {}});

        let patch = merge_patch(&original, &modified);
        assert_eq!(
            patch,
            json!({"metadata": {"labels": {"b": "2"}}, "spec": {"x": null}})
        );
    }

    #[test]
    fn test_merge_patch_of_identical_objects_is_empty() {
        let machine = create_test_machine("m1", Some("c1"));
        let value = without_status(&machine).unwrap();
        assert!(is_empty_patch(&merge_patch(&value, &value)));
    }

    #[test]
    fn test_spec_patch_ignores_status() {
        let original = create_test_machine("m1", Some("c1"));
        let mut machine = original.clone();
        machine.status = Some(Default::default());
        machine.spec.provider_id = Some("kubevirt:///c1/m1".to_owned());

        let patch = merge_patch(
            &without_status(&original).unwrap(),
            &without_status(&machine).unwrap(),
        );
        assert_eq!(patch, json!({"spec": {"providerID": "kubevirt:///c1/m1"}}));
    }

    fn secret(data: Option<Vec<u8>>) -> Secret {
        Secret {
            data: data.map(|bytes| {
                [(KUBECONFIG_KEY.to_owned(), ByteString(bytes))]
                    .into_iter()
                    .collect()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_credentials_from_secret() {
        let credentials = credentials_from_secret("infra", &secret(Some(b"apiVersion: v1".to_vec())))
            .expect("kubeconfig should be accepted");
        assert_eq!(credentials.0, b"apiVersion: v1".to_vec());
        assert!(!format!("{credentials:?}").contains("apiVersion"));
    }

    #[test]
    fn test_credentials_missing_key_is_invalid() {
        let err = credentials_from_secret("infra", &secret(None)).expect_err("key is missing");
        assert!(err.is_invalid_credentials());
        assert!(matches!(err, Error::CredentialSecretMissingKey { .. }));
    }

    #[test]
    fn test_credentials_invalid_encoding_is_invalid() {
        let err = credentials_from_secret("infra", &secret(Some(vec![0xff, 0xfe])))
            .expect_err("content is not UTF-8");
        assert!(err.is_invalid_credentials());
        assert!(matches!(err, Error::CredentialSecretInvalidEncoding { .. }));
    }
}
