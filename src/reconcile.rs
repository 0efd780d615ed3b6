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
use crate::context::Context;
use crate::error::Error;
use crate::types::v1beta1::machine::Machine;
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tracing::{debug, warn};

pub mod node;

/// Delay before retrying a machine that failed for a reason other than its configuration.
pub const ERROR_REQUEUE_AFTER: Duration = Duration::from_secs(10);

pub struct Operator {
    pub(crate) context: Arc<Context>,
    pub(crate) actuator: Actuator,
    pub(crate) nodes: Option<node::NodeReconciler>,
}

impl Operator {
    pub fn new(context: Arc<Context>, actuator: Actuator, nodes: Option<node::NodeReconciler>) -> Self {
        Self {
            context,
            actuator,
            nodes,
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    fn succeeded_reason(self) -> &'static str {
        match self {
            Operation::Create => "Created",
            Operation::Update => "Updated",
            Operation::Delete => "Deleted",
        }
    }

    fn failed_reason(self) -> &'static str {
        match self {
            Operation::Create => "FailedCreate",
            Operation::Update => "FailedUpdate",
            Operation::Delete => "FailedDelete",
        }
    }
}

pub async fn reconcile_machine(machine: Arc<Machine>, operator: Arc<Operator>) -> Result<Action, Error> {
    let resync = operator.actuator.config().resync;

    if machine.metadata.deletion_timestamp.is_some() {
        debug!(
            "machine {} is deleted, deletion_timestamp is {:?}",
            machine.name(),
            machine.metadata.deletion_timestamp
        );
        if !machine.has_finalizer() {
            return Ok(Action::await_change());
        }

        let result = operator.actuator.delete(&machine).await;
        if result.is_err() {
            operator.publish(&machine, Operation::Delete, &result).await;
            return result.map(|()| Action::await_change());
        }

        let vm_exists = operator.actuator.exists(&machine).await?;
        if let Some(action) = deletion_action(vm_exists, operator.actuator.config().requeue_after) {
            debug!("machine {} waits for its VirtualMachine to terminate", machine.name());
            return Ok(action);
        }

        operator.publish(&machine, Operation::Delete, &result).await;
        operator.context.remove_finalizer(&machine).await?;
        return Ok(Action::await_change());
    }

    if !machine.has_finalizer() {
        // the finalizer patch triggers the next reconcile
        operator.context.add_finalizer(&machine).await?;
        return Ok(Action::await_change());
    }

    let exists = match operator.actuator.exists(&machine).await {
        Ok(exists) => exists,
        Err(e) => {
            let result = Err(e);
            operator.publish(&machine, Operation::Update, &result).await;
            return action_for(result, resync);
        }
    };

    let (operation, result) = if exists {
        match operator.actuator.update(&machine).await {
            Ok(false) => {
                debug!("machine {} is up to date", machine.name());
                return action_for(Ok(()), resync);
            }
            result => (Operation::Update, result.map(|_| ())),
        }
    } else {
        (Operation::Create, operator.actuator.create(&machine).await)
    };
    operator.publish(&machine, operation, &result).await;

    action_for(result, resync)
}

/// Keeps a deleted machine, and so its finalizer, until its VM is gone.
pub(crate) fn deletion_action(vm_exists: bool, requeue_after: Duration) -> Option<Action> {
    vm_exists.then(|| Action::requeue(requeue_after))
}

/// Maps the outcome of an operation onto the controller's next step.
pub(crate) fn action_for(result: Result<(), Error>, resync: Duration) -> Result<Action, Error> {
    match result {
        Ok(()) => Ok(Action::requeue(resync)),
        Err(e) => match e.requeue_after() {
            Some(after) => Ok(Action::requeue(after)),
            None => Err(e),
        },
    }
}

impl Operator {
    /// Publishes an event describing `result`; failures to publish are only logged.
    async fn publish(&self, machine: &Machine, operation: Operation, result: &Result<(), Error>) {
        let (event_type, reason, message) = match result {
            Ok(()) => (
                EventType::Normal,
                operation.succeeded_reason(),
                format!("{operation} of machine {} succeeded", machine.name()),
            ),
            Err(e) if e.requeue_after().is_some() => return,
            Err(e) if e.is_configuration() => {
                (EventType::Warning, "InvalidConfiguration", e.to_string())
            }
            Err(e) => (EventType::Warning, operation.failed_reason(), e.to_string()),
        };

        if let Err(e) = self
            .context
            .record(machine, event_type, reason, &message)
            .await
        {
            warn!(machine = %machine.name(), error = %e, "failed to record event");
        }
    }
}

pub fn error_policy(machine: Arc<Machine>, error: &Error, _operator: Arc<Operator>) -> Action {
    if error.is_configuration() {
        warn!(machine = %machine.name(), error = %error, "waiting for machine configuration to change");
        Action::await_change()
    } else {
        Action::requeue(ERROR_REQUEUE_AFTER)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn test_success_resyncs() {
        let action = action_for(Ok(()), Duration::from_secs(600)).unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(600)));
    }

    #[test]
    fn test_requeue_after_is_not_an_error() {
        let action = action_for(
            Err(Error::RequeueAfter {
                after: Duration::from_secs(20),
            }),
            Duration::from_secs(600),
        )
        .unwrap();
        assert_eq!(action, Action::requeue(Duration::from_secs(20)));
    }

    #[test]
    fn test_hard_errors_reach_error_policy() {
        let err = action_for(
            Err(types::error::Error::NoNamespace.into()),
            Duration::from_secs(600),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_finalizer_held_while_vm_terminates() {
        assert_eq!(
            deletion_action(true, Duration::from_secs(20)),
            Some(Action::requeue(Duration::from_secs(20)))
        );
        assert_eq!(deletion_action(false, Duration::from_secs(20)), None);
    }

    #[test]
    fn test_event_reasons() {
        assert_eq!(Operation::Create.succeeded_reason(), "Created");
        assert_eq!(Operation::Delete.failed_reason(), "FailedDelete");
        assert_eq!(Operation::Update.to_string(), "Update");
    }
}
