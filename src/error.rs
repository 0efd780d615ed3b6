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

use crate::{backend, context, types};
use snafu::Snafu;
use std::time::Duration;
use tracing::warn;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The machine cannot be reconciled until its declaration changes.
    #[snafu(display("invalid machine configuration: {}", source))]
    Configuration { source: types::error::Error },

    #[snafu(transparent)]
    Context { source: context::Error },

    #[snafu(display("failed to {} VirtualMachine {}: {}", action, vm, source))]
    Backend {
        action: &'static str,
        vm: String,
        source: backend::Error,
    },

    /// Not a failure: the caller should retry the same operation after `after`.
    #[snafu(display("requeue in {:?}", after))]
    RequeueAfter { after: Duration },
}

impl From<types::error::Error> for Error {
    fn from(source: types::error::Error) -> Self {
        Error::Configuration { source }
    }
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Error::RequeueAfter { after } => Some(*after),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Context { source } => source.is_not_found(),
            Error::Backend { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Combines the result of an operation with the result of writing the
/// machine back afterwards.
///
/// A patch-back failure is reported when the operation succeeded or only
/// asked to be requeued, since losing the record of a completed backend
/// call is worse than losing a retry hint. A hard operation failure keeps
/// priority; the patch-back failure is then only logged.
pub fn resolve_outcome(operation: Result<(), Error>, patch_back: Result<(), Error>) -> Result<(), Error> {
    match (operation, patch_back) {
        (operation, Ok(())) => operation,
        (Ok(()), Err(patch_err)) => Err(patch_err),
        (Err(op_err), Err(patch_err)) if op_err.requeue_after().is_some() => {
            warn!(dropped = %op_err, error = %patch_err, "patch-back failed, dropping requeue");
            Err(patch_err)
        }
        (Err(op_err), Err(patch_err)) => {
            warn!(error = %op_err, dropped = %patch_err, "patch-back failed after operation error");
            Err(op_err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn conflict() -> Error {
        Error::Context {
            source: context::Error::Conflict {
                name: "m1".to_owned(),
            },
        }
    }

    fn backend_failure() -> Error {
        Error::Backend {
            action: "create",
            vm: "c1/m1".to_owned(),
            source: backend::Error::Conflict {
                kind: "VirtualMachine",
                namespace: "c1".to_owned(),
                name: "m1".to_owned(),
            },
        }
    }

    fn requeue() -> Error {
        Error::RequeueAfter {
            after: Duration::from_secs(20),
        }
    }

    #[test]
    fn test_successful_patch_back_keeps_operation_result() {
        assert!(resolve_outcome(Ok(()), Ok(())).is_ok());
        assert_eq!(
            resolve_outcome(Err(requeue()), Ok(())).unwrap_err().requeue_after(),
            Some(Duration::from_secs(20))
        );
        assert!(matches!(
            resolve_outcome(Err(backend_failure()), Ok(())),
            Err(Error::Backend { .. })
        ));
    }

    #[test]
    fn test_patch_back_error_surfaces_after_success() {
        assert!(matches!(
            resolve_outcome(Ok(()), Err(conflict())),
            Err(Error::Context { .. })
        ));
    }

    #[test]
    fn test_patch_back_error_beats_requeue() {
        let err = resolve_outcome(Err(requeue()), Err(conflict())).unwrap_err();
        assert!(err.requeue_after().is_none());
        assert!(matches!(err, Error::Context { .. }));
    }

    #[test]
    fn test_hard_error_beats_patch_back_error() {
        assert!(matches!(
            resolve_outcome(Err(backend_failure()), Err(conflict())),
            Err(Error::Backend { .. })
        ));
    }

    #[test]
    fn test_error_classification() {
        let config: Error = types::error::Error::MissingClusterId {
            machine: "m2".to_owned(),
            label: "l".to_owned(),
        }
        .into();
        assert!(config.is_configuration());
        assert!(requeue().requeue_after().is_some());
        assert!(!backend_failure().is_configuration());
    }
}
