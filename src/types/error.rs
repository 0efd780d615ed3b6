// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Validation failures of a machine's declared configuration.
//!
//! Every variant here is permanent: retrying without a change to the
//! Machine (or its credential secret) yields the same error.

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("object has no namespace associated"))]
    NoNamespace,

    #[snafu(display("machine {} is missing required label '{}'", machine, label))]
    MissingClusterId { machine: String, label: String },

    #[snafu(display("machine {} has no provider spec", machine))]
    MissingProviderSpec { machine: String },

    #[snafu(display("failed to decode provider spec of machine {}: {}", machine, source))]
    DecodeProviderSpec {
        machine: String,
        source: serde_json::Error,
    },

    #[snafu(display("failed to decode provider status of machine {}: {}", machine, source))]
    DecodeProviderStatus {
        machine: String,
        source: serde_json::Error,
    },

    #[snafu(display("failed to encode provider status of machine {}: {}", machine, source))]
    EncodeProviderStatus {
        machine: String,
        source: serde_json::Error,
    },

    #[snafu(display("provider spec of machine {} does not name a source volume", machine))]
    MissingSourceVolume { machine: String },

    #[snafu(display("provider spec of machine {} does not name a credentials secret", machine))]
    MissingCredentialsSecret { machine: String },

    #[snafu(display("invalid quantity '{}' for {}: {}", value, field, reason))]
    InvalidQuantity {
        field: String,
        value: String,
        reason: String,
    },

    #[snafu(display("credentials secret {}/{} is unusable: {}", namespace, name, message))]
    InvalidCredentials {
        name: String,
        namespace: String,
        message: String,
    },
}
