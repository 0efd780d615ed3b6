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

//! Resource quantity validation.
//!
//! `k8s_openapi` carries quantities as plain strings, so a typo in a provider
//! spec would otherwise only surface as a rejection from the backend. Values
//! are checked against the Kubernetes quantity grammar before a descriptor is
//! ever built.

use crate::types::error::{Error, InvalidQuantitySnafu};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

const SUFFIXES: &[&str] = &[
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// Parses `value` as a non-negative resource quantity.
pub fn parse(field: &str, value: &str) -> Result<Quantity, Error> {
    let invalid = |reason: &str| {
        InvalidQuantitySnafu {
            field: field.to_owned(),
            value: value.to_owned(),
            reason: reason.to_owned(),
        }
        .build()
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("quantity must not be empty"));
    }
    if trimmed != value {
        return Err(invalid("quantity must not contain whitespace"));
    }

    let unsigned = value.strip_prefix('+').unwrap_or(value);
    if unsigned.starts_with('-') {
        return Err(invalid("quantity must not be negative"));
    }

    let number_end = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_end);

    if !is_decimal(number) {
        return Err(invalid("expected a decimal number"));
    }

    if !suffix.is_empty() && !SUFFIXES.contains(&suffix) && !is_exponent(suffix) {
        return Err(invalid("unknown unit suffix"));
    }

    Ok(Quantity(value.to_owned()))
}

fn is_decimal(number: &str) -> bool {
    let mut parts = number.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match fraction {
        None => !whole.is_empty() && digits(whole),
        Some(fraction) => {
            (!whole.is_empty() || !fraction.is_empty()) && digits(whole) && digits(fraction)
        }
    }
}

fn is_exponent(suffix: &str) -> bool {
    let Some(rest) = suffix.strip_prefix(['e', 'E']) else {
        return false;
    };
    let rest = rest.strip_prefix(['+', '-']).unwrap_or(rest);
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}
