// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Naming conventions of the host framework.
//!
//! Resources produced here must reference the logical ids the host generates
//! for its own resources (log groups, Lambda functions), so these helpers
//! reproduce the host's rules exactly.

/// Upper-cases the first character of `name`.
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalizes a function key the way the host does before building logical ids:
/// `-` becomes `Dash`, `_` becomes `Underscore` and the first letter is upper-cased.
pub fn normalize_function_name(function_key: &str) -> String {
    normalize_name(
        &function_key
            .replace('-', "Dash")
            .replace('_', "Underscore"),
    )
}

/// Logical id of the log group the host creates for a function.
pub fn log_group_logical_id(function_key: &str) -> String {
    format!("{}LogGroup", normalize_function_name(function_key))
}

/// Logical id of the Lambda function resource the host creates for a function.
pub fn lambda_logical_id(function_key: &str) -> String {
    format!("{}LambdaFunction", normalize_function_name(function_key))
}

/// Physical CloudWatch log group of a deployed function.
pub fn log_group_name(realized_function_name: &str) -> String {
    format!("/aws/lambda/{realized_function_name}")
}

/// Deployed name the host gives a function that does not set `name` explicitly.
pub fn default_function_name(service: &str, stage: &str, function_key: &str) -> String {
    format!("{service}-{stage}-{function_key}")
}

/// Service principal through which CloudWatch Logs invokes a subscription destination.
pub fn logs_principal(region: &str) -> String {
    format!("logs.{region}.amazonaws.com")
}
