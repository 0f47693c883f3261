/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Resource-expression naming grammar.
//!
//! An expression is an optional leading `/` followed by one or more non-empty
//! chunks separated by `/`. Whitespace, control characters and the reserved
//! `#` / `?` characters are not allowed anywhere.

use crate::error::SessionError;

const RESERVED_CHARS: [char; 2] = ['#', '?'];

pub(crate) fn validate_resource_expr(expr: &str) -> Result<(), SessionError> {
    if expr.is_empty() {
        return Err(SessionError::InvalidExpr(
            "resource expression is empty".to_string(),
        ));
    }

    if let Some(bad) = expr
        .chars()
        .find(|ch| ch.is_whitespace() || ch.is_control() || RESERVED_CHARS.contains(ch))
    {
        return Err(SessionError::InvalidExpr(format!(
            "'{expr}' contains illegal character {bad:?}"
        )));
    }

    let body = expr.strip_prefix('/').unwrap_or(expr);
    if body.is_empty() {
        return Err(SessionError::InvalidExpr(format!(
            "'{expr}' does not name any resource"
        )));
    }

    if body.split('/').any(str::is_empty) {
        return Err(SessionError::InvalidExpr(format!(
            "'{expr}' contains an empty path chunk"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_resource_expr;
    use crate::error::SessionError;

    #[test]
    fn accepts_rooted_and_relative_paths() {
        assert!(validate_resource_expr("/test/thr").is_ok());
        assert!(validate_resource_expr("test/thr").is_ok());
        assert!(validate_resource_expr("/single").is_ok());
        assert!(validate_resource_expr("/demo/**/sensor-1").is_ok());
    }

    #[test]
    fn rejects_empty_and_root_only() {
        assert!(matches!(
            validate_resource_expr(""),
            Err(SessionError::InvalidExpr(_))
        ));
        assert!(validate_resource_expr("/").is_err());
    }

    #[test]
    fn rejects_empty_chunks_and_trailing_separator() {
        assert!(validate_resource_expr("/test//thr").is_err());
        assert!(validate_resource_expr("/test/thr/").is_err());
        assert!(validate_resource_expr("//test").is_err());
    }

    #[test]
    fn rejects_whitespace_and_reserved_characters() {
        assert!(validate_resource_expr("/test/t hr").is_err());
        assert!(validate_resource_expr("/test/thr?x=1").is_err());
        assert!(validate_resource_expr("/test#frag").is_err());
        assert!(validate_resource_expr("/test\tthr").is_err());
    }
}
