//! Resource-table data model: declared expressions and their compact handles.

use crate::error::SessionError;
use crate::routing::resource_expr::validate_resource_expr;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Compact integer standing in for a declared resource expression.
///
/// Handles are unique within a session and never reused: an expression that is
/// undeclared and declared again receives a fresh handle.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rid:{}", self.0)
    }
}

/// Two-way expression/handle map with O(1) lookups in both directions.
pub(crate) struct ResourceTable {
    by_expr: HashMap<String, ResourceHandle>,
    by_handle: HashMap<ResourceHandle, String>,
    next_handle: u64,
}

impl ResourceTable {
    /// Creates an empty resource table. The first handle issued is `rid:1`.
    pub(crate) fn new() -> Self {
        Self {
            by_expr: HashMap::new(),
            by_handle: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Declares an expression. Returns the existing handle when already declared.
    pub(crate) fn declare(&mut self, expr: &str) -> Result<ResourceHandle, SessionError> {
        validate_resource_expr(expr)?;

        if let Some(handle) = self.by_expr.get(expr) {
            return Ok(*handle);
        }

        let handle = ResourceHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.by_expr.insert(expr.to_string(), handle);
        self.by_handle.insert(handle, expr.to_string());
        Ok(handle)
    }

    /// Removes a handle mapping and returns the expression it named.
    pub(crate) fn undeclare(&mut self, handle: ResourceHandle) -> Result<String, SessionError> {
        let expr = self
            .by_handle
            .remove(&handle)
            .ok_or(SessionError::UnknownHandle(handle))?;
        self.by_expr.remove(&expr);
        Ok(expr)
    }

    pub(crate) fn is_valid(&self, handle: ResourceHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    pub(crate) fn expr(&self, handle: ResourceHandle) -> Option<&str> {
        self.by_handle.get(&handle).map(String::as_str)
    }

    /// Invalidates every handle. Used when the session closes.
    pub(crate) fn clear(&mut self) -> usize {
        let cleared = self.by_handle.len();
        self.by_expr.clear();
        self.by_handle.clear();
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::{ResourceHandle, ResourceTable};
    use crate::error::SessionError;

    #[test]
    fn declare_is_idempotent_for_identical_expressions() {
        let mut table = ResourceTable::new();

        let first = table.declare("/test/thr").expect("declare should succeed");
        let second = table.declare("/test/thr").expect("redeclare should succeed");

        assert_eq!(first, second);
        assert_eq!(first.id(), 1);
        assert_eq!(table.expr(first), Some("/test/thr"));
    }

    #[test]
    fn distinct_expressions_get_distinct_handles() {
        let mut table = ResourceTable::new();

        let thr = table.declare("/test/thr").unwrap();
        let lat = table.declare("/test/lat").unwrap();

        assert_ne!(thr, lat);
        assert!(table.is_valid(thr));
        assert!(table.is_valid(lat));
    }

    #[test]
    fn undeclare_invalidates_and_never_reuses_handles() {
        let mut table = ResourceTable::new();
        let handle = table.declare("/test/thr").unwrap();

        assert_eq!(table.undeclare(handle), Ok("/test/thr".to_string()));
        assert!(!table.is_valid(handle));
        assert_eq!(
            table.undeclare(handle),
            Err(SessionError::UnknownHandle(handle))
        );

        let redeclared = table.declare("/test/thr").unwrap();
        assert_ne!(redeclared, handle);
    }

    #[test]
    fn undeclare_of_never_declared_handle_fails() {
        let mut table = ResourceTable::new();
        let bogus = ResourceHandle::from_raw(42);

        assert_eq!(table.undeclare(bogus), Err(SessionError::UnknownHandle(bogus)));
    }

    #[test]
    fn invalid_expression_does_not_consume_a_handle() {
        let mut table = ResourceTable::new();

        assert!(matches!(
            table.declare(""),
            Err(SessionError::InvalidExpr(_))
        ));
        assert_eq!(table.declare("/ok").unwrap().id(), 1);
    }

    #[test]
    fn clear_invalidates_every_handle() {
        let mut table = ResourceTable::new();
        let a = table.declare("/a").unwrap();
        let b = table.declare("/b").unwrap();

        assert_eq!(table.clear(), 2);
        assert!(!table.is_valid(a));
        assert!(!table.is_valid(b));
    }
}
