//! Ordered resource graph with declare-before-reference enforcement.
//!
//! [`ResourceGraph`] keeps resources in declaration order and rejects any
//! reference to a logical id that has not been declared yet. The only
//! post-declaration mutations are explicit `DependsOn` edges, environment
//! injection into a function, and outputs, and each of them is checked the
//! same way. As a result, every reference in a finished graph resolves.

use std::collections::{BTreeMap, BTreeSet};

use super::function::FunctionSpec;
use super::resource::{Resource, ResourceKind};
use super::{Expr, LogicalId};
use crate::error::StackError;

/// A resource plus the bookkeeping the template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Construct path the logical id was derived from.
    pub path: String,
    /// The resource itself.
    pub resource: Resource,
    /// Explicit ordering edges not implied by references.
    pub depends_on: BTreeSet<LogicalId>,
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Human-readable description.
    pub description: String,
    /// Exported value.
    pub value: Expr,
}

/// Declared resources and outputs of one stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGraph {
    entries: BTreeMap<LogicalId, ResourceEntry>,
    order: Vec<LogicalId>,
    outputs: BTreeMap<String, Output>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resource under the logical id derived from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::DuplicateResource`] if the id is taken,
    /// [`StackError::UnresolvedReference`] if the resource references an
    /// undeclared id, or [`StackError::InvalidLogicalId`] for a bad path.
    pub fn declare(&mut self, path: &[&str], resource: Resource) -> Result<LogicalId, StackError> {
        let id = LogicalId::from_path(path)?;
        if self.entries.contains_key(&id) {
            return Err(StackError::DuplicateResource(id));
        }
        self.ensure_declared(&id, resource.references())?;

        tracing::debug!(logical_id = %id, kind = %resource.kind(), "resource declared");
        self.order.push(id.clone());
        self.entries.insert(
            id.clone(),
            ResourceEntry {
                path: path.join("/"),
                resource,
                depends_on: BTreeSet::new(),
            },
        );
        Ok(id)
    }

    /// Adds an explicit `DependsOn` edge from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::ResourceNotFound`] if either end is missing.
    pub fn add_dependency(&mut self, from: &LogicalId, to: &LogicalId) -> Result<(), StackError> {
        if !self.entries.contains_key(to) {
            return Err(StackError::ResourceNotFound(to.clone()));
        }
        let entry = self
            .entries
            .get_mut(from)
            .ok_or_else(|| StackError::ResourceNotFound(from.clone()))?;
        entry.depends_on.insert(to.clone());
        Ok(())
    }

    /// Sets an environment variable on a declared function.
    ///
    /// This is how a function learns attributes of resources declared
    /// after it (e.g. the gateway endpoint).
    ///
    /// # Errors
    ///
    /// Returns [`StackError::ResourceNotFound`] or
    /// [`StackError::UnexpectedResourceKind`] if `function` is not a
    /// declared function, [`StackError::UnresolvedReference`] if `value`
    /// references an undeclared id, and
    /// [`StackError::InvalidArgument`] for a bad variable name.
    pub fn add_environment(
        &mut self,
        function: &LogicalId,
        name: &str,
        value: Expr,
    ) -> Result<(), StackError> {
        self.ensure_declared(function, value.references())?;
        let spec = self.function_mut(function)?;
        spec.add_environment(name, value)?;
        tracing::debug!(logical_id = %function, variable = name, "environment injected");
        Ok(())
    }

    /// Adds a stack output.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidArgument`] if an output with the same
    /// name exists or the name is not alphanumeric, and
    /// [`StackError::UnresolvedReference`] if `value` references an
    /// undeclared id.
    pub fn add_output(
        &mut self,
        name: &str,
        description: impl Into<String>,
        value: Expr,
    ) -> Result<(), StackError> {
        let owner = LogicalId::new(name)
            .map_err(|_| StackError::InvalidArgument(format!("invalid output name: {name}")))?;
        if self.outputs.contains_key(name) {
            return Err(StackError::InvalidArgument(format!(
                "duplicate output: {name}"
            )));
        }
        self.ensure_declared(&owner, value.references())?;
        self.outputs.insert(
            name.to_string(),
            Output {
                description: description.into(),
                value,
            },
        );
        Ok(())
    }

    /// Returns the resource declared under `id`.
    #[must_use]
    pub fn get(&self, id: &LogicalId) -> Option<&Resource> {
        self.entries.get(id).map(|entry| &entry.resource)
    }

    /// Returns the full entry declared under `id`.
    #[must_use]
    pub fn entry(&self, id: &LogicalId) -> Option<&ResourceEntry> {
        self.entries.get(id)
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&LogicalId, &ResourceEntry)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| (id, entry)))
    }

    /// Returns resources of the given kind, in declaration order.
    #[must_use]
    pub fn of_kind(&self, kind: ResourceKind) -> Vec<(&LogicalId, &Resource)> {
        self.iter()
            .filter(|(_, entry)| entry.resource.kind() == kind)
            .map(|(id, entry)| (id, &entry.resource))
            .collect()
    }

    /// Returns how many resources of the given kind are declared.
    #[must_use]
    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.resource.kind() == kind)
            .count()
    }

    /// Returns the stack outputs, sorted by name.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Returns the number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns everything `id` must wait for: referenced ids plus explicit
    /// `DependsOn` edges.
    #[must_use]
    pub fn dependencies_of(&self, id: &LogicalId) -> BTreeSet<&LogicalId> {
        self.entries
            .get(id)
            .map(|entry| {
                entry
                    .resource
                    .references()
                    .into_iter()
                    .chain(entry.depends_on.iter())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the logical ids in an order where every resource follows
    /// all of its dependencies. Ties are broken by declaration order, so
    /// the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::DependencyCycle`] listing the ids that could
    /// not be ordered.
    pub fn dependency_order(&self) -> Result<Vec<&LogicalId>, StackError> {
        let position: BTreeMap<&LogicalId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        let mut pending: BTreeMap<&LogicalId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&LogicalId, Vec<&LogicalId>> = BTreeMap::new();
        for id in &self.order {
            let deps = self.dependencies_of(id);
            pending.insert(id, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(id);
            }
        }

        let mut ready: BTreeSet<(usize, &LogicalId)> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .filter_map(|(id, _)| position.get(id).map(|index| (*index, *id)))
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some((_, id)) = ready.pop_first() {
            sorted.push(id);
            for dependent in dependents.get(id).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0
                        && let Some(index) = position.get(dependent)
                    {
                        ready.insert((*index, *dependent));
                    }
                }
            }
        }

        if sorted.len() < self.order.len() {
            let stuck = self
                .order
                .iter()
                .filter(|id| !sorted.contains(id))
                .cloned()
                .collect();
            return Err(StackError::DependencyCycle(stuck));
        }
        Ok(sorted)
    }

    fn ensure_declared(
        &self,
        from: &LogicalId,
        references: Vec<&LogicalId>,
    ) -> Result<(), StackError> {
        match references.into_iter().find(|r| !self.entries.contains_key(*r)) {
            Some(missing) => Err(StackError::UnresolvedReference {
                from: from.clone(),
                to: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    fn function_mut(&mut self, id: &LogicalId) -> Result<&mut FunctionSpec, StackError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StackError::ResourceNotFound(id.clone()))?;
        match &mut entry.resource {
            Resource::Function(spec) => Ok(spec),
            _ => Err(StackError::UnexpectedResourceKind {
                id: id.clone(),
                expected: "function",
            }),
        }
    }
}
