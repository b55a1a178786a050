// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::env;
use std::fmt;

use crate::error::{Error, Result};
use crate::group::ArgGroup;

/// Identifies a group held by a [Registry].
pub type GroupId = usize;

/// All groups known to a program, plus the root group and the program name.
///
/// Create one per run, populate it before resolving and never change it
/// while a resolution pass is running.
#[derive(Default)]
pub struct Registry {
    groups: Vec<Box<dyn ArgGroup>>,
    // Indexes into `groups` that `find()` searches.
    members: Vec<GroupId>,
    root: Option<GroupId>,
    prog: String,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a group that can be switched to with its `:name` token.
    pub fn register<G: ArgGroup + 'static>(&mut self, group: G) -> GroupId {
        let id = self.groups.len();

        self.groups.push(Box::new(group));
        self.members.push(id);

        id
    }

    /// Designate the group that is active before any `:name` token.
    ///
    /// If `prog` is not specified, the program name is taken from the
    /// command-line.
    pub fn designate_root<G: ArgGroup + 'static>(
        &mut self,
        group: G,
        prog: Option<&str>,
    ) -> Result<GroupId> {
        if self.root.is_some() {
            return Err(Error::Specification("root group already designated".into()));
        }

        let id = self.groups.len();

        self.groups.push(Box::new(group));
        self.root = Some(id);
        self.prog = match prog {
            Some(prog) => prog.into(),
            None => env::args().next().unwrap_or_default(),
        };

        Ok(id)
    }

    /// Returns the first registered group named `name` (`:name` form).
    pub fn find(&self, name: &str) -> Option<GroupId> {
        self.members
            .iter()
            .copied()
            .find(|&id| self.groups[id].config().name() == name)
    }

    /// Returns the root group.
    pub fn root(&self) -> Result<GroupId> {
        self.root.ok_or(Error::NoRootGroup)
    }

    /// The program name shown in help.
    pub fn prog(&self) -> &str {
        &self.prog
    }

    /// Returns a group.
    pub fn group(&self, id: GroupId) -> &dyn ArgGroup {
        self.groups[id].as_ref()
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> &mut dyn ArgGroup {
        self.groups[id].as_mut()
    }

    /// Registered groups (not including the root unless it was also
    /// registered) sorted by name.
    pub fn groups(&self) -> Vec<(GroupId, &dyn ArgGroup)> {
        let mut groups: Vec<(GroupId, &dyn ArgGroup)> = self
            .members
            .iter()
            .map(|&id| (id, self.groups[id].as_ref()))
            .collect();

        groups.sort_by(|a, b| a.1.config().name().cmp(b.1.config().name()));

        groups
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = self.groups.iter().map(|g| g.config().name()).collect();

        f.debug_struct("Registry")
            .field("groups", &names)
            .field("root", &self.root)
            .field("prog", &self.prog)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::group::{Group, GroupConfig};

    fn group(name: &str) -> Group<()> {
        Group::<()>::with_default(GroupConfig::new(name).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_registry() {
        let mut registry = Registry::new();

        assert_eq!(registry.root().err(), Some(Error::NoRootGroup));
        assert_eq!(registry.find(":zeta"), None);

        let zeta = registry.register(group("zeta"));
        let alpha = registry.register(group("alpha"));
        let root = registry.designate_root(group("main"), Some("prog")).unwrap();

        assert_eq!(registry.root(), Ok(root));
        assert_eq!(registry.prog(), "prog");
        assert_eq!(registry.find(":zeta"), Some(zeta));
        assert_eq!(registry.find(":alpha"), Some(alpha));
        assert_eq!(registry.find("alpha"), None);

        // The root is not switchable unless registered as well.
        assert_eq!(registry.find(":main"), None);

        let names: Vec<&str> = registry
            .groups()
            .iter()
            .map(|(_, g)| g.config().name())
            .collect();
        assert_eq!(names, vec![":alpha", ":zeta"]);

        assert!(matches!(
            registry.designate_root(group("again"), None),
            Err(Error::Specification(_))
        ));
    }

    #[test]
    fn test_find_first_match() {
        let mut registry = Registry::new();

        let first = registry.register(group("dup"));
        let _second = registry.register(group("dup"));

        assert_eq!(registry.find(":dup"), Some(first));
    }
}
