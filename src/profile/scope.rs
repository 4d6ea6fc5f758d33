//! Name scopes for column resolution
//!
//! Each SELECT/UPDATE/DELETE body gets a scope listing the table instances
//! its FROM clause introduces. Subqueries chain to their parent scope so
//! correlated references resolve against outer tables.

use crate::catalog::{Column, Table};

/// What a FROM entry refers to
#[derive(Debug, Clone, Copy)]
pub(super) enum Binding<'c> {
    /// A catalog table; `access` indexes `QueryProfile::accesses`
    Table { table: &'c Table, access: usize },
    /// Derived table, temp table, table variable, table-valued function or a
    /// table missing from the catalog. Columns are accepted without checks.
    Opaque,
}

#[derive(Debug, Clone)]
struct Entry<'c> {
    /// Alias, or the bare table name when there is no alias
    name: String,
    /// Table name, also accepted as a qualifier when an alias exists
    table_name: Option<String>,
    binding: Binding<'c>,
}

/// Outcome of resolving a column reference
#[derive(Debug, Clone, Copy)]
pub(super) enum Resolved<'c> {
    Column {
        table: &'c Table,
        column: &'c Column,
        access: usize,
    },
    /// Belongs to an opaque source, or names a projection alias
    Opaque,
    /// The qualifier is known but the column is not on its table
    MissingColumn { table: &'c Table },
    /// Nothing in scope provides the column
    Unknown,
}

#[derive(Debug)]
pub(super) struct Scope<'p, 'c> {
    entries: Vec<Entry<'c>>,
    /// Projection aliases, visible to ORDER BY
    aliases: Vec<String>,
    parent: Option<&'p Scope<'p, 'c>>,
}

impl<'p, 'c> Scope<'p, 'c> {
    pub(super) fn new(parent: Option<&'p Scope<'p, 'c>>) -> Self {
        Self {
            entries: Vec::new(),
            aliases: Vec::new(),
            parent,
        }
    }

    pub(super) fn bind(&mut self, alias: Option<&str>, table_name: Option<&str>, binding: Binding<'c>) {
        let name = alias.or(table_name).unwrap_or_default().to_string();
        self.entries.push(Entry {
            name,
            table_name: table_name.map(str::to_string),
            binding,
        });
    }

    pub(super) fn add_alias(&mut self, alias: &str) {
        self.aliases.push(alias.to_string());
    }

    /// Binding for a qualifier (alias or table name), searching outwards
    pub(super) fn lookup(&self, qualifier: &str) -> Option<Binding<'c>> {
        let local = self
            .entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(qualifier))
            .or_else(|| {
                self.entries.iter().find(|e| {
                    e.table_name
                        .as_deref()
                        .is_some_and(|t| t.eq_ignore_ascii_case(qualifier))
                })
            });
        match local {
            Some(entry) => Some(entry.binding),
            None => self.parent.and_then(|p| p.lookup(qualifier)),
        }
    }

    /// Catalog-backed table instances introduced by this scope
    pub(super) fn local_tables(&self) -> impl Iterator<Item = (&'c Table, usize)> + '_ {
        self.entries.iter().filter_map(|e| match e.binding {
            Binding::Table { table, access } => Some((table, access)),
            Binding::Opaque => None,
        })
    }

    pub(super) fn resolve(&self, qualifier: Option<&str>, column: &str, allow_aliases: bool) -> Resolved<'c> {
        match qualifier {
            Some(q) => match self.lookup(q) {
                Some(Binding::Table { table, access }) => match table.column(column) {
                    Some(c) => Resolved::Column {
                        table,
                        column: c,
                        access,
                    },
                    None => Resolved::MissingColumn { table },
                },
                Some(Binding::Opaque) => Resolved::Opaque,
                None => Resolved::Unknown,
            },
            None => self.resolve_unqualified(column, allow_aliases),
        }
    }

    fn resolve_unqualified(&self, column: &str, allow_aliases: bool) -> Resolved<'c> {
        let mut found = None;
        let mut ambiguous = false;
        for entry in &self.entries {
            if let Binding::Table { table, access } = entry.binding {
                if let Some(c) = table.column(column) {
                    if found.is_some() {
                        ambiguous = true;
                    } else {
                        found = Some((table, c, access));
                    }
                }
            }
        }
        if let (Some((table, column, access)), false) = (found, ambiguous) {
            return Resolved::Column {
                table,
                column,
                access,
            };
        }
        if ambiguous
            || self
                .entries
                .iter()
                .any(|e| matches!(e.binding, Binding::Opaque))
        {
            return Resolved::Opaque;
        }
        if allow_aliases && self.aliases.iter().any(|a| a.eq_ignore_ascii_case(column)) {
            return Resolved::Opaque;
        }
        match self.parent {
            Some(parent) => parent.resolve_unqualified(column, false),
            None => Resolved::Unknown,
        }
    }
}
