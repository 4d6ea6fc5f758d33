//! Statement walker that builds a [`QueryProfile`]

use tracing::trace;

use super::scope::{Binding, Resolved, Scope};
use super::typing::{
    builtin_return_type, conversion_between, family_of_type, is_aggregate, Conversion,
    ReturnType, TypeFamily,
};
use super::{
    push_unique, AggregateUse, Clause, ColumnKey, ComparisonKind, ImplicitConversion,
    NonSargableReason, NonSargableUse, PredicateUse, QueryProfile, ReferenceKind, TableAccess,
    UdfCall, UnresolvedReference, VariableEnv,
};
use crate::catalog::Catalog;
use crate::parser::{
    expr_subqueries, BinaryOperator, ColumnRef, Delete, Expr, Insert, InsertSource,
    LiteralValueKind, ObjectName, ProcedureDef, Select, SelectItem, SourceSpan, Statement,
    TableFactor, TableWithJoins, UnaryOperator, Update, VariableDecl,
};

/// Column-like keywords that are really niladic functions
const NILADIC_FUNCTIONS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "SESSION_USER",
    "SYSTEM_USER",
    "USER",
];

/// Build the profile of one statement. Procedure bodies contribute every
/// nested statement to a single profile.
pub fn extract_profile(statement: &Statement, catalog: &Catalog) -> QueryProfile {
    extract_profile_with(statement, catalog, &VariableEnv::new())
}

/// Like [`extract_profile`], with variables declared by earlier statements
/// of the batch in scope
pub fn extract_profile_with(
    statement: &Statement,
    catalog: &Catalog,
    variables: &VariableEnv,
) -> QueryProfile {
    let mut extractor = ProfileExtractor {
        catalog,
        profile: QueryProfile::default(),
        variables: variables.clone(),
    };
    extractor.statement(statement);
    extractor.finish()
}

struct ProfileExtractor<'c> {
    catalog: &'c Catalog,
    profile: QueryProfile,
    /// Parameters and DECLAREd variables
    variables: VariableEnv,
}

/// A comparison operand that is a plain column reference
struct BareColumn {
    text: String,
    key: Option<ColumnKey>,
    access: Option<usize>,
    family: Option<TypeFamily>,
    span: SourceSpan,
}

fn negate(kind: ComparisonKind, negated: bool) -> ComparisonKind {
    match (kind, negated) {
        (ComparisonKind::Equality, true) => ComparisonKind::Inequality,
        (ComparisonKind::Inequality, true) => ComparisonKind::Equality,
        (kind, _) => kind,
    }
}

fn is_user_function(name: &ObjectName) -> bool {
    name.schema
        .as_deref()
        .is_some_and(|s| !s.eq_ignore_ascii_case("sys"))
}

fn is_string_literal(expr: &Expr) -> bool {
    matches!(
        expr.unnested(),
        Expr::Literal(l) if matches!(l.kind, LiteralValueKind::String | LiteralValueKind::NationalString)
    )
}

fn has_leading_wildcard(pattern: &Expr) -> bool {
    match pattern.unnested() {
        Expr::Literal(l)
            if matches!(l.kind, LiteralValueKind::String | LiteralValueKind::NationalString) =>
        {
            l.value.starts_with('%') || l.value.starts_with('_')
        }
        _ => false,
    }
}

impl<'c> ProfileExtractor<'c> {
    fn finish(mut self) -> QueryProfile {
        let mut seen = Vec::new();
        self.profile.unresolved.retain(|r| {
            let key = (r.kind, r.name.to_lowercase());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        self.profile.non_sargable.dedup();
        self.profile
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Select(select) => self.select(select, None),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
            Statement::ProcedureDef(def) => self.routine(def),
            Statement::CreateView(view) => self.select(&view.query, None),
            Statement::Declare(decls) => self.declare(decls),
            Statement::SetVariable { value, .. } => {
                let scope = Scope::new(None);
                self.expr(value, &scope, Clause::Set);
            }
            _ => {}
        }
    }

    fn routine(&mut self, def: &ProcedureDef) {
        self.variables = VariableEnv::for_routine(def);
        for node in def.statements() {
            trace!(kind = node.statement.kind_name(), "Profiling body statement");
            self.statement(&node.statement);
        }
    }

    fn declare(&mut self, decls: &[VariableDecl]) {
        let scope = Scope::new(None);
        for decl in decls {
            self.variables.declare(&decl.name, &decl.data_type);
            if let Some(default) = &decl.default {
                self.expr(default, &scope, Clause::Set);
            }
        }
    }

    // ========================================================================
    // Table binding
    // ========================================================================

    fn bind_table(&mut self, name: &ObjectName, alias: Option<&str>, span: SourceSpan) -> Binding<'c> {
        if name.is_temporary() {
            return Binding::Opaque;
        }
        let catalog = self.catalog;
        match catalog.resolve_object(name) {
            Some(table) => {
                let access = self.profile.accesses.len();
                self.profile.accesses.push(TableAccess {
                    schema: table.schema.clone(),
                    table: table.name.clone(),
                    alias: alias.map(str::to_string),
                    ..Default::default()
                });
                push_unique(&mut self.profile.tables, &table.qualified_name());
                Binding::Table { table, access }
            }
            None => {
                self.unresolved(ReferenceKind::Table, name.to_string(), span);
                Binding::Opaque
            }
        }
    }

    fn bind_factor(&mut self, factor: &TableFactor, scope: &mut Scope<'_, 'c>) {
        match factor {
            TableFactor::Table {
                name, alias, span, ..
            } => {
                let binding = self.bind_table(name, alias.as_deref(), *span);
                scope.bind(alias.as_deref(), Some(&name.name), binding);
            }
            TableFactor::Derived { subquery, alias } => {
                self.select(subquery, None);
                scope.bind(alias.as_deref(), None, Binding::Opaque);
            }
            TableFactor::Function { call, alias } => {
                scope.bind(alias.as_deref(), Some(&call.name.name), Binding::Opaque);
            }
        }
    }

    fn bind_from(&mut self, from: &[TableWithJoins], scope: &mut Scope<'_, 'c>) {
        for twj in from {
            self.bind_factor(&twj.relation, scope);
            for join in &twj.joins {
                self.bind_factor(&join.relation, scope);
            }
        }
    }

    fn join_conditions(&mut self, from: &[TableWithJoins], scope: &Scope<'_, 'c>) {
        for twj in from {
            for join in &twj.joins {
                if let Some(on) = &join.on {
                    self.predicate(on, scope, Clause::Join);
                }
            }
        }
    }

    /// Bind a DML target: an alias or table already in FROM, or a new access
    fn bind_target(&mut self, target: &ObjectName, span: SourceSpan, scope: &mut Scope<'_, 'c>) -> Binding<'c> {
        if let Some(binding) = scope.lookup(&target.name) {
            return binding;
        }
        let binding = self.bind_table(target, None, span);
        scope.bind(None, Some(&target.name), binding);
        binding
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn select<'p>(&mut self, select: &Select, parent: Option<&'p Scope<'p, 'c>>) {
        for branch in select.branches() {
            self.select_body(branch, parent);
        }
    }

    fn select_body<'p>(&mut self, select: &Select, parent: Option<&'p Scope<'p, 'c>>) {
        let mut scope = Scope::new(parent);
        self.bind_from(&select.from, &mut scope);
        for item in &select.projection {
            if let SelectItem::Expr {
                alias: Some(alias), ..
            } = item
            {
                scope.add_alias(alias);
            }
        }

        for item in &select.projection {
            match item {
                SelectItem::Wildcard { qualifier, .. } => {
                    self.wildcard(qualifier.as_deref(), &scope)
                }
                SelectItem::Expr { expr, .. } => self.expr(expr, &scope, Clause::Select),
            }
        }
        if let Some(top) = &select.top {
            self.expr(top, &scope, Clause::Other);
        }
        self.join_conditions(&select.from, &scope);
        if let Some(selection) = &select.selection {
            self.predicate(selection, &scope, Clause::Where);
        }
        for expr in &select.group_by {
            self.expr(expr, &scope, Clause::GroupBy);
        }
        if let Some(having) = &select.having {
            self.expr(having, &scope, Clause::Having);
        }
        for item in &select.order_by {
            self.expr(&item.expr, &scope, Clause::OrderBy);
        }
    }

    fn wildcard(&mut self, qualifier: Option<&str>, scope: &Scope<'_, 'c>) {
        let accesses: Vec<usize> = match qualifier {
            Some(q) => match scope.lookup(q) {
                Some(Binding::Table { access, .. }) => vec![access],
                _ => Vec::new(),
            },
            None => scope.local_tables().map(|(_, access)| access).collect(),
        };
        for access in accesses {
            self.profile.accesses[access].uses_wildcard = true;
        }
    }

    fn insert(&mut self, insert: &Insert) {
        let mut scope = Scope::new(None);
        let binding = self.bind_target(&insert.table, insert.span, &mut scope);
        if let Binding::Table { table, .. } = binding {
            for column in &insert.columns {
                if table.column(column).is_none() {
                    self.unresolved(
                        ReferenceKind::Column,
                        format!("{}.{}", table.qualified_name(), column),
                        insert.span,
                    );
                }
            }
        }

        match &insert.source {
            InsertSource::Values(rows) => {
                let empty = Scope::new(None);
                for expr in rows.iter().flatten() {
                    self.expr(expr, &empty, Clause::Values);
                }
            }
            InsertSource::Query(select) => self.select(select, None),
            InsertSource::Exec(_) | InsertSource::DefaultValues => {}
        }
    }

    fn update(&mut self, update: &Update) {
        let mut scope = Scope::new(None);
        self.bind_from(&update.from, &mut scope);
        let binding = self.bind_target(&update.target, update.span, &mut scope);

        for assignment in &update.assignments {
            if let Binding::Table { table, .. } = binding {
                if !assignment.target.starts_with('@') && table.column(&assignment.target).is_none() {
                    self.unresolved(
                        ReferenceKind::Column,
                        format!("{}.{}", table.qualified_name(), assignment.target),
                        update.span,
                    );
                }
            }
            self.expr(&assignment.value, &scope, Clause::Set);
        }

        self.join_conditions(&update.from, &scope);
        if let Some(selection) = &update.selection {
            self.predicate(selection, &scope, Clause::Where);
        }
    }

    fn delete(&mut self, delete: &Delete) {
        let mut scope = Scope::new(None);
        self.bind_from(&delete.from, &mut scope);
        self.bind_target(&delete.target, delete.span, &mut scope);

        self.join_conditions(&delete.from, &scope);
        if let Some(selection) = &delete.selection {
            self.predicate(selection, &scope, Clause::Where);
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Record column uses, aggregates and function calls, then profile
    /// nested subqueries against this scope.
    fn expr(&mut self, expr: &Expr, scope: &Scope<'_, 'c>, clause: Clause) {
        self.visit(expr, scope, clause, None);
        for subquery in expr_subqueries(expr, true) {
            self.select(subquery, Some(scope));
        }
    }

    fn visit(&mut self, expr: &Expr, scope: &Scope<'_, 'c>, clause: Clause, aggregate: Option<usize>) {
        match expr {
            Expr::Column(column) => self.column(column, scope, clause, aggregate),
            Expr::Function(call) => {
                let mut inner = aggregate;
                if call.name.schema.is_none() && is_aggregate(&call.name.name) && !call.windowed {
                    inner = Some(self.profile.aggregates.len());
                    self.profile.aggregates.push(AggregateUse {
                        function: call.name.name.to_ascii_uppercase(),
                        distinct: call.distinct,
                        expression: expr.to_string(),
                        input_columns: Vec::new(),
                        span: call.span,
                    });
                } else if is_user_function(&call.name) {
                    self.profile.udf_calls.push(UdfCall {
                        name: call.name.to_string(),
                        clause,
                        span: call.span,
                    });
                }
                for arg in &call.args {
                    self.visit(arg, scope, clause, inner);
                }
            }
            Expr::Binary { left, right, .. } | Expr::Like {
                expr: left,
                pattern: right,
                ..
            } => {
                self.visit(left, scope, clause, aggregate);
                self.visit(right, scope, clause, aggregate);
            }
            Expr::Unary { expr: inner, .. }
            | Expr::IsNull { expr: inner, .. }
            | Expr::Nested(inner)
            | Expr::Cast { expr: inner, .. }
            | Expr::InSubquery { expr: inner, .. } => self.visit(inner, scope, clause, aggregate),
            Expr::Between {
                expr: inner,
                low,
                high,
                ..
            } => {
                for e in [inner, low, high] {
                    self.visit(e, scope, clause, aggregate);
                }
            }
            Expr::InList {
                expr: inner, list, ..
            } => {
                self.visit(inner, scope, clause, aggregate);
                for e in list {
                    self.visit(e, scope, clause, aggregate);
                }
            }
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.visit(operand, scope, clause, aggregate);
                }
                for (when, then) in branches {
                    self.visit(when, scope, clause, aggregate);
                    self.visit(then, scope, clause, aggregate);
                }
                if let Some(e) = else_result {
                    self.visit(e, scope, clause, aggregate);
                }
            }
            Expr::Literal(_)
            | Expr::Variable(_)
            | Expr::Exists { .. }
            | Expr::Subquery(_)
            | Expr::Wildcard => {}
        }
    }

    fn column(&mut self, column: &ColumnRef, scope: &Scope<'_, 'c>, clause: Clause, aggregate: Option<usize>) {
        if column.qualifier.is_none()
            && NILADIC_FUNCTIONS
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&column.name))
        {
            return;
        }

        let allow_aliases = clause == Clause::OrderBy;
        match scope.resolve(column.qualifier.as_deref(), &column.name, allow_aliases) {
            Resolved::Column {
                table,
                column: col,
                access,
            } => {
                let key = ColumnKey {
                    table: table.qualified_name(),
                    column: col.name.clone(),
                };
                let entry = &mut self.profile.accesses[access];
                if let Some(index) = aggregate {
                    push_unique(&mut entry.aggregate_columns, &col.name);
                    let inputs = &mut self.profile.aggregates[index].input_columns;
                    if !inputs.contains(&key) {
                        inputs.push(key);
                    }
                    return;
                }
                match clause {
                    Clause::Select => push_unique(&mut entry.projected_columns, &col.name),
                    Clause::GroupBy => {
                        push_unique(&mut entry.group_by_columns, &col.name);
                        if !self.profile.group_by.contains(&key) {
                            self.profile.group_by.push(key);
                        }
                    }
                    Clause::OrderBy => {
                        push_unique(&mut entry.order_by_columns, &col.name);
                        if !self.profile.order_by.contains(&key) {
                            self.profile.order_by.push(key);
                        }
                    }
                    _ => {}
                }
            }
            Resolved::Opaque => {}
            Resolved::MissingColumn { table } => self.unresolved(
                ReferenceKind::Column,
                format!("{}.{}", table.qualified_name(), column.name),
                column.span,
            ),
            Resolved::Unknown => {
                self.unresolved(ReferenceKind::Column, column.to_string(), column.span)
            }
        }
    }

    fn unresolved(&mut self, kind: ReferenceKind, name: String, span: SourceSpan) {
        self.profile
            .unresolved
            .push(UnresolvedReference { kind, name, span });
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    fn predicate(&mut self, expr: &Expr, scope: &Scope<'_, 'c>, clause: Clause) {
        self.conditions(expr, scope, false, false);
        self.expr(expr, scope, clause);
    }

    /// Walk AND/OR/NOT and record each comparison
    fn conditions(&mut self, expr: &Expr, scope: &Scope<'_, 'c>, disjunctive: bool, negated: bool) {
        match expr.unnested() {
            Expr::Binary {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.conditions(left, scope, disjunctive, negated);
                self.conditions(right, scope, disjunctive, negated);
            }
            Expr::Binary {
                left,
                op: BinaryOperator::Or,
                right,
            } => {
                self.conditions(left, scope, true, negated);
                self.conditions(right, scope, true, negated);
            }
            Expr::Unary {
                op: UnaryOperator::Not,
                expr: inner,
            } => {
                let compound = matches!(
                    inner.unnested(),
                    Expr::Binary {
                        op: BinaryOperator::And | BinaryOperator::Or,
                        ..
                    }
                );
                self.conditions(inner, scope, disjunctive || compound, !negated);
            }
            Expr::Binary { left, op, right } if op.is_comparison() => {
                self.comparison(left, *op, right, scope, disjunctive, negated)
            }
            Expr::Between {
                expr: operand,
                low,
                high,
                negated: not,
            } => {
                let kind = if *not != negated {
                    ComparisonKind::Inequality
                } else {
                    ComparisonKind::Range
                };
                match self.bare_column(operand, scope) {
                    Some(column) => {
                        self.record_predicate(&column, kind, disjunctive);
                        self.type_check(&column, low, scope);
                        self.type_check(&column, high, scope);
                    }
                    None => self.wrapped(operand, scope),
                }
            }
            Expr::InList {
                expr: operand,
                list,
                negated: not,
            } => {
                let kind = negate(ComparisonKind::Equality, *not != negated);
                match self.bare_column(operand, scope) {
                    Some(column) => {
                        self.record_predicate(&column, kind, disjunctive);
                        if let Some(item) = list.iter().find(|e| self.infer(e, scope).is_some()) {
                            self.type_check(&column, item, scope);
                        }
                    }
                    None => self.wrapped(operand, scope),
                }
            }
            Expr::InSubquery {
                expr: operand,
                negated: not,
                ..
            } => {
                let kind = negate(ComparisonKind::Equality, *not != negated);
                match self.bare_column(operand, scope) {
                    Some(column) => self.record_predicate(&column, kind, disjunctive),
                    None => self.wrapped(operand, scope),
                }
            }
            Expr::Like {
                expr: operand,
                pattern,
                negated: not,
            } => match self.bare_column(operand, scope) {
                Some(column) if has_leading_wildcard(pattern) => {
                    self.non_sargable(&column, NonSargableReason::LeadingWildcard, pattern.to_string())
                }
                Some(column) => {
                    let kind = if *not != negated {
                        ComparisonKind::Inequality
                    } else {
                        ComparisonKind::Range
                    };
                    self.record_predicate(&column, kind, disjunctive);
                    self.type_check(&column, pattern, scope);
                }
                None => self.wrapped(operand, scope),
            },
            Expr::IsNull {
                expr: operand,
                negated: not,
            } => {
                let kind = negate(ComparisonKind::Equality, *not != negated);
                match self.bare_column(operand, scope) {
                    Some(column) => self.record_predicate(&column, kind, disjunctive),
                    None => self.wrapped(operand, scope),
                }
            }
            _ => {}
        }
    }

    fn comparison(
        &mut self,
        left: &Expr,
        op: BinaryOperator,
        right: &Expr,
        scope: &Scope<'_, 'c>,
        disjunctive: bool,
        negated: bool,
    ) {
        let kind = negate(
            match op {
                BinaryOperator::Eq => ComparisonKind::Equality,
                BinaryOperator::NotEq => ComparisonKind::Inequality,
                _ => ComparisonKind::Range,
            },
            negated,
        );

        match (self.bare_column(left, scope), self.bare_column(right, scope)) {
            (Some(l), Some(r)) => {
                match (l.access, r.access, &l.key, &r.key) {
                    (Some(la), Some(ra), Some(lk), Some(rk))
                        if la != ra && kind == ComparisonKind::Equality =>
                    {
                        self.profile.joins.push((lk.clone(), rk.clone()));
                        if !disjunctive {
                            push_unique(&mut self.profile.accesses[la].join_columns, &lk.column);
                            push_unique(&mut self.profile.accesses[ra].join_columns, &rk.column);
                        }
                    }
                    (Some(la), Some(ra), ..) if la == ra => {}
                    _ => {
                        self.record_predicate(&l, kind, disjunctive);
                        self.record_predicate(&r, kind, disjunctive);
                    }
                }
                // Only the lower-precedence side is converted
                match (l.family, r.family) {
                    (Some(lf), Some(rf)) if lf < rf => self.type_check(&l, right, scope),
                    (Some(lf), Some(rf)) if rf < lf => self.type_check(&r, left, scope),
                    _ => {}
                }
            }
            (Some(column), None) => {
                self.record_predicate(&column, kind, disjunctive);
                self.type_check(&column, right, scope);
            }
            (None, Some(column)) => {
                self.record_predicate(&column, kind, disjunctive);
                self.type_check(&column, left, scope);
            }
            (None, None) => {
                self.wrapped(left, scope);
                self.wrapped(right, scope);
            }
        }
    }

    fn bare_column(&self, expr: &Expr, scope: &Scope<'_, 'c>) -> Option<BareColumn> {
        let Expr::Column(column) = expr.unnested() else {
            return None;
        };
        if column.qualifier.is_none()
            && NILADIC_FUNCTIONS
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&column.name))
        {
            return None;
        }

        let mut bare = BareColumn {
            text: column.to_string(),
            key: None,
            access: None,
            family: None,
            span: column.span,
        };
        if let Resolved::Column {
            table,
            column: col,
            access,
        } = scope.resolve(column.qualifier.as_deref(), &column.name, false)
        {
            bare.key = Some(ColumnKey {
                table: table.qualified_name(),
                column: col.name.clone(),
            });
            bare.access = Some(access);
            bare.family = family_of_type(&col.data_type);
        }
        Some(bare)
    }

    fn record_predicate(&mut self, column: &BareColumn, kind: ComparisonKind, disjunctive: bool) {
        let (Some(key), Some(access)) = (&column.key, column.access) else {
            return;
        };
        self.profile.predicates.push(PredicateUse {
            column: key.clone(),
            kind,
            disjunctive,
            span: column.span,
        });
        if disjunctive {
            return;
        }
        let entry = &mut self.profile.accesses[access];
        let list = match kind {
            ComparisonKind::Equality => &mut entry.equality_columns,
            ComparisonKind::Range => &mut entry.range_columns,
            ComparisonKind::Inequality => &mut entry.inequality_columns,
        };
        push_unique(list, &key.column);
    }

    fn non_sargable(&mut self, column: &BareColumn, reason: NonSargableReason, expression: String) {
        self.profile.non_sargable.push(NonSargableUse {
            column: column.key.clone(),
            column_text: column.text.clone(),
            reason,
            expression,
            span: column.span,
        });
    }

    /// Mark columns inside a function call or arithmetic operand
    fn wrapped(&mut self, operand: &Expr, scope: &Scope<'_, 'c>) {
        let operand = operand.unnested();
        let reason = match operand {
            Expr::Function(call) => NonSargableReason::FunctionWrap {
                function: match &call.name.schema {
                    Some(_) => call.name.to_string(),
                    None => call.name.name.to_ascii_uppercase(),
                },
            },
            Expr::Cast { function, .. } => NonSargableReason::FunctionWrap {
                function: function.clone(),
            },
            Expr::Case { .. } => NonSargableReason::FunctionWrap {
                function: "CASE".to_string(),
            },
            Expr::Binary { op, .. } if op.is_arithmetic() => NonSargableReason::Arithmetic {
                operator: op.symbol().to_string(),
            },
            Expr::Unary {
                op: UnaryOperator::Minus,
                ..
            } => NonSargableReason::Arithmetic {
                operator: "-".to_string(),
            },
            _ => return,
        };

        let expression = operand.to_string();
        for column in operand.column_refs() {
            let bare_expr = Expr::Column(column.clone());
            if let Some(bare) = self.bare_column(&bare_expr, scope) {
                self.non_sargable(&bare, reason.clone(), expression.clone());
            }
        }
    }

    /// Record an implicit conversion between `column` and `operand`, and
    /// mark the column non-SARGable when precedence converts the column.
    fn type_check(&mut self, column: &BareColumn, operand: &Expr, scope: &Scope<'_, 'c>) {
        let (Some(column_family), Some(operand_family)) = (column.family, self.infer(operand, scope)) else {
            return;
        };
        // varchar widened to an nvarchar column converts only the operand
        let widened_string =
            column_family == TypeFamily::UnicodeString && operand_family == TypeFamily::String;
        if column_family == operand_family
            || widened_string
            || (column_family == TypeFamily::DateTime && is_string_literal(operand))
        {
            return;
        }

        self.profile.implicit_conversions.push(ImplicitConversion {
            column: column.key.clone(),
            expression: format!("{} = {}", column.text, operand),
            left: column_family,
            right: operand_family,
            span: column.span,
        });
        if conversion_between(column_family, operand_family) == Conversion::Column {
            self.non_sargable(
                column,
                NonSargableReason::TypeMismatch {
                    column_type: column_family.name().to_string(),
                    operand_type: operand_family.name().to_string(),
                },
                operand.to_string(),
            );
        }
    }

    /// Best-effort type family of an expression
    fn infer(&self, expr: &Expr, scope: &Scope<'_, 'c>) -> Option<TypeFamily> {
        match expr.unnested() {
            Expr::Column(column) => match scope.resolve(column.qualifier.as_deref(), &column.name, false) {
                Resolved::Column { column: col, .. } => family_of_type(&col.data_type),
                _ => None,
            },
            Expr::Literal(literal) => match literal.kind {
                LiteralValueKind::Number => Some(TypeFamily::Numeric),
                LiteralValueKind::String => Some(TypeFamily::String),
                LiteralValueKind::NationalString => Some(TypeFamily::UnicodeString),
                LiteralValueKind::Null | LiteralValueKind::DatePart => None,
            },
            Expr::Variable(name) => self.variables.family(name),
            Expr::Cast { data_type, .. } => family_of_type(data_type),
            Expr::Function(call) if call.name.schema.is_none() => {
                match builtin_return_type(&call.name.name)? {
                    ReturnType::Fixed(family) => Some(family),
                    ReturnType::FirstArgument => call.args.first().and_then(|a| self.infer(a, scope)),
                    ReturnType::LastArgument => call.args.last().and_then(|a| self.infer(a, scope)),
                }
            }
            Expr::Binary { left, op, right } if op.is_arithmetic() => {
                match (self.infer(left, scope), self.infer(right, scope)) {
                    (Some(l), Some(r)) => Some(l.max(r)),
                    (l, r) => l.or(r),
                }
            }
            Expr::Unary {
                op: UnaryOperator::Minus | UnaryOperator::Plus,
                expr: inner,
            } => self.infer(inner, scope),
            Expr::Case {
                branches,
                else_result,
                ..
            } => branches
                .iter()
                .map(|(_, then)| then)
                .chain(else_result.as_deref())
                .find_map(|e| self.infer(e, scope)),
            _ => None,
        }
    }
}
