//! Statement-level syntax tree for the supported T-SQL subset
//!
//! Every node is owned by the statement that produced it. Expressions are
//! tagged variants, so analysis passes match on node kinds instead of
//! dispatching through traits.

use std::fmt;

use serde::Serialize;

/// A 1-based line/column position within a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range. `end` points just past the last character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceSpan {
    pub start: Position,
    pub end: Position,
}

impl SourceSpan {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest span containing both spans
    pub fn union(&self, other: &SourceSpan) -> SourceSpan {
        SourceSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A possibly schema-qualified object name. Server and database parts of
/// four-part names are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub schema: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Temp tables (`#t`, `##t`) and table variables (`@t`) never live in the catalog
    pub fn is_temporary(&self) -> bool {
        self.name.starts_with('#') || self.name.starts_with('@')
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// A parsed top-level or body statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<Select>),
    Insert(Box<Insert>),
    Update(Box<Update>),
    Delete(Box<Delete>),
    ProcedureDef(Box<ProcedureDef>),
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    CreateView(Box<CreateView>),
    AlterTable(AlterTable),
    Exec(Exec),
    Declare(Vec<VariableDecl>),
    /// `SET NOCOUNT ON`, `SET TRANSACTION ISOLATION LEVEL ...`
    SetOption { option: String, value: String },
    /// `SET @var = expr`
    SetVariable { variable: String, value: Expr },
    Transaction(TransactionControl),
    /// Recognised but not analysed (CTEs, MERGE, triggers)
    Unsupported { construct: String },
    /// Any other statement (PRINT, IF, RETURN, ...), kept so batches stay aligned
    Other { keyword: String },
}

impl Statement {
    /// Short statement kind used in logs and reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::ProcedureDef(p) => match p.kind {
                RoutineKind::Procedure => "CREATE PROCEDURE",
                RoutineKind::Function => "CREATE FUNCTION",
            },
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::CreateIndex(_) => "CREATE INDEX",
            Statement::CreateView(_) => "CREATE VIEW",
            Statement::AlterTable(_) => "ALTER TABLE",
            Statement::Exec(_) => "EXEC",
            Statement::Declare(_) => "DECLARE",
            Statement::SetOption { .. } | Statement::SetVariable { .. } => "SET",
            Statement::Transaction(_) => "TRANSACTION",
            Statement::Unsupported { .. } => "UNSUPPORTED",
            Statement::Other { .. } => "OTHER",
        }
    }

    /// True for INSERT, UPDATE and DELETE
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_)
        )
    }
}

/// A statement together with its source range
#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    pub statement: Statement,
    pub span: SourceSpan,
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub top: Option<Expr>,
    pub projection: Vec<SelectItem>,
    /// `SELECT ... INTO target`
    pub into: Option<ObjectName>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    /// Following `UNION` / `EXCEPT` / `INTERSECT` branch
    pub set_operation: Option<Box<SetOperation>>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub operator: SetOperator,
    pub all: bool,
    pub right: Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Except,
    Intersect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*` or `alias.*`
    Wildcard {
        qualifier: Option<String>,
        span: SourceSpan,
    },
    Expr {
        expr: Expr,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableWithJoins {
    pub relation: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Table {
        name: ObjectName,
        alias: Option<String>,
        /// Upper-cased table hints, e.g. `NOLOCK`
        hints: Vec<String>,
        span: SourceSpan,
    },
    Derived {
        subquery: Box<Select>,
        alias: Option<String>,
    },
    /// Table-valued function in FROM / APPLY
    Function {
        call: FunctionCall,
        alias: Option<String>,
    },
}

impl TableFactor {
    pub fn alias(&self) -> Option<&str> {
        match self {
            TableFactor::Table { alias, .. }
            | TableFactor::Derived { alias, .. }
            | TableFactor::Function { alias, .. } => alias.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: TableFactor,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    CrossApply,
    OuterApply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub source: InsertSource,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<Select>),
    Exec(Exec),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Target table or alias of a FROM entry
    pub target: ObjectName,
    pub target_hints: Vec<String>,
    pub assignments: Vec<Assignment>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column name or `@variable`
    pub target: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub target: ObjectName,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub span: SourceSpan,
}

// ============================================================================
// Routines
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Procedure,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDef {
    pub kind: RoutineKind,
    pub name: ObjectName,
    pub parameters: Vec<VariableDecl>,
    pub body: Vec<BodyItem>,
    pub name_span: SourceSpan,
}

/// A parameter or `DECLARE`d variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// Name including the leading `@`
    pub name: String,
    pub data_type: String,
    pub default: Option<Expr>,
    pub output: bool,
}

/// One element of a routine body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    Statement(StatementNode),
    /// `BEGIN ... END`
    Block(Vec<BodyItem>),
    /// `BEGIN TRY ... END TRY BEGIN CATCH ... END CATCH`
    TryCatch {
        try_block: Vec<BodyItem>,
        catch_block: Vec<BodyItem>,
        span: SourceSpan,
    },
    /// A statement that failed to parse; the rest of the body is still analysed
    Invalid(crate::error::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionControl {
    Begin,
    Commit,
    Rollback,
    Save,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exec {
    pub target: ExecTarget,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecTarget {
    /// `EXEC dbo.usp_Name @a = 1, ...`; the arguments are kept for `sp_executesql`
    Procedure {
        name: ObjectName,
        arguments: Vec<Expr>,
    },
    /// `EXEC (@sql)` or `EXEC ('...' + @x)`
    Dynamic(Expr),
}

// ============================================================================
// DDL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: ObjectName,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub name_span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Upper-cased type text, e.g. `NVARCHAR(50)`; empty for computed columns
    pub data_type: String,
    pub nullable: bool,
    /// Inline `PRIMARY KEY` / `UNIQUE`
    pub inline_constraint: Option<TableConstraint>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
        clustered: bool,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
        clustered: bool,
    },
    /// Inline `INDEX IX_Name [NONCLUSTERED] (cols)` inside CREATE TABLE
    Index {
        name: String,
        columns: Vec<String>,
        included_columns: Vec<String>,
        unique: bool,
        clustered: bool,
    },
    /// Foreign keys and checks carry nothing the analyzer needs
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub included_columns: Vec<String>,
    pub unique: bool,
    pub clustered: bool,
    pub name_span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub name: ObjectName,
    pub query: Select,
    pub name_span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: ObjectName,
    /// `None` for alterations other than adding a key constraint
    pub add_constraint: Option<TableConstraint>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Table name or alias qualifier
    pub qualifier: Option<String>,
    pub name: String,
    pub span: SourceSpan,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralValueKind {
    Number,
    String,
    NationalString,
    Null,
    /// Date part names in DATEADD/DATEDIFF/DATEPART (`DAY`, `MONTH`, ...)
    DatePart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralValueKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: ObjectName,
    pub args: Vec<Expr>,
    pub distinct: bool,
    /// `OVER (...)` follows the call
    pub windowed: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        !self.is_comparison() && !matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitwiseNot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    /// `@name` (or `@@ROWCOUNT` style system variables)
    Variable(String),
    Function(FunctionCall),
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Select>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Exists {
        subquery: Box<Select>,
        negated: bool,
    },
    Subquery(Box<Select>),
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    /// `CAST(x AS t)`, `CONVERT(t, x)`, `TRY_CAST`, `TRY_CONVERT`
    Cast {
        function: String,
        expr: Box<Expr>,
        data_type: String,
    },
    /// `*` inside `COUNT(*)`
    Wildcard,
    Nested(Box<Expr>),
}

impl Expr {
    /// Strip redundant parentheses
    pub fn unnested(&self) -> &Expr {
        match self {
            Expr::Nested(inner) => inner.unnested(),
            other => other,
        }
    }

    /// Visit this expression and every sub-expression, without descending
    /// into subqueries.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Function(call) => call.args.iter().for_each(|a| a.walk(visit)),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Nested(expr) => {
                expr.walk(visit)
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.walk(visit);
                low.walk(visit);
                high.walk(visit);
            }
            Expr::InList { expr, list, .. } => {
                expr.walk(visit);
                list.iter().for_each(|e| e.walk(visit));
            }
            Expr::InSubquery { expr, .. } => expr.walk(visit),
            Expr::Like { expr, pattern, .. } => {
                expr.walk(visit);
                pattern.walk(visit);
            }
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(op) = operand {
                    op.walk(visit);
                }
                for (when, then) in branches {
                    when.walk(visit);
                    then.walk(visit);
                }
                if let Some(e) = else_result {
                    e.walk(visit);
                }
            }
            Expr::Cast { expr, .. } => expr.walk(visit),
            Expr::Column(_)
            | Expr::Literal(_)
            | Expr::Variable(_)
            | Expr::Exists { .. }
            | Expr::Subquery(_)
            | Expr::Wildcard => {}
        }
    }

    /// Column references reachable without entering subqueries
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        let mut refs = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Column(c) = e {
                refs.push(c);
            }
        });
        refs
    }

    /// Subqueries directly nested in this expression tree
    pub fn subqueries(&self) -> Vec<&Select> {
        let mut found = Vec::new();
        self.walk(&mut |e| match e {
            Expr::Exists { subquery, .. }
            | Expr::Subquery(subquery)
            | Expr::InSubquery { subquery, .. } => found.push(subquery.as_ref()),
            _ => {}
        });
        found
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(l) => match l.kind {
                LiteralValueKind::String => write!(f, "'{}'", l.value.replace('\'', "''")),
                LiteralValueKind::NationalString => {
                    write!(f, "N'{}'", l.value.replace('\'', "''"))
                }
                _ => write!(f, "{}", l.value),
            },
            Expr::Variable(v) => write!(f, "{}", v),
            Expr::Function(call) => {
                write!(f, "{}(", call.name)?;
                if call.distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")?;
                if call.windowed {
                    write!(f, " OVER (...)")?;
                }
                Ok(())
            }
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            Expr::Unary { op, expr } => match op {
                UnaryOperator::Not => write!(f, "NOT {}", expr),
                UnaryOperator::Minus => write!(f, "-{}", expr),
                UnaryOperator::Plus => write!(f, "+{}", expr),
                UnaryOperator::BitwiseNot => write!(f, "~{}", expr),
            },
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Expr::InSubquery { expr, negated, .. } => write!(
                f,
                "{} {}IN (SELECT ...)",
                expr,
                if *negated { "NOT " } else { "" }
            ),
            Expr::Like {
                expr,
                pattern,
                negated,
            } => write!(
                f,
                "{} {}LIKE {}",
                expr,
                if *negated { "NOT " } else { "" },
                pattern
            ),
            Expr::IsNull { expr, negated } => write!(
                f,
                "{} IS {}NULL",
                expr,
                if *negated { "NOT " } else { "" }
            ),
            Expr::Exists { negated, .. } => {
                write!(f, "{}EXISTS (SELECT ...)", if *negated { "NOT " } else { "" })
            }
            Expr::Subquery(_) => write!(f, "(SELECT ...)"),
            Expr::Case { .. } => write!(f, "CASE ... END"),
            Expr::Cast {
                function,
                expr,
                data_type,
            } => write!(f, "{}({} AS {})", function, expr, data_type),
            Expr::Wildcard => write!(f, "*"),
            Expr::Nested(inner) => write!(f, "({})", inner),
        }
    }
}

// ============================================================================
// Traversal helpers
// ============================================================================

impl Select {
    /// This select followed by every set-operation branch
    pub fn branches(&self) -> Vec<&Select> {
        let mut out = vec![self];
        let mut next = self.set_operation.as_deref();
        while let Some(op) = next {
            out.push(&op.right);
            next = op.right.set_operation.as_deref();
        }
        out
    }

    /// Every select reachable from this one: set-operation branches, derived
    /// tables and expression subqueries. EXISTS subqueries are included only
    /// when `include_exists` is set.
    pub fn all_selects(&self, include_exists: bool) -> Vec<&Select> {
        let mut out = Vec::new();
        collect_selects(self, include_exists, &mut out);
        out
    }
}

fn collect_selects<'a>(select: &'a Select, include_exists: bool, out: &mut Vec<&'a Select>) {
    for branch in select.branches() {
        out.push(branch);
        let mut nested: Vec<&'a Select> = Vec::new();
        for twj in &branch.from {
            collect_factor_selects(&twj.relation, &mut nested);
            for join in &twj.joins {
                collect_factor_selects(&join.relation, &mut nested);
                if let Some(on) = &join.on {
                    nested.extend(expr_subqueries(on, include_exists));
                }
            }
        }
        for item in &branch.projection {
            if let SelectItem::Expr { expr, .. } = item {
                nested.extend(expr_subqueries(expr, include_exists));
            }
        }
        for expr in branch
            .selection
            .iter()
            .chain(branch.having.iter())
            .chain(branch.group_by.iter())
        {
            nested.extend(expr_subqueries(expr, include_exists));
        }
        for sub in nested {
            collect_selects(sub, include_exists, out);
        }
    }
}

fn collect_factor_selects<'a>(factor: &'a TableFactor, out: &mut Vec<&'a Select>) {
    if let TableFactor::Derived { subquery, .. } = factor {
        out.push(subquery);
    }
}

/// Subqueries in an expression, optionally skipping EXISTS subqueries
pub fn expr_subqueries(expr: &Expr, include_exists: bool) -> Vec<&Select> {
    let mut found = Vec::new();
    expr.walk(&mut |e| match e {
        Expr::Exists { subquery, .. } if include_exists => found.push(subquery.as_ref()),
        Expr::Subquery(subquery) | Expr::InSubquery { subquery, .. } => {
            found.push(subquery.as_ref())
        }
        _ => {}
    });
    found
}

/// Every table factor in a FROM list, including joined ones
pub fn table_factors(from: &[TableWithJoins]) -> Vec<&TableFactor> {
    let mut out = Vec::new();
    for twj in from {
        out.push(&twj.relation);
        for join in &twj.joins {
            out.push(&join.relation);
        }
    }
    out
}

impl ProcedureDef {
    /// Body statements in source order, flattening blocks and TRY/CATCH
    pub fn statements(&self) -> Vec<&StatementNode> {
        let mut out = Vec::new();
        flatten_body(&self.body, &mut out);
        out
    }

    /// Parse errors recorded inside the body
    pub fn invalid_items(&self) -> Vec<&crate::error::ParseError> {
        let mut out = Vec::new();
        collect_invalid(&self.body, &mut out);
        out
    }
}

fn flatten_body<'a>(items: &'a [BodyItem], out: &mut Vec<&'a StatementNode>) {
    for item in items {
        match item {
            BodyItem::Statement(node) => out.push(node),
            BodyItem::Block(inner) => flatten_body(inner, out),
            BodyItem::TryCatch {
                try_block,
                catch_block,
                ..
            } => {
                flatten_body(try_block, out);
                flatten_body(catch_block, out);
            }
            BodyItem::Invalid(_) => {}
        }
    }
}

fn collect_invalid<'a>(items: &'a [BodyItem], out: &mut Vec<&'a crate::error::ParseError>) {
    for item in items {
        match item {
            BodyItem::Invalid(err) => out.push(err),
            BodyItem::Block(inner) => collect_invalid(inner, out),
            BodyItem::TryCatch {
                try_block,
                catch_block,
                ..
            } => {
                collect_invalid(try_block, out);
                collect_invalid(catch_block, out);
            }
            BodyItem::Statement(_) => {}
        }
    }
}
