// crates/ledgerq-core/src/core/statement.rs
// ============================================================================
// Module: Statement AST
// Description: Minimal SELECT / INSERT / UPDATE statements and their renderer.
// Purpose: Carry time-travel qualifiers on structured FROM nodes.
// Dependencies: crate::core::{dialect, scalar, time_travel}, thiserror
// ============================================================================

//! ## Overview
//! Statements are built with small builders and compiled against a
//! [`Dialect`] into SQL text plus positional parameters. The time-travel
//! qualifier lives on the [`FromClause`] and is rendered by the dialect as
//! part of the table reference, so no rendered SQL is ever rewritten.
//!
//! Delete statements are intentionally absent: the ledger is append-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::dialect::Dialect;
use crate::core::scalar::TypedScalar;
use crate::core::time_travel::TimeTravel;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Statement compilation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// The dialect has no catalog entry for the table.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    /// The statement is structurally invalid.
    #[error("invalid statement: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: FROM Clause
// ============================================================================

/// Expression attached after the table in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromExpression {
    /// Time-travel qualifier.
    TimeTravel(TimeTravel),
    /// Raw SQL fragment appended after the table reference.
    Raw(String),
    /// Ordered list of expressions.
    Composite(Vec<FromExpression>),
}

impl FromExpression {
    /// Returns the first time-travel qualifier found depth-first.
    #[must_use]
    pub fn time_travel(&self) -> Option<&TimeTravel> {
        match self {
            Self::TimeTravel(time_travel) => Some(time_travel),
            Self::Raw(_) => None,
            Self::Composite(parts) => parts.iter().find_map(Self::time_travel),
        }
    }

    /// Appends raw fragments in depth-first order.
    fn collect_raw<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::TimeTravel(_) => {}
            Self::Raw(fragment) => out.push(fragment),
            Self::Composite(parts) => {
                for part in parts {
                    part.collect_raw(out);
                }
            }
        }
    }
}

/// FROM clause: one table plus optional trailing expressions.
///
/// # Invariants
/// - At most one time-travel qualifier is rendered; the first attached wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromClause {
    /// Table name.
    table: String,
    /// Expression attached after the table.
    after: Option<FromExpression>,
}

impl FromClause {
    /// Creates a FROM clause over `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            after: None,
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the attached expression.
    #[must_use]
    pub const fn after(&self) -> Option<&FromExpression> {
        self.after.as_ref()
    }

    /// Returns the effective time-travel qualifier.
    #[must_use]
    pub fn time_travel(&self) -> Option<&TimeTravel> {
        self.after.as_ref().and_then(FromExpression::time_travel)
    }

    /// Attaches an expression after the table.
    ///
    /// An empty slot is filled directly. A second time-travel qualifier is
    /// dropped when one is already attached. Anything else is appended to an
    /// ordered composite.
    pub fn attach(&mut self, expression: FromExpression) {
        self.after = Some(match self.after.take() {
            None => expression,
            Some(existing)
                if existing.time_travel().is_some() && expression.time_travel().is_some() =>
            {
                existing
            }
            Some(FromExpression::Composite(mut parts)) => {
                parts.push(expression);
                FromExpression::Composite(parts)
            }
            Some(existing) => FromExpression::Composite(vec![existing, expression]),
        });
    }
}

// ============================================================================
// SECTION: Statement Modifiers
// ============================================================================

/// Clause that modifies a statement before compilation.
pub trait StatementModifier {
    /// Applies the modification to the FROM clause.
    fn modify_statement(&self, from: &mut FromClause);
}

impl StatementModifier for TimeTravel {
    fn modify_statement(&self, from: &mut FromClause) {
        from.attach(FromExpression::TimeTravel(*self));
    }
}

impl StatementModifier for FromExpression {
    fn modify_statement(&self, from: &mut FromClause) {
        from.attach(self.clone());
    }
}

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// Right-hand side of an equality condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    /// Single value rendered as `col = ?`.
    Scalar(TypedScalar),
    /// Value list rendered as `col IN (?,?)`.
    List(Vec<TypedScalar>),
}

/// Equality condition on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Column name.
    pub column: String,
    /// Compared value.
    pub value: ConditionValue,
}

/// Builds `column = value`.
#[must_use]
pub fn eq(column: impl Into<String>, value: impl Into<TypedScalar>) -> Condition {
    Condition {
        column: column.into(),
        value: ConditionValue::Scalar(value.into()),
    }
}

/// Builds `column IN (values...)`.
#[must_use]
pub fn in_list(column: impl Into<String>, values: Vec<TypedScalar>) -> Condition {
    Condition {
        column: column.into(),
        value: ConditionValue::List(values),
    }
}

/// Ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column name.
    pub column: String,
    /// Sort descending when true.
    pub descending: bool,
}

// ============================================================================
// SECTION: Compiled Output
// ============================================================================

/// Rendered statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    /// SQL text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<TypedScalar>,
    /// Target table.
    pub table: String,
    /// Time-travel qualifier carried by the statement.
    pub time_travel: Option<TimeTravel>,
}

/// Accumulates SQL text and parameters for one statement.
pub struct SqlBuilder<'a> {
    /// Dialect used for quoting and bind variables.
    dialect: &'a dyn Dialect,
    /// SQL text so far.
    sql: String,
    /// Parameters so far.
    params: Vec<TypedScalar>,
}

impl<'a> SqlBuilder<'a> {
    /// Starts an empty builder.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Appends raw SQL text.
    pub fn write_str(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Appends a quoted identifier.
    pub fn write_quoted(&mut self, identifier: &str) {
        self.dialect.quote_to(&mut self.sql, identifier);
    }

    /// Appends a bind variable for `value`.
    pub fn add_var(&mut self, value: TypedScalar) {
        self.params.push(value);
        self.dialect.bind_var_to(&mut self.sql, self.params.len());
    }

    /// Returns mutable access to the SQL text for dialect hooks.
    pub const fn sql_mut(&mut self) -> &mut String {
        &mut self.sql
    }

    /// Finishes the builder.
    #[must_use]
    pub fn finish(self, table: &str, time_travel: Option<TimeTravel>) -> CompiledStatement {
        CompiledStatement {
            sql: self.sql,
            params: self.params,
            table: table.to_string(),
            time_travel,
        }
    }

    /// Appends `WHERE a AND b` for non-empty condition lists.
    fn write_conditions(&mut self, conditions: &[Condition]) -> Result<(), StatementError> {
        for (position, condition) in conditions.iter().enumerate() {
            self.write_str(if position == 0 { " WHERE " } else { " AND " });
            self.write_quoted(&condition.column);
            match &condition.value {
                ConditionValue::Scalar(value) => {
                    self.write_str(" = ");
                    self.add_var(value.clone());
                }
                ConditionValue::List(values) => {
                    if values.is_empty() {
                        return Err(StatementError::Invalid(format!(
                            "empty IN list for column {}",
                            condition.column
                        )));
                    }
                    self.write_str(" IN (");
                    for (index, value) in values.iter().enumerate() {
                        if index > 0 {
                            self.write_str(",");
                        }
                        self.add_var(value.clone());
                    }
                    self.write_str(")");
                }
            }
        }
        Ok(())
    }

    /// Appends a comma-separated list of quoted identifiers.
    fn write_identifier_list(&mut self, identifiers: &[String]) {
        for (index, identifier) in identifiers.iter().enumerate() {
            if index > 0 {
                self.write_str(", ");
            }
            self.write_quoted(identifier);
        }
    }
}

// ============================================================================
// SECTION: SELECT
// ============================================================================

/// SELECT statement over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    /// FROM clause.
    from: FromClause,
    /// Projected columns; empty selects `*`.
    columns: Vec<String>,
    /// Conjunctive equality conditions.
    conditions: Vec<Condition>,
    /// Ordering terms.
    order_by: Vec<OrderBy>,
    /// Row limit.
    limit: Option<u64>,
}

impl SelectStatement {
    /// Starts `SELECT * FROM table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            from: FromClause::new(table),
            columns: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Restricts the projection.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a condition.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds an ordering term.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            descending,
        });
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies a clause such as a time-travel qualifier.
    #[must_use]
    pub fn with_clause(mut self, clause: &dyn StatementModifier) -> Self {
        clause.modify_statement(&mut self.from);
        self
    }

    /// Scopes the statement to a past transaction.
    #[must_use]
    pub fn time_travel(self, time_travel: TimeTravel) -> Self {
        self.with_clause(&time_travel)
    }

    /// Returns the FROM clause.
    #[must_use]
    pub const fn from_clause(&self) -> &FromClause {
        &self.from
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        self.from.table()
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError`] when the dialect cannot resolve the table or
    /// a condition is malformed.
    pub fn compile(&self, dialect: &dyn Dialect) -> Result<CompiledStatement, StatementError> {
        let time_travel = self.from.time_travel().copied();
        let mut builder = SqlBuilder::new(dialect);
        builder.write_str("SELECT ");
        if self.columns.is_empty() {
            builder.write_str("*");
        } else {
            builder.write_identifier_list(&self.columns);
        }
        builder.write_str(" FROM ");
        dialect.write_table_ref(builder.sql_mut(), self.from.table(), time_travel.as_ref())?;
        let mut fragments = Vec::new();
        if let Some(after) = self.from.after() {
            after.collect_raw(&mut fragments);
        }
        for fragment in fragments {
            builder.write_str(" ");
            builder.write_str(fragment);
        }
        builder.write_conditions(&self.conditions)?;
        for (index, term) in self.order_by.iter().enumerate() {
            builder.write_str(if index == 0 { " ORDER BY " } else { ", " });
            builder.write_quoted(&term.column);
            if term.descending {
                builder.write_str(" DESC");
            }
        }
        if let Some(limit) = self.limit {
            builder.write_str(&format!(" LIMIT {limit}"));
        }
        Ok(builder.finish(self.from.table(), time_travel))
    }
}

// ============================================================================
// SECTION: INSERT / UPSERT
// ============================================================================

/// Conflict handling for inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    /// Leave the existing row untouched.
    DoNothing,
}

/// UPSERT clause with an optional modifier and target table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertClause {
    /// Optional modifier keyword written between UPSERT and INTO.
    pub modifier: Option<String>,
    /// Optional explicit target table.
    pub table: Option<String>,
}

impl UpsertClause {
    /// Returns a clause where empty fields inherit from `previous`.
    #[must_use]
    pub fn merge(self, previous: &Self) -> Self {
        Self {
            modifier: self.modifier.or_else(|| previous.modifier.clone()),
            table: self.table.or_else(|| previous.table.clone()),
        }
    }

    /// Resolves the target table, falling back to `current_table`.
    #[must_use]
    pub fn target_table<'a>(&'a self, current_table: &'a str) -> &'a str {
        self.table.as_deref().unwrap_or(current_table)
    }
}

/// INSERT statement, optionally rendered as an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    /// Target table.
    table: String,
    /// Column names.
    columns: Vec<String>,
    /// Values aligned with `columns`.
    values: Vec<TypedScalar>,
    /// Conflict handling.
    on_conflict: Option<OnConflict>,
    /// Upsert clause.
    upsert: Option<UpsertClause>,
}

impl InsertStatement {
    /// Starts an insert into `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            upsert: None,
        }
    }

    /// Adds a column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<TypedScalar>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Ignores conflicting rows.
    #[must_use]
    pub const fn on_conflict_do_nothing(mut self) -> Self {
        self.on_conflict = Some(OnConflict::DoNothing);
        self
    }

    /// Renders the statement as an upsert, merging with any prior clause.
    #[must_use]
    pub fn upsert(mut self, clause: UpsertClause) -> Self {
        let merged = match self.upsert.take() {
            Some(previous) => clause.merge(&previous),
            None => clause,
        };
        self.upsert = Some(merged);
        self
    }

    /// Returns the statement's table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the effective target table after upsert resolution.
    #[must_use]
    pub fn target_table(&self) -> &str {
        self.upsert.as_ref().map_or(self.table.as_str(), |clause| clause.target_table(&self.table))
    }

    /// Returns true when rendered as an upsert.
    #[must_use]
    pub const fn is_upsert(&self) -> bool {
        self.upsert.is_some()
    }

    /// Returns the conflict handling.
    #[must_use]
    pub const fn conflict(&self) -> Option<OnConflict> {
        self.on_conflict
    }

    /// Returns the value supplied for `column`.
    #[must_use]
    pub fn value_of(&self, column: &str) -> Option<&TypedScalar> {
        self.columns.iter().position(|name| name == column).and_then(|index| self.values.get(index))
    }

    /// Returns the column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::Invalid`] when no columns are set or a
    /// column repeats.
    pub fn compile(&self, dialect: &dyn Dialect) -> Result<CompiledStatement, StatementError> {
        if self.columns.is_empty() {
            return Err(StatementError::Invalid(format!(
                "insert into {} sets no columns",
                self.table
            )));
        }
        for (index, column) in self.columns.iter().enumerate() {
            if self.columns[.. index].contains(column) {
                return Err(StatementError::Invalid(format!("column {column} set twice")));
            }
        }
        let target = self.target_table();
        let mut builder = SqlBuilder::new(dialect);
        match &self.upsert {
            Some(clause) => {
                dialect.write_upsert_into(builder.sql_mut(), clause.modifier.as_deref(), target)?;
            }
            None => {
                builder.write_str("INSERT INTO ");
                builder.write_quoted(target);
            }
        }
        builder.write_str(" (");
        builder.write_identifier_list(&self.columns);
        builder.write_str(") VALUES (");
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                builder.write_str(",");
            }
            builder.add_var(value.clone());
        }
        builder.write_str(")");
        if let Some(on_conflict) = self.on_conflict {
            builder.write_str(" ");
            dialect.write_on_conflict(builder.sql_mut(), on_conflict);
        }
        Ok(builder.finish(target, None))
    }
}

// ============================================================================
// SECTION: UPDATE
// ============================================================================

/// UPDATE statement with equality conditions.
///
/// # Invariants
/// - Compiles only with at least one assignment and one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    /// Target table.
    table: String,
    /// Column assignments.
    assignments: Vec<(String, TypedScalar)>,
    /// Conjunctive equality conditions.
    conditions: Vec<Condition>,
}

impl UpdateStatement {
    /// Starts an update of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Adds `column = value`.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<TypedScalar>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Adds a condition.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the assignments.
    #[must_use]
    pub fn assignments(&self) -> &[(String, TypedScalar)] {
        &self.assignments
    }

    /// Returns the conditions.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::Invalid`] when assignments or conditions are
    /// missing.
    pub fn compile(&self, dialect: &dyn Dialect) -> Result<CompiledStatement, StatementError> {
        if self.assignments.is_empty() {
            return Err(StatementError::Invalid(format!(
                "update of {} sets no columns",
                self.table
            )));
        }
        if self.conditions.is_empty() {
            return Err(StatementError::Invalid(format!(
                "update of {} has no conditions",
                self.table
            )));
        }
        let mut builder = SqlBuilder::new(dialect);
        builder.write_str("UPDATE ");
        builder.write_quoted(&self.table);
        builder.write_str(" SET ");
        for (index, (column, value)) in self.assignments.iter().enumerate() {
            if index > 0 {
                builder.write_str(", ");
            }
            builder.write_quoted(column);
            builder.write_str(" = ");
            builder.add_var(value.clone());
        }
        builder.write_conditions(&self.conditions)?;
        Ok(builder.finish(&self.table, None))
    }

    /// Renders `SELECT pk FROM table WHERE ...` with the update's conditions.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::Invalid`] when conditions are missing or malformed.
    pub fn compile_key_lookup(
        &self,
        dialect: &dyn Dialect,
        primary_key: &str,
    ) -> Result<CompiledStatement, StatementError> {
        if self.conditions.is_empty() {
            return Err(StatementError::Invalid(format!(
                "update of {} has no conditions",
                self.table
            )));
        }
        let mut builder = SqlBuilder::new(dialect);
        builder.write_str("SELECT ");
        builder.write_quoted(primary_key);
        builder.write_str(" FROM ");
        builder.write_quoted(&self.table);
        builder.write_conditions(&self.conditions)?;
        Ok(builder.finish(&self.table, None))
    }
}
