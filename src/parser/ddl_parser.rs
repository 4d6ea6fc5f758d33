//! Token-based DDL parsing for T-SQL
//!
//! Only the parts of a definition that feed the schema catalog are kept:
//! column names, types and nullability, key constraints and indexes.
//!
//! ## Supported Syntax
//!
//! ```sql
//! CREATE TABLE [schema].[name] (col TYPE [NOT NULL] [PRIMARY KEY], ..., CONSTRAINT PK PRIMARY KEY (cols))
//! CREATE [UNIQUE] [CLUSTERED | NONCLUSTERED] INDEX name ON [schema].[table] (cols) [INCLUDE (cols)]
//! CREATE [OR ALTER] VIEW [schema].[name] [WITH SCHEMABINDING] AS SELECT ...
//! ALTER TABLE [schema].[name] [WITH CHECK] ADD CONSTRAINT name PRIMARY KEY | UNIQUE (cols)
//! ```

use super::ast::{
    AlterTable, ColumnDef, CreateIndex, CreateTable, CreateView, RoutineKind, Statement,
    TableConstraint,
};
use super::statement_parser::StatementParser;
use crate::error::ParseError;

/// Words that open a table-level constraint inside CREATE TABLE
const TABLE_CONSTRAINT_STARTS: &[&str] =
    &["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "INDEX"];

impl StatementParser {
    /// Dispatch on the object type after CREATE / ALTER / CREATE OR ALTER
    pub(super) fn parse_create_or_alter(&mut self) -> Result<Statement, ParseError> {
        let is_alter = self.base.check_word("ALTER");
        self.base.advance();
        if !is_alter && self.base.check_word("OR") && self.base.check_word_at(1, "ALTER") {
            self.base.advance();
            self.base.advance();
        }

        if self.base.check_word("PROC") || self.base.check_word("PROCEDURE") {
            let def = self.parse_routine(RoutineKind::Procedure)?;
            return Ok(Statement::ProcedureDef(Box::new(def)));
        }
        if self.base.check_word("FUNCTION") {
            let def = self.parse_routine(RoutineKind::Function)?;
            return Ok(Statement::ProcedureDef(Box::new(def)));
        }
        if self.base.check_word("VIEW") {
            return self.parse_create_view();
        }
        if self.base.check_word("TRIGGER") {
            return Ok(self.unsupported("TRIGGER"));
        }
        if self.base.check_word("TABLE") {
            return if is_alter {
                Ok(Statement::AlterTable(self.parse_alter_table()?))
            } else {
                Ok(Statement::CreateTable(self.parse_create_table()?))
            };
        }
        if !is_alter
            && self
                .base
                .check_any_word(&["UNIQUE", "CLUSTERED", "NONCLUSTERED", "INDEX"])
        {
            return Ok(Statement::CreateIndex(self.parse_create_index()?));
        }

        self.skip_rest();
        Ok(Statement::Other {
            keyword: if is_alter { "ALTER" } else { "CREATE" }.to_string(),
        })
    }

    // ========================================================================
    // CREATE TABLE
    // ========================================================================

    fn parse_create_table(&mut self) -> Result<CreateTable, ParseError> {
        self.base.expect_word("TABLE")?;
        let name_start = self.base.current_position();
        let name = self.base.parse_object_name()?;
        let name_span = self.base.span_from(name_start);

        self.base.expect_punct("(")?;
        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        while !self.base.check_punct(")") && !self.base.is_at_end() {
            if self.base.check_any_word(TABLE_CONSTRAINT_STARTS) {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }
            self.skip_element_tail();
            if !self.base.consume_punct(",") {
                break;
            }
        }
        self.base.expect_punct(")")?;

        // ON [PRIMARY], WITH (...), TEXTIMAGE_ON ...
        self.skip_rest();

        Ok(CreateTable {
            name,
            columns,
            constraints,
            name_span,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let start = self.base.current_position();
        let name = self.base.parse_identifier_with(true)?;

        // Computed column
        if self.base.consume_word("AS") {
            self.skip_element_tail();
            return Ok(ColumnDef {
                name,
                data_type: String::new(),
                nullable: true,
                inline_constraint: None,
                span: self.base.span_from(start),
            });
        }

        let data_type = self.base.parse_data_type()?;
        let mut nullable = true;
        let mut inline_constraint = None;
        let mut constraint_name = None;

        while let Some(t) = self.base.current_token() {
            if t.is_punct(",") || t.is_punct(")") {
                break;
            }
            if t.is_punct("(") {
                self.base.skip_parenthesized();
            } else if t.is_word("NOT") && self.base.check_word_at(1, "NULL") {
                self.base.advance();
                self.base.advance();
                nullable = false;
            } else if t.is_word("NULL") {
                self.base.advance();
            } else if t.is_word("CONSTRAINT") {
                self.base.advance();
                constraint_name = Some(self.base.parse_identifier_with(true)?);
            } else if t.is_word("PRIMARY") && self.base.check_word_at(1, "KEY") {
                self.base.advance();
                self.base.advance();
                let clustered = !self.base.consume_word("NONCLUSTERED");
                self.base.consume_word("CLUSTERED");
                nullable = false;
                inline_constraint = Some(TableConstraint::PrimaryKey {
                    name: constraint_name.take(),
                    columns: vec![name.clone()],
                    clustered,
                });
            } else if t.is_word("UNIQUE") {
                self.base.advance();
                let clustered = self.base.consume_word("CLUSTERED");
                self.base.consume_word("NONCLUSTERED");
                inline_constraint = Some(TableConstraint::Unique {
                    name: constraint_name.take(),
                    columns: vec![name.clone()],
                    clustered,
                });
            } else {
                self.base.advance();
            }
        }

        Ok(ColumnDef {
            name,
            data_type,
            nullable,
            inline_constraint,
            span: self.base.span_from(start),
        })
    }

    /// `[CONSTRAINT name] PRIMARY KEY | UNIQUE | INDEX | FOREIGN KEY | CHECK ...`
    fn parse_table_constraint(&mut self) -> Result<TableConstraint, ParseError> {
        let name = if self.base.consume_word("CONSTRAINT") {
            Some(self.base.parse_identifier_with(true)?)
        } else {
            None
        };

        if self.base.check_word("PRIMARY") {
            self.base.advance();
            self.base.expect_word("KEY")?;
            let clustered = !self.base.consume_word("NONCLUSTERED");
            self.base.consume_word("CLUSTERED");
            let columns = self.base.parse_column_list()?;
            return Ok(TableConstraint::PrimaryKey {
                name,
                columns,
                clustered,
            });
        }

        if self.base.consume_word("UNIQUE") {
            let clustered = self.base.consume_word("CLUSTERED");
            self.base.consume_word("NONCLUSTERED");
            let columns = self.base.parse_column_list()?;
            return Ok(TableConstraint::Unique {
                name,
                columns,
                clustered,
            });
        }

        if self.base.consume_word("INDEX") {
            let index_name = self.base.parse_identifier_with(true)?;
            let unique = self.base.consume_word("UNIQUE");
            let clustered = self.base.consume_word("CLUSTERED");
            self.base.consume_word("NONCLUSTERED");
            let columns = self.base.parse_column_list()?;
            let included_columns = if self.base.consume_word("INCLUDE") {
                self.base.parse_column_list()?
            } else {
                Vec::new()
            };
            return Ok(TableConstraint::Index {
                name: index_name,
                columns,
                included_columns,
                unique,
                clustered,
            });
        }

        Ok(TableConstraint::Other)
    }

    /// Skip to the `,` or `)` that ends the current table element
    fn skip_element_tail(&mut self) {
        while let Some(t) = self.base.current_token() {
            if t.is_punct(",") || t.is_punct(")") {
                return;
            }
            if t.is_punct("(") {
                self.base.skip_parenthesized();
            } else {
                self.base.advance();
            }
        }
    }

    // ========================================================================
    // CREATE INDEX / VIEW, ALTER TABLE
    // ========================================================================

    fn parse_create_index(&mut self) -> Result<CreateIndex, ParseError> {
        let unique = self.base.consume_word("UNIQUE");
        let clustered = self.base.consume_word("CLUSTERED");
        if !clustered {
            self.base.consume_word("NONCLUSTERED");
        }
        self.base.consume_word("COLUMNSTORE");
        self.base.expect_word("INDEX")?;

        let name_start = self.base.current_position();
        let name = self.base.parse_identifier_with(true)?;
        let name_span = self.base.span_from(name_start);

        self.base.expect_word("ON")?;
        let table = self.base.parse_object_name()?;
        let columns = if self.base.check_punct("(") {
            self.base.parse_column_list()?
        } else {
            Vec::new()
        };
        let included_columns = if self.base.consume_word("INCLUDE") {
            self.base.parse_column_list()?
        } else {
            Vec::new()
        };

        // WHERE filter, WITH options, ON filegroup
        self.skip_rest();

        Ok(CreateIndex {
            name,
            table,
            columns,
            included_columns,
            unique,
            clustered,
            name_span,
        })
    }

    fn parse_create_view(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word("VIEW")?;
        let name_start = self.base.current_position();
        let name = self.base.parse_object_name()?;
        let name_span = self.base.span_from(name_start);

        if self.base.check_punct("(") {
            self.base.skip_parenthesized();
        }
        while !self.base.is_at_end() && !self.base.check_word("AS") {
            self.base.advance();
        }
        self.base.expect_word("AS")?;

        if self.base.check_word("WITH") {
            return Ok(self.unsupported("CTE"));
        }

        let query = self.parse_select()?;
        if self.base.check_word("WITH") && self.base.check_word_at(1, "CHECK") {
            self.skip_rest();
        }

        Ok(Statement::CreateView(Box::new(CreateView {
            name,
            query,
            name_span,
        })))
    }

    fn parse_alter_table(&mut self) -> Result<AlterTable, ParseError> {
        self.base.expect_word("TABLE")?;
        let table = self.base.parse_object_name()?;

        if self.base.consume_word("WITH") && !self.base.consume_word("CHECK") {
            self.base.consume_word("NOCHECK");
        }

        let mut add_constraint = None;
        if self.base.consume_word("ADD")
            && self
                .base
                .check_any_word(&["CONSTRAINT", "PRIMARY", "UNIQUE", "INDEX"])
        {
            let constraint = self.parse_table_constraint()?;
            if constraint != TableConstraint::Other {
                add_constraint = Some(constraint);
            }
        }
        self.skip_rest();

        Ok(AlterTable {
            table,
            add_constraint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::ObjectName;
    use crate::parser::lexer::tokenize;

    fn parse(sql: &str) -> Statement {
        StatementParser::new(tokenize(sql, 1).unwrap())
            .parse_complete()
            .unwrap()
    }

    #[test]
    fn test_create_table_columns_and_keys() {
        let Statement::CreateTable(table) = parse(
            "CREATE TABLE [dbo].[Orders] (\n\
               [OrderID] INT IDENTITY(1, 1) NOT NULL,\n\
               [CustomerID] INT NOT NULL CONSTRAINT FK_C REFERENCES dbo.Customers (CustomerID),\n\
               [OrderDate] DATETIME NOT NULL DEFAULT (GETDATE()),\n\
               [Price] DECIMAL(18, 2) NULL,\n\
               [Total] AS ([Price] * 2),\n\
               CONSTRAINT [PK_Orders] PRIMARY KEY CLUSTERED ([OrderID] ASC)\n\
             ) ON [PRIMARY]",
        ) else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(table.name, ObjectName::new(Some("dbo"), "Orders"));
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.columns[3].data_type, "DECIMAL(18, 2)");
        assert!(!table.columns[0].nullable);
        assert!(table.columns[3].nullable);
        assert_eq!(table.columns[4].data_type, "");
        assert_eq!(
            table.constraints,
            vec![TableConstraint::PrimaryKey {
                name: Some("PK_Orders".to_string()),
                columns: vec!["OrderID".to_string()],
                clustered: true
            }]
        );
    }

    #[test]
    fn test_inline_primary_key() {
        let Statement::CreateTable(table) =
            parse("CREATE TABLE Customers (CustomerID INT PRIMARY KEY, Name NVARCHAR(100))")
        else {
            panic!("expected CREATE TABLE");
        };
        assert!(matches!(
            table.columns[0].inline_constraint,
            Some(TableConstraint::PrimaryKey { clustered: true, .. })
        ));
    }

    #[test]
    fn test_create_index_with_include() {
        let Statement::CreateIndex(index) = parse(
            "CREATE NONCLUSTERED INDEX IX_Orders_Date ON dbo.Orders (OrderDate DESC) \
             INCLUDE (Price, Quantity) WITH (FILLFACTOR = 80)",
        ) else {
            panic!("expected CREATE INDEX");
        };
        assert_eq!(index.name, "IX_Orders_Date");
        assert_eq!(index.columns, vec!["OrderDate"]);
        assert_eq!(index.included_columns, vec!["Price", "Quantity"]);
        assert!(!index.unique);
        assert!(!index.clustered);
    }

    #[test]
    fn test_alter_table_add_primary_key() {
        let Statement::AlterTable(alter) = parse(
            "ALTER TABLE dbo.Customers ADD CONSTRAINT PK_Customers PRIMARY KEY CLUSTERED (CustomerID)",
        ) else {
            panic!("expected ALTER TABLE");
        };
        assert!(matches!(
            alter.add_constraint,
            Some(TableConstraint::PrimaryKey { .. })
        ));
    }

    #[test]
    fn test_create_view() {
        let Statement::CreateView(view) =
            parse("CREATE VIEW dbo.vw_ActiveCustomers AS SELECT CustomerID FROM dbo.Customers")
        else {
            panic!("expected CREATE VIEW");
        };
        assert_eq!(view.name.name, "vw_ActiveCustomers");
    }
}
