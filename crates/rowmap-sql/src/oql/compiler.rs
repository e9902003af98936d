use super::ast;
use super::lexer::{self, TokenKind};

use indexmap::IndexMap;
use rowmap_core::{schema::Registry, stmt::Value, EntityMetadata, Error, Result};
use std::sync::Arc;

/// SQL compiled from an OQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    /// SQL text with `?` placeholders
    pub sql: String,

    /// Name of the parameter behind each placeholder, in the order the
    /// placeholders appear in `sql`. A name repeats if the query uses it
    /// more than once.
    pub params: Vec<String>,
}

impl CompiledQuery {
    /// Arranges named parameter values in placeholder order. Values bound
    /// under names the query does not use are ignored.
    pub fn bind(&self, values: &IndexMap<String, Value>) -> Result<Vec<Value>> {
        self.params
            .iter()
            .map(|name| {
                values.get(name).cloned().ok_or_else(|| {
                    Error::query(format!("parameter `:{name}` is not bound"), &self.sql)
                })
            })
            .collect()
    }
}

type Scope = IndexMap<String, Arc<EntityMetadata>>;

/// Compiles parsed OQL to SQL, translating field references to columns.
#[derive(Debug)]
pub struct Compiler<'a> {
    registry: &'a Registry,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, query: &ast::Query) -> Result<CompiledQuery> {
        let root = self.registry.describe(&query.from)?;

        // Join conditions only see aliases introduced before or by their own
        // join. The remaining clauses see every alias.
        let mut scope = Scope::new();
        if let Some(alias) = &query.alias {
            scope.insert(alias.clone(), root.clone());
        }

        let mut full_scope = scope.clone();
        for join in &query.joins {
            full_scope.insert(join.alias.clone(), self.registry.describe(&join.entity)?);
        }

        let mut params = vec![];
        let mut sql = String::from("SELECT ");

        let selects_root = query
            .alias
            .as_deref()
            .is_some_and(|alias| alias.eq_ignore_ascii_case(query.select.trim()));

        if query.select == "*" || selects_root {
            sql.push_str(&expand(&root, query.alias.as_deref()));
        } else {
            sql.push_str(&translate(&query.select, &full_scope, &mut params)?);
        }

        sql.push_str(" FROM ");
        sql.push_str(&root.full_table_name());
        if let Some(alias) = &query.alias {
            sql.push(' ');
            sql.push_str(alias);
        }

        for join in &query.joins {
            let metadata = full_scope[&join.alias].clone();
            scope.insert(join.alias.clone(), metadata.clone());

            match &join.association {
                Some(association) => {
                    let source = query.entity_of(&association.source).ok_or_else(|| {
                        Error::query(
                            format!("unknown alias `{}`", association.source),
                            format!("{}.{}", association.source, association.name),
                        )
                    })?;

                    let resolved = self.registry.association_join(
                        source,
                        &association.name,
                        &association.source,
                        &join.alias,
                    )?;

                    let last = resolved.steps.len() - 1;
                    for (i, step) in resolved.steps.iter().enumerate() {
                        push_join(&mut sql, join.kind, &step.table, &step.alias, &step.condition);

                        if i == last {
                            if let Some(condition) = &join.condition {
                                sql.push_str(" AND (");
                                sql.push_str(&translate(condition, &scope, &mut params)?);
                                sql.push(')');
                            }
                        }
                    }
                }
                None => {
                    let condition = match &join.condition {
                        Some(condition) => translate(condition, &scope, &mut params)?,
                        None => {
                            return Err(Error::query(
                                "explicit join requires an ON condition",
                                format!("{} {}", join.entity, join.alias),
                            ))
                        }
                    };

                    push_join(
                        &mut sql,
                        join.kind,
                        &metadata.full_table_name(),
                        &join.alias,
                        &condition,
                    );
                }
            }
        }

        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&translate(filter, &full_scope, &mut params)?);
        }

        if let Some(order_by) = &query.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(&translate(order_by, &full_scope, &mut params)?);
        }

        tracing::trace!(sql = %sql, params = params.len(), "compiled query");

        Ok(CompiledQuery { sql, params })
    }
}

fn push_join(sql: &mut String, kind: ast::JoinKind, table: &str, alias: &str, condition: &str) {
    sql.push(' ');
    sql.push_str(kind.as_sql());
    sql.push(' ');
    sql.push_str(table);
    sql.push(' ');
    sql.push_str(alias);
    sql.push_str(" ON ");
    sql.push_str(condition);
}

/// Every mapped column of the entity, alias-prefixed when aliased.
fn expand(metadata: &EntityMetadata, alias: Option<&str>) -> String {
    metadata
        .fields
        .values()
        .map(|field| match alias {
            Some(alias) => format!("{alias}.{}", field.column),
            None => field.column.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrites `alias.field` to `alias.column` and named parameters to `?`,
/// recording parameter names in order of appearance. Only whole tokens are
/// matched, and string literals are left alone.
fn translate(text: &str, scope: &Scope, params: &mut Vec<String>) -> Result<String> {
    let tokens = lexer::tokenize(text)?;
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if i > 0 && token.space_before {
            out.push(' ');
        }

        match token.kind {
            TokenKind::Param => {
                out.push('?');
                params.push(token.text.to_string());
            }
            TokenKind::Ident => match field_reference(&tokens[i..], scope) {
                Some((alias, metadata, field)) => {
                    let column = resolve_column(metadata, alias, field)?;
                    out.push_str(alias);
                    out.push('.');
                    out.push_str(column);
                    i += 3;
                    continue;
                }
                None => out.push_str(token.text),
            },
            _ => out.push_str(token.text),
        }

        i += 1;
    }

    Ok(out)
}

/// Matches `alias . field` at the head of `tokens`, with no whitespace
/// around the period and `alias` bound in `scope`.
fn field_reference<'t, 's>(
    tokens: &[lexer::Token<'t>],
    scope: &'s Scope,
) -> Option<(&'t str, &'s EntityMetadata, &'t str)> {
    let [alias, dot, field, ..] = tokens else {
        return None;
    };

    if !dot.is_punct(".") || dot.space_before || field.space_before {
        return None;
    }

    if field.kind != TokenKind::Ident {
        return None;
    }

    let metadata = scope.get(alias.text)?;
    Some((alias.text, metadata, field.text))
}

fn resolve_column<'m>(
    metadata: &'m EntityMetadata,
    alias: &str,
    name: &'m str,
) -> Result<&'m str> {
    if let Some(column) = metadata.column(name) {
        return Ok(column);
    }

    // Already a column name
    if metadata.fields.values().any(|field| field.column == name) {
        return Ok(name);
    }

    Err(Error::query(
        format!("`{}` has no field `{name}`", metadata.class),
        format!("{alias}.{name}"),
    ))
}
