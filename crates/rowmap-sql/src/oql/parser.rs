use super::ast::{self, AssociationRef, Join, JoinKind};
use super::lexer::{self, Token, TokenKind};

use indexmap::IndexMap;
use rowmap_core::{schema::Registry, Error, Result};

/// Words that end a clause or cannot be used as an alias.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "INNER", "LEFT", "OUTER", "JOIN", "WITH", "ON", "WHERE", "ORDER", "BY",
];

/// Parses an OQL query.
///
/// The registry is consulted to resolve the target entity of association
/// joins, so that aliases they introduce are bound to a class.
pub fn parse(oql: &str, registry: &Registry) -> Result<ast::Query> {
    let oql = oql.trim();

    if oql.is_empty() {
        return Err(Error::query("query is empty", ""));
    }

    let tokens = lexer::tokenize(oql)?;

    Parser {
        tokens: &tokens,
        pos: 0,
        registry,
    }
    .parse_query()
}

struct Parser<'a, 'src> {
    tokens: &'a [Token<'src>],
    pos: usize,
    registry: &'a Registry,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn parse_query(&mut self) -> Result<ast::Query> {
        self.expect_keyword("SELECT")?;

        let select = self.clause(|p, i| p.tokens[i].is_keyword("FROM"))?;
        if select.is_empty() {
            return Err(self.error("missing projection"));
        }

        self.expect_keyword("FROM")?;
        let from = self.expect_ident("entity name")?.to_string();

        let alias = match self.peek() {
            Some(token) if is_alias(token) => {
                self.pos += 1;
                Some(token.text.to_string())
            }
            _ => None,
        };

        let mut aliases = IndexMap::new();
        if let Some(alias) = &alias {
            aliases.insert(alias.clone(), from.clone());
        }

        let mut joins = vec![];

        while let Some(kind) = self.join_kind()? {
            let join = self.parse_join(kind, &aliases)?;
            aliases.insert(join.alias.clone(), join.entity.clone());
            joins.push(join);
        }

        let filter = if self.eat_keyword("WHERE") {
            Some(self.condition(Self::is_order_by)?)
        } else {
            None
        };

        let order_by = if self.is_order_by(self.pos) {
            self.pos += 2;
            Some(self.condition(|_, _| false)?)
        } else {
            None
        };

        if self.peek().is_some() {
            let token = &self.tokens[self.pos];
            return Err(self.error(format!("unexpected `{}`", token.text)));
        }

        Ok(ast::Query {
            select,
            from,
            alias,
            joins,
            filter,
            order_by,
            aliases,
        })
    }

    /// Consumes the join keywords, if a join starts here.
    fn join_kind(&mut self) -> Result<Option<JoinKind>> {
        if self.eat_keyword("INNER") {
            self.expect_keyword("JOIN")?;
            Ok(Some(JoinKind::Inner))
        } else if self.is_left_join(self.pos) {
            self.pos += 1;
            self.eat_keyword("OUTER");
            self.expect_keyword("JOIN")?;
            Ok(Some(JoinKind::Left))
        } else if self.eat_keyword("JOIN") {
            Ok(Some(JoinKind::Inner))
        } else {
            Ok(None)
        }
    }

    fn parse_join(&mut self, kind: JoinKind, aliases: &IndexMap<String, String>) -> Result<Join> {
        let start = self.pos;
        let first = self.expect_ident("join target")?;

        let join = if self.peek().is_some_and(|token| token.is_punct(".")) {
            // alias.association alias [WITH condition]
            self.pos += 1;
            let name = self.expect_ident("association name")?;
            let alias = self.expect_alias()?;
            let fragment = lexer::join(&self.tokens[start..self.pos]);

            let Some(source) = aliases.get(first) else {
                return Err(Error::query(format!("unknown alias `{first}`"), fragment));
            };

            let metadata = self.registry.describe(source)?;
            let Some(association) = metadata.association(name) else {
                return Err(Error::query(
                    format!("`{source}` has no association `{name}`"),
                    fragment,
                ));
            };

            let condition = if self.eat_keyword("WITH") {
                Some(self.condition(Self::is_clause_start)?)
            } else {
                None
            };

            Join {
                kind,
                entity: association.target.clone(),
                alias,
                condition,
                association: Some(AssociationRef {
                    source: first.to_string(),
                    name: name.to_string(),
                }),
            }
        } else {
            // Entity alias ON condition
            let alias = self.expect_alias()?;
            self.expect_keyword("ON")?;
            let condition = self.condition(Self::is_clause_start)?;

            Join {
                kind,
                entity: first.to_string(),
                alias,
                condition: Some(condition),
                association: None,
            }
        };

        if aliases.contains_key(&join.alias) {
            let fragment = lexer::join(&self.tokens[start..self.pos]);
            return Err(Error::query(
                format!("duplicate alias `{}`", join.alias),
                fragment,
            ));
        }

        Ok(join)
    }

    /// Consumes a non-empty condition up to the next clause.
    fn condition(&mut self, stop: fn(&Self, usize) -> bool) -> Result<String> {
        let condition = self.clause(stop)?;
        if condition.is_empty() {
            return Err(self.error("expected condition"));
        }
        Ok(condition)
    }

    /// Consumes tokens until `stop` matches outside of parentheses.
    fn clause(&mut self, stop: fn(&Self, usize) -> bool) -> Result<String> {
        let start = self.pos;
        let mut depth = 0usize;

        while self.pos < self.tokens.len() {
            let token = &self.tokens[self.pos];

            if depth == 0 && stop(self, self.pos) {
                break;
            }

            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| self.error("unbalanced `)`"))?;
            }

            self.pos += 1;
        }

        if depth != 0 {
            return Err(Error::query(
                "unbalanced `(`",
                lexer::join(&self.tokens[start..]),
            ));
        }

        Ok(lexer::join(&self.tokens[start..self.pos]))
    }

    fn is_clause_start(&self, i: usize) -> bool {
        let token = &self.tokens[i];
        token.is_keyword("INNER")
            || token.is_keyword("JOIN")
            || token.is_keyword("WHERE")
            || self.is_left_join(i)
            || self.is_order_by(i)
    }

    fn is_left_join(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_keyword("LEFT"))
            && self
                .tokens
                .get(i + 1)
                .is_some_and(|t| t.is_keyword("JOIN") || t.is_keyword("OUTER"))
    }

    fn is_order_by(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_keyword("ORDER"))
            && self.tokens.get(i + 1).is_some_and(|t| t.is_keyword("BY"))
    }

    fn peek(&self) -> Option<&'a Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{keyword}`")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<&'src str> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                let text = token.text;
                self.pos += 1;
                Ok(text)
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn expect_alias(&mut self) -> Result<String> {
        match self.peek() {
            Some(token) if is_alias(token) => {
                let alias = token.text.to_string();
                self.pos += 1;
                Ok(alias)
            }
            _ => Err(self.error("expected alias")),
        }
    }

    /// Query error pointing at the remaining input.
    fn error(&self, message: impl Into<String>) -> Error {
        let rest = lexer::join(&self.tokens[self.pos.min(self.tokens.len())..]);
        let fragment = if rest.is_empty() {
            "end of query".to_string()
        } else {
            rest
        };
        Error::query(message, fragment)
    }
}

fn is_alias(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Ident && !RESERVED.iter().any(|word| token.is_keyword(word))
}
