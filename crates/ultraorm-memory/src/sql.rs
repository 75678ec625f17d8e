//! Statement parsing for the embedded engine.
//!
//! The engine accepts exactly the statement shapes UltraORM's builders
//! emit: `CREATE TABLE [IF NOT EXISTS]`, single-row `INSERT`, `SELECT`
//! with equality conditions, `UPDATE`/`DELETE` keyed by one column.
//! Values arrive as bound parameters; the text never carries literals,
//! so parsing is structural.

use ultraorm_core::{Error, Result};

/// What a SELECT projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Projection {
    /// `*`
    All,
    /// `COUNT(*)`
    Count,
    /// Explicit column list.
    Columns(Vec<String>),
}

/// One column parsed from a CREATE TABLE item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnSpec {
    pub name: String,
    pub primary_key: bool,
    pub auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    CreateTable {
        table: String,
        if_not_exists: bool,
        columns: Vec<ColumnSpec>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
    },
    Select {
        table: String,
        projection: Projection,
        conditions: Vec<String>,
        /// (column, ascending) pairs in application order.
        order: Vec<(String, bool)>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    Update {
        table: String,
        sets: Vec<String>,
        key: String,
    },
    Delete {
        table: String,
        key: String,
    },
}

fn unsupported(sql: &str) -> Error {
    Error::backend(format!("unsupported statement: {sql}"))
}

pub(crate) fn parse(sql: &str) -> Result<Statement> {
    let trimmed = sql.trim();
    if let Some(rest) = trimmed.strip_prefix("SELECT ") {
        parse_select(rest).ok_or_else(|| unsupported(sql))
    } else if let Some(rest) = trimmed.strip_prefix("INSERT INTO ") {
        parse_insert(rest).ok_or_else(|| unsupported(sql))
    } else if let Some(rest) = trimmed.strip_prefix("UPDATE ") {
        parse_update(rest).ok_or_else(|| unsupported(sql))
    } else if let Some(rest) = trimmed.strip_prefix("DELETE FROM ") {
        parse_delete(rest).ok_or_else(|| unsupported(sql))
    } else if let Some(rest) = trimmed.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
        parse_create(rest, true).ok_or_else(|| unsupported(sql))
    } else if let Some(rest) = trimmed.strip_prefix("CREATE TABLE ") {
        parse_create(rest, false).ok_or_else(|| unsupported(sql))
    } else {
        Err(unsupported(sql))
    }
}

fn parse_select(rest: &str) -> Option<Statement> {
    let (projection_text, rest) = rest.split_once(" FROM ")?;
    let projection = parse_projection(projection_text)?;

    let (rest, offset) = take_tail_number(rest, " OFFSET ");
    let (rest, limit) = take_tail_number(rest, " LIMIT ");
    let (rest, order_text) = take_tail_text(rest, " ORDER BY ");
    let order = match order_text {
        Some(text) => parse_order(text)?,
        None => Vec::new(),
    };
    let (table, conditions) = match rest.split_once(" WHERE ") {
        Some((table, where_text)) => (table, parse_conditions(where_text)?),
        None => (rest, Vec::new()),
    };
    if !is_bare_name(table) {
        return None;
    }

    Some(Statement::Select {
        table: table.to_string(),
        projection,
        conditions,
        order,
        limit,
        offset,
    })
}

fn parse_insert(rest: &str) -> Option<Statement> {
    let (table, rest) = rest.split_once(" (")?;
    let (columns_text, rest) = rest.split_once(')')?;
    let placeholders_text = rest
        .strip_prefix(" VALUES (")
        .and_then(|tail| tail.strip_suffix(')'))?;

    let columns: Vec<String> = if columns_text.is_empty() {
        Vec::new()
    } else {
        columns_text.split(", ").map(str::to_string).collect()
    };
    let placeholder_count = if placeholders_text.is_empty() {
        0
    } else {
        placeholders_text.split(", ").count()
    };
    if placeholder_count != columns.len() || !is_bare_name(table) {
        return None;
    }

    Some(Statement::Insert {
        table: table.to_string(),
        columns,
    })
}

fn parse_update(rest: &str) -> Option<Statement> {
    let (table, rest) = rest.split_once(" SET ")?;
    let (sets_text, key_text) = rest.rsplit_once(" WHERE ")?;
    let sets = sets_text
        .split(", ")
        .map(parse_assignment)
        .collect::<Option<Vec<String>>>()?;
    let key = parse_assignment(key_text)?;
    if sets.is_empty() || !is_bare_name(table) {
        return None;
    }

    Some(Statement::Update {
        table: table.to_string(),
        sets,
        key,
    })
}

fn parse_delete(rest: &str) -> Option<Statement> {
    let (table, key_text) = rest.split_once(" WHERE ")?;
    let key = parse_assignment(key_text)?;
    if !is_bare_name(table) {
        return None;
    }

    Some(Statement::Delete {
        table: table.to_string(),
        key,
    })
}

fn parse_create(rest: &str, if_not_exists: bool) -> Option<Statement> {
    let (table, rest) = rest.split_once(" (")?;
    let items_text = rest.strip_suffix(')')?;
    let mut columns = Vec::new();
    for item in split_top_level(items_text) {
        if item.starts_with("CONSTRAINT ") {
            continue;
        }
        let name = item.split_whitespace().next()?.to_string();
        columns.push(ColumnSpec {
            name,
            primary_key: item.contains("PRIMARY KEY"),
            auto_increment: item.contains("AUTO_INCREMENT"),
        });
    }
    if columns.is_empty() || !is_bare_name(table) {
        return None;
    }

    Some(Statement::CreateTable {
        table: table.to_string(),
        if_not_exists,
        columns,
    })
}

/// `col = ?` → column name.
fn parse_assignment(text: &str) -> Option<String> {
    let (column, placeholder) = text.split_once(" = ")?;
    (placeholder == "?" && is_bare_name(column)).then(|| column.to_string())
}

fn parse_conditions(text: &str) -> Option<Vec<String>> {
    text.split(" AND ").map(parse_assignment).collect()
}

fn parse_order(text: &str) -> Option<Vec<(String, bool)>> {
    text.split(", ")
        .map(|pair| {
            let (column, direction) = pair.rsplit_once(' ')?;
            let ascending = match direction {
                "ASC" => true,
                "DESC" => false,
                _ => return None,
            };
            is_bare_name(column).then(|| (column.to_string(), ascending))
        })
        .collect()
}

fn parse_projection(text: &str) -> Option<Projection> {
    match text {
        "*" => Some(Projection::All),
        "COUNT(*)" => Some(Projection::Count),
        _ => {
            let columns: Vec<String> = text.split(", ").map(str::to_string).collect();
            columns.iter().all(|c| is_bare_name(c)).then_some(Projection::Columns(columns))
        }
    }
}

fn is_bare_name(text: &str) -> bool {
    !text.is_empty() && !text.contains(char::is_whitespace)
}

/// Peel a trailing `<marker><number>` clause. Returns the input untouched
/// when the suffix after the marker is not a plain integer.
fn take_tail_number<'a>(text: &'a str, marker: &str) -> (&'a str, Option<usize>) {
    if let Some(pos) = text.rfind(marker) {
        let tail = &text[pos + marker.len()..];
        if let Ok(n) = tail.parse::<usize>() {
            return (&text[..pos], Some(n));
        }
    }
    (text, None)
}

fn take_tail_text<'a>(text: &'a str, marker: &str) -> (&'a str, Option<&'a str>) {
    match text.rfind(marker) {
        Some(pos) => (&text[..pos], Some(&text[pos + marker.len()..])),
        None => (text, None),
    }
}

/// Split on commas outside parentheses and single-quoted literals.
fn split_top_level(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    for c in text.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_quote && depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let last = current.trim();
    if !last.is_empty() {
        items.push(last.to_string());
    }
    items
}
