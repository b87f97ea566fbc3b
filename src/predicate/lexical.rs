/// Lexical WHERE-clause extractor.
///
/// Works in three passes over raw SQL text:
/// 1. Locate every WHERE clause boundary, respecting quoted strings,
///    comments, and parenthesis nesting so embedded keywords never truncate
///    extraction early.
/// 2. Split each clause on top-level AND/OR (BETWEEN..AND kept intact).
/// 3. Match each conjunct against a fixed set of recognized shapes:
///    `col = v`, `col IN (...)`, `col BETWEEN a AND b`, `col LIKE 'p'`,
///    `col > / < / >= / <=`, and function wrappers around a column.
///
/// Unrecognized shapes yield no hit, never an error.
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{alpha1, alphanumeric1, char, multispace0, multispace1},
    combinator::{recognize, value},
    multi::{many0, separated_list1},
    sequence::delimited,
    IResult, Parser,
};

use super::{OperatorKind, PredicateExtractionStrategy, PredicateHit};
use crate::query_log::QueryRecord;

/// Default predicate extraction strategy.
pub struct LexicalExtractor;

impl PredicateExtractionStrategy for LexicalExtractor {
    fn extract(&self, record: &QueryRecord) -> Vec<PredicateHit> {
        let mut hits = Vec::new();
        for clause in find_where_clauses(&record.raw_text) {
            for term in split_top_level(clause) {
                if let Some((token, kind)) = match_predicate_shape(term) {
                    attribute_hits(record, token, kind, &mut hits);
                }
            }
        }
        hits
    }
}

/// A parsed column reference, possibly qualified (`orders.region`).
#[derive(Debug, Clone, PartialEq)]
struct ColumnToken {
    qualifier: Option<String>,
    column: String,
}

// ---------------------------------------------------------------------------
// Pass 1: WHERE clause boundaries
// ---------------------------------------------------------------------------

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric() || b >= 0x80
}

/// Case-insensitive keyword match at `pos` with word boundaries on both sides.
fn keyword_at(bytes: &[u8], pos: usize, kw: &[u8]) -> bool {
    if pos + kw.len() > bytes.len() {
        return false;
    }
    if !bytes[pos..pos + kw.len()].eq_ignore_ascii_case(kw) {
        return false;
    }
    if pos > 0 && is_ident_byte(bytes[pos - 1]) {
        return false;
    }
    let after = pos + kw.len();
    after >= bytes.len() || !is_ident_byte(bytes[after])
}

/// Two keywords separated by whitespace (`GROUP BY`, `ORDER BY`).
fn keyword_pair_at(bytes: &[u8], pos: usize, first: &[u8], second: &[u8]) -> bool {
    if !keyword_at(bytes, pos, first) {
        return false;
    }
    let mut p = pos + first.len();
    let ws_start = p;
    while p < bytes.len() && bytes[p].is_ascii_whitespace() {
        p += 1;
    }
    p > ws_start && keyword_at(bytes, p, second)
}

/// If `pos` starts a string literal, quoted identifier, or comment, return
/// the position just past it.
fn skip_atom(bytes: &[u8], pos: usize) -> Option<usize> {
    match bytes[pos] {
        b'\'' => {
            let mut p = pos + 1;
            while p < bytes.len() {
                if bytes[p] == b'\'' {
                    if p + 1 < bytes.len() && bytes[p + 1] == b'\'' {
                        p += 2; // escaped quote
                    } else {
                        return Some(p + 1);
                    }
                } else {
                    p += 1;
                }
            }
            Some(bytes.len())
        }
        q @ (b'"' | b'`') => {
            let mut p = pos + 1;
            while p < bytes.len() && bytes[p] != q {
                p += 1;
            }
            Some((p + 1).min(bytes.len()))
        }
        b'-' if pos + 1 < bytes.len() && bytes[pos + 1] == b'-' => {
            let mut p = pos + 2;
            while p < bytes.len() && bytes[p] != b'\n' {
                p += 1;
            }
            Some(p)
        }
        b'/' if pos + 1 < bytes.len() && bytes[pos + 1] == b'*' => {
            let mut p = pos + 2;
            while p + 1 < bytes.len() {
                if bytes[p] == b'*' && bytes[p + 1] == b'/' {
                    return Some(p + 2);
                }
                p += 1;
            }
            Some(bytes.len())
        }
        _ => None,
    }
}

/// Every WHERE clause body in the statement, subqueries included.
fn find_where_clauses(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut clauses = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if let Some(next) = skip_atom(bytes, pos) {
            pos = next;
            continue;
        }
        if keyword_at(bytes, pos, b"WHERE") {
            let start = pos + 5;
            let end = clause_end(bytes, start);
            let clause = sql[start..end].trim();
            if !clause.is_empty() {
                clauses.push(clause);
            }
            pos = start;
            continue;
        }
        pos += 1;
    }
    clauses
}

/// Find where a WHERE clause body ends: the next top-level clause keyword,
/// a closing paren below entry depth, a statement terminator, or end of text.
fn clause_end(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    let mut depth: u32 = 0;

    while pos < bytes.len() {
        if let Some(next) = skip_atom(bytes, pos) {
            pos = next;
            continue;
        }
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return pos;
                }
                depth -= 1;
            }
            b';' if depth == 0 => return pos,
            _ if depth == 0 => {
                if keyword_pair_at(bytes, pos, b"GROUP", b"BY")
                    || keyword_pair_at(bytes, pos, b"ORDER", b"BY")
                    || keyword_at(bytes, pos, b"LIMIT")
                    || keyword_at(bytes, pos, b"HAVING")
                    || keyword_at(bytes, pos, b"UNION")
                    || keyword_at(bytes, pos, b"QUALIFY")
                    || keyword_at(bytes, pos, b"WINDOW")
                {
                    return pos;
                }
            }
            _ => {}
        }
        pos += 1;
    }
    bytes.len()
}

// ---------------------------------------------------------------------------
// Pass 2: top-level boolean split
// ---------------------------------------------------------------------------

/// Split a clause body on AND/OR at depth 0. The AND belonging to a
/// BETWEEN..AND range is not a split point.
fn split_top_level(clause: &str) -> Vec<&str> {
    let bytes = clause.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    let mut depth: u32 = 0;
    let mut between_armed = false;

    while pos < bytes.len() {
        if let Some(next) = skip_atom(bytes, pos) {
            pos = next;
            continue;
        }
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                if keyword_at(bytes, pos, b"BETWEEN") {
                    between_armed = true;
                    pos += 7;
                    continue;
                }
                if keyword_at(bytes, pos, b"AND") {
                    if between_armed {
                        between_armed = false;
                        pos += 3;
                        continue;
                    }
                    parts.push(&clause[start..pos]);
                    pos += 3;
                    start = pos;
                    continue;
                }
                if keyword_at(bytes, pos, b"OR") {
                    between_armed = false;
                    parts.push(&clause[start..pos]);
                    pos += 2;
                    start = pos;
                    continue;
                }
            }
            _ => {}
        }
        pos += 1;
    }
    parts.push(&clause[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 3: conjunct shape matching
// ---------------------------------------------------------------------------

/// Words that can never be filter columns. Keeps the lexical matcher from
/// producing hits on clause keywords inside shapes it half-recognizes.
const RESERVED: [&str; 28] = [
    "select", "from", "where", "and", "or", "not", "in", "like", "ilike", "between", "is",
    "null", "true", "false", "exists", "case", "when", "then", "else", "end", "group", "order",
    "by", "limit", "having", "union", "join", "on",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('`'), take_while1(|c| c != '`'), char('`')),
        delimited(char('"'), take_while1(|c| c != '"'), char('"')),
        recognize((
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
    ))
    .parse(input)
}

/// Dotted column reference. The part before the column becomes the
/// qualifier; deeper prefixes (db.schema.table.col) are dropped.
fn parse_column_ref(input: &str) -> IResult<&str, ColumnToken> {
    let (input, parts) = separated_list1(char('.'), parse_identifier).parse(input)?;
    let column = parts[parts.len() - 1].to_lowercase();
    let qualifier = if parts.len() >= 2 {
        Some(parts[parts.len() - 2].to_lowercase())
    } else {
        None
    };
    Ok((input, ColumnToken { qualifier, column }))
}

/// Function wrapper around a column, e.g. `DATE(ts)` or
/// `DATE_TRUNC('day', created_at)` - extracts the inner column.
fn parse_function_wrapped(input: &str) -> IResult<&str, ColumnToken> {
    let (input, name) = parse_identifier(input)?;
    if is_reserved(&name.to_lowercase()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (rest, args) = take_balanced(input)?;

    match first_column_in_args(args) {
        Some(token) => Ok((rest, token)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::Fail,
        ))),
    }
}

/// Consume up to (and including) the paren matching an already-consumed
/// `(`. Returns (remaining, inner-args slice).
fn take_balanced(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut pos = 0;
    let mut depth: u32 = 0;

    while pos < bytes.len() {
        if let Some(next) = skip_atom(bytes, pos) {
            pos = next;
            continue;
        }
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos]));
                }
                depth -= 1;
            }
            _ => {}
        }
        pos += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Fail,
    )))
}

/// First bare column reference among comma-separated function arguments.
fn first_column_in_args(args: &str) -> Option<ColumnToken> {
    for arg in split_top_level_commas(args) {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }
        if let Ok((_, token)) = parse_column_operand(arg) {
            if !is_reserved(&token.column) {
                return Some(token);
            }
        }
    }
    None
}

fn split_top_level_commas(args: &str) -> Vec<&str> {
    let bytes = args.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    let mut depth: u32 = 0;

    while pos < bytes.len() {
        if let Some(next) = skip_atom(bytes, pos) {
            pos = next;
            continue;
        }
        match bytes[pos] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&args[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    parts.push(&args[start..]);
    parts
}

fn parse_column_operand(input: &str) -> IResult<&str, ColumnToken> {
    alt((parse_function_wrapped, parse_column_ref)).parse(input)
}

fn parse_comparison_kind(input: &str) -> IResult<&str, OperatorKind> {
    alt((
        value(OperatorKind::Unknown, tag("<>")),
        value(OperatorKind::Unknown, tag("!=")),
        value(OperatorKind::Range, tag("<=")),
        value(OperatorKind::Range, tag(">=")),
        value(OperatorKind::Range, tag("<")),
        value(OperatorKind::Range, tag(">")),
        value(OperatorKind::Equality, tag("=")),
    ))
    .parse(input)
}

/// Match one conjunct against the recognized predicate shapes.
fn match_predicate_shape(term: &str) -> Option<(ColumnToken, OperatorKind)> {
    let term = term.trim();

    // Leading NOT negates but doesn't change which column is filtered.
    if let Ok((rest, _)) = tag_no_case::<_, _, nom::error::Error<&str>>("NOT")(term) {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            return match_predicate_shape(rest);
        }
    }

    let (rest, token) = parse_column_operand(term).ok()?;
    if is_reserved(&token.column) {
        return None;
    }
    let (rest, _) = multispace0::<_, nom::error::Error<&str>>(rest).ok()?;

    // Symbolic comparison operators
    if let Ok((after, kind)) = parse_comparison_kind(rest) {
        if after.trim().is_empty() {
            return None; // dangling operator, not a predicate
        }
        return Some((token, kind));
    }

    // IS [NOT] NULL
    if let Ok((after, _)) = tag_no_case::<_, _, nom::error::Error<&str>>("IS")(rest) {
        let (after, _) = multispace1::<_, nom::error::Error<&str>>(after).ok()?;
        let after = match tag_no_case::<_, _, nom::error::Error<&str>>("NOT")(after) {
            Ok((a, _)) => multispace1::<_, nom::error::Error<&str>>(a).ok()?.0,
            Err(_) => after,
        };
        if tag_no_case::<_, _, nom::error::Error<&str>>("NULL")(after).is_ok() {
            return Some((token, OperatorKind::Unknown));
        }
        return None;
    }

    // Optional NOT before IN / LIKE / BETWEEN
    let rest = match tag_no_case::<_, _, nom::error::Error<&str>>("NOT")(rest) {
        Ok((after, _)) => multispace1::<_, nom::error::Error<&str>>(after).ok()?.0,
        Err(_) => rest,
    };

    if let Ok((after, _)) = tag_no_case::<_, _, nom::error::Error<&str>>("IN")(rest) {
        let (after, _) = multispace0::<_, nom::error::Error<&str>>(after).ok()?;
        if after.starts_with('(') {
            return Some((token, OperatorKind::In));
        }
        return None;
    }

    for like_kw in ["ILIKE", "LIKE"] {
        if let Ok((after, _)) = tag_no_case::<_, _, nom::error::Error<&str>>(like_kw)(rest) {
            if after.starts_with(|c: char| c.is_whitespace()) && !after.trim().is_empty() {
                return Some((token, OperatorKind::Like));
            }
            return None;
        }
    }

    if let Ok((after, _)) = tag_no_case::<_, _, nom::error::Error<&str>>("BETWEEN")(rest) {
        if after.starts_with(|c: char| c.is_whitespace()) && !after.trim().is_empty() {
            return Some((token, OperatorKind::Range));
        }
        return None;
    }

    None
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

/// Attach one matched column/operator to the record's table(s).
///
/// A qualifier matching a referenced table resolves the hit to that table
/// with the bare column name. An unmatched qualifier is retained in the
/// column name to keep the ambiguity visible. Unqualified columns attach to
/// every referenced table; catalog validation prunes wrong attributions.
fn attribute_hits(
    record: &QueryRecord,
    token: ColumnToken,
    kind: OperatorKind,
    hits: &mut Vec<PredicateHit>,
) {
    match &token.qualifier {
        Some(qualifier) => {
            if let Some(table) = record
                .table_references
                .iter()
                .find(|t| t.matches_name(qualifier))
            {
                hits.push(PredicateHit {
                    table_reference: table.clone(),
                    column_name: token.column,
                    operator_kind: kind,
                    query_timestamp: record.timestamp,
                });
            } else {
                let retained = format!("{}.{}", qualifier, token.column);
                for table in &record.table_references {
                    hits.push(PredicateHit {
                        table_reference: table.clone(),
                        column_name: retained.clone(),
                        operator_kind: kind,
                        query_timestamp: record.timestamp,
                    });
                }
            }
        }
        None => {
            for table in &record.table_references {
                hits.push(PredicateHit {
                    table_reference: table.clone(),
                    column_name: token.column.clone(),
                    operator_kind: kind,
                    query_timestamp: record.timestamp,
                });
            }
        }
    }
}
