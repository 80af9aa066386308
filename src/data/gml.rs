//! GML network reader
//!
//! Handles the subset of GML that network datasets use: a top-level
//! `graph [ ... ]` block holding `directed`, `node [ id .. label .. ]` and
//! `edge [ source .. target .. value .. ]` entries. Other keys are skipped.

use crate::error::InputError;
use crate::graph::{CompressedGraph, GraphBuilder};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Number(f64),
    Text(String),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Text(String),
    List(Vec<(String, Value)>),
}

impl Value {
    /// Render a scalar as an identifier string; integers lose their fraction
    fn as_key(&self) -> Option<String> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Value::Number(n) => Some(n.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::List(_) => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

fn syntax(line: usize, message: impl Into<String>) -> InputError {
    InputError::Syntax {
        line,
        message: message.into(),
    }
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, InputError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '[' => {
                tokens.push((Token::Open, line));
                chars.next();
            }
            ']' => {
                tokens.push((Token::Close, line));
                chars.next();
            }
            '"' => {
                let start = line;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            text.push(c);
                        }
                        None => return Err(syntax(start, "unterminated string")),
                    }
                }
                tokens.push((Token::Text(text), start));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut raw = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                        raw.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = raw
                    .parse::<f64>()
                    .map_err(|_| syntax(line, format!("invalid number `{}`", raw)))?;
                tokens.push((Token::Number(value), line));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut key = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        key.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Key(key), line));
            }
            other => return Err(syntax(line, format!("unexpected character `{}`", other))),
        }
    }

    Ok(tokens)
}

/// Parse `key value` pairs until the matching `]` (or end of input at top level)
fn parse_list(
    tokens: &[(Token, usize)],
    pos: &mut usize,
    opened_at: Option<usize>,
) -> Result<Vec<(String, Value)>, InputError> {
    let mut items = Vec::new();

    loop {
        let Some((token, line)) = tokens.get(*pos) else {
            return match opened_at {
                Some(line) => Err(syntax(line, "unterminated list")),
                None => Ok(items),
            };
        };
        *pos += 1;

        let key = match token {
            Token::Close if opened_at.is_some() => return Ok(items),
            Token::Close => return Err(syntax(*line, "unexpected `]`")),
            Token::Key(key) => key.clone(),
            _ => return Err(syntax(*line, "expected a key")),
        };

        let (token, line) = tokens
            .get(*pos)
            .ok_or_else(|| syntax(*line, format!("missing value for `{}`", key)))?;
        *pos += 1;

        let value = match token {
            Token::Number(n) => Value::Number(*n),
            Token::Text(s) => Value::Text(s.clone()),
            Token::Open => Value::List(parse_list(tokens, pos, Some(*line))?),
            _ => return Err(syntax(*line, format!("invalid value for `{}`", key))),
        };
        items.push((key, value));
    }
}

fn find<'a>(items: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Parse GML text into a graph
pub fn parse_gml(text: &str) -> Result<CompressedGraph, InputError> {
    let tokens = tokenize(text)?;
    let mut pos = 0;
    let top = parse_list(&tokens, &mut pos, None)?;

    let graph_items = match find(&top, "graph") {
        Some(Value::List(items)) => items,
        _ => return Err(InputError::MissingGraph),
    };

    let directed = find(graph_items, "directed")
        .and_then(Value::as_number)
        .map_or(false, |d| d != 0.0);

    let mut builder = GraphBuilder::new(directed);

    for (key, value) in graph_items {
        if key != "node" {
            continue;
        }
        let Value::List(node) = value else { continue };
        let id = find(node, "id")
            .and_then(Value::as_key)
            .ok_or(InputError::MissingNodeId)?;
        if builder.contains(&id) {
            return Err(InputError::DuplicateNode(id));
        }
        builder.get_or_create_node(&id);
        if let Some(label) = find(node, "label").and_then(Value::as_key) {
            builder.set_label(&id, &label);
        }
    }

    for (key, value) in graph_items {
        if key != "edge" {
            continue;
        }
        let Value::List(edge) = value else { continue };
        let endpoint = |name: &str| -> Result<String, InputError> {
            let id = find(edge, name)
                .and_then(Value::as_key)
                .ok_or_else(|| InputError::MissingEndpoint(name.to_string()))?;
            if builder.contains(&id) {
                Ok(id)
            } else {
                Err(InputError::UnknownNode(id))
            }
        };
        let source = endpoint("source")?;
        let target = endpoint("target")?;
        let weight = find(edge, "value")
            .or_else(|| find(edge, "weight"))
            .and_then(Value::as_number)
            .unwrap_or(1.0);
        builder.add_edge(&source, &target, weight);
    }

    Ok(builder.build())
}

/// Load a GML file from disk
pub fn load_gml<P: AsRef<Path>>(path: P) -> Result<CompressedGraph> {
    let path = path.as_ref();
    log::info!("Reading GML file: {}", path.display());

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let graph = parse_gml(&text).with_context(|| format!("failed to parse {}", path.display()))?;

    log::info!(
        "Loaded graph with {} nodes and {} adjacency slots",
        graph.node_count,
        graph.slot_count()
    );

    Ok(graph)
}
