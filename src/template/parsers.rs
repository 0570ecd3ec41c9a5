use std::vec::IntoIter;

use crate::error::SqlTemplateError;
use crate::types::Value;

use super::scanner::{Segment, Token, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    Call { name: String, args: Vec<Expr> },
    Field(String),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Node {
    Text(String),
    Action(Expr),
    If {
        cond: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// What closed a list of nodes.
enum Close {
    Eof,
    Else(Option<Expr>),
    End,
}

const KEYWORDS: &[&str] = &["if", "else", "end"];

pub(super) fn parse(
    segments: Vec<Segment>,
    is_function: &dyn Fn(&str) -> bool,
) -> Result<Vec<Node>, SqlTemplateError> {
    let mut parser = Parser {
        segments: segments.into_iter(),
        is_function,
    };
    let (nodes, close) = parser.list()?;
    match close {
        Close::Eof => Ok(nodes),
        Close::Else(_) => Err(syntax("unexpected else")),
        Close::End => Err(syntax("unexpected end")),
    }
}

fn syntax(msg: impl Into<String>) -> SqlTemplateError {
    SqlTemplateError::TemplateSyntax(msg.into())
}

struct Parser<'f> {
    segments: IntoIter<Segment>,
    is_function: &'f dyn Fn(&str) -> bool,
}

impl Parser<'_> {
    fn list(&mut self) -> Result<(Vec<Node>, Close), SqlTemplateError> {
        let mut nodes = Vec::new();
        while let Some(segment) = self.segments.next() {
            let body = match segment {
                Segment::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Segment::Action(body) => body,
            };

            let mut tokens = tokenize(&body)?.into_iter().peekable();
            match tokens.peek() {
                None => return Err(syntax("missing value for command")),
                Some(Token::Ident(word)) if word == "if" => {
                    tokens.next();
                    let cond = self.command(&mut tokens, false)?;
                    nodes.push(self.conditional(cond)?);
                }
                Some(Token::Ident(word)) if word == "else" => {
                    tokens.next();
                    return match tokens.next() {
                        None => Ok((nodes, Close::Else(None))),
                        Some(Token::Ident(word)) if word == "if" => {
                            let cond = self.command(&mut tokens, false)?;
                            Ok((nodes, Close::Else(Some(cond))))
                        }
                        Some(other) => Err(syntax(format!("unexpected {other:?} after else"))),
                    };
                }
                Some(Token::Ident(word)) if word == "end" => {
                    tokens.next();
                    if let Some(extra) = tokens.next() {
                        return Err(syntax(format!("unexpected {extra:?} after end")));
                    }
                    return Ok((nodes, Close::End));
                }
                Some(_) => nodes.push(Node::Action(self.command(&mut tokens, false)?)),
            }
        }
        Ok((nodes, Close::Eof))
    }

    /// Parse the branches of an `if` whose condition has been read.
    fn conditional(&mut self, cond: Expr) -> Result<Node, SqlTemplateError> {
        let (then, close) = self.list()?;
        let otherwise = match close {
            Close::Eof => return Err(syntax("unclosed if: missing end")),
            Close::End => Vec::new(),
            Close::Else(None) => {
                let (otherwise, close) = self.list()?;
                match close {
                    Close::End => otherwise,
                    Close::Eof => return Err(syntax("unclosed else: missing end")),
                    Close::Else(_) => return Err(syntax("else after final else")),
                }
            }
            // `else if` shares the outer `end`
            Close::Else(Some(nested)) => vec![self.conditional(nested)?],
        };
        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    /// A command: `func arg...` or a single operand.
    fn command(
        &self,
        tokens: &mut std::iter::Peekable<IntoIter<Token>>,
        nested: bool,
    ) -> Result<Expr, SqlTemplateError> {
        let mut head: Option<String> = None;
        let mut operands = Vec::new();
        loop {
            let Some(token) = tokens.next() else {
                if nested {
                    return Err(syntax("unclosed left paren"));
                }
                break;
            };
            match token {
                Token::RParen if nested => break,
                Token::RParen => return Err(syntax("unexpected right paren")),
                Token::Ident(name)
                    if head.is_none() && operands.is_empty() && (self.is_function)(&name) =>
                {
                    head = Some(name);
                }
                other => operands.push(self.operand(other, tokens)?),
            }
        }

        match head {
            Some(name) => Ok(Expr::Call {
                name,
                args: operands,
            }),
            None if operands.len() == 1 => Ok(operands.remove(0)),
            None if operands.is_empty() => Err(syntax("empty command")),
            None => Err(syntax(format!("can't give argument to non-function {:?}", operands[0]))),
        }
    }

    fn operand(
        &self,
        token: Token,
        tokens: &mut std::iter::Peekable<IntoIter<Token>>,
    ) -> Result<Expr, SqlTemplateError> {
        Ok(match token {
            Token::Str(s) => Expr::Literal(Value::Text(s)),
            Token::Int(i) => Expr::Literal(Value::Int(i)),
            Token::Float(f) => Expr::Literal(Value::Float(f)),
            Token::Field(path) => Expr::Field(path),
            Token::LParen => self.command(tokens, true)?,
            Token::RParen => return Err(syntax("unexpected right paren")),
            Token::Ident(word) => match word.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "nil" => Expr::Literal(Value::Null),
                _ if KEYWORDS.contains(&word.as_str()) => {
                    return Err(syntax(format!("unexpected keyword {word:?}")));
                }
                _ if (self.is_function)(&word) => Expr::Call {
                    name: word,
                    args: Vec::new(),
                },
                _ => return Err(syntax(format!("function {word:?} not defined"))),
            },
        })
    }
}
