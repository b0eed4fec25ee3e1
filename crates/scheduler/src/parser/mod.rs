//! Recursive-descent parser for `+ - * /` expressions with parentheses.
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := number | '(' expression ')'
//! number     := [0-9.]+
//! ```
//!
//! Operators are left-associative. Whitespace between tokens is ignored.
//! Parentheses nest at most [`MAX_NESTING_DEPTH`] levels deep.

mod error;

pub use error::SyntaxError;

use exprflow_core::Operator;

use crate::model::{Ast, Node, NodeId};

/// Deepest accepted parenthesis nesting. Each level costs a few stack frames.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse `input` into an operator tree.
pub fn parse(input: &str) -> Result<Ast, SyntaxError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Err(SyntaxError::Empty { offset: parser.pos });
    }

    let root = parser.expression()?;

    parser.skip_whitespace();
    if let Some(found) = parser.peek_char() {
        return Err(SyntaxError::UnexpectedChar { offset: parser.pos, found });
    }

    Ok(Ast { nodes: parser.nodes, root })
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    nodes: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0, depth: 0, nodes: Vec::new() }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Consume the next operator if it is one of `accepted`.
    fn operator(&mut self, accepted: [Operator; 2]) -> Option<Operator> {
        self.skip_whitespace();
        let op = Operator::from_symbol(char::from(self.peek()?))?;
        if accepted.contains(&op) {
            self.pos += 1;
            Some(op)
        } else {
            None
        }
    }

    fn expression(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.term()?;
        while let Some(op) = self.operator([Operator::Add, Operator::Sub]) {
            let right = self.term()?;
            left = self.push_binary(op, left, right);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<NodeId, SyntaxError> {
        let mut left = self.factor()?;
        while let Some(op) = self.operator([Operator::Mul, Operator::Div]) {
            let right = self.factor()?;
            left = self.push_binary(op, left, right);
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<NodeId, SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'(') => {
                let open = self.pos;
                if self.depth >= MAX_NESTING_DEPTH {
                    return Err(SyntaxError::NestingTooDeep { offset: open });
                }
                self.pos += 1;
                self.depth += 1;
                let inner = self.expression()?;
                self.depth -= 1;
                self.skip_whitespace();
                match self.peek_char() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    None => Err(SyntaxError::UnclosedParen { offset: open }),
                    Some(found) => Err(SyntaxError::UnexpectedChar { offset: self.pos, found }),
                }
            }
            Some(b'0'..=b'9' | b'.') => self.number(),
            _ => Err(SyntaxError::ExpectedOperand {
                offset: self.pos,
                found: self.peek_char(),
            }),
        }
    }

    fn number(&mut self) -> Result<NodeId, SyntaxError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9' | b'.')) {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        let value: f64 = text.parse().map_err(|_| SyntaxError::MalformedNumber {
            offset: start,
            text: text.to_string(),
        })?;
        self.nodes.push(Node::leaf(value));
        Ok(self.nodes.len() - 1)
    }

    fn push_binary(&mut self, op: Operator, left: NodeId, right: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::binary(op, left, right));
        self.nodes[left].parent = Some(id);
        self.nodes[right].parent = Some(id);
        id
    }
}
