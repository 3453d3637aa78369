// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newick reader and writer.
//!
//! Both directions are iterative so a caterpillar tree with a million
//! leaves cannot overflow the stack. Supported syntax: nesting, leaf and
//! internal labels, quoted labels with `''` escapes, branch lengths and
//! `[...]` comments (skipped).

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{TreeError, TreeResult};
use crate::tree::{NodeId, Tree};

/// Characters that end an unquoted label.
const DELIMITERS: &[u8] = b"()[]':;,";

/// Parse one Newick tree.
pub fn parse(text: &str) -> TreeResult<Tree> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.skip_trivia()?;
    if parser.peek().is_none() {
        return Err(TreeError::Empty);
    }
    parser.tree()
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> TreeError {
        TreeError::parse(self.pos, message)
    }

    /// Skip whitespace and bracketed comments.
    fn skip_trivia(&mut self) -> TreeResult<()> {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else if byte == b'[' {
                let start = self.pos;
                match self.bytes[start..].iter().position(|&b| b == b']') {
                    Some(end) => self.pos = start + end + 1,
                    None => return Err(TreeError::parse(start, "unterminated comment")),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn tree(&mut self) -> TreeResult<Tree> {
        let mut tree = Tree::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut current = tree.root();

        loop {
            self.skip_trivia()?;
            let Some(byte) = self.peek() else {
                return Err(self.error("missing terminating ';'"));
            };
            match byte {
                b'(' => {
                    let node = tree.node(current);
                    if node.label.is_some() || node.length.is_some() || !node.children.is_empty() {
                        return Err(self.error("unexpected '('"));
                    }
                    self.pos += 1;
                    open.push(current);
                    current = tree.add_child(current);
                }
                b',' => {
                    let Some(&parent) = open.last() else {
                        return Err(self.error("',' outside parentheses"));
                    };
                    self.pos += 1;
                    current = tree.add_child(parent);
                }
                b')' => {
                    let Some(parent) = open.pop() else {
                        return Err(self.error("unbalanced ')'"));
                    };
                    self.pos += 1;
                    current = parent;
                }
                b':' => {
                    if tree.node(current).length.is_some() {
                        return Err(self.error("branch length given twice"));
                    }
                    self.pos += 1;
                    self.skip_trivia()?;
                    let length = self.number()?;
                    tree.node_mut(current).length = Some(length);
                }
                b';' => {
                    if !open.is_empty() {
                        return Err(self.error("unclosed '('"));
                    }
                    self.pos += 1;
                    break;
                }
                b']' => return Err(self.error("unexpected ']'")),
                _ => {
                    let node = tree.node(current);
                    if node.label.is_some() || node.length.is_some() {
                        return Err(self.error("unexpected label"));
                    }
                    let label = if byte == b'\'' {
                        self.quoted_label()?
                    } else {
                        self.unquoted_label()
                    };
                    tree.node_mut(current).label = Some(label);
                }
            }
        }

        self.skip_trivia()?;
        if self.peek().is_some() {
            return Err(self.error("trailing data after ';'"));
        }
        Ok(tree)
    }

    fn unquoted_label(&mut self) -> String {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || DELIMITERS.contains(&byte) {
                break;
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
    }

    fn quoted_label(&mut self) -> TreeResult<String> {
        let start = self.pos;
        self.pos += 1;
        let mut label = Vec::new();
        loop {
            match self.peek() {
                None => return Err(TreeError::parse(start, "unterminated quoted label")),
                Some(b'\'') if self.bytes.get(self.pos + 1) == Some(&b'\'') => {
                    label.push(b'\'');
                    self.pos += 2;
                }
                Some(b'\'') => {
                    self.pos += 1;
                    break;
                }
                Some(byte) => {
                    label.push(byte);
                    self.pos += 1;
                }
            }
        }
        Ok(String::from_utf8_lossy(&label).into_owned())
    }

    fn number(&mut self) -> TreeResult<f64> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_digit() || matches!(byte, b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let token = String::from_utf8_lossy(&self.bytes[start..self.pos]);
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(TreeError::parse(
                start,
                format!("invalid branch length {token:?}"),
            )),
        }
    }
}

enum Step {
    Open(NodeId),
    Close(NodeId),
    Comma,
}

/// Serialize a tree to Newick, terminated by `;`.
pub fn to_newick(tree: &Tree) -> String {
    let mut out = String::new();
    let mut stack = vec![Step::Open(tree.root())];

    while let Some(step) = stack.pop() {
        match step {
            Step::Open(id) => {
                let children = &tree.node(id).children;
                if children.is_empty() {
                    write_node(&mut out, tree, id);
                } else {
                    out.push('(');
                    stack.push(Step::Close(id));
                    for (i, &child) in children.iter().enumerate().rev() {
                        stack.push(Step::Open(child));
                        if i > 0 {
                            stack.push(Step::Comma);
                        }
                    }
                }
            }
            Step::Close(id) => {
                out.push(')');
                write_node(&mut out, tree, id);
            }
            Step::Comma => out.push(','),
        }
    }

    out.push(';');
    out
}

fn write_node(out: &mut String, tree: &Tree, id: NodeId) {
    let node = tree.node(id);
    if let Some(label) = &node.label {
        let needs_quotes = label.is_empty()
            || label
                .bytes()
                .any(|b| b.is_ascii_whitespace() || DELIMITERS.contains(&b));
        if needs_quotes {
            out.push('\'');
            out.push_str(&label.replace('\'', "''"));
            out.push('\'');
        } else {
            out.push_str(label);
        }
    }
    if let Some(length) = node.length {
        out.push(':');
        out.push_str(&length.to_string());
    }
}

fn io_error(path: &Path, source: std::io::Error) -> TreeError {
    TreeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Read a tree file, decompressing it when the name ends in `.gz`.
pub fn read_tree_text(path: impl AsRef<Path>) -> TreeResult<String> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| io_error(path, source))?;
    let mut reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| io_error(path, source))?;
    Ok(text)
}

pub fn read_tree(path: impl AsRef<Path>) -> TreeResult<Tree> {
    parse(&read_tree_text(path)?)
}

/// Write a tree file, compressing it when the name ends in `.gz`.
pub fn write_tree(path: impl AsRef<Path>, tree: &Tree) -> TreeResult<()> {
    let path = path.as_ref();
    let mut text = to_newick(tree);
    text.push('\n');

    let file = File::create(path).map_err(|source| io_error(path, source))?;
    let result = if is_gzip(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(text.as_bytes())
            .and_then(|()| encoder.finish().map(drop))
    } else {
        let mut file = file;
        file.write_all(text.as_bytes())
    };
    result.map_err(|source| io_error(path, source))
}
