//! This module contains the parser definition for turning IR source text
//! into a [`Module`].
//!
//! # Implementation Note
//!
//! While it might make sense in the future to build a more robust parser
//! based on parser combinators from a library like [`nom`](https://docs.rs/nom),
//! the grammar is small enough that a hand-rolled tokenizer and a
//! statement-at-a-time parser keep things simple.
//!
//! # Grammar
//!
//! A module is a sequence of `declare` and `define` items:
//!
//! ```text
//! declare @decaf_assert(i1)
//!
//! define @test(%x: i32) {
//! entry:
//!   %c = icmp.eq %x, 0:i32
//!   br %c, then, else
//! then:
//!   call @decaf_assert(%c)
//!   ret
//! else:
//!   ret
//! }
//! ```
//!
//! Literals are written `value:width` (`0:i32`, `-1:i8`); negated literals
//! wrap to two's complement and are only accepted for widths that fit in a
//! machine word. Comments run from `;` to the end of the line. Every block
//! is labelled, and the first block of a definition is its entry block.

use std::collections::{HashMap, HashSet};

use crate::{
    constant::MAX_WORD_CONSTANT_BITS,
    error::{
        container::Locatable,
        parse::{Error, Result},
    },
    ir::{
        BinaryOp,
        Block,
        BlockId,
        Constant,
        FuncId,
        Function,
        IcmpPred,
        Inst,
        Module,
        Operand,
        Param,
        ValueId,
    },
};

/// Parses the provided IR `source` text into a [`Module`].
///
/// # Errors
///
/// Returns [`Err`] when the source is not a syntactically valid module, with
/// the offending source line attached.
pub fn parse_module(source: &str) -> Result<Module> {
    let tokens = lex(source)?;
    let headers = parse_headers(&tokens)?;

    // Function names resolve across the whole module, so the table is built
    // before any body is parsed.
    let mut by_name: HashMap<String, FuncId> = HashMap::new();
    for (ix, header) in headers.iter().enumerate() {
        let id = FuncId(u32::try_from(ix).expect("too many functions"));
        if by_name.insert(header.name.clone(), id).is_some() {
            return Err(Error::DuplicateFunction { name: header.name.clone() }.locate(header.line));
        }
    }

    let mut functions = Vec::with_capacity(headers.len());
    for header in &headers {
        functions.push(parse_function(header, &tokens, &by_name)?);
    }

    Ok(Module::new(functions))
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum TokenKind {
    /// A bare identifier: keywords, mnemonics, types, and block labels.
    Ident(String),

    /// A function name, without the leading `@`.
    Global(String),

    /// An SSA value name, without the leading `%`.
    Local(String),

    /// An integer literal, with an optional leading `-`.
    Int(String),

    /// Single-character punctuation.
    Punct(char),
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    line: u32,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut line: u32 = 1;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            _ if c.is_whitespace() => {}
            ';' => {
                // A comment runs to the end of the line; the newline itself
                // is left for the main loop to count.
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | ':' | '=' => {
                tokens.push(Token { kind: TokenKind::Punct(c), line });
            }
            '@' | '%' => {
                let mut name = String::new();
                while chars.peek().copied().is_some_and(is_ident_char) {
                    name.push(chars.next().expect("peeked character is present"));
                }
                if name.is_empty() {
                    return Err(Error::UnexpectedCharacter { found: c }.locate(line));
                }
                let kind = if c == '@' {
                    TokenKind::Global(name)
                } else {
                    TokenKind::Local(name)
                };
                tokens.push(Token { kind, line });
            }
            '-' => {
                if !chars.peek().copied().is_some_and(|n| n.is_ascii_digit()) {
                    return Err(Error::UnexpectedCharacter { found: c }.locate(line));
                }
                let mut text = String::from('-');
                while chars.peek().copied().is_some_and(|n| n.is_ascii_digit()) {
                    text.push(chars.next().expect("peeked character is present"));
                }
                tokens.push(Token { kind: TokenKind::Int(text), line });
            }
            _ if c.is_ascii_digit() => {
                let mut text = String::from(c);
                while chars.peek().copied().is_some_and(|n| n.is_ascii_digit()) {
                    text.push(chars.next().expect("peeked character is present"));
                }
                tokens.push(Token { kind: TokenKind::Int(text), line });
            }
            _ if is_ident_start(c) => {
                let mut text = String::from(c);
                while chars.peek().copied().is_some_and(is_ident_char) {
                    text.push(chars.next().expect("peeked character is present"));
                }
                tokens.push(Token { kind: TokenKind::Ident(text), line });
            }
            _ => return Err(Error::UnexpectedCharacter { found: c }.locate(line)),
        }
    }

    Ok(tokens)
}

/// A cursor over a token slice with single-token error reporting.
struct Stream<'a> {
    tokens: &'a [Token],
    pos: usize,
    last_line: u32,
}

impl<'a> Stream<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let last_line = tokens.last().map_or(1, |t| t.line);
        Self { tokens, pos: 0, last_line }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    /// The line of the token about to be consumed, falling back to the last
    /// line of the input at the end of the stream.
    fn line(&self) -> u32 {
        self.tokens.get(self.pos).map_or(self.last_line, |t| t.line)
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a Token> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| Error::UnexpectedEnd { expected }.locate(self.last_line))?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected<T>(token: &Token, expected: &'static str) -> Result<T> {
        let found = match &token.kind {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Global(s) => format!("@{s}"),
            TokenKind::Local(s) => format!("%{s}"),
            TokenKind::Int(s) => s.clone(),
            TokenKind::Punct(c) => c.to_string(),
        };
        Err(Error::UnexpectedToken { found, expected }.locate(token.line))
    }

    fn expect_punct(&mut self, punct: char, expected: &'static str) -> Result<()> {
        let token = self.next(expected)?;
        match token.kind {
            TokenKind::Punct(c) if c == punct => Ok(()),
            _ => Self::unexpected(token, expected),
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<(&'a str, u32)> {
        let token = self.next(expected)?;
        match &token.kind {
            TokenKind::Ident(s) => Ok((s.as_str(), token.line)),
            _ => Self::unexpected(token, expected),
        }
    }

    fn expect_global(&mut self, expected: &'static str) -> Result<(&'a str, u32)> {
        let token = self.next(expected)?;
        match &token.kind {
            TokenKind::Global(s) => Ok((s.as_str(), token.line)),
            _ => Self::unexpected(token, expected),
        }
    }

    fn expect_local(&mut self, expected: &'static str) -> Result<(&'a str, u32)> {
        let token = self.next(expected)?;
        match &token.kind {
            TokenKind::Local(s) => Ok((s.as_str(), token.line)),
            _ => Self::unexpected(token, expected),
        }
    }
}

/// A function signature, with the token range of its body when present.
struct Header {
    name: String,
    line: u32,
    params: Vec<(Option<String>, u32)>,
    body: Option<(usize, usize)>,
}

fn parse_headers(tokens: &[Token]) -> Result<Vec<Header>> {
    let mut stream = Stream::new(tokens);
    let mut headers = Vec::new();

    while stream.peek().is_some() {
        let token = stream.next("`define` or `declare`")?;
        match &token.kind {
            TokenKind::Ident(kw) if kw == "declare" => {
                let (name, line) = stream.expect_global("a function name")?;
                let params = parse_declared_params(&mut stream)?;
                headers.push(Header { name: name.to_owned(), line, params, body: None });
            }
            TokenKind::Ident(kw) if kw == "define" => {
                let (name, line) = stream.expect_global("a function name")?;
                let params = parse_defined_params(&mut stream)?;
                stream.expect_punct('{', "the function body")?;

                let start = stream.pos;
                let mut depth = 1usize;
                while depth > 0 {
                    let token = stream.next("the end of the function body")?;
                    match token.kind {
                        TokenKind::Punct('{') => depth += 1,
                        TokenKind::Punct('}') => depth -= 1,
                        _ => {}
                    }
                }
                let end = stream.pos - 1;

                headers.push(Header {
                    name: name.to_owned(),
                    line,
                    params,
                    body: Some((start, end)),
                });
            }
            _ => return Stream::unexpected(token, "`define` or `declare`"),
        }
    }

    Ok(headers)
}

fn parse_declared_params(stream: &mut Stream) -> Result<Vec<(Option<String>, u32)>> {
    let mut params = Vec::new();
    stream.expect_punct('(', "the parameter list")?;
    if stream.peek() == Some(&TokenKind::Punct(')')) {
        stream.next("the parameter list")?;
        return Ok(params);
    }
    loop {
        let (ty, line) = stream.expect_ident("a parameter type")?;
        params.push((None, parse_width(ty, line)?));
        match stream.next("`,` or `)`")? {
            t if t.kind == TokenKind::Punct(',') => {}
            t if t.kind == TokenKind::Punct(')') => break,
            t => return Stream::unexpected(t, "`,` or `)`"),
        }
    }
    Ok(params)
}

fn parse_defined_params(stream: &mut Stream) -> Result<Vec<(Option<String>, u32)>> {
    let mut params = Vec::new();
    stream.expect_punct('(', "the parameter list")?;
    if stream.peek() == Some(&TokenKind::Punct(')')) {
        stream.next("the parameter list")?;
        return Ok(params);
    }
    loop {
        let (name, _) = stream.expect_local("a parameter name")?;
        stream.expect_punct(':', "the parameter type")?;
        let (ty, line) = stream.expect_ident("a parameter type")?;
        params.push((Some(name.to_owned()), parse_width(ty, line)?));
        match stream.next("`,` or `)`")? {
            t if t.kind == TokenKind::Punct(',') => {}
            t if t.kind == TokenKind::Punct(')') => break,
            t => return Stream::unexpected(t, "`,` or `)`"),
        }
    }
    Ok(params)
}

/// Parses an integer type such as `i32` into its bit width.
fn parse_width(text: &str, line: u32) -> Result<u32> {
    let invalid = || Error::InvalidWidth { text: text.to_owned() }.locate(line);
    let digits = text.strip_prefix('i').ok_or_else(invalid)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let width: u32 = digits.parse().map_err(|_| invalid())?;
    if width == 0 {
        return Err(invalid());
    }
    Ok(width)
}

fn parse_function(
    header: &Header,
    tokens: &[Token],
    functions: &HashMap<String, FuncId>,
) -> Result<Function> {
    let Some((start, end)) = header.body else {
        // A declaration binds no names; parameters get positional ids.
        let params = header
            .params
            .iter()
            .enumerate()
            .map(|(ix, (_, width))| Param {
                value: ValueId(u32::try_from(ix).expect("too many parameters")),
                width: *width,
            })
            .collect();
        return Ok(Function::new(header.name.clone(), params, vec![]));
    };

    let mut parser = BodyParser {
        stream: Stream::new(&tokens[start..end]),
        functions,
        labels: HashMap::new(),
        values: HashMap::new(),
        defined: HashSet::new(),
        next_value: 0,
    };
    parser.scan_labels()?;

    let mut params = Vec::with_capacity(header.params.len());
    for (name, width) in &header.params {
        let name = name.as_deref().expect("defined functions have named parameters");
        let value = parser.define_value(name, header.line)?;
        params.push(Param { value, width: *width });
    }

    let blocks = parser.parse_blocks(&header.name)?;
    Ok(Function::new(header.name.clone(), params, blocks))
}

struct BodyParser<'a> {
    stream: Stream<'a>,
    functions: &'a HashMap<String, FuncId>,
    labels: HashMap<String, BlockId>,
    values: HashMap<String, ValueId>,
    defined: HashSet<String>,
    next_value: u32,
}

impl BodyParser<'_> {
    /// Records every block label in the body up front so that forward
    /// branches and loop phis can resolve their targets.
    ///
    /// A label is an identifier directly followed by `:` outside of phi
    /// brackets; inside brackets the same shape names an incoming edge.
    fn scan_labels(&mut self) -> Result<()> {
        let tokens = self.stream.tokens;
        let mut depth = 0usize;
        for ix in 0..tokens.len() {
            match &tokens[ix].kind {
                TokenKind::Punct('[') => depth += 1,
                TokenKind::Punct(']') => depth = depth.saturating_sub(1),
                TokenKind::Ident(name) if depth == 0 => {
                    let followed_by_colon =
                        tokens.get(ix + 1).is_some_and(|t| t.kind == TokenKind::Punct(':'));
                    if !followed_by_colon {
                        continue;
                    }
                    let id = BlockId(u32::try_from(self.labels.len()).expect("too many blocks"));
                    if self.labels.insert(name.clone(), id).is_some() {
                        return Err(
                            Error::DuplicateLabel { label: name.clone() }.locate(tokens[ix].line)
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Interns a value name at a use site. Names may be referenced before
    /// the defining instruction has been parsed (loop phis); truly undefined
    /// names surface when the engine executes the use.
    fn reference_value(&mut self, name: &str) -> ValueId {
        if let Some(id) = self.values.get(name) {
            return *id;
        }
        let id = ValueId(self.next_value);
        self.next_value += 1;
        self.values.insert(name.to_owned(), id);
        id
    }

    /// Interns a value name at its definition site, rejecting SSA
    /// re-definitions.
    fn define_value(&mut self, name: &str, line: u32) -> Result<ValueId> {
        if !self.defined.insert(name.to_owned()) {
            return Err(Error::DuplicateValue { name: name.to_owned() }.locate(line));
        }
        Ok(self.reference_value(name))
    }

    fn resolve_label(&self, name: &str, line: u32) -> Result<BlockId> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownLabel { label: name.to_owned() }.locate(line))
    }

    fn resolve_function(&self, name: &str, line: u32) -> Result<FuncId> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownFunction { name: name.to_owned() }.locate(line))
    }

    fn parse_blocks(&mut self, function: &str) -> Result<Vec<Block>> {
        let mut blocks: Vec<Block> = Vec::with_capacity(self.labels.len());
        let mut current: Option<(String, Vec<Inst>)> = None;

        while self.stream.peek().is_some() {
            if self.label_ahead() {
                let (label, _) = self.stream.expect_ident("a block label")?;
                self.stream.expect_punct(':', "a block label")?;
                if let Some((done, insts)) = current.take() {
                    Self::check_terminated(&done, &insts, self.stream.line())?;
                    blocks.push(Block::new(done, insts));
                }
                current = Some((label.to_owned(), vec![]));
                continue;
            }

            let Some((_, insts)) = current.as_mut() else {
                let token = self.stream.next("a block label")?;
                return Stream::unexpected(token, "a block label");
            };
            if insts.last().is_some_and(Inst::is_terminator) {
                let token = self.stream.next("a block label or the end of the function")?;
                return Stream::unexpected(token, "a block label or the end of the function");
            }
            let inst = self.parse_statement()?;
            insts.push(inst);
        }

        let Some((done, insts)) = current.take() else {
            return Err(
                Error::EmptyBody { name: function.to_owned() }.locate(self.stream.last_line)
            );
        };
        Self::check_terminated(&done, &insts, self.stream.last_line)?;
        blocks.push(Block::new(done, insts));

        Ok(blocks)
    }

    fn label_ahead(&self) -> bool {
        matches!(self.stream.peek(), Some(TokenKind::Ident(_)))
            && self.stream.peek_at(1) == Some(&TokenKind::Punct(':'))
    }

    fn check_terminated(label: &str, insts: &[Inst], line: u32) -> Result<()> {
        if !insts.last().is_some_and(Inst::is_terminator) {
            return Err(Error::MissingTerminator { label: label.to_owned() }.locate(line));
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Inst> {
        let token = self.stream.next("an instruction")?;
        match &token.kind {
            TokenKind::Local(name) => {
                let result = self.define_value(name, token.line)?;
                self.stream.expect_punct('=', "`=`")?;
                self.parse_value_producer(result)
            }
            TokenKind::Ident(kw) if kw == "call" => self.parse_call(None),
            TokenKind::Ident(kw) if kw == "br" => self.parse_branch(),
            TokenKind::Ident(kw) if kw == "ret" => {
                let value =
                    if self.operand_ahead() { Some(self.parse_operand()?) } else { None };
                Ok(Inst::Ret { value })
            }
            _ => Stream::unexpected(token, "an instruction"),
        }
    }

    fn parse_value_producer(&mut self, result: ValueId) -> Result<Inst> {
        let (mnemonic, line) = self.stream.expect_ident("an instruction mnemonic")?;

        if let Some(op) = binary_op(mnemonic) {
            let lhs = self.parse_operand()?;
            self.stream.expect_punct(',', "`,`")?;
            let rhs = self.parse_operand()?;
            return Ok(Inst::Binary { result, op, lhs, rhs });
        }

        if let Some(pred) = mnemonic.strip_prefix("icmp.") {
            let pred = icmp_pred(pred)
                .ok_or_else(|| Error::UnknownPredicate { name: pred.to_owned() }.locate(line))?;
            let lhs = self.parse_operand()?;
            self.stream.expect_punct(',', "`,`")?;
            let rhs = self.parse_operand()?;
            return Ok(Inst::Icmp { result, pred, lhs, rhs });
        }

        match mnemonic {
            "not" => {
                let operand = self.parse_operand()?;
                Ok(Inst::Not { result, operand })
            }
            "trunc" => {
                let operand = self.parse_operand()?;
                match self.stream.expect_ident("`to`")? {
                    ("to", _) => {}
                    (other, line) => {
                        return Err(Error::UnexpectedToken {
                            found: other.to_owned(),
                            expected: "`to`",
                        }
                        .locate(line))
                    }
                }
                let (ty, line) = self.stream.expect_ident("an integer type")?;
                let width = parse_width(ty, line)?;
                Ok(Inst::Trunc { result, operand, width })
            }
            "select" => {
                let cond = self.parse_operand()?;
                self.stream.expect_punct(',', "`,`")?;
                let on_true = self.parse_operand()?;
                self.stream.expect_punct(',', "`,`")?;
                let on_false = self.parse_operand()?;
                Ok(Inst::Select { result, cond, on_true, on_false })
            }
            "phi" => {
                let incoming = self.parse_phi_incoming()?;
                Ok(Inst::Phi { result, incoming })
            }
            "call" => self.parse_call(Some(result)),
            _ => Err(Error::UnknownInstruction { mnemonic: mnemonic.to_owned() }.locate(line)),
        }
    }

    fn parse_phi_incoming(&mut self) -> Result<Vec<(BlockId, Operand)>> {
        let mut incoming = Vec::new();
        self.stream.expect_punct('[', "the phi incoming list")?;
        loop {
            let (label, line) = self.stream.expect_ident("an incoming block label")?;
            let block = self.resolve_label(label, line)?;
            self.stream.expect_punct(':', "`:`")?;
            let operand = self.parse_operand()?;
            incoming.push((block, operand));
            match self.stream.next("`,` or `]`")? {
                t if t.kind == TokenKind::Punct(',') => {}
                t if t.kind == TokenKind::Punct(']') => break,
                t => return Stream::unexpected(t, "`,` or `]`"),
            }
        }
        Ok(incoming)
    }

    fn parse_call(&mut self, result: Option<ValueId>) -> Result<Inst> {
        let (name, line) = self.stream.expect_global("a function name")?;
        let callee = self.resolve_function(name, line)?;
        let mut args = Vec::new();
        self.stream.expect_punct('(', "the argument list")?;
        if self.stream.peek() == Some(&TokenKind::Punct(')')) {
            self.stream.next("the argument list")?;
            return Ok(Inst::Call { result, callee, args });
        }
        loop {
            args.push(self.parse_operand()?);
            match self.stream.next("`,` or `)`")? {
                t if t.kind == TokenKind::Punct(',') => {}
                t if t.kind == TokenKind::Punct(')') => break,
                t => return Stream::unexpected(t, "`,` or `)`"),
            }
        }
        Ok(Inst::Call { result, callee, args })
    }

    fn parse_branch(&mut self) -> Result<Inst> {
        if self.operand_ahead() {
            let cond = self.parse_operand()?;
            self.stream.expect_punct(',', "`,`")?;
            let (on_true, t_line) = self.stream.expect_ident("a block label")?;
            let on_true = self.resolve_label(on_true, t_line)?;
            self.stream.expect_punct(',', "`,`")?;
            let (on_false, f_line) = self.stream.expect_ident("a block label")?;
            let on_false = self.resolve_label(on_false, f_line)?;
            return Ok(Inst::CondBr { cond, on_true, on_false });
        }
        let (target, line) = self.stream.expect_ident("a block label")?;
        let target = self.resolve_label(target, line)?;
        Ok(Inst::Br { target })
    }

    fn operand_ahead(&self) -> bool {
        matches!(self.stream.peek(), Some(TokenKind::Local(_) | TokenKind::Int(_)))
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let token = self.stream.next("an operand")?;
        match &token.kind {
            TokenKind::Local(name) => Ok(Operand::Value(self.reference_value(name))),
            TokenKind::Int(text) => {
                self.stream.expect_punct(':', "the literal type")?;
                let (ty, line) = self.stream.expect_ident("an integer type")?;
                let width = parse_width(ty, line)?;
                Ok(Operand::Const(make_constant(text, width, token.line)?))
            }
            _ => Stream::unexpected(token, "an operand"),
        }
    }
}

fn binary_op(mnemonic: &str) -> Option<BinaryOp> {
    let op = match mnemonic {
        "add" => BinaryOp::Add,
        "sub" => BinaryOp::Sub,
        "mul" => BinaryOp::Mul,
        "udiv" => BinaryOp::UDiv,
        "sdiv" => BinaryOp::SDiv,
        "urem" => BinaryOp::URem,
        "srem" => BinaryOp::SRem,
        "and" => BinaryOp::And,
        "or" => BinaryOp::Or,
        "xor" => BinaryOp::Xor,
        "shl" => BinaryOp::Shl,
        "lshr" => BinaryOp::LShr,
        "ashr" => BinaryOp::AShr,
        _ => return None,
    };
    Some(op)
}

fn icmp_pred(name: &str) -> Option<IcmpPred> {
    let pred = match name {
        "eq" => IcmpPred::Eq,
        "ne" => IcmpPred::Ne,
        "ult" => IcmpPred::Ult,
        "ule" => IcmpPred::Ule,
        "ugt" => IcmpPred::Ugt,
        "uge" => IcmpPred::Uge,
        "slt" => IcmpPred::Slt,
        "sle" => IcmpPred::Sle,
        "sgt" => IcmpPred::Sgt,
        "sge" => IcmpPred::Sge,
        _ => return None,
    };
    Some(pred)
}

/// Builds a constant from a literal's text and width.
///
/// Negated literals wrap to two's complement within the width, and are only
/// accepted when the width fits in a machine word and the magnitude does not
/// exceed the most negative representable value.
fn make_constant(text: &str, width: u32, line: u32) -> Result<Constant> {
    let negative = text.starts_with('-');
    let digits = text.trim_start_matches('-');

    if width > MAX_WORD_CONSTANT_BITS {
        if negative {
            return Err(Error::SignedWideLiteral { literal: text.to_owned() }.locate(line));
        }
        return Ok(Constant::wide(digits, width));
    }

    let out_of_range = || {
        Error::LiteralOutOfRange { literal: text.to_owned(), width }.locate(line)
    };
    let magnitude: u128 = digits.parse().map_err(|_| out_of_range())?;
    let modulus: u128 = 1u128 << width;

    let value = if negative {
        if magnitude > modulus / 2 {
            return Err(out_of_range());
        }
        u64::try_from((modulus - magnitude) % modulus).expect("value fits below 2^64")
    } else {
        if magnitude >= modulus {
            return Err(out_of_range());
        }
        u64::try_from(magnitude).expect("value fits below 2^64")
    };

    Ok(Constant::word(value, width))
}

#[cfg(test)]
mod test {
    use crate::{
        error::parse::Error,
        ir::{
            parser::parse_module,
            BinaryOp,
            BlockId,
            ConstValue,
            Constant,
            IcmpPred,
            Inst,
            Operand,
        },
    };

    #[test]
    fn parses_a_simple_module() -> anyhow::Result<()> {
        let module = parse_module(
            r"
            declare @decaf_assert(i1)

            define @test(%x: i32) {
            entry:
              %c = icmp.eq %x, 0:i32
              call @decaf_assert(%c)
              ret
            }
            ",
        )?;

        let test = module.function_named("test").expect("function should exist");
        let function = module.function(test);
        assert_eq!(function.params().len(), 1);
        assert_eq!(function.params()[0].width, 32);
        assert!(!function.is_declaration());

        let entry = function.block(function.entry());
        assert_eq!(entry.label(), "entry");
        assert_eq!(entry.insts().len(), 3);
        assert!(matches!(
            entry.insts()[0],
            Inst::Icmp { pred: IcmpPred::Eq, .. }
        ));
        assert!(matches!(entry.insts()[2], Inst::Ret { value: None }));

        let assert_fn = module.function_named("decaf_assert").expect("declaration should exist");
        assert!(module.function(assert_fn).is_declaration());

        Ok(())
    }

    #[test]
    fn parses_every_instruction_form() -> anyhow::Result<()> {
        let module = parse_module(
            r"
            define @callee(%a: i32) {
            entry:
              ret %a
            }

            define @all(%x: i32, %y: i32, %c: i1) {
            entry:
              %sum = add %x, %y
              %inv = not %sum
              %cmp = icmp.ult %inv, 100:i32
              %low = trunc %sum to i8
              %sel = select %cmp, %x, %y
              %ret = call @callee(%sel)
              br %c, loop, done
            loop:
              %n = phi [entry: %ret, loop: %next]
              %next = sub %n, 1:i32
              %again = icmp.ne %next, 0:i32
              br %again, loop, done
            done:
              ret
            }
            ",
        )?;

        let all = module.function(module.function_named("all").expect("function should exist"));
        assert_eq!(all.blocks().len(), 3);

        let entry = all.block(BlockId(0));
        assert!(matches!(
            entry.insts()[0],
            Inst::Binary { op: BinaryOp::Add, .. }
        ));
        assert!(matches!(entry.insts()[3], Inst::Trunc { width: 8, .. }));
        assert!(matches!(entry.insts()[5], Inst::Call { result: Some(_), .. }));

        // The phi's incoming edges name the entry block and the loop itself.
        let loop_block = all.block(BlockId(1));
        let Inst::Phi { incoming, .. } = &loop_block.insts()[0] else {
            panic!("expected a phi instruction");
        };
        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].0, BlockId(0));
        assert_eq!(incoming[1].0, BlockId(1));

        Ok(())
    }

    #[test]
    fn negated_literals_wrap_to_twos_complement() -> anyhow::Result<()> {
        let module = parse_module(
            r"
            define @negatives() {
            entry:
              %a = add -1:i32, -128:i8
              ret
            }
            ",
        )?;

        let f = module.function(module.function_named("negatives").expect("function exists"));
        let Inst::Binary { lhs, rhs, .. } = &f.block(BlockId(0)).insts()[0] else {
            panic!("expected a binary instruction");
        };
        assert_eq!(
            *lhs,
            Operand::Const(Constant { width: 32, value: ConstValue::Word(0xffff_ffff) })
        );
        assert_eq!(
            *rhs,
            Operand::Const(Constant { width: 8, value: ConstValue::Word(128) })
        );

        Ok(())
    }

    #[test]
    fn wide_literals_keep_their_digits() -> anyhow::Result<()> {
        let module = parse_module(
            r"
            define @wide() {
            entry:
              %a = add 36893488147419103232:i128, 1:i128
              ret
            }
            ",
        )?;

        let f = module.function(module.function_named("wide").expect("function exists"));
        let Inst::Binary { lhs, .. } = &f.block(BlockId(0)).insts()[0] else {
            panic!("expected a binary instruction");
        };
        assert_eq!(
            *lhs,
            Operand::Const(Constant {
                width: 128,
                value: ConstValue::Wide("36893488147419103232".into()),
            })
        );

        Ok(())
    }

    #[test]
    fn rejects_unknown_instructions() {
        let err = parse_module(
            r"
            define @bad() {
            entry:
              %p = alloca 4:i32
              ret
            }
            ",
        )
        .expect_err("parsing should fail");
        assert_eq!(err.payload, Error::UnknownInstruction { mnemonic: "alloca".into() });
        assert_eq!(err.line, 4);
    }

    #[test]
    fn rejects_blocks_without_terminators() {
        let err = parse_module(
            r"
            define @bad(%x: i32) {
            entry:
              %a = add %x, 1:i32
            next:
              ret
            }
            ",
        )
        .expect_err("parsing should fail");
        assert_eq!(err.payload, Error::MissingTerminator { label: "entry".into() });
    }

    #[test]
    fn rejects_ssa_redefinition() {
        let err = parse_module(
            r"
            define @bad(%x: i32) {
            entry:
              %a = add %x, 1:i32
              %a = add %x, 2:i32
              ret
            }
            ",
        )
        .expect_err("parsing should fail");
        assert_eq!(err.payload, Error::DuplicateValue { name: "a".into() });
    }

    #[test]
    fn rejects_out_of_range_literals() {
        let err = parse_module(
            r"
            define @bad() {
            entry:
              %a = add 2:i1, 0:i1
              ret
            }
            ",
        )
        .expect_err("parsing should fail");
        assert_eq!(
            err.payload,
            Error::LiteralOutOfRange { literal: "2".into(), width: 1 }
        );
    }

    #[test]
    fn rejects_branches_to_unknown_labels() {
        let err = parse_module(
            r"
            define @bad(%c: i1) {
            entry:
              br %c, entry, nowhere
            }
            ",
        )
        .expect_err("parsing should fail");
        assert_eq!(err.payload, Error::UnknownLabel { label: "nowhere".into() });
    }

    #[test]
    fn rejects_calls_to_unknown_functions() {
        let err = parse_module(
            r"
            define @bad() {
            entry:
              call @missing()
              ret
            }
            ",
        )
        .expect_err("parsing should fail");
        assert_eq!(err.payload, Error::UnknownFunction { name: "missing".into() });
    }
}
