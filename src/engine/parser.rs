//! Recursive-descent parser producing the tree in [`super::ast`].
//!
//! Strict-mode early errors (duplicate lexical declarations, reserved
//! binding names, `with`, `delete` of a plain identifier) are reported
//! here so the interpreter never sees an invalid program.

use std::rc::Rc;

use super::ast::*;
use super::builtins::regexp::compile_regex;
use super::error::{ParseError, Pos};
use super::lexer::{Keyword, Lexer, Punct, TemplateChunk, Tok, Token};
use super::number::number_to_string;

type PResult<T> = Result<T, ParseError>;

const STRICT_RESERVED: &[&str] = &[
    "implements",
    "interface",
    "package",
    "private",
    "protected",
    "public",
    "static",
];

/// Parse a whole program.
pub fn parse_program(src: &str) -> PResult<Program> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser::new(src, tokens);
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.parse_statement()?);
    }
    check_lexical(body.iter(), &[], true)?;
    let mut var_names = Vec::new();
    collect_var_names(&body, &mut var_names);
    dedup_names(&mut var_names);
    Ok(Program { body, var_names })
}

/// Parse a standalone expression such as `(result) => result > 0`.
pub fn parse_expression_source(src: &str) -> PResult<Expr> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser::new(src, tokens);
    let expr = parser.parse_expression()?;
    if !parser.at_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

#[derive(Default)]
struct FnContext {
    in_function: bool,
    loop_depth: usize,
    switch_depth: usize,
    labels: Vec<(Rc<str>, bool)>,
    uses_arguments: bool,
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    idx: usize,
    ctx: FnContext,
    no_in: bool,
    cover_init: Vec<Pos>,
    literal_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            src,
            tokens,
            idx: 0,
            ctx: FnContext::default(),
            no_in: false,
            cover_init: Vec::new(),
            literal_depth: 0,
        }
    }

    // ---- token helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn peek_tok(&self) -> &Tok {
        &self.peek().tok
    }

    fn peek_at(&self, n: usize) -> &Tok {
        &self.tokens[(self.idx + n).min(self.tokens.len() - 1)].tok
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if !matches!(token.tok, Tok::Eof) {
            self.idx += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_tok(), Tok::Eof)
    }

    fn is_punct(&self, p: Punct) -> bool {
        matches!(self.peek_tok(), Tok::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.is_punct(p) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct) -> PResult<Pos> {
        if self.is_punct(p) {
            Ok(self.next().pos)
        } else {
            Err(self.unexpected())
        }
    }

    fn is_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek_tok(), Tok::Keyword(k) if *k == kw)
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.is_kw(kw) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn is_contextual(&self, word: &str) -> bool {
        matches!(self.peek_tok(), Tok::Ident(name) if &**name == word)
    }

    fn prev_end(&self) -> usize {
        if self.idx == 0 {
            0
        } else {
            self.tokens[self.idx - 1].end
        }
    }

    fn slice_from(&self, start: usize) -> Rc<str> {
        let end = self.prev_end().max(start);
        Rc::from(self.src.get(start..end).unwrap_or(""))
    }

    fn unexpected(&self) -> ParseError {
        let token = self.peek();
        let message = match &token.tok {
            Tok::Eof => "Unexpected end of input".to_string(),
            Tok::Number(_) => "Unexpected number".to_string(),
            Tok::Str(_) => "Unexpected string".to_string(),
            Tok::Template(_) => "Unexpected template string".to_string(),
            Tok::Ident(name) => format!("Unexpected identifier '{}'", name),
            Tok::Keyword(kw) => format!("Unexpected token '{}'", kw.as_str()),
            Tok::Punct(p) => format!("Unexpected token '{}'", p.as_str()),
            Tok::Regex { .. } => "Unexpected regular expression".to_string(),
        };
        ParseError::new(message, token.pos)
    }

    fn unsupported(&self, what: &str) -> ParseError {
        ParseError::new(format!("Unsupported syntax: {}", what), self.peek().pos)
    }

    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.eat_punct(Punct::Semicolon) {
            return Ok(());
        }
        let token = self.peek();
        if token.newline_before || matches!(token.tok, Tok::Eof | Tok::Punct(Punct::RBrace)) {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn ident_name(&mut self) -> PResult<(Rc<str>, Pos)> {
        match self.peek_tok().clone() {
            Tok::Ident(name) => {
                let pos = self.next().pos;
                Ok((name, pos))
            }
            Tok::Keyword(Keyword::Let) => Err(ParseError::new(
                "let is disallowed as a lexically bound name",
                self.peek().pos,
            )),
            Tok::Keyword(Keyword::Yield) | Tok::Keyword(Keyword::Await) => Err(ParseError::new(
                "Unexpected strict mode reserved word",
                self.peek().pos,
            )),
            _ => Err(self.unexpected()),
        }
    }

    fn binding_ident(&mut self) -> PResult<(Rc<str>, Pos)> {
        let (name, pos) = self.ident_name()?;
        check_binding_name(&name, pos)?;
        Ok((name, pos))
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let pos = self.peek().pos;
        match self.peek_tok().clone() {
            Tok::Punct(Punct::LBrace) => {
                let body = self.parse_block()?;
                Ok(Stmt::Block(body))
            }
            Tok::Punct(Punct::Semicolon) => {
                self.next();
                Ok(Stmt::Empty)
            }
            Tok::Keyword(kw) => self.parse_keyword_statement(kw, pos),
            Tok::Ident(name) if matches!(self.peek_at(1), Tok::Punct(Punct::Colon)) => {
                self.next();
                self.next();
                self.parse_labeled(name, pos)
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_keyword_statement(&mut self, kw: Keyword, pos: Pos) -> PResult<Stmt> {
        match kw {
            Keyword::Var | Keyword::Let | Keyword::Const => {
                self.next();
                let kind = decl_kind(kw);
                let decls = self.parse_declarators(kind)?;
                self.consume_semicolon()?;
                Ok(Stmt::Decl { kind, decls })
            }
            Keyword::Function => {
                let start = self.peek().start;
                self.next();
                let def = self.parse_function_rest(start, pos, true)?;
                Ok(Stmt::Function(Rc::new(def)))
            }
            Keyword::Return => {
                if !self.ctx.in_function {
                    return Err(ParseError::new("Illegal return statement", pos));
                }
                self.next();
                let token = self.peek();
                let argument = if token.newline_before
                    || matches!(
                        token.tok,
                        Tok::Eof | Tok::Punct(Punct::Semicolon) | Tok::Punct(Punct::RBrace)
                    ) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(argument))
            }
            Keyword::If => {
                self.next();
                self.expect_punct(Punct::LParen)?;
                let test = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                let consequent = Box::new(self.parse_substatement()?);
                let alternate = if self.eat_kw(Keyword::Else) {
                    Some(Box::new(self.parse_substatement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    consequent,
                    alternate,
                })
            }
            Keyword::For => self.parse_for(),
            Keyword::While => {
                self.next();
                self.expect_punct(Punct::LParen)?;
                let test = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                let body = Box::new(self.parse_loop_body()?);
                Ok(Stmt::While { test, body })
            }
            Keyword::Do => {
                self.next();
                let body = Box::new(self.parse_loop_body()?);
                if !self.eat_kw(Keyword::While) {
                    return Err(self.unexpected());
                }
                self.expect_punct(Punct::LParen)?;
                let test = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                self.eat_punct(Punct::Semicolon);
                Ok(Stmt::DoWhile { body, test })
            }
            Keyword::Break | Keyword::Continue => self.parse_jump(kw, pos),
            Keyword::Throw => {
                self.next();
                if self.peek().newline_before {
                    return Err(ParseError::new("Illegal newline after throw", pos));
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(argument))
            }
            Keyword::Try => self.parse_try(pos),
            Keyword::Switch => self.parse_switch(),
            Keyword::Debugger => {
                self.next();
                self.consume_semicolon()?;
                Ok(Stmt::Empty)
            }
            Keyword::Class => Err(self.unsupported("class declarations are not supported")),
            Keyword::With => Err(ParseError::new(
                "Strict mode code may not include a with statement",
                pos,
            )),
            Keyword::Import | Keyword::Export => Err(ParseError::new(
                "Cannot use import statement outside a module",
                pos,
            )),
            Keyword::Async => Err(self.unsupported("async functions are not supported")),
            Keyword::Enum => Err(ParseError::new("Unexpected reserved word", pos)),
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Body of `if`/`else`: a declaration is not allowed here.
    fn parse_substatement(&mut self) -> PResult<Stmt> {
        if self.is_kw(Keyword::Let) || self.is_kw(Keyword::Const) {
            return Err(ParseError::new(
                "Lexical declaration cannot appear in a single-statement context",
                self.peek().pos,
            ));
        }
        if self.is_kw(Keyword::Function) {
            return Err(ParseError::new(
                "In strict mode code, functions can only be declared at top level or inside a block.",
                self.peek().pos,
            ));
        }
        self.parse_statement()
    }

    fn parse_loop_body(&mut self) -> PResult<Stmt> {
        self.ctx.loop_depth += 1;
        let body = self.parse_substatement();
        self.ctx.loop_depth -= 1;
        body
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect_punct(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.is_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        self.next();
        check_lexical(body.iter(), &[], false)?;
        Ok(body)
    }

    fn parse_labeled(&mut self, label: Rc<str>, pos: Pos) -> PResult<Stmt> {
        if self.ctx.labels.iter().any(|(l, _)| *l == label) {
            return Err(ParseError::new(
                format!("Label '{}' has already been declared", label),
                pos,
            ));
        }
        let is_loop = matches!(
            self.peek_tok(),
            Tok::Keyword(Keyword::For) | Tok::Keyword(Keyword::While) | Tok::Keyword(Keyword::Do)
        );
        self.ctx.labels.push((label.clone(), is_loop));
        let body = self.parse_substatement();
        self.ctx.labels.pop();
        Ok(Stmt::Labeled {
            label,
            body: Box::new(body?),
        })
    }

    fn parse_jump(&mut self, kw: Keyword, pos: Pos) -> PResult<Stmt> {
        self.next();
        let label = match self.peek_tok().clone() {
            Tok::Ident(name) if !self.peek().newline_before => {
                self.next();
                Some(name)
            }
            _ => None,
        };
        self.consume_semicolon()?;
        let is_break = kw == Keyword::Break;
        match &label {
            Some(name) => {
                let Some((_, is_loop)) = self.ctx.labels.iter().find(|(l, _)| l == name) else {
                    return Err(ParseError::new(format!("Undefined label '{}'", name), pos));
                };
                if !is_break && !is_loop {
                    return Err(ParseError::new(
                        format!(
                            "Illegal continue statement: '{}' does not denote an iteration statement",
                            name
                        ),
                        pos,
                    ));
                }
            }
            None => {
                if is_break && self.ctx.loop_depth == 0 && self.ctx.switch_depth == 0 {
                    return Err(ParseError::new("Illegal break statement", pos));
                }
                if !is_break && self.ctx.loop_depth == 0 {
                    return Err(ParseError::new(
                        "Illegal continue statement: no surrounding iteration statement",
                        pos,
                    ));
                }
            }
        }
        Ok(if is_break {
            Stmt::Break(label)
        } else {
            Stmt::Continue(label)
        })
    }

    fn parse_try(&mut self, pos: Pos) -> PResult<Stmt> {
        self.next();
        let block = self.parse_block()?;
        let handler = if self.eat_kw(Keyword::Catch) {
            let param = if self.eat_punct(Punct::LParen) {
                let target = self.parse_binding_target()?;
                self.expect_punct(Punct::RParen)?;
                Some(target)
            } else {
                None
            };
            let body = self.parse_block()?;
            if let Some(param) = &param {
                let mut names = Vec::new();
                param.bound_names(&mut names);
                check_lexical(body.iter(), &names, false)?;
            }
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat_kw(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(ParseError::new("Missing catch or finally after try", pos));
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        self.next();
        self.expect_punct(Punct::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;
        self.ctx.switch_depth += 1;
        let mut cases: Vec<SwitchCase> = Vec::new();
        let mut seen_default = false;
        let result = loop {
            if self.eat_punct(Punct::RBrace) {
                break Ok(());
            }
            let pos = self.peek().pos;
            let test = if self.eat_kw(Keyword::Case) {
                Some(self.parse_expression()?)
            } else if self.eat_kw(Keyword::Default) {
                if seen_default {
                    break Err(ParseError::new(
                        "More than one default clause in switch statement",
                        pos,
                    ));
                }
                seen_default = true;
                None
            } else {
                break Err(self.unexpected());
            };
            self.expect_punct(Punct::Colon)?;
            let mut body = Vec::new();
            while !self.is_kw(Keyword::Case)
                && !self.is_kw(Keyword::Default)
                && !self.is_punct(Punct::RBrace)
            {
                if self.at_eof() {
                    return Err(self.unexpected());
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        };
        self.ctx.switch_depth -= 1;
        result?;
        check_lexical(cases.iter().flat_map(|c| c.body.iter()), &[], false)?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.next();
        if self.is_contextual("await") {
            return Err(self.unsupported("for await is not supported"));
        }
        self.expect_punct(Punct::LParen)?;

        let init = if self.is_punct(Punct::Semicolon) {
            None
        } else if let Tok::Keyword(kw @ (Keyword::Var | Keyword::Let | Keyword::Const)) =
            self.peek_tok().clone()
        {
            self.next();
            let kind = decl_kind(kw);
            let target = self.parse_binding_target()?;
            if self.is_contextual("of") || self.is_kw(Keyword::In) {
                let left = ForBinding::Decl { kind, target };
                return self.parse_for_each(left);
            }
            self.no_in = true;
            let first = self.parse_declarator_init(kind, target);
            let decls = first.and_then(|first| {
                let mut decls = vec![first];
                while self.eat_punct(Punct::Comma) {
                    let target = self.parse_binding_target()?;
                    decls.push(self.parse_declarator_init(kind, target)?);
                }
                Ok(decls)
            });
            self.no_in = false;
            Some(ForInit::Decl { kind, decls: decls? })
        } else {
            self.no_in = true;
            let mark = self.cover_init.len();
            let expr = self.parse_expression();
            self.no_in = false;
            let expr = expr?;
            if self.is_contextual("of") || self.is_kw(Keyword::In) {
                self.cover_init.truncate(mark);
                let target = self.expr_to_pattern(expr)?;
                return self.parse_for_each(ForBinding::Target(target));
            }
            if let Some(pos) = self.cover_init.get(mark).copied() {
                return Err(ParseError::new("Invalid shorthand property initializer", pos));
            }
            Some(ForInit::Expr(expr))
        };

        self.expect_punct(Punct::Semicolon)?;
        let test = if self.is_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;
        let update = if self.is_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_loop_body()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_for_each(&mut self, left: ForBinding) -> PResult<Stmt> {
        let is_of = self.is_contextual("of");
        self.next();
        let right = if is_of {
            self.parse_assignment()?
        } else {
            self.parse_expression()?
        };
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_loop_body()?);
        Ok(if is_of {
            Stmt::ForOf { left, right, body }
        } else {
            Stmt::ForIn { left, right, body }
        })
    }

    fn parse_declarators(&mut self, kind: DeclKind) -> PResult<Vec<Declarator>> {
        let mut decls = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            decls.push(self.parse_declarator_init(kind, target)?);
            if !self.eat_punct(Punct::Comma) {
                return Ok(decls);
            }
        }
    }

    fn parse_declarator_init(&mut self, kind: DeclKind, target: Pattern) -> PResult<Declarator> {
        let pos = self.peek().pos;
        let init = if self.eat_punct(Punct::Assign) {
            let mut value = self.parse_assignment()?;
            if let Pattern::Ident(name, _) = &target {
                infer_function_name(&mut value, name);
            }
            Some(value)
        } else {
            if kind == DeclKind::Const {
                return Err(ParseError::new("Missing initializer in const declaration", pos));
            }
            if !matches!(target, Pattern::Ident(..)) {
                return Err(ParseError::new(
                    "Missing initializer in destructuring declaration",
                    pos,
                ));
            }
            None
        };
        Ok(Declarator { target, init })
    }

    // ---- binding patterns ----

    fn parse_binding_target(&mut self) -> PResult<Pattern> {
        match self.peek_tok() {
            Tok::Punct(Punct::LBracket) => self.parse_array_binding(),
            Tok::Punct(Punct::LBrace) => self.parse_object_binding(),
            _ => {
                let (name, pos) = self.binding_ident()?;
                Ok(Pattern::Ident(name, pos))
            }
        }
    }

    fn parse_binding_element(&mut self) -> PResult<PatternElem> {
        let target = self.parse_binding_target()?;
        let default = if self.eat_punct(Punct::Assign) {
            let mut value = self.parse_assignment()?;
            if let Pattern::Ident(name, _) = &target {
                infer_function_name(&mut value, name);
            }
            Some(value)
        } else {
            None
        };
        Ok(PatternElem { target, default })
    }

    fn parse_array_binding(&mut self) -> PResult<Pattern> {
        self.expect_punct(Punct::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        loop {
            if self.eat_punct(Punct::RBracket) {
                break;
            }
            if self.eat_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }
            if self.eat_punct(Punct::Ellipsis) {
                rest = Some(Box::new(self.parse_binding_target()?));
                if !self.is_punct(Punct::RBracket) {
                    return Err(ParseError::new(
                        "Rest element must be last element",
                        self.peek().pos,
                    ));
                }
                continue;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.is_punct(Punct::RBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(Pattern::Array { elements, rest })
    }

    fn parse_object_binding(&mut self) -> PResult<Pattern> {
        self.expect_punct(Punct::LBrace)?;
        let mut props = Vec::new();
        let mut rest = None;
        loop {
            if self.eat_punct(Punct::RBrace) {
                break;
            }
            if self.eat_punct(Punct::Ellipsis) {
                let (name, pos) = self.binding_ident()?;
                rest = Some(Box::new(Pattern::Ident(name, pos)));
                if !self.is_punct(Punct::RBrace) {
                    return Err(ParseError::new(
                        "Rest element must be last element",
                        self.peek().pos,
                    ));
                }
                continue;
            }
            let key_token = self.peek().clone();
            let key = self.parse_property_key()?;
            let target = if self.eat_punct(Punct::Colon) {
                self.parse_binding_target()?
            } else {
                match (&key_token.tok, &key) {
                    (Tok::Ident(name), PropKey::Static(_)) => {
                        check_binding_name(name, key_token.pos)?;
                        Pattern::Ident(name.clone(), key_token.pos)
                    }
                    _ => return Err(ParseError::new("Unexpected token", key_token.pos)),
                }
            };
            let default = if self.eat_punct(Punct::Assign) {
                let mut value = self.parse_assignment()?;
                if let Pattern::Ident(name, _) = &target {
                    infer_function_name(&mut value, name);
                }
                Some(value)
            } else {
                None
            };
            props.push(PatternProp {
                key,
                target,
                default,
            });
            if !self.is_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(Pattern::Object { props, rest })
    }

    fn parse_property_key(&mut self) -> PResult<PropKey> {
        let token = self.next();
        match token.tok {
            Tok::Ident(name) => Ok(PropKey::Static(name)),
            Tok::Keyword(kw) => Ok(PropKey::Static(Rc::from(kw.as_str()))),
            Tok::Str(value) => Ok(PropKey::Static(value)),
            Tok::Number(n) => Ok(PropKey::Static(Rc::from(number_to_string(n)))),
            Tok::Punct(Punct::LBracket) => {
                let saved = std::mem::replace(&mut self.no_in, false);
                let expr = self.parse_assignment();
                self.no_in = saved;
                let expr = expr?;
                self.expect_punct(Punct::RBracket)?;
                Ok(PropKey::Computed(Box::new(expr)))
            }
            _ => {
                self.idx -= 1;
                Err(self.unexpected())
            }
        }
    }

    // ---- functions ----

    /// Parse after the `function` keyword.
    fn parse_function_rest(&mut self, start: usize, pos: Pos, is_decl: bool) -> PResult<FunctionDef> {
        if self.is_punct(Punct::Star) {
            return Err(self.unsupported("generator functions are not supported"));
        }
        let id = if matches!(self.peek_tok(), Tok::Ident(_)) {
            Some(self.binding_ident()?.0)
        } else if is_decl {
            return Err(ParseError::new(
                "Function statements require a function name",
                self.peek().pos,
            ));
        } else {
            None
        };
        let (params, rest) = self.parse_params()?;
        let (body, uses_arguments) = self.parse_function_body(&params, &rest, false)?;
        let mut var_names = Vec::new();
        collect_var_names(&body, &mut var_names);
        dedup_names(&mut var_names);
        Ok(FunctionDef {
            name: id.clone().unwrap_or_else(|| Rc::from("")),
            id,
            params,
            rest,
            body: FunctionBody::Block(body),
            is_arrow: false,
            uses_arguments,
            var_names,
            source: self.slice_from(start),
            pos,
        })
    }

    fn parse_params(&mut self) -> PResult<(Vec<PatternElem>, Option<Pattern>)> {
        let open = self.expect_punct(Punct::LParen)?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = self.parse_param_list();
        self.no_in = saved;
        let (params, rest) = result?;

        let mut names = Vec::new();
        for param in &params {
            param.target.bound_names(&mut names);
        }
        if let Some(rest) = &rest {
            rest.bound_names(&mut names);
        }
        if has_duplicates(&names) {
            return Err(ParseError::new(
                "Duplicate parameter name not allowed in this context",
                open,
            ));
        }
        Ok((params, rest))
    }

    fn parse_param_list(&mut self) -> PResult<(Vec<PatternElem>, Option<Pattern>)> {
        let mut params = Vec::new();
        let mut rest = None;
        loop {
            if self.eat_punct(Punct::RParen) {
                return Ok((params, rest));
            }
            if self.eat_punct(Punct::Ellipsis) {
                rest = Some(self.parse_binding_target()?);
                if !self.is_punct(Punct::RParen) {
                    return Err(ParseError::new(
                        "Rest parameter must be last formal parameter",
                        self.peek().pos,
                    ));
                }
                continue;
            }
            params.push(self.parse_binding_element()?);
            if !self.is_punct(Punct::RParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
    }

    /// Parse `{ ... }` as a function body in a fresh function context.
    fn parse_function_body(
        &mut self,
        params: &[PatternElem],
        rest: &Option<Pattern>,
        is_arrow: bool,
    ) -> PResult<(Vec<Stmt>, bool)> {
        let outer = std::mem::replace(
            &mut self.ctx,
            FnContext {
                in_function: true,
                ..FnContext::default()
            },
        );
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let saved_depth = std::mem::replace(&mut self.literal_depth, 0);
        let body = self.parse_block_statements();
        self.no_in = saved_no_in;
        self.literal_depth = saved_depth;
        let inner = std::mem::replace(&mut self.ctx, outer);
        if is_arrow && inner.uses_arguments {
            self.ctx.uses_arguments = true;
        }
        let body = body?;

        let mut param_names = Vec::new();
        for param in params {
            param.target.bound_names(&mut param_names);
        }
        if let Some(rest) = rest {
            rest.bound_names(&mut param_names);
        }
        check_lexical(body.iter(), &param_names, true)?;
        Ok((body, inner.uses_arguments))
    }

    fn parse_block_statements(&mut self) -> PResult<Vec<Stmt>> {
        self.expect_punct(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.is_punct(Punct::RBrace) {
            if self.at_eof() {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        self.next();
        Ok(body)
    }

    fn parse_arrow(&mut self, start: usize, pos: Pos) -> PResult<Expr> {
        let (params, rest) = if let Tok::Ident(_) = self.peek_tok() {
            let (name, name_pos) = self.binding_ident()?;
            (
                vec![PatternElem {
                    target: Pattern::Ident(name, name_pos),
                    default: None,
                }],
                None,
            )
        } else {
            self.parse_params()?
        };
        if self.peek().newline_before {
            return Err(self.unexpected());
        }
        self.expect_punct(Punct::Arrow)?;

        let (body, var_names) = if self.is_punct(Punct::LBrace) {
            let (body, _) = self.parse_function_body(&params, &rest, true)?;
            let mut var_names = Vec::new();
            collect_var_names(&body, &mut var_names);
            dedup_names(&mut var_names);
            (FunctionBody::Block(body), var_names)
        } else {
            let outer = std::mem::replace(
                &mut self.ctx,
                FnContext {
                    in_function: true,
                    ..FnContext::default()
                },
            );
            let saved_depth = std::mem::replace(&mut self.literal_depth, 0);
            let expr = self.parse_assignment();
            self.literal_depth = saved_depth;
            let inner = std::mem::replace(&mut self.ctx, outer);
            if inner.uses_arguments {
                self.ctx.uses_arguments = true;
            }
            (FunctionBody::Expr(Box::new(expr?)), Vec::new())
        };

        let def = FunctionDef {
            id: None,
            name: Rc::from(""),
            params,
            rest,
            body,
            is_arrow: true,
            uses_arguments: false,
            var_names,
            source: self.slice_from(start),
            pos,
        };
        Ok(Expr::new(ExprKind::Function(Rc::new(def)), pos))
    }

    /// At `(`: does the matching `)` precede `=>`?
    fn is_arrow_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.idx;
        while i < self.tokens.len() {
            match &self.tokens[i].tok {
                Tok::Punct(Punct::LParen) | Tok::Punct(Punct::LBracket) | Tok::Punct(Punct::LBrace) => {
                    depth += 1
                }
                Tok::Punct(Punct::RParen) | Tok::Punct(Punct::RBracket) | Tok::Punct(Punct::RBrace) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self.tokens.get(i + 1).is_some_and(|t| {
                            matches!(t.tok, Tok::Punct(Punct::Arrow)) && !t.newline_before
                        });
                    }
                }
                Tok::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    // ---- expressions ----

    fn parse_expression(&mut self) -> PResult<Expr> {
        let first = self.parse_assignment()?;
        if !self.is_punct(Punct::Comma) {
            return Ok(first);
        }
        let pos = first.pos;
        let mut exprs = vec![first];
        while self.eat_punct(Punct::Comma) {
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), pos))
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match &token.tok {
            Tok::Ident(_) if matches!(self.peek_at(1), Tok::Punct(Punct::Arrow)) => {
                return self.parse_arrow(token.start, token.pos);
            }
            Tok::Punct(Punct::LParen) if self.is_arrow_ahead() => {
                return self.parse_arrow(token.start, token.pos);
            }
            Tok::Keyword(Keyword::Async) => {
                return Err(self.unsupported("async functions are not supported"));
            }
            Tok::Keyword(Keyword::Yield) => {
                return Err(self.unsupported("generators are not supported"));
            }
            _ => {}
        }

        let mark = self.cover_init.len();
        let left = self.parse_conditional()?;
        let Some(op) = self.peek_assign_op() else {
            // Inside an array or object literal the enclosing literal may
            // still turn out to be a destructuring target.
            if let Some(pos) = self.cover_init.get(mark).copied() {
                if self.literal_depth == 0
                    && !self.is_contextual("of")
                    && !self.is_kw(Keyword::In)
                {
                    return Err(ParseError::new("Invalid shorthand property initializer", pos));
                }
            }
            return Ok(left);
        };
        let op_pos = self.next().pos;

        let target = match (&op, &left.kind) {
            (AssignOp::Assign, ExprKind::Array(_)) | (AssignOp::Assign, ExprKind::Object(_)) => {
                self.cover_init.truncate(mark);
                self.expr_to_pattern(left)?
            }
            _ => self.simple_target(left, "Invalid left-hand side in assignment", op_pos)?,
        };
        let mut value = self.parse_assignment()?;
        if let Pattern::Ident(name, _) = &target {
            infer_function_name(&mut value, name);
        }
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            token.pos,
        ))
    }

    fn peek_assign_op(&self) -> Option<AssignOp> {
        let Tok::Punct(p) = self.peek_tok() else {
            return None;
        };
        let op = match p {
            Punct::Assign => AssignOp::Assign,
            Punct::PlusAssign => AssignOp::Compound(BinaryOp::Add),
            Punct::MinusAssign => AssignOp::Compound(BinaryOp::Sub),
            Punct::StarAssign => AssignOp::Compound(BinaryOp::Mul),
            Punct::SlashAssign => AssignOp::Compound(BinaryOp::Div),
            Punct::PercentAssign => AssignOp::Compound(BinaryOp::Rem),
            Punct::StarStarAssign => AssignOp::Compound(BinaryOp::Pow),
            Punct::ShlAssign => AssignOp::Compound(BinaryOp::Shl),
            Punct::ShrAssign => AssignOp::Compound(BinaryOp::Shr),
            Punct::UShrAssign => AssignOp::Compound(BinaryOp::UShr),
            Punct::AmpAssign => AssignOp::Compound(BinaryOp::BitAnd),
            Punct::PipeAssign => AssignOp::Compound(BinaryOp::BitOr),
            Punct::CaretAssign => AssignOp::Compound(BinaryOp::BitXor),
            Punct::AndAndAssign => AssignOp::Logical(LogicalOp::And),
            Punct::OrOrAssign => AssignOp::Logical(LogicalOp::Or),
            Punct::NullishAssign => AssignOp::Logical(LogicalOp::Nullish),
            _ => return None,
        };
        Some(op)
    }

    /// Identifier or non-optional member expression usable as a target.
    fn simple_target(&self, expr: Expr, message: &str, pos: Pos) -> PResult<Pattern> {
        match expr.kind {
            ExprKind::Ident(name) => {
                check_binding_name(&name, expr.pos)?;
                Ok(Pattern::Ident(name, expr.pos))
            }
            ExprKind::Member {
                optional: false, ..
            } => Ok(Pattern::Member(Box::new(expr))),
            _ => Err(ParseError::new(message, pos)),
        }
    }

    fn expr_to_pattern(&self, expr: Expr) -> PResult<Pattern> {
        let pos = expr.pos;
        match expr.kind {
            ExprKind::Array(items) => {
                let count = items.len();
                let mut elements = Vec::new();
                let mut rest = None;
                for (i, item) in items.into_iter().enumerate() {
                    match item {
                        ArrayItem::Hole => elements.push(None),
                        ArrayItem::Item(e) => elements.push(Some(self.expr_to_element(e)?)),
                        ArrayItem::Spread(e) => {
                            if i + 1 != count {
                                return Err(ParseError::new(
                                    "Rest element must be last element",
                                    e.pos,
                                ));
                            }
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                    }
                }
                Ok(Pattern::Array { elements, rest })
            }
            ExprKind::Object(items) => {
                let count = items.len();
                let mut props = Vec::new();
                let mut rest = None;
                for (i, item) in items.into_iter().enumerate() {
                    match item {
                        ObjectProp::KeyValue(key, value) => {
                            let elem = self.expr_to_element(value)?;
                            props.push(PatternProp {
                                key,
                                target: elem.target,
                                default: elem.default,
                            });
                        }
                        ObjectProp::Spread(e) => {
                            if i + 1 != count {
                                return Err(ParseError::new(
                                    "Rest element must be last element",
                                    e.pos,
                                ));
                            }
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                    }
                }
                Ok(Pattern::Object { props, rest })
            }
            _ => self.simple_target(
                Expr::new(expr.kind, pos),
                "Invalid destructuring assignment target",
                pos,
            ),
        }
    }

    fn expr_to_element(&self, expr: Expr) -> PResult<PatternElem> {
        match expr.kind {
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => Ok(PatternElem {
                target: *target,
                default: Some(*value),
            }),
            kind => Ok(PatternElem {
                target: self.expr_to_pattern(Expr::new(kind, expr.pos))?,
                default: None,
            }),
        }
    }

    fn parse_conditional(&mut self) -> PResult<Expr> {
        let test = self.parse_binary(0)?;
        if !self.eat_punct(Punct::Question) {
            return Ok(test);
        }
        let saved = std::mem::replace(&mut self.no_in, false);
        let consequent = self.parse_assignment();
        self.no_in = saved;
        let consequent = consequent?;
        self.expect_punct(Punct::Colon)?;
        let alternate = self.parse_assignment()?;
        let pos = test.pos;
        Ok(Expr::new(
            ExprKind::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate)),
            pos,
        ))
    }

    fn peek_binary_op(&self) -> Option<(BinOp, u8)> {
        let op = match self.peek_tok() {
            Tok::Punct(p) => match p {
                Punct::Nullish => (BinOp::Logical(LogicalOp::Nullish), 1),
                Punct::OrOr => (BinOp::Logical(LogicalOp::Or), 2),
                Punct::AndAnd => (BinOp::Logical(LogicalOp::And), 3),
                Punct::Pipe => (BinOp::Binary(BinaryOp::BitOr), 4),
                Punct::Caret => (BinOp::Binary(BinaryOp::BitXor), 5),
                Punct::Amp => (BinOp::Binary(BinaryOp::BitAnd), 6),
                Punct::Eq => (BinOp::Binary(BinaryOp::Eq), 7),
                Punct::Ne => (BinOp::Binary(BinaryOp::Ne), 7),
                Punct::StrictEq => (BinOp::Binary(BinaryOp::StrictEq), 7),
                Punct::StrictNe => (BinOp::Binary(BinaryOp::StrictNe), 7),
                Punct::Lt => (BinOp::Binary(BinaryOp::Lt), 8),
                Punct::Gt => (BinOp::Binary(BinaryOp::Gt), 8),
                Punct::Le => (BinOp::Binary(BinaryOp::Le), 8),
                Punct::Ge => (BinOp::Binary(BinaryOp::Ge), 8),
                Punct::Shl => (BinOp::Binary(BinaryOp::Shl), 9),
                Punct::Shr => (BinOp::Binary(BinaryOp::Shr), 9),
                Punct::UShr => (BinOp::Binary(BinaryOp::UShr), 9),
                Punct::Plus => (BinOp::Binary(BinaryOp::Add), 10),
                Punct::Minus => (BinOp::Binary(BinaryOp::Sub), 10),
                Punct::Star => (BinOp::Binary(BinaryOp::Mul), 11),
                Punct::Slash => (BinOp::Binary(BinaryOp::Div), 11),
                Punct::Percent => (BinOp::Binary(BinaryOp::Rem), 11),
                _ => return None,
            },
            Tok::Keyword(Keyword::Instanceof) => (BinOp::Binary(BinaryOp::Instanceof), 8),
            Tok::Keyword(Keyword::In) if !self.no_in => (BinOp::Binary(BinaryOp::In), 8),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.parse_exponent()?;
        while let Some((op, prec)) = self.peek_binary_op() {
            if prec <= min_prec {
                break;
            }
            self.next();
            let right = self.parse_binary(prec)?;
            let pos = left.pos;
            let kind = match op {
                BinOp::Binary(op) => ExprKind::Binary(op, Box::new(left), Box::new(right)),
                BinOp::Logical(op) => ExprKind::Logical(op, Box::new(left), Box::new(right)),
            };
            left = Expr::new(kind, pos);
        }
        Ok(left)
    }

    fn is_unary_start(&self) -> bool {
        matches!(
            self.peek_tok(),
            Tok::Punct(Punct::Bang)
                | Tok::Punct(Punct::Minus)
                | Tok::Punct(Punct::Plus)
                | Tok::Punct(Punct::Tilde)
                | Tok::Keyword(Keyword::Typeof)
                | Tok::Keyword(Keyword::Void)
                | Tok::Keyword(Keyword::Delete)
                | Tok::Keyword(Keyword::Await)
        )
    }

    fn parse_exponent(&mut self) -> PResult<Expr> {
        if self.is_unary_start() {
            let expr = self.parse_unary()?;
            if self.is_punct(Punct::StarStar) {
                return Err(ParseError::new(
                    "Unary operator used immediately before exponentiation expression. Parenthesis must be used to disambiguate operator precedence",
                    self.peek().pos,
                ));
            }
            return Ok(expr);
        }
        let base = self.parse_postfix()?;
        if self.eat_punct(Punct::StarStar) {
            let exponent = self.parse_exponent()?;
            let pos = base.pos;
            return Ok(Expr::new(
                ExprKind::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
                pos,
            ));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let token = self.next();
        let op = match token.tok {
            Tok::Punct(Punct::Bang) => UnaryOp::Not,
            Tok::Punct(Punct::Minus) => UnaryOp::Neg,
            Tok::Punct(Punct::Plus) => UnaryOp::Plus,
            Tok::Punct(Punct::Tilde) => UnaryOp::BitNot,
            Tok::Keyword(Keyword::Typeof) => UnaryOp::Typeof,
            Tok::Keyword(Keyword::Void) => UnaryOp::Void,
            Tok::Keyword(Keyword::Delete) => UnaryOp::Delete,
            Tok::Keyword(Keyword::Await) => {
                return Err(ParseError::new(
                    "Unsupported syntax: await is not supported",
                    token.pos,
                ));
            }
            _ => {
                self.idx -= 1;
                return Err(self.unexpected());
            }
        };
        let operand = if self.is_unary_start() {
            self.parse_unary()?
        } else {
            self.parse_postfix()?
        };
        if op == UnaryOp::Delete && matches!(operand.kind, ExprKind::Ident(_)) {
            return Err(ParseError::new(
                "Delete of an unqualified identifier in strict mode.",
                token.pos,
            ));
        }
        Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), token.pos))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        if self.is_punct(Punct::PlusPlus) || self.is_punct(Punct::MinusMinus) {
            let token = self.next();
            let increment = token.tok == Tok::Punct(Punct::PlusPlus);
            let operand = if self.is_unary_start() {
                self.parse_unary()?
            } else {
                self.parse_postfix()?
            };
            let target =
                self.update_target(operand, "Invalid left-hand side expression in prefix operation")?;
            return Ok(Expr::new(
                ExprKind::Update {
                    increment,
                    prefix: true,
                    target: Box::new(target),
                },
                token.pos,
            ));
        }
        let expr = self.parse_lhs()?;
        if (self.is_punct(Punct::PlusPlus) || self.is_punct(Punct::MinusMinus))
            && !self.peek().newline_before
        {
            let token = self.next();
            let increment = token.tok == Tok::Punct(Punct::PlusPlus);
            let pos = expr.pos;
            let target =
                self.update_target(expr, "Invalid left-hand side expression in postfix operation")?;
            return Ok(Expr::new(
                ExprKind::Update {
                    increment,
                    prefix: false,
                    target: Box::new(target),
                },
                pos,
            ));
        }
        Ok(expr)
    }

    fn update_target(&self, expr: Expr, message: &str) -> PResult<Expr> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                check_binding_name(name, expr.pos)?;
                Ok(expr)
            }
            ExprKind::Member {
                optional: false, ..
            } => Ok(expr),
            _ => Err(ParseError::new(message, expr.pos)),
        }
    }

    fn parse_lhs(&mut self) -> PResult<Expr> {
        let mut expr = if self.is_kw(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut in_chain = false;
        loop {
            let pos = expr.pos;
            match self.peek_tok() {
                Tok::Punct(Punct::Dot) => {
                    self.next();
                    let name = self.member_name()?;
                    expr = member(expr, PropKey::Static(name), false, pos);
                }
                Tok::Punct(Punct::QuestionDot) => {
                    self.next();
                    in_chain = true;
                    if self.is_punct(Punct::LParen) {
                        let args = self.parse_arguments()?;
                        expr = Expr::new(
                            ExprKind::Call {
                                callee: Box::new(expr),
                                args,
                                optional: true,
                            },
                            pos,
                        );
                    } else if self.eat_punct(Punct::LBracket) {
                        let property = self.parse_bracket_rest()?;
                        expr = member(expr, property, true, pos);
                    } else {
                        let name = self.member_name()?;
                        expr = member(expr, PropKey::Static(name), true, pos);
                    }
                }
                Tok::Punct(Punct::LBracket) => {
                    self.next();
                    let property = self.parse_bracket_rest()?;
                    expr = member(expr, property, false, pos);
                }
                Tok::Punct(Punct::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            optional: false,
                        },
                        pos,
                    );
                }
                Tok::Template(_) => {
                    return Err(self.unsupported("tagged templates are not supported"));
                }
                _ => break,
            }
        }
        if in_chain {
            let pos = expr.pos;
            expr = Expr::new(ExprKind::OptionalChain(Box::new(expr)), pos);
        }
        Ok(expr)
    }

    fn parse_bracket_rest(&mut self) -> PResult<PropKey> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let saved_depth = std::mem::replace(&mut self.literal_depth, 0);
        let expr = self.parse_expression();
        self.no_in = saved;
        self.literal_depth = saved_depth;
        let expr = expr?;
        self.expect_punct(Punct::RBracket)?;
        Ok(PropKey::Computed(Box::new(expr)))
    }

    fn member_name(&mut self) -> PResult<Rc<str>> {
        match self.peek_tok().clone() {
            Tok::Ident(name) => {
                self.next();
                Ok(name)
            }
            Tok::Keyword(kw) => {
                self.next();
                Ok(Rc::from(kw.as_str()))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_new(&mut self) -> PResult<Expr> {
        let pos = self.next().pos;
        if self.is_punct(Punct::Dot) {
            return Err(self.unsupported("new.target is not supported"));
        }
        let mut callee = if self.is_kw(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let callee_pos = callee.pos;
            if self.eat_punct(Punct::Dot) {
                let name = self.member_name()?;
                callee = member(callee, PropKey::Static(name), false, callee_pos);
            } else if self.eat_punct(Punct::LBracket) {
                let property = self.parse_bracket_rest()?;
                callee = member(callee, property, false, callee_pos);
            } else {
                break;
            }
        }
        let args = if self.is_punct(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            pos,
        ))
    }

    fn parse_arguments(&mut self) -> PResult<Vec<Arg>> {
        self.expect_punct(Punct::LParen)?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let saved_depth = std::mem::replace(&mut self.literal_depth, 0);
        let result = (|| -> PResult<Vec<Arg>> {
            let mut args = Vec::new();
            loop {
                if self.eat_punct(Punct::RParen) {
                    return Ok(args);
                }
                if self.eat_punct(Punct::Ellipsis) {
                    args.push(Arg::Spread(self.parse_assignment()?));
                } else {
                    args.push(Arg::Plain(self.parse_assignment()?));
                }
                if !self.is_punct(Punct::RParen) {
                    self.expect_punct(Punct::Comma)?;
                }
            }
        })();
        self.no_in = saved;
        self.literal_depth = saved_depth;
        result
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.next();
        let pos = token.pos;
        let kind = match token.tok {
            Tok::Number(n) => ExprKind::Number(n),
            Tok::Str(s) => ExprKind::Str(s),
            Tok::Template(chunks) => return self.parse_template(chunks, pos),
            Tok::Regex { pattern, flags } => {
                if let Err(message) = compile_regex(&pattern, &flags) {
                    return Err(ParseError::new(message, pos));
                }
                ExprKind::Regex { pattern, flags }
            }
            Tok::Ident(name) => {
                if &*name == "arguments" {
                    self.ctx.uses_arguments = true;
                }
                ExprKind::Ident(name)
            }
            Tok::Keyword(Keyword::This) => ExprKind::This,
            Tok::Keyword(Keyword::True) => ExprKind::Bool(true),
            Tok::Keyword(Keyword::False) => ExprKind::Bool(false),
            Tok::Keyword(Keyword::Null) => ExprKind::Null,
            Tok::Keyword(Keyword::Function) => {
                let def = self.parse_function_rest(token.start, pos, false)?;
                ExprKind::Function(Rc::new(def))
            }
            Tok::Keyword(Keyword::Class) => {
                return Err(ParseError::new(
                    "Unsupported syntax: class expressions are not supported",
                    pos,
                ));
            }
            Tok::Keyword(Keyword::Super) => {
                return Err(ParseError::new("'super' keyword unexpected here", pos));
            }
            Tok::Punct(Punct::LParen) => {
                let saved = std::mem::replace(&mut self.no_in, false);
                let saved_depth = std::mem::replace(&mut self.literal_depth, 0);
                let expr = self.parse_expression();
                self.no_in = saved;
                self.literal_depth = saved_depth;
                let expr = expr?;
                self.expect_punct(Punct::RParen)?;
                return Ok(expr);
            }
            Tok::Punct(Punct::LBracket) => return self.parse_array_literal(pos),
            Tok::Punct(Punct::LBrace) => return self.parse_object_literal(pos),
            _ => {
                self.idx -= 1;
                return Err(self.unexpected());
            }
        };
        Ok(Expr::new(kind, pos))
    }

    fn parse_template(&mut self, chunks: Vec<TemplateChunk>, pos: Pos) -> PResult<Expr> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        for chunk in chunks {
            match chunk {
                TemplateChunk::Text(text) => quasis.push(text),
                TemplateChunk::Expr(mut tokens) => {
                    let (eof_pos, end) = tokens
                        .last()
                        .map(|t| (t.pos, t.end))
                        .unwrap_or((pos, 0));
                    tokens.push(Token {
                        tok: Tok::Eof,
                        pos: eof_pos,
                        newline_before: false,
                        start: end,
                        end,
                    });
                    let mut sub = Parser::new(self.src, tokens);
                    sub.ctx.in_function = self.ctx.in_function;
                    let expr = sub.parse_expression()?;
                    if !sub.at_eof() {
                        return Err(sub.unexpected());
                    }
                    if sub.ctx.uses_arguments {
                        self.ctx.uses_arguments = true;
                    }
                    exprs.push(expr);
                }
            }
        }
        Ok(Expr::new(ExprKind::Template { quasis, exprs }, pos))
    }

    fn parse_array_literal(&mut self, pos: Pos) -> PResult<Expr> {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.literal_depth += 1;
        let result = (|| -> PResult<Vec<ArrayItem>> {
            let mut items = Vec::new();
            loop {
                if self.eat_punct(Punct::RBracket) {
                    return Ok(items);
                }
                if self.eat_punct(Punct::Comma) {
                    items.push(ArrayItem::Hole);
                    continue;
                }
                if self.eat_punct(Punct::Ellipsis) {
                    items.push(ArrayItem::Spread(self.parse_assignment()?));
                } else {
                    items.push(ArrayItem::Item(self.parse_assignment()?));
                }
                if !self.is_punct(Punct::RBracket) {
                    self.expect_punct(Punct::Comma)?;
                }
            }
        })();
        self.no_in = saved;
        self.literal_depth -= 1;
        Ok(Expr::new(ExprKind::Array(result?), pos))
    }

    fn parse_object_literal(&mut self, pos: Pos) -> PResult<Expr> {
        let saved = std::mem::replace(&mut self.no_in, false);
        self.literal_depth += 1;
        let result = self.parse_object_props();
        self.literal_depth -= 1;
        self.no_in = saved;
        Ok(Expr::new(ExprKind::Object(result?), pos))
    }

    fn parse_object_props(&mut self) -> PResult<Vec<ObjectProp>> {
        let mut props = Vec::new();
        loop {
            if self.eat_punct(Punct::RBrace) {
                return Ok(props);
            }
            if self.eat_punct(Punct::Ellipsis) {
                props.push(ObjectProp::Spread(self.parse_assignment()?));
            } else {
                props.push(self.parse_object_member()?);
            }
            if !self.is_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
    }

    fn parse_object_member(&mut self) -> PResult<ObjectProp> {
        let key_token = self.peek().clone();
        let followed_by_key = !matches!(
            self.peek_at(1),
            Tok::Punct(Punct::Colon)
                | Tok::Punct(Punct::LParen)
                | Tok::Punct(Punct::Comma)
                | Tok::Punct(Punct::RBrace)
                | Tok::Punct(Punct::Assign)
        );
        match &key_token.tok {
            Tok::Ident(word) if (&**word == "get" || &**word == "set") && followed_by_key => {
                return Err(self.unsupported("getters and setters are not supported"));
            }
            Tok::Keyword(Keyword::Async) if followed_by_key => {
                return Err(self.unsupported("async methods are not supported"));
            }
            Tok::Punct(Punct::Star) => {
                return Err(self.unsupported("generator methods are not supported"));
            }
            _ => {}
        }

        let key = self.parse_property_key()?;
        if self.eat_punct(Punct::Colon) {
            let mut value = self.parse_assignment()?;
            if let PropKey::Static(name) = &key {
                infer_function_name(&mut value, name);
            }
            return Ok(ObjectProp::KeyValue(key, value));
        }
        if self.is_punct(Punct::LParen) {
            let (params, rest) = self.parse_params()?;
            let (body, uses_arguments) = self.parse_function_body(&params, &rest, false)?;
            let mut var_names = Vec::new();
            collect_var_names(&body, &mut var_names);
            dedup_names(&mut var_names);
            let name = match &key {
                PropKey::Static(name) => name.clone(),
                PropKey::Computed(_) => Rc::from(""),
            };
            let def = FunctionDef {
                id: None,
                name,
                params,
                rest,
                body: FunctionBody::Block(body),
                is_arrow: false,
                uses_arguments,
                var_names,
                source: self.slice_from(key_token.start),
                pos: key_token.pos,
            };
            return Ok(ObjectProp::KeyValue(
                key,
                Expr::new(ExprKind::Function(Rc::new(def)), key_token.pos),
            ));
        }
        // Shorthand `{ name }` or the `{ name = value }` cover form of a pattern.
        let Tok::Ident(name) = key_token.tok else {
            return Err(self.unexpected());
        };
        if &*name == "arguments" {
            self.ctx.uses_arguments = true;
        }
        let ident = Expr::new(ExprKind::Ident(name.clone()), key_token.pos);
        if self.is_punct(Punct::Assign) {
            let assign_pos = self.next().pos;
            self.cover_init.push(assign_pos);
            let mut default = self.parse_assignment()?;
            infer_function_name(&mut default, &name);
            let value = Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(Pattern::Ident(name.clone(), key_token.pos)),
                    value: Box::new(default),
                },
                key_token.pos,
            );
            return Ok(ObjectProp::KeyValue(PropKey::Static(name), value));
        }
        Ok(ObjectProp::KeyValue(PropKey::Static(name), ident))
    }
}

#[derive(Clone, Copy)]
enum BinOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

fn member(object: Expr, property: PropKey, optional: bool, pos: Pos) -> Expr {
    Expr::new(
        ExprKind::Member {
            object: Box::new(object),
            property,
            optional,
        },
        pos,
    )
}

fn decl_kind(kw: Keyword) -> DeclKind {
    match kw {
        Keyword::Let => DeclKind::Let,
        Keyword::Const => DeclKind::Const,
        _ => DeclKind::Var,
    }
}

fn check_binding_name(name: &str, pos: Pos) -> PResult<()> {
    if name == "eval" || name == "arguments" {
        return Err(ParseError::new("Unexpected eval or arguments in strict mode", pos));
    }
    if STRICT_RESERVED.contains(&name) {
        return Err(ParseError::new("Unexpected strict mode reserved word", pos));
    }
    Ok(())
}

/// Give an anonymous function or arrow the name of the binding it initializes.
fn infer_function_name(value: &mut Expr, name: &Rc<str>) {
    if let ExprKind::Function(def) = &mut value.kind {
        if let Some(def) = Rc::get_mut(def) {
            if def.name.is_empty() {
                def.name = name.clone();
            }
        }
    }
}

fn has_duplicates(names: &[Rc<str>]) -> bool {
    names
        .iter()
        .enumerate()
        .any(|(i, name)| names[..i].contains(name))
}

fn dedup_names(names: &mut Vec<Rc<str>>) {
    let mut seen: Vec<Rc<str>> = Vec::with_capacity(names.len());
    names.retain(|name| {
        if seen.contains(name) {
            false
        } else {
            seen.push(name.clone());
            true
        }
    });
}

/// Reject duplicate lexical declarations in one statement list and
/// lexical names that clash with `var` names or `reserved` (parameters).
fn check_lexical<'s>(
    stmts: impl Iterator<Item = &'s Stmt> + Clone,
    reserved: &[Rc<str>],
    function_scope: bool,
) -> PResult<()> {
    let mut lexical: Vec<(Rc<str>, Pos)> = Vec::new();
    let mut var_like: Vec<Rc<str>> = Vec::new();
    for stmt in stmts.clone() {
        match stmt {
            Stmt::Decl { kind, decls } if *kind != DeclKind::Var => {
                for decl in decls {
                    let mut names = Vec::new();
                    decl.target.bound_names(&mut names);
                    let pos = pattern_pos(&decl.target);
                    lexical.extend(names.into_iter().map(|n| (n, pos)));
                }
            }
            Stmt::Function(def) => {
                if let Some(id) = &def.id {
                    if function_scope {
                        var_like.push(id.clone());
                    } else {
                        lexical.push((id.clone(), def.pos));
                    }
                }
            }
            _ => {}
        }
    }
    collect_var_names(stmts, &mut var_like);

    for (i, (name, pos)) in lexical.iter().enumerate() {
        let clash = lexical[..i].iter().any(|(other, _)| other == name)
            || var_like.contains(name)
            || reserved.contains(name);
        if clash {
            return Err(ParseError::new(
                format!("Identifier '{}' has already been declared", name),
                *pos,
            ));
        }
    }
    Ok(())
}

fn pattern_pos(pattern: &Pattern) -> Pos {
    match pattern {
        Pattern::Ident(_, pos) => *pos,
        Pattern::Member(expr) => expr.pos,
        Pattern::Array { elements, rest } => elements
            .iter()
            .flatten()
            .map(|e| pattern_pos(&e.target))
            .next()
            .or_else(|| rest.as_deref().map(pattern_pos))
            .unwrap_or_default(),
        Pattern::Object { props, rest } => props
            .iter()
            .map(|p| pattern_pos(&p.target))
            .next()
            .or_else(|| rest.as_deref().map(pattern_pos))
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(src: &str) -> String {
        parse_program(src).unwrap_err().message
    }

    #[test]
    fn test_function_declaration_source_text() {
        let program = parse_program("function add(a, b) {\n  return a + b;\n}\n").unwrap();
        match &program.body[0] {
            Stmt::Function(def) => {
                assert_eq!(&*def.name, "add");
                assert_eq!(&*def.source, "function add(a, b) {\n  return a + b;\n}");
                assert_eq!(def.params.len(), 2);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_arrow_name_inference() {
        let program = parse_program("const double = (x) => x * 2;").unwrap();
        let Stmt::Decl { decls, .. } = &program.body[0] else {
            panic!("expected declaration");
        };
        let Some(Expr {
            kind: ExprKind::Function(def),
            ..
        }) = &decls[0].init
        else {
            panic!("expected arrow");
        };
        assert!(def.is_arrow);
        assert_eq!(&*def.name, "double");
        assert_eq!(&*def.source, "(x) => x * 2");
    }

    #[test]
    fn test_var_hoisting_names() {
        let program = parse_program("var a = 1; if (a) { var b; } for (var i = 0; i < 1; i++) {}").unwrap();
        let names: Vec<&str> = program.var_names.iter().map(|n| &**n).collect();
        assert_eq!(names, vec!["a", "b", "i"]);
    }

    #[test]
    fn test_duplicate_lexical_declaration() {
        assert_eq!(
            parse_err("let x = 1; let x = 2;"),
            "Identifier 'x' has already been declared"
        );
        assert_eq!(
            parse_err("function f(a) { let a = 1; }"),
            "Identifier 'a' has already been declared"
        );
        assert!(parse_program("let x = 1; { let x = 2; }").is_ok());
    }

    #[test]
    fn test_strict_mode_errors() {
        assert!(parse_err("with (obj) {}").contains("with statement"));
        assert!(parse_err("var x = 1; delete x;").contains("unqualified identifier"));
        assert!(parse_err("function f(a, a) {}").contains("Duplicate parameter"));
        assert!(parse_err("var eval = 1;").contains("eval or arguments"));
        assert!(parse_err("const x;").contains("Missing initializer"));
    }

    #[test]
    fn test_unsupported_syntax() {
        assert!(parse_err("class A {}").contains("class"));
        assert!(parse_err("async function f() {}").contains("async"));
        assert!(parse_err("function* g() {}").contains("generator"));
        assert!(parse_err("const o = { get size() { return 1; } };").contains("getters and setters"));
        assert!(parse_err("const o = { set size(v) {} };").contains("getters and setters"));
        assert!(parse_err("tag`x`;").contains("tagged templates"));
        assert!(parse_program("const o = { get: 1, set() { return 2; } };").is_ok());
    }

    #[test]
    fn test_automatic_semicolon_insertion() {
        let program = parse_program("let a = 1\nlet b = a\nreturnValue(b)").unwrap();
        assert_eq!(program.body.len(), 3);
        let program = parse_program("function f() {\n  return\n  42\n}").unwrap();
        let Stmt::Function(def) = &program.body[0] else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &def.body else {
            panic!("expected block body");
        };
        assert!(matches!(body[0], Stmt::Return(None)));
    }

    #[test]
    fn test_destructuring_assignment() {
        let program = parse_program("let a, b; [a, b] = [b, a]; ({ a, b = 2 } = {});").unwrap();
        assert!(matches!(
            &program.body[1],
            Stmt::Expr(Expr {
                kind: ExprKind::Assign {
                    op: AssignOp::Assign,
                    ..
                },
                ..
            })
        ));
        assert!(parse_program("({ a = 1 });").is_err());
    }

    #[test]
    fn test_for_of_and_for_in_heads() {
        assert!(matches!(
            parse_program("for (const [k, v] of pairs) {}").unwrap().body[0],
            Stmt::ForOf { .. }
        ));
        assert!(matches!(
            parse_program("let k; for (k in obj) {}").unwrap().body[1],
            Stmt::ForIn { .. }
        ));
        assert!(matches!(
            parse_program("for (let i = 0, n = 2; i < n; i++) {}").unwrap().body[0],
            Stmt::For { .. }
        ));
    }

    #[test]
    fn test_jump_validation() {
        assert_eq!(parse_err("break;"), "Illegal break statement");
        assert!(parse_err("while (true) { continue missing; }").contains("Undefined label"));
        assert!(parse_program("outer: for (;;) { for (;;) { break outer; } }").is_ok());
        assert_eq!(parse_err("return 1;"), "Illegal return statement");
    }

    #[test]
    fn test_optional_chain_wrapping() {
        let expr = parse_expression_source("a?.b.c()").unwrap();
        assert!(matches!(expr.kind, ExprKind::OptionalChain(_)));
    }

    #[test]
    fn test_exponent_with_unary_operand() {
        assert!(parse_expression_source("-2 ** 2").is_err());
        assert!(parse_expression_source("(-2) ** 2").is_ok());
        assert!(parse_expression_source("2 ** -2").is_ok());
    }

    #[test]
    fn test_template_expression() {
        let expr = parse_expression_source("`sum: ${a + b}!`").unwrap();
        let ExprKind::Template { quasis, exprs } = expr.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis.len(), 2);
        assert_eq!(exprs.len(), 1);
    }

    #[test]
    fn test_object_literal_forms() {
        let expr = parse_expression_source("({ a, 'b': 1, [k]: 2, 3: 4, m() { return 1; }, ...rest })").unwrap();
        let ExprKind::Object(props) = expr.kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 6);
        assert!(parse_expression_source("({ get x() { return 1; } })").is_err());
    }
}
