//! Recursive-descent parser driver: token stream plumbing, module and
//! statement grammar. Expression parsing lives in [`crate::expr`].

use crate::ast::*;
use crate::token::{SvToken, Token};
use gatesim_diagnostics::code::{Category, DiagnosticCode};
use gatesim_diagnostics::{Diagnostic, DiagnosticSink};
use gatesim_source::{FileId, Span};

/// Parses a full source file of zero or more module declarations.
pub fn parse_source_file(tokens: Vec<Token>, file: FileId, sink: &DiagnosticSink) -> SourceFile {
    let mut parser = Parser {
        tokens,
        pos: 0,
        file,
        sink,
    };
    parser.parse_source_file()
}

pub(crate) struct Parser<'a> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    #[allow(dead_code)]
    pub(crate) file: FileId,
    pub(crate) sink: &'a DiagnosticSink,
}

impl Parser<'_> {
    pub(crate) fn peek(&self) -> &SvToken {
        &self.tokens[self.pos].kind
    }

    pub(crate) fn peek_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), SvToken::Eof)
    }

    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn check(&self, kind: &SvToken) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    pub(crate) fn eat(&mut self, kind: &SvToken) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn error_here(&self, msg: impl Into<String>) {
        self.sink.emit(Diagnostic::error(
            DiagnosticCode::new(Category::Error, 101),
            msg,
            self.peek_span(),
        ));
    }

    /// Expects `kind`, consuming it and returning its span on success. On
    /// mismatch, reports a diagnostic and returns the current token's span
    /// without consuming anything, so the caller's resync logic stays in
    /// control of recovery.
    pub(crate) fn expect(&mut self, kind: &SvToken) -> Span {
        if self.check(kind) {
            self.bump().span
        } else {
            self.error_here(format!("expected {kind}, found {}", self.peek()));
            self.peek_span()
        }
    }

    pub(crate) fn expect_ident(&mut self) -> (String, Span) {
        if let SvToken::Ident(name) = self.peek().clone() {
            let span = self.bump().span;
            (name, span)
        } else {
            self.error_here(format!("expected identifier, found {}", self.peek()));
            let span = self.peek_span();
            ("<error>".to_string(), span)
        }
    }

    /// Skips tokens until the next `;` (consumed) or a token that likely
    /// delimits the enclosing construct, used to resynchronize after a
    /// malformed item or statement.
    pub(crate) fn resync_to_semicolon(&mut self) {
        loop {
            match self.peek() {
                SvToken::Semicolon => {
                    self.bump();
                    return;
                }
                SvToken::Eof | SvToken::End | SvToken::Endmodule | SvToken::Endcase => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_source_file(&mut self) -> SourceFile {
        let start = self.peek_span();
        let mut modules = Vec::new();
        while !self.at_eof() {
            if self.check(&SvToken::Module) {
                modules.push(self.parse_module());
            } else {
                self.error_here(format!(
                    "expected 'module' at top level, found {}",
                    self.peek()
                ));
                self.resync_to_semicolon();
            }
        }
        let end = self.peek_span();
        SourceFile {
            modules,
            span: start.merge(end),
        }
    }

    fn parse_module(&mut self) -> ModuleDecl {
        let start = self.expect(&SvToken::Module);
        let (name, _) = self.expect_ident();

        let mut ports = Vec::new();
        if self.eat(&SvToken::LParen) {
            ports = self.parse_port_list();
            self.expect(&SvToken::RParen);
        }
        self.expect(&SvToken::Semicolon);

        let mut items = Vec::new();
        while !self.check(&SvToken::Endmodule) && !self.at_eof() {
            items.push(self.parse_module_item(&mut ports));
        }
        let end = self.expect(&SvToken::Endmodule);

        ModuleDecl {
            name,
            ports,
            items,
            span: start.merge(end),
        }
    }

    /// Parses an ANSI-style port list: `input logic [7:0] a, output b`.
    /// A port without an explicit direction keyword repeats the previous
    /// port's direction, matching SystemVerilog's ANSI header rules.
    fn parse_port_list(&mut self) -> Vec<PortDecl> {
        let mut ports = Vec::new();
        let mut last_direction = Direction::Input;
        if self.check(&SvToken::RParen) {
            return ports;
        }
        loop {
            let start = self.peek_span();
            let direction = match self.peek() {
                SvToken::Input => {
                    self.bump();
                    Direction::Input
                }
                SvToken::Output => {
                    self.bump();
                    Direction::Output
                }
                SvToken::Inout => {
                    self.bump();
                    Direction::Inout
                }
                _ => last_direction,
            };
            last_direction = direction;

            let net_kind = self.parse_optional_net_kind();
            let width = self.parse_optional_width();
            let (name, name_span) = self.expect_ident();

            ports.push(PortDecl {
                direction,
                net_kind,
                width,
                name,
                span: start.merge(name_span),
            });

            if !self.eat(&SvToken::Comma) {
                break;
            }
        }
        ports
    }

    fn parse_optional_net_kind(&mut self) -> Option<NetKind> {
        match self.peek() {
            SvToken::Wire => {
                self.bump();
                Some(NetKind::Wire)
            }
            SvToken::Logic => {
                self.bump();
                Some(NetKind::Logic)
            }
            SvToken::Reg => {
                self.bump();
                Some(NetKind::Reg)
            }
            _ => None,
        }
    }

    fn parse_optional_width(&mut self) -> Option<WidthSpec> {
        if !self.eat(&SvToken::LBracket) {
            return None;
        }
        let msb = self.parse_const_int();
        self.expect(&SvToken::Colon);
        let lsb = self.parse_const_int();
        self.expect(&SvToken::RBracket);
        Some(WidthSpec { msb, lsb })
    }

    /// Parses a bare integer literal used in a width or array-dimension
    /// position (`[7:0]`). Only unsized decimal literals are accepted here.
    fn parse_const_int(&mut self) -> i64 {
        if let SvToken::UnsizedDecimal(n) = *self.peek() {
            self.bump();
            n as i64
        } else {
            self.error_here(format!("expected integer constant, found {}", self.peek()));
            0
        }
    }

    fn parse_module_item(&mut self, ports: &mut [PortDecl]) -> ModuleItem {
        match self.peek().clone() {
            SvToken::Input | SvToken::Output | SvToken::Inout => {
                self.parse_non_ansi_port_redecl(ports)
            }
            SvToken::Wire | SvToken::Logic | SvToken::Reg => {
                ModuleItem::Net(self.parse_net_decl())
            }
            SvToken::Assign => ModuleItem::Assign(self.parse_continuous_assign()),
            SvToken::AlwaysComb | SvToken::AlwaysFf => ModuleItem::Process(self.parse_process()),
            SvToken::Ident(_) => self.parse_instance_item(),
            _ => {
                self.error_here(format!("unexpected token {} in module body", self.peek()));
                let span = self.peek_span();
                self.resync_to_semicolon();
                ModuleItem::Error(span)
            }
        }
    }

    /// Non-ANSI port declarations repeat `input`/`output` inside the module
    /// body purely to attach a net kind and width to an already-listed port
    /// name; they do not introduce a new port.
    fn parse_non_ansi_port_redecl(&mut self, ports: &mut [PortDecl]) -> ModuleItem {
        let start = self.peek_span();
        self.bump(); // direction keyword, already recorded in the header
        let net_kind = self.parse_optional_net_kind();
        let width = self.parse_optional_width();
        let (name, name_span) = self.expect_ident();
        self.expect(&SvToken::Semicolon);

        if let Some(port) = ports.iter_mut().find(|p| p.name == name) {
            if net_kind.is_some() {
                port.net_kind = net_kind;
            }
            if width.is_some() {
                port.width = width;
            }
        } else {
            self.error_here(format!("'{name}' is not a declared port"));
        }

        ModuleItem::Net(NetDecl {
            net_kind: net_kind.unwrap_or(NetKind::Wire),
            width,
            name,
            memory_dims: None,
            span: start.merge(name_span),
        })
    }

    fn parse_net_decl(&mut self) -> NetDecl {
        let start = self.peek_span();
        let net_kind = self.parse_optional_net_kind().unwrap();
        let width = self.parse_optional_width();
        let (name, mut end) = self.expect_ident();
        let memory_dims = self.parse_optional_width();
        if memory_dims.is_some() {
            end = self.peek_span();
        }
        self.expect(&SvToken::Semicolon);
        NetDecl {
            net_kind,
            width,
            name,
            memory_dims,
            span: start.merge(end),
        }
    }

    fn parse_continuous_assign(&mut self) -> ContinuousAssign {
        let start = self.expect(&SvToken::Assign);
        let lhs = self.parse_expr();
        self.expect(&SvToken::Assign_);
        let rhs = self.parse_expr();
        let end = self.expect(&SvToken::Semicolon);
        ContinuousAssign {
            lhs,
            rhs,
            span: start.merge(end),
        }
    }

    fn parse_instance_item(&mut self) -> ModuleItem {
        let start = self.peek_span();
        let (module_name, _) = self.expect_ident();
        let (instance_name, _) = self.expect_ident();
        self.expect(&SvToken::LParen);
        let connections = self.parse_port_connections();
        self.expect(&SvToken::RParen);
        let end = self.expect(&SvToken::Semicolon);
        ModuleItem::Instance(Instance {
            module_name,
            instance_name,
            connections,
            span: start.merge(end),
        })
    }

    fn parse_port_connections(&mut self) -> Vec<PortConnection> {
        let mut connections = Vec::new();
        if self.check(&SvToken::RParen) {
            return connections;
        }
        loop {
            let start = self.peek_span();
            let port_name = if self.eat(&SvToken::Dot) {
                let (name, _) = self.expect_ident();
                self.expect(&SvToken::LParen);
                Some(name)
            } else {
                None
            };
            let expr = self.parse_expr();
            let end = if port_name.is_some() {
                self.expect(&SvToken::RParen)
            } else {
                expr.span()
            };
            connections.push(PortConnection {
                port_name,
                expr,
                span: start.merge(end),
            });
            if !self.eat(&SvToken::Comma) {
                break;
            }
        }
        connections
    }

    fn parse_process(&mut self) -> Process {
        let start = self.peek_span();
        let kind = if self.eat(&SvToken::AlwaysComb) {
            ProcessKind::AlwaysComb
        } else {
            self.expect(&SvToken::AlwaysFf);
            self.expect(&SvToken::At);
            self.expect(&SvToken::LParen);
            let clock = match self.peek().clone() {
                SvToken::Posedge => {
                    self.bump();
                    let (name, _) = self.expect_ident();
                    name
                }
                SvToken::Negedge => {
                    self.error_here("'negedge' sensitivity is not supported; only 'posedge' is");
                    self.bump();
                    let (name, _) = self.expect_ident();
                    name
                }
                _ => {
                    self.error_here("expected 'posedge' in always_ff sensitivity list");
                    "<error>".to_string()
                }
            };
            self.expect(&SvToken::RParen);
            ProcessKind::AlwaysFf { clock }
        };
        let body = self.parse_statement();
        let end = body.span_of();
        Process {
            kind,
            body,
            span: start.merge(end),
        }
    }

    pub(crate) fn parse_statement(&mut self) -> Statement {
        match self.peek().clone() {
            SvToken::Begin => self.parse_block(),
            SvToken::If => self.parse_if(),
            SvToken::Case => self.parse_case(),
            SvToken::Ident(_) | SvToken::LBrace => self.parse_assign_statement(),
            _ => {
                self.error_here(format!(
                    "unexpected token {} starting a statement",
                    self.peek()
                ));
                let span = self.peek_span();
                self.resync_to_semicolon();
                Statement::Error(span)
            }
        }
    }

    fn parse_block(&mut self) -> Statement {
        let start = self.expect(&SvToken::Begin);
        let mut stmts = Vec::new();
        while !self.check(&SvToken::End) && !self.at_eof() {
            stmts.push(self.parse_statement());
        }
        let end = self.expect(&SvToken::End);
        Statement::Block(stmts, start.merge(end))
    }

    fn parse_if(&mut self) -> Statement {
        let start = self.expect(&SvToken::If);
        self.expect(&SvToken::LParen);
        let cond = self.parse_expr();
        self.expect(&SvToken::RParen);
        let then_branch = Box::new(self.parse_statement());
        let (else_branch, end) = if self.eat(&SvToken::Else) {
            let stmt = self.parse_statement();
            let span = stmt.span_of();
            (Some(Box::new(stmt)), span)
        } else {
            let span = then_branch.span_of();
            (None, span)
        };
        Statement::If {
            cond,
            then_branch,
            else_branch,
            span: start.merge(end),
        }
    }

    fn parse_case(&mut self) -> Statement {
        let start = self.expect(&SvToken::Case);
        self.expect(&SvToken::LParen);
        let selector = self.parse_expr();
        self.expect(&SvToken::RParen);

        let mut arms = Vec::new();
        let mut default = None;
        while !self.check(&SvToken::Endcase) && !self.at_eof() {
            let arm_start = self.peek_span();
            if self.eat(&SvToken::Default) {
                self.expect(&SvToken::Colon);
                let body = self.parse_statement();
                default = Some(Box::new(body));
                continue;
            }
            let mut matches = vec![self.parse_expr()];
            while self.eat(&SvToken::Comma) {
                matches.push(self.parse_expr());
            }
            self.expect(&SvToken::Colon);
            let body = self.parse_statement();
            let end = body.span_of();
            arms.push(CaseArm {
                matches,
                body,
                span: arm_start.merge(end),
            });
        }
        let end = self.expect(&SvToken::Endcase);
        Statement::Case {
            selector,
            arms,
            default,
            span: start.merge(end),
        }
    }

    fn parse_assign_statement(&mut self) -> Statement {
        let lhs = self.parse_expr();
        let start = lhs.span();
        if self.eat(&SvToken::LtEq) {
            let rhs = self.parse_expr();
            let end = self.expect(&SvToken::Semicolon);
            Statement::NonBlockingAssign {
                lhs,
                rhs,
                span: start.merge(end),
            }
        } else if self.eat(&SvToken::Assign_) {
            let rhs = self.parse_expr();
            let end = self.expect(&SvToken::Semicolon);
            Statement::BlockingAssign {
                lhs,
                rhs,
                span: start.merge(end),
            }
        } else {
            self.error_here(format!(
                "expected '=' or '<=' after assignment target, found {}",
                self.peek()
            ));
            let span = self.peek_span();
            self.resync_to_semicolon();
            Statement::Error(start.merge(span))
        }
    }
}

impl Statement {
    pub(crate) fn span_of(&self) -> Span {
        match self {
            Statement::Block(_, s) => *s,
            Statement::BlockingAssign { span, .. } => *span,
            Statement::NonBlockingAssign { span, .. } => *span,
            Statement::If { span, .. } => *span,
            Statement::Case { span, .. } => *span,
            Statement::Error(s) => *s,
        }
    }
}
