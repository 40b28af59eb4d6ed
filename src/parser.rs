//! # Recursive-descent parser
//!
//! Turns a token stream from [`crate::lexer`] into a [`crate::ast::SourceFile`],
//! reporting diagnostics in the three ANTLR-style message families:
//!
//! - `no viable alternative at input '<tok>'`
//! - `mismatched input '<tok>' expecting <X>`
//! - `extraneous input '<tok>' expecting {...}`
//!
//! each wrapped as `Error in file '<F>' line <L>:<C> <message>`. A single
//! parse never aborts on the first error: after reporting one, the parser
//! discards tokens up to the next member of the declaration-start set
//! (panic-mode recovery), so a file with several unrelated mistakes reports
//! several diagnostics in one pass.

use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file_name: Option<String>,
    errors: Vec<String>,
}

/// Parses `source` and returns the resulting AST plus any diagnostics,
/// regardless of whether parsing fully succeeded.
pub fn parse(source: &str, file_name: Option<String>) -> (SourceFile, Vec<String>) {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser {
        tokens,
        pos: 0,
        file_name,
        errors: Vec::new(),
    };
    let file = parser.parse_source_file();
    (file, parser.errors)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn location_prefix(&self, line: usize, column: usize) -> String {
        match &self.file_name {
            Some(name) => format!("Error in file '{name}' line {line}:{column} "),
            None => format!("Error line {line}:{column} "),
        }
    }

    fn err_no_viable_alternative(&mut self, tok: &Token) {
        let msg = format!(
            "{}no viable alternative at input '{}'",
            self.location_prefix(tok.line, tok.column),
            tok.text
        );
        self.errors.push(msg);
    }

    fn err_mismatched(&mut self, tok: &Token, expecting: &str) {
        let msg = format!(
            "{}mismatched input '{}' expecting {}",
            self.location_prefix(tok.line, tok.column),
            tok.text,
            expecting
        );
        self.errors.push(msg);
    }

    fn err_extraneous(&mut self, tok: &Token, expecting_set: &[&str]) {
        let msg = format!(
            "{}extraneous input '{}' expecting {{{}}}",
            self.location_prefix(tok.line, tok.column),
            tok.text,
            expecting_set.join(", ")
        );
        self.errors.push(msg);
    }

    /// Consumes the current token if it matches `kind`; otherwise reports a
    /// mismatched-input diagnostic and does NOT advance, letting the caller's
    /// recovery logic decide what happens next.
    fn expect(&mut self, expected: TokenKind, display: &str) -> Option<Token> {
        if std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(&expected) {
            Some(self.advance())
        } else {
            let tok = self.peek().clone();
            self.err_mismatched(&tok, display);
            None
        }
    }

    /// Skips tokens until one in the declaration-start FIRST set (or EOF) is
    /// reached, so the next top-level iteration can resume cleanly.
    fn recover_to_declaration_start(&mut self) {
        loop {
            if self.at_eof() {
                return;
            }
            if is_declaration_start(self.peek_kind()) {
                return;
            }
            self.advance();
        }
    }

    fn parse_source_file(&mut self) -> SourceFile {
        let mut declarations = Vec::new();
        loop {
            if self.at_eof() {
                break;
            }
            match self.peek_kind().clone() {
                TokenKind::Int
                | TokenKind::Uint
                | TokenKind::Long
                | TokenKind::Ulong
                | TokenKind::Double
                | TokenKind::Text
                | TokenKind::Date
                | TokenKind::Datetime
                | TokenKind::Resource
                | TokenKind::VolatileResource => {
                    if let Some(decl) = self.parse_resource_decl() {
                        declarations.push(Declaration::Resource(decl));
                    }
                }
                TokenKind::LookupTable => {
                    if let Some(decl) = self.parse_lookup_table_decl() {
                        declarations.push(Declaration::LookupTable(decl));
                    }
                }
                TokenKind::JetCompilerDirectiveKw => {
                    if let Some(decl) = self.parse_directive_decl() {
                        declarations.push(Declaration::Directive(decl));
                    }
                }
                TokenKind::Import => {
                    if let Some(decl) = self.parse_import_decl() {
                        declarations.push(Declaration::Import(decl));
                    }
                }
                TokenKind::LBracket => {
                    if let Some(rule) = self.parse_rule() {
                        declarations.push(Declaration::Rule(rule));
                    }
                }
                TokenKind::Triple => {
                    // Reserved; no production defined. Consume and move on.
                    self.advance();
                }
                _ => {
                    let tok = self.peek().clone();
                    self.err_extraneous(&tok, &TokenKind::declaration_start_set());
                    self.advance();
                    self.recover_to_declaration_start();
                    continue;
                }
            }
        }
        SourceFile { declarations }
    }

    fn parse_resource_decl(&mut self) -> Option<ResourceDecl> {
        let kind_tok = self.advance();
        let kind = resource_type_for(&kind_tok.kind)?;
        let (line, column) = (kind_tok.line, kind_tok.column);

        let id_tok = self.expect_identifier_like("Identifier")?;
        self.expect(TokenKind::Eq, "'='")?;
        let value_tok = self.parse_literal_value()?;
        self.expect(TokenKind::Semi, "';'")?;

        Some(ResourceDecl {
            kind,
            id: id_tok.text,
            value: value_tok,
            source_file_name: self.file_name.clone(),
            line,
            column,
        })
    }

    /// Accepts `lookup_table <id> = { table_name="...", key=[...],
    /// columns=[cResId=col, ...] };`
    fn parse_lookup_table_decl(&mut self) -> Option<LookupTableDecl> {
        let kw = self.advance();
        let (line, column) = (kw.line, kw.column);
        let name_tok = self.expect_identifier_like("Identifier")?;
        self.expect(TokenKind::Eq, "'='")?;
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut table = String::new();
        let mut key = Vec::new();
        let mut columns = Vec::new();

        loop {
            if matches!(self.peek_kind(), TokenKind::RBrace) {
                break;
            }
            let prop_tok = self.expect_identifier_like("Identifier")?;
            self.expect(TokenKind::Eq, "'='")?;
            match prop_tok.text.as_str() {
                "table_name" => {
                    let v = self.expect(TokenKind::StringLiteral(String::new()), "StringLiteral")?;
                    table = string_literal_value(&v);
                }
                "key" => {
                    key = self.parse_identifier_list()?;
                }
                "columns" => {
                    columns = self.parse_columns_list()?;
                }
                other => {
                    self.err_no_viable_alternative(&Token {
                        kind: prop_tok.kind.clone(),
                        text: other.to_string(),
                        line: prop_tok.line,
                        column: prop_tok.column,
                    });
                }
            }
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        self.expect(TokenKind::Semi, "';'")?;

        Some(LookupTableDecl {
            name: name_tok.text,
            table,
            key,
            columns,
            source_file_name: self.file_name.clone(),
            line,
            column,
        })
    }

    fn parse_identifier_list(&mut self) -> Option<Vec<String>> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::RBracket) {
                break;
            }
            let tok = self.expect_identifier_like("Identifier")?;
            items.push(tok.text);
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Some(items)
    }

    fn parse_columns_list(&mut self) -> Option<Vec<(String, String)>> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::RBracket) {
                break;
            }
            let res_tok = self.expect_identifier_like("Identifier")?;
            self.expect(TokenKind::Eq, "'='")?;
            let col_tok = self.expect_identifier_like("Identifier")?;
            items.push((res_tok.text, col_tok.text));
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Some(items)
    }

    fn parse_directive_decl(&mut self) -> Option<DirectiveDecl> {
        self.advance(); // '@JetCompilerDirective'
        let key_tok = self.expect_identifier_like("Identifier")?;
        self.expect(TokenKind::Eq, "'='")?;
        let value_tok = self.expect(TokenKind::StringLiteral(String::new()), "StringLiteral")?;
        self.expect(TokenKind::Semi, "';'")?;
        Some(DirectiveDecl {
            key: key_tok.text,
            value: string_literal_value(&value_tok),
        })
    }

    fn parse_import_decl(&mut self) -> Option<ImportDecl> {
        self.advance(); // 'import'
        let name_tok = self.expect(TokenKind::StringLiteral(String::new()), "StringLiteral")?;
        self.expect(TokenKind::Semi, "';'")?;
        Some(ImportDecl {
            name: string_literal_value(&name_tok),
        })
    }

    /// `[Name[, prop=val]*]: !?(s p o)[.\[filter\]] ... -> (s p o) ...;`
    fn parse_rule(&mut self) -> Option<RawRule> {
        let lb = self.advance(); // '['
        let (line, column) = (lb.line, lb.column);
        let name_tok = self.expect_identifier_like("Identifier")?;
        let mut properties = Vec::new();
        loop {
            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
                let key_tok = self.expect_identifier_like("Identifier")?;
                self.expect(TokenKind::Eq, "'='")?;
                let val_tok = self.parse_literal_value()?;
                properties.push((key_tok.text, val_tok));
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        self.expect(TokenKind::Colon, "':'")?;

        let mut antecedents = Vec::new();
        loop {
            antecedents.push(self.parse_antecedent()?);
            if matches!(self.peek_kind(), TokenKind::Arrow) {
                break;
            }
        }
        self.expect(TokenKind::Arrow, "'->'")?;

        let mut consequents = Vec::new();
        loop {
            consequents.push(self.parse_consequent()?);
            if matches!(self.peek_kind(), TokenKind::Semi) {
                break;
            }
        }
        self.expect(TokenKind::Semi, "';'")?;

        Some(RawRule {
            name: name_tok.text,
            properties,
            antecedents,
            consequents,
            source_file_name: self.file_name.clone(),
            line,
            column,
        })
    }

    fn parse_antecedent(&mut self) -> Option<RawAntecedent> {
        let is_not = if matches!(self.peek_kind(), TokenKind::Bang) {
            self.advance();
            true
        } else {
            false
        };
        let triple = self.parse_triple()?;
        let filter = if matches!(self.peek_kind(), TokenKind::Dot) {
            self.advance();
            self.expect(TokenKind::LBracket, "'['")?;
            let expr = self.parse_filter_expr()?;
            self.expect(TokenKind::RBracket, "']'")?;
            Some(expr)
        } else {
            None
        };
        Some(RawAntecedent {
            is_not,
            triple,
            filter,
        })
    }

    fn parse_consequent(&mut self) -> Option<RawConsequent> {
        let triple = self.parse_triple()?;
        Some(RawConsequent { triple })
    }

    fn parse_triple(&mut self) -> Option<RawTriple> {
        self.expect(TokenKind::LParen, "'('")?;
        let subject = self.parse_element()?;
        let predicate = self.parse_element()?;
        let object = self.parse_element()?;
        self.expect(TokenKind::RParen, "')'")?;
        Some(RawTriple {
            subject,
            predicate,
            object,
        })
    }

    fn parse_element(&mut self) -> Option<RawElement> {
        let tok = self.peek().clone();
        let elem = match &tok.kind {
            TokenKind::Variable(name) => RawElement::Var(name.clone()),
            TokenKind::Identifier(name) => RawElement::Identifier(name.clone()),
            TokenKind::IntLiteral(text) => RawElement::IntLiteral(text.clone()),
            TokenKind::FloatLiteral(text) => RawElement::FloatLiteral(text.clone()),
            TokenKind::StringLiteral(text) => RawElement::StringLiteral(text.clone()),
            TokenKind::True | TokenKind::False => RawElement::Keyword(tok.text.clone()),
            _ => {
                self.err_no_viable_alternative(&tok);
                return None;
            }
        };
        self.advance();
        Some(elem)
    }

    /// Precedence-climbing filter-expression parser:
    /// `or` -> `and` -> comparison -> additive -> multiplicative -> atom.
    fn parse_filter_expr(&mut self) -> Option<RawFilterExpr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Option<RawFilterExpr> {
        let mut lhs = self.parse_and_expr()?;
        while let TokenKind::Identifier(word) = self.peek_kind() {
            if word == "or" {
                let op = self.advance().text;
                let rhs = self.parse_and_expr()?;
                lhs = RawFilterExpr::Binary {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                };
            } else {
                break;
            }
        }
        Some(lhs)
    }

    fn parse_and_expr(&mut self) -> Option<RawFilterExpr> {
        let mut lhs = self.parse_comparison_expr()?;
        while let TokenKind::Identifier(word) = self.peek_kind() {
            if word == "and" {
                let op = self.advance().text;
                let rhs = self.parse_comparison_expr()?;
                lhs = RawFilterExpr::Binary {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                };
            } else {
                break;
            }
        }
        Some(lhs)
    }

    fn parse_comparison_expr(&mut self) -> Option<RawFilterExpr> {
        let lhs = self.parse_additive_expr()?;
        let op = match self.peek_kind() {
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Eq => "=",
            TokenKind::Ne => "!=",
            _ => return Some(lhs),
        };
        let op = op.to_string();
        self.advance();
        let rhs = self.parse_additive_expr()?;
        Some(RawFilterExpr::Binary {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive_expr(&mut self) -> Option<RawFilterExpr> {
        let mut lhs = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                _ => break,
            };
            let op = op.to_string();
            self.advance();
            let rhs = self.parse_multiplicative_expr()?;
            lhs = RawFilterExpr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Some(lhs)
    }

    fn parse_multiplicative_expr(&mut self) -> Option<RawFilterExpr> {
        let mut lhs = self.parse_filter_atom()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                _ => break,
            };
            let op = op.to_string();
            self.advance();
            let rhs = self.parse_filter_atom()?;
            lhs = RawFilterExpr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Some(lhs)
    }

    fn parse_filter_atom(&mut self) -> Option<RawFilterExpr> {
        if matches!(self.peek_kind(), TokenKind::LParen) {
            self.advance();
            let inner = self.parse_filter_expr()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Some(inner);
        }
        let elem = self.parse_element()?;
        Some(RawFilterExpr::Leaf(elem))
    }

    fn parse_literal_value(&mut self) -> Option<String> {
        let tok = self.peek().clone();
        let value = match &tok.kind {
            TokenKind::StringLiteral(v) => v.clone(),
            TokenKind::IntLiteral(v) | TokenKind::FloatLiteral(v) => v.clone(),
            TokenKind::Identifier(v) => v.clone(),
            TokenKind::True | TokenKind::False => tok.text.clone(),
            _ => {
                self.err_no_viable_alternative(&tok);
                return None;
            }
        };
        self.advance();
        Some(value)
    }

    /// Accepts any bare-word token as an identifier; used for property keys
    /// and plain ids where a narrower literal grammar would reject valid
    /// input (e.g. a lookup table column named the same as a keyword).
    fn expect_identifier_like(&mut self, display: &str) -> Option<Token> {
        if matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            Some(self.advance())
        } else {
            let tok = self.peek().clone();
            self.err_mismatched(&tok, display);
            None
        }
    }
}

fn string_literal_value(tok: &Token) -> String {
    match &tok.kind {
        TokenKind::StringLiteral(v) => v.clone(),
        _ => tok.text.clone(),
    }
}

fn resource_type_for(kind: &TokenKind) -> Option<ResourceType> {
    Some(match kind {
        TokenKind::Int => ResourceType::Int,
        TokenKind::Uint => ResourceType::Uint,
        TokenKind::Long => ResourceType::Long,
        TokenKind::Ulong => ResourceType::Ulong,
        TokenKind::Double => ResourceType::Double,
        TokenKind::Text => ResourceType::Text,
        TokenKind::Date => ResourceType::Date,
        TokenKind::Datetime => ResourceType::Datetime,
        TokenKind::Resource => ResourceType::Resource,
        TokenKind::VolatileResource => ResourceType::VolatileResource,
        _ => return None,
    })
}

fn is_declaration_start(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eof
            | TokenKind::LBracket
            | TokenKind::JetCompilerDirectiveKw
            | TokenKind::Triple
            | TokenKind::Int
            | TokenKind::Uint
            | TokenKind::Long
            | TokenKind::Ulong
            | TokenKind::Double
            | TokenKind::Text
            | TokenKind::Date
            | TokenKind::Datetime
            | TokenKind::Resource
            | TokenKind::VolatileResource
            | TokenKind::LookupTable
            | TokenKind::Comment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_resource_declaration() {
        let (file, errors) = parse("int isTrue = 1;", None);
        assert!(errors.is_empty());
        assert_eq!(file.declarations.len(), 1);
        match &file.declarations[0] {
            Declaration::Resource(r) => {
                assert_eq!(r.kind, ResourceType::Int);
                assert_eq!(r.id, "isTrue");
                assert_eq!(r.value, "1");
            }
            other => panic!("unexpected declaration: {other:?}"),
        }
    }

    #[test]
    fn parses_lookup_table_with_resource_bound_columns() {
        let src = r#"lookup_table lkup1 = {
            table_name="claims",
            key=[claimId],
            columns=[acme:claimId=claim_id, acme:claimAmt=claim_amt]
        };"#;
        let (file, errors) = parse(src, None);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        match &file.declarations[0] {
            Declaration::LookupTable(lt) => {
                assert_eq!(lt.table, "claims");
                assert_eq!(lt.key, vec!["claimId".to_string()]);
                assert_eq!(
                    lt.columns,
                    vec![
                        ("acme:claimId".to_string(), "claim_id".to_string()),
                        ("acme:claimAmt".to_string(), "claim_amt".to_string()),
                    ]
                );
            }
            other => panic!("unexpected declaration: {other:?}"),
        }
    }

    #[test]
    fn parses_rule_with_filter_and_negated_antecedent() {
        let src = "[RuleC4]: (?c1 rdf:type acme:Claim) !(?c1 acme:status \"closed\").[?c1 acme:amt > 100] -> (?c1 acme:flagged true);";
        let (file, errors) = parse(src, None);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        match &file.declarations[0] {
            Declaration::Rule(rule) => {
                assert_eq!(rule.name, "RuleC4");
                assert_eq!(rule.antecedents.len(), 2);
                assert!(rule.antecedents[1].is_not);
                assert!(rule.antecedents[1].filter.is_some());
                assert_eq!(rule.consequents.len(), 1);
            }
            other => panic!("unexpected declaration: {other:?}"),
        }
    }

    #[test]
    fn reports_extraneous_input_at_top_level() {
        let (_, errors) = parse("bad", Some("import_test2.jr".to_string()));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("extraneous input 'bad' expecting {"));
    }

    #[test]
    fn recovers_after_error_to_report_multiple_diagnostics() {
        let src = "bad\nint x = 1;\nalsoBad";
        let (file, errors) = parse(src, Some("f.jr".to_string()));
        assert_eq!(errors.len(), 2);
        assert_eq!(file.declarations.len(), 1);
    }
}
