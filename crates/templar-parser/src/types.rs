//! Type spellings: builtin word combinations, qualified paths with argument
//! lists, cv-qualifiers, pointers, references, packs and function types.

use templar_core::{
    ParseError, PathSegment, PrimitiveKind, Qualifiers, RefKind, TemplateArgName, TypeHead, TypeName, TypePath,
};

use crate::lexer::TokenKind;
use crate::parser::{Parser, parse_int_literal};

/// Words that may precede a type without changing it.
const ELABORATIONS: &[&str] = &["typename", "struct", "class", "union", "enum"];

/// Words that start an expression rather than a type in argument position.
const EXPRESSION_WORDS: &[&str] = &["decltype", "sizeof", "alignof", "noexcept"];

impl<'src> Parser<'src> {
    /// Parse a type. Function types (`double(int)`) are accepted only when
    /// `allow_function` is set; function pointers are always accepted.
    pub fn parse_type(&mut self, allow_function: bool) -> Result<TypeName, ParseError> {
        self.parse_type_declarator(allow_function).map(|(ty, _)| ty)
    }

    /// Parse a type, returning the declarator name embedded in a function
    /// pointer spelling such as `double (*fp)(int)`.
    pub fn parse_type_declarator(&mut self, allow_function: bool) -> Result<(TypeName, Option<&'src str>), ParseError> {
        let mut cv = self.parse_cv();
        while ELABORATIONS.iter().any(|w| self.check_word(w)) {
            self.advance();
            cv |= self.parse_cv();
        }
        let head = self.parse_type_head(&mut cv)?;
        cv |= self.parse_cv();

        let mut ty = TypeName::new(head);
        ty.cv = cv;
        self.parse_pointer_levels(&mut ty);

        let mut declarator = None;
        if self.check(TokenKind::LParen) && self.peek_nth(1).is(TokenKind::Star) {
            self.advance();
            let mut pointers = Vec::new();
            while self.eat(TokenKind::Star) {
                pointers.push(self.parse_cv());
            }
            if self.check(TokenKind::Identifier) {
                declarator = Some(self.advance().lexeme);
            }
            self.expect(TokenKind::RParen)?;
            let (params, variadic) = self.parse_function_type_params()?;
            let mut func = TypeName::new(TypeHead::Function {
                ret: Box::new(ty),
                params,
                variadic,
            });
            func.pointers = pointers;
            ty = func;
        } else if allow_function && self.check(TokenKind::LParen) {
            let (params, variadic) = self.parse_function_type_params()?;
            ty = TypeName::new(TypeHead::Function {
                ret: Box::new(ty),
                params,
                variadic,
            });
        }

        if self.eat(TokenKind::AmpAmp) {
            ty.reference = RefKind::RValue;
        } else if self.eat(TokenKind::Amp) {
            ty.reference = RefKind::LValue;
        }
        if self.eat(TokenKind::Ellipsis) {
            ty.pack_expansion = true;
        }
        Ok((ty, declarator))
    }

    pub(crate) fn parse_cv(&mut self) -> Qualifiers {
        let mut cv = Qualifiers::empty();
        loop {
            if self.eat_word("const") {
                cv |= Qualifiers::CONST;
            } else if self.eat_word("volatile") {
                cv |= Qualifiers::VOLATILE;
            } else {
                return cv;
            }
        }
    }

    fn parse_pointer_levels(&mut self, ty: &mut TypeName) {
        while self.eat(TokenKind::Star) {
            let quals = self.parse_cv();
            ty.pointers.push(quals);
        }
    }

    fn parse_type_head(&mut self, cv: &mut Qualifiers) -> Result<TypeHead, ParseError> {
        let token = self.peek();
        if token.kind == TokenKind::Identifier && PrimitiveKind::is_builtin_word(token.lexeme) {
            let mut words = Vec::new();
            loop {
                let next = self.peek();
                if next.kind == TokenKind::Identifier && PrimitiveKind::is_builtin_word(next.lexeme) {
                    words.push(self.advance().lexeme);
                } else if next.is_word("const") || next.is_word("volatile") {
                    *cv |= self.parse_cv();
                } else {
                    break;
                }
            }
            return PrimitiveKind::from_words(words.iter().copied())
                .map(TypeHead::Builtin)
                .ok_or_else(|| ParseError::InvalidType {
                    spelling: words.join(" "),
                    span: token.span,
                });
        }
        if self.eat_word("auto") {
            return Ok(TypeHead::Auto);
        }
        if self.check_word("decltype") {
            self.advance();
            if self.check(TokenKind::LParen) {
                self.skip_group()?;
            }
            return Ok(TypeHead::Auto);
        }
        self.parse_type_path().map(TypeHead::Path)
    }

    /// `::`? `name<args>?` (`::` `template`? `name<args>?`)*
    pub fn parse_type_path(&mut self) -> Result<TypePath, ParseError> {
        let global = self.eat(TokenKind::ColonColon);
        let mut segments = Vec::new();
        loop {
            self.eat_word("template");
            let name = self.expect_identifier().map_err(|_| self.unexpected("type name"))?;
            let args = if self.check(TokenKind::Less) {
                Some(self.parse_template_arg_list()?)
            } else {
                None
            };
            segments.push(PathSegment {
                name: name.to_string(),
                args,
            });
            if self.check(TokenKind::ColonColon) && self.peek_nth(1).is(TokenKind::Identifier) {
                self.advance();
            } else {
                return Ok(TypePath { global, segments });
            }
        }
    }

    /// `<` arg (`,` arg)* `>`
    pub fn parse_template_arg_list(&mut self) -> Result<Vec<TemplateArgName>, ParseError> {
        self.expect(TokenKind::Less)?;
        let mut args = Vec::new();
        if self.eat(TokenKind::Greater) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_template_arg(TokenKind::Greater)?);
            if self.eat(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::Greater)?;
            return Ok(args);
        }
    }

    /// One template argument, ending before `,` or `close`. Anything that is
    /// neither a literal nor a type is kept as expression text.
    pub(crate) fn parse_template_arg(&mut self, close: TokenKind) -> Result<TemplateArgName, ParseError> {
        let ends_here = |p: &Parser<'_>, offset: usize| {
            let kind = p.peek_nth(offset).kind;
            kind == TokenKind::Comma || kind == close
        };

        let token = self.peek();
        match token.kind {
            TokenKind::IntLiteral if ends_here(self, 1) => {
                self.advance();
                return parse_int_literal(token.lexeme)
                    .map(TemplateArgName::Int)
                    .ok_or_else(|| ParseError::InvalidNumber {
                        text: token.lexeme.to_string(),
                        span: token.span,
                    });
            }
            TokenKind::Punct if token.lexeme == "-" && self.peek_nth(1).is(TokenKind::IntLiteral) && ends_here(self, 2) => {
                self.advance();
                let literal = self.advance();
                return parse_int_literal(literal.lexeme)
                    .map(|v| TemplateArgName::Int(-v))
                    .ok_or_else(|| ParseError::InvalidNumber {
                        text: literal.lexeme.to_string(),
                        span: literal.span,
                    });
            }
            TokenKind::Identifier if (token.lexeme == "true" || token.lexeme == "false") && ends_here(self, 1) => {
                self.advance();
                return Ok(TemplateArgName::Bool(token.lexeme == "true"));
            }
            _ => {}
        }

        let start = self.position();
        if !EXPRESSION_WORDS.iter().any(|w| token.is_word(w)) {
            if let Ok(ty) = self.parse_type(true) {
                if ends_here(self, 0) {
                    return Ok(TemplateArgName::Type(ty));
                }
            }
        }
        self.rewind(start);
        let text = self.skip_until(|kind| kind == TokenKind::Comma || kind == close)?;
        if text.is_empty() {
            return Err(self.unexpected("template argument"));
        }
        Ok(TemplateArgName::Expr(text.to_string()))
    }

    /// Parameter types of a function type; names and defaults are dropped.
    fn parse_function_type_params(&mut self) -> Result<(Vec<TypeName>, bool), ParseError> {
        let (params, variadic) = self.parse_param_list()?;
        Ok((params.into_iter().map(|p| p.ty).collect(), variadic))
    }
}
