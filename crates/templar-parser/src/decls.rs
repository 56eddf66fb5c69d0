//! Declaration grammar.
//!
//! Covers the declaration subset the engine needs from a header: namespaces,
//! using-directives, aliases and typedefs, classes with bases and members,
//! enums, function and constructor declarations, template headers, partial
//! and full specializations, and explicit instantiation directives.
//! Definitions are kept as opaque body text. Everything outside the subset
//! that can be skipped without losing a declaration (static assertions,
//! friends, destructors, out-of-class definitions) is skipped.

use std::sync::Arc;

use templar_core::decl::{
    Access, AliasDecl, BaseSpec, BodyRef, ClassDecl, ClassTraits, Constraint, DeclKind, Declaration, EnumDecl,
    Enumerator, FunctionDecl, FunctionParam, FunctionRole, ParamKind, ParameterSpec, SourceItem, TemplateHeader,
    UsingDecl, VariableDecl,
};
use templar_core::{ParseError, PrimitiveKind, Qualifiers, RefKind, TemplateArgName, TypeHead, TypeName, TypePath};

use crate::lexer::TokenKind;
use crate::parser::{Parser, parse_int_literal};

const SEQUENCE_ATTRIBUTE: &str = "templar::sequence";
const CALLABLE_ATTRIBUTE: &str = "templar::callable";

/// Recorded declaration specifiers.
#[derive(Default)]
struct Specifiers {
    is_static: bool,
    is_explicit: bool,
}

impl<'src> Parser<'src> {
    /// Parse items until EOF, or until the closing `}` of a block when
    /// `in_block` is set.
    pub fn parse_items(&mut self, in_block: bool) -> Result<Vec<SourceItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.is_eof() {
                if in_block {
                    return Err(self.unexpected("'}'"));
                }
                return Ok(items);
            }
            if in_block && self.eat(TokenKind::RBrace) {
                return Ok(items);
            }
            self.parse_item(&mut items)?;
        }
    }

    fn parse_item(&mut self, items: &mut Vec<SourceItem>) -> Result<(), ParseError> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        let attributes = self.parse_attributes()?;
        let token = self.peek();
        match token.lexeme {
            "namespace" if token.kind == TokenKind::Identifier => self.parse_namespace(items),
            "using" if token.kind == TokenKind::Identifier => {
                self.advance();
                if self.eat_word("namespace") {
                    let path = self.parse_type_path()?;
                    self.expect(TokenKind::Semicolon)?;
                    items.push(SourceItem::UsingDirective(path.segments.into_iter().map(|s| s.name).collect()));
                } else if self.check(TokenKind::Identifier) && self.peek_nth(1).is(TokenKind::Equal) {
                    let decl = self.parse_alias_body(None)?;
                    items.push(SourceItem::Declaration(decl));
                } else {
                    // namespace-scope using-declaration
                    self.skip_declaration()?;
                }
                Ok(())
            }
            "template" if token.kind == TokenKind::Identifier => {
                self.advance();
                if !self.check(TokenKind::Less) {
                    if let Some(item) = self.parse_explicit_instantiation(false)? {
                        items.push(item);
                    }
                    return Ok(());
                }
                let header = self.parse_template_header()?;
                let decls = self.parse_templated(header, None, Access::Public, &attributes)?;
                items.extend(decls.into_iter().map(SourceItem::Declaration));
                Ok(())
            }
            "extern" if token.kind == TokenKind::Identifier => {
                self.advance();
                if self.eat_word("template") {
                    if let Some(item) = self.parse_explicit_instantiation(true)? {
                        items.push(item);
                    }
                } else if self.eat(TokenKind::StringLiteral) {
                    if self.eat(TokenKind::LBrace) {
                        items.extend(self.parse_items(true)?);
                    } else {
                        self.parse_item(items)?;
                    }
                } else {
                    let decls = self.parse_member(None, Access::Public, &attributes)?;
                    items.extend(decls.into_iter().map(SourceItem::Declaration));
                }
                Ok(())
            }
            _ => {
                let decls = self.parse_member(None, Access::Public, &attributes)?;
                items.extend(decls.into_iter().map(SourceItem::Declaration));
                Ok(())
            }
        }
    }

    fn parse_namespace(&mut self, items: &mut Vec<SourceItem>) -> Result<(), ParseError> {
        self.expect_word("namespace")?;
        self.eat_word("inline");
        let mut names = Vec::new();
        while self.check(TokenKind::Identifier) {
            names.push(self.advance().lexeme.to_string());
            if !self.eat(TokenKind::ColonColon) {
                break;
            }
            self.eat_word("inline");
        }
        if self.eat(TokenKind::Equal) {
            // namespace alias
            self.skip_declaration()?;
            return Ok(());
        }
        self.parse_attributes()?;
        self.expect(TokenKind::LBrace)?;
        let mut inner = self.parse_items(true)?;
        if names.is_empty() {
            items.append(&mut inner);
            return Ok(());
        }
        for name in names.into_iter().rev() {
            inner = vec![SourceItem::Namespace { name, items: inner }];
        }
        items.append(&mut inner);
        Ok(())
    }

    /// `template` (`extern` already consumed) followed by something other
    /// than `<`. Only class instantiations are recorded.
    fn parse_explicit_instantiation(&mut self, is_extern: bool) -> Result<Option<SourceItem>, ParseError> {
        if ["class", "struct", "union"].iter().any(|w| self.check_word(w)) {
            self.advance();
            let path = self.parse_type_path()?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(Some(SourceItem::ExplicitInstantiation {
                target: TypeName::new(TypeHead::Path(path)),
                is_extern,
            }));
        }
        self.skip_declaration()?;
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Template headers
    // ------------------------------------------------------------------

    /// `<` params `>`; an empty list is a full specialization header.
    pub fn parse_template_header(&mut self) -> Result<TemplateHeader, ParseError> {
        self.expect(TokenKind::Less)?;
        let mut params = Vec::new();
        let mut constraints = Vec::new();
        if !self.eat(TokenKind::Greater) {
            loop {
                let (param, constraint) = self.parse_template_param()?;
                params.push(param);
                constraints.extend(constraint);
                if self.eat(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::Greater)?;
                break;
            }
        }
        let mut header = TemplateHeader::new(params);
        header.constraints = constraints;
        Ok(header)
    }

    fn parse_template_param(&mut self) -> Result<(ParameterSpec, Option<Constraint>), ParseError> {
        if self.check_word("template") {
            self.advance();
            self.parse_template_header()?;
            if !self.eat_word("class") {
                self.expect_word("typename")?;
            }
            let pack = self.eat(TokenKind::Ellipsis);
            let name = self.eat_param_name();
            let kind = wrap_pack(ParamKind::Template, pack);
            let mut param = ParameterSpec::new(name, kind);
            if self.eat(TokenKind::Equal) {
                param.default = Some(TemplateArgName::Type(self.parse_type(false)?));
            }
            return Ok((param, None));
        }

        if (self.check_word("typename") || self.check_word("class"))
            && !self.peek_nth(1).is(TokenKind::ColonColon)
            && !(self.peek_nth(1).is(TokenKind::Identifier) && self.peek_nth(2).is(TokenKind::ColonColon))
        {
            self.advance();
            let pack = self.eat(TokenKind::Ellipsis);
            let name = self.eat_param_name();
            let mut param = ParameterSpec::new(name.clone(), wrap_pack(ParamKind::Type, pack));
            let mut constraint = None;
            if self.eat(TokenKind::Equal) {
                let default = self.parse_template_arg(TokenKind::Greater)?;
                constraint = constraint_from_default(&default);
                param.default = Some(match constraint {
                    Some(_) => TemplateArgName::Type(TypeName::builtin(PrimitiveKind::Void)),
                    None => default,
                });
            }
            return Ok((param, constraint));
        }

        // non-type parameter
        let ty = self.parse_type(false)?;
        let pack = ty.pack_expansion || self.eat(TokenKind::Ellipsis);
        let mut element = ty;
        element.pack_expansion = false;
        let name = self.eat_param_name();
        let constraint = enable_if_condition(&element).and_then(|condition| constraint_from_condition(&condition));
        let mut param = ParameterSpec::new(name, wrap_pack(ParamKind::NonType(element), pack));
        if self.eat(TokenKind::Equal) {
            let default = self.parse_template_arg(TokenKind::Greater)?;
            param.default = Some(match constraint {
                Some(_) => TemplateArgName::Int(0),
                None => default,
            });
        }
        if constraint.is_some() {
            if let ParamKind::NonType(_) = param.kind {
                param.kind = ParamKind::NonType(TypeName::builtin(PrimitiveKind::Int));
            }
        }
        Ok((param, constraint))
    }

    fn eat_param_name(&mut self) -> String {
        if self.check(TokenKind::Identifier) {
            self.advance().lexeme.to_string()
        } else {
            String::new()
        }
    }

    /// Everything that may follow a `template<...>` header.
    fn parse_templated(
        &mut self,
        header: TemplateHeader,
        class_name: Option<&str>,
        access: Access,
        attributes: &[String],
    ) -> Result<Vec<Declaration>, ParseError> {
        // nested header: out-of-class member template definition
        if self.check_word("template") {
            self.skip_declaration()?;
            return Ok(Vec::new());
        }
        if self.check_word("friend") {
            self.skip_declaration()?;
            return Ok(Vec::new());
        }
        if self.check_word("using") {
            self.advance();
            return Ok(vec![self.parse_alias_body(Some(header))?]);
        }
        let mut decls = self.parse_member_with(Some(header), class_name, access, attributes)?;
        for decl in &mut decls {
            decl.access = access;
        }
        Ok(decls)
    }

    /// `Name = type ;` after `using`.
    fn parse_alias_body(&mut self, header: Option<TemplateHeader>) -> Result<Declaration, ParseError> {
        let name = self.expect_identifier()?;
        self.parse_attributes()?;
        self.expect(TokenKind::Equal)?;
        let target = self.parse_type(true)?;
        self.expect(TokenKind::Semicolon)?;
        let mut decl = Declaration::new(name, DeclKind::Alias(AliasDecl { target }));
        decl.template = header;
        Ok(decl)
    }

    // ------------------------------------------------------------------
    // Classes and enums
    // ------------------------------------------------------------------

    fn parse_class(
        &mut self,
        header: Option<TemplateHeader>,
        attributes: &[String],
    ) -> Result<(Option<Declaration>, Option<&'src str>), ParseError> {
        let keyword = self.advance().lexeme;
        let mut attrs = attributes.to_vec();
        attrs.extend(self.parse_attributes()?);

        let name = if self.check(TokenKind::Identifier) && !self.check_word("final") {
            Some(self.advance().lexeme)
        } else {
            None
        };
        let specialization = if name.is_some() && self.check(TokenKind::Less) {
            Some(self.parse_template_arg_list()?)
        } else {
            None
        };
        self.eat_word("final");

        let mut class = ClassDecl {
            is_struct: keyword != "class",
            ..ClassDecl::default()
        };
        for attr in &attrs {
            match attr.as_str() {
                SEQUENCE_ATTRIBUTE => class.traits |= ClassTraits::SEQUENCE,
                CALLABLE_ATTRIBUTE => class.traits |= ClassTraits::CALLABLE,
                _ => {}
            }
        }

        if self.eat(TokenKind::Colon) {
            loop {
                let mut access = if class.is_struct { Access::Public } else { Access::Private };
                loop {
                    if self.eat_word("virtual") {
                        continue;
                    }
                    match parse_access(self.peek().lexeme) {
                        Some(a) if self.check(TokenKind::Identifier) => {
                            self.advance();
                            access = a;
                        }
                        _ => break,
                    }
                }
                let ty = self.parse_type(false)?;
                class.bases.push(BaseSpec { ty, access });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let mut body = BodyRef::default();
        if self.check(TokenKind::LBrace) {
            let start = self.position();
            self.advance();
            let own_name = name.unwrap_or("");
            let default_access = if class.is_struct { Access::Public } else { Access::Private };
            self.parse_class_body(&mut class, own_name, default_access)?;
            body = BodyRef::text(self.text_between(start + 1, self.position() - 1));
            class.complete = true;
        }

        let Some(name) = name else {
            return Ok(((class.complete).then(|| Declaration::new("", DeclKind::Class(class))), None));
        };
        let mut decl = Declaration::new(name, DeclKind::Class(class));
        decl.template = header;
        decl.specialization = specialization;
        decl.body = body;
        Ok((Some(decl), Some(name)))
    }

    fn parse_class_body(&mut self, class: &mut ClassDecl, class_name: &str, mut access: Access) -> Result<(), ParseError> {
        loop {
            if self.eat(TokenKind::RBrace) {
                return Ok(());
            }
            if self.is_eof() {
                return Err(self.unexpected("'}'"));
            }
            if self.eat(TokenKind::Semicolon) {
                continue;
            }
            if let Some(a) = parse_access(self.peek().lexeme) {
                if self.check(TokenKind::Identifier) && self.peek_nth(1).is(TokenKind::Colon) {
                    self.advance();
                    self.advance();
                    access = a;
                    continue;
                }
            }
            let attributes = self.parse_attributes()?;
            let token = self.peek();

            if token.is_word("using") {
                self.advance();
                if self.check(TokenKind::Identifier) && self.peek_nth(1).is(TokenKind::Equal) {
                    let mut decl = self.parse_alias_body(None)?;
                    decl.access = access;
                    class.members.push(Arc::new(decl));
                } else {
                    self.eat_word("typename");
                    let path = self.parse_type_path()?;
                    self.expect(TokenKind::Semicolon)?;
                    let mut segments = path.segments;
                    let Some(member) = segments.pop() else {
                        continue;
                    };
                    if !segments.is_empty() {
                        let base = TypeName::new(TypeHead::Path(TypePath {
                            global: path.global,
                            segments,
                        }));
                        class.usings.push(UsingDecl {
                            base,
                            member: member.name,
                        });
                    }
                }
                continue;
            }

            if token.is_word("template") {
                self.advance();
                let header = self.parse_template_header()?;
                for decl in self.parse_templated(header, Some(class_name), access, &attributes)? {
                    class.members.push(Arc::new(decl));
                }
                continue;
            }

            if token.is_word("friend") || token.is_word("static_assert") {
                self.skip_declaration()?;
                continue;
            }

            for mut decl in self.parse_member(Some(class_name), access, &attributes)? {
                decl.access = access;
                class.members.push(Arc::new(decl));
            }
        }
    }

    fn parse_enum(&mut self) -> Result<(Option<Declaration>, Option<&'src str>), ParseError> {
        self.expect_word("enum")?;
        let scoped = self.eat_word("class") || self.eat_word("struct");
        self.parse_attributes()?;
        let name = if self.check(TokenKind::Identifier) {
            Some(self.advance().lexeme)
        } else {
            None
        };
        let underlying = if self.eat(TokenKind::Colon) {
            Some(self.parse_type(false)?)
        } else {
            None
        };
        let mut decl = EnumDecl {
            scoped,
            underlying,
            enumerators: Vec::new(),
        };
        if self.eat(TokenKind::LBrace) {
            let mut next = 0i128;
            while !self.eat(TokenKind::RBrace) {
                let token = self.expect(TokenKind::Identifier)?;
                let mut value = next;
                if self.eat(TokenKind::Equal) {
                    let text = self.skip_until(|k| k == TokenKind::Comma || k == TokenKind::RBrace)?;
                    value = evaluate_enumerator(text, &decl.enumerators).ok_or_else(|| ParseError::InvalidNumber {
                        text: text.to_string(),
                        span: token.span,
                    })?;
                }
                decl.enumerators.push(Enumerator {
                    name: token.lexeme.to_string(),
                    value,
                });
                next = value + 1;
                if !self.eat(TokenKind::Comma) {
                    self.expect(TokenKind::RBrace)?;
                    break;
                }
            }
        }
        let Some(name) = name else {
            return Ok((None, None));
        };
        Ok((Some(Declaration::new(name, DeclKind::Enum(decl))), Some(name)))
    }

    // ------------------------------------------------------------------
    // Members, functions and variables
    // ------------------------------------------------------------------

    /// One declaration statement at namespace or class scope.
    fn parse_member(
        &mut self,
        class_name: Option<&str>,
        access: Access,
        attributes: &[String],
    ) -> Result<Vec<Declaration>, ParseError> {
        self.parse_member_with(None, class_name, access, attributes)
    }

    fn parse_member_with(
        &mut self,
        header: Option<TemplateHeader>,
        class_name: Option<&str>,
        access: Access,
        attributes: &[String],
    ) -> Result<Vec<Declaration>, ParseError> {
        if self.check_word("static_assert") || self.check_word("friend") {
            self.skip_declaration()?;
            return Ok(Vec::new());
        }
        if self.check_word("typedef") {
            if header.is_some() {
                self.skip_declaration()?;
                return Ok(Vec::new());
            }
            return self.parse_typedef();
        }

        let specifiers = self.parse_specifiers();
        let token = self.peek();

        if ["struct", "class", "union"].iter().any(|w| token.is_word(w)) && self.is_type_definition() {
            let (decl, _) = self.parse_class(header, attributes)?;
            // `struct X {...} x;` declarators are not tracked
            self.skip_declaration()?;
            return Ok(decl.filter(|d| !d.name.is_empty()).into_iter().collect());
        }
        if token.is_word("enum") && self.is_type_definition() {
            let (decl, _) = self.parse_enum()?;
            self.skip_declaration()?;
            return Ok(decl.into_iter().collect());
        }

        // destructor
        if token.is(TokenKind::Punct) && token.lexeme == "~" {
            self.skip_declaration()?;
            return Ok(Vec::new());
        }

        // constructor
        if let Some(class) = class_name {
            if token.is_word(class) && self.peek_nth(1).is(TokenKind::LParen) {
                self.advance();
                let mut func = FunctionDecl::new(FunctionRole::Constructor, None, Vec::new());
                func.is_explicit = specifiers.is_explicit;
                return self.parse_function_rest(class.to_string(), header, None, func, access);
            }
        }

        // conversion operator
        if token.is_word("operator") {
            self.advance();
            let ty = self.parse_type(false)?;
            let name = format!("operator {ty}");
            let role = member_role(class_name, &specifiers);
            let func = FunctionDecl::new(role, Some(ty), Vec::new());
            return self.parse_function_rest(name, header, None, func, access);
        }

        let (ty, declarator) = self.parse_type_declarator(false)?;
        if let Some(name) = declarator {
            // function pointer variable
            self.skip_declaration()?;
            return Ok(vec![variable(name, ty, specifiers.is_static || class_name.is_none())]);
        }

        if self.eat_word("operator") {
            let name = self.parse_operator_name()?;
            let role = member_role(class_name, &specifiers);
            let func = FunctionDecl::new(role, Some(ty), Vec::new());
            return self.parse_function_rest(name, header, None, func, access);
        }

        if self.check(TokenKind::LParen) {
            // qualified constructor definition such as `A::A() {}`
            self.skip_declaration()?;
            return Ok(Vec::new());
        }
        let path = self.parse_type_path()?;
        if path.segments.len() > 1 {
            // out-of-class definition of something declared elsewhere
            self.skip_declaration()?;
            return Ok(Vec::new());
        }
        let Some(segment) = path.segments.into_iter().next() else {
            return Err(self.unexpected("declarator"));
        };

        if self.check(TokenKind::LParen) {
            let role = member_role(class_name, &specifiers);
            let func = FunctionDecl::new(role, Some(ty), Vec::new());
            return self.parse_function_rest(segment.name, header, segment.args, func, access);
        }

        if header.is_some() {
            // variable template
            self.skip_declaration()?;
            return Ok(Vec::new());
        }

        let is_static = specifiers.is_static || class_name.is_none();
        let mut decls = vec![variable(&segment.name, ty.clone(), is_static)];
        loop {
            self.skip_until(|k| k == TokenKind::Comma || k == TokenKind::Semicolon)?;
            if self.eat(TokenKind::Semicolon) || self.is_eof() {
                return Ok(decls);
            }
            self.expect(TokenKind::Comma)?;
            let mut next = ty.clone();
            next.pointers.clear();
            next.reference = RefKind::None;
            while self.eat(TokenKind::Star) {
                next.pointers.push(self.parse_cv());
            }
            if self.eat(TokenKind::AmpAmp) {
                next.reference = RefKind::RValue;
            } else if self.eat(TokenKind::Amp) {
                next.reference = RefKind::LValue;
            }
            let name = self.expect_identifier()?;
            decls.push(variable(name, next, is_static));
        }
    }

    /// Whether the `struct`/`class`/`enum` at the cursor starts a definition
    /// or forward declaration rather than an elaborated type specifier.
    fn is_type_definition(&self) -> bool {
        let mut offset = 1;
        while self.peek_nth(offset).is(TokenKind::Identifier)
            && ["class", "struct"].contains(&self.peek_nth(offset).lexeme)
        {
            offset += 1;
        }
        if self.peek_nth(offset).is(TokenKind::LBracket) {
            return true;
        }
        if self.peek_nth(offset).is(TokenKind::Identifier) {
            offset += 1;
        }
        if self.peek_nth(offset).is(TokenKind::Less) {
            let mut depth = 0usize;
            loop {
                let token = self.peek_nth(offset);
                match token.kind {
                    TokenKind::Less => depth += 1,
                    TokenKind::Greater => {
                        depth -= 1;
                        if depth == 0 {
                            offset += 1;
                            break;
                        }
                    }
                    TokenKind::Eof | TokenKind::Semicolon => return false,
                    _ => {}
                }
                offset += 1;
            }
        }
        if self.peek_nth(offset).is_word("final") {
            offset += 1;
        }
        matches!(
            self.peek_nth(offset).kind,
            TokenKind::LBrace | TokenKind::Colon | TokenKind::Semicolon
        )
    }

    fn parse_specifiers(&mut self) -> Specifiers {
        let mut specifiers = Specifiers::default();
        loop {
            let token = self.peek();
            match token.lexeme {
                "static" if token.kind == TokenKind::Identifier => specifiers.is_static = true,
                "explicit" if token.kind == TokenKind::Identifier => specifiers.is_explicit = true,
                "inline" | "constexpr" | "consteval" | "virtual" | "extern" | "mutable" | "thread_local"
                    if token.kind == TokenKind::Identifier => {}
                _ => {
                    if token.is(TokenKind::LBracket) && self.peek_nth(1).is(TokenKind::LBracket) {
                        let _ = self.parse_attributes();
                        continue;
                    }
                    return specifiers;
                }
            }
            self.advance();
        }
    }

    /// The symbol after `operator`: `()`, `[]`, or a run of punctuation.
    fn parse_operator_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::from("operator");
        if self.check(TokenKind::LParen) && self.peek_nth(1).is(TokenKind::RParen) {
            self.advance();
            self.advance();
            name.push_str("()");
            return Ok(name);
        }
        let start = name.len();
        while !self.check(TokenKind::LParen) && !self.is_eof() {
            let token = self.advance();
            if token.kind == TokenKind::Identifier && name.len() > start {
                name.push(' ');
            }
            name.push_str(token.lexeme);
        }
        if name.len() == start {
            return Err(self.unexpected("operator symbol"));
        }
        Ok(name)
    }

    /// `(` params `)` suffixes (`;` | body), after the name.
    fn parse_function_rest(
        &mut self,
        name: String,
        header: Option<TemplateHeader>,
        specialization: Option<Vec<TemplateArgName>>,
        mut func: FunctionDecl,
        access: Access,
    ) -> Result<Vec<Declaration>, ParseError> {
        let (params, variadic) = self.parse_param_list()?;
        func.params = params;
        func.variadic = variadic;

        let mut deleted = false;
        loop {
            let token = self.peek();
            if token.is_word("const") {
                func.is_const = true;
                self.advance();
            } else if ["volatile", "override", "final"].iter().any(|w| token.is_word(w))
                || token.is(TokenKind::Amp)
                || token.is(TokenKind::AmpAmp)
            {
                self.advance();
            } else if token.is_word("noexcept") || token.is_word("throw") {
                self.advance();
                if self.check(TokenKind::LParen) {
                    self.skip_group()?;
                }
            } else if token.is(TokenKind::Arrow) {
                self.advance();
                func.ret = Some(self.parse_type(false)?);
            } else if token.is(TokenKind::LBracket) && self.peek_nth(1).is(TokenKind::LBracket) {
                self.parse_attributes()?;
            } else {
                break;
            }
        }

        let mut body = BodyRef::default();
        if self.eat(TokenKind::Equal) {
            let token = self.advance();
            match token.lexeme {
                "delete" => deleted = true,
                "default" => body = BodyRef::text(""),
                _ => {}
            }
            self.expect(TokenKind::Semicolon)?;
        } else if !self.eat(TokenKind::Semicolon) {
            if self.eat(TokenKind::Colon) {
                loop {
                    self.skip_until(|k| k == TokenKind::LParen || k == TokenKind::LBrace)?;
                    self.skip_group()?;
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            if !self.check(TokenKind::LBrace) {
                return Err(self.unexpected("function body or ';'"));
            }
            body = BodyRef::text(self.skip_group()?);
        }
        if deleted {
            return Ok(Vec::new());
        }

        let mut header = header;
        if let Some(ret) = &func.ret {
            if let Some((condition, result)) = split_enable_if_return(ret) {
                if let (Some(header), Some(constraint)) = (header.as_mut(), constraint_from_condition(&condition)) {
                    header.constraints.push(constraint);
                    func.ret = Some(result);
                }
            }
        }

        let mut decl = Declaration::new(name, DeclKind::Function(func));
        decl.template = header;
        decl.specialization = specialization;
        decl.body = body;
        decl.access = access;
        Ok(vec![decl])
    }

    /// `(` (param (`,` param)* (`,` `...`)?)? `)`
    pub(crate) fn parse_param_list(&mut self) -> Result<(Vec<FunctionParam>, bool), ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        if self.check_word("void") && self.peek_nth(1).is(TokenKind::RParen) {
            self.advance();
        }
        while !self.eat(TokenKind::RParen) {
            if self.eat(TokenKind::Ellipsis) {
                variadic = true;
                self.expect(TokenKind::RParen)?;
                break;
            }
            self.parse_attributes()?;
            let (mut ty, declarator) = self.parse_type_declarator(false)?;
            let mut param_name = declarator.map(str::to_string);
            if self.check(TokenKind::Identifier) {
                param_name = Some(self.advance().lexeme.to_string());
            }
            while self.check(TokenKind::LBracket) {
                // arrays decay to pointers
                self.skip_group()?;
                ty.pointers.push(Qualifiers::empty());
            }
            let mut param = FunctionParam::new(ty);
            param.name = param_name;
            if self.eat(TokenKind::Equal) {
                self.skip_until(|k| k == TokenKind::Comma || k == TokenKind::RParen)?;
                param.has_default = true;
            }
            params.push(param);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen)?;
                break;
            }
        }
        Ok((params, variadic))
    }

    fn parse_typedef(&mut self) -> Result<Vec<Declaration>, ParseError> {
        self.expect_word("typedef")?;
        let mut decls = Vec::new();
        let token = self.peek();
        let ty = if ["struct", "class", "union"].iter().any(|w| token.is_word(w)) && self.is_type_definition() {
            let (class, tag) = self.parse_class(None, &[])?;
            match (class, tag) {
                (Some(class), Some(tag)) => {
                    decls.push(class);
                    TypeName::simple(tag)
                }
                (Some(mut anonymous), None) => {
                    // `typedef struct {...} Name;` names the class itself
                    let name = self.expect_identifier()?;
                    anonymous.name = name.to_string();
                    self.expect(TokenKind::Semicolon)?;
                    decls.push(anonymous);
                    return Ok(decls);
                }
                (None, _) => return Err(self.unexpected("class definition")),
            }
        } else if token.is_word("enum") && self.is_type_definition() {
            let (decl, tag) = self.parse_enum()?;
            match (decl, tag) {
                (Some(decl), Some(tag)) => {
                    decls.push(decl);
                    TypeName::simple(tag)
                }
                _ => {
                    self.skip_declaration()?;
                    return Ok(decls);
                }
            }
        } else {
            let (ty, declarator) = self.parse_type_declarator(false)?;
            if let Some(name) = declarator {
                self.expect(TokenKind::Semicolon)?;
                decls.push(alias(name, ty));
                return Ok(decls);
            }
            ty
        };

        loop {
            let mut target = ty.clone();
            while self.eat(TokenKind::Star) {
                target.pointers.push(self.parse_cv());
            }
            if self.eat(TokenKind::Amp) {
                target.reference = RefKind::LValue;
            }
            let name = self.expect_identifier()?;
            decls.push(alias(name, target));
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::Semicolon)?;
                return Ok(decls);
            }
        }
    }

    /// Skip to the end of the current declaration: a `;`, or a braced body
    /// (with any constructor initializer groups before it).
    pub(crate) fn skip_declaration(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_until(|k| k == TokenKind::Semicolon || k == TokenKind::LBrace)?;
            if self.eat(TokenKind::Semicolon) || self.is_eof() {
                return Ok(());
            }
            self.skip_group()?;
            if self.eat(TokenKind::Semicolon) {
                return Ok(());
            }
            if !self.check(TokenKind::Comma) && !self.check(TokenKind::LBrace) {
                return Ok(());
            }
        }
    }
}

fn wrap_pack(kind: ParamKind, pack: bool) -> ParamKind {
    if pack { ParamKind::Pack(Box::new(kind)) } else { kind }
}

fn parse_access(word: &str) -> Option<Access> {
    match word {
        "public" => Some(Access::Public),
        "protected" => Some(Access::Protected),
        "private" => Some(Access::Private),
        _ => None,
    }
}

fn member_role(class_name: Option<&str>, specifiers: &Specifiers) -> FunctionRole {
    match (class_name, specifiers.is_static) {
        (None, _) => FunctionRole::Free,
        (Some(_), true) => FunctionRole::Static,
        (Some(_), false) => FunctionRole::Method,
    }
}

fn variable(name: &str, ty: TypeName, is_static: bool) -> Declaration {
    Declaration::new(name, DeclKind::Variable(VariableDecl { ty, is_static }))
}

fn alias(name: &str, target: TypeName) -> Declaration {
    Declaration::new(name, DeclKind::Alias(AliasDecl { target }))
}

/// The condition argument of `enable_if_t<cond, ...>` or
/// `enable_if<cond, ...>::type`.
fn enable_if_condition(ty: &TypeName) -> Option<TemplateArgName> {
    split_enable_if(ty).map(|(condition, _)| condition)
}

fn split_enable_if(ty: &TypeName) -> Option<(TemplateArgName, Option<TemplateArgName>)> {
    let path = ty.path()?;
    let segment = path
        .segments
        .iter()
        .find(|s| s.name == "enable_if_t" || s.name == "enable_if")?;
    let args = segment.args.as_ref()?;
    let condition = args.first()?.clone();
    Some((condition, args.get(1).cloned()))
}

/// An `enable_if` return type, split into its condition and result type.
fn split_enable_if_return(ret: &TypeName) -> Option<(TemplateArgName, TypeName)> {
    let (condition, result) = split_enable_if(ret)?;
    let mut result = match result {
        Some(TemplateArgName::Type(ty)) => ty,
        None => TypeName::builtin(PrimitiveKind::Void),
        Some(_) => return None,
    };
    result.cv |= ret.cv;
    result.reference = ret.reference;
    result.pointers.extend(ret.pointers.iter().copied());
    Some((condition, result))
}

fn constraint_from_default(default: &TemplateArgName) -> Option<Constraint> {
    match default {
        TemplateArgName::Type(ty) => {
            if let Some(condition) = enable_if_condition(ty) {
                return constraint_from_condition(&condition);
            }
            // void_t<decltype(&T::member)>
            let path = ty.path()?;
            let segment = path.segments.iter().find(|s| s.name == "void_t")?;
            match segment.args.as_ref()?.first()? {
                TemplateArgName::Expr(text) => has_member_probe(text),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `decltype(&T::member)` or `decltype(T::member)`.
fn has_member_probe(text: &str) -> Option<Constraint> {
    let inner = text.trim().strip_prefix("decltype")?.trim();
    let inner = inner.strip_prefix('(')?.strip_suffix(')')?.trim();
    let inner = inner.trim_start_matches('&').trim();
    let (param, member) = inner.split_once("::")?;
    let (param, member) = (param.trim(), member.trim());
    let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    (valid(param) && valid(member)).then(|| Constraint::HasMember {
        param: param.to_string(),
        member: member.to_string(),
    })
}

/// `std::is_integral_v<T>`, `std::is_integral<T>::value`, and the
/// floating-point equivalents.
fn constraint_from_condition(condition: &TemplateArgName) -> Option<Constraint> {
    let TemplateArgName::Type(ty) = condition else {
        return None;
    };
    let path = ty.path()?;
    path.segments.iter().find_map(|segment| {
        let param = match segment.args.as_deref() {
            Some([TemplateArgName::Type(arg)]) => arg.as_identifier()?.to_string(),
            _ => return None,
        };
        match segment.name.as_str() {
            "is_integral" | "is_integral_v" => Some(Constraint::Integral(param)),
            "is_floating_point" | "is_floating_point_v" => Some(Constraint::Floating(param)),
            _ => None,
        }
    })
}

/// Enumerator initializers: literals, negated literals, or earlier names.
fn evaluate_enumerator(text: &str, earlier: &[Enumerator]) -> Option<i128> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('-') {
        return evaluate_enumerator(rest, earlier).map(|v| -v);
    }
    if let Some(value) = parse_int_literal(text) {
        return Some(value);
    }
    if text.starts_with('\'') && text.ends_with('\'') && text.chars().count() == 3 {
        return text.chars().nth(1).map(|c| c as i128);
    }
    earlier.iter().find(|e| e.name == text).map(|e| e.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<SourceItem> {
        let mut parser = Parser::new(source).unwrap_or_else(|e| panic!("{e}"));
        parser.parse_items(false).unwrap_or_else(|e| panic!("{e}"))
    }

    fn single_decl(source: &str) -> Declaration {
        match parse(source).into_iter().next() {
            Some(SourceItem::Declaration(decl)) => decl,
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn namespaces_nest() {
        let items = parse("namespace a::b { int f(); } namespace { int g(); }");
        match &items[0] {
            SourceItem::Namespace { name, items } => {
                assert_eq!(name, "a");
                assert!(matches!(&items[0], SourceItem::Namespace { name, .. } if name == "b"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&items[1], SourceItem::Declaration(d) if d.name == "g"));
    }

    #[test]
    fn function_template_with_defaulted_parameter() {
        let decl = single_decl("template<typename T, typename R = int> R get_size(const T& t) { return sizeof(T); }");
        let header = decl.template.clone().unwrap_or_default();
        assert_eq!(header.len(), 2);
        assert!(header.params[1].default.is_some());
        let func = decl.as_function().cloned().unwrap_or_else(|| panic!("function"));
        assert_eq!(func.params[0].ty.reference, RefKind::LValue);
        assert_eq!(decl.body.0.as_deref(), Some("return sizeof(T);"));
    }

    #[test]
    fn variadic_forwarding_parameters() {
        let decl = single_decl("template<typename... Args> void forward(Args&&... args);");
        let header = decl.template.clone().unwrap_or_default();
        assert!(header.is_variadic());
        let func = decl.as_function().cloned().unwrap_or_else(|| panic!("function"));
        assert_eq!(func.pack_param(), Some(0));
        assert_eq!(func.params[0].ty.reference, RefKind::RValue);
    }

    #[test]
    fn class_members_and_usings() {
        let decl = single_decl(
            "class Derived : public Base<int> {
             public:
                using Base<int>::callme;
                using value_type = double;
                Derived(int x) : m_x(x), m_y{2} {}
                explicit Derived(double);
                ~Derived();
                int callme(int) const;
                static int s_count;
                template<class T> T get3() { return T(3); }
                bool operator==(const Derived&) const = default;
                void gone() = delete;
             private:
                int m_x, *m_y;
             };",
        );
        let class = decl.as_class().cloned().unwrap_or_else(|| panic!("class"));
        assert!(!class.is_struct);
        assert_eq!(class.bases[0].access, Access::Public);
        assert_eq!(class.usings[0].member, "callme");
        assert_eq!(class.constructors().count(), 2);
        assert!(class.constructors().any(|c| c.as_function().is_some_and(|f| f.is_explicit)));
        assert!(class.declares("value_type"));
        assert!(class.declares("s_count"));
        assert!(class.declares("get3"));
        assert!(class.declares("operator=="));
        assert!(!class.declares("gone"));
        let fields: Vec<_> = class.members_named("m_y").collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].access, Access::Private);
    }

    #[test]
    fn operator_names() {
        let decl = single_decl(
            "struct S { template<class T> int operator()(T); int operator[](int); S operator+(const S&); operator bool() const; };",
        );
        let class = decl.as_class().cloned().unwrap_or_else(|| panic!("class"));
        assert!(class.declares("operator()"));
        assert!(class.declares("operator[]"));
        assert!(class.declares("operator+"));
        assert!(class.declares("operator bool"));
    }

    #[test]
    fn partial_and_full_specializations() {
        let items = parse(
            "template<typename T, typename U> struct S {};
             template<typename T> struct S<T, int> {};
             template<> struct S<int, int> {};",
        );
        let decls: Vec<_> = items
            .into_iter()
            .filter_map(|i| match i {
                SourceItem::Declaration(d) => Some(d),
                _ => None,
            })
            .collect();
        assert!(decls[0].is_template());
        assert!(decls[1].is_specialization());
        assert_eq!(decls[1].specialization.as_ref().map(Vec::len), Some(2));
        assert!(decls[2].is_specialization());
        assert!(decls[2].template.as_ref().is_some_and(TemplateHeader::is_empty));
    }

    #[test]
    fn enable_if_becomes_constraint() {
        let decl = single_decl(
            "template<typename T, std::enable_if_t<std::is_integral<T>::value, int> = 0> void only_ints(T);",
        );
        let header = decl.template.clone().unwrap_or_default();
        assert_eq!(header.constraints, vec![Constraint::Integral("T".into())]);
        assert_eq!(header.params[1].default, Some(TemplateArgName::Int(0)));

        let decl = single_decl("template<class T> std::enable_if_t<std::is_floating_point_v<T>, T> half(T);");
        let header = decl.template.clone().unwrap_or_default();
        assert_eq!(header.constraints, vec![Constraint::Floating("T".into())]);
        assert_eq!(decl.as_function().and_then(|f| f.ret.clone()), Some(TypeName::simple("T")));

        let decl = single_decl("template<class T, class = std::void_t<decltype(&T::var1)>> bool has_var1(T);");
        let header = decl.template.clone().unwrap_or_default();
        assert_eq!(
            header.constraints,
            vec![Constraint::HasMember { param: "T".into(), member: "var1".into() }]
        );
    }

    #[test]
    fn typedefs_and_aliases() {
        let items = parse(
            "typedef unsigned long size_t;
             typedef double (*fptr)(int);
             typedef struct { int x; } anon_t;
             template<class T> using vec_t = std::vector<T>;",
        );
        let names: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                SourceItem::Declaration(d) => Some((d.name.clone(), d.kind_name())),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("size_t".to_string(), "alias"),
                ("fptr".to_string(), "alias"),
                ("anon_t".to_string(), "class"),
                ("vec_t".to_string(), "alias"),
            ]
        );
    }

    #[test]
    fn enums_with_values() {
        let decl = single_decl("enum class Color : int { Red, Green = 5, Blue, Alias = Red };");
        let DeclKind::Enum(e) = &decl.kind else { panic!("enum") };
        assert!(e.scoped);
        let values: Vec<_> = e.enumerators.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0, 5, 6, 0]);
    }

    #[test]
    fn explicit_instantiations() {
        let items = parse("template class A<int>; extern template struct B<double>; template void f<int>(int);");
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], SourceItem::ExplicitInstantiation { is_extern: true, .. }));
    }

    #[test]
    fn skipped_constructs() {
        let items = parse(
            "static_assert(sizeof(int) == 4, \"int\");
             int A::counter = 0;
             void A::f() { }
             A::A() : x(1), y{2} { }
             extern \"C\" { int c_func(int); }
             int later();",
        );
        let names: Vec<_> = items
            .iter()
            .filter_map(|i| match i {
                SourceItem::Declaration(d) => Some(d.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["c_func", "later"]);
    }

    #[test]
    fn sequence_attribute_sets_traits() {
        let decl = single_decl("template<class T> class [[templar::sequence]] vector { public: vector(); };");
        let class = decl.as_class().cloned().unwrap_or_else(|| panic!("class"));
        assert!(class.traits.contains(ClassTraits::SEQUENCE));
    }

    #[test]
    fn c_variadic_and_defaults() {
        let decl = single_decl("int printf_like(const char* fmt, int flags = 0, ...);");
        let func = decl.as_function().cloned().unwrap_or_else(|| panic!("function"));
        assert!(func.variadic);
        assert!(func.params[1].has_default);
        assert_eq!(func.required_params(), 1);
    }
}
