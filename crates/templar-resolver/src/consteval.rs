//! Constant expressions in template argument position.
//!
//! Covers what shows up in practice as a non-type argument: integer and
//! boolean literals, arithmetic, comparisons, logical operators, `sizeof`
//! of a type, and names of enumerators or non-type parameters.
//!
//! ```text
//! expr     := or
//! or       := and ('||' and)*
//! and      := equality ('&&' equality)*
//! equality := relation (('==' | '!=') relation)*
//! relation := sum (('<' | '>' | '<=' | '>=') sum)*
//! sum      := product (('+' | '-') product)*
//! product  := unary (('*' | '/' | '%') unary)*
//! unary    := ('-' | '+' | '!' | '~') unary | primary
//! primary  := literal | 'true' | 'false' | '(' expr ')' | 'sizeof' '(' type ')' | name
//! ```

use templar_core::{BaseType, PrimitiveKind, ResolutionError, TypeDescriptor};
use templar_parser::{Lexer, Token, TokenKind, parse_int_literal};

use crate::context::{ResolutionContext, Scope};
use crate::type_resolver::Resolved;

/// Pointer width of the LP64 target.
const POINTER_SIZE: i128 = 8;

#[derive(Debug, Clone, Copy)]
struct Operand {
    value: i128,
    boolean: bool,
}

impl Operand {
    fn int(value: i128) -> Self {
        Self { value, boolean: false }
    }

    fn bool(value: bool) -> Self {
        Self {
            value: i128::from(value),
            boolean: true,
        }
    }
}

impl ResolutionContext<'_> {
    /// Evaluate `text` to a non-type value.
    pub fn evaluate(&self, text: &str, scope: &Scope) -> Result<TypeDescriptor, ResolutionError> {
        let unresolvable = || ResolutionError::UnresolvableArgument { token: text.to_string() };
        let tokens = Lexer::tokenize(text).map_err(|_| unresolvable())?;
        let mut evaluator = Evaluator {
            ctx: self,
            scope,
            text,
            tokens,
            pos: 0,
        };
        let result = evaluator.expr()?;
        if !evaluator.at(TokenKind::Eof) {
            return Err(unresolvable());
        }
        if result.boolean {
            return Ok(TypeDescriptor::value(PrimitiveKind::Bool, result.value));
        }
        self.literal_type(result.value)
    }
}

struct Evaluator<'a, 'e> {
    ctx: &'a ResolutionContext<'e>,
    scope: &'a Scope,
    text: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Evaluator<'a, '_> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + offset)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_punct(&self, lexeme: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Punct && t.lexeme == lexeme)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error(&self) -> ResolutionError {
        ResolutionError::UnresolvableArgument {
            token: self.text.to_string(),
        }
    }

    fn expr(&mut self) -> Result<Operand, ResolutionError> {
        self.or()
    }

    fn or(&mut self) -> Result<Operand, ResolutionError> {
        let mut lhs = self.and()?;
        while self.at_punct("|") && self.peek_at(1).is_some_and(|t| t.lexeme == "|") {
            self.pos += 2;
            let rhs = self.and()?;
            lhs = Operand::bool(lhs.value != 0 || rhs.value != 0);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Operand, ResolutionError> {
        let mut lhs = self.equality()?;
        while self.at(TokenKind::AmpAmp) {
            self.advance();
            let rhs = self.equality()?;
            lhs = Operand::bool(lhs.value != 0 && rhs.value != 0);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Operand, ResolutionError> {
        let mut lhs = self.relation()?;
        loop {
            let negate = if self.at(TokenKind::Equal) && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Equal) {
                false
            } else if self.at_punct("!") && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Equal) {
                true
            } else {
                return Ok(lhs);
            };
            self.pos += 2;
            let rhs = self.relation()?;
            lhs = Operand::bool((lhs.value == rhs.value) != negate);
        }
    }

    fn relation(&mut self) -> Result<Operand, ResolutionError> {
        let mut lhs = self.sum()?;
        loop {
            let less = if self.at(TokenKind::Less) {
                true
            } else if self.at(TokenKind::Greater) {
                false
            } else {
                return Ok(lhs);
            };
            self.advance();
            let or_equal = self.at(TokenKind::Equal);
            if or_equal {
                self.advance();
            }
            let rhs = self.sum()?;
            lhs = Operand::bool(match (less, or_equal) {
                (true, false) => lhs.value < rhs.value,
                (true, true) => lhs.value <= rhs.value,
                (false, false) => lhs.value > rhs.value,
                (false, true) => lhs.value >= rhs.value,
            });
        }
    }

    fn sum(&mut self) -> Result<Operand, ResolutionError> {
        let mut lhs = self.product()?;
        loop {
            let subtract = if self.at_punct("+") {
                false
            } else if self.at_punct("-") {
                true
            } else {
                return Ok(lhs);
            };
            self.advance();
            let rhs = self.product()?;
            let value = if subtract {
                lhs.value.checked_sub(rhs.value)
            } else {
                lhs.value.checked_add(rhs.value)
            };
            lhs = Operand::int(value.ok_or_else(|| self.error())?);
        }
    }

    fn product(&mut self) -> Result<Operand, ResolutionError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.at(TokenKind::Star) {
                '*'
            } else if self.at_punct("/") {
                '/'
            } else if self.at_punct("%") {
                '%'
            } else {
                return Ok(lhs);
            };
            self.advance();
            let rhs = self.unary()?;
            let value = match op {
                '*' => lhs.value.checked_mul(rhs.value),
                '/' => lhs.value.checked_div(rhs.value),
                _ => lhs.value.checked_rem(rhs.value),
            };
            lhs = Operand::int(value.ok_or_else(|| self.error())?);
        }
    }

    fn unary(&mut self) -> Result<Operand, ResolutionError> {
        if self.at_punct("-") {
            self.advance();
            let operand = self.unary()?;
            return Ok(Operand::int(operand.value.checked_neg().ok_or_else(|| self.error())?));
        }
        if self.at_punct("+") {
            self.advance();
            return self.unary().map(|o| Operand::int(o.value));
        }
        if self.at_punct("!") {
            self.advance();
            return self.unary().map(|o| Operand::bool(o.value == 0));
        }
        if self.at_punct("~") {
            self.advance();
            return self.unary().map(|o| Operand::int(!o.value));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Operand, ResolutionError> {
        let Some(token) = self.peek().copied() else {
            return Err(self.error());
        };
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                parse_int_literal(token.lexeme).map(Operand::int).ok_or_else(|| self.error())
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                if !self.at(TokenKind::RParen) {
                    return Err(self.error());
                }
                self.advance();
                Ok(inner)
            }
            TokenKind::Identifier if token.lexeme == "true" || token.lexeme == "false" => {
                self.advance();
                Ok(Operand::bool(token.lexeme == "true"))
            }
            TokenKind::Identifier if token.lexeme == "sizeof" => {
                self.advance();
                self.size_of()
            }
            TokenKind::Identifier | TokenKind::ColonColon => self.name(),
            _ => Err(self.error()),
        }
    }

    /// `sizeof(type)`; the type text is handed to the type parser.
    fn size_of(&mut self) -> Result<Operand, ResolutionError> {
        if !self.at(TokenKind::LParen) {
            return Err(self.error());
        }
        self.advance();
        let start = self.peek().map(|t| t.offset as usize).ok_or_else(|| self.error())?;
        let mut depth = 0usize;
        loop {
            let Some(token) = self.peek() else {
                return Err(self.error());
            };
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen if depth == 0 => break,
                TokenKind::RParen => depth -= 1,
                TokenKind::Eof => return Err(self.error()),
                _ => {}
            }
            self.advance();
        }
        let end = self.peek().map(|t| t.offset as usize).ok_or_else(|| self.error())?;
        self.advance();
        let spelled = self.text.get(start..end).ok_or_else(|| self.error())?;
        let ty = templar_parser::parse_type(spelled).map_err(|_| self.error())?;
        let resolved = self.ctx.resolve_type(&ty, self.scope)?;
        byte_size(&resolved).map(Operand::int).ok_or_else(|| self.error())
    }

    /// A possibly qualified name of an enumerator or non-type parameter.
    fn name(&mut self) -> Result<Operand, ResolutionError> {
        let start = self.peek().map(|t| t.offset as usize).ok_or_else(|| self.error())?;
        let mut end = start;
        loop {
            match self.peek() {
                Some(token) if matches!(token.kind, TokenKind::Identifier | TokenKind::ColonColon) => {
                    end = token.offset as usize + token.lexeme.len();
                    self.advance();
                }
                _ => break,
            }
        }
        let spelled = self.text.get(start..end).ok_or_else(|| self.error())?;
        let ty = templar_parser::parse_type(spelled).map_err(|_| self.error())?;
        let Some(path) = ty.path() else {
            return Err(self.error());
        };
        match self.ctx.resolve_path(path, self.scope) {
            Ok(Resolved::Value(value)) => match value.as_value() {
                Some(v) if v.kind == PrimitiveKind::Bool => Ok(Operand::bool(v.value != 0)),
                Some(v) => Ok(Operand::int(v.value)),
                None => Err(self.error()),
            },
            _ => Err(self.error()),
        }
    }
}

fn byte_size(ty: &TypeDescriptor) -> Option<i128> {
    if ty.is_reference() {
        return byte_size(&ty.strip_reference());
    }
    if ty.is_pointer() {
        return Some(POINTER_SIZE);
    }
    match &ty.base {
        BaseType::Primitive(PrimitiveKind::Void) => None,
        BaseType::Primitive(kind) => Some(i128::from(kind.bits() / 8)),
        BaseType::Enum(_) => Some(4),
        BaseType::Nullptr => Some(POINTER_SIZE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::engine_with;

    fn eval(source: &str, text: &str) -> Result<TypeDescriptor, ResolutionError> {
        let engine = engine_with(source);
        let ctx = engine.context();
        ctx.evaluate(text, &Scope::global())
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval("", "2 + 3 * 4").unwrap(), TypeDescriptor::value(PrimitiveKind::Int, 14));
        assert_eq!(eval("", "(2 + 3) * 4 % 7").unwrap(), TypeDescriptor::value(PrimitiveKind::Int, 6));
        assert_eq!(eval("", "-5 + 1").unwrap().as_value().map(|v| v.value), Some(-4));
    }

    #[test]
    fn comparisons_produce_booleans() {
        let out = eval("", "3 >= 2 && !(1 == 2)").unwrap();
        assert_eq!(out, TypeDescriptor::value(PrimitiveKind::Bool, 1));
    }

    #[test]
    fn sizeof_of_builtins_and_pointers() {
        assert_eq!(eval("", "sizeof(int)").unwrap().as_value().map(|v| v.value), Some(4));
        assert_eq!(eval("", "sizeof(char*) * 2").unwrap().as_value().map(|v| v.value), Some(16));
    }

    #[test]
    fn enumerators_by_name() {
        let out = eval("namespace ns { enum Color { Red, Green = 5 }; }", "ns::Green + 1").unwrap();
        assert_eq!(out.as_value().map(|v| v.value), Some(6));
    }

    #[test]
    fn division_by_zero_is_unresolvable() {
        assert!(matches!(
            eval("", "1 / 0"),
            Err(ResolutionError::UnresolvableArgument { .. })
        ));
    }
}
