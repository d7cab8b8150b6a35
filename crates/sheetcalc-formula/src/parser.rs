//! Formula parser
//!
//! A recursive descent parser for spreadsheet formulas with proper operator
//! precedence. Function names and cell references are case-insensitive and are
//! normalized to upper case; string literals keep their case.

use crate::ast::{BinaryOperator, FormulaExpr, Function, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use sheetcalc_core::{CellAddress, CellError, CellRange};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use sheetcalc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();

    // Formula must start with '='
    let formula = formula
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if *parser.current_token() != Token::Eof {
        return Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references, upper-cased
    Identifier(String),
    CellRef(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    /// Character that starts no token
    Invalid(char),

    // End of input
    Eof,
}

/// Deepest operator or parenthesis nesting a formula may use
const MAX_NESTING: usize = 256;

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<Token>,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
            depth: 0,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.current_token = Some(self.scan_token());
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // One- or two-character operators
        match c {
            '<' => {
                self.advance();
                return match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                };
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Token::GreaterEqual;
                }
                return Token::GreaterThan;
            }
            '=' => {
                self.advance();
                // `==` is accepted as a synonym for `=`
                if self.peek_char() == Some('=') {
                    self.advance();
                }
                return Token::Equal;
            }
            '!' if self.peek_char_at(1) == Some('=') => {
                self.advance();
                self.advance();
                return Token::NotEqual;
            }
            _ => {}
        }

        // String literal
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier, cell reference, or boolean/error
        if c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '#' {
            return self.scan_identifier_or_ref();
        }

        self.advance();
        Token::Invalid(c)
    }

    fn scan_string(&mut self, quote: char) -> Token {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == quote {
                // Check for escaped quote ("")
                if self.peek_char_at(1) == Some(quote) {
                    s.push(quote);
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        // Skip closing quote
        if self.peek_char() == Some(quote) {
            self.advance();
        }

        Token::String(s)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = usize::from(
                self.peek_char_at(1)
                    .map_or(false, |c| c == '+' || c == '-'),
            );
            if self
                .peek_char_at(1 + sign)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..=sign {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        match num_str.parse::<f64>() {
            Ok(num) => Token::Number(num),
            Err(_) => Token::Invalid('.'),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        // Check for error values first (#VALUE!, #N/A, etc.)
        if self.peek_char() == Some('#') {
            let start = self.pos;
            self.advance();
            while self.peek_char().map_or(false, |c| {
                c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
            }) {
                self.advance();
            }
            let error_str = &self.input[start..self.pos];
            if let Some(err) = CellError::from_str(error_str) {
                return Token::Error(err);
            }
            // If not a valid error, treat as identifier
            return Token::Identifier(error_str.to_ascii_uppercase());
        }

        let start = self.pos;

        // Scan identifier/reference
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }

        let text = self.input[start..self.pos].to_ascii_uppercase();
        let is_call = self.peek_non_whitespace() == Some('(');

        // Booleans, unless called like a function
        if !is_call {
            match text.as_str() {
                "TRUE" => return Token::Boolean(true),
                "FALSE" => return Token::Boolean(false),
                _ => {}
            }
        }

        // Letters followed by digits is a reference, unless called (LOG10(...))
        if !is_call && Self::is_cell_reference(&text) {
            return Token::CellRef(text);
        }

        // Otherwise it's an identifier (function name or unknown name)
        Token::Identifier(text)
    }

    /// `[$]LETTERS[$]DIGITS`
    fn is_cell_reference(text: &str) -> bool {
        let rest = text.strip_prefix('$').unwrap_or(text);
        let letters = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        if letters == 0 {
            return false;
        }
        let rest = &rest[letters..];
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn peek_non_whitespace(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, ==, <>, !=, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -, +, postfix %
    // 7. Range: :
    // 8. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.enter()?;
        let expr = self.parse_comparison()?;
        self.leave(1);
        Ok(expr)
    }

    /// Each nested group or chained operator adds a level to the AST, and
    /// evaluation recurses once per level.
    fn enter(&mut self) -> FormulaResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::Evaluation(format!(
                "Formula nests deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;
        let mut levels = 0;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            self.enter()?;
            levels += 1;
            let right = self.parse_concatenation()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;
        let mut levels = 0;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            self.enter()?;
            levels += 1;
            let right = self.parse_additive()?;
            left = FormulaExpr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;
        let mut levels = 0;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            self.enter()?;
            levels += 1;
            let right = self.parse_multiplicative()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;
        let mut levels = 0;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            self.enter()?;
            levels += 1;
            let right = self.parse_exponent()?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            self.enter()?;
            let right = self.parse_exponent()?; // Right associative
            self.leave(1);
            return Ok(FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        // Prefix unary minus
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave(1);
            return Ok(FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus (no-op)
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            self.enter()?;
            let operand = self.parse_unary()?;
            self.leave(1);
            return Ok(operand);
        }

        // Parse primary, then check for postfix percent
        let mut expr = self.parse_range()?;
        let mut levels = 0;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            self.enter()?;
            levels += 1;
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        self.leave(levels);
        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Token::Colon) {
            return Ok(left);
        }
        self.consume();
        let right = self.parse_primary()?;

        match (left, right) {
            (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) => {
                Ok(FormulaExpr::RangeRef(CellRange::new(start, end)))
            }
            _ => Err(FormulaError::Parse(
                "Range operator requires two cell references".into(),
            )),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume() {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::String(s) => Ok(FormulaExpr::String(s)),
            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Token::Error(e) => Ok(FormulaExpr::Error(e)),

            Token::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::CellRef(ref_str) => Self::parse_cell_reference(&ref_str),

            Token::Identifier(name) => {
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Err(FormulaError::UnknownName(name))
                }
            }

            token => Err(FormulaError::Parse(format!("Unexpected token: {:?}", token))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        let func = Function::from_name(&name).ok_or(FormulaError::UnknownFunction(name))?;

        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function { func, args })
    }

    fn parse_cell_reference(ref_str: &str) -> FormulaResult<FormulaExpr> {
        // Absolute markers carry no meaning here
        let clean_ref = ref_str.replace('$', "");
        let address = CellAddress::parse(&clean_ref).map_err(|e| {
            FormulaError::Parse(format!("Invalid cell reference '{}': {}", ref_str, e))
        })?;

        Ok(FormulaExpr::CellRef(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_number() {
        let ast = parse_formula("=42").unwrap();
        assert_eq!(ast, FormulaExpr::Number(42.0));

        let ast = parse_formula("=3.14").unwrap();
        assert_eq!(ast, FormulaExpr::Number(3.14));

        let ast = parse_formula("=1e10").unwrap();
        assert_eq!(ast, FormulaExpr::Number(1e10));

        let ast = parse_formula("=.5").unwrap();
        assert_eq!(ast, FormulaExpr::Number(0.5));
    }

    #[test]
    fn test_parse_string_keeps_case() {
        let ast = parse_formula("=\"Hello\"").unwrap();
        assert_eq!(ast, FormulaExpr::String("Hello".into()));

        let ast = parse_formula("='single quoted'").unwrap();
        assert_eq!(ast, FormulaExpr::String("single quoted".into()));

        let ast = parse_formula("=\"Hello \"\"World\"\"\"").unwrap();
        assert_eq!(ast, FormulaExpr::String("Hello \"World\"".into()));
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_formula("=TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("=false").unwrap(), FormulaExpr::Boolean(false));
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let ast = parse_formula("=1+2*3").unwrap();
        // Should parse as 1+(2*3) due to precedence
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Add);
            assert_eq!(*left, FormulaExpr::Number(1.0));
            assert!(matches!(
                *right,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_comparison_operators() {
        for (formula, expected) in [
            ("=A1>5", BinaryOperator::GreaterThan),
            ("=A1<5", BinaryOperator::LessThan),
            ("=A1>=5", BinaryOperator::GreaterEqual),
            ("=A1<=5", BinaryOperator::LessEqual),
            ("=A1=5", BinaryOperator::Equal),
            ("=A1==5", BinaryOperator::Equal),
            ("=A1<>5", BinaryOperator::NotEqual),
            ("=A1!=5", BinaryOperator::NotEqual),
        ] {
            match parse_formula(formula).unwrap() {
                FormulaExpr::BinaryOp { op, .. } => assert_eq!(op, expected, "{}", formula),
                other => panic!("Expected BinaryOp for {}, got {:?}", formula, other),
            }
        }
    }

    #[test]
    fn test_parse_unary() {
        let ast = parse_formula("=-5").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                ..
            }
        ));

        let ast = parse_formula("=50%").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_cell_reference() {
        assert_eq!(
            parse_formula("=a1").unwrap(),
            FormulaExpr::CellRef(CellAddress::new(0, 0))
        );
        assert_eq!(
            parse_formula("=$B$2").unwrap(),
            FormulaExpr::CellRef(CellAddress::new(1, 1))
        );
    }

    #[test]
    fn test_parse_range_reference_normalizes() {
        let ast = parse_formula("=B10:A1").unwrap();
        if let FormulaExpr::RangeRef(range) = ast {
            assert_eq!(range.start, CellAddress::new(0, 0));
            assert_eq!(range.end, CellAddress::new(9, 1));
        } else {
            panic!("Expected RangeRef");
        }
    }

    #[test]
    fn test_parse_function() {
        let ast = parse_formula("=sum(A1:A10)").unwrap();
        if let FormulaExpr::Function { func, args } = ast {
            assert_eq!(func, Function::Sum);
            assert_eq!(args.len(), 1);
            assert!(matches!(&args[0], FormulaExpr::RangeRef(_)));
        } else {
            panic!("Expected Function");
        }

        let ast = parse_formula("=TODAY()").unwrap();
        assert_eq!(
            ast,
            FormulaExpr::Function {
                func: Function::Today,
                args: vec![]
            }
        );
    }

    #[test]
    fn test_parse_nested_function_commas() {
        let ast = parse_formula("=IF(LEN(CONCAT(A1,\",\",B1))>3,ROUND(A1,2),\"no\")").unwrap();
        if let FormulaExpr::Function { func, args } = ast {
            assert_eq!(func, Function::If);
            assert_eq!(args.len(), 3);
        } else {
            panic!("Expected Function");
        }
    }

    #[test]
    fn test_parse_unknown_function() {
        assert_eq!(
            parse_formula("=FOO(1)"),
            Err(FormulaError::UnknownFunction("FOO".into()))
        );
    }

    #[test]
    fn test_parse_unknown_name() {
        assert_eq!(
            parse_formula("=hello"),
            Err(FormulaError::UnknownName("HELLO".into()))
        );
    }

    #[test]
    fn test_parse_error_literal() {
        assert_eq!(
            parse_formula("=#N/A").unwrap(),
            FormulaExpr::Error(CellError::Na)
        );
        assert_eq!(
            parse_formula("=#VALUE!").unwrap(),
            FormulaExpr::Error(CellError::Value)
        );
    }

    #[test]
    fn test_parse_rejects_trailing_input() {
        assert!(matches!(parse_formula("=1+2)"), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_formula("=5 apples"), Err(_)));
        assert!(matches!(parse_formula("=1 @ 2"), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_formula("="), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_formula("=(1+2"), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn test_parse_range_requires_references() {
        assert!(matches!(
            parse_formula("=A1:5"),
            Err(FormulaError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_nesting_limit() {
        let nested = |depth: usize| format!("={}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_formula(&nested(100)).is_ok());
        assert!(matches!(
            parse_formula(&nested(20_000)),
            Err(FormulaError::Evaluation(_))
        ));

        let negated = format!("={}1", "-".repeat(20_000));
        assert!(matches!(
            parse_formula(&negated),
            Err(FormulaError::Evaluation(_))
        ));

        let powers = format!("=2{}", "^1".repeat(20_000));
        assert!(matches!(
            parse_formula(&powers),
            Err(FormulaError::Evaluation(_))
        ));

        let sum = format!("=1{}", "+1".repeat(20_000));
        assert!(matches!(
            parse_formula(&sum),
            Err(FormulaError::Evaluation(_))
        ));
        assert!(parse_formula(&format!("=1{}", "+1".repeat(100))).is_ok());
    }
}
