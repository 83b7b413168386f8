//! Numeric literal scanning for the lexer

use super::Lexer;
use super::tokens::TokenKind;
use crate::diagnostics::SyntaxError;

impl<'a> Lexer<'a> {
    /// Scan a numeric literal starting at the current position (a digit, or `.` followed by a digit).
    pub(super) fn scan_number(&mut self, start: usize) -> Result<(), SyntaxError> {
        if self.peek() == Some('0') {
            let radix = match self.peek_next() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.advance();
                return self.scan_radix_number(start, radix);
            }
        }

        self.consume_digits(10);
        if self.peek() == Some('n') {
            let digits = self.source[start..self.current_pos].replace('_', "");
            self.advance();
            self.push_token(TokenKind::BigInt(digits), start);
            return Ok(());
        }
        if self.peek() == Some('.') {
            self.advance();
            self.consume_digits(10);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_ok = match self.peek_next() {
                Some(d) if d.is_ascii_digit() => true,
                Some('+' | '-') => self.rest()[2..].starts_with(|d: char| d.is_ascii_digit()),
                _ => false,
            };
            if exponent_ok {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                self.consume_digits(10);
            }
        }

        let text = self.source[start..self.current_pos].replace('_', "");
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number literal '{}'", text), start))?;

        if self.peek().is_some_and(super::is_ident_start) {
            self.advance();
            return Err(self.error("Identifier starts immediately after numeric literal", start));
        }

        self.push_token(TokenKind::Number(value), start);
        Ok(())
    }

    fn scan_radix_number(&mut self, start: usize, radix: u32) -> Result<(), SyntaxError> {
        let digits_start = self.current_pos;
        self.consume_digits(radix);
        let digits = self.source[digits_start..self.current_pos].replace('_', "");
        if digits.is_empty() {
            return Err(self.error("Missing digits after radix prefix", start));
        }
        if self.match_char('n') {
            let literal = self.source[start..self.current_pos - 1].to_string();
            self.push_token(TokenKind::BigInt(literal), start);
            return Ok(());
        }
        let value = digits
            .chars()
            .filter_map(|d| d.to_digit(radix))
            .fold(0f64, |acc, d| acc * f64::from(radix) + f64::from(d));
        self.push_token(TokenKind::Number(value), start);
        Ok(())
    }

    fn consume_digits(&mut self, radix: u32) {
        while let Some(c) = self.peek() {
            if c.is_digit(radix) || (c == '_' && self.peek_next().is_some_and(|d| d.is_digit(radix))) {
                self.advance();
            } else {
                break;
            }
        }
    }
}
