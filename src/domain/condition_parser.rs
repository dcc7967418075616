//! Condition DSL parser.
//!
//! Recursive descent parser turning strategy text into typed [`Condition`]s
//! with positioned error messages. Grammar, case-insensitive:
//!
//! ```text
//! conditions := condition (';' condition)*
//! condition  := operand comparison operand ['by' number '%'] ['delay' integer]
//! comparison := crosses_above | crosses_below | above | below | equals
//!             | '>' | '<' | '>=' | '<=' | '=='
//! operand    := number | open|high|low|close|volume | indicator
//! indicator  := name '(' int[,args] ')' ['.' field]
//! ```
//!
//! Unknown indicator or field names fail here, at parse time. Nothing is
//! deferred to evaluation; a condition that parses always resolves.

use crate::domain::condition::{
    Comparison, Condition, IndicatorField, IndicatorRef, PriceField, SeriesRef,
};
use crate::domain::error::ParseError;
use crate::domain::indicator::IndicatorType;

/// Parse a `;`-separated list of conditions.
pub fn parse_conditions(input: &str) -> Result<Vec<Condition>, ParseError> {
    let mut parser = Parser::new(input);
    let mut out = Vec::new();

    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Ok(out);
    }

    loop {
        out.push(parser.parse_condition()?);
        parser.skip_whitespace();
        match parser.peek() {
            Some(';') => {
                parser.advance();
            }
            Some(ch) => {
                return Err(ParseError {
                    message: format!("expected ';' or end of input, found '{}'", ch),
                    position: parser.pos,
                });
            }
            None => break,
        }
    }

    Ok(out)
}

/// Parse a single condition.
pub fn parse_condition(input: &str) -> Result<Condition, ParseError> {
    let mut parser = Parser::new(input);
    let cond = parser.parse_condition()?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(ParseError {
            message: format!("unexpected trailing input '{}'", ch),
            position: parser.pos,
        });
    }
    Ok(cond)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek_word(&self) -> String {
        let mut word = String::new();
        for ch in self.remaining().chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
            } else {
                break;
            }
        }
        word
    }

    fn consume_word(&mut self) -> String {
        let word = self.peek_word();
        self.pos += word.len();
        word
    }

    /// Consume `keyword` if the next word matches it case-insensitively.
    fn consume_keyword(&mut self, keyword: &str) -> bool {
        let word = self.peek_word();
        if word.eq_ignore_ascii_case(keyword) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let source = self.parse_operand()?;
        let comparison = self.parse_comparison()?;
        let target = self.parse_operand()?;

        let mut threshold_pct = None;
        let mut delay_bars = 0;

        self.skip_whitespace();
        if self.consume_keyword("by") {
            let pct = self.parse_number()?;
            self.expect_char('%')?;
            threshold_pct = Some(pct);
            self.skip_whitespace();
        }
        if self.consume_keyword("delay") {
            delay_bars = self.parse_integer()?;
        }

        Ok(Condition {
            source,
            comparison,
            target,
            threshold_pct,
            delay_bars,
        })
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseError> {
        self.skip_whitespace();
        let start = self.pos;

        // operator forms first; '>=' and '<=' before their prefixes
        for (op, cmp) in [
            (">=", Comparison::AboveOrEqual),
            ("<=", Comparison::BelowOrEqual),
            ("==", Comparison::Equals),
            (">", Comparison::Above),
            ("<", Comparison::Below),
        ] {
            if self.remaining().starts_with(op) {
                self.pos += op.len();
                return Ok(cmp);
            }
        }

        let word = self.peek_word();
        let cmp = match word.to_ascii_lowercase().as_str() {
            "crosses_above" => Comparison::CrossesAbove,
            "crosses_below" => Comparison::CrossesBelow,
            "above" => Comparison::Above,
            "below" => Comparison::Below,
            "equals" => Comparison::Equals,
            _ => {
                return Err(ParseError {
                    message: format!(
                        "expected comparison (above, below, equals, >=, <=, \
                         crosses_above, crosses_below), found '{}'",
                        if word.is_empty() {
                            self.peek().map(|c| c.to_string()).unwrap_or_default()
                        } else {
                            word
                        }
                    ),
                    position: start,
                });
            }
        };
        self.pos += word.len();
        Ok(cmp)
    }

    fn parse_operand(&mut self) -> Result<SeriesRef, ParseError> {
        self.skip_whitespace();

        if let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '-' || ch == '.' {
                return Ok(SeriesRef::Constant(self.parse_number()?));
            }
        }

        let start = self.pos;
        let word = self.consume_word();
        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseError {
                message: "expected operand (number, price field, or indicator)".to_string(),
                position: start,
            }),
            "open" => Ok(SeriesRef::Price(PriceField::Open)),
            "high" => Ok(SeriesRef::Price(PriceField::High)),
            "low" => Ok(SeriesRef::Price(PriceField::Low)),
            "close" => Ok(SeriesRef::Price(PriceField::Close)),
            "volume" => Ok(SeriesRef::Price(PriceField::Volume)),
            name => self.parse_indicator(name, start),
        }
    }

    fn parse_indicator(&mut self, name: &str, start: usize) -> Result<SeriesRef, ParseError> {
        self.expect_char('(')?;

        let indicator_type = match name {
            "sma" => IndicatorType::Sma(self.parse_integer()?),
            "ema" => IndicatorType::Ema(self.parse_integer()?),
            "wma" => IndicatorType::Wma(self.parse_integer()?),
            "hma" => IndicatorType::Hma(self.parse_integer()?),
            "rsi" => IndicatorType::Rsi(self.parse_integer()?),
            "atr" => IndicatorType::Atr(self.parse_integer()?),
            "macd" => {
                let fast = self.parse_integer()?;
                self.expect_char(',')?;
                let slow = self.parse_integer()?;
                self.expect_char(',')?;
                let signal = self.parse_integer()?;
                IndicatorType::Macd { fast, slow, signal }
            }
            "bollinger" | "bb" => {
                let period = self.parse_integer()?;
                self.expect_char(',')?;
                let mult = self.parse_number()?;
                IndicatorType::Bollinger {
                    period,
                    mult_x100: (mult * 100.0).round() as u32,
                }
            }
            "keltner" | "kc" => {
                let period = self.parse_integer()?;
                self.expect_char(',')?;
                let mult = self.parse_number()?;
                IndicatorType::Keltner {
                    period,
                    mult_x100: (mult * 100.0).round() as u32,
                }
            }
            "stoch_rsi" => {
                let rsi_period = self.parse_integer()?;
                self.expect_char(',')?;
                let stoch_period = self.parse_integer()?;
                self.expect_char(',')?;
                let k_smooth = self.parse_integer()?;
                self.expect_char(',')?;
                let d_smooth = self.parse_integer()?;
                IndicatorType::StochRsi {
                    rsi_period,
                    stoch_period,
                    k_smooth,
                    d_smooth,
                }
            }
            "rsi_bb" => {
                let rsi_period = self.parse_integer()?;
                self.expect_char(',')?;
                let bb_period = self.parse_integer()?;
                self.expect_char(',')?;
                let mult = self.parse_number()?;
                IndicatorType::RsiBollinger {
                    rsi_period,
                    bb_period,
                    mult_x100: (mult * 100.0).round() as u32,
                }
            }
            _ => {
                return Err(ParseError {
                    message: format!("unknown indicator '{}'", name),
                    position: start,
                });
            }
        };

        self.expect_char(')')?;

        let field = self.parse_field(&indicator_type)?;
        Ok(SeriesRef::Indicator(IndicatorRef {
            indicator_type,
            field,
        }))
    }

    fn parse_field(&mut self, indicator_type: &IndicatorType) -> Result<IndicatorField, ParseError> {
        let default = default_field(indicator_type);
        if self.peek() != Some('.') {
            return Ok(default);
        }
        self.advance();

        let start = self.pos;
        let word = self.consume_word().to_ascii_lowercase();
        let field = match word.as_str() {
            "line" => IndicatorField::MacdLine,
            "signal" => IndicatorField::MacdSignal,
            "histogram" => IndicatorField::MacdHistogram,
            "k" => IndicatorField::StochK,
            "d" => IndicatorField::StochD,
            "upper" => IndicatorField::Upper,
            "middle" => IndicatorField::Middle,
            "lower" => IndicatorField::Lower,
            _ => {
                return Err(ParseError {
                    message: format!("unknown indicator field '{}'", word),
                    position: start,
                });
            }
        };

        if !field_matches(indicator_type, field) {
            return Err(ParseError {
                message: format!("field '{}' not provided by {}", word, indicator_type),
                position: start,
            });
        }
        Ok(field)
    }
}

fn default_field(indicator_type: &IndicatorType) -> IndicatorField {
    match indicator_type {
        IndicatorType::Macd { .. } => IndicatorField::MacdLine,
        IndicatorType::StochRsi { .. } => IndicatorField::StochK,
        IndicatorType::Bollinger { .. }
        | IndicatorType::Keltner { .. }
        | IndicatorType::RsiBollinger { .. } => IndicatorField::Middle,
        _ => IndicatorField::Value,
    }
}

fn field_matches(indicator_type: &IndicatorType, field: IndicatorField) -> bool {
    match indicator_type {
        IndicatorType::Macd { .. } => matches!(
            field,
            IndicatorField::MacdLine | IndicatorField::MacdSignal | IndicatorField::MacdHistogram
        ),
        IndicatorType::StochRsi { .. } => {
            matches!(field, IndicatorField::StochK | IndicatorField::StochD)
        }
        IndicatorType::Bollinger { .. }
        | IndicatorType::Keltner { .. }
        | IndicatorType::RsiBollinger { .. } => matches!(
            field,
            IndicatorField::Upper | IndicatorField::Middle | IndicatorField::Lower
        ),
        _ => matches!(field, IndicatorField::Value),
    }
}
