//! Card text form: color letter plus value token (e.g. "R5", "GS", "YD2"),
//! "W" for Wild and "WD4" for Wild Draw Four.

use std::fmt;
use std::str::FromStr;

use super::cards_types::{Card, Color, Value};
use crate::errors::domain::DomainError;

fn parse_err(s: &str) -> DomainError {
    DomainError::validation(format!("Parse card: {s}"))
}

impl FromStr for Card {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "W" => return Ok(Card::new(Color::Wild, Value::Wild)),
            "WD4" => return Ok(Card::new(Color::Wild, Value::WildDrawFour)),
            _ => {}
        }

        let mut chars = s.chars();
        let color = match chars.next() {
            Some('R') => Color::Red,
            Some('B') => Color::Blue,
            Some('G') => Color::Green,
            Some('Y') => Color::Yellow,
            _ => return Err(parse_err(s)),
        };
        let value = match chars.as_str() {
            "S" => Value::Skip,
            "R" => Value::Reverse,
            "D2" => Value::DrawTwo,
            d if d.len() == 1 => {
                let n = d
                    .chars()
                    .next()
                    .and_then(|c| c.to_digit(10))
                    .ok_or_else(|| parse_err(s))?;
                Value::Number(n as u8)
            }
            _ => return Err(parse_err(s)),
        };
        Ok(Card::new(color, value))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = match self.color {
            Color::Red => "R",
            Color::Blue => "B",
            Color::Green => "G",
            Color::Yellow => "Y",
            Color::Wild => "W",
        };
        match self.value {
            Value::Number(n) => write!(f, "{color}{n}"),
            Value::Skip => write!(f, "{color}S"),
            Value::Reverse => write!(f, "{color}R"),
            Value::DrawTwo => write!(f, "{color}D2"),
            Value::Wild => f.write_str("W"),
            Value::WildDrawFour => f.write_str("WD4"),
        }
    }
}

/// Non-panicking helper to parse card tokens (e.g., "R5", "WD4") into cards.
pub fn try_parse_cards<I, S>(tokens: I) -> Result<Vec<Card>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|s| s.as_ref().parse::<Card>())
        .collect()
}
