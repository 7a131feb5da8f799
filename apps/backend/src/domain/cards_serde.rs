//! Serialization and deserialization for card types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cards_types::{Card, Color, Value};

// Color serde
impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match self {
            Color::Red => "RED",
            Color::Blue => "BLUE",
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Wild => "WILD",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "RED" => Ok(Color::Red),
            "BLUE" => Ok(Color::Blue),
            "GREEN" => Ok(Color::Green),
            "YELLOW" => Ok(Color::Yellow),
            "WILD" => Ok(Color::Wild),
            _ => Err(serde::de::Error::custom(format!("Invalid color: {s}"))),
        }
    }
}

// Value serde ("0".."9", "SKIP", ...)
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Number(n) => serializer.serialize_str(&n.to_string()),
            Value::Skip => serializer.serialize_str("SKIP"),
            Value::Reverse => serializer.serialize_str("REVERSE"),
            Value::DrawTwo => serializer.serialize_str("DRAW_TWO"),
            Value::Wild => serializer.serialize_str("WILD"),
            Value::WildDrawFour => serializer.serialize_str("WILD_DRAW_FOUR"),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "SKIP" => Ok(Value::Skip),
            "REVERSE" => Ok(Value::Reverse),
            "DRAW_TWO" => Ok(Value::DrawTwo),
            "WILD" => Ok(Value::Wild),
            "WILD_DRAW_FOUR" => Ok(Value::WildDrawFour),
            digit => match digit.parse::<u8>() {
                Ok(n) if n <= 9 && digit.len() == 1 => Ok(Value::Number(n)),
                _ => Err(serde::de::Error::custom(format!("Invalid value: {s}"))),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireCard {
    color: Color,
    value: Value,
    #[serde(default)]
    variant: u8,
}

// Card serde: {"color": "RED", "value": "7", "variant": 0}
impl Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        WireCard {
            color: self.color,
            value: self.value,
            variant: self.variant,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireCard::deserialize(deserializer)?;
        let wild_value = matches!(wire.value, Value::Wild | Value::WildDrawFour);
        if wild_value != (wire.color == Color::Wild) {
            return Err(serde::de::Error::custom(format!(
                "Invalid card: color {:?} with value {:?}",
                wire.color, wire.value
            )));
        }
        Ok(Card::with_variant(wire.color, wire.value, wire.variant))
    }
}
