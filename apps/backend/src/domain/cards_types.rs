//! Core card-related types: Card, Color, Value, CardKind

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    /// Only Wild and WildDrawFour carry this color.
    Wild,
}

impl Color {
    /// The four colors a Wild may be declared as.
    pub const REAL: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

    pub fn is_real(self) -> bool {
        !matches!(self, Color::Wild)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Value {
    /// Face value 0..=9.
    Number(u8),
    Skip,
    Reverse,
    DrawTwo,
    Wild,
    WildDrawFour,
}

impl Value {
    pub fn kind(self) -> CardKind {
        match self {
            Value::Number(_) => CardKind::Number,
            Value::Skip | Value::Reverse | Value::DrawTwo => CardKind::Action,
            Value::Wild | Value::WildDrawFour => CardKind::Wild,
        }
    }

    /// Cards added to the pending penalty when this value is played.
    pub fn penalty(self) -> u32 {
        match self {
            Value::DrawTwo => 2,
            Value::WildDrawFour => 4,
            _ => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CardKind {
    Number,
    Action,
    Wild,
}

/// A single card. `variant` numbers duplicate copies and is cosmetic only:
/// equality for gameplay purposes goes through `color` and `value`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Card {
    pub color: Color,
    pub value: Value,
    pub variant: u8,
}

impl Card {
    pub const fn new(color: Color, value: Value) -> Self {
        Self {
            color,
            value,
            variant: 0,
        }
    }

    pub const fn with_variant(color: Color, value: Value, variant: u8) -> Self {
        Self {
            color,
            value,
            variant,
        }
    }

    pub fn kind(&self) -> CardKind {
        self.value.kind()
    }

    pub fn is_wild(&self) -> bool {
        self.color == Color::Wild
    }

    /// Same face, ignoring the cosmetic variant.
    pub fn same_face(&self, other: &Card) -> bool {
        self.color == other.color && self.value == other.value
    }
}
