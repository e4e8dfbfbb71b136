use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Arithmetic operator carried by an operator tile.
///
/// Division is deliberately absent: the game never spawns it, so no
/// division-by-zero case can arise during merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    /// Every operator the game knows about.
    pub const ALL: [Op; 3] = [Op::Add, Op::Sub, Op::Mul];

    /// Apply the operator to two tile values.
    ///
    /// Saturating arithmetic: merge results are clamped by policy anyway,
    /// and a pathological grid must not be able to panic the engine.
    pub fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Op::Add => a.saturating_add(b),
            Op::Sub => a.saturating_sub(b),
            Op::Mul => a.saturating_mul(b),
        }
    }

    /// The wire symbol for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
        }
    }

    /// Parse a wire symbol back into an operator.
    pub fn from_symbol(symbol: &str) -> Option<Op> {
        match symbol {
            "+" => Some(Op::Add),
            "-" => Some(Op::Sub),
            "*" => Some(Op::Mul),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One cell of the game grid.
///
/// Tiles are plain values: moves never mutate a tile, they produce new ones.
/// Equality is structural, so two `Number(5)` tiles are the same tile as far
/// as the engine is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tile {
    Number(i64),
    Operator(Op),
    #[default]
    Empty,
}

impl Tile {
    pub fn is_number(self) -> bool {
        matches!(self, Tile::Number(_))
    }

    pub fn is_operator(self) -> bool {
        matches!(self, Tile::Operator(_))
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Tile::Empty)
    }

    /// The numeric value, if this is a number tile.
    pub fn number(self) -> Option<i64> {
        match self {
            Tile::Number(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tile::Number(n) => write!(f, "{}", n),
            Tile::Operator(op) => write!(f, "{}", op),
            Tile::Empty => f.write_str("_"),
        }
    }
}

// Wire encoding: a number tile is a JSON integer, an operator tile is one of
// the strings "+", "-", "*", and an empty cell is null. Integer sentinels
// for operators would collide with merge results (59 * 17 = 1003), distinct
// JSON types cannot.
impl Serialize for Tile {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Tile::Number(n) => serializer.serialize_i64(*n),
            Tile::Operator(op) => serializer.serialize_str(op.symbol()),
            Tile::Empty => serializer.serialize_unit(),
        }
    }
}

struct TileVisitor;

impl<'de> Visitor<'de> for TileVisitor {
    type Value = Tile;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer, one of \"+\" \"-\" \"*\", or null")
    }

    fn visit_i64<E>(self, value: i64) -> Result<Tile, E>
    where
        E: de::Error,
    {
        Ok(Tile::Number(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Tile, E>
    where
        E: de::Error,
    {
        i64::try_from(value)
            .map(Tile::Number)
            .map_err(|_| E::custom(format!("tile value {} is out of range", value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Tile, E>
    where
        E: de::Error,
    {
        Op::from_symbol(value)
            .map(Tile::Operator)
            .ok_or_else(|| E::custom(format!("unknown operator tile: {:?}", value)))
    }

    fn visit_unit<E>(self) -> Result<Tile, E>
    where
        E: de::Error,
    {
        Ok(Tile::Empty)
    }

    fn visit_none<E>(self) -> Result<Tile, E>
    where
        E: de::Error,
    {
        Ok(Tile::Empty)
    }
}

impl<'de> Deserialize<'de> for Tile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TileVisitor)
    }
}
