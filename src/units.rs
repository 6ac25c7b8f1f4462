//! Physical quantities: a magnitude paired with a unit.
//!
//! Units are parsed from the usual textual spellings (`mV`, `millivolt`,
//! `kg*m/s**2`, `m/s²`) and always print in one canonical short form, so two
//! quantities with the same unit serialize identically no matter how the unit
//! was written. Unit support is gated on the `units` cargo feature; without it
//! every unit operation fails with [`PathwireError::Configuration`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PathwireError, Result};

const UNITS_UNAVAILABLE: &str = "to use quantities, build with the `units` feature";

// Dimension exponents, in order: length, mass, time, current, temperature,
// amount of substance, luminous intensity.
type Dims = [i32; 7];

const NONE: Dims = [0, 0, 0, 0, 0, 0, 0];

/// Largest exponent magnitude a single unit term may carry.
const MAX_EXPONENT: i32 = 64;

struct Prefix {
    symbols: &'static [&'static str],
    name: &'static str,
    factor: f64,
}

struct BaseUnit {
    symbols: &'static [&'static str],
    names: &'static [&'static str],
    factor: f64,
    dims: Dims,
}

// `da` precedes `d` so that `dam` reads as decametre.
const PREFIXES: &[Prefix] = &[
    Prefix { symbols: &["Y"], name: "yotta", factor: 1e24 },
    Prefix { symbols: &["Z"], name: "zetta", factor: 1e21 },
    Prefix { symbols: &["E"], name: "exa", factor: 1e18 },
    Prefix { symbols: &["P"], name: "peta", factor: 1e15 },
    Prefix { symbols: &["T"], name: "tera", factor: 1e12 },
    Prefix { symbols: &["G"], name: "giga", factor: 1e9 },
    Prefix { symbols: &["M"], name: "mega", factor: 1e6 },
    Prefix { symbols: &["k"], name: "kilo", factor: 1e3 },
    Prefix { symbols: &["h"], name: "hecto", factor: 1e2 },
    Prefix { symbols: &["da"], name: "deca", factor: 1e1 },
    Prefix { symbols: &["d"], name: "deci", factor: 1e-1 },
    Prefix { symbols: &["c"], name: "centi", factor: 1e-2 },
    Prefix { symbols: &["m"], name: "milli", factor: 1e-3 },
    Prefix { symbols: &["µ", "μ", "u"], name: "micro", factor: 1e-6 },
    Prefix { symbols: &["n"], name: "nano", factor: 1e-9 },
    Prefix { symbols: &["p"], name: "pico", factor: 1e-12 },
    Prefix { symbols: &["f"], name: "femto", factor: 1e-15 },
    Prefix { symbols: &["a"], name: "atto", factor: 1e-18 },
    Prefix { symbols: &["z"], name: "zepto", factor: 1e-21 },
    Prefix { symbols: &["y"], name: "yocto", factor: 1e-24 },
];

const UNITS: &[BaseUnit] = &[
    BaseUnit { symbols: &["m"], names: &["meter", "metre"], factor: 1.0, dims: [1, 0, 0, 0, 0, 0, 0] },
    BaseUnit { symbols: &["g"], names: &["gram", "gramme"], factor: 1e-3, dims: [0, 1, 0, 0, 0, 0, 0] },
    BaseUnit { symbols: &["s", "sec"], names: &["second"], factor: 1.0, dims: [0, 0, 1, 0, 0, 0, 0] },
    BaseUnit { symbols: &["A"], names: &["ampere", "amp"], factor: 1.0, dims: [0, 0, 0, 1, 0, 0, 0] },
    BaseUnit { symbols: &["K"], names: &["kelvin"], factor: 1.0, dims: [0, 0, 0, 0, 1, 0, 0] },
    BaseUnit { symbols: &["mol"], names: &["mole"], factor: 1.0, dims: [0, 0, 0, 0, 0, 1, 0] },
    BaseUnit { symbols: &["cd"], names: &["candela"], factor: 1.0, dims: [0, 0, 0, 0, 0, 0, 1] },
    BaseUnit { symbols: &["Hz"], names: &["hertz"], factor: 1.0, dims: [0, 0, -1, 0, 0, 0, 0] },
    BaseUnit { symbols: &["N"], names: &["newton"], factor: 1.0, dims: [1, 1, -2, 0, 0, 0, 0] },
    BaseUnit { symbols: &["Pa"], names: &["pascal"], factor: 1.0, dims: [-1, 1, -2, 0, 0, 0, 0] },
    BaseUnit { symbols: &["J"], names: &["joule"], factor: 1.0, dims: [2, 1, -2, 0, 0, 0, 0] },
    BaseUnit { symbols: &["W"], names: &["watt"], factor: 1.0, dims: [2, 1, -3, 0, 0, 0, 0] },
    BaseUnit { symbols: &["C"], names: &["coulomb"], factor: 1.0, dims: [0, 0, 1, 1, 0, 0, 0] },
    BaseUnit { symbols: &["V"], names: &["volt"], factor: 1.0, dims: [2, 1, -3, -1, 0, 0, 0] },
    BaseUnit { symbols: &["F"], names: &["farad"], factor: 1.0, dims: [-2, -1, 4, 2, 0, 0, 0] },
    BaseUnit { symbols: &["Ω"], names: &["ohm"], factor: 1.0, dims: [2, 1, -3, -2, 0, 0, 0] },
    BaseUnit { symbols: &["S"], names: &["siemens"], factor: 1.0, dims: [-2, -1, 3, 2, 0, 0, 0] },
    BaseUnit { symbols: &["Wb"], names: &["weber"], factor: 1.0, dims: [2, 1, -2, -1, 0, 0, 0] },
    BaseUnit { symbols: &["T"], names: &["tesla"], factor: 1.0, dims: [0, 1, -2, -1, 0, 0, 0] },
    BaseUnit { symbols: &["H"], names: &["henry"], factor: 1.0, dims: [2, 1, -2, -2, 0, 0, 0] },
    BaseUnit { symbols: &["l", "L"], names: &["liter", "litre"], factor: 1e-3, dims: [3, 0, 0, 0, 0, 0, 0] },
    BaseUnit { symbols: &["min"], names: &["minute"], factor: 60.0, dims: [0, 0, 1, 0, 0, 0, 0] },
    BaseUnit { symbols: &["h", "hr"], names: &["hour"], factor: 3600.0, dims: [0, 0, 1, 0, 0, 0, 0] },
    BaseUnit { symbols: &["rad"], names: &["radian"], factor: 1.0, dims: NONE },
    BaseUnit { symbols: &["sr"], names: &["steradian"], factor: 1.0, dims: NONE },
    BaseUnit { symbols: &["deg"], names: &["degree"], factor: std::f64::consts::PI / 180.0, dims: NONE },
    BaseUnit { symbols: &["bar"], names: &["bar"], factor: 1e5, dims: [-1, 1, -2, 0, 0, 0, 0] },
    BaseUnit { symbols: &["eV"], names: &["electron_volt", "electronvolt"], factor: 1.602_176_634e-19, dims: [2, 1, -2, 0, 0, 0, 0] },
];

fn ensure_available() -> Result<()> {
    if cfg!(feature = "units") {
        Ok(())
    } else {
        Err(PathwireError::Configuration(UNITS_UNAVAILABLE.to_string()))
    }
}

fn unit_by_symbol(symbol: &str) -> Option<&'static BaseUnit> {
    UNITS.iter().find(|u| u.symbols.contains(&symbol))
}

fn unit_by_name(name: &str) -> Option<&'static BaseUnit> {
    let singular = name.strip_suffix('s');
    UNITS.iter().find(|u| {
        u.names.contains(&name) || singular.is_some_and(|s| u.names.contains(&s))
    })
}

fn prefix_by_symbol(symbol: &str) -> Option<&'static Prefix> {
    PREFIXES.iter().find(|p| p.symbols.contains(&symbol))
}

fn base_of(symbol: &str) -> &'static BaseUnit {
    // Terms are only ever built from table entries.
    unit_by_symbol(symbol).unwrap_or(&UNITS[0])
}

/// One `prefix·symbol^exp` factor of a unit, stored by canonical symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct UnitTerm {
    prefix: &'static str,
    symbol: &'static str,
    exp: i32,
}

impl UnitTerm {
    fn factor(&self) -> f64 {
        let prefix = prefix_by_symbol(self.prefix).map_or(1.0, |p| p.factor);
        (prefix * base_of(self.symbol).factor).powi(self.exp)
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, exp: i32) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.symbol)?;
        if exp != 1 {
            f.write_str(&superscript(exp))?;
        }
        Ok(())
    }
}

fn resolve(token: &str) -> Result<(&'static str, &'static str)> {
    if let Some(u) = unit_by_symbol(token).or_else(|| unit_by_name(token)) {
        return Ok(("", u.symbols[0]));
    }
    for p in PREFIXES {
        for ps in p.symbols {
            if let Some(rest) = token.strip_prefix(*ps) {
                if let Some(u) = unit_by_symbol(rest) {
                    return Ok((p.symbols[0], u.symbols[0]));
                }
            }
        }
        if let Some(rest) = token.strip_prefix(p.name) {
            if let Some(u) = unit_by_name(rest) {
                return Ok((p.symbols[0], u.symbols[0]));
            }
        }
    }
    Err(PathwireError::InvalidUnit(format!("unknown unit '{}'", token)))
}

#[derive(Debug)]
enum Token {
    Name(String),
    One,
    Mul,
    Div,
    Pow(i32),
}

fn from_superscript(c: char) -> Option<char> {
    Some(match c {
        '⁰' => '0',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        '⁴' => '4',
        '⁵' => '5',
        '⁶' => '6',
        '⁷' => '7',
        '⁸' => '8',
        '⁹' => '9',
        '⁻' => '-',
        _ => return None,
    })
}

fn superscript(exp: i32) -> String {
    exp.to_string()
        .chars()
        .map(|c| match c {
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            '-' => '⁻',
            other => other,
        })
        .collect()
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == 'µ' || c == 'Ω'
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let invalid = |msg: &str| PathwireError::InvalidUnit(format!("{} in '{}'", msg, input));
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    // Reads `[-+]digits` starting at `i`, skipping leading whitespace.
    let read_exponent = |i: &mut usize| -> Result<i32> {
        while *i < chars.len() && chars[*i].is_whitespace() {
            *i += 1;
        }
        let start = *i;
        if *i < chars.len() && (chars[*i] == '-' || chars[*i] == '+') {
            *i += 1;
        }
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            *i += 1;
        }
        let text: String = chars[start..*i].iter().collect();
        text.parse::<i32>().map_err(|_| invalid("malformed exponent"))
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                tokens.push(Token::Pow(read_exponent(&mut i)?));
            }
            '^' => {
                i += 1;
                tokens.push(Token::Pow(read_exponent(&mut i)?));
            }
            '*' | '·' | '⋅' => {
                i += 1;
                tokens.push(Token::Mul);
            }
            '/' => {
                i += 1;
                tokens.push(Token::Div);
            }
            '1' => {
                i += 1;
                tokens.push(Token::One);
            }
            c if from_superscript(c).is_some() => {
                let mut text = String::new();
                while let Some(d) = chars.get(i).copied().and_then(from_superscript) {
                    text.push(d);
                    i += 1;
                }
                let exp = text.parse::<i32>().map_err(|_| invalid("malformed exponent"))?;
                tokens.push(Token::Pow(exp));
            }
            c if is_name_char(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(&format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

fn bounded(exp: Option<i32>, input: &str) -> Result<i32> {
    exp.filter(|e| (-MAX_EXPONENT..=MAX_EXPONENT).contains(e)).ok_or_else(|| {
        PathwireError::InvalidUnit(format!(
            "exponent out of range (at most {}) in '{}'",
            MAX_EXPONENT, input
        ))
    })
}

/// A unit of measure in canonical form.
///
/// Equality compares the canonical form, so `Unit::parse("millivolt")` equals
/// `Unit::parse("mV")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Unit {
    terms: Vec<UnitTerm>,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self> {
        ensure_available()?;

        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "dimensionless" {
            return Ok(Self::dimensionless());
        }

        let unexpected = |what: &str| {
            PathwireError::InvalidUnit(format!("unexpected {} in '{}'", what, input))
        };

        let mut terms: Vec<UnitTerm> = Vec::new();
        let mut sign = 1;
        let mut expect_term = true;
        // Whether the last term is a real unit (as opposed to a `1`).
        let mut last_is_unit = false;

        for token in tokenize(trimmed)? {
            match token {
                Token::Name(name) => {
                    if !expect_term {
                        sign = 1;
                    }
                    let (prefix, symbol) = resolve(&name)?;
                    terms.push(UnitTerm { prefix, symbol, exp: sign });
                    expect_term = false;
                    last_is_unit = true;
                }
                Token::One => {
                    if !expect_term {
                        return Err(unexpected("'1'"));
                    }
                    expect_term = false;
                    last_is_unit = false;
                }
                Token::Pow(p) => {
                    if expect_term {
                        return Err(unexpected("exponent"));
                    }
                    if last_is_unit {
                        if let Some(last) = terms.last_mut() {
                            last.exp = bounded(last.exp.checked_mul(p), input)?;
                        }
                    }
                }
                Token::Mul => {
                    if expect_term {
                        return Err(unexpected("operator"));
                    }
                    sign = 1;
                    expect_term = true;
                }
                Token::Div => {
                    if expect_term {
                        return Err(unexpected("operator"));
                    }
                    sign = -1;
                    expect_term = true;
                }
            }
        }
        if expect_term {
            return Err(unexpected("end of unit"));
        }

        Self::from_terms(terms, input)
    }

    fn from_terms(raw: Vec<UnitTerm>, input: &str) -> Result<Self> {
        let mut terms: Vec<UnitTerm> = Vec::new();
        for term in raw {
            match terms
                .iter_mut()
                .find(|t| t.prefix == term.prefix && t.symbol == term.symbol)
            {
                Some(existing) => {
                    existing.exp = bounded(existing.exp.checked_add(term.exp), input)?
                }
                None => terms.push(term),
            }
        }
        terms.retain(|t| t.exp != 0);
        terms.sort_by(|a, b| (a.symbol, a.prefix).cmp(&(b.symbol, b.prefix)));
        Ok(Self { terms })
    }

    pub fn is_dimensionless(&self) -> bool {
        self.terms.is_empty()
    }

    /// Scale factor to the coherent SI unit of the same dimension.
    fn factor(&self) -> f64 {
        self.terms.iter().map(UnitTerm::factor).product()
    }

    fn dims(&self) -> Dims {
        let mut dims = NONE;
        for term in &self.terms {
            let base = base_of(term.symbol);
            for (d, b) in dims.iter_mut().zip(base.dims.iter()) {
                *d += b * term.exp;
            }
        }
        dims
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numerator = self.terms.iter().filter(|t| t.exp > 0).peekable();
        let has_numerator = numerator.peek().is_some();
        let has_denominator = self.terms.iter().any(|t| t.exp < 0);

        for (i, term) in numerator.enumerate() {
            if i > 0 {
                f.write_str("·")?;
            }
            term.write(f, term.exp)?;
        }
        if has_denominator && !has_numerator {
            f.write_str("1")?;
        }
        for term in self.terms.iter().filter(|t| t.exp < 0) {
            f.write_str("/")?;
            term.write(f, -term.exp)?;
        }
        Ok(())
    }
}

/// The `{magnitude, unit}` record form of a quantity, as found on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityDict {
    pub magnitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: &str) -> Result<Self> {
        Ok(Self {
            magnitude,
            unit: Unit::parse(unit)?,
        })
    }

    pub fn with_unit(magnitude: f64, unit: Unit) -> Result<Self> {
        ensure_available()?;
        Ok(Self { magnitude, unit })
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Converts to `unit`, which must have the same dimensionality.
    pub fn to(&self, unit: &str) -> Result<Self> {
        let target = Unit::parse(unit)?;
        if self.unit.dims() != target.dims() {
            return Err(PathwireError::IncompatibleUnits {
                from: self.unit.to_string(),
                to: target.to_string(),
            });
        }
        let magnitude = self.magnitude * self.unit.factor() / target.factor();
        Ok(Self {
            magnitude,
            unit: target,
        })
    }

    pub fn to_dict(&self) -> QuantityDict {
        QuantityDict {
            magnitude: self.magnitude,
            unit: Some(self.unit.to_string()),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_dimensionless() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}

/// Anything [`convert_to_quantity`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityInput {
    Number(f64),
    Record(QuantityDict),
    Quantity(Quantity),
}

impl From<f64> for QuantityInput {
    fn from(v: f64) -> Self {
        QuantityInput::Number(v)
    }
}

impl From<i64> for QuantityInput {
    fn from(v: i64) -> Self {
        QuantityInput::Number(v as f64)
    }
}

impl From<i32> for QuantityInput {
    fn from(v: i32) -> Self {
        QuantityInput::Number(f64::from(v))
    }
}

impl From<QuantityDict> for QuantityInput {
    fn from(v: QuantityDict) -> Self {
        QuantityInput::Record(v)
    }
}

impl From<Quantity> for QuantityInput {
    fn from(v: Quantity) -> Self {
        QuantityInput::Quantity(v)
    }
}

/// Builds a [`Quantity`] from a bare number, a `{magnitude, unit}` record or an
/// existing quantity.
///
/// A bare number takes `unit`. A record keeps its own unit and only falls back
/// to `unit` when it carries none. A quantity is returned unchanged.
pub fn convert_to_quantity(value: impl Into<QuantityInput>, unit: &str) -> Result<Quantity> {
    ensure_available()?;
    match value.into() {
        QuantityInput::Number(magnitude) => Quantity::new(magnitude, unit),
        QuantityInput::Record(record) => {
            Quantity::new(record.magnitude, record.unit.as_deref().unwrap_or(unit))
        }
        QuantityInput::Quantity(quantity) => Ok(quantity),
    }
}
