//! Assertion keywords of the validation vocabulary
//!
//! Assertions only look at instances of the type they constrain; any other
//! type passes.
//!
//! Copyright (c) 2025 Schemata Team
//! Licensed under the Apache-2.0 license

use super::array::contains_matches;
use super::object::compile_pattern;
use super::{non_negative_integer, quoted_list, string_array};
use crate::build::BuildContext;
use crate::error::{ResolutionError, SchemaError};
use crate::evaluate::EvalContext;
use crate::json::{compare_numbers, json_equal, JsonType};
use crate::keyword::{priority, KeywordHandler, KeywordNode, KeywordOutcome, KeywordState};
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// `type`
#[derive(Debug)]
pub struct TypeKeyword;

impl KeywordHandler for TypeKeyword {
    fn name(&self) -> &str {
        "type"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let parse = |name: &Value| {
            name.as_str()
                .and_then(JsonType::from_name)
                .ok_or_else(|| ctx.invalid(format!("{} is not a JSON type name", name)))
        };
        let types = match value {
            Value::String(_) => vec![parse(value)?],
            Value::Array(names) if !names.is_empty() => names.iter().map(parse).collect::<Result<Vec<_>, _>>()?,
            _ => return Err(ctx.invalid("expected a type name or a non-empty array of type names")),
        };
        Ok(KeywordState::new(types))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let Some(types) = node.state().get::<Vec<JsonType>>() else {
            return Ok(KeywordOutcome::pass());
        };
        let instance = ctx.instance();
        Ok(KeywordOutcome::check(types.iter().any(|t| t.matches(instance)), || {
            let received = format!("\"{}\"", JsonType::of(instance));
            let expected = quoted_list(types.iter().map(|t| t.as_str()));
            ctx.message("type", &[("received", received), ("expected", expected)])
        }))
    }
}

/// `enum`
#[derive(Debug)]
pub struct EnumKeyword;

impl KeywordHandler for EnumKeyword {
    fn name(&self) -> &str {
        "enum"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        value.as_array().ok_or_else(|| ctx.invalid("expected an array"))?;
        Ok(KeywordState::none())
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let allowed = node.raw().as_array().map(Vec::as_slice).unwrap_or_default();
        let valid = allowed.iter().any(|candidate| json_equal(candidate, ctx.instance()));
        Ok(KeywordOutcome::check(valid, || ctx.message("enum", &[])))
    }
}

/// `const`
#[derive(Debug)]
pub struct ConstKeyword;

impl KeywordHandler for ConstKeyword {
    fn name(&self) -> &str {
        "const"
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        Ok(KeywordOutcome::check(json_equal(node.raw(), ctx.instance()), || {
            ctx.message("const", &[("expected", node.raw().to_string())])
        }))
    }
}

/// `multipleOf`
#[derive(Debug)]
pub struct MultipleOfKeyword;

impl MultipleOfKeyword {
    fn is_multiple(value: &Number, divisor: &Number) -> bool {
        if let (Some(value), Some(divisor)) = (value.as_i64(), divisor.as_i64()) {
            return divisor != 0 && value % divisor == 0;
        }
        let (Some(value), Some(divisor)) = (value.as_f64(), divisor.as_f64()) else {
            return false;
        };
        let quotient = value / divisor;
        if !quotient.is_finite() {
            return false;
        }
        (quotient - quotient.round()).abs() <= f64::EPSILON * quotient.abs().max(1.0) * 4.0
    }
}

impl KeywordHandler for MultipleOfKeyword {
    fn name(&self) -> &str {
        "multipleOf"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        match value.as_f64() {
            Some(divisor) if divisor > 0.0 => Ok(KeywordState::none()),
            _ => Err(ctx.invalid("expected a number greater than zero")),
        }
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Value::Number(value), Value::Number(divisor)) = (ctx.instance(), node.raw()) else {
            return Ok(KeywordOutcome::pass());
        };
        Ok(KeywordOutcome::check(Self::is_multiple(value, divisor), || {
            ctx.message(
                "multipleOf",
                &[("received", value.to_string()), ("divisor", divisor.to_string())],
            )
        }))
    }
}

/// Which numeric limit a bound keyword enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
}

impl Bound {
    fn name(self) -> &'static str {
        match self {
            Self::Maximum => "maximum",
            Self::ExclusiveMaximum => "exclusiveMaximum",
            Self::Minimum => "minimum",
            Self::ExclusiveMinimum => "exclusiveMinimum",
        }
    }

    /// Whether `value` compared to the limit is acceptable
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Maximum => ordering != Ordering::Greater,
            Self::ExclusiveMaximum => ordering == Ordering::Less,
            Self::Minimum => ordering != Ordering::Less,
            Self::ExclusiveMinimum => ordering == Ordering::Greater,
        }
    }
}

/// `maximum`, `exclusiveMaximum`, `minimum` and `exclusiveMinimum`
#[derive(Debug)]
pub struct NumericBoundKeyword {
    bound: Bound,
}

impl NumericBoundKeyword {
    pub fn new(bound: Bound) -> Self {
        Self { bound }
    }
}

impl KeywordHandler for NumericBoundKeyword {
    fn name(&self) -> &str {
        self.bound.name()
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        value.as_f64().ok_or_else(|| ctx.invalid("expected a number"))?;
        Ok(KeywordState::none())
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Value::Number(value), Value::Number(limit)) = (ctx.instance(), node.raw()) else {
            return Ok(KeywordOutcome::pass());
        };
        Ok(KeywordOutcome::check(self.bound.accepts(compare_numbers(value, limit)), || {
            ctx.message(
                self.bound.name(),
                &[("received", value.to_string()), ("limit", limit.to_string())],
            )
        }))
    }
}

/// `maxLength` and `minLength`, counted in Unicode code points
#[derive(Debug)]
pub struct LengthKeyword {
    max: bool,
}

impl LengthKeyword {
    pub fn new(max: bool) -> Self {
        Self { max }
    }
}

impl KeywordHandler for LengthKeyword {
    fn name(&self) -> &str {
        if self.max {
            "maxLength"
        } else {
            "minLength"
        }
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        Ok(KeywordState::new(non_negative_integer(value, ctx)?))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(text), Some(limit)) = (ctx.instance().as_str(), node.state().get::<u64>()) else {
            return Ok(KeywordOutcome::pass());
        };
        let length = text.chars().count() as u64;
        let valid = if self.max { length <= *limit } else { length >= *limit };
        Ok(KeywordOutcome::check(valid, || {
            ctx.message(self.name(), &[("limit", limit.to_string())])
        }))
    }
}

/// `pattern`, compiled once at build
#[derive(Debug)]
pub struct PatternKeyword;

impl KeywordHandler for PatternKeyword {
    fn name(&self) -> &str {
        "pattern"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let pattern = value.as_str().ok_or_else(|| ctx.invalid("expected a regular expression string"))?;
        Ok(KeywordState::new(compile_pattern(self.name(), pattern)?))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(text), Some(regex)) = (ctx.instance().as_str(), node.state().get::<Regex>()) else {
            return Ok(KeywordOutcome::pass());
        };
        Ok(KeywordOutcome::check(regex.is_match(text), || {
            ctx.message("pattern", &[("pattern", regex.as_str().to_string())])
        }))
    }
}

/// What a count keyword counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counted {
    Items,
    Properties,
}

/// `maxItems`, `minItems`, `maxProperties` and `minProperties`
#[derive(Debug)]
pub struct CountKeyword {
    counted: Counted,
    max: bool,
}

impl CountKeyword {
    pub fn new(counted: Counted, max: bool) -> Self {
        Self { counted, max }
    }
}

impl KeywordHandler for CountKeyword {
    fn name(&self) -> &str {
        match (self.counted, self.max) {
            (Counted::Items, true) => "maxItems",
            (Counted::Items, false) => "minItems",
            (Counted::Properties, true) => "maxProperties",
            (Counted::Properties, false) => "minProperties",
        }
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        Ok(KeywordState::new(non_negative_integer(value, ctx)?))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let count = match (self.counted, ctx.instance()) {
            (Counted::Items, Value::Array(items)) => items.len(),
            (Counted::Properties, Value::Object(map)) => map.len(),
            _ => return Ok(KeywordOutcome::pass()),
        } as u64;
        let Some(limit) = node.state().get::<u64>() else {
            return Ok(KeywordOutcome::pass());
        };
        let valid = if self.max { count <= *limit } else { count >= *limit };
        Ok(KeywordOutcome::check(valid, || {
            ctx.message(self.name(), &[("limit", limit.to_string())])
        }))
    }
}

/// `uniqueItems`
#[derive(Debug)]
pub struct UniqueItemsKeyword;

impl KeywordHandler for UniqueItemsKeyword {
    fn name(&self) -> &str {
        "uniqueItems"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        value.as_bool().ok_or_else(|| ctx.invalid("expected a boolean"))?;
        Ok(KeywordState::none())
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(items), Some(true)) = (ctx.instance().as_array(), node.raw().as_bool()) else {
            return Ok(KeywordOutcome::pass());
        };
        for (first, left) in items.iter().enumerate() {
            for (offset, right) in items[first + 1..].iter().enumerate() {
                if json_equal(left, right) {
                    let second = first + 1 + offset;
                    return Ok(KeywordOutcome::fail(ctx.message(
                        "uniqueItems",
                        &[("first", first.to_string()), ("second", second.to_string())],
                    )));
                }
            }
        }
        Ok(KeywordOutcome::pass())
    }
}

/// `maxContains` and `minContains`; read the sibling `contains` result
#[derive(Debug)]
pub struct ContainsBoundKeyword {
    max: bool,
}

impl ContainsBoundKeyword {
    pub fn new(max: bool) -> Self {
        Self { max }
    }
}

impl KeywordHandler for ContainsBoundKeyword {
    fn name(&self) -> &str {
        if self.max {
            "maxContains"
        } else {
            "minContains"
        }
    }

    fn priority(&self) -> i32 {
        priority::DEPENDENT
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        Ok(KeywordState::new(non_negative_integer(value, ctx)?))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        // `contains` itself enforces the minimum
        if !self.max {
            return Ok(KeywordOutcome::pass());
        }
        let (Some(matched), Some(limit)) = (contains_matches(ctx), node.state().get::<u64>()) else {
            return Ok(KeywordOutcome::pass());
        };
        Ok(KeywordOutcome::check(matched as u64 <= *limit, || {
            ctx.message(
                "maxContains",
                &[("limit", limit.to_string()), ("received", matched.to_string())],
            )
        }))
    }
}

/// `required`
#[derive(Debug)]
pub struct RequiredKeyword;

impl KeywordHandler for RequiredKeyword {
    fn name(&self) -> &str {
        "required"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        Ok(KeywordState::new(string_array(value, ctx)?))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(object), Some(required)) = (ctx.instance().as_object(), node.state().get::<Vec<String>>()) else {
            return Ok(KeywordOutcome::pass());
        };
        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|name| !object.contains_key(*name))
            .collect();
        if missing.is_empty() {
            return Ok(KeywordOutcome::pass());
        }
        Ok(KeywordOutcome::fail(ctx.message("required", &[("missing", quoted_list(missing))])))
    }
}

/// `dependentRequired`
#[derive(Debug)]
pub struct DependentRequiredKeyword;

impl KeywordHandler for DependentRequiredKeyword {
    fn name(&self) -> &str {
        "dependentRequired"
    }

    fn validate_value(&self, value: &Value, ctx: &BuildContext<'_>) -> Result<KeywordState, SchemaError> {
        let map = value.as_object().ok_or_else(|| ctx.invalid("expected an object of string arrays"))?;
        let mut dependencies = Vec::with_capacity(map.len());
        for (property, required) in map {
            dependencies.push((property.clone(), string_array(required, ctx)?));
        }
        Ok(KeywordState::new(dependencies))
    }

    fn evaluate(&self, node: &KeywordNode, ctx: &EvalContext<'_>) -> Result<KeywordOutcome, ResolutionError> {
        let (Some(object), Some(dependencies)) =
            (ctx.instance().as_object(), node.state().get::<Vec<(String, Vec<String>)>>())
        else {
            return Ok(KeywordOutcome::pass());
        };
        let mut errors = Vec::new();
        for (property, required) in dependencies.iter().filter(|(property, _)| object.contains_key(property)) {
            let missing: Vec<&str> = required
                .iter()
                .map(String::as_str)
                .filter(|name| !object.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                errors.push(ctx.message(
                    "dependentRequired",
                    &[("property", format!("\"{}\"", property)), ("missing", quoted_list(missing))],
                ));
            }
        }
        if errors.is_empty() {
            return Ok(KeywordOutcome::pass());
        }
        Ok(KeywordOutcome::fail(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::is_integer;

    fn number(value: Value) -> Number {
        match value {
            Value::Number(n) => n,
            other => panic!("not a number: {}", other),
        }
    }

    #[test]
    fn test_multiple_of_integers_and_decimals() {
        let check = |v: Value, d: Value| MultipleOfKeyword::is_multiple(&number(v), &number(d));
        assert!(check(Value::from(10), Value::from(5)));
        assert!(!check(Value::from(7), Value::from(2)));
        assert!(check(Value::from(0.0075), Value::from(0.0001)));
        assert!(!check(Value::from(0.00751), Value::from(0.0001)));
        assert!(check(Value::from(4.5), Value::from(1.5)));
        assert!(!check(Value::from(1e308), Value::from(1e-308)));
    }

    #[test]
    fn test_bound_ordering() {
        assert!(Bound::Maximum.accepts(Ordering::Equal));
        assert!(!Bound::ExclusiveMaximum.accepts(Ordering::Equal));
        assert!(Bound::Minimum.accepts(Ordering::Greater));
        assert!(!Bound::ExclusiveMinimum.accepts(Ordering::Less));
    }

    #[test]
    fn test_integer_detection_is_shared() {
        assert!(is_integer(&number(Value::from(3.0))));
        assert!(!is_integer(&number(Value::from(3.5))));
    }
}
