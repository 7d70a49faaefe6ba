use super::{ArgumentParser, ArgumentParserExt};
use crate::context::CommandContext;
use crate::error::ArgumentParseError;
use crate::inference::ParserTag;

/// Bounded `i32`. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerArgument {
    min: i32,
    max: i32,
}

impl Default for IntegerArgument {
    fn default() -> Self {
        Self {
            min: i32::MIN,
            max: i32::MAX,
        }
    }
}

impl IntegerArgument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min(self, min: i32) -> Self {
        Self { min, ..self }
    }

    pub fn with_max(self, max: i32) -> Self {
        Self { max, ..self }
    }

    /// Producer tag for an integer parameter within `min..=max`.
    pub fn tag(min: i32, max: i32) -> ParserTag {
        let parser = Self::new().with_min(min).with_max(max);
        ParserTag::producer(format!("IntegerArgument::tag({min}, {max})"), move |_| {
            Ok(parser.erase())
        })
    }
}

impl ArgumentParser for IntegerArgument {
    type Output = i32;

    fn parse(
        &self,
        token: &str,
        _position: usize,
        _ctx: &CommandContext,
    ) -> Result<i32, ArgumentParseError> {
        let value: i32 = token
            .parse()
            .map_err(|_| ArgumentParseError::new("not a valid integer"))?;

        if value < self.min {
            return Err(ArgumentParseError::new(format!(
                "should be greater or equal to {}",
                self.min
            )));
        }
        if value > self.max {
            return Err(ArgumentParseError::new(format!(
                "should be lesser or equal to {}",
                self.max
            )));
        }
        Ok(value)
    }
}

/// Bounded `f32`. Both bounds are inclusive. Non-finite input is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatArgument {
    min: f32,
    max: f32,
}

impl Default for FloatArgument {
    fn default() -> Self {
        Self {
            min: f32::MIN,
            max: f32::MAX,
        }
    }
}

impl FloatArgument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min(self, min: f32) -> Self {
        Self { min, ..self }
    }

    pub fn with_max(self, max: f32) -> Self {
        Self { max, ..self }
    }

    /// Producer tag for a float parameter within `min..=max`.
    pub fn tag(min: f32, max: f32) -> ParserTag {
        let parser = Self::new().with_min(min).with_max(max);
        ParserTag::producer(format!("FloatArgument::tag({min}, {max})"), move |_| {
            Ok(parser.erase())
        })
    }
}

impl ArgumentParser for FloatArgument {
    type Output = f32;

    fn parse(
        &self,
        token: &str,
        _position: usize,
        _ctx: &CommandContext,
    ) -> Result<f32, ArgumentParseError> {
        let value: f32 = token
            .parse()
            .ok()
            .filter(|v: &f32| v.is_finite())
            .ok_or_else(|| ArgumentParseError::new("not a valid number"))?;

        if value < self.min {
            return Err(ArgumentParseError::new(format!(
                "should be greater or equal to {}",
                self.min
            )));
        }
        if value > self.max {
            return Err(ArgumentParseError::new(format!(
                "should be lesser or equal to {}",
                self.max
            )));
        }
        Ok(value)
    }
}
