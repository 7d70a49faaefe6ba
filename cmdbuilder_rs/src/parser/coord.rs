use std::collections::BTreeSet;

use super::ArgumentParser;
use crate::context::{CommandContext, CommandSender};
use crate::error::ArgumentParseError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One block coordinate. `~` and `~N` are relative to the sender's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordArgument {
    axis: Axis,
}

impl CoordArgument {
    pub fn new(axis: Axis) -> Self {
        Self { axis }
    }

    fn sender_coord(&self, sender: &dyn CommandSender) -> Option<i32> {
        let location = sender.location()?;
        Some(match self.axis {
            Axis::X => location.x,
            Axis::Y => location.y,
            Axis::Z => location.z,
        })
    }
}

impl ArgumentParser for CoordArgument {
    type Output = i32;

    fn parse(
        &self,
        token: &str,
        _position: usize,
        ctx: &CommandContext,
    ) -> Result<i32, ArgumentParseError> {
        let (relative, digits) = match token.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let offset: i32 = if relative && digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| ArgumentParseError::new("invalid coordinate"))?
        };

        if !relative {
            return Ok(offset);
        }

        let base = self.sender_coord(ctx.sender.as_ref()).ok_or_else(|| {
            ArgumentParseError::new("cannot use relative coordinates in this context")
        })?;
        base.checked_add(offset)
            .ok_or_else(|| ArgumentParseError::new("invalid coordinate"))
    }

    fn complete(
        &self,
        _prior: &[Option<Value>],
        _partial: &str,
        _position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.sender_coord(ctx.sender.as_ref())
            .map(|coord| coord.to_string())
            .into_iter()
            .collect()
    }
}
