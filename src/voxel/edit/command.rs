//! Edit commands delivered to the terrain.

use crate::core::types::Vec3;

/// Which density field an edit targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Material {
    Solid,
    Liquid,
}

/// A queued density change.
///
/// `amount > 0` fills, `amount < 0` digs or drains. The target cell is the one
/// containing `position`; its layer is `floor(position.y / cell_height)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditCommand {
    Solid { position: Vec3, amount: f32 },
    Liquid { position: Vec3, amount: f32 },
}

impl EditCommand {
    pub fn solid(position: Vec3, amount: f32) -> Self {
        Self::Solid { position, amount }
    }

    pub fn liquid(position: Vec3, amount: f32) -> Self {
        Self::Liquid { position, amount }
    }

    pub fn material(&self) -> Material {
        match self {
            Self::Solid { .. } => Material::Solid,
            Self::Liquid { .. } => Material::Liquid,
        }
    }

    pub fn position(&self) -> Vec3 {
        match *self {
            Self::Solid { position, .. } | Self::Liquid { position, .. } => position,
        }
    }

    pub fn amount(&self) -> f32 {
        match *self {
            Self::Solid { amount, .. } | Self::Liquid { amount, .. } => amount,
        }
    }

    /// True for fills, false for digs. Zero counts as a dig of nothing.
    pub fn is_fill(&self) -> bool {
        self.amount() > 0.0
    }
}
