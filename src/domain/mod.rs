// Domain layer - Options, normalization rules and stage vocabulary

pub mod model;
pub mod rules;
