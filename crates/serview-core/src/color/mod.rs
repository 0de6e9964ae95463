pub mod cmy;
pub mod debayer;
pub mod normalize;

pub use cmy::{CfaRemapRule, CfaRemapTable};
pub use debayer::DebayerMethod;
pub use normalize::{DemosaicChoice, DemosaicStrategy, Normalizer};
