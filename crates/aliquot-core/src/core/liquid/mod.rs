//! Liquid-class settings: the by-volume curves and the nested aspirate,
//! dispense and multi-dispense properties that drive every pipetting phase.

pub mod curve;
pub mod properties;

pub use curve::{ByVolumeCurve, CurveError};
pub use properties::{
    AspirateProperties, BlowoutLocation, BlowoutProperties, DelayProperties, DispenseProperties,
    MixProperties, Offset, PositionReference, PropertiesError, RetractAspirateProperties,
    RetractDispenseProperties, SubmergeProperties, TouchTipProperties, TouchTipSettings,
    TransferProperties,
};
