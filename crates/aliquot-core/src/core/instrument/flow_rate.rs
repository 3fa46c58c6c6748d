use super::traits::{FlowRates, Instrument};
use std::ops::{Deref, DerefMut};

/// Temporarily overrides an instrument's blow-out flow rate.
///
/// The rates in effect before the override are restored exactly when the
/// guard is dropped, including an unset blow-out rate and the case where a
/// blow-out inside the scope fails and the error is propagated with `?`.
pub struct BlowOutFlowRate<'i, I: Instrument + ?Sized> {
    instrument: &'i mut I,
    previous: FlowRates,
}

impl<'i, I: Instrument + ?Sized> BlowOutFlowRate<'i, I> {
    pub fn apply(instrument: &'i mut I, flow_rate: f64) -> Self {
        let previous = instrument.flow_rates();
        instrument.set_flow_rate(FlowRates {
            blow_out: Some(flow_rate),
            ..FlowRates::default()
        });
        Self {
            instrument,
            previous,
        }
    }
}

impl<I: Instrument + ?Sized> Deref for BlowOutFlowRate<'_, I> {
    type Target = I;

    fn deref(&self) -> &I {
        self.instrument
    }
}

impl<I: Instrument + ?Sized> DerefMut for BlowOutFlowRate<'_, I> {
    fn deref_mut(&mut self) -> &mut I {
        self.instrument
    }
}

impl<I: Instrument + ?Sized> Drop for BlowOutFlowRate<'_, I> {
    fn drop(&mut self) {
        self.instrument.restore_flow_rates(self.previous);
    }
}
