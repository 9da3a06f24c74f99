use crate::quantity::{cost::Cost, rate::KilowattHourRate};

quantity!(KilowattHours, via: f64, suffix: "kWh", precision: 2);

implement_mul!(KilowattHours, KilowattHourRate, Cost);
