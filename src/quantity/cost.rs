use crate::quantity::{energy::KilowattHours, rate::KilowattHourRate};

quantity!(
    /// Money in the tariff currency (euro), kept to [mills][1] when displayed.
    ///
    /// [1]: https://en.wikipedia.org/wiki/Mill_(currency)
    Cost, via: f64, suffix: "€", precision: 3
);

implement_div!(Cost, KilowattHours, KilowattHourRate);

impl Cost {
    /// Differences below this are floating-point noise for candidate comparison.
    pub const EPSILON: Self = Self(1e-9);
}
