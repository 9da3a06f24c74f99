quantity!(Celsius, via: f64, suffix: "°C", precision: 1);

quantity!(
    /// Relative humidity.
    Percent, via: f64, suffix: "%", precision: 0
);
