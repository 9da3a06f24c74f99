quantity!(
    /// Euro per kilowatt-hour.
    KilowattHourRate, via: f64, suffix: "€/kWh", precision: 3
);
