#[macro_use]
mod macros;

pub mod climate;
pub mod cost;
pub mod energy;
pub mod mass;
pub mod power;
pub mod rate;
pub mod time;

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{
        cost::Cost,
        energy::KilowattHours,
        power::Kilowatts,
        rate::KilowattHourRate,
        time::Hours,
    };

    #[test]
    fn test_energy_from_power_and_time() {
        let energy = Kilowatts(9.6) * Hours(8.0);
        assert_abs_diff_eq!(energy.0, 76.8, epsilon = 1e-12);
    }

    #[test]
    fn test_cost_from_energy_and_rate() {
        let cost = KilowattHours(80.65) * KilowattHourRate(0.1);
        assert_abs_diff_eq!(cost.0, 8.065, epsilon = 1e-12);
    }

    #[test]
    fn test_average_rate() {
        let rate = Cost(8.065) / KilowattHours(80.65);
        assert_abs_diff_eq!(rate.0, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_ordering_treats_nan_as_greatest() {
        assert!(Cost(f64::NAN) > Cost(1e9));
        assert_eq!(Cost(1.0).min(Cost(f64::NAN)), Cost(1.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Cost(8.0654).to_string(), "8.065 €");
        assert_eq!(format!("{:?}", Kilowatts(9.6)), "9.60kW");
    }

    #[test]
    fn test_sum() {
        let total: KilowattHours =
            [KilowattHours(1.25), KilowattHours(2.1), KilowattHours(0.5)].into_iter().sum();
        assert_abs_diff_eq!(total.0, 3.85, epsilon = 1e-12);
    }
}
