use crate::config::NodeConfig;
use crate::types::PacketType;

/// Physical measurement channel exposed by the sensor collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChannel {
    Battery,
    Moisture,
}

/// Synchronous voltage source — ADC glue in firmware, canned values in
/// tests. Readings are millivolts.
pub trait SensorReader: Send {
    fn read_value(&mut self, channel: SensorChannel) -> u32;
}

/// What a data-request packet asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    BatteryVoltage,
    BatteryPercent,
    MoistureVoltage,
    MoisturePercent,
}

impl SensorKind {
    /// Map a request packet type to the measurement it asks for and
    /// the response type that carries it back to the hub.
    pub fn for_request(request_type: PacketType) -> Option<(SensorKind, PacketType)> {
        match request_type {
            PacketType::REQ_BATTERY_VOLTAGE => {
                Some((SensorKind::BatteryVoltage, PacketType::RESP_BATTERY_VOLTAGE))
            }
            PacketType::REQ_BATTERY_PCT => {
                Some((SensorKind::BatteryPercent, PacketType::RESP_BATTERY_PCT))
            }
            PacketType::REQ_MOISTURE_VOLTAGE => Some((
                SensorKind::MoistureVoltage,
                PacketType::RESP_MOISTURE_VOLTAGE,
            )),
            PacketType::REQ_MOISTURE_PCT => {
                Some((SensorKind::MoisturePercent, PacketType::RESP_MOISTURE_PCT))
            }
            _ => None,
        }
    }

    /// Take the measurement, converting to percent where asked.
    pub fn measure(self, sensor: &mut dyn SensorReader, config: &NodeConfig) -> u32 {
        match self {
            SensorKind::BatteryVoltage => sensor.read_value(SensorChannel::Battery),
            SensorKind::BatteryPercent => {
                battery_percent(sensor.read_value(SensorChannel::Battery), config)
            }
            SensorKind::MoistureVoltage => sensor.read_value(SensorChannel::Moisture),
            SensorKind::MoisturePercent => {
                moisture_percent(sensor.read_value(SensorChannel::Moisture), config)
            }
        }
    }
}

/// Linear charge estimate between the calibrated thresholds, clamped
/// to 0..=100.
///
/// The clamps are inclusive so a degenerate calibration (high at or
/// below low, which a remote config update can produce) never reaches
/// the division.
pub fn battery_percent(voltage_mv: u32, config: &NodeConfig) -> u32 {
    if voltage_mv <= config.battery_low_mv {
        return 0;
    }
    if voltage_mv >= config.battery_high_mv {
        return 100;
    }
    (voltage_mv - config.battery_low_mv) * 100 / (config.battery_high_mv - config.battery_low_mv)
}

/// Moisture scale is inverted: a wet probe conducts better and reads a
/// lower voltage. Clamps are inclusive, as for [`battery_percent`].
pub fn moisture_percent(voltage_mv: u32, config: &NodeConfig) -> u32 {
    if voltage_mv <= config.moisture_low_mv {
        return 100;
    }
    if voltage_mv >= config.moisture_high_mv {
        return 0;
    }
    100 - (voltage_mv - config.moisture_low_mv) * 100
        / (config.moisture_high_mv - config.moisture_low_mv)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns fixed readings per channel.
    pub struct FixedSensor {
        pub battery_mv: u32,
        pub moisture_mv: u32,
    }

    impl SensorReader for FixedSensor {
        fn read_value(&mut self, channel: SensorChannel) -> u32 {
            match channel {
                SensorChannel::Battery => self.battery_mv,
                SensorChannel::Moisture => self.moisture_mv,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedSensor;
    use super::*;

    #[test]
    fn battery_percent_clamps_and_scales() {
        let config = NodeConfig::default(); // 1450..2100
        assert_eq!(battery_percent(1000, &config), 0);
        assert_eq!(battery_percent(1450, &config), 0);
        assert_eq!(battery_percent(2100, &config), 100);
        assert_eq!(battery_percent(3000, &config), 100);
        assert_eq!(battery_percent(1775, &config), 50);
    }

    #[test]
    fn moisture_percent_is_inverted() {
        let config = NodeConfig::default(); // 1344..2707
        assert_eq!(moisture_percent(1000, &config), 100);
        assert_eq!(moisture_percent(1344, &config), 100);
        assert_eq!(moisture_percent(2707, &config), 0);
        assert_eq!(moisture_percent(3000, &config), 0);

        let mid = (1344 + 2707) / 2;
        let pct = moisture_percent(mid, &config);
        assert!((49..=51).contains(&pct), "midpoint gave {pct}");
    }

    #[test]
    fn degenerate_calibration_never_divides_by_zero() {
        // A remote update can pin both thresholds to the same value,
        // or cross them. Readings must still convert.
        let mut config = NodeConfig::default();
        config.apply(PacketType::UPDATE_BATTERY_HV, 1800);
        config.apply(PacketType::UPDATE_BATTERY_LV, 1800);
        config.apply(PacketType::UPDATE_SENSOR_HV, 1500);
        config.apply(PacketType::UPDATE_SENSOR_LV, 2000);

        assert_eq!(battery_percent(1700, &config), 0);
        assert_eq!(battery_percent(1800, &config), 0);
        assert_eq!(battery_percent(1900, &config), 100);

        // Crossed thresholds: the low clamp wins below it, the high
        // clamp above it.
        assert_eq!(moisture_percent(1400, &config), 100);
        assert_eq!(moisture_percent(1800, &config), 100);
        assert_eq!(moisture_percent(2100, &config), 0);

        let mut sensor = FixedSensor {
            battery_mv: 1800,
            moisture_mv: 1800,
        };
        assert_eq!(SensorKind::BatteryPercent.measure(&mut sensor, &config), 0);
        assert_eq!(
            SensorKind::MoisturePercent.measure(&mut sensor, &config),
            100
        );
    }

    #[test]
    fn request_mapping() {
        assert_eq!(
            SensorKind::for_request(PacketType::REQ_BATTERY_PCT),
            Some((SensorKind::BatteryPercent, PacketType::RESP_BATTERY_PCT))
        );
        assert_eq!(
            SensorKind::for_request(PacketType::REQ_MOISTURE_VOLTAGE),
            Some((
                SensorKind::MoistureVoltage,
                PacketType::RESP_MOISTURE_VOLTAGE
            ))
        );
        assert_eq!(SensorKind::for_request(PacketType::GO_TO_SLEEP), None);
    }

    #[test]
    fn measure_converts_where_asked() {
        let config = NodeConfig::default();
        let mut sensor = FixedSensor {
            battery_mv: 1775,
            moisture_mv: 1344,
        };

        assert_eq!(
            SensorKind::BatteryVoltage.measure(&mut sensor, &config),
            1775
        );
        assert_eq!(SensorKind::BatteryPercent.measure(&mut sensor, &config), 50);
        assert_eq!(
            SensorKind::MoisturePercent.measure(&mut sensor, &config),
            100
        );
    }
}
