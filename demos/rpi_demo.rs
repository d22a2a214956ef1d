// This example demonstrates how to use the OPT3001 sensor with a Raspberry Pi.
// It expects the sensor on /dev/i2c-1 with the ADDR pin tied to GND.

#[cfg(target_os = "linux")]
fn main() {
    use embedded_hal::blocking::delay::DelayMs;
    use linux_embedded_hal as hal;
    use opt3001::{DeviceAddr, Opt3001, Range, MANUFACTURER_ID};

    let mut i2c = hal::I2cdev::new("/dev/i2c-1").unwrap();
    let mut delay = hal::Delay;

    // Create a new OPT3001 instance, this writes the default configuration
    let opt3001 = Opt3001::new(DeviceAddr::Gnd, &mut i2c).unwrap();

    // Checking the ids is up to the caller
    match opt3001.read_manufacturer_id(&mut i2c) {
        Ok(MANUFACTURER_ID) => log::info!("Found a TI sensor"),
        Ok(id) => log::error!("Unexpected manufacturer id 0x{:04X}", id),
        Err(e) => log::error!("Error reading sensor: {:?}", e),
    }
    if let Ok(device_id) = opt3001.read_device_id(&mut i2c) {
        log::info!("Device ID: 0x{:04X}", device_id);
    }

    // Do single shot measurement once
    match opt3001.measure_lux_single_shot(&mut delay, &mut i2c) {
        Ok(reading) => log::info!("Single shot measurement - lux value: {}", reading),
        Err(e) => log::error!("Error reading sensor: {:?}", e),
    }

    // Flag anything brighter than 1000 lux
    opt3001.set_range(Range::Automatic, &mut i2c).unwrap();
    opt3001.set_high_limit_lux(1000.0, &mut i2c).unwrap();

    // Do continuous measurement with 100 ms conversions for 5 minutes
    opt3001.set_conversion_time_100ms(&mut i2c).unwrap();
    match opt3001.start_continuous(&mut i2c) {
        Ok(_) => log::info!("Continuous measurement started"),
        Err(e) => log::error!("Error starting continuous measurement: {:?}", e),
    }

    for _ in 0..300 {
        match opt3001.measure_lux(&mut i2c) {
            Ok(reading) => log::info!("Lux Value: {}", reading),
            Err(e) => log::error!("Error reading sensor: {:?}", e),
        }
        if let Ok(true) = opt3001.is_flag_high(&mut i2c) {
            log::info!("Above the high limit");
        }
        delay.delay_ms(1000u32);
    }

    // Stop conversions, the configuration is kept
    match opt3001.shutdown(&mut i2c) {
        Ok(_) => log::info!("Continuous measurement stopped"),
        Err(e) => log::error!("Error stopping continuous measurement: {:?}", e),
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {}
