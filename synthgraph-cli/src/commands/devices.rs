//! Output device listing.

use cpal::traits::{DeviceTrait, HostTrait};

pub fn run() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    println!("Output devices ({:?} host):", host.id());
    let mut count = 0usize;
    for device in host.output_devices()? {
        let name = device.name()?;
        let marker = if default_name.as_deref() == Some(name.as_str()) { " (default)" } else { "" };
        match device.default_output_config() {
            Ok(cfg) => println!(
                "  [{count}] {name}{marker}: {} ch @ {} Hz, {:?}",
                cfg.channels(),
                cfg.sample_rate().0,
                cfg.sample_format()
            ),
            Err(err) => println!("  [{count}] {name}{marker}: no default config ({err})"),
        }
        count += 1;
    }
    if count == 0 {
        println!("  none found");
    }
    Ok(())
}
