//! Command-line argument parsing.

use crate::config::Preset;
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "eqscope")]
#[command(about = "Real-time microphone equalizer and spectrum visualizer", long_about = None)]
pub struct Args {
    /// Equalizer variant: band layout, analyser size and bar colors
    #[arg(long, value_enum, default_value = "studio")]
    pub preset: Preset,

    /// Also log output devices at startup (input devices are always logged)
    #[arg(long)]
    pub list_devices: bool,
}

/// Logs every output device of the default host.
pub fn log_output_devices() {
    let host = cpal::default_host();
    log::info!("--- AVAILABLE OUTPUT DEVICES ---");
    if let Ok(devices) = host.output_devices() {
        for (i, dev) in devices.enumerate() {
            let name = dev.name().unwrap_or_else(|_| "Unknown".into());
            log::info!("  [{}]: {}", i, name);
        }
    }
    log::info!("--------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_studio_preset() {
        let args = Args::parse_from(["eqscope"]);
        assert_eq!(args.preset, Preset::Studio);
        assert!(!args.list_devices);
    }

    #[test]
    fn accepts_broad_preset_and_device_listing() {
        let args = Args::parse_from(["eqscope", "--preset", "broad", "--list-devices"]);
        assert_eq!(args.preset, Preset::Broad);
        assert!(args.list_devices);
    }

    #[test]
    fn rejects_unknown_preset() {
        assert!(Args::try_parse_from(["eqscope", "--preset", "loud"]).is_err());
    }
}
