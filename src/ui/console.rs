use crate::adb::Device;
use colored::*;

pub struct ConsoleUi;

impl ConsoleUi {
    pub fn write_banner(title: &str) {
        println!("{} {}\n", title.bright_cyan().bold(), env!("CARGO_PKG_VERSION").bright_black());
    }

    pub fn info(msg: &str) {
        println!("{} {}", "[INFO]".bright_blue(), msg);
    }

    pub fn warn(msg: &str) {
        println!("{} {}", "[WARN]".bright_yellow(), msg);
    }

    pub fn error(msg: &str) {
        eprintln!("{} {}", "[ERROR]".bright_red().bold(), msg);
    }

    pub fn success(msg: &str) {
        println!("{} {}", "[ OK ]".bright_green(), msg);
    }

    pub fn render_device_table(devices: &[Device]) {
        if devices.is_empty() {
            Self::warn("No usable device attached. Enable USB debugging and authorize this computer.");
            return;
        }
        let sep = "-".repeat(48);
        println!("{}", sep.bright_black());
        println!(
            "{:<4} {:<28} {:<12}",
            "#".bright_cyan(),
            "Serial".bright_cyan(),
            "State".bright_cyan()
        );
        println!("{}", sep.bright_black());
        for (idx, d) in devices.iter().enumerate() {
            println!(
                "{:<4} {:<28} {:<12}",
                format!("{}", idx + 1).bright_white().bold(),
                d.serial.bright_white(),
                d.state.bright_green()
            );
        }
        println!("{}", sep.bright_black());
    }
}
