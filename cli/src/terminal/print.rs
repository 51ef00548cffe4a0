use colored::*;

pub fn header(title: &str) {
    println!();
    println!("{}", format!("── {} ──", title.to_uppercase()).bold());
}

pub fn kv(label: &str, value: &str) {
    println!("  {:<10} {}", format!("{label}:").dimmed(), value);
}

pub fn ok(message: &str) {
    println!("{} {}", "[+]".green().bold(), message);
}

pub fn bad(message: &str) {
    println!("{} {}", "[-]".red().bold(), message);
}

pub fn attention(message: &str) {
    println!("{} {}", "[*]".yellow().bold(), message);
}
