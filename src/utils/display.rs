use crate::core::{Message, Role};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

/// One transcript line per message, colored by role.
pub fn print_message(message: &Message) {
    let role = message.role();
    let label = format!("{}:", role);
    let label = match role {
        Role::System | Role::Developer => label.magenta(),
        Role::User => label.yellow().bold(),
        Role::Assistant => label.green().bold(),
        Role::Tool | Role::Function => label.cyan(),
    };

    let text = match message.content_text() {
        Some(text) => text,
        None => match message.get("tool_calls") {
            Some(calls) => format!("[tool calls] {}", calls),
            None => String::new(),
        },
    };
    println!("{} {}", label, text);
}
