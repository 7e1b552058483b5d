//! Display lookup tables keyed by priority and status

use crossterm::style::{Color, Stylize};

use crate::models::{Priority, TaskStatus};

/// Used for low priority
pub const GREEN: Color = Color::Rgb { r: 0x34, g: 0xC7, b: 0x59 };
/// Used for medium priority
pub const ORANGE: Color = Color::Rgb { r: 0xFF, g: 0x95, b: 0x00 };
/// Used for high priority
pub const RED: Color = Color::Rgb { r: 0xFF, g: 0x3B, b: 0x30 };
/// Used for urgent priority
pub const PURPLE: Color = Color::Rgb { r: 0xAF, g: 0x52, b: 0xDE };

pub const fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => GREEN,
        Priority::Medium => ORANGE,
        Priority::High => RED,
        Priority::Urgent => PURPLE,
    }
}

pub const fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
        Priority::Urgent => "Urgent",
    }
}

/// Short fixed-width marker for list views
pub const fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "!   ",
        Priority::Medium => "!!  ",
        Priority::High => "!!! ",
        Priority::Urgent => "!!!!",
    }
}

pub const fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "Pending",
        TaskStatus::InProgress => "In progress",
        TaskStatus::Completed => "Completed",
    }
}

pub const fn status_symbol(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    }
}

/// `text` with a foreground color applied.
pub fn paint(text: &str, color: Color) -> String {
    text.with(color).to_string()
}
