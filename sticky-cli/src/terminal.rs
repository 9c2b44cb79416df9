use std::{
    io::{self, BufRead, Write},
    ops::Range,
};

use chrono::Local;
use colored::{ColoredString, Colorize};
use sticky_lib::{
    Note,
    lock::Prompt,
    scheduler::{Notification, NotificationSink},
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Reads prompt answers from standard input. End of input counts as canceling.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, message: &str) -> Option<String> {
        print!("{} ", message.bold());
        io::stdout().flush().ok()?;

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(answer.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Prints reminders to the terminal and rings the bell.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn notify(&self, notification: Notification) {
        println!(
            "\x07{} {}",
            format!("{}:", notification.title()).yellow().bold(),
            notification.body()
        );
    }
}

/// One line per note, for listings.
pub fn print_row(note: &Note) {
    let pin = if note.pinned { "*" } else { " " };
    let lock = if note.locked() { " [locked]" } else { "" };
    let tags: Vec<String> = note.tags.iter().map(|t| format!("#{t}")).collect();

    println!(
        "{pin} {} {} {}{} {}",
        short_id(note).dimmed(),
        tint(note, note.display_title()).bold(),
        format!("({})", note.folder).dimmed(),
        lock.red(),
        tags.join(" ").cyan(),
    );
}

/// The full note. Callers make sure locked notes are only printed after the password was given.
pub fn print_note(note: &Note) {
    println!("{}", tint(note, note.display_title()).bold());
    println!("{} {}", "id:".dimmed(), note.id());
    println!("{} {}", "folder:".dimmed(), note.folder);
    if !note.tags.is_empty() {
        println!("{} {}", "tags:".dimmed(), note.tags.join(", "));
    }
    if let Some(at) = note.reminder_at {
        let at = at.with_timezone(&Local).format(TIME_FORMAT);
        match note.recurrence {
            Some(recurrence) => println!("{} {at} ({recurrence})", "reminder:".dimmed()),
            None => println!("{} {at}", "reminder:".dimmed()),
        }
    }
    for (position, voice_note) in note.voice_notes.iter().enumerate() {
        println!(
            "{} #{} ({}s)",
            "voice:".dimmed(),
            position.saturating_add(1),
            voice_note.duration
        );
    }
    println!(
        "{} {}",
        "updated:".dimmed(),
        note.updated_at().with_timezone(&Local).format(TIME_FORMAT)
    );
    if !note.content.is_empty() {
        println!();
        println!("{}", note.content);
    }
}

fn short_id(note: &Note) -> String {
    note.id().chars().take(8).collect()
}

fn tint(note: &Note, text: &str) -> ColoredString {
    match rgb(note.color.hex()) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    let channel = |range: Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
