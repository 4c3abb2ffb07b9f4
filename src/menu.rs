//! Interactive console menu over an in-memory roster.
//!
//! Reads commands line by line from any [`BufRead`] and writes to any
//! [`Write`], so the loop can be driven from a terminal or from a test.
//! End of input behaves like choosing Exit.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use crate::analyzers::analyzer::{ReportOptions, run_full_report};
use crate::analyzers::compare::compare_sections;
use crate::analyzers::statistics::section_summary;
use crate::chart::{
    GRADE_DISTRIBUTION_FILE, SECTION_COMPARISON_FILE, render_grade_distribution,
    render_section_averages, write_chart,
};
use crate::config::Config;
use crate::output::{render_roster, render_section_comparison};
use crate::roster::{Roster, SortKey};

const SEPARATOR: &str = "---------------------------------------------";

struct Console<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Prints `label` and reads one trimmed line. `None` at end of input.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }
}

/// Everything the menu operates on besides its input and output.
pub struct MenuContext<'a> {
    pub config: &'a Config,
    pub output_dir: &'a Path,
    pub options: ReportOptions,
}

/// Runs the main menu until Exit is chosen or input ends.
pub fn run_menu<R: BufRead, W: Write>(
    input: R,
    out: W,
    roster: &mut Roster,
    ctx: &MenuContext<'_>,
) -> Result<()> {
    let mut console = Console { input, out };
    console.say(&format!(
        "\nSuccessfully loaded {} students into memory.",
        roster.len()
    ))?;

    loop {
        print_main_menu(&mut console)?;
        let Some(choice) = console.prompt("Enter your choice (1-8): ")? else {
            break;
        };
        debug!(choice = %choice, "Menu choice");

        match choice.as_str() {
            "1" => full_report(&mut console, roster, ctx)?,
            "2" => console.say(&render_roster(roster.records()))?,
            "3" => {
                if !add_student(&mut console, roster)? {
                    break;
                }
            }
            "4" => {
                if !delete_student(&mut console, roster)? {
                    break;
                }
            }
            "5" => {
                if !sort_students(&mut console, roster, ctx.config)? {
                    break;
                }
            }
            "6" => distribution_chart(&mut console, roster, ctx)?,
            "7" => section_comparison(&mut console, roster, ctx)?,
            "8" => break,
            _ => console.say("\nInvalid choice. Please enter a number from 1 to 8.")?,
        }
    }

    console.say("\nExiting grade analytics.")?;
    Ok(())
}

fn print_main_menu<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<()> {
    console.say(&format!("\n{SEPARATOR}"))?;
    console.say("Main Menu")?;
    console.say(" (1) Run Full Report (Process & Export all data)")?;
    console.say(" (2) View All Students (In-Memory Roster)")?;
    console.say(" (3) Add Student")?;
    console.say(" (4) Delete Student")?;
    console.say(" (5) Sort Students")?;
    console.say(" (6) Generate Grade Distribution Chart")?;
    console.say(" (7) Compare Section Performance")?;
    console.say(" (8) Exit")?;
    console.say(SEPARATOR)
}

fn ensure_graded<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
    config: &Config,
) -> Result<()> {
    if !roster.is_annotated() {
        console.say("Calculating grades first...")?;
        roster.annotate(config);
    }
    Ok(())
}

fn full_report<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
    ctx: &MenuContext<'_>,
) -> Result<()> {
    console.say("\n--- Running Full Report ---")?;
    if roster.is_empty() {
        return console.say("No student data to report on. Load data first.");
    }

    roster.annotate(ctx.config);
    match run_full_report(roster.records(), ctx.config, ctx.output_dir, ctx.options) {
        Ok(report) => {
            console.say(&report.console)?;
            for path in &report.artifacts {
                console.say(&format!("  wrote {}", path.display()))?;
            }
            console.say("--- Report Generation Complete ---")
        }
        Err(err) => {
            warn!(error = %err, "Full report failed");
            console.say(&format!("Error: report failed: {err:#}"))
        }
    }
}

/// Returns `false` when input ended mid-prompt.
fn add_student<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
) -> Result<bool> {
    console.say("\n--- Add New Student ---")?;

    let student_id = loop {
        let Some(id) = console.prompt("Enter Student ID: ")? else {
            return Ok(false);
        };
        if id.is_empty() {
            console.say("Student ID cannot be empty.")?;
        } else if roster.find(&id).is_some() {
            console.say(&format!(
                "Error: Student ID {id} already exists. Please use a unique ID."
            ))?;
        } else {
            break id;
        }
    };

    let mut fields = Vec::with_capacity(3);
    for label in ["Enter Last Name: ", "Enter First Name: ", "Enter Section: "] {
        let Some(value) = console.prompt(label)? else {
            return Ok(false);
        };
        fields.push(value);
    }

    match roster.add(&student_id, &fields[0], &fields[1], &fields[2]) {
        Ok(added) => {
            let msg = format!(
                "Success: Added {} {} (ID: {}) to the roster.",
                added.first_name, added.last_name, added.student_id
            );
            console.say(&msg)?;
            console.say("Note: New student has no grades. Run report to see 'N/A'.")?;
        }
        Err(err) => console.say(&format!("Error: {err}"))?,
    }
    Ok(true)
}

/// Returns `false` when input ended mid-prompt.
fn delete_student<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
) -> Result<bool> {
    console.say("\n--- Delete Student ---")?;
    let Some(id) = console.prompt("Enter Student ID to delete: ")? else {
        return Ok(false);
    };

    match roster.delete(&id) {
        Ok(removed) => console.say(&format!(
            "Success: Removed {} {} (ID: {}).",
            removed.first_name, removed.last_name, removed.student_id
        ))?,
        Err(err) => console.say(&format!("Error: {err}"))?,
    }
    Ok(true)
}

/// Returns `false` when input ended mid-prompt.
fn sort_students<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
    config: &Config,
) -> Result<bool> {
    console.say("\n--- Sort Students (In-Memory) ---")?;
    console.say(" (1) Sort by Last Name (A-Z)")?;
    console.say(" (2) Sort by Student ID (Ascending)")?;
    console.say(" (3) Sort by Final Grade (High-to-Low)")?;
    console.say(" (4) Back to Main Menu")?;

    let Some(choice) = console.prompt("Enter your choice (1-4): ")? else {
        return Ok(false);
    };

    match choice.as_str() {
        "1" => {
            roster.sort(SortKey::LastName);
            console.say("Successfully sorted students by Last Name.")?;
        }
        "2" => {
            roster.sort(SortKey::StudentId);
            console.say("Successfully sorted students by Student ID.")?;
        }
        "3" => {
            ensure_graded(console, roster, config)?;
            roster.sort(SortKey::FinalScore);
            console.say("Successfully sorted students by Final Grade (High-to-Low).")?;
        }
        "4" => {}
        _ => console.say("Invalid choice. Returning to Main Menu.")?,
    }
    Ok(true)
}

fn distribution_chart<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
    ctx: &MenuContext<'_>,
) -> Result<()> {
    ensure_graded(console, roster, ctx.config)?;
    let chart = render_grade_distribution(roster.records());
    console.say(&chart)?;
    save_chart(console, ctx, GRADE_DISTRIBUTION_FILE, &chart)
}

fn section_comparison<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    roster: &mut Roster,
    ctx: &MenuContext<'_>,
) -> Result<()> {
    ensure_graded(console, roster, ctx.config)?;
    let comparison = compare_sections(roster.records());
    console.say(&render_section_comparison(&comparison))?;

    let chart = render_section_averages(&section_summary(roster.records()));
    save_chart(console, ctx, SECTION_COMPARISON_FILE, &chart)
}

fn save_chart<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    ctx: &MenuContext<'_>,
    name: &str,
    body: &str,
) -> Result<()> {
    if !ctx.options.charts {
        return console.say("Chart output disabled; nothing saved.");
    }
    match write_chart(ctx.output_dir, name, body) {
        Ok(path) => console.say(&format!("Chart saved to {}", path.display())),
        Err(err) => {
            warn!(error = %err, "Chart could not be saved");
            console.say(&format!("Error: {err:#}"))
        }
    }
}
