//! Interactive prompts.
//!
//! Every suspension point in a wizard goes through the `Prompter` trait
//! so decision flows stay testable with a scripted prompter. The real
//! implementation reads standard input, re-prompting in place on
//! invalid input instead of failing.

use std::io::{self, Write};

/// Interactive input seam for the wizards.
pub trait Prompter {
    /// Yes/no question. Returns true on "y"/"yes" (case-insensitive).
    fn confirm(&mut self, question: &str) -> bool;

    /// Numbered menu over `options`. Returns the chosen index.
    /// Out-of-range or non-numeric input re-prompts in place.
    fn select(&mut self, title: &str, options: &[String]) -> usize;

    /// Read a TCP port (1..=65535), re-prompting on invalid input.
    fn read_port(&mut self, question: &str) -> u16;
}

/// Prompter backed by the terminal.
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line(&self) -> String {
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return String::new();
        }
        input.trim().to_string()
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{} [y/N] ", question);
        let _ = io::stdout().flush();
        let answer = self.read_line();
        answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    }

    fn select(&mut self, title: &str, options: &[String]) -> usize {
        println!("{}", title);
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        loop {
            print!("Choice [1-{}]: ", options.len());
            let _ = io::stdout().flush();
            match self.read_line().parse::<usize>() {
                Ok(n) if n >= 1 && n <= options.len() => return n - 1,
                _ => println!("Please enter a number between 1 and {}.", options.len()),
            }
        }
    }

    fn read_port(&mut self, question: &str) -> u16 {
        loop {
            print!("{} ", question);
            let _ = io::stdout().flush();
            match self.read_line().parse::<u16>() {
                Ok(port) if port >= 1 => return port,
                _ => println!("Please enter a port number between 1 and 65535."),
            }
        }
    }
}

/// Scripted prompter for tests: answers are consumed in order.
#[cfg(test)]
pub struct ScriptedPrompter {
    pub confirms: Vec<bool>,
    pub selections: Vec<usize>,
    pub ports: Vec<u16>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(confirms: Vec<bool>) -> Self {
        Self {
            confirms,
            selections: Vec::new(),
            ports: Vec::new(),
        }
    }

    pub fn with_selections(mut self, selections: Vec<usize>) -> Self {
        self.selections = selections;
        self
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, _question: &str) -> bool {
        if self.confirms.is_empty() {
            return false;
        }
        self.confirms.remove(0)
    }

    fn select(&mut self, _title: &str, _options: &[String]) -> usize {
        if self.selections.is_empty() {
            return 0;
        }
        self.selections.remove(0)
    }

    fn read_port(&mut self, _question: &str) -> u16 {
        if self.ports.is_empty() {
            return 22;
        }
        self.ports.remove(0)
    }
}
