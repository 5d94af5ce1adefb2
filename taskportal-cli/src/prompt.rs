use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

pub const SHELL_PROMPT: &str = "taskportal>";

/// Where the workflows ask questions and report back.
///
/// `None` from a request means the user dismissed it.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// One line typed into the shell. `None` ends the shell.
    async fn read_command(&self) -> Option<String> {
        self.request_text(SHELL_PROMPT, false).await
    }

    async fn request_text(&self, label: &str, masked: bool) -> Option<String>;

    async fn request_choice(&self, label: &str, options: &[String]) -> Option<String>;

    async fn show_info(&self, message: &str);

    async fn show_error(&self, message: &str);
}

/// Prompts on stdin/stdout. End of input cancels.
pub struct TerminalPrompt;

fn read_line(label: &str) -> Option<String> {
    print!("{} ", label);
    io::stdout().flush().ok()?;

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// Maps what the user typed to one of the options: a 1-based number, the
/// name itself, or the best fuzzy match.
pub fn resolve_choice(input: &str, options: &[String]) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(index) = input.parse::<usize>() {
        if (1..=options.len()).contains(&index) {
            return Some(options[index - 1].clone());
        }
    }

    if let Some(exact) = options.iter().find(|o| o.eq_ignore_ascii_case(input)) {
        return Some(exact.clone());
    }

    let matcher = SkimMatcherV2::default();
    options
        .iter()
        .filter_map(|option| {
            matcher
                .fuzzy_match(option, input)
                .map(|score| (option, score))
        })
        .max_by_key(|(_, score)| *score)
        .map(|(option, _)| option.clone())
}

#[async_trait]
impl Prompt for TerminalPrompt {
    async fn read_command(&self) -> Option<String> {
        tokio::task::spawn_blocking(|| read_line(SHELL_PROMPT))
            .await
            .ok()
            .flatten()
    }

    async fn request_text(&self, label: &str, masked: bool) -> Option<String> {
        let label = label.to_string();
        tokio::task::spawn_blocking(move || {
            if masked {
                rpassword::prompt_password(format!("{}: ", label)).ok()
            } else {
                read_line(&format!("{}:", label))
            }
        })
        .await
        .ok()
        .flatten()
    }

    async fn request_choice(&self, label: &str, options: &[String]) -> Option<String> {
        let label = label.to_string();
        let options = options.to_vec();
        tokio::task::spawn_blocking(move || loop {
            println!("{}", label);
            for (i, option) in options.iter().enumerate() {
                println!("  {:>2}) {}", i + 1, option);
            }

            let input = read_line(">")?;
            if input.trim().is_empty() {
                return None;
            }
            match resolve_choice(&input, &options) {
                Some(choice) => return Some(choice),
                None => eprintln!("No option matches '{}'", input.trim()),
            }
        })
        .await
        .ok()
        .flatten()
    }

    async fn show_info(&self, message: &str) {
        println!("{}", message);
    }

    async fn show_error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }
}
