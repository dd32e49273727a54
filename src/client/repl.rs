// src/client/repl.rs
// Interactive terminal chat against a running quest server

use std::io::Write;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::{ChatClient, ChatSession};
use crate::sections::{self, ParsedAnswer};

/// A parsed slash command
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Attach(String),
    Remove(usize),
    List,
    Sections,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match name {
            "/help" => Command::Help,
            "/attach" if !arg.is_empty() => Command::Attach(arg.to_string()),
            // Attachments are listed from 1
            "/remove" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => Command::Remove(n - 1),
                _ => Command::Unknown(line.to_string()),
            },
            "/list" => Command::List,
            "/sections" => Command::Sections,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub struct Repl {
    editor: DefaultEditor,
    client: ChatClient,
    session: ChatSession,
}

impl Repl {
    pub fn new(client: ChatClient, session: ChatSession) -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            client,
            session,
        })
    }

    /// Run the REPL loop until `/quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        println!("Connected to {}", self.client.base_url());
        println!("Attach an image with /attach <path>, then ask about it (/help for commands)");
        println!();

        loop {
            match self.editor.readline(">>> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(trimmed)?;

                    if trimmed.starts_with('/') {
                        if !self.handle_command(Command::parse(trimmed)).await {
                            break;
                        }
                        continue;
                    }

                    self.ask(trimmed).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Returns false when the loop should stop
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Help => {
                println!("Commands:");
                println!("  /attach <path>  - Attach an image");
                println!("  /remove <n>     - Remove attachment n");
                println!("  /list           - List attachments");
                println!("  /sections       - Show the last answer by section");
                println!("  /quit           - Exit");
            }
            Command::Attach(path) => match self.session.attach_file(&path).await {
                Ok(attachment) => println!("Attached {}", attachment.preview()),
                Err(e) => eprintln!("Error: {e}"),
            },
            Command::Remove(index) => match self.session.remove_attachment(index) {
                Some(removed) => println!("Removed {}", removed.preview()),
                None => eprintln!("No attachment {}", index + 1),
            },
            Command::List => {
                if self.session.attachments().is_empty() {
                    println!("No attachments.");
                }
                for (i, attachment) in self.session.attachments().iter().enumerate() {
                    println!("  {}. {}", i + 1, attachment.preview());
                }
            }
            Command::Sections => match self.session.last_reply() {
                Some(reply) => print_sections(&sections::parse(&reply)),
                None => println!("No answer yet."),
            },
            Command::Quit => return false,
            Command::Unknown(cmd) => println!("Unknown command: {cmd}"),
        }
        true
    }

    async fn ask(&mut self, text: &str) {
        if self.session.attachments().is_empty() {
            eprintln!("Attach at least one image first (/attach <path>)");
            return;
        }

        let result = self
            .client
            .send(&mut self.session, text, |token| {
                print!("{token}");
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();

        if let Err(e) = result {
            eprintln!("Error: {e}");
        }
    }
}

fn print_sections(answer: &ParsedAnswer) {
    match answer {
        ParsedAnswer::Structured { preamble, sections } => {
            if let Some(preamble) = preamble {
                println!("{preamble}\n");
            }
            for section in sections {
                println!("[{}]", section.kind.marker());
                println!("{}\n", section.body);
            }
        }
        ParsedAnswer::Unstructured { text } => println!("{text}"),
    }
}
