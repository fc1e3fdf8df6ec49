use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use grok_terminal::{
    BuiltinToolDispatcher, HttpTurnTransport, ModelPreset, Session, SessionConfig, MODEL_PRESETS,
};
use xai_api::XaiApiConfig;

const SYSTEM_PROMPT: &str = "You are Grok, a helpful AI assistant running in a terminal. \
You can call tools to read and write files, list directories, and run bash commands. \
Use them when they help answer the user, and explain what you did.";

fn main() -> ExitCode {
    let Some(api_key) = api_key_from_env() else {
        eprintln!("Error: GROK_API_KEY or XAI_API_KEY environment variable not set");
        eprintln!("Export your API key: export GROK_API_KEY='your-key-here'");
        return ExitCode::FAILURE;
    };

    let transport = match HttpTurnTransport::new(XaiApiConfig::new(api_key)) {
        Ok(transport) => transport,
        Err(error) => {
            eprintln!("Error: failed to initialize transport: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(
        Box::new(transport),
        Box::new(BuiltinToolDispatcher::new()),
        SessionConfig::default(),
        SYSTEM_PROMPT,
    );

    println!("=== Grok Terminal ===");
    println!("Connected to xAI API (model: {})", session.config().model);
    println!("Type 'exit' to quit, '/model' to change model, or enter your message.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "exit" => {
                println!("Goodbye!");
                break;
            }
            "/model" => {
                let current = session.config().model.clone();
                match select_model(&current, &mut lines) {
                    Some(preset) if preset.id != current => {
                        session.set_model(preset.id);
                        println!("Switched to {} ({})", preset.label, preset.id);
                    }
                    Some(_) => println!("Already using {current}."),
                    None => println!("Selection cancelled."),
                }
            }
            _ => run_turn(&mut session, input),
        }
    }

    ExitCode::SUCCESS
}

fn api_key_from_env() -> Option<String> {
    std::env::var("GROK_API_KEY")
        .or_else(|_| std::env::var("XAI_API_KEY"))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

fn run_turn(session: &mut Session, input: &str) {
    let result = session.send_turn_with(input, &mut |delta| {
        print!("{delta}");
        let _ = io::stdout().flush();
    });
    println!();

    if let Err(error) = result {
        eprintln!("Failed to get response from Grok: {error}");
    }
}

/// Numbered preset menu. Returns `None` on cancel or unreadable input,
/// leaving the current selection unchanged.
fn select_model(
    current: &str,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Option<&'static ModelPreset> {
    println!("\n=== XAI Model Selection Menu ===\n");
    for (index, preset) in MODEL_PRESETS.iter().enumerate() {
        println!("  [{}] {}", index + 1, preset.label);
        println!("      {}", preset.description);
        if preset.id == current {
            println!("      (currently selected)");
        }
        println!();
    }
    print!("Enter model number to select (or 0 to cancel): ");
    let _ = io::stdout().flush();

    let choice = lines.next()?.ok()?;
    let choice: usize = choice.trim().parse().ok()?;
    if choice == 0 || choice > MODEL_PRESETS.len() {
        return None;
    }

    Some(&MODEL_PRESETS[choice - 1])
}
