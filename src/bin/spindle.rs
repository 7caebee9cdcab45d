//! Spindle CLI - интерактивная оболочка и интерпретатор.
//!
//! Использование:
//!   spindle                      - запустить REPL
//!   spindle <file.spl>           - выполнить файл
//!   spindle -e "expr"            - выполнить выражение
//!   spindle --config cfg.json …  - загрузить конфигурацию рантайма
//!   spindle --help               - справка

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use spindle_lang::config::RuntimeConfig;
use spindle_lang::interpreter::Interpreter;
use spindle_lang::parser::{parse, parse_expr};
use spindle_lang::value::Value;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = r#"
Spindle - embeddable S-expression runtime with native threads

USAGE:
    spindle                        Start REPL (interactive mode)
    spindle <file.spl>             Execute a Spindle file
    spindle -e "<expr>"            Evaluate an expression
    spindle --config <file.json>   Load runtime config (combine with any mode)
    spindle --help, -h             Show this help
    spindle --version, -v          Show version

REPL COMMANDS:
    :help, :h                Show help
    :quit, :q, :exit         Exit REPL
    :reset, :r               Reset interpreter state
    :load <file>             Load and execute a file
    :env                     Show defined variables
    :funcs                   Show defined functions
    :ast <expr>              Show ASG for expression as JSON

SYNTAX (S-Expression):
    (let n 1)                                   ; Variable declaration
    (fn square (x) (* x x))                     ; Function definition
    (let t (thread (lambda (x) (square x)) 7))  ; Spawn a thread
    (thread-join t)                             ; Join -> 49
    (thread-state t)                            ; "finished"
    (times 3 (print "hi"))                      ; Repeat -> 3

ENVIRONMENT:
    RUST_LOG=debug           Log thread lifecycle to stderr
"#;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let config = match take_config(&mut args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match args.as_slice() {
        [] => run_repl(config),
        [flag] if flag == "--help" || flag == "-h" => println!("{}", HELP),
        [flag] if flag == "--version" || flag == "-v" => println!("Spindle {}", VERSION),
        [file] => run_file(file, config),
        [flag, expr] if flag == "-e" || flag == "--eval" => run_expr(expr, config),
        [flag, ..] if flag.starts_with('-') => {
            eprintln!("Unknown option: {}", flag);
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
        _ => {
            eprintln!("Too many arguments.");
            eprintln!("Use --help for usage information.");
            process::exit(1);
        }
    }
}

/// Извлечь `--config <path>` из аргументов и загрузить конфигурацию.
fn take_config(args: &mut Vec<String>) -> Result<RuntimeConfig, String> {
    let Some(pos) = args.iter().position(|a| a == "--config") else {
        return Ok(RuntimeConfig::default());
    };
    if pos + 1 >= args.len() {
        return Err("--config requires a path".to_string());
    }
    let path = args.remove(pos + 1);
    args.remove(pos);
    RuntimeConfig::load(&path).map_err(|e| format!("Failed to load config '{}': {}", path, e))
}

/// Запустить REPL.
fn run_repl(config: RuntimeConfig) {
    println!("Spindle {}", VERSION);
    println!("Type :help for commands, :quit to exit.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to initialize readline: {}", e);
            process::exit(1);
        }
    };

    let mut interpreter = Interpreter::with_config(config.clone());
    let history_path = dirs_next::data_dir()
        .map(|p| p.join("spindle").join("history.txt"))
        .unwrap_or_else(|| PathBuf::from(".spindle_history"));

    let _ = rl.load_history(&history_path);

    loop {
        match rl.readline("spindle> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if line.starts_with(':') {
                    match handle_command(line, &mut interpreter) {
                        CommandResult::Continue => continue,
                        CommandResult::Exit => break,
                        CommandResult::Reset => {
                            interpreter = Interpreter::with_config(config.clone());
                            println!("Interpreter state reset.");
                            continue;
                        }
                    }
                }

                match interpreter.eval_source(line) {
                    Ok(value) => print_value(&value),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);
}

enum CommandResult {
    Continue,
    Exit,
    Reset,
}

fn handle_command(cmd: &str, interpreter: &mut Interpreter) -> CommandResult {
    let (command, arg) = match cmd.split_once(' ') {
        Some((command, arg)) => (command, Some(arg.trim())),
        None => (cmd, None),
    };

    match command {
        ":help" | ":h" => println!("{}", HELP),
        ":quit" | ":q" | ":exit" => return CommandResult::Exit,
        ":reset" | ":r" => return CommandResult::Reset,
        ":load" | ":l" => match arg {
            Some(path) => load_file(path, interpreter),
            None => println!("Usage: :load <file.spl>"),
        },
        ":env" | ":vars" => show_env(interpreter),
        ":funcs" | ":functions" => show_functions(interpreter),
        ":ast" => match arg {
            Some(expr) => show_ast(expr),
            None => println!("Usage: :ast <expression>"),
        },
        _ => {
            println!("Unknown command: {}", command);
            println!("Type :help for available commands.");
        }
    }
    CommandResult::Continue
}

fn print_value(value: &Value) {
    if !value.is_nil() {
        println!("{}", value.format_display());
    }
}

fn show_ast(expr: &str) {
    let asg = match parse_expr(expr) {
        Ok((asg, _)) => asg,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    match serde_json::to_string_pretty(asg.as_ref()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Serialization error: {}", e),
    }
}

fn load_file(path: &str, interpreter: &mut Interpreter) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading '{}': {}", path, e);
            return;
        }
    };

    match parse(&source) {
        Ok((asg, root_ids)) => {
            println!("Loading {}...", path);
            let count = root_ids.len();
            for root_id in root_ids {
                if let Err(e) = interpreter.execute(&asg, root_id) {
                    eprintln!("Runtime error: {}", e);
                    return;
                }
            }
            println!("Loaded {} definitions.", count);
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn show_env(interpreter: &Interpreter) {
    let vars = interpreter.get_variables();
    if vars.is_empty() {
        println!("No variables defined.");
        return;
    }
    println!("Variables ({}):", vars.len());
    for (name, value) in vars.iter().take(20) {
        println!("  {} = {}", name, value.format_display());
    }
    if vars.len() > 20 {
        println!("  ... and {} more", vars.len() - 20);
    }
}

fn show_functions(interpreter: &Interpreter) {
    let funcs = interpreter.get_functions();
    if funcs.is_empty() {
        println!("No functions defined.");
        return;
    }
    println!("Functions ({}):", funcs.len());
    for (name, closure) in funcs.iter().take(20) {
        println!("  ({} {})", name, closure.params.join(" "));
    }
    if funcs.len() > 20 {
        println!("  ... and {} more", funcs.len() - 20);
    }
}

/// Выполнить файл.
fn run_file(path: &str, config: RuntimeConfig) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    };

    let mut interpreter = Interpreter::with_config(config);
    match interpreter.eval_source(&source) {
        // Печатаем только последнее значение
        Ok(value) => print_value(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Выполнить выражение.
fn run_expr(expr: &str, config: RuntimeConfig) {
    let mut interpreter = Interpreter::with_config(config);
    match interpreter.eval_source(expr) {
        Ok(value) => print_value(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
