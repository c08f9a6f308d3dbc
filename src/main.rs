//! Jalon CLI - roadmap import and reconciliation for project missions.

use clap::Parser;
use jalon::cli::{
    Cli, Commands, HistoryCommands, ImportCommands, MissionCommands, ProjectCommands,
    SystemCommands,
};
use jalon::commands::{self, CommandResult};
use jalon::storage::find_git_root;
use jalon::{Error, command_log};
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine repo path: --repo flag > JN_REPO env > git root > cwd
    let repo_path = resolve_repo_path(cli.repo_path, human);

    let (cmd_name, args_json) = describe_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &repo_path, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Best-effort; warns on stderr instead of failing the command.
    command_log::log_command(&repo_path, &cmd_name, args_json, success, error, duration);

    if let Err(e) = result {
        report_error(&e, human);
        process::exit(1);
    }
}

/// Resolve the repository path based on explicit flag, environment variable,
/// or auto-detection.
///
/// An explicit path (via -C/--repo or JN_REPO) is used literally without git
/// root detection. Otherwise the git root of the current directory keeps
/// storage consistent regardless of which subdirectory jn runs from.
fn resolve_repo_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let msg = format!("Specified repo path does not exist: {}", path.display());
                if human {
                    eprintln!("Error: {}", msg);
                } else {
                    eprintln!("{}", serde_json::json!({ "error": msg }));
                }
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_git_root(&cwd).unwrap_or(cwd)
        }
    }
}

fn report_error(e: &Error, human: bool) {
    if human {
        eprintln!("Error: {}", e);
        if matches!(e, Error::ApplyAborted { .. }) {
            eprintln!("Store state has changed; run `jn import preview` again before retrying.");
        }
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
}

/// Name + loggable arguments for a command. Roadmap text itself is read from
/// stdin or a file and never enters the log.
fn describe_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => ("system init".to_string(), serde_json::json!({})),
        },
        Commands::Project { command } => match command {
            ProjectCommands::Create { name } => (
                "project create".to_string(),
                serde_json::json!({ "name": name }),
            ),
            ProjectCommands::List => ("project list".to_string(), serde_json::json!({})),
        },
        Commands::Mission { command } => match command {
            MissionCommands::Create { project, title, .. } => (
                "mission create".to_string(),
                serde_json::json!({ "project": project, "title": title }),
            ),
            MissionCommands::List { project } => (
                "mission list".to_string(),
                serde_json::json!({ "project": project }),
            ),
            MissionCommands::Show { id } => {
                ("mission show".to_string(), serde_json::json!({ "id": id }))
            }
        },
        Commands::Import { command } => match command {
            ImportCommands::Preview { project, file } => (
                "import preview".to_string(),
                serde_json::json!({ "project": project, "file": file }),
            ),
            ImportCommands::Apply {
                project,
                file,
                actor,
            } => (
                "import apply".to_string(),
                serde_json::json!({ "project": project, "file": file, "actor": actor }),
            ),
        },
        Commands::History { command } => match command {
            HistoryCommands::List { project } => (
                "history list".to_string(),
                serde_json::json!({ "project": project }),
            ),
            HistoryCommands::Show { id } => {
                ("history show".to_string(), serde_json::json!({ "id": id }))
            }
        },
    }
}

/// Read roadmap text from a file argument, or from stdin when omitted.
fn read_roadmap_text(file: Option<&PathBuf>) -> Result<String, Error> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn run_command(command: Commands, repo_path: &Path, human: bool) -> Result<(), Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => {
                let result = commands::system_init(repo_path)?;
                output(&result, human);
            }
        },

        Commands::Project { command } => match command {
            ProjectCommands::Create { name } => {
                let result = commands::project_create(repo_path, &name)?;
                output(&result, human);
            }
            ProjectCommands::List => {
                let result = commands::project_list(repo_path)?;
                output(&result, human);
            }
        },

        Commands::Mission { command } => match command {
            MissionCommands::Create {
                project,
                title,
                description,
                estimate,
            } => {
                let result =
                    commands::mission_create(repo_path, &project, &title, description, estimate)?;
                output(&result, human);
            }
            MissionCommands::List { project } => {
                let result = commands::mission_list(repo_path, &project)?;
                output(&result, human);
            }
            MissionCommands::Show { id } => {
                let result = commands::mission_show(repo_path, &id)?;
                output(&result, human);
            }
        },

        Commands::Import { command } => match command {
            ImportCommands::Preview { project, file } => {
                let text = read_roadmap_text(file.as_ref())?;
                let result = commands::import_preview(repo_path, &project, &text)?;
                output(&result, human);
            }
            ImportCommands::Apply {
                project,
                file,
                actor,
            } => {
                let text = read_roadmap_text(file.as_ref())?;
                let result = commands::import_apply(repo_path, &project, &text, &actor)?;
                output(&result, human);
            }
        },

        Commands::History { command } => match command {
            HistoryCommands::List { project } => {
                let result = commands::history_list(repo_path, &project)?;
                output(&result, human);
            }
            HistoryCommands::Show { id } => {
                let result = commands::history_show(repo_path, &id)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}
