//! Taskdeck CLI - a small command-line front end for the Taskdeck API.
//!
//! All credential handling lives in the library; the CLI only issues
//! requests and renders results. When the session expires mid-command the
//! library clears the stored pair and the CLI tells the user to log in
//! again - the command-line equivalent of the login redirect.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskdeck::models::{NewTask, TaskFilter, TaskPriority, TaskStatus};
use taskdeck::{ApiClient, ApiError, Config, CredentialStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() {
    eprintln!(
        "usage: taskdeck <command> [args]\n\
         \n\
         commands:\n\
         \x20 login [username]          log in and store credentials\n\
         \x20 register                  create an account\n\
         \x20 logout                    log out and forget credentials\n\
         \x20 whoami                    show session state\n\
         \x20 list [--status S] [--priority P] [--page N]\n\
         \x20 add <title> [--desc D] [--priority P]\n\
         \x20 show <id>                 show one task\n\
         \x20 done <id>                 mark a task done\n\
         \x20 rm <id>                   delete a task"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ApiError>() {
                Some(ApiError::SessionExpired) => {
                    eprintln!("Session expired - please run `taskdeck login` again.");
                }
                Some(api_err) => eprintln!("Error: {api_err}"),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    let store = Arc::new(CredentialStore::open(config.data_dir.clone())?);
    let client = ApiClient::new(&config, store)?
        .on_session_expired(|| info!("session expired, credentials cleared"));

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("login") => login(&client, args.get(2).map(String::as_str)).await,
        Some("register") => register(&client).await,
        Some("logout") => {
            client.logout().await?;
            println!("Logged out.");
            Ok(())
        }
        Some("whoami") => {
            if client.is_authenticated() {
                println!("Logged in.");
            } else {
                println!("Not logged in.");
            }
            Ok(())
        }
        Some("list") => list(&client, &args[2..]).await,
        Some("add") => add(&client, &args[2..]).await,
        Some("show") => {
            let id = parse_id(args.get(2))?;
            let task = client.get_task(id).await?;
            print_task_detail(&task);
            Ok(())
        }
        Some("done") => {
            let id = parse_id(args.get(2))?;
            client.update_task_status(id, TaskStatus::Done).await?;
            println!("Task {id} marked done.");
            Ok(())
        }
        Some("rm") => {
            let id = parse_id(args.get(2))?;
            client.delete_task(id).await?;
            println!("Task {id} deleted.");
            Ok(())
        }
        _ => {
            usage();
            Ok(())
        }
    }
}

async fn login(client: &ApiClient, username: Option<&str>) -> Result<()> {
    let username = match username {
        Some(name) => name.to_string(),
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    client.login(&username, &password).await?;
    println!("Logged in as {username}.");
    Ok(())
}

async fn register(client: &ApiClient) -> Result<()> {
    let username = prompt("Username: ")?;
    let email = prompt("Email: ")?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        anyhow::bail!("passwords do not match");
    }

    let user = client.register(&username, &email, &password).await?;
    println!("Account {} created. Run `taskdeck login` to sign in.", user.username);
    Ok(())
}

async fn list(client: &ApiClient, args: &[String]) -> Result<()> {
    let mut filter = TaskFilter::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("missing value for {flag}"))?;
        match flag.as_str() {
            "--status" => {
                filter.status = Some(
                    TaskStatus::parse(value)
                        .with_context(|| format!("unknown status: {value}"))?,
                );
            }
            "--priority" => {
                filter.priority = Some(
                    TaskPriority::parse(value)
                        .with_context(|| format!("unknown priority: {value}"))?,
                );
            }
            "--page" => filter.page = Some(value.parse().context("invalid page number")?),
            other => anyhow::bail!("unknown flag: {other}"),
        }
    }

    let page = client.list_tasks(&filter).await?;
    if page.data.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!("{:<6} {:<12} {:<8} TITLE", "ID", "STATUS", "PRIORITY");
    for task in &page.data {
        println!(
            "{:<6} {:<12} {:<8} {}",
            task.id, task.status, task.priority, task.title
        );
    }
    println!("{} tasks total (page {})", page.meta.total, page.meta.page);
    Ok(())
}

async fn add(client: &ApiClient, args: &[String]) -> Result<()> {
    let title = args
        .first()
        .context("usage: taskdeck add <title> [--desc D] [--priority P]")?;

    let mut task = NewTask::new(title.clone());
    let mut iter = args[1..].iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("missing value for {flag}"))?;
        match flag.as_str() {
            "--desc" => task.description = Some(value.clone()),
            "--priority" => {
                task.priority = Some(
                    TaskPriority::parse(value)
                        .with_context(|| format!("unknown priority: {value}"))?,
                );
            }
            other => anyhow::bail!("unknown flag: {other}"),
        }
    }

    let created = client.create_task(&task).await?;
    println!("Task {} created.", created.id);
    Ok(())
}

fn print_task_detail(task: &taskdeck::models::Task) {
    println!("#{} {}", task.id, task.title);
    println!("  status:   {}", task.status);
    println!("  priority: {}", task.priority);
    if let Some(description) = &task.description {
        println!("  notes:    {description}");
    }
    if let Some(due) = task.due_date {
        println!("  due:      {}", due.format("%Y-%m-%d"));
    }
    println!("  updated:  {}", task.updated_at.format("%Y-%m-%d %H:%M"));
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}

fn parse_id(arg: Option<&String>) -> Result<i64> {
    arg.context("missing task id")?
        .parse()
        .context("task id must be a number")
}
