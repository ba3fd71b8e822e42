use std::sync::Arc;

use problemset_client::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    models::dto::request::LoginRequest,
    questions::QuestionAction,
    services::{
        spawn_autosave, AttemptController, GuardDecision, GuardOutcome, LeaveChoice,
        NavigationGuard, NavigationRequest,
    },
};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: undo | redo | reset | save | submit | status | types | \
login <user> <password> | logout | quit | <action json>";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let question_id = std::env::args().nth(1).ok_or_else(|| {
        AppError::ValidationError("usage: problemset-client <question-id>".to_string())
    })?;

    let config = Config::from_env();
    let state = AppState::new(config).await?;
    let controller = state.start_attempt(&question_id).await?;

    if let Some(notice) = controller.notice() {
        println!("{}", notice);
    }
    println!(
        "{} ({}), resumed at {}s",
        controller.title().unwrap_or_default(),
        question_id,
        controller.current_duration()
    );
    println!("{}", HELP);

    let autosave = spawn_autosave(controller.clone(), state.config.autosave_interval());
    let mut guard = NavigationGuard::new(controller.clone(), format!("/questions/{}", question_id));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                controller.save_on_hide();
                // Let the beacon leave before the runtime goes away.
                tokio::task::yield_now().await;
                break;
            }
        };
        let Some(line) = line else {
            controller.save_on_hide();
            break;
        };
        let line = line.trim();

        let result = match line {
            "" => Ok(()),
            "quit" => {
                if leave(&mut guard).await? {
                    break;
                }
                Ok(())
            }
            _ => handle_command(&state, &controller, line).await,
        };
        if let Err(e) = result {
            println!("error [{}]: {}", e.error_code(), e);
        }
    }

    autosave.shutdown().await;
    Ok(())
}

async fn handle_command(
    state: &AppState,
    controller: &Arc<AttemptController>,
    line: &str,
) -> AppResult<()> {
    let mut words = line.split_whitespace();
    match words.next().unwrap_or_default() {
        "undo" => report(controller.undo()?, "nothing to undo"),
        "redo" => report(controller.redo()?, "nothing to redo"),
        "reset" => controller.reset(),
        "save" => controller.save_draft().await,
        "status" => {
            println!(
                "{:?} | {}s | solved: {} | unsaved: {}",
                controller.state(),
                controller.current_duration(),
                controller.is_solved(),
                controller.has_unsaved_changes()
            );
            println!("{}", controller.serialized_answer()?);
            Ok(())
        }
        "submit" => {
            let result = controller.submit().await?;
            println!(
                "{} ({} points)",
                if result.is_correct { "correct" } else { "incorrect" },
                result.points
            );
            Ok(())
        }
        "types" => {
            for info in state.api.list_question_types().await? {
                println!("{}: {}", info.question_type, info.name);
            }
            Ok(())
        }
        "login" => {
            let (Some(username), Some(password)) = (words.next(), words.next()) else {
                return Err(AppError::ValidationError(
                    "usage: login <user> <password>".to_string(),
                ));
            };
            let user = state
                .sessions
                .login(LoginRequest {
                    username: username.to_string(),
                    password: password.to_string(),
                })
                .await?;
            println!("signed in as {}", user.username);
            Ok(())
        }
        "logout" => state.sessions.logout().await,
        _ => {
            let action: QuestionAction = serde_json::from_str(line)?;
            controller.apply(action)?;
            println!("{}", controller.serialized_answer()?);
            Ok(())
        }
    }
}

fn report(changed: bool, unchanged: &str) -> AppResult<()> {
    if !changed {
        println!("{}", unchanged);
    }
    Ok(())
}

/// Returns `true` once it is safe to exit.
async fn leave(guard: &mut NavigationGuard<AttemptController>) -> AppResult<bool> {
    match guard.intercept(NavigationRequest::Back) {
        GuardDecision::Proceed | GuardDecision::BrowserConfirm => return Ok(true),
        GuardDecision::Prompt { .. } => {}
    }
    match guard.resolve(LeaveChoice::SaveAndLeave).await? {
        GuardOutcome::Leave(_) => Ok(true),
        GuardOutcome::Stay => Ok(false),
        GuardOutcome::SaveFailed { message } => {
            println!("could not save ({}); type quit again to retry", message);
            guard.resolve(LeaveChoice::Stay).await?;
            Ok(false)
        }
    }
}

