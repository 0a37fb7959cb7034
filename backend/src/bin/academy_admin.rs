//! Operator CLI for the academy ledger: migrations, enrolment, module
//! sequencing, progress and certificates.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;

use academy::domain::ports::{
    AppendModuleRequest, BuyCourseRequest, ReorderModulesRequest, SetModuleCompletionRequest,
    TopUpBalanceRequest,
};
use academy::domain::{CourseId, ModuleId, ModuleOrderEntry, Money, UserId};
use academy::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use academy::settings::AcademySettings;
use academy::wiring::AcademyServices;
use clap::{Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::Serialize;
use serde_json::json;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `academy-admin` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "academy-admin",
    about = "Drive enrolment, module sequencing and certificate issuance from a shell",
    version
)]
struct CliArgs {
    /// Database connection URL. Overrides `ACADEMY_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Credit a user's balance, e.g. `--amount 25.00`.
    TopUp {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "amount")]
        amount: Money,
    },
    /// Buy a course for a user.
    Buy {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        course: CourseId,
    },
    /// Report whether a user has bought a course.
    Purchased {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        course: CourseId,
    },
    /// List modules of a course in order, with completion flags when
    /// `--user` is given.
    Modules {
        #[arg(long, value_name = "id")]
        course: CourseId,
        #[arg(long, value_name = "uuid")]
        user: Option<UserId>,
    },
    /// Show one module with a user's completion flag.
    Module {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        module: ModuleId,
    },
    /// List a user's purchased courses with progress, newest first.
    Courses {
        #[arg(long, value_name = "uuid")]
        user: UserId,
    },
    /// Append a module to the end of a course.
    AppendModule {
        #[arg(long, value_name = "id")]
        course: CourseId,
        #[arg(long, value_name = "title")]
        title: String,
    },
    /// Delete a module and close the gap it leaves.
    DeleteModule {
        #[arg(long, value_name = "id")]
        module: ModuleId,
    },
    /// Reassign every module position, e.g. `--order 1:3,2:1,3:2`.
    Reorder {
        #[arg(long, value_name = "id")]
        course: CourseId,
        #[arg(
            long,
            value_name = "module:position,...",
            value_delimiter = ',',
            required = true,
            value_parser = parse_order_entry
        )]
        order: Vec<ModuleOrderEntry>,
    },
    /// Mark a module complete (or incomplete with `--undo`).
    Complete {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        module: ModuleId,
        #[arg(long)]
        undo: bool,
    },
    /// Show completion progress for a course.
    Progress {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        course: CourseId,
    },
    /// Show the stored certificate for a course.
    Certificate {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        course: CourseId,
    },
    /// Retry certificate issuance for a completed course.
    Claim {
        #[arg(long, value_name = "uuid")]
        user: UserId,
        #[arg(long, value_name = "id")]
        course: CourseId,
    },
    /// Create missing progress rows for every purchaser of a course.
    Reprovision {
        #[arg(long, value_name = "id")]
        course: CourseId,
    },
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let mut settings = AcademySettings::load_from_iter([OsString::from("academy-admin")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    if let Some(url) = args.database_url {
        settings.database_url = Some(url);
    }

    if matches!(args.command, Command::Migrate) {
        let url = settings.database_url().to_owned();
        let applied = tokio::task::spawn_blocking(move || run_migrations(&url))
            .await
            .map_err(io::Error::other)?
            .map_err(io::Error::other)?;
        info!(count = applied.len(), "migrations applied");
        for version in applied {
            println!("applied={version}");
        }
        return Ok(());
    }

    let pool = DbPool::new(PoolConfig::from_settings(&settings))
        .await
        .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
    let services = AcademyServices::from_pool(&pool, &settings)?;
    run(&services, args.command).await
}

async fn run(services: &AcademyServices, command: Command) -> io::Result<()> {
    match command {
        Command::Migrate => Ok(()),
        Command::TopUp { user, amount } => {
            let statement = services
                .enrolment
                .top_up_balance(TopUpBalanceRequest {
                    user_id: user,
                    amount,
                })
                .await
                .map_err(command_failed("top-up"))?;
            emit(&statement)
        }
        Command::Buy { user, course } => {
            let receipt = services
                .enrolment
                .buy_course(BuyCourseRequest {
                    user_id: user,
                    course_id: course,
                })
                .await
                .map_err(command_failed("buy"))?;
            emit(&receipt)
        }
        Command::Purchased { user, course } => {
            let purchased = services
                .enrolment
                .has_purchased(user, course)
                .await
                .map_err(command_failed("purchased"))?;
            emit(&json!({ "purchased": purchased }))
        }
        Command::Modules { course, user: None } => {
            let modules = services
                .sequencing
                .list_modules(course)
                .await
                .map_err(command_failed("modules"))?;
            emit(&modules)
        }
        Command::Modules {
            course,
            user: Some(user),
        } => {
            let modules = services
                .progress_query
                .learner_modules(user, course)
                .await
                .map_err(command_failed("modules"))?;
            emit(&modules)
        }
        Command::Module { user, module } => {
            let view = services
                .progress_query
                .learner_module(user, module)
                .await
                .map_err(command_failed("module"))?;
            emit(&view)
        }
        Command::Courses { user } => {
            let courses = services
                .progress_query
                .enrolled_courses(user)
                .await
                .map_err(command_failed("courses"))?;
            emit(&courses)
        }
        Command::AppendModule { course, title } => {
            let appended = services
                .sequencing
                .append_module(AppendModuleRequest {
                    course_id: course,
                    title,
                })
                .await
                .map_err(command_failed("append-module"))?;
            emit(&json!({
                "module": appended.module,
                "provisioned": appended.provisioned,
            }))
        }
        Command::DeleteModule { module } => {
            let removed = services
                .sequencing
                .delete_module(module)
                .await
                .map_err(command_failed("delete-module"))?;
            emit(&json!({
                "moduleId": removed.module_id,
                "courseId": removed.course_id,
                "shifted": removed.shifted,
            }))
        }
        Command::Reorder { course, order } => {
            let modules = services
                .sequencing
                .reorder_modules(ReorderModulesRequest {
                    course_id: course,
                    entries: order,
                })
                .await
                .map_err(command_failed("reorder"))?;
            emit(&modules)
        }
        Command::Complete { user, module, undo } => {
            let outcome = services
                .progress
                .set_module_completion(SetModuleCompletionRequest {
                    user_id: user,
                    module_id: module,
                    completed: !undo,
                })
                .await
                .map_err(command_failed("complete"))?;
            emit(&outcome)
        }
        Command::Progress { user, course } => {
            let progress = services
                .progress_query
                .course_progress(user, course)
                .await
                .map_err(command_failed("progress"))?;
            emit(&progress)
        }
        Command::Certificate { user, course } => {
            let certificate = services
                .progress_query
                .certificate(user, course)
                .await
                .map_err(command_failed("certificate"))?;
            emit(&certificate)
        }
        Command::Claim { user, course } => {
            let certificate = services
                .progress
                .claim_certificate(user, course)
                .await
                .map_err(command_failed("claim"))?;
            emit(&certificate)
        }
        Command::Reprovision { course } => {
            let created = services
                .progress
                .reprovision_course(course)
                .await
                .map_err(command_failed("reprovision"))?;
            emit(&json!({ "created": created }))
        }
    }
}

fn command_failed(name: &'static str) -> impl Fn(academy::domain::Error) -> io::Error {
    move |error| {
        let details = serde_json::to_string(&error).unwrap_or_else(|_| error.to_string());
        io::Error::other(format!("{name} failed: {details}"))
    }
}

fn emit(value: &impl Serialize) -> io::Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{rendered}");
    Ok(())
}

/// Parse one `module:position` pair.
fn parse_order_entry(raw: &str) -> Result<ModuleOrderEntry, String> {
    let pair = raw.trim();
    let (module, position) = pair
        .split_once(':')
        .ok_or_else(|| format!("expected module:position, got '{pair}'"))?;
    let module_id = module
        .parse::<ModuleId>()
        .map_err(|error| format!("invalid module id '{module}': {error}"))?;
    let position = position
        .trim()
        .parse::<i32>()
        .map_err(|error| format!("invalid position '{position}': {error}"))?;
    Ok(ModuleOrderEntry {
        module_id,
        position,
    })
}
